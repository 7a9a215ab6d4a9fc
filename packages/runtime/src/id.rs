//! Process-unique block identity.

use std::fmt;
use std::str::FromStr;
use std::sync::atomic::{AtomicU64, Ordering};

use crate::Error;

const PREFIX: &str = "block";

/// Unique identifier for a block.
///
/// Ids are monotonic within a process and never reused. The string form
/// (`block7`) is what placeholders carry in their marker attribute and what
/// namespaces the block's document handlers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockId(u64);

impl BlockId {
    /// Allocate the next id.
    pub fn next() -> Self {
        static NEXT: AtomicU64 = AtomicU64::new(1);
        Self(NEXT.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(&self) -> u64 {
        self.0
    }
}

impl fmt::Display for BlockId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", PREFIX, self.0)
    }
}

impl FromStr for BlockId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.strip_prefix(PREFIX)
            .and_then(|n| n.parse().ok())
            .map(BlockId)
            .ok_or_else(|| Error::InvalidBlockId(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ids_are_unique_and_increasing() {
        let a = BlockId::next();
        let b = BlockId::next();
        assert_ne!(a, b);
        assert!(b > a);
    }

    #[test]
    fn display_parses_back() {
        let id = BlockId::next();
        let text = id.to_string();
        assert!(text.starts_with("block"));
        assert_eq!(text.parse::<BlockId>().unwrap(), id);
    }

    #[test]
    fn rejects_foreign_ids() {
        assert!("c12".parse::<BlockId>().is_err());
        assert!("block".parse::<BlockId>().is_err());
        assert!("blockx".parse::<BlockId>().is_err());
    }
}
