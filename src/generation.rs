//! Immutable symbol strings produced by each rewrite step.

use std::fmt;
use std::sync::Arc;

/// A single generation of an L-system: the symbol string after *k* rewrite steps.
///
/// Symbols are single bytes. The buffer is shared behind an [`Arc`], so cloning a
/// generation to hand it to an interpreter never copies or aliases a buffer that is
/// still being written.
#[derive(Clone, PartialEq, Eq, Hash)]
pub struct Generation {
    symbols: Arc<[u8]>,
}

impl Generation {
    pub fn new(symbols: impl Into<Arc<[u8]>>) -> Self {
        Self {
            symbols: symbols.into(),
        }
    }

    /// The empty generation.
    pub fn empty() -> Self {
        Self::new(Vec::<u8>::new())
    }

    pub fn as_bytes(&self) -> &[u8] {
        &self.symbols
    }

    pub fn len(&self) -> usize {
        self.symbols.len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.is_empty()
    }

    /// Number of occurrences of `symbol`.
    pub fn count(&self, symbol: u8) -> usize {
        self.symbols.iter().filter(|&&s| s == symbol).count()
    }
}

impl From<&str> for Generation {
    fn from(s: &str) -> Self {
        Self::new(s.as_bytes())
    }
}

impl From<Vec<u8>> for Generation {
    fn from(v: Vec<u8>) -> Self {
        Self::new(v)
    }
}

impl From<&[u8]> for Generation {
    fn from(v: &[u8]) -> Self {
        Self::new(v)
    }
}

impl AsRef<[u8]> for Generation {
    fn as_ref(&self) -> &[u8] {
        self.as_bytes()
    }
}

impl fmt::Display for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(&self.symbols))
    }
}

impl fmt::Debug for Generation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Generation({:?})", String::from_utf8_lossy(&self.symbols))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clones_share_the_buffer() {
        let a = Generation::from("F+F");
        let b = a.clone();
        assert!(std::ptr::eq(a.as_bytes(), b.as_bytes()));
    }

    #[test]
    fn counts_symbols() {
        let g = Generation::from("F+F--F+F");
        assert_eq!(g.count(b'F'), 4);
        assert_eq!(g.count(b'-'), 2);
        assert_eq!(g.to_string(), "F+F--F+F");
    }

    #[test]
    fn empty_generation() {
        assert!(Generation::empty().is_empty());
        assert_eq!(Generation::empty().len(), 0);
    }
}
