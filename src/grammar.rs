//! Production rules of a context-free, non-parametric L-system.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum GrammarError {
    #[error("Duplicate rule for predecessor '{0}'")]
    DuplicateRule(char),
}

/// A single `predecessor -> successor` rewrite pair.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct Rule {
    pub predecessor: u8,
    pub successor: Vec<u8>,
}

impl Rule {
    pub fn new(predecessor: u8, successor: impl Into<Vec<u8>>) -> Self {
        Self {
            predecessor,
            successor: successor.into(),
        }
    }
}

/// Every byte mapped to itself, so identity productions can be returned as slices.
static IDENTITY: [u8; 256] = {
    let mut table = [0u8; 256];
    let mut i = 0;
    while i < 256 {
        table[i] = i as u8;
        i += 1;
    }
    table
};

/// Immutable mapping from a symbol to its replacement string.
///
/// Lookup is a direct index into a 256-entry table. Symbols without a rule are their
/// own replacement. Once built, a grammar is only ever read, so production workers
/// share it by reference without synchronization.
#[derive(Clone, Debug)]
pub struct Grammar {
    table: [Option<Box<[u8]>>; 256],
    rule_count: usize,
}

impl Default for Grammar {
    fn default() -> Self {
        Self {
            table: std::array::from_fn(|_| None),
            rule_count: 0,
        }
    }
}

impl Grammar {
    /// Builds a grammar, rejecting a second rule for an already-defined predecessor.
    pub fn new(rules: impl IntoIterator<Item = Rule>) -> Result<Self, GrammarError> {
        let mut grammar = Self::default();
        for rule in rules {
            let slot = &mut grammar.table[rule.predecessor as usize];
            if slot.is_some() {
                return Err(GrammarError::DuplicateRule(char::from(rule.predecessor)));
            }
            *slot = Some(rule.successor.into_boxed_slice());
            grammar.rule_count += 1;
        }
        Ok(grammar)
    }

    /// Builds a grammar where a later rule for the same predecessor replaces the earlier one.
    pub fn new_last_wins(rules: impl IntoIterator<Item = Rule>) -> Self {
        let mut grammar = Self::default();
        for rule in rules {
            let slot = &mut grammar.table[rule.predecessor as usize];
            if slot.is_none() {
                grammar.rule_count += 1;
            }
            *slot = Some(rule.successor.into_boxed_slice());
        }
        grammar
    }

    /// Returns the successor for `symbol`, or `None` when it has no rule.
    #[inline]
    pub fn lookup(&self, symbol: u8) -> Option<&[u8]> {
        self.table[symbol as usize].as_deref()
    }

    /// Returns what `symbol` rewrites to, falling back to the symbol itself.
    #[inline]
    pub fn expansion(&self, symbol: u8) -> &[u8] {
        match self.lookup(symbol) {
            Some(successor) => successor,
            None => std::slice::from_ref(&IDENTITY[symbol as usize]),
        }
    }

    #[inline]
    pub fn expansion_len(&self, symbol: u8) -> usize {
        self.table[symbol as usize].as_ref().map_or(1, |s| s.len())
    }

    /// Exact length of the rewrite of `symbols`, or `None` if it does not fit in `usize`.
    pub fn expanded_len(&self, symbols: &[u8]) -> Option<usize> {
        symbols
            .iter()
            .try_fold(0usize, |acc, &s| acc.checked_add(self.expansion_len(s)))
    }

    /// Iterates over the rules in predecessor byte order.
    pub fn rules(&self) -> impl Iterator<Item = (u8, &[u8])> + '_ {
        self.table
            .iter()
            .enumerate()
            .filter_map(|(i, s)| s.as_deref().map(|succ| (i as u8, succ)))
    }

    /// Number of symbols that have a rule.
    pub fn len(&self) -> usize {
        self.rule_count
    }

    pub fn is_empty(&self) -> bool {
        self.rule_count == 0
    }
}
