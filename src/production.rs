//! Rewriting one generation into the next.
//!
//! The entry point is [`ProductionEngine`]. Build it from an [`EngineConfig`], then call
//! [`ProductionEngine::advance`] once per step, or [`ProductionEngine::derive`] to walk
//! successive generations.
//!
//! Every symbol rewrites independently of its neighbours, so the input can be split
//! into contiguous ranges and expanded in parallel as long as the pieces are reassembled
//! in their original order. Two parallel layouts are offered, both producing output
//! byte-identical to the sequential fold:
//!
//! - [`Strategy::ChunkedBuffer`]: each worker expands its range into a private buffer;
//!   buffers are concatenated in range order once all workers have joined.
//! - [`Strategy::OffsetPrecomputed`]: an exclusive prefix sum over the expansion lengths
//!   gives every symbol its destination offset in a single preallocated buffer, which is
//!   then split into disjoint slices that workers fill without any locking.
//!   [`Strategy::PerSymbol`] is the same scheme with one lane per symbol, reached by
//!   halving the buffer with `rayon::join` rather than listing every lane up front.

use crate::config::EngineConfig;
use crate::generation::Generation;
use crate::grammar::Grammar;
use rayon::prelude::*;
use rayon::{ThreadPool, ThreadPoolBuildError, ThreadPoolBuilder};
use serde::{Deserialize, Serialize};
use std::ops::Range;
use std::time::Instant;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProductionError {
    #[error("Worker count must be at least 1")]
    NoWorkers,
    #[error("Failed to build production thread pool: {0}")]
    ThreadPool(#[from] ThreadPoolBuildError),
    #[error("Next generation needs {required} symbols, limit is {limit}")]
    GenerationTooLarge { required: usize, limit: usize },
    #[error("Next generation length overflows the address space")]
    LengthOverflow,
}

/// How a generation is split across workers.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum Strategy {
    /// Left-to-right fold on the calling thread.
    Sequential,
    /// Private buffer per contiguous range, concatenated in range order.
    #[default]
    ChunkedBuffer,
    /// Prefix-sum offsets into one shared buffer, one contiguous range per worker.
    OffsetPrecomputed,
    /// Prefix-sum offsets into one shared buffer, one lane per symbol.
    PerSymbol,
}

/// Produces successive generations under a fixed worker configuration.
///
/// Holds a dedicated thread pool sized to `workers` when the configuration asks for
/// parallelism. With a single worker every strategy degrades to the sequential fold.
pub struct ProductionEngine {
    config: EngineConfig,
    pool: Option<ThreadPool>,
}

impl ProductionEngine {
    pub fn new(config: EngineConfig) -> Result<Self, ProductionError> {
        if config.workers == 0 {
            return Err(ProductionError::NoWorkers);
        }

        let pool = if config.workers > 1 && config.strategy != Strategy::Sequential {
            let pool = ThreadPoolBuilder::new()
                .num_threads(config.workers)
                .thread_name(|i| format!("lsys-production-{i}"))
                .build()?;
            Some(pool)
        } else {
            None
        };

        log::debug!(
            "Production engine ready: {:?} strategy on {} worker(s)",
            config.strategy,
            config.workers
        );

        Ok(Self { config, pool })
    }

    /// A single-threaded engine with no size limit.
    pub fn sequential() -> Self {
        Self {
            config: EngineConfig {
                workers: 1,
                strategy: Strategy::Sequential,
                max_generation_len: None,
            },
            pool: None,
        }
    }

    pub fn config(&self) -> &EngineConfig {
        &self.config
    }

    /// The strategy actually used for each step once the worker count is taken into account.
    pub fn effective_strategy(&self) -> Strategy {
        if self.pool.is_some() {
            self.config.strategy
        } else {
            Strategy::Sequential
        }
    }

    /// Rewrites `generation` into the next generation under `grammar`.
    ///
    /// The exact output length is known before anything is allocated. A length that
    /// overflows, or exceeds `max_generation_len`, fails without touching the input.
    pub fn advance(
        &self,
        generation: &Generation,
        grammar: &Grammar,
    ) -> Result<Generation, ProductionError> {
        let input = generation.as_bytes();
        if input.is_empty() || grammar.is_empty() {
            return Ok(generation.clone());
        }

        let strategy = self.effective_strategy();
        let output = match strategy {
            Strategy::Sequential => {
                let total = self.check_len(grammar.expanded_len(input))?;
                expand_sequential(input, grammar, total)
            }
            Strategy::ChunkedBuffer => {
                let total = self.check_len(grammar.expanded_len(input))?;
                let parts = self.config.workers;
                self.install(|| expand_chunked(input, grammar, parts, total))
            }
            Strategy::OffsetPrecomputed | Strategy::PerSymbol => {
                let (offsets, total) =
                    expansion_offsets(input, grammar).ok_or(ProductionError::LengthOverflow)?;
                let total = self.check_len(Some(total))?;
                if strategy == Strategy::PerSymbol {
                    self.install(|| expand_per_symbol(input, grammar, &offsets, total))
                } else {
                    let ranges = chunk_ranges(input.len(), self.config.workers);
                    self.install(|| expand_at_offsets(input, grammar, &ranges, &offsets, total))
                }
            }
        };

        log::debug!(
            "{:?}: {} -> {} symbols",
            strategy,
            input.len(),
            output.len()
        );

        Ok(Generation::from(output))
    }

    /// Iterates over generation 1, 2, ... starting from `axiom`.
    ///
    /// The iterator is unbounded; it stops after yielding the first error.
    pub fn derive<'a>(&'a self, axiom: &Generation, grammar: &'a Grammar) -> Derivation<'a> {
        Derivation {
            engine: self,
            grammar,
            current: axiom.clone(),
            index: 0,
            failed: false,
        }
    }

    /// Applies `iterations` rewrite steps to `axiom`.
    pub fn iterate(
        &self,
        axiom: &Generation,
        grammar: &Grammar,
        iterations: usize,
    ) -> Result<Generation, ProductionError> {
        self.derive(axiom, grammar)
            .take(iterations)
            .last()
            .unwrap_or_else(|| Ok(axiom.clone()))
    }

    fn check_len(&self, required: Option<usize>) -> Result<usize, ProductionError> {
        let required = required.ok_or(ProductionError::LengthOverflow)?;
        match self.config.max_generation_len {
            Some(limit) if required > limit => {
                Err(ProductionError::GenerationTooLarge { required, limit })
            }
            _ => Ok(required),
        }
    }

    fn install<R: Send>(&self, op: impl FnOnce() -> R + Send) -> R {
        match &self.pool {
            Some(pool) => pool.install(op),
            None => op(),
        }
    }
}

/// Successive generations produced by [`ProductionEngine::derive`].
pub struct Derivation<'a> {
    engine: &'a ProductionEngine,
    grammar: &'a Grammar,
    current: Generation,
    index: usize,
    failed: bool,
}

impl Derivation<'_> {
    /// Index of the most recently produced generation (0 before the first step).
    pub fn index(&self) -> usize {
        self.index
    }
}

impl Iterator for Derivation<'_> {
    type Item = Result<Generation, ProductionError>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.failed {
            return None;
        }

        let started = Instant::now();
        match self.engine.advance(&self.current, self.grammar) {
            Ok(next) => {
                self.index += 1;
                log::info!(
                    "Generation {} ({} symbols) took {:.6}s",
                    self.index,
                    next.len(),
                    started.elapsed().as_secs_f64()
                );
                self.current = next.clone();
                Some(Ok(next))
            }
            Err(e) => {
                self.failed = true;
                log::warn!("Generation {} failed: {}", self.index + 1, e);
                Some(Err(e))
            }
        }
    }
}

/// Splits `len` symbols into `parts` contiguous ranges of `len / parts` symbols each;
/// the last range absorbs the remainder. Never yields more ranges than symbols (but
/// always at least one).
pub fn chunk_ranges(len: usize, parts: usize) -> Vec<Range<usize>> {
    let parts = parts.clamp(1, len.max(1));
    let base = len / parts;
    (0..parts)
        .map(|i| {
            let start = i * base;
            let end = if i + 1 == parts { len } else { start + base };
            start..end
        })
        .collect()
}

/// Exclusive prefix sum of expansion lengths and the total, or `None` on overflow.
///
/// `offsets[i]` is where the expansion of `symbols[i]` starts in the next generation.
pub fn expansion_offsets(symbols: &[u8], grammar: &Grammar) -> Option<(Vec<usize>, usize)> {
    let mut offsets = Vec::with_capacity(symbols.len());
    let mut total = 0usize;
    for &s in symbols {
        offsets.push(total);
        total = total.checked_add(grammar.expansion_len(s))?;
    }
    Some((offsets, total))
}

fn expand_into(out: &mut Vec<u8>, symbols: &[u8], grammar: &Grammar) {
    for &s in symbols {
        out.extend_from_slice(grammar.expansion(s));
    }
}

/// Left-to-right fold; `total` is the exact output length.
pub(crate) fn expand_sequential(symbols: &[u8], grammar: &Grammar, total: usize) -> Vec<u8> {
    let mut out = Vec::with_capacity(total);
    expand_into(&mut out, symbols, grammar);
    out
}

/// Expands `parts` contiguous ranges into private buffers on the current rayon pool,
/// then concatenates them in range order.
pub(crate) fn expand_chunked(symbols: &[u8], grammar: &Grammar, parts: usize, total: usize) -> Vec<u8> {
    let buffers: Vec<Vec<u8>> = chunk_ranges(symbols.len(), parts)
        .into_par_iter()
        .map(|range| {
            let chunk = &symbols[range];
            let mut buf = Vec::with_capacity(grammar.expanded_len(chunk).unwrap_or_default());
            expand_into(&mut buf, chunk, grammar);
            buf
        })
        .collect();

    let mut out = Vec::with_capacity(total);
    for buf in &buffers {
        out.extend_from_slice(buf);
    }
    out
}

/// Writes every symbol's expansion straight to its precomputed offset.
///
/// The output buffer is split into one disjoint slice per range, so workers on the
/// current rayon pool never share a write region. `ranges` must cover `symbols` in
/// order without gaps.
pub(crate) fn expand_at_offsets(
    symbols: &[u8],
    grammar: &Grammar,
    ranges: &[Range<usize>],
    offsets: &[usize],
    total: usize,
) -> Vec<u8> {
    let offset_at = |i: usize| offsets.get(i).copied().unwrap_or(total);

    let mut out = vec![0u8; total];
    let mut slices = Vec::with_capacity(ranges.len());
    let mut rest: &mut [u8] = &mut out;
    for range in ranges {
        let len = offset_at(range.end) - offset_at(range.start);
        let (head, tail) = std::mem::take(&mut rest).split_at_mut(len);
        slices.push(head);
        rest = tail;
    }

    ranges
        .par_iter()
        .zip(slices.into_par_iter())
        .for_each(|(range, dst)| {
            let base = offset_at(range.start);
            for i in range.clone() {
                let expansion = grammar.expansion(symbols[i]);
                let at = offsets[i] - base;
                dst[at..at + expansion.len()].copy_from_slice(expansion);
            }
        });

    out
}

/// Offset-precomputed expansion with one lane per symbol.
///
/// The output is halved recursively at the offset of the middle symbol with
/// `rayon::join` until each leaf owns exactly one symbol's slice, so no per-lane
/// bookkeeping is allocated beyond `offsets` itself.
pub(crate) fn expand_per_symbol(
    symbols: &[u8],
    grammar: &Grammar,
    offsets: &[usize],
    total: usize,
) -> Vec<u8> {
    let mut out = vec![0u8; total];
    write_lanes(symbols, offsets, 0, &mut out, grammar);
    out
}

fn write_lanes(
    symbols: &[u8],
    offsets: &[usize],
    base: usize,
    dst: &mut [u8],
    grammar: &Grammar,
) {
    match symbols {
        [] => {}
        [symbol] => dst.copy_from_slice(grammar.expansion(*symbol)),
        _ => {
            let mid = symbols.len() / 2;
            let split = offsets[mid];
            let (left_dst, right_dst) = dst.split_at_mut(split - base);
            let (left_symbols, right_symbols) = symbols.split_at(mid);
            let (left_offsets, right_offsets) = offsets.split_at(mid);
            rayon::join(
                || write_lanes(left_symbols, left_offsets, base, left_dst, grammar),
                || write_lanes(right_symbols, right_offsets, split, right_dst, grammar),
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grammar::Rule;

    fn koch() -> Grammar {
        Grammar::new([Rule::new(b'F', "F+F--F+F")]).unwrap()
    }

    fn engine(workers: usize, strategy: Strategy) -> ProductionEngine {
        ProductionEngine::new(EngineConfig {
            workers,
            strategy,
            max_generation_len: None,
        })
        .unwrap()
    }

    #[test]
    fn chunk_ranges_last_absorbs_remainder() {
        assert_eq!(chunk_ranges(10, 3), vec![0..3, 3..6, 6..10]);
        assert_eq!(chunk_ranges(4, 4), vec![0..1, 1..2, 2..3, 3..4]);
    }

    #[test]
    fn chunk_ranges_never_exceeds_symbol_count() {
        assert_eq!(chunk_ranges(2, 8), vec![0..1, 1..2]);
        assert_eq!(chunk_ranges(0, 4), vec![0..0]);
    }

    #[test]
    fn offsets_are_exclusive_prefix_sum() {
        let (offsets, total) = expansion_offsets(b"F+F", &koch()).unwrap();
        assert_eq!(offsets, vec![0, 8, 9]);
        assert_eq!(total, 17);
    }

    #[test]
    fn zero_workers_is_rejected() {
        let result = ProductionEngine::new(EngineConfig {
            workers: 0,
            strategy: Strategy::ChunkedBuffer,
            max_generation_len: None,
        });
        assert!(matches!(result, Err(ProductionError::NoWorkers)));
    }

    #[test]
    fn single_worker_falls_back_to_sequential() {
        assert_eq!(
            engine(1, Strategy::OffsetPrecomputed).effective_strategy(),
            Strategy::Sequential
        );
        assert_eq!(
            engine(2, Strategy::PerSymbol).effective_strategy(),
            Strategy::PerSymbol
        );
    }

    #[test]
    fn every_strategy_matches_the_sequential_fold() {
        let grammar = Grammar::new([Rule::new(b'X', "F[+X]F[-X]+X"), Rule::new(b'F', "FF")])
            .unwrap();
        let axiom = Generation::from("X");
        let expected = ProductionEngine::sequential()
            .iterate(&axiom, &grammar, 5)
            .unwrap();

        for strategy in [
            Strategy::ChunkedBuffer,
            Strategy::OffsetPrecomputed,
            Strategy::PerSymbol,
        ] {
            for workers in [2, 3, 7] {
                let got = engine(workers, strategy)
                    .iterate(&axiom, &grammar, 5)
                    .unwrap();
                assert_eq!(got, expected, "{strategy:?} with {workers} workers");
            }
        }
    }

    #[test]
    fn chunked_and_offset_kernels_work_on_a_single_range() {
        let grammar = koch();
        let expected = expand_sequential(b"F+F", &grammar, 17);
        assert_eq!(expand_chunked(b"F+F", &grammar, 1, 17), expected);
        let (offsets, total) = expansion_offsets(b"F+F", &grammar).unwrap();
        assert_eq!(
            expand_at_offsets(b"F+F", &grammar, &[0..3], &offsets, total),
            expected
        );
    }

    #[test]
    fn per_symbol_lanes_match_the_fold() {
        let grammar = Grammar::new([Rule::new(b'X', ""), Rule::new(b'F', "F+F")]).unwrap();
        let input = b"XF-FXX[F]";
        let (offsets, total) = expansion_offsets(input, &grammar).unwrap();
        assert_eq!(
            expand_per_symbol(input, &grammar, &offsets, total),
            expand_sequential(input, &grammar, total)
        );
        assert!(expand_per_symbol(b"", &grammar, &[], 0).is_empty());
    }

    #[test]
    fn oversized_generation_is_refused_by_every_parallel_strategy() {
        let grammar = koch();
        let input = Generation::from("F+F");
        for strategy in [Strategy::ChunkedBuffer, Strategy::PerSymbol] {
            let engine = ProductionEngine::new(EngineConfig {
                workers: 3,
                strategy,
                max_generation_len: Some(16),
            })
            .unwrap();
            let err = engine.advance(&input, &grammar).unwrap_err();
            assert!(
                matches!(
                    err,
                    ProductionError::GenerationTooLarge {
                        required: 17,
                        limit: 16
                    }
                ),
                "{strategy:?}"
            );
        }
    }

    #[test]
    fn vanishing_symbols_leave_empty_slices() {
        let grammar = Grammar::new([Rule::new(b'X', ""), Rule::new(b'F', "F")]).unwrap();
        let input = Generation::from("XFXXFX");
        for strategy in [Strategy::ChunkedBuffer, Strategy::PerSymbol] {
            let next = engine(3, strategy).advance(&input, &grammar).unwrap();
            assert_eq!(next.as_bytes(), b"FF");
        }
    }

    #[test]
    fn oversized_generation_is_refused_before_allocation() {
        let engine = ProductionEngine::new(EngineConfig {
            workers: 2,
            strategy: Strategy::OffsetPrecomputed,
            max_generation_len: Some(20),
        })
        .unwrap();
        let gen1 = engine
            .advance(&Generation::from("F"), &koch())
            .unwrap();
        assert_eq!(gen1.len(), 8);

        let err = engine.advance(&gen1, &koch()).unwrap_err();
        assert!(matches!(
            err,
            ProductionError::GenerationTooLarge {
                required: 36,
                limit: 20
            }
        ));
    }

    #[test]
    fn derivation_stops_after_an_error() {
        let engine = ProductionEngine::new(EngineConfig {
            workers: 1,
            strategy: Strategy::Sequential,
            max_generation_len: Some(10),
        })
        .unwrap();
        let grammar = koch();
        let results: Vec<_> = engine
            .derive(&Generation::from("F"), &grammar)
            .take(5)
            .collect();
        assert_eq!(results.len(), 2);
        assert!(results[0].is_ok());
        assert!(results[1].is_err());
    }

    #[test]
    fn zero_iterations_returns_the_axiom() {
        let axiom = Generation::from("F");
        let got = ProductionEngine::sequential()
            .iterate(&axiom, &koch(), 0)
            .unwrap();
        assert_eq!(got, axiom);
    }
}
