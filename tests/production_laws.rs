// tests/production_laws.rs
use lsystem_plotter::Strategy as Layout;
use lsystem_plotter::{EngineConfig, Generation, Grammar, ProductionEngine, Rule};
use proptest::prelude::*;

const ALPHABET: &[u8] = b"FGXY+-[]";

fn engine(workers: usize, strategy: Layout) -> ProductionEngine {
    ProductionEngine::new(EngineConfig {
        workers,
        strategy,
        max_generation_len: None,
    })
    .unwrap()
}

fn symbol() -> impl Strategy<Value = u8> {
    prop::sample::select(ALPHABET)
}

fn generation() -> impl Strategy<Value = Vec<u8>> {
    prop::collection::vec(symbol(), 0..300)
}

fn grammar() -> impl Strategy<Value = Grammar> {
    prop::collection::vec((symbol(), prop::collection::vec(symbol(), 0..6)), 0..5)
        .prop_map(|rules| {
            Grammar::new_last_wins(rules.into_iter().map(|(p, s)| Rule::new(p, s)))
        })
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(64))]

    #[test]
    fn every_strategy_and_worker_count_agrees(input in generation(), grammar in grammar()) {
        let input = Generation::from(input);
        let expected = ProductionEngine::sequential().advance(&input, &grammar).unwrap();

        for strategy in [Layout::ChunkedBuffer, Layout::OffsetPrecomputed, Layout::PerSymbol] {
            for workers in [1, 2, 3, 8] {
                let got = engine(workers, strategy).advance(&input, &grammar).unwrap();
                prop_assert_eq!(&got, &expected, "{:?} with {} workers", strategy, workers);
            }
        }
    }

    #[test]
    fn output_length_is_sum_of_expansion_lengths(input in generation(), grammar in grammar()) {
        let expected: usize = input
            .iter()
            .map(|&s| grammar.lookup(s).map_or(1, <[u8]>::len))
            .sum();
        let next = engine(3, Layout::OffsetPrecomputed)
            .advance(&Generation::from(input), &grammar)
            .unwrap();
        prop_assert_eq!(next.len(), expected);
    }

    #[test]
    fn unmatched_symbols_are_left_alone(input in prop::collection::vec(prop::sample::select(&b"+-[]"[..]), 0..200)) {
        let grammar = Grammar::new([Rule::new(b'F', "FF"), Rule::new(b'X', "F[X]")]).unwrap();
        let input = Generation::from(input);
        for strategy in [Layout::Sequential, Layout::ChunkedBuffer, Layout::PerSymbol] {
            let next = engine(4, strategy).advance(&input, &grammar).unwrap();
            prop_assert_eq!(&next, &input);
        }
    }
}

#[test]
fn empty_grammar_returns_input_unchanged() {
    let input = Generation::from("F+F-[X]");
    let next = engine(4, Layout::ChunkedBuffer)
        .advance(&input, &Grammar::default())
        .unwrap();
    assert_eq!(next, input);
}

#[test]
fn empty_generation_stays_empty() {
    let grammar = Grammar::new([Rule::new(b'F', "FF")]).unwrap();
    for strategy in [
        Layout::Sequential,
        Layout::ChunkedBuffer,
        Layout::OffsetPrecomputed,
        Layout::PerSymbol,
    ] {
        let next = engine(3, strategy)
            .advance(&Generation::empty(), &grammar)
            .unwrap();
        assert!(next.is_empty());
    }
}

#[test]
fn expansion_factor_beyond_any_fixed_multiplier() {
    // A successor of 2000 symbols; output is sized from the exact total.
    let long = "F".repeat(2000);
    let grammar = Grammar::new([Rule::new(b'A', long.as_str())]).unwrap();
    let next = engine(2, Layout::OffsetPrecomputed)
        .advance(&Generation::from("AA+"), &grammar)
        .unwrap();
    assert_eq!(next.len(), 4001);
    assert_eq!(next.count(b'F'), 4000);
}
