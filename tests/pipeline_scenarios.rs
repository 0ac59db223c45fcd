//! End-to-end pipeline scenarios.
//!
//! Each scenario drives a real coordinator from IDLE to DONE through the
//! public step protocol.

use rand::rngs::SmallRng;
use rand::{Rng, SeedableRng};
use rangecov::commands::run_pipeline;
use rangecov::config::{PipelineConfig, DEFAULT_STEP_BUDGET};
use rangecov::pipeline::{bounded_sort, BoundedMergeSort, CoordinatorState, RangeChecker};
use rangecov::{Interval, PipelineCoordinator};

fn intervals(pairs: &[(u64, u64)]) -> Vec<Interval> {
    pairs.iter().copied().map(Interval::from).collect()
}

fn coordinator() -> PipelineCoordinator {
    PipelineCoordinator::new(PipelineConfig::default()).unwrap()
}

// =============================================================================
// Coalescing scenarios
// =============================================================================

#[test]
fn test_overlapping_pair() {
    let mut coord = coordinator();
    let report = run_pipeline(
        &mut coord,
        &intervals(&[(1, 5), (3, 10)]),
        None,
        DEFAULT_STEP_BUDGET,
    )
    .unwrap();

    assert_eq!(report.sorted, intervals(&[(1, 5), (3, 10)]));
    assert_eq!(report.coalesced, intervals(&[(1, 10)]));
    assert_eq!(report.total_coverage, 10);
}

#[test]
fn test_unsorted_two_clusters() {
    let mut coord = coordinator();
    let report = run_pipeline(
        &mut coord,
        &intervals(&[(15, 20), (1, 5), (3, 10), (18, 25)]),
        None,
        DEFAULT_STEP_BUDGET,
    )
    .unwrap();

    assert_eq!(report.coalesced, intervals(&[(1, 10), (15, 25)]));
    assert_eq!(report.total_coverage, 21);
}

#[test]
fn test_disjoint_input_unchanged() {
    let input = intervals(&[(1, 5), (10, 15), (20, 25)]);
    let mut coord = coordinator();
    let report = run_pipeline(&mut coord, &input, None, DEFAULT_STEP_BUDGET).unwrap();

    assert_eq!(report.sorted, input);
    assert_eq!(report.coalesced, input);
}

#[test]
fn test_touching_ranges_merge() {
    let mut coord = coordinator();
    let report = run_pipeline(
        &mut coord,
        &intervals(&[(1, 5), (5, 10)]),
        None,
        DEFAULT_STEP_BUDGET,
    )
    .unwrap();

    assert_eq!(report.coalesced, intervals(&[(1, 10)]));
}

#[test]
fn test_adjacent_points_do_not_merge() {
    let mut coord = coordinator();
    let report = run_pipeline(
        &mut coord,
        &intervals(&[(2, 2), (1, 1)]),
        None,
        DEFAULT_STEP_BUDGET,
    )
    .unwrap();

    assert_eq!(report.coalesced, intervals(&[(1, 1), (2, 2)]));
    assert_eq!(report.total_coverage, 2);
}

// =============================================================================
// Query scenarios
// =============================================================================

#[test]
fn test_query_batch_against_two_ranges() {
    let queries = [0u64, 5, 12, 20, 30];
    let mut coord = coordinator();
    let report = run_pipeline(
        &mut coord,
        &intervals(&[(1, 10), (15, 25)]),
        Some(&queries[..]),
        DEFAULT_STEP_BUDGET,
    )
    .unwrap();

    // 5 and 20 are covered; 0, 12 and 30 are not.
    assert_eq!(report.covered, vec![false, true, false, true, false]);
    assert_eq!(report.match_count, 2);
    assert_eq!(coord.state(), CoordinatorState::Done);
}

#[test]
fn test_query_batch_on_loaded_table() {
    let mut checker: RangeChecker = RangeChecker::new(4, 8);
    checker.load(Interval::new(1, 10)).unwrap();
    checker.load(Interval::new(15, 25)).unwrap();
    checker.begin(5).unwrap();
    for q in [0u64, 5, 12, 20, 30] {
        checker.check(q).unwrap();
    }
    assert_eq!(checker.match_count(), 2);
}

// =============================================================================
// Remainder blocks
// =============================================================================

fn shuffled(n: usize, seed: u64) -> Vec<Interval> {
    let mut rng = SmallRng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let start = rng.gen_range(0..1_000u64);
            Interval::new(start, start + rng.gen_range(0..50u64))
        })
        .collect()
}

#[test]
fn test_remainder_blocks_137() {
    let input = shuffled(137, 137);
    let mut expected = input.clone();
    expected.sort();

    let mut sorter = BoundedMergeSort::new(256);
    for &iv in &input {
        sorter.load(iv).unwrap();
    }
    sorter.begin(input.len()).unwrap();
    sorter.run();

    assert_eq!(sorter.sorted().unwrap(), &expected[..]);
    // 137 -> widths 1, 2, 4, ..., 128, 256
    assert_eq!(sorter.stats().passes, 8);
}

#[test]
fn test_remainder_blocks_through_coordinator() {
    let input = shuffled(137, 7);
    let mut expected = input.clone();
    expected.sort();

    let mut coord = coordinator();
    let report = run_pipeline(&mut coord, &input, None, DEFAULT_STEP_BUDGET).unwrap();
    assert_eq!(report.sorted, expected);
}

#[test]
fn test_every_non_power_of_two_up_to_capacity() {
    for n in (0..=256usize).filter(|n| !n.is_power_of_two()) {
        let input = shuffled(n, n as u64);
        let mut expected = input.clone();
        expected.sort();
        assert_eq!(bounded_sort(&input, 256).unwrap(), expected, "n = {}", n);
    }
}

#[test]
fn test_full_capacity_run() {
    let input = shuffled(256, 99);
    let queries: Vec<u64> = (0..1024).collect();
    let mut coord = coordinator();
    let report = run_pipeline(&mut coord, &input, Some(&queries[..]), DEFAULT_STEP_BUDGET).unwrap();

    let expected = queries
        .iter()
        .filter(|&&q| input.iter().any(|iv| iv.contains(q)))
        .count() as u32;
    assert_eq!(report.match_count, expected);
}
