// fitenc-core/tests/size_search_tests.rs
//
// Drives the pure search state machine with synthetic sizes.

use fitenc_core::processing::audio::AudioPlan;
use fitenc_core::processing::filters::FilterPlan;
use fitenc_core::processing::media_info::FrameRate;
use fitenc_core::processing::params::{AttemptResult, BitrateMode, EncodeParameters, SizeBudget};
use fitenc_core::processing::size_search::{Decision, Phase, SearchOutcome, SearchState};

const MIB: u64 = 1024 * 1024;

fn params(mode: BitrateMode, bitrate_kbps: u32) -> EncodeParameters {
    let filters = FilterPlan {
        out_height: 720,
        out_frame_rate: FrameRate::new(30, 1),
        auto_filters: Vec::new(),
    };
    EncodeParameters::new(mode, bitrate_kbps, &filters, None, &AudioPlan::default())
}

fn attempt(decision: &Decision, bytes: u64) -> AttemptResult {
    let params = match decision {
        Decision::Encode { mode, bitrate_kbps, .. } => params(*mode, *bitrate_kbps),
        Decision::ReEncode(p) => p.clone(),
        Decision::Done(outcome) => panic!("search already finished: {outcome:?}"),
    };
    AttemptResult {
        params,
        output_bytes: bytes,
        kept_artifact_path: None,
    }
}

/// Feeds `sizes` one by one and returns every decision plus the keep flags.
fn drive(state: &mut SearchState, sizes: &[u64]) -> (Vec<Decision>, Vec<bool>) {
    let mut decisions = vec![state.start()];
    let mut keeps = Vec::new();
    for &size in sizes {
        let last = decisions.last().cloned().unwrap();
        let transition = state.observe(attempt(&last, size));
        keeps.push(transition.keep);
        decisions.push(transition.decision);
    }
    (decisions, keeps)
}

fn bitrate_of(decision: &Decision) -> u32 {
    match decision {
        Decision::Encode { bitrate_kbps, .. } => *bitrate_kbps,
        Decision::ReEncode(p) => p.video_bitrate_kbps,
        Decision::Done(_) => panic!("no bitrate in {decision:?}"),
    }
}

#[test]
fn test_first_attempt_in_window_succeeds() {
    let mut state = SearchState::new(SizeBudget::new(3 * MIB, 0.75), 3, 419, BitrateMode::VbrQmax);
    let (decisions, keeps) = drive(&mut state, &[3_000_000]);

    assert_eq!(decisions[1], Decision::Done(SearchOutcome::Success { bytes: 3_000_000 }));
    assert_eq!(keeps, vec![true]);
    assert_eq!(state.attempts(), 1);
}

#[test]
fn test_limit_phase_lowers_bitrate_until_it_fits() {
    let mut state = SearchState::new(SizeBudget::new(3 * MIB, 0.75), 3, 419, BitrateMode::VbrQmax);
    let (decisions, keeps) = drive(&mut state, &[4 * MIB, 2_900_000]);

    // round_half_up(419 * 3/4) = 314, more than a 10% change
    assert_eq!(
        decisions[1],
        Decision::Encode {
            mode: BitrateMode::VbrQmax,
            bitrate_kbps: 314,
            replan_filters: true
        }
    );
    assert_eq!(decisions[2], Decision::Done(SearchOutcome::Success { bytes: 2_900_000 }));
    assert_eq!(keeps, vec![false, true]);
}

#[test]
fn test_near_identical_first_retry_abandons_mode() {
    // Scenario C: the retry lands within 1% of the mode's first attempt.
    let max = 3 * MIB;
    let mut state = SearchState::new(SizeBudget::new(max, 0.75), 3, 419, BitrateMode::VbrQmax);
    let first = 4 * MIB;
    let retry = first + first / 200;
    let (decisions, _) = drive(&mut state, &[first, retry]);

    assert_eq!(
        decisions[2],
        Decision::Encode {
            mode: BitrateMode::Vbr,
            bitrate_kbps: 419,
            replan_filters: true
        }
    );
    assert_eq!(state.mode(), BitrateMode::Vbr);
    assert_eq!(state.iteration_in_mode(), 0);
}

#[test]
fn test_exhausting_every_mode_is_too_large() {
    let mut state = SearchState::new(SizeBudget::new(MIB, 0.5), 2, 500, BitrateMode::VbrQmax);
    // Sizes shrink enough to avoid the 1% exit but never fit.
    let sizes = [10 * MIB, 8 * MIB, 10 * MIB, 8 * MIB, 10 * MIB, 8 * MIB];
    let (decisions, keeps) = drive(&mut state, &sizes);

    let modes: Vec<BitrateMode> = decisions
        .iter()
        .filter_map(|d| match d {
            Decision::Encode { mode, .. } => Some(*mode),
            _ => None,
        })
        .collect();
    assert_eq!(
        modes,
        vec![
            BitrateMode::VbrQmax,
            BitrateMode::VbrQmax,
            BitrateMode::Vbr,
            BitrateMode::Vbr,
            BitrateMode::Cbr,
            BitrateMode::Cbr
        ]
    );
    assert_eq!(decisions.last(), Some(&Decision::Done(SearchOutcome::TooLarge)));
    assert!(keeps.iter().all(|k| !k));
    assert_eq!(state.best_try(), None);
}

#[test]
fn test_skip_qmax_starts_at_vbr() {
    let state = SearchState::new(SizeBudget::new(MIB, 0.5), 3, 100, BitrateMode::first(true));
    assert!(matches!(state.start(), Decision::Encode { mode: BitrateMode::Vbr, .. }));
}

#[test]
fn test_enhance_exhaustion_keeps_best_artifact() {
    // Scenario D: every fitting attempt stays below min_bytes.
    let max = 3 * MIB;
    let budget = SizeBudget::new(max, 0.75);
    let mut state = SearchState::new(budget, 1, 419, BitrateMode::VbrQmax);
    // initial fits but small, then two enhance encodes (2N with N = 1)
    let (decisions, keeps) = drive(&mut state, &[1_000_000, 2_000_000, 1_500_000]);

    assert_eq!(state.phase(), Phase::Enhance);
    assert_eq!(keeps, vec![true, true, false]);
    assert_eq!(decisions.last(), Some(&Decision::Done(SearchOutcome::TooSmall { bytes: 2_000_000 })));
    assert_eq!(state.best_try().map(|b| b.output_bytes), Some(2_000_000));
    assert_eq!(state.retained_bytes(), Some(2_000_000));
}

#[test]
fn test_enhance_raises_bitrate_and_respects_replan_threshold() {
    let budget = SizeBudget::new(3 * MIB, 0.75);
    let mut state = SearchState::new(budget, 3, 400, BitrateMode::Vbr);
    let (decisions, _) = drive(&mut state, &[2_200_000]);

    // 400 * 3 MiB / 2.2 MB = 571.9 -> 572 (+43%, re-plan)
    assert_eq!(
        decisions[1],
        Decision::Encode {
            mode: BitrateMode::Vbr,
            bitrate_kbps: 572,
            replan_filters: true
        }
    );

    let mut state = SearchState::new(budget, 3, 400, BitrateMode::Vbr);
    let (decisions, _) = drive(&mut state, &[2_300_000]);
    // 400 * 3 MiB / 2.3 MB = 547.1 -> 547 (+37%, filters kept)
    assert_eq!(
        decisions[1],
        Decision::Encode {
            mode: BitrateMode::Vbr,
            bitrate_kbps: 547,
            replan_filters: false
        }
    );
}

#[test]
fn test_best_try_is_reencoded_when_not_retained() {
    // Without retention (dry run) the best try must be encoded again.
    let budget = SizeBudget::new(3 * MIB, 0.75);
    let mut state = SearchState::new(budget, 1, 419, BitrateMode::VbrQmax).without_retention();
    let (decisions, keeps) = drive(&mut state, &[2_000_000, 1_000_000, 1_500_000]);

    assert!(keeps.iter().all(|k| !k));
    match decisions.last() {
        Some(Decision::ReEncode(p)) => assert_eq!(p.video_bitrate_kbps, 419),
        other => panic!("expected re-encode, got {other:?}"),
    }

    let transition = state.observe(attempt(decisions.last().unwrap(), 2_000_000));
    assert_eq!(transition.decision, Decision::Done(SearchOutcome::TooSmall { bytes: 2_000_000 }));
}

#[test]
fn test_zero_undershoot_never_enhances() {
    // Scenario E
    let mut state = SearchState::new(SizeBudget::new(3 * MIB, 0.0), 3, 419, BitrateMode::VbrQmax);
    let (decisions, _) = drive(&mut state, &[10]);
    assert_eq!(decisions[1], Decision::Done(SearchOutcome::Success { bytes: 10 }));
    assert_eq!(state.phase(), Phase::Limit);
}

#[test]
fn test_limit_budget_counts_the_initial_attempt() {
    let mut state = SearchState::new(SizeBudget::new(MIB, 0.5), 3, 1000, BitrateMode::VbrQmax);
    let (decisions, _) = drive(&mut state, &[4 * MIB, 3 * MIB, 2 * MIB]);

    assert!(matches!(decisions[1], Decision::Encode { mode: BitrateMode::VbrQmax, .. }));
    assert!(matches!(decisions[2], Decision::Encode { mode: BitrateMode::VbrQmax, .. }));
    // third encode in VbrQmax exhausted the mode
    assert_eq!(bitrate_of(&decisions[3]), 1000);
    assert!(matches!(decisions[3], Decision::Encode { mode: BitrateMode::Vbr, .. }));
}
