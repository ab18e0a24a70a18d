// fitenc-core/tests/bitrate_tests.rs

use fitenc_core::processing::bitrate::{initial_video_bitrate, next_bitrate};

const MIB: u64 = 1024 * 1024;

#[test]
fn test_initial_bitrate_without_audio() {
    // Scenario A: 60 s, 3 MiB, no audio
    assert_eq!(initial_video_bitrate(3 * MIB, 60_000, 0), 419);
}

#[test]
fn test_initial_bitrate_subtracts_audio() {
    // Scenario B: 120 s, 4 MiB, 64 kbps audio
    assert_eq!(initial_video_bitrate(4 * MIB, 120_000, 64), 215);
}

#[test]
fn test_initial_bitrate_falls_back_to_one_kbps() {
    assert_eq!(initial_video_bitrate(MIB, 600_000, 96), 1);
    assert_eq!(initial_video_bitrate(MIB, 0, 0), 1);
    assert_eq!(initial_video_bitrate(0, 60_000, 0), 1);
}

#[test]
fn test_large_moves_use_the_proportional_candidate() {
    // 1000 * 1 MiB / 2 MiB
    assert_eq!(next_bitrate(1000, 2 * MIB, MIB), 500);
    // 1000 * 1 MiB / 0.5 MiB
    assert_eq!(next_bitrate(1000, MIB / 2, MIB), 2000);
}

#[test]
fn test_small_moves_are_widened_to_ten_percent() {
    // 5% too large -> candidate 952, widened to 900
    assert_eq!(next_bitrate(1000, MIB + MIB / 20, MIB), 900);
    // 5% too small -> candidate 1053, widened to 1100
    assert_eq!(next_bitrate(1000, MIB - MIB / 20, MIB), 1100);
    // exactly 10% is not widened
    assert_eq!(next_bitrate(1000, MIB * 10 / 9, MIB), 900);
}

#[test]
fn test_step_always_moves_at_least_one_kbps() {
    // round_half_up(3 * 0.9) = 3, forced down to 2
    assert_eq!(next_bitrate(3, MIB + 1, MIB), 2);
    // round_half_up(4 * 1.1) = 4, forced up to 5
    assert_eq!(next_bitrate(4, MIB - 1, MIB), 5);
}

#[test]
fn test_ten_percent_rule_over_a_range() {
    for last in [1u32, 2, 9, 10, 11, 99, 419, 1234, 50_000] {
        let down = next_bitrate(last, 101, 100);
        assert!(down >= 1);
        if last > 1 {
            assert!(down < last, "decrease from {last} gave {down}");
            assert!(u64::from(down) * 10 <= u64::from(last) * 9 + 5);
        }

        let up = next_bitrate(last, 99, 100);
        assert!(up > last, "increase from {last} gave {up}");
        assert!(u64::from(up) * 10 + 5 >= u64::from(last) * 11);
    }
}
