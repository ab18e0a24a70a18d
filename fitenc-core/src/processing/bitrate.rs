//! Video bitrate calculation and the adjustment rule applied between attempts.
//!
//! All bitrates are integer kbps. Since one kbit/s equals one bit per
//! millisecond, `bytes * 8 / duration_ms` yields kbps directly.

/// Fallback used whenever the computed bitrate would not be positive.
pub const MIN_VIDEO_BITRATE_KBPS: u32 = 1;

/// Theoretical video bitrate that fills `max_bytes` over `duration_ms`,
/// minus what the audio streams take.
#[must_use]
pub fn initial_video_bitrate(max_bytes: u64, duration_ms: u64, audio_total_kbps: u32) -> u32 {
    if duration_ms == 0 {
        return MIN_VIDEO_BITRATE_KBPS;
    }
    let total_kbps = u128::from(max_bytes) * 8 / u128::from(duration_ms);
    let video = total_kbps.saturating_sub(u128::from(audio_total_kbps));
    if video == 0 {
        MIN_VIDEO_BITRATE_KBPS
    } else {
        u32::try_from(video).unwrap_or(u32::MAX)
    }
}

/// Integer division rounding halves away from zero.
#[must_use]
pub fn round_half_up(numerator: u128, denominator: u128) -> u128 {
    if denominator == 0 {
        return 0;
    }
    (2 * numerator + denominator) / (2 * denominator)
}

/// Next bitrate after an attempt at `last_kbps` produced `last_bytes`.
///
/// The candidate scales `last_kbps` by `max_bytes / last_bytes`. When that
/// moves less than 10% in the direction of the needed change, exactly 10% is
/// applied instead, and the result always differs from `last_kbps` by at
/// least 1 kbps. The result is never below 1 kbps.
#[must_use]
pub fn next_bitrate(last_kbps: u32, last_bytes: u64, max_bytes: u64) -> u32 {
    let last = u128::from(last_kbps.max(MIN_VIDEO_BITRATE_KBPS));
    let decreasing = last_bytes > max_bytes;

    let candidate = if last_bytes == 0 {
        // Nothing was written; treat as an unbounded increase.
        last * 2
    } else {
        round_half_up(last * u128::from(max_bytes), u128::from(last_bytes))
    };

    let next = if decreasing {
        // candidate > 0.9 * last
        if candidate * 10 > last * 9 {
            round_half_up(last * 9, 10).min(last - 1)
        } else {
            candidate
        }
    } else if candidate * 10 < last * 11 {
        round_half_up(last * 11, 10).max(last + 1)
    } else {
        candidate
    };

    u32::try_from(next)
        .unwrap_or(u32::MAX)
        .max(MIN_VIDEO_BITRATE_KBPS)
}

/// True when the filters must be re-planned for a bitrate change: any
/// decrease, or an increase of more than 40%.
#[must_use]
pub fn needs_replan(previous_kbps: u32, next_kbps: u32) -> bool {
    next_kbps < previous_kbps || u64::from(next_kbps) * 10 > u64::from(previous_kbps) * 14
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_round_half_up() {
        assert_eq!(round_half_up(5, 2), 3);
        assert_eq!(round_half_up(4, 2), 2);
        assert_eq!(round_half_up(7, 3), 2);
        assert_eq!(round_half_up(1, 0), 0);
    }

    #[test]
    fn test_needs_replan() {
        assert!(needs_replan(500, 450));
        assert!(!needs_replan(500, 500));
        assert!(!needs_replan(500, 700));
        assert!(needs_replan(500, 701));
    }

    #[test]
    fn test_one_kbps_floor_holds_on_decrease() {
        assert_eq!(next_bitrate(1, 10_000, 1_000), 1);
        assert_eq!(next_bitrate(2, 10_000, 1_000), 1);
    }
}
