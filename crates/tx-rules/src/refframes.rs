//! Reference-frame budgets for hardware H.264 decoders.
//!
//! Device decoders cap the number of reference frames by resolution. The
//! table is ordered by decreasing height within each width tier; lookup
//! picks the first tuple whose width matches and whose height is at or
//! below the track's height, carrying the overridden budget forward as
//! height decreases.

/// (width, height, max reference frames), ordered by width then
/// decreasing height.
const REF_FRAME_LIMITS: &[(u32, u32, u32)] = &[
    (1920, 1080, 4),
    (1920, 864, 5),
    (1920, 720, 6),
    (1280, 720, 9),
    (1280, 640, 10),
    (1280, 588, 11),
    (1280, 540, 12),
    (1280, 498, 13),
    (1280, 462, 14),
    (1280, 432, 15),
    (1280, 405, 16),
];

/// Resolve the maximum allowed reference-frame count for a resolution.
///
/// Unknown widths fall back to the 1080p budget for exact 1920-wide video
/// and to the 720p-tier budget otherwise.
pub fn max_ref_frames(width: u32, height: u32) -> u32 {
    let mut max = if width == 1920 {
        REF_FRAME_LIMITS[0].2
    } else {
        REF_FRAME_LIMITS[3].2
    };

    for &(w, h, limit) in REF_FRAME_LIMITS {
        if w == width {
            if height >= h {
                return limit;
            }
            max = limit;
        }
    }

    max
}

/// Check a track against its budget. Returns whether the actual count
/// exceeds the resolved maximum, plus the maximum itself.
pub fn check(width: u32, height: u32, ref_frames: u32) -> (bool, u32) {
    let max = max_ref_frames(width, height);
    (ref_frames > max, max)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn full_hd_uses_first_tier() {
        assert_eq!(max_ref_frames(1920, 1080), 4);
    }

    #[test]
    fn cropped_hd_resolves_lower_tier() {
        assert_eq!(max_ref_frames(1920, 900), 5);
        assert_eq!(max_ref_frames(1920, 720), 6);
    }

    #[test]
    fn scope_crop_at_1280_resolves_deep_tier() {
        assert_eq!(max_ref_frames(1280, 462), 14);
        assert_eq!(max_ref_frames(1280, 405), 16);
    }

    #[test]
    fn height_between_tiers_takes_nearest_lower() {
        assert_eq!(max_ref_frames(1280, 500), 13);
    }

    #[test]
    fn height_below_all_tiers_keeps_last_budget() {
        assert_eq!(max_ref_frames(1280, 300), 16);
    }

    #[test]
    fn unknown_width_defaults() {
        assert_eq!(max_ref_frames(1440, 900), 9);
        assert_eq!(max_ref_frames(720, 576), 9);
    }

    #[test]
    fn budget_never_shrinks_as_height_decreases() {
        let mut prev = 0;
        for h in (300..=1080).rev() {
            let max = max_ref_frames(1280, h);
            assert!(max >= prev, "budget shrank at height {h}");
            prev = max;
        }
    }

    #[test]
    fn check_flags_overflow() {
        assert_eq!(check(1920, 1080, 4), (false, 4));
        assert_eq!(check(1920, 1080, 5), (true, 4));
        assert_eq!(check(1280, 720, 16), (true, 9));
    }
}
