//! Pure projections of countdown state for rendering.

/// Fraction of the session elapsed, clamped to `[0, 1]`.
///
/// Returns 0 when `total` is 0.
pub fn project(remaining: u32, total: u32) -> f64 {
    if total == 0 {
        return 0.0;
    }
    let elapsed = f64::from(total) - f64::from(remaining);
    (elapsed / f64::from(total)).clamp(0.0, 1.0)
}

/// Stroke dash offset for a progress ring of the given circumference.
///
/// A full offset hides the stroke; zero draws the complete ring.
pub fn ring_dash_offset(circumference: f64, ratio: f64) -> f64 {
    circumference * (1.0 - ratio.clamp(0.0, 1.0))
}

/// Format seconds as `m:ss`.
pub fn format_clock(seconds: u32) -> String {
    format!("{}:{:02}", seconds / 60, seconds % 60)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn endpoints() {
        assert_eq!(project(300, 300), 0.0);
        assert_eq!(project(0, 300), 1.0);
        assert_eq!(project(150, 300), 0.5);
    }

    #[test]
    fn zero_total_is_zero() {
        assert_eq!(project(0, 0), 0.0);
        assert_eq!(project(10, 0), 0.0);
    }

    #[test]
    fn clamps_when_remaining_exceeds_total() {
        assert_eq!(project(400, 300), 0.0);
    }

    #[test]
    fn monotonic_as_remaining_falls() {
        let total = 600;
        let mut last = project(total, total);
        for remaining in (0..total).rev() {
            let ratio = project(remaining, total);
            assert!(ratio >= last);
            last = ratio;
        }
        assert_eq!(last, 1.0);
    }

    #[test]
    fn ring_offset_tracks_ratio() {
        assert_eq!(ring_dash_offset(283.0, 0.0), 283.0);
        assert_eq!(ring_dash_offset(283.0, 1.0), 0.0);
        assert_eq!(ring_dash_offset(200.0, 0.25), 150.0);
        assert_eq!(ring_dash_offset(200.0, 3.0), 0.0);
    }

    #[test]
    fn clock_formatting() {
        assert_eq!(format_clock(600), "10:00");
        assert_eq!(format_clock(65), "1:05");
        assert_eq!(format_clock(9), "0:09");
        assert_eq!(format_clock(0), "0:00");
    }
}
