use frame_motion_common::frame::{FrameView, BYTES_PER_PIXEL};
use tracing::warn;

/// Rec. 601 luma of one pixel.
#[inline]
pub fn luma(b: u8, g: u8, r: u8) -> f64 {
    0.299 * f64::from(r) + 0.587 * f64::from(g) + 0.114 * f64::from(b)
}

/// Signed mean luma change from `a` to `b`.
///
/// Per-pixel differences `luma(b) - luma(a)` are accumulated with their
/// sign and divided by the pixel count, so uniform brightening or darkening
/// shows up in full while symmetric noise largely cancels out. Row padding
/// is never read.
///
/// Returns `None` when the two frames differ in width, height or stride.
pub fn mean_luma_delta(a: &FrameView<'_>, b: &FrameView<'_>) -> Option<f64> {
    if !a.same_geometry(b) {
        warn!(
            a_width = a.width(),
            a_height = a.height(),
            a_stride = a.bytes_per_row(),
            b_width = b.width(),
            b_height = b.height(),
            b_stride = b.bytes_per_row(),
            "frame geometry mismatch, comparison skipped"
        );
        return None;
    }

    let mut diff_sum = 0.0f64;
    for y in 0..a.height() {
        for (pa, pb) in a
            .row(y)
            .chunks_exact(BYTES_PER_PIXEL)
            .zip(b.row(y).chunks_exact(BYTES_PER_PIXEL))
        {
            diff_sum += luma(pb[0], pb[1], pb[2]) - luma(pa[0], pa[1], pa[2]);
        }
    }

    Some(diff_sum / a.geometry().pixel_count() as f64)
}

/// Difference score between two frames: `|mean_luma_delta - baseline|`.
///
/// A geometry mismatch yields exactly `0.0`; the baseline is not applied
/// in that case.
pub fn luminance_delta(a: &FrameView<'_>, b: &FrameView<'_>, baseline: f64) -> f64 {
    match mean_luma_delta(a, b) {
        Some(mean) => (mean - baseline).abs(),
        None => 0.0,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use frame_motion_common::frame::Frame;

    const EPS: f64 = 1e-9;

    fn gray(width: usize, height: usize, stride: usize, v: u8) -> Frame {
        Frame::solid(width, height, stride, [v, v, v, 255]).unwrap()
    }

    /// Deterministic non-uniform test pattern.
    fn textured(width: usize, height: usize, stride: usize, offset: u8) -> Frame {
        let mut frame = gray(width, height, stride, 0);
        let data = frame.data_mut();
        for y in 0..height {
            for x in 0..width {
                let idx = y * stride + x * 4;
                data[idx] = ((x * 7 + y * 3) % 200) as u8 + offset;
                data[idx + 1] = ((x * 5 + y * 11) % 200) as u8 + offset;
                data[idx + 2] = ((x * 13 + y) % 200) as u8 + offset;
                data[idx + 3] = 255;
            }
        }
        frame
    }

    #[test]
    fn luma_weights() {
        assert!((luma(0, 0, 255) - 0.299 * 255.0).abs() < EPS);
        assert!((luma(0, 255, 0) - 0.587 * 255.0).abs() < EPS);
        assert!((luma(255, 0, 0) - 0.114 * 255.0).abs() < EPS);
        assert!((luma(100, 100, 100) - 100.0).abs() < EPS);
    }

    #[test]
    fn identical_frames_score_baseline_magnitude() {
        let a = textured(16, 8, 80, 0);
        let b = a.clone();
        assert_eq!(luminance_delta(&a.view(), &b.view(), 0.0), 0.0);
        assert!((luminance_delta(&a.view(), &b.view(), 3.5) - 3.5).abs() < EPS);
        assert!((luminance_delta(&a.view(), &b.view(), -2.0) - 2.0).abs() < EPS);
    }

    #[test]
    fn constant_shift_equals_mean_delta() {
        for (w, h) in [(1, 1), (7, 3), (40, 30)] {
            let stride = w * 4 + 12;
            let a = textured(w, h, stride, 0);
            let b = textured(w, h, stride, 25);
            let raw = mean_luma_delta(&a.view(), &b.view()).unwrap();
            assert!((raw - 25.0).abs() < 1e-6, "{w}x{h}: raw = {raw}");
        }
    }

    #[test]
    fn raw_delta_is_antisymmetric() {
        let a = textured(20, 10, 96, 0);
        let b = textured(20, 10, 96, 40);
        let ab = mean_luma_delta(&a.view(), &b.view()).unwrap();
        let ba = mean_luma_delta(&b.view(), &a.view()).unwrap();
        assert!((ab + ba).abs() < EPS);
    }

    #[test]
    fn score_symmetric_only_without_baseline() {
        let a = gray(8, 8, 32, 100);
        let b = gray(8, 8, 32, 110);
        assert!(
            (luminance_delta(&a.view(), &b.view(), 0.0) - luminance_delta(&b.view(), &a.view(), 0.0))
                .abs()
                < EPS
        );
        let forward = luminance_delta(&a.view(), &b.view(), 4.0);
        let backward = luminance_delta(&b.view(), &a.view(), 4.0);
        assert!((forward - 6.0).abs() < 1e-6);
        assert!((backward - 14.0).abs() < 1e-6);
    }

    #[test]
    fn geometry_mismatch_scores_zero() {
        let a = gray(640, 480, 2560, 10);
        let b = gray(320, 240, 1280, 200);
        assert_eq!(luminance_delta(&a.view(), &b.view(), 0.0), 0.0);
        assert_eq!(luminance_delta(&a.view(), &b.view(), 12.0), 0.0);
        assert!(mean_luma_delta(&a.view(), &b.view()).is_none());
    }

    #[test]
    fn stride_mismatch_scores_zero() {
        let a = gray(64, 64, 256, 10);
        let b = gray(64, 64, 320, 200);
        assert_eq!(luminance_delta(&a.view(), &b.view(), 0.0), 0.0);
    }

    #[test]
    fn padding_bytes_are_ignored() {
        let a = gray(4, 4, 32, 50);
        let mut b = a.clone();
        // scribble over the padding of every row
        for y in 0..4 {
            for byte in &mut b.data_mut()[y * 32 + 16..(y + 1) * 32] {
                *byte = 0xFF;
            }
        }
        assert_eq!(luminance_delta(&a.view(), &b.view(), 0.0), 0.0);
    }

    #[test]
    fn brighten_and_darken_both_count() {
        let a = gray(64, 64, 256, 100);
        let b = gray(64, 64, 256, 150);
        assert!((luminance_delta(&a.view(), &b.view(), 0.0) - 50.0).abs() < 1e-6);
        assert!((luminance_delta(&b.view(), &a.view(), 0.0) - 50.0).abs() < 1e-6);
        assert!((luminance_delta(&a.view(), &b.view(), 50.0)).abs() < 1e-6);
    }
}
