//! Diagnostic marker for interesting frames.
//!
//! Paints a red box into the chroma planes near the top-right corner.
//! Luma is untouched, so marking never feeds back into differencing.

use crate::media::VideoPicture;

const PADDING: usize = 10;
const BOX_SIDE: usize = 25;

/// Marks `picture`; returns false if it is too small or not planar 4:2:0.
pub fn mark_interesting(picture: &mut VideoPicture) -> bool {
    let (width, height) = (picture.width() as usize, picture.height() as usize);

    if !picture.format().is_planar_yuv420() || width <= 2 * PADDING + BOX_SIDE || height <= 2 * PADDING + BOX_SIDE {
        return false;
    }

    let rows = (PADDING / 2)..(PADDING + BOX_SIDE).div_ceil(2);
    let columns = (width - PADDING - BOX_SIDE) / 2..(width - PADDING).div_ceil(2);

    for (plane, value) in [(1, 0u8), (2, 255u8)] {
        if let Some(plane) = picture.plane_mut(plane) {
            for y in rows.clone() {
                plane.row_mut(y)[columns.clone()].fill(value);
            }
        }
    }

    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_marks_chroma_only() {
        let mut picture = VideoPicture::yuv420p(160, 120);
        picture.fill_luma(77);
        let luma_before = picture.luma().clone();

        assert!(mark_interesting(&mut picture));

        assert_eq!(picture.luma(), &luma_before);
        let u = &picture.planes()[1];
        let v = &picture.planes()[2];
        // Inside the box (luma x = 140, y = 20)
        assert_eq!(u.row(10)[70], 0);
        assert_eq!(v.row(10)[70], 255);
        // Outside it
        assert_eq!(u.row(30)[70], 128);
        assert_eq!(v.row(10)[10], 128);
    }

    #[test]
    fn test_small_picture_skipped() {
        let mut picture = VideoPicture::yuv420p(40, 40);
        let before = picture.clone();

        assert!(!mark_interesting(&mut picture));
        assert_eq!(picture, before);
    }
}
