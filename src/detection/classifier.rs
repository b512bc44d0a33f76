//! Three-stage motion hysteresis.
//!
//! 1. A pixel counts as different when its luma changes by at least the
//!    noise threshold, discarding sensor noise.
//! 2. A frame is interesting when enough pixels differ, discarding
//!    leaves in the wind and passing birds.
//! 3. Motion is active when enough of the recent frames were
//!    interesting, discarding transient dazzle. A pending manual trigger
//!    forces motion on.

use super::difference::{difference_frames, DifferenceError, DifferenceHistogram, DifferenceMap};
use crate::buffer::BoundedRing;
use crate::config::DetectionConfig;
use crate::media::Frame;

/// Outcome of classifying one frame against its predecessor.
#[derive(Debug, Clone)]
pub struct Classification {
    /// Difference histogram for the examined rows.
    pub histogram: DifferenceHistogram,
    /// Pixels at or above the noise threshold.
    pub differing_pixels: u32,
    /// Stage two: enough pixels differed.
    pub interesting: bool,
    /// Interesting frames currently in the window, this one included.
    pub interesting_in_window: usize,
    /// A manual trigger forced motion on for this frame.
    pub manual: bool,
    /// Stage three result, manual override included.
    pub motion_active: bool,
}

/// Turns frame differences into a motion-active decision.
pub struct MotionClassifier {
    config: DetectionConfig,
    window: BoundedRing<bool>,
    frames_classified: u64,
}

impl MotionClassifier {
    /// Creates a classifier with an empty window.
    pub fn new(config: DetectionConfig) -> Self {
        Self {
            window: BoundedRing::new(config.window_frames),
            config,
            frames_classified: 0,
        }
    }

    /// Classifies `current` against `previous`.
    ///
    /// `manual` is the state of the manual trigger for this frame.
    pub fn classify(
        &mut self,
        previous: &Frame,
        current: &Frame,
        manual: bool,
        map: Option<&mut DifferenceMap>,
    ) -> Result<Classification, DifferenceError> {
        let histogram = difference_frames(
            previous,
            current,
            self.config.start_row,
            self.config.bucket_width,
            map,
        )?;

        let differing_pixels = histogram.count_at_least(self.config.noise_threshold);
        let interesting = differing_pixels >= self.config.min_differing_pixels;
        let motion_active = self.observe(interesting, manual);

        Ok(Classification {
            histogram,
            differing_pixels,
            interesting,
            interesting_in_window: self.interesting_in_window(),
            manual,
            motion_active,
        })
    }

    /// Pushes one interesting flag into the window and returns whether
    /// motion is active.
    pub fn observe(&mut self, interesting: bool, manual: bool) -> bool {
        self.window.append(interesting);
        self.frames_classified += 1;
        self.interesting_in_window() >= self.config.min_interesting_frames || manual
    }

    /// Interesting frames currently held in the window.
    pub fn interesting_in_window(&self) -> usize {
        self.window.count_where(|&flag| flag)
    }

    /// Frames classified so far.
    pub fn frames_classified(&self) -> u64 {
        self.frames_classified
    }

    /// The tuning in use.
    pub fn config(&self) -> &DetectionConfig {
        &self.config
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{Rational, VideoPicture};

    fn frame(pts: i64, luma: u8) -> Frame {
        let mut picture = VideoPicture::yuv420p(64, 48);
        picture.fill_luma(luma);
        Frame::video(pts, Rational::new(1, 30), picture)
    }

    #[test]
    fn test_window_hysteresis() {
        let mut classifier = MotionClassifier::new(DetectionConfig::default());
        let flags = [false, true, false, true, false, false, true, false, false, false];

        let active: Vec<bool> = flags.iter().map(|&f| classifier.observe(f, false)).collect();

        // Active from the third true onwards
        assert_eq!(
            active,
            vec![false, false, false, false, false, false, true, true, true, true]
        );

        // The first true (index 1) leaves the window on the 12th frame
        assert!(classifier.observe(false, false));
        assert!(!classifier.observe(false, false));
    }

    #[test]
    fn test_manual_forces_motion() {
        let mut classifier = MotionClassifier::new(DetectionConfig::default());
        assert!(classifier.observe(false, true));
        assert!(!classifier.observe(false, false));
    }

    #[test]
    fn test_noise_is_not_interesting() {
        let mut classifier = MotionClassifier::new(DetectionConfig::default());

        // A 30-level change stays below the 40-level noise threshold
        let result = classifier.classify(&frame(0, 100), &frame(1, 130), false, None).unwrap();
        assert_eq!(result.differing_pixels, 0);
        assert!(!result.interesting);
        assert!(!result.motion_active);
    }

    #[test]
    fn test_large_change_is_interesting() {
        let mut classifier = MotionClassifier::new(DetectionConfig::default());

        let result = classifier.classify(&frame(0, 100), &frame(1, 160), false, None).unwrap();
        assert_eq!(result.differing_pixels, 64 * (48 - 25));
        assert!(result.interesting);
        assert_eq!(result.interesting_in_window, 1);
        assert!(!result.motion_active);
    }

    #[test]
    fn test_few_differing_pixels_not_interesting() {
        let config = DetectionConfig::default();
        let mut classifier = MotionClassifier::new(config.clone());

        let previous = frame(0, 100);
        let mut current = previous.clone();
        let picture = current.as_video_mut().unwrap();
        // One short of the pixel-count threshold
        picture.luma_mut().row_mut(30)[..(config.min_differing_pixels as usize - 1)].fill(200);

        let result = classifier.classify(&previous, &current, false, None).unwrap();
        assert_eq!(result.differing_pixels, config.min_differing_pixels - 1);
        assert!(!result.interesting);
    }

    #[test]
    fn test_mismatched_frames_fail() {
        let mut classifier = MotionClassifier::new(DetectionConfig::default());
        let small = Frame::video(1, Rational::new(1, 30), VideoPicture::yuv420p(32, 32));

        let result = classifier.classify(&frame(0, 0), &small, false, None);
        assert!(matches!(result, Err(DifferenceError::DimensionMismatch(..))));
        assert_eq!(classifier.frames_classified(), 0);
    }
}
