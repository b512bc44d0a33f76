//! Luma frame differencing.
//!
//! Compares two equally sized pictures sample by sample and summarizes
//! the absolute luma differences as a histogram. Rows above a configured
//! start row are skipped so an on-screen clock or caption band never
//! counts as motion.

use crate::media::{Frame, PixelFormat, VideoPicture};
use std::fmt;
use thiserror::Error;

/// Differencing precondition failures.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DifferenceError {
    /// Width and height of the previous and current pictures.
    #[error("frame dimensions differ: {0}x{1} vs {2}x{3}")]
    DimensionMismatch(u32, u32, u32, u32),
    /// Previous and current pixel formats.
    #[error("pixel formats differ: {0:?} vs {1:?}")]
    FormatMismatch(PixelFormat, PixelFormat),
    /// Only planar YUV 4:2:0 is differenced.
    #[error("differencing requires a planar yuv420p picture, got {0:?}")]
    UnsupportedFormat(PixelFormat),
    /// One of the frames carries audio.
    #[error("differencing requires video frames")]
    NotVideo,
    /// Map dimensions, then picture dimensions.
    #[error("difference map is {0}x{1}, frame is {2}x{3}")]
    MapMismatch(usize, usize, u32, u32),
}

/// Histogram of absolute luma differences.
///
/// Bucket `i` counts differences in `[i * width, (i + 1) * width)`.
#[derive(Clone, PartialEq, Eq)]
pub struct DifferenceHistogram {
    buckets: Vec<u32>,
    bucket_width: u8,
    examined: u64,
}

impl DifferenceHistogram {
    /// Creates an empty histogram; a bucket width of zero is clamped to one.
    pub fn new(bucket_width: u8) -> Self {
        let bucket_width = bucket_width.max(1);
        Self {
            buckets: vec![0; u8::MAX as usize / bucket_width as usize + 1],
            bucket_width,
            examined: 0,
        }
    }

    /// Records one difference value.
    #[inline]
    pub fn increment(&mut self, difference: u8) {
        self.buckets[(difference / self.bucket_width) as usize] += 1;
        self.examined += 1;
    }

    /// Difference range covered by each bucket.
    #[inline]
    pub fn bucket_width(&self) -> u8 {
        self.bucket_width
    }

    /// Per-bucket counts, lowest differences first.
    #[inline]
    pub fn buckets(&self) -> &[u32] {
        &self.buckets
    }

    /// Number of samples examined; always the sum of all buckets.
    #[inline]
    pub fn examined(&self) -> u64 {
        self.examined
    }

    /// Lowest difference value a bucket covers.
    #[inline]
    fn representative(&self, bucket: usize) -> u8 {
        (bucket * self.bucket_width as usize) as u8
    }

    /// Sums the buckets whose representative value satisfies `predicate`.
    pub fn count_where(&self, mut predicate: impl FnMut(u8) -> bool) -> u32 {
        self.buckets
            .iter()
            .enumerate()
            .filter(|&(i, _)| predicate(self.representative(i)))
            .map(|(_, &count)| count)
            .sum()
    }

    /// Samples whose bucket starts at or above `threshold`.
    pub fn count_at_least(&self, threshold: u8) -> u32 {
        self.count_where(|value| value >= threshold)
    }
}

impl fmt::Display for DifferenceHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (i, &count) in self.buckets.iter().enumerate() {
            if count > 0 {
                let low = i * self.bucket_width as usize;
                let high = (low + self.bucket_width as usize - 1).min(u8::MAX as usize);
                write!(f, "{} - {}: {}, ", low, high, count)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for DifferenceHistogram {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DifferenceHistogram")
            .field("bucket_width", &self.bucket_width)
            .field("examined", &self.examined)
            .field("buckets", &format_args!("{}", self))
            .finish()
    }
}

/// Per-pixel absolute luma differences of the last comparison.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DifferenceMap {
    data: Vec<u8>,
    width: usize,
    height: usize,
}

impl DifferenceMap {
    /// Zeroed map of `width` by `height` samples.
    pub fn new(width: usize, height: usize) -> Self {
        Self {
            data: vec![0; width * height],
            width,
            height,
        }
    }

    /// Sized for pictures like `picture`.
    pub fn for_picture(picture: &VideoPicture) -> Self {
        Self::new(picture.width() as usize, picture.height() as usize)
    }

    /// Samples per row.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Row-major samples, `width` per row.
    #[inline]
    pub fn data(&self) -> &[u8] {
        &self.data
    }

    /// Row `y` of the map.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        &self.data[y * self.width..(y + 1) * self.width]
    }

    /// Whether the map has the dimensions of `picture`.
    pub fn matches(&self, picture: &VideoPicture) -> bool {
        self.width == picture.width() as usize && self.height == picture.height() as usize
    }
}

/// Differences the luma planes of two video frames.
pub fn difference_frames(
    previous: &Frame,
    current: &Frame,
    start_row: usize,
    bucket_width: u8,
    map: Option<&mut DifferenceMap>,
) -> Result<DifferenceHistogram, DifferenceError> {
    let previous = previous.as_video().ok_or(DifferenceError::NotVideo)?;
    let current = current.as_video().ok_or(DifferenceError::NotVideo)?;
    difference(previous, current, start_row, bucket_width, map)
}

/// Differences the luma planes of two pictures.
///
/// Every sample from `start_row` to the last row is examined. When `map`
/// is given, each examined difference is also stored at the same
/// position.
pub fn difference(
    previous: &VideoPicture,
    current: &VideoPicture,
    start_row: usize,
    bucket_width: u8,
    mut map: Option<&mut DifferenceMap>,
) -> Result<DifferenceHistogram, DifferenceError> {
    if previous.format() != current.format() {
        return Err(DifferenceError::FormatMismatch(previous.format(), current.format()));
    }
    if !current.format().is_planar_yuv420() {
        return Err(DifferenceError::UnsupportedFormat(current.format()));
    }
    if previous.width() != current.width() || previous.height() != current.height() {
        return Err(DifferenceError::DimensionMismatch(
            previous.width(),
            previous.height(),
            current.width(),
            current.height(),
        ));
    }
    if let Some(map) = map.as_deref() {
        if !map.matches(current) {
            return Err(DifferenceError::MapMismatch(
                map.width(),
                map.height(),
                current.width(),
                current.height(),
            ));
        }
    }

    let mut histogram = DifferenceHistogram::new(bucket_width);
    let (before, after) = (previous.luma(), current.luma());
    let width = current.width() as usize;

    for y in start_row..current.height() as usize {
        let row_a = before.row(y);
        let row_b = after.row(y);

        match map.as_deref_mut() {
            Some(map) => {
                let out = &mut map.data[y * width..(y + 1) * width];
                for ((&a, &b), out) in row_a.iter().zip(row_b).zip(out) {
                    let d = a.abs_diff(b);
                    histogram.increment(d);
                    *out = d;
                }
            }
            None => {
                for (&a, &b) in row_a.iter().zip(row_b) {
                    histogram.increment(a.abs_diff(b));
                }
            }
        }
    }

    Ok(histogram)
}
