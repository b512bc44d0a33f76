//! Decoded media frames.

use super::Rational;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::rc::Rc;

/// Shared handle to a frame.
///
/// The pre-roll ring, the previous-frame slot and an active clip may all
/// hold the same frame; it is released when the last handle drops.
pub type SharedFrame = Rc<Frame>;

/// Kind of media a frame carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MediaKind {
    /// Picture data.
    Video,
    /// Sample data.
    Audio,
}

impl fmt::Display for MediaKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            MediaKind::Video => f.write_str("video"),
            MediaKind::Audio => f.write_str("audio"),
        }
    }
}

/// Pixel layout of a video picture.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PixelFormat {
    /// Planar 8-bit Y, U, V with 2x2 chroma subsampling.
    Yuv420p,
    /// 8-bit Y plane followed by one interleaved UV plane.
    Nv12,
}

impl PixelFormat {
    /// True for layouts with a directly addressable 8-bit luma plane and
    /// separate U and V planes.
    pub fn is_planar_yuv420(&self) -> bool {
        matches!(self, PixelFormat::Yuv420p)
    }
}

/// One image plane.
#[derive(Clone, PartialEq, Eq)]
pub struct Plane {
    data: Vec<u8>,
    /// Bytes from the start of one row to the next.
    stride: usize,
    width: usize,
    height: usize,
}

impl Plane {
    /// Creates a tightly packed plane filled with `value`.
    pub fn filled(width: usize, height: usize, value: u8) -> Self {
        Self {
            data: vec![value; width * height],
            stride: width,
            width,
            height,
        }
    }

    /// Wraps existing bytes; `stride` may exceed `width` for padded rows.
    pub fn from_bytes(data: Vec<u8>, width: usize, height: usize, stride: usize) -> Self {
        Self {
            data,
            stride,
            width,
            height,
        }
    }

    /// Samples per row that carry pixels.
    #[inline]
    pub fn width(&self) -> usize {
        self.width
    }

    /// Number of rows.
    #[inline]
    pub fn height(&self) -> usize {
        self.height
    }

    /// Bytes from the start of one row to the next.
    #[inline]
    pub fn stride(&self) -> usize {
        self.stride
    }

    /// Returns the visible samples of row `y`.
    #[inline]
    pub fn row(&self, y: usize) -> &[u8] {
        let start = y * self.stride;
        &self.data[start..start + self.width]
    }

    /// Mutable pixel samples of row `y`.
    #[inline]
    pub fn row_mut(&mut self, y: usize) -> &mut [u8] {
        let start = y * self.stride;
        &mut self.data[start..start + self.width]
    }

    /// True when the buffer covers every row at the declared stride.
    pub fn is_valid(&self) -> bool {
        self.stride >= self.width
            && (self.height == 0 || self.data.len() >= (self.height - 1) * self.stride + self.width)
    }
}

impl fmt::Debug for Plane {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Plane")
            .field("width", &self.width)
            .field("height", &self.height)
            .field("stride", &self.stride)
            .finish()
    }
}

/// A decoded video picture.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VideoPicture {
    width: u32,
    height: u32,
    format: PixelFormat,
    planes: Vec<Plane>,
}

impl VideoPicture {
    /// Allocates a black YUV 4:2:0 picture.
    pub fn yuv420p(width: u32, height: u32) -> Self {
        let (w, h) = (width as usize, height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        Self {
            width,
            height,
            format: PixelFormat::Yuv420p,
            planes: vec![Plane::filled(w, h, 16), Plane::filled(cw, ch, 128), Plane::filled(cw, ch, 128)],
        }
    }

    /// Assembles a picture from planes already laid out for `format`.
    pub fn from_planes(width: u32, height: u32, format: PixelFormat, planes: Vec<Plane>) -> Self {
        Self {
            width,
            height,
            format,
            planes,
        }
    }

    /// Width in pixels.
    #[inline]
    pub fn width(&self) -> u32 {
        self.width
    }

    /// Height in pixels.
    #[inline]
    pub fn height(&self) -> u32 {
        self.height
    }

    /// Pixel layout of the planes.
    #[inline]
    pub fn format(&self) -> PixelFormat {
        self.format
    }

    /// All planes, luma first.
    #[inline]
    pub fn planes(&self) -> &[Plane] {
        &self.planes
    }

    /// Returns the luma plane.
    #[inline]
    pub fn luma(&self) -> &Plane {
        &self.planes[0]
    }

    /// Mutable luma plane.
    #[inline]
    pub fn luma_mut(&mut self) -> &mut Plane {
        &mut self.planes[0]
    }

    /// Returns plane `index`, if present.
    pub fn plane_mut(&mut self, index: usize) -> Option<&mut Plane> {
        self.planes.get_mut(index)
    }

    /// Fills the whole luma plane with `value`.
    pub fn fill_luma(&mut self, value: u8) {
        let luma = self.luma_mut();
        for y in 0..luma.height() {
            luma.row_mut(y).fill(value);
        }
    }

    /// Validates that the plane layout matches the declared format and size.
    ///
    /// Every plane must hold all of its rows, and each plane must be at
    /// least as large as the format requires for the picture dimensions.
    pub fn is_valid(&self) -> bool {
        let (w, h) = (self.width as usize, self.height as usize);
        let (cw, ch) = (w.div_ceil(2), h.div_ceil(2));
        let required: &[(usize, usize)] = match self.format {
            PixelFormat::Yuv420p => &[(w, h), (cw, ch), (cw, ch)],
            PixelFormat::Nv12 => &[(w, h), (2 * cw, ch)],
        };

        self.planes.len() == required.len()
            && self
                .planes
                .iter()
                .zip(required)
                .all(|(plane, &(min_w, min_h))| plane.is_valid() && plane.width() >= min_w && plane.height() >= min_h)
    }
}

/// Interleaved signed 16-bit audio samples.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AudioSamples {
    sample_rate: u32,
    channels: u16,
    data: Vec<i16>,
}

impl AudioSamples {
    /// Wraps interleaved samples.
    pub fn new(sample_rate: u32, channels: u16, data: Vec<i16>) -> Self {
        Self {
            sample_rate,
            channels: channels.max(1),
            data,
        }
    }

    /// Creates `samples` samples per channel of silence.
    pub fn silence(sample_rate: u32, channels: u16, samples: usize) -> Self {
        Self::new(sample_rate, channels, vec![0; samples * channels.max(1) as usize])
    }

    /// Samples per second per channel.
    #[inline]
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Interleaved channel count.
    #[inline]
    pub fn channels(&self) -> u16 {
        self.channels
    }

    /// Interleaved samples.
    #[inline]
    pub fn data(&self) -> &[i16] {
        &self.data
    }

    /// Samples per channel.
    #[inline]
    pub fn sample_count(&self) -> usize {
        self.data.len() / self.channels as usize
    }
}

/// Frame contents by media kind.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FramePayload {
    /// A decoded picture.
    Video(VideoPicture),
    /// Decoded PCM samples.
    Audio(AudioSamples),
}

/// A decoded, timestamped unit of media.
#[derive(Clone, PartialEq, Eq)]
pub struct Frame {
    /// Presentation timestamp in ticks of `time_base`.
    pts: i64,
    time_base: Rational,
    payload: FramePayload,
}

impl Frame {
    /// Video frame at `pts` ticks of `time_base`.
    pub fn video(pts: i64, time_base: Rational, picture: VideoPicture) -> Self {
        Self {
            pts,
            time_base,
            payload: FramePayload::Video(picture),
        }
    }

    /// Audio frame at `pts` ticks of `time_base`.
    pub fn audio(pts: i64, time_base: Rational, samples: AudioSamples) -> Self {
        Self {
            pts,
            time_base,
            payload: FramePayload::Audio(samples),
        }
    }

    /// Presentation timestamp in ticks of [`Frame::time_base`].
    #[inline]
    pub fn pts(&self) -> i64 {
        self.pts
    }

    /// Returns the time base of the stream this frame came from.
    #[inline]
    pub fn time_base(&self) -> Rational {
        self.time_base
    }

    /// Whether this is audio or video.
    #[inline]
    pub fn kind(&self) -> MediaKind {
        match self.payload {
            FramePayload::Video(_) => MediaKind::Video,
            FramePayload::Audio(_) => MediaKind::Audio,
        }
    }

    /// Shorthand for `kind() == MediaKind::Audio`.
    #[inline]
    pub fn is_audio(&self) -> bool {
        self.kind() == MediaKind::Audio
    }

    /// The picture or samples.
    #[inline]
    pub fn payload(&self) -> &FramePayload {
        &self.payload
    }

    /// The picture, for video frames.
    pub fn as_video(&self) -> Option<&VideoPicture> {
        match &self.payload {
            FramePayload::Video(picture) => Some(picture),
            FramePayload::Audio(_) => None,
        }
    }

    /// Mutable picture, for video frames.
    pub fn as_video_mut(&mut self) -> Option<&mut VideoPicture> {
        match &mut self.payload {
            FramePayload::Video(picture) => Some(picture),
            FramePayload::Audio(_) => None,
        }
    }

}

impl fmt::Debug for Frame {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let mut s = f.debug_struct("Frame");
        s.field("kind", &self.kind())
            .field("pts", &self.pts)
            .field("time_base", &format_args!("{}", self.time_base));

        match &self.payload {
            FramePayload::Video(picture) => s
                .field("width", &picture.width())
                .field("height", &picture.height())
                .field("format", &picture.format()),
            FramePayload::Audio(samples) => s
                .field("sample_rate", &samples.sample_rate())
                .field("samples", &samples.sample_count()),
        };

        s.finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_yuv420p_layout() {
        let picture = VideoPicture::yuv420p(641, 480);

        assert!(picture.is_valid());
        assert_eq!(picture.planes().len(), 3);
        assert_eq!(picture.luma().width(), 641);
        // Odd widths round the chroma plane up
        assert_eq!(picture.planes()[1].width(), 321);
        assert_eq!(picture.planes()[1].height(), 240);
    }

    #[test]
    fn test_padded_rows() {
        let plane = Plane::from_bytes((0..12).collect(), 3, 3, 4);
        assert!(plane.is_valid());
        assert_eq!(plane.row(1), &[4, 5, 6]);
        assert_eq!(plane.row(2), &[8, 9, 10]);
    }

    #[test]
    fn test_short_plane_invalid() {
        let plane = Plane::from_bytes(vec![0; 10], 4, 4, 4);
        assert!(!plane.is_valid());
    }

    #[test]
    fn test_short_planes_make_picture_invalid() {
        let short_luma = VideoPicture::from_planes(
            64,
            48,
            PixelFormat::Yuv420p,
            vec![Plane::filled(64, 10, 16), Plane::filled(32, 24, 128), Plane::filled(32, 24, 128)],
        );
        assert!(!short_luma.is_valid());

        let short_chroma = VideoPicture::from_planes(
            64,
            48,
            PixelFormat::Yuv420p,
            vec![Plane::filled(64, 48, 16), Plane::filled(32, 4, 128), Plane::filled(32, 24, 128)],
        );
        assert!(!short_chroma.is_valid());

        let missing_plane =
            VideoPicture::from_planes(64, 48, PixelFormat::Yuv420p, vec![Plane::filled(64, 48, 16)]);
        assert!(!missing_plane.is_valid());
    }

    #[test]
    fn test_frame_kind() {
        let video = Frame::video(3000, Rational::new(1, 90_000), VideoPicture::yuv420p(8, 8));
        let audio = Frame::audio(1600, Rational::new(1, 48_000), AudioSamples::silence(48_000, 1, 1600));

        assert_eq!(video.kind(), MediaKind::Video);
        assert!(video.as_video().is_some());
        assert!(audio.is_audio());
        assert!(matches!(audio.payload(), FramePayload::Audio(samples) if samples.sample_count() == 1600));
    }
}
