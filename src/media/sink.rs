//! Clip output abstraction.
//!
//! A sink receives frames for exactly one clip. It rebases every
//! timestamp so the clip starts at zero, and becomes terminal once
//! finished.

use super::{Frame, MediaKind, PixelFormat, Rational};
use std::cell::RefCell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Errors that can occur while writing a clip.
#[derive(Debug, Error)]
pub enum SinkError {
    /// The sink cannot store this stream layout.
    #[error("unsupported output format: {0}")]
    UnsupportedFormat(String),
    /// A frame did not match the parameters the sink was opened with.
    #[error("frame does not match output stream: {0}")]
    FrameMismatch(String),
    /// `encode` or `finish` after `finish`.
    #[error("encode called after finish")]
    Finished,
    /// Writing the clip file failed.
    #[error("clip I/O error: {0}")]
    Io(#[from] std::io::Error),
}

/// Video stream parameters a sink is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct VideoParams {
    /// Width in pixels.
    pub width: u32,
    /// Height in pixels.
    pub height: u32,
    /// Pixel layout.
    pub format: PixelFormat,
    /// Nominal frame rate (frames per second).
    pub frame_rate: Rational,
    /// Time base of the video timestamps.
    pub time_base: Rational,
}

/// Audio stream parameters a sink is opened with.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AudioParams {
    /// Samples per second per channel.
    pub sample_rate: u32,
    /// Channel count.
    pub channels: u16,
    /// Time base of the audio timestamps.
    pub time_base: Rational,
}

/// Writes one clip.
pub trait Sink {
    /// Stages a frame for writing.
    ///
    /// The frame is only borrowed; its timestamp is rebased into the
    /// clip's zero-based epoch on the way out.
    fn encode(&mut self, frame: &Frame) -> Result<(), SinkError>;

    /// Flushes staged data and writes trailing metadata.
    ///
    /// Any later `encode` fails with [`SinkError::Finished`].
    fn finish(&mut self) -> Result<(), SinkError>;
}

/// Produces sinks bound to the parameters of an input.
pub trait SinkFactory {
    /// Opens a sink writing to `path`.
    fn create_sink(&self, path: &Path) -> Result<Box<dyn Sink>, SinkError>;

    /// Extension of the files produced by [`create_sink`](Self::create_sink).
    fn sink_extension(&self) -> &'static str;
}

/// Translates timestamps into a clip epoch anchored at the first frame seen.
///
/// The epoch is kept in the video time base so audio and video stay
/// aligned; each rebased timestamp is returned in its own stream's base.
#[derive(Debug, Clone)]
pub struct EpochRebaser {
    reference: Rational,
    epoch: Option<i64>,
}

impl EpochRebaser {
    /// Rebaser that has not seen a frame yet.
    pub fn new(reference: Rational) -> Self {
        Self {
            reference,
            epoch: None,
        }
    }

    /// Returns `pts` (in `time_base`) relative to the clip epoch.
    pub fn rebase(&mut self, pts: i64, time_base: Rational) -> i64 {
        let in_reference = Rational::rescale(pts, time_base, self.reference);
        let epoch = *self.epoch.get_or_insert(in_reference);
        Rational::rescale(in_reference - epoch, self.reference, time_base)
    }

    /// Epoch in the reference time base, once the first frame was seen.
    pub fn epoch(&self) -> Option<i64> {
        self.epoch
    }
}

/// Frame as recorded by a [`MemorySink`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodedFrame {
    /// Audio or video.
    pub kind: MediaKind,
    /// Timestamp the frame had in the input.
    pub source_pts: i64,
    /// Timestamp written to the clip.
    pub clip_pts: i64,
}

/// Everything a [`MemorySink`] received.
#[derive(Debug, Clone, Default)]
pub struct RecordedClip {
    /// Destination the sink was opened for.
    pub path: PathBuf,
    /// Frames in encode order.
    pub frames: Vec<EncodedFrame>,
    /// Whether `finish` was called.
    pub finished: bool,
}

/// Shared record of the clips written by [`MemorySink`]s.
pub type ClipLog = Rc<RefCell<Vec<RecordedClip>>>;

/// Sink that records what it was given instead of writing media.
pub struct MemorySink {
    log: ClipLog,
    index: usize,
    rebaser: EpochRebaser,
}

impl MemorySink {
    /// Opens a new clip entry in `log`.
    pub fn new(log: ClipLog, path: &Path, video_time_base: Rational) -> Self {
        let index = {
            let mut clips = log.borrow_mut();
            clips.push(RecordedClip {
                path: path.to_path_buf(),
                ..Default::default()
            });
            clips.len() - 1
        };

        Self {
            log,
            index,
            rebaser: EpochRebaser::new(video_time_base),
        }
    }
}

impl Sink for MemorySink {
    fn encode(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let mut clips = self.log.borrow_mut();
        let clip = &mut clips[self.index];
        if clip.finished {
            return Err(SinkError::Finished);
        }

        let clip_pts = self.rebaser.rebase(frame.pts(), frame.time_base());
        clip.frames.push(EncodedFrame {
            kind: frame.kind(),
            source_pts: frame.pts(),
            clip_pts,
        });
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let mut clips = self.log.borrow_mut();
        let clip = &mut clips[self.index];
        if clip.finished {
            return Err(SinkError::Finished);
        }
        clip.finished = true;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioSamples, VideoPicture};

    const VIDEO: Rational = Rational::new(1, 90_000);
    const AUDIO: Rational = Rational::new(1, 48_000);

    #[test]
    fn test_epoch_anchored_at_first_frame() {
        let mut rebaser = EpochRebaser::new(VIDEO);

        assert_eq!(rebaser.rebase(900_000, VIDEO), 0);
        assert_eq!(rebaser.epoch(), Some(900_000));
        assert_eq!(rebaser.rebase(903_000, VIDEO), 3000);

        // 10 s + 1/30 s of audio is 1600 samples past the epoch
        assert_eq!(rebaser.rebase(481_600, AUDIO), 1600);
    }

    #[test]
    fn test_audio_before_epoch_goes_negative() {
        let mut rebaser = EpochRebaser::new(VIDEO);
        rebaser.rebase(3000, VIDEO);

        assert_eq!(rebaser.rebase(0, AUDIO), -1600);
    }

    #[test]
    fn test_memory_sink_records_and_terminates() {
        let log = ClipLog::default();
        let mut sink = MemorySink::new(Rc::clone(&log), Path::new("/tmp/clip"), VIDEO);

        let video = Frame::video(6000, VIDEO, VideoPicture::yuv420p(4, 4));
        let audio = Frame::audio(3200, AUDIO, AudioSamples::silence(48_000, 1, 1600));

        sink.encode(&video).unwrap();
        sink.encode(&audio).unwrap();
        sink.finish().unwrap();

        assert!(matches!(sink.encode(&video), Err(SinkError::Finished)));

        let clips = log.borrow();
        assert_eq!(clips.len(), 1);
        assert!(clips[0].finished);
        assert_eq!(
            clips[0].frames,
            vec![
                EncodedFrame { kind: MediaKind::Video, source_pts: 6000, clip_pts: 0 },
                EncodedFrame { kind: MediaKind::Audio, source_pts: 3200, clip_pts: 0 },
            ]
        );
    }
}
