//! Input abstraction.
//!
//! A source yields decoded frames from one video and one audio track in
//! presentation order, and knows how to open sinks that match its
//! streams.

use super::sink::{ClipLog, MemorySink, Sink, SinkError, SinkFactory};
use super::{Frame, MediaKind, PixelFormat, Rational};
use std::collections::VecDeque;
use std::path::Path;
use thiserror::Error;

/// Errors that can occur while opening or reading an input.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The input could not be opened.
    #[error("failed to open input {specifier}: {reason}")]
    OpenFailed {
        /// Input as given on the command line.
        specifier: String,
        /// Why it failed.
        reason: String,
    },
    /// The input lacks an audio or video track.
    #[error("input has no usable {0} track")]
    MissingTrack(MediaKind),
    /// Pictures are not planar YUV 4:2:0.
    #[error("unsupported pixel format {0:?}: planar yuv420p is required")]
    UnsupportedPixelFormat(PixelFormat),
    /// A picture's planes are smaller than its dimensions require.
    #[error("malformed {width}x{height} {format:?} picture: planes do not cover the frame")]
    MalformedPicture {
        /// Declared width.
        width: u32,
        /// Declared height.
        height: u32,
        /// Declared layout.
        format: PixelFormat,
    },
    /// The input produced an unreadable frame.
    #[error("failed to decode frame: {0}")]
    DecodeFailed(String),
}

/// Trait for frame inputs.
pub trait Source: SinkFactory {
    /// Returns the next decoded frame, or `None` at end of stream.
    ///
    /// May block until a frame is available.
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError>;

    /// Time base of the video track.
    fn video_time_base(&self) -> Rational;

    /// Time base of the audio track.
    fn audio_time_base(&self) -> Rational;
}

impl<S: Source + ?Sized> SinkFactory for Box<S> {
    fn create_sink(&self, path: &Path) -> Result<Box<dyn Sink>, SinkError> {
        (**self).create_sink(path)
    }

    fn sink_extension(&self) -> &'static str {
        (**self).sink_extension()
    }
}

impl<S: Source + ?Sized> Source for Box<S> {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        (**self).next_frame()
    }

    fn video_time_base(&self) -> Rational {
        (**self).video_time_base()
    }

    fn audio_time_base(&self) -> Rational {
        (**self).audio_time_base()
    }
}

/// Source replaying a prepared list of frames.
///
/// Sinks it opens are [`MemorySink`]s recording into a shared
/// [`ClipLog`], which makes it the usual harness for driving the
/// recorder end to end.
#[derive(Debug)]
pub struct ScriptedSource {
    frames: VecDeque<Frame>,
    video_time_base: Rational,
    audio_time_base: Rational,
    clips: ClipLog,
}

impl ScriptedSource {
    /// Source that yields `frames` in order, then ends.
    pub fn new(frames: impl IntoIterator<Item = Frame>, video_time_base: Rational, audio_time_base: Rational) -> Self {
        Self {
            frames: frames.into_iter().collect(),
            video_time_base,
            audio_time_base,
            clips: ClipLog::default(),
        }
    }

    /// Returns the log that sinks from this source record into.
    pub fn clips(&self) -> ClipLog {
        ClipLog::clone(&self.clips)
    }

    /// Number of frames not yet pulled.
    pub fn remaining(&self) -> usize {
        self.frames.len()
    }
}

impl SinkFactory for ScriptedSource {
    fn create_sink(&self, path: &Path) -> Result<Box<dyn Sink>, SinkError> {
        Ok(Box::new(MemorySink::new(self.clips(), path, self.video_time_base)))
    }

    fn sink_extension(&self) -> &'static str {
        "clip"
    }
}

impl Source for ScriptedSource {
    fn next_frame(&mut self) -> Result<Option<Frame>, SourceError> {
        Ok(self.frames.pop_front())
    }

    fn video_time_base(&self) -> Rational {
        self.video_time_base
    }

    fn audio_time_base(&self) -> Rational {
        self.audio_time_base
    }
}
