//! Media frames, time bases, and the input/output seams.
//!
//! Demuxing, decoding and encoding live behind the [`Source`] and
//! [`Sink`] traits. The recorder only sees decoded frames coming in and
//! hands borrowed frames to a sink going out.

mod frame;
mod sink;
mod source;
mod synthetic;
mod timebase;
mod y4m;

pub use frame::{AudioSamples, Frame, FramePayload, MediaKind, PixelFormat, Plane, SharedFrame, VideoPicture};
pub use sink::{
    AudioParams, ClipLog, EncodedFrame, EpochRebaser, MemorySink, RecordedClip, Sink, SinkError, SinkFactory,
    VideoParams,
};
pub use source::{ScriptedSource, Source, SourceError};
pub use synthetic::{MotionWindow, SyntheticConfig, SyntheticSource, SYNTHETIC_SCHEME};
pub use timebase::Rational;
pub use y4m::{Y4mSink, Y4M_EXTENSION};

/// Opens the input named by `specifier`.
///
/// Only the built-in synthetic scene (`synthetic[:key=value,...]`) is
/// handled here; other inputs plug in by implementing [`Source`].
pub fn open_source(specifier: &str, synthetic: &SyntheticConfig) -> Result<Box<dyn Source>, SourceError> {
    if SyntheticConfig::matches(specifier) {
        let mut config = synthetic.clone();
        config.apply_specifier(specifier)?;
        return Ok(Box::new(SyntheticSource::new(config)?));
    }

    Err(SourceError::OpenFailed {
        specifier: specifier.to_string(),
        reason: "no demuxer available for this input".into(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_open_unknown_input_fails() {
        let result = open_source("/dev/video0", &SyntheticConfig::default());
        assert!(matches!(result, Err(SourceError::OpenFailed { .. })));
    }

    #[test]
    fn test_open_synthetic() {
        let mut source = open_source("synthetic:duration=1,fps=5", &SyntheticConfig::default()).unwrap();
        assert_eq!(source.video_time_base(), Rational::new(1, 90_000));
        assert_eq!(source.sink_extension(), Y4M_EXTENSION);
        assert!(source.next_frame().unwrap().is_some());
    }
}
