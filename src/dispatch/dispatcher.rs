//! The recorder's control loop.

use super::trigger::{ManualTrigger, ShutdownFlag};
use crate::buffer::BoundedRing;
use crate::config::{DetectionConfig, RecordingConfig};
use crate::detection::{mark_interesting, Classification, DifferenceError, DifferenceMap, MotionClassifier};
use crate::media::{Frame, MediaKind, SharedFrame, Source, SourceError};
use crate::metrics::{MetricsRegistry, MetricsSnapshot};
use crate::recording::{
    difference_snapshot_path, snapshot_path, write_difference_snapshot, write_luma_snapshot, ClipNamer,
    ClipSummary, RecordingSession, SessionError, Transition,
};
use std::cell::Cell;
use std::path::{Path, PathBuf};
use std::rc::Rc;
use thiserror::Error;

/// Errors that stop the recorder.
#[derive(Debug, Error)]
pub enum DispatchError {
    /// The input failed or produced an unusable frame.
    #[error("input failed: {0}")]
    Source(#[from] SourceError),
    /// Consecutive pictures could not be compared.
    #[error("frame differencing failed: {0}")]
    Difference(#[from] DifferenceError),
    /// Clip output or finalization failed.
    #[error("recording failed: {0}")]
    Session(#[from] SessionError),
}

/// Running totals kept by the dispatcher.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunStats {
    /// Video frames pulled from the input.
    pub video_frames: u64,
    /// Audio frames pulled from the input.
    pub audio_frames: u64,
    /// Frames that passed the differing-pixel threshold.
    pub interesting_frames: u64,
    /// Manual triggers consumed.
    pub manual_triggers: u64,
    /// Motion state after the latest video frame.
    pub motion_active: bool,
    /// Whether a clip is open.
    pub recording: bool,
    /// Clips opened.
    pub clips_started: u64,
    /// Clips finished and moved into place.
    pub clips_finished: u64,
    /// Frames currently held for pre-roll.
    pub preroll_frames: usize,
    /// Frames dropped from the full pre-roll buffer.
    pub preroll_evictions: u64,
    /// Differing pixels in the latest classified frame.
    pub last_differing_pixels: u32,
}

/// What one pass through the loop did.
#[derive(Debug, Clone)]
pub enum Step {
    /// An audio frame went to the pre-roll buffer and any open clip.
    Audio,
    /// A video frame was classified and handed to the session.
    Video {
        /// `None` for the first video frame, which has no predecessor.
        classification: Option<Classification>,
        /// Effect on the recording session.
        transition: Transition,
    },
    /// The input ended or shutdown was requested; an open clip was closed.
    Ended(Option<ClipSummary>),
}

/// Pulls frames, detects motion, and feeds the recording session.
pub struct Dispatcher<S: Source> {
    source: S,
    classifier: MotionClassifier,
    session: RecordingSession,
    preroll: BoundedRing<SharedFrame>,
    previous: Option<SharedFrame>,
    trigger: ManualTrigger,
    shutdown: ShutdownFlag,
    mark_frames: bool,
    snapshots: bool,
    difference_map: Option<DifferenceMap>,
    evictions: Rc<Cell<u64>>,
    first_frame_seen: bool,
    marker_warned: bool,
    ended: bool,
    stats: RunStats,
    metrics: Option<MetricsRegistry>,
}

impl<S: Source> Dispatcher<S> {
    /// Creates a dispatcher writing clips under `output_dir`.
    pub fn new(
        source: S,
        output_dir: impl Into<PathBuf>,
        detection: DetectionConfig,
        recording: &RecordingConfig,
    ) -> Self {
        let namer = ClipNamer::new(output_dir, recording.temp_dir(), recording.per_day_directories);
        let session = RecordingSession::new(namer, recording.post_roll_secs, source.video_time_base());

        let evictions = Rc::new(Cell::new(0u64));
        let evicted = Rc::clone(&evictions);
        let preroll = BoundedRing::with_release(recording.preroll_frames, move |frame: SharedFrame| {
            evicted.set(evicted.get() + 1);
            tracing::trace!(kind = %frame.kind(), pts = frame.pts(), "Evicted pre-roll frame");
        });

        Self {
            source,
            mark_frames: detection.mark_interesting,
            classifier: MotionClassifier::new(detection),
            session,
            preroll,
            previous: None,
            trigger: ManualTrigger::new(),
            shutdown: ShutdownFlag::new(),
            snapshots: recording.snapshots,
            difference_map: recording.difference_snapshots.then(|| DifferenceMap::new(0, 0)),
            evictions,
            first_frame_seen: false,
            marker_warned: false,
            ended: false,
            stats: RunStats::default(),
            metrics: None,
        }
    }

    /// Uses `trigger` as the manual trigger.
    pub fn with_trigger(mut self, trigger: ManualTrigger) -> Self {
        self.trigger = trigger;
        self
    }

    /// Stops at the next frame once `shutdown` is requested.
    pub fn with_shutdown(mut self, shutdown: ShutdownFlag) -> Self {
        self.shutdown = shutdown;
        self
    }

    /// Publishes statistics to `metrics` after every frame.
    pub fn with_metrics(mut self, metrics: MetricsRegistry) -> Self {
        self.metrics = Some(metrics);
        self
    }

    /// Trigger that forces the next video frame to count as motion.
    pub fn trigger(&self) -> &ManualTrigger {
        &self.trigger
    }

    /// Totals so far.
    pub fn stats(&self) -> &RunStats {
        &self.stats
    }

    /// The recording session.
    pub fn session(&self) -> &RecordingSession {
        &self.session
    }

    /// The input being read.
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Where finished clips go.
    pub fn output_dir(&self) -> &Path {
        self.session.namer().output_dir()
    }

    /// Runs until the input ends or shutdown is requested.
    pub fn run(&mut self) -> Result<RunStats, DispatchError> {
        loop {
            if let Step::Ended(_) = self.step()? {
                break;
            }
        }

        tracing::info!(
            video_frames = self.stats.video_frames,
            audio_frames = self.stats.audio_frames,
            clips = self.stats.clips_finished,
            "Recorder stopped"
        );
        Ok(self.stats.clone())
    }

    /// Processes one frame.
    ///
    /// Once [`Step::Ended`] has been returned, further calls return it
    /// again without touching the input.
    pub fn step(&mut self) -> Result<Step, DispatchError> {
        if self.ended {
            return Ok(Step::Ended(None));
        }

        if self.shutdown.is_requested() {
            tracing::info!("Shutting down");
            return self.end();
        }

        let frame = match self.source.next_frame()? {
            Some(frame) => frame,
            None => {
                tracing::info!("End of stream");
                return self.end();
            }
        };

        if !self.first_frame_seen {
            self.first_frame_seen = true;
            tracing::info!(kind = %frame.kind(), "Motion recorder on guard duty");
        }

        let step = match frame.kind() {
            MediaKind::Audio => self.handle_audio(frame)?,
            MediaKind::Video => self.handle_video(frame)?,
        };

        self.publish();
        Ok(step)
    }

    fn end(&mut self) -> Result<Step, DispatchError> {
        self.ended = true;
        let summary = self.session.finish()?;
        if summary.is_some() {
            self.stats.clips_finished += 1;
        }
        self.publish();
        Ok(Step::Ended(summary))
    }

    fn handle_audio(&mut self, frame: Frame) -> Result<Step, DispatchError> {
        self.stats.audio_frames += 1;

        let frame: SharedFrame = Rc::new(frame);
        self.preroll.append(Rc::clone(&frame));
        self.session.forward(&frame)?;
        Ok(Step::Audio)
    }

    fn handle_video(&mut self, mut frame: Frame) -> Result<Step, DispatchError> {
        if let Some(picture) = frame.as_video() {
            if !picture.format().is_planar_yuv420() {
                return Err(SourceError::UnsupportedPixelFormat(picture.format()).into());
            }
            if !picture.is_valid() {
                return Err(SourceError::MalformedPicture {
                    width: picture.width(),
                    height: picture.height(),
                    format: picture.format(),
                }
                .into());
            }
            if let Some(map) = &mut self.difference_map {
                if !map.matches(picture) {
                    *map = DifferenceMap::for_picture(picture);
                }
            }
        }

        let index = self.stats.video_frames;
        self.stats.video_frames += 1;

        let classification = match self.previous.as_deref() {
            Some(previous) => {
                let manual = self.trigger.take();
                let classification =
                    self.classifier
                        .classify(previous, &frame, manual, self.difference_map.as_mut())?;
                Some(classification)
            }
            None => None,
        };

        if let Some(classification) = &classification {
            self.record_classification(index, classification);
            if classification.interesting && self.mark_frames {
                self.mark(&mut frame);
            }
        }

        let frame: SharedFrame = Rc::new(frame);
        self.previous = Some(Rc::clone(&frame));

        let (motion_active, manual) = classification
            .as_ref()
            .map_or((false, false), |c| (c.motion_active, c.manual));

        let transition = self
            .session
            .update(&frame, motion_active, manual, &self.preroll, &self.source)?;

        match &transition {
            Transition::Started { destination, .. } => {
                self.stats.clips_started += 1;
                self.write_snapshots(destination, &frame);
            }
            Transition::Finished(_) => self.stats.clips_finished += 1,
            Transition::Extended | Transition::Unchanged => {}
        }

        self.preroll.append(Rc::clone(&frame));
        self.session.forward(&frame)?;

        Ok(Step::Video {
            classification,
            transition,
        })
    }

    fn record_classification(&mut self, index: u64, classification: &Classification) {
        self.stats.motion_active = classification.motion_active;
        self.stats.last_differing_pixels = classification.differing_pixels;
        if classification.interesting {
            self.stats.interesting_frames += 1;
        }
        if classification.manual {
            self.stats.manual_triggers += 1;
        }

        if classification.differing_pixels > 0 || classification.interesting_in_window > 0 {
            tracing::debug!(
                frame = index,
                differing = classification.differing_pixels,
                interesting = classification.interesting,
                window = classification.interesting_in_window,
                histogram = %classification.histogram,
                "Classified frame"
            );
        }
    }

    fn mark(&mut self, frame: &mut Frame) {
        let marked = frame.as_video_mut().is_some_and(mark_interesting);
        if !marked && !self.marker_warned {
            self.marker_warned = true;
            tracing::warn!("Frame too small for the interesting-frame marker; not marking");
        }
    }

    fn write_snapshots(&self, destination: &Path, frame: &Frame) {
        if self.snapshots {
            if let Some(picture) = frame.as_video() {
                if let Err(e) = write_luma_snapshot(&snapshot_path(destination), picture) {
                    tracing::warn!(error = %e, "Failed to write snapshot");
                }
            }
        }

        if let Some(map) = &self.difference_map {
            if let Err(e) = write_difference_snapshot(&difference_snapshot_path(destination), map) {
                tracing::warn!(error = %e, "Failed to write difference snapshot");
            }
        }
    }

    fn publish(&mut self) {
        self.stats.recording = self.session.is_active();
        self.stats.preroll_frames = self.preroll.count();
        self.stats.preroll_evictions = self.evictions.get();

        if let Some(metrics) = &self.metrics {
            metrics.update(&MetricsSnapshot::from_stats(&self.stats));
        }
    }
}
