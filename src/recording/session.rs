//! Recording session state machine.
//!
//! Idle until motion is reported. Starting a clip opens a sink on a
//! fresh temporary file and replays the pre-roll into it. While active,
//! every motion-active frame pushes the stop point out; once a video
//! frame lands a full post-roll past the last motion with no motion
//! active, the sink is finished and the clip moved into place.

use super::finalize::{move_file, MoveMethod};
use super::naming::ClipNamer;
use super::SessionError;
use crate::buffer::BoundedRing;
use crate::media::{Frame, Rational, SharedFrame, Sink, SinkFactory};
use std::fmt;
use std::path::PathBuf;

/// An open clip.
pub struct ActiveClip {
    sink: Box<dyn Sink>,
    temp_path: PathBuf,
    destination: PathBuf,
    /// Start timestamp, video time base.
    started_at: i64,
    /// Most recent motion-active timestamp, video time base.
    last_motion: i64,
    manual: bool,
    frames_written: u64,
}

impl ActiveClip {
    /// File the clip is being written to.
    pub fn temp_path(&self) -> &PathBuf {
        &self.temp_path
    }

    /// Where the clip goes when it finishes.
    pub fn destination(&self) -> &PathBuf {
        &self.destination
    }

    /// Video pts of the frame that started the clip.
    pub fn started_at(&self) -> i64 {
        self.started_at
    }

    /// Video pts of the most recent motion.
    pub fn last_motion(&self) -> i64 {
        self.last_motion
    }

    /// Frames written so far, replayed pre-roll included.
    pub fn frames_written(&self) -> u64 {
        self.frames_written
    }
}

impl fmt::Debug for ActiveClip {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ActiveClip")
            .field("temp_path", &self.temp_path)
            .field("destination", &self.destination)
            .field("started_at", &self.started_at)
            .field("last_motion", &self.last_motion)
            .field("manual", &self.manual)
            .field("frames_written", &self.frames_written)
            .finish_non_exhaustive()
    }
}

/// Session state.
#[derive(Debug, Default)]
pub enum SessionState {
    /// No clip open.
    #[default]
    Idle,
    /// A clip is being written.
    Active(ActiveClip),
}

/// A finished clip.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClipSummary {
    /// Final path of the clip.
    pub destination: PathBuf,
    /// Video pts that started the clip.
    pub started_at: i64,
    /// Video pts of the last motion.
    pub last_motion: i64,
    /// Frames in the clip.
    pub frames_written: u64,
    /// Whether a manual trigger started it.
    pub manual: bool,
    /// How the file was moved into place.
    pub moved_by: MoveMethod,
}

/// What a video frame did to the session.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Transition {
    /// Nothing changed.
    Unchanged,
    /// Idle to active.
    Started {
        /// Where the clip will be placed.
        destination: PathBuf,
        /// Pre-roll frames written to the new clip.
        replayed: usize,
        /// Started by a manual trigger.
        manual: bool,
    },
    /// Still active; the stop point moved out.
    Extended,
    /// Active to idle.
    Finished(ClipSummary),
}

/// Drives clip lifecycles from per-frame motion decisions.
pub struct RecordingSession {
    state: SessionState,
    namer: ClipNamer,
    video_time_base: Rational,
    post_roll_ticks: i64,
    clips_started: u64,
    clips_finished: u64,
}

impl RecordingSession {
    /// Idle session; clips stop `post_roll_secs` after the last motion.
    pub fn new(namer: ClipNamer, post_roll_secs: u64, video_time_base: Rational) -> Self {
        Self {
            state: SessionState::Idle,
            namer,
            video_time_base,
            post_roll_ticks: video_time_base.ticks_for_secs(post_roll_secs),
            clips_started: 0,
            clips_finished: 0,
        }
    }

    /// Clip naming in use.
    pub fn namer(&self) -> &ClipNamer {
        &self.namer
    }

    /// Current state.
    pub fn state(&self) -> &SessionState {
        &self.state
    }

    /// Whether a clip is open.
    pub fn is_active(&self) -> bool {
        matches!(self.state, SessionState::Active(_))
    }

    /// Post-roll length in video ticks.
    pub fn post_roll_ticks(&self) -> i64 {
        self.post_roll_ticks
    }

    /// Clips opened so far.
    pub fn clips_started(&self) -> u64 {
        self.clips_started
    }

    /// Clips finished so far.
    pub fn clips_finished(&self) -> u64 {
        self.clips_finished
    }

    /// Applies the motion decision made for video `frame`.
    ///
    /// Call before `frame` itself enters the pre-roll or is forwarded.
    pub fn update(
        &mut self,
        frame: &Frame,
        motion_active: bool,
        manual: bool,
        preroll: &BoundedRing<SharedFrame>,
        factory: &dyn SinkFactory,
    ) -> Result<Transition, SessionError> {
        let now = Rational::rescale(frame.pts(), frame.time_base(), self.video_time_base);

        if motion_active {
            if let SessionState::Active(clip) = &mut self.state {
                clip.last_motion = now;
                if manual {
                    tracing::info!(pts = now, "Manual trigger extended recording");
                }
                return Ok(Transition::Extended);
            }
            return self.start(now, manual, preroll, factory);
        }

        let expired = match &self.state {
            SessionState::Active(clip) => now >= clip.last_motion.saturating_add(self.post_roll_ticks),
            SessionState::Idle => false,
        };

        if expired {
            if let Some(summary) = self.finish()? {
                return Ok(Transition::Finished(summary));
            }
        }
        Ok(Transition::Unchanged)
    }

    fn start(
        &mut self,
        now: i64,
        manual: bool,
        preroll: &BoundedRing<SharedFrame>,
        factory: &dyn SinkFactory,
    ) -> Result<Transition, SessionError> {
        let extension = factory.sink_extension();
        let destination = self.namer.destination(extension)?;
        let temp_path = self.namer.temp_file(extension)?;

        tracing::info!(
            pts = now,
            manual,
            temp = %temp_path.display(),
            destination = %destination.display(),
            "Starting recording"
        );

        let mut sink = factory.create_sink(&temp_path)?;

        // Clips open on a picture, never on leading audio
        let mut replayed = 0;
        for frame in preroll.iter().skip_while(|frame| frame.is_audio()) {
            sink.encode(frame)?;
            replayed += 1;
        }

        self.state = SessionState::Active(ActiveClip {
            sink,
            temp_path,
            destination: destination.clone(),
            started_at: now,
            last_motion: now,
            manual,
            frames_written: replayed as u64,
        });
        self.clips_started += 1;

        Ok(Transition::Started {
            destination,
            replayed,
            manual,
        })
    }

    /// Writes `frame` to the open clip, if any.
    pub fn forward(&mut self, frame: &Frame) -> Result<(), SessionError> {
        if let SessionState::Active(clip) = &mut self.state {
            clip.sink.encode(frame)?;
            clip.frames_written += 1;
        }
        Ok(())
    }

    /// Finishes the open clip, if any, and moves it to its destination.
    pub fn finish(&mut self) -> Result<Option<ClipSummary>, SessionError> {
        let mut clip = match std::mem::take(&mut self.state) {
            SessionState::Active(clip) => clip,
            SessionState::Idle => return Ok(None),
        };

        tracing::info!(
            destination = %clip.destination.display(),
            frames = clip.frames_written,
            "Ending recording"
        );

        clip.sink.finish()?;
        let moved_by = move_file(&clip.temp_path, &clip.destination)?;
        self.clips_finished += 1;

        Ok(Some(ClipSummary {
            destination: clip.destination,
            started_at: clip.started_at,
            last_motion: clip.last_motion,
            frames_written: clip.frames_written,
            manual: clip.manual,
            moved_by,
        }))
    }
}

impl fmt::Debug for RecordingSession {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("RecordingSession")
            .field("state", &self.state)
            .field("post_roll_ticks", &self.post_roll_ticks)
            .field("clips_started", &self.clips_started)
            .field("clips_finished", &self.clips_finished)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioSamples, ClipLog, MediaKind, ScriptedSource, VideoPicture};
    use std::rc::Rc;

    const VIDEO: Rational = Rational::new(1, 30);
    const AUDIO: Rational = Rational::new(1, 48_000);

    fn video(pts: i64) -> SharedFrame {
        Rc::new(Frame::video(pts, VIDEO, VideoPicture::yuv420p(16, 16)))
    }

    fn audio(pts: i64) -> SharedFrame {
        Rc::new(Frame::audio(pts, AUDIO, AudioSamples::silence(48_000, 1, 1600)))
    }

    struct Harness {
        _dir: tempfile::TempDir,
        session: RecordingSession,
        factory: ScriptedSource,
        clips: ClipLog,
    }

    fn harness() -> Harness {
        let dir = tempfile::tempdir().unwrap();
        let namer = ClipNamer::new(dir.path().join("clips"), dir.path(), true);
        let factory = ScriptedSource::new(Vec::new(), VIDEO, AUDIO);
        let clips = factory.clips();
        Harness {
            session: RecordingSession::new(namer, 10, VIDEO),
            _dir: dir,
            factory,
            clips,
        }
    }

    #[test]
    fn test_preroll_replay_skips_leading_audio() {
        let mut h = harness();
        let mut preroll = BoundedRing::new(16);
        for frame in [audio(0), audio(1600), video(1), audio(3200), video(2)] {
            preroll.append(frame);
        }

        let transition = h.session.update(&video(3), true, false, &preroll, &h.factory).unwrap();
        assert!(matches!(transition, Transition::Started { replayed: 3, manual: false, .. }));

        let clips = h.clips.borrow();
        let kinds: Vec<MediaKind> = clips[0].frames.iter().map(|f| f.kind).collect();
        assert_eq!(kinds, vec![MediaKind::Video, MediaKind::Audio, MediaKind::Video]);
        // Epoch anchored on the first replayed picture
        assert_eq!(clips[0].frames[0].clip_pts, 0);
    }

    #[test]
    fn test_stops_exactly_at_post_roll() {
        let mut h = harness();
        let preroll = BoundedRing::new(4);
        let t = 90;

        h.session.update(&video(t), true, false, &preroll, &h.factory).unwrap();
        assert_eq!(h.session.post_roll_ticks(), 300);

        for pts in (t + 1)..(t + 300) {
            let transition = h.session.update(&video(pts), false, false, &preroll, &h.factory).unwrap();
            assert_eq!(transition, Transition::Unchanged);
            assert!(h.session.is_active());
        }

        let transition = h.session.update(&video(t + 300), false, false, &preroll, &h.factory).unwrap();
        match transition {
            Transition::Finished(summary) => {
                assert_eq!(summary.started_at, t);
                assert_eq!(summary.last_motion, t);
                assert!(summary.destination.exists());
            }
            other => panic!("expected Finished, got {:?}", other),
        }
        assert!(!h.session.is_active());
        assert!(h.clips.borrow()[0].finished);
    }

    #[test]
    fn test_renewed_motion_extends() {
        let mut h = harness();
        let preroll = BoundedRing::new(4);

        h.session.update(&video(0), true, false, &preroll, &h.factory).unwrap();
        let transition = h.session.update(&video(250), true, false, &preroll, &h.factory).unwrap();
        assert_eq!(transition, Transition::Extended);

        // 300 ticks after the first motion, but only 50 after the latest
        let transition = h.session.update(&video(300), false, false, &preroll, &h.factory).unwrap();
        assert_eq!(transition, Transition::Unchanged);
        assert!(h.session.is_active());

        let transition = h.session.update(&video(550), false, false, &preroll, &h.factory).unwrap();
        assert!(matches!(transition, Transition::Finished(_)));
        assert_eq!(h.session.clips_started(), 1);
        assert_eq!(h.session.clips_finished(), 1);
    }

    #[test]
    fn test_forward_only_while_active() {
        let mut h = harness();
        let preroll = BoundedRing::new(4);

        h.session.forward(&video(0)).unwrap();
        assert!(h.clips.borrow().is_empty());

        h.session.update(&video(1), true, true, &preroll, &h.factory).unwrap();
        h.session.forward(&video(1)).unwrap();
        h.session.forward(&audio(1600)).unwrap();

        match h.session.state() {
            SessionState::Active(clip) => assert_eq!(clip.frames_written(), 2),
            SessionState::Idle => panic!("session should be active"),
        }
        assert_eq!(h.clips.borrow()[0].frames.len(), 2);
    }

    #[test]
    fn test_finish_when_idle_is_noop() {
        let mut h = harness();
        assert_eq!(h.session.finish().unwrap(), None);
    }

    #[test]
    fn test_forced_finish_moves_clip() {
        let mut h = harness();
        let preroll = BoundedRing::new(4);

        h.session.update(&video(0), true, true, &preroll, &h.factory).unwrap();
        let summary = h.session.finish().unwrap().unwrap();

        assert!(summary.manual);
        assert_eq!(summary.moved_by, MoveMethod::Renamed);
        assert!(summary.destination.exists());
        assert!(!h.session.is_active());
    }
}
