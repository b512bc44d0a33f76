//! YUV4MPEG2 clip writer.
//!
//! Writes the video stream of a clip as uncompressed 4:2:0 pictures.
//! Each picture header carries its rebased timestamp as an `Xpts`
//! extension parameter. The format has no audio track, so audio frames
//! are rebased and counted but not stored.

use super::sink::{AudioParams, EpochRebaser, Sink, SinkError, VideoParams};
use super::{Frame, FramePayload, VideoPicture};
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;

/// File extension of clips written by [`Y4mSink`].
pub const Y4M_EXTENSION: &str = "y4m";

/// YUV4MPEG2 file sink.
pub struct Y4mSink {
    writer: Option<BufWriter<File>>,
    video: VideoParams,
    rebaser: EpochRebaser,
    video_frames: u64,
    audio_frames: u64,
}

impl Y4mSink {
    /// Creates `path` and writes the stream header.
    pub fn create(path: &Path, video: VideoParams, audio: AudioParams) -> Result<Self, SinkError> {
        if !video.format.is_planar_yuv420() {
            return Err(SinkError::UnsupportedFormat(format!(
                "y4m output needs yuv420p video, got {:?}",
                video.format
            )));
        }
        if !video.frame_rate.is_valid() || !video.time_base.is_valid() || !audio.time_base.is_valid() {
            return Err(SinkError::UnsupportedFormat(format!(
                "invalid stream timing: rate {}, video base {}, audio base {}",
                video.frame_rate, video.time_base, audio.time_base
            )));
        }

        let mut writer = BufWriter::new(File::create(path)?);
        writeln!(
            writer,
            "YUV4MPEG2 W{} H{} F{}:{} Ip A1:1 C420jpeg",
            video.width, video.height, video.frame_rate.num, video.frame_rate.den
        )?;

        tracing::debug!(
            path = %path.display(),
            width = video.width,
            height = video.height,
            rate = %video.frame_rate,
            "Opened y4m clip"
        );

        Ok(Self {
            writer: Some(writer),
            video,
            rebaser: EpochRebaser::new(video.time_base),
            video_frames: 0,
            audio_frames: 0,
        })
    }

    /// Returns (video, audio) frame counts received so far.
    pub fn frame_counts(&self) -> (u64, u64) {
        (self.video_frames, self.audio_frames)
    }

    fn write_picture(
        writer: &mut BufWriter<File>,
        picture: &VideoPicture,
        clip_pts: i64,
    ) -> Result<(), SinkError> {
        writeln!(writer, "FRAME Xpts={}", clip_pts)?;
        for plane in picture.planes() {
            for y in 0..plane.height() {
                writer.write_all(plane.row(y))?;
            }
        }
        Ok(())
    }
}

impl Sink for Y4mSink {
    fn encode(&mut self, frame: &Frame) -> Result<(), SinkError> {
        let writer = self.writer.as_mut().ok_or(SinkError::Finished)?;
        let clip_pts = self.rebaser.rebase(frame.pts(), frame.time_base());

        match frame.payload() {
            FramePayload::Video(picture) => {
                if picture.width() != self.video.width
                    || picture.height() != self.video.height
                    || picture.format() != self.video.format
                {
                    return Err(SinkError::FrameMismatch(format!(
                        "{}x{} {:?} picture in {}x{} {:?} stream",
                        picture.width(),
                        picture.height(),
                        picture.format(),
                        self.video.width,
                        self.video.height,
                        self.video.format
                    )));
                }
                Self::write_picture(writer, picture, clip_pts)?;
                self.video_frames += 1;
            }
            FramePayload::Audio(_) => {
                self.audio_frames += 1;
            }
        }

        tracing::trace!(kind = %frame.kind(), pts = frame.pts(), clip_pts, "Encoded frame");
        Ok(())
    }

    fn finish(&mut self) -> Result<(), SinkError> {
        let writer = self.writer.take().ok_or(SinkError::Finished)?;
        let file = writer.into_inner().map_err(|e| SinkError::Io(e.into_error()))?;
        file.sync_all()?;

        tracing::debug!(
            video_frames = self.video_frames,
            audio_frames = self.audio_frames,
            "Finished y4m clip"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::media::{AudioSamples, PixelFormat, Rational};

    const VIDEO_BASE: Rational = Rational::new(1, 90_000);
    const AUDIO_BASE: Rational = Rational::new(1, 48_000);

    fn params(width: u32, height: u32) -> (VideoParams, AudioParams) {
        (
            VideoParams {
                width,
                height,
                format: PixelFormat::Yuv420p,
                frame_rate: Rational::new(30, 1),
                time_base: VIDEO_BASE,
            },
            AudioParams {
                sample_rate: 48_000,
                channels: 1,
                time_base: AUDIO_BASE,
            },
        )
    }

    #[test]
    fn test_writes_header_and_rebased_pictures() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("clip.y4m");
        let (video, audio) = params(4, 2);

        let mut sink = Y4mSink::create(&path, video, audio).unwrap();
        let mut picture = VideoPicture::yuv420p(4, 2);
        picture.fill_luma(200);

        sink.encode(&Frame::video(9000, VIDEO_BASE, picture.clone())).unwrap();
        sink.encode(&Frame::audio(4800, AUDIO_BASE, AudioSamples::silence(48_000, 1, 1600))).unwrap();
        sink.encode(&Frame::video(12_000, VIDEO_BASE, picture)).unwrap();
        assert_eq!(sink.frame_counts(), (2, 1));
        sink.finish().unwrap();

        let bytes = std::fs::read(&path).unwrap();
        let header = b"YUV4MPEG2 W4 H2 F30:1 Ip A1:1 C420jpeg\n";
        assert!(bytes.starts_with(header));

        // 8 luma + 2 + 2 chroma bytes per picture
        let first = b"FRAME Xpts=0\n".len() + 12;
        let second = b"FRAME Xpts=3000\n".len() + 12;
        assert_eq!(bytes.len(), header.len() + first + second);

        let text = String::from_utf8_lossy(&bytes);
        assert!(text.contains("FRAME Xpts=3000\n"));
    }

    #[test]
    fn test_rejects_non_planar_output() {
        let dir = tempfile::tempdir().unwrap();
        let (mut video, audio) = params(4, 2);
        video.format = PixelFormat::Nv12;

        let result = Y4mSink::create(&dir.path().join("clip.y4m"), video, audio);
        assert!(matches!(result, Err(SinkError::UnsupportedFormat(_))));
    }

    #[test]
    fn test_mismatched_picture_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio) = params(4, 2);
        let mut sink = Y4mSink::create(&dir.path().join("clip.y4m"), video, audio).unwrap();

        let result = sink.encode(&Frame::video(0, VIDEO_BASE, VideoPicture::yuv420p(8, 8)));
        assert!(matches!(result, Err(SinkError::FrameMismatch(_))));
    }

    #[test]
    fn test_encode_after_finish_fails() {
        let dir = tempfile::tempdir().unwrap();
        let (video, audio) = params(4, 2);
        let mut sink = Y4mSink::create(&dir.path().join("clip.y4m"), video, audio).unwrap();

        sink.finish().unwrap();
        let frame = Frame::video(0, VIDEO_BASE, VideoPicture::yuv420p(4, 2));
        assert!(matches!(sink.encode(&frame), Err(SinkError::Finished)));
        assert!(matches!(sink.finish(), Err(SinkError::Finished)));
    }
}
