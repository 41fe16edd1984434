//! Recording session lifecycle
//!
//! A session starts its two worker threads (pacer and streamer) the moment
//! it is constructed and runs until [`RecordingSession::stop`]. Shutdown is
//! strictly two-phase: cancel and join the pacer first, only then complete
//! the queue and join the streamer. That ordering is what guarantees the
//! encoder receives every frame the pacer ever pushed.

use std::path::PathBuf;
use std::thread::JoinHandle;

use crossbeam_channel::Sender;
use serde::{Deserialize, Serialize};

use crate::encoder::{EncoderLauncher, CRF_MAX};
use crate::errors::ReelError;
use crate::pacer::{self, PacerOutcome};
use crate::queue::{frame_queue, FrameProducer};
use crate::source::FrameSource;
use crate::streamer;

/// Parameters of one recording.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecordingSettings {
    /// Target frames per second of the output stream.
    pub frame_rate: u32,
    /// Constant-rate-factor quality, 0 (lossless) to 51 (worst).
    pub crf: u8,
    /// Destination file. Parent directories are created, existing files
    /// overwritten.
    pub output: PathBuf,
    /// Encoder binary to invoke.
    pub ffmpeg: PathBuf,
}

impl RecordingSettings {
    pub fn new(output: impl Into<PathBuf>) -> Self {
        Self {
            frame_rate: 30,
            crf: 23,
            output: output.into(),
            ffmpeg: PathBuf::from("ffmpeg"),
        }
    }

    pub fn with_frame_rate(mut self, frame_rate: u32) -> Self {
        self.frame_rate = frame_rate;
        self
    }

    pub fn with_crf(mut self, crf: u8) -> Self {
        self.crf = crf;
        self
    }

    pub fn with_ffmpeg(mut self, ffmpeg: impl Into<PathBuf>) -> Self {
        self.ffmpeg = ffmpeg.into();
        self
    }

    fn validate(&self) -> Result<(), ReelError> {
        if self.frame_rate == 0 {
            return Err(ReelError::Config("frame_rate must be positive".into()));
        }
        if self.crf > CRF_MAX {
            return Err(ReelError::Config(format!(
                "crf {} out of range 0..={}",
                self.crf, CRF_MAX
            )));
        }
        Ok(())
    }
}

/// What `stop()` observed while winding the pipeline down.
///
/// Worker failures end up here instead of being re-thrown: stopping a
/// broken recording must always complete so the pipe is closed and the
/// subprocess reaped.
#[derive(Debug, Default)]
pub struct StopSummary {
    /// Frames the pacer pushed, duplicates included.
    pub frames_emitted: u64,
    /// Frames the streamer actually wrote to the encoder.
    pub frames_delivered: u64,
    pub producer_error: Option<ReelError>,
    pub consumer_error: Option<ReelError>,
}

impl StopSummary {
    pub fn is_clean(&self) -> bool {
        self.producer_error.is_none() && self.consumer_error.is_none()
    }
}

/// A running recording. Construction starts capture immediately; there is
/// no armed-but-idle state.
pub struct RecordingSession {
    cancel: Option<Sender<()>>,
    queue: Option<FrameProducer>,
    pacer: Option<JoinHandle<PacerOutcome>>,
    streamer: Option<JoinHandle<Result<u64, ReelError>>>,
}

impl RecordingSession {
    /// Spawn the pacer and streamer threads and begin recording.
    pub fn start<S, L>(
        source: S,
        launcher: L,
        settings: RecordingSettings,
    ) -> Result<Self, ReelError>
    where
        S: FrameSource + 'static,
        L: EncoderLauncher + 'static,
    {
        settings.validate()?;

        let (queue_tx, queue_rx) = frame_queue();
        let (cancel_tx, cancel_rx) = crossbeam_channel::bounded::<()>(1);

        let frame_rate = settings.frame_rate;
        let pacer_queue = queue_tx.clone();
        let pacer = std::thread::Builder::new()
            .name("screenreel-pacer".to_string())
            .spawn(move || {
                let mut source = source;
                pacer::run(&mut source, &pacer_queue, &cancel_rx, frame_rate)
            })?;

        let streamer = std::thread::Builder::new()
            .name("screenreel-streamer".to_string())
            .spawn(move || streamer::run(queue_rx, &launcher, &settings))?;

        log::info!("recording session started at {} fps", frame_rate);

        Ok(Self {
            cancel: Some(cancel_tx),
            queue: Some(queue_tx),
            pacer: Some(pacer),
            streamer: Some(streamer),
        })
    }

    /// Whether `stop()` has run.
    pub fn is_stopped(&self) -> bool {
        self.cancel.is_none()
    }

    /// Stop recording. Idempotent; later calls return an empty summary.
    ///
    /// Order matters: signal the pacer, join it, and only then complete the
    /// queue so the streamer drains every pushed frame before it shuts the
    /// encoder down.
    pub fn stop(&mut self) -> StopSummary {
        let mut summary = StopSummary::default();
        let cancel = match self.cancel.take() {
            Some(cancel) => cancel,
            None => return summary,
        };

        let _ = cancel.send(());
        drop(cancel);

        if let Some(handle) = self.pacer.take() {
            match handle.join() {
                Ok(outcome) => {
                    summary.frames_emitted = outcome.frames_emitted;
                    summary.producer_error = outcome.error;
                }
                Err(_) => {
                    summary.producer_error =
                        Some(ReelError::Capture("pacer thread panicked".to_string()));
                }
            }
        }

        // Completion signal: drop the last producer half. Emitted only
        // after the pacer join above, so nothing can race the drain.
        self.queue.take();

        if let Some(handle) = self.streamer.take() {
            match handle.join() {
                Ok(Ok(delivered)) => summary.frames_delivered = delivered,
                Ok(Err(e)) => {
                    log::warn!("streamer failed while stopping: {}", e);
                    summary.consumer_error = Some(e);
                }
                Err(_) => {
                    log::warn!("streamer thread panicked");
                    summary.consumer_error =
                        Some(ReelError::Encoder("streamer thread panicked".to_string()));
                }
            }
        }

        log::info!(
            "recording stopped: {} emitted, {} delivered",
            summary.frames_emitted,
            summary.frames_delivered
        );
        summary
    }
}

impl Drop for RecordingSession {
    fn drop(&mut self) {
        if self.cancel.is_some() {
            let summary = self.stop();
            if !summary.is_clean() {
                log::warn!("session dropped with errors: {:?}", summary);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_frame_rate_is_rejected() {
        let err = RecordingSettings::new("/tmp/x.mp4")
            .with_frame_rate(0)
            .validate();
        assert!(err.is_err());
    }

    #[test]
    fn crf_above_range_is_rejected() {
        let err = RecordingSettings::new("/tmp/x.mp4").with_crf(52).validate();
        assert!(err.is_err());
    }

    #[test]
    fn builder_defaults() {
        let settings = RecordingSettings::new("out/clip.mp4");
        assert_eq!(settings.frame_rate, 30);
        assert_eq!(settings.crf, 23);
        assert_eq!(settings.ffmpeg, PathBuf::from("ffmpeg"));
    }
}
