//! ScreenReel: paced screen recording piped to an external encoder
//!
//! This crate turns periodic screen captures into a fixed-frame-rate raw
//! video stream and feeds it, byte-exact, to an ffmpeg subprocess over a
//! connection-oriented pipe, producing a finished video file.
//!
//! # Features
//! - Wall-clock pacing with stall compensation (the last frame is repeated,
//!   never dropped, when capture falls behind)
//! - Strict FIFO hand-off between the capture thread and the streaming
//!   thread
//! - Lazy encoder startup keyed on the first frame's dimensions
//! - Two-phase shutdown that drains every captured frame before the
//!   container is finalized
//!
//! # Usage
//! ```rust,ignore
//! use screenreel::{RecordingSession, RecordingSettings, FfmpegLauncher};
//!
//! let settings = RecordingSettings::new("recordings/demo.mp4")
//!     .with_frame_rate(30)
//!     .with_crf(23);
//! let mut session = RecordingSession::start(my_source, FfmpegLauncher, settings)?;
//! // ... record ...
//! let summary = session.stop();
//! assert!(summary.is_clean());
//! ```
pub mod codec;
pub mod encoder;
pub mod errors;
pub mod fetch;
pub mod pacer;
pub mod pipe;
pub mod queue;
pub mod session;
pub mod source;
pub mod streamer;
pub mod types;

// Testing utilities - synthetic sources and a stub encoder for offline tests
pub mod testing;

// Re-exports for convenience
pub use encoder::{EncoderCommand, EncoderHandle, EncoderLauncher, FfmpegLauncher};
pub use errors::ReelError;
pub use session::{RecordingSession, RecordingSettings, StopSummary};
pub use source::FrameSource;
pub use types::{Frame, RawImage};

/// Initialize logging for the recording pipeline
pub fn init_logging() {
    if std::env::var("RUST_LOG").is_err() {
        std::env::set_var("RUST_LOG", "screenreel=info");
    }
    let _ = env_logger::try_init();
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");

#[cfg(test)]
mod lib_tests {
    use super::*;

    #[test]
    fn test_crate_info() {
        assert_eq!(NAME, "screenreel");
        assert!(!VERSION.is_empty());
    }
}
