//! Connection-oriented byte pipe to the encoder
//!
//! The streamer creates the server endpoint before the encoder process is
//! spawned; the process then connects exactly once and reads raw frame
//! bytes back-to-back, with no framing. Unix uses a domain socket in the
//! temp dir, Windows a named pipe. Connect and write waits are unbounded.

use std::sync::atomic::{AtomicU64, Ordering};

#[cfg(unix)]
mod unix;
#[cfg(windows)]
mod windows;

#[cfg(unix)]
pub use unix::{PipeConnection, PipeServer};
#[cfg(windows)]
pub use windows::{PipeConnection, PipeServer};

static ENDPOINT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Endpoint name unique within this process, so concurrent sessions never
/// collide.
fn endpoint_name() -> String {
    format!(
        "screenreel-{}-{}",
        std::process::id(),
        ENDPOINT_SEQ.fetch_add(1, Ordering::Relaxed)
    )
}
