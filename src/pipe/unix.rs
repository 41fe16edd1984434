//! Unix domain socket transport
//!
//! ffmpeg reaches the stream through its `unix:` protocol, so the endpoint
//! string handed to the command line is `unix:{socket path}`.

use std::fs;
use std::io::{self, Write};
use std::os::unix::net::{UnixListener, UnixStream};
use std::path::PathBuf;

use crate::errors::ReelError;

/// Server half. Bound at creation; the socket file is unlinked on drop.
pub struct PipeServer {
    listener: UnixListener,
    path: PathBuf,
    endpoint: String,
}

impl PipeServer {
    pub fn create() -> Result<Self, ReelError> {
        let path = std::env::temp_dir().join(format!("{}.sock", super::endpoint_name()));
        // A stale socket from a crashed run blocks bind.
        let _ = fs::remove_file(&path);
        let listener = UnixListener::bind(&path)?;
        let endpoint = format!("unix:{}", path.display());
        Ok(Self {
            listener,
            path,
            endpoint,
        })
    }

    /// The input argument the encoder command line embeds.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Block until the encoder process connects.
    pub fn accept(&self) -> Result<PipeConnection, ReelError> {
        let (stream, _) = self.listener.accept()?;
        Ok(PipeConnection { stream })
    }
}

impl Drop for PipeServer {
    fn drop(&mut self) {
        let _ = fs::remove_file(&self.path);
    }
}

/// Established connection; dropping it closes the encoder's input and
/// signals end of stream.
pub struct PipeConnection {
    stream: UnixStream,
}

impl Write for PipeConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.stream.write(buf)
    }

    fn flush(&mut self) -> io::Result<()> {
        self.stream.flush()
    }
}
