//! Windows named pipe transport
//!
//! ffmpeg opens `\\.\pipe\{name}` directly as its input file, so no
//! protocol prefix is needed on the endpoint string.

use std::io::{self, Write};

use windows::core::HSTRING;
use windows::Win32::Foundation::{CloseHandle, HANDLE};
use windows::Win32::Storage::FileSystem::{FlushFileBuffers, WriteFile};
use windows::Win32::System::Pipes::{
    ConnectNamedPipe, CreateNamedPipeW, PIPE_ACCESS_OUTBOUND, PIPE_READMODE_BYTE, PIPE_TYPE_BYTE,
    PIPE_WAIT,
};

use crate::errors::ReelError;

const PIPE_BUFFER_BYTES: u32 = 1024 * 1024;

/// Server half of the named pipe. Created before the encoder is spawned.
pub struct PipeServer {
    handle: HANDLE,
    endpoint: String,
    handed_over: std::cell::Cell<bool>,
}

// HANDLE is just an opaque kernel object id; the server moves between the
// session and streamer threads but is never shared.
unsafe impl Send for PipeServer {}

impl PipeServer {
    pub fn create() -> Result<Self, ReelError> {
        let endpoint = format!(r"\\.\pipe\{}", super::endpoint_name());
        let handle = unsafe {
            CreateNamedPipeW(
                &HSTRING::from(endpoint.as_str()),
                PIPE_ACCESS_OUTBOUND,
                PIPE_TYPE_BYTE | PIPE_READMODE_BYTE | PIPE_WAIT,
                1,
                PIPE_BUFFER_BYTES,
                PIPE_BUFFER_BYTES,
                0,
                None,
            )
        };
        if handle.is_invalid() {
            return Err(ReelError::Io(io::Error::last_os_error()));
        }
        Ok(Self {
            handle,
            endpoint,
            handed_over: std::cell::Cell::new(false),
        })
    }

    /// The input argument the encoder command line embeds.
    pub fn endpoint(&self) -> &str {
        &self.endpoint
    }

    /// Block until the encoder process connects.
    ///
    /// Ownership of the kernel handle moves to the returned connection; a
    /// server dropped after a successful accept closes nothing.
    pub fn accept(&self) -> Result<PipeConnection, ReelError> {
        unsafe { ConnectNamedPipe(self.handle, None) }
            .map_err(|e| ReelError::Io(io::Error::from_raw_os_error(e.code().0)))?;
        self.handed_over.set(true);
        Ok(PipeConnection {
            handle: self.handle,
        })
    }
}

impl Drop for PipeServer {
    fn drop(&mut self) {
        if !self.handed_over.get() && !self.handle.is_invalid() {
            let _ = unsafe { CloseHandle(self.handle) };
        }
    }
}

/// Established connection writing through the pipe handle.
pub struct PipeConnection {
    handle: HANDLE,
}

unsafe impl Send for PipeConnection {}

impl Write for PipeConnection {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        let mut written = 0u32;
        unsafe { WriteFile(self.handle, Some(buf), Some(&mut written), None) }
            .map_err(|e| io::Error::from_raw_os_error(e.code().0))?;
        Ok(written as usize)
    }

    fn flush(&mut self) -> io::Result<()> {
        unsafe { FlushFileBuffers(self.handle) }
            .map_err(|e| io::Error::from_raw_os_error(e.code().0))
    }
}

impl Drop for PipeConnection {
    fn drop(&mut self) {
        if !self.handle.is_invalid() {
            let _ = unsafe { CloseHandle(self.handle) };
        }
    }
}
