//! Synthetic sources and a stub encoder for offline testing
//!
//! Nothing here touches a display or spawns ffmpeg, so the whole pipeline
//! can be exercised in CI. The stub launcher plays the encoder's role on
//! the pipe: it connects as the client and drains every byte it is sent.

use std::io::Read;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::JoinHandle;
use std::time::Duration;

use crate::encoder::{EncoderCommand, EncoderHandle, EncoderLauncher};
use crate::errors::ReelError;
use crate::source::FrameSource;
use crate::types::{RawImage, BYTES_PER_PIXEL};

/// A gradient BGRA image whose content varies with the frame number.
pub fn synthetic_image(frame_number: u64, width: u32, height: u32) -> RawImage {
    let mut data = vec![0u8; width as usize * height as usize * BYTES_PER_PIXEL];
    let base = (frame_number % 256) as u8;
    for y in 0..height as usize {
        for x in 0..width as usize {
            let idx = (y * width as usize + x) * BYTES_PER_PIXEL;
            data[idx] = base.wrapping_add((x % 256) as u8); // B
            data[idx + 1] = base.wrapping_add((y % 256) as u8); // G
            data[idx + 2] = base.wrapping_add(((x + y) % 256) as u8); // R
            data[idx + 3] = 0xFF; // A
        }
    }
    RawImage::packed(width, height, data)
}

/// Source producing gradient frames of a fixed size.
pub struct SyntheticSource {
    width: u32,
    height: u32,
    next: u64,
}

impl SyntheticSource {
    pub fn new(width: u32, height: u32) -> Self {
        Self {
            width,
            height,
            next: 0,
        }
    }
}

impl FrameSource for SyntheticSource {
    fn grab(&mut self) -> Result<RawImage, ReelError> {
        let image = synthetic_image(self.next, self.width, self.height);
        self.next += 1;
        Ok(image)
    }
}

/// Source that tags each frame with a monotonically increasing sequence
/// number in its leading eight bytes, for delivery-order verification.
/// Numbering starts at 1 so an all-zero (blank) frame can never be mistaken
/// for a real one.
pub struct SequencedSource {
    width: u32,
    height: u32,
    next: u64,
}

impl SequencedSource {
    pub fn new(width: u32, height: u32) -> Self {
        assert!(
            width as usize * height as usize * BYTES_PER_PIXEL >= 8,
            "frame too small to carry a sequence tag"
        );
        Self {
            width,
            height,
            next: 1,
        }
    }

    /// Read the tag back out of one delivered frame.
    pub fn tag_of(frame_bytes: &[u8]) -> u64 {
        let mut tag = [0u8; 8];
        tag.copy_from_slice(&frame_bytes[..8]);
        u64::from_le_bytes(tag)
    }
}

impl FrameSource for SequencedSource {
    fn grab(&mut self) -> Result<RawImage, ReelError> {
        let mut image = synthetic_image(self.next, self.width, self.height);
        image.data[..8].copy_from_slice(&self.next.to_le_bytes());
        self.next += 1;
        Ok(image)
    }
}

/// Source whose every grab takes longer than one frame interval, forcing
/// the pacer into duplicate compensation.
pub struct StallingSource {
    inner: SequencedSource,
    delay: Duration,
}

impl StallingSource {
    pub fn new(width: u32, height: u32, delay: Duration) -> Self {
        Self {
            inner: SequencedSource::new(width, height),
            delay,
        }
    }
}

impl FrameSource for StallingSource {
    fn grab(&mut self) -> Result<RawImage, ReelError> {
        std::thread::sleep(self.delay);
        self.inner.grab()
    }
}

/// Source that fails on the first grab.
pub struct FailingSource;

impl FrameSource for FailingSource {
    fn grab(&mut self) -> Result<RawImage, ReelError> {
        Err(ReelError::Capture("synthetic capture failure".to_string()))
    }
}

#[derive(Default)]
struct StubState {
    received: Vec<u8>,
    commands: Vec<EncoderCommand>,
}

/// Encoder stand-in: connects to the pipe endpoint from the command line
/// and drains it to an in-memory buffer. Records every launch and wait.
#[derive(Clone, Default)]
pub struct StubLauncher {
    state: Arc<Mutex<StubState>>,
    launches: Arc<AtomicUsize>,
    waits: Arc<AtomicUsize>,
}

impl StubLauncher {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn wait_count(&self) -> usize {
        self.waits.load(Ordering::SeqCst)
    }

    /// All bytes delivered over the pipe, in write order.
    pub fn received(&self) -> Vec<u8> {
        self.state.lock().expect("stub lock poisoned").received.clone()
    }

    /// Commands the streamer built, one per launch.
    pub fn commands(&self) -> Vec<EncoderCommand> {
        self.state.lock().expect("stub lock poisoned").commands.clone()
    }
}

impl EncoderLauncher for StubLauncher {
    fn launch(&self, command: &EncoderCommand) -> Result<Box<dyn EncoderHandle>, ReelError> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        let endpoint = command
            .args
            .iter()
            .position(|a| a == "-i")
            .and_then(|i| command.args.get(i + 1))
            .cloned()
            .ok_or_else(|| ReelError::Encoder("command has no -i argument".to_string()))?;

        self.state
            .lock()
            .expect("stub lock poisoned")
            .commands
            .push(command.clone());

        let state = Arc::clone(&self.state);
        let drainer = std::thread::Builder::new()
            .name("screenreel-stub-encoder".to_string())
            .spawn(move || -> std::io::Result<()> {
                let mut stream = open_endpoint(&endpoint)?;
                let mut buf = Vec::new();
                stream.read_to_end(&mut buf)?;
                state.lock().expect("stub lock poisoned").received.extend(buf);
                Ok(())
            })
            .map_err(ReelError::Io)?;

        Ok(Box::new(StubHandle {
            drainer: Some(drainer),
            waits: Arc::clone(&self.waits),
        }))
    }
}

struct StubHandle {
    drainer: Option<JoinHandle<std::io::Result<()>>>,
    waits: Arc<AtomicUsize>,
}

impl EncoderHandle for StubHandle {
    fn wait(&mut self) -> Result<(), ReelError> {
        self.waits.fetch_add(1, Ordering::SeqCst);
        match self.drainer.take() {
            Some(handle) => match handle.join() {
                Ok(Ok(())) => Ok(()),
                Ok(Err(e)) => Err(ReelError::Io(e)),
                Err(_) => Err(ReelError::Encoder("stub drainer panicked".to_string())),
            },
            None => Ok(()),
        }
    }
}

#[cfg(unix)]
fn open_endpoint(endpoint: &str) -> std::io::Result<Box<dyn Read + Send>> {
    match endpoint.strip_prefix("unix:") {
        Some(path) => Ok(Box::new(std::os::unix::net::UnixStream::connect(path)?)),
        None => Ok(Box::new(std::fs::File::open(endpoint)?)),
    }
}

#[cfg(windows)]
fn open_endpoint(endpoint: &str) -> std::io::Result<Box<dyn Read + Send>> {
    Ok(Box::new(std::fs::File::open(endpoint)?))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::pack_frame;

    #[test]
    fn synthetic_frames_vary_by_frame_number() {
        let a = synthetic_image(0, 8, 8);
        let b = synthetic_image(1, 8, 8);
        assert_ne!(a.data, b.data);
    }

    #[test]
    fn sequence_tag_survives_packing() {
        let mut source = SequencedSource::new(4, 4);
        let frame = pack_frame(source.grab().expect("grab failed")).expect("pack failed");
        assert_eq!(SequencedSource::tag_of(&frame.data), 1);
        let frame = pack_frame(source.grab().expect("grab failed")).expect("pack failed");
        assert_eq!(SequencedSource::tag_of(&frame.data), 2);
    }

    #[test]
    fn failing_source_reports_capture_error() {
        let mut source = FailingSource;
        assert!(matches!(source.grab(), Err(ReelError::Capture(_))));
    }
}
