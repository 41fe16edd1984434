//! Frame streaming (consumer side)
//!
//! Pulls paced frames off the queue and writes them, in arrival order, into
//! the encoder's pipe. The encoder process is started lazily on the first
//! frame because its command line needs the captured dimensions; until then
//! nothing is spawned and no output file is touched.

use std::fs;
use std::io::Write;

use crate::encoder::{EncoderCommand, EncoderHandle, EncoderLauncher};
use crate::errors::ReelError;
use crate::pipe::{PipeConnection, PipeServer};
use crate::queue::FrameConsumer;
use crate::session::RecordingSettings;

struct ActiveEncoder {
    handle: Box<dyn EncoderHandle>,
    pipe: PipeConnection,
}

/// Run the streaming loop until the queue completes and drains.
///
/// Returns the number of frames delivered to the encoder. If no frame ever
/// arrives, returns 0 without spawning anything.
pub fn run(
    queue: FrameConsumer,
    launcher: &dyn EncoderLauncher,
    settings: &RecordingSettings,
) -> Result<u64, ReelError> {
    let mut active: Option<ActiveEncoder> = None;
    let mut delivered: u64 = 0;
    let mut stream_error: Option<ReelError> = None;

    while let Some(frame) = queue.recv() {
        if active.is_none() {
            match start_encoder(launcher, settings, frame.width, frame.height) {
                Ok(enc) => active = Some(enc),
                Err(e) => {
                    stream_error = Some(e);
                    break;
                }
            }
        }
        if let Some(enc) = active.as_mut() {
            if let Err(e) = enc.pipe.write_all(&frame.data) {
                stream_error = Some(ReelError::Io(e));
                break;
            }
            delivered += 1;
        }
    }

    // The process must be reaped on every exit path, a failed write
    // included; otherwise each broken recording leaks a zombie encoder.
    if let Some(mut enc) = active.take() {
        if stream_error.is_none() {
            log::debug!(
                "frame stream complete after {} frame(s), closing encoder input",
                delivered
            );
            if let Err(e) = enc.pipe.flush() {
                stream_error = Some(ReelError::Io(e));
            }
        }
        // Closing the pipe is the encoder's end-of-input signal; only then
        // can it finalize the container and exit.
        drop(enc.pipe);
        match enc.handle.wait() {
            Ok(()) => {}
            Err(e) if stream_error.is_none() => stream_error = Some(e),
            Err(e) => log::warn!("encoder exit after stream failure: {}", e),
        }
    }

    match stream_error {
        Some(e) => Err(e),
        None => Ok(delivered),
    }
}

fn start_encoder(
    launcher: &dyn EncoderLauncher,
    settings: &RecordingSettings,
    width: u32,
    height: u32,
) -> Result<ActiveEncoder, ReelError> {
    if let Some(parent) = settings.output.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    // The pipe endpoint must exist before the process is spawned, or the
    // encoder's open of the input would race the bind.
    let server = PipeServer::create()?;
    let command = EncoderCommand::build(
        &settings.ffmpeg,
        settings.frame_rate,
        settings.crf,
        width,
        height,
        server.endpoint(),
        &settings.output,
    );
    let mut handle = launcher.launch(&command)?;

    log::debug!("waiting for encoder to connect to {}", server.endpoint());
    let pipe = match server.accept() {
        Ok(pipe) => pipe,
        Err(e) => {
            // Tearing down the server endpoint makes the process's input
            // open fail, so it exits and the wait below cannot hang.
            drop(server);
            if let Err(we) = handle.wait() {
                log::warn!("encoder exit after failed connect: {}", we);
            }
            return Err(e);
        }
    };
    log::info!(
        "encoder connected, streaming {}x{} frames to {}",
        width,
        height,
        settings.output.display()
    );

    Ok(ActiveEncoder { handle, pipe })
}
