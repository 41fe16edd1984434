//! Encoder subprocess contract
//!
//! The actual compression happens inside an external ffmpeg process that
//! reads the raw BGRA stream from our pipe and writes the finished
//! container file. This module owns the command-line contract and a thin
//! process-control seam so the pipeline never touches `std::process`
//! directly (tests substitute the launcher).

use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::thread::JoinHandle;

use crate::errors::ReelError;
use crate::types::{EvenDimensions, PIXEL_FORMAT};

/// Constant-rate-factor quality, 0 (lossless) to 51 (worst).
pub const CRF_MAX: u8 = 51;

/// A fully resolved encoder invocation.
#[derive(Debug, Clone)]
pub struct EncoderCommand {
    pub program: PathBuf,
    pub args: Vec<String>,
}

impl EncoderCommand {
    /// Build the ffmpeg invocation for one recording.
    ///
    /// The input side declares the true captured resolution; the output
    /// side scales to the even-rounded resolution because libx264 rejects
    /// odd dimensions. The destination path is the final positional
    /// argument and is overwritten if present (`-y`).
    pub fn build(
        ffmpeg: &Path,
        frame_rate: u32,
        crf: u8,
        width: u32,
        height: u32,
        pipe_endpoint: &str,
        output: &Path,
    ) -> Self {
        let scaled = EvenDimensions::from_captured(width, height);
        let args = vec![
            "-framerate".to_string(),
            frame_rate.to_string(),
            "-f".to_string(),
            "rawvideo".to_string(),
            "-pix_fmt".to_string(),
            PIXEL_FORMAT.to_string(),
            "-s".to_string(),
            format!("{}x{}", width, height),
            "-i".to_string(),
            pipe_endpoint.to_string(),
            "-c:v".to_string(),
            "libx264".to_string(),
            "-crf".to_string(),
            crf.min(CRF_MAX).to_string(),
            "-pix_fmt".to_string(),
            "yuv420p".to_string(),
            "-r".to_string(),
            frame_rate.to_string(),
            "-vf".to_string(),
            format!("scale={}:{}", scaled.width, scaled.height),
            "-y".to_string(),
            output.to_string_lossy().to_string(),
        ];
        Self {
            program: ffmpeg.to_path_buf(),
            args,
        }
    }
}

/// A running encoder process.
pub trait EncoderHandle: Send {
    /// Block until the process exits. Err on abnormal exit.
    fn wait(&mut self) -> Result<(), ReelError>;
}

/// Spawns encoder processes. The streamer only knows this seam.
pub trait EncoderLauncher: Send {
    fn launch(&self, command: &EncoderCommand) -> Result<Box<dyn EncoderHandle>, ReelError>;
}

/// Default launcher: a real ffmpeg subprocess with stdout/stderr captured
/// and forwarded to the log, line by line.
#[derive(Debug, Default)]
pub struct FfmpegLauncher;

impl EncoderLauncher for FfmpegLauncher {
    fn launch(&self, command: &EncoderCommand) -> Result<Box<dyn EncoderHandle>, ReelError> {
        log::info!(
            "starting encoder: {} {}",
            command.program.display(),
            command.args.join(" ")
        );
        let mut child = Command::new(&command.program)
            .args(&command.args)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| {
                ReelError::Encoder(format!(
                    "failed to spawn {}: {}",
                    command.program.display(),
                    e
                ))
            })?;

        let mut forwarders = Vec::new();
        if let Some(stdout) = child.stdout.take() {
            forwarders.extend(forward_lines("encoder-stdout", stdout));
        }
        if let Some(stderr) = child.stderr.take() {
            forwarders.extend(forward_lines("encoder-stderr", stderr));
        }

        Ok(Box::new(FfmpegHandle { child, forwarders }))
    }
}

struct FfmpegHandle {
    child: Child,
    forwarders: Vec<JoinHandle<()>>,
}

impl EncoderHandle for FfmpegHandle {
    fn wait(&mut self) -> Result<(), ReelError> {
        let status = self
            .child
            .wait()
            .map_err(|e| ReelError::Encoder(format!("wait on encoder failed: {}", e)))?;
        for handle in self.forwarders.drain(..) {
            let _ = handle.join();
        }
        if status.success() {
            log::info!("encoder exited cleanly");
            Ok(())
        } else {
            Err(ReelError::Encoder(format!(
                "encoder exited with status {}",
                status
            )))
        }
    }
}

fn forward_lines<R>(thread_name: &str, stream: R) -> Option<JoinHandle<()>>
where
    R: std::io::Read + Send + 'static,
{
    let spawned = std::thread::Builder::new()
        .name(format!("screenreel-{}", thread_name))
        .spawn(move || {
            let reader = BufReader::new(stream);
            for line in reader.lines() {
                match line {
                    Ok(line) => {
                        if !line.trim().is_empty() {
                            log::debug!("ffmpeg: {}", line);
                        }
                    }
                    Err(_) => break,
                }
            }
        });
    match spawned {
        Ok(handle) => Some(handle),
        Err(e) => {
            // Recording can proceed without log forwarding.
            log::warn!("could not spawn {} forwarder: {}", thread_name, e);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn command_scales_odd_dimensions_down_to_even() {
        let cmd = EncoderCommand::build(
            Path::new("ffmpeg"),
            30,
            23,
            101,
            51,
            "unix:/tmp/reel.sock",
            Path::new("/tmp/out.mp4"),
        );
        let args = cmd.args.join(" ");
        assert!(args.contains("-s 101x51"), "raw size must stay true: {}", args);
        assert!(args.contains("scale=100:50"), "scale must be even: {}", args);
    }

    #[test]
    fn command_declares_raw_input_contract() {
        let cmd = EncoderCommand::build(
            Path::new("/opt/ffmpeg"),
            10,
            23,
            640,
            480,
            "unix:/tmp/reel.sock",
            Path::new("/tmp/clip.mp4"),
        );
        let args = cmd.args.join(" ");
        assert!(args.contains("-f rawvideo"));
        assert!(args.contains("-pix_fmt bgra"));
        assert!(args.contains("-framerate 10"));
        assert!(args.contains("-i unix:/tmp/reel.sock"));
        assert!(args.contains("-c:v libx264"));
        assert!(args.contains("-crf 23"));
        assert!(args.ends_with("-y /tmp/clip.mp4"));
    }

    #[test]
    fn crf_is_clamped_to_valid_range() {
        let cmd = EncoderCommand::build(
            Path::new("ffmpeg"),
            30,
            200,
            640,
            480,
            "unix:/tmp/reel.sock",
            Path::new("/tmp/out.mp4"),
        );
        assert!(cmd.args.join(" ").contains("-crf 51"));
    }
}
