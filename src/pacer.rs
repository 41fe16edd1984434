//! Frame pacing (producer side)
//!
//! Drives the capture source at a fixed interval and keeps the emitted
//! frame count proportional to elapsed wall-clock time. When the loop falls
//! behind (slow grab, scheduler stall), the gap is closed by re-enqueueing
//! the last real frame rather than letting the output run short — the
//! encoder is told a fixed rate and gets exactly that many frames.

use std::time::{Duration, Instant};

use crossbeam_channel::{Receiver, RecvTimeoutError, TryRecvError};

use crate::codec::pack_frame;
use crate::errors::ReelError;
use crate::queue::FrameProducer;
use crate::source::FrameSource;
use crate::types::Frame;

/// What the pacer thread hands back when it exits.
#[derive(Debug)]
pub struct PacerOutcome {
    /// Frames pushed into the queue, duplicates included.
    pub frames_emitted: u64,
    /// Set when a capture or layout failure ended the loop early.
    pub error: Option<ReelError>,
}

/// Frames the stream must contain after `elapsed` at `frame_rate`.
pub(crate) fn frames_required(elapsed: Duration, frame_rate: u32) -> u64 {
    (elapsed.as_secs_f64() * f64::from(frame_rate)).floor() as u64
}

/// Run the pacing loop until `cancel` fires.
///
/// Each iteration first settles any frame debt by duplicating the previous
/// frame, then captures exactly one new frame, then sleeps out the rest of
/// the interval. The duplicate-before-capture ordering is what keeps the
/// timeline honest; do not reorder it.
pub fn run(
    source: &mut dyn FrameSource,
    queue: &FrameProducer,
    cancel: &Receiver<()>,
    frame_rate: u32,
) -> PacerOutcome {
    debug_assert!(frame_rate > 0);
    let interval = Duration::from_secs_f64(1.0 / f64::from(frame_rate));
    let started = Instant::now();
    let mut emitted: u64 = 0;
    let mut previous: Option<Frame> = None;

    loop {
        match cancel.try_recv() {
            Ok(()) | Err(TryRecvError::Disconnected) => break,
            Err(TryRecvError::Empty) => {}
        }

        let interval_start = Instant::now();

        if let Some(prev) = &previous {
            let required = frames_required(started.elapsed(), frame_rate);
            if required > emitted {
                let owed = required - emitted;
                log::warn!(
                    "pacing fell behind, repeating last frame {} time(s) to hold {} fps",
                    owed,
                    frame_rate
                );
                for _ in 0..owed {
                    queue.push(prev.clone());
                    emitted += 1;
                }
            }
        }

        let frame = match source.grab().and_then(pack_frame) {
            Ok(frame) => frame,
            Err(e) => {
                log::error!("capture failed, ending recording stream: {}", e);
                return PacerOutcome {
                    frames_emitted: emitted,
                    error: Some(e),
                };
            }
        };
        queue.push(frame.clone());
        emitted += 1;
        previous = Some(frame);

        let deadline = interval_start + interval;
        let now = Instant::now();
        if now < deadline {
            // The wait doubles as the cancellation point: a stop request
            // mid-interval returns immediately without pushing more frames.
            match cancel.recv_timeout(deadline - now) {
                Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
                Err(RecvTimeoutError::Timeout) => {}
            }
        }
    }

    PacerOutcome {
        frames_emitted: emitted,
        error: None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    #[test]
    fn required_frames_floor_of_elapsed_times_rate() {
        assert_eq!(frames_required(Duration::from_millis(0), 10), 0);
        assert_eq!(frames_required(Duration::from_millis(99), 10), 0);
        assert_eq!(frames_required(Duration::from_millis(100), 10), 1);
        assert_eq!(frames_required(Duration::from_millis(1050), 10), 10);
        assert_eq!(frames_required(Duration::from_secs(2), 30), 60);
    }

    proptest! {
        #[test]
        fn required_frames_monotonic_in_elapsed(
            ms_a in 0u64..120_000,
            ms_b in 0u64..120_000,
            rate in 1u32..240,
        ) {
            let (lo, hi) = if ms_a <= ms_b { (ms_a, ms_b) } else { (ms_b, ms_a) };
            let lo = frames_required(Duration::from_millis(lo), rate);
            let hi = frames_required(Duration::from_millis(hi), rate);
            prop_assert!(lo <= hi);
        }

        #[test]
        fn required_frames_within_one_of_exact_product(
            ms in 0u64..120_000,
            rate in 1u32..240,
        ) {
            let exact = ms as f64 / 1000.0 * f64::from(rate);
            let required = frames_required(Duration::from_millis(ms), rate);
            prop_assert!(required as f64 <= exact);
            prop_assert!(required as f64 > exact - 1.0);
        }
    }
}
