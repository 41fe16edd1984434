//! Capture-source seam
//!
//! Screen and window grabbing lives behind this trait; the pipeline only
//! ever sees one raw image per call. Display-API backends are out of scope
//! here, synthetic sources for offline use live in [`crate::testing`].

use crate::errors::ReelError;
use crate::types::RawImage;

/// Produces one raw image on demand.
///
/// Called synchronously from the pacer thread at the target frame rate, so
/// implementations must tolerate back-to-back calls. Ownership of the
/// returned image transfers to the caller.
pub trait FrameSource: Send {
    fn grab(&mut self) -> Result<RawImage, ReelError>;
}

impl<F> FrameSource for F
where
    F: FnMut() -> Result<RawImage, ReelError> + Send,
{
    fn grab(&mut self) -> Result<RawImage, ReelError> {
        self()
    }
}
