//! Mode engines
//!
//! CBC, CFB and XTS share one walk driver. Each mode supplies a
//! [`WalkCipher`] describing how much of a view it can take and how to
//! transform it; the driver owns the request state machine:
//!
//! ```text
//! awaiting_iv --set_iv--> streaming --remaining == 0--> done
//!                            |  view -> span_len -> transform -> advance
//!                            +--error--> walk aborted, error returned
//! ```
//!
//! GCM interleaves associated data and payload inside one walk and has its
//! own loop in [`gcm`].

pub mod cbc;
pub mod cfb;
pub mod gcm;
pub mod xts;

use crate::error::{GlueError, Result};
use crate::primitive::AES_BLOCK_SIZE;
use crate::walk::SegmentWalk;

/// Per-mode capabilities driven by [`drive`].
pub(crate) trait WalkCipher {
    /// Load the request IV or tweak.
    fn set_iv(&mut self, iv: &[u8; AES_BLOCK_SIZE]) -> Result<()>;

    /// Smallest view the mode can make progress on.
    fn min_span(&self, remaining: usize) -> usize;

    /// Bytes of an `available`-byte view to transform now. Zero means the
    /// view is unusable.
    fn span_len(&self, available: usize, remaining: usize) -> usize;

    fn transform(&mut self, span: &mut [u8]) -> Result<()>;

    /// Chaining value to hand back to the caller, if the mode has one.
    fn output_iv(&self) -> Option<[u8; AES_BLOCK_SIZE]>;
}

/// Run one request through `walk`. On failure the walk is aborted and the
/// failing step's error returned unchanged.
pub(crate) fn drive<W, C>(walk: &mut W, cipher: &mut C, iv: &mut [u8; AES_BLOCK_SIZE]) -> Result<()>
where
    W: SegmentWalk,
    C: WalkCipher,
{
    let result = stream(walk, cipher, iv);
    if result.is_err() {
        walk.abort();
    }
    result
}

fn stream<W, C>(walk: &mut W, cipher: &mut C, iv: &mut [u8; AES_BLOCK_SIZE]) -> Result<()>
where
    W: SegmentWalk,
    C: WalkCipher,
{
    cipher.set_iv(iv)?;

    while walk.remaining() > 0 {
        let remaining = walk.remaining();
        let span = walk.view(cipher.min_span(remaining))?;
        let available = span.len();
        let len = cipher.span_len(available, remaining);
        if len == 0 {
            return Err(GlueError::TransformFailure(format!(
                "walk step of {available} bytes too short with {remaining} bytes remaining"
            )));
        }
        cipher.transform(&mut span[..len])?;
        walk.advance(len)?;
    }

    if let Some(next) = cipher.output_iv() {
        *iv = next;
    }
    Ok(())
}

#[cfg(test)]
pub(crate) mod test_support {
    //! Shared fixtures for the engine tests.

    use crate::scatterlist::ScatterList;

    pub fn h(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    pub fn iv16(s: &str) -> [u8; 16] {
        let mut iv = [0u8; 16];
        iv.copy_from_slice(&h(s));
        iv
    }

    /// Ragged layout: 1, 5, 17, 3, 16, ... bytes.
    pub fn ragged(data: &[u8]) -> ScatterList {
        ScatterList::split(data, &[1, 5, 17, 3, 16, 2, 31, 7])
    }
}
