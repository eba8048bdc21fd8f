//! Segment walk over scatter lists
//!
//! A walk covers one logical byte range of a request. Each step maps a view
//! of the source bytes, the engine transforms some prefix of it in place, and
//! `advance` commits exactly that prefix to the destination. Nothing reaches
//! the destination before commit, so a failed step leaves no partial output.
//!
//! ```text
//! source segments   [ 5 ][     12     ][ 3 ][   9   ]
//!                    \    view(1)      /
//!                     bounce buffer ---> transform ---> advance(n)
//!                                                         |
//! destination       [   8   ][ 4 ][        17         ] <-+
//! ```
//!
//! Views follow the shorter of the current source and destination runs.
//! When an engine asks for more bytes than the run holds, the walk gathers
//! across segment boundaries so a cipher block is never split.

use crate::scatterlist::ScatterList;
use thiserror::Error;
use zeroize::{Zeroize, Zeroizing};

/// Transport errors. These are faults of the data path, not of the cipher.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum WalkError {
    #[error("source holds {available} bytes, request needs {needed}")]
    SourceTooShort { needed: usize, available: usize },

    #[error("destination holds {available} bytes, request needs {needed}")]
    DestinationTooShort { needed: usize, available: usize },

    #[error("commit of {consumed} bytes exceeds the {available}-byte view")]
    OverCommit { consumed: usize, available: usize },

    #[error("walk was aborted")]
    Aborted,

    #[error("segment fault: {0}")]
    Fault(String),
}

/// Source and destination of one request.
#[derive(Debug)]
pub enum Buffers<'a> {
    /// Source and destination are the same list.
    InPlace(&'a mut ScatterList),
    Split {
        src: &'a ScatterList,
        dst: &'a mut ScatterList,
    },
}

impl<'a> Buffers<'a> {
    pub fn source(&self) -> &ScatterList {
        match self {
            Buffers::InPlace(list) => list,
            Buffers::Split { src, .. } => src,
        }
    }

    pub fn destination(&self) -> &ScatterList {
        match self {
            Buffers::InPlace(list) => list,
            Buffers::Split { dst, .. } => dst,
        }
    }

    pub fn destination_mut(&mut self) -> &mut ScatterList {
        match self {
            Buffers::InPlace(list) => list,
            Buffers::Split { dst, .. } => dst,
        }
    }

    pub fn is_in_place(&self) -> bool {
        matches!(self, Buffers::InPlace(_))
    }
}

/// Cursor contract consumed by the mode engines.
pub trait SegmentWalk {
    /// Bytes of the range not yet committed.
    fn remaining(&self) -> usize;

    /// Map the next step.
    ///
    /// Returns the current contiguous run, or at least `min_len` bytes (never
    /// more than `remaining()`) gathered across segment boundaries when the
    /// run is shorter. Calling `view` again before `advance` re-maps the same
    /// step.
    fn view(&mut self, min_len: usize) -> Result<&mut [u8], WalkError>;

    /// Commit the first `consumed` bytes of the current view and return the
    /// bytes still remaining. Uncommitted view bytes are re-visited by the
    /// next `view`.
    fn advance(&mut self, consumed: usize) -> Result<usize, WalkError>;

    /// Drop the current view without committing it. Further views fail.
    fn abort(&mut self);
}

/// Bounce-buffered walk over [`Buffers`].
pub struct ScatterWalk<'w, 'a> {
    buffers: &'w mut Buffers<'a>,
    offset: usize,
    end: usize,
    bounce: Zeroizing<Vec<u8>>,
    mapped: usize,
    aborted: bool,
}

impl<'w, 'a> ScatterWalk<'w, 'a> {
    /// Start a walk over `[offset, offset + len)`.
    ///
    /// Both source and destination must cover the whole range up front.
    pub fn start(buffers: &'w mut Buffers<'a>, offset: usize, len: usize) -> Result<Self, WalkError> {
        let end = offset
            .checked_add(len)
            .ok_or_else(|| WalkError::Fault(format!("range {offset}+{len} overflows")))?;

        let available = buffers.source().len();
        if available < end {
            return Err(WalkError::SourceTooShort { needed: end, available });
        }
        let available = buffers.destination().len();
        if available < end {
            return Err(WalkError::DestinationTooShort { needed: end, available });
        }

        Ok(Self {
            buffers,
            offset,
            end,
            bounce: Zeroizing::new(Vec::new()),
            mapped: 0,
            aborted: false,
        })
    }

    /// Logical offset of the next uncommitted byte.
    pub fn offset(&self) -> usize {
        self.offset
    }
}

impl SegmentWalk for ScatterWalk<'_, '_> {
    fn remaining(&self) -> usize {
        if self.aborted {
            0
        } else {
            self.end - self.offset
        }
    }

    fn view(&mut self, min_len: usize) -> Result<&mut [u8], WalkError> {
        if self.aborted {
            return Err(WalkError::Aborted);
        }

        let remaining = self.end - self.offset;
        let run = self
            .buffers
            .source()
            .run_at(self.offset)
            .min(self.buffers.destination().run_at(self.offset))
            .min(remaining);
        let len = if run >= min_len {
            run
        } else {
            min_len.min(remaining)
        };

        self.bounce.resize(len, 0);
        self.buffers
            .source()
            .copy_out(self.offset, &mut self.bounce[..len])?;
        self.mapped = len;

        Ok(&mut self.bounce[..len])
    }

    fn advance(&mut self, consumed: usize) -> Result<usize, WalkError> {
        if self.aborted {
            return Err(WalkError::Aborted);
        }
        if consumed > self.mapped {
            return Err(WalkError::OverCommit {
                consumed,
                available: self.mapped,
            });
        }

        self.buffers
            .destination_mut()
            .copy_in(self.offset, &self.bounce[..consumed])?;
        self.offset += consumed;
        self.mapped = 0;

        Ok(self.remaining())
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.mapped = 0;
        self.bounce.zeroize();
    }
}

/// Walk wrapper failing at a chosen step, for exercising engine error paths.
#[cfg(test)]
pub(crate) struct FailingWalk<W> {
    pub inner: W,
    pub fail_on_advance: usize,
    pub advances: usize,
    pub aborted: bool,
}

#[cfg(test)]
impl<W: SegmentWalk> FailingWalk<W> {
    pub fn new(inner: W, fail_on_advance: usize) -> Self {
        Self {
            inner,
            fail_on_advance,
            advances: 0,
            aborted: false,
        }
    }
}

#[cfg(test)]
impl<W: SegmentWalk> SegmentWalk for FailingWalk<W> {
    fn remaining(&self) -> usize {
        self.inner.remaining()
    }

    fn view(&mut self, min_len: usize) -> Result<&mut [u8], WalkError> {
        self.inner.view(min_len)
    }

    fn advance(&mut self, consumed: usize) -> Result<usize, WalkError> {
        if self.advances == self.fail_on_advance {
            return Err(WalkError::Fault(format!("injected at step {}", self.advances)));
        }
        self.advances += 1;
        self.inner.advance(consumed)
    }

    fn abort(&mut self) {
        self.aborted = true;
        self.inner.abort();
    }
}
