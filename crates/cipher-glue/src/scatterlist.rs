//! Scatter lists: one logical byte range stored in separately allocated
//! segments.

use crate::walk::WalkError;

/// Ordered list of owned segments forming one logical buffer.
///
/// Segments may have any length, including zero. Offsets used by the
/// accessors are logical offsets into the concatenation of all segments.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScatterList {
    segments: Vec<Vec<u8>>,
}

impl ScatterList {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_segments(segments: Vec<Vec<u8>>) -> Self {
        Self { segments }
    }

    /// Single contiguous segment.
    pub fn contiguous(data: impl Into<Vec<u8>>) -> Self {
        Self {
            segments: vec![data.into()],
        }
    }

    /// Split `data` into segments of the given sizes.
    ///
    /// Sizes past the end of `data` are clamped; bytes left over after the
    /// last size land in one trailing segment.
    pub fn split(data: &[u8], sizes: &[usize]) -> Self {
        let mut segments = Vec::with_capacity(sizes.len() + 1);
        let mut rest = data;
        for &size in sizes {
            let take = size.min(rest.len());
            let (head, tail) = rest.split_at(take);
            segments.push(head.to_vec());
            rest = tail;
        }
        if !rest.is_empty() {
            segments.push(rest.to_vec());
        }
        Self { segments }
    }

    /// Zero-filled list with the given segment sizes.
    pub fn zeroed(sizes: &[usize]) -> Self {
        Self {
            segments: sizes.iter().map(|&size| vec![0u8; size]).collect(),
        }
    }

    pub fn push_segment(&mut self, segment: Vec<u8>) {
        self.segments.push(segment);
    }

    pub fn segments(&self) -> &[Vec<u8>] {
        &self.segments
    }

    pub fn segment_count(&self) -> usize {
        self.segments.len()
    }

    /// Total logical length.
    pub fn len(&self) -> usize {
        self.segments.iter().map(Vec::len).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Concatenate all segments.
    pub fn to_vec(&self) -> Vec<u8> {
        self.segments.concat()
    }

    /// Contiguous bytes available at `offset` before the next segment
    /// boundary. Zero at or past the end.
    pub fn run_at(&self, offset: usize) -> usize {
        match self.locate(offset) {
            Some((index, within)) => self.segments[index].len() - within,
            None => 0,
        }
    }

    /// Gather `out.len()` bytes starting at `offset`.
    pub fn copy_out(&self, offset: usize, out: &mut [u8]) -> Result<(), WalkError> {
        self.check_range(offset, out.len(), Side::Source)?;
        let mut filled = 0;
        let mut cursor = offset;
        while filled < out.len() {
            let (index, within) = self.locate(cursor).ok_or(WalkError::SourceTooShort {
                needed: offset + out.len(),
                available: self.len(),
            })?;
            let segment = &self.segments[index][within..];
            let take = segment.len().min(out.len() - filled);
            out[filled..filled + take].copy_from_slice(&segment[..take]);
            filled += take;
            cursor += take;
        }
        Ok(())
    }

    /// Scatter `data` into the list starting at `offset`.
    pub fn copy_in(&mut self, offset: usize, data: &[u8]) -> Result<(), WalkError> {
        self.check_range(offset, data.len(), Side::Destination)?;
        let total = self.len();
        let mut written = 0;
        let mut cursor = offset;
        while written < data.len() {
            let (index, within) = self.locate(cursor).ok_or(WalkError::DestinationTooShort {
                needed: offset + data.len(),
                available: total,
            })?;
            let segment = &mut self.segments[index][within..];
            let take = segment.len().min(data.len() - written);
            segment[..take].copy_from_slice(&data[written..written + take]);
            written += take;
            cursor += take;
        }
        Ok(())
    }

    /// Overwrite `len` bytes at `offset` with zeros.
    pub fn fill_zero(&mut self, offset: usize, len: usize) -> Result<(), WalkError> {
        self.copy_in(offset, &vec![0u8; len])
    }

    /// Segment index and in-segment offset holding logical byte `offset`.
    /// Empty segments are skipped.
    fn locate(&self, offset: usize) -> Option<(usize, usize)> {
        let mut start = 0;
        for (index, segment) in self.segments.iter().enumerate() {
            let end = start + segment.len();
            if offset < end {
                return Some((index, offset - start));
            }
            start = end;
        }
        None
    }

    fn check_range(&self, offset: usize, len: usize, side: Side) -> Result<(), WalkError> {
        let available = self.len();
        let needed = offset.checked_add(len).ok_or(WalkError::Fault(format!(
            "range {offset}+{len} overflows"
        )))?;
        if needed > available {
            return Err(match side {
                Side::Source => WalkError::SourceTooShort { needed, available },
                Side::Destination => WalkError::DestinationTooShort { needed, available },
            });
        }
        Ok(())
    }
}

#[derive(Clone, Copy)]
enum Side {
    Source,
    Destination,
}

impl From<Vec<u8>> for ScatterList {
    fn from(data: Vec<u8>) -> Self {
        Self::contiguous(data)
    }
}
