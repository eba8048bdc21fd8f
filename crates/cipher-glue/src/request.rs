//! Cipher requests: which bytes to transform and where to put them.

use crate::primitive::AES_BLOCK_SIZE;
use crate::scatterlist::ScatterList;
use crate::walk::{Buffers, ScatterWalk, WalkError};

/// Request for the unauthenticated modes (CBC, CFB, XTS).
///
/// `iv` is the initial IV or tweak. CBC and CFB write the final chaining
/// value back into it, so consecutive requests continue one stream.
#[derive(Debug)]
pub struct SkcipherRequest<'a> {
    buffers: Buffers<'a>,
    cryptlen: usize,
    iv: [u8; AES_BLOCK_SIZE],
}

impl<'a> SkcipherRequest<'a> {
    pub fn new(
        src: &'a ScatterList,
        dst: &'a mut ScatterList,
        cryptlen: usize,
        iv: [u8; AES_BLOCK_SIZE],
    ) -> Self {
        Self {
            buffers: Buffers::Split { src, dst },
            cryptlen,
            iv,
        }
    }

    pub fn in_place(list: &'a mut ScatterList, cryptlen: usize, iv: [u8; AES_BLOCK_SIZE]) -> Self {
        Self {
            buffers: Buffers::InPlace(list),
            cryptlen,
            iv,
        }
    }

    pub fn cryptlen(&self) -> usize {
        self.cryptlen
    }

    pub fn iv(&self) -> &[u8; AES_BLOCK_SIZE] {
        &self.iv
    }

    pub fn buffers(&self) -> &Buffers<'a> {
        &self.buffers
    }

    /// Walk over the whole payload, together with the IV it chains through.
    pub(crate) fn walk(&mut self) -> Result<(ScatterWalk<'_, 'a>, &mut [u8; AES_BLOCK_SIZE]), WalkError> {
        let walk = ScatterWalk::start(&mut self.buffers, 0, self.cryptlen)?;
        Ok((walk, &mut self.iv))
    }
}

/// Request for the AEAD mode.
///
/// The source holds `assoclen` bytes of associated data followed by
/// `cryptlen` bytes of payload. On decryption `cryptlen` includes the
/// trailing tag.
#[derive(Debug)]
pub struct AeadRequest<'a> {
    buffers: Buffers<'a>,
    assoclen: usize,
    cryptlen: usize,
    iv: Vec<u8>,
}

impl<'a> AeadRequest<'a> {
    pub fn new(
        src: &'a ScatterList,
        dst: &'a mut ScatterList,
        assoclen: usize,
        cryptlen: usize,
        iv: &[u8],
    ) -> Self {
        Self {
            buffers: Buffers::Split { src, dst },
            assoclen,
            cryptlen,
            iv: iv.to_vec(),
        }
    }

    pub fn in_place(list: &'a mut ScatterList, assoclen: usize, cryptlen: usize, iv: &[u8]) -> Self {
        Self {
            buffers: Buffers::InPlace(list),
            assoclen,
            cryptlen,
            iv: iv.to_vec(),
        }
    }

    pub fn assoclen(&self) -> usize {
        self.assoclen
    }

    pub fn cryptlen(&self) -> usize {
        self.cryptlen
    }

    pub fn iv(&self) -> &[u8] {
        &self.iv
    }

    pub fn buffers(&self) -> &Buffers<'a> {
        &self.buffers
    }

    pub(crate) fn buffers_mut(&mut self) -> &mut Buffers<'a> {
        &mut self.buffers
    }

    pub(crate) fn walk(&mut self, len: usize) -> Result<ScatterWalk<'_, 'a>, WalkError> {
        ScatterWalk::start(&mut self.buffers, 0, len)
    }
}
