//! Streaming GCM over a walked byte range.
//!
//! The one-shot `aes-gcm` API needs the whole message in one slice. The walk
//! hands out arbitrary spans, so this keeps the CTR position and a partial
//! GHASH block between calls.

use super::block::{xor_in_place, AesBlock};
use super::AES_BLOCK_SIZE;
use crate::error::{GlueError, Result};
use ghash::universal_hash::{KeyInit, UniversalHash};
use ghash::GHash;
use subtle::ConstantTimeEq;
use zeroize::Zeroize;

/// Standard IV length with the fast J0 derivation.
pub const GCM_STANDARD_IV_SIZE: usize = 12;

/// Largest payload per message: 2^39 - 256 bits.
const MAX_TEXT_LEN: u64 = (1 << 36) - 32;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    AssociatedData,
    Text,
}

/// One in-flight GCM message.
pub struct GcmStream {
    ghash: GHash,
    pending: [u8; AES_BLOCK_SIZE],
    pending_len: usize,
    tag_mask: [u8; AES_BLOCK_SIZE],
    counter: [u8; AES_BLOCK_SIZE],
    keystream: [u8; AES_BLOCK_SIZE],
    keystream_left: usize,
    aad_len: u64,
    text_len: u64,
    phase: Phase,
}

impl GcmStream {
    pub fn start(cipher: &AesBlock, hash_key: &[u8; AES_BLOCK_SIZE], iv: &[u8]) -> Result<Self> {
        if iv.is_empty() {
            return Err(GlueError::IvSetupFailure("GCM IV must not be empty".into()));
        }

        let key = ghash::Key::clone_from_slice(hash_key);
        let j0 = derive_j0(&key, iv);

        let mut tag_mask = j0;
        cipher.encrypt_block(&mut tag_mask);
        let mut counter = j0;
        inc32(&mut counter);

        Ok(Self {
            ghash: GHash::new(&key),
            pending: [0u8; AES_BLOCK_SIZE],
            pending_len: 0,
            tag_mask,
            counter,
            keystream: [0u8; AES_BLOCK_SIZE],
            keystream_left: 0,
            aad_len: 0,
            text_len: 0,
            phase: Phase::AssociatedData,
        })
    }

    pub fn absorb_aad(&mut self, aad: &[u8]) -> Result<()> {
        if self.phase == Phase::Text {
            return Err(GlueError::TransformFailure(
                "associated data after payload".into(),
            ));
        }
        self.aad_len += aad.len() as u64;
        self.hash(aad);
        Ok(())
    }

    pub fn encrypt(&mut self, cipher: &AesBlock, data: &mut [u8]) -> Result<()> {
        self.enter_text(data.len())?;
        self.apply_keystream(cipher, data);
        self.hash(data);
        Ok(())
    }

    pub fn decrypt(&mut self, cipher: &AesBlock, data: &mut [u8]) -> Result<()> {
        self.enter_text(data.len())?;
        self.hash(data);
        self.apply_keystream(cipher, data);
        Ok(())
    }

    /// Full 16-byte tag.
    pub fn finish(mut self) -> [u8; AES_BLOCK_SIZE] {
        self.flush();

        let mut lengths = [0u8; AES_BLOCK_SIZE];
        lengths[..8].copy_from_slice(&(self.aad_len * 8).to_be_bytes());
        lengths[8..].copy_from_slice(&(self.text_len * 8).to_be_bytes());
        self.ghash.update(&[ghash::Block::clone_from_slice(&lengths)]);

        let mut tag = [0u8; AES_BLOCK_SIZE];
        tag.copy_from_slice(&self.ghash.clone().finalize());
        xor_in_place(&mut tag, &self.tag_mask);
        tag
    }

    /// Constant-time comparison against the leading `expected.len()` bytes.
    pub fn verify(self, expected: &[u8]) -> bool {
        let mut tag = self.finish();
        let matches = bool::from(tag[..expected.len()].ct_eq(expected));
        tag.zeroize();
        matches
    }

    fn enter_text(&mut self, len: usize) -> Result<()> {
        if self.phase == Phase::AssociatedData {
            self.flush();
            self.phase = Phase::Text;
        }
        let total = self.text_len + len as u64;
        if total > MAX_TEXT_LEN {
            return Err(GlueError::TransformFailure(format!(
                "GCM payload of {total} bytes exceeds the per-message limit"
            )));
        }
        self.text_len = total;
        Ok(())
    }

    fn apply_keystream(&mut self, cipher: &AesBlock, data: &mut [u8]) {
        for byte in data.iter_mut() {
            if self.keystream_left == 0 {
                self.keystream = self.counter;
                cipher.encrypt_block(&mut self.keystream);
                inc32(&mut self.counter);
                self.keystream_left = AES_BLOCK_SIZE;
            }
            *byte ^= self.keystream[AES_BLOCK_SIZE - self.keystream_left];
            self.keystream_left -= 1;
        }
    }

    /// Feed bytes to GHASH, holding back a partial block.
    fn hash(&mut self, mut data: &[u8]) {
        if self.pending_len > 0 {
            let take = (AES_BLOCK_SIZE - self.pending_len).min(data.len());
            self.pending[self.pending_len..self.pending_len + take].copy_from_slice(&data[..take]);
            self.pending_len += take;
            data = &data[take..];
            if self.pending_len < AES_BLOCK_SIZE {
                return;
            }
            self.ghash
                .update(&[ghash::Block::clone_from_slice(&self.pending)]);
            self.pending_len = 0;
        }

        let mut blocks = data.chunks_exact(AES_BLOCK_SIZE);
        for block in &mut blocks {
            self.ghash.update(&[ghash::Block::clone_from_slice(block)]);
        }
        let rest = blocks.remainder();
        self.pending[..rest.len()].copy_from_slice(rest);
        self.pending_len = rest.len();
    }

    /// Zero-pad and absorb the held-back partial block.
    fn flush(&mut self) {
        if self.pending_len > 0 {
            self.ghash.update_padded(&self.pending[..self.pending_len]);
            self.pending_len = 0;
        }
    }
}

impl Drop for GcmStream {
    fn drop(&mut self) {
        self.pending.zeroize();
        self.tag_mask.zeroize();
        self.counter.zeroize();
        self.keystream.zeroize();
    }
}

/// Pre-counter block: `IV || 0^31 || 1` for 96-bit IVs, GHASH of the
/// padded IV and its bit length otherwise.
fn derive_j0(key: &ghash::Key, iv: &[u8]) -> [u8; AES_BLOCK_SIZE] {
    let mut j0 = [0u8; AES_BLOCK_SIZE];
    if iv.len() == GCM_STANDARD_IV_SIZE {
        j0[..GCM_STANDARD_IV_SIZE].copy_from_slice(iv);
        j0[AES_BLOCK_SIZE - 1] = 1;
        return j0;
    }

    let mut hasher = GHash::new(key);
    hasher.update_padded(iv);
    let mut lengths = [0u8; AES_BLOCK_SIZE];
    lengths[8..].copy_from_slice(&((iv.len() as u64) * 8).to_be_bytes());
    hasher.update(&[ghash::Block::clone_from_slice(&lengths)]);
    j0.copy_from_slice(&hasher.finalize());
    j0
}

/// Increment the low 32 bits, big-endian, wrapping.
fn inc32(block: &mut [u8; AES_BLOCK_SIZE]) {
    let mut low = [0u8; 4];
    low.copy_from_slice(&block[12..]);
    let next = u32::from_be_bytes(low).wrapping_add(1);
    block[12..].copy_from_slice(&next.to_be_bytes());
}
