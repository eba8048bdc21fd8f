//! AES key schedules with a running chaining register.
//!
//! `AesState` is the primitive the CBC and CFB engines drive. The register
//! (IV for CBC, feedback register for CFB) lives here and is carried across
//! walk steps, so an engine only installs the request IV once.

use super::gcm::GcmStream;
use super::AES_BLOCK_SIZE;
use crate::error::{GlueError, Result};
use aes::{Aes128, Aes192, Aes256};
use cipher::generic_array::GenericArray;
use cipher::{BlockDecrypt, BlockEncrypt, KeyInit};
use std::fmt;
use zeroize::Zeroize;

/// Direction a key schedule was installed for.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Encrypt,
    Decrypt,
}

/// AES block cipher over one of the three key sizes.
#[derive(Clone)]
pub enum AesBlock {
    Aes128(Aes128),
    Aes192(Aes192),
    Aes256(Aes256),
}

impl AesBlock {
    /// Expand a 16, 24 or 32 byte key.
    pub fn new(key: &[u8]) -> Result<Self> {
        let rejected = |_| GlueError::KeyRejected(format!("unusable {}-byte AES key", key.len()));
        match key.len() {
            16 => Aes128::new_from_slice(key).map(AesBlock::Aes128).map_err(rejected),
            24 => Aes192::new_from_slice(key).map(AesBlock::Aes192).map_err(rejected),
            32 => Aes256::new_from_slice(key).map(AesBlock::Aes256).map_err(rejected),
            n => Err(GlueError::KeyRejected(format!(
                "AES key must be 16, 24 or 32 bytes, got {n}"
            ))),
        }
    }

    pub fn key_size(&self) -> usize {
        match self {
            AesBlock::Aes128(_) => 16,
            AesBlock::Aes192(_) => 24,
            AesBlock::Aes256(_) => 32,
        }
    }

    /// Encrypt one 16-byte block in place.
    pub fn encrypt_block(&self, block: &mut [u8; AES_BLOCK_SIZE]) {
        let block = GenericArray::from_mut_slice(&mut block[..]);
        match self {
            AesBlock::Aes128(c) => c.encrypt_block(block),
            AesBlock::Aes192(c) => c.encrypt_block(block),
            AesBlock::Aes256(c) => c.encrypt_block(block),
        }
    }

    /// Decrypt one 16-byte block in place.
    pub fn decrypt_block(&self, block: &mut [u8; AES_BLOCK_SIZE]) {
        let block = GenericArray::from_mut_slice(&mut block[..]);
        match self {
            AesBlock::Aes128(c) => c.decrypt_block(block),
            AesBlock::Aes192(c) => c.decrypt_block(block),
            AesBlock::Aes256(c) => c.decrypt_block(block),
        }
    }
}

impl fmt::Debug for AesBlock {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "AesBlock(AES-{}, <redacted>)", self.key_size() * 8)
    }
}

/// One keyed AES state.
///
/// Aligned to the block size for the accelerated backends. Key-dependent
/// buffers are wiped on drop.
#[repr(align(16))]
pub struct AesState {
    cipher: Option<AesBlock>,
    direction: Direction,
    reg: [u8; AES_BLOCK_SIZE],
    keystream: [u8; AES_BLOCK_SIZE],
    left: usize,
    hash_key: Option<[u8; AES_BLOCK_SIZE]>,
    gcm: Option<GcmStream>,
}

impl Default for AesState {
    fn default() -> Self {
        Self::new()
    }
}

impl AesState {
    /// Unkeyed state.
    pub fn new() -> Self {
        Self {
            cipher: None,
            direction: Direction::Encrypt,
            reg: [0u8; AES_BLOCK_SIZE],
            keystream: [0u8; AES_BLOCK_SIZE],
            left: 0,
            hash_key: None,
            gcm: None,
        }
    }

    /// Install a key schedule for `direction`. Resets all running state.
    pub fn set_key(&mut self, key: &[u8], direction: Direction) -> Result<()> {
        let cipher = AesBlock::new(key)?;
        self.reset();
        self.cipher = Some(cipher);
        self.direction = direction;
        Ok(())
    }

    pub fn is_keyed(&self) -> bool {
        self.cipher.is_some()
    }

    pub fn direction(&self) -> Direction {
        self.direction
    }

    pub fn key_size(&self) -> Option<usize> {
        self.cipher.as_ref().map(AesBlock::key_size)
    }

    /// Load the chaining register and drop any buffered keystream.
    pub fn set_iv(&mut self, iv: &[u8]) -> Result<()> {
        if iv.len() != AES_BLOCK_SIZE {
            return Err(GlueError::IvSetupFailure(format!(
                "IV must be {AES_BLOCK_SIZE} bytes, got {}",
                iv.len()
            )));
        }
        self.reg.copy_from_slice(iv);
        self.keystream.zeroize();
        self.left = 0;
        Ok(())
    }

    /// Current chaining register: the IV for the next request.
    pub fn iv(&self) -> [u8; AES_BLOCK_SIZE] {
        self.reg
    }

    pub fn cbc_encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        let cipher = keyed(&self.cipher, self.direction, Direction::Encrypt, "CBC encrypt")?;
        whole_blocks(data.len())?;
        for chunk in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            let block = as_block(chunk)?;
            xor_in_place(block, &self.reg);
            cipher.encrypt_block(block);
            self.reg = *block;
        }
        Ok(())
    }

    pub fn cbc_decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        let cipher = keyed(&self.cipher, self.direction, Direction::Decrypt, "CBC decrypt")?;
        whole_blocks(data.len())?;
        for chunk in data.chunks_exact_mut(AES_BLOCK_SIZE) {
            let block = as_block(chunk)?;
            let next = *block;
            cipher.decrypt_block(block);
            xor_in_place(block, &self.reg);
            self.reg = next;
        }
        Ok(())
    }

    /// CFB-128 encryption of any number of bytes. A partially used
    /// keystream block carries over to the next call.
    pub fn cfb_encrypt(&mut self, data: &mut [u8]) -> Result<()> {
        let cipher = keyed(&self.cipher, self.direction, Direction::Encrypt, "CFB encrypt")?;
        for byte in data.iter_mut() {
            if self.left == 0 {
                self.keystream = self.reg;
                cipher.encrypt_block(&mut self.keystream);
                self.left = AES_BLOCK_SIZE;
            }
            let pos = AES_BLOCK_SIZE - self.left;
            *byte ^= self.keystream[pos];
            self.reg[pos] = *byte;
            self.left -= 1;
        }
        Ok(())
    }

    /// CFB-128 decryption. Runs on the encryption key schedule.
    pub fn cfb_decrypt(&mut self, data: &mut [u8]) -> Result<()> {
        let cipher = keyed(&self.cipher, self.direction, Direction::Encrypt, "CFB decrypt")?;
        for byte in data.iter_mut() {
            if self.left == 0 {
                self.keystream = self.reg;
                cipher.encrypt_block(&mut self.keystream);
                self.left = AES_BLOCK_SIZE;
            }
            let pos = AES_BLOCK_SIZE - self.left;
            let ciphertext = *byte;
            *byte ^= self.keystream[pos];
            self.reg[pos] = ciphertext;
            self.left -= 1;
        }
        Ok(())
    }

    /// Install a GCM key: encryption schedule plus hash subkey H = E(0).
    pub fn gcm_set_key(&mut self, key: &[u8]) -> Result<()> {
        self.set_key(key, Direction::Encrypt)?;
        let cipher = keyed(&self.cipher, self.direction, Direction::Encrypt, "GCM set key")?;
        let mut hash_key = [0u8; AES_BLOCK_SIZE];
        cipher.encrypt_block(&mut hash_key);
        self.hash_key = Some(hash_key);
        Ok(())
    }

    /// Start a GCM message under `iv`. Any unfinished message is dropped.
    pub fn gcm_init(&mut self, iv: &[u8]) -> Result<()> {
        let cipher = keyed(&self.cipher, self.direction, Direction::Encrypt, "GCM init")?;
        let hash_key = self
            .hash_key
            .as_ref()
            .ok_or_else(|| GlueError::IvSetupFailure("GCM hash subkey not derived".into()))?;
        self.gcm = Some(GcmStream::start(cipher, hash_key, iv)?);
        Ok(())
    }

    pub fn gcm_update_aad(&mut self, aad: &[u8]) -> Result<()> {
        self.gcm_stream()?.absorb_aad(aad)
    }

    pub fn gcm_encrypt_update(&mut self, data: &mut [u8]) -> Result<()> {
        let cipher = keyed(&self.cipher, self.direction, Direction::Encrypt, "GCM encrypt")?;
        let stream = self.gcm.as_mut().ok_or_else(no_gcm_message)?;
        stream.encrypt(cipher, data)
    }

    pub fn gcm_decrypt_update(&mut self, data: &mut [u8]) -> Result<()> {
        let cipher = keyed(&self.cipher, self.direction, Direction::Encrypt, "GCM decrypt")?;
        let stream = self.gcm.as_mut().ok_or_else(no_gcm_message)?;
        stream.decrypt(cipher, data)
    }

    /// Finish the message and write the leading `tag.len()` tag bytes.
    pub fn gcm_encrypt_final(&mut self, tag: &mut [u8]) -> Result<()> {
        check_tag_len(tag.len())?;
        let stream = self.gcm.take().ok_or_else(no_gcm_message)?;
        let full = stream.finish();
        tag.copy_from_slice(&full[..tag.len()]);
        Ok(())
    }

    /// Finish the message and compare against a (possibly truncated) tag.
    pub fn gcm_decrypt_final(&mut self, tag: &[u8]) -> Result<()> {
        check_tag_len(tag.len())?;
        let stream = self.gcm.take().ok_or_else(no_gcm_message)?;
        if stream.verify(tag) {
            Ok(())
        } else {
            Err(GlueError::AuthenticationFailure)
        }
    }

    fn gcm_stream(&mut self) -> Result<&mut GcmStream> {
        self.gcm.as_mut().ok_or_else(no_gcm_message)
    }

    fn reset(&mut self) {
        self.cipher = None;
        self.reg.zeroize();
        self.keystream.zeroize();
        self.left = 0;
        self.hash_key.zeroize();
        self.gcm = None;
    }
}

impl Drop for AesState {
    fn drop(&mut self) {
        self.reset();
    }
}

impl fmt::Debug for AesState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AesState")
            .field("key_size", &self.key_size())
            .field("direction", &self.direction)
            .field("gcm_active", &self.gcm.is_some())
            .finish_non_exhaustive()
    }
}

fn keyed<'c>(
    cipher: &'c Option<AesBlock>,
    installed: Direction,
    wanted: Direction,
    op: &str,
) -> Result<&'c AesBlock> {
    let cipher = cipher
        .as_ref()
        .ok_or_else(|| GlueError::TransformFailure(format!("{op}: no key installed")))?;
    if installed != wanted {
        return Err(GlueError::TransformFailure(format!(
            "{op}: key schedule installed for {installed:?}"
        )));
    }
    Ok(cipher)
}

fn whole_blocks(len: usize) -> Result<()> {
    if len % AES_BLOCK_SIZE != 0 {
        return Err(GlueError::InvalidLength {
            len,
            reason: "not a multiple of the block size",
        });
    }
    Ok(())
}

fn as_block(chunk: &mut [u8]) -> Result<&mut [u8; AES_BLOCK_SIZE]> {
    let len = chunk.len();
    chunk
        .try_into()
        .map_err(|_| GlueError::TransformFailure(format!("{len}-byte block")))
}

fn check_tag_len(len: usize) -> Result<()> {
    if len == 0 || len > AES_BLOCK_SIZE {
        return Err(GlueError::ConfigurationError(format!(
            "GCM tag length {len} outside 1..={AES_BLOCK_SIZE}"
        )));
    }
    Ok(())
}

fn no_gcm_message() -> GlueError {
    GlueError::TransformFailure("no GCM message in progress".into())
}

pub(crate) fn xor_in_place(block: &mut [u8], other: &[u8]) {
    for (b, o) in block.iter_mut().zip(other) {
        *b ^= o;
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    // SP 800-38A F.2.1 / F.3.13 plaintext
    const PLAIN: &str = "6bc1bee22e409f96e93d7e117393172aae2d8a571e03ac9c9eb76fac45af8e51\
                         30c81c46a35ce411e5fbc1191a0a52eff69f2445df4f9b17ad2b417be66c3710";
    const KEY128: &str = "2b7e151628aed2a6abf7158809cf4f3c";
    const IV: &str = "000102030405060708090a0b0c0d0e0f";

    #[test]
    fn test_fips197_block() {
        let cipher = AesBlock::new(&h("000102030405060708090a0b0c0d0e0f")).unwrap();
        let mut block = [0u8; 16];
        block.copy_from_slice(&h("00112233445566778899aabbccddeeff"));
        cipher.encrypt_block(&mut block);
        assert_eq!(block.to_vec(), h("69c4e0d86a7b0430d8cdb78070b4c55a"));
        cipher.decrypt_block(&mut block);
        assert_eq!(block.to_vec(), h("00112233445566778899aabbccddeeff"));
    }

    #[test]
    fn test_cbc_sp800_38a() {
        let mut state = AesState::new();
        state.set_key(&h(KEY128), Direction::Encrypt).unwrap();
        state.set_iv(&h(IV)).unwrap();
        let mut data = h(PLAIN);
        state.cbc_encrypt(&mut data).unwrap();
        assert_eq!(
            hex::encode(&data),
            "7649abac8119b246cee98e9b12e9197d5086cb9b507219ee95db113a917678b2\
             73bed6b8e3c1743b7116e69e222295163ff1caa1681fac09120eca307586e1a7"
        );
        // Register holds the last ciphertext block.
        assert_eq!(state.iv().to_vec(), data[48..].to_vec());

        let mut dec = AesState::new();
        dec.set_key(&h(KEY128), Direction::Decrypt).unwrap();
        dec.set_iv(&h(IV)).unwrap();
        dec.cbc_decrypt(&mut data).unwrap();
        assert_eq!(data, h(PLAIN));
    }

    #[test]
    fn test_cbc_chains_across_calls() {
        let mut whole = AesState::new();
        whole.set_key(&h(KEY128), Direction::Encrypt).unwrap();
        whole.set_iv(&h(IV)).unwrap();
        let mut expected = h(PLAIN);
        whole.cbc_encrypt(&mut expected).unwrap();

        let mut split = AesState::new();
        split.set_key(&h(KEY128), Direction::Encrypt).unwrap();
        split.set_iv(&h(IV)).unwrap();
        let mut data = h(PLAIN);
        let (a, b) = data.split_at_mut(16);
        split.cbc_encrypt(a).unwrap();
        split.cbc_encrypt(b).unwrap();
        assert_eq!(data, expected);
    }

    #[test]
    fn test_cfb_sp800_38a_byte_granular() {
        let mut state = AesState::new();
        state.set_key(&h(KEY128), Direction::Encrypt).unwrap();
        state.set_iv(&h(IV)).unwrap();
        let mut data = h(PLAIN);
        for piece in data.chunks_mut(7) {
            state.cfb_encrypt(piece).unwrap();
        }
        assert_eq!(
            hex::encode(&data),
            "3b3fd92eb72dad20333449f8e83cfb4ac8a64537a0b3a93fcde3cdad9f1ce58b\
             26751f67a3cbb140b1808cf187a4f4dfc04b05357c5d1c0eeac4c66f9ff7f2e6"
        );

        state.set_iv(&h(IV)).unwrap();
        for piece in data.chunks_mut(5) {
            state.cfb_decrypt(piece).unwrap();
        }
        assert_eq!(data, h(PLAIN));
    }

    #[test]
    fn test_direction_is_enforced() {
        let mut state = AesState::new();
        state.set_key(&h(KEY128), Direction::Encrypt).unwrap();
        state.set_iv(&h(IV)).unwrap();
        let mut data = [0u8; 16];
        assert!(matches!(
            state.cbc_decrypt(&mut data),
            Err(GlueError::TransformFailure(_))
        ));
        // CFB decryption is legal on the encryption schedule.
        assert!(state.cfb_decrypt(&mut data).is_ok());
    }

    #[test]
    fn test_rejects_bad_inputs() {
        let mut state = AesState::new();
        assert!(matches!(
            state.set_key(&[0u8; 20], Direction::Encrypt),
            Err(GlueError::KeyRejected(_))
        ));
        assert!(!state.is_keyed());
        assert!(matches!(
            state.set_iv(&[0u8; 12]),
            Err(GlueError::IvSetupFailure(_))
        ));

        let mut data = [0u8; 16];
        assert!(matches!(
            state.cbc_encrypt(&mut data),
            Err(GlueError::TransformFailure(_))
        ));

        state.set_key(&h(KEY128), Direction::Encrypt).unwrap();
        let mut short = [0u8; 15];
        assert!(matches!(
            state.cbc_encrypt(&mut short),
            Err(GlueError::InvalidLength { len: 15, .. })
        ));
    }

    #[test]
    fn test_state_alignment() {
        assert_eq!(std::mem::align_of::<AesState>(), 16);
    }
}
