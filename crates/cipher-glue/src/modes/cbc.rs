//! CBC mode over the segment walk.
//!
//! CBC needs separate encryption and decryption key schedules, so the
//! context carries both states. Every walk step transforms whole blocks; a
//! view shorter than one block makes the walk gather a full block.

use super::{drive, WalkCipher};
use crate::config::GlueConfig;
use crate::context::CipherContext;
use crate::descriptor::{self, AlgorithmDescriptor, TransformKind};
use crate::error::{GlueError, Result};
use crate::primitive::{AesState, Direction, AES_BLOCK_SIZE};
use crate::request::SkcipherRequest;
use crate::selftest;
use crate::tfm::Skcipher;
use crate::walk::SegmentWalk;
use tracing::debug;

pub const MODE: &str = "cbc";

/// Descriptor for `cbc(aes)`.
pub fn descriptor(config: &GlueConfig) -> AlgorithmDescriptor {
    AlgorithmDescriptor {
        name: descriptor::algorithm_name(MODE, "aes"),
        driver_name: descriptor::driver_name(MODE, "aes", config),
        priority: config.priority,
        block_size: AES_BLOCK_SIZE,
        min_keysize: 16,
        max_keysize: 32,
        ivsize: AES_BLOCK_SIZE,
        maxauthsize: 0,
        min_authsize: 0,
        fips: config.fips.is_enabled(),
        kind: TransformKind::Skcipher(CbcAes::instantiate),
        self_test: selftest::cbc,
    }
}

/// AES-CBC transform.
#[derive(Debug)]
pub struct CbcAes {
    driver: String,
    ctx: CipherContext,
}

impl CbcAes {
    pub fn new(driver: impl Into<String>) -> Result<Self> {
        Ok(Self {
            driver: driver.into(),
            ctx: CipherContext::init(true)?,
        })
    }

    fn instantiate(descriptor: &AlgorithmDescriptor) -> Result<Box<dyn Skcipher>> {
        Ok(Box::new(Self::new(descriptor.driver_name.clone())?))
    }

    fn crypt(&mut self, req: &mut SkcipherRequest<'_>, direction: Direction) -> Result<()> {
        let len = req.cryptlen();
        if len % AES_BLOCK_SIZE != 0 {
            return Err(GlueError::InvalidLength {
                len,
                reason: "CBC requires a multiple of the block size",
            });
        }

        let (mut walk, iv) = req.walk()?;
        let result = self.run(&mut walk, iv, direction);
        match &result {
            Ok(()) => debug!(driver = %self.driver, ?direction, len, "CBC request done"),
            Err(e) => debug!(driver = %self.driver, ?direction, len, error = %e, "CBC request failed"),
        }
        result
    }

    fn run<W: SegmentWalk>(
        &mut self,
        walk: &mut W,
        iv: &mut [u8; AES_BLOCK_SIZE],
        direction: Direction,
    ) -> Result<()> {
        let state = match direction {
            Direction::Encrypt => self.ctx.encrypt_state()?,
            Direction::Decrypt => self.ctx.decrypt_state()?,
        };
        drive(walk, &mut CbcStep { state, direction }, iv)
    }
}

impl Skcipher for CbcAes {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn ivsize(&self) -> usize {
        AES_BLOCK_SIZE
    }

    fn set_key(&mut self, key: &[u8]) -> Result<()> {
        self.ctx.set_key(key)
    }

    fn encrypt(&mut self, req: &mut SkcipherRequest<'_>) -> Result<()> {
        self.crypt(req, Direction::Encrypt)
    }

    fn decrypt(&mut self, req: &mut SkcipherRequest<'_>) -> Result<()> {
        self.crypt(req, Direction::Decrypt)
    }
}

struct CbcStep<'s> {
    state: &'s mut AesState,
    direction: Direction,
}

impl WalkCipher for CbcStep<'_> {
    fn set_iv(&mut self, iv: &[u8; AES_BLOCK_SIZE]) -> Result<()> {
        self.state.set_iv(iv)
    }

    fn min_span(&self, _remaining: usize) -> usize {
        AES_BLOCK_SIZE
    }

    fn span_len(&self, available: usize, _remaining: usize) -> usize {
        available - available % AES_BLOCK_SIZE
    }

    fn transform(&mut self, span: &mut [u8]) -> Result<()> {
        match self.direction {
            Direction::Encrypt => self.state.cbc_encrypt(span),
            Direction::Decrypt => self.state.cbc_decrypt(span),
        }
    }

    fn output_iv(&self) -> Option<[u8; AES_BLOCK_SIZE]> {
        Some(self.state.iv())
    }
}
