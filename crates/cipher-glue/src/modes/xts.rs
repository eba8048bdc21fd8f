//! XTS mode over the segment walk.
//!
//! Each request is one data unit encrypted under its own tweak. Ciphertext
//! stealing needs the last two blocks together, so the engine asks the walk
//! for the whole unit as a single gathered view.

use super::{drive, WalkCipher};
use crate::config::GlueConfig;
use crate::context::XtsContext;
use crate::descriptor::{self, AlgorithmDescriptor, TransformKind};
use crate::error::{GlueError, Result};
use crate::primitive::{Direction, XtsState, AES_BLOCK_SIZE, MIN_DATA_UNIT};
use crate::request::SkcipherRequest;
use crate::selftest;
use crate::tfm::Skcipher;
use crate::walk::SegmentWalk;
use tracing::debug;

pub const MODE: &str = "xts";

pub fn descriptor(config: &GlueConfig) -> AlgorithmDescriptor {
    AlgorithmDescriptor {
        name: descriptor::algorithm_name(MODE, "aes"),
        driver_name: descriptor::driver_name(MODE, "aes", config),
        priority: config.priority,
        block_size: AES_BLOCK_SIZE,
        min_keysize: 2 * 16,
        max_keysize: 2 * 32,
        ivsize: AES_BLOCK_SIZE,
        maxauthsize: 0,
        min_authsize: 0,
        fips: config.fips.is_enabled(),
        kind: TransformKind::Skcipher(XtsAes::instantiate),
        self_test: selftest::xts,
    }
}

/// AES-XTS transform.
#[derive(Debug)]
pub struct XtsAes {
    driver: String,
    ctx: XtsContext,
}

impl XtsAes {
    /// `distinct_halves` rejects keys whose two halves are equal.
    pub fn new(driver: impl Into<String>, distinct_halves: bool) -> Result<Self> {
        Ok(Self {
            driver: driver.into(),
            ctx: XtsContext::init(distinct_halves)?,
        })
    }

    fn instantiate(descriptor: &AlgorithmDescriptor) -> Result<Box<dyn Skcipher>> {
        Ok(Box::new(Self::new(
            descriptor.driver_name.clone(),
            descriptor.fips,
        )?))
    }

    fn crypt(&mut self, req: &mut SkcipherRequest<'_>, direction: Direction) -> Result<()> {
        let len = req.cryptlen();
        if len < MIN_DATA_UNIT {
            return Err(GlueError::InvalidLength {
                len,
                reason: "XTS data unit shorter than one block",
            });
        }

        let (mut walk, tweak) = req.walk()?;
        let result = self.run(&mut walk, tweak, direction);
        if let Err(e) = &result {
            debug!(driver = %self.driver, ?direction, len, error = %e, "XTS request failed");
        }
        result
    }

    fn run<W: SegmentWalk>(
        &self,
        walk: &mut W,
        tweak: &mut [u8; AES_BLOCK_SIZE],
        direction: Direction,
    ) -> Result<()> {
        let mut step = XtsStep {
            state: self.ctx.state()?,
            tweak: [0u8; AES_BLOCK_SIZE],
            direction,
        };
        drive(walk, &mut step, tweak)
    }
}

impl Skcipher for XtsAes {
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

struct XtsStep<'s> {
    state: &'s XtsState,
    tweak: [u8; AES_BLOCK_SIZE],
    direction: Direction,
}

impl WalkCipher for XtsStep<'_> {
    fn set_iv(&mut self, iv: &[u8; AES_BLOCK_SIZE]) -> Result<()> {
        self.tweak = *iv;
        Ok(())
    }

    fn min_span(&self, remaining: usize) -> usize {
        remaining
    }

    fn span_len(&self, available: usize, remaining: usize) -> usize {
        if available >= remaining {
            remaining
        } else {
            0
        }
    }

    fn transform(&mut self, span: &mut [u8]) -> Result<()> {
        match self.direction {
            Direction::Encrypt => self.state.encrypt_unit(span, self.tweak),
            Direction::Decrypt => self.state.decrypt_unit(span, self.tweak),
        }
    }

    // Units are independent: the tweak is not chained.
    fn output_iv(&self) -> Option<[u8; AES_BLOCK_SIZE]> {
        None
    }
}
