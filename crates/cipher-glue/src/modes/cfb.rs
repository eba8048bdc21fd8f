//! CFB-128 mode over the segment walk.

use super::{drive, WalkCipher};
use crate::config::GlueConfig;
use crate::context::CipherContext;
use crate::descriptor::{self, AlgorithmDescriptor, TransformKind};
use crate::error::Result;
use crate::primitive::{AesState, Direction, AES_BLOCK_SIZE};
use crate::request::SkcipherRequest;
use crate::selftest;
use crate::tfm::Skcipher;
use crate::walk::SegmentWalk;
use tracing::debug;

pub const MODE: &str = "cfb";

/// Descriptor for `cfb(aes)`. Byte-granular, so the advertised block size
/// is 1.
pub fn descriptor(config: &GlueConfig) -> AlgorithmDescriptor {
    AlgorithmDescriptor {
        name: descriptor::algorithm_name(MODE, "aes"),
        driver_name: descriptor::driver_name(MODE, "aes", config),
        priority: config.priority,
        block_size: 1,
        min_keysize: 16,
        max_keysize: 32,
        ivsize: AES_BLOCK_SIZE,
        maxauthsize: 0,
        min_authsize: 0,
        fips: config.fips.is_enabled(),
        kind: TransformKind::Skcipher(CfbAes::instantiate),
        self_test: selftest::cfb,
    }
}

/// AES-CFB transform. Both directions run on the encryption schedule.
#[derive(Debug)]
pub struct CfbAes {
    driver: String,
    ctx: CipherContext,
}

impl CfbAes {
    pub fn new(driver: impl Into<String>) -> Result<Self> {
        Ok(Self {
            driver: driver.into(),
            ctx: CipherContext::init(false)?,
        })
    }

    fn instantiate(descriptor: &AlgorithmDescriptor) -> Result<Box<dyn Skcipher>> {
        Ok(Box::new(Self::new(descriptor.driver_name.clone())?))
    }

    fn crypt(&mut self, req: &mut SkcipherRequest<'_>, direction: Direction) -> Result<()> {
        let len = req.cryptlen();
        let (mut walk, iv) = req.walk()?;
        let result = self.run(&mut walk, iv, direction);
        if let Err(e) = &result {
            debug!(driver = %self.driver, ?direction, len, error = %e, "CFB request failed");
        }
        result
    }

    fn run<W: SegmentWalk>(
        &mut self,
        walk: &mut W,
        iv: &mut [u8; AES_BLOCK_SIZE],
        direction: Direction,
    ) -> Result<()> {
        let state = self.ctx.encrypt_state()?;
        drive(walk, &mut CfbStep { state, direction }, iv)
    }
}

impl Skcipher for CfbAes {
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

struct CfbStep<'s> {
    state: &'s mut AesState,
    direction: Direction,
}

impl WalkCipher for CfbStep<'_> {
    fn set_iv(&mut self, iv: &[u8; AES_BLOCK_SIZE]) -> Result<()> {
        self.state.set_iv(iv)
    }

    fn min_span(&self, _remaining: usize) -> usize {
        1
    }

    fn span_len(&self, available: usize, _remaining: usize) -> usize {
        available
    }

    fn transform(&mut self, span: &mut [u8]) -> Result<()> {
        match self.direction {
            Direction::Encrypt => self.state.cfb_encrypt(span),
            Direction::Decrypt => self.state.cfb_decrypt(span),
        }
    }

    fn output_iv(&self) -> Option<[u8; AES_BLOCK_SIZE]> {
        Some(self.state.iv())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::GlueError;
    use crate::modes::test_support::{h, iv16, ragged};
    use crate::scatterlist::ScatterList;
    use crate::selftest::vectors::*;
    use crate::walk::{Buffers, FailingWalk, ScatterWalk, WalkError};

    fn keyed() -> CfbAes {
        let mut tfm = CfbAes::new("cfb-aes-test").unwrap();
        tfm.set_key(&h(SP800_38A_KEY)).unwrap();
        tfm
    }

    #[test]
    fn test_sp800_38a_over_ragged_segments() {
        let mut tfm = keyed();
        let plaintext = h(SP800_38A_PLAINTEXT);
        let expected = h(SP800_38A_CFB_CIPHERTEXT);

        let src = ragged(&plaintext);
        let mut dst = ScatterList::zeroed(&[3, 3, 3, 55]);
        let mut req = SkcipherRequest::new(&src, &mut dst, plaintext.len(), iv16(SP800_38A_IV));
        tfm.encrypt(&mut req).unwrap();
        drop(req);
        assert_eq!(dst.to_vec(), expected);

        let mut list = ragged(&expected);
        let mut req = SkcipherRequest::in_place(&mut list, expected.len(), iv16(SP800_38A_IV));
        tfm.decrypt(&mut req).unwrap();
        drop(req);
        assert_eq!(list.to_vec(), plaintext);
    }

    #[test]
    fn test_odd_lengths_roundtrip() {
        let mut tfm = keyed();
        for len in [0usize, 1, 15, 17, 33, 100] {
            let data: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            let mut list = ragged(&data);
            let mut req = SkcipherRequest::in_place(&mut list, len, [9u8; 16]);
            tfm.encrypt(&mut req).unwrap();
            let mut req = SkcipherRequest::in_place(&mut list, len, [9u8; 16]);
            tfm.decrypt(&mut req).unwrap();
            drop(req);
            assert_eq!(list.to_vec(), data, "length {len}");
        }
    }

    #[test]
    fn test_segmentation_invariance() {
        let mut tfm = keyed();
        let data: Vec<u8> = (0..77u8).collect();

        let mut whole = ScatterList::contiguous(data.clone());
        let mut req = SkcipherRequest::in_place(&mut whole, 77, [3u8; 16]);
        tfm.encrypt(&mut req).unwrap();
        drop(req);

        let mut pieces = ScatterList::split(&data, &[1, 1, 1, 30, 2]);
        let mut req = SkcipherRequest::in_place(&mut pieces, 77, [3u8; 16]);
        tfm.encrypt(&mut req).unwrap();
        drop(req);

        assert_eq!(whole.to_vec(), pieces.to_vec());
    }

    #[test]
    fn test_walk_fault_aborts_walk() {
        let mut tfm = keyed();
        let mut list = ScatterList::split(&[0u8; 40], &[10, 10, 20]);
        let mut buffers = Buffers::InPlace(&mut list);
        let inner = ScatterWalk::start(&mut buffers, 0, 40).unwrap();
        let mut walk = FailingWalk::new(inner, 2);
        let mut iv = [0u8; 16];

        let err = tfm.run(&mut walk, &mut iv, Direction::Decrypt).unwrap_err();
        assert!(matches!(err, GlueError::TransportFault(WalkError::Fault(_))));
        assert!(walk.aborted);
        assert_eq!(walk.advances, 2);
    }

    #[test]
    fn test_descriptor_shape() {
        let d = descriptor(&GlueConfig::default());
        assert_eq!(d.name, "cfb(aes)");
        assert_eq!(d.block_size, 1);
        assert!(!d.is_aead());
    }
}
