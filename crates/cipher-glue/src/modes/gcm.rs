//! GCM AEAD over the segment walk.
//!
//! Associated data and payload share one walk over
//! `[0, assoclen + payload)`. Each view is split at the AAD boundary: the
//! leading part feeds GHASH only, the rest is encrypted or decrypted. AAD
//! passes through to the destination unchanged.
//!
//! ```text
//! encrypt: src [ aad | plaintext  ]        dst [ aad | ciphertext | tag ]
//! decrypt: src [ aad | ciphertext | tag ]  dst [ aad | plaintext  ]
//! ```

use crate::config::GlueConfig;
use crate::context::CipherContext;
use crate::descriptor::{self, AlgorithmDescriptor, TransformKind};
use crate::error::{GlueError, Result};
use crate::primitive::{AesState, Direction, AES_BLOCK_SIZE, GCM_STANDARD_IV_SIZE};
use crate::request::AeadRequest;
use crate::selftest;
use crate::tfm::Aead;
use crate::walk::{SegmentWalk, WalkError};
use tracing::{debug, warn};

pub const MODE: &str = "gcm";

/// Tag length used until `set_authsize` says otherwise
pub const DEFAULT_AUTHSIZE: usize = AES_BLOCK_SIZE;

pub fn descriptor(config: &GlueConfig) -> AlgorithmDescriptor {
    AlgorithmDescriptor {
        name: descriptor::algorithm_name(MODE, "aes"),
        driver_name: descriptor::driver_name(MODE, "aes", config),
        priority: config.priority,
        block_size: 1,
        min_keysize: 16,
        max_keysize: 32,
        ivsize: GCM_STANDARD_IV_SIZE,
        maxauthsize: AES_BLOCK_SIZE,
        min_authsize: config.min_auth_tag_size,
        fips: config.fips.is_enabled(),
        kind: TransformKind::Aead(GcmAes::instantiate),
        self_test: selftest::gcm,
    }
}

/// AES-GCM transform.
#[derive(Debug)]
pub struct GcmAes {
    driver: String,
    ctx: CipherContext,
    authsize: usize,
    min_authsize: usize,
}

impl GcmAes {
    pub fn new(driver: impl Into<String>, min_authsize: usize) -> Result<Self> {
        Ok(Self {
            driver: driver.into(),
            ctx: CipherContext::init(false)?,
            authsize: DEFAULT_AUTHSIZE,
            min_authsize,
        })
    }

    fn instantiate(descriptor: &AlgorithmDescriptor) -> Result<Box<dyn Aead>> {
        Ok(Box::new(Self::new(
            descriptor.driver_name.clone(),
            descriptor.min_authsize,
        )?))
    }

    fn seal(&mut self, req: &mut AeadRequest<'_>) -> Result<()> {
        check_iv(req.iv())?;
        let assoclen = req.assoclen();
        let cryptlen = req.cryptlen();
        let authsize = self.authsize;

        let end = span_end(assoclen, cryptlen)?;
        let needed = span_end(end, authsize)?;
        let available = req.buffers().destination().len();
        if available < needed {
            return Err(WalkError::DestinationTooShort { needed, available }.into());
        }

        let state = self.ctx.encrypt_state()?;
        state.gcm_init(req.iv())?;
        {
            let mut walk = req.walk(end)?;
            absorb(&mut walk, state, assoclen, cryptlen, Direction::Encrypt)?;
        }

        let mut tag = [0u8; AES_BLOCK_SIZE];
        state.gcm_encrypt_final(&mut tag[..authsize])?;
        req.buffers_mut()
            .destination_mut()
            .copy_in(end, &tag[..authsize])?;

        debug!(driver = %self.driver, assoclen, cryptlen, authsize, "GCM seal done");
        Ok(())
    }

    fn open(&mut self, req: &mut AeadRequest<'_>) -> Result<()> {
        check_iv(req.iv())?;
        let assoclen = req.assoclen();
        let cryptlen = req.cryptlen();
        let authsize = self.authsize;

        if cryptlen < authsize {
            return Err(GlueError::InvalidLength {
                len: cryptlen,
                reason: "GCM input shorter than the authentication tag",
            });
        }
        let payload = cryptlen - authsize;
        let end = span_end(assoclen, payload)?;

        let mut tag = [0u8; AES_BLOCK_SIZE];
        req.buffers().source().copy_out(end, &mut tag[..authsize])?;

        let state = self.ctx.encrypt_state()?;
        state.gcm_init(req.iv())?;
        let absorbed = {
            let mut walk = req.walk(end)?;
            absorb(&mut walk, state, assoclen, payload, Direction::Decrypt)
        };

        let verdict = absorbed.and_then(|()| state.gcm_decrypt_final(&tag[..authsize]));
        if let Err(e) = verdict {
            // Unauthenticated plaintext never reaches the caller.
            req.buffers_mut()
                .destination_mut()
                .fill_zero(assoclen, payload)?;
            match &e {
                GlueError::AuthenticationFailure => {
                    warn!(driver = %self.driver, assoclen, payload, "GCM tag mismatch");
                }
                other => debug!(driver = %self.driver, error = %other, "GCM open failed"),
            }
            return Err(e);
        }

        debug!(driver = %self.driver, assoclen, payload, authsize, "GCM open done");
        Ok(())
    }
}

impl Aead for GcmAes {
    fn driver_name(&self) -> &str {
        &self.driver
    }

    fn ivsize(&self) -> usize {
        GCM_STANDARD_IV_SIZE
    }

    fn maxauthsize(&self) -> usize {
        AES_BLOCK_SIZE
    }

    fn authsize(&self) -> usize {
        self.authsize
    }

    fn set_key(&mut self, key: &[u8]) -> Result<()> {
        self.ctx.encrypt_state()?.gcm_set_key(key)
    }

    fn set_authsize(&mut self, authsize: usize) -> Result<()> {
        if authsize < self.min_authsize || authsize > AES_BLOCK_SIZE {
            return Err(GlueError::ConfigurationError(format!(
                "GCM tag length {authsize} outside {}..={AES_BLOCK_SIZE}",
                self.min_authsize
            )));
        }
        self.authsize = authsize;
        Ok(())
    }

    fn encrypt(&mut self, req: &mut AeadRequest<'_>) -> Result<()> {
        self.seal(req)
    }

    fn decrypt(&mut self, req: &mut AeadRequest<'_>) -> Result<()> {
        self.open(req)
    }
}

fn check_iv(iv: &[u8]) -> Result<()> {
    if iv.len() != GCM_STANDARD_IV_SIZE {
        return Err(GlueError::IvSetupFailure(format!(
            "GCM request IV must be {GCM_STANDARD_IV_SIZE} bytes, got {}",
            iv.len()
        )));
    }
    Ok(())
}

fn span_end(offset: usize, len: usize) -> Result<usize> {
    offset
        .checked_add(len)
        .ok_or_else(|| WalkError::Fault(format!("range {offset}+{len} overflows")).into())
}

/// Feed one walk through GHASH and the keystream. Aborts the walk on error.
fn absorb<W: SegmentWalk>(
    walk: &mut W,
    state: &mut AesState,
    assoclen: usize,
    payload: usize,
    direction: Direction,
) -> Result<()> {
    let result = absorb_steps(walk, state, assoclen, payload, direction);
    if result.is_err() {
        walk.abort();
    }
    result
}

fn absorb_steps<W: SegmentWalk>(
    walk: &mut W,
    state: &mut AesState,
    assoclen: usize,
    payload: usize,
    direction: Direction,
) -> Result<()> {
    let mut aad_left = assoclen;
    let mut text_left = payload;

    while walk.remaining() > 0 {
        let span = walk.view(1)?;
        let aad = aad_left.min(span.len());
        let text = text_left.min(span.len() - aad);
        if aad + text == 0 {
            return Err(GlueError::TransformFailure(format!(
                "empty GCM step with {} bytes remaining",
                aad_left + text_left
            )));
        }

        if aad > 0 {
            state.gcm_update_aad(&span[..aad])?;
            aad_left -= aad;
        }
        if text > 0 {
            let data = &mut span[aad..aad + text];
            match direction {
                Direction::Encrypt => state.gcm_encrypt_update(data)?,
                Direction::Decrypt => state.gcm_decrypt_update(data)?,
            }
            text_left -= text;
        }

        walk.advance(aad + text)?;
    }
    Ok(())
}
