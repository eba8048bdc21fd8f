//! CBC and CFB suites.

use super::vectors::*;
use super::{expect_eq, skcipher_transport, unhex};
use crate::descriptor::AlgorithmDescriptor;
use crate::error::Result;
use crate::primitive::{AesState, Direction};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Chaining {
    Cbc,
    Cfb,
}

impl Chaining {
    fn label(self) -> &'static str {
        match self {
            Chaining::Cbc => "CBC",
            Chaining::Cfb => "CFB",
        }
    }
}

/// Self-test for `cbc(aes)`.
pub fn cbc(descriptor: &AlgorithmDescriptor) -> Result<()> {
    suite(descriptor, Chaining::Cbc)
}

/// Self-test for `cfb(aes)`.
pub fn cfb(descriptor: &AlgorithmDescriptor) -> Result<()> {
    suite(descriptor, Chaining::Cfb)
}

fn suite(descriptor: &AlgorithmDescriptor, mode: Chaining) -> Result<()> {
    let label = mode.label();
    let key = unhex(SP800_38A_KEY)?;
    let iv = unhex(SP800_38A_IV)?;
    let plaintext = unhex(SP800_38A_PLAINTEXT)?;
    let ciphertext = unhex(match mode {
        Chaining::Cbc => SP800_38A_CBC_CIPHERTEXT,
        Chaining::Cfb => SP800_38A_CFB_CIPHERTEXT,
    })?;

    expect_eq(
        &format!("{label} SP 800-38A encrypt"),
        &direct(mode, &key, &iv, &plaintext, Direction::Encrypt)?,
        &ciphertext,
    )?;
    expect_eq(
        &format!("{label} SP 800-38A decrypt"),
        &direct(mode, &key, &iv, &ciphertext, Direction::Decrypt)?,
        &plaintext,
    )?;

    let passage = direct(
        mode,
        PASSAGE_KEY,
        PASSAGE_IV,
        PASSAGE_PLAINTEXT,
        Direction::Encrypt,
    )?;
    expect_eq(
        &format!("{label} passage decrypt"),
        &direct(mode, PASSAGE_KEY, PASSAGE_IV, &passage, Direction::Decrypt)?,
        PASSAGE_PLAINTEXT,
    )?;

    if mode == Chaining::Cfb {
        // Keystream carry-over: odd-sized calls must match one call.
        let mut state = AesState::new();
        state.set_key(PASSAGE_KEY, Direction::Encrypt)?;
        state.set_iv(PASSAGE_IV)?;
        let mut pieces = PASSAGE_PLAINTEXT.to_vec();
        for chunk in pieces.chunks_mut(5) {
            state.cfb_encrypt(chunk)?;
        }
        expect_eq("CFB fragmented encrypt", &pieces, &passage)?;
    }

    skcipher_transport(descriptor, &key, &iv, &plaintext, &ciphertext)?;
    skcipher_transport(
        descriptor,
        PASSAGE_KEY,
        PASSAGE_IV,
        PASSAGE_PLAINTEXT,
        &passage,
    )
}

fn direct(
    mode: Chaining,
    key: &[u8],
    iv: &[u8],
    input: &[u8],
    direction: Direction,
) -> Result<Vec<u8>> {
    // CFB runs both directions on the encryption schedule.
    let schedule = match mode {
        Chaining::Cbc => direction,
        Chaining::Cfb => Direction::Encrypt,
    };
    let mut state = AesState::new();
    state.set_key(key, schedule)?;
    state.set_iv(iv)?;

    let mut out = input.to_vec();
    match (mode, direction) {
        (Chaining::Cbc, Direction::Encrypt) => state.cbc_encrypt(&mut out)?,
        (Chaining::Cbc, Direction::Decrypt) => state.cbc_decrypt(&mut out)?,
        (Chaining::Cfb, Direction::Encrypt) => state.cfb_encrypt(&mut out)?,
        (Chaining::Cfb, Direction::Decrypt) => state.cfb_decrypt(&mut out)?,
    }
    Ok(out)
}
