//! GCM suite.

use super::vectors::*;
use super::{aead_transport, expect_eq, unhex};
use crate::descriptor::AlgorithmDescriptor;
use crate::error::{GlueError, Result};
use crate::primitive::{AesState, AES_BLOCK_SIZE, GCM_STANDARD_IV_SIZE};
use aes_gcm::aead::consts::U16;
use aes_gcm::aead::generic_array::GenericArray;
use aes_gcm::aead::{Aead, KeyInit, Payload};
use aes_gcm::AesGcm;

type Sealed = (Vec<u8>, [u8; AES_BLOCK_SIZE]);

/// Self-test for `gcm(aes)`.
pub fn gcm(descriptor: &AlgorithmDescriptor) -> Result<()> {
    let key = unhex(GCM_TC2_KEY)?;
    let iv = unhex(GCM_TC2_IV)?;
    let plaintext = unhex(GCM_TC2_PLAINTEXT)?;
    let ciphertext = unhex(GCM_TC2_CIPHERTEXT)?;
    let tag = unhex(GCM_TC2_TAG)?;

    let (out, computed) = seal(&key, &iv, &[], &plaintext)?;
    expect_eq("GCM test case 2 ciphertext", &out, &ciphertext)?;
    expect_eq("GCM test case 2 tag", &computed, &tag)?;
    expect_eq(
        "GCM test case 2 open",
        &open(&key, &iv, &[], &ciphertext, &tag)?,
        &plaintext,
    )?;

    // 16-byte IV: J0 comes from GHASH rather than the 96-bit fast path.
    let aad = unhex(PASSAGE_AAD)?;
    let (passage, passage_tag) = seal(PASSAGE_KEY, PASSAGE_IV, &aad, PASSAGE_AEAD_PLAINTEXT)?;
    let mut combined = passage.clone();
    combined.extend_from_slice(&passage_tag);
    expect_eq(
        "GCM passage against one-shot AEAD",
        &combined,
        &one_shot(PASSAGE_KEY, PASSAGE_IV, &aad, PASSAGE_AEAD_PLAINTEXT)?,
    )?;
    expect_eq(
        "GCM passage open",
        &open(PASSAGE_KEY, PASSAGE_IV, &aad, &passage, &passage_tag)?,
        PASSAGE_AEAD_PLAINTEXT,
    )?;

    let mut forged = passage_tag;
    forged[0] ^= 0x80;
    match open(PASSAGE_KEY, PASSAGE_IV, &aad, &passage, &forged) {
        Err(GlueError::AuthenticationFailure) => {}
        Ok(_) => return Err(GlueError::kat("GCM accepted a forged tag")),
        Err(e) => return Err(e),
    }

    let mut tc2 = ciphertext;
    tc2.extend_from_slice(&tag);
    aead_transport(descriptor, &key, &iv, &[], &plaintext, &tc2)?;

    // Request IVs are 96-bit, so the transport leg uses the leading 12 bytes.
    let iv12 = &PASSAGE_IV[..GCM_STANDARD_IV_SIZE];
    let (passage12, tag12) = seal(PASSAGE_KEY, iv12, &aad, PASSAGE_AEAD_PLAINTEXT)?;
    let mut sealed = aad.clone();
    sealed.extend_from_slice(&passage12);
    sealed.extend_from_slice(&tag12);
    aead_transport(
        descriptor,
        PASSAGE_KEY,
        iv12,
        &aad,
        PASSAGE_AEAD_PLAINTEXT,
        &sealed,
    )
}

fn seal(key: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Sealed> {
    let mut state = AesState::new();
    state.gcm_set_key(key)?;
    state.gcm_init(iv)?;
    state.gcm_update_aad(aad)?;
    let mut out = plaintext.to_vec();
    state.gcm_encrypt_update(&mut out)?;
    let mut tag = [0u8; AES_BLOCK_SIZE];
    state.gcm_encrypt_final(&mut tag)?;
    Ok((out, tag))
}

fn open(key: &[u8], iv: &[u8], aad: &[u8], ciphertext: &[u8], tag: &[u8]) -> Result<Vec<u8>> {
    let mut state = AesState::new();
    state.gcm_set_key(key)?;
    state.gcm_init(iv)?;
    state.gcm_update_aad(aad)?;
    let mut out = ciphertext.to_vec();
    state.gcm_decrypt_update(&mut out)?;
    state.gcm_decrypt_final(tag)?;
    Ok(out)
}

/// Reference AES-256-GCM with a 16-byte nonce.
fn one_shot(key: &[u8], iv: &[u8], aad: &[u8], plaintext: &[u8]) -> Result<Vec<u8>> {
    let cipher = AesGcm::<aes::Aes256, U16>::new_from_slice(key)
        .map_err(|_| GlueError::kat("reference AEAD rejected the passage key"))?;
    if iv.len() != 16 {
        return Err(GlueError::kat("reference AEAD needs a 16-byte nonce"));
    }
    cipher
        .encrypt(
            GenericArray::from_slice(iv),
            Payload {
                msg: plaintext,
                aad,
            },
        )
        .map_err(|_| GlueError::kat("reference AEAD failed"))
}
