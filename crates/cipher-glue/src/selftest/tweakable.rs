//! XTS suite.

use super::vectors::*;
use super::{block, expect_eq, skcipher_transport, unhex};
use crate::descriptor::AlgorithmDescriptor;
use crate::error::{GlueError, Result};
use crate::primitive::{Direction, XtsState, MIN_DATA_UNIT};

/// Self-test for `xts(aes)`.
///
/// Under certification rules the equal-halves vector is skipped: such a key
/// is rejected outright.
pub fn xts(descriptor: &AlgorithmDescriptor) -> Result<()> {
    let fips = descriptor.fips;

    aes128(fips)?;
    aes256(fips)?;
    sweep(&unhex(XTS128_K1)?, &unhex(XTS128_I1)?, fips)?;

    skcipher_transport(
        descriptor,
        &unhex(XTS128_K1)?,
        &unhex(XTS128_I1)?,
        &unhex(XTS128_P1)?,
        &unhex(XTS128_C1)?,
    )?;
    skcipher_transport(
        descriptor,
        &unhex(XTS128_K1)?,
        &unhex(XTS128_I1)?,
        &unhex(XTS_PP)?,
        &unhex(XTS128_CP)?,
    )?;
    skcipher_transport(
        descriptor,
        &unhex(XTS256_K2)?,
        &unhex(XTS256_I2)?,
        &unhex(XTS256_P2)?,
        &unhex(XTS256_C2)?,
    )
}

fn aes128(fips: bool) -> Result<()> {
    let k1 = unhex(XTS128_K1)?;

    check("XTS-128 32-byte", XTS128_K2, XTS128_I2, XTS128_P2, XTS128_C2, fips)?;
    check("XTS-128 16-byte", XTS128_K1, XTS128_I1, XTS128_P1, XTS128_C1, fips)?;
    check("XTS-128 stealing", XTS128_K1, XTS128_I1, XTS_PP, XTS128_CP, fips)?;

    let wrong = unit(&k1, &unhex(XTS128_I2)?, &unhex(XTS128_C2)?, Direction::Decrypt, fips)?;
    if wrong == unhex(XTS128_P2)? {
        return Err(GlueError::kat("XTS-128 decrypted under the wrong key"));
    }

    if !fips {
        let p3 = xts128_p3();
        let mut buf = p3.to_vec();
        let state = XtsState::new(&XTS128_K3, false)?;
        state.encrypt_unit(&mut buf, XTS128_I3)?;
        expect_eq("XTS-128 in-place stealing encrypt", &buf, &unhex(XTS128_C3)?)?;
        state.decrypt_unit(&mut buf, XTS128_I3)?;
        expect_eq("XTS-128 in-place stealing decrypt", &buf, &p3)?;
    }
    Ok(())
}

fn aes256(fips: bool) -> Result<()> {
    check("XTS-256 48-byte", XTS256_K2, XTS256_I2, XTS256_P2, XTS256_C2, fips)?;
    check("XTS-256 32-byte", XTS256_K1, XTS256_I1, XTS256_P1, XTS256_C1, fips)?;
    check("XTS-256 stealing", XTS256_K1, XTS256_I1, XTS_PP, XTS256_CP, fips)
}

/// Encrypt-then-decrypt every unit length up to [`XTS_SWEEP_MAX`].
fn sweep(key: &[u8], tweak: &[u8], fips: bool) -> Result<()> {
    let state = XtsState::new(key, fips)?;
    let tweak = block(tweak)?;
    let input: Vec<u8> = (0..XTS_SWEEP_MAX).map(|i| i as u8).collect();
    let mut buf = vec![0u8; XTS_SWEEP_MAX];

    for len in MIN_DATA_UNIT..=XTS_SWEEP_MAX {
        let data = &mut buf[..len];
        data.copy_from_slice(&input[..len]);
        state.encrypt_unit(data, tweak)?;
        if data[..] == input[..len] {
            return Err(GlueError::kat(format!("XTS sweep left {len} bytes unchanged")));
        }
        state.decrypt_unit(data, tweak)?;
        expect_eq(&format!("XTS sweep at {len} bytes"), data, &input[..len])?;
    }
    Ok(())
}

fn check(
    label: &str,
    key: &str,
    tweak: &str,
    plaintext: &str,
    ciphertext: &str,
    fips: bool,
) -> Result<()> {
    let key = unhex(key)?;
    let tweak = unhex(tweak)?;
    let plaintext = unhex(plaintext)?;
    let ciphertext = unhex(ciphertext)?;

    expect_eq(
        &format!("{label} encrypt"),
        &unit(&key, &tweak, &plaintext, Direction::Encrypt, fips)?,
        &ciphertext,
    )?;
    expect_eq(
        &format!("{label} decrypt"),
        &unit(&key, &tweak, &ciphertext, Direction::Decrypt, fips)?,
        &plaintext,
    )
}

fn unit(
    key: &[u8],
    tweak: &[u8],
    input: &[u8],
    direction: Direction,
    fips: bool,
) -> Result<Vec<u8>> {
    let state = XtsState::new(key, fips)?;
    let tweak = block(tweak)?;
    let mut out = input.to_vec();
    match direction {
        Direction::Encrypt => state.encrypt_unit(&mut out, tweak)?,
        Direction::Decrypt => state.decrypt_unit(&mut out, tweak)?,
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_equal_halves_refused_under_fips() {
        assert!(matches!(
            XtsState::new(&XTS128_K3, true),
            Err(GlueError::KeyRejected(_))
        ));
        assert!(aes128(true).is_ok());
    }
}
