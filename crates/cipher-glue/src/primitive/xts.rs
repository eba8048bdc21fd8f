//! XTS-AES data-unit transform
//!
//! XEX-based tweaked-codebook mode with ciphertext stealing. Each call
//! processes one data unit under an explicit 128-bit tweak; nothing but the
//! key survives between calls.
//!
//! ## Key Layout
//!
//! - 32 bytes: XTS-AES-128 (two AES-128 keys)
//! - 48 bytes: XTS-AES-192
//! - 64 bytes: XTS-AES-256
//!
//! The first half keys the data cipher, the second half the tweak cipher.

use super::AES_BLOCK_SIZE;
use crate::error::{GlueError, Result};
use aes::{Aes128, Aes192, Aes256};
use cipher::KeyInit;
use std::fmt;
use subtle::ConstantTimeEq;
use xts_mode::Xts128;

/// Smallest data unit XTS accepts (one block)
pub const MIN_DATA_UNIT: usize = AES_BLOCK_SIZE;

/// Keyed XTS state for one of the three AES key sizes.
pub enum XtsState {
    Aes128(Xts128<Aes128>),
    Aes192(Xts128<Aes192>),
    Aes256(Xts128<Aes256>),
}

impl XtsState {
    /// Build an XTS state from a double-length key.
    ///
    /// # Arguments
    ///
    /// * `key` - Data key followed by tweak key (32, 48 or 64 bytes)
    /// * `distinct_halves` - Reject keys whose halves are equal
    ///
    /// # Errors
    ///
    /// Returns `KeyRejected` if:
    /// - The key length is not 32, 48 or 64 bytes
    /// - `distinct_halves` is set and both halves match
    pub fn new(key: &[u8], distinct_halves: bool) -> Result<Self> {
        let half = match key.len() {
            32 | 48 | 64 => key.len() / 2,
            n => {
                return Err(GlueError::KeyRejected(format!(
                    "XTS key must be 32, 48 or 64 bytes, got {n}"
                )))
            }
        };
        let (data_key, tweak_key) = key.split_at(half);

        if distinct_halves && bool::from(data_key.ct_eq(tweak_key)) {
            return Err(GlueError::KeyRejected(
                "XTS data and tweak keys must differ".into(),
            ));
        }

        Ok(match half {
            16 => XtsState::Aes128(Xts128::new(schedule(data_key)?, schedule(tweak_key)?)),
            24 => XtsState::Aes192(Xts128::new(schedule(data_key)?, schedule(tweak_key)?)),
            _ => XtsState::Aes256(Xts128::new(schedule(data_key)?, schedule(tweak_key)?)),
        })
    }

    /// Total key length this state was built from.
    pub fn key_size(&self) -> usize {
        match self {
            XtsState::Aes128(_) => 32,
            XtsState::Aes192(_) => 48,
            XtsState::Aes256(_) => 64,
        }
    }

    /// Encrypt one data unit in place
    ///
    /// # Errors
    ///
    /// Returns `InvalidLength` if the unit is shorter than one block.
    pub fn encrypt_unit(&self, data: &mut [u8], tweak: [u8; AES_BLOCK_SIZE]) -> Result<()> {
        check_unit(data.len())?;
        match self {
            XtsState::Aes128(xts) => xts.encrypt_sector(data, tweak),
            XtsState::Aes192(xts) => xts.encrypt_sector(data, tweak),
            XtsState::Aes256(xts) => xts.encrypt_sector(data, tweak),
        }
        Ok(())
    }

    /// Decrypt one data unit in place
    ///
    /// # Errors
    ///
    /// Returns `InvalidLength` if the unit is shorter than one block.
    pub fn decrypt_unit(&self, data: &mut [u8], tweak: [u8; AES_BLOCK_SIZE]) -> Result<()> {
        check_unit(data.len())?;
        match self {
            XtsState::Aes128(xts) => xts.decrypt_sector(data, tweak),
            XtsState::Aes192(xts) => xts.decrypt_sector(data, tweak),
            XtsState::Aes256(xts) => xts.decrypt_sector(data, tweak),
        }
        Ok(())
    }
}

impl fmt::Debug for XtsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "XtsState(XTS-AES-{}, <redacted>)", self.key_size() * 4)
    }
}

fn schedule<C: KeyInit>(key: &[u8]) -> Result<C> {
    C::new_from_slice(key)
        .map_err(|_| GlueError::KeyRejected(format!("unusable {}-byte XTS key half", key.len())))
}

fn check_unit(len: usize) -> Result<()> {
    if len < MIN_DATA_UNIT {
        return Err(GlueError::InvalidLength {
            len,
            reason: "XTS needs at least one full block",
        });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn h(s: &str) -> Vec<u8> {
        hex::decode(s).unwrap()
    }

    fn tweak(s: &str) -> [u8; 16] {
        let mut t = [0u8; 16];
        t.copy_from_slice(&h(s));
        t
    }

    const K1: &str = "a1b90cba3f06ac353b2c343876081762090923026e91771815f29dab01932f2f";
    const I1: &str = "4faef7117cda59c66e4b92013e768ad5";

    #[test]
    fn test_single_block_vector() {
        let xts = XtsState::new(&h(K1), true).unwrap();
        let mut data = h("ebabce95b14d3c8d6fb350390790311c");
        xts.encrypt_unit(&mut data, tweak(I1)).unwrap();
        assert_eq!(hex::encode(&data), "778ae8b43cb98d5a825081d5be471c63");
        xts.decrypt_unit(&mut data, tweak(I1)).unwrap();
        assert_eq!(hex::encode(&data), "ebabce95b14d3c8d6fb350390790311c");
    }

    #[test]
    fn test_ciphertext_stealing_vector() {
        let xts = XtsState::new(&h(K1), true).unwrap();
        let mut data = h("ebabce95b14d3c8d6fb350390790311c6e4b92013e768ad5");
        xts.encrypt_unit(&mut data, tweak(I1)).unwrap();
        assert_eq!(
            hex::encode(&data),
            "2bf72cf3eb85ef7b0b76a0aaf33f258b778ae8b43cb98d5a"
        );
    }

    #[test]
    fn test_roundtrip_every_length() {
        let key: Vec<u8> = (0..48u8).collect();
        let xts = XtsState::new(&key, true).unwrap();
        for len in MIN_DATA_UNIT..=1024 {
            let original: Vec<u8> = (0..len).map(|i| (i * 7) as u8).collect();
            let mut data = original.clone();
            xts.encrypt_unit(&mut data, [9u8; 16]).unwrap();
            assert_ne!(data, original, "length {len} left plaintext unchanged");
            xts.decrypt_unit(&mut data, [9u8; 16]).unwrap();
            assert_eq!(data, original, "length {len} failed to round-trip");
        }
    }

    #[test]
    fn test_wrong_key_produces_garbage() {
        let right = XtsState::new(&h(K1), true).unwrap();
        let wrong_key: Vec<u8> = (0x11..0x31u8).collect();
        let wrong = XtsState::new(&wrong_key, true).unwrap();
        let plaintext = b"Sector contents here, 32 bytes!!".to_vec();
        let mut data = plaintext.clone();
        right.encrypt_unit(&mut data, tweak(I1)).unwrap();
        wrong.decrypt_unit(&mut data, tweak(I1)).unwrap();
        assert_ne!(data, plaintext);
    }

    #[test]
    fn test_key_validation() {
        assert!(matches!(
            XtsState::new(&[1u8; 40], false),
            Err(GlueError::KeyRejected(_))
        ));
        assert!(matches!(
            XtsState::new(&[0x20u8; 32], true),
            Err(GlueError::KeyRejected(_))
        ));
        // Equal halves are only refused when asked to.
        assert_eq!(XtsState::new(&[0x20u8; 32], false).unwrap().key_size(), 32);
        assert_eq!(XtsState::new(&h(K1), true).unwrap().key_size(), 32);
    }

    #[test]
    fn test_short_unit_rejected() {
        let xts = XtsState::new(&h(K1), true).unwrap();
        let mut data = [0u8; 15];
        assert!(matches!(
            xts.encrypt_unit(&mut data, [0u8; 16]),
            Err(GlueError::InvalidLength { len: 15, .. })
        ));
    }
}
