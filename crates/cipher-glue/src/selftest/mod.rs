//! Known-answer self-tests
//!
//! Every algorithm is checked before the registry publishes it. A suite
//! first runs fixed vectors against the primitive layer, then pushes the
//! same vectors through a transform instantiated from the descriptor, over
//! several scatter-list layouts, so the walk and the mode engine are
//! covered too.
//!
//! Suites allocate only scoped state: contexts and buffers are released on
//! every exit path.

mod authenticated;
mod chaining;
mod tweakable;
pub(crate) mod vectors;

pub use authenticated::gcm;
pub use chaining::{cbc, cfb};
pub use tweakable::xts;

use crate::descriptor::AlgorithmDescriptor;
use crate::error::{GlueError, Result};
use crate::primitive::AES_BLOCK_SIZE;
use crate::request::{AeadRequest, SkcipherRequest};
use crate::scatterlist::ScatterList;

/// Source layouts used for transport checks. The empty layout is a single
/// contiguous segment.
const LAYOUTS: [&[usize]; 3] = [&[], &[1, 15, 3], &[7, 9, 16, 5]];

/// Destination runs deliberately disagree with every source layout.
const DESTINATION_LAYOUT: &[usize] = &[13];

fn unhex(s: &str) -> Result<Vec<u8>> {
    hex::decode(s).map_err(|e| GlueError::kat(format!("malformed vector: {e}")))
}

fn block(bytes: &[u8]) -> Result<[u8; AES_BLOCK_SIZE]> {
    bytes
        .try_into()
        .map_err(|_| GlueError::kat(format!("{}-byte IV in vector", bytes.len())))
}

fn expect_eq(what: &str, got: &[u8], want: &[u8]) -> Result<()> {
    if got == want {
        Ok(())
    } else {
        Err(GlueError::kat(what))
    }
}

fn check_geometry(descriptor: &AlgorithmDescriptor, ivsize: usize) -> Result<()> {
    if ivsize != descriptor.ivsize {
        return Err(GlueError::kat(format!(
            "{} reports ivsize {ivsize}, descriptor says {}",
            descriptor.driver_name, descriptor.ivsize
        )));
    }
    Ok(())
}

/// Encrypt and decrypt one vector through a fresh skcipher transform.
fn skcipher_transport(
    descriptor: &AlgorithmDescriptor,
    key: &[u8],
    iv: &[u8],
    plaintext: &[u8],
    ciphertext: &[u8],
) -> Result<()> {
    let mut tfm = descriptor.instantiate_skcipher()?;
    check_geometry(descriptor, tfm.ivsize())?;
    tfm.set_key(key)?;
    let iv = block(iv)?;
    let len = plaintext.len();

    for layout in LAYOUTS {
        let src = ScatterList::split(plaintext, layout);
        let mut dst = ScatterList::split(&vec![0u8; len], DESTINATION_LAYOUT);
        let mut req = SkcipherRequest::new(&src, &mut dst, len, iv);
        tfm.encrypt(&mut req)?;
        drop(req);
        expect_eq(
            &format!("{} transport encrypt", descriptor.driver_name),
            &dst.to_vec(),
            ciphertext,
        )?;

        let mut list = ScatterList::split(ciphertext, layout);
        let mut req = SkcipherRequest::in_place(&mut list, len, iv);
        tfm.decrypt(&mut req)?;
        drop(req);
        expect_eq(
            &format!("{} transport decrypt", descriptor.driver_name),
            &list.to_vec(),
            plaintext,
        )?;
    }
    Ok(())
}

/// Seal and open one vector through a fresh AEAD transform.
fn aead_transport(
    descriptor: &AlgorithmDescriptor,
    key: &[u8],
    iv: &[u8],
    aad: &[u8],
    plaintext: &[u8],
    sealed: &[u8],
) -> Result<()> {
    let mut tfm = descriptor.instantiate_aead()?;
    check_geometry(descriptor, tfm.ivsize())?;
    if tfm.maxauthsize() != descriptor.maxauthsize {
        return Err(GlueError::kat(format!(
            "{} reports maxauthsize {}",
            descriptor.driver_name,
            tfm.maxauthsize()
        )));
    }
    tfm.set_key(key)?;

    let mut input = aad.to_vec();
    input.extend_from_slice(plaintext);
    let authsize = tfm.authsize();

    for layout in LAYOUTS {
        let src = ScatterList::split(&input, layout);
        let mut dst = ScatterList::split(&vec![0u8; sealed.len()], DESTINATION_LAYOUT);
        let mut req = AeadRequest::new(&src, &mut dst, aad.len(), plaintext.len(), iv);
        tfm.encrypt(&mut req)?;
        drop(req);
        expect_eq(
            &format!("{} transport seal", descriptor.driver_name),
            &dst.to_vec(),
            sealed,
        )?;

        let mut list = ScatterList::split(sealed, layout);
        let mut req =
            AeadRequest::in_place(&mut list, aad.len(), plaintext.len() + authsize, iv);
        tfm.decrypt(&mut req)?;
        drop(req);
        expect_eq(
            &format!("{} transport open", descriptor.driver_name),
            &list.to_vec()[..input.len()],
            &input,
        )?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FipsMode, GlueConfig};
    use crate::modes;

    #[test]
    fn test_every_suite_passes() {
        let config = GlueConfig::default();
        modes::cbc::descriptor(&config).run_self_test().unwrap();
        modes::cfb::descriptor(&config).run_self_test().unwrap();
        modes::gcm::descriptor(&config).run_self_test().unwrap();
        modes::xts::descriptor(&config).run_self_test().unwrap();
    }

    #[test]
    fn test_xts_suite_under_fips() {
        let config = GlueConfig {
            fips: FipsMode::Fips140_3,
            ..GlueConfig::default()
        };
        let descriptor = modes::xts::descriptor(&config);
        assert!(descriptor.fips);
        descriptor.run_self_test().unwrap();
    }

    #[test]
    fn test_geometry_mismatch_is_kat_failure() {
        let mut descriptor = modes::cbc::descriptor(&GlueConfig::default());
        descriptor.ivsize = 12;
        assert!(matches!(
            descriptor.run_self_test(),
            Err(GlueError::KatMismatch(_))
        ));
    }

    #[test]
    fn test_helpers() {
        assert!(matches!(unhex("zz"), Err(GlueError::KatMismatch(_))));
        assert!(block(&[0u8; 15]).is_err());
        assert!(expect_eq("same", b"ab", b"ab").is_ok());
        assert!(matches!(
            expect_eq("differs", b"ab", b"ac"),
            Err(GlueError::KatMismatch(m)) if m == "differs"
        ));
    }
}
