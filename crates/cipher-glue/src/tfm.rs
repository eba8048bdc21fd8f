//! Transform handles handed out by the registry.

use crate::error::Result;
use crate::request::{AeadRequest, SkcipherRequest};

/// Unauthenticated symmetric cipher (CBC, CFB, XTS).
///
/// One handle owns one cipher context. Operations take `&mut self`, so a
/// single handle is never driven from two threads at once; distinct handles
/// share nothing and may run concurrently.
pub trait Skcipher: Send {
    fn driver_name(&self) -> &str;

    fn ivsize(&self) -> usize;

    fn set_key(&mut self, key: &[u8]) -> Result<()>;

    fn encrypt(&mut self, req: &mut SkcipherRequest<'_>) -> Result<()>;

    fn decrypt(&mut self, req: &mut SkcipherRequest<'_>) -> Result<()>;
}

/// Authenticated cipher with associated data (GCM).
pub trait Aead: Send {
    fn driver_name(&self) -> &str;

    fn ivsize(&self) -> usize;

    fn maxauthsize(&self) -> usize;

    /// Tag length currently in effect.
    fn authsize(&self) -> usize;

    fn set_key(&mut self, key: &[u8]) -> Result<()>;

    /// Fails with `ConfigurationError` outside the supported tag range.
    fn set_authsize(&mut self, authsize: usize) -> Result<()>;

    /// `aad ++ plaintext` to `aad ++ ciphertext ++ tag`.
    fn encrypt(&mut self, req: &mut AeadRequest<'_>) -> Result<()>;

    /// `aad ++ ciphertext ++ tag` to `aad ++ plaintext`, or
    /// `AuthenticationFailure` when the tag does not verify.
    fn decrypt(&mut self, req: &mut AeadRequest<'_>) -> Result<()>;
}
