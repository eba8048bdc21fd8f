//! Cipher contexts: ownership and lifecycle of primitive state.

use crate::error::{GlueError, Result};
use crate::primitive::{AesState, Direction, XtsState};
use std::fmt;
use std::mem;
use std::ops::{Deref, DerefMut};

/// Heap slot holding one primitive state.
///
/// Allocation is fallible: the constructor either returns a fully
/// initialized slot or an `AllocationFailure` with nothing left behind.
pub struct StateSlot<T> {
    inner: Box<[T; 1]>,
}

impl<T> StateSlot<T> {
    pub fn try_new(value: T, what: &'static str) -> Result<Self> {
        let failure = || GlueError::AllocationFailure {
            what,
            size: mem::size_of::<T>(),
        };

        let mut storage = Vec::new();
        storage.try_reserve_exact(1).map_err(|_| failure())?;
        storage.push(value);
        let inner = Box::<[T; 1]>::try_from(storage.into_boxed_slice()).map_err(|_| failure())?;
        Ok(Self { inner })
    }
}

impl<T> Deref for StateSlot<T> {
    type Target = T;

    fn deref(&self) -> &T {
        &self.inner[0]
    }
}

impl<T> DerefMut for StateSlot<T> {
    fn deref_mut(&mut self) -> &mut T {
        &mut self.inner[0]
    }
}

impl<T: fmt::Debug> fmt::Debug for StateSlot<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&**self, f)
    }
}

/// Primitive state for one configured AES key.
///
/// Holds an encryption state and, when the mode needs one, an independent
/// decryption state. Either state is fully present or absent.
#[derive(Debug)]
pub struct CipherContext {
    encrypt_state: Option<StateSlot<AesState>>,
    decrypt_state: Option<StateSlot<AesState>>,
}

impl CipherContext {
    /// Allocate the encryption state, plus a decryption state when
    /// `need_decryption` is set.
    pub fn init(need_decryption: bool) -> Result<Self> {
        let encrypt_state = Some(StateSlot::try_new(AesState::new(), "AES encrypt state")?);
        let decrypt_state = if need_decryption {
            Some(StateSlot::try_new(AesState::new(), "AES decrypt state")?)
        } else {
            None
        };

        Ok(Self {
            encrypt_state,
            decrypt_state,
        })
    }

    /// Install `key` into every allocated state.
    pub fn set_key(&mut self, key: &[u8]) -> Result<()> {
        let encrypt = self.encrypt_state.as_deref_mut().ok_or_else(torn_down)?;
        encrypt.set_key(key, Direction::Encrypt)?;
        if let Some(decrypt) = self.decrypt_state.as_deref_mut() {
            decrypt.set_key(key, Direction::Decrypt)?;
        }
        Ok(())
    }

    pub fn encrypt_state(&mut self) -> Result<&mut AesState> {
        self.encrypt_state.as_deref_mut().ok_or_else(torn_down)
    }

    pub fn decrypt_state(&mut self) -> Result<&mut AesState> {
        if self.encrypt_state.is_none() {
            return Err(torn_down());
        }
        self.decrypt_state
            .as_deref_mut()
            .ok_or_else(|| GlueError::TransformFailure("context has no decryption state".into()))
    }

    pub fn has_decrypt_state(&self) -> bool {
        self.decrypt_state.is_some()
    }

    pub fn is_torn_down(&self) -> bool {
        self.encrypt_state.is_none() && self.decrypt_state.is_none()
    }

    /// Release every state. Safe to call repeatedly.
    pub fn teardown(&mut self) {
        self.encrypt_state = None;
        self.decrypt_state = None;
    }
}

impl Drop for CipherContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

/// XTS counterpart of [`CipherContext`]: one slot, keyed on `set_key`.
#[derive(Debug)]
pub struct XtsContext {
    state: Option<StateSlot<Option<XtsState>>>,
    distinct_halves: bool,
}

impl XtsContext {
    pub fn init(distinct_halves: bool) -> Result<Self> {
        Ok(Self {
            state: Some(StateSlot::try_new(None, "XTS state")?),
            distinct_halves,
        })
    }

    pub fn set_key(&mut self, key: &[u8]) -> Result<()> {
        let slot = self.state.as_deref_mut().ok_or_else(torn_down)?;
        // A rejected key leaves the context unkeyed rather than on the old key.
        *slot = None;
        *slot = Some(XtsState::new(key, self.distinct_halves)?);
        Ok(())
    }

    pub fn state(&self) -> Result<&XtsState> {
        self.state
            .as_deref()
            .ok_or_else(torn_down)?
            .as_ref()
            .ok_or_else(|| GlueError::TransformFailure("no XTS key installed".into()))
    }

    pub fn is_torn_down(&self) -> bool {
        self.state.is_none()
    }

    pub fn teardown(&mut self) {
        self.state = None;
    }
}

impl Drop for XtsContext {
    fn drop(&mut self) {
        self.teardown();
    }
}

fn torn_down() -> GlueError {
    GlueError::TransformFailure("cipher context already torn down".into())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_allocates_requested_states() {
        let cbc = CipherContext::init(true).unwrap();
        assert!(cbc.has_decrypt_state());

        let mut cfb = CipherContext::init(false).unwrap();
        assert!(!cfb.has_decrypt_state());
        assert!(matches!(
            cfb.decrypt_state(),
            Err(GlueError::TransformFailure(_))
        ));
    }

    #[test]
    fn test_set_key_reaches_every_state() {
        let mut ctx = CipherContext::init(true).unwrap();
        ctx.set_key(&[7u8; 24]).unwrap();
        assert_eq!(ctx.encrypt_state().unwrap().key_size(), Some(24));
        assert_eq!(
            ctx.encrypt_state().unwrap().direction(),
            Direction::Encrypt
        );
        assert_eq!(
            ctx.decrypt_state().unwrap().direction(),
            Direction::Decrypt
        );
    }

    #[test]
    fn test_rejected_key_leaves_context_destructible() {
        let mut ctx = CipherContext::init(true).unwrap();
        assert!(matches!(
            ctx.set_key(&[7u8; 17]),
            Err(GlueError::KeyRejected(_))
        ));
        ctx.teardown();
        ctx.teardown();
        assert!(ctx.is_torn_down());
    }

    #[test]
    fn test_use_after_teardown_fails() {
        let mut ctx = CipherContext::init(false).unwrap();
        ctx.teardown();
        assert!(ctx.encrypt_state().is_err());
        assert!(ctx.set_key(&[0u8; 16]).is_err());
    }

    #[test]
    fn test_slot_is_block_aligned() {
        let slot = StateSlot::try_new(AesState::new(), "test").unwrap();
        let addr = &*slot as *const AesState as usize;
        assert_eq!(addr % 16, 0);
    }

    #[test]
    fn test_xts_context_lifecycle() {
        let mut ctx = XtsContext::init(true).unwrap();
        assert!(ctx.state().is_err());

        let key: Vec<u8> = (0..64u8).collect();
        ctx.set_key(&key).unwrap();
        assert_eq!(ctx.state().unwrap().key_size(), 64);

        assert!(ctx.set_key(&[0x20u8; 32]).is_err());
        assert!(ctx.state().is_err());

        ctx.teardown();
        ctx.teardown();
        assert!(ctx.is_torn_down());
        assert!(ctx.set_key(&key).is_err());
    }
}
