//! # cipher-glue
//!
//! Adapts AES-CBC, AES-CFB, AES-GCM and AES-XTS primitives to a
//! scatter-gather request interface, and publishes each algorithm only after
//! its known-answer self-test passes.
//!
//! ## Features
//!
//! - **Segment walk**: requests over lists of byte segments, with gathering
//!   across boundaries so a cipher block is never split
//! - **CBC / CFB**: chained requests; the IV written back is the next IV
//! - **GCM**: associated data and payload in one walk, truncated tags,
//!   plaintext zeroed on authentication failure
//! - **XTS**: ciphertext stealing on gathered data units
//! - **Self-test gated registry**: install, test, then publish or roll back
//! - **Hardware acceleration**: AES-NI through the `aes` crate, advertised
//!   in driver names
//!
//! ## Usage Example
//!
//! ```rust,ignore
//! use cipher_glue::{GlueConfig, Registry, ScatterList, SkcipherRequest};
//!
//! let mut registry = Registry::new(GlueConfig::default())?;
//! registry.register_all()?;
//!
//! let mut tfm = registry.alloc_skcipher("cbc(aes)")?;
//! tfm.set_key(&key)?;
//!
//! let src = ScatterList::split(&plaintext, &[5, 27]);
//! let mut dst = ScatterList::zeroed(&[plaintext.len()]);
//! let mut req = SkcipherRequest::new(&src, &mut dst, plaintext.len(), iv);
//! tfm.encrypt(&mut req)?;
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Registry ── register(descriptor) ── selftest ──┐
//!    │                                           │
//!    └─ alloc_skcipher / alloc_aead              ▼
//!          │                             primitive (AesState, XtsState)
//!          ▼                                     ▲
//!    modes::{cbc, cfb, gcm, xts} ── walk ── ScatterList
//!          │
//!          └─ context (CipherContext, XtsContext)
//! ```

// Module declarations
pub mod config;
pub mod context;
pub mod descriptor;
pub mod error;
pub mod modes;
pub mod primitive;
pub mod registry;
pub mod request;
pub mod scatterlist;
pub mod selftest;
pub mod tfm;
pub mod walk;

// Re-exports for convenience
pub use config::{EnabledAlgorithms, FipsMode, GlueConfig};
pub use descriptor::{AlgorithmDescriptor, AlgorithmSummary, TransformKind};
pub use error::{GlueError, Result};
pub use registry::Registry;
pub use request::{AeadRequest, SkcipherRequest};
pub use scatterlist::ScatterList;
pub use tfm::{Aead, Skcipher};
pub use walk::{Buffers, ScatterWalk, SegmentWalk, WalkError};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// AES block size in bytes
pub const BLOCK_SIZE: usize = primitive::AES_BLOCK_SIZE;

/// GCM request IV length
pub const GCM_IV_SIZE: usize = primitive::GCM_STANDARD_IV_SIZE;

/// Largest XTS key (two AES-256 keys)
pub const XTS_MAX_KEY_SIZE: usize = 64;
