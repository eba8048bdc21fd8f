//! Primitive layer: AES key schedules and the per-mode running state that
//! the walk engines drive.

pub mod block;
pub mod gcm;
pub mod xts;

pub use block::{AesBlock, AesState, Direction};
pub use gcm::{GcmStream, GCM_STANDARD_IV_SIZE};
pub use xts::{XtsState, MIN_DATA_UNIT};

/// AES block size, shared by all four modes
pub const AES_BLOCK_SIZE: usize = 16;
