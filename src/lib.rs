// slabptr - Compact handle allocator
// Typed slab pools addressed by 4-byte handles

#![warn(rust_2018_idioms)]

pub mod pool;

// Re-exports for convenience
pub use error::{Error, Result};
pub use pool::{CheckedHandle, Handle, PoolConfig, PoolStats, SlabPool};

/// Pool error types
pub mod error {
    use thiserror::Error;

    #[derive(Error, Debug)]
    pub enum Error {
        #[error("Slab pool exhausted: all {capacity} slots are in use")]
        PoolExhausted { capacity: usize },

        #[error("Slot not live: slab={slab}, slot={slot}")]
        NotLive { slab: u16, slot: u16 },

        #[error("Coordinates out of range: slab={slab}, slot={slot}")]
        OutOfRange { slab: u16, slot: u16 },

        #[error("Null handle")]
        NullHandle,

        #[error("Invalid config: {0}")]
        InvalidConfig(String),

        #[error("Config error: {0}")]
        Config(String),
    }

    pub type Result<T> = std::result::Result<T, Error>;
}

/// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
