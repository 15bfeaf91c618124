//! Slab Pool
//!
//! Typed element pool addressed by 4-byte handles instead of machine
//! pointers, for link-heavy structures where pointer width dominates
//! node size.
//!
//! # Architecture
//!
//! ```text
//! SlabPool<T>  (max_slabs entries)
//!   ├─→ [0] Slab: items[0..cap]  occupancy: 1110…  ← (0,0) reserved as null
//!   ├─→ [1] Slab: items[0..cap]  occupancy: 1000…
//!   ├─→ [2] None                                   ← released, id reusable
//!   └─→ [3] None
//!
//! Handle<T> = (slab: u16, slot: u16)  →  &pool.slabs[slab].items[slot]
//! ```
//!
//! Slabs are created on demand and released as soon as their last slot is
//! freed. The occupancy bitmap doubles as the free-slot index; allocation
//! is first-fit over slabs, then over slots.

pub mod allocator;
pub mod config;
pub mod handle;
pub mod slab;

pub use allocator::{PoolStats, SlabPool, SlabStats};
pub use config::PoolConfig;
pub use handle::{CheckedHandle, Handle};
pub use slab::Slab;
