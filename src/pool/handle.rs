//! Compact handles into a slab pool

use super::allocator::SlabPool;
use crate::error::Result;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::marker::PhantomData;

/// 4-byte stand-in for a `&T` into a [`SlabPool<T>`]
///
/// A handle is a plain coordinate: it owns nothing and copying it does not
/// touch the pool. `(0, 0)` is the null handle and never refers to a live
/// element.
#[repr(C)]
pub struct Handle<T> {
    slab: u16,
    slot: u16,
    _marker: PhantomData<fn() -> T>,
}

impl<T> Handle<T> {
    /// The null handle `(0, 0)`
    pub const NULL: Self = Self::new(0, 0);

    /// Build a handle from raw coordinates without validating them
    #[inline]
    pub const fn new(slab: u16, slot: u16) -> Self {
        Self {
            slab,
            slot,
            _marker: PhantomData,
        }
    }

    #[inline]
    pub const fn null() -> Self {
        Self::NULL
    }

    /// Slab index
    #[inline]
    pub const fn slab(self) -> u16 {
        self.slab
    }

    /// Slot index within the slab
    #[inline]
    pub const fn slot(self) -> u16 {
        self.slot
    }

    /// Structural null check. Says nothing about liveness.
    #[inline]
    pub const fn is_null(self) -> bool {
        self.slab == 0 && self.slot == 0
    }

    /// `Some(self)` unless null
    #[inline]
    pub fn non_null(self) -> Option<Self> {
        (!self.is_null()).then_some(self)
    }

    /// Pack into a `u32`, slab in the high half
    #[inline]
    pub const fn to_bits(self) -> u32 {
        ((self.slab as u32) << 16) | self.slot as u32
    }

    #[inline]
    pub const fn from_bits(bits: u32) -> Self {
        Self::new((bits >> 16) as u16, bits as u16)
    }

    /// Find the handle of an element by address; null if it is not in any live slab
    pub fn from_ref(pool: &SlabPool<T>, value: &T) -> Self {
        pool.handle_of(value)
    }

    /// Whether this handle refers to an occupied slot in `pool`
    #[inline]
    pub fn is_live(self, pool: &SlabPool<T>) -> bool {
        pool.is_live(self)
    }

    /// Checked dereference
    #[inline]
    pub fn get(self, pool: &SlabPool<T>) -> Option<&T> {
        pool.get(self)
    }

    /// Checked mutable dereference
    #[inline]
    pub fn get_mut(self, pool: &mut SlabPool<T>) -> Option<&mut T> {
        pool.get_mut(self)
    }
}

impl<T: Default> Handle<T> {
    /// Allocate a fresh slot from `pool`
    pub fn allocate(pool: &mut SlabPool<T>) -> Result<Self> {
        pool.allocate()
    }

    /// Return this handle's slot to `pool` and reset the handle to null
    ///
    /// The handle is reset even when the pool rejects the coordinates.
    pub fn deallocate(&mut self, pool: &mut SlabPool<T>) -> Result<()> {
        let handle = std::mem::take(self);
        pool.deallocate(handle)
    }
}

impl<T> Default for Handle<T> {
    fn default() -> Self {
        Self::NULL
    }
}

impl<T> Clone for Handle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Handle<T> {}

impl<T> PartialEq for Handle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.slab == other.slab && self.slot == other.slot
    }
}

impl<T> Eq for Handle<T> {}

impl<T> PartialOrd for Handle<T> {
    fn partial_cmp(&self, other: &Self) -> Option<std::cmp::Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Handle<T> {
    fn cmp(&self, other: &Self) -> std::cmp::Ordering {
        self.to_bits().cmp(&other.to_bits())
    }
}

impl<T> Hash for Handle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_bits().hash(state);
    }
}

impl<T> fmt::Debug for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Handle")
            .field("slab", &self.slab)
            .field("slot", &self.slot)
            .finish()
    }
}

impl<T> fmt::Display for Handle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Handle(slab={}, slot={})", self.slab, self.slot)
    }
}

impl<T> Serialize for Handle<T> {
    fn serialize<S: Serializer>(&self, serializer: S) -> std::result::Result<S::Ok, S::Error> {
        serializer.serialize_u32(self.to_bits())
    }
}

impl<'de, T> Deserialize<'de> for Handle<T> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> std::result::Result<Self, D::Error> {
        u32::deserialize(deserializer).map(Self::from_bits)
    }
}

/// A [`Handle`] paired with the slot generation it was issued under
///
/// Unlike the bare handle, a checked handle stops resolving once its slot
/// is freed, even if the slot has since been handed out again.
pub struct CheckedHandle<T> {
    handle: Handle<T>,
    generation: u32,
}

impl<T> CheckedHandle<T> {
    pub(crate) const fn new(handle: Handle<T>, generation: u32) -> Self {
        Self { handle, generation }
    }

    /// The compact handle, dropping the generation
    #[inline]
    pub const fn handle(self) -> Handle<T> {
        self.handle
    }

    #[inline]
    pub const fn generation(self) -> u32 {
        self.generation
    }
}

impl<T> Clone for CheckedHandle<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for CheckedHandle<T> {}

impl<T> PartialEq for CheckedHandle<T> {
    fn eq(&self, other: &Self) -> bool {
        self.handle == other.handle && self.generation == other.generation
    }
}

impl<T> Eq for CheckedHandle<T> {}

impl<T> Hash for CheckedHandle<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.handle.hash(state);
        self.generation.hash(state);
    }
}

impl<T> fmt::Debug for CheckedHandle<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("CheckedHandle")
            .field("slab", &self.handle.slab)
            .field("slot", &self.handle.slot)
            .field("generation", &self.generation)
            .finish()
    }
}
