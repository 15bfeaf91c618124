//! Slab pool implementation

use super::config::PoolConfig;
use super::handle::{CheckedHandle, Handle};
use super::slab::Slab;
use crate::error::{Error, Result};
use std::ops::{Index, IndexMut};
use tracing::{debug, info, warn};

/// Typed slab pool addressed by 4-byte [`Handle`]s
///
/// Owns a fixed-size table of lazily created slabs. Slot `(0, 0)` is
/// reserved at construction so that the null handle never aliases a live
/// element; slab 0 is therefore never released.
///
/// Allocation is first-fit: the lowest slab with a free slot wins, and
/// within a slab the lowest free slot wins. A slab whose live-count drops
/// to zero is released immediately and its id becomes reusable.
#[derive(Debug)]
pub struct SlabPool<T> {
    config: PoolConfig,
    slabs: Vec<Option<Slab<T>>>,
    /// Per-slot generations, kept across slab release. Empty until the
    /// slab id is first used.
    generations: Vec<Box<[u32]>>,
}

impl<T: Default> SlabPool<T> {
    /// Create a pool with the default 256 x 256 shape
    pub fn new() -> Self {
        Self::build(PoolConfig::default())
    }

    /// Create a pool with a custom shape
    pub fn with_config(config: PoolConfig) -> Result<Self> {
        config.validate()?;
        Ok(Self::build(config))
    }

    fn build(config: PoolConfig) -> Self {
        info!(
            element = std::any::type_name::<T>(),
            slab_capacity = config.slab_capacity,
            max_slabs = config.max_slabs,
            "Initializing slab pool"
        );

        let mut pool = Self {
            config,
            slabs: (0..config.max_slabs).map(|_| None).collect(),
            generations: vec![Box::default(); config.max_slabs],
        };
        pool.reserve_null();
        pool
    }

    fn reserve_null(&mut self) {
        self.create_slab(0).claim_at(0);
    }

    fn create_slab(&mut self, index: usize) -> &mut Slab<T> {
        let capacity = self.config.slab_capacity;
        if self.generations[index].is_empty() {
            self.generations[index] = vec![0; capacity].into_boxed_slice();
        }
        debug!(slab = index, capacity, "Created slab");
        self.slabs[index].insert(Slab::new(capacity))
    }

    /// Claim a free slot
    ///
    /// The slot holds `T::default()`. Fails with [`Error::PoolExhausted`]
    /// once every slab exists and is full.
    pub fn allocate(&mut self) -> Result<Handle<T>> {
        let existing = self
            .slabs
            .iter_mut()
            .enumerate()
            .find_map(|(index, entry)| {
                let slab = entry.as_mut().filter(|s| !s.is_full())?;
                let slot = slab.claim()?;
                Some((index, slot))
            });

        let (index, slot) = match existing {
            Some(coordinates) => coordinates,
            None => {
                let Some(index) = self.slabs.iter().position(Option::is_none) else {
                    warn!(capacity = self.capacity(), "Slab pool exhausted");
                    return Err(Error::PoolExhausted {
                        capacity: self.capacity(),
                    });
                };
                self.create_slab(index).claim_at(0);
                (index, 0)
            }
        };

        // Both indices are below 65536 by config validation
        let handle = Handle::new(index as u16, slot as u16);
        debug!(slab = index, slot, "Allocated slot");
        Ok(handle)
    }

    /// Allocate a slot and move `value` into it
    pub fn insert(&mut self, value: T) -> Result<Handle<T>> {
        let handle = self.allocate()?;
        if let Some(item) = self.resolve_mut(handle) {
            *item = value;
        }
        Ok(handle)
    }

    /// Free the slot behind `handle`, dropping its value
    ///
    /// Deallocating the null handle is a no-op. A slot that is not
    /// occupied is reported as [`Error::NotLive`] without touching any
    /// accounting. When the last slot of a slab is freed the slab storage
    /// is released.
    pub fn deallocate(&mut self, handle: Handle<T>) -> Result<()> {
        if handle.is_null() {
            return Ok(());
        }
        let (index, slot) = self.coordinates(handle)?;

        let not_live = Error::NotLive {
            slab: handle.slab(),
            slot: handle.slot(),
        };
        let Some(slab) = self.slabs[index].as_mut() else {
            return Err(not_live);
        };
        if !slab.release(slot) {
            return Err(not_live);
        }

        let generation = &mut self.generations[index][slot];
        *generation = generation.wrapping_add(1);
        debug!(slab = index, slot, live = slab.live(), "Freed slot");

        if slab.live() == 0 {
            self.slabs[index] = None;
            debug!(slab = index, "Released empty slab");
        }
        Ok(())
    }

    /// Drop every element and slab, then re-reserve the null slot
    ///
    /// All previously issued checked handles stop being current.
    pub fn clear(&mut self) {
        for (index, entry) in self.slabs.iter_mut().enumerate() {
            if let Some(slab) = entry.take() {
                for slot in slab.occupied_slots() {
                    let generation = &mut self.generations[index][slot];
                    *generation = generation.wrapping_add(1);
                }
            }
        }
        debug!("Cleared slab pool");
        self.reserve_null();
    }
}

impl<T: Default> Default for SlabPool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> SlabPool<T> {
    pub fn config(&self) -> &PoolConfig {
        &self.config
    }

    /// Usable slots, excluding the reserved null slot
    pub fn capacity(&self) -> usize {
        self.config.capacity()
    }

    /// Live elements, excluding the reserved null slot
    pub fn len(&self) -> usize {
        self.slabs.iter().flatten().map(Slab::live).sum::<usize>() - 1
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Slots still available for allocation
    pub fn remaining(&self) -> usize {
        self.capacity() - self.len()
    }

    /// Number of slabs currently holding storage
    pub fn slab_count(&self) -> usize {
        self.slabs.iter().flatten().count()
    }

    /// Whether slab `index` currently holds storage
    pub fn has_slab(&self, index: u16) -> bool {
        matches!(self.slabs.get(index as usize), Some(Some(_)))
    }

    fn coordinates(&self, handle: Handle<T>) -> Result<(usize, usize)> {
        let (index, slot) = (handle.slab() as usize, handle.slot() as usize);
        if index >= self.config.max_slabs || slot >= self.config.slab_capacity {
            return Err(Error::OutOfRange {
                slab: handle.slab(),
                slot: handle.slot(),
            });
        }
        Ok((index, slot))
    }

    /// Whether `handle` refers to an occupied slot
    ///
    /// This is an occupancy check only: a stale handle whose slot was
    /// freed and handed out again reports live. Use [`CheckedHandle`] for
    /// an exact check.
    pub fn is_live(&self, handle: Handle<T>) -> bool {
        !handle.is_null()
            && self
                .slabs
                .get(handle.slab() as usize)
                .and_then(Option::as_ref)
                .is_some_and(|slab| slab.is_occupied(handle.slot() as usize))
    }

    /// Element slot behind `handle` without an occupancy check
    ///
    /// Returns `None` for the null handle or a slab that does not exist.
    /// An unoccupied slot yields its default or stale contents.
    pub fn resolve(&self, handle: Handle<T>) -> Option<&T> {
        if handle.is_null() {
            return None;
        }
        self.slabs
            .get(handle.slab() as usize)?
            .as_ref()?
            .get(handle.slot() as usize)
    }

    pub fn resolve_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if handle.is_null() {
            return None;
        }
        self.slabs
            .get_mut(handle.slab() as usize)?
            .as_mut()?
            .get_mut(handle.slot() as usize)
    }

    /// Element behind `handle` if it is live
    pub fn get(&self, handle: Handle<T>) -> Option<&T> {
        if !self.is_live(handle) {
            return None;
        }
        self.resolve(handle)
    }

    pub fn get_mut(&mut self, handle: Handle<T>) -> Option<&mut T> {
        if !self.is_live(handle) {
            return None;
        }
        self.resolve_mut(handle)
    }

    /// Like [`get`](Self::get), with the reason for failure
    pub fn try_get(&self, handle: Handle<T>) -> Result<&T> {
        if handle.is_null() {
            return Err(Error::NullHandle);
        }
        self.get(handle).ok_or(Error::NotLive {
            slab: handle.slab(),
            slot: handle.slot(),
        })
    }

    pub fn try_get_mut(&mut self, handle: Handle<T>) -> Result<&mut T> {
        if handle.is_null() {
            return Err(Error::NullHandle);
        }
        let not_live = Error::NotLive {
            slab: handle.slab(),
            slot: handle.slot(),
        };
        self.get_mut(handle).ok_or(not_live)
    }

    /// Map an element address back to its handle
    ///
    /// Scans every live slab's address range. Returns the null handle if
    /// `ptr` is not the start of an element in a live slab. Zero-sized
    /// element types have no distinct addresses, so for them this always
    /// returns the null handle, even for a live element.
    pub fn reverse_lookup(&self, ptr: *const T) -> Handle<T> {
        self.slabs
            .iter()
            .enumerate()
            .find_map(|(index, entry)| {
                let slot = entry.as_ref()?.slot_of(ptr)?;
                Some(Handle::new(index as u16, slot as u16))
            })
            .unwrap_or_default()
    }

    /// Handle of an element borrowed from this pool
    pub fn handle_of(&self, value: &T) -> Handle<T> {
        self.reverse_lookup(value)
    }

    fn generation(&self, handle: Handle<T>) -> Option<u32> {
        self.generations
            .get(handle.slab() as usize)?
            .get(handle.slot() as usize)
            .copied()
    }

    /// Pin `handle` to the current generation of its slot
    pub fn checked(&self, handle: Handle<T>) -> Option<CheckedHandle<T>> {
        if !self.is_live(handle) {
            return None;
        }
        let generation = self.generation(handle)?;
        Some(CheckedHandle::new(handle, generation))
    }

    /// Whether `checked` still refers to the allocation it was issued for
    pub fn is_current(&self, checked: CheckedHandle<T>) -> bool {
        let handle = checked.handle();
        self.is_live(handle) && self.generation(handle) == Some(checked.generation())
    }

    pub fn get_checked(&self, checked: CheckedHandle<T>) -> Option<&T> {
        if !self.is_current(checked) {
            return None;
        }
        self.resolve(checked.handle())
    }

    pub fn get_checked_mut(&mut self, checked: CheckedHandle<T>) -> Option<&mut T> {
        if !self.is_current(checked) {
            return None;
        }
        self.resolve_mut(checked.handle())
    }

    /// Live handles in (slab, slot) order, excluding the null slot
    pub fn handles(&self) -> impl Iterator<Item = Handle<T>> + '_ {
        self.slabs
            .iter()
            .enumerate()
            .filter_map(|(index, entry)| entry.as_ref().map(|slab| (index, slab)))
            .flat_map(|(index, slab)| {
                slab.occupied_slots()
                    .map(move |slot| Handle::new(index as u16, slot as u16))
            })
            .filter(|handle| !handle.is_null())
    }

    /// Get statistics about the pool
    pub fn stats(&self) -> PoolStats {
        let mut stats = PoolStats {
            capacity: self.capacity(),
            ..PoolStats::default()
        };

        for (index, entry) in self.slabs.iter().enumerate() {
            let Some(slab) = entry else { continue };
            let slab_stats = SlabStats {
                index,
                capacity: slab.capacity(),
                live: slab.live(),
            };
            stats.slabs.push(slab_stats);
            stats.live += slab_stats.live;
        }
        stats.live -= 1;

        stats
    }
}

impl<T> Index<Handle<T>> for SlabPool<T> {
    type Output = T;

    /// Unchecked dereference: occupancy is not verified.
    ///
    /// # Panics
    /// If `handle` is null, its slab does not exist, or its slot is past
    /// the slab capacity.
    fn index(&self, handle: Handle<T>) -> &T {
        match self.resolve(handle) {
            Some(item) => item,
            None => panic!("{} does not resolve to a slab slot", handle),
        }
    }
}

impl<T> IndexMut<Handle<T>> for SlabPool<T> {
    fn index_mut(&mut self, handle: Handle<T>) -> &mut T {
        match self.resolve_mut(handle) {
            Some(item) => item,
            None => panic!("{} does not resolve to a slab slot", handle),
        }
    }
}

/// Statistics for the slab pool
#[derive(Debug, Default)]
pub struct PoolStats {
    /// Slabs currently holding storage
    pub slabs: Vec<SlabStats>,
    /// Live elements, excluding the null slot
    pub live: usize,
    pub capacity: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SlabStats {
    pub index: usize,
    pub capacity: usize,
    /// Occupied slots, including the null slot for slab 0
    pub live: usize,
}
