//! A single slab: contiguous element storage plus occupancy

use fixedbitset::FixedBitSet;
use std::mem;

/// Fixed-capacity block of elements
///
/// Storage is allocated once at creation and never grows, so element
/// addresses stay stable for the lifetime of the slab.
#[derive(Debug)]
pub struct Slab<T> {
    items: Box<[T]>,
    /// Set bit = occupied slot
    occupancy: FixedBitSet,
    /// Always equals the number of set bits in `occupancy`
    live: usize,
}

impl<T: Default> Slab<T> {
    /// Create a slab of `capacity` default-initialized, unoccupied slots
    pub fn new(capacity: usize) -> Self {
        Self {
            items: (0..capacity).map(|_| T::default()).collect(),
            occupancy: FixedBitSet::with_capacity(capacity),
            live: 0,
        }
    }

    /// Claim the lowest free slot, resetting whatever it holds
    pub fn claim(&mut self) -> Option<usize> {
        if self.is_full() {
            return None;
        }
        let slot = self.occupancy.zeroes().next()?;
        self.occupancy.insert(slot);
        self.live += 1;
        self.items[slot] = T::default();
        Some(slot)
    }

    /// Claim a specific slot. Returns false if it was already occupied.
    pub fn claim_at(&mut self, slot: usize) -> bool {
        if self.occupancy.put(slot) {
            return false;
        }
        self.live += 1;
        true
    }

    /// Free `slot`, dropping its value
    ///
    /// Returns false (and leaves everything untouched) if the slot was not
    /// occupied.
    pub fn release(&mut self, slot: usize) -> bool {
        if !self.occupancy.contains(slot) {
            return false;
        }
        self.occupancy.set(slot, false);
        self.live -= 1;
        drop(mem::take(&mut self.items[slot]));
        true
    }
}

impl<T> Slab<T> {
    /// Number of occupied slots
    #[inline]
    pub fn live(&self) -> usize {
        self.live
    }

    #[inline]
    pub fn capacity(&self) -> usize {
        self.items.len()
    }

    #[inline]
    pub fn is_full(&self) -> bool {
        self.live == self.items.len()
    }

    #[inline]
    pub fn is_occupied(&self, slot: usize) -> bool {
        self.occupancy.contains(slot)
    }

    /// Element at `slot`, occupied or not
    #[inline]
    pub fn get(&self, slot: usize) -> Option<&T> {
        self.items.get(slot)
    }

    #[inline]
    pub fn get_mut(&mut self, slot: usize) -> Option<&mut T> {
        self.items.get_mut(slot)
    }

    /// Slot index of `ptr` if it points at an element of this slab
    ///
    /// Addresses inside an element but not at its start do not match.
    /// Zero-sized element types share one address and never match.
    pub fn slot_of(&self, ptr: *const T) -> Option<usize> {
        let size = mem::size_of::<T>();
        if size == 0 {
            return None;
        }
        let range = self.items.as_ptr_range();
        if !range.contains(&ptr) {
            return None;
        }
        let offset = ptr as usize - range.start as usize;
        (offset % size == 0).then_some(offset / size)
    }

    /// Occupied slot indices in ascending order
    pub fn occupied_slots(&self) -> impl Iterator<Item = usize> + '_ {
        self.occupancy.ones()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slab_claim_and_release() {
        let mut slab: Slab<u32> = Slab::new(4);
        assert_eq!(slab.claim(), Some(0));
        assert_eq!(slab.claim(), Some(1));
        assert_eq!(slab.live(), 2);

        *slab.get_mut(1).unwrap() = 7;
        assert!(slab.release(1));
        assert_eq!(slab.get(1), Some(&0));
        assert!(!slab.release(1));
        assert_eq!(slab.live(), 1);

        // Lowest free slot is reused first
        assert_eq!(slab.claim(), Some(1));
    }

    #[test]
    fn test_slab_full() {
        let mut slab: Slab<u8> = Slab::new(2);
        slab.claim();
        slab.claim();
        assert!(slab.is_full());
        assert_eq!(slab.claim(), None);
    }

    #[test]
    fn test_slab_claim_at() {
        let mut slab: Slab<u8> = Slab::new(4);
        assert!(slab.claim_at(0));
        assert!(!slab.claim_at(0));
        assert_eq!(slab.live(), 1);
        assert_eq!(slab.claim(), Some(1));
    }

    #[test]
    fn test_slab_first_free_across_words() {
        let mut slab: Slab<u8> = Slab::new(130);
        for _ in 0..65 {
            slab.claim();
        }
        assert_eq!(slab.claim(), Some(65));

        slab.release(3);
        assert_eq!(slab.claim(), Some(3));
        assert_eq!(slab.live(), 66);
    }

    #[test]
    fn test_slab_occupied_slots() {
        let mut slab: Slab<u8> = Slab::new(200);
        for slot in [0, 63, 64, 130, 199] {
            slab.claim_at(slot);
        }
        let occupied: Vec<usize> = slab.occupied_slots().collect();
        assert_eq!(occupied, vec![0, 63, 64, 130, 199]);
        assert!(!slab.is_occupied(1));
        assert!(!slab.is_occupied(500));
    }

    #[test]
    fn test_slab_full_partial_word() {
        let mut slab: Slab<u8> = Slab::new(70);
        for _ in 0..70 {
            assert!(slab.claim().is_some());
        }
        assert!(slab.is_full());
        assert_eq!(slab.claim(), None);
    }

    #[test]
    fn test_slab_zero_sized_never_matches() {
        let mut slab: Slab<()> = Slab::new(4);
        let slot = slab.claim().unwrap();
        let ptr = slab.get(slot).unwrap() as *const ();
        assert_eq!(slab.slot_of(ptr), None);
    }

    #[test]
    fn test_slab_slot_of() {
        let slab: Slab<u64> = Slab::new(8);
        let third = slab.get(3).unwrap() as *const u64;
        assert_eq!(slab.slot_of(third), Some(3));

        let misaligned = (third as usize + 1) as *const u64;
        assert_eq!(slab.slot_of(misaligned), None);

        let outside = 0u64;
        assert_eq!(slab.slot_of(&outside), None);
    }

    #[test]
    fn test_slab_release_drops_value() {
        let mut slab: Slab<String> = Slab::new(2);
        let slot = slab.claim().unwrap();
        *slab.get_mut(slot).unwrap() = "payload".to_string();
        slab.release(slot);
        assert!(slab.get(slot).unwrap().is_empty());
    }
}
