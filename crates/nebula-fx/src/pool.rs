//! Fixed-capacity object pool with explicit per-slot lifecycle state
//!
//! All slots are constructed up front. Afterwards acquire and release only
//! move indices between the free stack and the active list, so no allocation
//! happens once the pool is built.

/// Lifecycle tag of one slot
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SlotState {
    Pooled,
    Active,
}

/// Index of a slot inside its pool
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SlotId(pub usize);

pub struct Pool<T> {
    slots: Vec<T>,
    states: Vec<SlotState>,
    free: Vec<usize>,
    active: Vec<usize>,
}

impl<T> Pool<T> {
    /// Build `capacity` slots with `make(index)`
    pub fn new(capacity: usize, mut make: impl FnMut(usize) -> T) -> Self {
        let slots: Vec<T> = (0..capacity).map(&mut make).collect();
        // Reversed so the first acquire hands out slot 0
        let free = (0..capacity).rev().collect();
        Self {
            slots,
            states: vec![SlotState::Pooled; capacity],
            free,
            active: Vec::with_capacity(capacity),
        }
    }

    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    pub fn active_count(&self) -> usize {
        self.active.len()
    }

    pub fn free_count(&self) -> usize {
        self.free.len()
    }

    pub fn state(&self, id: SlotId) -> Option<SlotState> {
        self.states.get(id.0).copied()
    }

    pub fn is_active(&self, id: SlotId) -> bool {
        self.state(id) == Some(SlotState::Active)
    }

    /// Take a slot from the free set. Returns None when the pool is exhausted.
    pub fn acquire(&mut self) -> Option<SlotId> {
        let index = self.free.pop()?;
        self.states[index] = SlotState::Active;
        self.active.push(index);
        Some(SlotId(index))
    }

    /// Return an active slot to the free set. Releasing a slot that is not
    /// active changes nothing and returns false.
    pub fn release(&mut self, id: SlotId) -> bool {
        if !self.is_active(id) {
            return false;
        }
        if let Some(pos) = self.active.iter().position(|&i| i == id.0) {
            self.active.swap_remove(pos);
        }
        self.states[id.0] = SlotState::Pooled;
        self.free.push(id.0);
        true
    }

    pub fn get(&self, id: SlotId) -> Option<&T> {
        self.slots.get(id.0)
    }

    pub fn get_mut(&mut self, id: SlotId) -> Option<&mut T> {
        self.slots.get_mut(id.0)
    }

    /// Active slot ids in activation order (until a release reorders them)
    pub fn active_ids(&self) -> impl Iterator<Item = SlotId> + '_ {
        self.active.iter().map(|&i| SlotId(i))
    }

    /// Iterate active slots
    pub fn iter_active(&self) -> impl Iterator<Item = &T> + '_ {
        self.active.iter().map(move |&i| &self.slots[i])
    }

    /// Every slot regardless of state
    pub fn iter_all(&self) -> impl Iterator<Item = &T> + '_ {
        self.slots.iter()
    }

    /// Visit every active slot; slots for which `keep` returns false are
    /// released. `keep` receives the slot's position in the active list.
    /// Iterates back to front so releases never skip a slot.
    pub fn retain_active(&mut self, mut keep: impl FnMut(usize, &mut T) -> bool) {
        let mut pos = self.active.len();
        while pos > 0 {
            pos -= 1;
            let index = self.active[pos];
            if !keep(pos, &mut self.slots[index]) {
                self.active.swap_remove(pos);
                self.states[index] = SlotState::Pooled;
                self.free.push(index);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assert_partition<T>(pool: &Pool<T>) {
        assert_eq!(pool.active_count() + pool.free_count(), pool.capacity());
        let mut seen = vec![false; pool.capacity()];
        for id in pool.active_ids() {
            assert!(!seen[id.0]);
            assert_eq!(pool.state(id), Some(SlotState::Active));
            seen[id.0] = true;
        }
        for &i in &pool.free {
            assert!(!seen[i]);
            assert_eq!(pool.states[i], SlotState::Pooled);
            seen[i] = true;
        }
        assert!(seen.iter().all(|s| *s));
    }

    #[test]
    fn acquire_until_exhausted() {
        let mut pool = Pool::new(3, |i| i);
        let ids: Vec<_> = (0..3).map(|_| pool.acquire().unwrap()).collect();
        assert_eq!(ids[0], SlotId(0));
        assert!(pool.acquire().is_none());
        assert_eq!(pool.active_count(), 3);
        assert_eq!(pool.free_count(), 0);
        assert_partition(&pool);
    }

    #[test]
    fn release_is_safe_when_repeated() {
        let mut pool = Pool::new(2, |_| ());
        let id = pool.acquire().unwrap();
        assert!(pool.release(id));
        assert!(!pool.release(id));
        assert_eq!(pool.free_count(), 2);
        assert!(!pool.release(SlotId(99)));
        assert_partition(&pool);
    }

    #[test]
    fn retain_active_releases_rejected() {
        let mut pool = Pool::new(5, |i| i as u32);
        for _ in 0..5 {
            pool.acquire();
        }
        pool.retain_active(|_, v| *v % 2 == 0);
        assert_eq!(pool.active_count(), 3);
        let mut kept: Vec<u32> = pool.iter_active().copied().collect();
        kept.sort();
        assert_eq!(kept, vec![0, 2, 4]);
        assert_partition(&pool);
    }

    #[test]
    fn partition_holds_under_churn() {
        let mut pool = Pool::new(8, |_| 0u32);
        for round in 0..50u32 {
            for _ in 0..(round % 5) {
                if let Some(id) = pool.acquire() {
                    *pool.get_mut(id).unwrap() = round;
                }
            }
            pool.retain_active(|pos, v| (*v + pos as u32) % 3 != 0);
            assert!(pool.active_count() <= 8);
            assert_partition(&pool);
        }
    }
}
