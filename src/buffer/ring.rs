//! Fixed-capacity circular buffer with overwrite eviction.

use std::fmt;
use std::ops::Index;

/// Callback invoked with each value displaced by an append into a full ring.
pub type ReleaseFn<T> = Box<dyn FnMut(T)>;

/// Fixed-capacity circular buffer.
///
/// Storage is allocated once at construction; appends never grow it.
/// When the ring is full, the oldest value is handed to the release
/// callback before the new value takes a slot. Logical position 0 is
/// always the oldest value still held.
pub struct BoundedRing<T> {
    slots: Box<[Option<T>]>,
    /// Slot of the oldest value.
    tail: usize,
    /// Slot the next append writes to.
    head: usize,
    len: usize,
    release: ReleaseFn<T>,
}

impl<T> BoundedRing<T> {
    /// Creates a ring that simply drops evicted values.
    ///
    /// A capacity of zero is clamped to one.
    pub fn new(capacity: usize) -> Self {
        Self::with_release(capacity, |_| {})
    }

    /// Creates a ring that passes each evicted value to `release`.
    pub fn with_release(capacity: usize, release: impl FnMut(T) + 'static) -> Self {
        let capacity = capacity.max(1);
        Self {
            slots: (0..capacity).map(|_| None).collect(),
            tail: 0,
            head: 0,
            len: 0,
            release: Box::new(release),
        }
    }

    /// Appends a value, evicting the oldest one first if the ring is full.
    pub fn append(&mut self, value: T) {
        let capacity = self.capacity();

        if self.len == capacity {
            let evicted = self.slots[self.tail].take();
            self.tail = (self.tail + 1) % capacity;
            self.len -= 1;

            if let Some(evicted) = evicted {
                (self.release)(evicted);
            }
        }

        self.slots[self.head] = Some(value);
        self.head = (self.head + 1) % capacity;
        self.len += 1;
    }

    /// Returns the number of values currently held.
    #[inline]
    pub fn count(&self) -> usize {
        self.len
    }

    /// Returns the fixed capacity.
    #[inline]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Whether nothing is stored.
    #[inline]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Whether the next append evicts the oldest value.
    #[inline]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Returns the value at logical position `index` (oldest is 0).
    ///
    /// Returns `None` outside `[0, count)`.
    pub fn get(&self, index: usize) -> Option<&T> {
        if index >= self.len {
            return None;
        }
        self.slots[(self.tail + index) % self.capacity()].as_ref()
    }

    /// Returns the most recently appended value.
    pub fn last(&self) -> Option<&T> {
        self.len.checked_sub(1).and_then(|index| self.get(index))
    }

    /// Iterates from oldest to newest over the contents at call time.
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            ring: self,
            front: 0,
            back: self.len,
        }
    }

    /// Counts held values matching `predicate`.
    pub fn count_where(&self, mut predicate: impl FnMut(&T) -> bool) -> usize {
        self.iter().filter(|value| predicate(value)).count()
    }
}

impl<T> Index<usize> for BoundedRing<T> {
    type Output = T;

    fn index(&self, index: usize) -> &T {
        match self.get(index) {
            Some(value) => value,
            None => panic!(
                "ring index out of bounds: the count is {} but the index is {}",
                self.len, index
            ),
        }
    }
}

impl<T: fmt::Debug> fmt::Debug for BoundedRing<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("BoundedRing")
            .field("capacity", &self.capacity())
            .field("count", &self.len)
            .field("values", &self.iter().collect::<Vec<_>>())
            .finish()
    }
}

/// Oldest-to-newest iterator over a [`BoundedRing`].
pub struct Iter<'a, T> {
    ring: &'a BoundedRing<T>,
    front: usize,
    back: usize,
}

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<&'a T> {
        if self.front >= self.back {
            return None;
        }
        let value = self.ring.get(self.front);
        self.front += 1;
        value
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        let remaining = self.back - self.front;
        (remaining, Some(remaining))
    }
}

impl<T> ExactSizeIterator for Iter<'_, T> {}

impl<'a, T> IntoIterator for &'a BoundedRing<T> {
    type Item = &'a T;
    type IntoIter = Iter<'a, T>;

    fn into_iter(self) -> Iter<'a, T> {
        self.iter()
    }
}
