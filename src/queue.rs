//! An identity-keyed, fixed-capacity FIFO queue with O(1) removal from any
//! position.
//!
//! See the documentation for the [`IdQueue`] type for details.

use crate::{util::fmt, Error, Keyed, PushError, MAX_CAPACITY};
use alloc::boxed::Box;
use core::mem;

/// An identity-keyed, fixed-capacity FIFO queue with O(1) removal from any
/// position.
///
/// The queue is a doubly-linked list threaded through a fixed array of
/// slots, one slot per possible [identity key](Keyed). An element's key is
/// its index into the slot array, so locating the slot for a given key needs
/// no search, and splicing an element out of the middle of the FIFO order is
/// a constant-time pointer fix-up. The slot array is allocated once by
/// [`new`](Self::new); no operation allocates.
///
/// At most one element per key may be enqueued at a time, so the queue also
/// acts as a set keyed by identity: pushing a key that is already linked
/// fails with [`Duplicate`](PushError::Duplicate), without disturbing the
/// enqueued element.
///
/// Among currently-linked elements, ordering is strict FIFO by insertion
/// time. Removing an interior element does not reorder the remainder, and
/// re-pushing a previously removed key links it at the tail, after all
/// currently-linked elements, regardless of its original position.
///
/// `IdQueue` performs no synchronization and is a single-threaded structure;
/// wrap it in [`blocking::IdQueue`](crate::blocking::IdQueue) for
/// cross-thread use.
pub struct IdQueue<T> {
    /// One slot per key in `0..capacity`.
    slots: Box<[Slot<T>]>,

    /// The key of the logically first linked slot, or `None` when empty.
    head: Option<u16>,

    /// The key of the logically last linked slot, or `None` when empty.
    tail: Option<u16>,

    /// The number of occupied slots.
    len: usize,
}

struct Slot<T> {
    links: Links,
    /// `Some` iff this slot is linked into the queue.
    value: Option<T>,
}

/// Neighbor links for one slot.
///
/// `None` means "no link"; it is a distinct state rather than a reserved
/// index value, so every key in `0..MAX_CAPACITY` remains usable.
#[derive(Copy, Clone, Default)]
struct Links {
    prev: Option<u16>,
    next: Option<u16>,
}

/// A borrowing iterator over the elements of an [`IdQueue`], in FIFO order.
pub struct Iter<'a, T> {
    queue: &'a IdQueue<T>,
    next: Option<u16>,
}

// === impl IdQueue ===

impl<T: Keyed> IdQueue<T> {
    /// Returns a new `IdQueue` that can hold elements with keys in
    /// `0..capacity`.
    ///
    /// This is the only operation that allocates: the queue's slot array is
    /// sized here and never changes.
    ///
    /// # Panics
    ///
    /// If `capacity` exceeds [`MAX_CAPACITY`].
    #[must_use]
    pub fn new(capacity: usize) -> Self {
        assert!(
            capacity <= MAX_CAPACITY,
            "capacity ({capacity}) may not exceed MAX_CAPACITY ({MAX_CAPACITY})",
        );
        Self {
            slots: (0..capacity).map(|_| Slot::vacant()).collect(),
            head: None,
            tail: None,
            len: 0,
        }
    }

    /// Links `value` at the tail of the queue.
    ///
    /// The element's [key](Keyed::key) is read once, here, and used as its
    /// slot index for as long as it remains enqueued.
    ///
    /// # Errors
    ///
    /// The rejected element is handed back inside the error.
    ///
    /// - [`PushError::InvalidKey`] if `value.key() >= self.capacity()`.
    /// - [`PushError::Duplicate`] if an element with the same key is already
    ///   enqueued. This takes precedence over `Full`: pushing a duplicate
    ///   into a full queue reports `Duplicate`.
    /// - [`PushError::Full`] if the queue is at capacity.
    pub fn push(&mut self, value: T) -> Result<(), PushError<T>> {
        let key = value.key();
        if key as usize >= self.capacity() {
            return Err(PushError::InvalidKey(value));
        }
        if self.slots[key as usize].value.is_some() {
            return Err(PushError::Duplicate(value));
        }
        // Unreachable when every key is vacant, since the key space and the
        // slot array are the same size, but it keeps the `Full` contract
        // honest if that ever changes.
        if self.len == self.capacity() {
            return Err(PushError::Full(value));
        }

        test_trace!(key, len = self.len, "IdQueue::push");
        self.slots[key as usize].value = Some(value);
        self.link_tail(key);
        self.len += 1;
        Ok(())
    }

    /// Borrows the element at the head of the queue, without removing it.
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if the queue contains no elements.
    pub fn front(&self) -> Result<&T, Error> {
        let key = self.head.ok_or(Error::Empty)?;
        Ok(self.occupant(key))
    }

    /// Unlinks and returns the element at the head of the queue.
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if the queue contains no elements.
    pub fn pop(&mut self) -> Result<T, Error> {
        let key = self.head.ok_or(Error::Empty)?;
        test_trace!(key, len = self.len, "IdQueue::pop");
        Ok(self.unlink(key))
    }

    /// Unlinks and returns the element with the given key, from any position
    /// in the queue.
    ///
    /// This is a constant-time operation: the key is the element's slot
    /// index, so no search is performed. The neighbors of the removed
    /// element are reconnected, preserving the FIFO order of the remainder.
    ///
    /// # Errors
    ///
    /// - [`Error::Empty`] if the queue contains no elements.
    /// - [`Error::InvalidKey`] if `key >= self.capacity()`.
    /// - [`Error::NotFound`] if the key is in range but not enqueued.
    pub fn remove(&mut self, key: u16) -> Result<T, Error> {
        if self.is_empty() {
            return Err(Error::Empty);
        }
        if key as usize >= self.capacity() {
            return Err(Error::InvalidKey);
        }
        if self.slots[key as usize].value.is_none() {
            return Err(Error::NotFound);
        }

        test_trace!(key, len = self.len, "IdQueue::remove");
        Ok(self.unlink(key))
    }

    /// Returns the number of elements currently enqueued.
    #[must_use]
    pub fn len(&self) -> usize {
        self.len
    }

    /// Returns `true` if the queue contains no elements.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len == 0
    }

    /// Returns `true` if the queue is at capacity.
    #[must_use]
    pub fn is_full(&self) -> bool {
        self.len == self.capacity()
    }

    /// Returns the number of distinct keys this queue supports.
    ///
    /// Keys in `0..capacity` are valid for this queue.
    #[must_use]
    pub fn capacity(&self) -> usize {
        self.slots.len()
    }

    /// Returns an iterator borrowing the enqueued elements in FIFO order.
    #[must_use]
    pub fn iter(&self) -> Iter<'_, T> {
        Iter {
            queue: self,
            next: self.head,
        }
    }

    /// Links the (already occupied) slot for `key` at the tail.
    fn link_tail(&mut self, key: u16) {
        self.slots[key as usize].links = Links {
            prev: self.tail,
            next: None,
        };
        match self.tail.replace(key) {
            Some(tail) => self.slots[tail as usize].links.next = Some(key),
            // The queue was empty; this slot is also the new head.
            None => self.head = Some(key),
        }
    }

    /// Splices the slot for `key` out of the chain and returns its occupant.
    ///
    /// The slot must be occupied.
    fn unlink(&mut self, key: u16) -> T {
        let Links { prev, next } = mem::take(&mut self.slots[key as usize].links);
        match prev {
            Some(prev) => self.slots[prev as usize].links.next = next,
            None => self.head = next,
        }
        match next {
            Some(next) => self.slots[next as usize].links.prev = prev,
            None => self.tail = prev,
        }
        self.len -= 1;
        self.slots[key as usize]
            .value
            .take()
            .expect("unlinked a vacant slot; this is a bug")
    }

    /// Borrows the occupant of the slot for `key`, which must be occupied.
    fn occupant(&self, key: u16) -> &T {
        self.slots[key as usize]
            .value
            .as_ref()
            .expect("a linked slot must be occupied; this is a bug")
    }

    /// Asserts that the queue's chain invariants hold.
    #[cfg(test)]
    pub(crate) fn assert_valid(&self) {
        let mut walked = 0;
        let mut prev = None;
        let mut cursor = self.head;
        while let Some(key) = cursor {
            let slot = &self.slots[key as usize];
            assert!(
                slot.value.is_some(),
                "linked slot {key} is vacant (walked {walked} of {})",
                self.len,
            );
            assert_eq!(
                slot.links.prev, prev,
                "slot {key}'s prev link does not match its predecessor",
            );
            walked += 1;
            assert!(
                walked <= self.len,
                "walked more slots than len ({}); cycle?",
                self.len,
            );
            prev = cursor;
            cursor = slot.links.next;
        }
        assert_eq!(walked, self.len, "chain length does not match len");
        assert_eq!(self.tail, prev, "tail does not match the last linked slot");
        let occupied = self.slots.iter().filter(|s| s.value.is_some()).count();
        assert_eq!(occupied, self.len, "occupied slots do not match len");
    }
}

impl<T> fmt::Debug for IdQueue<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("IdQueue")
            .field("len", &self.len)
            .field("capacity", &self.slots.len())
            .field("head", &fmt::opt(&self.head).or_else("None"))
            .field("tail", &fmt::opt(&self.tail).or_else("None"))
            .finish()
    }
}

// === impl Slot ===

impl<T> Slot<T> {
    const fn vacant() -> Self {
        Self {
            links: Links {
                prev: None,
                next: None,
            },
            value: None,
        }
    }
}

// === impl Iter ===

impl<'a, T> Iterator for Iter<'a, T> {
    type Item = &'a T;

    fn next(&mut self) -> Option<Self::Item> {
        let key = self.next.take()?;
        let slot = &self.queue.slots[key as usize];
        self.next = slot.links.next;
        slot.value.as_ref()
    }
}

impl<T> fmt::Debug for Iter<'_, T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Iter")
            .field("next", &fmt::opt(&self.next).or_else("None"))
            .finish()
    }
}

#[cfg(test)]
pub(crate) mod test_util {
    use crate::Keyed;

    #[derive(Debug, Clone, PartialEq, Eq)]
    pub(crate) struct Entry {
        pub(crate) id: u16,
    }

    impl Entry {
        pub(crate) fn new(id: u16) -> Self {
            Self { id }
        }
    }

    impl Keyed for Entry {
        fn key(&self) -> u16 {
            self.id
        }
    }
}
