//! Fixed-capacity, identity-keyed FIFO queues.
//!
//! This crate provides queues for elements that carry a small integer
//! *identity key*, with three properties that ordinary ring buffers don't
//! have:
//!
//! - **No duplicates**: at most one element per key may be enqueued at a
//!   time. Pushing a second element with the same key fails with
//!   [`Error::Duplicate`].
//! - **O(1) removal from any position**: because the key *is* the index into
//!   the queue's slot array, an element can be spliced out of the middle of
//!   the FIFO order in constant time, with no search.
//! - **No allocation after construction**: the slot array is allocated once
//!   by [`IdQueue::new`] and never grows or shrinks.
//!
//! Two layers are provided:
//!
//! - [`IdQueue`] is the synchronization-free core. It is a doubly-linked
//!   list threaded through a fixed array of slots, one slot per key. It is
//!   *not* safe for concurrent use; in multi-threaded contexts it must be
//!   reached through the blocking façade.
//! - [`blocking::IdQueue`] wraps the core in a [`Monitor`] — an injected
//!   mutual-exclusion lock paired with a wait/notify signal — adding
//!   cross-thread safety and a blocking [`pop`] with optional timeout.
//!
//! # Examples
//!
//! ```
//! use amanita::{IdQueue, Keyed};
//!
//! struct Job {
//!     id: u16,
//! }
//!
//! impl Keyed for Job {
//!     fn key(&self) -> u16 {
//!         self.id
//!     }
//! }
//!
//! let mut queue = IdQueue::new(8);
//! queue.push(Job { id: 3 }).unwrap();
//! queue.push(Job { id: 1 }).unwrap();
//!
//! // FIFO order, not key order:
//! assert_eq!(queue.pop().unwrap().id, 3);
//! assert_eq!(queue.pop().unwrap().id, 1);
//! ```
//!
//! # Features
//!
//! - `alloc`: enables the [`IdQueue`] core, which allocates its slot array at
//!   construction.
//! - `std` (default, implies `alloc`): enables the [`blocking`] module,
//!   which is built on [`std::sync::Mutex`] and [`std::sync::Condvar`].
//!
//! [`Monitor`]: blocking::Monitor
//! [`pop`]: blocking::IdQueue::pop
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg, doc_cfg_hide))]
#![cfg_attr(not(any(feature = "std", test)), no_std)]
#![warn(missing_docs, missing_debug_implementations)]

#[cfg(feature = "alloc")]
extern crate alloc;
#[cfg(test)]
extern crate std;

#[macro_use]
pub(crate) mod util;

feature! {
    #![feature = "alloc"]
    pub mod queue;

    #[doc(inline)]
    pub use self::queue::IdQueue;
}

feature! {
    #![feature = "std"]
    pub mod blocking;
}

use core::fmt;

/// The greatest capacity an [`IdQueue`] may be constructed with.
///
/// Keys are `u16`s and slot links are stored as `Option<u16>`, so a queue can
/// address at most 2¹⁶ distinct identities. There is no reserved sentinel
/// index: the "no link" state is encoded as [`None`], which can never collide
/// with a valid key.
pub const MAX_CAPACITY: usize = (u16::MAX as usize) + 1;

/// Trait implemented by types that can be stored in an identity-keyed queue.
///
/// A `Keyed` type exposes a stable integer *identity key*. The key is used
/// directly as the element's index into the queue's slot array, which is what
/// makes O(1) removal by key possible.
///
/// # Contract
///
/// [`key`] must return the same value every time it is called on the same
/// element, at least for as long as that element is enqueued. The queue reads
/// the key exactly once, at push time; an element whose key changes while
/// enqueued will be returned by [`pop`] in its original position, but a
/// subsequent [`remove`] with the *new* key will not find it.
///
/// A key is valid for a particular queue when it is less than that queue's
/// [`capacity`]. Elements with out-of-range keys are rejected with
/// [`Error::InvalidKey`].
///
/// [`key`]: Keyed::key
/// [`pop`]: IdQueue::pop
/// [`remove`]: IdQueue::remove
/// [`capacity`]: IdQueue::capacity
pub trait Keyed {
    /// Returns this element's identity key.
    fn key(&self) -> u16;
}

/// Errors returned by queue operations.
///
/// This is the closed set of outcomes shared by every operation in this
/// crate. Operations that can reject a pushed element return the richer
/// [`PushError`], which also hands the element back; [`PushError::kind`]
/// maps it into this taxonomy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, thiserror::Error)]
pub enum Error {
    /// The queue is at capacity.
    #[error("queue is full")]
    Full,

    /// The queue contains no elements.
    #[error("queue is empty")]
    Empty,

    /// An element with the same key is already enqueued.
    #[error("an element with this key is already enqueued")]
    Duplicate,

    /// The key is in range, but no element with it is enqueued.
    #[error("no element with this key is enqueued")]
    NotFound,

    /// The key is outside the queue's key space (`0..capacity`).
    #[error("key is outside the queue's key space")]
    InvalidKey,

    /// A bounded blocking wait elapsed before an element arrived.
    #[error("timed out waiting for an element")]
    TimedOut,
}

/// Error returned by [`IdQueue::push`] and [`blocking::IdQueue::push`].
///
/// Pushing takes ownership of the element; when the push is rejected, the
/// element is handed back inside the error so the caller can recover it with
/// [`into_inner`](PushError::into_inner).
pub enum PushError<T> {
    /// The queue was at capacity.
    Full(T),

    /// An element with the same key was already enqueued.
    Duplicate(T),

    /// The element's key was outside the queue's key space.
    InvalidKey(T),
}

// === impl PushError ===

impl<T> PushError<T> {
    /// Returns the rejected element.
    pub fn into_inner(self) -> T {
        match self {
            Self::Full(value) | Self::Duplicate(value) | Self::InvalidKey(value) => value,
        }
    }

    /// Returns the [`Error`] taxonomy entry corresponding to this error.
    pub fn kind(&self) -> Error {
        match self {
            Self::Full(_) => Error::Full,
            Self::Duplicate(_) => Error::Duplicate,
            Self::InvalidKey(_) => Error::InvalidKey,
        }
    }
}

impl<T> From<PushError<T>> for Error {
    fn from(error: PushError<T>) -> Self {
        error.kind()
    }
}

// Manual impls so that `PushError<T>` is `Debug` and `Error` without
// requiring `T: Debug`; the rejected element itself is rarely printable.
impl<T> fmt::Debug for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let variant = match self {
            Self::Full(_) => "Full",
            Self::Duplicate(_) => "Duplicate",
            Self::InvalidKey(_) => "InvalidKey",
        };
        f.debug_tuple(variant).field(&format_args!("..")).finish()
    }
}

impl<T> fmt::Display for PushError<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.kind(), f)
    }
}

impl<T> core::error::Error for PushError<T> {}
