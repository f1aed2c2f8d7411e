//! A closure-scoped lock shared by the `croak` engine.
//!
//! `Lock<T>` never hands out a guard; the only way in is
//! a closure passed to [`Lock::read`] or [`Lock::write`].
//! That keeps every critical section lexically obvious and
//! makes it impossible to hold the lock across socket IO.

// x-release-please-start-version
#![doc(html_root_url = "https://docs.rs/croak-lock/0.1.0")]
// x-release-please-end
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

use core::ops::{Deref, DerefMut};

#[cfg(feature = "std")]
type Inner<T> = std::sync::RwLock<T>;

#[cfg(not(feature = "std"))]
type Inner<T> = core::cell::RefCell<T>;

/// A mutable memory location that allows many
/// concurrent readers or a single writer.
///
/// Backed by [`std::sync::RwLock`] when feature `std`
/// is enabled, and by [`core::cell::RefCell`] otherwise.
///
/// ```
/// use croak_lock::Lock;
///
/// let queue = Lock::new(Vec::<u16>::new());
/// queue.write(|q| q.push(12));
/// assert_eq!(queue.read(|q| q.len()), 1);
/// ```
#[derive(Debug, Default)]
pub struct Lock<T>(Inner<T>);

impl<T> Lock<T> {
  /// Create a new lock
  pub const fn new(t: T) -> Self {
    Self(Inner::new(t))
  }

  /// Run `f` with shared access to `T`
  ///
  /// # Blocks
  /// When feature `std` enabled, this
  /// will block while a call to [`Lock::write`] is running.
  ///
  /// # Panics
  /// When feature `std` disabled, this will panic
  /// if invoked from within [`Lock::write`].
  pub fn read<F, R>(&self, f: F) -> R
    where F: for<'a> FnOnce(&'a T) -> R
  {
    self.0.read_with(f)
  }

  /// Run `f` with exclusive access to `T`
  ///
  /// # Blocks
  /// When feature `std` enabled, this will block until
  /// all running calls to [`Lock::read`] have returned.
  ///
  /// # Panics
  /// When feature `std` disabled, this will panic if
  /// invoked from within [`Lock::read`] or [`Lock::write`].
  pub fn write<F, R>(&self, f: F) -> R
    where F: for<'a> FnOnce(&'a mut T) -> R
  {
    self.0.write_with(f)
  }
}

/// The runtime-specific memory location behind [`Lock`].
pub trait LockBehavior<T> {
  /// Create an instance of `Self`
  fn new(t: T) -> Self
    where Self: Sized;

  /// Run `f` with a shared reference to the `T` in `Self`
  fn read_with<F, R>(&self, f: F) -> R
    where F: for<'a> FnOnce(&'a T) -> R;

  /// Run `f` with an exclusive reference to the `T` in `Self`
  fn write_with<F, R>(&self, f: F) -> R
    where F: for<'a> FnOnce(&'a mut T) -> R;
}

// A writer that panicked part way leaves the data as-is;
// every structure behind a `Lock` in croak re-checks its own
// invariants, so a poisoned lock is still usable.
#[cfg(feature = "std")]
impl<T> LockBehavior<T> for std::sync::RwLock<T> {
  fn new(t: T) -> Self {
    Self::new(t)
  }

  fn read_with<F, R>(&self, f: F) -> R
    where F: for<'a> FnOnce(&'a T) -> R
  {
    let guard = self.read().unwrap_or_else(std::sync::PoisonError::into_inner);
    f(guard.deref())
  }

  fn write_with<F, R>(&self, f: F) -> R
    where F: for<'a> FnOnce(&'a mut T) -> R
  {
    let mut guard = self.write()
                        .unwrap_or_else(std::sync::PoisonError::into_inner);
    f(guard.deref_mut())
  }
}

impl<T> LockBehavior<T> for core::cell::RefCell<T> {
  fn new(t: T) -> Self {
    Self::new(t)
  }

  fn read_with<F, R>(&self, f: F) -> R
    where F: for<'a> FnOnce(&'a T) -> R
  {
    f(self.borrow().deref())
  }

  fn write_with<F, R>(&self, f: F) -> R
    where F: for<'a> FnOnce(&'a mut T) -> R
  {
    f(self.borrow_mut().deref_mut())
  }
}
