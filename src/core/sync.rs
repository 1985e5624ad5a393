//! Poison handling for the coordinator's std locks
//!
//! A poisoned lock means some thread panicked halfway through a venue or
//! account mutation. Callers turn that into an error value (normally
//! `QueueError::internal`) so one bad request cannot take the daemon down.

use std::fmt;
use std::sync::{LockResult, MutexGuard, RwLockReadGuard, RwLockWriteGuard};

fn poisoned<E>(kind: &str, err: impl fmt::Display, make_error: impl FnOnce(String) -> E) -> E {
    make_error(format!("{kind} poisoned by an earlier panic ({err})"))
}

/// Lock a mutex, mapping poison to an application error
///
/// ```
/// use std::sync::Mutex;
/// use waitline::core::sync::handle_mutex_poison;
/// use waitline::queue::api::QueueError;
///
/// let accounts = Mutex::new(Vec::<String>::new());
/// let guard = handle_mutex_poison(accounts.lock(), |message| QueueError::Internal { message });
/// assert!(guard.is_ok());
/// ```
pub fn handle_mutex_poison<'a, T, E>(
    result: LockResult<MutexGuard<'a, T>>,
    make_error: impl FnOnce(String) -> E,
) -> Result<MutexGuard<'a, T>, E> {
    result.map_err(|err| poisoned("mutex", err, make_error))
}

pub fn handle_rwlock_read<'a, T, E>(
    result: LockResult<RwLockReadGuard<'a, T>>,
    make_error: impl FnOnce(String) -> E,
) -> Result<RwLockReadGuard<'a, T>, E> {
    result.map_err(|err| poisoned("rwlock", err, make_error))
}

pub fn handle_rwlock_write<'a, T, E>(
    result: LockResult<RwLockWriteGuard<'a, T>>,
    make_error: impl FnOnce(String) -> E,
) -> Result<RwLockWriteGuard<'a, T>, E> {
    result.map_err(|err| poisoned("rwlock", err, make_error))
}
