//! Synchronization utilities for robust mutex handling

use std::sync::LockResult;

/// Convert a poisoned-lock failure into an application error.
///
/// A poisoned mutex means a panic happened while the lock was held; rather
/// than propagating the panic, callers map it into their own error type and
/// keep composing results.
///
/// # Examples
/// ```
/// use std::sync::Mutex;
/// use agentq::core::sync::handle_mutex_poison;
/// use agentq::queue::QueueError;
///
/// let mutex = Mutex::new(7);
/// let guard = handle_mutex_poison(
///     mutex.lock(),
///     |message| QueueError::Internal { message }
/// ).unwrap();
/// assert_eq!(*guard, 7);
/// ```
pub fn handle_mutex_poison<T, E>(
    result: LockResult<T>,
    error_constructor: impl FnOnce(String) -> E,
) -> Result<T, E> {
    result.map_err(|poison_err| {
        error_constructor(format!(
            "lock poisoned by a panic while held: {:?}",
            poison_err
        ))
    })
}
