//! Parallel regions with first-error-wins propagation.
//!
//! Neither `for_each` nor `invoke` yield control voluntarily mid-iteration;
//! suspension only happens at the region boundary (`wait`/the end of the
//! closure), matching spec.md §5's suspension-point guarantee. If any
//! worker raises an [`Error`], the region still drains to completion (every
//! item is visited) and the *first* captured error is rethrown on the
//! coordinator once the region returns.

use crate::error::Error;
use parking_lot::Mutex;
use rayon::prelude::*;

/// A single-slot "first error wins" capture point for a parallel region.
struct ErrorSlot(Mutex<Option<Error>>);

impl ErrorSlot {
    fn new() -> Self {
        Self(Mutex::new(None))
    }

    fn capture(&self, err: Error) {
        let mut slot = self.0.lock();
        if slot.is_none() {
            *slot = Some(err);
        }
    }

    fn into_inner(self) -> Option<Error> {
        self.0.into_inner()
    }
}

/// Run `f` over every item of `items` in parallel. The region always drains
/// to completion; if any call returned `Err`, the first such error (in
/// whatever order workers happened to raise it) is returned after all items
/// have been visited.
pub fn for_each<T, F>(items: &[T], f: F) -> Result<(), Error>
where
    T: Sync,
    F: Fn(&T) -> Result<(), Error> + Sync,
{
    let errors = ErrorSlot::new();
    items.par_iter().for_each(|item| {
        if let Err(e) = f(item) {
            errors.capture(e);
        }
    });
    match errors.into_inner() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

/// Run two closures in parallel (or sequentially, at the scheduler's
/// discretion), joining before returning.
pub fn invoke<RA, RB, A, B>(a: A, b: B) -> (RA, RB)
where
    A: FnOnce() -> RA + Send,
    B: FnOnce() -> RB + Send,
    RA: Send,
    RB: Send,
{
    rayon::join(a, b)
}

/// A scoped task group: spawn fallible tasks, then wait for all of them.
/// Matches "task group `wait`" in spec.md §5's suspension-point list.
pub struct TaskGroup<'scope, 'env> {
    scope: &'scope rayon::Scope<'env>,
    errors: &'env ErrorSlot,
}

impl<'scope, 'env> TaskGroup<'scope, 'env> {
    pub fn spawn<F>(&self, f: F)
    where
        F: FnOnce() -> Result<(), Error> + Send + 'scope,
    {
        let errors = self.errors;
        self.scope.spawn(move |_| {
            if let Err(e) = f() {
                errors.capture(e);
            }
        });
    }
}

/// Run `body`, which may spawn tasks onto the provided [`TaskGroup`]; wait
/// for all spawned tasks, then rethrow the first captured error, if any.
pub fn with_task_group<F>(body: F) -> Result<(), Error>
where
    F: for<'scope, 'env> FnOnce(&TaskGroup<'scope, 'env>),
{
    let errors = ErrorSlot::new();
    // Extend the ErrorSlot's lifetime to 'env via a scope-local binding:
    // rayon::scope's `'env` borrow covers `errors` for the scope's duration.
    rayon::scope(|scope| {
        let group = TaskGroup {
            scope,
            errors: &errors,
        };
        body(&group);
    });
    match errors.into_inner() {
        Some(e) => Err(e),
        None => Ok(()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn for_each_drains_and_returns_first_error() {
        let items: std::vec::Vec<i32> = (0..100).collect();
        let result = for_each(&items, |&i| {
            if i == 50 || i == 70 {
                Err(Error::new(ErrorKind::SimulationDiverged(format!("{i}"))))
            } else {
                Ok(())
            }
        });
        assert!(result.is_err());
    }

    #[test]
    fn for_each_succeeds_when_nothing_fails() {
        let items: std::vec::Vec<i32> = (0..100).collect();
        let result = for_each(&items, |_| Ok(()));
        assert!(result.is_ok());
    }

    #[test]
    fn task_group_collects_first_error() {
        let result = with_task_group(|group| {
            group.spawn(|| Ok(()));
            group.spawn(|| Err(Error::new(ErrorKind::TruncatedStream)));
        });
        assert!(result.is_err());
    }
}
