use std::sync::{Arc, OnceLock, Weak};

use filekit_base::{ErrorKind, FilekitError, FilekitResult};

/// One-time back-reference from a delegation base to the backend embedding it.
///
/// The reference is weak: the backend owns its base, not the other way round.
pub(crate) struct BackReference<T: ?Sized>(OnceLock<Weak<T>>);

impl<T: ?Sized> BackReference<T> {
    pub(crate) fn unbound() -> Self {
        Self(OnceLock::new())
    }

    pub(crate) fn bound(target: Weak<T>) -> Self {
        let reference = Self::unbound();
        // A fresh OnceLock always accepts its first value.
        let _ = reference.0.set(target);
        reference
    }

    pub(crate) fn bind(&self, target: Weak<T>) -> FilekitResult<()> {
        self.0
            .set(target)
            .map_err(|_| filekit_base::err!("Parent is already set"))
    }

    pub(crate) fn is_bound(&self) -> bool {
        self.0.get().is_some()
    }

    /// The backend, or `ParentNotSet` if unbound or already dropped.
    pub(crate) fn get(&self) -> FilekitResult<Arc<T>> {
        self.0
            .get()
            .and_then(Weak::upgrade)
            .ok_or_else(|| Box::new(FilekitError::new(ErrorKind::ParentNotSet)))
    }
}
