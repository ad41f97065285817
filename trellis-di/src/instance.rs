//! Pointer types for instances managed by an [Environment](crate::environment::Environment).

#[cfg(test)]
use mockall::automock;
use std::any::Any;
use std::error::Error;
use std::sync::Arc;

/// Shared pointer to an instance. All resolutions of a given identifier return clones of the same
/// pointer.
pub type InstancePtr<T> = Arc<T>;

/// Type-erased instance, as stored in the environment cache. The pointee is always an
/// [InstancePtr] of the declared type, which makes it possible to store unsized types like
/// `dyn Trait`.
pub type AnyInstancePtr = Arc<dyn Any + Send + Sync>;

/// Error returned by factories and release hooks.
pub type ErrorPtr = Box<dyn Error + Send + Sync>;

/// Instances holding resources which should be released explicitly when the owning environment is
/// torn down. Release happens in reverse construction order.
#[cfg_attr(test, automock)]
pub trait Release {
    fn release(&self) -> Result<(), ErrorPtr>;
}

pub(crate) fn erase<T: ?Sized + Send + Sync + 'static>(instance: InstancePtr<T>) -> AnyInstancePtr {
    Arc::new(instance) as AnyInstancePtr
}

pub(crate) fn downcast<T: ?Sized + Send + Sync + 'static>(
    instance: &AnyInstancePtr,
) -> Option<InstancePtr<T>> {
    instance.downcast_ref::<InstancePtr<T>>().cloned()
}
