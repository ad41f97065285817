//! A [Declaration] binds an [Identifier] to a factory producing the single instance an
//! [Environment](crate::environment::Environment) hands out for it.
//!
//! Declarations are usually created by the [Module](crate::module::Module) `put*` helpers, but can
//! also be built directly, e.g. to attach a release hook or mark a declaration as an override:
//!
//! ```
//! use trellis_di::declaration::Declaration;
//! use trellis_di::module::Module;
//!
//! struct Pool;
//!
//! impl Pool {
//!     fn close(&self) {}
//! }
//!
//! let mut module = Module::new("storage");
//! module
//!     .declare(
//!         Declaration::from_factory(|_| Ok(Pool))
//!             .with_qualifier("replica")
//!             .with_release(|pool: &Pool| {
//!                 pool.close();
//!                 Ok(())
//!             }),
//!     )
//!     .unwrap();
//! ```

use crate::identifier::{Identifier, Qualifier};
use crate::injectable::{Constructor, Injectable};
use crate::instance::{downcast, erase, AnyInstancePtr, ErrorPtr, InstancePtr, Release};
use crate::scope::InjectionScope;
use derivative::Derivative;
use std::sync::Arc;

/// Type-erased factory stored in a [Declaration].
pub type Factory =
    Arc<dyn Fn(&InjectionScope<'_>) -> Result<AnyInstancePtr, ErrorPtr> + Send + Sync>;

/// Type-erased release hook stored in a [Declaration].
pub type ReleaseHook = Arc<dyn Fn(&AnyInstancePtr) -> Result<(), ErrorPtr> + Send + Sync>;

/// Lifecycle of declared instances. Currently, only one instance per environment is supported.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum Lifecycle {
    #[default]
    Singleton,
}

/// A factory registered for an [Identifier].
#[derive(Derivative, Clone)]
#[derivative(Debug)]
pub struct Declaration {
    identifier: Identifier,
    lifecycle: Lifecycle,
    is_override: bool,
    /// Name of the module which owns this declaration. Empty until declared in a module.
    module: String,

    #[derivative(Debug = "ignore")]
    factory: Factory,

    #[derivative(Debug = "ignore")]
    release: Option<ReleaseHook>,
}

impl Declaration {
    /// Creates a declaration for `T` from a factory returning a shared pointer. This is the most
    /// general form, which also supports unsized types.
    pub fn new<T, F>(factory: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&InjectionScope<'_>) -> Result<InstancePtr<T>, ErrorPtr> + Send + Sync + 'static,
    {
        Self {
            identifier: Identifier::of::<T>(),
            lifecycle: Lifecycle::Singleton,
            is_override: false,
            module: String::new(),
            factory: Arc::new(move |scope| factory(scope).map(erase)),
            release: None,
        }
    }

    /// Creates a declaration for the type produced by given factory.
    pub fn from_factory<T, F>(factory: F) -> Self
    where
        T: Send + Sync + 'static,
        F: Fn(&InjectionScope<'_>) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        Self::new(move |scope| factory(scope).map(InstancePtr::new))
    }

    /// Creates a declaration for an [Injectable] type.
    pub fn injectable<T: Injectable>() -> Self {
        Self::from_factory(T::create)
    }

    /// Creates a declaration for the type returned by a [Constructor], with parameters resolved
    /// from the environment.
    pub fn from_constructor<Args, C>(constructor: C) -> Self
    where
        C: Constructor<Args>,
        C::Output: Send + Sync + 'static,
    {
        Self::from_factory(move |scope| constructor.construct(scope))
    }

    /// Creates a declaration for an already constructed value.
    pub fn instance<T: Send + Sync + 'static>(value: T) -> Self {
        let instance = InstancePtr::new(value);
        Self::new(move |_| Ok(instance.clone()))
    }

    /// Creates a declaration of `Alias` which shares the instance declared for `Target`. Useful for
    /// injecting `dyn Trait` types, in which case `cast` is a simple unsizing coercion.
    pub fn alias<Alias, Target>(cast: fn(InstancePtr<Target>) -> InstancePtr<Alias>) -> Self
    where
        Alias: ?Sized + Send + Sync + 'static,
        Target: ?Sized + Send + Sync + 'static,
    {
        Self::new(move |scope| Ok(cast(scope.get::<Target>()?)))
    }

    /// Same as [Declaration::alias], but shares a qualified target instance.
    pub fn named_alias<Alias, Target>(
        target_qualifier: impl Into<Qualifier>,
        cast: fn(InstancePtr<Target>) -> InstancePtr<Alias>,
    ) -> Self
    where
        Alias: ?Sized + Send + Sync + 'static,
        Target: ?Sized + Send + Sync + 'static,
    {
        let target = Identifier::of::<Target>().with_qualifier(target_qualifier);
        Self::new(move |scope| Ok(cast(scope.get_by::<Target>(&target)?)))
    }

    /// Attaches a qualifier to the declared identifier.
    pub fn with_qualifier(mut self, qualifier: impl Into<Qualifier>) -> Self {
        self.identifier = self.identifier.with_qualifier(qualifier);
        self
    }

    /// Marks this declaration as replacing an equal declaration from a previously merged module.
    pub fn overriding(mut self) -> Self {
        self.is_override = true;
        self
    }

    /// Attaches a hook called with the constructed instance on environment teardown.
    pub fn with_release<T, F>(mut self, hook: F) -> Self
    where
        T: ?Sized + Send + Sync + 'static,
        F: Fn(&T) -> Result<(), ErrorPtr> + Send + Sync + 'static,
    {
        self.release = Some(Arc::new(move |instance| match downcast::<T>(instance) {
            Some(instance) => hook(&*instance),
            None => Err(ErrorPtr::from(format!(
                "release hook expects an instance of {}",
                std::any::type_name::<T>()
            ))),
        }));
        self
    }

    /// Attaches the [Release] implementation of `T` as the release hook.
    pub fn released<T: Release + Send + Sync + 'static>(self) -> Self {
        self.with_release(T::release)
    }

    #[inline]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }

    #[inline]
    pub fn lifecycle(&self) -> Lifecycle {
        self.lifecycle
    }

    #[inline]
    pub fn is_override(&self) -> bool {
        self.is_override
    }

    #[inline]
    pub fn module(&self) -> &str {
        &self.module
    }

    #[inline]
    pub fn has_release_hook(&self) -> bool {
        self.release.is_some()
    }

    pub(crate) fn set_module(&mut self, module: &str) {
        self.module = module.to_string();
    }

    pub(crate) fn construct(&self, scope: &InjectionScope<'_>) -> Result<AnyInstancePtr, ErrorPtr> {
        (self.factory)(scope)
    }

    pub(crate) fn release(&self, instance: &AnyInstancePtr) -> Option<Result<(), ErrorPtr>> {
        self.release.as_ref().map(|hook| hook(instance))
    }
}
