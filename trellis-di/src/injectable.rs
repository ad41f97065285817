//! Builder-time inference of declarations from types.
//!
//! Instead of writing factories by hand, the identifier and the factory of a declaration can be
//! derived from the type being declared. There are two ways of doing that.
//!
//! ## Injectable types
//!
//! Types implementing [Injectable] know how to build themselves from an
//! [InjectionScope]. The trait can be derived when the `derive` feature is enabled; each field is
//! then resolved based on its type (see [FromScope]):
//!
//! ```
//! use trellis_di::environment::Environment;
//! use trellis_di::instance::InstancePtr;
//! use trellis_di::module::Module;
//! use trellis_di::scope::Lazy;
//! use trellis_di::Injectable;
//!
//! #[derive(Injectable)]
//! struct Repository;
//!
//! #[derive(Injectable)]
//! struct Service {
//!     // resolved eagerly when Service is constructed
//!     repository: InstancePtr<Repository>,
//!     // resolved on first use
//!     audit: Lazy<Repository>,
//!     // resolved as a qualified identifier
//!     #[inject(name = "replica")]
//!     replica: Option<InstancePtr<Repository>>,
//!     // not injected
//!     #[inject(default)]
//!     retries: u8,
//! }
//!
//! let module = Module::define("app", |module| {
//!     module.put::<Repository>()?.put::<Service>()?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let environment = Environment::seal([module]).unwrap();
//! let service = environment.resolve::<Service>().unwrap();
//! assert!(service.replica.is_none());
//! ```
//!
//! ### Supported `#[inject]` field configuration
//!
//! * `default` - use `Default::default()` initialization
//! * `default = "expr"` - call `expr()` for initialization
//! * `name = "name"` - resolve the identifier qualified with `name`
//!
//! ## Constructors
//!
//! Any function or closure whose parameters implement [FromScope] is a [Constructor]. The
//! declared identifier is the constructor's return type:
//!
//! ```
//! use trellis_di::environment::Environment;
//! use trellis_di::instance::InstancePtr;
//! use trellis_di::module::Module;
//!
//! struct Repository;
//!
//! struct Service {
//!     repository: InstancePtr<Repository>,
//! }
//!
//! impl Service {
//!     fn new(repository: InstancePtr<Repository>) -> Self {
//!         Self { repository }
//!     }
//! }
//!
//! let module = Module::define("app", |module| {
//!     module
//!         .put_constructor(|| Repository)?
//!         .put_constructor(Service::new)?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let environment = Environment::seal([module]).unwrap();
//! assert!(environment.resolve::<Service>().is_ok());
//! ```

use crate::error::ResolutionError;
use crate::identifier::Identifier;
use crate::instance::{ErrorPtr, InstancePtr};
use crate::scope::{InjectionScope, Lazy};

/// Types which can construct themselves using dependencies from an [InjectionScope].
pub trait Injectable: Send + Sync + Sized + 'static {
    /// Creates an instance of this type. Called at most once per environment.
    fn create(scope: &InjectionScope<'_>) -> Result<Self, ErrorPtr>;
}

/// Values which can be obtained from an [InjectionScope] based on their type alone.
///
/// * `InstancePtr<T>` - the instance of `T`; fails when not declared
/// * `Option<InstancePtr<T>>` - the instance of `T`, if declared
/// * `Vec<InstancePtr<T>>` - all instances of `T`, regardless of qualifier
/// * `Lazy<T>` - a deferred accessor for `T`
pub trait FromScope: Sized {
    fn from_scope(scope: &InjectionScope<'_>) -> Result<Self, ResolutionError>;

    /// Same as [FromScope::from_scope], but for an identifier qualified with `qualifier`.
    fn from_scope_named(
        scope: &InjectionScope<'_>,
        qualifier: &'static str,
    ) -> Result<Self, ResolutionError>;
}

impl<T: ?Sized + Send + Sync + 'static> FromScope for InstancePtr<T> {
    #[inline]
    fn from_scope(scope: &InjectionScope<'_>) -> Result<Self, ResolutionError> {
        scope.get::<T>()
    }

    #[inline]
    fn from_scope_named(
        scope: &InjectionScope<'_>,
        qualifier: &'static str,
    ) -> Result<Self, ResolutionError> {
        scope.get_named::<T>(qualifier)
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromScope for Option<InstancePtr<T>> {
    #[inline]
    fn from_scope(scope: &InjectionScope<'_>) -> Result<Self, ResolutionError> {
        scope.get_optional::<T>()
    }

    #[inline]
    fn from_scope_named(
        scope: &InjectionScope<'_>,
        qualifier: &'static str,
    ) -> Result<Self, ResolutionError> {
        scope.get_optional_by::<T>(&Identifier::named::<T>(qualifier))
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromScope for Vec<InstancePtr<T>> {
    #[inline]
    fn from_scope(scope: &InjectionScope<'_>) -> Result<Self, ResolutionError> {
        scope.get_all::<T>()
    }

    fn from_scope_named(
        scope: &InjectionScope<'_>,
        qualifier: &'static str,
    ) -> Result<Self, ResolutionError> {
        Ok(scope
            .get_optional_by::<T>(&Identifier::named::<T>(qualifier))?
            .into_iter()
            .collect())
    }
}

impl<T: ?Sized + Send + Sync + 'static> FromScope for Lazy<T> {
    #[inline]
    fn from_scope(scope: &InjectionScope<'_>) -> Result<Self, ResolutionError> {
        Ok(scope.lazy::<T>())
    }

    #[inline]
    fn from_scope_named(
        scope: &InjectionScope<'_>,
        qualifier: &'static str,
    ) -> Result<Self, ResolutionError> {
        Ok(scope.lazy_named::<T>(qualifier))
    }
}

/// Functions constructing a value from parameters obtained via [FromScope].
pub trait Constructor<Args>: Send + Sync + 'static {
    type Output;

    fn construct(&self, scope: &InjectionScope<'_>) -> Result<Self::Output, ErrorPtr>;
}

macro_rules! impl_constructor {
    ($($arg:ident),*) => {
        impl<Func, Out, $($arg,)*> Constructor<($($arg,)*)> for Func
        where
            Func: Fn($($arg),*) -> Out + Send + Sync + 'static,
            $($arg: FromScope,)*
        {
            type Output = Out;

            #[allow(unused_variables)]
            fn construct(&self, scope: &InjectionScope<'_>) -> Result<Out, ErrorPtr> {
                Ok((self)($($arg::from_scope(scope)?),*))
            }
        }
    };
}

impl_constructor!();
impl_constructor!(A1);
impl_constructor!(A1, A2);
impl_constructor!(A1, A2, A3);
impl_constructor!(A1, A2, A3, A4);
impl_constructor!(A1, A2, A3, A4, A5);
impl_constructor!(A1, A2, A3, A4, A5, A6);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7);
impl_constructor!(A1, A2, A3, A4, A5, A6, A7, A8);
