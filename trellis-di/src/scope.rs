//! An [InjectionScope] is handed to a factory whenever a declared instance is being constructed.
//! It gives the factory access to other declarations of the same
//! [Environment](crate::environment::Environment), either immediately with
//! [get](InjectionScope::get), or deferred with [lazy](InjectionScope::lazy).
//!
//! Immediate resolution of an identifier which is currently being constructed on the same thread
//! is a dependency cycle and results in an error. Components which depend on each other should
//! store [Lazy] accessors and call them only after construction:
//!
//! ```
//! use trellis_di::environment::Environment;
//! use trellis_di::module::Module;
//! use trellis_di::scope::Lazy;
//!
//! struct Ping {
//!     pong: Lazy<Pong>,
//! }
//!
//! struct Pong {
//!     ping: Lazy<Ping>,
//! }
//!
//! let module = Module::define("game", |module| {
//!     module
//!         .put_factory(|scope| Ok(Ping { pong: scope.lazy() }))?
//!         .put_factory(|scope| Ok(Pong { ping: scope.lazy() }))?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let environment = Environment::seal([module]).unwrap();
//! let ping = environment.resolve::<Ping>().unwrap();
//! let pong = ping.pong.get().unwrap();
//! assert!(std::sync::Arc::ptr_eq(&pong.ping.get().unwrap(), &ping));
//! ```

use crate::environment::{Environment, WeakEnvironment};
use crate::error::ResolutionError;
use crate::identifier::{Identifier, Qualifier};
use crate::instance::InstancePtr;
use once_cell::sync::OnceCell;
use std::fmt::{Debug, Formatter};

/// Handle given to factories, allowing them to request other identifiers from the environment
/// which is constructing them.
pub struct InjectionScope<'a> {
    environment: &'a Environment,
    requester: Identifier,
}

impl<'a> InjectionScope<'a> {
    pub(crate) fn new(environment: &'a Environment, requester: Identifier) -> Self {
        Self {
            environment,
            requester,
        }
    }

    /// Identifier of the component currently being constructed.
    #[inline]
    pub fn requester(&self) -> &Identifier {
        &self.requester
    }

    /// Immediately resolves the unqualified instance of `T`.
    #[inline]
    pub fn get<T: ?Sized + Send + Sync + 'static>(&self) -> Result<InstancePtr<T>, ResolutionError> {
        self.get_by(&Identifier::of::<T>())
    }

    /// Immediately resolves the instance of `T` with given qualifier.
    #[inline]
    pub fn get_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: impl Into<Qualifier>,
    ) -> Result<InstancePtr<T>, ResolutionError> {
        self.get_by(&Identifier::named::<T>(qualifier))
    }

    /// Immediately resolves the instance declared for given identifier.
    #[inline]
    pub fn get_by<T: ?Sized + Send + Sync + 'static>(
        &self,
        identifier: &Identifier,
    ) -> Result<InstancePtr<T>, ResolutionError> {
        self.environment.resolve_by(identifier)
    }

    /// Like [InjectionScope::get], but returns `None` when `T` is not declared.
    #[inline]
    pub fn get_optional<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Option<InstancePtr<T>>, ResolutionError> {
        self.get_optional_by(&Identifier::of::<T>())
    }

    /// Like [InjectionScope::get_by], but returns `None` when the identifier is not declared.
    pub fn get_optional_by<T: ?Sized + Send + Sync + 'static>(
        &self,
        identifier: &Identifier,
    ) -> Result<Option<InstancePtr<T>>, ResolutionError> {
        if self.environment.contains(identifier) {
            self.get_by(identifier).map(Some)
        } else {
            Ok(None)
        }
    }

    /// Resolves all instances of `T`, regardless of their qualifiers.
    #[inline]
    pub fn get_all<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<InstancePtr<T>>, ResolutionError> {
        self.environment.instances_of::<T>()
    }

    /// Returns a deferred accessor for the unqualified instance of `T`. Nothing is resolved until
    /// the accessor is first used.
    #[inline]
    pub fn lazy<T: ?Sized + Send + Sync + 'static>(&self) -> Lazy<T> {
        self.lazy_by(Identifier::of::<T>())
    }

    /// Returns a deferred accessor for the instance of `T` with given qualifier.
    #[inline]
    pub fn lazy_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: impl Into<Qualifier>,
    ) -> Lazy<T> {
        self.lazy_by(Identifier::named::<T>(qualifier))
    }

    /// Returns a deferred accessor for the instance declared for given identifier.
    pub fn lazy_by<T: ?Sized + Send + Sync + 'static>(&self, identifier: Identifier) -> Lazy<T> {
        Lazy {
            environment: self.environment.downgrade(),
            identifier,
            instance: OnceCell::new(),
        }
    }
}

impl Debug for InjectionScope<'_> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("InjectionScope")
            .field("requester", &self.requester)
            .finish_non_exhaustive()
    }
}

/// Deferred accessor returned by [InjectionScope::lazy]. The first successful [Lazy::get] resolves
/// the instance, which is then kept locally for subsequent calls. Getting an instance which has
/// not been constructed yet simply constructs it at that point.
///
/// The accessor does not keep the environment alive; using it after the environment has been
/// dropped results in [ResolutionError::EnvironmentDropped].
pub struct Lazy<T: ?Sized> {
    environment: WeakEnvironment,
    identifier: Identifier,
    instance: OnceCell<InstancePtr<T>>,
}

impl<T: ?Sized + Send + Sync + 'static> Lazy<T> {
    /// Returns the instance, resolving it on first call.
    pub fn get(&self) -> Result<InstancePtr<T>, ResolutionError> {
        self.instance
            .get_or_try_init(|| {
                self.environment
                    .upgrade()
                    .ok_or_else(|| ResolutionError::EnvironmentDropped(self.identifier.clone()))?
                    .resolve_by(&self.identifier)
            })
            .cloned()
    }

    /// Checks if this accessor has already resolved its instance.
    #[inline]
    pub fn is_resolved(&self) -> bool {
        self.instance.get().is_some()
    }
}

impl<T: ?Sized> Lazy<T> {
    #[inline]
    pub fn identifier(&self) -> &Identifier {
        &self.identifier
    }
}

impl<T: ?Sized> Clone for Lazy<T> {
    fn clone(&self) -> Self {
        Self {
            environment: self.environment.clone(),
            identifier: self.identifier.clone(),
            instance: self.instance.clone(),
        }
    }
}

impl<T: ?Sized> Debug for Lazy<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Lazy")
            .field("identifier", &self.identifier)
            .field("resolved", &self.instance.get().is_some())
            .finish()
    }
}
