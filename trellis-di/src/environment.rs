//! Core functionality for resolving declared instances.
//!
//! An [Environment] is created by sealing a set of [Module]s. Sealing merges all modules, rejecting
//! conflicting declarations, after which the set of declarations is immutable. Instances are
//! constructed lazily, on first resolution, and memoized for the lifetime of the environment:
//!
//! ```
//! use trellis_di::environment::Environment;
//! use trellis_di::instance::InstancePtr;
//! use trellis_di::module::Module;
//!
//! struct Service;
//!
//! struct Controller {
//!     service: InstancePtr<Service>,
//! }
//!
//! let services = Module::define("services", |module| {
//!     module.put_factory(|_| Ok(Service))?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let controllers = Module::define("controllers", |module| {
//!     module.put_factory(|scope| {
//!         Ok(Controller {
//!             service: scope.get()?,
//!         })
//!     })?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let environment = Environment::seal([services, controllers]).unwrap();
//! let controller = environment.resolve::<Controller>().unwrap();
//!
//! assert!(InstancePtr::ptr_eq(
//!     &controller.service,
//!     &environment.resolve::<Service>().unwrap()
//! ));
//! ```
//!
//! Environments can be shared between threads. Each identifier is constructed at most once:
//! concurrent first-time resolutions wait for the one performing construction, while unrelated
//! identifiers are constructed independently.
//!
//! [teardown](Environment::teardown) releases constructed instances in reverse construction order.
//! It must not run concurrently with resolution.

mod construction;

use crate::declaration::Declaration;
use crate::environment::construction::{requesters, ConstructionGuard};
use crate::error::{DeclarationError, ResolutionError, TeardownError};
use crate::identifier::{Identifier, Qualifier};
use crate::instance::{downcast, AnyInstancePtr, InstancePtr};
use crate::module::Module;
use crate::scope::InjectionScope;
use fxhash::FxHashMap;
use itertools::Itertools;
use once_cell::sync::OnceCell;
use parking_lot::Mutex;
use std::fmt::{Debug, Formatter};
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Weak};
use tracing::{debug, info, trace, warn};

static NEXT_ENVIRONMENT_ID: AtomicUsize = AtomicUsize::new(0);

const ROOT_MODULE: &str = "environment";

/// Builder for [Environment], accumulating modules before sealing.
#[derive(Default, Debug)]
pub struct EnvironmentBuilder {
    modules: Vec<Module>,
}

impl EnvironmentBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a module to be sealed.
    pub fn with_module(mut self, module: Module) -> Self {
        self.modules.push(module);
        self
    }

    /// Adds multiple modules to be sealed.
    pub fn with_modules<I: IntoIterator<Item = Module>>(mut self, modules: I) -> Self {
        self.modules.extend(modules);
        self
    }

    /// Checks if any accumulated module declares given identifier.
    pub fn declares(&self, identifier: &Identifier) -> bool {
        self.modules.iter().any(|module| module.contains(identifier))
    }

    /// Merges all modules and creates the resulting [Environment]. No factories are run.
    pub fn seal(self) -> Result<Environment, DeclarationError> {
        Environment::seal(self.modules)
    }
}

struct Slot {
    declaration: Declaration,
    instance: OnceCell<AnyInstancePtr>,
}

struct EnvironmentInner {
    id: usize,
    slots: FxHashMap<Identifier, Slot>,
    /// Declaration order, used for deterministic iteration.
    order: Vec<Identifier>,
    /// Construction order, used for teardown.
    constructed: Mutex<Vec<Identifier>>,
    torn_down: AtomicBool,
}

/// Sealed container of declarations and their memoized instances. Cloning an environment is
/// cheap and returns a handle to the same container.
#[derive(Clone)]
pub struct Environment {
    inner: Arc<EnvironmentInner>,
}

/// Non-owning handle to an [Environment], used by deferred accessors.
#[derive(Clone, Debug, Default)]
pub struct WeakEnvironment {
    inner: Weak<EnvironmentInner>,
}

impl WeakEnvironment {
    /// Returns the environment, if it's still alive.
    pub fn upgrade(&self) -> Option<Environment> {
        self.inner.upgrade().map(|inner| Environment { inner })
    }
}

impl Environment {
    /// Creates a builder for accumulating modules.
    pub fn builder() -> EnvironmentBuilder {
        EnvironmentBuilder::new()
    }

    /// Merges given modules in order and creates an environment from the result. Fails with
    /// [DeclarationError::Conflict] when modules declare the same identifier without an override.
    pub fn seal<I: IntoIterator<Item = Module>>(modules: I) -> Result<Self, DeclarationError> {
        let mut module_count = 0;
        let merged = modules
            .into_iter()
            .inspect(|_| module_count += 1)
            .try_fold(Module::new(ROOT_MODULE), Module::merge)?;

        let declarations = merged.into_declarations();
        let order = declarations
            .iter()
            .map(|declaration| declaration.identifier().clone())
            .collect_vec();
        let slots: FxHashMap<_, _> = declarations
            .into_iter()
            .map(|declaration| {
                (
                    declaration.identifier().clone(),
                    Slot {
                        declaration,
                        instance: OnceCell::new(),
                    },
                )
            })
            .collect();

        // merging guarantees uniqueness
        debug_assert_eq!(slots.len(), order.len());

        let id = NEXT_ENVIRONMENT_ID.fetch_add(1, Ordering::Relaxed);
        info!(
            "Sealed environment {id} with {} declarations from {module_count} modules.",
            order.len()
        );

        Ok(Self {
            inner: Arc::new(EnvironmentInner {
                id,
                slots,
                order,
                constructed: Mutex::new(Vec::new()),
                torn_down: AtomicBool::new(false),
            }),
        })
    }

    /// Returns a non-owning handle to this environment.
    pub fn downgrade(&self) -> WeakEnvironment {
        WeakEnvironment {
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Resolves the unqualified instance of `T`.
    #[inline]
    pub fn resolve<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<InstancePtr<T>, ResolutionError> {
        self.resolve_by(&Identifier::of::<T>())
    }

    /// Resolves the instance of `T` with given qualifier.
    #[inline]
    pub fn resolve_named<T: ?Sized + Send + Sync + 'static>(
        &self,
        qualifier: impl Into<Qualifier>,
    ) -> Result<InstancePtr<T>, ResolutionError> {
        self.resolve_by(&Identifier::named::<T>(qualifier))
    }

    /// Resolves the instance declared for given identifier, as `T`.
    pub fn resolve_by<T: ?Sized + Send + Sync + 'static>(
        &self,
        identifier: &Identifier,
    ) -> Result<InstancePtr<T>, ResolutionError> {
        let instance = self.resolve_any(identifier)?;
        downcast::<T>(&instance)
            .ok_or_else(|| ResolutionError::IncompatibleInstance(identifier.clone()))
    }

    /// Resolves the type-erased instance declared for given identifier. The factory of the
    /// declaration is run at most once; a failed construction can be retried.
    pub fn resolve_any(&self, identifier: &Identifier) -> Result<AnyInstancePtr, ResolutionError> {
        if self.inner.torn_down.load(Ordering::Acquire) {
            return Err(ResolutionError::TornDown(identifier.clone()));
        }

        let slot = self.inner.slots.get(identifier).ok_or_else(|| {
            ResolutionError::UnresolvedDependency {
                identifier: identifier.clone(),
                requesters: requesters(self.inner.id),
            }
        })?;

        if let Some(instance) = slot.instance.get() {
            trace!("Returning cached instance of {identifier}.");
            return Ok(instance.clone());
        }

        let _guard = ConstructionGuard::enter(self.inner.id, identifier)?;

        slot.instance
            .get_or_try_init(|| {
                debug!("Constructing {identifier}.");

                let scope = InjectionScope::new(self, identifier.clone());
                let instance = slot
                    .declaration
                    .construct(&scope)
                    .map_err(|error| ResolutionError::from_factory(identifier, error))?;

                self.inner.constructed.lock().push(identifier.clone());
                Ok(instance)
            })
            .cloned()
    }

    /// Resolves all instances whose identifiers match given predicate, in declaration order.
    /// Instances not constructed yet are constructed.
    pub fn resolve_all<P>(
        &self,
        mut predicate: P,
    ) -> Result<Vec<(Identifier, AnyInstancePtr)>, ResolutionError>
    where
        P: FnMut(&Identifier) -> bool,
    {
        self.inner
            .order
            .iter()
            .filter(|identifier| predicate(identifier))
            .map(|identifier| {
                self.resolve_any(identifier)
                    .map(|instance| (identifier.clone(), instance))
            })
            .try_collect()
    }

    /// Resolves all instances of `T`, regardless of their qualifiers.
    pub fn instances_of<T: ?Sized + Send + Sync + 'static>(
        &self,
    ) -> Result<Vec<InstancePtr<T>>, ResolutionError> {
        self.resolve_all(Identifier::is::<T>)?
            .into_iter()
            .map(|(identifier, instance)| {
                downcast::<T>(&instance).ok_or(ResolutionError::IncompatibleInstance(identifier))
            })
            .try_collect()
    }

    /// Constructs all declared instances.
    pub fn initialize_all(&self) -> Result<(), ResolutionError> {
        debug!("Initializing all declarations...");
        self.resolve_all(|_| true).map(|_| ())
    }

    /// Releases constructed instances in reverse construction order, invoking their release hooks.
    /// All hooks are run, even if some of them fail. Subsequent calls do nothing, and resolution is
    /// no longer possible afterwards.
    ///
    /// Must not be called concurrently with resolution.
    pub fn teardown(&self) -> Result<(), TeardownError> {
        if self.inner.torn_down.swap(true, Ordering::AcqRel) {
            return Ok(());
        }

        let constructed = std::mem::take(&mut *self.inner.constructed.lock());
        info!("Tearing down {} instances...", constructed.len());

        let failures = constructed
            .into_iter()
            .rev()
            .filter_map(|identifier| {
                let slot = self.inner.slots.get(&identifier)?;
                let instance = slot.instance.get()?;

                match slot.declaration.release(instance)? {
                    Ok(()) => {
                        debug!("Released {identifier}.");
                        None
                    }
                    Err(error) => {
                        warn!("Error releasing {identifier}: {error}");
                        Some((identifier, error))
                    }
                }
            })
            .collect_vec();

        if failures.is_empty() {
            Ok(())
        } else {
            Err(TeardownError { failures })
        }
    }

    /// Checks if given identifier is declared.
    #[inline]
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.inner.slots.contains_key(identifier)
    }

    /// Checks if the instance for given identifier has already been constructed.
    pub fn is_constructed(&self, identifier: &Identifier) -> bool {
        self.inner
            .slots
            .get(identifier)
            .map(|slot| slot.instance.get().is_some())
            .unwrap_or(false)
    }

    /// Checks if [Environment::teardown] has been called.
    #[inline]
    pub fn is_torn_down(&self) -> bool {
        self.inner.torn_down.load(Ordering::Acquire)
    }

    /// Returns declared identifiers, in declaration order.
    pub fn identifiers(&self) -> impl Iterator<Item = &Identifier> {
        self.inner.order.iter()
    }

    /// Returns the declaration for given identifier.
    pub fn declaration(&self, identifier: &Identifier) -> Option<&Declaration> {
        self.inner
            .slots
            .get(identifier)
            .map(|slot| &slot.declaration)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.inner.order.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.inner.order.is_empty()
    }
}

impl Debug for Environment {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Environment")
            .field("id", &self.inner.id)
            .field("identifiers", &self.inner.order)
            .field("torn_down", &self.is_torn_down())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use crate::declaration::Declaration;
    use crate::environment::Environment;
    use crate::error::{DeclarationError, ResolutionError};
    use crate::identifier::Identifier;
    use crate::instance::{ErrorPtr, InstancePtr, MockRelease};
    use crate::module::Module;
    use mockall::Sequence;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[derive(Debug)]
    struct Service;

    #[derive(Debug)]
    struct Controller {
        service: InstancePtr<Service>,
    }

    fn create_modules() -> (Module, Module) {
        let m1 = Module::define("m1", |module| {
            module.put_factory(|_| Ok(Service))?;
            Ok(())
        })
        .unwrap();

        let m2 = Module::define("m2", |module| {
            module.put_factory(|scope| {
                Ok(Controller {
                    service: scope.get()?,
                })
            })?;
            Ok(())
        })
        .unwrap();

        (m1, m2)
    }

    #[test]
    fn should_share_dependency_with_direct_resolution() {
        let (m1, m2) = create_modules();
        let environment = Environment::seal([m1, m2]).unwrap();

        let controller = environment.resolve::<Controller>().unwrap();
        let service = environment.resolve::<Service>().unwrap();

        assert!(InstancePtr::ptr_eq(&controller.service, &service));
        assert!(InstancePtr::ptr_eq(
            &controller,
            &environment.resolve::<Controller>().unwrap()
        ));
    }

    #[test]
    fn should_reject_conflicts_before_construction() {
        let counter = Arc::new(AtomicUsize::new(0));
        let create_module = |name: &str| {
            let counter = counter.clone();
            Module::define(name, move |module| {
                module.put_factory(move |_| {
                    counter.fetch_add(1, Ordering::SeqCst);
                    Ok(Service)
                })?;
                Ok(())
            })
            .unwrap()
        };

        let error = Environment::seal([create_module("m1"), create_module("m2")]).unwrap_err();

        assert_eq!(
            error,
            DeclarationError::Conflict {
                identifier: Identifier::of::<Service>(),
                existing_module: "m1".to_string(),
                conflicting_module: "m2".to_string(),
            }
        );
        assert_eq!(counter.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn should_report_missing_dependency_with_requesters() {
        let (_, m2) = create_modules();
        let environment = Environment::seal([m2]).unwrap();

        match environment.resolve::<Controller>().unwrap_err() {
            ResolutionError::UnresolvedDependency {
                identifier,
                requesters,
            } => {
                assert_eq!(identifier, Identifier::of::<Service>());
                assert_eq!(requesters, vec![Identifier::of::<Controller>()]);
            }
            error => panic!("unexpected error: {error}"),
        }

        assert!(!environment.is_constructed(&Identifier::of::<Controller>()));
    }

    #[test]
    fn should_detect_eager_cycles() {
        #[derive(Debug)]
        struct A;
        #[derive(Debug)]
        struct B;

        let module = Module::define("cycle", |module| {
            module
                .put_factory(|scope| {
                    scope.get::<B>()?;
                    Ok(A)
                })?
                .put_factory(|scope| {
                    scope.get::<A>()?;
                    Ok(B)
                })?;
            Ok(())
        })
        .unwrap();

        let environment = Environment::seal([module]).unwrap();

        match environment.resolve::<A>().unwrap_err() {
            ResolutionError::DependencyCycle { chain } => assert_eq!(
                chain,
                vec![
                    Identifier::of::<A>(),
                    Identifier::of::<B>(),
                    Identifier::of::<A>()
                ]
            ),
            error => panic!("unexpected error: {error}"),
        }

        assert!(!environment.is_constructed(&Identifier::of::<A>()));
        assert!(!environment.is_constructed(&Identifier::of::<B>()));
    }

    #[test]
    fn should_retry_failed_construction() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let factory_attempts = attempts.clone();

        let module = Module::define("retry", move |module| {
            module.put_factory(move |_| {
                if factory_attempts.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(ErrorPtr::from("not yet"))
                } else {
                    Ok(Service)
                }
            })?;
            Ok(())
        })
        .unwrap();

        let environment = Environment::seal([module]).unwrap();

        assert!(matches!(
            environment.resolve::<Service>().unwrap_err(),
            ResolutionError::Construction { identifier, .. } if identifier.is::<Service>()
        ));
        assert!(!environment.is_constructed(&Identifier::of::<Service>()));

        let first = environment.resolve::<Service>().unwrap();
        let second = environment.resolve::<Service>().unwrap();

        assert!(InstancePtr::ptr_eq(&first, &second));
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn should_resolve_all_matching_in_declaration_order() {
        let module = Module::define("numbers", |module| {
            module
                .put_named_instance("one", 1i8)?
                .put_instance(0u8)?
                .put_named_instance("two", 2i8)?;
            Ok(())
        })
        .unwrap();

        let environment = Environment::seal([module]).unwrap();
        let values = environment
            .instances_of::<i8>()
            .unwrap()
            .into_iter()
            .map(|value| *value)
            .collect::<Vec<_>>();

        assert_eq!(values, vec![1, 2]);
        assert!(!environment.is_constructed(&Identifier::of::<u8>()));
    }

    #[test]
    fn should_release_in_reverse_construction_order() {
        let released = Arc::new(Mutex::new(Vec::new()));
        let first_released = released.clone();
        let second_released = released.clone();

        let module = Module::define("release", move |module| {
            module
                .declare(Declaration::instance(1i8).with_release(move |value: &i8| {
                    first_released.lock().push(*value);
                    Ok(())
                }))?
                .declare(
                    Declaration::from_factory(|scope| Ok(*scope.get::<i8>()? + 1))
                        .with_qualifier("second")
                        .with_release(move |value: &i8| {
                            second_released.lock().push(*value);
                            Ok(())
                        }),
                )?;
            Ok(())
        })
        .unwrap();

        let environment = Environment::seal([module]).unwrap();
        environment.resolve_named::<i8>("second").unwrap();

        environment.teardown().unwrap();
        environment.teardown().unwrap();

        assert_eq!(*released.lock(), vec![2, 1]);
        assert!(environment.is_torn_down());
        assert!(matches!(
            environment.resolve::<i8>().unwrap_err(),
            ResolutionError::TornDown(_)
        ));
    }

    #[test]
    fn should_release_with_trait_hooks_and_collect_failures() {
        let mut sequence = Sequence::new();

        let mut failing = MockRelease::new();
        failing
            .expect_release()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Err(ErrorPtr::from("busy")));

        let mut succeeding = MockRelease::new();
        succeeding
            .expect_release()
            .times(1)
            .in_sequence(&mut sequence)
            .returning(|| Ok(()));

        let module = Module::define("mocks", move |module| {
            module
                .declare(
                    Declaration::instance(succeeding)
                        .with_qualifier("succeeding")
                        .released::<MockRelease>(),
                )?
                .declare(
                    Declaration::instance(failing)
                        .with_qualifier("failing")
                        .released::<MockRelease>(),
                )?;
            Ok(())
        })
        .unwrap();

        let environment = Environment::seal([module]).unwrap();
        environment
            .resolve_named::<MockRelease>("succeeding")
            .unwrap();
        environment.resolve_named::<MockRelease>("failing").unwrap();

        let error = environment.teardown().unwrap_err();
        assert_eq!(error.failures.len(), 1);
        assert_eq!(
            error.failures[0].0,
            Identifier::named::<MockRelease>("failing")
        );
    }

    #[test]
    fn should_initialize_everything_eagerly() {
        let (m1, m2) = create_modules();
        let environment = Environment::seal([m1, m2]).unwrap();

        environment.initialize_all().unwrap();

        assert!(environment
            .identifiers()
            .all(|identifier| environment.is_constructed(identifier)));
    }
}
