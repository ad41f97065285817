//! A [Module] is a named, mutable collection of [Declaration]s, which is later sealed into an
//! [Environment](crate::environment::Environment). Modules are usually defined in a block:
//!
//! ```
//! use trellis_di::module::Module;
//!
//! struct GreetingService;
//!
//! struct GreetingController {
//!     service: std::sync::Arc<GreetingService>,
//! }
//!
//! let module = Module::define("greetings", |module| {
//!     module
//!         .put_factory(|_| Ok(GreetingService))?
//!         .put_factory(|scope| {
//!             Ok(GreetingController {
//!                 service: scope.get()?,
//!             })
//!         })?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! assert_eq!(module.len(), 2);
//! ```
//!
//! Modules can be merged. Declaring the same identifier in two merged modules is a conflict, unless
//! the declaration from the module merged later is marked with
//! [overriding](Declaration::overriding), in which case it replaces the earlier one.

use crate::declaration::Declaration;
use crate::error::DeclarationError;
use crate::identifier::{Identifier, Qualifier};
use crate::injectable::{Constructor, Injectable};
use crate::instance::{ErrorPtr, InstancePtr, Release};
use crate::scope::InjectionScope;
use fxhash::FxHashMap;
use tracing::debug;

/// Named collection of declarations with unique identifiers.
#[derive(Clone, Debug)]
pub struct Module {
    name: String,
    declarations: Vec<Declaration>,
    index: FxHashMap<Identifier, usize>,
}

impl Module {
    /// Creates an empty module.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            declarations: Vec::new(),
            index: FxHashMap::default(),
        }
    }

    /// Creates a module and fills it using given block.
    pub fn define<F>(name: impl Into<String>, block: F) -> Result<Self, DeclarationError>
    where
        F: FnOnce(&mut Module) -> Result<(), DeclarationError>,
    {
        let mut module = Self::new(name);
        block(&mut module)?;
        Ok(module)
    }

    /// Adds a declaration. Fails when its identifier is already declared in this module, regardless
    /// of the override marker.
    pub fn declare(&mut self, mut declaration: Declaration) -> Result<&mut Self, DeclarationError> {
        if self.index.contains_key(declaration.identifier()) {
            return Err(DeclarationError::DuplicateDeclaration {
                identifier: declaration.identifier().clone(),
                module: self.name.clone(),
            });
        }

        declaration.set_module(&self.name);

        self.index
            .insert(declaration.identifier().clone(), self.declarations.len());
        self.declarations.push(declaration);

        Ok(self)
    }

    /// Declares an [Injectable] type.
    #[inline]
    pub fn put<T: Injectable>(&mut self) -> Result<&mut Self, DeclarationError> {
        self.declare(Declaration::injectable::<T>())
    }

    /// Declares an [Injectable] type with given qualifier.
    #[inline]
    pub fn put_named<T: Injectable>(
        &mut self,
        qualifier: impl Into<Qualifier>,
    ) -> Result<&mut Self, DeclarationError> {
        self.declare(Declaration::injectable::<T>().with_qualifier(qualifier))
    }

    /// Declares an [Injectable] type which is released with its [Release] implementation on
    /// teardown.
    #[inline]
    pub fn put_releasable<T: Injectable + Release>(
        &mut self,
    ) -> Result<&mut Self, DeclarationError> {
        self.declare(Declaration::injectable::<T>().released::<T>())
    }

    /// Declares the type produced by given factory.
    #[inline]
    pub fn put_factory<T, F>(&mut self, factory: F) -> Result<&mut Self, DeclarationError>
    where
        T: Send + Sync + 'static,
        F: Fn(&InjectionScope<'_>) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        self.declare(Declaration::from_factory(factory))
    }

    /// Declares the type produced by given factory, with given qualifier.
    #[inline]
    pub fn put_named_factory<T, F>(
        &mut self,
        qualifier: impl Into<Qualifier>,
        factory: F,
    ) -> Result<&mut Self, DeclarationError>
    where
        T: Send + Sync + 'static,
        F: Fn(&InjectionScope<'_>) -> Result<T, ErrorPtr> + Send + Sync + 'static,
    {
        self.declare(Declaration::from_factory(factory).with_qualifier(qualifier))
    }

    /// Declares the type returned by given [Constructor].
    #[inline]
    pub fn put_constructor<Args, C>(&mut self, constructor: C) -> Result<&mut Self, DeclarationError>
    where
        C: Constructor<Args>,
        C::Output: Send + Sync + 'static,
    {
        self.declare(Declaration::from_constructor(constructor))
    }

    /// Declares the type returned by given [Constructor], with given qualifier.
    #[inline]
    pub fn put_named_constructor<Args, C>(
        &mut self,
        qualifier: impl Into<Qualifier>,
        constructor: C,
    ) -> Result<&mut Self, DeclarationError>
    where
        C: Constructor<Args>,
        C::Output: Send + Sync + 'static,
    {
        self.declare(Declaration::from_constructor(constructor).with_qualifier(qualifier))
    }

    /// Declares an already constructed value.
    #[inline]
    pub fn put_instance<T: Send + Sync + 'static>(
        &mut self,
        value: T,
    ) -> Result<&mut Self, DeclarationError> {
        self.declare(Declaration::instance(value))
    }

    /// Declares an already constructed value with given qualifier.
    #[inline]
    pub fn put_named_instance<T: Send + Sync + 'static>(
        &mut self,
        qualifier: impl Into<Qualifier>,
        value: T,
    ) -> Result<&mut Self, DeclarationError> {
        self.declare(Declaration::instance(value).with_qualifier(qualifier))
    }

    /// Declares `Alias` as sharing the instance of `Target`, e.g. to make a concrete type
    /// injectable as `dyn Trait + Send + Sync`.
    #[inline]
    pub fn put_alias<Alias, Target>(
        &mut self,
        cast: fn(InstancePtr<Target>) -> InstancePtr<Alias>,
    ) -> Result<&mut Self, DeclarationError>
    where
        Alias: ?Sized + Send + Sync + 'static,
        Target: ?Sized + Send + Sync + 'static,
    {
        self.declare(Declaration::alias(cast))
    }

    /// Declares `Alias`, qualified with `qualifier`, as sharing the unqualified instance of
    /// `Target`.
    #[inline]
    pub fn put_named_alias<Alias, Target>(
        &mut self,
        qualifier: impl Into<Qualifier>,
        cast: fn(InstancePtr<Target>) -> InstancePtr<Alias>,
    ) -> Result<&mut Self, DeclarationError>
    where
        Alias: ?Sized + Send + Sync + 'static,
        Target: ?Sized + Send + Sync + 'static,
    {
        self.declare(Declaration::alias(cast).with_qualifier(qualifier))
    }

    /// Merges another module into this one. Declarations of `other` whose identifiers are already
    /// present replace the existing ones if they are marked as overriding, and result in
    /// [DeclarationError::Conflict] otherwise. Declaration order is kept, with overrides taking the
    /// place of what they replace.
    pub fn merge(mut self, other: Module) -> Result<Module, DeclarationError> {
        for declaration in other.declarations {
            match self.index.get(declaration.identifier()) {
                Some(&position) => {
                    let existing = &mut self.declarations[position];
                    if !declaration.is_override() {
                        return Err(DeclarationError::Conflict {
                            identifier: declaration.identifier().clone(),
                            existing_module: existing.module().to_string(),
                            conflicting_module: declaration.module().to_string(),
                        });
                    }

                    debug!(
                        "Module '{}' overrides {} from '{}'.",
                        declaration.module(),
                        declaration.identifier(),
                        existing.module()
                    );

                    *existing = declaration;
                }
                None => {
                    self.index
                        .insert(declaration.identifier().clone(), self.declarations.len());
                    self.declarations.push(declaration);
                }
            }
        }

        self.name = format!("{}+{}", self.name, other.name);
        Ok(self)
    }

    #[inline]
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns declarations in declaration order.
    #[inline]
    pub fn declarations(&self) -> &[Declaration] {
        &self.declarations
    }

    #[inline]
    pub fn contains(&self, identifier: &Identifier) -> bool {
        self.index.contains_key(identifier)
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.declarations.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.declarations.is_empty()
    }

    pub(crate) fn into_declarations(self) -> Vec<Declaration> {
        self.declarations
    }
}
