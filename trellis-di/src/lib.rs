//! Dependency injection environment built from explicit declarations.
//!
//! Components are declared in named [Module](module::Module)s, which are then merged and sealed
//! into an immutable [Environment](environment::Environment). Each declared
//! [Identifier](identifier::Identifier) is backed by exactly one lazily constructed instance,
//! shared by everything depending on it. Factories access their dependencies through an
//! [InjectionScope](scope::InjectionScope), either immediately or with a deferred
//! [Lazy](scope::Lazy) accessor, which also allows components to depend on each other.
//!
//! ```
//! use trellis_di::environment::Environment;
//! use trellis_di::instance::InstancePtr;
//! use trellis_di::module::Module;
//! use trellis_di::Injectable;
//!
//! trait Greeter {
//!     fn greet(&self, name: &str) -> String;
//! }
//!
//! #[derive(Injectable)]
//! struct English;
//!
//! impl Greeter for English {
//!     fn greet(&self, name: &str) -> String {
//!         format!("Hello, {name}!")
//!     }
//! }
//!
//! #[derive(Injectable)]
//! struct Controller {
//!     greeter: InstancePtr<dyn Greeter + Send + Sync>,
//! }
//!
//! let module = Module::define("greetings", |module| {
//!     module
//!         .put::<English>()?
//!         .put_alias::<dyn Greeter + Send + Sync, English>(|english| english)?
//!         .put::<Controller>()?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let environment = Environment::seal([module]).unwrap();
//! let controller = environment.resolve::<Controller>().unwrap();
//!
//! assert_eq!(controller.greeter.greet("Trellis"), "Hello, Trellis!");
//! ```
//!
//! ### Features
//!
//! * `derive` - automatic derivation of [Injectable](injectable::Injectable) (enabled by default)

pub mod declaration;
pub mod environment;
pub mod error;
pub mod identifier;
pub mod injectable;
pub mod instance;
pub mod module;
pub mod scope;

pub use error::{DeclarationError, ResolutionError, TeardownError};

#[cfg(feature = "derive")]
pub use trellis_di_derive::Injectable;
