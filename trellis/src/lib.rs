//! Application bootstrapping based on [trellis_di] environments.
//!
//! Applications built with dependency injection don't wire their components in `main()`. Instead,
//! components are declared in modules, and an entrypoint seals those modules into an
//! [Environment](trellis_di::environment::Environment) and runs the actual application logic. This
//! crate provides such entrypoint in the form of [Application](application::Application), which
//! also configures supporting infrastructure, e.g. logging, and tears the environment down once
//! the application is done.
//!
//! Application logic lives in [ApplicationRunner](runner::ApplicationRunner)s, which are declared
//! like any other component:
//!
//! ```
//! use trellis::application::Application;
//! use trellis::config::ApplicationConfig;
//! use trellis::runner::{ApplicationRunner, RunnerModuleExt};
//! use trellis_di::instance::ErrorPtr;
//! use trellis_di::module::Module;
//! use trellis_di::Injectable;
//!
//! #[derive(Injectable)]
//! struct HelloRunner;
//!
//! impl ApplicationRunner for HelloRunner {
//!     fn run(&self) -> Result<(), ErrorPtr> {
//!         println!("Hello world!");
//!         Ok(())
//!     }
//! }
//!
//! let module = Module::define("app", |module| {
//!     module.put_runner::<HelloRunner>()?;
//!     Ok(())
//! })
//! .unwrap();
//!
//! let mut config = ApplicationConfig::default();
//! config.install_tracing_logger = false;
//!
//! Application::builder()
//!     .with_module(module)
//!     .with_config(config)
//!     .build()
//!     .unwrap()
//!     .run()
//!     .unwrap();
//! ```

pub mod application;
pub mod config;
pub mod runner;
