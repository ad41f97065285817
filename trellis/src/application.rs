//! Core application framework functionality.

use crate::config::ApplicationConfig;
use crate::runner::ApplicationRunnerPtr;
use config::ConfigError;
use derive_more::Constructor;
use itertools::Itertools;
use std::cmp::Reverse;
use thiserror::Error;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;
use trellis_di::environment::{Environment, EnvironmentBuilder};
use trellis_di::error::{DeclarationError, ResolutionError, TeardownError};
use trellis_di::identifier::Identifier;
use trellis_di::instance::ErrorPtr;
use trellis_di::module::Module;

const FRAMEWORK_MODULE: &str = "trellis";

#[derive(Error, Debug)]
pub enum ApplicationError {
    #[error("Error declaring components: {0}")]
    Declaration(#[from] DeclarationError),
    #[error("Error loading configuration: {0}")]
    Config(#[from] ConfigError),
    #[error("Error initializing components: {0}")]
    Initialization(ResolutionError),
    #[error("Error retrieving runners: {0}")]
    RunnerInjection(ResolutionError),
    #[error("Runner error: {0}")]
    Runner(ErrorPtr),
    #[error("Error tearing down: {0}")]
    Teardown(#[from] TeardownError),
}

/// Builder for [Application], collecting user modules.
#[derive(Default, Debug)]
pub struct ApplicationBuilder {
    environment: EnvironmentBuilder,
    config: Option<ApplicationConfig>,
}

impl ApplicationBuilder {
    pub fn with_module(mut self, module: Module) -> Self {
        self.environment = self.environment.with_module(module);
        self
    }

    pub fn with_modules<I: IntoIterator<Item = Module>>(mut self, modules: I) -> Self {
        self.environment = self.environment.with_modules(modules);
        self
    }

    /// Uses given config instead of loading it from the environment. Has no effect if a module
    /// declares its own [ApplicationConfig].
    pub fn with_config(mut self, config: ApplicationConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Seals the environment, declaring the [ApplicationConfig] if no user module does.
    pub fn build(self) -> Result<Application, ApplicationError> {
        let mut environment = self.environment;

        if !environment.declares(&Identifier::of::<ApplicationConfig>()) {
            let config = match self.config {
                Some(config) => config,
                None => ApplicationConfig::init_from_environment()?,
            };

            environment = environment.with_module(Module::define(FRAMEWORK_MODULE, |module| {
                module.put_instance(config)?;
                Ok(())
            })?);
        }

        Ok(Application::new(environment.seal()?))
    }
}

/// Main entrypoint for the application. Bootstraps the application and runs
/// [ApplicationRunners](crate::runner::ApplicationRunner).
#[derive(Constructor, Clone, Debug)]
pub struct Application {
    environment: Environment,
}

impl Application {
    pub fn builder() -> ApplicationBuilder {
        ApplicationBuilder::default()
    }

    /// Returns the environment this application runs in.
    #[inline]
    pub fn environment(&self) -> &Environment {
        &self.environment
    }

    /// Runs all declared runners, from the highest priority, stopping at first error. Depending on
    /// the config, installs a default logger, constructs all components up front and tears the
    /// environment down at the end, even if a runner fails.
    pub fn run(&self) -> Result<(), ApplicationError> {
        let config = self
            .environment
            .resolve::<ApplicationConfig>()
            .map_err(ApplicationError::Initialization)?;

        if config.install_tracing_logger {
            install_tracing_logger();
        }

        if config.eager_initialization {
            info!("Initializing all components...");

            self.environment
                .initialize_all()
                .map_err(ApplicationError::Initialization)?;
        }

        let result = self.run_runners();

        if config.teardown_on_exit {
            info!("Tearing down environment...");

            match (self.environment.teardown(), &result) {
                (Err(error), Err(_)) => warn!("Error tearing down after runner failure: {error}"),
                (Err(error), Ok(())) => return Err(error.into()),
                (Ok(()), _) => {}
            }
        }

        result
    }

    fn run_runners(&self) -> Result<(), ApplicationError> {
        info!("Searching for application runners...");

        let runners = self
            .environment
            .instances_of::<ApplicationRunnerPtr>()
            .map_err(ApplicationError::RunnerInjection)?
            .into_iter()
            .sorted_by_key(|runner| Reverse(runner.priority()))
            .collect_vec();

        info!("Running {} application runners...", runners.len());

        for runner in &runners {
            runner.run().map_err(ApplicationError::Runner)?;
        }

        Ok(())
    }
}

fn install_tracing_logger() {
    // another subscriber might already be installed, e.g. in tests
    if tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .try_init()
        .is_err()
    {
        debug!("Tracing subscriber already installed.");
    }
}

#[cfg(test)]
mod tests {
    use crate::application::{Application, ApplicationError};
    use crate::config::ApplicationConfig;
    use crate::runner::{ApplicationRunnerPtr, MockApplicationRunner, RunnerModuleExt};
    use mockall::Sequence;
    use trellis_di::declaration::Declaration;
    use trellis_di::identifier::Identifier;
    use trellis_di::instance::{ErrorPtr, InstancePtr};
    use trellis_di::module::Module;

    fn create_config() -> ApplicationConfig {
        ApplicationConfig {
            install_tracing_logger: false,
            ..ApplicationConfig::default()
        }
    }

    fn create_runner(priority: i8, sequence: &mut Sequence) -> MockApplicationRunner {
        let mut runner = MockApplicationRunner::new();
        runner.expect_priority().return_const(priority);
        runner
            .expect_run()
            .times(1)
            .in_sequence(sequence)
            .returning(|| Ok(()));
        runner
    }

    #[test]
    fn should_run_runners_by_priority() {
        let mut sequence = Sequence::new();
        let high = create_runner(5, &mut sequence);
        let low = create_runner(-128, &mut sequence);

        let module = Module::define("runners", |module| {
            module
                .put_runner_instance("low", low)?
                .put_runner_instance("high", high)?;
            Ok(())
        })
        .unwrap();

        let application = Application::builder()
            .with_module(module)
            .with_config(create_config())
            .build()
            .unwrap();

        application.run().unwrap();
        assert!(application.environment().is_torn_down());
    }

    #[test]
    fn should_return_runner_error() {
        let mut runner = MockApplicationRunner::new();
        runner.expect_priority().return_const(0i8);
        runner
            .expect_run()
            .times(1)
            .returning(|| Err(ErrorPtr::from("failed")));

        let module = Module::define("runners", |module| {
            module.put_runner_instance("failing", runner)?;
            Ok(())
        })
        .unwrap();

        let application = Application::builder()
            .with_module(module)
            .with_config(create_config())
            .build()
            .unwrap();

        assert!(matches!(
            application.run().unwrap_err(),
            ApplicationError::Runner(_)
        ));
        assert!(application.environment().is_torn_down());
    }

    #[test]
    fn should_prefer_runner_error_over_teardown_error() {
        struct Resource;

        let mut runner = MockApplicationRunner::new();
        runner.expect_priority().return_const(0i8);
        runner
            .expect_run()
            .times(1)
            .returning(|| Err(ErrorPtr::from("failed")));

        let module = Module::define("runners", |module| {
            module
                .put_runner_instance("failing", runner)?
                .declare(
                    Declaration::instance(Resource)
                        .with_release(|_: &Resource| Err(ErrorPtr::from("busy"))),
                )?;
            Ok(())
        })
        .unwrap();

        let application = Application::builder()
            .with_module(module)
            .with_config(ApplicationConfig {
                eager_initialization: true,
                ..create_config()
            })
            .build()
            .unwrap();

        match application.run() {
            Err(ApplicationError::Runner(error)) => assert_eq!(error.to_string(), "failed"),
            _ => panic!("expected runner error"),
        }
        assert!(application.environment().is_torn_down());
    }

    #[test]
    fn should_return_teardown_error_after_successful_run() {
        struct Resource;

        let module = Module::define("resources", |module| {
            module.declare(
                Declaration::instance(Resource)
                    .with_release(|_: &Resource| Err(ErrorPtr::from("busy"))),
            )?;
            Ok(())
        })
        .unwrap();

        let application = Application::builder()
            .with_module(module)
            .with_config(ApplicationConfig {
                eager_initialization: true,
                ..create_config()
            })
            .build()
            .unwrap();

        assert!(matches!(
            application.run().unwrap_err(),
            ApplicationError::Teardown(_)
        ));
    }

    #[test]
    fn should_return_runner_injection_error() {
        let module = Module::define("runners", |module| {
            module.declare(
                Declaration::new(|scope| {
                    let runner: InstancePtr<ApplicationRunnerPtr> =
                        scope.get::<MockApplicationRunner>()?;
                    Ok(runner)
                })
                .with_qualifier("missing"),
            )?;
            Ok(())
        })
        .unwrap();

        let application = Application::builder()
            .with_module(module)
            .with_config(create_config())
            .build()
            .unwrap();

        assert!(matches!(
            application.run().unwrap_err(),
            ApplicationError::RunnerInjection(_)
        ));
    }

    #[test]
    fn should_prefer_declared_config() {
        let declared = ApplicationConfig {
            teardown_on_exit: false,
            ..create_config()
        };

        let module = Module::define("config", |module| {
            module.put_instance(declared.clone())?;
            Ok(())
        })
        .unwrap();

        let application = Application::builder()
            .with_module(module)
            .with_config(ApplicationConfig::default())
            .build()
            .unwrap();

        assert_eq!(
            *application
                .environment()
                .resolve::<ApplicationConfig>()
                .unwrap(),
            declared
        );

        application.run().unwrap();
        assert!(!application.environment().is_torn_down());
    }

    #[test]
    fn should_initialize_eagerly() {
        struct Component;

        let module = Module::define("components", |module| {
            module.put_factory(|_| Ok(Component))?;
            Ok(())
        })
        .unwrap();

        let application = Application::builder()
            .with_module(module)
            .with_config(ApplicationConfig {
                eager_initialization: true,
                teardown_on_exit: false,
                ..create_config()
            })
            .build()
            .unwrap();

        application.run().unwrap();

        assert!(application
            .environment()
            .is_constructed(&Identifier::of::<Component>()));
    }
}
