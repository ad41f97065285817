//! Runners executing actual application logic.

#[cfg(test)]
use mockall::automock;
use std::any::type_name;
use trellis_di::declaration::Declaration;
use trellis_di::error::DeclarationError;
use trellis_di::injectable::Injectable;
use trellis_di::instance::{ErrorPtr, InstancePtr};
use trellis_di::module::Module;

pub type ApplicationRunnerPtr = dyn ApplicationRunner + Send + Sync;

/// Runs application logic. Runners are run by the [Application](crate::application::Application),
/// which finds them among all instances of [ApplicationRunnerPtr] declared in the environment.
#[cfg_attr(test, automock)]
pub trait ApplicationRunner {
    /// Runs any application code.
    fn run(&self) -> Result<(), ErrorPtr>;

    /// Returns the priority for this runner. Higher priorities get run first. Default 0.
    fn priority(&self) -> i8 {
        0
    }
}

/// Declaration helpers for runners. Each runner is declared as its own type and additionally as an
/// [ApplicationRunnerPtr], qualified with its type name.
pub trait RunnerModuleExt {
    /// Declares an injectable runner.
    fn put_runner<T>(&mut self) -> Result<&mut Self, DeclarationError>
    where
        T: Injectable + ApplicationRunner;

    /// Declares an already constructed runner, under given name.
    fn put_runner_instance<T>(
        &mut self,
        name: &'static str,
        runner: T,
    ) -> Result<&mut Self, DeclarationError>
    where
        T: ApplicationRunner + Send + Sync + 'static;
}

impl RunnerModuleExt for Module {
    fn put_runner<T>(&mut self) -> Result<&mut Self, DeclarationError>
    where
        T: Injectable + ApplicationRunner,
    {
        self.put::<T>()?
            .put_named_alias::<ApplicationRunnerPtr, T>(type_name::<T>(), |runner| runner)
    }

    fn put_runner_instance<T>(
        &mut self,
        name: &'static str,
        runner: T,
    ) -> Result<&mut Self, DeclarationError>
    where
        T: ApplicationRunner + Send + Sync + 'static,
    {
        let runner: InstancePtr<ApplicationRunnerPtr> = InstancePtr::new(runner);
        self.declare(Declaration::new(move |_| Ok(runner.clone())).with_qualifier(name))
    }
}
