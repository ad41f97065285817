use trellis::application::Application;
use trellis::runner::{ApplicationRunner, RunnerModuleExt};
use trellis_di::instance::{ErrorPtr, InstancePtr};
use trellis_di::module::Module;
use trellis_di::Injectable;

#[derive(Injectable)]
struct GreetingService;

impl GreetingService {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}!")
    }
}

// this is an application runner, which will run when the application starts; runners are regular
// components, so they can have their own dependencies
#[derive(Injectable)]
struct HelloWorldRunner {
    service: InstancePtr<GreetingService>,
}

impl ApplicationRunner for HelloWorldRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("{}", self.service.greet("world"));
        Ok(())
    }
}

// runners with higher priorities get run first
#[derive(Injectable)]
struct BannerRunner;

impl ApplicationRunner for BannerRunner {
    fn run(&self) -> Result<(), ErrorPtr> {
        println!("=== trellis ===");
        Ok(())
    }

    fn priority(&self) -> i8 {
        10
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let module = Module::define("app", |module| {
        module
            .put::<GreetingService>()?
            .put_runner::<HelloWorldRunner>()?
            .put_runner::<BannerRunner>()?;
        Ok(())
    })
    .expect("error declaring components");

    // the application config is loaded from trellis.json and TRELLIS_* environment variables,
    // unless a module declares its own ApplicationConfig
    let application = Application::builder()
        .with_module(module)
        .build()
        .expect("unable to create application");

    // prints the banner, followed by "Hello, world!"
    application.run().expect("error running application");
}
