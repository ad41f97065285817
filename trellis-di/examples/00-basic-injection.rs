use trellis_di::environment::Environment;
use trellis_di::instance::InstancePtr;
use trellis_di::module::Module;
use trellis_di::Injectable;

// this is a trait we would like to use in our component
trait GreetingService {
    fn greet(&self, name: &str) -> String;
}

// this is a dependency which implements the above trait and also is an injectable type
#[derive(Injectable)]
struct EnglishGreetingService;

impl GreetingService for EnglishGreetingService {
    fn greet(&self, name: &str) -> String {
        format!("Hello, {name}!")
    }
}

// this is another component, but with a dependency
#[derive(Injectable)]
struct GreetingController {
    // the environment will inject whatever is declared as dyn GreetingService
    service: InstancePtr<dyn GreetingService + Send + Sync>,
    // alternatively, you can inject the concrete type
    // service: InstancePtr<EnglishGreetingService>,
}

impl GreetingController {
    fn hello(&self) {
        println!("{}", self.service.greet("world"));
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    // modules can be split by concern and merged when sealing
    let services = Module::define("services", |module| {
        module
            .put::<EnglishGreetingService>()?
            // we're telling the environment to provide EnglishGreetingService when asked for
            // dyn GreetingService
            .put_alias::<dyn GreetingService + Send + Sync, EnglishGreetingService>(|service| {
                service
            })?;
        Ok(())
    })
    .expect("error declaring services");

    let controllers = Module::define("controllers", |module| {
        module.put::<GreetingController>()?;
        Ok(())
    })
    .expect("error declaring controllers");

    // nothing is constructed until first requested
    let environment =
        Environment::seal([services, controllers]).expect("error sealing environment");

    let controller = environment
        .resolve::<GreetingController>()
        .expect("error creating GreetingController");

    // prints "Hello, world!"
    controller.hello();
}
