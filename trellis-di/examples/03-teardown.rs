use trellis_di::environment::Environment;
use trellis_di::instance::{ErrorPtr, InstancePtr, Release};
use trellis_di::module::Module;
use trellis_di::Injectable;

#[derive(Injectable)]
struct ConnectionPool;

// types implementing Release can be declared with a release hook
impl Release for ConnectionPool {
    fn release(&self) -> Result<(), ErrorPtr> {
        println!("Closing connections");
        Ok(())
    }
}

#[derive(Injectable)]
struct Repository {
    _pool: InstancePtr<ConnectionPool>,
}

impl Release for Repository {
    fn release(&self) -> Result<(), ErrorPtr> {
        println!("Flushing repository");
        Ok(())
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let module = Module::define("storage", |module| {
        module
            .put_releasable::<ConnectionPool>()?
            .put_releasable::<Repository>()?;
        Ok(())
    })
    .expect("error declaring storage");

    let environment = Environment::seal([module]).expect("error sealing environment");

    // construct everything up front
    environment
        .initialize_all()
        .expect("error initializing environment");

    // instances are released in reverse construction order, so this prints "Flushing repository"
    // followed by "Closing connections"
    environment.teardown().expect("error tearing down");
}
