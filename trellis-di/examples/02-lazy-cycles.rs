use trellis_di::environment::Environment;
use trellis_di::module::Module;
use trellis_di::scope::Lazy;
use trellis_di::Injectable;

// Parent and Child depend on each other - injecting them eagerly would be a dependency cycle, so
// at least one of them needs a Lazy accessor, which is resolved only when used
#[derive(Injectable)]
struct Parent {
    child: Lazy<Child>,
}

impl Parent {
    fn name(&self) -> &'static str {
        "parent"
    }
}

#[derive(Injectable)]
struct Child {
    parent: Lazy<Parent>,
}

impl Child {
    fn name(&self) -> &'static str {
        "child"
    }
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let module = Module::define("family", |module| {
        module.put::<Parent>()?.put::<Child>()?;
        Ok(())
    })
    .expect("error declaring family");

    let environment = Environment::seal([module]).expect("error sealing environment");

    let parent = environment.resolve::<Parent>().expect("error creating Parent");
    let child = parent.child.get().expect("error creating Child");

    // prints "parent -> child -> parent"
    println!(
        "{} -> {} -> {}",
        parent.name(),
        child.name(),
        child.parent.get().expect("error getting Parent").name()
    );
}
