use trellis_di::environment::Environment;
use trellis_di::instance::InstancePtr;
use trellis_di::module::Module;
use trellis_di::Injectable;

struct Database {
    url: String,
}

#[derive(Injectable)]
struct ReportService {
    // unqualified instance
    primary: InstancePtr<Database>,
    // the same type, but declared with a qualifier
    #[inject(name = "replica")]
    replica: InstancePtr<Database>,
    // all instances of a type, regardless of qualifier
    all: Vec<InstancePtr<Database>>,
    // optional instances resolve to None when not declared
    #[inject(name = "archive")]
    archive: Option<InstancePtr<Database>>,
}

// note: for the sake of simplicity, errors are unwrapped, rather than gracefully handled
fn main() {
    let module = Module::define("storage", |module| {
        module
            .put_instance(Database {
                url: "postgres://primary".to_string(),
            })?
            .put_named_factory("replica", |_| {
                Ok(Database {
                    url: "postgres://replica".to_string(),
                })
            })?
            .put::<ReportService>()?;
        Ok(())
    })
    .expect("error declaring storage");

    let environment = Environment::seal([module]).expect("error sealing environment");
    let service = environment
        .resolve::<ReportService>()
        .expect("error creating ReportService");

    println!("Primary: {}", service.primary.url);
    println!("Replica: {}", service.replica.url);
    println!("Declared databases: {}", service.all.len());
    println!("Has archive: {}", service.archive.is_some());
}
