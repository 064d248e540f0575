//! Example demonstrating logging capabilities
//!
//! Run with JSON logging (production):
//! ```bash
//! cargo run --example logging --features logging-json
//! ```
//!
//! Run with pretty logging (development):
//! ```bash
//! cargo run --example logging --features logging-pretty
//! ```

use object_factory::{Container, Qualifier, Qualifiers, Registration};

// Example services
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct UserService {
    name: String,
}

#[allow(dead_code)]
struct RequestContext {
    request_id: u64,
}

fn main() {
    // JSON if logging-json is enabled, pretty otherwise
    object_factory::logging::init();

    println!("=== Object Factory Logging Demo ===\n");

    let container = Container::new();

    // Register definitions (logs: "Registering object definition")
    container
        .register(Registration::instance(Database {
            url: "postgres://localhost/mydb".into(),
        }))
        .unwrap();
    container
        .register(
            Registration::instance(Database {
                url: "postgres://replica/mydb".into(),
            })
            .qualifier(Qualifier::named("replica")),
        )
        .unwrap();
    container
        .register(Registration::producer(|_| {
            println!("  [App] UserService being created...");
            Ok(UserService {
                name: "UserService".into(),
            })
        }))
        .unwrap();
    container
        .register(Registration::producer(|_| Ok(RequestContext { request_id: 12345 })).prototype())
        .unwrap();

    // Validate the graph (logs: "Container ready")
    container.initialize().unwrap();

    // First resolution materializes (logs: "Materializing object")
    let _users = container.get_object::<UserService>().unwrap();
    // Second one is served from the cache (trace level)
    let _users = container.get_object::<UserService>().unwrap();

    // Prototypes are built on every resolution
    let _ctx = container.get_object::<RequestContext>().unwrap();
    let _ctx = container.get_object::<RequestContext>().unwrap();

    // Qualified resolution
    let _replica = container
        .get_object_with::<Database>(&Qualifiers::from(Qualifier::named("replica")))
        .unwrap();

    // Missing type (logs the unsatisfied dependency)
    let missing = container.try_get_object::<i32>();
    assert!(missing.is_none());

    // Ambiguous: two Database definitions match an unqualified select().get()
    let all = container.select::<Database>(&Qualifiers::new()).unwrap();
    assert!(all.get().is_err());

    // Teardown (logs: "Container destroyed")
    container.destroy().unwrap();

    println!("\n=== Demo Complete ===");
    println!("Check the log output above to see structured logging in action!");
    println!("\nTip: Use --features logging-json for production (JSON output)");
    println!("     Use --features logging-pretty for development (colorful output)");
}
