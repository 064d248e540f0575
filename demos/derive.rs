//! Example demonstrating the #[derive(Component)] macro
//!
//! Run with:
//!   cargo run --example derive --features derive

use object_factory::{Component, Container, Qualifier, Registration, Selection};
use std::sync::Arc;

// Dependencies
#[allow(dead_code)]
struct Database {
    url: String,
}

#[allow(dead_code)]
struct Cache {
    size: usize,
}

trait Plugin: Send + Sync {
    fn name(&self) -> &str;
}

struct AuditPlugin;

impl Plugin for AuditPlugin {
    fn name(&self) -> &str {
        "audit"
    }
}

struct MetricsPlugin;

impl Plugin for MetricsPlugin {
    fn name(&self) -> &str {
        "metrics"
    }
}

// Component with injected dependencies
#[derive(Component)]
#[component(post_construct = "announce")]
struct UserService {
    #[inject(qualifier = "primary")]
    db: Arc<Database>,
    #[inject]
    cache: Arc<Cache>,
    #[inject]
    plugins: Selection<dyn Plugin>,
    // Non-injected field uses Default
    request_count: u64,
}

impl UserService {
    fn announce(&self) -> Result<(), std::convert::Infallible> {
        println!("  [UserService] constructed");
        Ok(())
    }

    fn describe(&self) -> String {
        let plugins: Vec<String> = self
            .plugins
            .iter()
            .filter_map(|p| p.ok())
            .map(|p| p.name().to_string())
            .collect();
        format!(
            "UserService connected to {} with cache size {} (plugins: [{}], requests: {})",
            self.db.url,
            self.cache.size,
            plugins.join(", "),
            self.request_count
        )
    }
}

// Nested injection, built fresh on every resolution
#[allow(dead_code)]
#[derive(Component)]
#[component(scope = "prototype")]
struct ApiController {
    #[inject]
    user_service: Arc<UserService>,
    #[inject]
    container: Container,
}

fn main() {
    println!("=== Object Factory Derive Macro Demo ===\n");

    let container = Container::new();
    container
        .register(
            Registration::instance(Database {
                url: "postgres://localhost:5432/myapp".into(),
            })
            .qualifier(Qualifier::named("primary")),
        )
        .unwrap();
    container
        .register(Registration::instance(Cache { size: 1024 }))
        .unwrap();
    container
        .register(Registration::producer(|_| Ok(AuditPlugin)).expose::<dyn Plugin>(|p| p))
        .unwrap();
    container
        .register(Registration::producer(|_| Ok(MetricsPlugin)).expose::<dyn Plugin>(|p| p))
        .unwrap();
    container.register(Registration::<UserService>::component()).unwrap();
    container.register(Registration::<ApiController>::component()).unwrap();

    // Every #[inject] field is checked here, before anything is built
    container.initialize().expect("dependency graph is complete");

    println!("Resolving UserService...");
    let user_service = container.get_object::<UserService>().unwrap();
    println!("  {}", user_service.describe());
    println!();

    println!("Resolving two ApiControllers...");
    let a = container.get_object::<ApiController>().unwrap();
    let b = container.get_object::<ApiController>().unwrap();
    println!("  distinct controllers: {}", !Arc::ptr_eq(&a, &b));
    println!(
        "  shared UserService:   {}",
        Arc::ptr_eq(&a.user_service, &b.user_service)
    );

    container.destroy().unwrap();

    println!("\n=== Demo Complete ===");
    println!("\nThe #[derive(Component)] macro generated a constructor that:");
    println!("  - Resolves #[inject] fields from the container, honoring qualifiers");
    println!("  - Injects Selection<T> lazily and the Container itself");
    println!("  - Uses Default::default() for non-injected fields");
}
