//! Example walking through the object lifecycle
//!
//! Run with:
//!   cargo run --example lifecycle

use object_factory::{
    Arguments, BoxError, Component, Constructor, Container, Dependency, Injected, InjectionPoints,
    InjectionTarget, Lifecycle, Markers, Producer, Qualifier, Registration, Stereotype,
};
use std::sync::Arc;

struct Settings {
    pool_size: usize,
}

struct Pool {
    size: usize,
}

/// Producer with a teardown, marked by a stereotype
struct PoolProducer;

impl Producer<Pool> for PoolProducer {
    fn produce(&self, container: &Container) -> Result<Pool, BoxError> {
        let settings = container.get_object::<Settings>()?;
        println!("  [PoolProducer] opening {} connections", settings.pool_size);
        Ok(Pool {
            size: settings.pool_size,
        })
    }

    fn markers(&self) -> Markers {
        Markers::new().stereotype(Stereotype::new("infrastructure").qualifier(Qualifier::named("primary")))
    }

    fn destroy(&self, pool: &Pool) -> Result<(), BoxError> {
        println!("  [PoolProducer] closing {} connections", pool.size);
        Ok(())
    }
}

/// Component with constructor, field and method injection plus hooks
struct Repository {
    pool: Arc<Pool>,
    settings: Option<Arc<Settings>>,
    configured: bool,
}

impl InjectionTarget for Repository {
    fn injection_points() -> InjectionPoints {
        InjectionPoints::new()
            .field("settings", Dependency::object::<Settings>())
            .method("configure", vec![Dependency::object::<Settings>()])
    }

    fn set_field(&mut self, field: &str, value: Injected) -> Result<(), BoxError> {
        match field {
            "settings" => self.settings = Some(value.into_object()?),
            other => return Err(format!("unknown field {other}").into()),
        }
        Ok(())
    }

    fn call_method(&mut self, method: &str, mut args: Arguments) -> Result<(), BoxError> {
        match method {
            "configure" => {
                let settings: Arc<Settings> = args.next_object()?;
                println!("  [Repository] configure(pool_size = {})", settings.pool_size);
                self.configured = true;
                Ok(())
            }
            other => Err(format!("unknown method {other}").into()),
        }
    }

    fn lifecycle() -> Lifecycle<Self> {
        Lifecycle::new()
            .post_construct("open", |this: &Self| {
                println!(
                    "  [Repository] post_construct (pool {}, configured {})",
                    this.pool.size, this.configured
                );
                Ok(())
            })
            .pre_destroy("close", |_: &Self| {
                println!("  [Repository] pre_destroy");
                Ok(())
            })
    }
}

impl Component for Repository {
    fn constructor() -> Constructor {
        Constructor::inject(vec![
            Dependency::object::<Pool>().qualified(Qualifier::named("primary")),
        ])
    }

    fn construct(mut args: Arguments) -> Result<Self, BoxError> {
        println!("  [Repository] constructor");
        Ok(Repository {
            pool: args.next_object()?,
            settings: None,
            configured: false,
        })
    }
}

fn main() {
    println!("=== Object Factory Lifecycle Demo ===\n");

    let container = Container::new();
    container
        .register(
            Registration::instance(Settings { pool_size: 8 })
                .on_destroy(|_| {
                    println!("  [Settings] released");
                    Ok(())
                }),
        )
        .unwrap();
    container.register(Registration::from_producer(PoolProducer)).unwrap();
    container.register(Registration::<Repository>::component()).unwrap();

    println!("Initializing (validation only, nothing is built)...");
    container.initialize().unwrap();
    println!("  state: {}\n", container.state());

    println!("Resolving Repository...");
    let repo = container.get_object::<Repository>().unwrap();
    assert!(repo.configured);
    assert!(repo.settings.is_some());
    println!();

    println!("Destroying (newest definition first)...");
    container.destroy().unwrap();
    println!("  state: {}", container.state());

    // A destroyed container refuses further work
    assert!(container.get_object::<Repository>().is_err());

    println!("\n=== Demo Complete ===");
}
