//! Traversal of a type's injection points
//!
//! The same walk drives validation at initialization and injection at
//! construction time; only the visitor differs.

use crate::definition::{AnyArc, ReflectiveType};
use crate::injection::{
    Arguments, Component, Constructor, Dependency, DependencyKind, Injected, InjectionPoint,
    InjectionPoints, InjectionTarget,
};
use crate::storage::ObjectRegistry;
use crate::{Container, DiError, Result};
use std::sync::Arc;

#[cfg(feature = "logging")]
use tracing::trace;

/// Which walk to perform
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum ScanMode {
    /// Constructor parameters, then method parameters, then fields
    Validate,
    /// Fields, then methods
    Execute,
}

/// Callbacks invoked for each injection point.
///
/// `Validate` walks call `on_parameter` and `on_field`; `Execute` walks call
/// `on_field` and `on_method`.
pub(crate) trait InjectionVisitor {
    /// A single parameter, of the constructor or of an injection method
    fn on_parameter(&mut self, _member: String, _dependency: &Dependency) -> Result<()> {
        Ok(())
    }

    /// A field
    fn on_field(&mut self, name: &str, member: String, dependency: &Dependency) -> Result<()>;

    /// A whole injection method
    fn on_method(&mut self, _name: &str, _member: String, _parameters: &[Dependency]) -> Result<()> {
        Ok(())
    }
}

pub(crate) struct InjectionScanner;

impl InjectionScanner {
    /// Walk `owner`'s injection points in the order `mode` requires.
    pub fn traverse<V: InjectionVisitor>(
        mode: ScanMode,
        owner: &str,
        constructor: Option<&Constructor>,
        points: &InjectionPoints,
        visitor: &mut V,
    ) -> Result<()> {
        match mode {
            ScanMode::Validate => {
                if let Some(constructor) = constructor {
                    for point in constructor.points() {
                        if let InjectionPoint::ConstructorParam { dependency, .. } = &point {
                            visitor.on_parameter(point.describe(owner), dependency)?;
                        }
                    }
                }
                for point in points.methods() {
                    if let InjectionPoint::Method { name, parameters } = point {
                        for (index, dependency) in parameters.iter().enumerate() {
                            visitor.on_parameter(parameter_member(owner, name, index), dependency)?;
                        }
                    }
                }
                for point in points.fields() {
                    if let InjectionPoint::Field { name, dependency } = point {
                        visitor.on_field(name, point.describe(owner), dependency)?;
                    }
                }
            }
            ScanMode::Execute => {
                for point in points.fields() {
                    if let InjectionPoint::Field { name, dependency } = point {
                        visitor.on_field(name, point.describe(owner), dependency)?;
                    }
                }
                for point in points.methods() {
                    if let InjectionPoint::Method { name, parameters } = point {
                        visitor.on_method(name, point.describe(owner), parameters)?;
                    }
                }
            }
        }
        Ok(())
    }
}

fn parameter_member(owner: &str, callable: &str, index: usize) -> String {
    format!("{owner}::{callable}(arg {index})")
}

/// Checks that every object dependency has exactly one candidate.
struct ValidationVisitor<'a> {
    registry: &'a ObjectRegistry,
}

impl ValidationVisitor<'_> {
    fn check(&self, member: String, dependency: &Dependency) -> Result<()> {
        if dependency.kind() != DependencyKind::Object {
            return Ok(());
        }
        let key = dependency.key();
        let qualifiers = dependency.qualifiers();
        let error = match self.registry.count_exact(key, qualifiers) {
            1 => return Ok(()),
            0 => DiError::unsatisfied(key.name(), qualifiers),
            _ => DiError::ambiguous(key.name(), qualifiers),
        };
        Err(error.into_definition(member))
    }
}

impl InjectionVisitor for ValidationVisitor<'_> {
    fn on_parameter(&mut self, member: String, dependency: &Dependency) -> Result<()> {
        self.check(member, dependency)
    }

    fn on_field(&mut self, _name: &str, member: String, dependency: &Dependency) -> Result<()> {
        self.check(member, dependency)
    }

}

/// Resolves dependencies and hands them to the target.
struct InjectingVisitor<'a, T> {
    owner: &'a str,
    container: &'a Container,
    target: &'a mut T,
}

impl<T: InjectionTarget> InjectionVisitor for InjectingVisitor<'_, T> {
    fn on_field(&mut self, name: &str, member: String, dependency: &Dependency) -> Result<()> {
        let value = dependency.resolve(self.container, member.clone())?;
        self.target
            .set_field(name, value)
            .map_err(|e| DiError::wrap(member, e))
    }

    fn on_method(&mut self, name: &str, member: String, parameters: &[Dependency]) -> Result<()> {
        let args = resolve_all(self.container, self.owner, name, parameters)?;
        self.target
            .call_method(name, Arguments::new(member.clone(), args))
            .map_err(|e| DiError::wrap(member, e))
    }
}

fn resolve_all(
    container: &Container,
    owner: &str,
    callable: &str,
    parameters: &[Dependency],
) -> Result<Vec<Injected>> {
    parameters
        .iter()
        .enumerate()
        .map(|(index, dependency)| dependency.resolve(container, parameter_member(owner, callable, index)))
        .collect()
}

/// Validate one reflective type against the registry.
pub(crate) fn validate(registry: &ObjectRegistry, reflective: &ReflectiveType) -> Result<()> {
    let constructor = reflective.constructor();
    let points = reflective.injection_points();
    let owner = reflective.key().name();
    let mut visitor = ValidationVisitor { registry };
    InjectionScanner::traverse(
        ScanMode::Validate,
        owner,
        Some(&constructor),
        &points,
        &mut visitor,
    )
}

/// Field and method injection into an existing value.
pub(crate) fn inject<T: InjectionTarget>(container: &Container, target: &mut T) -> Result<()> {
    let owner = std::any::type_name::<T>();
    let points = T::injection_points();

    #[cfg(feature = "logging")]
    trace!(
        target: "object_factory",
        service = owner,
        points = points.len(),
        "Injecting fields and methods"
    );

    let mut visitor = InjectingVisitor {
        owner,
        container,
        target,
    };
    InjectionScanner::traverse(ScanMode::Execute, owner, None, &points, &mut visitor)
}

/// Construct, inject and initialize a component.
pub(crate) fn build_component<C: Component>(container: &Container) -> Result<AnyArc> {
    let owner = std::any::type_name::<C>();
    let args = match C::constructor() {
        Constructor::NoArgs => Arguments::new(format!("{owner}::new"), Vec::new()),
        Constructor::Inject(parameters) => {
            let values = resolve_all(container, owner, "new", &parameters)?;
            Arguments::new(format!("{owner}::new"), values)
        }
    };

    let mut object = C::construct(args).map_err(|e| DiError::wrap(format!("{owner}::construct"), e))?;
    inject(container, &mut object)?;
    C::lifecycle().run_post_construct(owner, &object)?;
    Ok(Arc::new(object) as AnyArc)
}

/// Run a component's pre-destroy hooks.
pub(crate) fn destroy_component<C: Component>(value: &AnyArc) -> Result<()> {
    let owner = std::any::type_name::<C>();
    let object = value
        .downcast_ref::<C>()
        .ok_or_else(|| DiError::reflection(format!("{owner}::destroy"), "type mismatch"))?;
    C::lifecycle().run_pre_destroy(owner, object)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{BoxError, Qualifier, Registration};

    #[derive(Default)]
    struct Recorder {
        visited: Vec<String>,
    }

    impl InjectionVisitor for Recorder {
        fn on_parameter(&mut self, member: String, _: &Dependency) -> Result<()> {
            self.visited.push(member);
            Ok(())
        }

        fn on_field(&mut self, _: &str, member: String, _: &Dependency) -> Result<()> {
            self.visited.push(member);
            Ok(())
        }

        fn on_method(&mut self, _: &str, member: String, _: &[Dependency]) -> Result<()> {
            self.visited.push(member);
            Ok(())
        }
    }

    fn sample_points() -> InjectionPoints {
        InjectionPoints::new()
            .field("clock", Dependency::object::<u64>())
            .method("configure", vec![Dependency::object::<String>()])
    }

    #[test]
    fn test_validate_order() {
        let ctor = Constructor::inject(vec![Dependency::object::<u8>()]);
        let mut recorder = Recorder::default();
        InjectionScanner::traverse(ScanMode::Validate, "X", Some(&ctor), &sample_points(), &mut recorder)
            .unwrap();
        assert_eq!(
            recorder.visited,
            vec!["X::new(arg 0)", "X::configure(arg 0)", "X::clock"]
        );
    }

    #[test]
    fn test_execute_order() {
        let mut recorder = Recorder::default();
        InjectionScanner::traverse(ScanMode::Execute, "X", None, &sample_points(), &mut recorder).unwrap();
        assert_eq!(recorder.visited, vec!["X::clock", "X::configure()"]);
    }

    #[test]
    fn test_unused_callbacks_default_to_no_ops() {
        struct FieldsOnly(Vec<String>);

        impl InjectionVisitor for FieldsOnly {
            fn on_field(&mut self, _: &str, member: String, _: &Dependency) -> Result<()> {
                self.0.push(member);
                Ok(())
            }
        }

        let ctor = Constructor::inject(vec![Dependency::object::<u8>()]);
        for mode in [ScanMode::Validate, ScanMode::Execute] {
            let mut visitor = FieldsOnly(Vec::new());
            InjectionScanner::traverse(mode, "X", Some(&ctor), &sample_points(), &mut visitor).unwrap();
            assert_eq!(visitor.0, vec!["X::clock"]);
        }
    }

    #[test]
    fn test_validation_reports_member() {
        let registry = ObjectRegistry::new();
        registry.insert(Registration::instance(String::from("a")).into_definition());
        registry.insert(Registration::instance(String::from("b")).into_definition());
        let mut visitor = ValidationVisitor { registry: &registry };

        let ok = visitor.on_parameter("X::new(arg 0)".into(), &Dependency::container());
        assert!(ok.is_ok());

        let err = visitor
            .on_field("name", "X::name".into(), &Dependency::object::<String>())
            .unwrap_err();
        assert!(matches!(&err, DiError::Definition(d) if d.member.as_deref() == Some("X::name")));
        assert!(err.is_ambiguous());

        let err = visitor
            .on_parameter(
                "X::new(arg 1)".into(),
                &Dependency::object::<String>().qualified(Qualifier::named("missing")),
            )
            .unwrap_err();
        assert!(err.is_unsatisfied());
    }

    struct Greeting {
        text: String,
        suffix: Option<Arc<String>>,
    }

    impl InjectionTarget for Greeting {
        fn injection_points() -> InjectionPoints {
            InjectionPoints::new().field("suffix", Dependency::object::<String>())
        }

        fn set_field(&mut self, field: &str, value: Injected) -> std::result::Result<(), BoxError> {
            match field {
                "suffix" => self.suffix = Some(value.into_object()?),
                _ => return Err(format!("unknown field {field}").into()),
            }
            Ok(())
        }
    }

    impl Component for Greeting {
        fn construct(_: Arguments) -> std::result::Result<Self, BoxError> {
            Ok(Greeting {
                text: "hello".into(),
                suffix: None,
            })
        }
    }

    #[test]
    fn test_build_component_injects_fields() {
        let container = Container::new();
        container.register(Registration::instance(String::from("!"))).unwrap();

        let built = build_component::<Greeting>(&container).unwrap();
        let greeting = built.downcast_ref::<Greeting>().unwrap();
        assert_eq!(greeting.text, "hello");
        assert_eq!(greeting.suffix.as_deref().map(String::as_str), Some("!"));
    }
}
