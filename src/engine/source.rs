//! Parameter source validation.
//!
//! A runnable class needs exactly one parameter source (a field or a method, after masking) and exactly one
//! parameter setter. The source is read once; every value it yields must carry the payload type the setter
//! accepts.

use paramtest_core::errors::SUPPLIER_EMPTY;
use tracing::{debug, warn};

use crate::model::class::{ClassRecord, SetterDecl, SourceDecl, SourceKind};
use crate::model::parameter::Parameter;

use super::errors::ConfigError;
use super::invoke::{self, InvokeSettings};
use super::resolver::{AnnotationResolver, Visible};

/// The materialized parameter sequence of one class and the setter that receives it.
#[derive(Debug, Clone)]
pub struct ValidatedSource {
    pub source_name: String,
    pub parameters: Vec<Parameter>,
    pub setter: SetterDecl,
}

pub struct ParameterSourceValidator<'r> {
    resolver: &'r AnnotationResolver,
    settings: InvokeSettings,
}

impl<'r> ParameterSourceValidator<'r> {
    pub fn new(resolver: &'r AnnotationResolver) -> Self {
        Self {
            resolver,
            settings: InvokeSettings {
                capture_backtrace: false,
                ..InvokeSettings::default()
            },
        }
    }

    /// Locate the source and setter, read the source, and check what it produced.
    ///
    /// An empty sequence yields [`ConfigError::EmptySource`], which callers treat as class-local.
    pub fn validate(&self, class: &ClassRecord) -> Result<ValidatedSource, ConfigError> {
        let source = self.locate_source(class)?;
        let setter = self.locate_setter(class)?;
        let parameters = self.materialize(class, &source.decl)?;

        if parameters.is_empty() {
            warn!(class = class.name(), source = %source.decl.name, "{}", SUPPLIER_EMPTY);
            return Err(ConfigError::EmptySource {
                class: class.name().to_string(),
            });
        }

        for (index, parameter) in parameters.iter().enumerate() {
            if parameter.payload_type_id() != setter.payload_type {
                return Err(ConfigError::WrongElementType {
                    class: class.name().to_string(),
                    source_name: source.decl.name.clone(),
                    index,
                    expected: setter.payload_name,
                    found: parameter.type_name(),
                });
            }
        }

        debug!(
            class = class.name(),
            source = %source.decl.name,
            declared_in = %source.declared_in,
            count = parameters.len(),
            "parameter source validated"
        );
        Ok(ValidatedSource {
            source_name: source.decl.name,
            parameters,
            setter,
        })
    }

    fn locate_source(&self, class: &ClassRecord) -> Result<Visible<SourceDecl>, ConfigError> {
        let sources = self.resolver.sources(class);
        let (fields, methods): (Vec<_>, Vec<_>) = sources.into_iter().partition(|s| s.decl.kind == SourceKind::Field);
        let class_name = class.name().to_string();

        match (fields.len(), methods.len()) {
            (0, 0) => Err(ConfigError::MissingSource { class: class_name }),
            (1, 0) => Ok(take_single(fields)),
            (0, 1) => Ok(take_single(methods)),
            (f, m) if f > 0 && m > 0 => Err(ConfigError::ConflictingSources {
                class: class_name,
                field: join_names(fields.iter().map(|s| s.decl.name.as_str())),
                method: join_names(methods.iter().map(|s| s.decl.name.as_str())),
            }),
            (f, _) if f > 1 => Err(ConfigError::DuplicateSources {
                class: class_name,
                kind: "field",
                count: f,
                names: join_names(fields.iter().map(|s| s.decl.name.as_str())),
            }),
            (_, m) => Err(ConfigError::DuplicateSources {
                class: class_name,
                kind: "method",
                count: m,
                names: join_names(methods.iter().map(|s| s.decl.name.as_str())),
            }),
        }
    }

    fn locate_setter(&self, class: &ClassRecord) -> Result<SetterDecl, ConfigError> {
        let mut setters = self.resolver.setters(class);
        match setters.len() {
            0 => Err(ConfigError::MissingSetter {
                class: class.name().to_string(),
            }),
            1 => Ok(setters.remove(0).decl),
            count => Err(ConfigError::DuplicateSetters {
                class: class.name().to_string(),
                count,
                names: join_names(setters.iter().map(|s| s.decl.name.as_str())),
            }),
        }
    }

    fn materialize(&self, class: &ClassRecord, source: &SourceDecl) -> Result<Vec<Parameter>, ConfigError> {
        let produced = invoke::guarded(&self.settings, || (source.produce)()).map_err(|caught| {
            ConfigError::SourcePanicked {
                class: class.name().to_string(),
                source_name: source.name.clone(),
                message: caught.fault().map(|f| f.message.clone()).unwrap_or_default(),
            }
        })?;
        produced.ok_or_else(|| ConfigError::NullSource {
            class: class.name().to_string(),
            source_name: source.name.clone(),
        })
    }
}

fn take_single<T>(mut items: Vec<Visible<T>>) -> Visible<T> {
    items.swap_remove(0)
}

fn join_names<'a>(names: impl Iterator<Item = &'a str>) -> String {
    names.collect::<Vec<_>>().join(", ")
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;
    use crate::model::class::ClassDef;

    #[derive(Default)]
    struct Holder {
        value: String,
    }

    static WORDS: &[&str] = &["a", "b"];

    fn validate(record: &ClassRecord) -> Result<ValidatedSource, ConfigError> {
        let resolver = AnnotationResolver::new();
        ParameterSourceValidator::new(&resolver).validate(record)
    }

    fn def(name: &str) -> ClassDef<Holder> {
        ClassDef::<Holder>::new(name)
            .constructor(Holder::default)
            .parameter_setter("set", |s: &mut Holder, v: &String| s.value = v.clone())
    }

    #[test]
    fn test_field_source_is_materialized_in_order() {
        let validated = validate(&def("t::Field").parameter_field("WORDS", WORDS).build()).unwrap();
        assert_eq!(validated.source_name, "WORDS");
        let names: Vec<_> = validated.parameters.iter().map(|p| p.display_name(0)).collect();
        assert_eq!(names, vec!["a", "b"]);
    }

    #[test]
    fn test_both_field_and_method_is_an_error() {
        let record = def("t::Both")
            .parameter_field("WORDS", WORDS)
            .parameter_source("words", || vec!["x"])
            .build();
        let err = validate(&record).unwrap_err();
        assert!(matches!(err, ConfigError::ConflictingSources { .. }));
        assert!(err.to_string().contains("both field and method"));
    }

    #[test]
    fn test_missing_source_and_duplicate_methods() {
        assert!(matches!(
            validate(&def("t::None").build()).unwrap_err(),
            ConfigError::MissingSource { .. }
        ));
        let record = def("t::Two")
            .parameter_source("one", || vec!["x"])
            .parameter_source("two", || vec!["y"])
            .build();
        assert!(matches!(
            validate(&record).unwrap_err(),
            ConfigError::DuplicateSources { count: 2, kind: "method", .. }
        ));
    }

    #[test]
    fn test_setter_count_is_checked() {
        let none = ClassDef::<Holder>::new("t::NoSetter")
            .parameter_field("WORDS", WORDS)
            .build();
        assert!(matches!(validate(&none).unwrap_err(), ConfigError::MissingSetter { .. }));

        let two = def("t::TwoSetters")
            .parameter_field("WORDS", WORDS)
            .parameter_setter("again", |_: &mut Holder, _: &String| {})
            .build();
        assert!(matches!(
            validate(&two).unwrap_err(),
            ConfigError::DuplicateSetters { count: 2, .. }
        ));
    }

    #[test]
    fn test_null_empty_and_wrong_type() {
        let null = def("t::Null").parameter_source("none", || None::<Vec<String>>).build();
        assert!(matches!(validate(&null).unwrap_err(), ConfigError::NullSource { .. }));

        let empty = def("t::Empty").parameter_source("empty", Vec::<String>::new).build();
        let err = validate(&empty).unwrap_err();
        assert!(err.is_class_local());

        let wrong = def("t::Wrong").parameter_source("numbers", || vec![1u32]).build();
        match validate(&wrong).unwrap_err() {
            ConfigError::WrongElementType { index, found, .. } => {
                assert_eq!(index, 0);
                assert_eq!(found, "u32");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_panicking_source_is_a_config_error() {
        let record = def("t::Panics")
            .parameter_source("boom", || -> Vec<String> { panic!("no values today") })
            .build();
        match validate(&record).unwrap_err() {
            ConfigError::SourcePanicked { message, .. } => assert_eq!(message, "no values today"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
