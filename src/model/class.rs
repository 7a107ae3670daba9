//! Typed class registry.
//!
//! A test class is registered once through [`ClassDef`], a builder over the concrete subject type `T`. Every
//! lifecycle method is a category-specific closure or function item; [`ClassDef::build`] erases `T` and
//! freezes the declarations into an immutable [`ClassRecord`].
//!
//! ## Ancestry
//!
//! Rust has no class inheritance. A class "extends" another by embedding the ancestor's subject and handing
//! [`ClassDef::extends`] a projection to it. The resolver walks [`ClassRecord::levels`] and lifts ancestor
//! methods through the composed projections, so they run against the embedded state.
//!
//! ## Examples
//! ```rust
//! use paramtest::ClassDef;
//!
//! #[derive(Default)]
//! struct Counter {
//!     value: u32,
//! }
//!
//! let record = ClassDef::<Counter>::new("demo::Counter")
//!     .constructor(Counter::default)
//!     .parameter_field("VALUES", &[1u32, 2, 3])
//!     .parameter_setter("set", |c: &mut Counter, v: &u32| c.value = *v)
//!     .test("non_zero", |c: &mut Counter| assert!(c.value > 0))
//!     .build();
//! assert_eq!(record.name(), "demo::Counter");
//! ```

use std::any::{Any, TypeId};
use std::fmt;
use std::marker::PhantomData;
use std::sync::Arc;

use paramtest_core::lang::lifecycle::{LifecycleCategory, Receiver};

use super::parameter::{IntoParameter, IntoParameterSequence, Parameter};
use super::result::{Fault, IntoOutcome};

/// The type-erased live test subject.
pub type Subject = dyn Any + 'static;

pub type StaticFn = Arc<dyn Fn() -> Result<(), Fault> + Send + Sync>;
pub type InstanceFn = Arc<dyn Fn(&mut Subject) -> Result<(), Fault> + Send + Sync>;
pub type SetterFn = Arc<dyn Fn(&mut Subject, &Parameter) -> Result<(), Fault> + Send + Sync>;
pub type SourceFn = Arc<dyn Fn() -> Option<Vec<Parameter>> + Send + Sync>;
pub type Factory = Arc<dyn Fn() -> Box<Subject> + Send + Sync>;
/// Maps a subclass subject onto the ancestor subject it embeds.
pub type Projection = Arc<dyn Fn(&mut Subject) -> Option<&mut Subject> + Send + Sync>;

/// Build a [`Projection`] from a closure; the bound pins down the higher-ranked signature.
pub fn projection<F>(f: F) -> Projection
where
    F: for<'a> Fn(&'a mut Subject) -> Option<&'a mut Subject> + Send + Sync + 'static,
{
    Arc::new(f)
}

/// Compose two projections: first `outer`, then `inner` on its result.
pub fn compose(outer: &Projection, inner: &Projection) -> Projection {
    let (outer, inner) = (outer.clone(), inner.clone());
    projection(move |subject| outer(subject).and_then(|embedded| inner(embedded)))
}

fn downcast<T: Any>(subject: &mut Subject) -> Result<&mut T, Fault> {
    subject
        .downcast_mut::<T>()
        .ok_or_else(|| Fault::engine(format!("live subject is not a `{}`", std::any::type_name::<T>())))
}

/// How a lifecycle method is dispatched.
#[derive(Clone)]
pub enum Invoker {
    Static(StaticFn),
    Instance(InstanceFn),
}

impl Invoker {
    pub fn receiver(&self) -> Receiver {
        match self {
            Invoker::Static(_) => Receiver::Static,
            Invoker::Instance(_) => Receiver::Instance,
        }
    }

    /// Re-target an ancestor's instance method at the subclass subject.
    pub fn lift(&self, projection: &Projection) -> Invoker {
        match self {
            Invoker::Static(f) => Invoker::Static(f.clone()),
            Invoker::Instance(f) => {
                let (f, projection) = (f.clone(), projection.clone());
                Invoker::Instance(Arc::new(move |subject: &mut Subject| match projection(subject) {
                    Some(embedded) => f(embedded),
                    None => Err(Fault::engine("live subject does not embed the declaring class")),
                }))
            }
        }
    }
}

impl fmt::Debug for Invoker {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Invoker::Static(_) => f.write_str("Invoker::Static"),
            Invoker::Instance(_) => f.write_str("Invoker::Instance"),
        }
    }
}

/// One lifecycle method as declared on one class.
#[derive(Debug, Clone)]
pub struct MethodDecl {
    pub name: String,
    pub category: LifecycleCategory,
    pub order: Option<i32>,
    pub disabled: bool,
    pub display_name: Option<String>,
    /// Arguments besides the receiver.
    pub arity: u8,
    pub invoker: Invoker,
}

impl MethodDecl {
    pub fn new(name: impl Into<String>, category: LifecycleCategory, invoker: Invoker) -> Self {
        Self {
            name: name.into(),
            category,
            order: None,
            disabled: false,
            display_name: None,
            arity: 0,
            invoker,
        }
    }
}

/// Whether a parameter source holds pre-built values or produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SourceKind {
    Field,
    Method,
}

/// A declared parameter source.
#[derive(Clone)]
pub struct SourceDecl {
    pub name: String,
    pub kind: SourceKind,
    pub produce: SourceFn,
}

impl fmt::Debug for SourceDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SourceDecl").field("name", &self.name).field("kind", &self.kind).finish()
    }
}

/// A declared parameter setter, accepting payloads of one type.
#[derive(Clone)]
pub struct SetterDecl {
    pub name: String,
    pub payload_type: TypeId,
    pub payload_name: &'static str,
    pub invoke: SetterFn,
}

impl SetterDecl {
    /// Re-target an ancestor's setter at the subclass subject.
    pub fn lift(&self, projection: &Projection) -> SetterDecl {
        let (invoke, projection) = (self.invoke.clone(), projection.clone());
        SetterDecl {
            invoke: Arc::new(move |subject: &mut Subject, parameter: &Parameter| match projection(subject) {
                Some(embedded) => invoke(embedded, parameter),
                None => Err(Fault::engine("live subject does not embed the declaring class")),
            }),
            ..self.clone()
        }
    }
}

impl fmt::Debug for SetterDecl {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SetterDecl")
            .field("name", &self.name)
            .field("payload", &self.payload_name)
            .finish()
    }
}

/// The class a record extends, plus the projection to its embedded subject.
#[derive(Clone)]
pub struct Ancestor {
    pub record: Arc<ClassRecord>,
    pub projection: Projection,
}

/// One level of a class's ancestor chain, most specific first.
pub struct Level<'a> {
    pub record: &'a ClassRecord,
    /// `None` for the class itself; otherwise the composed projection onto this ancestor.
    pub projection: Option<Projection>,
    pub depth: usize,
}

/// One discovered test-subject type. Immutable once built.
#[derive(Clone)]
pub struct ClassRecord {
    name: String,
    display_name: Option<String>,
    disabled: bool,
    base: bool,
    tags: Vec<String>,
    subject_type: &'static str,
    factory: Option<Factory>,
    declarations: Vec<MethodDecl>,
    sources: Vec<SourceDecl>,
    setters: Vec<SetterDecl>,
    parent: Option<Ancestor>,
}

impl ClassRecord {
    /// Qualified name; the total order of discovery is over this value.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Display name override, or the qualified name.
    pub fn display_name(&self) -> &str {
        self.display_name.as_deref().unwrap_or(&self.name)
    }

    pub fn is_disabled(&self) -> bool {
        self.disabled
    }

    pub fn is_base(&self) -> bool {
        self.base
    }

    pub fn tags(&self) -> &[String] {
        &self.tags
    }

    pub fn subject_type(&self) -> &'static str {
        self.subject_type
    }

    pub fn has_constructor(&self) -> bool {
        self.factory.is_some()
    }

    /// Create a fresh subject, if a constructor was registered.
    pub fn instantiate(&self) -> Option<Box<Subject>> {
        self.factory.as_ref().map(|factory| factory())
    }

    /// Methods declared on this class itself, in declaration order.
    pub fn declarations(&self) -> &[MethodDecl] {
        &self.declarations
    }

    pub fn sources(&self) -> &[SourceDecl] {
        &self.sources
    }

    pub fn setters(&self) -> &[SetterDecl] {
        &self.setters
    }

    pub fn parent(&self) -> Option<&Ancestor> {
        self.parent.as_ref()
    }

    /// Every name this class declares itself, across methods, sources, and setters.
    pub fn declared_names(&self) -> impl Iterator<Item = &str> {
        self.declarations
            .iter()
            .map(|d| d.name.as_str())
            .chain(self.sources.iter().map(|s| s.name.as_str()))
            .chain(self.setters.iter().map(|s| s.name.as_str()))
    }

    /// Walk from this class up through its ancestors.
    pub fn levels(&self) -> Vec<Level<'_>> {
        let mut levels = vec![Level {
            record: self,
            projection: None,
            depth: 0,
        }];
        let mut current = self;
        let mut accumulated: Option<Projection> = None;
        while let Some(ancestor) = current.parent.as_ref() {
            let next = match &accumulated {
                None => ancestor.projection.clone(),
                Some(outer) => compose(outer, &ancestor.projection),
            };
            accumulated = Some(next);
            current = &*ancestor.record;
            levels.push(Level {
                record: current,
                projection: accumulated.clone(),
                depth: levels.len(),
            });
        }
        levels
    }
}

impl fmt::Debug for ClassRecord {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassRecord")
            .field("name", &self.name)
            .field("display_name", &self.display_name)
            .field("disabled", &self.disabled)
            .field("base", &self.base)
            .field("tags", &self.tags)
            .field("declarations", &self.declarations.len())
            .field("sources", &self.sources)
            .field("setters", &self.setters)
            .field("parent", &self.parent.as_ref().map(|p| p.record.name()))
            .finish()
    }
}

/// Types that register themselves as test classes (usually via `#[test_class]`).
pub trait TestClass: Any + Sized {
    fn definition() -> ClassDef<Self>;

    fn record() -> Arc<ClassRecord> {
        Self::definition().build()
    }
}

/// Declarative builder for a [`ClassRecord`] over subject type `T`.
pub struct ClassDef<T> {
    record: ClassRecord,
    _subject: PhantomData<fn() -> T>,
}

impl<T: Any> ClassDef<T> {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            record: ClassRecord {
                name: name.into(),
                display_name: None,
                disabled: false,
                base: false,
                tags: Vec::new(),
                subject_type: std::any::type_name::<T>(),
                factory: None,
                declarations: Vec::new(),
                sources: Vec::new(),
                setters: Vec::new(),
                parent: None,
            },
            _subject: PhantomData,
        }
    }

    /// Register how to instantiate the subject; called once per class run.
    pub fn constructor<F>(mut self, factory: F) -> Self
    where
        F: Fn() -> T + Send + Sync + 'static,
    {
        self.record.factory = Some(Arc::new(move || Box::new(factory()) as Box<Subject>));
        self
    }

    pub fn display_name(mut self, name: impl Into<String>) -> Self {
        self.record.display_name = Some(name.into());
        self
    }

    pub fn disabled(mut self) -> Self {
        self.record.disabled = true;
        self
    }

    /// Mark the class as inheritable only.
    pub fn base_class(mut self) -> Self {
        self.record.base = true;
        self
    }

    pub fn tag(mut self, tag: impl Into<String>) -> Self {
        self.record.tags.push(tag.into());
        self
    }

    /// Extend `parent`, whose subject is reachable from ours through `via`.
    pub fn extends<B, F>(mut self, parent: ClassDef<B>, via: F) -> Self
    where
        B: Any,
        F: Fn(&mut T) -> &mut B + Send + Sync + 'static,
    {
        let projection = projection(move |subject: &mut Subject| {
            subject.downcast_mut::<T>().map(|own| via(own) as &mut Subject)
        });
        self.record.parent = Some(Ancestor {
            record: parent.build(),
            projection,
        });
        self
    }

    pub fn before_all<F, R>(self, name: &str, hook: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.declare_static(name, LifecycleCategory::ClassSetup, hook)
    }

    pub fn after_all<F, R>(self, name: &str, hook: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.declare_static(name, LifecycleCategory::ClassTeardown, hook)
    }

    pub fn before_parameter<F, R>(self, name: &str, hook: F) -> Self
    where
        F: Fn(&mut T) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.declare_instance(name, LifecycleCategory::ParameterSetup, hook)
    }

    pub fn after_parameter<F, R>(self, name: &str, hook: F) -> Self
    where
        F: Fn(&mut T) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.declare_instance(name, LifecycleCategory::ParameterTeardown, hook)
    }

    pub fn before_each<F, R>(self, name: &str, hook: F) -> Self
    where
        F: Fn(&mut T) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.declare_instance(name, LifecycleCategory::MethodSetup, hook)
    }

    pub fn test<F, R>(self, name: &str, body: F) -> Self
    where
        F: Fn(&mut T) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.declare_instance(name, LifecycleCategory::Test, body)
    }

    pub fn after_each<F, R>(self, name: &str, hook: F) -> Self
    where
        F: Fn(&mut T) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        self.declare_instance(name, LifecycleCategory::MethodTeardown, hook)
    }

    /// Declare a zero-argument routine producing the parameter values (`Option::None` models null).
    pub fn parameter_source<F, S>(mut self, name: &str, source: F) -> Self
    where
        F: Fn() -> S + Send + Sync + 'static,
        S: IntoParameterSequence,
    {
        self.record.sources.push(SourceDecl {
            name: name.to_string(),
            kind: SourceKind::Method,
            produce: Arc::new(move || source().into_parameters()),
        });
        self
    }

    /// Declare a field holding pre-built parameter values.
    pub fn parameter_field<P>(mut self, name: &str, values: &'static [P]) -> Self
    where
        P: IntoParameter + Clone + Sync + 'static,
    {
        self.record.sources.push(SourceDecl {
            name: name.to_string(),
            kind: SourceKind::Field,
            produce: Arc::new(move || Some(values.iter().cloned().map(IntoParameter::into_parameter).collect())),
        });
        self
    }

    /// Declare the method receiving each parameter value; payloads must be of type `P`.
    pub fn parameter_setter<P, F, R>(mut self, name: &str, setter: F) -> Self
    where
        P: Any,
        F: Fn(&mut T, &P) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        let invoke: SetterFn = Arc::new(move |subject: &mut Subject, parameter: &Parameter| {
            let own = downcast::<T>(subject)?;
            let value = parameter.downcast_ref::<P>().ok_or_else(|| {
                Fault::engine(format!(
                    "parameter of type `{}` cannot be passed as `{}`",
                    parameter.type_name(),
                    std::any::type_name::<P>()
                ))
            })?;
            setter(own, value).into_outcome()
        });
        self.record.setters.push(SetterDecl {
            name: name.to_string(),
            payload_type: TypeId::of::<P>(),
            payload_name: std::any::type_name::<P>(),
            invoke,
        });
        self
    }

    /// Give the methods declared under `name` on this class an explicit order.
    pub fn with_order(mut self, name: &str, order: i32) -> Self {
        for decl in self.record.declarations.iter_mut().filter(|d| d.name == name) {
            decl.order = Some(order);
        }
        self
    }

    /// Disable the methods declared under `name` on this class.
    pub fn disable(mut self, name: &str) -> Self {
        for decl in self.record.declarations.iter_mut().filter(|d| d.name == name) {
            decl.disabled = true;
        }
        self
    }

    pub fn method_display_name(mut self, name: &str, display_name: impl Into<String>) -> Self {
        let display_name = display_name.into();
        for decl in self.record.declarations.iter_mut().filter(|d| d.name == name) {
            decl.display_name = Some(display_name.clone());
        }
        self
    }

    /// Push a hand-assembled declaration. The resolver still checks it against its category.
    pub fn declare(mut self, decl: MethodDecl) -> Self {
        self.record.declarations.push(decl);
        self
    }

    pub fn build(self) -> Arc<ClassRecord> {
        Arc::new(self.record)
    }

    /// Declare a receiver-less method under an arbitrary category.
    pub fn declare_static<F, R>(self, name: &str, category: LifecycleCategory, hook: F) -> Self
    where
        F: Fn() -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        let invoke: StaticFn = Arc::new(move || hook().into_outcome());
        self.declare(MethodDecl::new(name, category, Invoker::Static(invoke)))
    }

    /// Declare a method taking the subject under an arbitrary category.
    pub fn declare_instance<F, R>(self, name: &str, category: LifecycleCategory, hook: F) -> Self
    where
        F: Fn(&mut T) -> R + Send + Sync + 'static,
        R: IntoOutcome,
    {
        let invoke: InstanceFn = Arc::new(move |subject: &mut Subject| {
            let own = downcast::<T>(subject)?;
            hook(own).into_outcome()
        });
        self.declare(MethodDecl::new(name, category, Invoker::Instance(invoke)))
    }
}
