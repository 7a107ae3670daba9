//! Parameter values: one opaque payload plus the labels its display name is resolved from.

use std::any::{Any, TypeId};
use std::collections::{BTreeMap, HashMap};
use std::fmt;
use std::sync::Arc;

use paramtest_core::errors::empty_display_name;

/// Key a map payload uses to expose its display name.
pub const MAP_NAME_KEY: &str = "name";

/// Implemented by payloads that know their own display name.
pub trait DisplayName {
    fn display_name(&self) -> String;
}

/// One value produced by a parameter source.
///
/// Cloning is cheap: the payload is shared.
#[derive(Clone)]
pub struct Parameter {
    payload: Arc<dyn Any + Send + Sync>,
    type_name: &'static str,
    own_name: Option<String>,
    mapped_name: Option<String>,
    default_name: String,
}

impl Parameter {
    /// Wrap a value; its display name falls back to the map `"name"` entry, then to its string form.
    pub fn new<T: Any + Send + Sync + fmt::Debug>(value: T) -> Self {
        let mapped_name = mapped_name(&value);
        let default_name = default_name(&value);
        Self {
            payload: Arc::new(value),
            type_name: std::any::type_name::<T>(),
            own_name: None,
            mapped_name,
            default_name,
        }
    }

    /// Wrap a value under an explicit name supplied by the source.
    pub fn named<T: Any + Send + Sync + fmt::Debug>(name: impl Into<String>, value: T) -> Self {
        Self {
            own_name: Some(name.into()),
            ..Self::new(value)
        }
    }

    /// Wrap a value that exposes its own display name.
    pub fn described<T: DisplayName + Any + Send + Sync + fmt::Debug>(value: T) -> Self {
        let own = value.display_name();
        Self::named(own, value)
    }

    pub fn payload(&self) -> &(dyn Any + Send + Sync) {
        &*self.payload
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.payload.downcast_ref::<T>()
    }

    pub fn payload_type_id(&self) -> TypeId {
        let payload: &(dyn Any + Send + Sync) = &*self.payload;
        payload.type_id()
    }

    pub fn type_name(&self) -> &'static str {
        self.type_name
    }

    /// Resolve the display name for the value at `index` in its supplier sequence.
    ///
    /// Order: own name, map `"name"` entry, default string form, then `"[<index>] (empty)"`.
    pub fn display_name(&self, index: usize) -> String {
        [self.own_name.as_deref(), self.mapped_name.as_deref(), Some(self.default_name.as_str())]
            .into_iter()
            .flatten()
            .find(|name| !name.is_empty())
            .map(str::to_string)
            .unwrap_or_else(|| empty_display_name(index))
    }
}

impl fmt::Debug for Parameter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Parameter")
            .field("type", &self.type_name)
            .field("own_name", &self.own_name)
            .field("mapped_name", &self.mapped_name)
            .field("default_name", &self.default_name)
            .finish()
    }
}

fn mapped_name(value: &dyn Any) -> Option<String> {
    if let Some(map) = value.downcast_ref::<BTreeMap<String, String>>() {
        return map.get(MAP_NAME_KEY).cloned();
    }
    if let Some(map) = value.downcast_ref::<HashMap<String, String>>() {
        return map.get(MAP_NAME_KEY).cloned();
    }
    None
}

fn default_name<T: Any + fmt::Debug>(value: &T) -> String {
    let any: &dyn Any = value;
    if let Some(s) = any.downcast_ref::<String>() {
        return s.clone();
    }
    if let Some(s) = any.downcast_ref::<&'static str>() {
        return (*s).to_string();
    }
    format!("{value:?}")
}

/// Conversion of a single source element into a [`Parameter`].
///
/// `&'static str` values are stored as `String` payloads, so setters take `&String`.
pub trait IntoParameter {
    fn into_parameter(self) -> Parameter;
}

impl IntoParameter for Parameter {
    fn into_parameter(self) -> Parameter {
        self
    }
}

impl IntoParameter for &'static str {
    fn into_parameter(self) -> Parameter {
        Parameter::new(self.to_string())
    }
}

macro_rules! into_parameter_by_value {
    ($($ty:ty),* $(,)?) => {
        $(
            impl IntoParameter for $ty {
                fn into_parameter(self) -> Parameter {
                    Parameter::new(self)
                }
            }
        )*
    };
}

into_parameter_by_value!(
    String,
    bool,
    char,
    i8,
    i16,
    i32,
    i64,
    i128,
    isize,
    u8,
    u16,
    u32,
    u64,
    u128,
    usize,
    f32,
    f64,
    BTreeMap<String, String>,
    HashMap<String, String>,
);

/// Conversion of a parameter source's return value into a sequence; `None` models a null result.
pub trait IntoParameterSequence {
    fn into_parameters(self) -> Option<Vec<Parameter>>;
}

impl<P: IntoParameter> IntoParameterSequence for Vec<P> {
    fn into_parameters(self) -> Option<Vec<Parameter>> {
        Some(self.into_iter().map(IntoParameter::into_parameter).collect())
    }
}

impl<P: IntoParameter> IntoParameterSequence for Option<Vec<P>> {
    fn into_parameters(self) -> Option<Vec<Parameter>> {
        self.and_then(IntoParameterSequence::into_parameters)
    }
}
