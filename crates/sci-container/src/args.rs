//! Arguments passed into `make` and the values handed to constructors.

use std::{any::type_name, any::Any, collections::BTreeMap, sync::Arc};

use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    error::{ContainerError, Result},
    instance::{Instance, Root},
};

/// A single argument: either plain data or an already built object.
#[derive(Clone, Debug)]
pub enum Arg {
    Value(Value),
    Object(Instance),
}

impl Arg {
    pub fn as_instance(&self) -> Option<&Instance> {
        match self {
            Arg::Object(instance) => Some(instance),
            Arg::Value(_) => None,
        }
    }

    pub fn into_instance(self) -> Option<Instance> {
        match self {
            Arg::Object(instance) => Some(instance),
            Arg::Value(_) => None,
        }
    }

    pub fn as_value(&self) -> Option<&Value> {
        match self {
            Arg::Value(value) => Some(value),
            Arg::Object(_) => None,
        }
    }
}

impl From<Instance> for Arg {
    fn from(instance: Instance) -> Self {
        Arg::Object(instance)
    }
}

impl<T: Into<Value>> From<T> for Arg {
    fn from(value: T) -> Self {
        Arg::Value(value.into())
    }
}

/// Named and positional arguments for a resolution request.
///
/// Lookups check the parameter name first and fall back to its position.
#[derive(Clone, Debug, Default)]
pub struct Args {
    named: BTreeMap<String, Arg>,
    positional: Vec<Arg>,
}

impl Args {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds (or replaces) a named argument.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Arg>) -> Self {
        self.named.insert(name.into(), value.into());
        self
    }

    /// Appends a positional argument.
    pub fn push(mut self, value: impl Into<Arg>) -> Self {
        self.positional.push(value.into());
        self
    }

    pub fn named(&self, name: &str) -> Option<&Arg> {
        self.named.get(name)
    }

    pub fn positional(&self) -> &[Arg] {
        &self.positional
    }

    pub fn lookup(&self, name: &str, index: usize) -> Option<&Arg> {
        self.named(name).or_else(|| self.positional.get(index))
    }

    pub fn is_empty(&self) -> bool {
        self.named.is_empty() && self.positional.is_empty()
    }

    /// Interprets a JSON object as named arguments and a JSON array as
    /// positional ones. Anything else is not an argument list.
    pub fn from_value(value: &Value) -> Option<Self> {
        match value {
            Value::Object(map) => Some(Self {
                named: map
                    .iter()
                    .map(|(k, v)| (k.clone(), Arg::Value(v.clone())))
                    .collect(),
                positional: Vec::new(),
            }),
            Value::Array(items) => Some(Self {
                named: BTreeMap::new(),
                positional: items.iter().cloned().map(Arg::Value).collect(),
            }),
            _ => None,
        }
    }
}

/// Resolved parameter values handed to a constructor or method.
#[derive(Debug)]
pub struct Injected {
    owner: String,
    values: Vec<(String, Arg)>,
    root: Option<Root>,
}

impl Injected {
    pub(crate) fn new(owner: impl Into<String>, values: Vec<(String, Arg)>, root: Option<Root>) -> Self {
        Self {
            owner: owner.into(),
            values,
            root,
        }
    }

    pub fn get(&self, name: &str) -> Option<&Arg> {
        self.values
            .iter()
            .find(|(param, _)| param == name)
            .map(|(_, arg)| arg)
    }

    pub fn instance(&self, name: &str) -> Result<Instance> {
        match self.require(name)? {
            Arg::Object(instance) => Ok(instance.clone()),
            Arg::Value(_) => Err(self.mismatch(name, "an object")),
        }
    }

    /// The object bound to `name`, downcast to `T`.
    pub fn object<T: Any + Send + Sync>(&self, name: &str) -> Result<Arc<T>> {
        self.instance(name)?
            .downcast::<T>()
            .ok_or_else(|| self.mismatch(name, type_name::<T>()))
    }

    /// The scalar bound to `name`, deserialized into `T`.
    pub fn value<T: DeserializeOwned>(&self, name: &str) -> Result<T> {
        match self.require(name)? {
            Arg::Value(value) => {
                serde_json::from_value(value.clone()).map_err(|_| self.mismatch(name, type_name::<T>()))
            }
            Arg::Object(_) => Err(self.mismatch(name, type_name::<T>())),
        }
    }

    pub fn root(&self) -> Option<&Root> {
        self.root.as_ref()
    }

    fn require(&self, name: &str) -> Result<&Arg> {
        self.get(name).ok_or_else(|| {
            ContainerError::MissingArgument {
                class: self.owner.clone(),
                parameter: name.to_string(),
            }
        })
    }

    fn mismatch(&self, name: &str, expected: &str) -> ContainerError {
        ContainerError::TypeMismatch {
            context: format!("{}::{}", self.owner, name),
            expected: expected.to_string(),
        }
    }
}
