//! Binding strategies and resolution targets.

use std::{fmt, sync::Arc};

use crate::{
    args::{Arg, Args},
    container::Container,
    error::Result,
    instance::Instance,
};

/// Closure invoked to produce a bound target.
pub type Factory = Arc<dyn Fn(&mut Container, &Args) -> Result<Arg> + Send + Sync>;

/// How a bound target is satisfied.
#[derive(Clone)]
pub enum Resolver {
    /// The same object on every resolution.
    Instance(Instance),
    /// Called on every resolution (once, for shared targets).
    Factory(Factory),
    /// Delegates to another class, interface or alias name.
    Class(String),
    /// Builds `class` and returns the result of calling `method` on it.
    Method { class: String, method: String },
}

impl Resolver {
    pub fn factory<F>(f: F) -> Self
    where
        F: Fn(&mut Container, &Args) -> Result<Arg> + Send + Sync + 'static,
    {
        Resolver::Factory(Arc::new(f))
    }

    /// Parses `Class` or `Class@method`.
    pub fn class(spec: impl Into<String>) -> Self {
        let spec = spec.into();
        match spec.split_once('@') {
            Some((class, method)) => {
                Resolver::Method {
                    class: class.to_string(),
                    method: method.to_string(),
                }
            }
            None => Resolver::Class(spec),
        }
    }
}

impl From<&str> for Resolver {
    fn from(spec: &str) -> Self {
        Resolver::class(spec)
    }
}

impl From<String> for Resolver {
    fn from(spec: String) -> Self {
        Resolver::class(spec)
    }
}

impl From<Instance> for Resolver {
    fn from(instance: Instance) -> Self {
        Resolver::Instance(instance)
    }
}

impl fmt::Debug for Resolver {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Resolver::Instance(instance) => write!(f, "instance of {}", instance.class()),
            Resolver::Factory(_) => write!(f, "factory"),
            Resolver::Class(class) => write!(f, "{class}"),
            Resolver::Method { class, method } => write!(f, "{class}@{method}"),
        }
    }
}

/// What a `make` call asks for.
#[derive(Clone, Debug)]
pub enum Target {
    /// A class, interface or alias name, or a `Class@method` / `Class::method` spec.
    Name(String),
    /// Build `class`, then call `method` on it.
    Method { class: String, method: String },
    /// An object that is returned as-is after being stamped.
    Object(Instance),
}

impl From<&str> for Target {
    fn from(name: &str) -> Self {
        Target::Name(name.to_string())
    }
}

impl From<String> for Target {
    fn from(name: String) -> Self {
        Target::Name(name)
    }
}

impl From<&String> for Target {
    fn from(name: &String) -> Self {
        Target::Name(name.clone())
    }
}

impl<C: Into<String>, M: Into<String>> From<(C, M)> for Target {
    fn from((class, method): (C, M)) -> Self {
        Target::Method {
            class: class.into(),
            method: method.into(),
        }
    }
}

impl From<Instance> for Target {
    fn from(instance: Instance) -> Self {
        Target::Object(instance)
    }
}

/// A name target split into its call form.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Spec<'a> {
    InstanceMethod { class: &'a str, method: &'a str },
    Static { class: &'a str, method: &'a str },
    Plain(&'a str),
}

pub(crate) fn parse_spec(name: &str) -> Spec<'_> {
    if let Some((class, method)) = name.split_once('@') {
        return Spec::InstanceMethod { class, method };
    }
    if let Some((class, method)) = name.split_once("::") {
        return Spec::Static { class, method };
    }
    Spec::Plain(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_spec() {
        assert_eq!(
            parse_spec("PostController@index"),
            Spec::InstanceMethod {
                class: "PostController",
                method: "index"
            }
        );
        assert_eq!(
            parse_spec("Str::slug"),
            Spec::Static {
                class: "Str",
                method: "slug"
            }
        );
        assert_eq!(parse_spec("Logger"), Spec::Plain("Logger"));
    }

    #[test]
    fn test_resolver_from_spec() {
        assert!(matches!(Resolver::from("FileLogger"), Resolver::Class(c) if c == "FileLogger"));
        assert!(matches!(
            Resolver::from("Factory@build"),
            Resolver::Method { class, method } if class == "Factory" && method == "build"
        ));
        assert_eq!(format!("{:?}", Resolver::from("A@b")), "A@b");
    }

    #[test]
    fn test_target_from_tuple() {
        assert!(matches!(
            Target::from(("Controller", "show")),
            Target::Method { class, method } if class == "Controller" && method == "show"
        ));
    }
}
