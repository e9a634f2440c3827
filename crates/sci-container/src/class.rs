//! Class descriptors.
//!
//! Rust has no runtime reflection, so every injectable type describes its
//! constructor parameters, the interfaces it satisfies and its callable
//! methods up front. The container's resolution algorithm works purely on
//! these descriptors.

use std::{any::Any, collections::HashMap, fmt, marker::PhantomData, sync::Arc};

use crate::{
    args::{Arg, Injected},
    error::{ContainerError, Result},
    instance::Instance,
};

/// Declared type of a constructor or method parameter.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ParamKind {
    /// Resolved through the container when not supplied.
    Class(String),
    /// Plain data: supplied by name, then position, then the default.
    Scalar,
}

#[derive(Clone, Debug)]
pub struct Parameter {
    name: String,
    kind: ParamKind,
    default: Option<Arg>,
}

impl Parameter {
    pub fn class(name: impl Into<String>, class: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Class(class.into()),
            default: None,
        }
    }

    pub fn scalar(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: ParamKind::Scalar,
            default: None,
        }
    }

    pub fn with_default(mut self, value: impl Into<Arg>) -> Self {
        self.default = Some(value.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn kind(&self) -> &ParamKind {
        &self.kind
    }

    pub fn default(&self) -> Option<&Arg> {
        self.default.as_ref()
    }
}

pub(crate) type Constructor =
    Arc<dyn Fn(&Injected) -> Result<Arc<dyn Any + Send + Sync>> + Send + Sync>;
pub(crate) type MethodFn = Arc<dyn Fn(&Instance, &Injected) -> Result<Arg> + Send + Sync>;
pub(crate) type StaticFn = Arc<dyn Fn(&[Arg]) -> Result<Arg> + Send + Sync>;

#[derive(Clone)]
pub(crate) struct MethodEntry {
    pub params: Vec<Parameter>,
    pub call: MethodFn,
}

/// A type the container knows how to build.
///
/// ```ignore
/// struct Mailer {
///     transport: Arc<SmtpTransport>,
///     from: String,
/// }
///
/// impl Injectable for Mailer {
///     const CLASS: &'static str = "Mailer";
///
///     fn describe(class: Class<Self>) -> Class<Self> {
///         class
///             .param(Parameter::class("transport", "SmtpTransport"))
///             .param(Parameter::scalar("from").with_default("noreply@localhost"))
///     }
///
///     fn construct(args: &Injected) -> Result<Self> {
///         Ok(Self {
///             transport: args.object("transport")?,
///             from: args.value("from")?,
///         })
///     }
/// }
/// ```
pub trait Injectable: Any + Send + Sync + Sized {
    const CLASS: &'static str;

    fn describe(class: Class<Self>) -> Class<Self> {
        class
    }

    fn construct(args: &Injected) -> Result<Self>;
}

/// Capability marker: the container keeps at most one instance of the class
/// and hands it out on every plain resolution.
pub trait Singleton: Injectable {}

/// Descriptor builder for an [`Injectable`] type.
pub struct Class<T> {
    name: String,
    interfaces: Vec<String>,
    params: Vec<Parameter>,
    methods: HashMap<String, MethodEntry>,
    statics: HashMap<String, StaticFn>,
    _type: PhantomData<fn() -> T>,
}

impl<T: Injectable> Class<T> {
    pub(crate) fn new() -> Self {
        Self {
            name: T::CLASS.to_string(),
            interfaces: Vec::new(),
            params: Vec::new(),
            methods: HashMap::new(),
            statics: HashMap::new(),
            _type: PhantomData,
        }
    }

    pub fn implements(mut self, interface: impl Into<String>) -> Self {
        self.interfaces.push(interface.into());
        self
    }

    pub fn param(mut self, param: Parameter) -> Self {
        self.params.push(param);
        self
    }

    /// Declares an instance method callable through `Class@method`.
    pub fn method<F>(
        mut self,
        name: impl Into<String>,
        params: impl IntoIterator<Item = Parameter>,
        f: F,
    ) -> Self
    where
        F: Fn(&T, &Injected) -> Result<Arg> + Send + Sync + 'static,
    {
        let call: MethodFn = Arc::new(move |instance: &Instance, args: &Injected| {
            let this = instance.downcast_ref::<T>().ok_or_else(|| {
                ContainerError::TypeMismatch {
                    context: instance.class().to_string(),
                    expected: T::CLASS.to_string(),
                }
            })?;
            f(this, args)
        });
        self.methods.insert(
            name.into(),
            MethodEntry {
                params: params.into_iter().collect(),
                call,
            },
        );
        self
    }

    /// Declares an associated function callable through `Class::method`.
    pub fn static_method<F>(mut self, name: impl Into<String>, f: F) -> Self
    where
        F: Fn(&[Arg]) -> Result<Arg> + Send + Sync + 'static,
    {
        self.statics.insert(name.into(), Arc::new(f));
        self
    }

    pub(crate) fn into_entry(self, singleton: bool) -> ClassEntry {
        let constructor: Constructor = Arc::new(|args: &Injected| {
            let object: Arc<dyn Any + Send + Sync> = Arc::new(T::construct(args)?);
            Ok(object)
        });

        ClassEntry {
            name: self.name,
            interfaces: self.interfaces,
            params: self.params,
            constructor,
            methods: self.methods,
            statics: self.statics,
            singleton,
        }
    }
}

/// Type-erased descriptor stored by the container.
pub(crate) struct ClassEntry {
    pub name: String,
    pub interfaces: Vec<String>,
    pub params: Vec<Parameter>,
    pub constructor: Constructor,
    pub methods: HashMap<String, MethodEntry>,
    pub statics: HashMap<String, StaticFn>,
    pub singleton: bool,
}

impl ClassEntry {
    pub fn of<T: Injectable>(singleton: bool) -> Self {
        T::describe(Class::<T>::new()).into_entry(singleton)
    }
}

impl fmt::Debug for ClassEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ClassEntry")
            .field("name", &self.name)
            .field("interfaces", &self.interfaces)
            .field("params", &self.params)
            .field("methods", &self.methods.keys().collect::<Vec<_>>())
            .field("statics", &self.statics.keys().collect::<Vec<_>>())
            .field("singleton", &self.singleton)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    struct Greeter {
        greeting: String,
    }

    impl Injectable for Greeter {
        const CLASS: &'static str = "Greeter";

        fn describe(class: Class<Self>) -> Class<Self> {
            class
                .implements("Speaker")
                .param(Parameter::scalar("greeting").with_default("hello"))
                .method("greet", [Parameter::scalar("who")], |this, args| {
                    let who: String = args.value("who")?;
                    Ok(Arg::from(format!("{} {}", this.greeting, who)))
                })
                .static_method("shout", |args| {
                    let word = args
                        .first()
                        .and_then(Arg::as_value)
                        .and_then(|v| v.as_str())
                        .unwrap_or_default();
                    Ok(Arg::from(word.to_uppercase()))
                })
        }

        fn construct(args: &Injected) -> Result<Self> {
            Ok(Self {
                greeting: args.value("greeting")?,
            })
        }
    }

    #[test]
    fn test_entry_from_descriptor() {
        let entry = ClassEntry::of::<Greeter>(false);

        assert_eq!(entry.name, "Greeter");
        assert_eq!(entry.interfaces, vec!["Speaker".to_string()]);
        assert_eq!(entry.params.len(), 1);
        assert_eq!(entry.params[0].kind(), &ParamKind::Scalar);
        assert!(entry.methods.contains_key("greet"));
        assert!(entry.statics.contains_key("shout"));
        assert!(!entry.singleton);
    }

    #[test]
    fn test_constructor_and_method_roundtrip() {
        let entry = ClassEntry::of::<Greeter>(false);
        let args = Injected::new("Greeter", vec![("greeting".into(), Arg::from("hi"))], None);
        let instance = Instance::from_erased("Greeter", (entry.constructor)(&args).unwrap());

        let method = &entry.methods["greet"];
        let out = (method.call)(
            &instance,
            &Injected::new("Greeter@greet", vec![("who".into(), Arg::from("bob"))], None),
        )
        .unwrap();
        assert_eq!(out.as_value(), Some(&json!("hi bob")));

        let shout = &entry.statics["shout"];
        let out = shout(&[Arg::from("quiet")]).unwrap();
        assert_eq!(out.as_value(), Some(&json!("QUIET")));
    }
}
