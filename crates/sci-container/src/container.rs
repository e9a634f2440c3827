//! The dependency container.

use std::{
    any::{type_name, Any},
    collections::{HashMap, HashSet},
    sync::Arc,
};

use serde_json::Value;
use tracing::{debug, trace};

use crate::{
    args::{Arg, Args, Injected},
    binding::{parse_spec, Resolver, Spec, Target},
    class::{ClassEntry, Injectable, ParamKind, Parameter, Singleton},
    error::{BoxError, ContainerError, Result},
    instance::{Instance, Root},
    registry::SingletonRegistry,
};

/// Callback run with every freshly constructed instance of a class.
pub type CreatedHook =
    Arc<dyn Fn(&Instance) -> std::result::Result<(), BoxError> + Send + Sync>;

pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Resolves names into fully constructed, dependency-injected objects.
///
/// The container is mutated through `&mut self`; resolution itself may run
/// user factories that register or resolve further targets.
pub struct Container {
    classes: HashMap<String, Arc<ClassEntry>>,
    interfaces: HashSet<String>,
    bindings: HashMap<String, Resolver>,
    shared: HashSet<String>,
    instances: SingletonRegistry,
    hooks: HashMap<String, Vec<CreatedHook>>,
    root: Option<Root>,
    max_depth: usize,
    stack: Vec<String>,
}

impl Default for Container {
    fn default() -> Self {
        Self::new()
    }
}

impl Container {
    pub fn new() -> Self {
        Self {
            classes: HashMap::new(),
            interfaces: HashSet::new(),
            bindings: HashMap::new(),
            shared: HashSet::new(),
            instances: SingletonRegistry::default(),
            hooks: HashMap::new(),
            root: None,
            max_depth: DEFAULT_MAX_DEPTH,
            stack: Vec::new(),
        }
    }

    /// Sets the framework root stamped onto every resolved object.
    pub fn with_root(mut self, root: Root) -> Self {
        self.root = Some(root);
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth.max(1);
        self
    }

    pub fn root(&self) -> Option<&Root> {
        self.root.as_ref()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Registers `T` so it can be built by name.
    pub fn register<T: Injectable>(&mut self) {
        self.insert_class(ClassEntry::of::<T>(false));
    }

    /// Registers `T` with singleton capability: plain resolutions always
    /// return the same instance.
    pub fn register_singleton<T: Singleton>(&mut self) {
        self.insert_class(ClassEntry::of::<T>(true));
    }

    fn insert_class(&mut self, entry: ClassEntry) {
        debug!(
            "registered class {} (interfaces: {:?}, singleton: {})",
            entry.name, entry.interfaces, entry.singleton
        );
        self.interfaces.extend(entry.interfaces.iter().cloned());
        self.instances.remove(&entry.name);
        self.classes.insert(entry.name.clone(), Arc::new(entry));
    }

    /// Declares an interface name without an implementing class yet.
    pub fn interface(&mut self, name: impl Into<String>) {
        self.interfaces.insert(name.into());
    }

    /// Binds `target` to `resolver`. The last binding for a target wins.
    pub fn bind(&mut self, target: impl Into<String>, resolver: impl Into<Resolver>) -> Result<()> {
        let target = target.into();
        let resolver = resolver.into();

        let invalid = |reason: String| {
            ContainerError::InvalidBinding {
                target: target.clone(),
                reason,
            }
        };

        if target.trim().is_empty() {
            return Err(invalid("target name is empty".into()));
        }

        match &resolver {
            Resolver::Class(class) | Resolver::Method { class, .. } if class.trim().is_empty() => {
                return Err(invalid("resolver names an empty class".into()));
            }
            Resolver::Class(class) | Resolver::Method { class, .. } if !self.is_known(class) => {
                return Err(invalid(format!(
                    "`{class}` is not a registered class or interface"
                )));
            }
            _ => {}
        }

        self.insert_binding(target, resolver);
        Ok(())
    }

    /// Binds a symbolic name. Unlike [`bind`](Self::bind) the target does not
    /// have to be registered yet.
    pub fn alias(&mut self, name: impl Into<String>, target: impl Into<Resolver>) -> Result<()> {
        let name = name.into();
        let target = target.into();

        if name.trim().is_empty() {
            return Err(ContainerError::InvalidAlias {
                name,
                reason: "alias name is empty".into(),
            });
        }
        if let Resolver::Class(class) | Resolver::Method { class, .. } = &target {
            if class.trim().is_empty() {
                return Err(ContainerError::InvalidAlias {
                    name,
                    reason: "alias target is empty".into(),
                });
            }
        }

        self.insert_binding(name, target);
        Ok(())
    }

    /// Marks `target` as shared, binding it to `resolver` when one is given.
    pub fn singleton(&mut self, target: impl Into<String>, resolver: Option<Resolver>) -> Result<()> {
        let target = target.into();
        match resolver {
            Some(resolver) => self.bind(target.clone(), resolver)?,
            None if target.trim().is_empty() => {
                return Err(ContainerError::InvalidBinding {
                    target,
                    reason: "target name is empty".into(),
                });
            }
            None => {}
        }

        debug!("marked {target} as shared");
        self.shared.insert(target);
        Ok(())
    }

    /// Binds an existing object as the shared instance for `target`.
    pub fn instance(&mut self, target: impl Into<String>, instance: Instance) -> Result<()> {
        let target = target.into();
        self.singleton(target.clone(), Some(Resolver::Instance(instance.clone())))?;
        self.stamp(&instance);
        self.instances.insert(target, instance);
        Ok(())
    }

    /// Registers a hook run with every freshly constructed `class` instance.
    pub fn created<F>(&mut self, class: impl Into<String>, hook: F)
    where
        F: Fn(&Instance) -> std::result::Result<(), BoxError> + Send + Sync + 'static,
    {
        self.hooks
            .entry(class.into())
            .or_default()
            .push(Arc::new(hook));
    }

    pub fn has(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
            || self.classes.contains_key(name)
            || self.instances.contains(name)
    }

    pub fn is_bound(&self, name: &str) -> bool {
        self.bindings.contains_key(name)
    }

    pub fn is_shared(&self, name: &str) -> bool {
        self.shared.contains(name) || self.classes.get(name).is_some_and(|c| c.singleton)
    }

    /// Whether a shared result has already been built for `name`.
    pub fn resolved(&self, name: &str) -> bool {
        self.instances.contains(name)
    }

    /// Drops the cached shared result for `name`, if any.
    pub fn forget_instance(&mut self, name: &str) -> Option<Arg> {
        self.instances.remove(name)
    }

    /// Resolves `target` with `args`.
    ///
    /// Returns an object for class-like targets, or whatever the method
    /// returned for `Class@method`, `Class::method` and `(class, method)`
    /// targets.
    pub fn make(&mut self, target: impl Into<Target>, args: Args) -> Result<Arg> {
        match target.into() {
            Target::Object(instance) => {
                self.stamp(&instance);
                Ok(Arg::Object(instance))
            }
            Target::Method { class, method } => self.call_on_new(&class, &method, &args),
            Target::Name(name) => {
                match parse_spec(&name) {
                    Spec::InstanceMethod { class, method } => self.call_on_new(class, method, &args),
                    Spec::Static { class, method } => self.call_static(class, method, &args),
                    Spec::Plain(name) => self.resolve(name, args),
                }
            }
        }
    }

    /// Like [`make`](Self::make) but requires the result to be an object.
    pub fn make_instance(&mut self, target: impl Into<Target>, args: Args) -> Result<Instance> {
        let target = target.into();
        let context = match &target {
            Target::Name(name) => name.clone(),
            Target::Method { class, method } => format!("{class}@{method}"),
            Target::Object(instance) => instance.class().to_string(),
        };

        self.make(target, args)?
            .into_instance()
            .ok_or(ContainerError::TypeMismatch {
                context,
                expected: "an object".into(),
            })
    }

    /// Resolves `target` without arguments and downcasts it to `T`.
    pub fn make_as<T: Any + Send + Sync>(&mut self, target: impl Into<Target>) -> Result<Arc<T>> {
        let instance = self.make_instance(target, Args::new())?;
        instance.downcast::<T>().ok_or_else(|| {
            ContainerError::TypeMismatch {
                context: instance.class().to_string(),
                expected: type_name::<T>().to_string(),
            }
        })
    }

    fn resolve(&mut self, name: &str, args: Args) -> Result<Arg> {
        if let Some(shared) = self.instances.get(name) {
            trace!("{name} served from shared instances");
            return Ok(shared.clone());
        }

        let resolved = if let Some(resolver) = self.bindings.get(name).cloned() {
            if self.is_self_binding(name, &resolver) {
                // `bind("X", "X")` builds the class directly.
                Arg::Object(self.build(name, &args, false)?)
            } else {
                self.enter(name)?;
                let result = self.resolve_binding(name, resolver, args);
                self.leave();
                result?
            }
        } else if self.classes.contains_key(name) {
            Arg::Object(self.build(name, &args, false)?)
        } else if self.interfaces.contains(name) {
            return Err(ContainerError::resolution(
                name,
                "interface has no bound implementation",
            ));
        } else {
            return Err(ContainerError::resolution(
                name,
                "no binding or registered class",
            ));
        };

        if self.shared.contains(name) {
            return Ok(self.instances.get_or_insert(name, resolved));
        }

        Ok(resolved)
    }

    fn resolve_binding(&mut self, name: &str, resolver: Resolver, args: Args) -> Result<Arg> {
        trace!("resolving {name} through {resolver:?}");
        match resolver {
            Resolver::Instance(instance) => {
                self.stamp(&instance);
                Ok(Arg::Object(instance))
            }
            Resolver::Factory(factory) => {
                let out = factory(self, &args)?;
                if let Arg::Object(instance) = &out {
                    self.stamp(instance);
                }
                Ok(out)
            }
            Resolver::Class(class) => self.make(Target::Name(class), args),
            Resolver::Method { class, method } => self.make(Target::Method { class, method }, args),
        }
    }

    /// Builds `class` from its descriptor. Singleton-capable classes go
    /// through the shared registry unless a method call was requested.
    fn build(&mut self, class: &str, args: &Args, for_method: bool) -> Result<Instance> {
        let entry = self
            .classes
            .get(class)
            .cloned()
            .ok_or_else(|| ContainerError::resolution(class, "class is not registered"))?;

        let use_accessor = entry.singleton && !for_method;
        if use_accessor {
            if let Some(instance) = self.instances.get_instance(&entry.name) {
                return Ok(instance.clone());
            }
        }

        self.enter(&entry.name)?;
        let result = self
            .resolve_parameters(&entry.name, &entry.params, args)
            .and_then(|injected| (entry.constructor)(&injected));
        self.leave();

        let instance = Instance::from_erased(entry.name.as_str(), result?);
        self.stamp(&instance);
        self.fire_created(&entry.name, &instance)?;

        if use_accessor {
            return Ok(self.instances.get_or_insert_instance(&entry.name, instance));
        }

        trace!("constructed {}", entry.name);
        Ok(instance)
    }

    fn resolve_parameters(
        &mut self,
        owner: &str,
        params: &[Parameter],
        args: &Args,
    ) -> Result<Injected> {
        let mut values = Vec::with_capacity(params.len());

        for (index, param) in params.iter().enumerate() {
            let supplied = args.lookup(param.name(), index).cloned();

            let value = match param.kind() {
                ParamKind::Class(dependency) => {
                    self.resolve_dependency(owner, param, dependency, supplied)?
                }
                ParamKind::Scalar => {
                    match supplied.or_else(|| param.default().cloned()) {
                        Some(value) => value,
                        None => {
                            return Err(ContainerError::MissingArgument {
                                class: owner.to_string(),
                                parameter: param.name().to_string(),
                            });
                        }
                    }
                }
            };

            values.push((param.name().to_string(), value));
        }

        Ok(Injected::new(owner, values, self.root.clone()))
    }

    fn resolve_dependency(
        &mut self,
        owner: &str,
        param: &Parameter,
        dependency: &str,
        supplied: Option<Arg>,
    ) -> Result<Arg> {
        match supplied {
            Some(Arg::Object(instance)) => Ok(Arg::Object(instance)),
            Some(Arg::Value(Value::Null)) => {
                param.default().cloned().ok_or_else(|| {
                    ContainerError::TypeMismatch {
                        context: format!("{owner}::{}", param.name()),
                        expected: format!("an instance of {dependency}"),
                    }
                })
            }
            Some(Arg::Value(nested)) => {
                let nested_args = Args::from_value(&nested).ok_or_else(|| {
                    ContainerError::TypeMismatch {
                        context: format!("{owner}::{}", param.name()),
                        expected: format!("an instance of {dependency} or its constructor arguments"),
                    }
                })?;
                self.make(dependency, nested_args)
            }
            // Only a dependency that is itself unresolvable falls back to the
            // default; failures deeper in its graph propagate.
            None => {
                match self.make(dependency, Args::new()) {
                    Ok(value) => Ok(value),
                    Err(err @ ContainerError::Resolution { .. })
                        if err.target() == Some(dependency) =>
                    {
                        param.default().cloned().ok_or(err)
                    }
                    Err(err) => Err(err),
                }
            }
        }
    }

    fn call_on_new(&mut self, class: &str, method: &str, args: &Args) -> Result<Arg> {
        let instance = if self.bindings.contains_key(class) {
            self.make_instance(class, Args::new())?
        } else {
            self.build(class, &Args::new(), true)?
        };
        self.call_method(&instance, method, args)
    }

    /// Calls `method` on an already built `instance`, injecting its parameters.
    pub fn call_method(&mut self, instance: &Instance, method: &str, args: &Args) -> Result<Arg> {
        let entry = self.classes.get(instance.class()).cloned().ok_or_else(|| {
            ContainerError::resolution(instance.class(), "class is not registered")
        })?;
        let method_entry = entry.methods.get(method).cloned().ok_or_else(|| {
            ContainerError::UnknownMethod {
                class: entry.name.clone(),
                method: method.to_string(),
            }
        })?;

        let owner = format!("{}@{}", entry.name, method);
        let injected = self.resolve_parameters(&owner, &method_entry.params, args)?;
        trace!("calling {owner}");
        (method_entry.call)(instance, &injected)
    }

    fn call_static(&mut self, class: &str, method: &str, args: &Args) -> Result<Arg> {
        let concrete = self.concrete_class(class).ok_or_else(|| {
            ContainerError::resolution(class, "no registered class for static call")
        })?;
        let entry = self.classes.get(&concrete).cloned().ok_or_else(|| {
            ContainerError::resolution(&concrete, "class is not registered")
        })?;
        let call = entry.statics.get(method).cloned().ok_or_else(|| {
            ContainerError::UnknownMethod {
                class: concrete.clone(),
                method: method.to_string(),
            }
        })?;

        trace!("calling {concrete}::{method}");
        call(args.positional())
    }

    /// Follows class-name bindings until a registered class is reached.
    fn concrete_class(&self, name: &str) -> Option<String> {
        let mut current = name.to_string();
        for _ in 0..self.max_depth {
            if self.classes.contains_key(&current) && !self.bindings.contains_key(&current) {
                return Some(current);
            }
            match self.bindings.get(&current) {
                Some(Resolver::Class(next)) if *next != current => current = next.clone(),
                Some(Resolver::Class(_)) => return Some(current),
                Some(Resolver::Instance(instance)) => return Some(instance.class().to_string()),
                _ => return None,
            }
        }
        None
    }

    fn insert_binding(&mut self, target: String, resolver: Resolver) {
        debug!("bound {target} -> {resolver:?}");
        self.instances.remove(&target);
        self.bindings.insert(target, resolver);
    }

    fn is_self_binding(&self, name: &str, resolver: &Resolver) -> bool {
        matches!(resolver, Resolver::Class(class) if class == name)
            && self.classes.contains_key(name)
    }

    fn is_known(&self, name: &str) -> bool {
        self.classes.contains_key(name) || self.interfaces.contains(name)
    }

    fn enter(&mut self, name: &str) -> Result<()> {
        if self.stack.iter().any(|frame| frame == name) {
            let mut chain = self.stack.clone();
            chain.push(name.to_string());
            return Err(ContainerError::CircularDependency {
                chain: chain.join(" -> "),
            });
        }
        if self.stack.len() >= self.max_depth {
            return Err(ContainerError::resolution(
                name,
                format!("resolution nested deeper than {} levels", self.max_depth),
            ));
        }
        self.stack.push(name.to_string());
        Ok(())
    }

    fn leave(&mut self) {
        self.stack.pop();
    }

    fn stamp(&self, instance: &Instance) {
        if let Some(root) = &self.root {
            instance.stamp(root);
        }
    }

    fn fire_created(&self, class: &str, instance: &Instance) -> Result<()> {
        let Some(hooks) = self.hooks.get(class) else {
            return Ok(());
        };
        for hook in hooks {
            hook(instance).map_err(|source| {
                ContainerError::Hook {
                    class: class.to_string(),
                    source,
                }
            })?;
        }
        Ok(())
    }
}
