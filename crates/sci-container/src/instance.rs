//! Type-erased objects produced by the container.

use std::{
    any::Any,
    fmt,
    sync::{Arc, OnceLock},
};

/// Shared handle to the framework root, stamped onto every resolved object.
#[derive(Clone)]
pub struct Root(Arc<dyn Any + Send + Sync>);

impl Root {
    pub fn new<T: Any + Send + Sync>(value: T) -> Self {
        Self(Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(value: Arc<T>) -> Self {
        Self(value)
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.0).downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &Root) -> bool {
        Arc::ptr_eq(&self.0, &other.0)
    }
}

impl fmt::Debug for Root {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("Root").field(&Arc::as_ptr(&self.0)).finish()
    }
}

/// A resolved object tagged with the class name it was built as.
///
/// Clones share the underlying object, so two instances compare equal under
/// [`Instance::ptr_eq`] exactly when they came from the same construction.
#[derive(Clone)]
pub struct Instance {
    class: Arc<str>,
    object: Arc<dyn Any + Send + Sync>,
    root: Arc<OnceLock<Root>>,
}

impl Instance {
    pub fn new<T: Any + Send + Sync>(class: impl Into<Arc<str>>, value: T) -> Self {
        Self::from_arc(class, Arc::new(value))
    }

    pub fn from_arc<T: Any + Send + Sync>(class: impl Into<Arc<str>>, value: Arc<T>) -> Self {
        Self::from_erased(class, value)
    }

    pub(crate) fn from_erased(
        class: impl Into<Arc<str>>,
        object: Arc<dyn Any + Send + Sync>,
    ) -> Self {
        Self {
            class: class.into(),
            object,
            root: Arc::new(OnceLock::new()),
        }
    }

    pub fn class(&self) -> &str {
        &self.class
    }

    pub fn is<T: Any>(&self) -> bool {
        self.object.is::<T>()
    }

    pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
        self.object.downcast_ref::<T>()
    }

    pub fn downcast<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        Arc::clone(&self.object).downcast::<T>().ok()
    }

    pub fn ptr_eq(&self, other: &Instance) -> bool {
        Arc::ptr_eq(&self.object, &other.object)
    }

    /// The framework root this object was stamped with, if any.
    pub fn root(&self) -> Option<&Root> {
        self.root.get()
    }

    /// First stamp wins; later stamps are ignored.
    pub(crate) fn stamp(&self, root: &Root) {
        let _ = self.root.set(root.clone());
    }
}

impl fmt::Debug for Instance {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Instance")
            .field("class", &self.class)
            .field("object", &Arc::as_ptr(&self.object))
            .field("rooted", &self.root.get().is_some())
            .finish()
    }
}
