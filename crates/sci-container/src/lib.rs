//! Dependency injection container.
//!
//! Types describe how they are built by implementing [`Injectable`]; the
//! [`Container`] turns class names, interface names, aliases and
//! `Class@method` / `Class::method` specs into constructed objects.
//!
//! ```ignore
//! let mut container = Container::new();
//! container.register::<FileLogger>();
//! container.bind("Logger", "FileLogger")?;
//!
//! let logger = container.make_as::<FileLogger>("Logger")?;
//! ```

mod args;
mod binding;
mod class;
mod container;
mod error;
mod instance;
mod registry;

pub use args::{Arg, Args, Injected};
pub use binding::{Factory, Resolver, Target};
pub use class::{Class, Injectable, ParamKind, Parameter, Singleton};
pub use container::{Container, CreatedHook, DEFAULT_MAX_DEPTH};
pub use error::{BoxError, ContainerError, Result};
pub use instance::{Instance, Root};
pub use registry::SingletonRegistry;
