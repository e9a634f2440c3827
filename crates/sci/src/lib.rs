//! sci: the application context tying configuration, the dependency
//! container and the query builder together.
//!
//! ```ignore
//! let mut app = App::from_env()?;
//! logging::setup_logging(&app.config().log())?;
//!
//! app.container_mut().register::<FileLogger>();
//! app.container_mut().bind("Logger", "FileLogger")?;
//! let logger = app.make_as::<FileLogger>("Logger")?;
//!
//! let adults = app.query("users").where_(("age", ">=", 18)).to_sql()?;
//! ```

pub mod error;
pub mod logging;

use std::{any::Any, sync::Arc};

pub use error::{Result, SciError};
pub use sci_config::{self as config, Config};
pub use sci_container::{
    self as container, Arg, Args, Class, Container, Injectable, Injected, Instance, Parameter,
    Resolver, Root, Singleton, Target,
};
pub use sci_query::{self as query, CompiledQuery, Dialect, Executor, Model, ModelQuery, Query, Row};
use tracing::debug;

/// Framework root stamped onto every object the container resolves.
#[derive(Debug)]
pub struct AppInfo {
    name: String,
}

impl AppInfo {
    pub fn name(&self) -> &str {
        &self.name
    }
}

/// Explicit application context: configuration plus the container that
/// holds every binding and shared instance for the process.
pub struct App {
    config: Config,
    container: Container,
    root: Root,
    info: Arc<AppInfo>,
}

impl App {
    pub fn new(mut config: Config) -> Result<Self> {
        config.resolve()?;

        let info = Arc::new(AppInfo {
            name: config.name().to_string(),
        });
        let root = Root::from_arc(Arc::clone(&info));
        let container = Container::new()
            .with_root(root.clone())
            .with_max_depth(config.container().max_depth());

        debug!(
            "initialized app {} (max resolution depth {})",
            info.name,
            container.max_depth()
        );

        Ok(Self {
            config,
            container,
            root,
            info,
        })
    }

    /// Loads configuration from `$SCI_CONFIG` or `./sci.toml`.
    pub fn from_env() -> Result<Self> {
        Self::new(Config::new()?)
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn info(&self) -> &AppInfo {
        &self.info
    }

    pub fn root(&self) -> &Root {
        &self.root
    }

    pub fn container(&self) -> &Container {
        &self.container
    }

    pub fn container_mut(&mut self) -> &mut Container {
        &mut self.container
    }

    pub fn make(&mut self, target: impl Into<Target>, args: Args) -> Result<Arg> {
        Ok(self.container.make(target, args)?)
    }

    pub fn make_as<T: Any + Send + Sync>(&mut self, target: impl Into<Target>) -> Result<Arc<T>> {
        Ok(self.container.make_as::<T>(target)?)
    }

    pub fn dialect(&self) -> Dialect {
        Dialect::from(&self.config.query())
    }

    /// A query on `table` using the configured primary key and dialect.
    pub fn query(&self, table: impl Into<String>) -> Query {
        Query::with_settings(table, &self.config.query())
    }

    /// A hydrating query for `M` using the configured dialect.
    pub fn model<M: Model>(&self) -> ModelQuery<M> {
        M::query().dialect(self.dialect())
    }
}

#[cfg(test)]
mod tests {
    use std::fs;

    use sci_config::test_utils::with_env;
    use serial_test::serial;
    use tempfile::tempdir;

    use super::*;

    struct FileLogger {
        path: String,
    }

    impl Injectable for FileLogger {
        const CLASS: &'static str = "FileLogger";

        fn describe(class: Class<Self>) -> Class<Self> {
            class
                .implements("Logger")
                .param(Parameter::scalar("path").with_default("app.log"))
        }

        fn construct(args: &Injected) -> sci_container::Result<Self> {
            Ok(Self {
                path: args.value("path")?,
            })
        }
    }

    struct Post;

    impl Model for Post {
        const TABLE: &'static str = "posts";

        fn hydrate(_: &Row) -> sci_query::Result<Self> {
            Ok(Post)
        }
    }

    fn app_with(toml: &str) -> App {
        let config: Config = config_from(toml);
        App::new(config).unwrap()
    }

    fn config_from(toml: &str) -> Config {
        let dir = tempdir().unwrap();
        let path = dir.path().join("sci.toml");
        fs::write(&path, toml).unwrap();
        Config::load(&path).unwrap()
    }

    #[test]
    fn test_bound_interface_resolves_to_class() {
        let mut app = App::new(Config::default_config()).unwrap();
        app.container_mut().register::<FileLogger>();
        app.container_mut().bind("Logger", "FileLogger").unwrap();

        let logger = app.make("Logger", Args::new()).unwrap().into_instance().unwrap();
        assert_eq!(logger.class(), "FileLogger");
        assert_eq!(logger.downcast_ref::<FileLogger>().unwrap().path, "app.log");

        let info = logger.root().unwrap().downcast::<AppInfo>().unwrap();
        assert_eq!(info.name(), "sci");
        assert!(logger.root().unwrap().ptr_eq(app.root()));
    }

    #[test]
    fn test_configured_query_dialect() {
        let app = app_with(
            r#"
            name = "blog"

            [query]
            primary_key = "uuid"
            placeholder = "numbered"
            identifier_quote = "double"
            "#,
        );

        assert_eq!(app.info().name(), "blog");

        let sql = app
            .query("users")
            .where_(("age", ">", 18))
            .or_where(("role", "admin"))
            .to_sql()
            .unwrap();
        assert_eq!(
            sql.sql(),
            "SELECT * FROM users WHERE age > $1 OR role = $2 ORDER BY \"uuid\" ASC"
        );

        let sql = app.model::<Post>().as_query().to_sql().unwrap();
        assert_eq!(sql.sql(), "SELECT * FROM posts ORDER BY \"id\" ASC");
    }

    #[test]
    fn test_default_query_pages_through_sqlite() {
        let app = App::new(Config::default_config()).unwrap();
        let executor = query::SqliteExecutor::open_in_memory().unwrap();
        executor
            .execute_batch(
                "CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT);
                 INSERT INTO posts (title) VALUES ('one'), ('two'), ('three');",
            )
            .unwrap();

        let rows = app.query("posts").skip(1).get(&executor).unwrap();
        let titles: Vec<String> = rows.iter().map(|r| r.get("title").unwrap()).collect();
        assert_eq!(titles, ["two", "three"]);
    }

    #[test]
    fn test_strict_groups_from_config() {
        let app = app_with(
            r#"
            [query]
            strict_groups = true
            "#,
        );

        let err = app
            .query("t")
            .where_group(|q| q.where_(("a", 1)))
            .close_group()
            .to_sql()
            .unwrap_err();
        assert!(matches!(
            SciError::from(err),
            SciError::Query(sci_query::QueryError::MalformedQuery(_))
        ));
    }

    #[test]
    fn test_max_depth_from_config() {
        let mut app = app_with(
            r#"
            [container]
            max_depth = 1
            "#,
        );
        app.container_mut().register::<FileLogger>();
        app.container_mut().alias("log", "FileLogger").unwrap();

        assert!(matches!(
            app.make("log", Args::new()),
            Err(SciError::Container(sci_container::ContainerError::Resolution { .. }))
        ));
    }

    #[test]
    #[serial]
    fn test_from_env_reads_config_path() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "name = \"shop\"\n").unwrap();

        let path = path.to_string_lossy().into_owned();

        with_env(vec![("SCI_CONFIG", path.as_str())], || {
            let app = App::from_env().unwrap();
            assert_eq!(app.info().name(), "shop");
        });
    }

    #[test]
    fn test_invalid_config_is_rejected() {
        let config = Config {
            container: Some(sci_config::container::ContainerSettings { max_depth: Some(0) }),
            ..Config::default()
        };
        assert!(matches!(App::new(config), Err(SciError::Config(_))));
    }
}
