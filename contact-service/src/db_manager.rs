//! Multi-project database connection manager.
//!
//! Owns one live [`Database`] per project and, under each project, the models
//! registered against it. Initialization is single-flight: concurrent first
//! calls for the same project share one connection attempt and observe the
//! same outcome. A failed attempt leaves nothing behind, so callers may retry.

use std::any::{self, Any};
use std::collections::{BTreeMap, HashMap};
use std::sync::Arc;

use common::config::{DbConfig, DbEnv, DbSettings, Dialect};
use common::errors::{AppError, AppResult};
use futures::future::{BoxFuture, FutureExt, Shared};
use serde::Serialize;
use tokio::sync::RwLock;
use utoipa::ToSchema;

use crate::database::{Connector, Database, SqlxConnector};
use crate::models::Model;
use crate::schema::{sync_table, SyncOptions};

type InitFuture = Shared<BoxFuture<'static, AppResult<Arc<Database>>>>;

/// A registered model, kept both as the trait object and as `Any` for typed lookup.
#[derive(Clone)]
struct RegisteredModel {
    model: Arc<dyn Model>,
    any: Arc<dyn Any + Send + Sync>,
}

struct ProjectEntry {
    database: Arc<Database>,
    models: BTreeMap<String, RegisteredModel>,
}

/// An in-flight connection attempt. `id` tells a stale attempt (its project
/// was closed meanwhile) from the current one.
#[derive(Clone)]
struct PendingInit {
    id: u64,
    future: InitFuture,
}

#[derive(Default)]
struct Registry {
    projects: BTreeMap<String, ProjectEntry>,
    /// In-flight connection attempts, at most one per project.
    pending: HashMap<String, PendingInit>,
    next_attempt: u64,
}

/// Status of one initialized project.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, ToSchema)]
pub struct ProjectStatus {
    pub connected: bool,
    pub dialect: Dialect,
    pub models: Vec<String>,
}

/// Manages per-project connections and model registries.
pub struct DatabaseManager {
    settings: Arc<DbSettings>,
    connector: Arc<dyn Connector>,
    registry: Arc<RwLock<Registry>>,
}

impl DatabaseManager {
    /// Creates a manager that opens sqlx pools.
    pub fn new(settings: DbSettings) -> Self {
        Self::with_connector(settings, Arc::new(SqlxConnector))
    }

    pub fn with_connector(settings: DbSettings, connector: Arc<dyn Connector>) -> Self {
        Self {
            settings: Arc::new(settings),
            connector,
            registry: Arc::new(RwLock::new(Registry::default())),
        }
    }

    pub fn settings(&self) -> &DbSettings {
        &self.settings
    }

    /// Returns the project's handle, connecting on first use.
    ///
    /// `env` overrides the configured default environment for the first
    /// connection only; an existing handle is returned as is.
    pub async fn init_project(&self, project: &str, env: Option<DbEnv>) -> AppResult<Arc<Database>> {
        if let Some(entry) = self.registry.read().await.projects.get(project) {
            return Ok(entry.database.clone());
        }

        let attempt = {
            let mut registry = self.registry.write().await;
            if let Some(entry) = registry.projects.get(project) {
                return Ok(entry.database.clone());
            }
            match registry.pending.get(project) {
                Some(pending) => pending.future.clone(),
                None => {
                    let config = self.settings.resolve(project, env)?;
                    tracing::info!(project = %project, dialect = %config.dialect(), "Connecting project database");

                    registry.next_attempt += 1;
                    let id = registry.next_attempt;
                    let future = connect_and_publish(
                        project.to_string(),
                        id,
                        config,
                        self.connector.clone(),
                        self.registry.clone(),
                    )
                    .boxed()
                    .shared();
                    registry.pending.insert(
                        project.to_string(),
                        PendingInit {
                            id,
                            future: future.clone(),
                        },
                    );
                    future
                }
            }
        };

        attempt.await
    }

    /// Handle of an initialized project. Never connects.
    pub async fn get_connection(&self, project: &str) -> AppResult<Arc<Database>> {
        self.registry
            .read()
            .await
            .projects
            .get(project)
            .map(|entry| entry.database.clone())
            .ok_or_else(|| AppError::NotInitialized(project.to_string()))
    }

    /// Builds a model with `definer` against the project's handle and registers it.
    ///
    /// Registering a name twice replaces the earlier model.
    pub async fn register_model<M, F>(&self, project: &str, name: &str, definer: F) -> AppResult<Arc<M>>
    where
        M: Model,
        F: FnOnce(&Arc<Database>) -> M,
    {
        let mut registry = self.registry.write().await;
        let entry = registry
            .projects
            .get_mut(project)
            .ok_or_else(|| AppError::NotInitialized(project.to_string()))?;

        let model = Arc::new(definer(&entry.database));
        let registered = RegisteredModel {
            model: model.clone(),
            any: model.clone(),
        };
        if entry.models.insert(name.to_string(), registered).is_some() {
            tracing::warn!(project = %project, model = %name, "Model re-registered, previous definition replaced");
        } else {
            tracing::debug!(project = %project, model = %name, table = model.schema().name, "Model registered");
        }
        Ok(model)
    }

    pub async fn get_model(&self, project: &str, name: &str) -> AppResult<Arc<dyn Model>> {
        self.lookup(project, name).await.map(|m| m.model)
    }

    /// Typed variant of [`DatabaseManager::get_model`].
    pub async fn model<M: Model>(&self, project: &str, name: &str) -> AppResult<Arc<M>> {
        self.lookup(project, name).await?.any.downcast::<M>().map_err(|_| {
            AppError::Internal(format!(
                "model {} of {} is not a {}",
                name,
                project,
                any::type_name::<M>()
            ))
        })
    }

    /// Absent project and absent model both report `ModelNotFound`.
    async fn lookup(&self, project: &str, name: &str) -> AppResult<RegisteredModel> {
        self.registry
            .read()
            .await
            .projects
            .get(project)
            .and_then(|entry| entry.models.get(name).cloned())
            .ok_or_else(|| AppError::ModelNotFound {
                project: project.to_string(),
                model: name.to_string(),
            })
    }

    /// Registered models of a project; empty when the project is not initialized.
    pub async fn get_models(&self, project: &str) -> BTreeMap<String, Arc<dyn Model>> {
        self.registry
            .read()
            .await
            .projects
            .get(project)
            .map(|entry| {
                entry
                    .models
                    .iter()
                    .map(|(name, m)| (name.clone(), m.model.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Reconciles every registered model's table in the project's database.
    pub async fn sync_project(&self, project: &str, options: SyncOptions) -> AppResult<()> {
        let (database, models) = {
            let registry = self.registry.read().await;
            let entry = registry
                .projects
                .get(project)
                .ok_or_else(|| AppError::NotInitialized(project.to_string()))?;
            let models: Vec<Arc<dyn Model>> =
                entry.models.values().map(|m| m.model.clone()).collect();
            (entry.database.clone(), models)
        };

        tracing::info!(
            project = %project,
            models = models.len(),
            alter = options.alter,
            force = options.force,
            "Syncing project schema"
        );
        for model in models {
            sync_table(database.pool(), model.schema(), options).await?;
        }
        tracing::info!(project = %project, "Project schema synced");
        Ok(())
    }

    /// Syncs every initialized project in name order, stopping at the first failure.
    pub async fn sync_all(&self, options: SyncOptions) -> AppResult<()> {
        let projects: Vec<String> = self.registry.read().await.projects.keys().cloned().collect();
        for project in projects {
            self.sync_project(&project, options).await?;
        }
        Ok(())
    }

    /// Closes and forgets a project. No-op when it is not initialized.
    ///
    /// A connection attempt still in flight for the project is abandoned: it
    /// closes its own pool instead of publishing it.
    pub async fn close_project(&self, project: &str) {
        let entry = {
            let mut registry = self.registry.write().await;
            registry.pending.remove(project);
            registry.projects.remove(project)
        };
        if let Some(entry) = entry {
            entry.database.pool().close().await;
            tracing::info!(project = %project, "Project database closed");
        }
    }

    pub async fn close_all(&self) {
        let projects = {
            let mut registry = self.registry.write().await;
            registry.pending.clear();
            std::mem::take(&mut registry.projects)
        };
        for (project, entry) in projects {
            entry.database.pool().close().await;
            tracing::info!(project = %project, "Project database closed");
        }
    }

    /// Snapshot of every initialized project.
    pub async fn get_status(&self) -> BTreeMap<String, ProjectStatus> {
        self.registry
            .read()
            .await
            .projects
            .iter()
            .map(|(project, entry)| {
                let status = ProjectStatus {
                    connected: true,
                    dialect: entry.database.dialect(),
                    models: entry.models.keys().cloned().collect(),
                };
                (project.clone(), status)
            })
            .collect()
    }
}

/// Body of a shared connection attempt.
///
/// Clears the in-flight marker and, on success, publishes the handle with an
/// empty model registry under the same write lock. An attempt whose marker
/// was removed by a close does not publish.
async fn connect_and_publish(
    project: String,
    attempt: u64,
    config: DbConfig,
    connector: Arc<dyn Connector>,
    registry: Arc<RwLock<Registry>>,
) -> AppResult<Arc<Database>> {
    let result = connector
        .connect(&project, &config)
        .await
        .map(|pool| Arc::new(Database::new(project.clone(), pool)));

    let mut guard = registry.write().await;
    let current = guard
        .pending
        .get(&project)
        .is_some_and(|pending| pending.id == attempt);
    if !current {
        drop(guard);
        if let Ok(database) = &result {
            database.pool().close().await;
        }
        tracing::warn!(project = %project, "Project closed during connection attempt, discarding it");
        return Err(AppError::DatabaseConnection(format!(
            "{}: closed while connecting",
            project
        )));
    }

    guard.pending.remove(&project);
    match &result {
        Ok(database) => {
            guard.projects.insert(
                project.clone(),
                ProjectEntry {
                    database: database.clone(),
                    models: BTreeMap::new(),
                },
            );
            tracing::info!(project = %project, dialect = %database.dialect(), "Project database connected");
        }
        Err(e) => {
            tracing::error!(project = %project, error = %e, "Project database connection failed");
        }
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;
    use common::config::{DbVariantSettings, ProjectDbSettings};
    use tempfile::TempDir;

    use crate::database::DbPool;
    use crate::schema::{Column, ColumnKind, TableSchema};

    const WIDGETS: TableSchema = TableSchema {
        name: "widgets",
        columns: &[
            Column::id(),
            Column::required("label", ColumnKind::Varchar(50)),
        ],
        indexes: &[],
    };

    const WIDGETS_V2: TableSchema = TableSchema {
        name: "widgets",
        columns: &[
            Column::id(),
            Column::required("label", ColumnKind::Varchar(50)),
            Column::optional("color", ColumnKind::Varchar(20)),
        ],
        indexes: &[],
    };

    const BROKEN: TableSchema = TableSchema {
        name: "broken",
        columns: &[],
        indexes: &[],
    };

    struct Widget {
        schema: &'static TableSchema,
        db: Arc<Database>,
    }

    impl Widget {
        fn new(db: &Arc<Database>) -> Self {
            Self {
                schema: &WIDGETS,
                db: db.clone(),
            }
        }

        fn v2(db: &Arc<Database>) -> Self {
            Self {
                schema: &WIDGETS_V2,
                db: db.clone(),
            }
        }
    }

    impl Model for Widget {
        fn name(&self) -> &'static str {
            "Widget"
        }

        fn schema(&self) -> &'static TableSchema {
            self.schema
        }
    }

    struct Broken;

    impl Model for Broken {
        fn name(&self) -> &'static str {
            "Broken"
        }

        fn schema(&self) -> &'static TableSchema {
            &BROKEN
        }
    }

    /// Counts attempts and can be made slow or failing.
    #[derive(Default)]
    struct CountingConnector {
        attempts: AtomicUsize,
        delay: Duration,
        fail: AtomicBool,
    }

    #[async_trait]
    impl Connector for CountingConnector {
        async fn connect(&self, project: &str, config: &DbConfig) -> AppResult<DbPool> {
            self.attempts.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(self.delay).await;
            if self.fail.load(Ordering::SeqCst) {
                return Err(AppError::DatabaseConnection(format!("{}: refused", project)));
            }
            SqlxConnector.connect(project, config).await
        }
    }

    fn settings(dir: &TempDir, projects: &[&str]) -> DbSettings {
        projects.iter().fold(DbSettings::new(DbEnv::Local), |s, p| {
            let storage = dir.path().join(format!("{}.sqlite", p));
            s.with_project(
                *p,
                ProjectDbSettings::uniform(DbVariantSettings::sqlite(storage.to_string_lossy())),
            )
        })
    }

    fn manager(dir: &TempDir, projects: &[&str], connector: Arc<CountingConnector>) -> DatabaseManager {
        DatabaseManager::with_connector(settings(dir, projects), connector)
    }

    #[tokio::test]
    async fn test_uninitialized_project() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir, &["acme"], Arc::default());

        assert_eq!(
            mgr.get_connection("acme").await.unwrap_err(),
            AppError::NotInitialized("acme".into())
        );
        assert!(matches!(
            mgr.get_model("acme", "Widget").await.err().unwrap(),
            AppError::ModelNotFound { .. }
        ));
        assert!(matches!(
            mgr.register_model("acme", "Widget", Widget::new).await.err().unwrap(),
            AppError::NotInitialized(_)
        ));
        assert!(mgr.get_models("acme").await.is_empty());
        assert!(mgr.get_connection("acme").await.is_err());
    }

    #[tokio::test]
    async fn test_init_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(CountingConnector::default());
        let mgr = manager(&dir, &["acme"], connector.clone());

        let first = mgr.init_project("acme", None).await.unwrap();
        let second = mgr.init_project("acme", None).await.unwrap();
        let fetched = mgr.get_connection("acme").await.unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert!(Arc::ptr_eq(&first, &fetched));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        assert_eq!(first.project(), "acme");
    }

    #[tokio::test]
    async fn test_concurrent_init_connects_once() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(CountingConnector {
            delay: Duration::from_millis(50),
            ..Default::default()
        });
        let mgr = manager(&dir, &["acme"], connector.clone());

        let results =
            futures::future::join_all((0..8).map(|_| mgr.init_project("acme", None))).await;

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        let handles: Vec<_> = results.into_iter().map(Result::unwrap).collect();
        assert!(handles.iter().all(|h| Arc::ptr_eq(h, &handles[0])));
    }

    #[tokio::test]
    async fn test_concurrent_failure_is_shared_then_retryable() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(CountingConnector {
            delay: Duration::from_millis(50),
            fail: AtomicBool::new(true),
            ..Default::default()
        });
        let mgr = manager(&dir, &["acme"], connector.clone());

        let results =
            futures::future::join_all((0..4).map(|_| mgr.init_project("acme", None))).await;

        assert_eq!(connector.attempts.load(Ordering::SeqCst), 1);
        let expected = AppError::DatabaseConnection("acme: refused".into());
        assert!(results.iter().all(|r| r.as_ref().unwrap_err() == &expected));

        // Nothing partial is left behind.
        assert!(mgr.get_connection("acme").await.is_err());
        assert!(mgr.get_status().await.is_empty());

        connector.fail.store(false, Ordering::SeqCst);
        mgr.init_project("acme", None).await.unwrap();
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
        assert!(mgr.get_connection("acme").await.is_ok());
    }

    #[tokio::test]
    async fn test_unknown_project() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(CountingConnector::default());
        let mgr = manager(&dir, &["acme"], connector.clone());

        let err = mgr.init_project("globex", None).await.unwrap_err();
        assert_eq!(err, AppError::ProjectNotFound("globex".into()));
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn test_status_scenario() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir, &["acme"], Arc::default());

        mgr.init_project("acme", None).await.unwrap();
        assert_eq!(
            serde_json::to_value(mgr.get_status().await).unwrap(),
            serde_json::json!({"acme": {"connected": true, "dialect": "sqlite", "models": []}})
        );

        mgr.register_model("acme", "Widget", Widget::new).await.unwrap();
        assert_eq!(mgr.get_status().await["acme"].models, vec!["Widget"]);

        mgr.close_project("acme").await;
        assert!(mgr.get_status().await.is_empty());
        assert!(matches!(
            mgr.get_connection("acme").await.unwrap_err(),
            AppError::NotInitialized(_)
        ));
    }

    #[tokio::test]
    async fn test_register_and_get_model() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir, &["acme"], Arc::default());
        let db = mgr.init_project("acme", None).await.unwrap();

        let registered = mgr.register_model("acme", "Widget", Widget::new).await.unwrap();
        assert!(Arc::ptr_eq(&registered.db, &db));

        let model = mgr.get_model("acme", "Widget").await.unwrap();
        assert_eq!(model.name(), "Widget");
        let typed: Arc<Widget> = mgr.model("acme", "Widget").await.unwrap();
        assert!(Arc::ptr_eq(&typed, &registered));

        assert!(matches!(
            mgr.model::<Broken>("acme", "Widget").await.err().unwrap(),
            AppError::Internal(_)
        ));
        assert_eq!(
            mgr.get_model("acme", "Gadget").await.err().unwrap(),
            AppError::ModelNotFound {
                project: "acme".into(),
                model: "Gadget".into()
            }
        );
        assert_eq!(
            mgr.get_models("acme").await.keys().collect::<Vec<_>>(),
            vec!["Widget"]
        );
    }

    #[tokio::test]
    async fn test_reregister_replaces_model() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir, &["acme"], Arc::default());
        mgr.init_project("acme", None).await.unwrap();

        mgr.register_model("acme", "Widget", Widget::new).await.unwrap();
        mgr.register_model("acme", "Widget", Widget::v2).await.unwrap();

        let model = mgr.get_model("acme", "Widget").await.unwrap();
        assert_eq!(model.schema().columns.len(), 3);
        assert_eq!(mgr.get_status().await["acme"].models.len(), 1);
    }

    #[tokio::test]
    async fn test_sync_modes() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir, &["acme"], Arc::default());
        let db = mgr.init_project("acme", None).await.unwrap();

        mgr.register_model("acme", "Widget", Widget::new).await.unwrap();
        mgr.sync_project("acme", SyncOptions::create()).await.unwrap();
        assert_eq!(db.pool().column_names("widgets").await.unwrap(), vec!["id", "label"]);
        db.pool()
            .execute("INSERT INTO widgets (label) VALUES ('kept')")
            .await
            .unwrap();

        // Alter adds the new column and keeps rows.
        mgr.register_model("acme", "Widget", Widget::v2).await.unwrap();
        mgr.sync_project("acme", SyncOptions::create()).await.unwrap();
        assert_eq!(db.pool().column_names("widgets").await.unwrap().len(), 2);
        mgr.sync_project("acme", SyncOptions::alter()).await.unwrap();
        assert_eq!(
            db.pool().column_names("widgets").await.unwrap(),
            vec!["id", "label", "color"]
        );
        let DbPool::Sqlite(pool) = db.pool() else {
            panic!("expected sqlite");
        };
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM widgets")
            .fetch_one(pool)
            .await
            .unwrap();
        assert_eq!(count, 1);

        // Force drops the data.
        mgr.sync_project("acme", SyncOptions::force()).await.unwrap();
        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM widgets")
            .fetch_one(pool)
            .await
            .unwrap();
        assert_eq!(count, 0);
    }

    #[tokio::test]
    async fn test_sync_uninitialized_project() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir, &["acme"], Arc::default());
        assert!(matches!(
            mgr.sync_project("acme", SyncOptions::create()).await.unwrap_err(),
            AppError::NotInitialized(_)
        ));
    }

    #[tokio::test]
    async fn test_sync_all_stops_at_first_failure() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir, &["alpha", "beta"], Arc::default());
        mgr.init_project("alpha", None).await.unwrap();
        let beta = mgr.init_project("beta", None).await.unwrap();

        mgr.register_model("alpha", "Broken", |_| Broken).await.unwrap();
        mgr.register_model("beta", "Widget", Widget::new).await.unwrap();

        let err = mgr.sync_all(SyncOptions::create()).await.unwrap_err();
        assert!(matches!(err, AppError::Sync(_)));
        assert!(beta.pool().column_names("widgets").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_all() {
        let dir = tempfile::tempdir().unwrap();
        let mgr = manager(&dir, &["alpha", "beta"], Arc::default());
        mgr.init_project("alpha", None).await.unwrap();
        mgr.init_project("beta", None).await.unwrap();
        assert_eq!(mgr.get_status().await.len(), 2);

        mgr.close_project("missing").await;
        mgr.close_all().await;

        assert!(mgr.get_status().await.is_empty());
        assert!(mgr.get_connection("alpha").await.is_err());
        assert!(mgr.get_connection("beta").await.is_err());
    }

    #[tokio::test]
    async fn test_close_during_init_discards_attempt() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(CountingConnector {
            delay: Duration::from_millis(200),
            ..Default::default()
        });
        let mgr = Arc::new(manager(&dir, &["acme"], connector.clone()));

        let init = tokio::spawn({
            let mgr = mgr.clone();
            async move { mgr.init_project("acme", None).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        mgr.close_all().await;

        let err = init.await.unwrap().err().unwrap();
        assert!(matches!(err, AppError::DatabaseConnection(_)));
        assert!(mgr.get_status().await.is_empty());
        assert!(mgr.get_connection("acme").await.is_err());

        mgr.init_project("acme", None).await.unwrap();
        assert_eq!(connector.attempts.load(Ordering::SeqCst), 2);
        assert_eq!(mgr.get_status().await.len(), 1);
    }

    #[tokio::test]
    async fn test_close_project_during_init() {
        let dir = tempfile::tempdir().unwrap();
        let connector = Arc::new(CountingConnector {
            delay: Duration::from_millis(200),
            ..Default::default()
        });
        let mgr = Arc::new(manager(&dir, &["acme", "globex"], connector));
        mgr.init_project("globex", None).await.unwrap();

        let init = tokio::spawn({
            let mgr = mgr.clone();
            async move { mgr.init_project("acme", None).await }
        });
        tokio::time::sleep(Duration::from_millis(50)).await;
        mgr.close_project("acme").await;

        assert!(init.await.unwrap().is_err());
        assert_eq!(
            mgr.get_status().await.keys().collect::<Vec<_>>(),
            vec!["globex"]
        );
    }

    #[tokio::test]
    async fn test_env_override_selects_variant() {
        let dir = tempfile::tempdir().unwrap();
        let local = dir.path().join("acme_local.sqlite");
        let prod = dir.path().join("acme_prod.sqlite");
        let settings = DbSettings::new(DbEnv::Local).with_project(
            "acme",
            ProjectDbSettings {
                local: DbVariantSettings::sqlite(local.to_string_lossy()),
                production: DbVariantSettings::sqlite(prod.to_string_lossy()),
            },
        );
        let mgr = DatabaseManager::new(settings);

        let db = mgr.init_project("acme", Some(DbEnv::Production)).await.unwrap();
        assert!(prod.exists());
        assert!(!local.exists());

        // An existing handle wins over a different override.
        let again = mgr.init_project("acme", Some(DbEnv::Local)).await.unwrap();
        assert!(Arc::ptr_eq(&db, &again));
        assert!(!local.exists());
    }
}
