use std::sync::Arc;

use roomie_agent::{HttpLlmClient, IntentResolver, LlmIntentParser};
use roomie_core::audit::{AuditEvent, AuditSink};
use roomie_core::config::{AppConfig, ConfigError, ResolverMode};
use roomie_core::errors::StoreError;
use roomie_core::AuthGate;
use roomie_db::{
    connect_with_settings, migrations, DemoSeedDataset, InMemoryRoomStore, RoomStore,
    SqlRoomStore,
};
use roomie_mcp::ToolDispatcher;
use thiserror::Error;
use tracing::info;

pub struct Application {
    pub config: AppConfig,
    pub store: Arc<dyn RoomStore>,
    pub dispatcher: ToolDispatcher,
}

#[derive(Debug, Error)]
pub enum BootstrapError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("database connection failed: {0}")]
    DatabaseConnect(#[source] sqlx::Error),
    #[error("database migration failed: {0}")]
    Migration(#[source] sqlx::migrate::MigrateError),
    #[error("demo data seeding failed: {0}")]
    Seed(#[source] StoreError),
    #[error("llm client setup failed: {0}")]
    LlmClient(String),
}

/// Writes audit events to the log stream.
#[derive(Clone, Copy, Debug, Default)]
pub struct TracingAuditSink;

impl AuditSink for TracingAuditSink {
    fn emit(&self, event: AuditEvent) {
        info!(
            event_name = "audit.event",
            audit_event = %event.event_type,
            correlation_id = %event.correlation_id,
            actor = %event.actor,
            room_id = ?event.room_id,
            outcome = ?event.outcome,
            category = ?event.category,
            metadata = ?event.metadata,
            "audit"
        );
    }
}

pub async fn bootstrap_with_config(config: AppConfig) -> Result<Application, BootstrapError> {
    info!(
        event_name = "system.bootstrap.start",
        correlation_id = "bootstrap",
        "starting application bootstrap"
    );

    let store = open_store(&config).await?;

    if config.listings.seed_demo_data {
        let seeded = DemoSeedDataset::load(store.as_ref()).await.map_err(BootstrapError::Seed)?;
        info!(
            event_name = "system.bootstrap.demo_seeded",
            correlation_id = "bootstrap",
            rooms_seeded = seeded.rooms_seeded.len(),
            already_present = seeded.already_present,
            "demo listings loaded"
        );
    }

    let resolver = build_resolver(&config, Arc::clone(&store))?;
    let dispatcher = ToolDispatcher::new(
        AuthGate::from_config(&config.auth),
        Arc::clone(&store),
        resolver,
        Arc::new(TracingAuditSink),
    );

    Ok(Application { config, store, dispatcher })
}

async fn open_store(config: &AppConfig) -> Result<Arc<dyn RoomStore>, BootstrapError> {
    let ttl_days = config.listings.ttl_days;
    if config.database.is_in_memory() {
        info!(
            event_name = "system.bootstrap.store_selected",
            correlation_id = "bootstrap",
            store = "memory",
            "using in-memory room store"
        );
        return Ok(Arc::new(InMemoryRoomStore::new(ttl_days)));
    }

    let db_pool = connect_with_settings(
        &config.database.url,
        config.database.max_connections,
        config.database.timeout_secs,
    )
    .await
    .map_err(BootstrapError::DatabaseConnect)?;
    info!(
        event_name = "system.bootstrap.database_connected",
        correlation_id = "bootstrap",
        "database connection established"
    );

    migrations::run_pending(&db_pool).await.map_err(BootstrapError::Migration)?;
    info!(
        event_name = "system.bootstrap.migrations_applied",
        correlation_id = "bootstrap",
        "database migrations applied"
    );

    Ok(Arc::new(SqlRoomStore::new(db_pool, ttl_days)))
}

fn build_resolver(
    config: &AppConfig,
    store: Arc<dyn RoomStore>,
) -> Result<IntentResolver, BootstrapError> {
    let listings = config.listings.clone();
    match config.resolver.mode {
        ResolverMode::Rules => Ok(IntentResolver::rule_based(store, &config.resolver, listings)),
        ResolverMode::Llm => {
            let client = HttpLlmClient::from_config(&config.llm)
                .map_err(|error| BootstrapError::LlmClient(format!("{error:#}")))?;
            info!(
                event_name = "system.bootstrap.llm_resolver",
                correlation_id = "bootstrap",
                model = %config.llm.model,
                "free-text requests use the llm resolver with rule fallback"
            );
            let parser = LlmIntentParser::new(Arc::new(client));
            Ok(IntentResolver::new(Arc::new(parser), store, &config.resolver, listings))
        }
    }
}

#[cfg(test)]
mod tests {
    use roomie_core::config::{AppConfig, ConfigOverrides, LoadOptions, ResolverMode};
    use roomie_core::RoomFilters;
    use roomie_db::DemoSeedDataset;

    use crate::bootstrap::{bootstrap_with_config, Application, BootstrapError};

    async fn bootstrap(options: LoadOptions) -> Result<Application, BootstrapError> {
        bootstrap_with_config(AppConfig::load(options)?).await
    }

    fn overrides(database_url: &str) -> LoadOptions {
        LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some(database_url.to_string()),
                auth_token: Some("test-token-123".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        }
    }

    #[tokio::test]
    async fn bootstrap_fails_fast_with_a_short_auth_token() {
        let result = bootstrap(LoadOptions {
            overrides: ConfigOverrides {
                database_url: Some("memory://".to_string()),
                auth_token: Some("short".to_string()),
                ..ConfigOverrides::default()
            },
            ..LoadOptions::default()
        })
        .await;

        let Err(BootstrapError::Config(error)) = result else {
            panic!("expected a config error");
        };
        assert!(error.to_string().contains("auth.token"));
    }

    #[tokio::test]
    async fn memory_url_selects_the_in_memory_store_and_seeds() {
        let mut options = overrides("memory://");
        options.overrides.seed_demo_data = Some(true);

        let app = bootstrap(options).await.expect("bootstrap");
        let rooms = app.store.find(&RoomFilters::default()).await.expect("find");
        assert_eq!(rooms.len(), DemoSeedDataset::len());
        app.store.ping().await.expect("ping");
    }

    #[tokio::test]
    async fn sqlite_url_runs_migrations() {
        let app = bootstrap(overrides("sqlite::memory:")).await.expect("bootstrap");
        assert_eq!(app.config.resolver.mode, ResolverMode::Rules);
        assert!(app.store.find(&RoomFilters::default()).await.expect("find").is_empty());
        app.store.ping().await.expect("ping");
    }
}
