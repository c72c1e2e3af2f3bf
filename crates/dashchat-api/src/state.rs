//! Application state wiring all services together.
//!
//! AppState holds the concrete service instances used by both CLI and REST
//! API. The chat service is generic over its ports; AppState pins it to the
//! SQLite repositories and the HTTP upstream.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::UnboundedReceiver;

use dashchat_core::chat::service::{ChatPorts, ChatService, ChatSettings};
use dashchat_core::task::{BackgroundTasks, TaskFailure};
use dashchat_infra::config::{load_config, resolve_data_dir, resolve_database_url};
use dashchat_infra::sqlite::grant::SqliteGrantRepository;
use dashchat_infra::sqlite::identity::SqliteIdentityRepository;
use dashchat_infra::sqlite::pool::DatabasePool;
use dashchat_infra::sqlite::project::SqliteProjectRepository;
use dashchat_infra::sqlite::turn::SqliteTurnRepository;
use dashchat_infra::upstream::http::{build_client, HttpCompletionUpstream};
use dashchat_types::config::AppConfig;

/// Concrete type alias for the chat service pinned to infra implementations.
pub type ConcreteChatService = ChatService<
    SqliteTurnRepository,
    SqliteGrantRepository,
    SqliteProjectRepository,
    HttpCompletionUpstream,
>;

/// Shared application state holding all services.
///
/// Used by both CLI commands and REST API handlers.
#[derive(Clone)]
pub struct AppState {
    pub chat_service: Arc<ConcreteChatService>,
    pub identities: SqliteIdentityRepository,
    pub projects: Arc<SqliteProjectRepository>,
    pub tasks: BackgroundTasks,
    pub config: Arc<AppConfig>,
    pub data_dir: PathBuf,
    pub db_pool: DatabasePool,
}

impl AppState {
    /// Initialize the application state: resolve config, connect to DB,
    /// wire services.
    ///
    /// Also returns the receiving end of the background task error channel.
    pub async fn init() -> anyhow::Result<(Self, UnboundedReceiver<TaskFailure>)> {
        let data_dir = resolve_data_dir();

        // Ensure data directory exists
        tokio::fs::create_dir_all(&data_dir).await?;

        let config = load_config(&data_dir).await;
        let db_url = resolve_database_url(&config, &data_dir);
        let db_pool = DatabasePool::new(&db_url).await?;

        Self::assemble(config, data_dir, db_pool)
    }

    /// Wire services over an already opened database.
    pub fn assemble(
        config: AppConfig,
        data_dir: PathBuf,
        db_pool: DatabasePool,
    ) -> anyhow::Result<(Self, UnboundedReceiver<TaskFailure>)> {
        let client = build_client(&config.upstream)?;
        let upstream = HttpCompletionUpstream::new(client, &config.upstream);
        let projects = Arc::new(SqliteProjectRepository::new(db_pool.clone()));
        let (tasks, failures) = BackgroundTasks::new();

        let chat_service = ChatService::new(
            ChatPorts {
                history: Arc::new(SqliteTurnRepository::new(db_pool.clone())),
                grants: Arc::new(SqliteGrantRepository::new(db_pool.clone())),
                projects: Arc::clone(&projects),
                upstream: Arc::new(upstream),
            },
            ChatSettings {
                model: config.upstream.model.clone(),
                history_limit: config.chat.history_limit,
                assistant_name: config.chat.assistant_name.clone(),
                time_limit: Duration::from_secs(config.upstream.timeout_secs),
            },
            tasks.clone(),
        );

        tracing::debug!(
            upstream = %config.upstream.base_url,
            model = %config.upstream.model,
            credential = config.upstream.api_key.is_some(),
            "Chat service wired"
        );

        let state = Self {
            chat_service: Arc::new(chat_service),
            identities: SqliteIdentityRepository::new(db_pool.clone()),
            projects,
            tasks,
            config: Arc::new(config),
            data_dir,
            db_pool,
        };
        Ok((state, failures))
    }
}
