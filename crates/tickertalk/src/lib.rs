//! tickertalk - conversational stock-market assistant
//!
//! A supervisor agent routes each question to a data-collector agent (live
//! market data through the provider gateway) and a data-analyst agent, then
//! streams the answer. Every exchange is persisted per session, bucketed by
//! date.
//!
//! # Library Usage
//!
//! ```rust,no_run
//! use futures::StreamExt;
//! use tickertalk::models::TickertalkConfig;
//!
//! # async fn run() -> anyhow::Result<()> {
//! let app = tickertalk::build_context(TickertalkConfig::default())?;
//! let mut reply = app.turn("Show trending stocks", "Alice", "s1").into_stream();
//! while let Some(chunk) = reply.next().await {
//!     print!("{}", chunk?);
//! }
//! app.close()?;
//! # Ok(())
//! # }
//! ```

pub use tickertalk_agents as agents;
pub use tickertalk_models as models;
pub use tickertalk_store as store;
pub use tickertalk_tools as tools;

use std::path::Path;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{anyhow, Context};
use tickertalk_agents::{
    ChatContext, ChatModel, ChatTurn, ClaudeCli, DataAnalyst, DataCollector, SubAgent, Supervisor,
};
use tickertalk_models::TickertalkConfig;
use tickertalk_store::{ChatArchive, SessionStore};
use tickertalk_tools::MarketDataGateway;
use tracing::info;

/// Models backing the three agents.
pub struct AgentModels {
    pub supervisor: Arc<dyn ChatModel>,
    pub collector: Arc<dyn ChatModel>,
    pub analyst: Arc<dyn ChatModel>,
}

impl AgentModels {
    /// Claude CLI models as named in the config.
    pub fn from_config(config: &TickertalkConfig) -> Self {
        let timeout = Duration::from_secs(config.agents.model_timeout_seconds);
        let cli = |model: &str| -> Arc<dyn ChatModel> {
            Arc::new(ClaudeCli::new(model.to_string(), timeout))
        };
        Self {
            supervisor: cli(&config.agents.supervisor_model),
            collector: cli(&config.agents.collector_model),
            analyst: cli(&config.agents.analyst_model),
        }
    }
}

/// Process-wide resources: session archive, provider gateway and agents.
///
/// Built once at startup and closed explicitly at shutdown.
pub struct AppContext {
    pub config: TickertalkConfig,
    pub gateway: Arc<MarketDataGateway>,
    chat: Arc<ChatContext>,
}

/// Build an AppContext from configuration, using the Claude CLI for every
/// agent and reading the provider credential from the environment.
pub fn build_context(config: TickertalkConfig) -> Result<AppContext, anyhow::Error> {
    let gateway = MarketDataGateway::from_env(&config.gateway)
        .context("Failed to build market data gateway")?;
    let models = AgentModels::from_config(&config);
    AppContext::new(config, gateway, models)
}

impl AppContext {
    pub fn new(
        config: TickertalkConfig,
        gateway: MarketDataGateway,
        models: AgentModels,
    ) -> Result<Self, anyhow::Error> {
        let sqlite_path = &config.store.sqlite_path;
        if let Some(parent) = Path::new(sqlite_path).parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
        }

        let store = SessionStore::open(
            sqlite_path,
            Duration::from_millis(config.store.busy_timeout_ms),
        )
        .with_context(|| format!("Failed to open session store: {sqlite_path}"))?;
        let archive = Arc::new(ChatArchive::new(
            store,
            config.store.history_cache_capacity,
            Duration::from_secs(config.store.history_cache_ttl_seconds),
        ));

        let gateway = Arc::new(gateway);
        let collector: Arc<dyn SubAgent> =
            Arc::new(DataCollector::new(models.collector, Arc::clone(&gateway)));
        let analyst: Arc<dyn SubAgent> = Arc::new(DataAnalyst::new(models.analyst));
        let supervisor = Arc::new(Supervisor::new(
            models.supervisor,
            collector,
            analyst,
            config.agents.max_tool_calls,
        ));

        info!(
            sqlite_path = %sqlite_path,
            gateway = gateway.base_url(),
            credential = gateway.has_credential(),
            "Context ready"
        );

        let chat = Arc::new(ChatContext {
            archive,
            supervisor,
            checkpoint_namespace: config.agents.checkpoint_namespace.clone(),
        });

        Ok(Self {
            config,
            gateway,
            chat,
        })
    }

    /// Start a chat turn. Nothing runs until its stream is polled.
    pub fn turn(&self, input_text: &str, user_name: &str, session_id: &str) -> ChatTurn {
        ChatTurn::new(Arc::clone(&self.chat), input_text, user_name, session_id)
    }

    pub fn archive(&self) -> &ChatArchive {
        &self.chat.archive
    }

    /// Release the session store. Fails if a turn still holds the context.
    pub fn close(self) -> Result<(), anyhow::Error> {
        let chat = Arc::try_unwrap(self.chat).map_err(|_| anyhow!("Chat context still in use"))?;
        let archive =
            Arc::try_unwrap(chat.archive).map_err(|_| anyhow!("Session archive still in use"))?;
        archive.close().context("Failed to close session store")?;
        info!("Context closed");
        Ok(())
    }
}

/// A fresh session identifier.
pub fn new_session_id() -> String {
    uuid::Uuid::new_v4().to_string()
}
