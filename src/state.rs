use std::sync::Arc;

use crate::clock::{Clock, SystemClock};
use crate::config::Config;
use crate::error::Result;
use crate::events::EventBus;
use crate::gateway::client::Gateway;
use crate::gateway::http::ReqwestTransport;
use crate::gateway::transport::Transport;
use crate::store::kv::KvStore;
use crate::store::local::LocalStore;
use crate::store::memory::MemoryStore;
use crate::store::redis::RedisStore;

/// Everything one client session shares: configuration, backend access,
/// persisted keys, time and the event channel.
#[derive(Clone)]
pub struct SessionContext {
    /// The client's configuration.
    pub config: Arc<Config>,
    /// Retrying access to the REST API.
    pub gateway: Gateway,
    /// Typed access to the persisted keys.
    pub store: LocalStore,
    /// Source of time for backoff, polling and cache freshness.
    pub clock: Arc<dyn Clock>,
    /// Notifications for the presentation surface.
    pub events: EventBus,
    /// The device-scoped user id.
    pub user_id: String,
}

impl SessionContext {
    /// Creates a new `SessionContext` backed by the network and, when
    /// configured, Redis.
    ///
    /// # Arguments
    ///
    /// * `config` - The client's configuration.
    ///
    /// # Returns
    ///
    /// A `Result` containing the `SessionContext`.
    pub async fn new(config: &Config) -> Result<Self> {
        let kv: Arc<dyn KvStore> = match &config.redis_url {
            Some(url) => Arc::new(RedisStore::connect(url, &config.redis_key_prefix).await?),
            None => {
                tracing::info!("ℹ️  No REDIS_URL set, using in-memory store");
                Arc::new(MemoryStore::new())
            }
        };

        let transport = Arc::new(ReqwestTransport::new(&config.api_base_url));
        tracing::info!("✅ HTTP transport ready for {}", config.api_base_url);

        Ok(Self::from_parts(config.clone(), transport, kv, Arc::new(SystemClock)).await)
    }

    /// Assembles a context from explicit parts and resolves the user id.
    pub async fn from_parts(
        config: Config,
        transport: Arc<dyn Transport>,
        kv: Arc<dyn KvStore>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        let gateway = Gateway::new(transport, clock.clone(), config.gateway.clone());
        let store = LocalStore::new(kv);
        let user_id = store.user_id(clock.as_ref()).await;

        Self {
            config: Arc::new(config),
            gateway,
            store,
            clock,
            events: EventBus::new(),
            user_id,
        }
    }
}
