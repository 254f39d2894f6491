use tokio::sync::broadcast;

use crate::config::Config;
use crate::error::Result;
use crate::events::{NoticeLevel, SessionEvent};
use crate::models::design::{DesignStyle, builtin_designs};
use crate::models::generation::{GeneratedDeck, GenerationRequest};
use crate::models::user::User;
use crate::services::admin::AdminSessionManager;
use crate::services::generation::GenerationOrchestrator;
use crate::services::quota::QuotaEngine;
use crate::state::SessionContext;

/// One client session: the quota engine, admin session and generation
/// workflow wired around a shared [`SessionContext`].
#[derive(Clone)]
pub struct DeckClient {
    ctx: SessionContext,
    admin: AdminSessionManager,
    quota: QuotaEngine,
    generation: GenerationOrchestrator,
}

impl DeckClient {
    /// Builds a client from configuration, connecting to Redis when configured.
    pub async fn connect(config: &Config) -> Result<Self> {
        let ctx = SessionContext::new(config).await?;
        Ok(Self::from_context(ctx))
    }

    pub fn from_context(ctx: SessionContext) -> Self {
        let admin = AdminSessionManager::new(ctx.clone());
        let quota = QuotaEngine::new(ctx.clone(), admin.clone());
        let generation = GenerationOrchestrator::new(ctx.clone(), quota.clone(), admin.clone());

        Self {
            ctx,
            admin,
            quota,
            generation,
        }
    }

    pub fn context(&self) -> &SessionContext {
        &self.ctx
    }

    pub fn admin(&self) -> &AdminSessionManager {
        &self.admin
    }

    pub fn quota(&self) -> &QuotaEngine {
        &self.quota
    }

    pub fn subscribe(&self) -> broadcast::Receiver<SessionEvent> {
        self.ctx.events.subscribe()
    }

    /// Checks the backend, resumes an admin session if the backend still has
    /// one, then loads the user and the plan catalog together.
    pub async fn bootstrap(&self) -> User {
        self.health_check().await;
        self.admin.restore().await;

        let (user, catalog) = futures::join!(self.quota.load_user(), self.quota.load_plan_catalog());
        tracing::info!(
            "✅ Session ready for {} ({} plan, {} plans known)",
            user.id,
            user.plan,
            catalog.len()
        );
        user
    }

    /// Whether the backend answered its health endpoint.
    pub async fn health_check(&self) -> bool {
        match self.ctx.gateway.health().await {
            Ok(health) => {
                tracing::info!(
                    "✅ API Health Check Passed: {} {}",
                    health.status,
                    health.message.unwrap_or_default()
                );
                true
            }
            Err(e) => {
                tracing::warn!("⚠️  API Health Check Failed: {}", e);
                self.ctx
                    .events
                    .notice(NoticeLevel::Warning, "DeckMaster backend is unreachable");
                false
            }
        }
    }

    /// Generates a deck, then refreshes the user so usage reflects the
    /// consumed quota.
    pub async fn generate(&self, request: GenerationRequest) -> Result<GeneratedDeck> {
        let deck = self.generation.submit(request).await?;
        self.quota.load_user().await;
        self.ctx.events.notice(NoticeLevel::Success, "Presentation ready");
        Ok(deck)
    }

    /// Design styles from the backend, else the built-in list.
    pub async fn designs(&self) -> Vec<DesignStyle> {
        match self.ctx.gateway.list_designs().await {
            Ok(response) if !response.designs.is_empty() => response.designs,
            Ok(_) => builtin_designs(),
            Err(e) => {
                tracing::warn!("⚠️  Could not load designs, using built-in list: {}", e);
                builtin_designs()
            }
        }
    }
}
