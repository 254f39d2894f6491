use std::sync::Arc;

use chrono::{DateTime, Utc};
use tokio::sync::RwLock;

use crate::error::{AppError, Result};
use crate::events::{NoticeLevel, SessionEvent};
use crate::models::plan::{LimitKind, Plan, PlanCatalog, PlanId};
use crate::models::user::User;
use crate::services::admin::AdminSessionManager;
use crate::state::SessionContext;

const ADMIN_REASON: &str = "Admin mode: unlimited access";

/// The answer to "may the user generate now?".
#[derive(Debug, Clone, PartialEq)]
pub struct Admission {
    pub allowed: bool,
    pub reason: Option<String>,
    /// Which cap blocked the request.
    pub limit: Option<LimitKind>,
    pub remaining_daily: Option<u32>,
    pub remaining_total: Option<u32>,
}

impl Admission {
    fn admin() -> Self {
        Self {
            allowed: true,
            reason: Some(ADMIN_REASON.to_string()),
            limit: None,
            remaining_daily: None,
            remaining_total: None,
        }
    }

    fn open(remaining_daily: Option<u32>, remaining_total: Option<u32>) -> Self {
        Self {
            allowed: true,
            reason: None,
            limit: None,
            remaining_daily,
            remaining_total,
        }
    }

    /// Keeps the remaining counters as they are; only the blocking cap reads 0.
    fn blocked(self, limit: LimitKind, reason: String) -> Self {
        Self {
            allowed: false,
            reason: Some(reason),
            limit: Some(limit),
            ..self
        }
    }

    /// Converts a rejection into the matching error.
    pub fn into_result(self) -> Result<Self> {
        if self.allowed {
            return Ok(self);
        }
        Err(AppError::QuotaExceeded {
            limit: self.limit.unwrap_or(LimitKind::Daily),
            reason: self.reason.unwrap_or_default(),
        })
    }
}

/// Outcome of a plan change request.
#[derive(Debug, Clone, PartialEq)]
pub enum PlanSwitch {
    /// Admin mode is on; every plan is already available.
    AlreadyUnlocked,
    /// The user is already on that plan.
    Unchanged,
    /// The backend accepted the change.
    Switched(User),
}

/// Usage figures for display.
#[derive(Debug, Clone, PartialEq)]
pub struct UsageSnapshot {
    pub plan: Plan,
    pub admin: bool,
    pub daily_usage: u32,
    pub total_usage: u32,
    pub daily_limit: Option<u32>,
    pub total_limit: Option<u32>,
    pub remaining_daily: Option<u32>,
    pub remaining_total: Option<u32>,
    /// 0–100, lifetime-based when the plan has a lifetime cap.
    pub usage_percent: u8,
}

struct QuotaState {
    user: User,
    catalog: PlanCatalog,
    catalog_fetched_at: Option<DateTime<Utc>>,
}

/// Holds the user, their plan and the catalog, and decides admission.
#[derive(Clone)]
pub struct QuotaEngine {
    ctx: SessionContext,
    admin: AdminSessionManager,
    state: Arc<RwLock<QuotaState>>,
}

impl QuotaEngine {
    /// Starts with a fresh free-tier user and the built-in catalog until the
    /// backend answers.
    pub fn new(ctx: SessionContext, admin: AdminSessionManager) -> Self {
        let user = User::new(ctx.user_id.clone(), ctx.clock.today());

        Self {
            ctx,
            admin,
            state: Arc::new(RwLock::new(QuotaState {
                user,
                catalog: PlanCatalog::builtin(),
                catalog_fetched_at: None,
            })),
        }
    }

    pub async fn user(&self) -> User {
        self.state.read().await.user.clone()
    }

    pub async fn catalog(&self) -> PlanCatalog {
        self.state.read().await.catalog.clone()
    }

    /// Returns the plan catalog, refreshing it when the in-memory copy is older
    /// than the cache window.
    ///
    /// Order: memory, then the persisted cache, then the backend. A failed
    /// fetch keeps whatever catalog is already loaded.
    pub async fn load_plan_catalog(&self) -> PlanCatalog {
        let now = self.ctx.clock.now();
        let ttl = self.ctx.config.plan_cache_ttl;

        {
            let state = self.state.read().await;
            if let Some(fetched_at) = state.catalog_fetched_at {
                let age = now.signed_duration_since(fetched_at);
                if age >= chrono::Duration::zero()
                    && age.to_std().is_ok_and(|age| age < ttl)
                {
                    return state.catalog.clone();
                }
            }
        }

        if let Some(cached) = self.ctx.store.cached_plans(now, ttl).await {
            tracing::debug!("📦 Plan catalog loaded from cache");
            let count = cached.len();
            self.state.write().await.catalog = cached.clone();
            self.ctx.events.emit(SessionEvent::PlansLoaded {
                count,
                from_cache: true,
            });
            return cached;
        }

        match self.ctx.gateway.list_plans().await {
            Ok(response) => {
                let fetched = PlanCatalog::from_wire(response.plans);
                if fetched.is_empty() {
                    tracing::warn!("⚠️  Backend returned no known plans, keeping current catalog");
                    return self.catalog().await;
                }

                {
                    let mut state = self.state.write().await;
                    state.catalog = fetched.clone();
                    state.catalog_fetched_at = Some(now);
                }
                self.ctx.store.store_plans(&fetched, now).await;

                tracing::info!("✅ Loaded {} plans from backend", fetched.len());
                self.ctx.events.emit(SessionEvent::PlansLoaded {
                    count: fetched.len(),
                    from_cache: false,
                });
                fetched
            }
            Err(e) => {
                tracing::warn!("⚠️  Could not load plans, using current catalog: {}", e);
                self.catalog().await
            }
        }
    }

    /// Refreshes the user from the backend.
    ///
    /// On failure the current user is kept and a `Degraded` event is emitted.
    pub async fn load_user(&self) -> User {
        let ctx = &self.ctx;

        let payload = match ctx.gateway.get_user(&ctx.user_id).await {
            Ok(payload) => payload,
            Err(e) => {
                tracing::warn!("⚠️  Could not load user, continuing offline: {}", e);
                ctx.events.emit(SessionEvent::Degraded {
                    reason: e.to_string(),
                });
                return self.user().await;
            }
        };

        let mut user = payload.user;
        let backend_plan = user.plan;
        user.roll_over(ctx.clock.today());

        if self.admin.is_active().await {
            if let Some(plan) = ctx.store.admin_plan_override().await {
                user.plan = plan;
            }
        }

        {
            let mut state = self.state.write().await;
            if let Some(mut plan) = payload.plan {
                plan.id = backend_plan;
                state.catalog.insert(plan);
            }
            state.user = user.clone();
        }

        tracing::debug!(
            "👤 User {} on {} plan ({} today, {} total)",
            user.id,
            user.plan,
            user.daily_usage,
            user.total_usage
        );
        ctx.events.emit(SessionEvent::UserLoaded { plan: user.plan });
        user
    }

    /// Catalog entry, else the built-in definition. Never fails.
    pub async fn resolve_plan(&self, id: PlanId) -> Plan {
        self.state.read().await.catalog.resolve(id)
    }

    /// Resolves an arbitrary plan string; unknown ids resolve to `free`.
    pub async fn resolve_plan_name(&self, raw: &str) -> Plan {
        self.state.read().await.catalog.resolve_name(raw)
    }

    /// Decides whether another generation is allowed right now.
    pub async fn can_generate(&self) -> Admission {
        if self.admin.is_active().await {
            return Admission::admin();
        }

        let today = self.ctx.clock.today();
        let mut state = self.state.write().await;
        if state.user.roll_over(today) {
            tracing::info!("🌅 New day, daily usage reset");
        }

        let user = &state.user;
        let plan = state.catalog.resolve(user.plan);
        let admission = Admission::open(
            plan.daily_limit
                .map(|limit| limit.saturating_sub(user.daily_usage)),
            plan.total_limit
                .map(|limit| limit.saturating_sub(user.total_usage)),
        );

        if let Some(total_limit) = plan.total_limit {
            if user.total_usage >= total_limit {
                return admission.blocked(
                    LimitKind::Lifetime,
                    format!(
                        "You have reached the lifetime limit of {} presentations for the {} plan. Please upgrade to continue.",
                        total_limit, plan.name
                    ),
                );
            }
        }

        if let Some(daily_limit) = plan.daily_limit {
            if user.daily_usage >= daily_limit {
                return admission.blocked(
                    LimitKind::Daily,
                    format!(
                        "Daily limit of {} presentations reached. Try again tomorrow or upgrade your plan.",
                        daily_limit
                    ),
                );
            }
        }

        admission
    }

    /// Moves the user to another plan.
    ///
    /// A failed backend call leaves local state untouched.
    pub async fn switch_plan(&self, plan: PlanId) -> Result<PlanSwitch> {
        let ctx = &self.ctx;

        if self.admin.is_active().await {
            tracing::info!("👑 Plan switch to {} skipped, admin mode unlocks every plan", plan);
            ctx.events.emit(SessionEvent::PlanAlreadyUnlocked { plan });
            return Ok(PlanSwitch::AlreadyUnlocked);
        }

        if self.state.read().await.user.plan == plan {
            return Ok(PlanSwitch::Unchanged);
        }

        let payload = ctx.gateway.update_plan(&ctx.user_id, plan).await?;

        let mut user = payload.user;
        user.roll_over(ctx.clock.today());

        {
            let mut state = self.state.write().await;
            if let Some(mut definition) = payload.plan {
                definition.id = plan;
                state.catalog.insert(definition);
            }
            state.user = user.clone();
            state.catalog_fetched_at = None;
        }
        ctx.store.invalidate_plans().await;

        let name = self.resolve_plan(plan).await.name;
        tracing::info!("✅ Switched to {} plan", plan);
        ctx.events.emit(SessionEvent::PlanSwitched { plan });
        ctx.events
            .notice(NoticeLevel::Success, format!("Switched to {} plan", name));

        Ok(PlanSwitch::Switched(user))
    }

    /// The plan that governs the next generation.
    pub async fn effective_plan(&self) -> Plan {
        if self.admin.is_active().await {
            return Plan::admin_unlimited();
        }
        let plan = self.state.read().await.user.plan;
        self.resolve_plan(plan).await
    }

    /// Picks the plan shown while admin mode is on. Persisted until the
    /// session ends.
    pub async fn set_admin_plan_override(&self, plan: PlanId) -> Result<()> {
        if !self.admin.is_active().await {
            return Err(AppError::Authorization(
                "Admin mode is not active".to_string(),
            ));
        }

        self.ctx.store.set_admin_plan_override(plan).await;
        self.state.write().await.user.plan = plan;
        tracing::info!("👑 Admin plan override set to {}", plan);
        Ok(())
    }

    pub async fn usage(&self) -> UsageSnapshot {
        let admin = self.admin.is_active().await;
        let plan = self.effective_plan().await;

        let mut user = self.user().await;
        user.roll_over(self.ctx.clock.today());

        if admin {
            return UsageSnapshot {
                plan,
                admin,
                daily_usage: user.daily_usage,
                total_usage: user.total_usage,
                daily_limit: None,
                total_limit: None,
                remaining_daily: None,
                remaining_total: None,
                usage_percent: 0,
            };
        }

        let usage_percent = match (plan.total_limit, plan.daily_limit) {
            (Some(total), _) => percent(user.total_usage, total),
            (None, Some(daily)) => percent(user.daily_usage, daily),
            (None, None) => 0,
        };

        UsageSnapshot {
            daily_limit: plan.daily_limit,
            total_limit: plan.total_limit,
            remaining_daily: plan
                .daily_limit
                .map(|limit| limit.saturating_sub(user.daily_usage)),
            remaining_total: plan
                .total_limit
                .map(|limit| limit.saturating_sub(user.total_usage)),
            daily_usage: user.daily_usage,
            total_usage: user.total_usage,
            usage_percent,
            admin,
            plan,
        }
    }
}

fn percent(used: u32, limit: u32) -> u8 {
    if limit == 0 {
        return 100;
    }
    let pct = (u64::from(used) * 100 / u64::from(limit)).min(100);
    pct as u8
}
