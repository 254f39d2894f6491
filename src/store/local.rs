use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use uuid::Uuid;

use crate::clock::Clock;
use crate::error::{AppError, Result};
use crate::models::plan::{Plan, PlanCatalog, PlanId};
use crate::store::kv::KvStore;

pub const USER_ID_KEY: &str = "deckmaster_user_id";
pub const PLANS_CACHE_KEY: &str = "deckmaster_plans_cache";
pub const PLANS_CACHE_TIME_KEY: &str = "deckmaster_plans_cache_time";
pub const ADMIN_PLAN_KEY: &str = "deckmaster_admin_plan";

/// Typed access to the client's persisted keys.
///
/// Reads treat a failing store as empty. Writes are fire-and-forget: a failed
/// write is logged and otherwise ignored.
#[derive(Clone)]
pub struct LocalStore {
    kv: Arc<dyn KvStore>,
}

impl LocalStore {
    pub fn new(kv: Arc<dyn KvStore>) -> Self {
        Self { kv }
    }

    /// The device-scoped user id, generated and persisted on first use.
    pub async fn user_id(&self, clock: &dyn Clock) -> String {
        if let Some(id) = self.read(USER_ID_KEY).await.filter(|id| !id.is_empty()) {
            return id;
        }

        let id = generate_user_id(clock.now());
        tracing::info!("🆕 Generated user id {}", id);
        self.write(USER_ID_KEY, &id).await;
        id
    }

    /// The cached plan catalog, if it was written within `ttl` of `now`.
    pub async fn cached_plans(&self, now: DateTime<Utc>, ttl: Duration) -> Option<PlanCatalog> {
        let stamped = self.read(PLANS_CACHE_TIME_KEY).await?;
        let stamped: i64 = match stamped.parse() {
            Ok(millis) => millis,
            Err(_) => {
                tracing::warn!("⚠️  Ignoring malformed plan cache timestamp '{}'", stamped);
                return None;
            }
        };

        let age = now.timestamp_millis().saturating_sub(stamped);
        if age < 0 || age as u128 >= ttl.as_millis() {
            tracing::debug!("Plan cache is stale ({} ms old)", age);
            return None;
        }

        let raw = self.read(PLANS_CACHE_KEY).await?;
        match sonic_rs::from_str::<Vec<Plan>>(&raw) {
            Ok(plans) => {
                let mut catalog = PlanCatalog::new();
                for plan in plans {
                    catalog.insert(plan);
                }
                Some(catalog)
            }
            Err(e) => {
                tracing::warn!("⚠️  Ignoring unreadable plan cache: {}", e);
                None
            }
        }
    }

    /// Writes the catalog and its fetch time.
    pub async fn store_plans(&self, catalog: &PlanCatalog, fetched_at: DateTime<Utc>) {
        match encode_plans(catalog) {
            Ok(raw) => {
                self.write(PLANS_CACHE_KEY, &raw).await;
                self.write(PLANS_CACHE_TIME_KEY, &fetched_at.timestamp_millis().to_string())
                    .await;
            }
            Err(e) => tracing::warn!("⚠️  Could not encode plan cache: {}", e),
        }
    }

    pub async fn invalidate_plans(&self) {
        self.remove(PLANS_CACHE_KEY).await;
        self.remove(PLANS_CACHE_TIME_KEY).await;
    }

    pub async fn admin_plan_override(&self) -> Option<PlanId> {
        self.read(ADMIN_PLAN_KEY)
            .await
            .map(|raw| PlanId::parse_or_free(&raw))
    }

    pub async fn set_admin_plan_override(&self, plan: PlanId) {
        self.write(ADMIN_PLAN_KEY, plan.as_str()).await;
    }

    pub async fn clear_admin_plan_override(&self) {
        self.remove(ADMIN_PLAN_KEY).await;
    }

    async fn read(&self, key: &str) -> Option<String> {
        match self.kv.get(key).await {
            Ok(value) => value,
            Err(e) => {
                tracing::warn!("⚠️  Store read of {} failed: {}", key, e);
                None
            }
        }
    }

    async fn write(&self, key: &str, value: &str) {
        if let Err(e) = self.kv.set(key, value).await {
            tracing::warn!("⚠️  Store write of {} failed: {}", key, e);
        }
    }

    async fn remove(&self, key: &str) {
        if let Err(e) = self.kv.delete(key).await {
            tracing::warn!("⚠️  Store delete of {} failed: {}", key, e);
        }
    }
}

fn encode_plans(catalog: &PlanCatalog) -> Result<String> {
    sonic_rs::to_string(&catalog.plans()).map_err(|e| AppError::Serialization(e.to_string()))
}

/// `user_{unix millis}_{12 random hex chars}`.
fn generate_user_id(now: DateTime<Utc>) -> String {
    let random = Uuid::new_v4().simple().to_string();
    format!("user_{}_{}", now.timestamp_millis(), &random[..12])
}
