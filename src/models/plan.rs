use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Deserializer, Serialize};

/// Identifier of a subscription tier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum PlanId {
    #[default]
    Free,
    Elite,
    Pro,
    Premium,
}

impl PlanId {
    /// Every tier, cheapest first.
    pub const ALL: [PlanId; 4] = [PlanId::Free, PlanId::Elite, PlanId::Pro, PlanId::Premium];

    pub const fn as_str(&self) -> &'static str {
        match self {
            PlanId::Free => "free",
            PlanId::Elite => "elite",
            PlanId::Pro => "pro",
            PlanId::Premium => "premium",
        }
    }

    /// Parses a plan id, falling back to `free` for anything unknown.
    pub fn parse_or_free(raw: &str) -> Self {
        raw.parse().unwrap_or_else(|_| {
            tracing::warn!("⚠️  Unknown plan '{}', falling back to free", raw);
            PlanId::Free
        })
    }
}

impl fmt::Display for PlanId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PlanId {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "free" => Ok(PlanId::Free),
            "elite" => Ok(PlanId::Elite),
            "pro" => Ok(PlanId::Pro),
            "premium" => Ok(PlanId::Premium),
            other => Err(format!("unknown plan '{}'", other)),
        }
    }
}

impl<'de> Deserialize<'de> for PlanId {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(PlanId::parse_or_free(&raw))
    }
}

/// Which usage cap blocked a generation.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LimitKind {
    Daily,
    Lifetime,
}

impl fmt::Display for LimitKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LimitKind::Daily => f.write_str("daily"),
            LimitKind::Lifetime => f.write_str("lifetime"),
        }
    }
}

/// A subscription tier with its limits and feature flags.
///
/// Field names follow the backend's JSON so the same struct reads `/plans`
/// and round-trips through the local cache.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    /// Filled from the catalog key; the backend does not send it.
    #[serde(default)]
    pub id: PlanId,
    pub name: String,
    /// Generations allowed per calendar day; `None` means unbounded.
    #[serde(default)]
    pub daily_limit: Option<u32>,
    /// Generations allowed over the account's lifetime; `None` means unbounded.
    #[serde(default)]
    pub total_limit: Option<u32>,
    pub max_slides: u32,
    #[serde(default)]
    pub has_ads: bool,
    #[serde(rename = "visual_elements", default)]
    pub visual_elements_allowed: bool,
    #[serde(rename = "price", default)]
    pub price_monthly: f64,
    #[serde(default)]
    pub description: Option<String>,
}

/// Slides allowed per deck while an admin session is active.
pub const ADMIN_MAX_SLIDES: u32 = 50;

impl Plan {
    /// The built-in definition of a tier, used whenever the backend's catalog
    /// is unavailable.
    pub fn builtin(id: PlanId) -> Plan {
        let (name, daily, total, max_slides, has_ads, visuals, price, description) = match id {
            PlanId::Free => (
                "Free",
                3,
                Some(3),
                5,
                true,
                false,
                0.0,
                "Perfect for trying out DeckMaster",
            ),
            PlanId::Elite => (
                "Elite",
                5,
                None,
                15,
                false,
                true,
                10.0,
                "Great for regular users",
            ),
            PlanId::Pro => (
                "Pro",
                10,
                None,
                10,
                false,
                true,
                20.0,
                "Perfect for professionals",
            ),
            PlanId::Premium => (
                "Premium",
                20,
                None,
                20,
                false,
                true,
                25.0,
                "Ultimate presentation power",
            ),
        };

        Plan {
            id,
            name: name.to_string(),
            daily_limit: Some(daily),
            total_limit: total,
            max_slides,
            has_ads,
            visual_elements_allowed: visuals,
            price_monthly: price,
            description: Some(description.to_string()),
        }
    }

    /// The synthetic unlimited plan shown and enforced while admin mode is on.
    /// Never persisted.
    pub fn admin_unlimited() -> Plan {
        Plan {
            id: PlanId::Premium,
            name: "ADMIN (All Features Free)".to_string(),
            daily_limit: Some(999),
            total_limit: None,
            max_slides: ADMIN_MAX_SLIDES,
            has_ads: false,
            visual_elements_allowed: true,
            price_monthly: 0.0,
            description: Some("Admin mode with unlimited access".to_string()),
        }
    }
}

/// The set of known plans, one canonical definition per id.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PlanCatalog {
    plans: HashMap<PlanId, Plan>,
}

impl PlanCatalog {
    pub fn new() -> Self {
        Self::default()
    }

    /// A catalog holding every built-in plan.
    pub fn builtin() -> Self {
        let mut catalog = Self::new();
        for id in PlanId::ALL {
            catalog.insert(Plan::builtin(id));
        }
        catalog
    }

    /// Builds a catalog from the backend's `plans` map, skipping unknown ids.
    pub fn from_wire(plans: impl IntoIterator<Item = (String, Plan)>) -> Self {
        let mut catalog = Self::new();
        for (key, mut plan) in plans {
            match key.parse::<PlanId>() {
                Ok(id) => {
                    plan.id = id;
                    catalog.insert(plan);
                }
                Err(e) => tracing::warn!("⚠️  Skipping plan from backend: {}", e),
            }
        }
        catalog
    }

    pub fn insert(&mut self, plan: Plan) {
        self.plans.insert(plan.id, plan);
    }

    pub fn get(&self, id: PlanId) -> Option<&Plan> {
        self.plans.get(&id)
    }

    pub fn len(&self) -> usize {
        self.plans.len()
    }

    pub fn is_empty(&self) -> bool {
        self.plans.is_empty()
    }

    /// Catalog entry, else the built-in definition. Never fails.
    pub fn resolve(&self, id: PlanId) -> Plan {
        self.get(id).cloned().unwrap_or_else(|| Plan::builtin(id))
    }

    /// Same chain as [`resolve`](Self::resolve) for an arbitrary string; an
    /// unknown id resolves to `free`.
    pub fn resolve_name(&self, raw: &str) -> Plan {
        self.resolve(PlanId::parse_or_free(raw))
    }

    /// Plans sorted by id, cheapest tier first.
    pub fn plans(&self) -> Vec<Plan> {
        let mut plans: Vec<Plan> = self.plans.values().cloned().collect();
        plans.sort_by_key(|p| p.id);
        plans
    }
}
