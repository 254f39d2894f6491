use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::models::plan::PlanId;

/// Represents the current user as the backend reports it.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct User {
    /// The device-scoped identifier for the user.
    #[serde(rename = "user_id", alias = "id")]
    pub id: String,
    /// The user's subscription plan.
    #[serde(default)]
    pub plan: PlanId,
    /// Generations performed since `last_reset_date`.
    #[serde(default)]
    pub daily_usage: u32,
    /// Generations performed over the account's lifetime.
    #[serde(default)]
    pub total_usage: u32,
    /// The day `daily_usage` was last reset.
    pub last_reset_date: NaiveDate,
}

impl User {
    /// A fresh free-tier user with no usage, as assumed before the backend answers.
    pub fn new(id: impl Into<String>, today: NaiveDate) -> Self {
        Self {
            id: id.into(),
            plan: PlanId::Free,
            daily_usage: 0,
            total_usage: 0,
            last_reset_date: today,
        }
    }

    /// Resets the daily counter when the calendar day changed.
    ///
    /// # Returns
    ///
    /// `true` if a rollover happened.
    pub fn roll_over(&mut self, today: NaiveDate) -> bool {
        if today > self.last_reset_date {
            self.daily_usage = 0;
            self.last_reset_date = today;
            true
        } else {
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn backend_user_deserializes() {
        let body = r#"{
            "user_id": "user_1700000000000_abc",
            "plan": "pro",
            "daily_usage": 2,
            "total_usage": 14,
            "last_reset_date": "2024-05-01",
            "created_at": "2024-04-01T10:00:00",
            "last_activity": "2024-05-01T10:00:00"
        }"#;
        let user: User = sonic_rs::from_str(body).unwrap();
        assert_eq!(user.id, "user_1700000000000_abc");
        assert_eq!(user.plan, PlanId::Pro);
        assert_eq!(user.total_usage, 14);
    }

    #[test]
    fn daily_usage_resets_only_on_a_new_day() {
        let day = NaiveDate::from_ymd_opt(2024, 5, 1).unwrap();
        let mut user = User::new("u", day);
        user.daily_usage = 3;
        user.total_usage = 3;

        assert!(!user.roll_over(day));
        assert_eq!(user.daily_usage, 3);

        assert!(user.roll_over(day.succ_opt().unwrap()));
        assert_eq!(user.daily_usage, 0);
        assert_eq!(user.total_usage, 3);
    }
}
