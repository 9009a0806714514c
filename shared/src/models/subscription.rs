//! Subscription plans and billing status

use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Length of the trial granted on registration
pub const TRIAL_DAYS: i64 = 14;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "subscription_plan", rename_all = "snake_case"))]
pub enum SubscriptionPlan {
    Free,
    Starter,
    Pro,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
#[cfg_attr(feature = "db", derive(sqlx::Type))]
#[cfg_attr(feature = "db", sqlx(type_name = "subscription_status", rename_all = "snake_case"))]
pub enum SubscriptionStatus {
    Trialing,
    Active,
    PastDue,
    Cancelled,
}

/// Resource limits of a plan. `None` means unlimited.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct PlanLimits {
    pub max_products: Option<i64>,
    pub max_staff: Option<i64>,
}

impl PlanLimits {
    pub fn allows_products(&self, current: i64) -> bool {
        self.max_products.map_or(true, |max| current < max)
    }

    pub fn allows_staff(&self, current: i64) -> bool {
        self.max_staff.map_or(true, |max| current < max)
    }
}

impl SubscriptionPlan {
    pub fn as_str(&self) -> &'static str {
        match self {
            SubscriptionPlan::Free => "free",
            SubscriptionPlan::Starter => "starter",
            SubscriptionPlan::Pro => "pro",
        }
    }

    pub fn limits(&self) -> PlanLimits {
        match self {
            SubscriptionPlan::Free => PlanLimits {
                max_products: Some(30),
                max_staff: Some(2),
            },
            SubscriptionPlan::Starter => PlanLimits {
                max_products: Some(200),
                max_staff: Some(10),
            },
            SubscriptionPlan::Pro => PlanLimits {
                max_products: None,
                max_staff: None,
            },
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[cfg_attr(feature = "db", derive(sqlx::FromRow))]
pub struct Subscription {
    pub id: Uuid,
    pub establishment_id: Uuid,
    pub plan: SubscriptionPlan,
    pub status: SubscriptionStatus,
    pub trial_ends_at: Option<DateTime<Utc>>,
    pub current_period_end: Option<DateTime<Utc>>,
    pub cancelled_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Subscription {
    /// Whether the establishment may keep operating (taking orders, etc.)
    pub fn is_usable(&self, now: DateTime<Utc>) -> bool {
        match self.status {
            SubscriptionStatus::Trialing => self.trial_ends_at.map_or(false, |end| now < end),
            SubscriptionStatus::Active | SubscriptionStatus::PastDue => true,
            SubscriptionStatus::Cancelled => false,
        }
    }

    pub fn trial_end_from(start: DateTime<Utc>) -> DateTime<Utc> {
        start + Duration::days(TRIAL_DAYS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subscription(status: SubscriptionStatus, trial_ends_at: Option<DateTime<Utc>>) -> Subscription {
        Subscription {
            id: Uuid::new_v4(),
            establishment_id: Uuid::nil(),
            plan: SubscriptionPlan::Starter,
            status,
            trial_ends_at,
            current_period_end: None,
            cancelled_at: None,
            created_at: Utc::now(),
            updated_at: Utc::now(),
        }
    }

    #[test]
    fn test_trial_usable_until_end() {
        let now = Utc::now();
        let trial = subscription(SubscriptionStatus::Trialing, Some(Subscription::trial_end_from(now)));
        assert!(trial.is_usable(now));
        assert!(!trial.is_usable(now + Duration::days(TRIAL_DAYS + 1)));

        let no_end = subscription(SubscriptionStatus::Trialing, None);
        assert!(!no_end.is_usable(now));
    }

    #[test]
    fn test_status_usability() {
        let now = Utc::now();
        assert!(subscription(SubscriptionStatus::Active, None).is_usable(now));
        assert!(subscription(SubscriptionStatus::PastDue, None).is_usable(now));
        assert!(!subscription(SubscriptionStatus::Cancelled, None).is_usable(now));
    }

    #[test]
    fn test_plan_limits() {
        let free = SubscriptionPlan::Free.limits();
        assert!(free.allows_products(29));
        assert!(!free.allows_products(30));
        assert!(!free.allows_staff(2));
        assert!(SubscriptionPlan::Pro.limits().allows_staff(10_000));
    }
}
