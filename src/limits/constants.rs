use serde::{Deserialize, Serialize};

use crate::db::models::SubscriptionType;

/// A single allowance. `Unlimited` is a real variant rather than a numeric
/// sentinel so arithmetic on limits cannot silently overflow or go negative.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum QuotaLimit {
    Limited(u64),
    // serializes as JSON null
    Unlimited,
}

impl QuotaLimit {
    pub fn is_unlimited(&self) -> bool {
        matches!(self, QuotaLimit::Unlimited)
    }

    pub fn is_exhausted(&self) -> bool {
        matches!(self, QuotaLimit::Limited(0))
    }

    /// Subtracts usage from the allowance, clamping at zero. Unlimited
    /// absorbs any amount of usage.
    pub fn saturating_sub(self, used: u64) -> QuotaLimit {
        match self {
            QuotaLimit::Limited(n) => QuotaLimit::Limited(n.saturating_sub(used)),
            QuotaLimit::Unlimited => QuotaLimit::Unlimited,
        }
    }
}

/// The three named allowances a plan grants.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Quota {
    pub documents: QuotaLimit,
    pub recipients: QuotaLimit,
    pub direct_templates: QuotaLimit,
}

pub const FREE_PLAN_LIMITS: Quota = Quota {
    documents: QuotaLimit::Limited(10),
    recipients: QuotaLimit::Unlimited,
    direct_templates: QuotaLimit::Limited(1),
};

pub const BASIC_PLAN_LIMITS: Quota = Quota {
    documents: QuotaLimit::Unlimited,
    recipients: QuotaLimit::Unlimited,
    direct_templates: QuotaLimit::Limited(3),
};

pub const PROFESSIONAL_PLAN_LIMITS: Quota = Quota {
    documents: QuotaLimit::Unlimited,
    recipients: QuotaLimit::Unlimited,
    direct_templates: QuotaLimit::Unlimited,
};

pub const ENTERPRISE_PLAN_LIMITS: Quota = Quota {
    documents: QuotaLimit::Unlimited,
    recipients: QuotaLimit::Unlimited,
    direct_templates: QuotaLimit::Unlimited,
};

pub const TEAM_PLAN_LIMITS: Quota = Quota {
    documents: QuotaLimit::Unlimited,
    recipients: QuotaLimit::Unlimited,
    direct_templates: QuotaLimit::Unlimited,
};

/// Returned for users with no active subscription and for teams whose
/// subscription went inactive. Distinct from the FREE plan: a lapsed account
/// is cut off entirely until it renews.
pub const ZERO_QUOTA: Quota = Quota {
    documents: QuotaLimit::Limited(0),
    recipients: QuotaLimit::Limited(0),
    direct_templates: QuotaLimit::Limited(0),
};

/// Static plan table for user-owned subscriptions. Only the paid individual
/// tiers grant more than the FREE table; a TEAM plan attached to a user row
/// falls back to FREE — the TEAM table applies to team-owned subscriptions
/// only.
pub fn quota_for_plan(plan: SubscriptionType) -> Quota {
    match plan {
        SubscriptionType::Basic => BASIC_PLAN_LIMITS,
        SubscriptionType::Professional => PROFESSIONAL_PLAN_LIMITS,
        SubscriptionType::Enterprise => ENTERPRISE_PLAN_LIMITS,
        SubscriptionType::Free | SubscriptionType::Team => FREE_PLAN_LIMITS,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saturating_sub_clamps_at_zero() {
        assert_eq!(
            QuotaLimit::Limited(10).saturating_sub(13),
            QuotaLimit::Limited(0)
        );
        assert_eq!(
            QuotaLimit::Limited(10).saturating_sub(3),
            QuotaLimit::Limited(7)
        );
    }

    #[test]
    fn unlimited_absorbs_usage() {
        assert_eq!(
            QuotaLimit::Unlimited.saturating_sub(u64::MAX),
            QuotaLimit::Unlimited
        );
        assert!(!QuotaLimit::Unlimited.is_exhausted());
    }

    #[test]
    fn plan_table_matches_tiers() {
        assert_eq!(
            quota_for_plan(SubscriptionType::Free).documents,
            QuotaLimit::Limited(10)
        );
        assert_eq!(
            quota_for_plan(SubscriptionType::Basic).direct_templates,
            QuotaLimit::Limited(3)
        );
        assert!(quota_for_plan(SubscriptionType::Professional)
            .direct_templates
            .is_unlimited());
        assert!(quota_for_plan(SubscriptionType::Enterprise)
            .documents
            .is_unlimited());
    }

    #[test]
    fn team_plan_on_a_user_maps_to_free_table() {
        assert_eq!(quota_for_plan(SubscriptionType::Team), FREE_PLAN_LIMITS);
    }

    #[test]
    fn quota_limit_serializes_unlimited_as_null() {
        let quota = Quota {
            documents: QuotaLimit::Limited(10),
            recipients: QuotaLimit::Unlimited,
            direct_templates: QuotaLimit::Limited(1),
        };
        let json = serde_json::to_value(&quota).unwrap();
        assert_eq!(
            json,
            serde_json::json!({
                "documents": 10,
                "recipients": null,
                "directTemplates": 1,
            })
        );
        let back: Quota = serde_json::from_value(json).unwrap();
        assert_eq!(back, quota);
    }
}
