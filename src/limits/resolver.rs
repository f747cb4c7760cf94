use async_trait::async_trait;
use chrono::{DateTime, Datelike, TimeZone, Utc};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::db::models::{SubscriptionStatus, TeamWithSubscription, UserWithSubscriptions};
use crate::limits::constants::{Quota, TEAM_PLAN_LIMITS, ZERO_QUOTA, quota_for_plan};
use crate::limits::error::LimitsError;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LimitsRequest {
    /// Email of the authenticated caller. Supplied by the request layer,
    /// never taken from untrusted input.
    pub email: Option<String>,
    /// When set, resolve the team's limits instead of the caller's own.
    #[serde(default)]
    pub team_id: Option<i64>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct LimitsResponse {
    pub quota: Quota,
    pub remaining: Quota,
}

impl LimitsResponse {
    fn zero() -> Self {
        Self {
            quota: ZERO_QUOTA,
            remaining: ZERO_QUOTA,
        }
    }
}

/// Data-access surface the resolver needs. `Repository` implements this
/// against Postgres; tests use an in-memory fake.
#[async_trait]
pub trait EntitlementStore: Send + Sync {
    async fn find_user_with_subscriptions(
        &self,
        email: &str,
    ) -> anyhow::Result<Option<UserWithSubscriptions>>;

    /// Returns the team only when `email` belongs to one of its members.
    /// Existence and membership are checked in one lookup so callers cannot
    /// distinguish a foreign team from a missing one.
    async fn find_team_for_member(
        &self,
        team_id: i64,
        email: &str,
    ) -> anyhow::Result<Option<TeamWithSubscription>>;

    /// Personal documents created at or after `since`, excluding those that
    /// came in through a direct template link.
    async fn count_documents_since(&self, user_id: i64, since: DateTime<Utc>)
    -> anyhow::Result<u64>;

    /// Templates owned by the user. Not period-scoped.
    async fn count_templates(&self, user_id: i64) -> anyhow::Result<u64>;
}

/// Resolves the usage quota and remaining allowance for the current billing
/// period. Stateless: every call reads fresh and computes from the static
/// plan table; nothing is cached or written back.
pub struct LimitsResolver<S> {
    store: S,
}

impl<S: EntitlementStore> LimitsResolver<S> {
    pub fn new(store: S) -> Self {
        Self { store }
    }

    pub async fn resolve(&self, request: &LimitsRequest) -> Result<LimitsResponse, LimitsError> {
        let email = match request.email.as_deref() {
            Some(email) if !email.is_empty() => email,
            _ => return Err(LimitsError::Unauthorized),
        };

        match request.team_id {
            Some(team_id) => self.resolve_team(email, team_id).await,
            None => self.resolve_user(email).await,
        }
    }

    /// Reports whether the caller may create another document this month.
    /// Enforcement belongs to the document-creation flow; this only reads.
    pub async fn can_send_document(&self, email: &str) -> Result<bool, LimitsError> {
        let resolved = self
            .resolve(&LimitsRequest {
                email: Some(email.to_string()),
                team_id: None,
            })
            .await?;

        Ok(!resolved.remaining.documents.is_exhausted())
    }

    async fn resolve_user(&self, email: &str) -> Result<LimitsResponse, LimitsError> {
        let record = self
            .store
            .find_user_with_subscriptions(email)
            .await?
            .ok_or(LimitsError::UserNotFound)?;

        // First ACTIVE subscription in the retrieved order wins when several
        // are active at once.
        let subscription = record
            .subscriptions
            .iter()
            .find(|s| s.status == SubscriptionStatus::Active);

        let Some(subscription) = subscription else {
            // No active subscription cuts the account off entirely. This is
            // deliberately not the FREE table: lapsed accounts stay at zero
            // until they renew.
            debug!(user_id = record.user.id, "No active subscription");
            return Ok(LimitsResponse::zero());
        };

        let quota = quota_for_plan(subscription.plan_type);
        let since = start_of_month(Utc::now());

        let (documents, templates) = futures::try_join!(
            self.store.count_documents_since(record.user.id, since),
            self.store.count_templates(record.user.id),
        )?;

        debug!(
            user_id = record.user.id,
            plan = ?subscription.plan_type,
            documents,
            templates,
            "Resolved user limits"
        );

        let remaining = Quota {
            documents: quota.documents.saturating_sub(documents),
            // No per-period recipient usage is tracked.
            recipients: quota.recipients,
            direct_templates: quota.direct_templates.saturating_sub(templates),
        };

        Ok(LimitsResponse { quota, remaining })
    }

    async fn resolve_team(&self, email: &str, team_id: i64) -> Result<LimitsResponse, LimitsError> {
        let record = self
            .store
            .find_team_for_member(team_id, email)
            .await?
            .ok_or(LimitsError::TeamNotFound)?;

        if let Some(subscription) = &record.subscription {
            if subscription.status == SubscriptionStatus::Inactive {
                debug!(team_id, "Team subscription inactive");
                return Ok(LimitsResponse::zero());
            }
        }

        // A team with no subscription record at all falls through to the
        // full table; only an explicitly inactive one zeroes out. Team usage
        // is not decremented.
        Ok(LimitsResponse {
            quota: TEAM_PLAN_LIMITS,
            remaining: TEAM_PLAN_LIMITS,
        })
    }
}

/// Start of the current calendar month in UTC, inclusive.
fn start_of_month(now: DateTime<Utc>) -> DateTime<Utc> {
    Utc.with_ymd_and_hms(now.year(), now.month(), 1, 0, 0, 0)
        .single()
        .expect("first day of month is a valid UTC timestamp")
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use chrono::Duration;

    use super::*;
    use crate::db::models::{
        DocumentSource, Subscription, SubscriptionType, Team, User, UserWithSubscriptions,
    };
    use crate::limits::constants::{BASIC_PLAN_LIMITS, FREE_PLAN_LIMITS, QuotaLimit};

    struct FakeDocument {
        created_at: DateTime<Utc>,
        source: DocumentSource,
    }

    #[derive(Default)]
    struct FakeStore {
        users: Vec<UserWithSubscriptions>,
        teams: Vec<(TeamWithSubscription, Vec<String>)>,
        documents: HashMap<i64, Vec<FakeDocument>>,
        templates: HashMap<i64, u64>,
    }

    #[async_trait]
    impl EntitlementStore for FakeStore {
        async fn find_user_with_subscriptions(
            &self,
            email: &str,
        ) -> anyhow::Result<Option<UserWithSubscriptions>> {
            Ok(self.users.iter().find(|u| u.user.email == email).cloned())
        }

        async fn find_team_for_member(
            &self,
            team_id: i64,
            email: &str,
        ) -> anyhow::Result<Option<TeamWithSubscription>> {
            Ok(self
                .teams
                .iter()
                .find(|(t, members)| {
                    t.team.id == team_id && members.iter().any(|m| m == email)
                })
                .map(|(t, _)| t.clone()))
        }

        async fn count_documents_since(
            &self,
            user_id: i64,
            since: DateTime<Utc>,
        ) -> anyhow::Result<u64> {
            Ok(self
                .documents
                .get(&user_id)
                .map(|docs| {
                    docs.iter()
                        .filter(|d| {
                            d.created_at >= since
                                && d.source != DocumentSource::TemplateDirectLink
                        })
                        .count() as u64
                })
                .unwrap_or(0))
        }

        async fn count_templates(&self, user_id: i64) -> anyhow::Result<u64> {
            Ok(self.templates.get(&user_id).copied().unwrap_or(0))
        }
    }

    fn user(id: i64, email: &str) -> User {
        User {
            id,
            name: None,
            email: email.to_string(),
            roles: vec![crate::db::models::Role::User],
            created_at: Utc::now(),
        }
    }

    fn subscription(
        id: i64,
        user_id: i64,
        plan_type: SubscriptionType,
        status: SubscriptionStatus,
    ) -> Subscription {
        Subscription {
            id,
            user_id: Some(user_id),
            team_id: None,
            plan_type,
            status,
            created_at: Utc::now(),
            period_end: None,
        }
    }

    fn team(id: i64, subscription: Option<Subscription>) -> TeamWithSubscription {
        TeamWithSubscription {
            team: Team {
                id,
                name: format!("team-{id}"),
                created_at: Utc::now(),
            },
            subscription,
        }
    }

    fn request(email: &str) -> LimitsRequest {
        LimitsRequest {
            email: Some(email.to_string()),
            team_id: None,
        }
    }

    fn team_request(email: &str, team_id: i64) -> LimitsRequest {
        LimitsRequest {
            email: Some(email.to_string()),
            team_id: Some(team_id),
        }
    }

    fn doc(source: DocumentSource) -> FakeDocument {
        FakeDocument {
            created_at: Utc::now(),
            source,
        }
    }

    #[tokio::test]
    async fn missing_email_is_unauthorized() {
        let resolver = LimitsResolver::new(FakeStore::default());

        let err = resolver
            .resolve(&LimitsRequest {
                email: None,
                team_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LimitsError::Unauthorized));

        let err = resolver
            .resolve(&LimitsRequest {
                email: Some(String::new()),
                team_id: None,
            })
            .await
            .unwrap_err();
        assert!(matches!(err, LimitsError::Unauthorized));
    }

    #[tokio::test]
    async fn unknown_user_is_not_found() {
        let resolver = LimitsResolver::new(FakeStore::default());

        let err = resolver.resolve(&request("ghost@example.com")).await.unwrap_err();
        assert!(matches!(err, LimitsError::UserNotFound));
    }

    #[tokio::test]
    async fn no_active_subscription_yields_zero_quota() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "lapsed@example.com"),
            subscriptions: vec![
                subscription(1, 1, SubscriptionType::Basic, SubscriptionStatus::Inactive),
                subscription(2, 1, SubscriptionType::Free, SubscriptionStatus::PastDue),
            ],
        });
        let resolver = LimitsResolver::new(store);

        let resolved = resolver.resolve(&request("lapsed@example.com")).await.unwrap();
        assert_eq!(resolved.quota, ZERO_QUOTA);
        assert_eq!(resolved.remaining, ZERO_QUOTA);
    }

    #[tokio::test]
    async fn basic_plan_decrements_usage() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "basic@example.com"),
            subscriptions: vec![subscription(
                1,
                1,
                SubscriptionType::Basic,
                SubscriptionStatus::Active,
            )],
        });
        store.documents.insert(
            1,
            vec![
                doc(DocumentSource::Document),
                doc(DocumentSource::Document),
                doc(DocumentSource::Template),
            ],
        );
        store.templates.insert(1, 1);
        let resolver = LimitsResolver::new(store);

        let resolved = resolver.resolve(&request("basic@example.com")).await.unwrap();
        assert_eq!(resolved.quota, BASIC_PLAN_LIMITS);
        assert!(resolved.remaining.documents.is_unlimited());
        assert!(resolved.remaining.recipients.is_unlimited());
        assert_eq!(resolved.remaining.direct_templates, QuotaLimit::Limited(2));
    }

    #[tokio::test]
    async fn free_plan_document_count_clamps_at_zero() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "free@example.com"),
            subscriptions: vec![subscription(
                1,
                1,
                SubscriptionType::Free,
                SubscriptionStatus::Active,
            )],
        });
        store.documents.insert(
            1,
            (0..10).map(|_| doc(DocumentSource::Document)).collect(),
        );
        let resolver = LimitsResolver::new(store);

        let resolved = resolver.resolve(&request("free@example.com")).await.unwrap();
        assert_eq!(resolved.quota, FREE_PLAN_LIMITS);
        assert_eq!(resolved.remaining.documents, QuotaLimit::Limited(0));
    }

    #[tokio::test]
    async fn direct_template_link_documents_are_not_counted() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "free@example.com"),
            subscriptions: vec![subscription(
                1,
                1,
                SubscriptionType::Free,
                SubscriptionStatus::Active,
            )],
        });
        store.documents.insert(
            1,
            (0..25)
                .map(|_| doc(DocumentSource::TemplateDirectLink))
                .collect(),
        );
        let resolver = LimitsResolver::new(store);

        let resolved = resolver.resolve(&request("free@example.com")).await.unwrap();
        assert_eq!(resolved.remaining.documents, QuotaLimit::Limited(10));
    }

    #[tokio::test]
    async fn documents_from_previous_months_are_not_counted() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "free@example.com"),
            subscriptions: vec![subscription(
                1,
                1,
                SubscriptionType::Free,
                SubscriptionStatus::Active,
            )],
        });
        store.documents.insert(
            1,
            vec![FakeDocument {
                created_at: Utc::now() - Duration::days(45),
                source: DocumentSource::Document,
            }],
        );
        let resolver = LimitsResolver::new(store);

        let resolved = resolver.resolve(&request("free@example.com")).await.unwrap();
        assert_eq!(resolved.remaining.documents, QuotaLimit::Limited(10));
    }

    #[tokio::test]
    async fn first_active_subscription_wins() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "double@example.com"),
            subscriptions: vec![
                subscription(1, 1, SubscriptionType::Free, SubscriptionStatus::Active),
                subscription(
                    2,
                    1,
                    SubscriptionType::Professional,
                    SubscriptionStatus::Active,
                ),
            ],
        });
        let resolver = LimitsResolver::new(store);

        let resolved = resolver.resolve(&request("double@example.com")).await.unwrap();
        assert_eq!(resolved.quota, FREE_PLAN_LIMITS);
    }

    #[tokio::test]
    async fn team_plan_on_a_user_subscription_gets_free_limits() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "misfiled@example.com"),
            subscriptions: vec![subscription(
                1,
                1,
                SubscriptionType::Team,
                SubscriptionStatus::Active,
            )],
        });
        let resolver = LimitsResolver::new(store);

        // The TEAM table only applies to team-owned subscriptions; a TEAM
        // plan set on a user row resolves like FREE.
        let resolved = resolver
            .resolve(&request("misfiled@example.com"))
            .await
            .unwrap();
        assert_eq!(resolved.quota, FREE_PLAN_LIMITS);
        assert_eq!(resolved.remaining.documents, QuotaLimit::Limited(10));
    }

    #[tokio::test]
    async fn unlimited_quota_ignores_heavy_usage() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "pro@example.com"),
            subscriptions: vec![subscription(
                1,
                1,
                SubscriptionType::Professional,
                SubscriptionStatus::Active,
            )],
        });
        store.documents.insert(
            1,
            (0..500).map(|_| doc(DocumentSource::Document)).collect(),
        );
        store.templates.insert(1, 200);
        let resolver = LimitsResolver::new(store);

        let resolved = resolver.resolve(&request("pro@example.com")).await.unwrap();
        assert!(resolved.remaining.documents.is_unlimited());
        assert!(resolved.remaining.direct_templates.is_unlimited());
    }

    #[tokio::test]
    async fn inactive_team_subscription_zeroes_quota() {
        let mut store = FakeStore::default();
        let mut sub = subscription(1, 0, SubscriptionType::Team, SubscriptionStatus::Inactive);
        sub.user_id = None;
        sub.team_id = Some(7);
        store.teams.push((
            team(7, Some(sub)),
            vec!["member@example.com".to_string()],
        ));
        let resolver = LimitsResolver::new(store);

        let resolved = resolver
            .resolve(&team_request("member@example.com", 7))
            .await
            .unwrap();
        assert_eq!(resolved.quota, ZERO_QUOTA);
        assert_eq!(resolved.remaining, ZERO_QUOTA);
    }

    #[tokio::test]
    async fn team_without_subscription_gets_full_table() {
        let mut store = FakeStore::default();
        store.teams.push((
            team(7, None),
            vec!["member@example.com".to_string()],
        ));
        let resolver = LimitsResolver::new(store);

        let resolved = resolver
            .resolve(&team_request("member@example.com", 7))
            .await
            .unwrap();
        assert_eq!(resolved.quota, TEAM_PLAN_LIMITS);
        assert_eq!(resolved.remaining, TEAM_PLAN_LIMITS);
    }

    #[tokio::test]
    async fn non_member_and_missing_team_are_indistinguishable() {
        let mut store = FakeStore::default();
        store.teams.push((
            team(7, None),
            vec!["member@example.com".to_string()],
        ));
        store.users.push(UserWithSubscriptions {
            user: user(2, "outsider@example.com"),
            subscriptions: vec![],
        });
        let resolver = LimitsResolver::new(store);

        let non_member = resolver
            .resolve(&team_request("outsider@example.com", 7))
            .await
            .unwrap_err();
        let missing = resolver
            .resolve(&team_request("outsider@example.com", 999))
            .await
            .unwrap_err();

        assert!(matches!(non_member, LimitsError::TeamNotFound));
        assert!(matches!(missing, LimitsError::TeamNotFound));
    }

    #[tokio::test]
    async fn can_send_document_reflects_remaining() {
        let mut store = FakeStore::default();
        store.users.push(UserWithSubscriptions {
            user: user(1, "free@example.com"),
            subscriptions: vec![subscription(
                1,
                1,
                SubscriptionType::Free,
                SubscriptionStatus::Active,
            )],
        });
        store.documents.insert(
            1,
            (0..10).map(|_| doc(DocumentSource::Document)).collect(),
        );
        let resolver = LimitsResolver::new(store);

        assert!(!resolver.can_send_document("free@example.com").await.unwrap());
    }

    #[test]
    fn start_of_month_is_inclusive_first_day() {
        let now = Utc.with_ymd_and_hms(2026, 8, 30, 17, 45, 12).unwrap();
        let start = start_of_month(now);
        assert_eq!(start, Utc.with_ymd_and_hms(2026, 8, 1, 0, 0, 0).unwrap());
    }
}
