use std::sync::Arc;

use anyhow::Result;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;

use crate::db::models::{
    DocumentSource, Role, Subscription, SubscriptionStatus, SubscriptionType, Team,
    TeamWithSubscription, User, UserWithSubscriptions,
};
use crate::limits::resolver::EntitlementStore;

#[derive(Clone)]
pub struct Repository {
    pool: Arc<PgPool>,
}

impl Repository {
    pub fn new(pool: Arc<PgPool>) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }

    pub async fn find_user_by_id(&self, id: i64) -> Result<Option<User>> {
        let user = sqlx::query_as(
            r#"
            SELECT id, name, email, roles, created_at
            FROM users WHERE id = $1
            "#,
        )
        .bind(id)
        .fetch_optional(self.pool())
        .await?;

        Ok(user)
    }

    /// Loads a user and their full subscription history. Ordered by
    /// creation so "first active wins" in the resolver is deterministic.
    pub async fn find_user_with_subscriptions(
        &self,
        email: &str,
    ) -> Result<Option<UserWithSubscriptions>> {
        let user: Option<User> = sqlx::query_as(
            r#"
            SELECT id, name, email, roles, created_at
            FROM users WHERE email = $1
            "#,
        )
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        let Some(user) = user else {
            return Ok(None);
        };

        let subscriptions = sqlx::query_as(
            r#"
            SELECT id, user_id, team_id, plan_type, status, created_at, period_end
            FROM subscriptions
            WHERE user_id = $1
            ORDER BY created_at, id
            "#,
        )
        .bind(user.id)
        .fetch_all(self.pool())
        .await?;

        Ok(Some(UserWithSubscriptions {
            user,
            subscriptions,
        }))
    }

    /// Loads a team and its subscription, but only when `email` is a member.
    /// Membership is part of the WHERE clause: non-members get None, the
    /// same answer as for a team that does not exist.
    pub async fn find_team_for_member(
        &self,
        team_id: i64,
        email: &str,
    ) -> Result<Option<TeamWithSubscription>> {
        let team: Option<Team> = sqlx::query_as(
            r#"
            SELECT t.id, t.name, t.created_at
            FROM teams t
            JOIN team_members tm ON tm.team_id = t.id
            JOIN users u ON u.id = tm.user_id
            WHERE t.id = $1 AND u.email = $2
            "#,
        )
        .bind(team_id)
        .bind(email)
        .fetch_optional(self.pool())
        .await?;

        let Some(team) = team else {
            return Ok(None);
        };

        let subscription = sqlx::query_as(
            r#"
            SELECT id, user_id, team_id, plan_type, status, created_at, period_end
            FROM subscriptions
            WHERE team_id = $1
            "#,
        )
        .bind(team.id)
        .fetch_optional(self.pool())
        .await?;

        Ok(Some(TeamWithSubscription { team, subscription }))
    }

    /// Counts the user's personal documents created at or after `since`,
    /// excluding documents that entered via a direct template link.
    pub async fn count_documents_since(
        &self,
        user_id: i64,
        since: DateTime<Utc>,
    ) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*) FROM documents
            WHERE user_id = $1
              AND team_id IS NULL
              AND created_at >= $2
              AND source <> $3
            "#,
        )
        .bind(user_id)
        .bind(since)
        .bind(DocumentSource::TemplateDirectLink)
        .fetch_one(self.pool())
        .await?;

        Ok(count as u64)
    }

    pub async fn count_templates(&self, user_id: i64) -> Result<u64> {
        let (count,): (i64,) = sqlx::query_as(
            r#"SELECT COUNT(*) FROM templates WHERE user_id = $1"#,
        )
        .bind(user_id)
        .fetch_one(self.pool())
        .await?;

        Ok(count as u64)
    }

    /// Admin mutation: changes a subscription's status and/or plan. The
    /// subscription must already exist; fields left as None are unchanged.
    pub async fn update_subscription(
        &self,
        id: i64,
        status: Option<SubscriptionStatus>,
        plan_type: Option<SubscriptionType>,
    ) -> Result<Subscription> {
        let existing: Option<(i64,)> =
            sqlx::query_as(r#"SELECT id FROM subscriptions WHERE id = $1"#)
                .bind(id)
                .fetch_optional(self.pool())
                .await?;

        if existing.is_none() {
            anyhow::bail!("Subscription {} not found", id);
        }

        let subscription = sqlx::query_as(
            r#"
            UPDATE subscriptions
            SET status = COALESCE($1, status),
                plan_type = COALESCE($2, plan_type)
            WHERE id = $3
            RETURNING id, user_id, team_id, plan_type, status, created_at, period_end
            "#,
        )
        .bind(status)
        .bind(plan_type)
        .bind(id)
        .fetch_one(self.pool())
        .await?;

        Ok(subscription)
    }

    /// Admin mutation: updates a user's profile fields and roles.
    pub async fn update_user_profile(
        &self,
        id: i64,
        name: Option<String>,
        email: Option<String>,
        roles: Option<Vec<Role>>,
    ) -> Result<User> {
        let user = sqlx::query_as(
            r#"
            UPDATE users
            SET name = COALESCE($1, name),
                email = COALESCE($2, email),
                roles = COALESCE($3, roles)
            WHERE id = $4
            RETURNING id, name, email, roles, created_at
            "#,
        )
        .bind(name)
        .bind(email)
        .bind(roles)
        .bind(id)
        .fetch_one(self.pool())
        .await?;

        Ok(user)
    }

    /// Subscriptions that are ACTIVE or PAST_DUE. Used by the upgrade-email
    /// job to skip users who already hold a live subscription.
    pub async fn find_subscriptions_not_inactive(
        &self,
        user_id: i64,
    ) -> Result<Vec<Subscription>> {
        let subscriptions = sqlx::query_as(
            r#"
            SELECT id, user_id, team_id, plan_type, status, created_at, period_end
            FROM subscriptions
            WHERE user_id = $1 AND status <> $2
            "#,
        )
        .bind(user_id)
        .bind(SubscriptionStatus::Inactive)
        .fetch_all(self.pool())
        .await?;

        Ok(subscriptions)
    }
}

#[async_trait]
impl EntitlementStore for Repository {
    async fn find_user_with_subscriptions(
        &self,
        email: &str,
    ) -> Result<Option<UserWithSubscriptions>> {
        Repository::find_user_with_subscriptions(self, email).await
    }

    async fn find_team_for_member(
        &self,
        team_id: i64,
        email: &str,
    ) -> Result<Option<TeamWithSubscription>> {
        Repository::find_team_for_member(self, team_id, email).await
    }

    async fn count_documents_since(&self, user_id: i64, since: DateTime<Utc>) -> Result<u64> {
        Repository::count_documents_since(self, user_id, since).await
    }

    async fn count_templates(&self, user_id: i64) -> Result<u64> {
        Repository::count_templates(self, user_id).await
    }
}
