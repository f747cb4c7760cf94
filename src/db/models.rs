use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{FromRow, Type};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "subscription_status", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionStatus {
    Active,
    Inactive,
    PastDue,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "subscription_type", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum SubscriptionType {
    Free,
    Basic,
    Professional,
    Enterprise,
    Team,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "user_role", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    User,
    Admin,
}

/// How a document entered the system. Documents created through a direct
/// template link do not count against the monthly document quota.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[sqlx(type_name = "document_source", rename_all = "SCREAMING_SNAKE_CASE")]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum DocumentSource {
    Document,
    Template,
    TemplateDirectLink,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct User {
    pub id: i64,
    pub name: Option<String>,
    pub email: String,
    pub roles: Vec<Role>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Subscription {
    pub id: i64,
    pub user_id: Option<i64>,
    pub team_id: Option<i64>,
    #[serde(rename = "type")]
    pub plan_type: SubscriptionType,
    pub status: SubscriptionStatus,
    pub created_at: DateTime<Utc>,
    pub period_end: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, FromRow, Serialize, Deserialize)]
pub struct Team {
    pub id: i64,
    pub name: String,
    pub created_at: DateTime<Utc>,
}

/// A user together with their full subscription history. Only ACTIVE
/// subscriptions count toward entitlement; the rest is kept as history.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UserWithSubscriptions {
    pub user: User,
    pub subscriptions: Vec<Subscription>,
}

/// A team and its subscription, if one exists. Teams hold at most one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TeamWithSubscription {
    pub team: Team,
    pub subscription: Option<Subscription>,
}
