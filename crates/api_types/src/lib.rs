//! JSON wire types shared by the server and its clients.
//!
//! Amounts travel as decimal strings (`"12.50"`), dates as `YYYY-MM-DD` and
//! timestamps as RFC 3339.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

/// Distinguish an absent field (`None`) from an explicit `null`
/// (`Some(None)`) in partial updates.
fn double_option<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}

pub mod user {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct UserRegister {
        pub username: String,
        #[serde(default)]
        pub email: String,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub password: String,
        pub password_confirm: String,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct UserView {
        pub username: String,
        pub email: String,
        pub first_name: Option<String>,
        pub last_name: Option<String>,
        pub date_joined: DateTime<Utc>,
    }
}

pub mod auth {
    use super::*;

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginRequest {
        pub username: String,
        pub password: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct RefreshRequest {
        pub refresh: String,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct AccessToken {
        pub access: String,
        pub access_expires_at: DateTime<Utc>,
    }

    #[derive(Debug, Serialize, Deserialize)]
    pub struct LoginResponse {
        pub access: String,
        pub access_expires_at: DateTime<Utc>,
        pub refresh: String,
        pub refresh_expires_at: DateTime<Utc>,
        pub user: user::UserView,
    }
}

pub mod category {
    use super::*;

    /// Body of `POST /categories` and `PUT /categories/{id}`.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct CategoryNew {
        pub name: String,
        pub description: Option<String>,
    }

    /// Body of `PATCH /categories/{id}`. Absent fields are left untouched;
    /// `"description": null` clears the description.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct CategoryUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub description: Option<Option<String>>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }
}

pub mod expense {
    use super::*;

    /// Body of `POST /expenses` and `PUT /expenses/{id}`.
    ///
    /// The owner is always the authenticated user.
    #[derive(Debug, Serialize, Deserialize)]
    pub struct ExpenseNew {
        pub name: String,
        pub description: Option<String>,
        /// Decimal string, e.g. `"12.50"`. Must be > 0.
        pub amount: String,
        pub date: NaiveDate,
        pub category: Uuid,
    }

    /// Body of `PATCH /expenses/{id}`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseUpdate {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub name: Option<String>,
        #[serde(
            default,
            deserialize_with = "double_option",
            skip_serializing_if = "Option::is_none"
        )]
        pub description: Option<Option<String>>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub amount: Option<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub date: Option<NaiveDate>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pub category: Option<Uuid>,
    }

    /// Compact row used by the listing endpoints.
    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ExpenseSummary {
        pub id: Uuid,
        pub name: String,
        pub amount: String,
        pub date: NaiveDate,
        pub category_name: String,
        pub created_at: DateTime<Utc>,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ExpenseView {
        pub id: Uuid,
        pub name: String,
        pub description: Option<String>,
        pub amount: String,
        pub date: NaiveDate,
        pub category: Uuid,
        pub category_name: String,
        pub user: String,
        pub created_at: DateTime<Utc>,
        pub updated_at: DateTime<Utc>,
    }

    /// Query string of `GET /expenses/history`.
    ///
    /// Values are kept as strings; the engine validates them.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseHistoryQuery {
        pub start_date: Option<String>,
        pub end_date: Option<String>,
        pub category: Option<String>,
        pub search: Option<String>,
        /// `date`, `amount` or `name`, optionally prefixed with `-`.
        pub sort_by: Option<String>,
    }

    /// Query string of `GET /expenses`.
    #[derive(Debug, Default, Serialize, Deserialize)]
    pub struct ExpenseListQuery {
        pub category: Option<String>,
        pub date: Option<String>,
        pub search: Option<String>,
        /// `date`, `amount` or `created_at`, optionally prefixed with `-`.
        pub ordering: Option<String>,
    }
}

pub mod stats {
    use std::collections::BTreeMap;

    use super::*;

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct CategoryStatsView {
        pub count: u64,
        pub amount: String,
    }

    #[derive(Debug, PartialEq, Eq, Serialize, Deserialize)]
    pub struct ExpenseStatsView {
        pub total_count: u64,
        pub total_amount: String,
        pub categories: BTreeMap<String, CategoryStatsView>,
    }
}
