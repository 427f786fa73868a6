//! Read side of the legacy storefront user export.
//!
//! The storefront keeps accounts in `wp_users` and everything else as
//! key/value rows in `wp_usermeta`. One aggregation query pivots the meta
//! keys we care about into columns, one row per active account, newest
//! registration first.
use anyhow::{Context, Result};
use serde::Serialize;
use sqlx::AnyConnection;
use tracing::info;

/// Meta keys pivoted into columns, in select order.
pub const META_COLUMNS: &[(&str, &str)] = &[
    ("first_name", "first_name"),
    ("last_name", "last_name"),
    ("nickname", "nickname"),
    ("description", "description"),
    ("billing_phone", "phone"),
    ("wp_capabilities", "wp_capabilities"),
    ("wp_user_level", "wp_user_level"),
    ("locale", "locale"),
    ("profile_image", "profile_image"),
    ("avatar", "avatar"),
    ("website", "website"),
    ("instagram", "instagram"),
    ("facebook", "facebook"),
    ("twitter", "twitter"),
    ("linkedin", "linkedin"),
    ("youtube", "youtube"),
    ("occupation", "occupation"),
    ("bio", "bio"),
];

/// One flattened account row. Field names are the legacy column names and
/// the struct is serialized verbatim as the audit copy of each export.
#[derive(Debug, Clone, Default, PartialEq, Serialize, sqlx::FromRow)]
pub struct LegacyUserRow {
    pub wp_user_id: i64,
    pub user_login: Option<String>,
    pub user_email: Option<String>,
    pub user_registered: Option<String>,
    pub user_status: i64,
    pub display_name: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub nickname: Option<String>,
    pub description: Option<String>,
    pub phone: Option<String>,
    pub wp_capabilities: Option<String>,
    pub wp_user_level: Option<String>,
    pub locale: Option<String>,
    pub profile_image: Option<String>,
    pub avatar: Option<String>,
    pub website: Option<String>,
    pub instagram: Option<String>,
    pub facebook: Option<String>,
    pub twitter: Option<String>,
    pub linkedin: Option<String>,
    pub youtube: Option<String>,
    pub occupation: Option<String>,
    pub bio: Option<String>,
}

/// Build the aggregation query.
///
/// Ids and status are cast to a signed integer and the registration time to
/// text so the row decodes the same way from MySQL and SQLite.
pub fn legacy_users_query() -> String {
    let pivots = META_COLUMNS
        .iter()
        .map(|(key, alias)| {
            format!("    MAX(CASE WHEN um.meta_key = '{key}' THEN um.meta_value END) AS {alias}")
        })
        .collect::<Vec<_>>()
        .join(",\n");

    format!(
        "SELECT
    CAST(u.ID AS SIGNED) AS wp_user_id,
    u.user_login AS user_login,
    u.user_email AS user_email,
    CAST(u.user_registered AS CHAR) AS user_registered,
    CAST(u.user_status AS SIGNED) AS user_status,
    u.display_name AS display_name,
{pivots}
FROM wp_users u
LEFT JOIN wp_usermeta um ON u.ID = um.user_id
WHERE u.user_status = 0
GROUP BY u.ID, u.user_login, u.user_email, u.user_registered, u.user_status, u.display_name
ORDER BY u.user_registered DESC"
    )
}

/// Run the aggregation and collect every row.
pub async fn fetch_legacy_users(conn: &mut AnyConnection) -> Result<Vec<LegacyUserRow>> {
    let sql = legacy_users_query();
    let rows = sqlx::query_as::<_, LegacyUserRow>(&sql)
        .fetch_all(&mut *conn)
        .await
        .context("legacy user query failed")?;
    info!(target = "legacy_users", rows = rows.len(), "fetched legacy accounts");
    Ok(rows)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn query_pivots_every_meta_column() {
        let sql = legacy_users_query();
        for (key, alias) in META_COLUMNS {
            assert!(sql.contains(&format!("um.meta_key = '{key}' THEN um.meta_value END) AS {alias}")));
        }
        assert!(sql.contains("WHERE u.user_status = 0"));
        assert!(sql.ends_with("ORDER BY u.user_registered DESC"));
    }

    #[test]
    fn phone_comes_from_billing_meta() {
        assert!(META_COLUMNS.contains(&("billing_phone", "phone")));
    }
}
