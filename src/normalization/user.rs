//! Reshapes a flattened legacy account row into the user/profile/links/roles
//! record consumed by the new platform.
use chrono::NaiveDateTime;
use serde::Serialize;

use crate::database_ops::legacy_users::LegacyUserRow;
use crate::normalization::links::{extract_links, Link, SOCIAL_PLATFORMS};
use crate::normalization::roles::{derive_roles, LEGACY_ROLE_MAP};

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedUser {
    /// Filled in when the customer first signs in through the new storefront.
    pub shopify_customer_id: Option<String>,
    pub email: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub is_active: bool,
    pub created_at: Option<String>,
    /// The legacy store has no modification time; mirrors `created_at`.
    pub updated_at: Option<String>,
    pub last_login_at: Option<String>,
    pub is_public: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NormalizedProfile {
    pub occupation: Option<String>,
    pub description: Option<String>,
    pub bio: Option<String>,
    pub avatar_url: Option<String>,
    pub background_image_url: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ProcessedUser {
    pub original: LegacyUserRow,
    pub user: NormalizedUser,
    pub profile: NormalizedProfile,
    pub links: Vec<Link>,
    pub roles: Vec<String>,
}

fn present(value: Option<&str>) -> Option<&str> {
    value.filter(|v| !v.is_empty())
}

/// `primary` when it holds text, otherwise `fallback`.
fn prefer(primary: Option<&str>, fallback: Option<&str>) -> Option<String> {
    present(primary).or(fallback).map(str::to_string)
}

/// First and last name derived from a display name.
///
/// First name is the text before the first space (the whole name when there
/// is none). Last name is the text after the last space and only exists when
/// the display name contains a space.
pub fn split_display_name(display_name: &str) -> (Option<String>, Option<String>) {
    let first = display_name.split(' ').next().filter(|s| !s.is_empty());
    let last = display_name
        .contains(' ')
        .then(|| display_name.rsplit(' ').next())
        .flatten()
        .filter(|s| !s.is_empty());
    (first.map(str::to_string), last.map(str::to_string))
}

/// Legacy `YYYY-MM-DD HH:MM:SS[.f]` timestamps as ISO-8601. Anything that does
/// not parse is passed through untouched.
pub fn iso_timestamp(raw: &str) -> String {
    let trimmed = raw.trim();
    ["%Y-%m-%d %H:%M:%S%.f", "%Y-%m-%dT%H:%M:%S%.f"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(trimmed, fmt).ok())
        .map(|dt| dt.format("%Y-%m-%dT%H:%M:%S%.f").to_string())
        .unwrap_or_else(|| raw.to_string())
}

impl ProcessedUser {
    pub fn from_legacy(mut original: LegacyUserRow) -> Self {
        original.user_registered = original.user_registered.as_deref().map(iso_timestamp);
        let row = &original;

        let (derived_first, derived_last) = present(row.display_name.as_deref())
            .map(split_display_name)
            .unwrap_or((None, None));

        let user = NormalizedUser {
            shopify_customer_id: None,
            email: row.user_email.clone(),
            first_name: present(row.first_name.as_deref())
                .map(str::to_string)
                .or(derived_first),
            last_name: present(row.last_name.as_deref())
                .map(str::to_string)
                .or(derived_last),
            is_active: row.user_status == 0,
            created_at: row.user_registered.clone(),
            updated_at: row.user_registered.clone(),
            last_login_at: None,
            is_public: false,
        };

        let profile = NormalizedProfile {
            occupation: row.occupation.clone(),
            description: row.description.clone(),
            bio: prefer(row.bio.as_deref(), row.description.as_deref()),
            avatar_url: prefer(row.avatar.as_deref(), row.profile_image.as_deref()),
            background_image_url: None,
        };

        let socials = [
            row.website.as_deref(),
            row.instagram.as_deref(),
            row.facebook.as_deref(),
            row.twitter.as_deref(),
            row.linkedin.as_deref(),
            row.youtube.as_deref(),
        ];
        let links = extract_links(SOCIAL_PLATFORMS.into_iter().zip(socials));
        let roles = derive_roles(row.wp_capabilities.as_deref(), LEGACY_ROLE_MAP);

        Self {
            original,
            user,
            profile,
            links,
            roles,
        }
    }

    pub fn has_avatar(&self) -> bool {
        present(self.profile.avatar_url.as_deref()).is_some()
    }

    pub fn is_admin(&self) -> bool {
        self.roles.iter().any(|r| r == "admin")
    }
}

/// Summary counts over one export.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct ExportStats {
    pub total_rows: usize,
    pub exported: usize,
    pub with_avatar: usize,
    pub with_links: usize,
    pub admins: usize,
}

impl ExportStats {
    pub fn collect(total_rows: usize, users: &[ProcessedUser]) -> Self {
        Self {
            total_rows,
            exported: users.len(),
            with_avatar: users.iter().filter(|u| u.has_avatar()).count(),
            with_links: users.iter().filter(|u| !u.links.is_empty()).count(),
            admins: users.iter().filter(|u| u.is_admin()).count(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn jane() -> LegacyUserRow {
        LegacyUserRow {
            wp_user_id: 7,
            user_login: Some("jane".into()),
            user_email: Some("jane@example.com".into()),
            user_registered: Some("2021-03-04 10:15:00".into()),
            user_status: 0,
            display_name: Some("Jane Doe".into()),
            website: Some("http://x.com".into()),
            wp_capabilities: Some(r#"a:1:{s:13:"administrator";b:1;}"#.into()),
            ..LegacyUserRow::default()
        }
    }

    #[test]
    fn single_word_display_name_has_no_last_name() {
        assert_eq!(split_display_name("Cher"), (Some("Cher".into()), None));
    }

    #[test]
    fn multi_word_display_name_uses_first_and_last_tokens() {
        assert_eq!(
            split_display_name("Mary Ann Smith"),
            (Some("Mary".into()), Some("Smith".into()))
        );
    }

    #[test]
    fn explicit_names_win_over_display_name() {
        let row = LegacyUserRow {
            first_name: Some("Janet".into()),
            last_name: Some("Dough".into()),
            ..jane()
        };
        let out = ProcessedUser::from_legacy(row);
        assert_eq!(out.user.first_name.as_deref(), Some("Janet"));
        assert_eq!(out.user.last_name.as_deref(), Some("Dough"));
    }

    #[test]
    fn empty_explicit_names_fall_back_to_display_name() {
        let row = LegacyUserRow {
            first_name: Some(String::new()),
            ..jane()
        };
        let out = ProcessedUser::from_legacy(row);
        assert_eq!(out.user.first_name.as_deref(), Some("Jane"));
    }

    #[test]
    fn missing_display_name_leaves_names_empty() {
        let row = LegacyUserRow {
            display_name: None,
            ..jane()
        };
        let out = ProcessedUser::from_legacy(row);
        assert_eq!(out.user.first_name, None);
        assert_eq!(out.user.last_name, None);
    }

    #[test]
    fn jane_doe_end_to_end_shape() {
        let out = ProcessedUser::from_legacy(jane());
        let v = serde_json::to_value(&out).unwrap();

        assert_eq!(v["user"]["firstName"], "Jane");
        assert_eq!(v["user"]["lastName"], "Doe");
        assert_eq!(v["user"]["isActive"], true);
        assert_eq!(v["user"]["createdAt"], "2021-03-04T10:15:00");
        assert_eq!(v["user"]["updatedAt"], "2021-03-04T10:15:00");
        assert_eq!(v["user"]["shopifyCustomerId"], json!(null));
        assert_eq!(v["user"]["isPublic"], false);
        assert_eq!(
            v["links"],
            json!([{"platform": "website", "url": "http://x.com", "order": 0, "isPrimary": true}])
        );
        assert_eq!(v["roles"], json!(["admin"]));
        assert_eq!(v["original"]["wp_user_id"], 7);
        assert_eq!(v["original"]["display_name"], "Jane Doe");
    }

    #[test]
    fn bio_and_avatar_fall_back() {
        let row = LegacyUserRow {
            description: Some("Painter".into()),
            profile_image: Some("https://img/p.png".into()),
            ..jane()
        };
        let out = ProcessedUser::from_legacy(row);
        assert_eq!(out.profile.bio.as_deref(), Some("Painter"));
        assert_eq!(out.profile.avatar_url.as_deref(), Some("https://img/p.png"));

        let row = LegacyUserRow {
            bio: Some("Sculptor".into()),
            avatar: Some("https://img/a.png".into()),
            description: Some("Painter".into()),
            profile_image: Some("https://img/p.png".into()),
            ..jane()
        };
        let out = ProcessedUser::from_legacy(row);
        assert_eq!(out.profile.bio.as_deref(), Some("Sculptor"));
        assert_eq!(out.profile.avatar_url.as_deref(), Some("https://img/a.png"));
        assert_eq!(out.profile.description.as_deref(), Some("Painter"));
    }

    #[test]
    fn unparsable_timestamp_is_kept() {
        assert_eq!(iso_timestamp("0000-00-00 00:00:00"), "0000-00-00 00:00:00");
        assert_eq!(iso_timestamp("2020-01-02 03:04:05.250"), "2020-01-02T03:04:05.250");
    }

    #[test]
    fn stats_count_avatars_links_and_admins() {
        let admin = ProcessedUser::from_legacy(jane());
        let plain = ProcessedUser::from_legacy(LegacyUserRow {
            wp_user_id: 8,
            website: None,
            wp_capabilities: None,
            avatar: Some("https://img/a.png".into()),
            ..jane()
        });
        let stats = ExportStats::collect(2, &[admin, plain]);
        assert_eq!(
            stats,
            ExportStats {
                total_rows: 2,
                exported: 2,
                with_avatar: 1,
                with_links: 1,
                admins: 1,
            }
        );
    }
}
