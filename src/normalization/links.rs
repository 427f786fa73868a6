use serde::Serialize;

/// Social platforms in link priority order.
pub const SOCIAL_PLATFORMS: [&str; 6] = [
    "website",
    "instagram",
    "facebook",
    "twitter",
    "linkedin",
    "youtube",
];

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Link {
    pub platform: String,
    pub url: String,
    pub order: u32,
    pub is_primary: bool,
}

/// Build the ordered link list from `(platform, value)` pairs.
///
/// Blank values are dropped, kept urls are trimmed, `order` counts accepted
/// links from 0 and only the first one is primary.
pub fn extract_links<'a, I>(candidates: I) -> Vec<Link>
where
    I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
{
    candidates
        .into_iter()
        .filter_map(|(platform, value)| {
            let url = value?.trim();
            (!url.is_empty()).then(|| (platform, url))
        })
        .zip(0u32..)
        .map(|((platform, url), order)| Link {
            platform: platform.to_string(),
            url: url.to_string(),
            order,
            is_primary: order == 0,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_populated_platform_is_primary() {
        let links = extract_links([
            ("website", None),
            ("instagram", Some("  ")),
            ("facebook", Some(" https://fb.com/jane ")),
            ("twitter", Some("https://x.com/jane")),
        ]);
        assert_eq!(links.len(), 2);
        assert_eq!(links[0].platform, "facebook");
        assert_eq!(links[0].url, "https://fb.com/jane");
        assert_eq!(links[0].order, 0);
        assert!(links[0].is_primary);
        assert_eq!(links[1].order, 1);
        assert!(!links[1].is_primary);
    }

    #[test]
    fn nothing_populated_gives_no_links() {
        assert!(extract_links([("website", Some("")), ("youtube", None)]).is_empty());
    }

    #[test]
    fn serializes_with_camel_case_primary_flag() {
        let links = extract_links([("website", Some("http://x.com"))]);
        let v = serde_json::to_value(&links).unwrap();
        assert_eq!(
            v,
            serde_json::json!([
                {"platform": "website", "url": "http://x.com", "order": 0, "isPrimary": true}
            ])
        );
    }
}
