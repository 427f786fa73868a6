/// Legacy role keyword → role name in the new model, in priority order.
pub const LEGACY_ROLE_MAP: &[(&str, &str)] = &[
    ("administrator", "admin"),
    ("shop_manager", "manager"),
    ("customer", "customer"),
    ("subscriber", "customer"),
    ("editor", "editor"),
    ("author", "author"),
];

/// Role assigned when nothing in the capability blob matches.
pub const DEFAULT_ROLE: &str = "customer";

/// Derive roles from a capability blob by keyword containment.
///
/// The blob is matched case-insensitively as free text, so it does not matter
/// how the legacy system serialized it. Every matching pair contributes its
/// role in table order; synonyms are not collapsed. The result is never empty.
pub fn derive_roles(capabilities: Option<&str>, table: &[(&str, &str)]) -> Vec<String> {
    let blob = capabilities.unwrap_or_default().to_lowercase();
    let roles: Vec<String> = if blob.is_empty() {
        Vec::new()
    } else {
        table
            .iter()
            .filter(|(keyword, _)| blob.contains(keyword))
            .map(|(_, role)| (*role).to_string())
            .collect()
    };

    if roles.is_empty() {
        vec![DEFAULT_ROLE.to_string()]
    } else {
        roles
    }
}
