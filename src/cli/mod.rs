pub mod export_users;
pub mod import_json;
