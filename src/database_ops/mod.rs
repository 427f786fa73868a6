pub mod bulk_load;
pub mod legacy_users;
