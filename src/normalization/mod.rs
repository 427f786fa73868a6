pub mod links;
pub mod roles;
pub mod user;
