pub mod api_keys;
pub mod invoice;
pub mod property;
pub mod user;
