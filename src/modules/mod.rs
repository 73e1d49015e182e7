pub mod database;
pub mod extractors;
pub mod store;
pub mod subscriptions;
