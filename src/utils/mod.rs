pub mod auth;
pub mod chat;
pub mod events;
pub mod groups;
pub mod map;
pub mod users;
