pub mod configuration;
pub mod modules;
pub mod routes;
pub mod state;
pub mod utils;

pub use routes::app;
