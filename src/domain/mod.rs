pub mod agents;
pub mod error;
pub mod models;
pub mod settings;
