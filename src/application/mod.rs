pub mod actions;
pub mod app;
pub mod config;
pub mod refresh;
pub mod startup;
pub mod state;
