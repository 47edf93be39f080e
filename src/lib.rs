pub mod application;
pub mod domain;
pub mod interfaces;
pub mod proxy;
pub mod view;
