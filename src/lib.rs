pub mod actions;
pub mod blocks;
pub mod config;
pub mod defaults;
pub mod i18n;
pub mod lifecycle;
pub mod model;
pub mod payload;
pub mod sanitize;
pub mod security;
pub mod server;
pub mod store;
