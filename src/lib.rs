pub mod app;
pub mod auth;
pub mod config;
pub mod content;
pub mod db;
pub mod domain;
pub mod error;
pub mod filters;
pub mod flash;
pub mod handlers;
pub mod media;
pub mod paths;
pub mod session;
pub mod state;
pub mod vault;

#[cfg(test)]
pub mod testing;
