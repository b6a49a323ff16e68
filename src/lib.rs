pub mod api;
pub mod config;
pub mod error;
pub mod format;
pub mod models;
pub mod pages;
pub mod poll;
pub mod session;
pub mod shell;
pub mod state;
