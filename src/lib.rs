pub mod compute;
pub mod config;
pub mod display;
pub mod entities;
pub mod error;
pub mod extensions;
pub mod input;
pub mod logging;
pub mod runner;
pub mod score_store;
pub mod session;
pub mod terminal;
