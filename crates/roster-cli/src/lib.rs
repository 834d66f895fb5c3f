//! HTTP transport and console front-end for the Roster lifecycle engine.

pub mod client;
pub mod console;
pub mod settings;

pub use client::HttpBackend;
pub use settings::Settings;
