//! Core types and lifecycle engine for the Roster administrative console.
//!
//! This crate has no HTTP dependencies. It talks to the
//! outside world through the [`backend::Backend`] trait and reports back to
//! its caller through [`hooks::Hooks`].

pub mod address;
pub mod backend;
pub mod dispatch;
pub mod error;
pub mod events;
pub mod field;
pub mod form;
pub mod hooks;
pub mod id;
pub mod person;
pub mod policy;
pub mod reference;
pub mod resolver;
pub mod rules;
pub mod validate;

pub use error::{Error, Result};

#[cfg(test)]
mod tests;
