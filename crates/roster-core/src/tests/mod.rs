//! Scenario tests for the lifecycle engine against an in-memory backend.

mod address;
mod fake;
