//! Shared fixtures for integration tests: scriptable fetcher and recording sink.

#![allow(dead_code)]

pub mod fake_fetcher;
pub mod recorder;
