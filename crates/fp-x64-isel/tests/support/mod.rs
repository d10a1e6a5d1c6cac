//! Shared fixtures for fp-x64-isel integration tests.
#![allow(dead_code)]

pub mod ir;
pub mod mir;
