//! Shared test utilities for jobtrail integration tests.
//!
//! This module provides:
//! - `TestHarness` with a temp-file database
//! - `FakeMailbox` / `FakeMailSource`, an in-memory `MailSource`
//! - `ScriptedClassifier` for forcing classification outcomes
//! - Builders for raw messages and fast retry settings

pub mod builders;
pub mod harness;

pub use builders::*;
pub use harness::*;
