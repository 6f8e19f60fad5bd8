//! Deterministic, pure types shared by the invocation layer.
//!
//! Core modules must be free of I/O side effects. They describe what an agent
//! run is allowed to do and what it produces, nothing more.

pub mod message;
pub mod options;
pub mod tools;
