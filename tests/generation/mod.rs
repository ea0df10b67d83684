//! Generation tests
//!
//! Tests for:
//! - Built-in `.interp` generation and reloading
//! - External tool failures
//! - Sentence generation over generated data
//! - Debugger sessions

pub mod tests_generate;
