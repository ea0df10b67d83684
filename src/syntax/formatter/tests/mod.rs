//! Formatter tests
