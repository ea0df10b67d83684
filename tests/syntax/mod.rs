//! Formatting tests through the workspace

pub mod tests_format;
