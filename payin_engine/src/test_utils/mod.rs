//! Database preparation helpers for tests. Enabled by the `test_utils` feature.
pub mod prepare_env;
