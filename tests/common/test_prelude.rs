// common/test_prelude.rs
#![allow(unused_imports)]

// Re-export commonly used items for integration tests.
pub use assert_cmd::Command;
pub use predicates::prelude::*;
pub use predicates::str::contains;
