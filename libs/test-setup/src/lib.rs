#![deny(unsafe_code, rust_2018_idioms)]

//! Constants and utilities for the tests that need a MongoDB server.

/// Tokio test runtime utils.
pub mod runtime;

mod logging;
mod database;

pub use logging::init_logger;
pub use database::{CONN_STR, connection_string_for, generate_database_name};

/// Whether the tests needing a database should be skipped, because `TEST_DATABASE_URL` is not
/// set.
#[inline(never)]
pub fn should_skip_test() -> bool {
    if CONN_STR.is_none() {
        println!("Test skipped");
        return true;
    }

    false
}
