//! Backtrace defaults for the binaries.

use std::sync::Once;

static INIT: Once = Once::new();

/// Turns on `RUST_BACKTRACE=1` unless the variable is already set.
pub fn enable() {
    INIT.call_once(|| {
        if std::env::var_os("RUST_BACKTRACE").is_none() {
            // SAFETY: runs once, at startup, before any other thread reads the environment.
            unsafe { std::env::set_var("RUST_BACKTRACE", "1") };
        }
    });
}
