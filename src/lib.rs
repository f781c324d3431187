pub mod about;
pub mod admin;
pub mod cli;
pub mod config;
pub mod error;
pub mod gallery;
pub mod server;
pub mod settings;
pub mod store;
pub mod upload;

// Test-only printing helper: expands to eprintln! in debug and test builds.
// Usage in tests: tprintln!("debug: {}", value);
#[cfg(any(test, debug_assertions))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ( eprintln!($($arg)*) );
}

// In release builds, a no-op tprintln! so calls compile without effect.
#[cfg(not(any(test, debug_assertions)))]
#[macro_export]
macro_rules! tprintln {
    ($($arg:tt)*) => ({
        if false { let _ = format!($($arg)*); }
    });
}
