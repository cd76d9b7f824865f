//! File system helpers.

pub mod atomic;
pub mod temp;

pub use atomic::atomic_write;
pub use temp::TempDir;
