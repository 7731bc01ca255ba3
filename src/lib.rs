pub mod content;
pub mod error;
pub mod filesystem;
pub mod markdown;
pub mod models;
pub mod preferences;
pub mod tree;
pub mod workspace;

#[cfg(feature = "desktop")]
pub mod desktop;

#[cfg(feature = "desktop")]
pub use desktop::run;
