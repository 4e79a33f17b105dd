//! CLI command implementations

pub mod cache;
pub mod colors;
pub mod config;
pub mod meta;
pub mod render;
pub mod update;

pub use cache::execute as cache;
pub use colors::execute as colors;
pub use config::execute as config;
pub use meta::execute as meta;
pub use render::execute as render;
pub use update::execute as update;
