//! World data and the providers that supply it

pub mod directory;
pub mod palette;
pub mod provider;
pub mod snapshot;

pub use directory::{DirectoryProvider, WorldMetadata};
pub use palette::Palette;
pub use provider::{ProvidedWorld, WorldProvider};
pub use snapshot::WorldSnapshot;
