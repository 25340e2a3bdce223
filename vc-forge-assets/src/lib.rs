//! Artwork acquisition and image derivation.
//!
//! Fetches cover art from GameTDB (with a community mirror as backup),
//! caches downloads on disk, and derives the icon, TV banner, and
//! GamePad screen images a finished package needs.

pub mod cache;
pub mod error;
pub mod images;
pub mod sources;
pub mod titledb;

pub use cache::{AssetCache, AssetSource, CacheEntry};
pub use error::AssetError;
pub use images::{DerivedImages, derive_images, write_tga};
pub use sources::{ArtKind, artwork_candidates};
pub use titledb::TitleIndex;
