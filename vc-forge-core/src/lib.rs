//! Core types for Wii-to-Wii-U virtual console injection.
//!
//! Content identifiers, regions, controller profiles, source header
//! probing, and per-build identifier minting. No I/O beyond reading a
//! source image header; everything heavier lives in the sibling crates.

use std::io::{Read, Seek};

pub mod header;
pub mod ids;
pub mod profile;
pub mod region;

pub use header::{ContainerKind, ContentId, HeaderError, SourceHeader, probe_file, probe_header};
pub use ids::{GeneratedIds, IdMinter, PACKAGE_ID_PREFIX, RESERVED_GROUP_FLOOR};
pub use profile::ControllerProfile;
pub use region::Region;

/// A reader that implements both Read and Seek.
pub trait ReadSeek: Read + Seek {}
impl<T: Read + Seek> ReadSeek for T {}
