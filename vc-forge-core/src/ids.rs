//! Minting of package identifiers.
//!
//! Each successful build gets a fresh package id and product code so the
//! console treats every build as an independently installable title. Ids
//! below the reserved floor belong to system and first-party content and
//! are never produced.

use std::collections::HashSet;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

/// Fixed high half of every minted package id (the injected-content area).
pub const PACKAGE_ID_PREFIX: &str = "00050002";

/// Lowest value allowed for each 16-bit group of the id suffix. Values
/// below this collide with the platform's reserved identifier range.
pub const RESERVED_GROUP_FLOOR: u16 = 0x3000;

/// Identifiers minted for one build.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedIds {
    /// 16-hex-digit package id, e.g. `000500024F3A81C2`.
    pub package_id: String,
    /// 4-hex-digit product code, rendered as `WUP-N-{code}` in metadata.
    pub product_code: String,
}

impl GeneratedIds {
    /// Group id derived from the product code for the metadata documents.
    pub fn group_id(&self) -> String {
        format!("0000{}", self.product_code)
    }
}

/// Mints package ids that are unique for the lifetime of the minter.
///
/// Random ids alone would admit birthday collisions over long sessions,
/// so minted suffixes are remembered and re-rolled on repeat.
pub struct IdMinter {
    rng: StdRng,
    minted: HashSet<String>,
}

impl IdMinter {
    pub fn new() -> Self {
        Self {
            rng: StdRng::from_entropy(),
            minted: HashSet::new(),
        }
    }

    /// Deterministic minter for tests.
    pub fn with_seed(seed: u64) -> Self {
        Self {
            rng: StdRng::seed_from_u64(seed),
            minted: HashSet::new(),
        }
    }

    fn group(&mut self) -> u16 {
        self.rng.gen_range(RESERVED_GROUP_FLOOR..=0xFFFF)
    }

    /// Mint a package id / product code pair, distinct from every pair
    /// this minter has produced before.
    pub fn mint(&mut self) -> GeneratedIds {
        loop {
            let suffix = format!("{:04X}{:04X}", self.group(), self.group());
            if !self.minted.insert(suffix.clone()) {
                continue;
            }
            let product_code = format!("{:04X}", self.group());
            return GeneratedIds {
                package_id: format!("{PACKAGE_ID_PREFIX}{suffix}"),
                product_code,
            };
        }
    }
}

impl Default for IdMinter {
    fn default() -> Self {
        Self::new()
    }
}
