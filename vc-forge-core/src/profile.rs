//! Controller profiles and their mappings to encoder flags.

use serde::{Deserialize, Serialize};

/// Input-device emulation profile for an injected title.
///
/// A closed set: every profile maps exhaustively to an encoder flag set,
/// an output-directory prefix, and a GamePad-screen setting. Adding a
/// variant without updating the mappings is a compile error.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ControllerProfile {
    /// No GamePad emulation; Wii Remote only.
    NoGamepad,
    /// Default GamePad play via Classic Controller emulation.
    GamepadCc,
    /// GamePad with the analog-trigger (L/R) patch.
    GamepadLr,
    /// Classic Controller emulation forced via a compatibility patch
    /// applied to the title's executable.
    ForceClassicController,
    /// Vertical Wii Remote emulation on the GamePad.
    Wiimote,
    /// Horizontal Wii Remote emulation on the GamePad.
    HorizontalWiimote,
    /// Pass real controllers through (homebrew/Nintendont sources).
    Passthrough,
}

impl ControllerProfile {
    /// All profiles, in the order presented to users.
    pub fn all() -> &'static [ControllerProfile] {
        &[
            Self::NoGamepad,
            Self::GamepadCc,
            Self::GamepadLr,
            Self::ForceClassicController,
            Self::Wiimote,
            Self::HorizontalWiimote,
            Self::Passthrough,
        ]
    }

    /// Flag set passed to the content encoder. Always starts with the
    /// encrypt flag.
    pub fn encoder_flags(&self) -> Vec<&'static str> {
        let mut flags = vec!["-enc"];
        match self {
            Self::NoGamepad => flags.push("-nocc"),
            Self::GamepadCc | Self::ForceClassicController => flags.push("-instantcc"),
            Self::GamepadLr => {
                flags.push("-instantcc");
                flags.push("-lrpatch");
            }
            Self::Wiimote => flags.push("-wiimote"),
            Self::HorizontalWiimote => {
                flags.push("-wiimote");
                flags.push("-horizontal");
            }
            Self::Passthrough => flags.push("-passthrough"),
        }
        flags
    }

    /// Prefix for the output package directory, so the same title can be
    /// built under several profiles side by side.
    pub fn output_prefix(&self) -> &'static str {
        match self {
            Self::NoGamepad => "NOGP_",
            Self::GamepadCc => "GP_",
            Self::GamepadLr => "GPLR_",
            Self::ForceClassicController => "GPFC_",
            Self::Wiimote => "WM_",
            Self::HorizontalWiimote => "HWM_",
            Self::Passthrough => "PT_",
        }
    }

    /// Value of the GamePad-screen (`drc_use`) metadata field.
    pub fn drc_use(&self) -> u32 {
        match self {
            Self::NoGamepad => 1,
            _ => 65537,
        }
    }

    /// Whether this profile needs a compatibility patch bound to the
    /// title's executable.
    pub fn requires_patch(&self) -> bool {
        matches!(self, Self::ForceClassicController)
    }

    /// Patch kind this profile binds when one is available.
    pub fn patch_kind(&self) -> Option<&'static str> {
        match self {
            Self::ForceClassicController => Some("cc"),
            _ => None,
        }
    }

    /// Stable name used in CLI arguments and settings files.
    pub fn name(&self) -> &'static str {
        match self {
            Self::NoGamepad => "no-gamepad",
            Self::GamepadCc => "gamepad",
            Self::GamepadLr => "gamepad-lr",
            Self::ForceClassicController => "force-cc",
            Self::Wiimote => "wiimote",
            Self::HorizontalWiimote => "horizontal-wiimote",
            Self::Passthrough => "passthrough",
        }
    }
}

impl std::fmt::Display for ControllerProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl std::str::FromStr for ControllerProfile {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        ControllerProfile::all()
            .iter()
            .copied()
            .find(|p| p.name() == s)
            .ok_or_else(|| {
                let names: Vec<&str> = ControllerProfile::all().iter().map(|p| p.name()).collect();
                format!("unknown controller profile '{s}' (expected one of: {})", names.join(", "))
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_profile_has_distinct_prefix() {
        let mut prefixes: Vec<&str> = ControllerProfile::all()
            .iter()
            .map(|p| p.output_prefix())
            .collect();
        prefixes.sort();
        prefixes.dedup();
        assert_eq!(prefixes.len(), ControllerProfile::all().len());
    }

    #[test]
    fn force_cc_maps_to_gpfc() {
        let p = ControllerProfile::ForceClassicController;
        assert_eq!(p.output_prefix(), "GPFC_");
        assert!(p.requires_patch());
        assert_eq!(p.patch_kind(), Some("cc"));
        assert_eq!(p.encoder_flags(), vec!["-enc", "-instantcc"]);
    }

    #[test]
    fn drc_use_only_disabled_without_gamepad() {
        for p in ControllerProfile::all() {
            let expected = if *p == ControllerProfile::NoGamepad { 1 } else { 65537 };
            assert_eq!(p.drc_use(), expected);
        }
    }

    #[test]
    fn name_round_trip() {
        for p in ControllerProfile::all() {
            assert_eq!(p.name().parse::<ControllerProfile>().unwrap(), *p);
        }
    }
}
