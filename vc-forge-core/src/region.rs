use serde::{Deserialize, Serialize};

/// Release regions for Wii titles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Region {
    /// USA / North America
    Usa,
    /// Europe (PAL regions)
    Europe,
    /// Japan
    Japan,
    /// Korea
    Korea,
    /// Unknown region
    Unknown,
}

impl Region {
    /// Returns the standard abbreviation for this region, as used in the
    /// compatibility store ("USA", "EUR", ...).
    pub fn code(&self) -> &'static str {
        match self {
            Self::Usa => "USA",
            Self::Europe => "EUR",
            Self::Japan => "JPN",
            Self::Korea => "KOR",
            Self::Unknown => "UNK",
        }
    }

    /// Parse a region from the fourth character of a content id.
    pub fn from_id_char(c: char) -> Self {
        match c.to_ascii_uppercase() {
            'E' => Self::Usa,
            'P' => Self::Europe,
            'J' => Self::Japan,
            'K' => Self::Korea,
            _ => Self::Unknown,
        }
    }

    /// Parse a region from a store abbreviation.
    pub fn from_code(code: &str) -> Self {
        match code.to_ascii_uppercase().as_str() {
            "USA" => Self::Usa,
            "EUR" | "PAL" => Self::Europe,
            "JPN" | "JAP" => Self::Japan,
            "KOR" => Self::Korea,
            _ => Self::Unknown,
        }
    }

    /// The content-id region character for this region, if one exists.
    pub fn id_char(&self) -> Option<char> {
        match self {
            Self::Usa => Some('E'),
            Self::Europe => Some('P'),
            Self::Japan => Some('J'),
            Self::Korea => Some('K'),
            Self::Unknown => None,
        }
    }

    /// Remote artwork language codes to try for this region, most
    /// preferred first.
    pub fn artwork_language_order(&self) -> &'static [&'static str] {
        match self {
            Self::Korea => &["KO", "EN", "US", "JA"],
            Self::Japan => &["JA", "EN", "US", "KO"],
            Self::Europe => &["EN", "US", "JA", "KO"],
            _ => &["US", "EN", "JA", "KO"],
        }
    }

    /// Region characters to swap through when probing alternate-region
    /// content ids.
    pub fn all_id_chars() -> &'static [char] {
        &['E', 'P', 'J', 'K']
    }
}

impl std::fmt::Display for Region {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.code())
    }
}
