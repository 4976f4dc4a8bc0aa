// Code Translation - Version-dependent coded values
//
// The 1.x and 2.x standards name the same concepts with different codes
// (transaction types, activity date types, sector vocabularies, organisation
// roles). Statistic functions ask for the concept; this module answers with
// the code for the record's major version.

use serde::{Deserialize, Serialize};

/// Version every unrecognised declaration falls back to.
pub const LEGACY_VERSION: &str = "1.01";

/// The only versions that define the explicit `@humanitarian` attribute.
pub const HUMANITARIAN_ATTRIB_VERSIONS: [&str; 2] = ["2.02", "2.03"];

// ============================================================================
// MAJOR VERSION
// ============================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MajorVersion {
    One,
    Two,
}

impl MajorVersion {
    pub fn of(version: &str) -> MajorVersion {
        if version.starts_with("2.") {
            MajorVersion::Two
        } else {
            MajorVersion::One
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            MajorVersion::One => "1",
            MajorVersion::Two => "2",
        }
    }
}

// ============================================================================
// ACTIVITY DATE TYPES
// ============================================================================

pub fn planned_start_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "start-planned",
        MajorVersion::Two => "1",
    }
}

pub fn actual_start_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "start-actual",
        MajorVersion::Two => "2",
    }
}

pub fn planned_end_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "end-planned",
        MajorVersion::Two => "3",
    }
}

pub fn actual_end_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "end-actual",
        MajorVersion::Two => "4",
    }
}

// ============================================================================
// TRANSACTION TYPES
// ============================================================================

pub fn incoming_funds_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "IF",
        MajorVersion::Two => "1",
    }
}

pub fn commitment_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "C",
        MajorVersion::Two => "2",
    }
}

pub fn disbursement_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "D",
        MajorVersion::Two => "3",
    }
}

pub fn expenditure_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "E",
        MajorVersion::Two => "4",
    }
}

// ============================================================================
// SECTOR VOCABULARIES AND ORGANISATION ROLES
// ============================================================================

pub fn dac_5_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "DAC",
        MajorVersion::Two => "1",
    }
}

pub fn dac_3_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "DAC-3",
        MajorVersion::Two => "2",
    }
}

pub fn funding_role_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "Funding",
        MajorVersion::Two => "1",
    }
}

pub fn extending_role_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "Extending",
        MajorVersion::Two => "3",
    }
}

pub fn implementing_role_code(major: MajorVersion) -> &'static str {
    match major {
        MajorVersion::One => "Implementing",
        MajorVersion::Two => "4",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_major_version_of() {
        assert_eq!(MajorVersion::of("2.03"), MajorVersion::Two);
        assert_eq!(MajorVersion::of("1.05"), MajorVersion::One);
        assert_eq!(MajorVersion::of("1.01"), MajorVersion::One);
    }

    #[test]
    fn test_code_translation() {
        assert_eq!(disbursement_code(MajorVersion::One), "D");
        assert_eq!(disbursement_code(MajorVersion::Two), "3");
        assert_eq!(planned_end_code(MajorVersion::Two), "3");
        assert_eq!(dac_5_code(MajorVersion::One), "DAC");
    }
}
