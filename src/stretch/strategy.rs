//! Resynthesis strategies selectable per session.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::PvocError;

/// How a session turns analysis frames into output frames.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum Resynthesis {
    /// Complex recurrence `Y = X_t · normalize(Y_prev / X_s)`.
    #[default]
    Complex,
    /// Per-bin instantaneous-frequency phase accumulation.
    PhaseAccumulation,
    /// No spectral processing; windowed overlap-add of the source frame.
    Passthrough,
}

impl Resynthesis {
    /// All strategies.
    pub const ALL: [Resynthesis; 3] = [
        Resynthesis::Complex,
        Resynthesis::PhaseAccumulation,
        Resynthesis::Passthrough,
    ];

    /// Short name used on the command line and in config files.
    pub fn name(self) -> &'static str {
        match self {
            Resynthesis::Complex => "complex",
            Resynthesis::PhaseAccumulation => "phase-accumulation",
            Resynthesis::Passthrough => "passthrough",
        }
    }

    /// Whether the strategy needs the FFT.
    #[inline]
    pub fn is_spectral(self) -> bool {
        !matches!(self, Resynthesis::Passthrough)
    }
}

impl fmt::Display for Resynthesis {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Resynthesis {
    type Err = PvocError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Resynthesis::ALL
            .into_iter()
            .find(|r| r.name().eq_ignore_ascii_case(s))
            .ok_or_else(|| PvocError::InvalidParameter(format!("unknown strategy '{s}'")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_names() {
        for r in Resynthesis::ALL {
            assert_eq!(r.name().parse::<Resynthesis>().unwrap(), r);
        }
        assert_eq!("COMPLEX".parse::<Resynthesis>().unwrap(), Resynthesis::Complex);
        assert!("granular".parse::<Resynthesis>().is_err());
    }

    #[test]
    fn test_default_is_complex() {
        assert_eq!(Resynthesis::default(), Resynthesis::Complex);
        assert!(Resynthesis::Complex.is_spectral());
        assert!(!Resynthesis::Passthrough.is_spectral());
    }

    #[test]
    fn test_serde_names_match_display() {
        let json = serde_json::to_string(&Resynthesis::PhaseAccumulation).unwrap();
        assert_eq!(json, "\"phase-accumulation\"");
    }
}
