//! Finger identity and per-finger classification enums.
//!
//! [`FingerPosition`] is the immutable key every measurement and artifact is
//! stored under. Its declaration order is the canonical ordering used for
//! output lists and for the fallback palette index.

use std::fmt;
use std::str::FromStr;

/// Left or right hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Hand {
    Left,
    Right,
}

impl Hand {
    /// The opposite hand.
    pub fn opposite(self) -> Self {
        match self {
            Self::Left => Self::Right,
            Self::Right => Self::Left,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Left => "left",
            Self::Right => "right",
        }
    }
}

/// Finger name, independent of hand.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FingerName {
    Thumb,
    Index,
    Middle,
    Ring,
    Pinky,
}

impl FingerName {
    pub const ALL: [FingerName; 5] = [
        FingerName::Thumb,
        FingerName::Index,
        FingerName::Middle,
        FingerName::Ring,
        FingerName::Pinky,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Thumb => "thumb",
            Self::Index => "index",
            Self::Middle => "middle",
            Self::Ring => "ring",
            Self::Pinky => "pinky",
        }
    }
}

/// One of the ten canonical finger positions.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(rename_all = "snake_case")]
pub enum FingerPosition {
    LeftThumb,
    LeftIndex,
    LeftMiddle,
    LeftRing,
    LeftPinky,
    RightThumb,
    RightIndex,
    RightMiddle,
    RightRing,
    RightPinky,
}

impl FingerPosition {
    /// All positions in canonical order.
    pub const ALL: [FingerPosition; 10] = [
        FingerPosition::LeftThumb,
        FingerPosition::LeftIndex,
        FingerPosition::LeftMiddle,
        FingerPosition::LeftRing,
        FingerPosition::LeftPinky,
        FingerPosition::RightThumb,
        FingerPosition::RightIndex,
        FingerPosition::RightMiddle,
        FingerPosition::RightRing,
        FingerPosition::RightPinky,
    ];

    /// Number of canonical positions.
    pub const COUNT: usize = 10;

    pub fn new(hand: Hand, finger: FingerName) -> Self {
        let offset = match finger {
            FingerName::Thumb => 0,
            FingerName::Index => 1,
            FingerName::Middle => 2,
            FingerName::Ring => 3,
            FingerName::Pinky => 4,
        };
        let base = match hand {
            Hand::Left => 0,
            Hand::Right => 5,
        };
        Self::ALL[base + offset]
    }

    /// Index in canonical order, `0..10`.
    pub fn index(self) -> usize {
        self as usize
    }

    /// Position at canonical index `idx`, if in range.
    pub fn from_index(idx: usize) -> Option<Self> {
        Self::ALL.get(idx).copied()
    }

    pub fn hand(self) -> Hand {
        if self.index() < 5 {
            Hand::Left
        } else {
            Hand::Right
        }
    }

    pub fn finger(self) -> FingerName {
        FingerName::ALL[self.index() % 5]
    }

    /// Same finger on the opposite hand.
    pub fn mirrored(self) -> Self {
        Self::new(self.hand().opposite(), self.finger())
    }

    /// Human-readable label, e.g. `"left index"`.
    pub fn label(self) -> String {
        format!("{} {}", self.hand().as_str(), self.finger().as_str())
    }

    /// Storage-safe identifier, e.g. `"left_index"`.
    pub fn slug(self) -> String {
        format!("{}_{}", self.hand().as_str(), self.finger().as_str())
    }
}

impl fmt::Display for FingerPosition {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.label())
    }
}

impl FromStr for FingerPosition {
    type Err = String;

    /// Accepts `left_index`, `left-index`, `left index` and `LeftIndex` forms.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let norm: String = s
            .trim()
            .chars()
            .filter(|c| !matches!(c, '_' | '-' | ' '))
            .map(|c| c.to_ascii_lowercase())
            .collect();
        Self::ALL
            .iter()
            .copied()
            .find(|p| p.slug().replace('_', "") == norm)
            .ok_or_else(|| format!("unknown finger position '{s}'"))
    }
}

/// Coarse nail shape classification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ShapeCategory {
    #[default]
    Oval,
    Square,
    Round,
    Almond,
    Coffin,
}

impl ShapeCategory {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Oval => "oval",
            Self::Square => "square",
            Self::Round => "round",
            Self::Almond => "almond",
            Self::Coffin => "coffin",
        }
    }
}

impl FromStr for ShapeCategory {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "oval" => Ok(Self::Oval),
            "square" => Ok(Self::Square),
            "round" => Ok(Self::Round),
            "almond" => Ok(Self::Almond),
            "coffin" | "ballerina" => Ok(Self::Coffin),
            other => Err(format!("unknown nail shape '{other}'")),
        }
    }
}

/// Where a measurement record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceKind {
    /// Extracted from a photo of this finger (possibly a failed extraction).
    Measured,
    /// Copied from the same finger on the other hand.
    InferredFromPair,
    /// Filled from the anatomical default table.
    InferredFromTemplate,
}

impl SourceKind {
    /// `true` for records that were not taken from this finger's own photo.
    pub fn is_estimated(self) -> bool {
        !matches!(self, Self::Measured)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn only_measured_records_are_not_estimated() {
        assert!(!SourceKind::Measured.is_estimated());
        assert!(SourceKind::InferredFromPair.is_estimated());
        assert!(SourceKind::InferredFromTemplate.is_estimated());
    }

    #[test]
    fn canonical_order_round_trips_through_index() {
        for (i, p) in FingerPosition::ALL.iter().enumerate() {
            assert_eq!(p.index(), i);
            assert_eq!(FingerPosition::from_index(i), Some(*p));
        }
        assert_eq!(FingerPosition::from_index(10), None);
    }

    #[test]
    fn mirrored_swaps_hand_and_keeps_finger() {
        for p in FingerPosition::ALL {
            let m = p.mirrored();
            assert_ne!(p.hand(), m.hand());
            assert_eq!(p.finger(), m.finger());
            assert_eq!(m.mirrored(), p);
        }
        assert_eq!(
            FingerPosition::LeftRing.mirrored(),
            FingerPosition::RightRing
        );
    }

    #[test]
    fn parses_common_spellings() {
        assert_eq!(
            "left_index".parse::<FingerPosition>(),
            Ok(FingerPosition::LeftIndex)
        );
        assert_eq!(
            "Right Pinky".parse::<FingerPosition>(),
            Ok(FingerPosition::RightPinky)
        );
        assert_eq!(
            "right-thumb".parse::<FingerPosition>(),
            Ok(FingerPosition::RightThumb)
        );
        assert!("left toe".parse::<FingerPosition>().is_err());
    }

    #[test]
    fn serde_uses_snake_case_slugs() {
        let json = serde_json::to_string(&FingerPosition::RightMiddle).expect("serialize");
        assert_eq!(json, "\"right_middle\"");
        let back: FingerPosition = serde_json::from_str(&json).expect("deserialize");
        assert_eq!(back, FingerPosition::RightMiddle);
    }

    #[test]
    fn shape_parsing_is_case_insensitive() {
        assert_eq!("Almond".parse::<ShapeCategory>(), Ok(ShapeCategory::Almond));
        assert_eq!(
            "ballerina".parse::<ShapeCategory>(),
            Ok(ShapeCategory::Coffin)
        );
        assert!("stiletto".parse::<ShapeCategory>().is_err());
    }
}
