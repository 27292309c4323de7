//! Authenticity classification of similarity scores.
//!
//! Buckets partition [0, 100] without overlap:
//!
//! | Similarity index     | Severity            |
//! |----------------------|---------------------|
//! | 0 ..= 45             | `HighlyForged`      |
//! | (45, 65]             | `LikelyForged`      |
//! | (65, 75]             | `PossiblyAuthentic` |
//! | (75, 100]            | `HighlyAuthentic`   |
//! | missing / out of range / NaN | `Unknown`   |

use serde::Serialize;

/// Upper bound (inclusive) of each bucket.
const HIGHLY_FORGED_MAX: f64 = 45.0;
const LIKELY_FORGED_MAX: f64 = 65.0;
const POSSIBLY_AUTHENTIC_MAX: f64 = 75.0;
const SCORE_MIN: f64 = 0.0;
const SCORE_MAX: f64 = 100.0;

/// Discrete authenticity label derived from a similarity index.
///
/// Computed at display time; never persisted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum AuthenticitySeverity {
    HighlyForged,
    LikelyForged,
    PossiblyAuthentic,
    HighlyAuthentic,
    Unknown,
}

impl AuthenticitySeverity {
    pub fn label(&self) -> &'static str {
        match self {
            Self::HighlyForged => "Highly Forged",
            Self::LikelyForged => "Likely Forged",
            Self::PossiblyAuthentic => "Possibly Authentic",
            Self::HighlyAuthentic => "Highly Authentic",
            Self::Unknown => "Unknown",
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::HighlyForged => "The signatures differ substantially.",
            Self::LikelyForged => "The signatures share some features but differ in key strokes.",
            Self::PossiblyAuthentic => "The signatures are close; manual review is advised.",
            Self::HighlyAuthentic => "The signatures match closely.",
            Self::Unknown => "No usable score is available.",
        }
    }

    pub fn is_forged(&self) -> bool {
        matches!(self, Self::HighlyForged | Self::LikelyForged)
    }
}

impl std::fmt::Display for AuthenticitySeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Map a similarity index to its severity. Total: never panics.
pub fn classify(similarity_index: Option<f64>) -> AuthenticitySeverity {
    let Some(score) = similarity_index else {
        return AuthenticitySeverity::Unknown;
    };
    if !score.is_finite() || !(SCORE_MIN..=SCORE_MAX).contains(&score) {
        return AuthenticitySeverity::Unknown;
    }

    if score <= HIGHLY_FORGED_MAX {
        AuthenticitySeverity::HighlyForged
    } else if score <= LIKELY_FORGED_MAX {
        AuthenticitySeverity::LikelyForged
    } else if score <= POSSIBLY_AUTHENTIC_MAX {
        AuthenticitySeverity::PossiblyAuthentic
    } else {
        AuthenticitySeverity::HighlyAuthentic
    }
}

/// Filled share of the score donut, in [0, 1].
pub fn donut_fraction(similarity_index: f64) -> f64 {
    if similarity_index.is_nan() {
        return 0.0;
    }
    (similarity_index / SCORE_MAX).clamp(0.0, 1.0)
}
