//! Letter grades and qualitative summaries of a 0–100 score.
//!
//! Both mappings are pure functions of the score. `NaN` falls through every
//! threshold and lands on the lowest band.

use std::fmt;

/// Clamp a worker-reported score into `[0, 100]`. `NaN` becomes 0.
pub fn clamp_score(score: f64) -> f64 {
    if score.is_nan() {
        0.0
    } else {
        score.clamp(0.0, 100.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Grade {
    A,
    BPlus,
    B,
    CPlus,
    C,
    D,
    F,
}

impl Grade {
    pub fn from_score(score: f64) -> Self {
        if score >= 90.0 {
            Grade::A
        } else if score >= 80.0 {
            Grade::BPlus
        } else if score >= 70.0 {
            Grade::B
        } else if score >= 60.0 {
            Grade::CPlus
        } else if score >= 50.0 {
            Grade::C
        } else if score >= 40.0 {
            Grade::D
        } else {
            Grade::F
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Grade::A => "A",
            Grade::BPlus => "B+",
            Grade::B => "B",
            Grade::CPlus => "C+",
            Grade::C => "C",
            Grade::D => "D",
            Grade::F => "F",
        }
    }
}

impl fmt::Display for Grade {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The qualitative band of a score. Also selects the colour a score is
/// drawn in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Summary {
    Good,
    NeedsWork,
    Critical,
}

impl Summary {
    pub fn from_score(score: f64) -> Self {
        if score >= 70.0 {
            Summary::Good
        } else if score >= 40.0 {
            Summary::NeedsWork
        } else {
            Summary::Critical
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Summary::Good => "Good",
            Summary::NeedsWork => "Needs Work",
            Summary::Critical => "Critical",
        }
    }

    /// Band colour as RGB components in `[0, 1]`.
    pub fn rgb(&self) -> (f32, f32, f32) {
        match self {
            // #4ade80
            Summary::Good => (0.290, 0.871, 0.502),
            // #f59e0b
            Summary::NeedsWork => (0.961, 0.620, 0.043),
            // #ef4444
            Summary::Critical => (0.937, 0.267, 0.267),
        }
    }
}

impl fmt::Display for Summary {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn grade_boundaries() {
        let cases = [
            (100.0, Grade::A),
            (90.0, Grade::A),
            (89.99, Grade::BPlus),
            (80.0, Grade::BPlus),
            (79.99, Grade::B),
            (70.0, Grade::B),
            (69.99, Grade::CPlus),
            (60.0, Grade::CPlus),
            (59.99, Grade::C),
            (50.0, Grade::C),
            (49.99, Grade::D),
            (40.0, Grade::D),
            (39.99, Grade::F),
            (0.0, Grade::F),
        ];
        for (score, expected) in cases {
            assert_eq!(Grade::from_score(score), expected, "score {score}");
        }
    }

    #[test]
    fn summary_boundaries() {
        assert_eq!(Summary::from_score(70.0), Summary::Good);
        assert_eq!(Summary::from_score(69.99), Summary::NeedsWork);
        assert_eq!(Summary::from_score(40.0), Summary::NeedsWork);
        assert_eq!(Summary::from_score(39.99), Summary::Critical);
        assert_eq!(Summary::NeedsWork.to_string(), "Needs Work");
    }

    #[test]
    fn grade_labels() {
        assert_eq!(Grade::BPlus.to_string(), "B+");
        assert_eq!(Grade::CPlus.to_string(), "C+");
    }

    #[test]
    fn nan_is_lowest_band() {
        assert_eq!(Grade::from_score(f64::NAN), Grade::F);
        assert_eq!(Summary::from_score(f64::NAN), Summary::Critical);
        assert_eq!(clamp_score(f64::NAN), 0.0);
    }

    #[test]
    fn clamps_out_of_range_scores() {
        assert_eq!(clamp_score(-5.0), 0.0);
        assert_eq!(clamp_score(140.0), 100.0);
        assert_eq!(clamp_score(55.5), 55.5);
    }
}
