//! Weight Profile Selector (spec §4.2): a pure function from job text to a
//! profile tag and a normalized weight vector over the five dimensions.

use serde::{Deserialize, Serialize};

/// One of the four fixed fusion profiles.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ProfileTag {
    SeniorLeadership,
    SecurityCompliance,
    DataMl,
    Default,
}

impl ProfileTag {
    pub fn as_str(&self) -> &'static str {
        match self {
            ProfileTag::SeniorLeadership => "Senior/Leadership",
            ProfileTag::SecurityCompliance => "Security/Compliance",
            ProfileTag::DataMl => "Data/ML",
            ProfileTag::Default => "Default",
        }
    }
}

impl std::fmt::Display for ProfileTag {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Weights over (skill, semantic, experience, education, certification),
/// always summing to 1.0.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Weights {
    pub skill: f64,
    pub semantic: f64,
    pub experience: f64,
    pub education: f64,
    pub certification: f64,
}

impl Weights {
    const fn new(skill: f64, semantic: f64, experience: f64, education: f64, certification: f64) -> Self {
        Self { skill, semantic, experience, education, certification }
    }

    /// Sum of all five weights, for the §8 "weight law" property.
    pub fn sum(&self) -> f64 {
        self.skill + self.semantic + self.experience + self.education + self.certification
    }
}

const SENIOR_LEADERSHIP: Weights = Weights::new(0.30, 0.15, 0.35, 0.15, 0.05);
const SECURITY_COMPLIANCE: Weights = Weights::new(0.30, 0.20, 0.20, 0.15, 0.15);
const DATA_ML: Weights = Weights::new(0.40, 0.25, 0.15, 0.15, 0.05);
const DEFAULT: Weights = Weights::new(0.25, 0.15, 0.10, 0.30, 0.20);

const SENIOR_KEYWORDS: [&str; 3] = ["senior", "lead", "principal"];
const SECURITY_DESC_KEYWORDS: [&str; 2] = ["certification", "certified"];
const SECURITY_TITLE_KEYWORDS: [&str; 2] = ["security", "compliance"];
const DATA_ML_KEYWORDS: [&str; 5] = ["data", "machine learning", "ml", "tensorflow", "pytorch"];

fn contains_any(haystack: &str, needles: &[&str]) -> bool {
    let lower = haystack.to_lowercase();
    needles.iter().any(|n| lower.contains(n))
}

/// Classify a job into a profile and return its weight vector. Pure: the same
/// `(title, description)` always yields the same result (spec §8 determinism).
pub fn select(title: &str, description: &str) -> (ProfileTag, Weights) {
    if contains_any(title, &SENIOR_KEYWORDS) {
        return (ProfileTag::SeniorLeadership, SENIOR_LEADERSHIP);
    }
    if contains_any(description, &SECURITY_DESC_KEYWORDS) || contains_any(title, &SECURITY_TITLE_KEYWORDS) {
        return (ProfileTag::SecurityCompliance, SECURITY_COMPLIANCE);
    }
    if contains_any(title, &DATA_ML_KEYWORDS) || contains_any(description, &DATA_ML_KEYWORDS) {
        return (ProfileTag::DataMl, DATA_ML);
    }
    (ProfileTag::Default, DEFAULT)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn senior_title_wins_even_with_security_description() {
        let (tag, weights) = select("Senior Security Engineer", "CISSP certification required");
        assert_eq!(tag, ProfileTag::SeniorLeadership);
        assert_eq!(weights, SENIOR_LEADERSHIP);
    }

    #[test]
    fn security_by_description_certification_keyword() {
        let (tag, _) = select("Platform Engineer", "CISSP certification required");
        assert_eq!(tag, ProfileTag::SecurityCompliance);
    }

    #[test]
    fn data_ml_by_title() {
        let (tag, weights) = select("Machine Learning Engineer", "Build models.");
        assert_eq!(tag, ProfileTag::DataMl);
        assert_eq!(weights, DATA_ML);
    }

    #[test]
    fn default_when_nothing_matches() {
        let (tag, weights) = select("Office Manager", "Organize schedules and vendors.");
        assert_eq!(tag, ProfileTag::Default);
        assert_eq!(weights, DEFAULT);
    }

    #[test]
    fn all_profiles_sum_to_one() {
        for weights in [SENIOR_LEADERSHIP, SECURITY_COMPLIANCE, DATA_ML, DEFAULT] {
            assert!((weights.sum() - 1.0).abs() < 0.001);
        }
    }

    #[test]
    fn selection_is_deterministic() {
        let a = select("Senior Python Developer", "Python, Django, 5+ years");
        let b = select("Senior Python Developer", "Python, Django, 5+ years");
        assert_eq!(a.0, b.0);
        assert_eq!(a.1, b.1);
    }
}
