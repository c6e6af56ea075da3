//! Externally-supplied configuration consulted by the skill, certification,
//! education, and semantic workers. Deliberately data, not logic (spec §9:
//! "treat as externally-supplied configuration, not as code").

use std::collections::BTreeSet;

#[derive(Debug, Clone)]
pub struct ScoringCatalog {
    /// Recognized skill tokens, matched word-boundary against résumé and job text.
    pub skills: BTreeSet<String>,
    /// Recognized certification names, matched as substrings of lowercased text.
    pub certifications: BTreeSet<String>,
    /// Tokens indicating a "tech-oriented" job (spec §4.4.5, GLOSSARY).
    pub tech_indicators: BTreeSet<String>,
    /// Degree keyword -> tier, unordered; the highest matching tier wins.
    pub degree_tiers: Vec<(&'static str, u8)>,
}

impl Default for ScoringCatalog {
    fn default() -> Self {
        let skills = [
            "python", "java", "javascript", "typescript", "rust", "go", "c++", "c#", ".net",
            "django", "flask", "react", "angular", "vue", "node", "kubernetes", "docker", "aws",
            "azure", "gcp", "terraform", "ansible", "linux", "sql", "postgresql", "mysql",
            "mongodb", "redis", "kafka", "spark", "hadoop", "tensorflow", "pytorch",
            "scikit-learn", "pandas", "numpy", "graphql", "rest", "microservices", "ci/cd",
            "git", "agile", "scrum",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let certifications = [
            "cissp", "cisa", "cism", "comptia security+", "aws certified solutions architect",
            "aws certified developer", "pmp", "ccna", "ccnp", "ckad", "cka",
            "gcp professional cloud architect", "azure solutions architect", "scrum master",
            "six sigma",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let tech_indicators = [
            "engineer", "developer", "programmer", "architect", "devops", "sre", "cloud",
            "data", "ai", "ml", "machine learning", "database", "sql", "python", "javascript",
            "java", "c++", ".net", "react", "node", "kubernetes", "docker", "aws", "azure",
            "gcp", "infrastructure", "software", "tech", "cybersecurity", "security",
            "network", "analyst", "admin", "backend", "frontend", "fullstack",
        ]
        .iter()
        .map(|s| s.to_string())
        .collect();

        let degree_tiers = vec![
            ("doctorate", 5),
            ("phd", 5),
            ("master", 4),
            ("msc", 4),
            ("mba", 4),
            ("bachelor", 3),
            ("bsc", 3),
            ("associate", 2),
            ("high school", 1),
            ("ged", 1),
        ];

        Self { skills, certifications, tech_indicators, degree_tiers }
    }
}
