use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// The five quality dimensions tracked per project.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Metric {
    Security,
    Reliability,
    Maintainability,
    Coverage,
    Complexity,
}

impl Metric {
    pub const ALL: [Metric; 5] = [
        Metric::Security,
        Metric::Reliability,
        Metric::Maintainability,
        Metric::Coverage,
        Metric::Complexity,
    ];

    pub fn key(self) -> &'static str {
        match self {
            Metric::Security => "security",
            Metric::Reliability => "reliability",
            Metric::Maintainability => "maintainability",
            Metric::Coverage => "coverage",
            Metric::Complexity => "complexity",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            Metric::Security => "Security",
            Metric::Reliability => "Reliability",
            Metric::Maintainability => "Maintainability",
            Metric::Coverage => "Unit test coverage",
            Metric::Complexity => "Complexity",
        }
    }

    /// Graded A..E metrics; coverage is the only ratio metric.
    pub fn is_rating(self) -> bool {
        !matches!(self, Metric::Coverage)
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.key())
    }
}

impl FromStr for Metric {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "security" | "security_rating" => Ok(Metric::Security),
            "reliability" | "reliability_rating" => Ok(Metric::Reliability),
            "maintainability" | "maintainability_rating" | "sqale_rating" => {
                Ok(Metric::Maintainability)
            }
            "coverage" => Ok(Metric::Coverage),
            "complexity" | "complexity_rating" => Ok(Metric::Complexity),
            _ => Err(EngineError::UnknownMetric(s.to_string())),
        }
    }
}

/// Letter grade, A best to E worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Rating {
    A,
    B,
    C,
    D,
    E,
}

impl Rating {
    pub const ALL: [Rating; 5] = [Rating::A, Rating::B, Rating::C, Rating::D, Rating::E];

    /// Lenient parse used on snapshot cells: trims and uppercases, anything
    /// outside A..E yields `None`.
    pub fn parse_lenient(raw: &str) -> Option<Rating> {
        match raw.trim().to_ascii_uppercase().as_str() {
            "A" => Some(Rating::A),
            "B" => Some(Rating::B),
            "C" => Some(Rating::C),
            "D" => Some(Rating::D),
            "E" => Some(Rating::E),
            _ => None,
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Rating::A => "A",
            Rating::B => "B",
            Rating::C => "C",
            Rating::D => "D",
            Rating::E => "E",
        }
    }
}

impl fmt::Display for Rating {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Rating {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Rating::parse_lenient(s).ok_or_else(|| EngineError::UnknownRating(s.to_string()))
    }
}

/// One value per metric, addressed by [`Metric`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerMetric<T> {
    pub security: T,
    pub reliability: T,
    pub maintainability: T,
    pub coverage: T,
    pub complexity: T,
}

impl<T> PerMetric<T> {
    pub fn from_fn(mut f: impl FnMut(Metric) -> T) -> Self {
        Self {
            security: f(Metric::Security),
            reliability: f(Metric::Reliability),
            maintainability: f(Metric::Maintainability),
            coverage: f(Metric::Coverage),
            complexity: f(Metric::Complexity),
        }
    }

    pub fn get(&self, metric: Metric) -> &T {
        match metric {
            Metric::Security => &self.security,
            Metric::Reliability => &self.reliability,
            Metric::Maintainability => &self.maintainability,
            Metric::Coverage => &self.coverage,
            Metric::Complexity => &self.complexity,
        }
    }

    pub fn get_mut(&mut self, metric: Metric) -> &mut T {
        match metric {
            Metric::Security => &mut self.security,
            Metric::Reliability => &mut self.reliability,
            Metric::Maintainability => &mut self.maintainability,
            Metric::Coverage => &mut self.coverage,
            Metric::Complexity => &mut self.complexity,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_metric_names_and_source_aliases() {
        assert_eq!("Reliability".parse::<Metric>().unwrap(), Metric::Reliability);
        assert_eq!("sqale_rating".parse::<Metric>().unwrap(), Metric::Maintainability);
        assert!(matches!(
            "duplications".parse::<Metric>(),
            Err(EngineError::UnknownMetric(_))
        ));
    }

    #[test]
    fn lenient_rating_parse_never_defaults_to_a_grade() {
        assert_eq!(Rating::parse_lenient(" b "), Some(Rating::B));
        assert_eq!(Rating::parse_lenient("F"), None);
        assert_eq!(Rating::parse_lenient("nan"), None);
        assert_eq!(Rating::parse_lenient(""), None);
    }

    #[test]
    fn per_metric_lookup_matches_field() {
        let mut flags = PerMetric::from_fn(|m| m == Metric::Coverage);
        assert!(*flags.get(Metric::Coverage));
        assert!(!*flags.get(Metric::Security));
        *flags.get_mut(Metric::Security) = true;
        assert!(flags.security);
    }
}
