//! Skill levels and skill requirements.
//!
//! Levels are a closed, totally ordered scale. A requirement asks for
//! `quantity` distinct holders of a skill at or above `min_level`.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{EngineError, Result};

/// Proficiency level, ordered from least to most qualified.
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
)]
#[serde(rename_all = "lowercase")]
pub enum SkillLevel {
    Basic,
    Competent,
    Proficient,
    Expert,
    Master,
}

impl SkillLevel {
    /// All levels in ascending order.
    pub const ALL: [SkillLevel; 5] = [
        SkillLevel::Basic,
        SkillLevel::Competent,
        SkillLevel::Proficient,
        SkillLevel::Expert,
        SkillLevel::Master,
    ];

    /// Canonical lowercase name.
    pub fn as_str(&self) -> &'static str {
        match self {
            SkillLevel::Basic => "basic",
            SkillLevel::Competent => "competent",
            SkillLevel::Proficient => "proficient",
            SkillLevel::Expert => "expert",
            SkillLevel::Master => "master",
        }
    }
}

impl fmt::Display for SkillLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SkillLevel {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let needle = s.trim();
        Self::ALL
            .into_iter()
            .find(|l| l.as_str().eq_ignore_ascii_case(needle))
            .ok_or_else(|| EngineError::UnknownSkillLevel(s.to_string()))
    }
}

/// "At least `quantity` holders of `skill_type` at level >= `min_level`".
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawRequirement")]
pub struct SkillRequirement {
    /// Skill name (e.g., "welding", "milling").
    pub skill_type: String,
    /// Lowest acceptable level.
    pub min_level: SkillLevel,
    /// Number of distinct holders needed (>= 1).
    pub quantity: u32,
}

#[derive(Deserialize)]
struct RawRequirement {
    skill_type: String,
    min_level: SkillLevel,
    quantity: u32,
}

impl TryFrom<RawRequirement> for SkillRequirement {
    type Error = EngineError;

    fn try_from(raw: RawRequirement) -> Result<Self> {
        Self::new(raw.skill_type, raw.min_level, raw.quantity)
    }
}

impl SkillRequirement {
    /// Creates a requirement.
    ///
    /// # Errors
    /// `InvalidQuantity` when `quantity` is zero.
    pub fn new(skill_type: impl Into<String>, min_level: SkillLevel, quantity: u32) -> Result<Self> {
        let skill_type = skill_type.into();
        if quantity == 0 {
            return Err(EngineError::InvalidQuantity {
                skill_type,
                quantity,
            });
        }
        Ok(Self {
            skill_type,
            min_level,
            quantity,
        })
    }

    /// Creates a requirement for a single holder.
    pub fn single(skill_type: impl Into<String>, min_level: SkillLevel) -> Self {
        Self {
            skill_type: skill_type.into(),
            min_level,
            quantity: 1,
        }
    }
}

/// Canonical text form: `skill:level` or `skill:level*N`.
impl fmt::Display for SkillRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.quantity == 1 {
            write!(f, "{}:{}", self.skill_type, self.min_level)
        } else {
            write!(f, "{}:{}*{}", self.skill_type, self.min_level, self.quantity)
        }
    }
}

/// Parses `welding:expert`, `welding:expert*2` or `welding:expert×2`.
impl FromStr for SkillRequirement {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self> {
        let malformed = || EngineError::MalformedRequirement(s.to_string());

        let (skill, rest) = s.split_once(':').ok_or_else(malformed)?;
        let skill = skill.trim();
        if skill.is_empty() {
            return Err(malformed());
        }

        let (level, quantity) = match rest.split_once(['*', '×']) {
            Some((level, qty)) => (level, qty.trim().parse::<u32>().map_err(|_| malformed())?),
            None => (rest, 1),
        };

        Self::new(skill, level.parse()?, quantity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_level_ordering() {
        assert!(SkillLevel::Basic < SkillLevel::Competent);
        assert!(SkillLevel::Competent < SkillLevel::Proficient);
        assert!(SkillLevel::Proficient < SkillLevel::Expert);
        assert!(SkillLevel::Expert < SkillLevel::Master);
        assert_eq!(SkillLevel::ALL.iter().max(), Some(&SkillLevel::Master));
    }

    #[test]
    fn test_level_parse() {
        assert_eq!("expert".parse::<SkillLevel>(), Ok(SkillLevel::Expert));
        assert_eq!(" Competent ".parse::<SkillLevel>(), Ok(SkillLevel::Competent));
        assert_eq!(
            "guru".parse::<SkillLevel>(),
            Err(EngineError::UnknownSkillLevel("guru".into()))
        );
    }

    #[test]
    fn test_requirement_quantity_invariant() {
        assert!(SkillRequirement::new("welding", SkillLevel::Basic, 0).is_err());
        let req = SkillRequirement::new("welding", SkillLevel::Basic, 3).unwrap();
        assert_eq!(req.quantity, 3);
    }

    #[test]
    fn test_requirement_text_form() {
        let req: SkillRequirement = "welding:competent".parse().unwrap();
        assert_eq!(req, SkillRequirement::single("welding", SkillLevel::Competent));
        assert_eq!(req.to_string(), "welding:competent");

        let req: SkillRequirement = "milling:expert*2".parse().unwrap();
        assert_eq!(req.quantity, 2);
        assert_eq!(req.to_string(), "milling:expert*2");

        let req: SkillRequirement = "milling:expert×3".parse().unwrap();
        assert_eq!(req.quantity, 3);

        assert!("welding".parse::<SkillRequirement>().is_err());
        assert!(":expert".parse::<SkillRequirement>().is_err());
        assert!("welding:expert*x".parse::<SkillRequirement>().is_err());
        assert!("welding:expert*0".parse::<SkillRequirement>().is_err());
        assert!("welding:guru".parse::<SkillRequirement>().is_err());
    }

    #[test]
    fn test_level_serde_lowercase() {
        let json = serde_json::to_string(&SkillLevel::Proficient).unwrap();
        assert_eq!(json, "\"proficient\"");
    }

    #[test]
    fn test_requirement_deserialize_validates() {
        let ok: SkillRequirement = serde_json::from_str(
            r#"{"skill_type":"welding","min_level":"expert","quantity":2}"#,
        )
        .unwrap();
        assert_eq!(ok, SkillRequirement::new("welding", SkillLevel::Expert, 2).unwrap());

        let zero: std::result::Result<SkillRequirement, _> = serde_json::from_str(
            r#"{"skill_type":"welding","min_level":"expert","quantity":0}"#,
        );
        assert!(zero.is_err());
    }
}
