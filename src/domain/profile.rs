use crate::domain::state::UsState;
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

pub const MIN_VOTING_AGE: u32 = 18;
pub const MAX_AGE: u32 = 120;

/// Lowercases and folds spaces, hyphens and apostrophes so that
/// "Non-Binary", "non binary" and "non_binary" compare equal.
fn normalize_token(raw: &str) -> String {
    raw.trim()
        .to_ascii_lowercase()
        .chars()
        .filter(|c| !matches!(c, '\'' | '.'))
        .map(|c| if c == ' ' || c == '-' { '_' } else { c })
        .collect::<String>()
        .split('_')
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join("_")
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AttributeError {
    pub attribute: &'static str,
    pub value: String,
    pub reason: String,
}

impl fmt::Display for AttributeError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "invalid {} '{}': {}", self.attribute, self.value, self.reason)
    }
}

impl std::error::Error for AttributeError {}

impl AttributeError {
    fn new(attribute: &'static str, value: &str, reason: impl Into<String>) -> Self {
        Self {
            attribute,
            value: value.to_string(),
            reason: reason.into(),
        }
    }
}

/// Implements Display/FromStr/serde for an attribute enum from a
/// canonical token per variant plus accepted aliases.
macro_rules! token_enum {
    ($name:ident, $attr:literal, { $($variant:ident => $token:literal $(| $alias:literal)*),+ $(,)? }) => {
        impl $name {
            pub fn as_token(self) -> &'static str {
                match self {
                    $($name::$variant => $token),+
                }
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                f.write_str(self.as_token())
            }
        }

        impl FromStr for $name {
            type Err = AttributeError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match normalize_token(s).as_str() {
                    $($token $(| $alias)* => Ok($name::$variant),)+
                    "" => Err(AttributeError::new($attr, s, "value is empty")),
                    _ => Err(AttributeError::new($attr, s, "not a recognised value")),
                }
            }
        }

        impl Serialize for $name {
            fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
                serializer.serialize_str(self.as_token())
            }
        }

        impl<'de> Deserialize<'de> for $name {
            fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
                let raw = String::deserialize(deserializer)?;
                raw.parse().map_err(serde::de::Error::custom)
            }
        }
    };
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Gender {
    Male,
    Female,
    NonBinary,
}

token_enum!(Gender, "gender", {
    Male => "male" | "m" | "man",
    Female => "female" | "f" | "woman",
    NonBinary => "non_binary" | "nonbinary" | "other",
});

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum EducationLevel {
    LessThanHighSchool,
    HighSchool,
    SomeCollege,
    Associate,
    Bachelor,
    Master,
    Doctorate,
}

token_enum!(EducationLevel, "education level", {
    LessThanHighSchool => "less_than_high_school" | "no_high_school" | "none",
    HighSchool => "high_school" | "highschool" | "ged",
    SomeCollege => "some_college",
    Associate => "associate" | "associates",
    Bachelor => "bachelor" | "bachelors" | "ba" | "bs" | "college",
    Master => "master" | "masters" | "ma" | "ms" | "mba",
    Doctorate => "doctorate" | "phd" | "doctoral",
});

impl EducationLevel {
    /// Phrase used inside prompts, e.g. "a bachelor's degree".
    pub fn describe(self) -> &'static str {
        match self {
            EducationLevel::LessThanHighSchool => "less than a high school education",
            EducationLevel::HighSchool => "a high school education",
            EducationLevel::SomeCollege => "some college education",
            EducationLevel::Associate => "an associate degree",
            EducationLevel::Bachelor => "a bachelor's degree",
            EducationLevel::Master => "a master's degree",
            EducationLevel::Doctorate => "a doctorate",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum MaritalStatus {
    Single,
    Married,
    Divorced,
    Separated,
    Widowed,
}

token_enum!(MaritalStatus, "marital status", {
    Single => "single" | "never_married",
    Married => "married",
    Divorced => "divorced",
    Separated => "separated",
    Widowed => "widowed" | "widow" | "widower",
});

/// Household income bracket on a 1 (lowest) to 10 (highest) scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
#[serde(transparent)]
pub struct IncomeLevel(u8);

impl IncomeLevel {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;

    pub fn new(level: u8) -> Result<Self, AttributeError> {
        if (Self::MIN..=Self::MAX).contains(&level) {
            Ok(Self(level))
        } else {
            Err(AttributeError::new(
                "income level",
                &level.to_string(),
                format!("must be between {} and {}", Self::MIN, Self::MAX),
            ))
        }
    }

    pub fn value(self) -> u8 {
        self.0
    }
}

impl fmt::Display for IncomeLevel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for IncomeLevel {
    type Err = AttributeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let level: u8 = s
            .trim()
            .parse()
            .map_err(|_| AttributeError::new("income level", s, "not a whole number"))?;
        Self::new(level)
    }
}

impl<'de> Deserialize<'de> for IncomeLevel {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let level = u8::deserialize(deserializer)?;
        IncomeLevel::new(level).map_err(serde::de::Error::custom)
    }
}

pub fn parse_age(raw: &str) -> Result<u32, AttributeError> {
    let age: u32 = raw
        .trim()
        .parse()
        .map_err(|_| AttributeError::new("age", raw, "not a whole number"))?;
    if !(MIN_VOTING_AGE..=MAX_AGE).contains(&age) {
        return Err(AttributeError::new(
            "age",
            raw,
            format!("must be between {} and {}", MIN_VOTING_AGE, MAX_AGE),
        ));
    }
    Ok(age)
}

pub fn parse_occupation(raw: &str) -> Result<String, AttributeError> {
    let occupation = raw.split_whitespace().collect::<Vec<_>>().join(" ");
    if occupation.is_empty() {
        return Err(AttributeError::new("occupation", raw, "value is empty"));
    }
    Ok(occupation)
}

/// One synthetic voter. Column names match the profile CSV layout.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VoterProfile {
    #[serde(rename = "AGE")]
    pub age: u32,
    #[serde(rename = "GENDER")]
    pub gender: Gender,
    #[serde(rename = "STATE")]
    pub state: UsState,
    #[serde(rename = "EDUCATION_LEVEL")]
    pub education: EducationLevel,
    #[serde(rename = "MARITAL_STATUS")]
    pub marital_status: MaritalStatus,
    #[serde(rename = "OCCUPATION_DESCRIPTION")]
    pub occupation: String,
    #[serde(rename = "INCOME_LEVEL")]
    pub income_level: IncomeLevel,
}
