use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

/// The 50 states plus the District of Columbia, ordered by name.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum UsState {
    Alabama,
    Alaska,
    Arizona,
    Arkansas,
    California,
    Colorado,
    Connecticut,
    Delaware,
    DistrictOfColumbia,
    Florida,
    Georgia,
    Hawaii,
    Idaho,
    Illinois,
    Indiana,
    Iowa,
    Kansas,
    Kentucky,
    Louisiana,
    Maine,
    Maryland,
    Massachusetts,
    Michigan,
    Minnesota,
    Mississippi,
    Missouri,
    Montana,
    Nebraska,
    Nevada,
    NewHampshire,
    NewJersey,
    NewMexico,
    NewYork,
    NorthCarolina,
    NorthDakota,
    Ohio,
    Oklahoma,
    Oregon,
    Pennsylvania,
    RhodeIsland,
    SouthCarolina,
    SouthDakota,
    Tennessee,
    Texas,
    Utah,
    Vermont,
    Virginia,
    Washington,
    WestVirginia,
    Wisconsin,
    Wyoming,
}

use UsState::*;

const STATE_TABLE: [(UsState, &str, &str); 51] = [
    (Alabama, "Alabama", "AL"),
    (Alaska, "Alaska", "AK"),
    (Arizona, "Arizona", "AZ"),
    (Arkansas, "Arkansas", "AR"),
    (California, "California", "CA"),
    (Colorado, "Colorado", "CO"),
    (Connecticut, "Connecticut", "CT"),
    (Delaware, "Delaware", "DE"),
    (DistrictOfColumbia, "District of Columbia", "DC"),
    (Florida, "Florida", "FL"),
    (Georgia, "Georgia", "GA"),
    (Hawaii, "Hawaii", "HI"),
    (Idaho, "Idaho", "ID"),
    (Illinois, "Illinois", "IL"),
    (Indiana, "Indiana", "IN"),
    (Iowa, "Iowa", "IA"),
    (Kansas, "Kansas", "KS"),
    (Kentucky, "Kentucky", "KY"),
    (Louisiana, "Louisiana", "LA"),
    (Maine, "Maine", "ME"),
    (Maryland, "Maryland", "MD"),
    (Massachusetts, "Massachusetts", "MA"),
    (Michigan, "Michigan", "MI"),
    (Minnesota, "Minnesota", "MN"),
    (Mississippi, "Mississippi", "MS"),
    (Missouri, "Missouri", "MO"),
    (Montana, "Montana", "MT"),
    (Nebraska, "Nebraska", "NE"),
    (Nevada, "Nevada", "NV"),
    (NewHampshire, "New Hampshire", "NH"),
    (NewJersey, "New Jersey", "NJ"),
    (NewMexico, "New Mexico", "NM"),
    (NewYork, "New York", "NY"),
    (NorthCarolina, "North Carolina", "NC"),
    (NorthDakota, "North Dakota", "ND"),
    (Ohio, "Ohio", "OH"),
    (Oklahoma, "Oklahoma", "OK"),
    (Oregon, "Oregon", "OR"),
    (Pennsylvania, "Pennsylvania", "PA"),
    (RhodeIsland, "Rhode Island", "RI"),
    (SouthCarolina, "South Carolina", "SC"),
    (SouthDakota, "South Dakota", "SD"),
    (Tennessee, "Tennessee", "TN"),
    (Texas, "Texas", "TX"),
    (Utah, "Utah", "UT"),
    (Vermont, "Vermont", "VT"),
    (Virginia, "Virginia", "VA"),
    (Washington, "Washington", "WA"),
    (WestVirginia, "West Virginia", "WV"),
    (Wisconsin, "Wisconsin", "WI"),
    (Wyoming, "Wyoming", "WY"),
];

impl UsState {
    pub fn all() -> impl Iterator<Item = UsState> {
        STATE_TABLE.iter().map(|(state, _, _)| *state)
    }

    fn entry(self) -> &'static (UsState, &'static str, &'static str) {
        // Table order matches declaration order.
        &STATE_TABLE[self as usize]
    }

    pub fn name(self) -> &'static str {
        self.entry().1
    }

    /// Two-letter USPS code.
    pub fn code(self) -> &'static str {
        self.entry().2
    }
}

impl fmt::Display for UsState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnknownStateError(pub String);

impl fmt::Display for UnknownStateError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "unknown U.S. state '{}'", self.0)
    }
}

impl std::error::Error for UnknownStateError {}

impl FromStr for UsState {
    type Err = UnknownStateError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let normalized: String = s
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ")
            .replace('.', "")
            .to_ascii_lowercase();

        if normalized.is_empty() {
            return Err(UnknownStateError(s.to_string()));
        }

        if matches!(normalized.as_str(), "washington dc" | "dc" | "washington d c") {
            return Ok(DistrictOfColumbia);
        }

        STATE_TABLE
            .iter()
            .find(|(_, name, code)| {
                name.to_ascii_lowercase() == normalized || code.eq_ignore_ascii_case(&normalized)
            })
            .map(|(state, _, _)| *state)
            .ok_or_else(|| UnknownStateError(s.to_string()))
    }
}

impl Serialize for UsState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.name())
    }
}

impl<'de> Deserialize<'de> for UsState {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}
