use crate::domain::profile::VoterProfile;
use serde::{Deserialize, Serialize};

/// The hypothetical ballot every simulated voter is shown.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct BallotTemplate {
    pub election_year: u16,
    pub democratic_ticket: String,
    pub republican_ticket: String,
}

impl Default for BallotTemplate {
    fn default() -> Self {
        Self {
            election_year: 2024,
            democratic_ticket: "Kamala D. Harris / Tim Walz".to_string(),
            republican_ticket: "Donald J. Trump / J.D. Vance".to_string(),
        }
    }
}

fn indefinite_article(noun: &str) -> &'static str {
    match noun.chars().next().map(|c| c.to_ascii_lowercase()) {
        Some('a' | 'e' | 'i' | 'o' | 'u') => "an",
        _ => "a",
    }
}

fn describe_gender(profile: &VoterProfile) -> &'static str {
    use crate::domain::profile::Gender;
    match profile.gender {
        Gender::Male => "male",
        Gender::Female => "female",
        Gender::NonBinary => "non-binary",
    }
}

impl BallotTemplate {
    /// Renders the prompt for one profile. `state_leaning` is the political
    /// block of the profile's state when historical data knows it.
    pub fn render(&self, profile: &VoterProfile, state_leaning: Option<&str>) -> String {
        let leaning = state_leaning.unwrap_or("unknown");
        let occupation = profile.occupation.as_str();

        format!(
            "You are a {age}-year-old {gender} voter living in {state}. \
             The political leaning of your state is: {leaning}.\n\
             You have {education}. You are {marital} and work as {article} {occupation}.\n\
             Your household income is {income} on a scale of 1 to 10.\n\
             \n\
             Please cast your vote in the {year} U.S. presidential election:\n\
             1. {dem_ticket} (Democrat)\n\
             2. {rep_ticket} (Republican)\n\
             \n\
             Respond with a single word: Democrat or Republican.",
            age = profile.age,
            gender = describe_gender(profile),
            state = profile.state,
            leaning = leaning,
            education = profile.education.describe(),
            marital = profile.marital_status.as_token(),
            article = indefinite_article(occupation),
            occupation = occupation,
            income = profile.income_level,
            year = self.election_year,
            dem_ticket = self.democratic_ticket,
            rep_ticket = self.republican_ticket,
        )
    }
}
