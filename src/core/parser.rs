//! Turns free-form model replies into a [`Party`].
//!
//! Every string-matching heuristic lives here. A reply counts as a vote only
//! when it names exactly one party, either by label ("Democrat",
//! "republicans", "Democratic") or by ballot position ("1" / "2").

use crate::domain::model::Party;
use crate::utils::error::{ParseFailure, PredictionParseError};
use regex::Regex;
use std::sync::OnceLock;

fn democrat_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\bdemocra(?:t|ts|tic)\b").expect("democrat pattern is valid")
    })
}

fn republican_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| {
        Regex::new(r"(?i)\brepublicans?\b").expect("republican pattern is valid")
    })
}

fn ballot_position(reply: &str) -> Option<Party> {
    let stripped = reply.trim_matches(|c: char| !c.is_ascii_alphanumeric());
    match stripped {
        "1" => Some(Party::Democrat),
        "2" => Some(Party::Republican),
        _ => None,
    }
}

pub fn try_parse_vote(reply: &str) -> Result<Party, PredictionParseError> {
    let failure = |reason| PredictionParseError {
        response: reply.to_string(),
        reason,
    };

    let trimmed = reply.trim();
    if trimmed.is_empty() {
        return Err(failure(ParseFailure::Empty));
    }

    if let Some(party) = ballot_position(trimmed) {
        return Ok(party);
    }

    match (
        democrat_pattern().is_match(trimmed),
        republican_pattern().is_match(trimmed),
    ) {
        (true, false) => Ok(Party::Democrat),
        (false, true) => Ok(Party::Republican),
        (true, true) => Err(failure(ParseFailure::Ambiguous)),
        (false, false) => Err(failure(ParseFailure::NoPartyLabel)),
    }
}
