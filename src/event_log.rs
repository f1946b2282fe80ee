use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::{RatingError, Result};

/// One calendar match. `home_score`/`away_score` are `None` for matches that
/// have not been played yet; those still flow through the ELO replay so the
/// remaining schedule can be ranked.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Match {
    pub id: String,
    pub home_team: String,
    pub away_team: String,
    pub date: Option<NaiveDate>,
    #[serde(default)]
    pub home_score: Option<u32>,
    #[serde(default)]
    pub away_score: Option<u32>,
}

impl Match {
    pub fn is_played(&self) -> bool {
        self.home_score.is_some() && self.away_score.is_some()
    }

    pub fn validate(&self) -> Result<()> {
        if self.home_team.trim().is_empty() {
            return Err(RatingError::DataIntegrity {
                match_id: self.id.clone(),
                field: "home team",
            });
        }
        if self.away_team.trim().is_empty() {
            return Err(RatingError::DataIntegrity {
                match_id: self.id.clone(),
                field: "away team",
            });
        }
        if self.date.is_none() {
            return Err(RatingError::DataIntegrity {
                match_id: self.id.clone(),
                field: "date",
            });
        }
        Ok(())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum EventKind {
    Goal,
    Penalty,
    #[serde(rename = "Own Goal")]
    OwnGoal,
    #[serde(rename = "Substitute In")]
    SubstituteIn,
    #[serde(rename = "Substitute Out")]
    SubstituteOut,
    #[serde(rename = "Yellow Card")]
    YellowCard,
    #[serde(rename = "Yellow-Red Card", alias = "Yellow Card - Red Card")]
    SecondYellow,
    #[serde(rename = "Red Card")]
    RedCard,
}

impl EventKind {
    /// Goal, penalty or own goal: changes the score.
    pub fn is_goal(self) -> bool {
        matches!(self, Self::Goal | Self::Penalty | Self::OwnGoal)
    }

    pub fn is_substitution(self) -> bool {
        matches!(self, Self::SubstituteIn | Self::SubstituteOut)
    }

    /// Red or second yellow: removes the player from the field.
    pub fn is_dismissal(self) -> bool {
        matches!(self, Self::RedCard | Self::SecondYellow)
    }

    /// Events that force a new lineup segment. Plain yellows do not.
    pub fn is_boundary(self) -> bool {
        self.is_goal() || self.is_substitution() || self.is_dismissal()
    }
}

/// One minute-stamped match event as scraped. The raw minute keeps stoppage
/// notation ("45+2"); [`MatchEvent::normalized_minute`] resolves it.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MatchEvent {
    pub match_id: String,
    pub minute: String,
    #[serde(rename = "type")]
    pub kind: EventKind,
    pub team: String,
    pub player: String,
}

impl MatchEvent {
    pub fn normalized_minute(&self) -> u32 {
        normalize_minute(&self.minute)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LineupEntry {
    pub match_id: String,
    pub team: String,
    pub player: String,
    #[serde(rename = "startingFlag")]
    pub starting: bool,
    pub minutes_played: u32,
}

/// Normalize a raw minute string to an integer in [0, 90].
///
/// Stoppage notation adds the extra time: "45+2" -> 47, "90+6" -> 90 after
/// clamping. Unparsable input falls back to 0 rather than dropping the
/// event.
pub fn normalize_minute(raw: &str) -> u32 {
    let trimmed = raw.trim().trim_end_matches('\'');
    let mut total: u32 = 0;
    let mut any = false;
    for part in trimmed.split('+') {
        match part.trim().parse::<u32>() {
            Ok(v) => {
                // Absurdly large stamps saturate and land on the 90 clamp.
                total = total.saturating_add(v);
                any = true;
            }
            Err(_) => return 0,
        }
    }
    if !any {
        return 0;
    }
    total.min(90)
}
