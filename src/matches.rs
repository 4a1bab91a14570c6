use std::collections::HashMap;
use std::fmt;

use serde::Deserialize;

/// The two alliances of a match, in the order shared by participant
/// indexing and matrix row emission. Changing this order is safe as long
/// as both consumers keep going through `Match::alliance_rows`.
pub const ALLIANCE_ORDER: [AllianceColor; 2] = [AllianceColor::Blue, AllianceColor::Red];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AllianceColor {
    Blue,
    Red,
}

impl fmt::Display for AllianceColor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AllianceColor::Blue => f.write_str("blue"),
            AllianceColor::Red => f.write_str("red"),
        }
    }
}

/// TBA competition levels. Only qualification matches count toward
/// seeding; everything else (ef/qf/sf/f, offseason oddities) is lumped
/// together since the filter only ever asks "qualification or not".
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
pub enum CompLevel {
    #[serde(rename = "qm")]
    Qualification,
    #[serde(other)]
    Other,
}

/// One score-breakdown value. TBA mixes numbers, booleans and strings in
/// the same map, with the occasional nested object in older seasons.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum MetricValue {
    Number(f64),
    Flag(bool),
    Text(String),
    Other(serde_json::Value),
}

impl MetricValue {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MetricValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            MetricValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn kind(&self) -> &'static str {
        match self {
            MetricValue::Number(_) => "number",
            MetricValue::Flag(_) => "boolean",
            MetricValue::Text(_) => "text",
            MetricValue::Other(_) => "other",
        }
    }
}

pub type Breakdown = HashMap<String, MetricValue>;

#[derive(Debug, Clone, Default, Deserialize)]
pub struct Alliance {
    #[serde(default)]
    pub team_keys: Vec<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Alliances {
    pub blue: Alliance,
    pub red: Alliance,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ScoreBreakdown {
    pub blue: Breakdown,
    pub red: Breakdown,
}

#[derive(Debug, Clone, Deserialize)]
pub struct Match {
    pub key: String,
    pub comp_level: CompLevel,
    #[serde(default)]
    pub event_key: Option<String>,
    pub alliances: Alliances,
    // Absent or null until the match has actually been played.
    #[serde(default)]
    pub score_breakdown: Option<ScoreBreakdown>,
}

impl Match {
    pub fn is_played(&self) -> bool {
        self.score_breakdown.is_some()
    }

    pub fn alliance(&self, color: AllianceColor) -> &Alliance {
        match color {
            AllianceColor::Blue => &self.alliances.blue,
            AllianceColor::Red => &self.alliances.red,
        }
    }

    pub fn breakdown(&self, color: AllianceColor) -> Option<&Breakdown> {
        let breakdown = self.score_breakdown.as_ref()?;
        Some(match color {
            AllianceColor::Blue => &breakdown.blue,
            AllianceColor::Red => &breakdown.red,
        })
    }

    /// Both alliances in the one canonical traversal order. Participant
    /// indexing and matrix row emission must both go through here so that
    /// columns and rows can never disagree about ordering.
    pub fn alliance_rows(&self) -> impl Iterator<Item = (AllianceColor, &Alliance)> {
        ALLIANCE_ORDER.iter().map(|color| (*color, self.alliance(*color)))
    }

    /// Which alliance a team played on in this match, if any.
    pub fn alliance_of(&self, team_key: &str) -> Option<AllianceColor> {
        ALLIANCE_ORDER
            .iter()
            .copied()
            .find(|color| self.alliance(*color).team_keys.iter().any(|t| t == team_key))
    }

    /// The 1-based station of a team within its alliance, the suffix TBA
    /// uses for position-keyed breakdown fields (e.g. `endgameRobot2`).
    pub fn robot_position(&self, team_key: &str) -> Option<usize> {
        let color = self.alliance_of(team_key)?;
        self.alliance(color)
            .team_keys
            .iter()
            .position(|t| t == team_key)
            .map(|i| i + 1)
    }
}

/// Keeps only played matches, and only qualification matches when asked.
/// Order-preserving; providers are trusted not to repeat match keys.
pub fn filter_matches(matches: Vec<Match>, qualification_only: bool) -> Vec<Match> {
    matches
        .into_iter()
        .filter(Match::is_played)
        .filter(|m| !qualification_only || m.comp_level == CompLevel::Qualification)
        .collect()
}
