use thiserror::Error;

use crate::matches::AllianceColor;

pub type Result<T> = std::result::Result<T, Error>;

#[derive(Debug, Error)]
pub enum Error {
    /// No played (and, when requested, qualification) matches to work with.
    #[error("no usable matches for this request")]
    InsufficientData,

    #[error("`{calculation}` needs at least {required} values, got {actual}")]
    InsufficientSamples {
        calculation: &'static str,
        required: usize,
        actual: usize,
    },

    #[error("metric `{metric}` missing from the {alliance} breakdown of match {match_key}")]
    MissingMetric {
        metric: String,
        alliance: AllianceColor,
        match_key: String,
    },

    #[error("metric `{metric}` in match {match_key} is {found}, expected {expected}")]
    TypeMismatch {
        metric: String,
        match_key: String,
        expected: &'static str,
        found: &'static str,
    },

    #[error("team {team} has no contribution entry")]
    KeyNotFound { team: String },

    #[error("event {event} has inconsistent match data: {reason}")]
    MalformedEventData { event: String, reason: String },

    #[error("unknown calculation `{0}`; expected mean, med, min, max, stdev or count")]
    UnknownCalculation(String),

    /// Failure in the match data provider (network, auth, parse).
    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl Error {
    /// The subset the multi-event aggregator treats as a per-event skip
    /// rather than a failure of the whole request: the event's data is
    /// unusable (malformed or empty) or the team simply never played there.
    pub fn is_event_skippable(&self) -> bool {
        matches!(
            self,
            Error::MalformedEventData { .. } | Error::InsufficientData | Error::KeyNotFound { .. }
        )
    }
}
