use anyhow::Result;

use crate::matches::Match;

/// The seam between the analytics core and whatever supplies match data.
/// The core never cares how records are fetched, cached or authenticated;
/// implementations fail with whatever context fits them, surfaced to core
/// callers as `Error::Provider`.
pub trait MatchProvider {
    /// All matches of one event.
    fn event_matches(&self, event_key: &str) -> Result<Vec<Match>>;

    /// All matches a team played in one year, across events.
    fn team_matches(&self, team_key: &str, year: u16) -> Result<Vec<Match>>;

    /// Keys of the events a team attended in one year.
    fn team_event_keys(&self, team_key: &str, year: u16) -> Result<Vec<String>>;

    /// Keys of the teams registered at one event.
    fn event_team_keys(&self, event_key: &str) -> Result<Vec<String>>;
}
