//! Multi-event OPR aggregation and the high-level analytics facade.

use std::collections::HashMap;

use log::warn;
use rayon::prelude::*;

use crate::error::{Error, Result};
use crate::matches::{Match, filter_matches};
use crate::opr::{ContributionMap, solve_contributions};
use crate::provider::MatchProvider;
use crate::stats::{Calculation, metric_values, position_value_frequency, scalar_statistics};

/// One team's OPR at every event they attended in `year`, as
/// `(event_key, contribution)` pairs in the provider's event order.
///
/// Events are solved independently (in parallel) and an event is skipped
/// with a warning when its data is malformed, it has no usable matches, or
/// the team has no contribution entry there. Anything else fails the whole
/// request.
pub fn event_opr_values<P: MatchProvider + Sync>(
    provider: &P,
    team_key: &str,
    year: u16,
    metric: &str,
    qualification_only: bool,
) -> Result<Vec<(String, f64)>> {
    let events = provider.team_event_keys(team_key, year)?;

    let outcomes: Vec<(String, Result<f64>)> = events
        .into_par_iter()
        .map(|event| {
            let outcome = event_contribution(provider, &event, team_key, metric, qualification_only);
            (event, outcome)
        })
        .collect();

    let mut values = Vec::with_capacity(outcomes.len());
    for (event, outcome) in outcomes {
        match outcome {
            Ok(value) => values.push((event, value)),
            Err(err) if err.is_event_skippable() => {
                warn!("skipping event {event} for {team_key}: {err}");
            }
            Err(err) => return Err(err),
        }
    }
    Ok(values)
}

/// Scalar statistics over a team's per-event OPRs. `InsufficientData` if
/// no event yields a usable contribution.
pub fn event_opr_statistic<P: MatchProvider + Sync>(
    provider: &P,
    team_key: &str,
    year: u16,
    metric: &str,
    calculations: &[Calculation],
    qualification_only: bool,
) -> Result<HashMap<Calculation, f64>> {
    let values = event_opr_values(provider, team_key, year, metric, qualification_only)?;
    if values.is_empty() {
        return Err(Error::InsufficientData);
    }
    let oprs: Vec<f64> = values.into_iter().map(|(_, v)| v).collect();
    scalar_statistics(&oprs, calculations)
}

fn event_contribution<P: MatchProvider>(
    provider: &P,
    event_key: &str,
    team_key: &str,
    metric: &str,
    qualification_only: bool,
) -> Result<f64> {
    let matches = filter_matches(provider.event_matches(event_key)?, qualification_only);
    if matches.is_empty() {
        return Err(Error::InsufficientData);
    }
    let contributions = solve_contributions(&matches, metric)?;
    contributions
        .get(team_key)
        .copied()
        .ok_or_else(|| Error::KeyNotFound { team: team_key.to_string() })
}

/// High-level entry point over a match provider for one season, mirroring
/// the operations a scouting workflow actually asks for.
pub struct TbaAnalytics<P> {
    provider: P,
    year: u16,
}

impl<P: MatchProvider + Sync> TbaAnalytics<P> {
    pub fn new(provider: P, year: u16) -> Self {
        Self { provider, year }
    }

    pub fn provider(&self) -> &P {
        &self.provider
    }

    /// Scalar statistics for one numeric breakdown field over a team's
    /// matches, optionally restricted to a single event.
    pub fn team_field_statistics(
        &self,
        team_key: &str,
        field: &str,
        calculations: &[Calculation],
        qualification_only: bool,
        event_scope: Option<&str>,
    ) -> Result<HashMap<Calculation, f64>> {
        let matches = self.scoped_matches(team_key, qualification_only, event_scope)?;
        let values = metric_values(&matches, team_key, field)?;
        if values.is_empty() {
            return Err(Error::InsufficientData);
        }
        scalar_statistics(&values, calculations)
    }

    /// Frequency of `target` among a team's position-keyed categorical
    /// values (e.g. `endgameRobot` + station). `Ok(None)` when the team
    /// has no usable matches.
    pub fn team_position_frequency(
        &self,
        team_key: &str,
        field_prefix: &str,
        target: &str,
        qualification_only: bool,
        event_scope: Option<&str>,
    ) -> Result<Option<f64>> {
        let matches = self.scoped_matches(team_key, qualification_only, event_scope)?;
        position_value_frequency(&matches, team_key, field_prefix, target)
    }

    /// Statistics over the team's OPR at every event attended this year.
    pub fn team_opr_statistic(
        &self,
        team_key: &str,
        field: &str,
        calculations: &[Calculation],
        qualification_only: bool,
    ) -> Result<HashMap<Calculation, f64>> {
        event_opr_statistic(
            &self.provider,
            team_key,
            self.year,
            field,
            calculations,
            qualification_only,
        )
    }

    /// The full contribution map for one event.
    pub fn event_oprs(
        &self,
        event_key: &str,
        field: &str,
        qualification_only: bool,
    ) -> Result<ContributionMap> {
        let matches = filter_matches(self.provider.event_matches(event_key)?, qualification_only);
        if matches.is_empty() {
            return Err(Error::InsufficientData);
        }
        solve_contributions(&matches, field)
    }

    /// Scalar statistics of one field for every team at an event, keyed
    /// calculation -> team -> value. Teams without usable values for the
    /// field are skipped with a warning; a wrong field stays fatal.
    pub fn event_field_statistics(
        &self,
        event_key: &str,
        field: &str,
        calculations: &[Calculation],
        qualification_only: bool,
    ) -> Result<HashMap<Calculation, HashMap<String, f64>>> {
        let teams = self.provider.event_team_keys(event_key)?;
        let matches = filter_matches(self.provider.event_matches(event_key)?, qualification_only);

        let mut out: HashMap<Calculation, HashMap<String, f64>> = HashMap::new();
        for team_key in teams {
            let values = metric_values(&matches, &team_key, field)?;
            match scalar_statistics(&values, calculations) {
                Ok(stats) => {
                    for (calc, value) in stats {
                        out.entry(calc).or_default().insert(team_key.clone(), value);
                    }
                }
                Err(err @ (Error::InsufficientData | Error::InsufficientSamples { .. })) => {
                    warn!("skipping team {team_key} at {event_key}: {err}");
                }
                Err(err) => return Err(err),
            }
        }
        Ok(out)
    }

    fn scoped_matches(
        &self,
        team_key: &str,
        qualification_only: bool,
        event_scope: Option<&str>,
    ) -> Result<Vec<Match>> {
        let raw = match event_scope {
            Some(event_key) => self.provider.event_matches(event_key)?,
            None => self.provider.team_matches(team_key, self.year)?,
        };
        let mut matches = filter_matches(raw, qualification_only);
        matches.retain(|m| m.alliance_of(team_key).is_some());
        Ok(matches)
    }
}
