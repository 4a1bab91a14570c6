//! Contribution (OPR) estimation: build the binary alliance-participation
//! system for one event's matches and solve it by minimum-norm least
//! squares. Every call rebuilds index, matrix and vector from scratch;
//! nothing is cached between solves.

use std::collections::HashMap;

use nalgebra::{DMatrix, DVector};

use crate::error::{Error, Result};
use crate::matches::Match;

/// Estimated per-match contribution for every team seen in the input,
/// keyed by TBA team key.
pub type ContributionMap = HashMap<String, f64>;

/// Assigns each team seen in a match list a dense matrix column, in
/// first-appearance order over the shared alliance traversal.
#[derive(Debug, Clone, Default)]
pub struct TeamIndex {
    columns: HashMap<String, usize>,
    teams: Vec<String>,
}

impl TeamIndex {
    pub fn build(matches: &[Match]) -> Self {
        let mut index = TeamIndex::default();
        for m in matches {
            for (_, alliance) in m.alliance_rows() {
                for team in &alliance.team_keys {
                    if !index.columns.contains_key(team) {
                        index.columns.insert(team.clone(), index.teams.len());
                        index.teams.push(team.clone());
                    }
                }
            }
        }
        index
    }

    pub fn len(&self) -> usize {
        self.teams.len()
    }

    pub fn is_empty(&self) -> bool {
        self.teams.is_empty()
    }

    pub fn column(&self, team_key: &str) -> Option<usize> {
        self.columns.get(team_key).copied()
    }

    /// Teams in column order, i.e. `teams()[i]` owns column `i`.
    pub fn teams(&self) -> &[String] {
        &self.teams
    }
}

/// Builds the `2m x n` participation matrix and the length-`2m` target
/// vector for `metric`, one row per alliance per match, rows in the same
/// traversal order the index was built with.
pub fn build_system(
    matches: &[Match],
    index: &TeamIndex,
    metric: &str,
) -> Result<(DMatrix<f64>, DVector<f64>)> {
    let mut matrix = DMatrix::zeros(matches.len() * 2, index.len());
    let mut target = DVector::zeros(matches.len() * 2);

    let mut row = 0usize;
    for m in matches {
        for (color, alliance) in m.alliance_rows() {
            if alliance.team_keys.is_empty() {
                return Err(Error::MalformedEventData {
                    event: event_tag(matches),
                    reason: format!("match {} has an empty {} alliance", m.key, color),
                });
            }
            for team in &alliance.team_keys {
                let Some(col) = index.column(team) else {
                    return Err(Error::MalformedEventData {
                        event: event_tag(matches),
                        reason: format!("team {team} in match {} is not indexed", m.key),
                    });
                };
                matrix[(row, col)] = 1.0;
            }

            // Filtered input only contains played matches; a missing
            // breakdown here means the caller skipped the filter.
            let Some(breakdown) = m.breakdown(color) else {
                return Err(Error::MalformedEventData {
                    event: event_tag(matches),
                    reason: format!("match {} has no score breakdown", m.key),
                });
            };
            let value = breakdown.get(metric).ok_or_else(|| Error::MissingMetric {
                metric: metric.to_string(),
                alliance: color,
                match_key: m.key.clone(),
            })?;
            target[row] = value.as_number().ok_or_else(|| Error::TypeMismatch {
                metric: metric.to_string(),
                match_key: m.key.clone(),
                expected: "number",
                found: value.kind(),
            })?;
            row += 1;
        }
    }

    Ok((matrix, target))
}

/// Least-squares contribution estimate for every team in `matches`, using
/// the default singular-value cutoff.
pub fn solve_contributions(matches: &[Match], metric: &str) -> Result<ContributionMap> {
    solve_contributions_with_cutoff(matches, metric, None)
}

/// Same as [`solve_contributions`] but with an explicit singular-value
/// cutoff for the SVD solve. `None` uses `eps * max(rows, cols) * sigma_max`,
/// the cutoff `numpy.linalg.lstsq(rcond=None)` applies; pass a value only
/// if you need to reproduce a different solver's rank decisions.
pub fn solve_contributions_with_cutoff(
    matches: &[Match],
    metric: &str,
    cutoff: Option<f64>,
) -> Result<ContributionMap> {
    if matches.is_empty() {
        return Err(Error::InsufficientData);
    }
    let index = TeamIndex::build(matches);
    if index.is_empty() {
        return Err(Error::MalformedEventData {
            event: event_tag(matches),
            reason: "no alliance members in any retained match".to_string(),
        });
    }

    let (matrix, target) = build_system(matches, &index, metric)?;
    let (rows, cols) = (matrix.nrows(), matrix.ncols());

    // SVD handles the rank-deficient systems small events produce (teams
    // that always play together are indistinguishable) and returns the
    // minimum-norm solution for them.
    let svd = matrix.svd(true, true);
    let eps = cutoff.unwrap_or_else(|| {
        let sigma_max = svd.singular_values.iter().fold(0.0f64, |acc, &s| acc.max(s));
        f64::EPSILON * rows.max(cols) as f64 * sigma_max
    });
    let solution = svd.solve(&target, eps).map_err(|reason| Error::MalformedEventData {
        event: event_tag(matches),
        reason: reason.to_string(),
    })?;

    let mut contributions = ContributionMap::with_capacity(index.len());
    for (col, team) in index.teams().iter().enumerate() {
        contributions.insert(team.clone(), solution[col]);
    }
    Ok(contributions)
}

fn event_tag(matches: &[Match]) -> String {
    matches
        .first()
        .and_then(|m| m.event_key.clone())
        .unwrap_or_else(|| "unknown".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use serde_json::json;

    fn played_match(key: &str, blue: &[&str], red: &[&str], blue_pts: f64, red_pts: f64) -> Match {
        serde_json::from_value(json!({
            "key": key,
            "comp_level": "qm",
            "event_key": "2019test",
            "alliances": {
                "blue": { "team_keys": blue },
                "red": { "team_keys": red }
            },
            "score_breakdown": {
                "blue": { "totalPoints": blue_pts },
                "red": { "totalPoints": red_pts }
            }
        }))
        .expect("test match should deserialize")
    }

    #[test]
    fn index_assigns_first_seen_columns_blue_first() {
        let matches = vec![
            played_match("m1", &["frc1", "frc2"], &["frc3", "frc4"], 10.0, 14.0),
            played_match("m2", &["frc1", "frc3"], &["frc2", "frc4"], 11.0, 13.0),
        ];
        let index = TeamIndex::build(&matches);
        assert_eq!(index.len(), 4);
        assert_eq!(index.column("frc1"), Some(0));
        assert_eq!(index.column("frc2"), Some(1));
        assert_eq!(index.column("frc3"), Some(2));
        assert_eq!(index.column("frc4"), Some(3));
        assert_eq!(index.teams(), &["frc1", "frc2", "frc3", "frc4"]);
    }

    #[test]
    fn system_shape_is_two_rows_per_match() {
        let matches = vec![
            played_match("m1", &["frc1", "frc2"], &["frc3", "frc4"], 10.0, 14.0),
            played_match("m2", &["frc1", "frc3"], &["frc2", "frc4"], 11.0, 13.0),
            played_match("m3", &["frc1", "frc4"], &["frc2", "frc3"], 12.0, 12.0),
        ];
        let index = TeamIndex::build(&matches);
        let (matrix, target) = build_system(&matches, &index, "totalPoints").unwrap();
        assert_eq!(matrix.nrows(), 6);
        assert_eq!(matrix.ncols(), 4);
        assert_eq!(target.len(), 6);
        // Every indexed team has a non-zero column.
        for col in 0..matrix.ncols() {
            assert!(matrix.column(col).iter().any(|&v| v == 1.0));
        }
    }

    #[test]
    fn rows_and_target_line_up_with_traversal_order() {
        let matches = vec![played_match("m1", &["frc1"], &["frc2"], 7.0, 9.0)];
        let index = TeamIndex::build(&matches);
        let (matrix, target) = build_system(&matches, &index, "totalPoints").unwrap();
        // Row 0 is blue (frc1, score 7), row 1 is red (frc2, score 9).
        assert_eq!(matrix[(0, 0)], 1.0);
        assert_eq!(matrix[(0, 1)], 0.0);
        assert_eq!(matrix[(1, 1)], 1.0);
        assert_eq!(target[0], 7.0);
        assert_eq!(target[1], 9.0);
    }

    #[test]
    fn missing_metric_is_an_error() {
        let matches = vec![played_match("m1", &["frc1"], &["frc2"], 7.0, 9.0)];
        let index = TeamIndex::build(&matches);
        let err = build_system(&matches, &index, "rocketPoints").unwrap_err();
        assert!(matches!(err, Error::MissingMetric { .. }));
    }

    #[test]
    fn categorical_metric_is_a_type_mismatch() {
        let mut m = played_match("m1", &["frc1"], &["frc2"], 7.0, 9.0);
        let breakdown = m.score_breakdown.as_mut().unwrap();
        breakdown
            .blue
            .insert("endgame".to_string(), crate::matches::MetricValue::Text("Climb".into()));
        breakdown
            .red
            .insert("endgame".to_string(), crate::matches::MetricValue::Text("Park".into()));
        let index = TeamIndex::build(std::slice::from_ref(&m));
        let err = build_system(std::slice::from_ref(&m), &index, "endgame").unwrap_err();
        assert!(matches!(err, Error::TypeMismatch { found: "text", .. }));
    }

    #[test]
    fn solver_recovers_exact_contributions() {
        // A=3, B=7, C=5, D=9: four independent equations, four unknowns.
        let matches = vec![
            played_match("m1", &["frcA", "frcB"], &["frcC", "frcD"], 10.0, 14.0),
            played_match("m2", &["frcA", "frcC"], &["frcB", "frcD"], 8.0, 16.0),
        ];
        let oprs = solve_contributions(&matches, "totalPoints").unwrap();
        assert_relative_eq!(oprs["frcA"], 3.0, epsilon = 1e-9);
        assert_relative_eq!(oprs["frcB"], 7.0, epsilon = 1e-9);
        assert_relative_eq!(oprs["frcC"], 5.0, epsilon = 1e-9);
        assert_relative_eq!(oprs["frcD"], 9.0, epsilon = 1e-9);
    }

    #[test]
    fn solver_is_deterministic() {
        let matches = vec![
            played_match("m1", &["frc1", "frc2"], &["frc3", "frc4"], 35.0, 28.0),
            played_match("m2", &["frc1", "frc3"], &["frc2", "frc4"], 31.0, 30.0),
            played_match("m3", &["frc2", "frc3"], &["frc1", "frc4"], 27.0, 40.0),
        ];
        let first = solve_contributions(&matches, "totalPoints").unwrap();
        let second = solve_contributions(&matches, "totalPoints").unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn rank_deficient_event_still_solves() {
        // frc1 and frc2 only ever play together; SVD gives the minimum-norm
        // split of their shared score instead of failing.
        let matches = vec![
            played_match("m1", &["frc1", "frc2"], &["frc3", "frc4"], 20.0, 12.0),
            played_match("m2", &["frc1", "frc2"], &["frc4", "frc3"], 20.0, 12.0),
        ];
        let oprs = solve_contributions(&matches, "totalPoints").unwrap();
        assert_relative_eq!(oprs["frc1"] + oprs["frc2"], 20.0, epsilon = 1e-9);
        assert_relative_eq!(oprs["frc1"], oprs["frc2"], epsilon = 1e-9);
    }

    #[test]
    fn zero_matches_is_insufficient_data() {
        let err = solve_contributions(&[], "totalPoints").unwrap_err();
        assert!(matches!(err, Error::InsufficientData));
    }

    #[test]
    fn empty_alliance_is_malformed() {
        let matches = vec![played_match("m1", &[], &["frc2"], 0.0, 9.0)];
        let err = solve_contributions(&matches, "totalPoints").unwrap_err();
        assert!(matches!(err, Error::MalformedEventData { .. }));
    }
}
