//! Descriptive statistics over a team's per-match metric values: the
//! closed set of scalar calculations plus the position-keyed categorical
//! frequency mode.

use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::matches::Match;

/// The supported scalar calculations. Names arriving from callers go
/// through `FromStr`, which rejects anything outside this set.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Calculation {
    Mean,
    Median,
    Min,
    Max,
    Stdev,
    Count,
}

impl Calculation {
    pub const ALL: [Calculation; 6] = [
        Calculation::Mean,
        Calculation::Median,
        Calculation::Min,
        Calculation::Max,
        Calculation::Stdev,
        Calculation::Count,
    ];

    pub fn name(self) -> &'static str {
        match self {
            Calculation::Mean => "mean",
            Calculation::Median => "med",
            Calculation::Min => "min",
            Calculation::Max => "max",
            Calculation::Stdev => "stdev",
            Calculation::Count => "count",
        }
    }
}

impl fmt::Display for Calculation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for Calculation {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s {
            "mean" => Ok(Calculation::Mean),
            "med" | "median" => Ok(Calculation::Median),
            "min" => Ok(Calculation::Min),
            "max" => Ok(Calculation::Max),
            "stdev" => Ok(Calculation::Stdev),
            "count" => Ok(Calculation::Count),
            other => Err(Error::UnknownCalculation(other.to_string())),
        }
    }
}

/// Applies one calculation to a value list. `stdev` is the sample standard
/// deviation and needs at least two values; the other reducers (except
/// `count`) need at least one.
pub fn apply_calculation(calc: Calculation, values: &[f64]) -> Result<f64> {
    match calc {
        Calculation::Count => Ok(values.len() as f64),
        Calculation::Stdev => {
            if values.len() < 2 {
                return Err(Error::InsufficientSamples {
                    calculation: "stdev",
                    required: 2,
                    actual: values.len(),
                });
            }
            Ok(sample_stdev(values))
        }
        _ if values.is_empty() => Err(Error::InsufficientData),
        Calculation::Mean => Ok(mean(values)),
        Calculation::Median => Ok(median(values)),
        Calculation::Min => Ok(values.iter().copied().fold(f64::INFINITY, f64::min)),
        Calculation::Max => Ok(values.iter().copied().fold(f64::NEG_INFINITY, f64::max)),
    }
}

/// Runs every requested calculation over one value list, keyed by
/// calculation. Fail-fast: the first calculation that cannot be computed
/// fails the whole request.
pub fn scalar_statistics(
    values: &[f64],
    calculations: &[Calculation],
) -> Result<HashMap<Calculation, f64>> {
    let mut out = HashMap::with_capacity(calculations.len());
    for &calc in calculations {
        out.insert(calc, apply_calculation(calc, values)?);
    }
    Ok(out)
}

/// Collects `metric` from the breakdown of the alliance `team_key` played
/// on, for every filtered match the team appears in. The metric must be
/// numeric in every match.
pub fn metric_values(matches: &[Match], team_key: &str, metric: &str) -> Result<Vec<f64>> {
    let mut values = Vec::new();
    for m in matches {
        let Some(color) = m.alliance_of(team_key) else {
            continue;
        };
        let Some(breakdown) = m.breakdown(color) else {
            continue;
        };
        let value = breakdown.get(metric).ok_or_else(|| Error::MissingMetric {
            metric: metric.to_string(),
            alliance: color,
            match_key: m.key.clone(),
        })?;
        values.push(value.as_number().ok_or_else(|| Error::TypeMismatch {
            metric: metric.to_string(),
            match_key: m.key.clone(),
            expected: "number",
            found: value.kind(),
        })?);
    }
    Ok(values)
}

/// Frequency of `target` among a team's position-keyed categorical values.
/// The real breakdown key is `metric_prefix` plus the team's 1-based
/// station (e.g. `endgameRobot` + `2`). Returns `Ok(None)` when the team
/// has no usable matches, which is distinct from a frequency of zero.
pub fn position_value_frequency(
    matches: &[Match],
    team_key: &str,
    metric_prefix: &str,
    target: &str,
) -> Result<Option<f64>> {
    let mut hits = 0usize;
    let mut total = 0usize;
    for m in matches {
        let Some(color) = m.alliance_of(team_key) else {
            continue;
        };
        let Some(breakdown) = m.breakdown(color) else {
            continue;
        };
        // alliance_of matched, so the position lookup cannot miss.
        let Some(position) = m.robot_position(team_key) else {
            continue;
        };
        let metric = format!("{metric_prefix}{position}");
        let value = breakdown.get(&metric).ok_or_else(|| Error::MissingMetric {
            metric: metric.clone(),
            alliance: color,
            match_key: m.key.clone(),
        })?;
        let text = value.as_text().ok_or_else(|| Error::TypeMismatch {
            metric: metric.clone(),
            match_key: m.key.clone(),
            expected: "text",
            found: value.kind(),
        })?;
        if text == target {
            hits += 1;
        }
        total += 1;
    }
    if total == 0 {
        return Ok(None);
    }
    Ok(Some(round3(hits as f64 / total as f64)))
}

fn mean(values: &[f64]) -> f64 {
    values.iter().sum::<f64>() / values.len() as f64
}

fn median(values: &[f64]) -> f64 {
    let mut sorted = values.to_vec();
    sorted.sort_by(|a, b| a.total_cmp(b));
    let mid = sorted.len() / 2;
    if sorted.len() % 2 == 0 {
        (sorted[mid - 1] + sorted[mid]) / 2.0
    } else {
        sorted[mid]
    }
}

fn sample_stdev(values: &[f64]) -> f64 {
    let m = mean(values);
    let variance =
        values.iter().map(|v| (v - m).powi(2)).sum::<f64>() / (values.len() - 1) as f64;
    variance.sqrt()
}

fn round3(value: f64) -> f64 {
    (value * 1000.0).round() / 1000.0
}
