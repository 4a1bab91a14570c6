//! Contribution estimation (OPR) and descriptive match statistics over
//! The Blue Alliance APIv3 match data.
//!
//! The core pipeline: filter a match list down to played (optionally
//! qualification-only) matches, index every team seen, build the binary
//! alliance-participation matrix and score vector for one metric, and
//! solve the least-squares system to attribute alliance scores back to
//! individual teams. On top of that sit descriptive statistics over a
//! team's per-match metric values and a multi-event OPR aggregator.

pub mod analysis;
pub mod error;
pub mod matches;
pub mod opr;
pub mod provider;
pub mod stats;
pub mod tba;

pub use analysis::{TbaAnalytics, event_opr_statistic, event_opr_values};
pub use error::{Error, Result};
pub use matches::{AllianceColor, CompLevel, Match, MetricValue, filter_matches};
pub use opr::{ContributionMap, TeamIndex, solve_contributions, solve_contributions_with_cutoff};
pub use provider::MatchProvider;
pub use stats::{Calculation, metric_values, position_value_frequency, scalar_statistics};
pub use tba::TbaClient;
