use std::collections::BTreeMap;

use crate::elo::INITIAL_ELO;
use crate::error::{RatingError, Result};
use crate::segments::Segment;

// Fallback when nothing at all has been observed: midpoint of 3 and 0.
const DEFAULT_EXPECTED_POINTS: f64 = 1.5;

const MINUTE_BUCKET: u32 = 15;
const GOAL_DIFF_CLAMP: i32 = 3;
const MAN_ADV_CLAMP: i32 = 2;

#[derive(Debug, Clone, Copy)]
pub struct ExpectedPointsConfig {
    /// Empirical Bayes strength: observations needed before a state pulls
    /// meaningfully away from the global mean.
    pub smooth_k: f64,
    /// Expected-points correction per 100 ELO of opponent strength above
    /// the league mean.
    pub opponent_elo_weight: f64,
}

impl Default for ExpectedPointsConfig {
    fn default() -> Self {
        Self {
            smooth_k: 20.0,
            opponent_elo_weight: 0.04,
        }
    }
}

impl ExpectedPointsConfig {
    pub fn validate(&self) -> Result<()> {
        if !self.smooth_k.is_finite() || self.smooth_k < 0.0 {
            return Err(RatingError::Configuration(format!(
                "smoothing k must be finite and non-negative, got {}",
                self.smooth_k
            )));
        }
        if !self.opponent_elo_weight.is_finite() {
            return Err(RatingError::Configuration(format!(
                "opponent elo weight must be finite, got {}",
                self.opponent_elo_weight
            )));
        }
        Ok(())
    }
}

/// Smoothed lookup from a discretized game state to the expected final
/// points of the side in that state, with an ELO-based opponent correction.
///
/// State key: (15-minute bucket of the current minute, goal diff clamped to
/// [-3, 3], man advantage clamped to [-2, 2]). Extreme states pool into the
/// clamp edges. Every segment start is recorded from both perspectives.
#[derive(Debug, Clone)]
pub struct ExpectedPointsModel {
    lookup: BTreeMap<(u32, i32, i32), f64>,
    global_mean: f64,
    elo: BTreeMap<String, f64>,
    league_mean_elo: f64,
    opponent_elo_weight: f64,
}

impl ExpectedPointsModel {
    /// Fit from segments plus the final ELO table. Per-match outcomes
    /// (3/1/0) are derived from the aggregate segment goal totals, so the
    /// model stays consistent with whatever the segment builder saw.
    pub fn fit(
        segments: &[Segment],
        elo: &BTreeMap<String, f64>,
        cfg: &ExpectedPointsConfig,
    ) -> Result<Self> {
        cfg.validate()?;

        let mut match_goals: BTreeMap<&str, (u32, u32)> = BTreeMap::new();
        for seg in segments {
            let entry = match_goals.entry(&seg.match_id).or_insert((0, 0));
            entry.0 += seg.gf;
            entry.1 += seg.ga;
        }
        let match_points: BTreeMap<&str, (f64, f64)> = match_goals
            .into_iter()
            .map(|(id, (gf, ga))| {
                let pts = if gf > ga {
                    (3.0, 0.0)
                } else if gf == ga {
                    (1.0, 1.0)
                } else {
                    (0.0, 3.0)
                };
                (id, pts)
            })
            .collect();

        let mut stats: BTreeMap<(u32, i32, i32), (f64, u32)> = BTreeMap::new();
        for seg in segments {
            let Some(&(ph, pa)) = match_points.get(seg.match_id.as_str()) else {
                continue;
            };
            let key = state_key(seg.t_start, seg.gd_start, seg.man_start);
            let mirrored = (key.0, -key.1, -key.2);

            let home = stats.entry(key).or_insert((0.0, 0));
            home.0 += ph;
            home.1 += 1;
            let away = stats.entry(mirrored).or_insert((0.0, 0));
            away.0 += pa;
            away.1 += 1;
        }

        let total_sum: f64 = stats.values().map(|(s, _)| s).sum();
        let total_count: u32 = stats.values().map(|(_, c)| c).sum();
        let global_mean = if total_count > 0 {
            total_sum / total_count as f64
        } else {
            DEFAULT_EXPECTED_POINTS
        };

        let lookup = stats
            .into_iter()
            .filter(|(_, (_, c))| *c > 0)
            .map(|(key, (sum, count))| {
                let shrunk = (sum + cfg.smooth_k * global_mean) / (count as f64 + cfg.smooth_k);
                (key, shrunk)
            })
            .collect();

        let league_mean_elo = if elo.is_empty() {
            INITIAL_ELO
        } else {
            elo.values().sum::<f64>() / elo.len() as f64
        };

        Ok(Self {
            lookup,
            global_mean,
            elo: elo.clone(),
            league_mean_elo,
            opponent_elo_weight: cfg.opponent_elo_weight,
        })
    }

    pub fn global_mean(&self) -> f64 {
        self.global_mean
    }

    /// Smoothed state value without opponent correction; unseen states fall
    /// back to the global mean.
    pub fn raw(&self, minute: u32, goal_diff: i32, man_advantage: i32) -> f64 {
        let key = state_key(minute, goal_diff, man_advantage);
        self.lookup.get(&key).copied().unwrap_or(self.global_mean)
    }

    /// Expected points for a side in the given state against `opponent`.
    /// A stronger-than-average opponent lowers the expectation.
    pub fn expected_points(
        &self,
        minute: u32,
        goal_diff: i32,
        man_advantage: i32,
        opponent: &str,
    ) -> f64 {
        self.raw(minute, goal_diff, man_advantage) - self.opponent_correction(opponent)
    }

    fn opponent_correction(&self, opponent: &str) -> f64 {
        if self.elo.is_empty() {
            return 0.0;
        }
        let opp = self
            .elo
            .get(opponent)
            .copied()
            .unwrap_or(self.league_mean_elo);
        self.opponent_elo_weight * (opp - self.league_mean_elo) / 100.0
    }
}

fn state_key(minute: u32, goal_diff: i32, man_advantage: i32) -> (u32, i32, i32) {
    let bucket = (minute.min(89) / MINUTE_BUCKET) * MINUTE_BUCKET;
    (
        bucket,
        goal_diff.clamp(-GOAL_DIFF_CLAMP, GOAL_DIFF_CLAMP),
        man_advantage.clamp(-MAN_ADV_CLAMP, MAN_ADV_CLAMP),
    )
}
