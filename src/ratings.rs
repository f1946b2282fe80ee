use std::collections::BTreeMap;

use log::{info, warn};
use serde::Serialize;

use crate::design;
use crate::elo::{self, EloConfig, EloMatchRecord};
use crate::error::{RatingError, Result};
use crate::event_log::{LineupEntry, Match, MatchEvent};
use crate::expected_points::{ExpectedPointsConfig, ExpectedPointsModel};
use crate::ridge::{self, RidgeFit};
use crate::segments;
use crate::xppm;

#[derive(Debug, Clone, Copy)]
pub struct RatingConfig {
    pub elo: EloConfig,
    pub expected_points: ExpectedPointsConfig,
    /// Ridge penalty for the three RAPM models.
    pub rapm_alpha: f64,
    /// Ridge penalty for xPPM; materially higher, see [`xppm`].
    pub xppm_alpha: f64,
}

impl Default for RatingConfig {
    fn default() -> Self {
        Self {
            elo: EloConfig::default(),
            expected_points: ExpectedPointsConfig::default(),
            rapm_alpha: 80.0,
            xppm_alpha: xppm::DEFAULT_XPPM_ALPHA,
        }
    }
}

impl RatingConfig {
    pub fn validate(&self) -> Result<()> {
        for (name, alpha) in [("rapm", self.rapm_alpha), ("xppm", self.xppm_alpha)] {
            if !alpha.is_finite() || alpha <= 0.0 {
                return Err(RatingError::Configuration(format!(
                    "{name} alpha must be positive and finite, got {alpha}"
                )));
            }
        }
        self.expected_points.validate()
    }
}

/// One row of the player rating table, named after the export contract.
/// Uncertainty fields are `None` when the analytic bundle degraded, which
/// is distinct from a zero.
#[derive(Debug, Clone, Serialize)]
pub struct PlayerRating {
    pub player: String,
    #[serde(rename = "RAPM_total_per90")]
    pub rapm_total_per90: f64,
    #[serde(rename = "RAPM_off_per90")]
    pub rapm_off_per90: Option<f64>,
    #[serde(rename = "RAPM_def_per90")]
    pub rapm_def_per90: Option<f64>,
    #[serde(rename = "RAPM_SE")]
    pub rapm_se: Option<f64>,
    #[serde(rename = "RAPM_CI_low")]
    pub rapm_ci_low: Option<f64>,
    #[serde(rename = "RAPM_CI_high")]
    pub rapm_ci_high: Option<f64>,
    #[serde(rename = "RAPM_z")]
    pub rapm_z: Option<f64>,
    #[serde(rename = "xPPM_per90")]
    pub xppm_per90: Option<f64>,
    #[serde(rename = "xPPM_SE")]
    pub xppm_se: Option<f64>,
    #[serde(rename = "xPPM_CI_low")]
    pub xppm_ci_low: Option<f64>,
    #[serde(rename = "xPPM_CI_high")]
    pub xppm_ci_high: Option<f64>,
    #[serde(rename = "xPPM_z")]
    pub xppm_z: Option<f64>,
}

/// One played match from a team's perspective, for the ELO time series.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct TeamEloPoint {
    pub round: u32,
    pub rating: f64,
    pub opponent_rating: f64,
    pub result: char,
    pub goal_diff: i32,
}

#[derive(Debug, Clone, Default, Serialize)]
pub struct RatingReport {
    /// Sorted by player name. Empty when the dataset yields no segments or
    /// no players, or when the regression degenerated.
    pub players: Vec<PlayerRating>,
    /// Per-team ELO series, sorted by team name.
    pub teams: BTreeMap<String, Vec<TeamEloPoint>>,
}

/// Run the full rating pipeline over one league dataset.
///
/// Matches are validated, sorted chronologically and replayed through ELO;
/// played matches are segmented and fed to the RAPM and xPPM regressions.
/// Degenerate datasets produce an empty (never missing) player table.
pub fn compute_ratings(
    matches: &[Match],
    events: &[MatchEvent],
    lineups: &[LineupEntry],
    cfg: &RatingConfig,
) -> Result<RatingReport> {
    cfg.validate()?;
    for m in matches {
        m.validate()?;
    }

    let mut ordered: Vec<Match> = matches.to_vec();
    ordered.sort_by(|a, b| a.date.cmp(&b.date).then_with(|| a.id.cmp(&b.id)));

    let replay = elo::replay(&ordered, &cfg.elo);
    let teams = team_series(&replay.records);

    let played: Vec<Match> = ordered.iter().filter(|m| m.is_played()).cloned().collect();
    let segs = segments::build_segments(&played, events, lineups);
    info!(
        "segmented {} played matches into {} segments",
        played.len(),
        segs.len()
    );

    let players = design::player_universe(&segs);
    if segs.is_empty() || players.is_empty() {
        warn!("no segments or no players, returning empty rating table");
        return Ok(RatingReport {
            players: Vec::new(),
            teams,
        });
    }

    let total = match ridge::fit_with_uncertainty(&design::total(&segs, &players), cfg.rapm_alpha)
    {
        Ok(fit) => fit,
        Err(err) => {
            warn!("total RAPM fit failed ({err}), returning empty rating table");
            return Ok(RatingReport {
                players: Vec::new(),
                teams,
            });
        }
    };
    let off = tolerant_fit(
        ridge::fit(&design::offense(&segs, &players), cfg.rapm_alpha),
        "offensive RAPM",
    );
    let def = tolerant_fit(
        ridge::fit(&design::defense(&segs, &players), cfg.rapm_alpha),
        "defensive RAPM",
    );

    let ep_model = ExpectedPointsModel::fit(&segs, &replay.table, &cfg.expected_points)?;
    let xppm_fit = tolerant_fit(
        xppm::fit(&segs, &players, &ep_model, cfg.xppm_alpha),
        "xPPM",
    );

    let rows = assemble_rows(&players, &total, off.as_ref(), def.as_ref(), xppm_fit.as_ref());
    info!("rated {} players", rows.len());

    Ok(RatingReport {
        players: rows,
        teams,
    })
}

/// Offense/defense/xPPM are additive detail on top of total RAPM; a
/// degenerate fit there empties the corresponding columns instead of the
/// whole run.
fn tolerant_fit(result: Result<RidgeFit>, label: &str) -> Option<RidgeFit> {
    match result {
        Ok(fit) => Some(fit),
        Err(err) => {
            warn!("{label} fit failed ({err}), columns left empty");
            None
        }
    }
}

fn assemble_rows(
    players: &[String],
    total: &RidgeFit,
    off: Option<&RidgeFit>,
    def: Option<&RidgeFit>,
    xppm_fit: Option<&RidgeFit>,
) -> Vec<PlayerRating> {
    let pick = |fit: Option<&RidgeFit>, i: usize| fit.map(|f| f.coefficients[i]);
    let total_u = total.uncertainty.as_ref();
    let xppm_u = xppm_fit.and_then(|f| f.uncertainty.as_ref());

    players
        .iter()
        .enumerate()
        .map(|(i, player)| PlayerRating {
            player: player.clone(),
            rapm_total_per90: total.coefficients[i],
            rapm_off_per90: pick(off, i),
            rapm_def_per90: pick(def, i),
            rapm_se: total_u.map(|u| u.se[i]),
            rapm_ci_low: total_u.map(|u| u.ci_low[i]),
            rapm_ci_high: total_u.map(|u| u.ci_high[i]),
            rapm_z: total_u.map(|u| u.z[i]),
            xppm_per90: pick(xppm_fit, i),
            xppm_se: xppm_u.map(|u| u.se[i]),
            xppm_ci_low: xppm_u.map(|u| u.ci_low[i]),
            xppm_ci_high: xppm_u.map(|u| u.ci_high[i]),
            xppm_z: xppm_u.map(|u| u.z[i]),
        })
        .collect()
}

fn team_series(records: &[EloMatchRecord]) -> BTreeMap<String, Vec<TeamEloPoint>> {
    let mut out: BTreeMap<String, Vec<TeamEloPoint>> = BTreeMap::new();
    for rec in records {
        let (Some(rh), Some(hs), Some(as_)) = (rec.result_home, rec.home_score, rec.away_score)
        else {
            continue;
        };
        let gd = hs as i32 - as_ as i32;

        let home = out.entry(rec.home_team.clone()).or_default();
        home.push(TeamEloPoint {
            round: home.len() as u32 + 1,
            rating: rec.elo_home_after,
            opponent_rating: rec.elo_away_before,
            result: result_char(rh),
            goal_diff: gd,
        });

        let away = out.entry(rec.away_team.clone()).or_default();
        away.push(TeamEloPoint {
            round: away.len() as u32 + 1,
            rating: rec.elo_away_after,
            opponent_rating: rec.elo_home_before,
            result: result_char(1.0 - rh),
            goal_diff: -gd,
        });
    }
    out
}

fn result_char(result: f64) -> char {
    if result > 0.5 {
        'W'
    } else if result < 0.5 {
        'L'
    } else {
        'D'
    }
}
