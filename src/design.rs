use std::collections::{BTreeSet, HashMap};

use nalgebra::{DMatrix, DVector};

use crate::segments::Segment;

/// One weighted regression problem: `x` is (rows x players+1) with a
/// trailing constant intercept column, `y` the per-minute target, `w` the
/// segment-duration weights.
#[derive(Debug, Clone)]
pub struct DesignMatrix {
    pub x: DMatrix<f64>,
    pub y: DVector<f64>,
    pub w: DVector<f64>,
}

impl DesignMatrix {
    pub fn rows(&self) -> usize {
        self.x.nrows()
    }
}

/// Sorted, deduplicated union of every player seen on the field in any
/// segment. Column order of all design matrices.
pub fn player_universe(segments: &[Segment]) -> Vec<String> {
    let mut players: BTreeSet<&str> = BTreeSet::new();
    for seg in segments {
        players.extend(seg.home_on.iter().map(String::as_str));
        players.extend(seg.away_on.iter().map(String::as_str));
    }
    players.into_iter().map(str::to_owned).collect()
}

pub(crate) fn index_map(players: &[String]) -> HashMap<&str, usize> {
    players
        .iter()
        .enumerate()
        .map(|(i, p)| (p.as_str(), i))
        .collect()
}

pub(crate) fn mark(
    x: &mut DMatrix<f64>,
    idx: &HashMap<&str, usize>,
    row: usize,
    players: &[String],
    sign: f64,
) {
    for p in players {
        if let Some(&j) = idx.get(p.as_str()) {
            x[(row, j)] += sign;
        }
    }
}

/// Total plus-minus design: one row per segment, home +1 / away -1,
/// target = goal difference per minute.
pub fn total(segments: &[Segment], players: &[String]) -> DesignMatrix {
    let idx = index_map(players);
    let n = segments.len();
    let p = players.len();
    let mut x = DMatrix::zeros(n, p + 1);
    let mut y = DVector::zeros(n);
    let mut w = DVector::zeros(n);

    for (i, seg) in segments.iter().enumerate() {
        let dur = seg.duration.max(1.0);
        y[i] = (seg.gf as f64 - seg.ga as f64) / dur;
        w[i] = dur;
        mark(&mut x, &idx, i, &seg.home_on, 1.0);
        mark(&mut x, &idx, i, &seg.away_on, -1.0);
        x[(i, p)] = 1.0;
    }

    DesignMatrix { x, y, w }
}

/// Offense design: two rows per segment, each side in turn as the attacker
/// (+1) against the defender (-1), target = attacker goals per minute.
pub fn offense(segments: &[Segment], players: &[String]) -> DesignMatrix {
    attacking_pairs(segments, players, |seg| (seg.gf as f64, seg.ga as f64))
}

/// Defense design: two rows per segment, each side in turn as the defender
/// (+1), target = negated conceded goals per minute so fewer goals against
/// reads as a positive contribution.
pub fn defense(segments: &[Segment], players: &[String]) -> DesignMatrix {
    attacking_pairs(segments, players, |seg| {
        (-(seg.ga as f64), -(seg.gf as f64))
    })
}

fn attacking_pairs(
    segments: &[Segment],
    players: &[String],
    targets: impl Fn(&Segment) -> (f64, f64),
) -> DesignMatrix {
    let idx = index_map(players);
    let n = 2 * segments.len();
    let p = players.len();
    let mut x = DMatrix::zeros(n, p + 1);
    let mut y = DVector::zeros(n);
    let mut w = DVector::zeros(n);

    for (k, seg) in segments.iter().enumerate() {
        let dur = seg.duration.max(1.0);
        let (home_target, away_target) = targets(seg);

        let r_home = 2 * k;
        y[r_home] = home_target / dur;
        w[r_home] = dur;
        mark(&mut x, &idx, r_home, &seg.home_on, 1.0);
        mark(&mut x, &idx, r_home, &seg.away_on, -1.0);
        x[(r_home, p)] = 1.0;

        let r_away = r_home + 1;
        y[r_away] = away_target / dur;
        w[r_away] = dur;
        mark(&mut x, &idx, r_away, &seg.away_on, 1.0);
        mark(&mut x, &idx, r_away, &seg.home_on, -1.0);
        x[(r_away, p)] = 1.0;
    }

    DesignMatrix { x, y, w }
}
