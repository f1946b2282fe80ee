use nalgebra::{DMatrix, DVector};

use crate::design::{self, DesignMatrix};
use crate::error::Result;
use crate::expected_points::ExpectedPointsModel;
use crate::ridge::{self, RidgeFit};
use crate::segments::Segment;

/// Expected-points swings are much noisier per minute than raw goals, so
/// xPPM shrinks considerably harder than RAPM.
pub const DEFAULT_XPPM_ALPHA: f64 = 250.0;

/// xPPM design: structurally the total plus-minus matrix, two mirrored rows
/// per segment, but targeting the difference in expected-points change
/// instead of goals. The away side sees the mirrored state and the home
/// team as its opponent.
pub fn design(
    segments: &[Segment],
    players: &[String],
    model: &ExpectedPointsModel,
) -> DesignMatrix {
    let idx = design::index_map(players);
    let n = 2 * segments.len();
    let p = players.len();
    let mut x = DMatrix::zeros(n, p + 1);
    let mut y = DVector::zeros(n);
    let mut w = DVector::zeros(n);

    for (k, seg) in segments.iter().enumerate() {
        let dur = seg.duration.max(1.0);

        let ep_home_start =
            model.expected_points(seg.t_start, seg.gd_start, seg.man_start, &seg.away_team);
        let ep_home_end =
            model.expected_points(seg.t_end, seg.gd_end, seg.man_end, &seg.away_team);
        let ep_away_start =
            model.expected_points(seg.t_start, -seg.gd_start, -seg.man_start, &seg.home_team);
        let ep_away_end =
            model.expected_points(seg.t_end, -seg.gd_end, -seg.man_end, &seg.home_team);

        let d_home = ep_home_end - ep_home_start;
        let d_away = ep_away_end - ep_away_start;
        let target = (d_home - d_away) / dur;

        let r_home = 2 * k;
        y[r_home] = target;
        w[r_home] = dur;
        design::mark(&mut x, &idx, r_home, &seg.home_on, 1.0);
        design::mark(&mut x, &idx, r_home, &seg.away_on, -1.0);
        x[(r_home, p)] = 1.0;

        let r_away = r_home + 1;
        y[r_away] = -target;
        w[r_away] = dur;
        design::mark(&mut x, &idx, r_away, &seg.away_on, 1.0);
        design::mark(&mut x, &idx, r_away, &seg.home_on, -1.0);
        x[(r_away, p)] = 1.0;
    }

    DesignMatrix { x, y, w }
}

/// Fit xPPM per-90 coefficients with the full uncertainty bundle.
pub fn fit(
    segments: &[Segment],
    players: &[String],
    model: &ExpectedPointsModel,
    alpha: f64,
) -> Result<RidgeFit> {
    let d = design(segments, players, model);
    ridge::fit_with_uncertainty(&d, alpha)
}
