use log::warn;
use nalgebra::{DMatrix, DVector};

use crate::design::DesignMatrix;
use crate::error::{RatingError, Result};

/// Ratings are reported per 90 minutes; regression targets are per minute.
pub const PER_90_SCALE: f64 = 90.0;

const CI_95_Z: f64 = 1.96;

#[derive(Debug, Clone)]
pub struct RidgeUncertainty {
    pub se: Vec<f64>,
    pub ci_low: Vec<f64>,
    pub ci_high: Vec<f64>,
    pub z: Vec<f64>,
}

/// Result of a weighted ridge fit. `coefficients` holds the per-90 player
/// coefficients (the intercept column is solved for but not reported).
/// `uncertainty` is `None` when the analytic bundle could not be computed;
/// the point estimate is still valid then.
#[derive(Debug, Clone)]
pub struct RidgeFit {
    pub coefficients: Vec<f64>,
    pub uncertainty: Option<RidgeUncertainty>,
}

/// Weighted ridge closed form `beta = (XtWX + aI)^-1 XtWy`.
///
/// The intercept column is penalized exactly like the player columns. That
/// is intentional and matches the published ratings; excluding it from the
/// penalty shifts every coefficient.
pub fn fit(design: &DesignMatrix, alpha: f64) -> Result<RidgeFit> {
    fit_inner(design, alpha, false)
}

/// Like [`fit`], additionally deriving SE / 95% CI / z from the hat matrix.
/// Numeric trouble in the uncertainty block degrades to `None` with a
/// warning; it never fails the fit.
pub fn fit_with_uncertainty(design: &DesignMatrix, alpha: f64) -> Result<RidgeFit> {
    fit_inner(design, alpha, true)
}

fn fit_inner(design: &DesignMatrix, alpha: f64, with_uncertainty: bool) -> Result<RidgeFit> {
    if !alpha.is_finite() || alpha <= 0.0 {
        return Err(RatingError::Configuration(format!(
            "ridge alpha must be positive and finite, got {alpha}"
        )));
    }

    let n = design.x.nrows();
    let cols = design.x.ncols();
    if n == 0 || cols < 2 {
        return Err(RatingError::EmptyInput("regression rows"));
    }
    let n_players = cols - 1;

    // XtW without materializing the n x n weight matrix.
    let mut xt_w = design.x.transpose();
    for i in 0..n {
        xt_w.column_mut(i).scale_mut(design.w[i]);
    }
    let xtwx = &xt_w * &design.x;
    let xtwy = &xt_w * &design.y;

    // A NaN or infinity anywhere poisons the LU solve into NaN coefficients
    // rather than a failed solve; treat it as an ill-conditioned system.
    if xtwx.iter().any(|v| !v.is_finite()) || xtwy.iter().any(|v| !v.is_finite()) {
        return Err(RatingError::SingularMatrix {
            context: "non-finite normal equations",
        });
    }

    let ridge_mat = &xtwx + DMatrix::identity(cols, cols) * alpha;

    let beta = ridge_mat
        .clone()
        .lu()
        .solve(&xtwy)
        .ok_or(RatingError::SingularMatrix {
            context: "ridge normal equations",
        })?;

    let coefficients: Vec<f64> = beta
        .iter()
        .take(n_players)
        .map(|c| c * PER_90_SCALE)
        .collect();

    let uncertainty = if with_uncertainty {
        match uncertainty_bundle(design, &xtwx, &ridge_mat, &beta, &coefficients) {
            Some(bundle) => Some(bundle),
            None => {
                warn!("ridge uncertainty not computable, reporting point estimates only");
                None
            }
        }
    } else {
        None
    };

    Ok(RidgeFit {
        coefficients,
        uncertainty,
    })
}

fn uncertainty_bundle(
    design: &DesignMatrix,
    xtwx: &DMatrix<f64>,
    ridge_mat: &DMatrix<f64>,
    beta: &DVector<f64>,
    coefficients: &[f64],
) -> Option<RidgeUncertainty> {
    let n = design.x.nrows();
    let n_players = coefficients.len();

    let ridge_inv = ridge_mat.clone().try_inverse()?;

    let resid = &design.y - &design.x * beta;
    let rss: f64 = resid
        .iter()
        .zip(design.w.iter())
        .map(|(r, w)| w * r * r)
        .sum();

    // Effective degrees of freedom via the trace of the hat matrix.
    let df = (xtwx * &ridge_inv).trace();
    let denom = (n as f64 - df).max(1.0);
    let sigma2 = rss / denom;

    let mut se = Vec::with_capacity(n_players);
    for j in 0..n_players {
        let var = ridge_inv[(j, j)] * sigma2;
        if !var.is_finite() {
            return None;
        }
        se.push(var.max(0.0).sqrt() * PER_90_SCALE);
    }

    let ci_low: Vec<f64> = coefficients
        .iter()
        .zip(&se)
        .map(|(c, s)| c - CI_95_Z * s)
        .collect();
    let ci_high: Vec<f64> = coefficients
        .iter()
        .zip(&se)
        .map(|(c, s)| c + CI_95_Z * s)
        .collect();
    let z: Vec<f64> = coefficients
        .iter()
        .zip(&se)
        .map(|(c, s)| if *s > 0.0 { c / s } else { 0.0 })
        .collect();

    Some(RidgeUncertainty {
        se,
        ci_low,
        ci_high,
        z,
    })
}
