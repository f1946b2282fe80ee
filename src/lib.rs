pub mod design;
pub mod elo;
pub mod error;
pub mod event_log;
pub mod expected_points;
pub mod ratings;
pub mod ridge;
pub mod segments;
pub mod xppm;

pub use error::{RatingError, Result};
pub use ratings::{RatingConfig, RatingReport, compute_ratings};
