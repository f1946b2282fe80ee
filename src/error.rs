use thiserror::Error;

/// Failures surfaced by the rating pipeline.
///
/// Configuration problems are raised immediately at call time. Numeric
/// degradations (a singular system, an empty dataset) are typed so callers
/// can decide between "empty report" and "abort the run".
#[derive(Debug, Error)]
pub enum RatingError {
    #[error("match {match_id}: missing {field}")]
    DataIntegrity {
        match_id: String,
        field: &'static str,
    },

    #[error("regression matrix is singular or ill-conditioned ({context})")]
    SingularMatrix { context: &'static str },

    #[error("no {0} in input")]
    EmptyInput(&'static str),

    #[error("invalid configuration: {0}")]
    Configuration(String),
}

pub type Result<T> = std::result::Result<T, RatingError>;
