use std::path::PathBuf;

use thiserror::Error;

use crate::engine::models::SegmentId;

#[derive(Error, Debug)]
pub enum TransitError {
    #[error("segment {segment} at speed {speed}: velocity horizon too short to complete any crossing")]
    InsufficientHorizon { segment: SegmentId, speed: f64 },
    #[error("segment {segment} at speed {speed}: elapsed-time table not available")]
    MissingUpstreamArtifact { segment: SegmentId, speed: f64 },
    #[error("segment {segment}: endpoint series differ in length ({start_len} vs {end_len})")]
    MismatchedSeries {
        segment: SegmentId,
        start_len: usize,
        end_len: usize,
    },
    #[error("speed {speed}: route produced an empty transit-time series")]
    EmptyTransitSeries { speed: f64 },
    #[error("route lists segment {0} more than once")]
    DuplicateSegment(SegmentId),
    #[error("unknown route node: {0}")]
    UnknownNode(String),
    #[error("invalid configuration: {0}")]
    InvalidConfig(String),
    #[error("{}:{line}: {message}", .path.display())]
    Parse {
        path: PathBuf,
        line: usize,
        message: String,
    },
    #[error(transparent)]
    Io(#[from] std::io::Error),
    #[error(transparent)]
    Json(#[from] serde_json::Error),
    #[error(transparent)]
    Csv(#[from] csv::Error),
}

pub type Result<T> = std::result::Result<T, TransitError>;
