use thiserror::Error;

/// Errors raised while turning a raw poll body into a snapshot. Data-quality
/// problems inside a well-formed snapshot never error; they degrade to
/// no-ops or filters further down the pipeline.
#[derive(Error, Debug)]
pub enum SnapshotError {
    #[error("snapshot body is not valid JSON: {0}")]
    Json(#[from] serde_json::Error),
}
