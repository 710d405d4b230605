/// Errors from the execution engine's own machinery.
///
/// Task failures are not errors at this level: they fail the phase and the
/// run through the status records. This type covers infrastructure problems
/// (storage, malformed snapshots) and the escalated last-run pointer case.
#[derive(Debug, thiserror::Error)]
pub enum EngineError {
  #[error(transparent)]
  Store(#[from] spinneret_store::Error),

  #[error(transparent)]
  Serde(#[from] serde_json::Error),

  #[error("phase '{phase_id}' has a malformed node snapshot: {message}")]
  MalformedPhase { phase_id: String, message: String },

  #[error("failed to update last-run pointer for workflow '{workflow_id}'")]
  LastRunPointer { workflow_id: String },
}
