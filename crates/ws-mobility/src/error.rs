use thiserror::Error;

use ws_core::AgentId;

#[derive(Debug, Error)]
pub enum MobilityError {
    #[error("cannot seed {0} walkers on an empty walk network")]
    EmptyNetwork(usize),

    #[error("speed range must satisfy 0 < min < max, got [{min}, {max})")]
    InvalidSpeedRange { min: f64, max: f64 },

    #[error("agent {0} not found in walker store")]
    UnknownAgent(AgentId),
}

pub type MobilityResult<T> = Result<T, MobilityError>;
