//! Engine error types

use thiserror::Error;

use crate::output::OutputId;
use crate::workspace::WorkspaceId;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum EngineError {
    /// A global the engine cannot run without was never announced.
    #[error("required global `{0}` was not announced by the backend")]
    MissingGlobal(&'static str),

    #[error("unknown output {0:?}")]
    UnknownOutput(OutputId),

    #[error("unknown workspace {0:?}")]
    UnknownWorkspace(WorkspaceId),

    /// A switch was requested while the previous one is still animating.
    #[error("workspace transition already in progress on output {0:?}")]
    TransitionInFlight(OutputId),

    #[error("workspace {0:?} is already active")]
    AlreadyActive(WorkspaceId),

    /// The configured mode matches nothing the output advertises.
    #[error("configured mode {width}x{height} not available on {output}")]
    ModeUnavailable {
        output: String,
        width: i32,
        height: i32,
    },

    #[error("invalid configuration: {0}")]
    Config(String),

    /// The dispatch loop is gone; nothing can be delivered to it anymore.
    #[error("dispatch loop closed")]
    LoopClosed,
}

pub type EngineResult<T> = std::result::Result<T, EngineError>;
