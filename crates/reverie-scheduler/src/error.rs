//! Error types for the scheduler pipeline.
//!
//! Parse and execution failures stay inside the scheduler: they are
//! counted, logged, and never surfaced over RPC.

use reverie_db::DbError;
use reverie_kernel::KernelError;

/// A model response could not be turned into an action.
#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    /// No `{...}` object was found in the response text.
    #[error("no JSON object found in response")]
    NoJson,

    /// The extracted object was not valid JSON even after repair.
    #[error("response JSON is invalid: {0}")]
    Invalid(String),

    /// The object has no `action` field.
    #[error("response has no action field")]
    MissingAction,

    /// The `action` value is not one of the six known shapes.
    #[error("unknown action: {0}")]
    UnknownAction(String),

    /// A known action is missing its required parameters.
    #[error("malformed {action} action: {message}")]
    BadShape {
        /// The action tag.
        action: String,
        /// What was wrong.
        message: String,
    },
}

/// A parsed action failed validation or execution against world state.
#[derive(Debug, thiserror::Error)]
pub enum ExecuteError {
    /// The character stands in no area.
    #[error("character is not in any area")]
    NoArea,

    /// The current area has no exit with that label.
    #[error("no exit in direction '{0}'")]
    NoExit(String),

    /// No item in the area matches the requested name fragment.
    #[error("no item matching '{0}' here")]
    NoMatchingItem(String),

    /// No held item matches the requested name fragment.
    #[error("not holding any item matching '{0}'")]
    NotHoldingMatch(String),

    /// The kernel rejected the mutation.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// A read failed while validating the action.
    #[error(transparent)]
    Db(#[from] DbError),
}

/// Anything that can end one character's turn early.
#[derive(Debug, thiserror::Error)]
pub enum TurnError {
    /// The physiology commit or a context read failed.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// A context read failed.
    #[error(transparent)]
    Db(#[from] DbError),

    /// The model call failed.
    #[error(transparent)]
    Llm(#[from] reverie_llm::LlmError),

    /// The response did not parse into an action.
    #[error(transparent)]
    Parse(#[from] ParseError),

    /// The action failed validation or execution.
    #[error(transparent)]
    Execute(#[from] ExecuteError),
}
