//! WCP error model: stable application codes at the RPC boundary.

use reverie_kernel::KernelError;
use reverie_session::SessionError;

/// Application error codes surfaced in tool results. Stable; clients may
/// switch on them.
pub mod codes {
    /// Malformed parameters, out-of-range values, unknown enum.
    pub const VALIDATION: i64 = 1001;
    /// Entity id does not resolve.
    pub const NOT_FOUND: i64 = 1002;
    /// Two referenced entities live in different worlds.
    pub const CROSS_WORLD: i64 = 1003;
    /// Item is not in the character's area.
    pub const NOT_HERE: i64 = 1004;
    /// Item is not held by the character.
    pub const NOT_HOLDING: i64 = 1005;
    /// Character has no current area.
    pub const NO_AREA: i64 = 1006;
    /// Holding slot already occupied.
    pub const SLOT_OCCUPIED: i64 = 1007;
    /// Both hand slots occupied.
    pub const BOTH_HANDS_FULL: i64 = 1008;
    /// Ownership conflict on claim.
    pub const ALREADY_OWNED: i64 = 1009;
    /// Request exceeded the 30-second deadline.
    pub const TIMEOUT: i64 = 1010;
    /// Transactional retry budget exceeded.
    pub const CONFLICT: i64 = 1011;
    /// Missing/expired token, or the caller does not control the subject.
    pub const UNAUTHORIZED: i64 = 1012;
    /// Internal failure (persistence, serialization).
    pub const INTERNAL: i64 = 1100;
}

/// Errors surfaced by tool handlers.
#[derive(Debug, thiserror::Error)]
pub enum WcpError {
    /// Malformed or missing tool arguments.
    #[error("validation failed: {0}")]
    Validation(String),

    /// The request exceeded its deadline.
    #[error("request timed out")]
    Timeout,

    /// The remote caller is not allowed to perform this call.
    #[error("unauthorized: {0}")]
    Unauthorized(String),

    /// The kernel rejected the operation.
    #[error(transparent)]
    Kernel(#[from] KernelError),

    /// The session layer rejected the operation.
    #[error(transparent)]
    Session(#[from] SessionError),

    /// A read outside the kernel failed.
    #[error(transparent)]
    Db(#[from] reverie_db::DbError),
}

impl WcpError {
    /// The stable application code for this error.
    pub fn code(&self) -> i64 {
        match self {
            Self::Validation(_) => codes::VALIDATION,
            Self::Timeout => codes::TIMEOUT,
            Self::Unauthorized(_) => codes::UNAUTHORIZED,
            Self::Kernel(e) => match e {
                KernelError::NotFound { .. } => codes::NOT_FOUND,
                KernelError::CrossWorld { .. } => codes::CROSS_WORLD,
                KernelError::NotHere { .. } => codes::NOT_HERE,
                KernelError::NotHolding { .. } => codes::NOT_HOLDING,
                KernelError::NoArea { .. } => codes::NO_AREA,
                KernelError::SlotOccupied { .. } => codes::SLOT_OCCUPIED,
                KernelError::BothHandsFull { .. } => codes::BOTH_HANDS_FULL,
                KernelError::Validation { .. } => codes::VALIDATION,
                KernelError::Conflict { .. } => codes::CONFLICT,
                KernelError::Db(_) => codes::INTERNAL,
            },
            Self::Session(e) => match e {
                SessionError::NotFound { .. } => codes::NOT_FOUND,
                SessionError::AlreadyOwned { .. } => codes::ALREADY_OWNED,
                SessionError::Db(_) => codes::INTERNAL,
            },
            Self::Db(_) => codes::INTERNAL,
        }
    }
}
