//! World State Kernel for the Reverie simulator.
//!
//! The kernel is the only layer allowed to mutate persistent world state.
//! It enforces the entity invariants (item location XOR, memory caps,
//! percentage clamps, forced sleep), commits every mutator in a single
//! transaction, and feeds committed events to the trigger engine.
//!
//! # Modules
//!
//! - [`kernel`] -- The mutator surface ([`Kernel`])
//! - [`physiology`] -- Pure elapsed-time decay applied by the scheduler
//! - [`memory`] -- Memory tail cap maintenance
//! - [`trigger`] -- The data-driven trigger engine
//! - [`error`] -- Typed failures ([`KernelError`])

pub mod error;
pub mod kernel;
pub mod memory;
pub mod physiology;
pub mod trigger;

pub use error::{KernelError, MAX_TX_ATTEMPTS};
pub use kernel::{Kernel, StateUpdate};
