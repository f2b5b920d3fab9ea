//! Kernel health tracking and lifecycle event handlers.
//!
//! A failed log write leaves the store in an unknown state. The kernel
//! records the first such failure in [`KernelHealth`] and from then on
//! refuses further work until the database is recovered.

mod events;
mod health;

pub use events::{ExecutionOrder, KernelEventHandler, KernelEventHandlers};
pub use health::{ErrorState, KernelHealth, PanicCause};
