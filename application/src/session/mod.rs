//! Session state shared across the lifecycle and handlers.

pub mod context;

#[cfg(test)]
pub(crate) mod testing;

pub use context::SessionContext;
