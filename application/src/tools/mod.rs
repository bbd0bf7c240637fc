//! Tool aggregation and routing.

pub mod registry;

pub use registry::{DEFAULT_LIST_TIMEOUT, ProviderCloseReport, ToolProviderRegistry};
