//! Static metric catalogue.
//!
//! Every series the engine touches is declared here: its id, display
//! metadata, which frequencies it may be entered at, whether a projection can
//! run without it, and, for derived metrics, the dependency ids plus the
//! compute rule that builds the series from them.

pub mod registry;

pub use registry::{
    ComputeRule, Derived, FrequencyRule, Metric, MetricRegistry, STANDARD_FREQUENCY_RULES,
};
