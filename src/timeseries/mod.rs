//! Time-series storage and period canonicalization.
//!
//! Everything downstream of ingest works on one index type: [`Period`], a
//! calendar period at monthly, quarterly, or yearly frequency. [`TimeSeries`]
//! pairs sorted periods with values and knows how to resample itself;
//! [`SeriesStore`] holds named series and aligns them into panels;
//! [`DataManager`] layers metric resolution (derived metrics, frequency
//! choices) on top of the store.

pub mod manager;
pub mod period;
pub mod series;
pub mod store;

pub use manager::DataManager;
pub use period::Period;
pub use series::TimeSeries;
pub use store::{AlignedPanel, ParseSummary, SeriesStore, StoredSeries};
