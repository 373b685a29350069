//! Task inputs: the prepared dataset, the split table, and file loading

pub mod dataset;
pub mod loader;
pub mod splits;

pub use dataset::PreparedDataset;
pub use loader::DataLoader;
pub use splits::{SplitRecord, SplitRole, SplitSummary, SplitTable};
