pub mod dataset;
pub mod error;
pub mod pipeline;
pub mod quality_filters;
pub mod settings;

pub use error::{CleaningError, Result};
pub use pipeline::{run_basic_cleaning, StageOutcome, StageParams, CLEAN_SAMPLE_FILE, JOB_TYPE};
pub use quality_filters::{
    apply_outlier_filters, require_numeric, CleaningReport, GeoBounds, PriceRange, NYC_BOUNDS,
};
