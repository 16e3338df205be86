// macsio_etl/src/lib.rs
// Public API for the macsio_etl crate.

pub mod cli;
pub mod error;
pub mod json;
pub mod mongo;
pub mod pipeline;
pub mod transform;

pub const DEFAULT_MONGO_URI: &str = "mongodb://localhost:27017";
pub const DEFAULT_DATABASE_NAME: &str = "macsio2";
pub const DEFAULT_INPUT_COLLECTION: &str = "macsioinputs";
pub const DEFAULT_OUTPUT_COLLECTION: &str = "macsiooutputs";
pub const DEFAULT_BATCH_SIZE: usize = 10;
pub const REPORT_FILE_NAME: &str = "transform_report.json";
