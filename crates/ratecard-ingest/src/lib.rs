//! Ratecard Ingest - Ratesheet row mapping and upload pipeline
//!
//! An uploaded workbook is read, its header orientation resolved, every
//! record mapped through a static field table (or kept whole as a JSON bag)
//! and the target table replaced in a single transaction. Stored records
//! can then be corrected one field at a time.

pub mod edit;
pub mod mapping;
pub mod pipeline;

pub use edit::{edit_rate, rate_fields, update_rate_field};
pub use mapping::{FieldSpec, MappedRow, COUNTRY_FIELDS, RATE_FIELDS, TEMPLATE_FIELDS};
pub use pipeline::{IngestPipeline, IngestReport, IngestStage, SheetKind};
