//! ordercache Core - Order Types, Errors and Validation
//!
//! Pure data types shared by every other crate: the [`Order`] model, the
//! error taxonomy, the ingestion validator and the [`ReportSink`] seam.
//! No I/O lives here.

pub mod error;
pub mod order;
pub mod report;
pub mod validate;

pub use error::{
    IngestError, MalformedMessage, OrderError, OrderResult, StorageError, StorageResult,
};
pub use order::{Order, OrderData, OrderUid};
pub use report::{NoopReportSink, ReportSink, TracingReportSink};
pub use validate::{validate, validate_owned, UID_FIELD};
