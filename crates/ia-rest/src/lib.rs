//! # ia-rest
//!
//! Sage Intacct REST API client: object model discovery and paginated
//! extraction through the query endpoint.
//!
//! ## Features
//!
//! - **Object listing** - Extractable objects from the model endpoint
//! - **Field metadata** - Schema fields with types, or fields inferred from a sample record
//! - **Extraction** - Lazy, cursor-paginated record batches with optional
//!   incremental filtering and one-time recovery from unknown-field errors
//!
//! ## Example
//!
//! ```rust,ignore
//! use futures::TryStreamExt;
//! use ledgerpipe_ia_rest::{ExtractRequest, IntacctClient};
//!
//! let mut client = IntacctClient::new(auth)?;
//! let fields = client.get_object_fields("accounts-payable/vendor").await?;
//!
//! let request = ExtractRequest::new("accounts-payable/vendor")
//!     .with_fields(fields.into_iter().map(|f| f.name))
//!     .with_incremental("audit.modifiedDateTime", "2024-01-01T00:00:00Z");
//!
//! let mut batches = client.extract(request).into_stream();
//! while let Some(batch) = batches.try_next().await? {
//!     println!("{} records", batch.len());
//! }
//! ```

mod client;
mod error;
mod extract;
mod model;
mod query;

pub use client::IntacctClient;
pub use error::{Error, ErrorKind, Result};
pub use extract::{
    clean_record, ExtractRequest, Extraction, FieldRecovery, Record, RecordBatch, BATCH_SIZE,
    DEFAULT_PAGE_SIZE,
};
pub use model::{
    is_reserved, FieldDescriptor, ObjectDescriptor, ObjectRole, DEFAULT_FIELD_TYPE, MODEL_PATH,
    RESERVED_PREFIX,
};
pub use query::{EmbeddedError, QueryOutcome, QueryPage, QueryRequest, QUERY_PATH};
