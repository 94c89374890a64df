//! Paginated extraction.
//!
//! An [`Extraction`] walks the query endpoint page by page and hands out
//! fixed-size batches of cleaned records. The server page size and the batch
//! size are independent: records are buffered across page boundaries.
//!
//! ```text
//! Init ──► Querying ──► page delivered ──► Querying ... ──► Done
//!              │
//!              └─► embedded "unknown field" error on the first query
//!                  ──► field removed ──► Querying (once)
//! ```

use std::collections::VecDeque;

use futures::Stream;
use serde_json::Value;
use tracing::{debug, info, warn};

use crate::client::IntacctClient;
use crate::error::{Error, ErrorKind, Result};
use crate::model::is_reserved;
use crate::query::{EmbeddedError, QueryOutcome, QueryRequest};

/// A cleaned record: field name to value.
pub type Record = serde_json::Map<String, Value>;

/// Records handed to the consumer at once.
pub type RecordBatch = Vec<Record>;

/// Records per yielded batch (the last batch may be smaller).
pub const BATCH_SIZE: usize = 100;

/// Records per query page.
pub const DEFAULT_PAGE_SIZE: u32 = 1000;

/// What to extract.
#[derive(Debug, Clone)]
pub struct ExtractRequest {
    pub object: String,
    /// Fields to request. Empty means every field the model reports.
    pub fields: Vec<String>,
    pub incremental_field: Option<String>,
    pub incremental_value: Option<String>,
    pub page_size: u32,
}

impl ExtractRequest {
    pub fn new(object: impl Into<String>) -> Self {
        Self {
            object: object.into(),
            fields: Vec::new(),
            incremental_field: None,
            incremental_value: None,
            page_size: DEFAULT_PAGE_SIZE,
        }
    }

    pub fn with_fields<I, S>(mut self, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.fields = fields.into_iter().map(Into::into).collect();
        self
    }

    /// Only fetch records whose `field` is at least `value`.
    pub fn with_incremental(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.incremental_field = Some(field.into());
        self.incremental_value = Some(value.into());
        self
    }

    pub fn with_page_size(mut self, page_size: u32) -> Self {
        self.page_size = page_size.max(1);
        self
    }

    /// The `>=` filter, when both the field and a non-empty seed are set.
    pub fn incremental_filter(&self) -> Option<(&str, &str)> {
        let field = self.incremental_field.as_deref().filter(|f| !f.is_empty())?;
        let value = self.incremental_value.as_deref().filter(|v| !v.is_empty())?;
        Some((field, value))
    }
}

/// Recovery from an "unknown field" error, allowed once per extraction and
/// only on its very first query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldRecovery {
    /// No query has succeeded yet and no field has been dropped.
    FirstAttempt,
    /// The named field was dropped. No further recovery.
    Recovered { field: String },
    /// A page was delivered before any field error. No recovery.
    Consumed,
}

impl FieldRecovery {
    /// Try to recover from an embedded error by dropping the field it names.
    ///
    /// Returns the dropped field and moves to `Recovered`, or returns None
    /// when the error is terminal: recovery already used, a page already
    /// delivered, the error is not about a field, the field was not
    /// requested, or dropping it would leave no fields.
    pub fn on_embedded_error(
        &mut self,
        error: &EmbeddedError,
        fields: &mut Vec<String>,
    ) -> Option<String> {
        if *self != FieldRecovery::FirstAttempt {
            return None;
        }

        let field = error.unknown_field()?;
        let position = fields.iter().position(|f| *f == field)?;
        if fields.len() == 1 {
            return None;
        }

        fields.remove(position);
        *self = FieldRecovery::Recovered {
            field: field.clone(),
        };
        Some(field)
    }

    /// A clean page arrived.
    pub fn page_delivered(&mut self) {
        if *self == FieldRecovery::FirstAttempt {
            *self = FieldRecovery::Consumed;
        }
    }

    /// The field dropped by recovery, if any.
    pub fn dropped_field(&self) -> Option<&str> {
        match self {
            FieldRecovery::Recovered { field } => Some(field),
            _ => None,
        }
    }
}

/// Strip reserved keys and anything outside the requested fields.
///
/// A dotted field such as `vendor.id` keeps the nested `vendor` value.
pub fn clean_record(record: Record, fields: &[String]) -> Record {
    record
        .into_iter()
        .filter(|(key, _)| {
            !is_reserved(key)
                && fields.iter().any(|field| {
                    field == key
                        || field
                            .strip_prefix(key.as_str())
                            .is_some_and(|rest| rest.starts_with('.'))
                })
        })
        .collect()
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Phase {
    Init,
    Querying,
    Done,
    Failed,
}

/// A running extraction. Borrow of the client lasts as long as the extraction.
#[derive(Debug)]
pub struct Extraction<'a> {
    client: &'a mut IntacctClient,
    request: ExtractRequest,
    query: Option<QueryRequest>,
    recovery: FieldRecovery,
    phase: Phase,
    pending: VecDeque<Record>,
    batch_size: usize,
    queries: u32,
    total: u64,
    delivered: u64,
}

impl<'a> Extraction<'a> {
    pub(crate) fn new(client: &'a mut IntacctClient, request: ExtractRequest) -> Self {
        Self {
            client,
            request,
            query: None,
            recovery: FieldRecovery::FirstAttempt,
            phase: Phase::Init,
            pending: VecDeque::new(),
            batch_size: BATCH_SIZE,
            queries: 0,
            total: 0,
            delivered: 0,
        }
    }

    /// Change how many records each batch carries.
    pub fn with_batch_size(mut self, batch_size: usize) -> Self {
        self.batch_size = batch_size.max(1);
        self
    }

    /// Query requests issued so far, including the one retried after recovery.
    pub fn queries_issued(&self) -> u32 {
        self.queries
    }

    /// Records received so far.
    pub fn records_extracted(&self) -> u64 {
        self.total
    }

    /// Records handed out in batches so far.
    pub fn records_delivered(&self) -> u64 {
        self.delivered
    }

    /// Fields currently requested. Empty until the first batch is asked for.
    pub fn fields(&self) -> &[String] {
        self.query.as_ref().map(|q| q.fields.as_slice()).unwrap_or(&[])
    }

    pub fn recovery(&self) -> &FieldRecovery {
        &self.recovery
    }

    /// Next batch, or None once the server has no more records.
    ///
    /// After an error the extraction is finished and yields None.
    pub async fn next_batch(&mut self) -> Result<Option<RecordBatch>> {
        loop {
            if self.pending.len() >= self.batch_size {
                return Ok(Some(self.take_batch()));
            }

            let step = match self.phase {
                Phase::Init => self.start().await,
                Phase::Querying => self.fetch_page().await,
                Phase::Done if self.pending.is_empty() => return Ok(None),
                Phase::Done => return Ok(Some(self.take_batch())),
                Phase::Failed => return Ok(None),
            };

            if let Err(err) = step {
                self.phase = Phase::Failed;
                self.pending.clear();
                return Err(err);
            }
        }
    }

    /// Consume the extraction as a stream of batches.
    pub fn into_stream(self) -> impl Stream<Item = Result<RecordBatch>> + 'a {
        futures::stream::try_unfold(self, |mut extraction| async move {
            let batch = extraction.next_batch().await?;
            Ok(batch.map(|batch| (batch, extraction)))
        })
    }

    fn take_batch(&mut self) -> RecordBatch {
        let n = self.batch_size.min(self.pending.len());
        let batch: RecordBatch = self.pending.drain(..n).collect();
        if !batch.is_empty() {
            self.delivered += batch.len() as u64;
            info!("Extracted {} records so far", self.delivered);
        }
        batch
    }

    async fn start(&mut self) -> Result<()> {
        let object = self.request.object.clone();
        info!(object = %object, "Starting data extraction");

        let mut fields = std::mem::take(&mut self.request.fields);
        if fields.is_empty() {
            fields = self
                .client
                .get_object_fields(&object)
                .await?
                .into_iter()
                .map(|f| f.name)
                .collect();
            if fields.is_empty() {
                return Err(Error::new(ErrorKind::NoFields { object }));
            }
        }

        let mut query = QueryRequest::new(&object, self.request.page_size).with_fields(fields);
        if let Some((field, value)) = self.request.incremental_filter() {
            info!("Using incremental filtering: {field} >= {value}");
            query = query.with_gte_filter(field, value);
        }

        self.query = Some(query);
        self.phase = Phase::Querying;
        Ok(())
    }

    async fn fetch_page(&mut self) -> Result<()> {
        let Some(query) = self.query.as_mut() else {
            return Err(Error::new(ErrorKind::Other(
                "extraction queried before start".to_string(),
            )));
        };

        self.queries += 1;
        let outcome = self.client.query(query).await?;

        let page = match outcome {
            QueryOutcome::Page(page) => page,
            QueryOutcome::Error(error) => {
                if let Some(field) = self.recovery.on_embedded_error(&error, &mut query.fields) {
                    warn!(
                        field = %field,
                        object = %query.object,
                        "Field does not exist on object, retrying without it"
                    );
                    return Ok(());
                }
                return Err(Error::new(ErrorKind::Query {
                    code: error.code.clone(),
                    message: error.full_message(),
                }));
            }
        };

        self.recovery.page_delivered();

        if page.records.is_empty() {
            debug!(start = %query.start, "Empty page, extraction finished");
            self.finish();
            return Ok(());
        }

        debug!(records = page.records.len(), start = %query.start, "Page received");
        for record in page.records {
            self.pending.push_back(clean_record(record, &query.fields));
            self.total += 1;
        }

        match page.next {
            Some(next) => {
                debug!(next = %next, "Continuing pagination");
                query.start = next;
            }
            None => self.finish(),
        }
        Ok(())
    }

    fn finish(&mut self) {
        self.phase = Phase::Done;
        info!(
            object = %self.request.object,
            total = self.total,
            queries = self.queries,
            "Extraction complete. Total records: {}",
            self.total
        );
    }
}
