use serde_json::Value;
use tracing::instrument;

use crate::error::Result;
use crate::extract::{ExtractRequest, Extraction};
use crate::query::{parse_query_response, QueryOutcome, QueryRequest, QUERY_PATH};

impl super::IntacctClient {
    /// Run one query and read its result envelope.
    ///
    /// HTTP-level failures are errors; a server error embedded in a 2xx
    /// envelope is returned as [`QueryOutcome::Error`] for the caller to judge.
    #[instrument(skip(self, request), fields(object = %request.object, start = %request.start))]
    pub async fn query(&mut self, request: &QueryRequest) -> Result<QueryOutcome> {
        let body: Value = self.post_json(QUERY_PATH, request).await?;
        Ok(parse_query_response(body))
    }

    /// Start a lazy, paginated extraction. Nothing is sent until the first
    /// batch is requested.
    pub fn extract(&mut self, request: ExtractRequest) -> Extraction<'_> {
        Extraction::new(self, request)
    }
}
