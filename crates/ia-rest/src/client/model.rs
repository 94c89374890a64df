use serde_json::Value;
use tracing::{info, instrument, warn};

use crate::error::{Error, ErrorKind, Result};
use crate::model::{
    is_reserved, parse_object_fields, parse_object_list, FieldDescriptor, ObjectDescriptor,
    DEFAULT_FIELD_TYPE, MODEL_PATH,
};
use crate::query::{QueryOutcome, QueryRequest};

impl super::IntacctClient {
    /// List the objects that can be extracted: root, owned or plain objects
    /// that support GET.
    #[instrument(skip(self))]
    pub async fn list_objects(&mut self) -> Result<Vec<ObjectDescriptor>> {
        info!("Fetching list of Sage Intacct objects from model API");
        let body: Value = self.get_json(MODEL_PATH, &[]).await?;
        let objects = parse_object_list(&body);
        info!("Found {} objects from model API", objects.len());
        Ok(objects)
    }

    /// Names of the extractable objects.
    pub async fn list_object_names(&mut self) -> Result<Vec<String>> {
        Ok(self
            .list_objects()
            .await?
            .into_iter()
            .map(|o| o.api_object)
            .collect())
    }

    /// Fields of an object and their declared types.
    ///
    /// Uses the schema from the model endpoint; when that carries no fields,
    /// falls back to [`infer_fields_from_sample`](Self::infer_fields_from_sample).
    #[instrument(skip(self))]
    pub async fn get_object_fields(&mut self, object: &str) -> Result<Vec<FieldDescriptor>> {
        info!("Fetching field definitions for object: {object}");
        let body: Value = self
            .get_json(MODEL_PATH, &[("name", object), ("schema", "true")])
            .await?;

        let fields = parse_object_fields(&body);
        if fields.is_empty() {
            warn!("No fields found in model for {object}");
            return self.infer_fields_from_sample(object).await;
        }

        info!("Found {} fields for {object}", fields.len());
        Ok(fields)
    }

    /// Derive fields from the keys of one sample record, typed as strings.
    ///
    /// An object without records yields no fields rather than an error.
    #[instrument(skip(self))]
    pub async fn infer_fields_from_sample(&mut self, object: &str) -> Result<Vec<FieldDescriptor>> {
        info!("Falling back to data inference for fields: {object}");
        let sample = QueryRequest::new(object, 1);

        let page = match self.query(&sample).await? {
            QueryOutcome::Page(page) => page,
            QueryOutcome::Error(error) => {
                return Err(Error::new(ErrorKind::Query {
                    code: error.code.clone(),
                    message: error.full_message(),
                }));
            }
        };

        let Some(first) = page.records.first() else {
            warn!("No records found for {object}, cannot determine fields");
            return Ok(Vec::new());
        };

        let fields: Vec<FieldDescriptor> = first
            .keys()
            .filter(|name| !is_reserved(name))
            .map(|name| FieldDescriptor::new(name, DEFAULT_FIELD_TYPE))
            .collect();

        info!("Inferred {} fields from data for {object}", fields.len());
        Ok(fields)
    }

    /// Primary key columns of an object. The model reports none.
    pub async fn get_primary_key(&mut self, _object: &str) -> Result<Vec<String>> {
        Ok(Vec::new())
    }
}

#[cfg(test)]
mod tests {
    use crate::client::test_support::{bodies, client_for};
    use crate::model::FieldDescriptor;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    #[tokio::test]
    async fn test_list_object_names_filters() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/core/model"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ia::result": [
                {"apiObject": "accounts-payable/vendor", "type": "rootObject", "httpMethods": "GET,POST"},
                {"apiObject": "accounts-payable/bill", "type": "rootObject", "httpMethods": "POST"},
                {"apiObject": "core/query", "type": "service", "httpMethods": "GET"}
            ]})))
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        let names = client.list_object_names().await.unwrap();
        assert_eq!(names, vec!["accounts-payable/vendor"]);
    }

    #[tokio::test]
    async fn test_get_object_fields_from_schema() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/core/model"))
            .and(query_param("name", "accounts-payable/vendor"))
            .and(query_param("schema", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ia::result": {
                "fields": {"key": {"type": "string"}, "ia::meta": {}},
                "groups": {"audit": {"fields": {"whenModified": {"type": "date-time"}}}}
            }})))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        let fields = client.get_object_fields("accounts-payable/vendor").await.unwrap();

        assert_eq!(
            fields,
            vec![
                FieldDescriptor::new("key", "string"),
                FieldDescriptor::new("whenModified", "date-time"),
            ]
        );
        assert!(bodies(&server, "/services/core/query").await.is_empty());
    }

    #[tokio::test]
    async fn test_get_object_fields_falls_back_to_sample() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/core/model"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ia::result": {"fields": {}}})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/services/core/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "ia::result": [{"key": "1", "name": "Acme", "ia::meta": {}}],
                "ia::meta": {"next": 2}
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        let fields = client.get_object_fields("gl/account").await.unwrap();

        assert_eq!(
            fields,
            vec![
                FieldDescriptor::new("key", "string"),
                FieldDescriptor::new("name", "string"),
            ]
        );
        assert_eq!(
            bodies(&server, "/services/core/query").await,
            vec![json!({"object": "gl/account", "start": 1, "size": 1})]
        );
    }

    #[tokio::test]
    async fn test_sample_without_records_is_empty_not_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/services/core/model"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ia::result": []})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/services/core/query"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"ia::result": []})))
            .mount(&server)
            .await;

        let mut client = client_for(&server);
        assert!(client.get_object_fields("gl/empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_primary_key_is_empty() {
        let server = MockServer::start().await;
        let mut client = client_for(&server);
        assert!(client.get_primary_key("gl/account").await.unwrap().is_empty());
    }
}
