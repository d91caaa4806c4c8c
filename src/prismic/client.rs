//! HTTP client for the content service API

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tokio::sync::OnceCell;

use super::document::{ApiInfo, Document, QueryResponse};
use super::error::{ContentError, ContentResult};
use super::predicate::{to_query, Predicate, QueryOptions};
use super::ContentSource;
use crate::config::ContentServiceConfig;

/// Per-request context handed to the client factory.
///
/// The default context is public mode: queries run against the master ref.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestContext {
    /// Ref taken from the preview cookie
    pub preview_ref: Option<String>,
}

impl RequestContext {
    pub fn preview(r#ref: impl Into<String>) -> Self {
        Self {
            preview_ref: Some(r#ref.into()),
        }
    }

    pub fn is_preview(&self) -> bool {
        self.preview_ref.is_some()
    }
}

/// Authenticated handle to the content service
pub struct ContentClient {
    endpoint: String,
    access_token: Option<String>,
    context: RequestContext,
    http: reqwest::Client,
    master_ref: OnceCell<String>,
}

impl ContentClient {
    /// Build a client for the configured endpoint
    pub fn new(config: &ContentServiceConfig, context: RequestContext) -> ContentResult<Self> {
        let endpoint = config.api_endpoint.trim().trim_end_matches('/').to_string();
        if endpoint.is_empty() || reqwest::Url::parse(&endpoint).is_err() {
            return Err(ContentError::InvalidEndpoint(config.api_endpoint.clone()));
        }

        tracing::debug!(
            "Content client for {} (preview: {})",
            endpoint,
            context.is_preview()
        );

        Ok(Self {
            endpoint,
            access_token: config.access_token.clone(),
            context,
            http: reqwest::Client::new(),
            master_ref: OnceCell::new(),
        })
    }

    /// Fetch the API root document
    pub async fn api_info(&self) -> ContentResult<ApiInfo> {
        let request = self.with_token(self.http.get(&self.endpoint));
        self.send(request).await
    }

    /// Ref to query against: explicit option, then preview, then master
    async fn resolve_ref(&self, options: &QueryOptions) -> ContentResult<String> {
        if let Some(r) = options.r#ref.as_ref().or(self.context.preview_ref.as_ref()) {
            return Ok(r.clone());
        }

        let master = self
            .master_ref
            .get_or_try_init(|| async {
                let api = self.api_info().await?;
                let master = api.master_ref().ok_or(ContentError::NoMasterRef)?;
                tracing::debug!("Content service master ref: {}", master);
                Ok::<_, ContentError>(master.to_string())
            })
            .await?;

        Ok(master.clone())
    }

    fn with_token(&self, request: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.access_token {
            Some(token) => request.query(&[("access_token", token)]),
            None => request,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: reqwest::RequestBuilder) -> ContentResult<T> {
        let response = request.send().await?;
        let status = response.status();
        let body = response.text().await?;

        if !status.is_success() {
            return Err(ContentError::Status { status, body });
        }

        Ok(serde_json::from_str(&body)?)
    }

    async fn first_match(
        &self,
        predicate: Predicate,
        options: &QueryOptions,
        doc_type: &str,
        field: &'static str,
        value: &str,
    ) -> ContentResult<Document> {
        let options = QueryOptions {
            page_size: Some(1),
            ..options.clone()
        };
        let response = self.query(&[predicate], &options).await?;

        response
            .results
            .into_iter()
            .next()
            .ok_or_else(|| ContentError::NotFound {
                doc_type: doc_type.to_string(),
                field,
                value: value.to_string(),
            })
    }
}

#[async_trait]
impl ContentSource for ContentClient {
    async fn query(
        &self,
        predicates: &[Predicate],
        options: &QueryOptions,
    ) -> ContentResult<QueryResponse> {
        let r#ref = self.resolve_ref(options).await?;
        let url = format!("{}/documents/search", self.endpoint);

        let mut params = vec![("ref", r#ref), ("q", to_query(predicates))];
        params.extend(options.to_params());

        tracing::debug!("Querying {} with {:?}", url, params);
        let request = self.with_token(self.http.get(&url).query(&params));
        self.send(request).await
    }

    async fn get_by_uid(
        &self,
        doc_type: &str,
        uid: &str,
        options: &QueryOptions,
    ) -> ContentResult<Document> {
        let predicate = Predicate::at(format!("my.{}.uid", doc_type), uid);
        self.first_match(predicate, options, doc_type, "uid", uid)
            .await
    }

    async fn get_by_id(&self, id: &str, options: &QueryOptions) -> ContentResult<Document> {
        let predicate = Predicate::at("document.id", id);
        self.first_match(predicate, options, "document", "id", id)
            .await
    }

    async fn fetch_page(&self, url: &str) -> ContentResult<QueryResponse> {
        tracing::debug!("Fetching next page {}", url);
        self.send(self.http.get(url)).await
    }
}
