use reqwest::header::{HeaderMap, HeaderValue, AUTHORIZATION, CONTENT_TYPE};
use reqwest::{Method, Response};
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::config::Config;
use crate::error::{ApiError, ApiResult};
use crate::session::SessionStore;

pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Raw(Vec<u8>),
    Multipart(reqwest::multipart::Form),
}

/// Gateway to the KZGuard backend.
///
/// [`ApiClient::request`] is the single place requests are built. It returns
/// whatever the backend answered; only transport failures become errors.
/// The typed helpers on top interpret the status for the handlers.
#[derive(Debug, Clone)]
pub struct ApiClient {
    http: reqwest::Client,
    base_url: String,
    session: SessionStore,
}

impl ApiClient {
    pub fn new(base_url: impl Into<String>, session: SessionStore) -> Self {
        Self {
            http: reqwest::Client::new(),
            base_url: base_url.into().trim_end_matches('/').to_string(),
            session,
        }
    }

    pub fn from_config(config: &Config) -> Self {
        Self::new(config.api_base_url.clone(), SessionStore::new(config.session_file.clone()))
    }

    pub fn session(&self) -> &SessionStore {
        &self.session
    }

    pub fn url(&self, endpoint: &str) -> String {
        format!("{}{}", self.base_url, endpoint)
    }

    /// `endpoint?key=value&...` with the values form-encoded.
    pub fn with_query(&self, endpoint: &str, pairs: &[(&str, &str)]) -> ApiResult<String> {
        let mut url = reqwest::Url::parse(&self.url(endpoint))
            .map_err(|e| ApiError::Config(format!("invalid API url: {}", e)))?;
        url.query_pairs_mut().extend_pairs(pairs.iter().copied());
        Ok(format!("{}?{}", endpoint, url.query().unwrap_or_default()))
    }

    /// `endpoint/segment` with the segment percent-encoded as one path part.
    pub fn with_segment(&self, endpoint: &str, segment: &str) -> ApiResult<String> {
        let mut url = reqwest::Url::parse("http://segment.invalid/")
            .map_err(|e| ApiError::Config(format!("invalid API url: {}", e)))?;
        url.path_segments_mut()
            .map_err(|_| ApiError::Config("API url cannot hold a path".to_string()))?
            .clear()
            .push(segment);
        Ok(format!("{}{}", endpoint.trim_end_matches('/'), url.path()))
    }

    pub async fn request(
        &self,
        method: Method,
        endpoint: &str,
        body: RequestBody,
        mut headers: HeaderMap,
    ) -> ApiResult<Response> {
        // Read on every call: another process may have logged in or out.
        if let Some(token) = self.session.token() {
            match HeaderValue::from_str(&format!("Bearer {}", token)) {
                Ok(value) => {
                    headers.insert(AUTHORIZATION, value);
                }
                Err(_) => tracing::warn!("Stored token is not a valid header value, sending without it"),
            }
        }

        let multipart = matches!(body, RequestBody::Multipart(_));
        if !headers.contains_key(CONTENT_TYPE) && !multipart {
            headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        }

        let builder = self.http.request(method.clone(), self.url(endpoint)).headers(headers);
        let builder = match body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.body(serde_json::to_vec(&value)?),
            RequestBody::Raw(bytes) => builder.body(bytes),
            RequestBody::Multipart(form) => builder.multipart(form),
        };

        tracing::debug!(%method, endpoint, "api request");
        let response = builder.send().await.map_err(|e| {
            tracing::error!(%method, endpoint, "API request failed: {}", e);
            ApiError::Network(e)
        })?;
        tracing::debug!(%method, endpoint, status = %response.status(), "api response");

        Ok(response)
    }

    pub async fn get(&self, endpoint: &str) -> ApiResult<Response> {
        self.request(Method::GET, endpoint, RequestBody::Empty, HeaderMap::new()).await
    }

    pub async fn send_json<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> ApiResult<Response> {
        let value = serde_json::to_value(body)?;
        self.request(method, endpoint, RequestBody::Json(value), HeaderMap::new()).await
    }

    /// GET and decode, treating any non-2xx as an error.
    pub async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> ApiResult<T> {
        let response = expect_ok(self.get(endpoint).await?).await?;
        decode(response).await
    }

    /// Mutation whose response body is irrelevant.
    pub async fn mutate<B: Serialize + ?Sized>(
        &self,
        method: Method,
        endpoint: &str,
        body: Option<&B>,
    ) -> ApiResult<()> {
        let response = match body {
            Some(body) => self.send_json(method, endpoint, body).await?,
            None => self.request(method, endpoint, RequestBody::Empty, HeaderMap::new()).await?,
        };
        expect_ok(response).await?;
        Ok(())
    }

    pub async fn mutate_json<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        method: Method,
        endpoint: &str,
        body: &B,
    ) -> ApiResult<T> {
        let response = expect_ok(self.send_json(method, endpoint, body).await?).await?;
        decode(response).await
    }
}

pub async fn expect_ok(response: Response) -> ApiResult<Response> {
    if response.status().is_success() {
        Ok(response)
    } else {
        Err(ApiError::from_response(response).await)
    }
}

pub async fn decode<T: DeserializeOwned>(response: Response) -> ApiResult<T> {
    let bytes = response.bytes().await?;
    Ok(serde_json::from_slice(&bytes)?)
}
