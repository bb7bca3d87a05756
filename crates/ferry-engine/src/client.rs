//! Docker Engine API client over a dialed stream

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use futures::{StreamExt, TryStreamExt};
use http_body_util::combinators::UnsyncBoxBody;
use http_body_util::{BodyExt, BodyStream, Empty, Full, StreamBody};
use hyper::body::{Frame, Incoming};
use hyper::client::conn::http1;
use hyper::{header, Method, Request, Response, StatusCode};
use hyper_util::rt::TokioIo;
use serde::de::DeserializeOwned;

use ferry_core::traits::{ContainerEngine, Dialer, ImageArchive};
use ferry_core::{ContainerRecord, ContainerSpec, EngineError, ImageSummary};

use crate::api::{self, ApiContainer, ApiImage, CreateContainerBody, CreateResponse, ErrorResponse};
use crate::version::ApiVersion;

type RequestBody = UnsyncBoxBody<Bytes, EngineError>;

fn empty_body() -> RequestBody {
    Empty::<Bytes>::new()
        .map_err(|never| match never {})
        .boxed_unsync()
}

fn json_body(bytes: Vec<u8>) -> RequestBody {
    Full::new(Bytes::from(bytes))
        .map_err(|never| match never {})
        .boxed_unsync()
}

/// Percent-encode a query value
fn encode_query(value: &str) -> String {
    let mut out = String::with_capacity(value.len());
    for byte in value.bytes() {
        match byte {
            b'A'..=b'Z' | b'a'..=b'z' | b'0'..=b'9' | b'-' | b'_' | b'.' | b'~' => {
                out.push(byte as char)
            }
            _ => out.push_str(&format!("%{:02X}", byte)),
        }
    }
    out
}

/// Turn a non-success response into an error
async fn error_from_response(response: Response<Incoming>) -> EngineError {
    let status = response.status();
    let message = match response.into_body().collect().await {
        Ok(body) => {
            let bytes = body.to_bytes();
            serde_json::from_slice::<ErrorResponse>(&bytes)
                .map(|e| e.message)
                .unwrap_or_else(|_| String::from_utf8_lossy(&bytes).trim().to_string())
        }
        Err(e) => format!("(failed to read error body: {})", e),
    };

    match status {
        StatusCode::NOT_FOUND => EngineError::NotFound(message),
        StatusCode::CONFLICT => EngineError::Conflict(message),
        _ => EngineError::Api {
            status: status.as_u16(),
            message,
        },
    }
}

/// Client for one engine endpoint
///
/// Every request dials a fresh stream and runs a single HTTP/1.1 exchange
/// on it, so the client holds no connection state between calls.
pub struct DockerEngine {
    label: String,
    dialer: Arc<dyn Dialer>,
    socket: String,
    version: ApiVersion,
    request_timeout: Duration,
}

impl DockerEngine {
    /// Connect to the engine at `socket` and negotiate an API version
    pub async fn connect(
        label: impl Into<String>,
        dialer: Arc<dyn Dialer>,
        socket: impl Into<String>,
        request_timeout: Duration,
    ) -> Result<Self, EngineError> {
        let mut engine = Self {
            label: label.into(),
            dialer,
            socket: socket.into(),
            version: ApiVersion::MIN_SUPPORTED,
            request_timeout,
        };

        let info: api::VersionResponse = engine.get_json("/version".to_string()).await?;
        engine.version =
            ApiVersion::negotiate(info.api_version.as_deref(), info.min_api_version.as_deref())?;

        tracing::info!(
            endpoint = %engine.label,
            engine_version = info.version.as_deref().unwrap_or("unknown"),
            api_version = %engine.version,
            "Connected to container engine"
        );
        Ok(engine)
    }

    /// Negotiated API version
    pub fn api_version(&self) -> ApiVersion {
        self.version
    }

    fn url(&self, path: &str) -> String {
        format!("/v{}{}", self.version, path)
    }

    async fn send(
        &self,
        method: Method,
        uri: String,
        content_type: Option<&str>,
        body: RequestBody,
    ) -> Result<Response<Incoming>, EngineError> {
        let stream = self
            .dialer
            .dial(&self.socket)
            .await
            .map_err(|e| EngineError::Connect {
                address: format!("{} ({})", self.socket, self.label),
                message: e.to_string(),
            })?;

        let (mut sender, conn) = http1::handshake(TokioIo::new(stream))
            .await
            .map_err(|e| EngineError::Connect {
                address: format!("{} ({})", self.socket, self.label),
                message: e.to_string(),
            })?;

        // Drives the connection until the response body is consumed
        tokio::spawn(async move {
            if let Err(e) = conn.await {
                tracing::debug!(error = %e, "Engine connection closed with error");
            }
        });

        let mut builder = Request::builder()
            .method(method)
            .uri(&uri)
            .header(header::HOST, "docker");
        if let Some(content_type) = content_type {
            builder = builder.header(header::CONTENT_TYPE, content_type);
        }
        let request = builder
            .body(body)
            .map_err(|e| EngineError::Http(format!("Failed to build request: {}", e)))?;

        tracing::debug!(endpoint = %self.label, "{} {}", request.method(), uri);
        sender
            .send_request(request)
            .await
            .map_err(|e| EngineError::Http(e.to_string()))
    }

    /// Send a request bounded by the request timeout
    async fn send_timed(
        &self,
        method: Method,
        uri: String,
        content_type: Option<&str>,
        body: RequestBody,
    ) -> Result<Response<Incoming>, EngineError> {
        tokio::time::timeout(
            self.request_timeout,
            self.send(method, uri, content_type, body),
        )
        .await
        .map_err(|_| EngineError::Timeout)?
    }

    async fn read_json<T: DeserializeOwned>(
        &self,
        response: Response<Incoming>,
    ) -> Result<T, EngineError> {
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }
        let body = tokio::time::timeout(self.request_timeout, response.into_body().collect())
            .await
            .map_err(|_| EngineError::Timeout)?
            .map_err(|e| EngineError::Http(e.to_string()))?
            .to_bytes();
        serde_json::from_slice(&body).map_err(|e| EngineError::Decode(e.to_string()))
    }

    async fn get_json<T: DeserializeOwned>(&self, uri: String) -> Result<T, EngineError> {
        let response = self.send_timed(Method::GET, uri, None, empty_body()).await?;
        self.read_json(response).await
    }

    /// POST with no body, accepting 304 as "already in that state"
    async fn post_action(&self, uri: String) -> Result<StatusCode, EngineError> {
        let response = self
            .send_timed(Method::POST, uri, None, empty_body())
            .await?;
        let status = response.status();
        if status.is_success() || status == StatusCode::NOT_MODIFIED {
            Ok(status)
        } else {
            Err(error_from_response(response).await)
        }
    }
}

#[async_trait]
impl ContainerEngine for DockerEngine {
    fn endpoint(&self) -> &str {
        &self.label
    }

    async fn export_image(&self, image: &str) -> Result<ImageArchive, EngineError> {
        let uri = self.url(&format!("/images/get?names={}", encode_query(image)));
        let response = self
            .send_timed(Method::GET, uri, None, empty_body())
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let archive = BodyStream::new(response.into_body())
            .try_filter_map(|frame| async move { Ok::<_, hyper::Error>(frame.into_data().ok()) })
            .map_err(|e| EngineError::Http(format!("Export stream failed: {}", e)));
        Ok(archive.boxed())
    }

    async fn import_image(&self, archive: ImageArchive, quiet: bool) -> Result<(), EngineError> {
        let uri = self.url(&format!("/images/load?quiet={}", if quiet { 1 } else { 0 }));
        let body = StreamBody::new(archive.map_ok(Frame::data)).boxed_unsync();

        // No overall timeout here; archive size is unbounded
        let response = self
            .send(Method::POST, uri, Some("application/x-tar"), body)
            .await?;
        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let output = response
            .into_body()
            .collect()
            .await
            .map_err(|e| EngineError::Http(e.to_string()))?
            .to_bytes();
        match api::load_failure(&output) {
            Some(message) => Err(EngineError::Load(message)),
            None => Ok(()),
        }
    }

    async fn list_images(&self) -> Result<Vec<ImageSummary>, EngineError> {
        let images: Vec<ApiImage> = self.get_json(self.url("/images/json")).await?;
        Ok(images.into_iter().map(Into::into).collect())
    }

    async fn list_containers(&self) -> Result<Vec<ContainerRecord>, EngineError> {
        let containers: Vec<ApiContainer> = self.get_json(self.url("/containers/json")).await?;
        Ok(containers.into_iter().map(Into::into).collect())
    }

    async fn stop_container(&self, id: &str) -> Result<(), EngineError> {
        let status = self
            .post_action(self.url(&format!("/containers/{}/stop", encode_query(id))))
            .await?;
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(container_id = %id, "Container was already stopped");
        }
        Ok(())
    }

    async fn create_container(&self, spec: &ContainerSpec) -> Result<String, EngineError> {
        let payload = serde_json::to_vec(&CreateContainerBody::from(spec))
            .map_err(|e| EngineError::Decode(e.to_string()))?;
        let uri = self.url(&format!("/containers/create?name={}", encode_query(&spec.name)));
        let response = self
            .send_timed(
                Method::POST,
                uri,
                Some("application/json"),
                json_body(payload),
            )
            .await?;
        let created: CreateResponse = self.read_json(response).await?;

        for warning in created.warnings.unwrap_or_default() {
            tracing::warn!(container_id = %created.id, "Engine warning: {}", warning);
        }
        Ok(created.id)
    }

    async fn start_container(&self, id: &str) -> Result<(), EngineError> {
        let status = self
            .post_action(self.url(&format!("/containers/{}/start", encode_query(id))))
            .await?;
        if status == StatusCode::NOT_MODIFIED {
            tracing::debug!(container_id = %id, "Container was already running");
        }
        Ok(())
    }
}
