//! HTTP session shared by the client and its modules.
use std::{
    sync::{
        atomic::{AtomicU64, Ordering},
        Arc, PoisonError, RwLock,
    },
    time::Duration,
};

use reqwest::{Method, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use tokio_util::sync::CancellationToken;
use url::Url;

use crate::{ConnectionOptions, Error, Result};

/// Header carrying the API key on every authenticated request.
pub const API_KEY_HEADER: &str = "x-api-key";

static NEXT_SESSION_ID: AtomicU64 = AtomicU64::new(1);

/// An open HTTP session to SPACE.
///
/// A session wraps one connection pool and is meant to be reused between requests. Sessions are
/// handed out by a [`SessionProvider`]; modules never create or close them.
#[derive(Debug)]
pub struct Session {
    id: u64,
    // Client holds a connection pool internally, so we're reusing the client between requests.
    http: reqwest::Client,
    base_url: Url,
    api_key: String,
    health_check_timeout: Duration,
    upload_timeout: Duration,
    cancellation: CancellationToken,
}

/// Status and body of a completed exchange.
#[derive(Debug)]
pub(crate) struct RawResponse {
    pub status: StatusCode,
    pub body: Vec<u8>,
}

impl RawResponse {
    pub(crate) fn body_text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    /// Decode a 2xx body or turn any other status into [`Error::Remote`].
    pub(crate) fn json<T: DeserializeOwned>(self) -> Result<T> {
        if !self.status.is_success() {
            return Err(self.into_remote_error());
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub(crate) fn into_remote_error(self) -> Error {
        let body = self.body_text();
        Error::Remote {
            status: self.status,
            body,
        }
    }
}

impl Session {
    fn open(options: &ConnectionOptions) -> Result<Session> {
        let base_url = options.http_base_url()?;
        let http = reqwest::Client::builder().timeout(options.timeout).build()?;

        Ok(Session {
            id: NEXT_SESSION_ID.fetch_add(1, Ordering::Relaxed),
            http,
            base_url,
            api_key: options.api_key.clone(),
            health_check_timeout: options.health_check_timeout,
            upload_timeout: options.upload_timeout,
            cancellation: CancellationToken::new(),
        })
    }

    /// Process-unique identifier of this session. A recreated session gets a new id.
    pub fn id(&self) -> u64 {
        self.id
    }

    /// Returns `true` once the session has been closed.
    pub fn is_closed(&self) -> bool {
        self.cancellation.is_cancelled()
    }

    /// Base url of the REST API.
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub(crate) fn health_check_timeout(&self) -> Duration {
        self.health_check_timeout
    }

    pub(crate) fn upload_timeout(&self) -> Duration {
        self.upload_timeout
    }

    /// Build the url of `segments` below the base url. Segments are percent-encoded.
    pub(crate) fn endpoint(&self, segments: &[&str]) -> Result<Url> {
        let mut url = self.base_url.clone();
        url.path_segments_mut()
            .map_err(|()| Error::InvalidBaseUrl(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .extend(segments);
        Ok(url)
    }

    /// Like [`Session::endpoint`], appending `query` pairs when there are any.
    pub(crate) fn endpoint_with_query(
        &self,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<Url> {
        let mut url = self.endpoint(segments)?;
        if !query.is_empty() {
            url.query_pairs_mut().extend_pairs(query);
        }
        Ok(url)
    }

    /// Start an authenticated request.
    pub(crate) fn request(&self, method: Method, segments: &[&str]) -> Result<RequestBuilder> {
        self.request_with_query(method, segments, &[])
    }

    /// Start an authenticated request with query parameters.
    pub(crate) fn request_with_query(
        &self,
        method: Method,
        segments: &[&str],
        query: &[(&str, &str)],
    ) -> Result<RequestBuilder> {
        Ok(self
            .http
            .request(method, self.endpoint_with_query(segments, query)?)
            .header(API_KEY_HEADER, &self.api_key))
    }

    /// Start a request that does not carry the API key.
    pub(crate) fn unauthenticated(
        &self,
        method: Method,
        segments: &[&str],
    ) -> Result<RequestBuilder> {
        Ok(self.http.request(method, self.endpoint(segments)?))
    }

    /// Send `request` and read the whole body.
    ///
    /// Resolves to [`Error::Cancelled`] if the session is closed while the exchange is in flight.
    pub(crate) async fn execute(&self, request: RequestBuilder) -> Result<RawResponse> {
        let exchange = async {
            let response = request.send().await?;
            let status = response.status();
            let body = response.bytes().await?;
            Ok::<_, Error>(RawResponse {
                status,
                body: body.to_vec(),
            })
        };

        tokio::select! {
            biased;
            _ = self.cancellation.cancelled() => {
                log::debug!(target: "space", session_id = self.id; "request cancelled by session close");
                Err(Error::Cancelled)
            }
            result = exchange => result,
        }
    }

    /// Send `request` and decode a JSON body from a 2xx response.
    pub(crate) async fn send_json<T: DeserializeOwned>(&self, request: RequestBuilder) -> Result<T> {
        self.execute(request).await?.json()
    }

    fn close(&self) {
        self.cancellation.cancel();
    }
}

/// Capability to obtain the current session.
///
/// Modules receive a provider instead of a reference to the owning [`Client`](crate::Client), so
/// they can be built and tested independently.
pub trait SessionProvider: Send + Sync {
    /// Return the open session, creating one if there is none.
    fn session(&self) -> Result<Arc<Session>>;
}

/// `SessionStore` lazily creates a [`Session`], hands it out to readers and recreates it after
/// [`SessionStore::close`].
#[derive(Debug)]
pub struct SessionStore {
    options: ConnectionOptions,
    session: RwLock<Option<Arc<Session>>>,
}

impl SessionStore {
    /// Create a store. No session is opened until the first call to [`SessionProvider::session`].
    pub fn new(options: ConnectionOptions) -> SessionStore {
        SessionStore {
            options,
            session: RwLock::new(None),
        }
    }

    /// Options sessions are created from.
    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Close the current session, if any. In-flight requests resolve to [`Error::Cancelled`].
    pub fn close(&self) {
        let previous = self
            .session
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .take();

        if let Some(session) = previous {
            log::debug!(target: "space", session_id = session.id; "closing session");
            session.close();
        }
    }

    /// Returns `true` if a session is currently open.
    pub fn is_open(&self) -> bool {
        self.session
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .is_some_and(|session| !session.is_closed())
    }
}

impl SessionProvider for SessionStore {
    fn session(&self) -> Result<Arc<Session>> {
        {
            let slot = self.session.read().unwrap_or_else(PoisonError::into_inner);
            if let Some(session) = slot.as_ref().filter(|session| !session.is_closed()) {
                return Ok(Arc::clone(session));
            }
        }

        let mut slot = self.session.write().unwrap_or_else(PoisonError::into_inner);
        // Another task might have opened a session while we were waiting for the write lock.
        if let Some(session) = slot.as_ref().filter(|session| !session.is_closed()) {
            return Ok(Arc::clone(session));
        }

        let session = Arc::new(Session::open(&self.options)?);
        log::debug!(target: "space", session_id = session.id; "opened session");
        *slot = Some(Arc::clone(&session));
        Ok(session)
    }
}

impl Drop for SessionStore {
    fn drop(&mut self) {
        self.close();
    }
}
