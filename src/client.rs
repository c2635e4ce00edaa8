use std::sync::Arc;

use reqwest::{Method, StatusCode};
use serde::Deserialize;
use url::Url;

#[cfg(doc)]
use crate::Error;
use crate::{
    session::{Session, SessionProvider, SessionStore},
    ConnectionOptions, ContractModule, FeatureModule, Result, ServiceModule,
};

/// A client for the SPACE API.
///
/// In order to create a client instance, first create [`ConnectionOptions`] and call
/// [`connect`](crate::connect).
///
/// # Session
///
/// The client owns a single HTTP [`Session`] that is created on first use and reused by every
/// module. [`Client::close`] releases it; the next request transparently opens a new one. The
/// session is also released when the client is dropped, so leaving a scope (normally, through
/// `?`, or by cancelling the surrounding future) always closes it.
///
/// # Examples
/// ```no_run
/// # async fn run() -> space_client::Result<()> {
/// use space_client::ConnectionOptions;
///
/// let client = ConnectionOptions::new("http://localhost:5403", "api-key").connect()?;
/// if client.is_connected_to_space().await {
///     let contract = client.contracts().get_contracts("user-1").await?;
///     println!("{:?}", contract.subscription_plans);
/// }
/// # Ok(())
/// # }
/// ```
pub struct Client {
    sessions: Arc<SessionStore>,
    contracts: ContractModule,
    features: FeatureModule,
    services: ServiceModule,
}

#[derive(Debug, Deserialize)]
struct HealthCheck {
    #[serde(default)]
    message: Option<String>,
}

impl Client {
    /// Create a new `Client` using the specified options.
    ///
    /// Options are not validated here, prefer [`connect`](crate::connect) or
    /// [`ConnectionOptions::connect`].
    pub fn new(options: ConnectionOptions) -> Client {
        let sessions = Arc::new(SessionStore::new(options));
        let provider: Arc<dyn SessionProvider> = sessions.clone();

        Client {
            contracts: ContractModule::new(Arc::clone(&provider)),
            features: FeatureModule::new(Arc::clone(&provider)),
            services: ServiceModule::new(provider),
            sessions,
        }
    }

    /// Contract management.
    pub fn contracts(&self) -> &ContractModule {
        &self.contracts
    }

    /// Feature evaluation and pricing tokens.
    pub fn features(&self) -> &FeatureModule {
        &self.features
    }

    /// Service and pricing catalog management.
    pub fn services(&self) -> &ServiceModule {
        &self.services
    }

    /// Base url of the REST API, e.g. `http://localhost:5403/api/v1`.
    pub fn http_base_url(&self) -> Result<Url> {
        self.sessions.options().http_base_url()
    }

    /// Return the open session or lazily create one.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Transport`] if the HTTP client cannot be initialized.
    pub fn session(&self) -> Result<Arc<Session>> {
        self.sessions.session()
    }

    /// Returns `true` if a session is currently open.
    pub fn is_open(&self) -> bool {
        self.sessions.is_open()
    }

    /// Check whether the SPACE instance is reachable and healthy.
    ///
    /// Issues `GET /healthcheck` without the API key, bounded by the health check timeout (5 s
    /// by default). Returns `true` only for a `200 OK` whose JSON body has a non-empty `message`.
    /// Never fails: timeouts, connection errors and malformed bodies all resolve to `false`.
    pub async fn is_connected_to_space(&self) -> bool {
        let session = match self.session() {
            Ok(session) => session,
            Err(err) => {
                log::warn!(target: "space", "cannot open session for health check: {:?}", err);
                return false;
            }
        };

        let request = match session.unauthenticated(Method::GET, &["healthcheck"]) {
            Ok(request) => request.timeout(session.health_check_timeout()),
            Err(err) => {
                log::warn!(target: "space", "cannot build health check request: {:?}", err);
                return false;
            }
        };

        let response = match session.execute(request).await {
            Ok(response) => response,
            Err(err) => {
                log::warn!(target: "space", "health check failed: {}", err);
                return false;
            }
        };

        if response.status != StatusCode::OK {
            log::warn!(target: "space", status = response.status.as_u16(); "health check returned non-200 status");
            return false;
        }

        match serde_json::from_slice::<HealthCheck>(&response.body) {
            Ok(HealthCheck { message }) => message.is_some_and(|message| !message.is_empty()),
            Err(err) => {
                log::warn!(target: "space", "failed to parse health check body: {:?}", err);
                false
            }
        }
    }

    /// Close the current session. Requests still in flight resolve to [`Error::Cancelled`].
    ///
    /// The client remains usable: the next request opens a new session.
    pub fn close(&self) {
        self.sessions.close();
    }
}

impl Drop for Client {
    fn drop(&mut self) {
        self.close();
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use crate::{connect, ConnectionOptions};

    #[test]
    fn connect_does_not_open_a_session() {
        let client = connect(ConnectionOptions::new("http://localhost:5403", "key")).unwrap();
        assert!(!client.is_open());
    }

    #[test]
    fn sequential_operations_share_the_session() {
        let client = connect(ConnectionOptions::new("http://localhost:5403", "key")).unwrap();

        let first = client.session().unwrap();
        let second = client.session().unwrap();
        assert!(Arc::ptr_eq(&first, &second));

        client.close();
        let third = client.session().unwrap();
        assert!(first.is_closed());
        assert_ne!(first.id(), third.id());
    }

    #[test]
    fn dropping_the_client_closes_the_session() {
        let client = connect(ConnectionOptions::new("http://localhost:5403", "key")).unwrap();
        let session = client.session().unwrap();

        drop(client);
        assert!(session.is_closed());
    }
}
