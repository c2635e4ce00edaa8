use std::{
    io::ErrorKind,
    path::{Path, PathBuf},
    sync::Arc,
};

use reqwest::{
    multipart::{Form, Part},
    Method,
};
use serde::Serialize;
use url::Url;

use crate::{
    pricing::{Availability, FallbackSubscription, Pricing, Service},
    session::{Session, SessionProvider},
    Error, Result,
};

/// Multipart field carrying a pricing file.
const PRICING_FIELD: &str = "pricing";
const YAML_MIME: &str = "application/yaml";

/// Source of a new pricing version.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PricingUpload {
    /// A pricing file SPACE downloads itself.
    RemoteUrl(Url),
    /// A pricing file on the local disk, uploaded as multipart form data.
    LocalFile(PathBuf),
    /// Raw pricing file contents, uploaded as multipart form data.
    Bytes(Vec<u8>),
}

impl PricingUpload {
    /// Build an upload from the two optional sources. Exactly one of them must be given; empty
    /// values count as absent.
    ///
    /// `url` is treated as a remote url when it starts with `http://` or `https://` and as a
    /// local path otherwise.
    ///
    /// ```
    /// # use space_client::PricingUpload;
    /// assert!(PricingUpload::from_parts(None, None).is_err());
    /// assert!(PricingUpload::from_parts(Some("pricing.yml"), Some(b"x".to_vec())).is_err());
    /// assert!(matches!(
    ///     PricingUpload::from_parts(Some("https://example.com/pricing.yml"), None),
    ///     Ok(PricingUpload::RemoteUrl(_))
    /// ));
    /// ```
    pub fn from_parts(url: Option<&str>, service_file: Option<Vec<u8>>) -> Result<PricingUpload> {
        let url = url.filter(|url| !url.is_empty());
        let service_file = service_file.filter(|bytes| !bytes.is_empty());

        match (url, service_file) {
            (None, None) => Err(Error::invalid_argument(
                "Either url or service_file is required",
            )),
            (Some(_), Some(_)) => Err(Error::invalid_argument(
                "Only one of url or service_file is allowed, not both",
            )),
            (Some(url), None) => PricingUpload::from_location(url),
            (None, Some(bytes)) => Ok(PricingUpload::Bytes(bytes)),
        }
    }

    /// Interpret `location` as a remote url or a local path.
    pub fn from_location(location: &str) -> Result<PricingUpload> {
        if location.starts_with("http://") || location.starts_with("https://") {
            let url = Url::parse(location).map_err(|err| {
                Error::invalid_argument(format!("Invalid pricing url '{location}': {err}"))
            })?;
            return Ok(PricingUpload::RemoteUrl(url));
        }

        let path = Path::new(location);
        let path = if path.is_absolute() {
            path.to_owned()
        } else {
            std::env::current_dir()?.join(path)
        };
        Ok(PricingUpload::LocalFile(path))
    }
}

#[derive(Debug, Serialize)]
struct RemotePricing<'a> {
    pricing: &'a str,
}

/// Service and pricing catalog management.
pub struct ServiceModule {
    sessions: Arc<dyn SessionProvider>,
}

impl ServiceModule {
    /// Create a module issuing requests through `sessions`.
    pub fn new(sessions: Arc<dyn SessionProvider>) -> ServiceModule {
        ServiceModule { sessions }
    }

    /// Fetch a service with `GET /services/{name}`.
    pub async fn get_service(&self, service_name: &str) -> Result<Service> {
        let session = self.sessions.session()?;
        log::debug!(target: "space", service = service_name; "fetching service");

        session
            .send_json(session.request(Method::GET, &["services", service_name])?)
            .await
            .inspect_err(|err| {
                log::warn!(target: "space", service = service_name; "error fetching service: {}", err);
            })
    }

    /// Fetch one pricing version with `GET /services/{name}/pricings/{version}`.
    pub async fn get_pricing(&self, service_name: &str, pricing_version: &str) -> Result<Pricing> {
        let session = self.sessions.session()?;
        log::debug!(target: "space", service = service_name, version = pricing_version; "fetching pricing");

        session
            .send_json(session.request(
                Method::GET,
                &["services", service_name, "pricings", pricing_version],
            )?)
            .await
            .inspect_err(|err| {
                log::warn!(target: "space", service = service_name, version = pricing_version; "error fetching pricing: {}", err);
            })
    }

    /// Add a pricing version to a service with `POST /services/{name}/pricings`.
    ///
    /// Exactly one of `url` and `service_file` must be given. See [`PricingUpload::from_parts`].
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] without sending a request if both or neither source is
    /// given, and [`Error::FileNotFound`] if `url` points to a missing local file.
    pub async fn add_pricing(
        &self,
        service_name: &str,
        url: Option<&str>,
        service_file: Option<Vec<u8>>,
    ) -> Result<Service> {
        let upload = PricingUpload::from_parts(url, service_file)?;
        self.add_pricing_from(service_name, upload).await
    }

    /// Add a pricing version to a service from an explicit [`PricingUpload`].
    pub async fn add_pricing_from(
        &self,
        service_name: &str,
        upload: PricingUpload,
    ) -> Result<Service> {
        let segments = ["services", service_name, "pricings"];

        let result = match upload {
            PricingUpload::RemoteUrl(url) => {
                let session = self.sessions.session()?;
                log::debug!(target: "space", service = service_name, url = url.as_str(); "adding pricing from remote url");

                let body = RemotePricing {
                    pricing: url.as_str(),
                };
                session
                    .send_json(session.request(Method::POST, &segments)?.json(&body))
                    .await
            }
            PricingUpload::LocalFile(path) => {
                let (file_name, bytes) = read_pricing_file(&path).await?;
                log::debug!(target: "space", service = service_name, file = file_name.as_str(); "uploading pricing file");
                self.upload(&segments, file_name, bytes).await
            }
            PricingUpload::Bytes(bytes) => {
                let file_name = format!("{}.yaml", chrono::Utc::now().timestamp_millis());
                log::debug!(target: "space", service = service_name, file = file_name.as_str(); "uploading pricing bytes");
                self.upload(&segments, file_name, bytes).await
            }
        };

        result.inspect_err(|err| {
            log::warn!(target: "space", service = service_name; "error adding pricing: {}", err);
        })
    }

    /// Change the availability of a pricing version with
    /// `PATCH /services/{name}/pricings/{version}?availability={availability}`.
    ///
    /// # Errors
    ///
    /// Returns [`Error::InvalidArgument`] without sending a request when archiving without a
    /// `fallback_subscription`.
    pub async fn change_pricing_availability(
        &self,
        service_name: &str,
        pricing_version: &str,
        availability: Availability,
        fallback_subscription: Option<&FallbackSubscription>,
    ) -> Result<Service> {
        if availability == Availability::Archived && fallback_subscription.is_none() {
            return Err(Error::invalid_argument(
                "Fallback subscription is required when archiving a pricing version",
            ));
        }

        let session = self.sessions.session()?;
        log::debug!(target: "space",
            service = service_name,
            version = pricing_version,
            availability = availability.as_str();
            "changing pricing availability");

        let mut request = session.request_with_query(
            Method::PATCH,
            &["services", service_name, "pricings", pricing_version],
            &[("availability", availability.as_str())],
        )?;
        if let Some(fallback_subscription) = fallback_subscription {
            request = request.json(fallback_subscription);
        }

        session.send_json(request).await.inspect_err(|err| {
            log::warn!(target: "space",
                service = service_name,
                version = pricing_version;
                "error changing pricing availability: {}", err);
        })
    }

    /// Create a new service from a pricing file with `POST /services`.
    ///
    /// The file is uploaded as `application/yaml` under the upload timeout (30 s by default).
    ///
    /// # Errors
    ///
    /// Returns [`Error::FileNotFound`] without sending a request if `file_path` does not exist.
    pub async fn add_service(&self, file_path: impl AsRef<Path>) -> Result<Service> {
        let file_path = file_path.as_ref();
        let (file_name, bytes) = read_pricing_file(file_path).await?;
        log::debug!(target: "space", file = file_name.as_str(); "creating service");

        self.upload(&["services"], file_name, bytes)
            .await
            .inspect_err(|err| {
                log::warn!(target: "space", file = file_path.display().to_string(); "error creating service: {}", err);
            })
    }

    async fn upload(&self, segments: &[&str], file_name: String, bytes: Vec<u8>) -> Result<Service> {
        let session = self.sessions.session()?;
        let form = pricing_form(file_name, bytes)?;
        send_upload(&session, segments, form).await
    }
}

async fn send_upload(session: &Session, segments: &[&str], form: Form) -> Result<Service> {
    let request = session
        .request(Method::POST, segments)?
        .multipart(form)
        .timeout(session.upload_timeout());
    session.send_json(request).await
}

fn pricing_form(file_name: String, bytes: Vec<u8>) -> Result<Form> {
    let part = Part::bytes(bytes).file_name(file_name).mime_str(YAML_MIME)?;
    Ok(Form::new().part(PRICING_FIELD, part))
}

/// Read a pricing file, returning its base name and contents.
async fn read_pricing_file(path: &Path) -> Result<(String, Vec<u8>)> {
    let bytes = match tokio::fs::read(path).await {
        Ok(bytes) => bytes,
        Err(err) if err.kind() == ErrorKind::NotFound => {
            log::warn!(target: "space", file = path.display().to_string(); "pricing file not found");
            return Err(Error::FileNotFound(path.to_owned()));
        }
        Err(err) => return Err(err.into()),
    };

    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "pricing.yaml".to_owned());

    Ok((file_name, bytes))
}
