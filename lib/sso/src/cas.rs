//! CAS protocol client using reqwest.
//!
//! Speaks CAS protocol 3.0 with JSON responses:
//! - `login` and `logout` for browser redirects
//! - `p3/serviceValidate` for service ticket validation, with `pgtUrl` in
//!   proxy mode so the server delivers a proxy-granting ticket
//! - `proxy` for proxy ticket retrieval

use async_trait::async_trait;
use mailgate_core::{PgtIou, Principal, ProxyTicket, ServiceTicket};
use rootcause::Report;
use serde::Deserialize;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};
use url::Url;

use crate::client::{Authentication, ClientSettings, PgtCallback, SsoAdapter, SsoClient};
use crate::config::{SsoConfig, TlsValidation};
use crate::error::SsoError;
use crate::pgt::PgtStore;
use crate::session::SsoSession;

/// Process-wide CAS adapter.
///
/// Holds the HTTP client (with the configured TLS policy) and the
/// proxy-granting ticket store; cheap to clone.
#[derive(Clone)]
pub struct CasAdapter {
    inner: Arc<CasInner>,
}

struct CasInner {
    base_url: Url,
    login_url: Option<String>,
    logout_url: Option<String>,
    http: reqwest::Client,
    pgt_store: Arc<dyn PgtStore>,
}

impl CasAdapter {
    /// Creates an adapter from configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if the server URL is invalid, the configured
    /// certificate cannot be loaded, or the HTTP client cannot be built.
    pub fn new(config: &SsoConfig, pgt_store: Arc<dyn PgtStore>) -> Result<Self, Report<SsoError>> {
        let mut builder = reqwest::Client::builder()
            .timeout(config.timeout())
            .redirect(reqwest::redirect::Policy::none());

        match config.tls_validation()? {
            TlsValidation::None => {
                warn!(
                    hostname = config.hostname(),
                    "SSO server certificate validation is disabled"
                );
                builder = builder.danger_accept_invalid_certs(true);
            }
            TlsValidation::SelfSigned(path) | TlsValidation::Ca(path) => {
                let pem = std::fs::read(&path).map_err(|e| SsoError::Certificate {
                    path: path.display().to_string(),
                    reason: e.to_string(),
                })?;
                let cert = reqwest::Certificate::from_pem(&pem).map_err(|e| {
                    SsoError::Certificate {
                        path: path.display().to_string(),
                        reason: e.to_string(),
                    }
                })?;
                builder = builder
                    .tls_built_in_root_certs(false)
                    .add_root_certificate(cert);
            }
        }

        let http = builder.build().map_err(|e| SsoError::Configuration {
            reason: format!("failed to create HTTP client: {e}"),
        })?;

        Ok(Self::with_http_client(
            config.server_base_url()?,
            config.login_url().map(str::to_string),
            config.logout_url().map(str::to_string),
            http,
            pgt_store,
        ))
    }

    /// Creates an adapter around an existing HTTP client and base URL.
    ///
    /// `base_url` must end in `/`; endpoint paths are joined onto it.
    #[must_use]
    pub fn with_http_client(
        base_url: Url,
        login_url: Option<String>,
        logout_url: Option<String>,
        http: reqwest::Client,
        pgt_store: Arc<dyn PgtStore>,
    ) -> Self {
        Self {
            inner: Arc::new(CasInner {
                base_url,
                login_url,
                logout_url,
                http,
                pgt_store,
            }),
        }
    }
}

impl SsoAdapter for CasAdapter {
    type Client = CasClient;

    fn initialize(&self, settings: ClientSettings) -> Result<CasClient, Report<SsoError>> {
        if settings.mode.is_proxy() && settings.callback_url.is_none() {
            return Err(SsoError::Configuration {
                reason: "proxy mode requires a callback URL".to_string(),
            }
            .into());
        }
        Ok(CasClient {
            inner: Arc::clone(&self.inner),
            settings,
        })
    }
}

/// CAS client configured for one request.
pub struct CasClient {
    inner: Arc<CasInner>,
    settings: ClientSettings,
}

/// What a successful validation yields.
#[derive(Debug, Clone, PartialEq, Eq)]
struct Validated {
    principal: Principal,
    pgt_iou: Option<PgtIou>,
}

#[derive(Deserialize)]
struct Envelope<T> {
    #[serde(rename = "serviceResponse")]
    service_response: T,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ValidationResponse {
    authentication_success: Option<AuthenticationSuccess>,
    authentication_failure: Option<Failure>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct AuthenticationSuccess {
    user: String,
    proxy_granting_ticket: Option<String>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxyResponse {
    proxy_success: Option<ProxySuccess>,
    proxy_failure: Option<Failure>,
}

#[derive(Deserialize)]
#[serde(rename_all = "camelCase")]
struct ProxySuccess {
    proxy_ticket: String,
}

#[derive(Deserialize)]
struct Failure {
    code: String,
    #[serde(default)]
    description: String,
}

fn malformed(endpoint: &Url, reason: impl Into<String>) -> SsoError {
    SsoError::MalformedResponse {
        endpoint: endpoint.path().to_string(),
        reason: reason.into(),
    }
}

fn parse_validation(endpoint: &Url, body: &[u8]) -> Result<Validated, Report<SsoError>> {
    let envelope: Envelope<ValidationResponse> =
        serde_json::from_slice(body).map_err(|e| malformed(endpoint, e.to_string()))?;

    match envelope.service_response {
        ValidationResponse {
            authentication_success: Some(success),
            ..
        } => {
            let principal =
                Principal::new(success.user).map_err(|e| malformed(endpoint, e.to_string()))?;
            let pgt_iou = success
                .proxy_granting_ticket
                .map(PgtIou::new)
                .transpose()
                .map_err(|e| malformed(endpoint, e.to_string()))?;
            Ok(Validated { principal, pgt_iou })
        }
        ValidationResponse {
            authentication_failure: Some(failure),
            ..
        } => Err(SsoError::TicketRejected {
            code: failure.code,
            description: failure.description.trim().to_string(),
        }
        .into()),
        _ => Err(malformed(endpoint, "neither success nor failure").into()),
    }
}

fn parse_proxy(endpoint: &Url, body: &[u8]) -> Result<ProxyTicket, Report<SsoError>> {
    let envelope: Envelope<ProxyResponse> =
        serde_json::from_slice(body).map_err(|e| malformed(endpoint, e.to_string()))?;

    match envelope.service_response {
        ProxyResponse {
            proxy_success: Some(success),
            ..
        } => ProxyTicket::new(success.proxy_ticket)
            .map_err(|e| malformed(endpoint, e.to_string()).into()),
        ProxyResponse {
            proxy_failure: Some(failure),
            ..
        } => Err(SsoError::ProxyTicketRejected {
            code: failure.code,
            description: failure.description.trim().to_string(),
        }
        .into()),
        _ => Err(malformed(endpoint, "neither success nor failure").into()),
    }
}

impl CasClient {
    /// Returns the settings this client was initialized with.
    #[must_use]
    pub fn settings(&self) -> &ClientSettings {
        &self.settings
    }

    fn endpoint(&self, path: &str) -> Result<Url, Report<SsoError>> {
        self.inner.base_url.join(path).map_err(|e| {
            SsoError::Configuration {
                reason: format!("invalid endpoint '{path}': {e}"),
            }
            .into()
        })
    }

    fn override_or(&self, over: Option<&str>, path: &str) -> Result<Url, Report<SsoError>> {
        match over {
            Some(raw) => Url::parse(raw).map_err(|e| {
                SsoError::Configuration {
                    reason: format!("invalid URL override '{raw}': {e}"),
                }
                .into()
            }),
            None => self.endpoint(path),
        }
    }

    /// Returns the login URL carrying this client's service URL.
    ///
    /// # Errors
    ///
    /// Returns an error if a configured login URL override is not a URL.
    pub fn login_url(&self) -> Result<String, Report<SsoError>> {
        let mut url = self.override_or(self.inner.login_url.as_deref(), "login")?;
        url.query_pairs_mut()
            .append_pair("service", &self.settings.service_url);
        Ok(url.into())
    }

    async fn get(&self, url: Url) -> Result<Vec<u8>, Report<SsoError>> {
        let transport = |reason: String| SsoError::Transport {
            endpoint: url.path().to_string(),
            reason,
        };

        let response = self
            .inner
            .http
            .get(url.clone())
            .send()
            .await
            .map_err(|e| transport(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(transport(format!("HTTP status {status}")).into());
        }

        let body = response
            .bytes()
            .await
            .map_err(|e| transport(e.to_string()))?;
        Ok(body.to_vec())
    }

    #[instrument(skip(self, ticket), fields(proxy = self.settings.mode.is_proxy()))]
    async fn validate(&self, ticket: &ServiceTicket) -> Result<Validated, Report<SsoError>> {
        let mut url = self.endpoint("p3/serviceValidate")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs
                .append_pair("service", &self.settings.service_url)
                .append_pair("ticket", ticket.as_str())
                .append_pair("format", "JSON");
            if let (true, Some(callback)) =
                (self.settings.mode.is_proxy(), &self.settings.callback_url)
            {
                pairs.append_pair("pgtUrl", callback);
            }
        }

        let endpoint = url.clone();
        let body = self.get(url).await?;
        parse_validation(&endpoint, &body)
    }
}

#[async_trait]
impl SsoClient for CasClient {
    async fn force_authentication(
        &self,
        ticket: Option<&ServiceTicket>,
        session: &mut SsoSession,
    ) -> Result<Authentication, Report<SsoError>> {
        let proxy = self.settings.mode.is_proxy();
        if let (true, Some(principal)) = (session.is_authenticated(proxy), session.principal()) {
            return Ok(Authentication::Authenticated(principal.clone()));
        }

        let Some(ticket) = ticket else {
            debug!("no service ticket, redirecting to SSO login");
            return Ok(Authentication::Redirect(self.login_url()?));
        };

        let validated = self.validate(ticket).await?;

        let pgt = if proxy {
            let iou = validated.pgt_iou.ok_or_else(|| SsoError::PgtUnavailable {
                iou: "<none>".to_string(),
            })?;
            let pgt = self
                .inner
                .pgt_store
                .take(&iou)
                .await?
                .ok_or_else(|| SsoError::PgtUnavailable {
                    iou: iou.to_string(),
                })?;
            Some(pgt)
        } else {
            None
        };

        info!(principal = %validated.principal, "SSO ticket validated");
        session.establish(validated.principal.clone(), pgt);
        Ok(Authentication::Authenticated(validated.principal))
    }

    #[instrument(skip(self, session))]
    async fn fetch_proxy_ticket(
        &self,
        session: &SsoSession,
        target_service: &str,
    ) -> Result<ProxyTicket, Report<SsoError>> {
        let pgt = session.pgt().ok_or(SsoError::NotAuthenticated)?;

        let mut url = self.endpoint("proxy")?;
        url.query_pairs_mut()
            .append_pair("targetService", target_service)
            .append_pair("pgt", pgt.as_str())
            .append_pair("format", "JSON");

        let endpoint = url.clone();
        let body = self.get(url).await?;
        let ticket = parse_proxy(&endpoint, &body)?;
        debug!("proxy ticket issued");
        Ok(ticket)
    }

    async fn logout(&self) -> Result<String, Report<SsoError>> {
        let url = self.override_or(self.inner.logout_url.as_deref(), "logout")?;
        Ok(url.into())
    }

    async fn receive_pgt_callback(&self, callback: PgtCallback) -> Result<(), Report<SsoError>> {
        match (callback.iou, callback.pgt) {
            (Some(iou), Some(pgt)) => self.inner.pgt_store.put(&iou, pgt).await,
            (None, None) => {
                debug!("PGT callback probe");
                Ok(())
            }
            _ => {
                warn!("PGT callback with incomplete parameters ignored");
                Ok(())
            }
        }
    }
}
