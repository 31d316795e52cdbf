//! The authentication state machine.
//!
//! A [`Gateway`] holds the process-wide configuration and SSO adapter. For
//! every inbound request the host opens an [`Exchange`] and feeds it the
//! lifecycle events of that request in order. The exchange rewrites event
//! payloads or takes over the response; SSO failures never escape it and are
//! turned into the host's own failure paths instead.

use mailgate_core::{ProxyTicket, Result, ServiceTicket};
use mailgate_sso::{
    Authentication, ClientSettings, PgtCallback, SsoAdapter, SsoClient, SsoError,
};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tracing::{debug, info, instrument, warn};

use crate::config::GatewayConfig;
use crate::context::RequestContext;
use crate::error::GatewayError;
use crate::event::{
    BackendConnect, Credentials, HookOutcome, InterceptedEvent, LOGIN_TEMPLATE,
    PGT_CALLBACK_ACTION, Redirect, SSO_LOGOUT_ACTION, Termination,
};
use crate::page::ErrorPage;
use crate::params::ActionParams;
use crate::return_url;
use crate::session::Session;
use crate::urls::UrlBuilder;

/// Query parameter the SSO server returns the service ticket in.
const TICKET_PARAM: &str = "ticket";

/// The host's own login action.
fn login_action() -> ActionParams {
    ActionParams::new().with("action", "login").with("task", "mail")
}

/// Shared configuration and adapter, one per process.
#[derive(Debug)]
pub struct Gateway<A: SsoAdapter> {
    config: Arc<GatewayConfig>,
    adapter: A,
}

impl<A: SsoAdapter> Gateway<A> {
    #[must_use]
    pub fn new(config: GatewayConfig, adapter: A) -> Self {
        Self {
            config: Arc::new(config),
            adapter,
        }
    }

    #[must_use]
    pub fn config(&self) -> &GatewayConfig {
        &self.config
    }

    #[must_use]
    pub fn adapter(&self) -> &A {
        &self.adapter
    }

    /// Opens the exchange for one inbound request.
    #[must_use]
    pub fn exchange(&self, ctx: RequestContext) -> Exchange<'_, A> {
        Exchange {
            gateway: self,
            ctx,
            client: OnceCell::new(),
            phase: Phase::Unauthenticated,
            terminated: false,
        }
    }

    /// Settings for a client serving `ctx`.
    ///
    /// The service URL always points at the host's login action so it is
    /// identical between the login redirect and ticket validation.
    fn client_settings(&self, ctx: &RequestContext) -> ClientSettings {
        let urls = UrlBuilder::new(ctx);
        let mode = self.config.mode();
        ClientSettings {
            mode,
            service_url: urls.build(&login_action()),
            callback_url: mode
                .is_proxy()
                .then(|| urls.build(&ActionParams::new().with("action", PGT_CALLBACK_ACTION))),
        }
    }
}

/// Where an exchange stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    /// Nothing is known about the user yet.
    Unauthenticated,
    /// The SSO server is verifying the user.
    AuthenticationInProgress,
    /// The user's identity is established.
    Authenticated,
    /// Credentials are being prepared for a backend connection.
    BackendConnecting,
    /// The SSO-side session is being ended.
    LoggingOut,
    /// The backend rejected the login.
    Failed,
}

/// One request's pass through the gateway.
pub struct Exchange<'g, A: SsoAdapter> {
    gateway: &'g Gateway<A>,
    ctx: RequestContext,
    client: OnceCell<A::Client>,
    phase: Phase,
    terminated: bool,
}

impl<A: SsoAdapter> Exchange<'_, A> {
    /// Returns the current phase.
    #[must_use]
    pub fn phase(&self) -> Phase {
        self.phase
    }

    /// Returns true once the gateway has taken over the response.
    #[must_use]
    pub fn is_terminated(&self) -> bool {
        self.terminated
    }

    /// Returns the request this exchange serves.
    #[must_use]
    pub fn context(&self) -> &RequestContext {
        &self.ctx
    }

    /// Handles one host event.
    ///
    /// `session` is the user's host session when one exists. Startup events
    /// run before the host has a session and never read it.
    ///
    /// # Errors
    ///
    /// Returns `Terminated` if an earlier event already ended the exchange,
    /// and `SessionRequired` if an event that needs the session arrives
    /// without one.
    #[instrument(skip_all, fields(event = event.name()))]
    pub async fn handle(
        &mut self,
        event: InterceptedEvent,
        session: Option<&Session>,
    ) -> Result<HookOutcome, GatewayError> {
        if self.terminated {
            return Err(GatewayError::Terminated {
                event: event.name(),
            }
            .into());
        }

        let outcome = match event {
            InterceptedEvent::Startup { action } => self.startup(action).await,
            InterceptedEvent::RenderPage { template } => self.render_page(template),
            InterceptedEvent::Authenticate(credentials) => {
                let session = session.ok_or(GatewayError::SessionRequired {
                    event: "Authenticate",
                })?;
                self.authenticate(credentials, session).await
            }
            InterceptedEvent::LoginSucceeded(params) => self.login_succeeded(params),
            InterceptedEvent::LoginFailed => self.login_failed(),
            InterceptedEvent::LogoutSucceeded => self.logout_succeeded(),
            InterceptedEvent::BackendConnect(connect) => {
                self.backend_connect(connect, session).await?
            }
        };

        if outcome.is_terminal() {
            self.terminated = true;
        }
        Ok(outcome)
    }

    async fn client(&self) -> Result<&A::Client, SsoError> {
        self.client
            .get_or_try_init(|| async {
                let settings = self.gateway.client_settings(&self.ctx);
                debug!(service_url = %settings.service_url, "initializing SSO client");
                self.gateway.adapter.initialize(settings)
            })
            .await
    }

    fn service_ticket(&self) -> Option<ServiceTicket> {
        self.ctx
            .query_param(TICKET_PARAM)
            .and_then(|raw| ServiceTicket::new(raw).ok())
    }

    fn secure_cookies(&self) -> bool {
        self.gateway.config.secure_cookies()
    }

    async fn startup(&mut self, action: Option<String>) -> HookOutcome {
        match action.as_deref() {
            Some(PGT_CALLBACK_ACTION) => {
                if let Err(err) = self.receive_pgt_callback().await {
                    warn!(error = %err, "PGT callback failed");
                }
                HookOutcome::terminate(Termination::Finished)
            }
            Some(SSO_LOGOUT_ACTION) => {
                self.phase = Phase::LoggingOut;
                match self.sso_logout_url().await {
                    Ok(url) => {
                        info!("redirecting to SSO logout");
                        HookOutcome::terminate(Termination::Redirect(Redirect::External(url)))
                    }
                    Err(err) => {
                        warn!(error = %err, "SSO logout unavailable");
                        HookOutcome::terminate(Termination::Finished)
                    }
                }
            }
            other => HookOutcome::proceed(InterceptedEvent::Startup {
                action: other.map(str::to_string),
            }),
        }
    }

    async fn receive_pgt_callback(&self) -> Result<(), SsoError> {
        let callback = PgtCallback::from_pairs(self.ctx.query_pairs());
        self.client().await?.receive_pgt_callback(callback).await
    }

    async fn sso_logout_url(&self) -> Result<String, SsoError> {
        self.client().await?.logout().await
    }

    fn render_page(&mut self, template: String) -> HookOutcome {
        if template != LOGIN_TEMPLATE {
            return HookOutcome::proceed(InterceptedEvent::RenderPage { template });
        }

        let secure = self.secure_cookies();
        let cookie = match return_url::capture(&self.ctx) {
            Some(Ok(params)) => {
                debug!("remembering requested page across SSO login");
                return_url::cookie(&params, secure)
            }
            Some(Err(err)) => {
                warn!(error = %err, "not remembering malformed request query");
                return_url::removal(secure)
            }
            None => return_url::removal(secure),
        };

        let target = ActionParams::new().with("task", "mail").with("action", "login");
        HookOutcome::terminate(Termination::Redirect(Redirect::Action(target))).with_cookie(cookie)
    }

    async fn force_authentication(
        &self,
        session: &Session,
    ) -> Result<Authentication, SsoError> {
        let client = self.client().await?;
        let ticket = self.service_ticket();
        let mut sso = session.sso().await;
        client.force_authentication(ticket.as_ref(), &mut sso).await
    }

    async fn authenticate(&mut self, mut credentials: Credentials, session: &Session) -> HookOutcome {
        self.phase = Phase::AuthenticationInProgress;
        match self.force_authentication(session).await {
            Ok(Authentication::Authenticated(principal)) => {
                self.phase = Phase::Authenticated;
                info!(principal = %principal, "user authenticated by SSO");
                let config = &self.gateway.config;
                credentials.user = principal.into();
                credentials.pass = if config.mode().is_proxy() {
                    String::new()
                } else {
                    config.static_credential().unwrap_or_default().to_string()
                };
                HookOutcome::proceed(InterceptedEvent::Authenticate(credentials))
            }
            Ok(Authentication::Redirect(url)) => {
                debug!("no SSO ticket yet, redirecting to SSO login");
                HookOutcome::terminate(Termination::Redirect(Redirect::External(url)))
            }
            Err(err) => {
                self.phase = Phase::Unauthenticated;
                warn!(error = %err, "SSO authentication failed");
                HookOutcome::proceed(InterceptedEvent::Authenticate(credentials))
            }
        }
    }

    fn login_succeeded(&mut self, params: ActionParams) -> HookOutcome {
        self.phase = Phase::Authenticated;
        let params = match return_url::read(&self.ctx) {
            Some(Ok(restored)) => {
                debug!("restoring requested page after login");
                restored
            }
            Some(Err(err)) => {
                warn!(error = %err, "ignoring malformed return URL");
                params
            }
            None => params,
        };
        HookOutcome::proceed(InterceptedEvent::LoginSucceeded(params))
            .with_cookie(return_url::removal(self.secure_cookies()))
    }

    fn login_failed(&mut self) -> HookOutcome {
        self.phase = Phase::Failed;
        warn!("backend rejected SSO-authenticated login");
        HookOutcome::terminate(Termination::ErrorPage {
            page: ErrorPage::login_failed(),
            kill_session: true,
        })
    }

    fn logout_succeeded(&mut self) -> HookOutcome {
        self.phase = Phase::LoggingOut;
        HookOutcome::terminate(Termination::Redirect(Redirect::Action(
            ActionParams::new().with("action", SSO_LOGOUT_ACTION),
        )))
    }

    async fn backend_connect(
        &mut self,
        mut connect: BackendConnect,
        session: Option<&Session>,
    ) -> Result<HookOutcome, GatewayError> {
        let config = Arc::clone(&self.gateway.config);
        if !config.mode().is_proxy() {
            return Ok(HookOutcome::proceed(InterceptedEvent::BackendConnect(
                connect,
            )));
        }
        let session = session.ok_or(GatewayError::SessionRequired {
            event: "BackendConnect",
        })?;
        self.phase = Phase::BackendConnecting;

        let cached = if config.backend_caching() && connect.attempt == 1 {
            session.tickets().get(&connect.node).await
        } else {
            None
        };

        match cached {
            Some(ticket) => {
                debug!(node = %connect.node, attempt = connect.attempt, "reusing cached proxy ticket");
                connect.credentials.pass = ticket.into();
            }
            None => match self.fresh_proxy_ticket(session).await {
                Ok(ticket) => {
                    debug!(node = %connect.node, attempt = connect.attempt, "proxy ticket issued");
                    session
                        .tickets()
                        .put(connect.node.clone(), ticket.clone())
                        .await;
                    connect.credentials.pass = ticket.into();
                }
                Err(err) => {
                    warn!(
                        node = %connect.node,
                        attempt = connect.attempt,
                        error = %err,
                        "could not obtain proxy ticket"
                    );
                    connect.credentials.pass.clear();
                }
            },
        }

        if connect.attempt <= 1 {
            connect.retry = true;
        }
        Ok(HookOutcome::proceed(InterceptedEvent::BackendConnect(
            connect,
        )))
    }

    async fn fresh_proxy_ticket(&self, session: &Session) -> Result<ProxyTicket, SsoError> {
        let consumer = self
            .gateway
            .config
            .proxy_consumer()
            .ok_or_else(|| SsoError::Configuration {
                reason: "proxy_consumer is not set".to_string(),
            })?;
        let client = self.client().await?;
        let ticket = self.service_ticket();
        let mut sso = session.sso().await;
        match client.force_authentication(ticket.as_ref(), &mut sso).await? {
            Authentication::Authenticated(_) => {}
            Authentication::Redirect(_) => return Err(SsoError::NotAuthenticated.into()),
        }
        client.fetch_proxy_ticket(&sso, consumer).await
    }
}
