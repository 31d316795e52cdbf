//! HTTP surface of the callback service.
//!
//! The SSO server must reach the proxy-granting ticket callback directly,
//! which is awkward when the webmail host sits behind an access proxy. This
//! service answers the gateway's two terminal actions on its own.

use axum::{
    Router,
    extract::{Request, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    routing::get,
};
use mailgate_gateway::{
    Flow, Gateway, HookOutcome, InterceptedEvent, RequestContext, respond,
};
use mailgate_sso::CasAdapter;
use std::sync::Arc;
use tower_http::trace::TraceLayer;

/// Shared state of the callback service.
pub type AppState = Arc<Gateway<CasAdapter>>;

/// Builds the service router.
pub fn router(gateway: AppState) -> Router {
    Router::new()
        .route("/", get(dispatch))
        .layer(TraceLayer::new_for_http())
        .with_state(gateway)
}

/// Feeds the requested action to the gateway as a startup event.
///
/// Only terminal actions produce a response; anything else is not ours.
async fn dispatch(State(gateway): State<AppState>, request: Request) -> Response {
    let (parts, _body) = request.into_parts();
    let ctx = RequestContext::from_parts(&parts, false);
    let action = ctx.action().map(str::to_string);
    let mut exchange = gateway.exchange(ctx);

    match exchange
        .handle(InterceptedEvent::Startup { action }, None)
        .await
    {
        Ok(HookOutcome {
            flow: Flow::Terminate(termination),
            cookies,
        }) => respond(termination, cookies),
        Ok(_) => StatusCode::NOT_FOUND.into_response(),
        Err(err) => {
            tracing::error!(error = %err, "gateway refused startup event");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
