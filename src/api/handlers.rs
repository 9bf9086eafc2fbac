//! API command handlers.

use axum::http::{header, StatusCode};
use axum::response::Response;
use serde_json::json;

use crate::api::ApiEnv;
use crate::auth::{verify_password, AuthError, CredentialStore, VerifierRecord};
use crate::http::reply;
use crate::pipeline::context::RequestContext;
use crate::sessions::SESSION_COOKIE;

/// `login`: verify the candidate password against the stored verifier and
/// open a session. Failures are uniform so usernames cannot be probed.
pub async fn login(env: &ApiEnv, ctx: &mut RequestContext) -> Response {
    let (Some(username), Some(password)) = (ctx.param_str("username"), ctx.param_str("password"))
    else {
        return reply::json(StatusCode::BAD_REQUEST, json!({ "error": "missing credentials" }));
    };
    let username = username.to_string();

    let accepted = match env.credentials.get(&username).await {
        Some(stored) => match hex::decode(&stored.salt) {
            Ok(salt) => verify_password(&env.srp, &username, password, &salt, &stored.verifier),
            Err(_) => false,
        },
        None => false,
    };
    if !accepted {
        return reply::json(
            StatusCode::UNAUTHORIZED,
            json!({ "error": AuthError::InvalidCredentials.to_string() }),
        );
    }

    let id = env.sessions.create(&username);
    let mut response =
        reply::json(StatusCode::OK, json!({ "ok": true, "username": username }));
    let cookie = format!("{SESSION_COOKIE}={id}; Path=/; HttpOnly; SameSite=Lax");
    response.headers_mut().insert(
        header::SET_COOKIE,
        cookie.parse().expect("session cookie is a valid header value"),
    );
    response
}

/// `logout`: terminate the presented session, clear the cookie.
pub async fn logout(env: &ApiEnv, ctx: &mut RequestContext) -> Response {
    if let Some(session) = ctx.session.take() {
        env.sessions.remove(session.session_id);
    }
    let mut response = reply::json(StatusCode::OK, json!({ "ok": true }));
    let cookie = format!("{SESSION_COOKIE}=; Path=/; Max-Age=0");
    response.headers_mut().insert(
        header::SET_COOKIE,
        cookie.parse().expect("clearing cookie is a valid header value"),
    );
    response
}

/// `get_status`: version, uptime, readiness, and the caller's identity.
pub async fn get_status(env: &ApiEnv, ctx: &mut RequestContext) -> Response {
    reply::json(
        StatusCode::OK,
        json!({
            "version": env!("CARGO_PKG_VERSION"),
            "uptime_secs": env.started.elapsed().as_secs(),
            "ready": env.readiness.ready(),
            "username": ctx.username(),
        }),
    )
}

/// `change_my_srp`: accept a freshly derived `{salt, verifier}` pair for the
/// authenticated identity. Password rotation is not a pre-authentication
/// operation: no session, no change. The store enforces salt freshness and
/// atomic replacement.
pub async fn change_my_srp(env: &ApiEnv, ctx: &mut RequestContext) -> Response {
    let Some(username) = ctx.username().map(str::to_string) else {
        return auth_error(&AuthError::SessionExpired);
    };

    let (Some(salt_hex), Some(verifier)) = (ctx.param_str("salt"), ctx.param_str("verifier"))
    else {
        return reply::json(StatusCode::BAD_REQUEST, json!({ "error": "missing salt or verifier" }));
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return auth_error(&AuthError::BadSalt);
    };

    let record = VerifierRecord { salt, verifier: verifier.to_string() };
    match env.credentials.put(&username, &record).await {
        Ok(()) => {
            tracing::info!(user = %username, "credential rotated");
            reply::json(StatusCode::OK, json!({ "ok": true }))
        }
        Err(e) => auth_error(&e),
    }
}

/// Map an authorization error onto a status, surfacing the message verbatim.
fn auth_error(error: &AuthError) -> Response {
    let status = match error {
        AuthError::SessionExpired | AuthError::InvalidCredentials => StatusCode::UNAUTHORIZED,
        AuthError::Forbidden => StatusCode::FORBIDDEN,
        AuthError::SaltReused => StatusCode::CONFLICT,
        AuthError::BadSalt | AuthError::Mismatch => StatusCode::BAD_REQUEST,
        AuthError::Cancelled => StatusCode::BAD_REQUEST,
        AuthError::Storage(_) | AuthError::Rejected(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };
    reply::json(status, json!({ "error": error.to_string() }))
}
