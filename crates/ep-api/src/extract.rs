//! Pseudo-identity of the caller, computed per request.

use std::convert::Infallible;
use std::net::SocketAddr;
use std::sync::Arc;

use axum::extract::{ConnectInfo, FromRequestParts};
use axum::http::request::Parts;
use axum::http::{header, HeaderMap};
use ep_core::{ClientHash, ClientSignals};

use crate::state::AppState;

const UNKNOWN: &str = "unknown";

/// The caller's fingerprint. Never fails; missing signals hash as "unknown".
#[derive(Debug, Clone)]
pub struct ClientFingerprint(pub ClientHash);

impl FromRequestParts<Arc<AppState>> for ClientFingerprint {
    type Rejection = Infallible;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &Arc<AppState>,
    ) -> Result<Self, Self::Rejection> {
        let peer = parts
            .extensions
            .get::<ConnectInfo<SocketAddr>>()
            .map(|ConnectInfo(addr)| *addr);
        let signals = client_signals(&parts.headers, peer, state.trust_forwarded_for);
        Ok(Self(state.identity.fingerprint(&signals)))
    }
}

pub fn client_signals(
    headers: &HeaderMap,
    peer: Option<SocketAddr>,
    trust_forwarded_for: bool,
) -> ClientSignals {
    let forwarded = trust_forwarded_for
        .then(|| headers.get("x-forwarded-for"))
        .flatten()
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.split(',').next())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string);

    let ip = forwarded
        .or_else(|| peer.map(|addr| addr.ip().to_string()))
        .unwrap_or_else(|| UNKNOWN.to_string());

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|v| v.to_str().ok())
        .unwrap_or(UNKNOWN)
        .to_string();

    ClientSignals { ip, user_agent }
}
