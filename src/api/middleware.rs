//! API Middleware
//!
//! Per-client request admission backed by the limiter registry.

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    extract::{ConnectInfo, Request, State},
    middleware::Next,
    response::Response,
};
use tracing::warn;

use super::handlers::AppState;
use crate::error::{CacheError, Result};

/// Rejects requests from clients that exceeded their rate limit.
///
/// Clients are identified by peer IP. Requests without connection info
/// (e.g. in-process tests) share the unspecified address.
pub async fn rate_limit(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response> {
    let client = client_ip(&request);

    if !state.limiter.check(&client) {
        warn!("Rate limit exceeded for {}", client);
        return Err(CacheError::TooManyRequests(client.to_string()));
    }

    Ok(next.run(request).await)
}

fn client_ip(request: &Request) -> IpAddr {
    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;

    #[test]
    fn test_client_ip_from_connect_info() {
        let mut request = Request::new(Body::empty());
        let addr: SocketAddr = "10.0.0.7:5000".parse().unwrap();
        request.extensions_mut().insert(ConnectInfo(addr));

        assert_eq!(client_ip(&request), addr.ip());
    }

    #[test]
    fn test_client_ip_fallback() {
        let request = Request::new(Body::empty());

        assert_eq!(client_ip(&request), IpAddr::V4(Ipv4Addr::UNSPECIFIED));
    }
}
