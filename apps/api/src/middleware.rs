use std::net::{IpAddr, SocketAddr};

use axum::extract::{ConnectInfo, Request, State};
use axum::http::{HeaderMap, HeaderValue, header};
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use ipnet::IpNet;
use warden_application::ClientContext;
use warden_core::AppError;
use warden_domain::LimitType;

use crate::error::{ApiError, ApiResult};
use crate::state::AppState;

/// Rejects requests whose bearer token does not match `ADMIN_API_TOKEN`.
pub async fn require_admin_token(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> ApiResult<Response> {
    let presented = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .unwrap_or_default();

    if !constant_time_eq(presented.as_bytes(), state.admin_api_token.as_bytes()) {
        return Err(AppError::Unauthorized("admin token required".to_owned()).into());
    }

    Ok(next.run(request).await)
}

/// Admits the request against the limit type attached to the route.
///
/// The derived `ClientContext` is stored in request extensions for handlers.
pub async fn rate_limit(
    State(state): State<AppState>,
    mut request: Request,
    next: Next,
) -> Response {
    let limit_type = request
        .extensions()
        .get::<LimitType>()
        .cloned()
        .unwrap_or_else(LimitType::global);
    let peer_address = request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(address)| *address);
    let context = client_context(request.headers(), peer_address, &state.trusted_proxies);

    if !state
        .rate_limit_service
        .check_limit(limit_type.as_str(), &context)
        .await
    {
        let retry_after = state
            .rate_limit_service
            .policy()
            .resolve(&limit_type)
            .window_seconds();
        let error = AppError::RateLimited(format!(
            "too many requests for '{limit_type}', please try again later"
        ));
        let mut response = ApiError(error).into_response();
        if let Ok(value) = HeaderValue::from_str(&retry_after.to_string()) {
            response.headers_mut().insert(header::RETRY_AFTER, value);
        }
        return response;
    }

    request.extensions_mut().insert(context);
    next.run(request).await
}

/// Client context for the request.
///
/// `x-forwarded-for` is honoured only when the socket peer is a trusted
/// proxy. The chain is then walked from the right and the first hop that is
/// not itself a trusted proxy is the client. Without a peer address the
/// header is ignored.
pub(crate) fn client_context(
    headers: &HeaderMap,
    peer_address: Option<SocketAddr>,
    trusted_proxies: &[IpNet],
) -> ClientContext {
    let source_ip = peer_address.map(|address| {
        let peer_ip = address.ip();
        if is_trusted(peer_ip, trusted_proxies) {
            forwarded_client(headers, trusted_proxies).unwrap_or_else(|| peer_ip.to_string())
        } else {
            peer_ip.to_string()
        }
    });

    let user_agent = headers
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .filter(|value| !value.is_empty())
        .map(ToOwned::to_owned);

    ClientContext::new(source_ip, user_agent)
}

fn forwarded_client(headers: &HeaderMap, trusted_proxies: &[IpNet]) -> Option<String> {
    let hops: Vec<&str> = headers
        .get_all("x-forwarded-for")
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .map(str::trim)
        .filter(|hop| !hop.is_empty())
        .collect();

    hops.iter()
        .rev()
        .find(|hop| {
            !hop.parse::<IpAddr>()
                .is_ok_and(|address| is_trusted(address, trusted_proxies))
        })
        .or_else(|| hops.first())
        .map(|hop| (*hop).to_owned())
}

fn is_trusted(address: IpAddr, trusted_proxies: &[IpNet]) -> bool {
    trusted_proxies.iter().any(|network| network.contains(&address))
}

fn constant_time_eq(left: &[u8], right: &[u8]) -> bool {
    if left.len() != right.len() {
        return false;
    }

    left.iter()
        .zip(right)
        .fold(0_u8, |difference, (left, right)| difference | (left ^ right))
        == 0
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use axum::http::{HeaderMap, HeaderValue};
    use ipnet::IpNet;

    use super::{client_context, constant_time_eq};

    fn proxies(networks: &[&str]) -> Vec<IpNet> {
        networks
            .iter()
            .map(|network| network.parse().unwrap_or_else(|_| unreachable!()))
            .collect()
    }

    fn forwarded(value: &'static str) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert("x-forwarded-for", HeaderValue::from_static(value));
        headers.insert("user-agent", HeaderValue::from_static("curl/8.5"));
        headers
    }

    #[test]
    fn forwarded_for_is_ignored_from_untrusted_peer() {
        let peer = SocketAddr::from(([198, 51, 100, 20], 40_000));

        let context = client_context(&forwarded("203.0.113.9"), Some(peer), &[]);

        assert_eq!(context.source_ip.as_deref(), Some("198.51.100.20"));
        assert_eq!(context.user_agent.as_deref(), Some("curl/8.5"));
    }

    #[test]
    fn trusted_proxy_chain_resolves_to_rightmost_untrusted_hop() {
        let peer = SocketAddr::from(([10, 0, 0, 2], 40_000));
        let trusted = proxies(&["10.0.0.0/8"]);

        let context = client_context(
            &forwarded("198.51.100.1, 203.0.113.9, 10.0.0.7"),
            Some(peer),
            &trusted,
        );

        assert_eq!(context.source_ip.as_deref(), Some("203.0.113.9"));
    }

    #[test]
    fn trusted_proxy_without_header_falls_back_to_peer() {
        let peer = SocketAddr::from(([10, 0, 0, 2], 40_000));
        let trusted = proxies(&["10.0.0.0/8"]);

        let context = client_context(&HeaderMap::new(), Some(peer), &trusted);

        assert_eq!(context.source_ip.as_deref(), Some("10.0.0.2"));
        assert_eq!(context.user_agent, None);
    }

    #[test]
    fn token_comparison_requires_exact_match() {
        assert!(constant_time_eq(b"secret-token", b"secret-token"));
        assert!(!constant_time_eq(b"secret-token", b"secret-tokex"));
        assert!(!constant_time_eq(b"secret", b"secret-token"));
    }
}
