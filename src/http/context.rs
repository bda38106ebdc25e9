//! Per-request context.
//!
//! # Responsibilities
//! - Resolve the client identity used for rate limiting and logs
//! - Carry the parsed body and the matched route group to handlers
//!
//! # Design Decisions
//! - Lives in the request extensions, dropped with the request
//! - `X-Forwarded-For` is only consulted when the proxy is trusted

use std::net::{IpAddr, Ipv4Addr, SocketAddr};

use axum::{
    body::Body,
    extract::{connect_info::MockConnectInfo, ConnectInfo},
    http::{Method, Request},
};
use serde_json::Value;

use crate::routing::RouteGroup;

const X_FORWARDED_FOR: &str = "x-forwarded-for";

/// Body as decoded by the body-parsing stage.
#[derive(Debug, Clone, PartialEq)]
pub enum ParsedBody {
    /// No body, or a content type the pipeline does not decode.
    None,
    Json(Value),
    Form(Vec<(String, String)>),
}

/// Request-scoped facts gathered by the ingress pipeline.
#[derive(Debug, Clone)]
pub struct RequestContext {
    pub client_ip: IpAddr,
    pub original_url: String,
    pub method: Method,
    pub body: ParsedBody,
    pub route_group: Option<RouteGroup>,
}

impl RequestContext {
    pub fn new(request: &Request<Body>, trust_proxy: bool) -> Self {
        Self {
            client_ip: client_ip(request, trust_proxy),
            original_url: request
                .uri()
                .path_and_query()
                .map(|pq| pq.as_str().to_string())
                .unwrap_or_else(|| request.uri().path().to_string()),
            method: request.method().clone(),
            body: ParsedBody::None,
            route_group: None,
        }
    }
}

/// Client identity: first `X-Forwarded-For` hop when trusted, otherwise the
/// peer address. Falls back to `0.0.0.0` when neither is known.
///
/// The peer comes from `ConnectInfo`, or from `MockConnectInfo` when the
/// router is driven without a listener.
pub fn client_ip(request: &Request<Body>, trust_proxy: bool) -> IpAddr {
    if trust_proxy {
        let forwarded = request
            .headers()
            .get(X_FORWARDED_FOR)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .and_then(|v| v.trim().parse::<IpAddr>().ok());
        if let Some(ip) = forwarded {
            return ip;
        }
    }

    request
        .extensions()
        .get::<ConnectInfo<SocketAddr>>()
        .map(|ConnectInfo(addr)| addr.ip())
        .or_else(|| {
            request
                .extensions()
                .get::<MockConnectInfo<SocketAddr>>()
                .map(|MockConnectInfo(addr)| addr.ip())
        })
        .unwrap_or(IpAddr::V4(Ipv4Addr::UNSPECIFIED))
}
