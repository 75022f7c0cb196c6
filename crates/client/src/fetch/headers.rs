//! Header filtering between the browser, the proxy and the origin.

/// Connection-scoped headers that must not be forwarded by a proxy (RFC 9110 §7.6.1).
const HOP_BY_HOP: &[&str] = &[
    "connection",
    "keep-alive",
    "proxy-authenticate",
    "proxy-authorization",
    "proxy-connection",
    "te",
    "trailer",
    "transfer-encoding",
    "upgrade",
];

/// Whether a header belongs to a single connection and must be dropped.
pub fn is_hop_by_hop(name: &str) -> bool {
    HOP_BY_HOP.iter().any(|h| h.eq_ignore_ascii_case(name))
}

/// Whether a request header may be forwarded upstream.
///
/// `host` and `content-length` are recomputed by the HTTP client.
pub fn forwardable_request_header(name: &str) -> bool {
    !is_hop_by_hop(name) && !name.eq_ignore_ascii_case("host") && !name.eq_ignore_ascii_case("content-length")
}

/// Whether a response header may be stored and replayed.
///
/// `content-length` is recomputed when the body is written back out.
pub fn forwardable_response_header(name: &str) -> bool {
    !is_hop_by_hop(name) && !name.eq_ignore_ascii_case("content-length")
}
