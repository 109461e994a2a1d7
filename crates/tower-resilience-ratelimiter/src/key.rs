//! Strategies mapping an inbound request to the string identity used for
//! rate-limit bucketing (§4.5).

use std::net::{IpAddr, SocketAddr};

use axum::extract::ConnectInfo;
use axum::http::Request;
use ipnet::IpNet;

use crate::error::ConfigError;

/// Maps a request to the key used to look up its rate-limit bucket.
///
/// Implementations receive the full request so they can inspect headers,
/// but must not consume the body.
pub trait KeyExtractor<B>: Send + Sync {
    /// Returns the string identity used to bucket `req`.
    fn extract(&self, req: &Request<B>) -> String;
}

fn connect_addr<B>(req: &Request<B>) -> Option<SocketAddr> {
    req.extensions().get::<ConnectInfo<SocketAddr>>().map(|ci| ci.0)
}

/// Keys by the TCP peer address (port stripped).
///
/// Requires the server to have been started with
/// `axum::serve(listener, app.into_make_service_with_connect_info::<SocketAddr>())`
/// (or equivalent) so that `ConnectInfo<SocketAddr>` is present in request
/// extensions; absent that, this falls back to the fixed key `"unknown"`.
#[derive(Debug, Default, Clone, Copy)]
pub struct RemoteAddrKey;

impl<B> KeyExtractor<B> for RemoteAddrKey {
    fn extract(&self, req: &Request<B>) -> String {
        connect_addr(req)
            .map(|addr| addr.ip().to_string())
            .unwrap_or_else(|| "unknown".to_string())
    }
}

/// Keys by the rightmost non-trusted hop in `X-Forwarded-For`, but only
/// when the direct TCP peer is itself inside a trusted CIDR range.
///
/// This is the spoof-resistant extraction described in §4.5 and exercised
/// by §8 scenario 8: walking the header right-to-left skips every address a
/// trusted proxy in the chain is vouching for, stopping at the first one
/// that isn't. A request from an untrusted peer ignores the header
/// entirely and uses the peer address, since an attacker controlling the
/// TCP connection can set `X-Forwarded-For` to anything.
#[derive(Clone)]
pub struct XForwardedForKey {
    trusted: Vec<IpNet>,
}

impl XForwardedForKey {
    /// Builds the extractor from a set of trusted proxy CIDR ranges.
    ///
    /// Returns a [`ConfigError`] if any range fails to parse — per §4.5,
    /// invalid trusted CIDRs are a fatal configuration error, not a
    /// per-request fallback.
    pub fn new<I, S>(trusted_cidrs: I) -> Result<Self, ConfigError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let trusted = trusted_cidrs
            .into_iter()
            .map(|s| {
                s.as_ref()
                    .parse::<IpNet>()
                    .map_err(|e| ConfigError(format!("invalid trusted CIDR {:?}: {e}", s.as_ref())))
            })
            .collect::<Result<Vec<_>, _>>()?;
        Ok(Self { trusted })
    }

    fn is_trusted(&self, ip: IpAddr) -> bool {
        self.trusted.iter().any(|net| net.contains(&ip))
    }
}

impl<B> KeyExtractor<B> for XForwardedForKey {
    fn extract(&self, req: &Request<B>) -> String {
        let peer = connect_addr(req).map(|addr| addr.ip());

        let Some(peer_ip) = peer else {
            return "unknown".to_string();
        };

        if !self.is_trusted(peer_ip) {
            return peer_ip.to_string();
        }

        let Some(header) = req.headers().get("x-forwarded-for").and_then(|v| v.to_str().ok()) else {
            return peer_ip.to_string();
        };

        let hops: Vec<&str> = header.split(',').map(str::trim).filter(|s| !s.is_empty()).collect();

        for hop in hops.iter().rev() {
            match hop.parse::<IpAddr>() {
                Ok(ip) if self.is_trusted(ip) => continue,
                Ok(ip) => return ip.to_string(),
                Err(_) => return (*hop).to_string(),
            }
        }

        // Every hop was trusted (or the header was empty of parseable hops):
        // fall back to the peer address.
        peer_ip.to_string()
    }
}

/// Keys by a named request header, falling back to the peer address when
/// the header is absent or empty.
#[derive(Clone)]
pub struct HeaderKey {
    name: axum::http::HeaderName,
}

impl HeaderKey {
    /// Builds an extractor reading the given header name.
    pub fn new(name: impl AsRef<str>) -> Result<Self, ConfigError> {
        let name = axum::http::HeaderName::try_from(name.as_ref())
            .map_err(|e| ConfigError(format!("invalid header name {:?}: {e}", name.as_ref())))?;
        Ok(Self { name })
    }
}

impl<B> KeyExtractor<B> for HeaderKey {
    fn extract(&self, req: &Request<B>) -> String {
        let value = req
            .headers()
            .get(&self.name)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty());

        match value {
            Some(v) => v.to_string(),
            None => connect_addr(req)
                .map(|addr| addr.ip().to_string())
                .unwrap_or_else(|| "unknown".to_string()),
        }
    }
}
