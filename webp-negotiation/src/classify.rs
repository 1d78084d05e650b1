use fastly::http::{header, Method};
use fastly::Request;

use crate::Configuration;

/// The reason a request was not considered for WebP substitution.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Ineligibility {
    /// Only `GET` requests are substituted.
    Method(Method),
    /// The path lies outside the configured prefix.
    OutsideRoute,
    /// The URL does not end with one of the configured image extensions.
    Extension,
    /// The client sent no `Accept` header.
    AcceptMissing,
    /// None of the `Accept` values match the configured pattern.
    AcceptMismatch,
}

/// Decides whether `req` may be answered with a WebP substitute.
///
/// The checks run in order (method, route, extension, `Accept`) and the first one
/// that fails is returned.
pub fn classify(req: &Request, config: &Configuration) -> Result<(), Ineligibility> {
    if !is_get_request(req) {
        return Err(Ineligibility::Method(req.get_method().clone()));
    }
    if !is_within_route(req, config) {
        return Err(Ineligibility::OutsideRoute);
    }
    if !is_image_request(req, config) {
        return Err(Ineligibility::Extension);
    }
    accepts_webp(req, config)
}

pub fn is_eligible(req: &Request, config: &Configuration) -> bool {
    classify(req, config).is_ok()
}

// Method names are case sensitive, so `get` is an extension method and never matches.
pub fn is_get_request(req: &Request) -> bool {
    req.get_method() == Method::GET
}

fn is_within_route(req: &Request, config: &Configuration) -> bool {
    config
        .path_prefix
        .as_deref()
        .map_or(true, |prefix| req.get_path().starts_with(prefix))
}

// Matched against the whole URL, so a query string hides the extension.
pub fn is_image_request(req: &Request, config: &Configuration) -> bool {
    let url = req.get_url_str();
    config
        .image_extensions
        .iter()
        .any(|extension| url.ends_with(extension.as_str()))
}

pub fn is_webp_compatible(req: &Request, config: &Configuration) -> bool {
    accepts_webp(req, config).is_ok()
}

fn accepts_webp(req: &Request, config: &Configuration) -> Result<(), Ineligibility> {
    let mut values = req.get_header_all(header::ACCEPT).peekable();
    if values.peek().is_none() {
        return Err(Ineligibility::AcceptMissing);
    }
    if values.any(|value| config.accept_pattern.is_match(value.as_bytes())) {
        Ok(())
    } else {
        Err(Ineligibility::AcceptMismatch)
    }
}
