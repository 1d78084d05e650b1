use fastly::http::Url;
use fastly::Request;
use log::trace;

use crate::{Configuration, NegotiationError, Result};

/// Builds the URL of the WebP sibling by appending the configured suffix to the
/// full request URL, query string included.
///
/// `https://example.com/img/cat.png` becomes `https://example.com/img/cat.png.webp`.
pub fn substitute_url(req: &Request, config: &Configuration) -> Result<Url> {
    let candidate = format!("{}{}", req.get_url_str(), config.substitute_suffix);
    trace!("substitute candidate: {}", candidate);
    Url::parse(&candidate).map_err(|_err| NegotiationError::InvalidRequestUrl(candidate))
}

// The substitute request mirrors the client request, only the target changes.
pub(crate) fn substitute_request(req: &Request, url: Url) -> Request {
    req.clone_without_body().with_url(url)
}

#[cfg(test)]
mod tests {
    use super::*;
    use fastly::http::{header, Method};

    #[test]
    fn test_suffix_is_appended() {
        let req = Request::get("https://example.com/img/cat.png");
        let url = substitute_url(&req, &Configuration::default()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/img/cat.png.webp");
        assert!(url.as_str().starts_with(req.get_url_str()));
    }

    #[test]
    fn test_suffix_lands_after_query() {
        let req = Request::get("https://example.com/img/cat.png?v=2");
        let url = substitute_url(&req, &Configuration::default()).unwrap();
        assert_eq!(url.as_str(), "https://example.com/img/cat.png?v=2.webp");
        assert_eq!(url.path(), "/img/cat.png");
        assert_eq!(url.query(), Some("v=2.webp"));
    }

    #[test]
    fn test_custom_suffix() {
        let config = Configuration::default().with_substitute_suffix(".avif");
        let req = Request::get("https://example.com/img/cat.jpg");
        let url = substitute_url(&req, &config).unwrap();
        assert_eq!(url.as_str(), "https://example.com/img/cat.jpg.avif");
    }

    #[test]
    fn test_substitute_request_keeps_metadata() {
        let req = Request::get("https://example.com/img/cat.png")
            .with_header(header::ACCEPT, "image/webp")
            .with_header("x-custom", "1");
        let url = substitute_url(&req, &Configuration::default()).unwrap();
        let substitute = substitute_request(&req, url);
        assert_eq!(substitute.get_method(), &Method::GET);
        assert_eq!(substitute.get_url_str(), "https://example.com/img/cat.png.webp");
        assert_eq!(substitute.get_header_str(header::ACCEPT), Some("image/webp"));
        assert_eq!(substitute.get_header_str("x-custom"), Some("1"));
        assert_eq!(req.get_url_str(), "https://example.com/img/cat.png");
    }
}
