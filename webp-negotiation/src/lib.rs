#![doc = include_str!("../README.md")]

mod classify;
mod config;
mod error;
mod rewrite;

use fastly::http::request::PendingRequest;
use fastly::http::{StatusCode, Url};
use fastly::{Request, Response};
use log::{debug, trace, warn};

pub use crate::classify::{
    classify, is_eligible, is_get_request, is_image_request, is_webp_compatible, Ineligibility,
};
pub use crate::config::{
    Configuration, SendErrorPolicy, DEFAULT_ACCEPT_PATTERN, DEFAULT_SUBSTITUTE_SUFFIX,
};
pub use crate::error::{NegotiationError, Result};
pub use crate::rewrite::substitute_url;

/// Sends a request to a backend. Used for both the substitute and the original request.
pub type RequestDispatcher<'a> = dyn Fn(Request) -> Result<PendingResponse> + 'a;

/// A response that is either still being fetched or already available.
pub enum PendingResponse {
    PendingRequest(PendingRequest),
    CompletedRequest(Response),
}

impl From<PendingRequest> for PendingResponse {
    fn from(value: PendingRequest) -> Self {
        Self::PendingRequest(value)
    }
}

impl From<Response> for PendingResponse {
    fn from(value: Response) -> Self {
        Self::CompletedRequest(value)
    }
}

impl PendingResponse {
    fn wait_for_response(self) -> Result<Response> {
        Ok(match self {
            Self::PendingRequest(pending_request) => pending_request.wait()?,
            Self::CompletedRequest(response) => response,
        })
    }
}

/// Which response was returned to the client.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Outcome {
    /// The WebP sibling at the given URL was served.
    Substitute(Url),
    /// The original request was forwarded.
    Fallback(FallbackReason),
}

#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FallbackReason {
    /// Substitution was never attempted.
    Ineligible(Ineligibility),
    /// The substitute answered with a status of 400 or above.
    SubstituteStatus(StatusCode),
    /// The substitute request failed without a response.
    SubstituteUnreachable,
}

/// The state of the substitute fetch.
/// * `Found` - The substitute exists and is returned to the client.
/// * `Declined` - The original request must be forwarded instead.
enum SubstituteState {
    Found(Response, Url),
    Declined(FallbackReason),
}

/// Answers image requests with a WebP sibling when the client supports it.
///
/// For a `GET` of a `.jpg` or `.png` URL from a client whose `Accept` header
/// mentions `image/webp`, the negotiator first requests the same URL with `.webp`
/// appended. A response with a status below 400 is returned as is. Otherwise,
/// and for every other request, the original request is forwarded unchanged.
///
/// # Example
/// ```
/// use fastly::{Request, Response};
/// use webp_negotiation::{Configuration, Negotiator, PendingResponse};
///
/// let negotiator = Negotiator::new(Configuration::default());
///
/// let req = Request::get("http://example.com/img/cat.png")
///     .with_header("accept", "image/webp,*/*");
///
/// fn dispatcher(req: Request) -> webp_negotiation::Result<PendingResponse> {
///     Ok(Response::new().with_header("x-url", req.get_url_str()).into())
/// }
///
/// let resp = negotiator.handle(req, Some(&dispatcher))?;
/// assert_eq!(
///     resp.get_header_str("x-url"),
///     Some("http://example.com/img/cat.png.webp")
/// );
/// # Ok::<(), webp_negotiation::NegotiationError>(())
/// ```
pub struct Negotiator {
    configuration: Configuration,
}

impl Negotiator {
    pub const fn new(configuration: Configuration) -> Self {
        Self { configuration }
    }

    pub const fn configuration(&self) -> &Configuration {
        &self.configuration
    }

    /// Produces the response for a client request.
    ///
    /// `dispatch_request` sends requests to the backend. When `None`, requests go to
    /// the configured backend, or to a dynamic backend named after the request host.
    ///
    /// # Errors
    /// Returns error if:
    /// * The original request cannot be sent or its response cannot be received
    /// * The substitute request fails and the policy is [`SendErrorPolicy::Propagate`]
    pub fn handle(
        &self,
        req: Request,
        dispatch_request: Option<&RequestDispatcher<'_>>,
    ) -> Result<Response> {
        self.handle_with_outcome(req, dispatch_request)
            .map(|(resp, _)| resp)
    }

    /// Like [`Negotiator::handle`], also reporting which response was chosen.
    pub fn handle_with_outcome(
        &self,
        req: Request,
        dispatch_request: Option<&RequestDispatcher<'_>>,
    ) -> Result<(Response, Outcome)> {
        let default_dispatcher = |req: Request| self.default_dispatcher(req);
        let dispatch_request: &RequestDispatcher<'_> = match dispatch_request {
            Some(dispatch_request) => dispatch_request,
            None => &default_dispatcher,
        };

        let reason = match classify(&req, &self.configuration) {
            Ok(()) => match self.fetch_substitute(&req, dispatch_request)? {
                SubstituteState::Found(resp, url) => {
                    debug!("serving substitute {}", url);
                    return Ok((resp, Outcome::Substitute(url)));
                }
                SubstituteState::Declined(reason) => reason,
            },
            Err(ineligibility) => {
                debug!(
                    "{} {} is not eligible: {:?}",
                    req.get_method(),
                    req.get_path(),
                    ineligibility
                );
                FallbackReason::Ineligible(ineligibility)
            }
        };

        let resp = fetch_original(req, dispatch_request)?;
        Ok((resp, Outcome::Fallback(reason)))
    }

    // Errors returned from here abort the request, a declined substitute falls back.
    fn fetch_substitute(
        &self,
        req: &Request,
        dispatch_request: &RequestDispatcher<'_>,
    ) -> Result<SubstituteState> {
        let url = substitute_url(req, &self.configuration)?;
        debug!("requesting substitute: {}", url);

        let substitute = rewrite::substitute_request(req, url.clone());
        let resp = match dispatch_request(substitute).and_then(PendingResponse::wait_for_response)
        {
            Ok(resp) => resp,
            Err(err) => {
                return match self.configuration.send_error_policy {
                    SendErrorPolicy::Fallback => {
                        warn!("substitute {} unreachable, falling back: {}", url, err);
                        Ok(SubstituteState::Declined(
                            FallbackReason::SubstituteUnreachable,
                        ))
                    }
                    SendErrorPolicy::Propagate => Err(err),
                };
            }
        };

        let status = resp.get_status();
        trace!("substitute {} answered {}", url, status);
        if status.as_u16() < 400 {
            Ok(SubstituteState::Found(resp, url))
        } else {
            debug!("substitute {} answered {}, falling back", url, status);
            Ok(SubstituteState::Declined(
                FallbackReason::SubstituteStatus(status),
            ))
        }
    }

    fn default_dispatcher(&self, req: Request) -> Result<PendingResponse> {
        let backend = match &self.configuration.backend {
            Some(backend) => backend.clone(),
            None => {
                debug!("no backend configured, defaulting to hostname");
                req.get_url()
                    .host_str()
                    .ok_or_else(|| NegotiationError::MissingHost(req.get_url_str().to_string()))?
                    .to_string()
            }
        };
        Ok(req.send_async(backend)?.into())
    }
}

// Sends the client request untouched and returns whatever comes back.
fn fetch_original(req: Request, dispatch_request: &RequestDispatcher<'_>) -> Result<Response> {
    trace!("forwarding {} {}", req.get_method(), req.get_url_str());
    dispatch_request(req)?.wait_for_response()
}
