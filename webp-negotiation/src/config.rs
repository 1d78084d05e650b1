use regex::bytes::Regex;

use crate::Result;

/// Pattern an `Accept` header value must match for the client to be offered WebP.
pub const DEFAULT_ACCEPT_PATTERN: &str = "image/webp";

/// Suffix appended to the original URL to locate the WebP sibling.
pub const DEFAULT_SUBSTITUTE_SUFFIX: &str = ".webp";

/// What to do when the substitute request fails before producing a response.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SendErrorPolicy {
    /// Treat the failure like an error status and forward the original request.
    Fallback,
    /// Return the error to the caller.
    Propagate,
}

impl Default for SendErrorPolicy {
    fn default() -> Self {
        Self::Fallback
    }
}

/// This struct is used to configure optional behaviour within the negotiator.
///
/// ## Usage Example
/// ```rust,no_run
/// let config = webp_negotiation::Configuration::default()
///     .with_backend("origin")
///     .with_path_prefix("/wp-content/");
/// ```
#[allow(clippy::return_self_not_must_use)]
#[derive(Clone, Debug)]
pub struct Configuration {
    /// Matched against every `Accept` header value of the client request.
    pub accept_pattern: Regex,
    /// Literal suffixes of the request URL that mark it as a convertible image.
    pub image_extensions: Vec<String>,
    /// Appended to the full request URL to build the substitute URL.
    pub substitute_suffix: String,
    /// Only paths starting with this prefix are considered, if set.
    pub path_prefix: Option<String>,
    /// Named backend for the default dispatcher. The request host is used when unset.
    pub backend: Option<String>,
    pub send_error_policy: SendErrorPolicy,
}

impl Default for Configuration {
    fn default() -> Self {
        Self {
            accept_pattern: Regex::new(DEFAULT_ACCEPT_PATTERN)
                .expect("default accept pattern is a valid regex"),
            image_extensions: vec![".jpg".to_string(), ".png".to_string()],
            substitute_suffix: DEFAULT_SUBSTITUTE_SUFFIX.to_string(),
            path_prefix: None,
            backend: None,
            send_error_policy: SendErrorPolicy::default(),
        }
    }
}

impl Configuration {
    /// Replaces the pattern used to detect WebP support in the `Accept` header.
    ///
    /// # Errors
    /// Returns [`NegotiationError::InvalidPattern`](crate::NegotiationError::InvalidPattern)
    /// if `pattern` is not a valid regular expression.
    pub fn with_accept_pattern(mut self, pattern: &str) -> Result<Self> {
        self.accept_pattern = Regex::new(pattern)?;
        Ok(self)
    }
    /// Sets the URL suffixes that identify convertible images, e.g. `[".jpg", ".png"]`.
    pub fn with_image_extensions<I, S>(mut self, extensions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.image_extensions = extensions.into_iter().map(Into::into).collect();
        self
    }
    /// Sets the suffix appended to the request URL to locate the substitute.
    pub fn with_substitute_suffix(mut self, suffix: impl Into<String>) -> Self {
        self.substitute_suffix = suffix.into();
        self
    }
    /// Restricts negotiation to request paths starting with `prefix`.
    ///
    /// For example, `/wp-content/` leaves every request outside that tree untouched.
    pub fn with_path_prefix(mut self, prefix: impl Into<String>) -> Self {
        self.path_prefix = Some(prefix.into());
        self
    }
    /// Sends requests to the named backend instead of one derived from the request host.
    pub fn with_backend(mut self, backend: impl Into<String>) -> Self {
        self.backend = Some(backend.into());
        self
    }
    pub fn with_send_error_policy(mut self, policy: SendErrorPolicy) -> Self {
        self.send_error_policy = policy;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = Configuration::default();
        assert!(config.accept_pattern.is_match(b"image/webp"));
        assert_eq!(config.image_extensions, vec![".jpg", ".png"]);
        assert_eq!(config.substitute_suffix, ".webp");
        assert_eq!(config.path_prefix, None);
        assert_eq!(config.backend, None);
        assert_eq!(config.send_error_policy, SendErrorPolicy::Fallback);
    }

    #[test]
    fn test_builder() {
        let config = Configuration::default()
            .with_image_extensions(vec![".jpeg"])
            .with_substitute_suffix(".avif")
            .with_path_prefix("/wp-content/")
            .with_backend("origin")
            .with_send_error_policy(SendErrorPolicy::Propagate);
        assert_eq!(config.image_extensions, vec![".jpeg"]);
        assert_eq!(config.substitute_suffix, ".avif");
        assert_eq!(config.path_prefix.as_deref(), Some("/wp-content/"));
        assert_eq!(config.backend.as_deref(), Some("origin"));
        assert_eq!(config.send_error_policy, SendErrorPolicy::Propagate);
    }

    #[test]
    fn test_invalid_accept_pattern() {
        let result = Configuration::default().with_accept_pattern("image/(webp");
        match result {
            Err(err) => assert!(err.to_string().contains("invalid accept pattern")),
            Ok(_) => panic!("unbalanced group should be rejected"),
        }
    }
}
