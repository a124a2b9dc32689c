/// Parsing of the authorization-response redirect
use crate::error::{PkceError, Result};
use std::collections::HashMap;
use url::Url;

/// Parameters carried back on a successful redirect
#[derive(Debug, Clone)]
pub struct RedirectParams {
    pub code: String,
    pub state: String,
}

impl RedirectParams {
    /// Extract `code` and `state` from a redirect URI.
    ///
    /// An `error` query parameter takes precedence and surfaces as
    /// `AuthorizationDenied` together with any `error_description`.
    /// Missing `code` or `state` surface as `MissingField`.
    pub fn from_url(redirect_url: &str) -> Result<Self> {
        let url = Url::parse(redirect_url)?;
        let params: HashMap<String, String> = url.query_pairs().into_owned().collect();

        if let Some(error) = params.get("error") {
            return Err(PkceError::AuthorizationDenied {
                error: error.clone(),
                description: params.get("error_description").cloned(),
            });
        }

        let code = params
            .get("code")
            .ok_or_else(|| PkceError::MissingField("code".into()))?;
        let state = params
            .get("state")
            .ok_or_else(|| PkceError::MissingField("state".into()))?;

        Ok(Self {
            code: code.clone(),
            state: state.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_success() {
        let params =
            RedirectParams::from_url("http://127.0.0.1:8080/callback?code=abc123&state=xyz789")
                .unwrap();
        assert_eq!(params.code, "abc123");
        assert_eq!(params.state, "xyz789");
    }

    #[test]
    fn test_parse_url_decoding() {
        let params =
            RedirectParams::from_url("http://127.0.0.1:8080/callback?code=abc%20123&state=xyz%2F789")
                .unwrap();
        assert_eq!(params.code, "abc 123");
        assert_eq!(params.state, "xyz/789");
    }

    #[test]
    fn test_error_param_wins() {
        let err = RedirectParams::from_url(
            "http://127.0.0.1:8080/callback?error=access_denied&error_description=user%20said%20no",
        )
        .unwrap_err();
        match err {
            PkceError::AuthorizationDenied { error, description } => {
                assert_eq!(error, "access_denied");
                assert_eq!(description.as_deref(), Some("user said no"));
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_missing_code() {
        let err =
            RedirectParams::from_url("http://127.0.0.1:8080/callback?state=xyz").unwrap_err();
        assert!(matches!(err, PkceError::MissingField(f) if f == "code"));
    }

    #[test]
    fn test_missing_state() {
        let err = RedirectParams::from_url("http://127.0.0.1:8080/callback?code=abc").unwrap_err();
        assert!(matches!(err, PkceError::MissingField(f) if f == "state"));
    }
}
