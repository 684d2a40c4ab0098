//! Identity provider capability and the generic OAuth implementation.

use std::fmt;

use url::Url;

use crate::config::SsoSettings;

/// A pluggable third-party authentication provider.
pub trait IdentityProvider: Send + Sync + fmt::Debug {
    /// Registry key of the provider.
    fn name(&self) -> &str;

    /// Human readable name shown on the login page.
    fn display_name(&self) -> &str;

    /// URL the browser is sent to in order to start the exchange.
    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<Url, url::ParseError>;

    /// Request that trades an authorization `code` for an access token.
    fn token_request(&self, code: &str, redirect_uri: &str) -> Result<TokenRequest, url::ParseError>;
}

/// A form-encoded POST to a provider's token endpoint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TokenRequest {
    pub url: Url,
    pub form: Vec<(String, String)>,
}

/// Provider driven entirely by the endpoints in its settings.
#[derive(Debug, Clone)]
pub struct OAuthProvider {
    name: String,
    display_name: String,
    client_id: String,
    client_secret: String,
    scope: String,
    auth_endpoint: String,
    token_endpoint: String,
    user_api_endpoint: String,
}

impl OAuthProvider {
    /// Build a provider from its settings.
    ///
    /// Returns `None` unless both the auth and token endpoints are set.
    pub fn from_settings(name: &str, display_name: &str, settings: &SsoSettings) -> Option<Self> {
        if settings.auth_endpoint.is_empty() || settings.token_endpoint.is_empty() {
            return None;
        }

        let display_name = if display_name.is_empty() {
            name
        } else {
            display_name
        };

        Some(Self {
            name: name.to_string(),
            display_name: display_name.to_string(),
            client_id: settings.id.clone(),
            client_secret: settings.secret.clone(),
            scope: settings.scope.clone(),
            auth_endpoint: settings.auth_endpoint.clone(),
            token_endpoint: settings.token_endpoint.clone(),
            user_api_endpoint: settings.user_api_endpoint.clone(),
        })
    }

    /// Endpoint returning the authenticated user's profile.
    pub fn user_api_endpoint(&self) -> &str {
        &self.user_api_endpoint
    }
}

impl IdentityProvider for OAuthProvider {
    fn name(&self) -> &str {
        &self.name
    }

    fn display_name(&self) -> &str {
        &self.display_name
    }

    fn authorize_url(&self, redirect_uri: &str, state: &str) -> Result<Url, url::ParseError> {
        let mut url = Url::parse(&self.auth_endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            query
                .append_pair("response_type", "code")
                .append_pair("client_id", &self.client_id)
                .append_pair("redirect_uri", redirect_uri)
                .append_pair("state", state);
            if !self.scope.is_empty() {
                query.append_pair("scope", &self.scope);
            }
        }
        Ok(url)
    }

    fn token_request(&self, code: &str, redirect_uri: &str) -> Result<TokenRequest, url::ParseError> {
        let url = Url::parse(&self.token_endpoint)?;
        let form = [
            ("grant_type", "authorization_code"),
            ("client_id", self.client_id.as_str()),
            ("client_secret", self.client_secret.as_str()),
            ("code", code),
            ("redirect_uri", redirect_uri),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

        Ok(TokenRequest { url, form })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings() -> SsoSettings {
        SsoSettings {
            enable: true,
            secret: "s3cr3t".to_string(),
            id: "client-1".to_string(),
            scope: "openid email".to_string(),
            auth_endpoint: "https://sso.example.com/authorize".to_string(),
            token_endpoint: "https://sso.example.com/token".to_string(),
            user_api_endpoint: "https://sso.example.com/me".to_string(),
        }
    }

    #[test]
    fn test_requires_endpoints() {
        let mut incomplete = settings();
        incomplete.token_endpoint.clear();
        assert!(OAuthProvider::from_settings("sso", "SSO", &incomplete).is_none());
        assert!(OAuthProvider::from_settings("sso", "SSO", &settings()).is_some());
    }

    #[test]
    fn test_display_name_falls_back_to_name() {
        let provider = OAuthProvider::from_settings("sso", "", &settings()).unwrap();
        assert_eq!(provider.display_name(), "sso");
    }

    #[test]
    fn test_authorize_url() {
        let provider = OAuthProvider::from_settings("sso", "Example SSO", &settings()).unwrap();
        let url = provider
            .authorize_url("https://chat.example.com/login/sso/complete", "xyz")
            .unwrap();

        let pairs: Vec<(String, String)> = url.query_pairs().into_owned().collect();
        assert_eq!(url.path(), "/authorize");
        assert!(pairs.contains(&("client_id".into(), "client-1".into())));
        assert!(pairs.contains(&("state".into(), "xyz".into())));
        assert!(pairs.contains(&("scope".into(), "openid email".into())));
    }

    #[test]
    fn test_token_request_carries_code() {
        let provider = OAuthProvider::from_settings("sso", "Example SSO", &settings()).unwrap();
        let request = provider.token_request("abc", "https://chat.example.com/cb").unwrap();

        assert_eq!(request.url.as_str(), "https://sso.example.com/token");
        assert!(request.form.contains(&("code".into(), "abc".into())));
        assert!(request
            .form
            .contains(&("grant_type".into(), "authorization_code".into())));
    }

    #[test]
    fn test_bad_endpoint_is_parse_error() {
        let mut broken = settings();
        broken.auth_endpoint = "not a url".to_string();
        let provider = OAuthProvider::from_settings("sso", "SSO", &broken).unwrap();
        assert!(provider.authorize_url("https://chat.example.com/cb", "s").is_err());
    }
}
