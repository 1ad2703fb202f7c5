//! End-user authentication for a project
//!
//! The auth API lives under `/api/auth` of the project host and is keyed
//! by the project's public key rather than its secret API key.

use crate::{
    transport::{self, ApiSurface, Credential, Transport},
    types::{AuthResult, AuthSession, AuthUser, OAuthAuthorizeResponse},
    AuthConfig, ClientError, Result,
};
use reqwest::Method;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::{debug, instrument};

/// Optional sign-up fields
#[derive(Clone, Debug, Default)]
pub struct SignUpOptions {
    pub full_name: Option<String>,
    pub user_metadata: Option<Map<String, Value>>,
}

impl SignUpOptions {
    /// Set the display name
    pub fn with_full_name(mut self, full_name: impl Into<String>) -> Self {
        self.full_name = Some(full_name.into());
        self
    }

    /// Attach user metadata
    pub fn with_user_metadata(mut self, metadata: Map<String, Value>) -> Self {
        self.user_metadata = Some(metadata);
        self
    }
}

#[derive(Serialize)]
struct SignUpRequest<'a> {
    email: &'a str,
    password: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    full_name: Option<&'a str>,
    #[serde(skip_serializing_if = "Option::is_none")]
    user_metadata: Option<&'a Map<String, Value>>,
}

#[derive(Serialize)]
struct LoginRequest<'a> {
    email: &'a str,
    password: &'a str,
}

#[derive(Serialize)]
struct OAuthCallbackRequest<'a> {
    code: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    redirect_uri: Option<&'a str>,
}

#[derive(Serialize)]
struct ForgotPasswordRequest<'a> {
    email: &'a str,
}

#[derive(Serialize)]
struct ResetPasswordRequest<'a> {
    token: &'a str,
    new_password: &'a str,
}

/// Token payload shared by sign-up, login and OAuth exchange
#[derive(Deserialize)]
struct TokenResponse {
    #[serde(default)]
    user: Option<AuthUser>,
    #[serde(flatten)]
    session: AuthSession,
}

/// Build the auth base URL from a project slug, host or full URL
///
/// - `myproj` becomes `https://myproj.{base_domain}/api/auth`
/// - `myproj.wowmysql.com` gets a scheme but no second domain
/// - `https://myproj.wowmysql.com/api/` keeps its scheme and host
///
/// A trailing `/` and `/api` are stripped before `/api/auth` is added.
/// An empty `base_domain` falls back to `wowmysql.com`.
pub fn build_auth_base_url(project_url: &str, base_domain: &str, secure: bool) -> String {
    let base_domain = if base_domain.is_empty() {
        "wowmysql.com"
    } else {
        base_domain
    };
    let project = project_url.trim();

    let mut url = if project.starts_with("http://") || project.starts_with("https://") {
        project.to_string()
    } else {
        let scheme = if secure { "https" } else { "http" };
        if project.contains(&format!(".{}", base_domain)) || project.ends_with(base_domain) {
            format!("{}://{}", scheme, project)
        } else {
            format!("{}://{}.{}", scheme, project, base_domain)
        }
    };

    if url.ends_with('/') {
        url.pop();
    }
    if let Some(stripped) = url.strip_suffix("/api") {
        url.truncate(stripped.len());
    }
    url.push_str("/api/auth");
    url
}

/// Project auth client
///
/// Holds the current session tokens. Methods that replace them take
/// `&mut self`; use one client per signed-in user.
#[derive(Debug)]
pub struct AuthClient {
    transport: Transport,
    access_token: Option<String>,
    refresh_token: Option<String>,
}

impl AuthClient {
    /// Create a new auth client
    pub fn new(config: AuthConfig) -> Result<Self> {
        let base_url = build_auth_base_url(&config.project_url, &config.base_domain, config.secure);
        let transport = Transport::new(
            &base_url,
            Credential::PublicKey(config.public_api_key.as_deref()),
            &config.user_agent,
            config.timeout,
            ApiSurface::Data,
        )?;

        Ok(Self {
            transport,
            access_token: None,
            refresh_token: None,
        })
    }

    /// Base URL every auth path is joined to
    pub fn base_url(&self) -> &str {
        self.transport.base_url()
    }

    /// Register a new user and store the returned session
    #[instrument(skip(self, password, options))]
    pub async fn sign_up(
        &mut self,
        email: &str,
        password: &str,
        options: SignUpOptions,
    ) -> Result<AuthResult> {
        let request = SignUpRequest {
            email,
            password,
            full_name: options.full_name.as_deref(),
            user_metadata: options.user_metadata.as_ref(),
        };
        let response: TokenResponse = self
            .transport
            .send_json(Method::POST, "/signup", &request)
            .await?;
        Ok(self.persist(response))
    }

    /// Log in with email and password and store the session
    ///
    /// The login endpoint returns tokens only, so `user` is `None`.
    #[instrument(skip(self, password))]
    pub async fn sign_in(&mut self, email: &str, password: &str) -> Result<AuthResult> {
        let response: TokenResponse = self
            .transport
            .send_json(Method::POST, "/login", &LoginRequest { email, password })
            .await?;
        let mut result = self.persist(response);
        result.user = None;
        Ok(result)
    }

    /// Profile of the signed-in user
    ///
    /// Uses `token_override` when given, the stored access token
    /// otherwise.
    #[instrument(skip(self, token_override))]
    pub async fn get_user(&self, token_override: Option<&str>) -> Result<AuthUser> {
        let token = token_override
            .filter(|t| !t.is_empty())
            .or(self.access_token.as_deref())
            .ok_or(ClientError::MissingAccessToken)?;

        let req = self.transport.request(Method::GET, "/me").bearer_auth(token);
        let bytes = self.transport.dispatch(req).await?;
        transport::decode(&bytes)
    }

    /// Authorization URL of an OAuth provider
    #[instrument(skip(self))]
    pub async fn get_oauth_authorization_url(
        &self,
        provider: &str,
        frontend_redirect_uri: &str,
    ) -> Result<OAuthAuthorizeResponse> {
        let path = self.transport.path(&["oauth", provider])?;
        self.transport
            .get_json(
                &path,
                &[("frontend_redirect_uri", frontend_redirect_uri.to_string())],
            )
            .await
    }

    /// Exchange the code from an OAuth redirect for a session
    #[instrument(skip(self, code))]
    pub async fn exchange_oauth_callback(
        &mut self,
        provider: &str,
        code: &str,
        redirect_uri: Option<&str>,
    ) -> Result<AuthResult> {
        let path = self.transport.path(&["oauth", provider, "callback"])?;
        let response: TokenResponse = self
            .transport
            .send_json(Method::POST, &path, &OAuthCallbackRequest { code, redirect_uri })
            .await?;
        Ok(self.persist(response))
    }

    /// Ask the backend to email a reset link
    ///
    /// The backend answers the same way whether or not the address exists.
    #[instrument(skip(self))]
    pub async fn forgot_password(&self, email: &str) -> Result<Map<String, Value>> {
        self.transport
            .send_json(Method::POST, "/forgot-password", &ForgotPasswordRequest { email })
            .await
    }

    /// Set a new password using a reset token
    #[instrument(skip(self, token, new_password))]
    pub async fn reset_password(&self, token: &str, new_password: &str) -> Result<Map<String, Value>> {
        self.transport
            .send_json(
                Method::POST,
                "/reset-password",
                &ResetPasswordRequest { token, new_password },
            )
            .await
    }

    /// Currently stored tokens, empty when signed out
    pub fn session(&self) -> AuthSession {
        AuthSession {
            access_token: self.access_token.clone().unwrap_or_default(),
            refresh_token: self.refresh_token.clone().unwrap_or_default(),
            token_type: "bearer".to_string(),
            expires_in: 0,
        }
    }

    /// Replace the stored tokens
    pub fn set_session(&mut self, access_token: impl Into<String>, refresh_token: impl Into<String>) {
        self.access_token = Some(access_token.into());
        self.refresh_token = Some(refresh_token.into());
    }

    /// Forget the stored tokens
    pub fn clear_session(&mut self) {
        self.access_token = None;
        self.refresh_token = None;
    }

    fn persist(&mut self, response: TokenResponse) -> AuthResult {
        debug!("Storing new session");
        let session = response.session;
        self.access_token = Some(session.access_token.clone()).filter(|t| !t.is_empty());
        self.refresh_token = Some(session.refresh_token.clone()).filter(|t| !t.is_empty());
        AuthResult {
            user: response.user,
            session,
        }
    }
}
