use std::sync::Arc;
use std::time::Duration;
use log::{debug, error, info, warn};
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{HeaderMap, USER_AGENT};
use reqwest::{Client, RequestBuilder, StatusCode};
use scraper::{Html, Selector};
use url::Url;
use crate::error::{Error, Result};
use crate::models::Credential;
use crate::settings::{Endpoints, RetryPolicy};
use crate::utils::headers::generate_headers;

// Name of the hidden anti-forgery input on the login form.
pub const TOKEN_FIELD: &str = "__RequestVerificationToken";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionStatus {
    Unauthenticated,
    LoggingIn,
    Authenticated,
    // A request failed at the transport level or hit a server error.
    Degraded,
}

// Everything needed to build (and rebuild) a session.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub credential: Credential,
    pub endpoints: Endpoints,
    pub retry: RetryPolicy,
    pub timeout: Duration,
}

// Per-session client state. Dropped as a whole when the session is discarded.
struct SessionState {
    client: Client,
    cookies: Arc<Jar>,
    headers: HeaderMap,
    login_token: Option<String>,
    status: SessionStatus,
}

impl SessionState {
    fn new(timeout: Duration) -> Result<Self> {
        let headers = generate_headers();
        let cookies = Arc::new(Jar::default());
        let client = Client::builder()
            .cookie_provider(Arc::clone(&cookies))
            .default_headers(headers.clone())
            .timeout(timeout)
            .build()?;

        Ok(SessionState {
            client,
            cookies,
            headers,
            login_token: None,
            status: SessionStatus::Unauthenticated,
        })
    }
}

// A fully read response.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: StatusCode,
    pub body: String,
}

// Logged-in portal session that rides out network failures.
pub struct AuthSession {
    config: SessionConfig,
    state: SessionState,
}

impl AuthSession {
    pub fn new(config: SessionConfig) -> Result<Self> {
        let state = SessionState::new(config.timeout)?;
        Ok(AuthSession { config, state })
    }

    // Builds a fresh session and logs it in.
    pub async fn connect(config: SessionConfig) -> Result<Self> {
        let mut session = Self::new(config)?;
        debug!("Session identifies as {:?}", session.headers().get(USER_AGENT));
        session.login().await?;
        Ok(session)
    }

    pub fn status(&self) -> SessionStatus {
        self.state.status
    }

    pub fn headers(&self) -> &HeaderMap {
        &self.state.headers
    }

    pub fn login_token(&self) -> Option<&str> {
        self.state.login_token.as_deref()
    }

    pub fn has_cookies(&self) -> bool {
        self.state.cookies.cookies(&self.config.endpoints.login).is_some()
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    // Fetches the anti-forgery token and posts the login form.
    //
    // The portal gives no reliable success signal, so the session counts as
    // authenticated once the POST completes. A missing token means the login
    // page changed shape and is not retried.
    pub async fn login(&mut self) -> Result<()> {
        self.state.status = SessionStatus::LoggingIn;
        let login_url = self.config.endpoints.login.clone();

        let page = self.get(&login_url).await?;
        if page.status != StatusCode::OK {
            self.state.status = SessionStatus::Unauthenticated;
            return Err(Error::LoginUnavailable {
                url: login_url.to_string(),
                status: page.status,
            });
        }

        let token = match extract_token(&page.body) {
            Ok(token) => token,
            Err(e) => {
                self.state.status = SessionStatus::Unauthenticated;
                return Err(e);
            }
        };

        let username = self.config.credential.username.clone();
        let password = self.config.credential.password().to_string();
        let form = [
            ("Username", username.as_str()),
            ("Password", password.as_str()),
            (TOKEN_FIELD, token.as_str()),
        ];
        let answer = self
            .send(&login_url, |client| client.post(login_url.clone()).form(&form))
            .await?;
        debug!("Login form answered with {}", answer.status);

        self.state.login_token = Some(token);
        self.state.status = SessionStatus::Authenticated;
        info!(
            "Logged in as {} (session cookie {})",
            username,
            if self.has_cookies() { "set" } else { "missing" }
        );
        Ok(())
    }

    // GETs `url`, waiting out transport failures.
    //
    // Any received status is handed back; callers decide what a non-200 means.
    pub async fn get(&mut self, url: &Url) -> Result<Page> {
        let page = self.send(url, |client| client.get(url.clone())).await?;

        if page.status.is_server_error() {
            warn!("Server error during GET of {}: {}", url, page.status);
            self.state.status = SessionStatus::Degraded;
        } else if page.status != StatusCode::OK {
            error!("Non-200 status code during GET of {}: {}", url, page.status);
        } else if self.state.status == SessionStatus::Degraded {
            info!("Portal answers normally again");
            self.state.status = SessionStatus::Authenticated;
        }
        Ok(page)
    }

    async fn send<F>(&mut self, url: &Url, build: F) -> Result<Page>
    where
        F: Fn(&Client) -> RequestBuilder,
    {
        loop {
            match fetch(build(&self.state.client)).await {
                Ok((status, body)) => {
                    return Ok(Page {
                        url: url.clone(),
                        status,
                        body,
                    })
                }
                Err(e) => {
                    warn!("Request to {} failed: {}", url, e);
                    self.recover().await?;
                }
            }
        }
    }

    // Polls the login page until it answers 200 or the retry budget runs out.
    async fn recover(&mut self) -> Result<()> {
        let resume = match self.state.status {
            SessionStatus::Degraded => SessionStatus::Authenticated,
            other => other,
        };
        self.state.status = SessionStatus::Degraded;

        let check_url = self.config.endpoints.login.clone();
        let RetryPolicy { max_retries, interval } = self.config.retry;

        for attempt in 1..=max_retries {
            info!(
                "Checking {} in {:?} (attempt {}/{})",
                check_url, interval, attempt, max_retries
            );
            tokio::time::sleep(interval).await;

            match self.state.client.get(check_url.clone()).send().await {
                Ok(response) if response.status() == StatusCode::OK => {
                    info!("Portal is reachable again");
                    self.state.status = resume;
                    return Ok(());
                }
                Ok(response) => warn!("Login page answered with {}", response.status()),
                Err(e) => warn!("Login page check failed: {}", e),
            }
        }

        self.state.status = SessionStatus::Unauthenticated;
        error!("Exceeded {} retries, giving up", max_retries);
        Err(Error::RetriesExhausted {
            url: check_url.to_string(),
            attempts: max_retries,
        })
    }
}

// Sends a request and reads its body; both steps count as transport.
async fn fetch(request: RequestBuilder) -> reqwest::Result<(StatusCode, String)> {
    let response = request.send().await?;
    let status = response.status();
    let body = response.text().await?;
    Ok((status, body))
}

pub fn extract_token(html: &str) -> Result<String> {
    let document = Html::parse_document(html);
    let selector = Selector::parse(&format!("input[name=\"{}\"]", TOKEN_FIELD))
        .expect("valid token selector");

    document
        .select(&selector)
        .next()
        .and_then(|input| input.value().attr("value"))
        .map(str::to_string)
        .ok_or(Error::MissingToken { field: TOKEN_FIELD })
}
