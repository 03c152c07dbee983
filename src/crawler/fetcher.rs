//! Page fetching
//!
//! This module handles everything between a target URL and its markup:
//! - The `Browser` / `FetchSession` seam that hides the rendering engine
//! - `HttpBrowser`, the default reqwest-backed implementation
//! - The per-target fetch protocol: bounded navigation, bot-challenge
//!   detection with a single re-check, and guaranteed session release

use crate::config::CrawlerConfig;
use crate::{FetchError, FetchResult};
use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue, ACCEPT_LANGUAGE, CONTENT_TYPE, REFERER};
use reqwest::{Client, StatusCode};
use scraper::{Html, Selector};
use std::time::Duration;

/// Resource types a rendering browser should refuse to load
pub const BLOCKED_RESOURCE_TYPES: &[&str] = &["image", "stylesheet", "font", "media"];

/// Per-session settings applied before navigation
#[derive(Debug, Clone)]
pub struct SessionSettings {
    pub accept_language: String,
    pub referer: String,
    pub blocked_resource_types: Vec<String>,
}

impl SessionSettings {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            accept_language: config.accept_language.clone(),
            referer: config.referer.clone(),
            blocked_resource_types: BLOCKED_RESOURCE_TYPES
                .iter()
                .map(|s| s.to_string())
                .collect(),
        }
    }
}

/// Something that can open independent page sessions
#[async_trait]
pub trait Browser: Send + Sync {
    /// Opens a fresh session with the given headers and resource blocking
    async fn open_session(&self, settings: &SessionSettings) -> FetchResult<Box<dyn FetchSession>>;
}

/// A single page session
///
/// Sessions must be closed by the caller on every path.
#[async_trait]
pub trait FetchSession: Send {
    /// Loads the URL until the document is available
    async fn navigate(&mut self, url: &str) -> FetchResult<()>;

    /// Title of the currently loaded document
    async fn title(&mut self) -> FetchResult<Option<String>>;

    /// Serialized markup of the currently loaded document
    async fn content(&mut self) -> FetchResult<String>;

    /// Gives an interstitial time to resolve before it is checked again
    async fn settle(&mut self, grace: Duration) -> FetchResult<()> {
        tokio::time::sleep(grace).await;
        Ok(())
    }

    /// Releases the session
    async fn close(self: Box<Self>);
}

/// Timing and detection parameters of the fetch protocol
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    pub navigation_timeout: Duration,
    pub challenge_wait: Duration,
    pub challenge_title: String,
}

impl FetchPolicy {
    pub fn from_config(config: &CrawlerConfig) -> Self {
        Self {
            navigation_timeout: Duration::from_secs(config.navigation_timeout_secs),
            challenge_wait: Duration::from_secs(config.challenge_wait_secs),
            challenge_title: config.challenge_title.clone(),
        }
    }
}

/// Fetches the markup of one URL
///
/// Opens a session, navigates with a bounded timeout, and checks for a bot
/// challenge. A challenge gets one grace interval and one re-check; if it
/// is still showing, the fetch fails. The session is closed before
/// returning, whatever the outcome.
pub async fn fetch_page(
    browser: &dyn Browser,
    settings: &SessionSettings,
    policy: &FetchPolicy,
    url: &str,
) -> FetchResult<String> {
    let mut session = browser.open_session(settings).await?;
    let result = load_document(session.as_mut(), policy, url).await;
    session.close().await;
    result
}

async fn load_document(
    session: &mut dyn FetchSession,
    policy: &FetchPolicy,
    url: &str,
) -> FetchResult<String> {
    match tokio::time::timeout(policy.navigation_timeout, session.navigate(url)).await {
        Ok(result) => result?,
        Err(_) => {
            return Err(FetchError::NavigationTimeout {
                seconds: policy.navigation_timeout.as_secs(),
            })
        }
    }

    if is_challenge(session, policy).await? {
        tracing::info!("Bot challenge detected on {}, waiting...", url);
        let limit = policy.navigation_timeout + policy.challenge_wait;
        match tokio::time::timeout(limit, session.settle(policy.challenge_wait)).await {
            Ok(result) => result?,
            Err(_) => {
                return Err(FetchError::NavigationTimeout {
                    seconds: limit.as_secs(),
                })
            }
        }
        if is_challenge(session, policy).await? {
            return Err(FetchError::BotChallengeUnresolved);
        }
    }

    session.content().await
}

async fn is_challenge(session: &mut dyn FetchSession, policy: &FetchPolicy) -> FetchResult<bool> {
    Ok(session
        .title()
        .await?
        .is_some_and(|title| title.trim() == policy.challenge_title))
}

/// Default browser: plain HTTP document fetches over reqwest
///
/// Only the document itself is requested. A response whose content type
/// maps to a blocked resource type is refused.
pub struct HttpBrowser {
    client: Client,
}

impl HttpBrowser {
    /// Builds the shared HTTP client
    pub fn new(config: &CrawlerConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .user_agent(config.user_agent.clone())
            .connect_timeout(Duration::from_secs(10))
            .timeout(Duration::from_secs(config.navigation_timeout_secs))
            .gzip(true)
            .brotli(true)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Browser for HttpBrowser {
    async fn open_session(&self, settings: &SessionSettings) -> FetchResult<Box<dyn FetchSession>> {
        let mut headers = HeaderMap::new();
        for (name, value) in [
            (ACCEPT_LANGUAGE, &settings.accept_language),
            (REFERER, &settings.referer),
        ] {
            let value = HeaderValue::from_str(value)
                .map_err(|e| FetchError::TransientNetwork(format!("invalid header: {e}")))?;
            headers.insert(name, value);
        }

        Ok(Box::new(HttpSession {
            client: self.client.clone(),
            headers,
            blocked: settings.blocked_resource_types.clone(),
            current: None,
        }))
    }
}

struct LoadedDocument {
    url: String,
    status: StatusCode,
    body: String,
}

struct HttpSession {
    client: Client,
    headers: HeaderMap,
    blocked: Vec<String>,
    current: Option<LoadedDocument>,
}

impl HttpSession {
    fn loaded(&self) -> FetchResult<&LoadedDocument> {
        self.current
            .as_ref()
            .ok_or_else(|| FetchError::TransientNetwork("no document loaded".to_string()))
    }
}

#[async_trait]
impl FetchSession for HttpSession {
    async fn navigate(&mut self, url: &str) -> FetchResult<()> {
        let response = self
            .client
            .get(url)
            .headers(self.headers.clone())
            .send()
            .await
            .map_err(classify_reqwest_error)?;

        let status = response.status();
        // Challenge interstitials are served as 403/503. Their bodies are
        // kept for the title check; `content` still refuses them.
        if !status.is_success()
            && status != StatusCode::FORBIDDEN
            && status != StatusCode::SERVICE_UNAVAILABLE
        {
            return Err(FetchError::HttpStatus(status.as_u16()));
        }

        let content_type = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok());
        if let Some(kind) = content_type.and_then(resource_type) {
            if self.blocked.iter().any(|blocked| blocked == kind) {
                return Err(FetchError::BlockedResource(kind.to_string()));
            }
        }

        let body = response.text().await.map_err(classify_reqwest_error)?;
        self.current = Some(LoadedDocument {
            url: url.to_string(),
            status,
            body,
        });
        Ok(())
    }

    async fn title(&mut self) -> FetchResult<Option<String>> {
        Ok(document_title(&self.loaded()?.body))
    }

    async fn content(&mut self) -> FetchResult<String> {
        let document = self.loaded()?;
        if !document.status.is_success() {
            return Err(FetchError::HttpStatus(document.status.as_u16()));
        }
        Ok(document.body.clone())
    }

    /// Waits, then reloads the same URL as a browser would after a challenge
    async fn settle(&mut self, grace: Duration) -> FetchResult<()> {
        tokio::time::sleep(grace).await;
        let url = self.loaded()?.url.clone();
        self.navigate(&url).await
    }

    async fn close(self: Box<Self>) {}
}

fn classify_reqwest_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::TransientNetwork(format!("request timeout: {e}"))
    } else if e.is_connect() {
        FetchError::TransientNetwork(format!("connection failed: {e}"))
    } else {
        FetchError::TransientNetwork(e.to_string())
    }
}

/// Maps a response `Content-Type` to the resource type a browser would
/// classify it as
pub fn resource_type(content_type: &str) -> Option<&'static str> {
    let mime = content_type
        .split(';')
        .next()
        .unwrap_or_default()
        .trim()
        .to_ascii_lowercase();
    let (top, sub) = mime.split_once('/')?;
    match (top, sub) {
        ("image", _) => Some("image"),
        ("text", "css") => Some("stylesheet"),
        ("font", _) => Some("font"),
        ("application", sub) if sub.starts_with("font-") || sub.starts_with("x-font") => {
            Some("font")
        }
        ("audio" | "video", _) => Some("media"),
        _ => None,
    }
}

/// Extracts the trimmed `<title>` of a document
pub fn document_title(markup: &str) -> Option<String> {
    let document = Html::parse_document(markup);
    let selector = Selector::parse("title").ok()?;
    document
        .select(&selector)
        .next()
        .map(|element| element.text().collect::<String>().trim().to_string())
}
