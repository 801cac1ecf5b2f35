use async_trait::async_trait;
use chrono::NaiveDate;
use reqwest::cookie::{CookieStore, Jar};
use reqwest::header::{COOKIE, HeaderValue};
use reqwest::{Client, StatusCode, Url};
use screener_core::{
    OptionQuote, OptionsChainSource, QuoteSource, ScreenerError, TechnicalSnapshot, TickerSymbol,
};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::OnceCell;

pub mod chain;
pub mod technicals;

pub use chain::parse_put_chain;
pub use technicals::parse_technicals;

const BASE_URL: &str = "https://www.barchart.com";
const DEFAULT_USER_AGENT: &str = "Mozilla/5.0 (Windows NT 10.0; Win64; x64)";
/// Any options page works for the session bootstrap; it only has to set cookies.
const SESSION_BOOTSTRAP_PATH: &str = "/stocks/quotes/AAPL/options";
const XSRF_COOKIE: &str = "XSRF-TOKEN";

#[derive(Debug, Clone)]
pub struct BarchartConfig {
    pub base_url: String,
    pub request_timeout: Duration,
    pub user_agent: String,
    /// Pre-extracted `Cookie` header. Skips the session bootstrap when set
    /// together with `xsrf_token`.
    pub cookie: Option<String>,
    pub xsrf_token: Option<String>,
    pub max_attempts: u32,
    pub retry_backoff: Duration,
}

impl Default for BarchartConfig {
    fn default() -> Self {
        Self {
            base_url: BASE_URL.to_string(),
            request_timeout: Duration::from_secs(10),
            user_agent: DEFAULT_USER_AGENT.to_string(),
            cookie: None,
            xsrf_token: None,
            max_attempts: 3,
            retry_backoff: Duration::from_secs(5),
        }
    }
}

impl BarchartConfig {
    /// Defaults overridden by `BARCHART_BASE_URL`, `BARCHART_COOKIE` and
    /// `BARCHART_XSRF_TOKEN` when present.
    pub fn from_env() -> Self {
        let non_empty = |key: &str| std::env::var(key).ok().filter(|v| !v.trim().is_empty());
        let mut config = Self::default();
        if let Some(base_url) = non_empty("BARCHART_BASE_URL") {
            config.base_url = base_url;
        }
        config.cookie = non_empty("BARCHART_COOKIE");
        config.xsrf_token = non_empty("BARCHART_XSRF_TOKEN");
        config
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.request_timeout = timeout;
        self
    }
}

/// Credentials the options API expects alongside each request.
#[derive(Debug, Clone)]
struct Session {
    cookie: Option<String>,
    xsrf_token: String,
}

#[derive(Clone)]
pub struct BarchartClient {
    client: Client,
    jar: Arc<Jar>,
    config: BarchartConfig,
    session: Arc<OnceCell<Session>>,
}

impl BarchartClient {
    pub fn new(config: BarchartConfig) -> Self {
        let jar = Arc::new(Jar::default());
        let client = Client::builder()
            .timeout(config.request_timeout)
            .user_agent(config.user_agent.clone())
            .cookie_provider(Arc::clone(&jar))
            .build()
            .unwrap_or_else(|_| Client::new());

        Self {
            client,
            jar,
            config,
            session: Arc::new(OnceCell::new()),
        }
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.config.base_url.trim_end_matches('/'), path)
    }

    /// Send a request, retrying 429 and 5xx responses with a linear backoff.
    async fn send_request(
        &self,
        symbol: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ScreenerError> {
        let request = builder
            .build()
            .map_err(|e| ScreenerError::unavailable(symbol, e))?;
        let attempts = self.config.max_attempts.max(1);

        for attempt in 1..=attempts {
            let req_clone = request
                .try_clone()
                .ok_or_else(|| ScreenerError::unavailable(symbol, "cannot clone request"))?;
            let response = self
                .client
                .execute(req_clone)
                .await
                .map_err(|e| ScreenerError::unavailable(symbol, e))?;

            let status = response.status();
            if status != StatusCode::TOO_MANY_REQUESTS && !status.is_server_error() {
                return Ok(response);
            }

            if attempt < attempts {
                let wait = self.config.retry_backoff * attempt;
                tracing::warn!(
                    "Barchart {} for {}, waiting {:.1}s before retry {}/{}",
                    status,
                    symbol,
                    wait.as_secs_f64(),
                    attempt,
                    attempts - 1
                );
                tokio::time::sleep(wait).await;
            } else {
                return Err(ScreenerError::unavailable(
                    symbol,
                    format!("HTTP {} after {} attempts", status, attempts),
                ));
            }
        }

        Err(ScreenerError::unavailable(symbol, "no attempts made"))
    }

    async fn get_success(
        &self,
        symbol: &str,
        builder: reqwest::RequestBuilder,
    ) -> Result<reqwest::Response, ScreenerError> {
        let response = self.send_request(symbol, builder).await?;
        if !response.status().is_success() {
            return Err(ScreenerError::unavailable(
                symbol,
                format!("HTTP {}", response.status()),
            ));
        }
        Ok(response)
    }

    /// Scrape moving averages, historical volatility and last price from the
    /// technical-analysis page.
    pub async fn get_technicals(&self, symbol: &TickerSymbol) -> Result<TechnicalSnapshot, ScreenerError> {
        let url = self.url(&format!("/stocks/quotes/{}/technical-analysis", symbol));
        let response = self.get_success(symbol.as_str(), self.client.get(&url)).await?;
        let html = response
            .text()
            .await
            .map_err(|e| ScreenerError::unavailable(symbol.as_str(), e))?;

        Ok(parse_technicals(symbol.clone(), &html))
    }

    /// All puts for one monthly expiration, ascending by strike.
    pub async fn get_put_chain(
        &self,
        symbol: &TickerSymbol,
        expiration: NaiveDate,
    ) -> Result<Vec<OptionQuote>, ScreenerError> {
        let session = self.session().await?;
        let url = self.url("/proxies/core-api/v1/options/get");
        let expiration_str = expiration.format("%Y-%m-%d").to_string();

        let mut builder = self
            .client
            .get(&url)
            .query(&[
                ("baseSymbol", symbol.as_str()),
                ("expirationDate", expiration_str.as_str()),
                ("expirationType", "monthly"),
                ("groupBy", "optionType"),
                ("orderBy", "strikePrice"),
                ("orderDir", "asc"),
                ("optionsOverview", "true"),
                ("raw", "1"),
                ("fields", chain::OPTION_FIELDS),
            ])
            .header("X-XSRF-TOKEN", session.xsrf_token.as_str());
        if let Some(cookie) = &session.cookie {
            builder = builder.header(COOKIE, cookie.as_str());
        }

        let response = self.get_success(symbol.as_str(), builder).await?;
        let body: serde_json::Value = response
            .json()
            .await
            .map_err(|e| ScreenerError::unavailable(symbol.as_str(), e))?;

        let quotes = parse_put_chain(&body, symbol.as_str(), expiration);
        if quotes.is_empty() {
            return Err(ScreenerError::NoQuotesAvailable {
                symbol: symbol.to_string(),
                expiration,
            });
        }

        tracing::debug!("{}: {} puts for {}", symbol, quotes.len(), expiration_str);
        Ok(quotes)
    }

    async fn session(&self) -> Result<&Session, ScreenerError> {
        self.session
            .get_or_try_init(|| async {
                match (&self.config.cookie, &self.config.xsrf_token) {
                    (cookie, Some(token)) => Ok(Session {
                        cookie: cookie.clone(),
                        xsrf_token: token.clone(),
                    }),
                    _ => self.bootstrap_session().await,
                }
            })
            .await
    }

    /// Load an options page so the cookie jar picks up the XSRF token.
    async fn bootstrap_session(&self) -> Result<Session, ScreenerError> {
        let url = self.url(SESSION_BOOTSTRAP_PATH);
        tracing::info!("Bootstrapping Barchart session from {}", url);
        self.get_success("session", self.client.get(&url)).await?;

        let parsed = Url::parse(&url).map_err(|e| ScreenerError::unavailable("session", e))?;
        let cookies = self.jar.cookies(&parsed);
        let xsrf_token = cookies
            .as_ref()
            .and_then(|h: &HeaderValue| h.to_str().ok())
            .and_then(xsrf_from_cookie_header)
            .ok_or_else(|| ScreenerError::unavailable("session", "XSRF-TOKEN cookie not set"))?;

        // The jar attaches the cookies itself; only the token header is needed.
        Ok(Session {
            cookie: None,
            xsrf_token,
        })
    }
}

/// Extract and URL-decode the XSRF token from a `Cookie` header value.
pub fn xsrf_from_cookie_header(header: &str) -> Option<String> {
    header
        .split(';')
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, _)| *name == XSRF_COOKIE)
        .and_then(|(_, value)| urlencoding::decode(value).ok())
        .map(|v| v.into_owned())
        .filter(|v| !v.is_empty())
}

#[async_trait]
impl QuoteSource for BarchartClient {
    fn name(&self) -> &'static str {
        "barchart"
    }

    async fn fetch_technicals(&self, symbol: &TickerSymbol) -> Result<TechnicalSnapshot, ScreenerError> {
        self.get_technicals(symbol).await
    }
}

#[async_trait]
impl OptionsChainSource for BarchartClient {
    fn name(&self) -> &'static str {
        "barchart"
    }

    async fn fetch_put_quotes(
        &self,
        symbol: &TickerSymbol,
        expiration: NaiveDate,
    ) -> Result<Vec<OptionQuote>, ScreenerError> {
        self.get_put_chain(symbol, expiration).await
    }
}
