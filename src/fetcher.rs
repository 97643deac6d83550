//! Rate-limited, retrying page retrieval.
//!
//! The module follows a small decorator design:
//! - [`PageSource`]: anything that can turn a URL into page text
//! - [`HttpPageSource`]: the `reqwest` implementation with the fixed header set
//! - [`Fetcher`]: wraps a source with the pre-request delay, the retry budget
//!   and the minimum-length check
//!
//! # Retry Strategy
//!
//! - Every attempt is preceded by the fixed request delay
//! - A body shorter than `min_content_len` counts as truncated and is retried
//!   without extra wait
//! - Transport failures (connection errors, timeouts, non-2xx statuses) wait
//!   `attempt * backoff_step` before the next attempt
//! - Exhausting the attempts yields `None`; nothing is raised to the caller

use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderValue};
use reqwest::Client;
use std::error::Error;
use std::fmt;
use std::time::{Duration, Instant};
use tokio::time::sleep;
use tracing::{debug, error, instrument, warn};

/// Identifying user agent sent when none is configured. The archive blocks
/// anonymous clients.
pub const DEFAULT_USER_AGENT: &str = "sec_press_archive/0.1 (press-release research; contact@example.com)";

const ACCEPT_VALUE: &str = "text/html,application/xhtml+xml,application/xml;q=0.9,text/plain;q=0.8,*/*;q=0.5";
const ACCEPT_LANGUAGE_VALUE: &str = "en-US,en;q=0.5";

/// Knobs controlling how pages are requested.
#[derive(Debug, Clone)]
pub struct FetchPolicy {
    /// Sleep before every request.
    pub request_delay: Duration,
    /// Per-request transport timeout.
    pub timeout: Duration,
    /// Total attempts per URL.
    pub max_attempts: usize,
    /// Bodies shorter than this many bytes are treated as truncated.
    pub min_content_len: usize,
    /// Wait after the n-th transport failure is `n * backoff_step`.
    pub backoff_step: Duration,
    pub user_agent: String,
}

impl Default for FetchPolicy {
    fn default() -> Self {
        Self {
            request_delay: Duration::from_millis(500),
            timeout: Duration::from_secs(30),
            max_attempts: 3,
            min_content_len: 100,
            backoff_step: Duration::from_secs(2),
            user_agent: DEFAULT_USER_AGENT.to_string(),
        }
    }
}

/// Something that can retrieve the text of a page.
pub trait PageSource {
    /// Fetch `url` and return its body as text.
    async fn get_page(&self, url: &str) -> Result<String, Box<dyn Error>>;
}

/// [`PageSource`] backed by a `reqwest` client.
#[derive(Debug, Clone)]
pub struct HttpPageSource {
    client: Client,
}

impl HttpPageSource {
    /// Build a client carrying the identifying user agent and accept headers.
    pub fn new(policy: &FetchPolicy) -> Result<Self, Box<dyn Error>> {
        let user_agent = if policy.user_agent.trim().is_empty() {
            DEFAULT_USER_AGENT
        } else {
            policy.user_agent.trim()
        };

        let mut headers = HeaderMap::new();
        headers.insert(ACCEPT, HeaderValue::from_static(ACCEPT_VALUE));
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static(ACCEPT_LANGUAGE_VALUE));

        let client = Client::builder()
            .user_agent(user_agent)
            .default_headers(headers)
            .timeout(policy.timeout)
            .gzip(true)
            .brotli(true)
            .build()?;

        Ok(Self { client })
    }
}

impl PageSource for HttpPageSource {
    #[instrument(level = "debug", skip_all, fields(%url))]
    async fn get_page(&self, url: &str) -> Result<String, Box<dyn Error>> {
        let response = self.client.get(url).send().await?.error_for_status()?;
        Ok(response.text().await?)
    }
}

/// Wraps a [`PageSource`] with rate limiting and retries.
pub struct Fetcher<S> {
    source: S,
    policy: FetchPolicy,
}

impl<S> fmt::Debug for Fetcher<S> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Fetcher")
            .field("policy", &self.policy)
            .finish()
    }
}

impl<S: PageSource> Fetcher<S> {
    pub fn new(source: S, policy: FetchPolicy) -> Self {
        Self { source, policy }
    }

    #[cfg(test)]
    pub fn source(&self) -> &S {
        &self.source
    }

    /// Retrieve `url`, returning `None` once every attempt has failed or come
    /// back truncated.
    #[instrument(level = "info", skip(self))]
    pub async fn fetch(&self, url: &str) -> Option<String> {
        let total_t0 = Instant::now();
        let max = self.policy.max_attempts.max(1);

        for attempt in 1..=max {
            sleep(self.policy.request_delay).await;

            match self.source.get_page(url).await {
                Ok(body) if body.len() < self.policy.min_content_len => {
                    warn!(
                        attempt,
                        max,
                        bytes = body.len(),
                        min = self.policy.min_content_len,
                        "Content too short; retrying"
                    );
                }
                Ok(body) => {
                    debug!(
                        attempt,
                        bytes = body.len(),
                        elapsed_ms = total_t0.elapsed().as_millis() as u64,
                        "Fetched page"
                    );
                    return Some(body);
                }
                Err(e) if attempt < max => {
                    let wait = self.policy.backoff_step.saturating_mul(attempt as u32);
                    warn!(attempt, max, ?wait, error = %e, "Fetch attempt failed; backing off");
                    sleep(wait).await;
                }
                Err(e) => {
                    error!(attempt, max, error = %e, "Fetch failed; giving up");
                    return None;
                }
            }
        }

        error!(
            max,
            elapsed_ms = total_t0.elapsed().as_millis() as u64,
            "Page unavailable after all attempts"
        );
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::collections::VecDeque;
    use tokio::time::Instant;

    /// Replays canned responses and records when each request was made.
    struct ScriptedSource {
        responses: RefCell<VecDeque<Result<String, String>>>,
        requested_at: RefCell<Vec<Instant>>,
    }

    impl ScriptedSource {
        fn new(responses: Vec<Result<String, String>>) -> Self {
            Self {
                responses: RefCell::new(responses.into()),
                requested_at: RefCell::new(Vec::new()),
            }
        }
    }

    impl PageSource for ScriptedSource {
        async fn get_page(&self, _url: &str) -> Result<String, Box<dyn Error>> {
            self.requested_at.borrow_mut().push(Instant::now());
            match self.responses.borrow_mut().pop_front() {
                Some(Ok(body)) => Ok(body),
                Some(Err(e)) => Err(e.into()),
                None => Err("no scripted response".into()),
            }
        }
    }

    fn request_offsets(fetcher: &Fetcher<ScriptedSource>, start: Instant) -> Vec<Duration> {
        fetcher
            .source()
            .requested_at
            .borrow()
            .iter()
            .map(|at| *at - start)
            .collect()
    }

    fn full_page() -> String {
        "Release text. ".repeat(20)
    }

    fn fast_policy() -> FetchPolicy {
        FetchPolicy {
            request_delay: Duration::ZERO,
            timeout: Duration::from_secs(5),
            max_attempts: 3,
            min_content_len: 100,
            backoff_step: Duration::ZERO,
            user_agent: "tester research@example.com".to_string(),
        }
    }

    fn fetcher(policy: FetchPolicy) -> Fetcher<HttpPageSource> {
        let source = HttpPageSource::new(&policy).unwrap();
        Fetcher::new(source, policy)
    }

    #[test]
    fn test_default_policy() {
        let policy = FetchPolicy::default();
        assert_eq!(policy.request_delay, Duration::from_millis(500));
        assert_eq!(policy.timeout, Duration::from_secs(30));
        assert_eq!(policy.max_attempts, 3);
        assert_eq!(policy.min_content_len, 100);
        assert_eq!(policy.backoff_step, Duration::from_secs(2));
        assert_eq!(policy.user_agent, DEFAULT_USER_AGENT);
    }

    #[tokio::test(start_paused = true)]
    async fn test_short_bodies_retry_after_request_delay_only() {
        let source = ScriptedSource::new(vec![Ok("x".repeat(50)), Ok("x".repeat(99)), Ok(full_page())]);
        let fetcher = Fetcher::new(source, FetchPolicy::default());
        let start = Instant::now();

        let result = fetcher.fetch("https://www.sec.gov/news/press/2003-1.htm").await;

        assert_eq!(result, Some(full_page()));
        assert_eq!(
            request_offsets(&fetcher, start),
            vec![
                Duration::from_millis(500),
                Duration::from_millis(1000),
                Duration::from_millis(1500)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_transport_errors_back_off_linearly() {
        let source = ScriptedSource::new(vec![
            Err("connection reset".to_string()),
            Err("timed out".to_string()),
            Ok(full_page()),
        ]);
        let fetcher = Fetcher::new(source, FetchPolicy::default());
        let start = Instant::now();

        let result = fetcher.fetch("https://www.sec.gov/news/press/2003-1.htm").await;

        assert!(result.is_some());
        // 0.5 s delay, then 2 s backoff + 0.5 s delay, then 4 s backoff + 0.5 s delay.
        assert_eq!(
            request_offsets(&fetcher, start),
            vec![
                Duration::from_millis(500),
                Duration::from_millis(3000),
                Duration::from_millis(7500)
            ]
        );
    }

    #[tokio::test(start_paused = true)]
    async fn test_last_transport_error_gives_up_without_waiting() {
        let source = ScriptedSource::new(vec![Err("refused".to_string()); 3]);
        let fetcher = Fetcher::new(source, FetchPolicy::default());
        let start = Instant::now();

        let result = fetcher.fetch("https://www.sec.gov/news/press/2003-1.htm").await;

        assert!(result.is_none());
        assert_eq!(start.elapsed(), Duration::from_millis(7500));
    }

    #[tokio::test]
    async fn test_short_response_exhausts_retries() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/short.htm")
            .with_status(200)
            .with_body("x".repeat(50))
            .expect(3)
            .create_async()
            .await;

        let result = fetcher(fast_policy())
            .fetch(&format!("{}/short.htm", server.url()))
            .await;

        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_server_errors_are_retried_then_unavailable() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/broken")
            .with_status(503)
            .with_body("y".repeat(500))
            .expect(3)
            .create_async()
            .await;

        let result = fetcher(fast_policy())
            .fetch(&format!("{}/broken", server.url()))
            .await;

        assert!(result.is_none());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_full_page_returned_on_first_attempt() {
        let mut server = mockito::Server::new_async().await;
        let body = format!("<html><body><p>{}</p></body></html>", "Release text. ".repeat(20));
        let mock = server
            .mock("GET", "/news/press/1998-1.txt")
            .with_status(200)
            .with_body(body.clone())
            .expect(1)
            .create_async()
            .await;

        let result = fetcher(fast_policy())
            .fetch(&format!("{}/news/press/1998-1.txt", server.url()))
            .await;

        assert_eq!(result.as_deref(), Some(body.as_str()));
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_identifying_headers_are_sent() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/index.shtml")
            .match_header("user-agent", "tester research@example.com")
            .match_header("accept-language", ACCEPT_LANGUAGE_VALUE)
            .with_status(200)
            .with_body("z".repeat(200))
            .create_async()
            .await;

        let result = fetcher(fast_policy())
            .fetch(&format!("{}/index.shtml", server.url()))
            .await;

        assert!(result.is_some());
        mock.assert_async().await;
    }

    #[tokio::test]
    async fn test_blank_user_agent_falls_back_to_default() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/ua")
            .match_header("user-agent", DEFAULT_USER_AGENT)
            .with_status(200)
            .with_body("z".repeat(200))
            .create_async()
            .await;

        let policy = FetchPolicy {
            user_agent: "   ".to_string(),
            ..fast_policy()
        };
        let result = fetcher(policy).fetch(&format!("{}/ua", server.url())).await;

        assert!(result.is_some());
        mock.assert_async().await;
    }
}
