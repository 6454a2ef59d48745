use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use crate::google::models::{
    CalendarEvent, CalendarEventList, GmailMessage, GmailMessageList, GmailMessageRef,
};
use crate::windows::SyncWindow;

const GMAIL_BASE_URL: &str = "https://gmail.googleapis.com";
const CALENDAR_BASE_URL: &str = "https://www.googleapis.com/calendar/v3";

#[derive(Debug, Clone)]
pub struct GoogleClientConfig {
    pub gmail_base_url: String,
    pub calendar_base_url: String,
    pub access_token: String,
    pub page_size: usize,
    pub max_retries: u32,
    pub timeout_secs: u64,
}

impl GoogleClientConfig {
    /// Load Google connector config from environment.
    ///
    /// Returns `Ok(None)` if no `GOOGLE_ACCESS_TOKEN` is present (connector
    /// not configured). Returns `Err` if the token is set but blank
    /// (fail-fast on misconfiguration).
    pub fn from_env() -> Result<Option<Self>, String> {
        let access_token = match std::env::var("GOOGLE_ACCESS_TOKEN").ok() {
            Some(v) => v,
            None => return Ok(None),
        };
        if access_token.trim().is_empty() {
            return Err("GOOGLE_ACCESS_TOKEN is set but empty".to_string());
        }

        let page_size = std::env::var("GOOGLE_PAGE_SIZE")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(100);
        let max_retries = std::env::var("GOOGLE_MAX_RETRIES")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(3);
        let timeout_secs = std::env::var("GOOGLE_TIMEOUT_SECS")
            .ok()
            .and_then(|v| v.parse().ok())
            .unwrap_or(30);

        Ok(Some(Self {
            gmail_base_url: GMAIL_BASE_URL.to_string(),
            calendar_base_url: CALENDAR_BASE_URL.to_string(),
            access_token,
            page_size,
            max_retries,
            timeout_secs,
        }))
    }
}

#[derive(Debug, thiserror::Error)]
pub enum GoogleApiError {
    #[error("HTTP {status}: {body}")]
    HttpError { status: StatusCode, body: String },

    #[error("request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("max retries exceeded after {attempts} attempts: {last_error}")]
    MaxRetriesExceeded { attempts: u32, last_error: String },

    #[error("malformed item: {0}")]
    Decode(String),
}

#[derive(Clone)]
pub struct GoogleClient {
    client: Client,
    config: GoogleClientConfig,
}

impl GoogleClient {
    pub fn new(config: GoogleClientConfig) -> Result<Self, reqwest::Error> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()?;
        Ok(Self { client, config })
    }

    /// For testing: point both APIs at a specific base URL (e.g., wiremock).
    #[cfg(test)]
    pub fn with_base_url(mut self, base_url: &str) -> Self {
        self.config.gmail_base_url = base_url.to_string();
        self.config.calendar_base_url = base_url.to_string();
        self
    }

    /// List the ids of messages received inside the window, paginated.
    pub async fn list_messages(
        &self,
        token: &str,
        window: &SyncWindow,
    ) -> Result<Vec<GmailMessageRef>, GoogleApiError> {
        let query = format!(
            "after:{}%20before:{}",
            window.start.timestamp(),
            window.end.timestamp()
        );
        let mut refs = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/gmail/v1/users/me/messages?q={}&maxResults={}",
                self.config.gmail_base_url, query, self.config.page_size
            );
            if let Some(ref cursor) = page_token {
                url.push_str(&format!("&pageToken={cursor}"));
            }

            let page: GmailMessageList = self.get_json(token, &url).await?;
            refs.extend(page.messages);

            match page.next_page_token {
                Some(cursor) => page_token = Some(cursor),
                None => break,
            }
        }

        Ok(refs)
    }

    /// Fetch one message with metadata headers only.
    pub async fn get_message(
        &self,
        token: &str,
        id: &str,
    ) -> Result<GmailMessage, GoogleApiError> {
        let url = format!(
            "{}/gmail/v1/users/me/messages/{}?format=metadata&metadataHeaders=From&metadataHeaders=Subject",
            self.config.gmail_base_url, id
        );
        self.get_json(token, &url).await
    }

    /// List primary-calendar events overlapping the window, paginated.
    pub async fn list_events(
        &self,
        token: &str,
        window: &SyncWindow,
    ) -> Result<Vec<CalendarEvent>, GoogleApiError> {
        let mut events = Vec::new();
        let mut page_token: Option<String> = None;

        loop {
            let mut url = format!(
                "{}/calendars/primary/events?singleEvents=true&maxResults={}&timeMin={}&timeMax={}",
                self.config.calendar_base_url,
                self.config.page_size,
                window.start.to_rfc3339(),
                window.end.to_rfc3339()
            );
            if let Some(ref cursor) = page_token {
                url.push_str(&format!("&pageToken={cursor}"));
            }

            let page: CalendarEventList = self.get_json(token, &url).await?;
            events.extend(page.items);

            match page.next_page_token {
                Some(cursor) => page_token = Some(cursor),
                None => break,
            }
        }

        Ok(events)
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        token: &str,
        url: &str,
    ) -> Result<T, GoogleApiError> {
        let mut last_error = String::new();

        for attempt in 0..=self.config.max_retries {
            if attempt > 0 {
                let backoff_secs = std::cmp::min(1u64 << attempt, 30);
                tracing::warn!(attempt, backoff_secs, "retrying after backoff");
                tokio::time::sleep(Duration::from_secs(backoff_secs)).await;
            }

            let response = match self.client.get(url).bearer_auth(token).send().await {
                Ok(resp) => resp,
                Err(e) => {
                    last_error = e.to_string();
                    if e.is_timeout() || e.is_connect() {
                        continue;
                    }
                    return Err(GoogleApiError::RequestError(e));
                }
            };

            let status = response.status();

            if status.is_success() {
                return response
                    .json::<T>()
                    .await
                    .map_err(GoogleApiError::RequestError);
            }

            // Honor Retry-After for 429
            if status == StatusCode::TOO_MANY_REQUESTS {
                if let Some(retry_after) = response
                    .headers()
                    .get("retry-after")
                    .and_then(|v| v.to_str().ok())
                    .and_then(|v| v.parse::<u64>().ok())
                {
                    let wait = std::cmp::min(retry_after, 60);
                    tracing::warn!(wait, "rate-limited, waiting Retry-After");
                    tokio::time::sleep(Duration::from_secs(wait)).await;
                }
                last_error = "429 Too Many Requests".to_string();
                continue;
            }

            // Retry on 5xx
            if status.is_server_error() {
                let body = response.text().await.unwrap_or_default();
                last_error = format!("{status}: {body}");
                continue;
            }

            // Fail fast on 4xx (except 429 handled above)
            let body = response.text().await.unwrap_or_default();
            return Err(GoogleApiError::HttpError { status, body });
        }

        Err(GoogleApiError::MaxRetriesExceeded {
            attempts: self.config.max_retries + 1,
            last_error,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config() -> GoogleClientConfig {
        GoogleClientConfig {
            gmail_base_url: "http://localhost".to_string(),
            calendar_base_url: "http://localhost".to_string(),
            access_token: "test-token".to_string(),
            page_size: 2,
            max_retries: 2,
            timeout_secs: 5,
        }
    }

    fn window() -> SyncWindow {
        SyncWindow {
            start: "2025-01-01T00:00:00Z".parse().unwrap(),
            end: "2025-02-01T00:00:00Z".parse().unwrap(),
        }
    }

    #[tokio::test]
    async fn list_messages_single_page() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("q", "after:1735689600 before:1738368000"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{ "id": "msg-1" }],
                "resultSizeEstimate": 1
            })))
            .mount(&server)
            .await;

        let client = GoogleClient::new(test_config())
            .unwrap()
            .with_base_url(&server.uri());

        let refs = client.list_messages("test-token", &window()).await.unwrap();
        assert_eq!(refs.len(), 1);
        assert_eq!(refs[0].id, "msg-1");
    }

    #[tokio::test]
    async fn list_messages_follows_page_tokens() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(query_param("pageToken", "cursor-2"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{ "id": "msg-3" }]
            })))
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{ "id": "msg-1" }, { "id": "msg-2" }],
                "nextPageToken": "cursor-2"
            })))
            .mount(&server)
            .await;

        let client = GoogleClient::new(test_config())
            .unwrap()
            .with_base_url(&server.uri());

        let refs = client.list_messages("test-token", &window()).await.unwrap();
        assert_eq!(refs.len(), 3);
        assert_eq!(refs[2].id, "msg-3");
    }

    #[tokio::test]
    async fn list_messages_empty_mailbox() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "resultSizeEstimate": 0
            })))
            .mount(&server)
            .await;

        let client = GoogleClient::new(test_config())
            .unwrap()
            .with_base_url(&server.uri());

        let refs = client.list_messages("test-token", &window()).await.unwrap();
        assert!(refs.is_empty());
    }

    #[tokio::test]
    async fn get_message_parses_metadata() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages/msg-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "id": "msg-1",
                "internalDate": "1736942400000",
                "snippet": "Let's catch up next week",
                "payload": {
                    "headers": [
                        { "name": "From", "value": "Alex Example <alex@example.com>" },
                        { "name": "Subject", "value": "Quarterly check-in" }
                    ]
                }
            })))
            .mount(&server)
            .await;

        let client = GoogleClient::new(test_config())
            .unwrap()
            .with_base_url(&server.uri());

        let message = client.get_message("test-token", "msg-1").await.unwrap();
        assert_eq!(message.header("Subject"), Some("Quarterly check-in"));
        assert!(message.occurred_at().is_some());
    }

    #[tokio::test]
    async fn list_events_maps_fields() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/calendars/primary/events"))
            .and(query_param("singleEvents", "true"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "items": [{
                    "id": "evt-1",
                    "updated": "2025-01-10T08:00:00Z",
                    "summary": "Project sync",
                    "organizer": { "email": "sam@example.com", "displayName": "Sam Calendar" },
                    "start": { "dateTime": "2025-01-16T09:00:00Z" }
                }]
            })))
            .mount(&server)
            .await;

        let client = GoogleClient::new(test_config())
            .unwrap()
            .with_base_url(&server.uri());

        let events = client.list_events("test-token", &window()).await.unwrap();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].summary, "Project sync");
        assert_eq!(
            events[0].organizer.as_ref().unwrap().email.as_deref(),
            Some("sam@example.com")
        );
    }

    #[tokio::test]
    async fn retries_on_500_then_succeeds() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("internal error"))
            .up_to_n_times(1)
            .mount(&server)
            .await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({
                "messages": [{ "id": "msg-1" }]
            })))
            .mount(&server)
            .await;

        let client = GoogleClient::new(test_config())
            .unwrap()
            .with_base_url(&server.uri());

        let refs = client.list_messages("test-token", &window()).await.unwrap();
        assert_eq!(refs.len(), 1);
    }

    #[tokio::test]
    async fn fails_fast_on_401() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unauthorized"))
            .mount(&server)
            .await;

        let client = GoogleClient::new(test_config())
            .unwrap()
            .with_base_url(&server.uri());

        let err = client
            .list_messages("test-token", &window())
            .await
            .unwrap_err();
        match err {
            GoogleApiError::HttpError { status, body } => {
                assert_eq!(status, StatusCode::UNAUTHORIZED);
                assert_eq!(body, "unauthorized");
            }
            other => panic!("expected HttpError, got: {other:?}"),
        }
    }

    #[tokio::test]
    async fn max_retries_exceeded_on_persistent_500() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .respond_with(ResponseTemplate::new(500).set_body_string("always failing"))
            .mount(&server)
            .await;

        let mut config = test_config();
        config.max_retries = 1;
        let client = GoogleClient::new(config)
            .unwrap()
            .with_base_url(&server.uri());

        let err = client
            .list_messages("test-token", &window())
            .await
            .unwrap_err();
        assert!(matches!(err, GoogleApiError::MaxRetriesExceeded { .. }));
    }

    #[tokio::test]
    async fn sends_bearer_auth() {
        let server = MockServer::start().await;

        Mock::given(method("GET"))
            .and(path("/gmail/v1/users/me/messages"))
            .and(wiremock::matchers::header("Authorization", "Bearer test-token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(serde_json::json!({})))
            .expect(1)
            .mount(&server)
            .await;

        let client = GoogleClient::new(test_config())
            .unwrap()
            .with_base_url(&server.uri());

        client.list_messages("test-token", &window()).await.unwrap();
    }

    // ── Config tests ─────────────────────────────────────────────

    use std::sync::Mutex;

    static ENV_LOCK: Mutex<()> = Mutex::new(());

    #[test]
    fn from_env_returns_none_without_token() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::remove_var("GOOGLE_ACCESS_TOKEN");
        assert!(GoogleClientConfig::from_env().unwrap().is_none());
    }

    #[test]
    fn from_env_fails_on_blank_token() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::set_var("GOOGLE_ACCESS_TOKEN", "   ");
        let err = GoogleClientConfig::from_env().unwrap_err();
        assert!(err.contains("GOOGLE_ACCESS_TOKEN"), "got: {err}");
        std::env::remove_var("GOOGLE_ACCESS_TOKEN");
    }

    #[test]
    fn from_env_applies_defaults() {
        let _g = ENV_LOCK.lock().unwrap();
        std::env::set_var("GOOGLE_ACCESS_TOKEN", "ya29.token");
        std::env::remove_var("GOOGLE_PAGE_SIZE");
        std::env::remove_var("GOOGLE_MAX_RETRIES");

        let config = GoogleClientConfig::from_env().unwrap().unwrap();
        assert_eq!(config.access_token, "ya29.token");
        assert_eq!(config.page_size, 100);
        assert_eq!(config.max_retries, 3);
        assert_eq!(config.gmail_base_url, GMAIL_BASE_URL);

        std::env::remove_var("GOOGLE_ACCESS_TOKEN");
    }
}
