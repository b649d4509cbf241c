use std::time::Duration;

use async_trait::async_trait;
use entity::employees::Role;
use serde::Serialize;
use thiserror::Error;
use tracing::{debug, info};
use url::Url;

const NOTIFY_ADDED_PATH: &str = "/api/tg-bot/employee/notify/added";

#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct EmployeeAdded {
    pub account_id: i64,
    pub organization_id: i64,
    pub employee_name: String,
    pub role: Role,
}

#[derive(Debug, Error)]
pub enum NotifyError {
    #[error("invalid notification endpoint: {0}")]
    InvalidUrl(String),
    #[error("notification transport failed: {0}")]
    Transport(#[from] reqwest::Error),
    #[error("notification rejected with status {0}")]
    Status(reqwest::StatusCode),
}

/// Outbound "employee added" hook. Delivery is at-most-once.
#[async_trait]
pub trait EmployeeNotifier: Send + Sync {
    async fn notify_employee_added(&self, event: &EmployeeAdded) -> Result<(), NotifyError>;
}

/// Chat-bot service client.
#[derive(Clone, Debug)]
pub struct TgBotClient {
    http: reqwest::Client,
    endpoint: Url,
    secret: String,
}

#[derive(Serialize)]
struct NotifyBody<'a> {
    #[serde(flatten)]
    event: &'a EmployeeAdded,
    interserver_secret_key: &'a str,
}

impl TgBotClient {
    pub fn new(
        base_url: &str,
        secret: impl Into<String>,
        timeout: Duration,
    ) -> Result<Self, NotifyError> {
        let endpoint = Url::parse(base_url)
            .and_then(|base| base.join(NOTIFY_ADDED_PATH))
            .map_err(|err| NotifyError::InvalidUrl(format!("{base_url}: {err}")))?;
        let http = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self {
            http,
            endpoint,
            secret: secret.into(),
        })
    }

    pub fn endpoint(&self) -> &Url {
        &self.endpoint
    }
}

#[async_trait]
impl EmployeeNotifier for TgBotClient {
    async fn notify_employee_added(&self, event: &EmployeeAdded) -> Result<(), NotifyError> {
        let body = NotifyBody {
            event,
            interserver_secret_key: &self.secret,
        };
        let response = self
            .http
            .post(self.endpoint.clone())
            .json(&body)
            .send()
            .await?;
        let status = response.status();
        if !status.is_success() {
            return Err(NotifyError::Status(status));
        }
        debug!(account_id = event.account_id, %status, "employee-added notification delivered");
        Ok(())
    }
}

/// Used when no bot endpoint is configured.
#[derive(Clone, Copy, Debug, Default)]
pub struct DisabledNotifier;

#[async_trait]
impl EmployeeNotifier for DisabledNotifier {
    async fn notify_employee_added(&self, event: &EmployeeAdded) -> Result<(), NotifyError> {
        info!(
            account_id = event.account_id,
            organization_id = event.organization_id,
            "notifications disabled; skipping employee-added hook"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use axum::{Json, Router, extract::State, http::StatusCode, routing::post};
    use serde_json::{Value, json};

    use super::*;
    use crate::service::{
        BOOTSTRAP_INVITER, EmployeeApi, EmployeeService,
        tests::{MemoryStore, request},
    };

    type Captured = Arc<Mutex<Vec<Value>>>;

    async fn spawn_bot(status: StatusCode) -> (String, Captured) {
        let captured: Captured = Arc::default();
        let app = Router::new()
            .route(
                NOTIFY_ADDED_PATH,
                post(
                    move |State(seen): State<Captured>, Json(body): Json<Value>| async move {
                        seen.lock().unwrap().push(body);
                        status
                    },
                ),
            )
            .with_state(captured.clone());
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        (format!("http://{addr}"), captured)
    }

    /// Accepts the request and never answers within the test's patience.
    async fn spawn_stalled_bot() -> String {
        let app = Router::new().route(
            NOTIFY_ADDED_PATH,
            post(|| async {
                tokio::time::sleep(Duration::from_secs(5)).await;
                StatusCode::OK
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn event() -> EmployeeAdded {
        EmployeeAdded {
            account_id: 42,
            organization_id: 7,
            employee_name: "Ada".into(),
            role: Role::Moderator,
        }
    }

    #[tokio::test]
    async fn posts_event_with_shared_secret() {
        let (base, captured) = spawn_bot(StatusCode::OK).await;
        let client = TgBotClient::new(&base, "s3cret", Duration::from_secs(2)).unwrap();
        client.notify_employee_added(&event()).await.unwrap();

        let seen = captured.lock().unwrap();
        assert_eq!(seen.len(), 1);
        assert_eq!(
            seen[0],
            json!({
                "account_id": 42,
                "organization_id": 7,
                "employee_name": "Ada",
                "role": "moderator",
                "interserver_secret_key": "s3cret",
            })
        );
    }

    #[tokio::test]
    async fn non_success_status_is_an_error() {
        let (base, _) = spawn_bot(StatusCode::BAD_GATEWAY).await;
        let client = TgBotClient::new(&base, "", Duration::from_secs(2)).unwrap();
        let err = client.notify_employee_added(&event()).await.unwrap_err();
        assert!(matches!(err, NotifyError::Status(s) if s == StatusCode::BAD_GATEWAY));
    }

    #[tokio::test]
    async fn stalled_bot_is_cut_off_by_timeout() {
        let base = spawn_stalled_bot().await;
        let client = TgBotClient::new(&base, "", Duration::from_millis(100)).unwrap();
        let started = std::time::Instant::now();
        let err = client.notify_employee_added(&event()).await.unwrap_err();
        assert!(matches!(&err, NotifyError::Transport(e) if e.is_timeout()), "{err:?}");
        assert!(started.elapsed() < Duration::from_secs(4));
    }

    #[tokio::test]
    async fn create_survives_a_stalled_bot() {
        let base = spawn_stalled_bot().await;
        let store = Arc::new(MemoryStore::default());
        let client = TgBotClient::new(&base, "", Duration::from_millis(100)).unwrap();
        let service = EmployeeService::new(store.clone(), Arc::new(client));

        let id = service
            .create_employee(request(1, BOOTSTRAP_INVITER, Role::Admin))
            .await
            .unwrap();
        assert_eq!(id, 1);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn endpoint_is_rooted_at_bot_prefix() {
        let client =
            TgBotClient::new("http://bot.internal:9000/ignored", "", Duration::from_secs(1))
                .unwrap();
        assert_eq!(
            client.endpoint().as_str(),
            "http://bot.internal:9000/api/tg-bot/employee/notify/added"
        );
    }

    #[test]
    fn bad_base_url_is_rejected() {
        let err = TgBotClient::new("::nope", "", Duration::from_secs(1)).unwrap_err();
        assert!(matches!(err, NotifyError::InvalidUrl(_)));
    }
}
