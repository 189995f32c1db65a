//! Bounded retry with mid-sequence credential refresh.
//!
//! Wraps a single idempotent remote read. Before each retry, if the cached
//! access token has outlived its expiry the refresher is invoked
//! best-effort; a refresh failure is logged and the stale token is retried
//! anyway.

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use metrics::counter;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::config::RetryConfig;
use crate::error::SyncError;
use crate::hubspot::HubSpotClient;
use crate::models::Account;

/// Delay before retry `attempt` (attempt numbering starts at 1):
/// `base * 2^attempt`.
pub fn backoff_delay(policy: &RetryConfig, attempt: u32) -> Duration {
    Duration::from_millis(
        policy
            .backoff_base_ms
            .saturating_mul(2u64.saturating_pow(attempt)),
    )
}

/// Run `operation` with up to `policy.limit + 1` attempts. The closure
/// receives the access token current at call time, so a mid-sequence
/// refresh takes effect on the next attempt.
pub async fn call_with_refresh<T, F, Fut>(
    client: &HubSpotClient,
    account: &mut Account,
    policy: RetryConfig,
    operation: F,
) -> Result<T, SyncError>
where
    F: Fn(String) -> Fut,
    Fut: Future<Output = Result<T, SyncError>>,
{
    let mut attempt: u32 = 0;

    loop {
        match operation(account.access_token.clone()).await {
            Ok(value) => {
                if attempt > 0 {
                    debug!(hub_id = %account.hub_id, attempt = attempt + 1, "Remote call succeeded after retry");
                }
                return Ok(value);
            }
            Err(err) => {
                attempt += 1;
                counter!("remote_call_retries_total").increment(1);

                if attempt > policy.limit {
                    counter!("remote_call_exhausted_total").increment(1);
                    return Err(SyncError::Exhausted {
                        attempts: attempt,
                        last_error: err.to_string(),
                    });
                }

                warn!(
                    hub_id = %account.hub_id,
                    attempt,
                    error = %err,
                    "Remote call failed, will retry"
                );

                if account.token_expired(Utc::now()) {
                    match client.refresh_access_token(&account.refresh_token).await {
                        Ok(token) => {
                            account.apply_token(token.access_token, token.expires_in, Utc::now());
                            counter!("token_refresh_success_total").increment(1);
                            debug!(hub_id = %account.hub_id, "Refreshed expired access token mid-retry");
                        }
                        Err(refresh_err) => {
                            counter!("token_refresh_failure_total").increment(1);
                            warn!(
                                hub_id = %account.hub_id,
                                error = %refresh_err,
                                "Mid-retry token refresh failed, retrying with stale credential"
                            );
                        }
                    }
                }

                sleep(backoff_delay(&policy, attempt)).await;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicU32, Ordering};

    use chrono::Duration as ChronoDuration;
    use serde_json::json;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn fast_policy() -> RetryConfig {
        RetryConfig {
            limit: 4,
            backoff_base_ms: 1,
        }
    }

    async fn test_client() -> (MockServer, HubSpotClient) {
        let server = MockServer::start().await;
        let client = HubSpotClient::new_with_api_base(
            "cid".to_string(),
            "cs".to_string(),
            server.uri(),
            server.uri(),
        );
        (server, client)
    }

    #[test]
    fn backoff_doubles_from_the_base() {
        let policy = RetryConfig {
            limit: 4,
            backoff_base_ms: 5000,
        };
        assert_eq!(backoff_delay(&policy, 1), Duration::from_millis(10_000));
        assert_eq!(backoff_delay(&policy, 2), Duration::from_millis(20_000));
        assert_eq!(backoff_delay(&policy, 3), Duration::from_millis(40_000));
    }

    #[tokio::test]
    async fn returns_first_success_without_retrying() {
        let (_server, client) = test_client().await;
        let mut account = Account::new("hub-1", "tok", "refresh");
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result = call_with_refresh(&client, &mut account, fast_policy(), move |_token| {
            let calls = Arc::clone(&calls_in);
            async move {
                calls.fetch_add(1, Ordering::SeqCst);
                Ok::<_, SyncError>(42u32)
            }
        })
        .await;

        assert_eq!(result.unwrap(), 42);
        assert_eq!(calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn exhausts_after_limit_plus_one_attempts() {
        let (_server, client) = test_client().await;
        let mut account = Account::new("hub-1", "tok", "refresh");
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result: Result<(), _> =
            call_with_refresh(&client, &mut account, fast_policy(), move |_token| {
                let calls = Arc::clone(&calls_in);
                async move {
                    calls.fetch_add(1, Ordering::SeqCst);
                    Err(SyncError::transient("HTTP 500"))
                }
            })
            .await;

        let err = result.unwrap_err();
        assert!(matches!(err, SyncError::Exhausted { attempts: 5, .. }));
        assert_eq!(calls.load(Ordering::SeqCst), 5);
    }

    #[tokio::test]
    async fn recovers_after_transient_failures() {
        let (_server, client) = test_client().await;
        let mut account = Account::new("hub-1", "tok", "refresh");
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result = call_with_refresh(&client, &mut account, fast_policy(), move |_token| {
            let calls = Arc::clone(&calls_in);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) < 2 {
                    Err(SyncError::transient("flaky"))
                } else {
                    Ok("page".to_string())
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "page");
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn expired_token_is_refreshed_between_attempts() {
        let (server, client) = test_client().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v1/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "access_token": "fresh",
                "expires_in": 1800,
            })))
            .expect(1)
            .mount(&server)
            .await;

        let mut account = Account::new("hub-1", "stale", "refresh");
        account.token_expires_at = Some(Utc::now() - ChronoDuration::minutes(5));

        let result = call_with_refresh(&client, &mut account, fast_policy(), move |token| {
            async move {
                if token == "fresh" {
                    Ok(token)
                } else {
                    Err(SyncError::transient("401 expired token"))
                }
            }
        })
        .await;

        assert_eq!(result.unwrap(), "fresh");
        assert_eq!(account.access_token, "fresh");
        assert!(account.token_expires_at.unwrap() > Utc::now());
    }

    #[tokio::test]
    async fn refresh_failure_does_not_abort_the_retry_loop() {
        let (server, client) = test_client().await;
        Mock::given(method("POST"))
            .and(path("/oauth/v1/token"))
            .respond_with(
                ResponseTemplate::new(400).set_body_json(json!({"error": "invalid_grant"})),
            )
            .mount(&server)
            .await;

        let mut account = Account::new("hub-1", "stale", "revoked");
        account.token_expires_at = Some(Utc::now() - ChronoDuration::minutes(5));
        let calls = Arc::new(AtomicU32::new(0));

        let calls_in = Arc::clone(&calls);
        let result = call_with_refresh(&client, &mut account, fast_policy(), move |_token| {
            let calls = Arc::clone(&calls_in);
            async move {
                if calls.fetch_add(1, Ordering::SeqCst) == 0 {
                    Err(SyncError::transient("first failure"))
                } else {
                    Ok("recovered")
                }
            }
        })
        .await;

        // The stale credential is retried after the failed exchange.
        assert_eq!(result.unwrap(), "recovered");
        assert_eq!(account.access_token, "stale");
    }
}
