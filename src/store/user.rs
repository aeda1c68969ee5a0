use crate::api::{cancellable, BackendClient, Payment, UserInfo};
use crate::event::Repaint;
use std::sync::{Arc, PoisonError, RwLock};
use tokio_util::sync::CancellationToken;

pub const NO_PAYMENT_RECORDS: &str = "No payment records found";

#[derive(Debug, Clone, Default, PartialEq)]
pub struct UserState {
    pub user_info: Option<UserInfo>,
    pub conversation_count: Option<u64>,
    pub payments: Vec<Payment>,
    pub loading: bool,
    pub status: String,
}

/// Cached profile and billing history of the signed-in user.
///
/// `loading` is one flag shared by both loaders; with both in flight it
/// reflects whichever finished last.
#[derive(Clone, Default)]
pub struct UserStore {
    state: Arc<RwLock<UserState>>,
    repaint: Repaint,
}

impl UserStore {
    pub fn new(repaint: Repaint) -> Self {
        Self {
            state: Arc::default(),
            repaint,
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut UserState)) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            apply(&mut state);
        }
        self.repaint.request();
    }

    pub fn snapshot(&self) -> UserState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn user_info(&self) -> Option<UserInfo> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .user_info
            .clone()
    }

    pub fn has_payments(&self) -> bool {
        !self
            .state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .payments
            .is_empty()
    }

    pub fn set_user_info(&self, user_info: Option<UserInfo>) {
        self.mutate(|state| state.user_info = user_info);
    }

    /// Returns true when a fresh profile replaced the cached one.
    pub async fn load_user_info(
        &self,
        client: &BackendClient,
        sub: &str,
        token: &CancellationToken,
    ) -> bool {
        self.mutate(|state| state.loading = true);
        let loaded = match cancellable(token, client.user_info(sub)).await {
            Ok(response) => {
                self.mutate(|state| {
                    state.user_info = Some(response.user);
                    state.conversation_count = response.conversation_count;
                });
                true
            }
            Err(err) if err.is_cancelled() => {
                tracing::debug!("user info fetch aborted");
                false
            }
            Err(err) => {
                tracing::error!("error fetching user data: {err}");
                self.mutate(|state| state.status = format!("Error: {err}"));
                false
            }
        };
        self.mutate(|state| state.loading = false);
        loaded
    }

    pub async fn load_payment_records(
        &self,
        client: &BackendClient,
        sub: &str,
        token: &CancellationToken,
    ) {
        self.mutate(|state| state.loading = true);
        match cancellable(token, client.payment_records(sub)).await {
            Ok(payments) => self.mutate(|state| {
                state.status = if payments.is_empty() {
                    NO_PAYMENT_RECORDS.to_string()
                } else {
                    String::new()
                };
                state.payments = payments;
            }),
            Err(err) if err.is_cancelled() => {
                tracing::debug!("payment records fetch aborted");
            }
            Err(err) => {
                tracing::error!("error fetching payment records: {err}");
                self.mutate(|state| state.status = format!("Error: {err}"));
            }
        }
        self.mutate(|state| state.loading = false);
    }

    /// Optimistic flip after the backend accepted a cancellation.
    pub fn mark_subscription_cancelled(&self) {
        self.mutate(|state| {
            if let Some(info) = state.user_info.as_mut() {
                info.pro_member = false;
            }
        });
    }

    pub fn clear(&self) {
        self.mutate(|state| *state = UserState::default());
    }
}

#[cfg(test)]
mod tests {
    use super::{UserState, UserStore, NO_PAYMENT_RECORDS};
    use crate::api::{BackendClient, UserInfo};
    use serde_json::json;
    use std::time::Duration;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client(server: &MockServer) -> BackendClient {
        BackendClient::new(server.uri(), Duration::from_secs(5)).expect("client should build")
    }

    fn user_json(token: Option<i64>, pro: bool) -> serde_json::Value {
        json!({
            "user": {
                "user_id": 1,
                "user_name": "Ada",
                "email": "ada@example.com",
                "token": token,
                "pro_member": pro
            },
            "conversationCount": 4
        })
    }

    #[tokio::test]
    async fn user_info_success_replaces_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-user-info"))
            .and(header("X-Google-Sub", "42"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(Some(9), true)))
            .mount(&server)
            .await;

        let store = UserStore::default();
        store
            .load_user_info(&client(&server), "42", &CancellationToken::new())
            .await;

        let state = store.snapshot();
        assert_eq!(state.user_info.as_ref().and_then(|u| u.token), Some(9));
        assert_eq!(state.conversation_count, Some(4));
        assert!(!state.loading);
        assert!(state.status.is_empty());
    }

    #[tokio::test]
    async fn user_info_failure_sets_status_and_clears_loading() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-user-info"))
            .respond_with(ResponseTemplate::new(503).set_body_string("busy"))
            .mount(&server)
            .await;

        let store = UserStore::default();
        store
            .load_user_info(&client(&server), "42", &CancellationToken::new())
            .await;

        let state = store.snapshot();
        assert!(state.user_info.is_none());
        assert_eq!(state.status, "Error: Server error: 503 - busy");
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn first_load_to_settle_clears_the_shared_loading_flag() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-payment-records"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({ "payments": [] }))
                    .set_delay(Duration::from_millis(500)),
            )
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/get-user-info"))
            .respond_with(ResponseTemplate::new(200).set_body_json(user_json(Some(2), false)))
            .mount(&server)
            .await;

        let store = UserStore::default();
        let slow = {
            let (store, client) = (store.clone(), client(&server));
            tokio::spawn(async move {
                store
                    .load_payment_records(&client, "42", &CancellationToken::new())
                    .await;
            })
        };
        tokio::task::yield_now().await;

        assert!(
            store
                .load_user_info(&client(&server), "42", &CancellationToken::new())
                .await
        );
        let state = store.snapshot();
        assert!(!state.loading);
        assert!(state.status.is_empty());

        slow.await.expect("payment load task");
        let state = store.snapshot();
        assert!(!state.loading);
        assert_eq!(state.status, NO_PAYMENT_RECORDS);
    }

    #[tokio::test]
    async fn cancelled_loads_leave_status_alone() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200).set_delay(Duration::from_secs(5)))
            .mount(&server)
            .await;

        let store = UserStore::default();
        store.mutate(|state| state.status = "before".to_string());
        let token = CancellationToken::new();
        token.cancel();

        store.load_user_info(&client(&server), "42", &token).await;
        store.load_payment_records(&client(&server), "42", &token).await;

        let state = store.snapshot();
        assert_eq!(state.status, "before");
        assert!(!state.loading);
        assert!(state.user_info.is_none());
    }

    #[tokio::test]
    async fn empty_payment_list_reports_no_records() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-payment-records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({ "payments": [] })))
            .mount(&server)
            .await;

        let store = UserStore::default();
        store
            .load_payment_records(&client(&server), "42", &CancellationToken::new())
            .await;

        let state = store.snapshot();
        assert_eq!(state.status, NO_PAYMENT_RECORDS);
        assert!(state.payments.is_empty());
        assert!(!state.loading);
    }

    #[tokio::test]
    async fn payments_replace_list_and_clear_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-payment-records"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "payments": [{
                    "payment_id": 1,
                    "timestamp": "2024-03-01T10:00:00Z",
                    "price": 19.99,
                    "order_id": "ord_9",
                    "plan": "Intermediate"
                }]
            })))
            .mount(&server)
            .await;

        let store = UserStore::default();
        store.mutate(|state| state.status = "stale".to_string());
        store
            .load_payment_records(&client(&server), "42", &CancellationToken::new())
            .await;

        let state = store.snapshot();
        assert_eq!(state.payments.len(), 1);
        assert!(state.status.is_empty());
        assert!(store.has_payments());
    }

    #[tokio::test]
    async fn payment_failure_sets_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-payment-records"))
            .respond_with(ResponseTemplate::new(401).set_body_string("unknown user"))
            .mount(&server)
            .await;

        let store = UserStore::default();
        store
            .load_payment_records(&client(&server), "", &CancellationToken::new())
            .await;

        let state = store.snapshot();
        assert_eq!(state.status, "Error: Server error: 401 - unknown user");
        assert!(!state.loading);
    }

    #[test]
    fn cancel_flip_only_touches_membership() {
        let store = UserStore::default();
        store.mutate(|state| {
            state.user_info = Some(UserInfo {
                user_id: 1,
                user_name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                token: Some(3),
                pro_member: true,
            })
        });

        store.mark_subscription_cancelled();
        let info = store.user_info().expect("profile should remain");
        assert!(!info.pro_member);
        assert_eq!(info.token, Some(3));
    }

    #[test]
    fn clear_resets_everything() {
        let store = UserStore::default();
        store.mutate(|state| state.status = "Error: x".to_string());
        store.mutate(|state| state.loading = true);
        store.clear();
        assert_eq!(store.snapshot(), UserState::default());
    }
}
