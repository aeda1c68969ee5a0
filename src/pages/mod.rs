//! The five screens and the services they share.

use crate::api::BackendClient;
use crate::conversation::ConversationController;
use crate::event::EventSink;
use crate::media::player::AudioPlayer;
use crate::media::BlobStore;
use crate::router::Route;
use crate::session::SessionManager;
use crate::store::{ConversationStore, UserStore};
use crate::theme::Theme;
use eframe::egui;
use std::future::Future;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

pub mod conversation;
pub mod dashboard;
pub mod login;
pub mod payment_record;
pub mod subscription;

pub use conversation::ConversationPage;
pub use dashboard::DashboardPage;
pub use login::LoginPage;
pub use payment_record::PaymentRecordPage;
pub use subscription::SubscriptionPage;

/// Handles every page needs. Cloning is cheap; all fields are shared.
#[derive(Clone)]
pub struct AppContext {
    pub client: BackendClient,
    pub session: SessionManager,
    pub conversation: ConversationStore,
    pub users: UserStore,
    pub blobs: BlobStore,
    pub controller: ConversationController,
    pub player: AudioPlayer,
    pub events: EventSink,
    pub runtime: Handle,
}

impl AppContext {
    pub fn subject(&self) -> String {
        self.session.subject()
    }

    pub fn spawn<F>(&self, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        self.runtime.spawn(task);
    }

    /// Signs out from any page: drops playback, releases audio, empties both
    /// stores, forgets the persisted identity and returns to Login.
    pub fn logout(&self) {
        self.player.stop();
        self.controller.reset();
        self.users.clear();
        if let Err(err) = self.session.sign_out() {
            tracing::warn!("failed to remove stored identity: {err}");
        }
        tracing::info!("signed out");
        self.events.navigate(Route::Login);
    }
}

/// Refreshes the profile and reports `failure` on `route` when the fetch
/// fails, even if an older profile is still cached.
pub async fn refresh_user_info(
    ctx: &AppContext,
    sub: &str,
    token: &CancellationToken,
    route: Route,
    failure: &str,
) {
    let loaded = ctx.users.load_user_info(&ctx.client, sub, token).await;
    if !loaded && !token.is_cancelled() {
        ctx.events.status(route, failure);
    }
}

pub trait Page {
    /// Called each time the router lands on this page. `token` is cancelled
    /// when the router leaves it.
    fn mount(&mut self, ctx: &AppContext, token: CancellationToken);

    /// Called when the router leaves this page, before the next one mounts.
    fn unmount(&mut self) {}

    fn show(&mut self, ui: &mut egui::Ui, ctx: &AppContext, theme: &Theme);

    fn set_status(&mut self, message: String);
}

/// Title with the signed-in user's name appended when it is known.
pub fn titled(base: &str, name: Option<&str>) -> String {
    match name {
        Some(name) if !name.is_empty() => format!("{base} - {name}"),
        _ => base.to_string(),
    }
}

pub fn loader(ui: &mut egui::Ui) {
    ui.vertical_centered(|ui| {
        ui.add(egui::Spinner::new().size(28.0));
    });
}

pub fn logout_button(ui: &mut egui::Ui, ctx: &AppContext) {
    if ui.button("Logout").clicked() {
        ctx.logout();
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::AppContext;
    use crate::api::BackendClient;
    use crate::conversation::ConversationController;
    use crate::error::{ClientError, Result};
    use crate::event::{AppEvent, EventSink, Repaint};
    use crate::media::player::AudioPlayer;
    use crate::media::{BlobStore, ImageCache, ImageLoader};
    use crate::session::store::IdentityStore;
    use crate::session::SessionManager;
    use crate::store::{ConversationStore, UserStore};
    use async_trait::async_trait;
    use std::path::Path;
    use std::sync::mpsc::{self, Receiver};
    use std::sync::Arc;
    use std::time::Duration;
    use tokio::runtime::Handle;

    struct RejectingLoader;

    #[async_trait]
    impl ImageLoader for RejectingLoader {
        async fn load_direct(&self, url: &str) -> Result<Vec<u8>> {
            Err(ClientError::NotAnImage(url.to_string()))
        }
    }

    /// Context wired to `backend` with the identity record under `data_dir`.
    /// Must be called from inside a tokio runtime.
    pub fn context(backend: &str, data_dir: &Path) -> (AppContext, Receiver<AppEvent>) {
        let (tx, rx) = mpsc::channel();
        let events = EventSink::new(tx, Repaint::default());
        let client =
            BackendClient::new(backend, Duration::from_secs(5)).expect("client should build");
        let conversation = ConversationStore::default();
        let users = UserStore::default();
        let blobs = BlobStore::new();
        let controller = ConversationController::new(
            client.clone(),
            conversation.clone(),
            users.clone(),
            blobs.clone(),
            Arc::new(RejectingLoader),
            ImageCache::default(),
            events.clone(),
        );
        let ctx = AppContext {
            client,
            session: SessionManager::restore(IdentityStore::at(data_dir)),
            conversation,
            users,
            blobs,
            controller,
            player: AudioPlayer::detached(),
            events,
            runtime: Handle::current(),
        };
        (ctx, rx)
    }
}

#[cfg(test)]
mod tests {
    use super::testing::context;
    use super::{refresh_user_info, titled};
    use crate::api::UserInfo;
    use crate::event::AppEvent;
    use crate::router::Route;
    use crate::session::Identity;
    use crate::store::Message;
    use tokio_util::sync::CancellationToken;
    use wiremock::matchers::{method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn cached_profile() -> UserInfo {
        UserInfo {
            user_id: 1,
            user_name: "Ada".to_string(),
            email: "ada@example.com".to_string(),
            token: Some(3),
            pro_member: true,
        }
    }

    #[tokio::test]
    async fn failed_refresh_is_reported_over_a_cached_profile() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/get-user-info"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let (ctx, rx) = context(&server.uri(), dir.path());
        ctx.users.set_user_info(Some(cached_profile()));

        let token = CancellationToken::new();
        refresh_user_info(&ctx, "42", &token, Route::Dashboard, "Failed to load").await;

        assert_eq!(
            rx.try_recv().ok(),
            Some(AppEvent::Status {
                route: Route::Dashboard,
                message: "Failed to load".to_string(),
            })
        );
        assert!(ctx.users.user_info().is_some());
    }

    #[tokio::test]
    async fn cancelled_refresh_reports_nothing() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (ctx, rx) = context("http://127.0.0.1:9", dir.path());
        let token = CancellationToken::new();
        token.cancel();

        refresh_user_info(&ctx, "42", &token, Route::Subscription, "Failed to load").await;
        assert!(rx.try_recv().is_err());
    }

    #[tokio::test]
    async fn logout_resets_everything() {
        let dir = tempfile::tempdir().expect("tempdir");
        let (ctx, rx) = context("http://127.0.0.1:9", dir.path());
        ctx.session
            .sign_in(Identity {
                name: "Ada".to_string(),
                email: "ada@example.com".to_string(),
                picture: String::new(),
                sub: "42".to_string(),
            })
            .expect("sign in");
        let audio = ctx.blobs.create(vec![1, 2, 3], Some("audio/wav".to_string()));
        ctx.conversation.append(Message::assistant("hello", Some(audio)));
        ctx.conversation
            .set_image(Some("https://img.example.com/a.png".to_string()));
        ctx.users.set_user_info(Some(cached_profile()));

        ctx.logout();

        assert!(ctx.conversation.snapshot().messages.is_empty());
        assert!(ctx.conversation.current_image().is_none());
        assert!(ctx.users.user_info().is_none());
        assert!(ctx.blobs.is_empty());
        assert!(!ctx.session.is_signed_in());
        assert!(!dir.path().join("user.json").exists());
        assert_eq!(rx.try_recv().ok(), Some(AppEvent::Navigate(Route::Login)));
    }

    #[test]
    fn titles_include_known_names() {
        assert_eq!(titled("User Dashboard", Some("Ada")), "User Dashboard - Ada");
        assert_eq!(titled("User Dashboard", Some("")), "User Dashboard");
        assert_eq!(titled("Payment Records", None), "Payment Records");
    }
}
