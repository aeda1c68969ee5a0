use super::{AppContext, Page};
use crate::api::types::RegisterUserRequest;
use crate::router::Route;
use crate::session::Identity;
use crate::theme::Theme;
use eframe::egui;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

pub const LOGIN_SUCCESS: &str = "Login successful! Redirecting...";
pub const REGISTER_FAILED: &str = "Login failed: Unable to register user.";
pub const NO_CREDENTIAL: &str = "No credential received from Google.";
pub const UNKNOWN_FAILURE: &str = "Login failed: Unknown error.";

const REDIRECT_DELAY: Duration = Duration::from_secs(1);

/// Decodes `credential`, registers the user and persists the identity.
/// Returns true once the user is signed in; every outcome is reported as a
/// Login status.
pub async fn complete_sign_in(ctx: &AppContext, credential: &str) -> bool {
    let status = |message: &str| ctx.events.status(Route::Login, message);

    if credential.trim().is_empty() {
        status(NO_CREDENTIAL);
        return false;
    }
    let identity = match Identity::from_credential(credential) {
        Ok(identity) => identity,
        Err(err) => {
            tracing::error!("google login error: {err}");
            status(UNKNOWN_FAILURE);
            return false;
        }
    };

    let request = RegisterUserRequest {
        google_sub: identity.sub.clone(),
        user_name: identity.name.clone(),
        email: identity.email.clone(),
    };
    let registered = async {
        ctx.client.register_user(&request).await?;
        ctx.session.sign_in(identity)
    }
    .await;

    match registered {
        Ok(()) => {
            tracing::info!(email = %request.email, "user signed in");
            status(LOGIN_SUCCESS);
            true
        }
        Err(err) => {
            tracing::error!("error registering user: {err}");
            status(REGISTER_FAILED);
            false
        }
    }
}

#[derive(Default)]
pub struct LoginPage {
    credential: String,
    status: String,
    busy: bool,
}

impl LoginPage {
    fn submit(&mut self, ctx: &AppContext) {
        self.busy = true;
        let credential = std::mem::take(&mut self.credential);
        let task_ctx = ctx.clone();
        ctx.spawn(async move {
            if complete_sign_in(&task_ctx, &credential).await {
                tokio::time::sleep(REDIRECT_DELAY).await;
                task_ctx.events.navigate(Route::Conversation);
            }
        });
    }
}

impl Page for LoginPage {
    fn mount(&mut self, _ctx: &AppContext, _token: CancellationToken) {
        self.status.clear();
        self.busy = false;
    }

    fn show(&mut self, ui: &mut egui::Ui, ctx: &AppContext, theme: &Theme) {
        ui.vertical_centered(|ui| {
            ui.add_space(theme.spacing_16 * 4.0);
            theme.card_frame().show(ui, |ui| {
                ui.set_max_width(460.0);
                ui.vertical_centered(|ui| {
                    ui.heading("Welcome to Voice Assistant");
                    ui.label(egui::RichText::new("Sign in to continue").color(theme.text_muted));
                    ui.add_space(theme.spacing_8);
                    ui.add(
                        egui::TextEdit::multiline(&mut self.credential)
                            .hint_text("Paste your Google ID token")
                            .desired_rows(4)
                            .desired_width(f32::INFINITY),
                    );
                    let sign_in = egui::Button::new("Sign in with Google");
                    if ui.add_enabled(!self.busy, sign_in).clicked() {
                        self.submit(ctx);
                    }
                    if !self.status.is_empty() {
                        let color = theme.status_color(&self.status);
                        ui.label(egui::RichText::new(&self.status).color(color));
                    }
                });
            });
        });
    }

    fn set_status(&mut self, message: String) {
        if message != LOGIN_SUCCESS {
            self.busy = false;
        }
        self.status = message;
    }
}

#[cfg(test)]
mod tests {
    use super::{complete_sign_in, LOGIN_SUCCESS, NO_CREDENTIAL, REGISTER_FAILED, UNKNOWN_FAILURE};
    use crate::event::AppEvent;
    use crate::pages::testing::context;
    use crate::router::Route;
    use jsonwebtoken::{encode, EncodingKey, Header};
    use serde_json::json;
    use std::sync::mpsc::Receiver;
    use wiremock::matchers::{body_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn credential() -> String {
        encode(
            &Header::default(),
            &json!({
                "name": "Ada",
                "email": "ada@example.com",
                "picture": "https://example.com/ada.png",
                "sub": "1170"
            }),
            &EncodingKey::from_secret(b"test"),
        )
        .expect("encode credential")
    }

    fn last_status(rx: &Receiver<AppEvent>) -> Option<String> {
        rx.try_iter()
            .filter_map(|event| match event {
                AppEvent::Status { route: Route::Login, message } => Some(message),
                _ => None,
            })
            .last()
    }

    #[tokio::test]
    async fn registers_and_persists_identity() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register-user"))
            .and(body_json(json!({
                "google_sub": "1170",
                "user_name": "Ada",
                "email": "ada@example.com"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let (ctx, rx) = context(&server.uri(), dir.path());

        assert!(complete_sign_in(&ctx, &credential()).await);
        assert_eq!(ctx.subject(), "1170");
        assert!(dir.path().join("user.json").exists());
        assert_eq!(last_status(&rx).as_deref(), Some(LOGIN_SUCCESS));
    }

    #[tokio::test]
    async fn rejected_registration_stays_signed_out() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/register-user"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let (ctx, rx) = context(&server.uri(), dir.path());

        assert!(!complete_sign_in(&ctx, &credential()).await);
        assert!(!ctx.session.is_signed_in());
        assert!(!dir.path().join("user.json").exists());
        assert_eq!(last_status(&rx).as_deref(), Some(REGISTER_FAILED));
    }

    #[tokio::test]
    async fn missing_or_garbled_credentials_skip_the_backend() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;
        let dir = tempfile::tempdir().expect("tempdir");
        let (ctx, rx) = context(&server.uri(), dir.path());

        assert!(!complete_sign_in(&ctx, "  ").await);
        assert_eq!(last_status(&rx).as_deref(), Some(NO_CREDENTIAL));
        assert!(!complete_sign_in(&ctx, "not.a.jwt").await);
        assert_eq!(last_status(&rx).as_deref(), Some(UNKNOWN_FAILURE));
    }
}
