//! HTTP client for the voice assistant backend.

use crate::api::types::*;
use crate::error::{ClientError, Result};
use reqwest::header::CONTENT_TYPE;
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use std::future::Future;
use std::time::Duration;
use tokio_util::sync::CancellationToken;

/// Header carrying the signed-in user's subject id.
pub const SUBJECT_HEADER: &str = "X-Google-Sub";

const CONNECT_TIMEOUT_SECS: u64 = 8;

#[derive(Clone)]
pub struct BackendClient {
    base_url: String,
    http: Client,
}

/// Races `fut` against `token`; a fired token wins and drops the request.
pub async fn cancellable<T, F>(token: &CancellationToken, fut: F) -> Result<T>
where
    F: Future<Output = Result<T>>,
{
    tokio::select! {
        biased;
        _ = token.cancelled() => Err(ClientError::Cancelled),
        result = fut => result,
    }
}

impl BackendClient {
    pub fn new(base_url: impl Into<String>, timeout: Duration) -> Result<Self> {
        let http = Client::builder()
            .timeout(timeout)
            .connect_timeout(Duration::from_secs(CONNECT_TIMEOUT_SECS))
            .build()?;
        Ok(Self {
            base_url: base_url.into(),
            http,
        })
    }

    fn url(&self, path: &str) -> String {
        let base = self.base_url.trim_end_matches('/');
        let path = path.trim_start_matches('/');
        format!("{base}/{path}")
    }

    fn authed(&self, builder: RequestBuilder, sub: &str) -> RequestBuilder {
        builder.header(SUBJECT_HEADER, sub)
    }

    async fn check_response(response: Response) -> Result<Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        Err(ClientError::Status {
            status: status.as_u16(),
            body,
        })
    }

    async fn send(builder: RequestBuilder) -> Result<Response> {
        let response = builder.send().await?;
        Self::check_response(response).await
    }

    // ---------- Identity ----------

    pub async fn register_user(&self, request: &RegisterUserRequest) -> Result<()> {
        let url = self.url("register-user");
        Self::send(self.http.post(url).json(request)).await?;
        Ok(())
    }

    pub async fn user_info(&self, sub: &str) -> Result<UserInfoResponse> {
        let url = self.url("get-user-info");
        let response = Self::send(self.authed(self.http.get(url), sub)).await?;
        Ok(response.json().await?)
    }

    // ---------- Conversation ----------

    pub async fn history(&self, sub: &str) -> Result<HistoryResponse> {
        let url = self.url("get-history");
        let response = Self::send(self.authed(self.http.get(url), sub)).await?;
        Ok(response.json().await?)
    }

    pub async fn process_text(&self, sub: &str, text: &str) -> Result<ProcessInputResponse> {
        let url = self.url("process-input");
        let builder = self.authed(self.http.post(url), sub).json(&TextInput { text });
        let response = Self::send(builder).await?;
        Ok(response.json().await?)
    }

    pub async fn process_audio(&self, sub: &str, wav: Vec<u8>) -> Result<ProcessInputResponse> {
        let url = self.url("process-input");
        let part = Part::bytes(wav)
            .file_name("recording.wav")
            .mime_str("audio/wav")?;
        let form = Form::new().part("audio", part);
        let response = Self::send(self.authed(self.http.post(url), sub).multipart(form)).await?;
        Ok(response.json().await?)
    }

    pub async fn user_audio(&self, sub: &str, file: &str) -> Result<FetchedBinary> {
        let url = self.url(&format!("get-user-audio/{}", urlencoding::encode(file)));
        self.fetch_binary(self.authed(self.http.get(url), sub)).await
    }

    pub async fn ai_audio(&self, sub: &str, file: &str) -> Result<FetchedBinary> {
        let url = self.url(&format!("get-ai-audio/{}", urlencoding::encode(file)));
        self.fetch_binary(self.authed(self.http.get(url), sub)).await
    }

    pub async fn generate_image(&self, sub: &str) -> Result<String> {
        let url = self.url("generate-image");
        let response = Self::send(self.authed(self.http.get(url), sub)).await?;
        Ok(response.text().await?)
    }

    /// Unauthenticated fetch of a remote image, used when direct loading fails.
    pub async fn fetch_image(&self, url: &str) -> Result<FetchedBinary> {
        self.fetch_binary(self.http.get(url)).await
    }

    pub async fn set_nsfw(&self, sub: &str, is_nsfw: bool) -> Result<MessageResponse> {
        let url = self.url("is-NSFW");
        let builder = self
            .authed(self.http.post(url), sub)
            .json(&NsfwRequest { is_nsfw });
        let response = Self::send(builder).await?;
        Ok(response.json().await?)
    }

    pub async fn delete_all_conversations(&self, sub: &str) -> Result<()> {
        let url = self.url("delete-all-conversations");
        Self::send(self.authed(self.http.delete(url), sub)).await?;
        Ok(())
    }

    // ---------- Billing ----------

    pub async fn cancel_subscription(&self, sub: &str) -> Result<()> {
        let url = self.url("cancel-subscription");
        Self::send(self.authed(self.http.post(url), sub)).await?;
        Ok(())
    }

    pub async fn payment_records(&self, sub: &str) -> Result<Vec<Payment>> {
        let url = self.url("get-payment-records");
        let response = Self::send(self.authed(self.http.get(url), sub)).await?;
        let body: PaymentRecordsResponse = response.json().await?;
        Ok(body.payments)
    }

    async fn fetch_binary(&self, builder: RequestBuilder) -> Result<FetchedBinary> {
        let response = Self::send(builder).await?;
        let mime = response
            .headers()
            .get(CONTENT_TYPE)
            .and_then(|value| value.to_str().ok())
            .map(|value| value.to_string());
        let bytes = response.bytes().await?.to_vec();
        Ok(FetchedBinary { bytes, mime })
    }
}
