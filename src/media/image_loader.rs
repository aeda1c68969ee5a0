use crate::error::{ClientError, Result};
use async_trait::async_trait;
use reqwest::Client;
use std::sync::{Arc, PoisonError, RwLock};
use std::time::Duration;
use url::Url;

const DIRECT_LOAD_TIMEOUT_SECS: u64 = 15;

/// Accepts only non-empty absolute `http(s)` references.
pub fn validate_image_url(raw: &str) -> Result<String> {
    let candidate = raw.trim();
    let absolute = candidate.starts_with("http://") || candidate.starts_with("https://");
    if !absolute || Url::parse(candidate).is_err() {
        tracing::warn!(reference = raw, "rejected image reference");
        return Err(ClientError::InvalidImageUrl);
    }
    Ok(candidate.to_string())
}

/// Loads an image straight from its reference, the way an image element would.
#[async_trait]
pub trait ImageLoader: Send + Sync {
    async fn load_direct(&self, url: &str) -> Result<Vec<u8>>;
}

pub struct HttpImageLoader {
    http: Client,
}

impl HttpImageLoader {
    pub fn new() -> Result<Self> {
        let http = Client::builder()
            .timeout(Duration::from_secs(DIRECT_LOAD_TIMEOUT_SECS))
            .build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl ImageLoader for HttpImageLoader {
    async fn load_direct(&self, url: &str) -> Result<Vec<u8>> {
        let response = self.http.get(url).send().await?;
        let status = response.status();
        if !status.is_success() {
            return Err(ClientError::Status {
                status: status.as_u16(),
                body: status.canonical_reason().unwrap_or_default().to_string(),
            });
        }
        let bytes = response.bytes().await?.to_vec();
        if image::guess_format(&bytes).is_err() {
            return Err(ClientError::NotAnImage(url.to_string()));
        }
        Ok(bytes)
    }
}

/// Bytes of the image most recently loaded by reference, for the renderer.
#[derive(Clone, Default)]
pub struct ImageCache {
    slot: Arc<RwLock<Option<(String, Arc<[u8]>)>>>,
}

impl ImageCache {
    pub fn store(&self, url: &str, bytes: Vec<u8>) {
        *self.slot.write().unwrap_or_else(PoisonError::into_inner) =
            Some((url.to_string(), Arc::from(bytes)));
    }

    pub fn get(&self, url: &str) -> Option<Arc<[u8]>> {
        self.slot
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .filter(|(cached, _)| cached == url)
            .map(|(_, bytes)| Arc::clone(bytes))
    }
}
