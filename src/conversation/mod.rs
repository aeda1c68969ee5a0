//! Conversation page behaviour: replaying stored history, submitting turns
//! and keeping the generated image current.

use crate::api::types::HistoryResponse;
use crate::api::{cancellable, BackendClient};
use crate::error::{ClientError, Result};
use crate::event::EventSink;
use crate::media::{validate_image_url, BlobStore, BlobUrl, ImageCache, ImageLoader};
use crate::router::Route;
use crate::store::{ConversationStore, Message, UserStore};
use std::sync::Arc;
use tokio::runtime::Handle;
use tokio_util::sync::CancellationToken;

pub const INSUFFICIENT_TOKENS: &str = "Insufficient tokens. Redirecting to subscription...";
pub const USER_INFO_NOT_LOADED: &str = "Error: User info not loaded yet";
pub const EMPTY_TEXT: &str = "Error: Please enter some text";

#[derive(Debug, Clone, Copy)]
enum AudioKind {
    User,
    Assistant,
}

#[derive(Clone)]
pub struct ConversationController {
    client: BackendClient,
    conversation: ConversationStore,
    users: UserStore,
    blobs: BlobStore,
    loader: Arc<dyn ImageLoader>,
    image_cache: ImageCache,
    events: EventSink,
}

impl ConversationController {
    pub fn new(
        client: BackendClient,
        conversation: ConversationStore,
        users: UserStore,
        blobs: BlobStore,
        loader: Arc<dyn ImageLoader>,
        image_cache: ImageCache,
        events: EventSink,
    ) -> Self {
        Self {
            client,
            conversation,
            users,
            blobs,
            loader,
            image_cache,
            events,
        }
    }

    fn status(&self, message: impl Into<String>) {
        self.events.status(Route::Conversation, message);
    }

    /// Bytes for whatever `reference` the image slot currently holds.
    pub fn image_bytes(&self, reference: &str) -> Option<Arc<[u8]>> {
        if BlobUrl::is_blob(reference) {
            self.blobs.get(reference).map(|blob| blob.bytes)
        } else {
            self.image_cache.get(reference)
        }
    }

    /// Mount-time entry: replay history into an empty store, otherwise only
    /// make sure an image is showing.
    pub async fn mount(&self, sub: &str, token: &CancellationToken) {
        if self.conversation.is_empty() {
            self.reconstruct_history(sub, token).await;
        } else if self.conversation.current_image().is_none() {
            self.refresh_image(sub, token).await;
        }
    }

    pub async fn reconstruct_history(&self, sub: &str, token: &CancellationToken) {
        match self.try_reconstruct(sub, token).await {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => tracing::debug!("history fetch aborted"),
            Err(err) => {
                tracing::error!("error fetching history: {err}");
                self.status(format!("Error fetching history: {err}"));
            }
        }
    }

    async fn try_reconstruct(&self, sub: &str, token: &CancellationToken) -> Result<()> {
        let history = cancellable(token, self.client.history(sub)).await?;

        let mut messages = Vec::with_capacity(history.response.len() * 2);
        if let Err(err) = self.assemble_turns(sub, &history, token, &mut messages).await {
            self.revoke_messages(&messages);
            return Err(err);
        }
        tracing::info!(turns = history.response.len(), "history restored");
        self.conversation.replace_all(messages);

        match history.image_url.as_deref().map(str::trim) {
            Some(image) if !image.is_empty() => self.display_image(image, token).await,
            _ => Ok(()),
        }
    }

    /// Resolves turns one at a time; `messages` holds every fully resolved
    /// turn so the caller can release them if a later turn fails.
    async fn assemble_turns(
        &self,
        sub: &str,
        history: &HistoryResponse,
        token: &CancellationToken,
        messages: &mut Vec<Message>,
    ) -> Result<()> {
        for i in 0..history.response.len() {
            let user_audio = self
                .fetch_audio(AudioKind::User, sub, entry(&history.filename_user, i), token)
                .await?;
            let ai_audio = match self
                .fetch_audio(AudioKind::Assistant, sub, entry(&history.filename_ai, i), token)
                .await
            {
                Ok(audio) => audio,
                Err(err) => {
                    if let Some(audio) = &user_audio {
                        self.blobs.revoke(audio.as_str());
                    }
                    return Err(err);
                }
            };

            messages.push(Message::user(
                entry(&history.transcript, i).unwrap_or_default(),
                user_audio,
            ));
            messages.push(Message::assistant(
                entry(&history.response, i).unwrap_or_default(),
                ai_audio,
            ));
        }
        Ok(())
    }

    async fn fetch_audio(
        &self,
        kind: AudioKind,
        sub: &str,
        file: Option<&str>,
        token: &CancellationToken,
    ) -> Result<Option<BlobUrl>> {
        let Some(file) = file.filter(|name| !name.is_empty()) else {
            return Ok(None);
        };
        let fetched = match kind {
            AudioKind::User => cancellable(token, self.client.user_audio(sub, file)).await?,
            AudioKind::Assistant => cancellable(token, self.client.ai_audio(sub, file)).await?,
        };
        Ok(Some(self.blobs.create(fetched.bytes, fetched.mime)))
    }

    fn revoke_messages(&self, messages: &[Message]) {
        self.blobs
            .revoke_all(messages.iter().filter_map(|message| message.audio.as_ref()));
    }

    /// Shows `url`, trying a direct load first and falling back to fetching
    /// the bytes into a local blob. The loading flag spans the whole attempt.
    pub async fn display_image(&self, url: &str, token: &CancellationToken) -> Result<()> {
        self.conversation.set_image_loading(true);
        let outcome = self.load_image(url, token).await;
        self.conversation.set_image_loading(false);
        outcome
    }

    /// The slot never keeps `url` without bytes behind it: a load that fails
    /// or is cancelled empties it so the next mount asks for a fresh image.
    async fn load_image(&self, url: &str, token: &CancellationToken) -> Result<()> {
        self.replace_image(Some(url.to_string()));
        let loaded = self.resolve_image(url, token).await;
        if loaded.is_err() && self.conversation.current_image().as_deref() == Some(url) {
            self.conversation.set_image(None);
        }
        loaded
    }

    async fn resolve_image(&self, url: &str, token: &CancellationToken) -> Result<()> {
        match cancellable(token, self.loader.load_direct(url)).await {
            Ok(bytes) => {
                self.image_cache.store(url, bytes);
                Ok(())
            }
            Err(err) if err.is_cancelled() => Err(err),
            Err(err) => {
                tracing::warn!("direct image load failed, fetching bytes instead: {err}");
                let fetched = cancellable(token, self.client.fetch_image(url)).await?;
                let blob = self.blobs.create(fetched.bytes, fetched.mime);
                self.replace_image(Some(blob.to_string()));
                Ok(())
            }
        }
    }

    /// Sets the image slot and releases the blob it previously pointed at.
    fn replace_image(&self, image: Option<String>) {
        let previous = self.conversation.current_image();
        self.conversation.set_image(image.clone());
        if let Some(previous) = previous {
            if BlobUrl::is_blob(&previous) && image.as_deref() != Some(previous.as_str()) {
                self.blobs.revoke(&previous);
            }
        }
    }

    pub async fn refresh_image(&self, sub: &str, token: &CancellationToken) {
        self.conversation.set_image_loading(true);
        let outcome = async {
            let raw = cancellable(token, self.client.generate_image(sub)).await?;
            let url = validate_image_url(&raw)?;
            self.load_image(&url, token).await
        }
        .await;
        self.conversation.set_image_loading(false);

        match outcome {
            Ok(()) => {}
            Err(err) if err.is_cancelled() => tracing::debug!("image fetch aborted"),
            Err(err) => {
                tracing::error!("error fetching image: {err}");
                self.status(format!("Error: Failed to load image - {err}"));
            }
        }
    }

    /// Token gate shared by text and voice input. Runs before any network call.
    pub fn ensure_can_submit(&self) -> bool {
        match self.users.user_info() {
            None => {
                self.status(USER_INFO_NOT_LOADED);
                false
            }
            Some(info) if info.token.is_some_and(|balance| balance <= 0) => {
                self.status(INSUFFICIENT_TOKENS);
                self.events.navigate(Route::Subscription);
                false
            }
            Some(_) => true,
        }
    }

    /// Synchronous half of a text turn: gate, then show the user's message
    /// immediately. Returns false when nothing should be sent.
    pub fn begin_text_turn(&self, text: &str) -> bool {
        if !self.ensure_can_submit() {
            return false;
        }
        if text.trim().is_empty() {
            self.status(EMPTY_TEXT);
            return false;
        }
        self.conversation.append(Message::user(text, None));
        self.status("Processing text...");
        true
    }

    pub async fn finish_text_turn(&self, sub: &str, text: &str) {
        let result = async {
            let reply = self.client.process_text(sub, text).await?;
            let ai_audio = self
                .fetch_audio(
                    AudioKind::Assistant,
                    sub,
                    reply.filename_ai.as_deref(),
                    &CancellationToken::new(),
                )
                .await?;
            self.conversation
                .append(Message::assistant(reply.response.unwrap_or_default(), ai_audio));
            Ok::<(), ClientError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.status("Text processed successfully");
                self.after_turn(sub).await;
            }
            Err(err) => {
                tracing::error!("error processing text: {err}");
                self.status(format!("Error processing text: {err}"));
            }
        }
    }

    /// Starts a text turn: the user's message is in the store when this
    /// returns and the round trip continues on `runtime`. Returns false when
    /// the turn was rejected before any network call.
    pub fn submit_text(&self, runtime: &Handle, sub: String, text: String) -> bool {
        if !self.begin_text_turn(&text) {
            return false;
        }
        let controller = self.clone();
        runtime.spawn(async move { controller.finish_text_turn(&sub, &text).await });
        true
    }

    pub async fn submit_audio(&self, sub: &str, wav: Vec<u8>) {
        self.status("Processing audio...");
        let never = CancellationToken::new();
        let result = async {
            let reply = self.client.process_audio(sub, wav).await?;
            let user_audio = self
                .fetch_audio(AudioKind::User, sub, reply.filename_user.as_deref(), &never)
                .await?;
            self.conversation
                .append(Message::user(reply.transcript.unwrap_or_default(), user_audio));

            let ai_audio = self
                .fetch_audio(AudioKind::Assistant, sub, reply.filename_ai.as_deref(), &never)
                .await?;
            self.conversation
                .append(Message::assistant(reply.response.unwrap_or_default(), ai_audio));
            Ok::<(), ClientError>(())
        }
        .await;

        match result {
            Ok(()) => {
                self.status("Processing complete");
                self.after_turn(sub).await;
            }
            Err(err) => {
                tracing::error!("error processing audio: {err}");
                self.status(format!("Error processing audio: {err}"));
            }
        }
    }

    /// Token balance and image both change after every completed turn.
    async fn after_turn(&self, sub: &str) {
        let never = CancellationToken::new();
        self.users.load_user_info(&self.client, sub, &never).await;
        self.refresh_image(sub, &never).await;
    }

    pub async fn clear_history(&self, sub: &str) {
        if let Err(err) = self.client.delete_all_conversations(sub).await {
            tracing::error!("error clearing content: {err}");
            self.status("Error: Content not cleared");
            return;
        }
        self.reset();
        self.refresh_image(sub, &CancellationToken::new()).await;
    }

    /// Revokes the audio handle of every message currently in the store.
    pub fn release_audio(&self) -> usize {
        self.blobs.revoke_all(&self.conversation.audio_handles())
    }

    /// Releases every audio handle and the image blob, then empties the store.
    pub fn reset(&self) {
        let released = self.release_audio();
        self.replace_image(None);
        self.conversation.clear();
        tracing::debug!(released, "conversation reset");
    }

    pub async fn set_nsfw(&self, sub: &str, is_nsfw: bool) {
        match self.client.set_nsfw(sub, is_nsfw).await {
            Ok(reply) => self.status(reply.message),
            Err(err) => {
                tracing::error!("error setting NSFW mode: {err}");
                self.status(format!("Error setting NSFW mode: {err}"));
            }
        }
    }
}

fn entry(values: &[Option<String>], index: usize) -> Option<&str> {
    values.get(index).and_then(|value| value.as_deref())
}
