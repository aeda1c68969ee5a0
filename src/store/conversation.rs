use crate::event::Repaint;
use crate::media::BlobUrl;
use std::sync::{Arc, PoisonError, RwLock};
use uuid::Uuid;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Speaker {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub id: String,
    pub speaker: Speaker,
    pub text: String,
    /// Owned handle into the blob store; released by whoever drops the message.
    pub audio: Option<BlobUrl>,
}

impl Message {
    pub fn new(speaker: Speaker, text: impl Into<String>, audio: Option<BlobUrl>) -> Self {
        Self {
            id: Uuid::new_v4().to_string(),
            speaker,
            text: text.into(),
            audio,
        }
    }

    pub fn user(text: impl Into<String>, audio: Option<BlobUrl>) -> Self {
        Self::new(Speaker::User, text, audio)
    }

    pub fn assistant(text: impl Into<String>, audio: Option<BlobUrl>) -> Self {
        Self::new(Speaker::Assistant, text, audio)
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct ConversationState {
    pub messages: Vec<Message>,
    pub current_image: Option<String>,
    pub image_loading: bool,
}

/// Shared chat state. Every mutation is a single replace under the lock, so
/// readers never see half an update, but separate operations are not ordered
/// against each other: the last writer wins.
#[derive(Clone, Default)]
pub struct ConversationStore {
    state: Arc<RwLock<ConversationState>>,
    repaint: Repaint,
}

impl ConversationStore {
    pub fn new(repaint: Repaint) -> Self {
        Self {
            state: Arc::default(),
            repaint,
        }
    }

    fn mutate(&self, apply: impl FnOnce(&mut ConversationState)) {
        {
            let mut state = self.state.write().unwrap_or_else(PoisonError::into_inner);
            apply(&mut state);
        }
        self.repaint.request();
    }

    pub fn snapshot(&self) -> ConversationState {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }

    pub fn is_empty(&self) -> bool {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .messages
            .is_empty()
    }

    pub fn current_image(&self) -> Option<String> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .current_image
            .clone()
    }

    /// Audio handles held by the current message list.
    pub fn audio_handles(&self) -> Vec<BlobUrl> {
        self.state
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .messages
            .iter()
            .filter_map(|message| message.audio.clone())
            .collect()
    }

    /// Swaps in a whole new list. Handles in the old list are not released.
    pub fn replace_all(&self, messages: Vec<Message>) {
        self.mutate(|state| state.messages = messages);
    }

    /// Appends without checking ids for duplicates.
    pub fn append(&self, message: Message) {
        self.mutate(|state| state.messages.push(message));
    }

    /// Empties the list and the image. Audio handles are the caller's to revoke.
    pub fn clear(&self) {
        self.mutate(|state| *state = ConversationState::default());
    }

    pub fn set_image(&self, image: Option<String>) {
        self.mutate(|state| state.current_image = image);
    }

    pub fn set_image_loading(&self, loading: bool) {
        self.mutate(|state| state.image_loading = loading);
    }
}
