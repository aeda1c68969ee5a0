use super::{loader, refresh_user_info, AppContext, Page};
use crate::error::{ClientError, Result};
use crate::media::recorder::Recorder;
use crate::router::Route;
use crate::store::{ConversationState, Message, Speaker};
use crate::theme::Theme;
use eframe::egui::{self, ColorImage, RichText, ScrollArea, TextureHandle, TextureOptions};
use tokio_util::sync::CancellationToken;

pub const IDLE_STATUS: &str = "Press the microphone to start";
pub const RECORDING_STATUS: &str = "Recording... Speak now";
pub const MIC_DENIED: &str = "Error: Microphone access denied";
pub const NO_AUDIO_CAPTURED: &str = "Error: No audio captured";
pub const USER_DATA_FAILED: &str = "Error loading user data";

/// Decodes any supported image payload into an egui texture source.
pub fn decode_image(bytes: &[u8]) -> Result<ColorImage> {
    let decoded = image::load_from_memory(bytes)
        .map_err(|err| ClientError::NotAnImage(err.to_string()))?
        .to_rgba8();
    let size = [decoded.width() as usize, decoded.height() as usize];
    Ok(ColorImage::from_rgba_unmultiplied(size, decoded.as_raw()))
}

pub fn speaker_label(speaker: Speaker) -> &'static str {
    match speaker {
        Speaker::User => "You:",
        Speaker::Assistant => "May:",
    }
}

/// "<status> | token: <balance>", the balance blank until known.
pub fn status_line(status: &str, token: Option<i64>) -> String {
    let token = token.map(|balance| balance.to_string()).unwrap_or_default();
    format!("{status} | token: {token}")
}

/// Texture for the reference currently in the image slot. `texture` is None
/// while bytes are not available or could not be decoded.
struct DisplayedImage {
    reference: String,
    texture: Option<TextureHandle>,
    undecodable: bool,
}

/// A capture in progress and the identity that started it.
struct Recording {
    recorder: Recorder,
    sub: String,
}

pub struct ConversationPage {
    status: String,
    text_input: String,
    nsfw: bool,
    confirm_clear: bool,
    recording: Option<Recording>,
    image: Option<DisplayedImage>,
}

impl Default for ConversationPage {
    fn default() -> Self {
        Self {
            status: IDLE_STATUS.to_string(),
            text_input: String::new(),
            nsfw: false,
            confirm_clear: false,
            recording: None,
            image: None,
        }
    }
}

impl ConversationPage {
    fn processing(&self) -> bool {
        self.status.contains("Processing")
    }

    fn send_text(&mut self, ctx: &AppContext) {
        if !ctx.session.is_signed_in() {
            ctx.events.navigate(Route::Login);
            return;
        }
        let accepted = ctx
            .controller
            .submit_text(&ctx.runtime, ctx.subject(), self.text_input.clone());
        if accepted {
            self.text_input.clear();
        }
    }

    fn toggle_recording(&mut self, ctx: &AppContext) {
        if !ctx.session.is_signed_in() {
            ctx.events.navigate(Route::Login);
            return;
        }
        match self.recording.take() {
            None => self.start_recording(ctx),
            Some(Recording { recorder, sub }) => {
                let capture = recorder.stop();
                if sub != ctx.subject() {
                    tracing::warn!("discarding capture started under another identity");
                    self.status = IDLE_STATUS.to_string();
                    return;
                }
                if capture.is_empty() {
                    self.status = NO_AUDIO_CAPTURED.to_string();
                    return;
                }
                let controller = ctx.controller.clone();
                let wav = capture.to_wav();
                ctx.spawn(async move { controller.submit_audio(&sub, wav).await });
            }
        }
    }

    fn start_recording(&mut self, ctx: &AppContext) {
        if !ctx.controller.ensure_can_submit() {
            return;
        }
        match Recorder::start() {
            Ok(recorder) => {
                self.recording = Some(Recording {
                    recorder,
                    sub: ctx.subject(),
                });
                self.status = RECORDING_STATUS.to_string();
            }
            Err(err) => {
                tracing::error!("error accessing microphone: {err}");
                self.status = MIC_DENIED.to_string();
            }
        }
    }

    fn clear(&mut self, ctx: &AppContext) {
        self.confirm_clear = false;
        if !ctx.session.is_signed_in() {
            ctx.events.navigate(Route::Login);
            return;
        }
        ctx.player.stop();
        let (controller, sub) = (ctx.controller.clone(), ctx.subject());
        ctx.spawn(async move { controller.clear_history(&sub).await });
    }

    fn toggle_nsfw(&mut self, ctx: &AppContext) {
        if !ctx.session.is_signed_in() {
            ctx.events.navigate(Route::Login);
            return;
        }
        tracing::debug!(nsfw = self.nsfw, "content mode toggled");
        let (controller, sub, nsfw) = (ctx.controller.clone(), ctx.subject(), self.nsfw);
        ctx.spawn(async move { controller.set_nsfw(&sub, nsfw).await });
    }

    fn play(&mut self, ctx: &AppContext, message: &Message) {
        let Some(audio) = &message.audio else {
            return;
        };
        match ctx.blobs.get(audio.as_str()) {
            Some(blob) => {
                tracing::debug!(mime = ?blob.mime, id = %message.id, "playing message audio");
                ctx.player.play(blob.bytes);
            }
            None => self.status = "Error: Audio no longer available".to_string(),
        }
    }

    fn sync_texture(&mut self, egui_ctx: &egui::Context, ctx: &AppContext, reference: &str) {
        let current = self.image.as_ref();
        if current.is_some_and(|shown| {
            shown.reference == reference && (shown.texture.is_some() || shown.undecodable)
        }) {
            return;
        }
        let Some(bytes) = ctx.controller.image_bytes(reference) else {
            self.image = Some(DisplayedImage {
                reference: reference.to_string(),
                texture: None,
                undecodable: false,
            });
            return;
        };
        let texture = match decode_image(&bytes) {
            Ok(decoded) => {
                Some(egui_ctx.load_texture("assistant-image", decoded, TextureOptions::LINEAR))
            }
            Err(err) => {
                tracing::warn!("cannot display image: {err}");
                None
            }
        };
        self.image = Some(DisplayedImage {
            reference: reference.to_string(),
            undecodable: texture.is_none(),
            texture,
        });
    }

    fn show_image(
        &mut self,
        ui: &mut egui::Ui,
        ctx: &AppContext,
        theme: &Theme,
        state: &ConversationState,
    ) {
        let side = theme.image_max_side;
        match state.current_image.as_deref() {
            Some(reference) => {
                self.sync_texture(ui.ctx(), ctx, reference);
                match self.image.as_ref().and_then(|shown| shown.texture.as_ref()) {
                    Some(texture) => {
                        ui.add(egui::Image::new(texture).max_size(egui::vec2(side, side)));
                    }
                    None if state.image_loading => loader(ui),
                    None => {
                        ui.label(RichText::new("Image expired").color(theme.text_muted));
                    }
                }
            }
            None => {
                self.image = None;
                ui.allocate_ui(egui::vec2(side, side * 0.6), |ui| {
                    ui.centered_and_justified(|ui| {
                        ui.label(RichText::new("No image yet").color(theme.text_muted));
                    });
                });
            }
        }
    }

    fn show_controls(&mut self, ui: &mut egui::Ui, ctx: &AppContext, theme: &Theme) {
        ui.horizontal(|ui| {
            if ui.button("Clear").clicked() {
                self.confirm_clear = true;
            }

            let recording = self.recording.is_some();
            let mic_label = if recording { "Stop" } else { "Record" };
            let mic = egui::Button::new(RichText::new(mic_label).color(theme.text_primary))
                .fill(theme.mic_button_fill(recording));
            let allowed = recording || !self.processing();
            if ui.add_enabled(allowed, mic).clicked() {
                self.toggle_recording(ctx);
            }

            ui.label("SFW");
            if ui.checkbox(&mut self.nsfw, "NSFW").changed() {
                self.toggle_nsfw(ctx);
            }
        });
    }

    fn show_messages(
        &mut self,
        ui: &mut egui::Ui,
        ctx: &AppContext,
        theme: &Theme,
        state: &ConversationState,
    ) {
        let mut to_play: Option<&Message> = None;
        ScrollArea::vertical()
            .id_salt("conversation")
            .max_height((ui.available_height() - 120.0).max(160.0))
            .stick_to_bottom(true)
            .auto_shrink([false, false])
            .show(ui, |ui| {
                for message in &state.messages {
                    ui.push_id(&message.id, |ui| {
                        theme.bubble_frame(message.speaker).show(ui, |ui| {
                            ui.set_width(ui.available_width());
                            ui.horizontal_wrapped(|ui| {
                                ui.strong(speaker_label(message.speaker));
                                ui.label(&message.text);
                            });
                            if message.audio.is_some() && ui.small_button("Play").clicked() {
                                to_play = Some(message);
                            }
                        });
                    });
                }
                if self.processing() {
                    ui.horizontal(|ui| {
                        ui.spinner();
                        ui.label(RichText::new("...").color(theme.text_muted));
                    });
                }
            });
        if let Some(message) = to_play {
            self.play(ctx, message);
        }
    }

    fn show_composer(&mut self, ui: &mut egui::Ui, ctx: &AppContext) {
        let mut send = false;
        ui.horizontal(|ui| {
            let input = ui.add(
                egui::TextEdit::multiline(&mut self.text_input)
                    .hint_text("Type your message here...")
                    .desired_rows(2)
                    .desired_width(ui.available_width() - 80.0),
            );
            let enter = input.has_focus()
                && ui.input(|i| i.key_pressed(egui::Key::Enter) && !i.modifiers.shift);
            send |= enter;
            send |= ui.button("Send").clicked();
        });
        if send {
            let trimmed = self.text_input.trim_end_matches('\n').to_string();
            self.text_input = trimmed;
            self.send_text(ctx);
        }
    }

    fn show_confirm_clear(&mut self, egui_ctx: &egui::Context, ctx: &AppContext) {
        if !self.confirm_clear {
            return;
        }
        let mut confirmed = false;
        let mut cancelled = false;
        egui::Window::new("Clear conversation")
            .collapsible(false)
            .resizable(false)
            .anchor(egui::Align2::CENTER_CENTER, egui::Vec2::ZERO)
            .show(egui_ctx, |ui| {
                ui.label("Are you sure you want to clear?");
                ui.horizontal(|ui| {
                    confirmed = ui.button("OK").clicked();
                    cancelled = ui.button("Cancel").clicked();
                });
            });
        if confirmed {
            self.clear(ctx);
        } else if cancelled {
            self.confirm_clear = false;
        }
    }
}

impl Page for ConversationPage {
    fn mount(&mut self, ctx: &AppContext, token: CancellationToken) {
        self.status = IDLE_STATUS.to_string();
        self.confirm_clear = false;
        let (controller, sub) = (ctx.controller.clone(), ctx.subject());
        let history_token = token.clone();
        ctx.spawn(async move { controller.mount(&sub, &history_token).await });

        let (task_ctx, sub) = (ctx.clone(), ctx.subject());
        ctx.spawn(async move {
            refresh_user_info(&task_ctx, &sub, &token, Route::Conversation, USER_DATA_FAILED)
                .await;
        });
    }

    fn show(&mut self, ui: &mut egui::Ui, ctx: &AppContext, theme: &Theme) {
        let state = ctx.conversation.snapshot();
        let token = ctx.users.user_info().and_then(|info| info.token);
        let name = ctx.session.current().map(|identity| identity.name);

        ui.horizontal(|ui| {
            let title = match &name {
                Some(name) => format!("Voice Assistant - Welcome, {name}"),
                None => "Voice Assistant".to_string(),
            };
            ui.heading(title);
            if name.is_some() {
                super::logout_button(ui, ctx);
            }
        });
        ui.separator();

        ui.columns(2, |columns| {
            let left = &mut columns[0];
            left.vertical_centered(|ui| {
                self.show_image(ui, ctx, theme, &state);
                self.show_controls(ui, ctx, theme);
                ui.label(
                    RichText::new(status_line(&self.status, token))
                        .color(theme.status_color(&self.status)),
                );
                if state.image_loading {
                    loader(ui);
                }
            });

            let right = &mut columns[1];
            self.show_messages(right, ctx, theme, &state);
            right.separator();
            self.show_composer(right, ctx);
        });

        self.show_confirm_clear(ui.ctx(), ctx);
    }

    fn unmount(&mut self) {
        self.confirm_clear = false;
        if let Some(recording) = self.recording.take() {
            let capture = recording.recorder.stop();
            tracing::info!(seconds = capture.seconds(), "recording dropped on leaving the page");
        }
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}

#[cfg(test)]
impl ConversationPage {
    /// A page mid-capture for `sub`, holding `samples` without a device.
    pub(crate) fn recording_for(sub: &str, samples: Vec<f32>) -> Self {
        Self {
            recording: Some(Recording {
                recorder: Recorder::detached(samples, 16_000),
                sub: sub.to_string(),
            }),
            ..Self::default()
        }
    }

    pub(crate) fn is_recording(&self) -> bool {
        self.recording.is_some()
    }
}
