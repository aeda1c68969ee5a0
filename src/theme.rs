use crate::store::Speaker;
use eframe::egui::{self, Color32, CornerRadius, FontId, Frame, Margin, Stroke, TextStyle};

#[derive(Debug, Clone)]
pub struct Theme {
    pub surface_0: Color32,
    pub surface_1: Color32,
    pub surface_2: Color32,
    pub surface_3: Color32,
    pub accent_primary: Color32,
    pub accent_muted: Color32,
    pub recording: Color32,
    pub success: Color32,
    pub danger: Color32,
    pub text_primary: Color32,
    pub text_muted: Color32,
    pub user_bubble: Color32,
    pub assistant_bubble: Color32,
    pub spacing_8: f32,
    pub spacing_12: f32,
    pub spacing_16: f32,
    pub radius_10: u8,
    pub radius_12: u8,
    pub image_max_side: f32,
}

impl Default for Theme {
    fn default() -> Self {
        Self {
            surface_0: Color32::from_rgb(0x0F, 0x11, 0x15),
            surface_1: Color32::from_rgb(0x16, 0x1A, 0x20),
            surface_2: Color32::from_rgb(0x1C, 0x22, 0x2B),
            surface_3: Color32::from_rgb(0x22, 0x2A, 0x35),
            accent_primary: Color32::from_rgb(0xEC, 0x48, 0x99),
            accent_muted: Color32::from_rgb(0xBE, 0x18, 0x5D),
            recording: Color32::from_rgb(0xEF, 0x44, 0x44),
            success: Color32::from_rgb(0x22, 0xC5, 0x5E),
            danger: Color32::from_rgb(0xF8, 0x71, 0x71),
            text_primary: Color32::from_rgb(0xE6, 0xED, 0xF3),
            text_muted: Color32::from_rgb(0x8B, 0x94, 0x9E),
            user_bubble: Color32::from_rgb(0x1E, 0x3A, 0x5F),
            assistant_bubble: Color32::from_rgb(0x3B, 0x1F, 0x36),
            spacing_8: Self::P8,
            spacing_12: 12.0,
            spacing_16: Self::P16,
            radius_10: 10,
            radius_12: Self::R12,
            image_max_side: 420.0,
        }
    }
}

impl Theme {
    pub const R12: u8 = 12;
    pub const P8: f32 = 8.0;
    pub const P16: f32 = 16.0;

    pub fn apply_visuals(&self, ctx: &egui::Context) {
        let mut visuals = egui::Visuals::dark();
        visuals.panel_fill = self.surface_1;
        visuals.override_text_color = Some(self.text_primary);
        visuals.widgets.noninteractive.bg_fill = self.surface_2;
        visuals.widgets.noninteractive.weak_bg_fill = self.surface_2;
        visuals.widgets.noninteractive.bg_stroke = Stroke::NONE;
        visuals.widgets.inactive.bg_fill = self.surface_2;
        visuals.widgets.inactive.bg_stroke = Stroke::NONE;
        visuals.widgets.hovered.bg_fill = self.surface_3;
        visuals.widgets.hovered.bg_stroke = Stroke::NONE;
        visuals.widgets.active.bg_fill = self.accent_muted;
        visuals.widgets.active.bg_stroke = Stroke::NONE;
        visuals.selection.bg_fill = self.accent_muted;
        visuals.hyperlink_color = self.accent_primary;
        visuals.window_fill = self.surface_1;
        visuals.window_stroke = Stroke::NONE;
        visuals.window_corner_radius = CornerRadius::same(self.radius_10);
        visuals.window_shadow = egui::epaint::Shadow {
            offset: [0, 8],
            blur: 24,
            spread: 0,
            color: Color32::from_rgba_premultiplied(0, 0, 0, 64),
        };

        let mut style = (*ctx.style()).clone();
        style.visuals = visuals;
        style.spacing.item_spacing = egui::vec2(10.0, 10.0);
        style.spacing.button_padding = egui::vec2(12.0, 8.0);
        style.text_styles.insert(TextStyle::Heading, FontId::proportional(20.0));
        style.text_styles.insert(TextStyle::Body, FontId::proportional(14.0));
        style.text_styles.insert(TextStyle::Small, FontId::proportional(12.0));
        ctx.set_style(style);
    }

    pub fn card_frame(&self) -> Frame {
        Frame::new()
            .fill(self.surface_2)
            .inner_margin(Margin::same(self.spacing_16 as i8))
            .corner_radius(CornerRadius::same(self.radius_12))
            .shadow(egui::epaint::Shadow {
                offset: [0, 4],
                blur: 18,
                spread: 0,
                color: Color32::from_rgba_premultiplied(0, 0, 0, 40),
            })
    }

    pub fn bubble_fill(&self, speaker: Speaker) -> Color32 {
        match speaker {
            Speaker::User => self.user_bubble,
            Speaker::Assistant => self.assistant_bubble,
        }
    }

    pub fn bubble_frame(&self, speaker: Speaker) -> Frame {
        Frame::new()
            .fill(self.bubble_fill(speaker))
            .inner_margin(Margin::symmetric(self.spacing_12 as i8, self.spacing_8 as i8))
            .corner_radius(CornerRadius::same(self.radius_10))
    }

    pub fn mic_button_fill(&self, recording: bool) -> Color32 {
        if recording {
            self.recording
        } else {
            self.accent_primary
        }
    }

    /// Statuses beginning with "Error" render in the danger colour.
    pub fn status_color(&self, status: &str) -> Color32 {
        if status.starts_with("Error") || status.starts_with("Login failed") {
            self.danger
        } else {
            self.text_muted
        }
    }
}
