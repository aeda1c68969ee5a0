use super::{loader, logout_button, refresh_user_info, titled, AppContext, Page};
use crate::api::UserInfo;
use crate::router::Route;
use crate::theme::Theme;
use eframe::egui::{self, RichText};
use tokio_util::sync::CancellationToken;

pub const LOAD_FAILED: &str = "Failed to load user data. Please try again.";

/// A zero or missing balance reads as unavailable.
pub fn token_label(token: Option<i64>) -> String {
    match token {
        Some(balance) if balance != 0 => balance.to_string(),
        _ => "No token available".to_string(),
    }
}

pub fn pro_label(pro_member: bool) -> &'static str {
    if pro_member {
        "Yes"
    } else {
        "No"
    }
}

#[derive(Default)]
pub struct DashboardPage {
    error: Option<String>,
}

impl DashboardPage {
    fn info_rows(ui: &mut egui::Ui, info: &UserInfo, conversations: u64, theme: &Theme) {
        egui::Grid::new("dashboard_info")
            .num_columns(2)
            .spacing([theme.spacing_16, theme.spacing_8])
            .show(ui, |ui| {
                let rows = [
                    ("Name:", info.user_name.clone()),
                    ("Email:", info.email.clone()),
                    ("Token:", token_label(info.token)),
                    ("Pro Member:", pro_label(info.pro_member).to_string()),
                    ("Total Conversations:", conversations.to_string()),
                ];
                for (label, value) in rows {
                    ui.label(RichText::new(label).color(theme.text_muted));
                    ui.label(value);
                    ui.end_row();
                }
            });
    }
}

impl Page for DashboardPage {
    fn mount(&mut self, ctx: &AppContext, token: CancellationToken) {
        self.error = None;
        let (task_ctx, sub) = (ctx.clone(), ctx.subject());
        ctx.spawn(async move {
            refresh_user_info(&task_ctx, &sub, &token, Route::Dashboard, LOAD_FAILED).await;
        });
    }

    fn show(&mut self, ui: &mut egui::Ui, ctx: &AppContext, theme: &Theme) {
        let state = ctx.users.snapshot();
        let name = state.user_info.as_ref().map(|info| info.user_name.as_str());

        theme.card_frame().show(ui, |ui| {
            ui.heading(titled("User Dashboard", name));
            ui.separator();
            match (&self.error, &state.user_info) {
                (Some(error), _) => {
                    ui.label(RichText::new(error).color(theme.danger));
                }
                (None, Some(info)) => {
                    Self::info_rows(ui, info, state.conversation_count.unwrap_or(0), theme);
                }
                (None, None) => loader(ui),
            }
            ui.add_space(theme.spacing_8);
            logout_button(ui, ctx);
        });
    }

    fn set_status(&mut self, message: String) {
        self.error = Some(message);
    }
}
