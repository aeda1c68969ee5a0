use super::{loader, logout_button, titled, AppContext, Page};
use crate::api::Payment;
use crate::store::user::NO_PAYMENT_RECORDS;
use crate::theme::Theme;
use chrono::{DateTime, Local};
use eframe::egui::{self, RichText};
use tokio_util::sync::CancellationToken;

/// Renders a backend timestamp in local time. Values that are neither
/// RFC 3339 nor RFC 2822 are shown as received.
pub fn format_timestamp(raw: &str) -> String {
    DateTime::parse_from_rfc3339(raw)
        .or_else(|_| DateTime::parse_from_rfc2822(raw))
        .map(|parsed| {
            parsed
                .with_timezone(&Local)
                .format("%Y-%m-%d %H:%M:%S")
                .to_string()
        })
        .unwrap_or_else(|_| raw.to_string())
}

pub fn format_price(price: f64) -> String {
    format!("${price:.2}")
}

/// Load outcomes live in the user store; `status` holds messages routed to
/// this page directly.
#[derive(Default)]
pub struct PaymentRecordPage {
    status: String,
}

impl PaymentRecordPage {
    fn table(ui: &mut egui::Ui, payments: &[Payment], theme: &Theme) {
        egui::ScrollArea::vertical()
            .id_salt("payments")
            .show(ui, |ui| {
                egui::Grid::new("payments_table")
                    .num_columns(4)
                    .striped(true)
                    .spacing([theme.spacing_16, theme.spacing_8])
                    .show(ui, |ui| {
                        for header in ["Date", "Plan", "Price", "Order ID"] {
                            ui.strong(header);
                        }
                        ui.end_row();
                        for payment in payments {
                            ui.label(format_timestamp(&payment.timestamp));
                            ui.label(&payment.plan);
                            ui.label(format_price(payment.price));
                            ui.label(&payment.order_id);
                            ui.end_row();
                        }
                    });
            });
    }
}

impl Page for PaymentRecordPage {
    /// Fetches only what the shared store does not already hold.
    fn mount(&mut self, ctx: &AppContext, token: CancellationToken) {
        self.status.clear();
        let (task_ctx, sub) = (ctx.clone(), ctx.subject());
        ctx.spawn(async move {
            let users = &task_ctx.users;
            if users.user_info().is_none() {
                users.load_user_info(&task_ctx.client, &sub, &token).await;
            }
            if !users.has_payments() {
                users.load_payment_records(&task_ctx.client, &sub, &token).await;
            }
        });
    }

    fn show(&mut self, ui: &mut egui::Ui, ctx: &AppContext, theme: &Theme) {
        let state = ctx.users.snapshot();
        let name = state.user_info.as_ref().map(|info| info.user_name.as_str());

        theme.card_frame().show(ui, |ui| {
            ui.heading(titled("Payment Records", name));
            ui.separator();
            if state.loading {
                loader(ui);
            } else {
                if state.payments.is_empty() {
                    ui.label(RichText::new(NO_PAYMENT_RECORDS).color(theme.text_muted));
                } else {
                    Self::table(ui, &state.payments, theme);
                }
                let notices = [state.status.as_str(), self.status.as_str()];
                for notice in notices {
                    if !notice.is_empty() && notice != NO_PAYMENT_RECORDS {
                        ui.label(RichText::new(notice).color(theme.status_color(notice)));
                    }
                }
            }
            ui.add_space(theme.spacing_8);
            logout_button(ui, ctx);
        });
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}
