use super::{loader, logout_button, refresh_user_info, titled, AppContext, Page};
use crate::plans::{Plan, PLANS};
use crate::router::Route;
use crate::theme::Theme;
use eframe::egui::{self, RichText};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tokio_util::sync::CancellationToken;

pub const CANCELLING: &str = "Canceling subscription...";
pub const CANCELLED: &str = "Subscription canceled successfully!";
pub const USER_DATA_FAILED: &str = "Error loading user data";

pub fn redirect_status(plan: &Plan) -> String {
    format!("Redirecting to payment for {} plan...", plan.name)
}

/// Cancels the paid plan and flips the cached membership on success.
pub async fn cancel_subscription(ctx: &AppContext, sub: &str) {
    match ctx.client.cancel_subscription(sub).await {
        Ok(()) => {
            tracing::info!("subscription cancelled");
            ctx.users.mark_subscription_cancelled();
            ctx.events.status(Route::Subscription, CANCELLED);
        }
        Err(err) => {
            tracing::error!("error canceling subscription: {err}");
            ctx.events.status(Route::Subscription, format!("Error: {err}"));
        }
    }
}

#[derive(Default)]
pub struct SubscriptionPage {
    status: String,
    loading: Arc<AtomicBool>,
}

impl SubscriptionPage {
    fn subscribe(&mut self, ui: &egui::Ui, plan: &Plan) {
        self.status = redirect_status(plan);
        tracing::info!(plan = plan.name, "opening payment link");
        ui.ctx().open_url(egui::OpenUrl::new_tab(plan.payment_link));
    }

    fn cancel(&mut self, ctx: &AppContext) {
        self.loading.store(true, Ordering::SeqCst);
        self.status = CANCELLING.to_string();
        let (task_ctx, sub, loading) = (ctx.clone(), ctx.subject(), Arc::clone(&self.loading));
        ctx.spawn(async move {
            cancel_subscription(&task_ctx, &sub).await;
            loading.store(false, Ordering::SeqCst);
        });
    }

    fn plan_card(&mut self, ui: &mut egui::Ui, plan: &Plan, disabled: bool, theme: &Theme) {
        theme.card_frame().show(ui, |ui| {
            ui.set_min_width(200.0);
            ui.heading(plan.name);
            ui.label(RichText::new(plan.price_label()).color(theme.accent_primary).strong());
            for feature in plan.features {
                ui.label(format!("• {feature}"));
            }
            let label = if self.loading.load(Ordering::SeqCst) {
                "Processing..."
            } else {
                "Subscribe"
            };
            if ui.add_enabled(!disabled, egui::Button::new(label)).clicked() {
                self.subscribe(ui, plan);
            }
        });
    }
}

impl Page for SubscriptionPage {
    fn mount(&mut self, ctx: &AppContext, token: CancellationToken) {
        self.status.clear();
        let (task_ctx, sub) = (ctx.clone(), ctx.subject());
        ctx.spawn(async move {
            refresh_user_info(&task_ctx, &sub, &token, Route::Subscription, USER_DATA_FAILED)
                .await;
        });
    }

    fn show(&mut self, ui: &mut egui::Ui, ctx: &AppContext, theme: &Theme) {
        let info = ctx.users.user_info();
        let pro_member = info.as_ref().is_some_and(|info| info.pro_member);
        let loading = self.loading.load(Ordering::SeqCst);

        ui.heading(titled(
            "Subscription Plans",
            info.as_ref().map(|info| info.user_name.as_str()),
        ));
        if pro_member {
            ui.label(RichText::new("You are a Pro Member!").color(theme.success));
        }
        ui.add_space(theme.spacing_8);

        ui.horizontal_wrapped(|ui| {
            for plan in &PLANS {
                self.plan_card(ui, plan, loading || pro_member, theme);
            }
        });

        if pro_member
            && ui
                .add_enabled(!loading, egui::Button::new("Cancel Subscription"))
                .clicked()
        {
            self.cancel(ctx);
        }
        if !self.status.is_empty() {
            ui.label(RichText::new(&self.status).color(theme.status_color(&self.status)));
        }
        if loading {
            loader(ui);
        }
        logout_button(ui, ctx);
    }

    fn set_status(&mut self, message: String) {
        self.status = message;
    }
}
