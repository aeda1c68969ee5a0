use crate::event::{AppEvent, Repaint};
use crate::pages::{
    AppContext, ConversationPage, DashboardPage, LoginPage, Page, PaymentRecordPage,
    SubscriptionPage,
};
use crate::router::{Route, Router};
use crate::theme::Theme;
use eframe::egui::{self, RichText};
use std::sync::mpsc::{Receiver, TryRecvError};

#[derive(Default)]
struct Pages {
    login: LoginPage,
    conversation: ConversationPage,
    dashboard: DashboardPage,
    payment_record: PaymentRecordPage,
    subscription: SubscriptionPage,
}

impl Pages {
    fn get_mut(&mut self, route: Route) -> &mut dyn Page {
        match route {
            Route::Login => &mut self.login,
            Route::Conversation => &mut self.conversation,
            Route::Dashboard => &mut self.dashboard,
            Route::PaymentRecord => &mut self.payment_record,
            Route::Subscription => &mut self.subscription,
        }
    }
}

pub struct VoiceAssistantApp {
    rx: Receiver<AppEvent>,
    ctx: AppContext,
    repaint: Repaint,
    router: Router,
    pages: Pages,
    theme: Theme,
    styled: bool,
}

impl VoiceAssistantApp {
    pub fn new(rx: Receiver<AppEvent>, ctx: AppContext, repaint: Repaint, start: Route) -> Self {
        let mut app = Self {
            rx,
            ctx,
            repaint,
            router: Router::new(),
            pages: Pages::default(),
            theme: Theme::default(),
            styled: false,
        };
        app.navigate(start);
        app
    }

    fn navigate(&mut self, requested: Route) {
        let previous = self.router.current();
        self.pages.get_mut(previous).unmount();
        let (route, token) = self.router.navigate(requested, self.ctx.session.is_signed_in());
        tracing::debug!(path = route.path(), "navigated");
        self.pages.get_mut(route).mount(&self.ctx, token);
    }

    fn drain_events(&mut self) {
        loop {
            match self.rx.try_recv() {
                Ok(event) => self.apply_event(event),
                Err(TryRecvError::Empty) => break,
                Err(TryRecvError::Disconnected) => {
                    tracing::warn!("event channel disconnected");
                    break;
                }
            }
        }
    }

    fn apply_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Status { route, message } => self.pages.get_mut(route).set_status(message),
            AppEvent::Navigate(route) => self.navigate(route),
        }
    }

    fn render_top_bar(&mut self, ctx: &egui::Context) {
        let current = self.router.current();
        let mut requested = None;
        egui::TopBottomPanel::top("top_bar")
            .frame(
                egui::Frame::new()
                    .fill(self.theme.surface_0)
                    .inner_margin(egui::Margin::same(8)),
            )
            .show(ctx, |ui| {
                ui.horizontal(|ui| {
                    ui.strong("Voice Assistant");
                    ui.separator();
                    if !self.ctx.session.is_signed_in() {
                        ui.label(RichText::new("Not signed in").color(self.theme.text_muted));
                        return;
                    }
                    for route in Route::ALL {
                        if route == Route::Login {
                            continue;
                        }
                        if ui.selectable_label(route == current, route.label()).clicked() {
                            requested = Some(route);
                        }
                    }
                    ui.with_layout(egui::Layout::right_to_left(egui::Align::Center), |ui| {
                        crate::pages::logout_button(ui, &self.ctx);
                    });
                });
            });
        if let Some(route) = requested.filter(|route| *route != current) {
            self.navigate(route);
        }
    }

    fn render_page(&mut self, ctx: &egui::Context) {
        let route = self.router.current();
        egui::CentralPanel::default().show(ctx, |ui| {
            self.pages.get_mut(route).show(ui, &self.ctx, &self.theme);
        });
    }
}

impl eframe::App for VoiceAssistantApp {
    fn update(&mut self, ctx: &egui::Context, _frame: &mut eframe::Frame) {
        if !self.styled {
            self.theme.apply_visuals(ctx);
            self.repaint.attach(ctx);
            self.styled = true;
        }
        self.drain_events();
        self.render_top_bar(ctx);
        self.render_page(ctx);
    }
}
