use crate::router::Route;
use eframe::egui;
use std::sync::{mpsc, Arc, OnceLock};

#[derive(Debug, Clone, PartialEq)]
pub enum AppEvent {
    /// Replace the status line of the page at `route`.
    Status { route: Route, message: String },
    Navigate(Route),
}

/// Wakes the UI thread after background work changed something visible.
#[derive(Clone, Default)]
pub struct Repaint(Arc<OnceLock<egui::Context>>);

impl Repaint {
    pub fn attach(&self, ctx: &egui::Context) {
        let _ = self.0.set(ctx.clone());
    }

    pub fn request(&self) {
        if let Some(ctx) = self.0.get() {
            ctx.request_repaint();
        }
    }
}

/// Sending half of the UI event channel, usable from any runtime thread.
#[derive(Clone)]
pub struct EventSink {
    tx: mpsc::Sender<AppEvent>,
    repaint: Repaint,
}

impl EventSink {
    pub fn new(tx: mpsc::Sender<AppEvent>, repaint: Repaint) -> Self {
        Self { tx, repaint }
    }

    pub fn send(&self, event: AppEvent) {
        if self.tx.send(event).is_err() {
            tracing::debug!("event dropped: UI receiver closed");
        }
        self.repaint.request();
    }

    pub fn status(&self, route: Route, message: impl Into<String>) {
        self.send(AppEvent::Status {
            route,
            message: message.into(),
        });
    }

    pub fn navigate(&self, route: Route) {
        self.send(AppEvent::Navigate(route));
    }
}
