mod api;
mod app;
mod config;
mod conversation;
mod error;
mod event;
mod logging;
mod media;
mod pages;
mod plans;
mod router;
mod session;
mod store;
mod theme;

use api::BackendClient;
use app::VoiceAssistantApp;
use config::AppConfig;
use conversation::ConversationController;
use eframe::egui;
use event::{EventSink, Repaint};
use media::player::AudioPlayer;
use media::{BlobStore, HttpImageLoader, ImageCache};
use pages::AppContext;
use router::Route;
use session::store::IdentityStore;
use session::SessionManager;
use std::sync::{mpsc, Arc};
use store::{ConversationStore, UserStore};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    let config = AppConfig::from_env()?;
    logging::init_logging(config.log_format)?;
    tracing::info!(
        backend = %config.backend_url,
        data_dir = %config.data_dir.display(),
        "configuration loaded"
    );

    let (tx, rx) = mpsc::channel();
    let repaint = Repaint::default();
    let events = EventSink::new(tx, repaint.clone());

    let runtime = tokio::runtime::Builder::new_multi_thread()
        .enable_all()
        .thread_name("voice-assistant-runtime")
        .build()?;

    let client = BackendClient::new(config.backend_url.clone(), config.request_timeout)?;
    let session = SessionManager::restore(IdentityStore::at(&config.data_dir));
    let conversation = ConversationStore::new(repaint.clone());
    let users = UserStore::new(repaint.clone());
    let blobs = BlobStore::new();
    let controller = ConversationController::new(
        client.clone(),
        conversation.clone(),
        users.clone(),
        blobs.clone(),
        Arc::new(HttpImageLoader::new()?),
        ImageCache::default(),
        events.clone(),
    );
    let player = AudioPlayer::spawn(events.clone());

    let ctx = AppContext {
        client,
        session,
        conversation,
        users,
        blobs,
        controller,
        player,
        events,
        runtime: runtime.handle().clone(),
    };

    let app = VoiceAssistantApp::new(rx, ctx, repaint, Route::Conversation);

    let native_options = eframe::NativeOptions {
        viewport: egui::ViewportBuilder::default()
            .with_title("Voice Assistant")
            .with_inner_size([1180.0, 760.0])
            .with_min_inner_size([900.0, 600.0]),
        ..Default::default()
    };

    eframe::run_native(
        "Voice Assistant",
        native_options,
        Box::new(move |_creation_context| Ok(Box::new(app))),
    )?;

    tracing::info!("voice assistant shut down");
    Ok(())
}
