use crate::event::EventSink;
use crate::router::Route;
use rodio::{Decoder, OutputStream, OutputStreamHandle, Sink};
use std::io::Cursor;
use std::sync::mpsc::{self, Receiver, RecvTimeoutError, Sender};
use std::sync::Arc;
use std::time::Duration;

const POLL_INTERVAL_MS: u64 = 200;

enum PlayerCommand {
    Play(Arc<[u8]>),
    Stop,
}

/// Plays message audio on a dedicated thread that owns the output device.
#[derive(Clone)]
pub struct AudioPlayer {
    tx: Sender<PlayerCommand>,
}

impl AudioPlayer {
    pub fn spawn(events: EventSink) -> Self {
        let (tx, rx) = mpsc::channel();
        let spawned = std::thread::Builder::new()
            .name("audio-player".to_string())
            .spawn(move || run(rx, events));
        if let Err(err) = spawned {
            tracing::error!("failed to start audio player thread: {err}");
        }
        Self { tx }
    }

    /// A player with no backing thread; every command is dropped.
    #[cfg(test)]
    pub fn detached() -> Self {
        let (tx, _rx) = mpsc::channel();
        Self { tx }
    }

    pub fn play(&self, bytes: Arc<[u8]>) {
        if self.tx.send(PlayerCommand::Play(bytes)).is_err() {
            tracing::warn!("audio player is not running");
        }
    }

    pub fn stop(&self) {
        let _ = self.tx.send(PlayerCommand::Stop);
    }
}

fn run(rx: Receiver<PlayerCommand>, events: EventSink) {
    let output = match OutputStream::try_default() {
        Ok(output) => Some(output),
        Err(err) => {
            tracing::warn!("no audio output device: {err}");
            None
        }
    };
    let mut sink: Option<Sink> = None;

    loop {
        match rx.recv_timeout(Duration::from_millis(POLL_INTERVAL_MS)) {
            Ok(PlayerCommand::Play(bytes)) => {
                if let Some(previous) = sink.take() {
                    previous.stop();
                }
                let Some((_, handle)) = output.as_ref() else {
                    events.status(Route::Conversation, "Error: no audio output device");
                    continue;
                };
                match start_playback(handle, bytes) {
                    Ok(started) => {
                        sink = Some(started);
                        events.status(Route::Conversation, "Playing audio...");
                    }
                    Err(message) => {
                        tracing::warn!("playback failed: {message}");
                        events.status(Route::Conversation, format!("Error: {message}"));
                    }
                }
            }
            Ok(PlayerCommand::Stop) => {
                if let Some(previous) = sink.take() {
                    previous.stop();
                }
            }
            Err(RecvTimeoutError::Timeout) => {
                if sink.as_ref().is_some_and(Sink::empty) {
                    sink = None;
                    events.status(Route::Conversation, "Audio finished");
                }
            }
            Err(RecvTimeoutError::Disconnected) => break,
        }
    }
}

fn start_playback(handle: &OutputStreamHandle, bytes: Arc<[u8]>) -> Result<Sink, String> {
    let source = Decoder::new(Cursor::new(bytes.to_vec()))
        .map_err(|err| format!("unplayable audio: {err}"))?;
    let sink = Sink::try_new(handle).map_err(|err| format!("audio output failed: {err}"))?;
    sink.append(source);
    Ok(sink)
}
