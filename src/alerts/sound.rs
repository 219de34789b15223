use rodio::{OutputStream, Sink};
use std::sync::{
    mpsc::{self, Sender},
    Arc, Mutex,
};
use std::thread;

use super::chime::Chime;
use super::{AlertKind, SoundPlayer};

enum SoundCommand {
    Play { kind: AlertKind, volume: f32 },
}

/// Plays alert chimes on a dedicated thread holding the non-Send audio
/// objects; callers only ever touch an mpsc sender.
pub struct ChimePlayer {
    tx: Arc<Mutex<Option<Sender<SoundCommand>>>>,
}

impl ChimePlayer {
    pub fn new() -> Self {
        Self {
            tx: Arc::new(Mutex::new(None)),
        }
    }

    fn ensure_thread(&self) -> Result<Sender<SoundCommand>, String> {
        if let Some(tx) = self.tx.lock().map_err(|e| e.to_string())?.as_ref() {
            return Ok(tx.clone());
        }

        let (tx, rx) = mpsc::channel::<SoundCommand>();

        thread::Builder::new()
            .name("alert-sound".to_string())
            .spawn(move || {
                let mut _stream: Option<OutputStream> = None;
                let mut sink: Option<Sink> = None;

                fn ensure_sink(
                    stream: &mut Option<OutputStream>,
                    sink: &mut Option<Sink>,
                ) -> Result<(), String> {
                    if sink.is_none() {
                        let (s, handle) = OutputStream::try_default()
                            .map_err(|e| format!("Failed to create audio output stream: {}", e))?;
                        let new_sink = Sink::try_new(&handle)
                            .map_err(|e| format!("Failed to create audio sink: {}", e))?;
                        *stream = Some(s);
                        *sink = Some(new_sink);
                    }
                    Ok(())
                }

                while let Ok(cmd) = rx.recv() {
                    match cmd {
                        SoundCommand::Play { kind, volume } => {
                            if let Err(err) = ensure_sink(&mut _stream, &mut sink) {
                                log::warn!("alert sound unavailable: {err}");
                                continue;
                            }
                            if let Some(ref s) = sink {
                                s.set_volume(volume.clamp(0.0, 1.0));
                                s.append(Chime::for_kind(kind));
                                s.play();
                            }
                        }
                    }
                }
            })
            .map_err(|e| e.to_string())?;

        let tx_clone = tx.clone();
        *self.tx.lock().map_err(|e| e.to_string())? = Some(tx);
        Ok(tx_clone)
    }
}

impl SoundPlayer for ChimePlayer {
    fn play(&self, kind: AlertKind, volume: f32) -> Result<(), String> {
        let tx = self.ensure_thread()?;
        tx.send(SoundCommand::Play { kind, volume })
            .map_err(|e| e.to_string())
    }
}
