use rodio::{Decoder, OutputStream, Sink, Source};
use std::{
    fs::File,
    io::BufReader,
    path::Path,
    sync::mpsc::{self, Receiver, Sender},
    thread::{self, JoinHandle},
};

enum Command {
    Play,
    Pause,
    SetVolume(u8),
    Shutdown,
}

/// Looping background track. Playback runs on its own thread because the
/// rodio output stream cannot be moved between threads.
pub struct Soundscape {
    tx: Sender<Command>,
    handle: Option<JoinHandle<()>>,
}

impl Soundscape {
    /// Spawns the player thread. The file is opened and decoded there; if
    /// that fails the thread logs and exits, and later commands are dropped.
    pub fn spawn(path: &Path, volume: u8) -> Self {
        let (tx, rx) = mpsc::channel();
        let path = path.to_path_buf();
        let handle = thread::spawn(move || {
            if let Err(e) = run_player(&path, volume, rx) {
                tracing::warn!("soundscape {} unavailable: {e:#}", path.display());
            }
        });
        Self {
            tx,
            handle: Some(handle),
        }
    }

    pub fn play(&self) {
        let _ = self.tx.send(Command::Play);
    }

    pub fn pause(&self) {
        let _ = self.tx.send(Command::Pause);
    }

    pub fn set_volume(&self, volume: u8) {
        let _ = self.tx.send(Command::SetVolume(volume));
    }
}

impl Drop for Soundscape {
    fn drop(&mut self) {
        let _ = self.tx.send(Command::Shutdown);
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn gain(volume: u8) -> f32 {
    f32::from(volume.min(100)) / 100.0
}

fn run_player(path: &Path, volume: u8, rx: Receiver<Command>) -> anyhow::Result<()> {
    let (_stream, stream_handle) = OutputStream::try_default()?;
    let sink = Sink::try_new(&stream_handle)?;

    let file = File::open(path)?;
    let source = Decoder::new(BufReader::new(file))?;
    sink.pause();
    sink.set_volume(gain(volume));
    sink.append(source.repeat_infinite());

    while let Ok(cmd) = rx.recv() {
        match cmd {
            Command::Play => sink.play(),
            Command::Pause => sink.pause(),
            Command::SetVolume(v) => sink.set_volume(gain(v)),
            Command::Shutdown => break,
        }
    }
    sink.stop();
    Ok(())
}
