use crate::{
    audio::Soundscape,
    cycle::{BreathingCycle, CycleEvent, Transition},
    history::{History, SessionRecord, format_timer},
    settings::{Settings, SettingsField},
    store::{EXPORT_FILE, HISTORY_FILE, SETTINGS_FILE, Store},
    voice::Speaker,
};
use crossterm::event::{KeyCode, KeyEvent, KeyModifiers};
use notify_rust::{Notification, Urgency};
use std::time::{Duration, Instant};

pub type SpeakerFactory = Box<dyn Fn(bool) -> Box<dyn Speaker>>;

#[derive(PartialEq, Clone, Copy, Debug)]
pub enum View {
    Timer,
    Stats,
    Settings,
    Help,
}

// ============================================================================
// Application State
// ============================================================================

pub struct AppState {
    pub cycle: BreathingCycle,
    pub settings: Settings,
    pub history: History,
    pub view: View,
    pub settings_field: SettingsField,
    /// Duration of the last session finished in this run.
    pub last_session: Option<Duration>,
    pub status: Option<String>,
    goal_reached: bool,
    desktop_notifications: bool,
    /// Cleared when the stored history could not be loaded, so it is never
    /// overwritten by a partial one.
    history_writable: bool,
    store: Store,
    speaker: Box<dyn Speaker>,
    make_speaker: SpeakerFactory,
    soundscape: Option<Soundscape>,
}

impl AppState {
    pub fn new(settings: Settings, history: History, store: Store, make_speaker: SpeakerFactory) -> Self {
        let speaker = make_speaker(settings.voice_enabled);
        let mut app = Self {
            cycle: BreathingCycle::new(settings.phase_duration),
            settings,
            history,
            view: View::Timer,
            settings_field: SettingsField::PhaseDuration,
            last_session: None,
            status: None,
            goal_reached: false,
            desktop_notifications: true,
            history_writable: true,
            store,
            speaker,
            make_speaker,
            soundscape: None,
        };
        app.sync_soundscape();
        app
    }

    pub fn without_notifications(mut self) -> Self {
        self.desktop_notifications = false;
        self
    }

    pub fn with_read_only_history(mut self) -> Self {
        self.history_writable = false;
        self.status = Some("History could not be loaded; new sessions are not saved".into());
        self
    }

    pub fn goal(&self) -> Duration {
        Duration::from_secs(self.settings.goal_duration * 60)
    }

    fn announce(&mut self, event: CycleEvent) {
        let CycleEvent::PhaseStarted(phase) = event;
        tracing::debug!(phase = phase.label(), "phase started");
        self.speaker.speak(phase.label());
    }

    pub fn toggle_session(&mut self, now: Instant) {
        match self.cycle.toggle(now) {
            Transition::Started(event) => {
                tracing::info!(phase_secs = self.cycle.phase_secs(), "session started");
                self.goal_reached = false;
                self.status = None;
                self.announce(event);
                if let Some(scape) = &self.soundscape {
                    scape.play();
                }
            }
            Transition::Stopped(duration) => self.finish_session(duration),
        }
    }

    pub fn toggle_pause(&mut self, now: Instant) {
        if self.cycle.is_paused() {
            self.cycle.resume(now);
            if let Some(scape) = &self.soundscape {
                scape.play();
            }
        } else if self.cycle.pause(now) {
            self.speaker.cancel();
            if let Some(scape) = &self.soundscape {
                scape.pause();
            }
        }
    }

    fn finish_session(&mut self, duration: Duration) {
        self.speaker.cancel();
        if let Some(scape) = &self.soundscape {
            scape.pause();
        }
        if duration.is_zero() {
            return;
        }

        self.last_session = Some(duration);
        self.history.push(SessionRecord::finished_now(duration));
        tracing::info!(duration = %format_timer(duration), "session finished");
        self.save_history();
    }

    pub fn update(&mut self, now: Instant) {
        if let Some(event) = self.cycle.tick(now) {
            self.announce(event);
        }

        if self.cycle.is_active() && !self.goal_reached && self.cycle.total_time() >= self.goal() {
            self.goal_reached = true;
            tracing::info!(goal_minutes = self.settings.goal_duration, "goal reached");
            if self.desktop_notifications {
                notify(
                    "Goal reached",
                    &format!("{} minutes of box breathing. Nice work.", self.settings.goal_duration),
                );
            }
        }
    }

    /// Applies a settings change from the settings view and persists it.
    pub fn change_setting(&mut self, field: SettingsField, forward: bool) {
        if !self.settings.step(field, forward) {
            return;
        }
        self.after_setting_changed(field);
    }

    pub fn toggle_setting(&mut self, field: SettingsField) {
        if self.settings.toggle(field) {
            self.after_setting_changed(field);
        }
    }

    fn after_setting_changed(&mut self, field: SettingsField) {
        match field {
            SettingsField::PhaseDuration => self.cycle.set_phase_duration(self.settings.phase_duration),
            SettingsField::Voice => {
                self.speaker.cancel();
                self.speaker = (self.make_speaker)(self.settings.voice_enabled);
            }
            SettingsField::Soundscape => self.sync_soundscape(),
            SettingsField::Volume => {
                if let Some(scape) = &self.soundscape {
                    scape.set_volume(self.settings.volume);
                }
            }
            SettingsField::GoalDuration | SettingsField::Theme => {}
        }
        self.save_settings();
    }

    fn sync_soundscape(&mut self) {
        let wanted = if self.settings.soundscape_enabled {
            self.settings.soundscape.clone()
        } else {
            None
        };
        match wanted {
            Some(path) if self.soundscape.is_none() => {
                let scape = Soundscape::spawn(&path, self.settings.volume);
                if self.cycle.is_active() && !self.cycle.is_paused() {
                    scape.play();
                }
                self.soundscape = Some(scape);
            }
            Some(_) => {}
            None => self.soundscape = None,
        }
    }

    pub fn has_soundscape(&self) -> bool {
        self.soundscape.is_some()
    }

    fn save_settings(&self) {
        if let Err(e) = self.store.save(SETTINGS_FILE, &self.settings) {
            tracing::error!("could not save settings: {e}");
        }
    }

    fn save_history(&mut self) {
        if !self.history_writable {
            tracing::warn!("history is read-only for this run; session not saved");
            self.status = Some("History could not be loaded; session not saved".into());
            return;
        }
        if let Err(e) = self.store.save(HISTORY_FILE, &self.history) {
            tracing::error!("could not save history: {e}");
            self.status = Some("History could not be saved".into());
        }
    }

    pub fn export_history(&mut self) {
        let path = self.store.path(EXPORT_FILE);
        self.status = Some(match self.store.write(EXPORT_FILE, &self.history.export_csv()) {
            Ok(()) => {
                tracing::info!(path = %path.display(), "history exported");
                format!("Exported to {}", path.display())
            }
            Err(e) => {
                tracing::error!("export failed: {e}");
                "Export failed".into()
            }
        });
    }

    /// A session still running at quit is recorded like a normal stop.
    pub fn save_on_quit(&mut self, now: Instant) {
        if let Some(duration) = self.cycle.stop(now) {
            self.finish_session(duration);
        }
    }
}

// ============================================================================
// Event Handlers
// ============================================================================

/// Returns `true` when the app should quit.
pub fn handle_input(key: KeyEvent, app: &mut AppState, now: Instant) -> bool {
    if key.code == KeyCode::Char('c') && key.modifiers.contains(KeyModifiers::CONTROL) {
        return true;
    }

    match app.view {
        View::Settings => handle_settings_view(key, app),
        _ => handle_main_view(key, app, now),
    }
}

fn handle_settings_view(key: KeyEvent, app: &mut AppState) -> bool {
    match key.code {
        KeyCode::Esc | KeyCode::Char('q') | KeyCode::Char('c') => app.view = View::Timer,
        KeyCode::Down | KeyCode::Char('j') => app.settings_field = app.settings_field.next(),
        KeyCode::Up | KeyCode::Char('k') => app.settings_field = app.settings_field.prev(),
        KeyCode::Left | KeyCode::Char('h') => app.change_setting(app.settings_field, false),
        KeyCode::Right | KeyCode::Char('l') => app.change_setting(app.settings_field, true),
        KeyCode::Char(' ') | KeyCode::Enter => app.toggle_setting(app.settings_field),
        _ => {}
    }
    false
}

fn handle_main_view(key: KeyEvent, app: &mut AppState, now: Instant) -> bool {
    match key.code {
        KeyCode::Char('q') => return true,
        KeyCode::Esc => {
            if app.view == View::Timer {
                return true;
            }
            app.view = View::Timer;
        }
        KeyCode::Enter => app.toggle_session(now),
        KeyCode::Char(' ') => {
            if app.cycle.is_active() {
                app.toggle_pause(now);
            } else {
                app.toggle_session(now);
            }
        }
        KeyCode::Char('s') => {
            app.view = if app.view == View::Stats { View::Timer } else { View::Stats };
        }
        KeyCode::Char('c') => app.view = View::Settings,
        KeyCode::Char('h') | KeyCode::Char('?') => {
            app.view = if app.view == View::Help { View::Timer } else { View::Help };
        }
        KeyCode::Char('e') if app.view == View::Stats => app.export_history(),
        _ => {}
    }
    false
}

// ============================================================================
// Utilities
// ============================================================================

fn notify(title: &str, body: &str) {
    if let Err(e) = Notification::new()
        .summary(title)
        .body(body)
        .appname("ninjaflow")
        .icon("face-smile")
        .urgency(Urgency::Normal)
        .show()
    {
        tracing::warn!("desktop notification failed: {e}");
    }
}
