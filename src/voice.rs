use std::{
    env,
    ffi::OsStr,
    path::PathBuf,
    process::{Child, Command, Stdio},
};

/// Something that can say a phase name out loud.
pub trait Speaker {
    /// Speaks `text`, cutting off whatever was still being said.
    fn speak(&mut self, text: &str);
    fn cancel(&mut self);
}

/// Used when voice is off or no speech program is installed.
#[derive(Default)]
pub struct SilentSpeaker;

impl Speaker for SilentSpeaker {
    fn speak(&mut self, _text: &str) {}
    fn cancel(&mut self) {}
}

// Rate and pitch tuned to roughly 1.2x rate and 1.1x pitch of each
// program's default voice. spd-say takes -100..100 offsets, the rest words
// per minute.
const PROGRAMS: &[(&str, &[&str])] = &[
    ("spd-say", &["-r", "20", "-p", "10", "-w"]),
    ("espeak-ng", &["-s", "210", "-p", "55"]),
    ("espeak", &["-s", "210", "-p", "55"]),
    ("say", &["-r", "210"]),
];

/// Speaks through an external text-to-speech program, one utterance at a
/// time.
pub struct CommandSpeaker {
    program: PathBuf,
    args: &'static [&'static str],
    current: Option<Child>,
}

impl CommandSpeaker {
    /// Finds the first known speech program on `PATH`.
    pub fn detect() -> Option<Self> {
        Self::detect_in(&env::var_os("PATH")?)
    }

    /// Searches a `PATH`-style list of directories, in [`PROGRAMS`] order.
    fn detect_in(path: &OsStr) -> Option<Self> {
        PROGRAMS.iter().find_map(|&(name, args)| {
            env::split_paths(path)
                .map(|dir| dir.join(name))
                .find(|candidate| candidate.is_file())
                .map(|program| Self {
                    program,
                    args,
                    current: None,
                })
        })
    }

    pub fn program(&self) -> &std::path::Path {
        &self.program
    }
}

impl Speaker for CommandSpeaker {
    fn speak(&mut self, text: &str) {
        self.cancel();
        match Command::new(&self.program)
            .args(self.args)
            .arg(text)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
        {
            Ok(child) => self.current = Some(child),
            Err(e) => tracing::warn!("speech program {} failed: {e}", self.program.display()),
        }
    }

    fn cancel(&mut self) {
        if let Some(mut child) = self.current.take() {
            // Already-exited children make kill() fail; reap either way.
            let _ = child.kill();
            let _ = child.wait();
        }
    }
}

impl Drop for CommandSpeaker {
    fn drop(&mut self) {
        self.cancel();
    }
}

/// Picks the speaker for the current settings.
pub fn speaker_for(voice_enabled: bool) -> Box<dyn Speaker> {
    speaker_in(voice_enabled, env::var_os("PATH").as_deref())
}

fn speaker_in(voice_enabled: bool, path: Option<&OsStr>) -> Box<dyn Speaker> {
    if !voice_enabled {
        return Box::new(SilentSpeaker);
    }
    match path.and_then(CommandSpeaker::detect_in) {
        Some(speaker) => {
            tracing::info!("voice prompts via {}", speaker.program().display());
            Box::new(speaker)
        }
        None => {
            tracing::warn!("no speech program found (tried spd-say, espeak-ng, espeak, say); voice prompts disabled");
            Box::new(SilentSpeaker)
        }
    }
}

#[cfg(test)]
pub mod testing {
    use super::Speaker;
    use std::{cell::RefCell, rc::Rc};

    /// Records what would have been spoken.
    #[derive(Clone, Default)]
    pub struct RecordingSpeaker {
        pub log: Rc<RefCell<Vec<String>>>,
    }

    impl Speaker for RecordingSpeaker {
        fn speak(&mut self, text: &str) {
            self.log.borrow_mut().push(text.to_string());
        }

        fn cancel(&mut self) {
            self.log.borrow_mut().push("<cancel>".into());
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn touch(dir: &TempDir, name: &str) -> PathBuf {
        let path = dir.path().join(name);
        std::fs::write(&path, "").unwrap();
        path
    }

    #[test]
    fn nothing_is_found_in_an_empty_path() {
        let dir = TempDir::new().unwrap();
        assert!(CommandSpeaker::detect_in(dir.path().as_os_str()).is_none());
        assert!(CommandSpeaker::detect_in(OsStr::new("")).is_none());
    }

    #[test]
    fn detection_prefers_programs_in_table_order() {
        let first = TempDir::new().unwrap();
        let second = TempDir::new().unwrap();
        touch(&first, "espeak");
        let spd = touch(&second, "spd-say");
        let path = env::join_paths([first.path(), second.path()]).unwrap();

        let speaker = CommandSpeaker::detect_in(&path).unwrap();
        assert_eq!(speaker.program(), spd);
        assert_eq!(speaker.args, &["-r", "20", "-p", "10", "-w"]);
    }

    #[test]
    fn directories_named_like_programs_are_skipped() {
        let dir = TempDir::new().unwrap();
        std::fs::create_dir(dir.path().join("spd-say")).unwrap();
        let espeak = touch(&dir, "espeak");

        let speaker = CommandSpeaker::detect_in(dir.path().as_os_str()).unwrap();
        assert_eq!(speaker.program(), espeak);
    }

    #[cfg(unix)]
    #[test]
    fn speaking_again_kills_the_previous_utterance() {
        let mut speaker = CommandSpeaker {
            program: "sleep".into(),
            args: &[],
            current: None,
        };

        speaker.speak("5");
        let first = speaker.current.as_ref().map(Child::id).unwrap();
        speaker.speak("5");
        let second = speaker.current.as_ref().map(Child::id).unwrap();
        assert_ne!(first, second);
        #[cfg(target_os = "linux")]
        assert!(!std::path::Path::new(&format!("/proc/{first}")).exists());

        speaker.cancel();
        assert!(speaker.current.is_none());
        #[cfg(target_os = "linux")]
        assert!(!std::path::Path::new(&format!("/proc/{second}")).exists());
    }

    #[test]
    fn failed_spawn_leaves_nothing_running() {
        let dir = TempDir::new().unwrap();
        let mut speaker = CommandSpeaker {
            program: dir.path().join("missing"),
            args: &[],
            current: None,
        };
        speaker.speak("Hold");
        assert!(speaker.current.is_none());
    }

    /// Installs a fake `espeak` that writes its arguments next to itself.
    #[cfg(unix)]
    fn fake_espeak(dir: &TempDir) -> PathBuf {
        use std::os::unix::fs::PermissionsExt;
        let script = touch(dir, "espeak");
        std::fs::write(&script, "#!/bin/sh\necho \"$@\" > \"$0.out\"\n").unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        dir.path().join("espeak.out")
    }

    fn wait_for(path: &std::path::Path) -> Option<String> {
        for _ in 0..100 {
            match std::fs::read_to_string(path) {
                Ok(text) if !text.is_empty() => return Some(text),
                _ => std::thread::sleep(std::time::Duration::from_millis(20)),
            }
        }
        None
    }

    #[cfg(unix)]
    #[test]
    fn enabled_voice_runs_the_detected_program() {
        let dir = TempDir::new().unwrap();
        let out = fake_espeak(&dir);

        let mut speaker = speaker_in(true, Some(dir.path().as_os_str()));
        speaker.speak("Breathe In");
        assert_eq!(wait_for(&out).as_deref(), Some("-s 210 -p 55 Breathe In\n"));
    }

    #[cfg(unix)]
    #[test]
    fn disabled_voice_never_runs_a_program() {
        let dir = TempDir::new().unwrap();
        let out = fake_espeak(&dir);

        let mut speaker = speaker_in(false, Some(dir.path().as_os_str()));
        speaker.speak("Breathe In");
        speaker.cancel();
        std::thread::sleep(std::time::Duration::from_millis(200));
        assert!(!out.exists());
    }
}
