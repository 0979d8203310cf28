use crate::{
    analyser::{Analyser, FrequencySource, FFT_SIZE},
    config::AppConfig,
    library::Library,
    playback::{PlayOutcome, Player},
    session::{GenerationSession, SubmitError},
    types::{
        GenerationRequest, GenerationStatus, Track, MAX_LYRICS_CHARS, MAX_TITLE_CHARS,
        STYLE_PRESETS, SURPRISE_PROMPTS,
    },
    visualizer::{FrameKind, Surface, Visualizer},
};
use base64::{engine::general_purpose::STANDARD, Engine as _};
use chrono::Utc;
use rand::Rng;
use std::{
    io::{self, Write},
    path::PathBuf,
    time::{Duration, Instant},
};
use tracing::{info, warn};

const MAX_NOTICES: usize = 8;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NoticeLevel {
    Info,
    Success,
    Error,
}

#[derive(Debug, Clone)]
pub struct Notice {
    pub level: NoticeLevel,
    pub message: String,
    pub expires_at: Instant,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Title,
    Style,
    Lyrics,
    Library,
}

impl Focus {
    pub fn next(self) -> Self {
        match self {
            Self::Title => Self::Style,
            Self::Style => Self::Lyrics,
            Self::Lyrics => Self::Library,
            Self::Library => Self::Title,
        }
    }

    pub fn previous(self) -> Self {
        match self {
            Self::Title => Self::Library,
            Self::Style => Self::Title,
            Self::Lyrics => Self::Style,
            Self::Library => Self::Lyrics,
        }
    }
}

/// Text typed into the composer, cleared once a generation lands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PromptDraft {
    pub title: String,
    pub style: String,
    pub lyrics: String,
}

impl PromptDraft {
    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.style.is_empty() && self.lyrics.is_empty()
    }

    pub fn to_request(&self) -> GenerationRequest {
        GenerationRequest::new(self.title.clone(), self.style.clone(), self.lyrics.clone())
    }

    pub fn clear(&mut self) {
        *self = Self::default();
    }
}

/// Copies text to the user's clipboard.
pub trait Clipboard {
    fn copy(&mut self, text: &str) -> io::Result<()>;
}

/// Clipboard writes through the OSC 52 terminal escape sequence.
pub struct TerminalClipboard;

impl Clipboard for TerminalClipboard {
    fn copy(&mut self, text: &str) -> io::Result<()> {
        let mut stdout = io::stdout();
        write!(stdout, "\x1b]52;c;{}\x07", STANDARD.encode(text))?;
        stdout.flush()
    }
}

struct SpectrumMount {
    track_id: String,
    visualizer: Visualizer,
    surface: Surface,
}

pub struct AppState {
    config: AppConfig,
    pub draft: PromptDraft,
    pub focus: Focus,
    pub style_cursor: usize,
    pub selected_track: usize,
    session: GenerationSession,
    library: Library,
    player: Player,
    clipboard: Box<dyn Clipboard>,
    spectrum: Option<SpectrumMount>,
    notices: Vec<Notice>,
    should_quit: bool,
}

impl AppState {
    pub fn new(config: AppConfig, player: Player, clipboard: Box<dyn Clipboard>) -> Self {
        Self {
            config,
            draft: PromptDraft::default(),
            focus: Focus::Title,
            style_cursor: 0,
            selected_track: 0,
            session: GenerationSession::new(),
            library: Library::new(),
            player,
            clipboard,
            spectrum: None,
            notices: Vec::new(),
            should_quit: false,
        }
    }

    pub fn session(&self) -> &GenerationSession {
        &self.session
    }

    pub fn library(&self) -> &Library {
        &self.library
    }

    pub fn currently_playing(&self) -> Option<&str> {
        self.player.current()
    }

    pub fn notices(&self) -> &[Notice] {
        &self.notices
    }

    /// A failed session no longer locks the composer.
    pub fn is_generating(&self) -> bool {
        self.session.is_active() && self.session.status() != GenerationStatus::Failed
    }

    pub fn can_create(&self) -> bool {
        !self.is_generating() && !self.draft.is_empty()
    }

    pub fn should_quit(&self) -> bool {
        self.should_quit
    }

    pub fn request_quit(&mut self) {
        self.should_quit = true;
    }

    pub fn selected(&self) -> Option<&Track> {
        self.library.get_index(self.selected_track)
    }

    pub fn handle_event(&mut self, event: AppEvent) -> Option<AppCommand> {
        match event {
            AppEvent::Info(message) => {
                self.notify(NoticeLevel::Info, message);
                None
            }
            AppEvent::Error(message) => {
                self.notify(NoticeLevel::Error, message);
                None
            }
            AppEvent::GenerationTick => {
                self.session.tick();
                None
            }
            AppEvent::GenerationFinished => self.finish_generation(),
            AppEvent::MediaCached { source, path } => {
                info!("media for {source} ready at {}", path.display());
                None
            }
            AppEvent::TrackDownloaded { track_id, path } => {
                info!("track {track_id} saved to {}", path.display());
                self.notify(NoticeLevel::Success, format!("Saved to {}", path.display()));
                None
            }
        }
    }

    /// Submits the current draft. Returns the command that starts the
    /// generation timers when the session accepted it.
    pub fn submit(&mut self) -> Option<AppCommand> {
        if self.session.status() == GenerationStatus::Failed {
            if let Err(err) = self.session.acknowledge() {
                warn!("could not clear failed generation: {err}");
            }
        }
        match self.session.submit(self.draft.to_request()) {
            Ok(prompt) => {
                info!("generation started: {prompt}");
                self.notify(
                    NoticeLevel::Info,
                    "AI music generation has no backend configured. This is a demo.",
                );
                Some(AppCommand::StartGeneration { delay: self.config.generation_delay() })
            }
            Err(SubmitError::Busy) => None,
            Err(err @ SubmitError::EmptyPrompt) => {
                self.notify(NoticeLevel::Error, err.to_string());
                None
            }
        }
    }

    fn finish_generation(&mut self) -> Option<AppCommand> {
        let track = match self.session.complete(self.config.demo_media_url(), Utc::now()) {
            Ok(track) => track,
            Err(err) => {
                warn!("ignoring generation completion: {err}");
                return None;
            }
        };
        let source = track.file_url.clone();
        if let Err(duplicate) = self.library.prepend(track) {
            warn!("dropping track with duplicate id {}", duplicate.id);
            return None;
        }
        self.selected_track = 0;
        self.draft.clear();
        self.notify(NoticeLevel::Success, "Demo track created!");
        Some(AppCommand::CacheMedia { source })
    }

    /// Plays (or, when it is already playing, stops) a library track.
    pub fn toggle_playback(&mut self, track_id: &str) {
        let Some(track) = self.library.get(track_id) else {
            return;
        };
        let source = track.file_url.clone();
        match self.player.play(track_id, &source) {
            Ok(PlayOutcome::Started) | Ok(PlayOutcome::Stopped) => {}
            Err(err) => warn!("playback of {track_id} failed to start: {err}"),
        }
        self.sync_spectrum();
    }

    pub fn stop_playback(&mut self) {
        self.player.stop();
        self.sync_spectrum();
    }

    pub fn delete_track(&mut self, track_id: &str) {
        if self.player.is_playing(track_id) {
            self.stop_playback();
        }
        if self.library.remove(track_id).is_none() {
            return;
        }
        if self.selected_track >= self.library.len() {
            self.selected_track = self.library.len().saturating_sub(1);
        }
        self.notify(NoticeLevel::Success, "Track deleted");
    }

    pub fn toggle_favorite(&mut self, track_id: &str) {
        if self.library.toggle_favorite(track_id) == Some(true) {
            self.notify(NoticeLevel::Success, "Added to favorites!");
        }
    }

    pub fn share_track(&mut self, track_id: &str) {
        let Some(url) = self.library.get(track_id).map(|track| track.file_url.clone()) else {
            return;
        };
        match self.clipboard.copy(&url) {
            Ok(()) => self.notify(NoticeLevel::Success, "Link copied to clipboard!"),
            Err(err) => {
                warn!("clipboard write failed: {err}");
                self.notify(NoticeLevel::Error, "Failed to copy link");
            }
        }
    }

    pub fn download_track(&mut self, track_id: &str) -> Option<AppCommand> {
        let track = self.library.get(track_id)?.clone();
        self.notify(NoticeLevel::Info, format!("Downloading {}...", track.display_title()));
        Some(AppCommand::DownloadTrack { track })
    }

    pub fn surprise_me<R: Rng>(&mut self, rng: &mut R) {
        if self.is_generating() {
            return;
        }
        let pick = &SURPRISE_PROMPTS[rng.gen_range(0..SURPRISE_PROMPTS.len())];
        self.draft.title = pick.title.to_string();
        self.draft.style = pick.style.to_string();
        self.draft.lyrics = pick.lyrics.to_string();
        self.notify(NoticeLevel::Success, "Surprise prompt loaded!");
    }

    /// Selects the preset under the cursor, or clears it when already chosen.
    pub fn toggle_style_preset(&mut self) {
        if self.is_generating() {
            return;
        }
        let preset = STYLE_PRESETS[self.style_cursor % STYLE_PRESETS.len()];
        if self.draft.style == preset {
            self.draft.style.clear();
        } else {
            self.draft.style = preset.to_string();
        }
    }

    pub fn move_style_cursor(&mut self, forward: bool) {
        let len = STYLE_PRESETS.len();
        self.style_cursor =
            if forward { (self.style_cursor + 1) % len } else { (self.style_cursor + len - 1) % len };
    }

    pub fn type_char(&mut self, c: char) {
        if self.is_generating() {
            return;
        }
        let (field, limit) = match self.focus {
            Focus::Title => (&mut self.draft.title, MAX_TITLE_CHARS),
            Focus::Lyrics => (&mut self.draft.lyrics, MAX_LYRICS_CHARS),
            Focus::Style | Focus::Library => return,
        };
        if field.chars().count() < limit {
            field.push(c);
        }
    }

    pub fn backspace(&mut self) {
        if self.is_generating() {
            return;
        }
        match self.focus {
            Focus::Title => {
                self.draft.title.pop();
            }
            Focus::Lyrics => {
                self.draft.lyrics.pop();
            }
            Focus::Style | Focus::Library => {}
        }
    }

    pub fn select_next_track(&mut self) {
        if !self.library.is_empty() {
            self.selected_track = (self.selected_track + 1) % self.library.len();
        }
    }

    pub fn select_previous_track(&mut self) {
        let len = self.library.len();
        if len > 0 {
            self.selected_track = if self.selected_track == 0 { len - 1 } else { self.selected_track - 1 };
        }
    }

    /// Per-frame housekeeping: clears finished playback and expired notices.
    pub fn on_frame(&mut self, now: Instant) {
        if let Some(track_id) = self.player.poll_finished() {
            info!("track {track_id} finished playing");
        }
        self.sync_spectrum();
        self.notices.retain(|notice| notice.expires_at > now);
    }

    /// Mounts a fresh visualizer for the playing track and unmounts it when
    /// playback stops or moves to another track.
    fn sync_spectrum(&mut self) {
        let playing = self.player.current();
        let mounted = self.spectrum.as_ref().map(|mount| mount.track_id.as_str());
        if playing == mounted {
            return;
        }
        self.spectrum = playing.map(|track_id| SpectrumMount {
            track_id: track_id.to_string(),
            visualizer: Visualizer::new(),
            surface: Surface::new(0, 0),
        });
    }

    pub fn is_spectrum_mounted(&self) -> bool {
        self.spectrum.is_some()
    }

    /// Advances the visualizer one frame at the given pixel size.
    pub fn draw_spectrum(
        &mut self,
        width: usize,
        height: usize,
        time_seconds: f64,
    ) -> Option<(&Surface, FrameKind)> {
        let playing = self.player.current().is_some();
        let tap = self.player.analysis_tap();
        let mount = self.spectrum.as_mut()?;
        mount.surface.resize(width, height);
        mount.visualizer.ensure_analyser(playing, || {
            let tap = tap?;
            match Analyser::new(tap, FFT_SIZE) {
                Ok(analyser) => Some(Box::new(analyser) as Box<dyn FrequencySource>),
                Err(err) => {
                    warn!("analyser unavailable: {err}");
                    None
                }
            }
        });
        let kind = mount.visualizer.draw_frame(&mut mount.surface, playing, time_seconds);
        Some((&mount.surface, kind))
    }

    pub fn notify(&mut self, level: NoticeLevel, message: impl Into<String>) {
        let expires_at = Instant::now() + self.config.notice_lifetime();
        self.notices.push(Notice { level, message: message.into(), expires_at });
        if self.notices.len() > MAX_NOTICES {
            let overflow = self.notices.len() - MAX_NOTICES;
            self.notices.drain(0..overflow);
        }
    }
}

#[derive(Debug, Clone)]
pub enum AppEvent {
    Info(String),
    Error(String),
    GenerationTick,
    GenerationFinished,
    MediaCached { source: String, path: PathBuf },
    TrackDownloaded { track_id: String, path: PathBuf },
}

#[derive(Debug, Clone)]
pub enum AppCommand {
    StartGeneration { delay: Duration },
    CacheMedia { source: String },
    DownloadTrack { track: Track },
    Shutdown,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analyser::AnalysisTap;
    use crate::playback::{PlaybackBackend, PlaybackError, PlaybackHandle};
    use rand::{rngs::StdRng, SeedableRng};
    use std::cell::{Cell, RefCell};
    use std::rc::Rc;

    struct SilentHandle {
        finished: Rc<RefCell<bool>>,
        tap: Option<AnalysisTap>,
    }

    impl PlaybackHandle for SilentHandle {
        fn stop(&mut self) {}

        fn is_finished(&self) -> bool {
            *self.finished.borrow()
        }

        fn analysis_tap(&self) -> Option<AnalysisTap> {
            self.tap.clone()
        }
    }

    struct SilentBackend {
        finished: Rc<RefCell<bool>>,
        with_tap: Rc<Cell<bool>>,
    }

    impl PlaybackBackend for SilentBackend {
        fn start(&mut self, source_url: &str) -> Result<Box<dyn PlaybackHandle>, PlaybackError> {
            if source_url.is_empty() {
                return Err(PlaybackError::NotCached(source_url.to_string()));
            }
            *self.finished.borrow_mut() = false;
            let tap = self.with_tap.get().then(|| AnalysisTap::new(FFT_SIZE));
            Ok(Box::new(SilentHandle { finished: self.finished.clone(), tap }))
        }
    }

    struct FlakyClipboard {
        fail: bool,
        copied: Rc<RefCell<Vec<String>>>,
    }

    impl Clipboard for FlakyClipboard {
        fn copy(&mut self, text: &str) -> io::Result<()> {
            if self.fail {
                return Err(io::Error::new(io::ErrorKind::Other, "no terminal"));
            }
            self.copied.borrow_mut().push(text.to_string());
            Ok(())
        }
    }

    struct Harness {
        app: AppState,
        finished: Rc<RefCell<bool>>,
        with_tap: Rc<Cell<bool>>,
        copied: Rc<RefCell<Vec<String>>>,
    }

    fn harness(with_tap: bool, clipboard_fails: bool) -> Harness {
        let finished = Rc::new(RefCell::new(false));
        let with_tap = Rc::new(Cell::new(with_tap));
        let copied = Rc::new(RefCell::new(Vec::new()));
        let backend = SilentBackend { finished: finished.clone(), with_tap: with_tap.clone() };
        let clipboard = FlakyClipboard { fail: clipboard_fails, copied: copied.clone() };
        let app =
            AppState::new(AppConfig::default(), Player::new(Box::new(backend)), Box::new(clipboard));
        Harness { app, finished, with_tap, copied }
    }

    fn app_with(with_tap: bool, clipboard_fails: bool) -> (AppState, Rc<RefCell<bool>>) {
        let Harness { app, finished, .. } = harness(with_tap, clipboard_fails);
        (app, finished)
    }

    fn app() -> AppState {
        app_with(false, false).0
    }

    fn generate(app: &mut AppState, title: &str) -> String {
        app.draft.title = title.to_string();
        app.submit().unwrap();
        app.handle_event(AppEvent::GenerationFinished);
        app.library().first().unwrap().id.clone()
    }

    #[test]
    fn neon_dreams_scenario() {
        let mut app = app();
        app.draft = PromptDraft {
            title: "Neon Dreams".into(),
            style: "Synthwave".into(),
            lyrics: "City lights".into(),
        };
        let command = app.submit();
        assert!(matches!(
            command,
            Some(AppCommand::StartGeneration { delay }) if delay == Duration::from_millis(3000)
        ));
        assert_eq!(app.session().status(), GenerationStatus::Starting);

        app.handle_event(AppEvent::GenerationTick);
        assert_eq!(app.session().elapsed_seconds(), 1);

        let follow_up = app.handle_event(AppEvent::GenerationFinished);
        assert!(matches!(follow_up, Some(AppCommand::CacheMedia { .. })));
        assert_eq!(app.session().status(), GenerationStatus::Idle);
        assert_eq!(app.library().len(), 1);
        assert_eq!(app.library().first().unwrap().title.as_deref(), Some("Neon Dreams"));
        assert!(app.draft.is_empty());
    }

    #[test]
    fn blank_submit_produces_validation_notice_only() {
        let mut app = app();
        assert!(app.submit().is_none());
        assert_eq!(app.session().status(), GenerationStatus::Idle);
        assert!(app.library().is_empty());
        let notice = app.notices().last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Please add a title, style, or lyrics");
    }

    #[test]
    fn second_submit_while_generating_is_silently_ignored() {
        let mut app = app();
        app.draft.title = "First".into();
        assert!(app.submit().is_some());
        let notices = app.notices().len();
        assert!(app.submit().is_none());
        assert_eq!(app.notices().len(), notices);
        assert!(!app.can_create());
    }

    #[test]
    fn completion_prepends_newest_track() {
        let mut app = app();
        let first = generate(&mut app, "One");
        let second = generate(&mut app, "Two");
        assert_ne!(first, second);
        assert_eq!(app.library().len(), 2);
        assert_eq!(app.library().first().unwrap().id, second);
    }

    #[test]
    fn stray_completion_without_session_is_ignored() {
        let mut app = app();
        assert!(app.handle_event(AppEvent::GenerationFinished).is_none());
        assert!(app.library().is_empty());
    }

    #[test]
    fn play_twice_toggles_and_mounts_visualizer_only_while_playing() {
        let mut app = app();
        let id = generate(&mut app, "Loop");
        app.toggle_playback(&id);
        assert_eq!(app.currently_playing(), Some(id.as_str()));
        assert!(app.is_spectrum_mounted());
        app.toggle_playback(&id);
        assert_eq!(app.currently_playing(), None);
        assert!(!app.is_spectrum_mounted());
    }

    #[test]
    fn switching_tracks_leaves_only_the_new_one_playing() {
        let mut app = app();
        let a = generate(&mut app, "A");
        let b = generate(&mut app, "B");
        app.toggle_playback(&a);
        app.toggle_playback(&b);
        assert_eq!(app.currently_playing(), Some(b.as_str()));
    }

    #[test]
    fn deleting_playing_track_stops_and_unfavorites() {
        let mut app = app();
        let id = generate(&mut app, "Doomed");
        app.toggle_favorite(&id);
        app.toggle_playback(&id);
        app.delete_track(&id);
        assert_eq!(app.currently_playing(), None);
        assert!(app.library().get(&id).is_none());
        assert!(!app.library().is_favorite(&id));
        assert!(!app.is_spectrum_mounted());
    }

    #[test]
    fn natural_end_unmounts_visualizer() {
        let (mut app, finished) = app_with(false, false);
        let id = generate(&mut app, "Short");
        app.toggle_playback(&id);
        *finished.borrow_mut() = true;
        app.on_frame(Instant::now());
        assert_eq!(app.currently_playing(), None);
        assert!(!app.is_spectrum_mounted());
    }

    #[test]
    fn visualizer_degrades_to_idle_without_tap() {
        let (mut app, _) = app_with(false, false);
        let id = generate(&mut app, "No tap");
        app.toggle_playback(&id);
        let (_, kind) = app.draw_spectrum(320, 32, 0.0).unwrap();
        assert_eq!(kind, FrameKind::Idle);
    }

    #[test]
    fn visualizer_uses_spectrum_when_tap_available() {
        let (mut app, _) = app_with(true, false);
        let id = generate(&mut app, "Tapped");
        app.toggle_playback(&id);
        let (surface, kind) = app.draw_spectrum(320, 32, 0.0).unwrap();
        assert_eq!(kind, FrameKind::Spectrum);
        assert_eq!(surface.width(), 320);
    }

    #[test]
    fn share_failure_surfaces_error_notice() {
        let (mut app, _) = app_with(false, true);
        let id = generate(&mut app, "Shared");
        app.share_track(&id);
        let notice = app.notices().last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Error);
        assert_eq!(notice.message, "Failed to copy link");
    }

    #[test]
    fn remount_retries_analyser_install() {
        let Harness { mut app, with_tap, .. } = harness(false, false);
        let a = generate(&mut app, "A");
        let b = generate(&mut app, "B");

        app.toggle_playback(&a);
        assert_eq!(app.draw_spectrum(320, 32, 0.0).unwrap().1, FrameKind::Idle);
        with_tap.set(true);
        assert_eq!(app.draw_spectrum(320, 32, 0.1).unwrap().1, FrameKind::Idle);

        app.toggle_playback(&b);
        assert_eq!(app.draw_spectrum(320, 32, 0.2).unwrap().1, FrameKind::Spectrum);

        app.toggle_playback(&b);
        with_tap.set(false);
        app.toggle_playback(&a);
        assert_eq!(app.draw_spectrum(320, 32, 0.3).unwrap().1, FrameKind::Idle);
    }

    #[test]
    fn share_copies_file_url() {
        let Harness { mut app, copied, .. } = harness(false, false);
        let id = generate(&mut app, "Shared");
        app.share_track(&id);

        let url = app.library().get(&id).unwrap().file_url.clone();
        assert_eq!(*copied.borrow(), [url]);
        let notice = app.notices().last().unwrap();
        assert_eq!(notice.level, NoticeLevel::Success);
        assert_eq!(notice.message, "Link copied to clipboard!");
    }

    #[test]
    fn inputs_are_frozen_while_generating() {
        let mut app = app();
        app.draft.title = "Busy".into();
        app.submit().unwrap();

        app.focus = Focus::Title;
        app.type_char('x');
        app.backspace();
        app.toggle_style_preset();
        app.focus = Focus::Lyrics;
        app.type_char('y');

        assert_eq!(
            app.draft,
            PromptDraft { title: "Busy".into(), style: String::new(), lyrics: String::new() }
        );
    }

    #[test]
    fn surprise_is_ignored_while_generating() {
        let mut app = app();
        app.draft.title = "Busy".into();
        app.submit().unwrap();
        let notices = app.notices().len();

        app.surprise_me(&mut StdRng::seed_from_u64(7));
        assert_eq!(app.draft.title, "Busy");
        assert!(app.draft.lyrics.is_empty());
        assert_eq!(app.notices().len(), notices);
    }

    #[test]
    fn failed_generation_unlocks_composer_and_resubmits() {
        let mut app = app();
        app.draft.title = "Doomed".into();
        app.submit().unwrap();
        app.session.fail("backend unavailable").unwrap();

        assert!(!app.is_generating());
        assert!(app.can_create());
        app.focus = Focus::Title;
        app.type_char('!');
        assert_eq!(app.draft.title, "Doomed!");

        assert!(matches!(app.submit(), Some(AppCommand::StartGeneration { .. })));
        assert_eq!(app.session().status(), GenerationStatus::Starting);
        assert_eq!(app.session().failure(), None);
    }

    #[test]
    fn surprise_fills_every_field() {
        let mut app = app();
        let mut rng = StdRng::seed_from_u64(7);
        app.surprise_me(&mut rng);
        assert!(SURPRISE_PROMPTS.iter().any(|prompt| prompt.title == app.draft.title
            && prompt.style == app.draft.style
            && prompt.lyrics == app.draft.lyrics));
    }

    #[test]
    fn style_preset_toggles_off_when_reselected() {
        let mut app = app();
        app.move_style_cursor(true);
        app.toggle_style_preset();
        assert_eq!(app.draft.style, "Synthwave");
        app.toggle_style_preset();
        assert!(app.draft.style.is_empty());
    }

    #[test]
    fn lyrics_input_stops_at_limit() {
        let mut app = app();
        app.focus = Focus::Lyrics;
        for _ in 0..(MAX_LYRICS_CHARS + 20) {
            app.type_char('a');
        }
        assert_eq!(app.draft.lyrics.chars().count(), MAX_LYRICS_CHARS);
    }

    #[test]
    fn notices_expire_and_are_capped() {
        let mut app = app();
        for index in 0..12 {
            app.notify(NoticeLevel::Info, format!("notice {index}"));
        }
        assert_eq!(app.notices().len(), MAX_NOTICES);
        assert_eq!(app.notices()[0].message, "notice 4");
        app.on_frame(Instant::now() + Duration::from_secs(60));
        assert!(app.notices().is_empty());
    }
}
