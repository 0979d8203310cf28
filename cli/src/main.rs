use anyhow::{anyhow, Context, Result};
use crossterm::{
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::{backend::CrosstermBackend, Terminal};
use std::{
    collections::HashSet,
    fs::{self, OpenOptions},
    io,
    sync::Arc,
    time::Duration,
};
use tokio::{
    sync::{
        mpsc::{unbounded_channel, UnboundedReceiver, UnboundedSender},
        Mutex,
    },
    task::JoinHandle,
    time::{interval_at, sleep, Instant, MissedTickBehavior},
};
use tracing::{debug, error, info};

mod analyser;
mod app;
mod config;
mod library;
mod media;
mod playback;
mod session;
mod types;
mod ui;
mod visualizer;

use app::{AppCommand, AppEvent, AppState, TerminalClipboard};
use config::AppConfig;
use playback::{Player, RodioBackend};

const TICK_INTERVAL: Duration = Duration::from_secs(1);

#[tokio::main]
async fn main() -> Result<()> {
    let config = AppConfig::load()?;
    setup_tracing(&config)?;
    info!("starting synthlab");

    let client = media::Client::new()?;

    let (event_tx, mut event_rx) = unbounded_channel();
    let (command_tx, command_rx) = unbounded_channel();

    let controller = Controller::new(client, event_tx, config.clone());
    let controller_task = controller.spawn(command_rx);

    let player = Player::new(Box::new(RodioBackend::new(config.media_dir().clone())));
    let mut app_state = AppState::new(config.clone(), player, Box::new(TerminalClipboard));
    let _ = command_tx
        .send(AppCommand::CacheMedia { source: config.demo_media_url().to_string() });

    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen)?;
    enable_raw_mode()?;

    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;
    terminal.clear()?;
    terminal.hide_cursor()?;

    let ui_result = ui::run(
        &mut terminal,
        &mut app_state,
        &mut event_rx,
        command_tx.clone(),
        config.frame_interval(),
    );

    app_state.stop_playback();
    let _ = command_tx.send(AppCommand::Shutdown);
    if let Err(err) = controller_task.await {
        error!("controller task ended abnormally: {err}");
    }

    terminal.show_cursor()?;
    disable_raw_mode()?;
    execute!(terminal.backend_mut(), LeaveAlternateScreen)?;

    info!("synthlab exited");
    ui_result
}

fn setup_tracing(config: &AppConfig) -> Result<()> {
    let log_path = config.log_path();
    if let Some(parent) = log_path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("failed to create log directory {}", parent.display()))?;
    }
    let log_file = OpenOptions::new()
        .create(true)
        .append(true)
        .open(&log_path)
        .with_context(|| format!("failed to open log file {}", log_path.display()))?;

    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::sync::Mutex::new(log_file))
        .with_ansi(false)
        .with_target(false)
        .compact()
        .try_init()
        .map_err(|err: Box<dyn std::error::Error + Send + Sync>| {
            anyhow!("failed to initialise tracing: {err}")
        })?;
    Ok(())
}

/// The running generation timers; aborted when dropped.
struct GenerationTimer {
    handle: JoinHandle<()>,
}

impl Drop for GenerationTimer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}

/// Ticks once per second until `delay` elapses, then reports completion.
fn spawn_generation_timer(delay: Duration, event_tx: UnboundedSender<AppEvent>) -> GenerationTimer {
    let handle = tokio::spawn(async move {
        let mut ticker = interval_at(Instant::now() + TICK_INTERVAL, TICK_INTERVAL);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        let completion = sleep(delay);
        tokio::pin!(completion);
        loop {
            tokio::select! {
                biased;
                _ = &mut completion => {
                    let _ = event_tx.send(AppEvent::GenerationFinished);
                    break;
                }
                _ = ticker.tick() => {
                    let _ = event_tx.send(AppEvent::GenerationTick);
                }
            }
        }
    });
    GenerationTimer { handle }
}

struct Controller {
    inner: Arc<ControllerInner>,
}

struct ControllerInner {
    client: media::Client,
    event_tx: UnboundedSender<AppEvent>,
    config: AppConfig,
    generation: Mutex<Option<GenerationTimer>>,
    caching: Mutex<HashSet<String>>,
}

impl Controller {
    fn new(client: media::Client, event_tx: UnboundedSender<AppEvent>, config: AppConfig) -> Self {
        let inner = ControllerInner {
            client,
            event_tx,
            config,
            generation: Mutex::new(None),
            caching: Mutex::new(HashSet::new()),
        };
        Self { inner: Arc::new(inner) }
    }

    fn spawn(self, mut command_rx: UnboundedReceiver<AppCommand>) -> JoinHandle<()> {
        let inner = self.inner.clone();
        tokio::spawn(async move {
            while let Some(command) = command_rx.recv().await {
                if matches!(command, AppCommand::Shutdown) {
                    Controller::teardown(&inner).await;
                    break;
                }
                if let Err(err) = Controller::handle_command(inner.clone(), command).await {
                    error!("command error: {err:#}");
                    let _ = inner.event_tx.send(AppEvent::Error(format!("{err}")));
                }
            }
        })
    }

    async fn handle_command(inner: Arc<ControllerInner>, command: AppCommand) -> Result<()> {
        match command {
            AppCommand::StartGeneration { delay } => {
                Controller::start_generation(inner, delay).await;
            }
            AppCommand::CacheMedia { source } => {
                Controller::spawn_cache_task(inner, source).await;
            }
            AppCommand::DownloadTrack { track } => {
                Controller::spawn_download_task(inner, track);
            }
            AppCommand::Shutdown => Controller::teardown(&inner).await,
        }
        Ok(())
    }

    async fn start_generation(inner: Arc<ControllerInner>, delay: Duration) {
        let timer = spawn_generation_timer(delay, inner.event_tx.clone());
        let mut guard = inner.generation.lock().await;
        if guard.replace(timer).is_some() {
            info!("replaced a generation timer that was still running");
        }
        info!("generation timer armed for {} ms", delay.as_millis());
    }

    /// At most one cache download runs per source.
    async fn spawn_cache_task(inner: Arc<ControllerInner>, source: String) {
        if !inner.caching.lock().await.insert(source.clone()) {
            debug!("{source} is already being cached");
            return;
        }
        tokio::spawn(async move {
            let result =
                media::ensure_cached(&inner.client, inner.config.media_dir(), &source).await;
            inner.caching.lock().await.remove(&source);
            match result {
                Ok(path) => {
                    let _ = inner.event_tx.send(AppEvent::MediaCached { source, path });
                }
                Err(err) => {
                    error!("failed to cache {source}: {err:#}");
                    let _ = inner
                        .event_tx
                        .send(AppEvent::Error(format!("Media unavailable for playback: {err}")));
                }
            }
        });
    }

    fn spawn_download_task(inner: Arc<ControllerInner>, track: types::Track) {
        tokio::spawn(async move {
            let track_id = track.id.clone();
            let result = media::download_track(
                &inner.client,
                inner.config.media_dir(),
                inner.config.download_dir(),
                track,
            )
            .await;
            match result {
                Ok(path) => {
                    let _ = inner.event_tx.send(AppEvent::TrackDownloaded { track_id, path });
                }
                Err(err) => {
                    error!("download of {track_id} failed: {err:#}");
                    let _ = inner.event_tx.send(AppEvent::Error(format!("Download failed: {err}")));
                }
            }
        });
    }

    async fn teardown(inner: &ControllerInner) {
        if inner.generation.lock().await.take().is_some() {
            info!("cancelled pending generation timer");
        }
    }
}
