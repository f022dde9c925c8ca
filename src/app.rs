use std::fs::File;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use anyhow::{anyhow, Context, Result};
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::controller::{Outcome, PlaybackController};
use crate::domain::commands::SlashCommand;
use crate::domain::palette::{fuzzy_filter, playback_palette, PaletteItem};
use crate::domain::state::{format_clock, PlaybackState};
use crate::integrations::media_resource::MediaResource;
use crate::integrations::simulated::{SimulatedMedia, SimulatedResource};
use crate::integrations::vlc_http::{VlcHttpClient, VlcHttpResource};
use crate::storage::config::{Backend, PlaybackConfig, RuntimeConfig};
use crate::ui::Tui;

const HELP_TEXT: &str = "Keys: space play/pause, \u{2190}/\u{2192} skip, \u{2191}/\u{2193} volume, m mute, f fullscreen, r restart, [ ] speed, 0-9 seek. Commands: /play /pause /toggle /seek /skip /volume /mute /rate /restart /fullscreen /quit";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Focus {
    Transport,
    Slash,
    Palette,
}

impl Focus {
    pub fn label(self) -> &'static str {
        match self {
            Self::Transport => "Transport",
            Self::Slash => "Slash",
            Self::Palette => "Palette",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AppSettings {
    pub initial_volume: f64,
    pub skip_seconds: f64,
    pub volume_step: f64,
}

impl Default for AppSettings {
    fn default() -> Self {
        Self::from(&PlaybackConfig::default())
    }
}

impl From<&PlaybackConfig> for AppSettings {
    fn from(config: &PlaybackConfig) -> Self {
        Self {
            initial_volume: config.initial_volume,
            skip_seconds: config.skip_seconds,
            volume_step: config.volume_step,
        }
    }
}

pub struct App {
    pub running: bool,
    pub status_message: String,
    pub focus: Focus,
    pub slash_input: String,
    pub palette_input: String,
    focus_before_palette: Focus,
    palette_selected_index: usize,
    palette_items: Vec<PaletteItem>,
    settings: AppSettings,
    controller: PlaybackController<Box<dyn MediaResource>>,
}

impl App {
    pub fn new(resource: Box<dyn MediaResource>, settings: AppSettings) -> Self {
        let mut controller = PlaybackController::new();
        controller.attach(resource);
        controller.set_volume(settings.initial_volume);

        Self {
            running: true,
            status_message: "Ready".to_string(),
            focus: Focus::Transport,
            slash_input: String::new(),
            palette_input: String::new(),
            focus_before_palette: Focus::Transport,
            palette_selected_index: 0,
            palette_items: playback_palette(),
            settings,
            controller,
        }
    }

    pub fn playback_state(&self) -> Option<PlaybackState> {
        self.controller.state()
    }

    pub fn current_input(&self) -> String {
        match self.focus {
            Focus::Transport => String::new(),
            Focus::Slash => self.slash_input.clone(),
            Focus::Palette => self.palette_input.clone(),
        }
    }

    pub fn palette_selected_index(&self) -> usize {
        self.palette_selected_index
    }

    pub fn palette_preview(&self, limit: usize) -> Vec<PaletteItem> {
        let mut results = self.palette_results();
        results.truncate(limit);
        results
    }

    pub fn tick(&mut self, elapsed: Duration) {
        if let Some(resource) = self.controller.resource_mut() {
            resource.tick(elapsed);
        }
        self.controller.pump_events();
        for diagnostic in self.controller.take_diagnostics() {
            self.status_message = format!(
                "Playback {} failed: {}",
                diagnostic.operation.label(),
                diagnostic.message
            );
        }
    }

    pub fn toggle_focus(&mut self) {
        let next_focus = match self.focus {
            Focus::Transport => Focus::Slash,
            Focus::Slash => Focus::Palette,
            Focus::Palette => Focus::Transport,
        };
        self.set_focus(next_focus);
    }

    pub fn toggle_palette(&mut self) {
        if self.focus == Focus::Palette {
            self.focus = self.focus_before_palette;
            self.status_message = format!("Focus: {}", self.focus.label());
        } else {
            self.focus_before_palette = self.focus;
            self.focus = Focus::Palette;
            self.palette_selected_index = 0;
            self.status_message = "Focus: Palette".to_string();
        }
    }

    pub fn open_slash_input(&mut self) {
        if self.focus == Focus::Slash {
            self.slash_input.push('/');
            return;
        }
        self.focus = Focus::Slash;
        if self.slash_input.is_empty() {
            self.slash_input.push('/');
        }
    }

    pub fn close_overlays(&mut self) {
        match self.focus {
            Focus::Palette => {
                self.focus = self.focus_before_palette;
                self.palette_input.clear();
                self.palette_selected_index = 0;
            }
            Focus::Slash => {
                self.slash_input.clear();
                self.focus = Focus::Transport;
            }
            Focus::Transport => return,
        }
        self.status_message = format!("Focus: {}", self.focus.label());
    }

    pub fn push_char(&mut self, c: char) {
        match self.focus {
            Focus::Transport => {}
            Focus::Slash => self.slash_input.push(c),
            Focus::Palette => {
                self.palette_input.push(c);
                self.palette_selected_index = 0;
            }
        }
    }

    pub fn backspace_input(&mut self) {
        match self.focus {
            Focus::Transport => {}
            Focus::Slash => {
                self.slash_input.pop();
            }
            Focus::Palette => {
                self.palette_input.pop();
                self.palette_selected_index = 0;
            }
        }
    }

    pub fn submit_current_input(&mut self) -> Result<()> {
        match self.focus {
            Focus::Transport => {
                self.execute_command(SlashCommand::Toggle);
                Ok(())
            }
            Focus::Slash => {
                let input = std::mem::take(&mut self.slash_input);
                self.focus = Focus::Transport;
                let command = SlashCommand::parse(&input)?;
                self.execute_command(command);
                Ok(())
            }
            Focus::Palette => {
                let selected = self
                    .palette_results()
                    .get(self.palette_selected_index)
                    .cloned()
                    .ok_or_else(|| anyhow!("no command matched palette input"))?;
                self.focus = self.focus_before_palette;
                self.palette_input.clear();
                self.palette_selected_index = 0;
                let command = SlashCommand::parse(&selected.command)
                    .with_context(|| format!("palette entry '{}'", selected.label))?;
                self.execute_command(command);
                Ok(())
            }
        }
    }

    pub fn select_next(&mut self) {
        let len = self.palette_results().len();
        if self.focus != Focus::Palette || len == 0 {
            return;
        }
        self.palette_selected_index = (self.palette_selected_index + 1) % len;
    }

    pub fn select_previous(&mut self) {
        let len = self.palette_results().len();
        if self.focus != Focus::Palette || len == 0 {
            return;
        }
        if self.palette_selected_index == 0 {
            self.palette_selected_index = len - 1;
        } else {
            self.palette_selected_index -= 1;
        }
    }

    pub fn toggle_play_pause(&mut self) {
        self.execute_command(SlashCommand::Toggle);
    }

    pub fn skip_forward(&mut self) {
        self.execute_command(SlashCommand::Skip(self.settings.skip_seconds));
    }

    pub fn skip_backward(&mut self) {
        self.execute_command(SlashCommand::Skip(-self.settings.skip_seconds));
    }

    pub fn volume_up(&mut self) {
        let outcome = self.controller.step_volume(self.settings.volume_step);
        self.report_volume("Volume up", outcome);
    }

    pub fn volume_down(&mut self) {
        let outcome = self.controller.step_volume(-self.settings.volume_step);
        self.report_volume("Volume down", outcome);
    }

    pub fn faster(&mut self) {
        let outcome = self.controller.step_rate(true);
        self.report_rate(outcome);
    }

    pub fn slower(&mut self) {
        let outcome = self.controller.step_rate(false);
        self.report_rate(outcome);
    }

    pub fn seek_to_decile(&mut self, digit: u32) {
        self.execute_command(SlashCommand::Seek(f64::from(digit.min(9)) * 10.0));
    }

    pub fn request_quit(&mut self) {
        self.execute_command(SlashCommand::Quit);
    }

    pub fn shutdown_playback(&mut self) {
        if self.controller.detach().is_some() {
            info!("playback shut down");
        }
    }

    pub fn execute_command(&mut self, command: SlashCommand) {
        match command {
            SlashCommand::Play => {
                let outcome = self.controller.play();
                self.report("Play", outcome, "Playing".to_string());
            }
            SlashCommand::Pause => {
                let outcome = self.controller.pause();
                self.report("Pause", outcome, "Paused".to_string());
            }
            SlashCommand::Toggle => {
                let outcome = self.controller.toggle_play_pause();
                let message = match self.playback_state() {
                    Some(state) if state.is_playing() => "Playing",
                    _ => "Paused",
                };
                self.report("Play/pause", outcome, message.to_string());
            }
            SlashCommand::Seek(percent) => {
                let outcome = self.controller.seek(percent);
                let message = format!("Seeked to {}", self.clock_label());
                self.report("Seek", outcome, message);
            }
            SlashCommand::Skip(seconds) => {
                let outcome = self.controller.skip(seconds);
                let message = format!("Skipped {seconds:+}s to {}", self.clock_label());
                self.report("Skip", outcome, message);
            }
            SlashCommand::Volume(level) => {
                let outcome = self.controller.set_volume(level);
                self.report_volume("Volume", outcome);
            }
            SlashCommand::Mute => {
                let outcome = self.controller.toggle_mute();
                let message = match self.playback_state() {
                    Some(state) if state.is_muted => "Muted",
                    _ => "Unmuted",
                };
                self.report("Mute", outcome, message.to_string());
            }
            SlashCommand::Rate(rate) => {
                let outcome = self.controller.set_playback_rate(rate);
                self.report_rate(outcome);
            }
            SlashCommand::Restart => {
                let outcome = self.controller.restart();
                self.report("Restart", outcome, "Restarted from the beginning".to_string());
            }
            SlashCommand::Fullscreen => {
                let outcome = self.controller.toggle_fullscreen();
                let message = match self.playback_state() {
                    Some(state) if state.is_fullscreen => "Entering fullscreen",
                    _ => "Leaving fullscreen",
                };
                self.report("Fullscreen", outcome, message.to_string());
            }
            SlashCommand::Help => {
                self.status_message = HELP_TEXT.to_string();
            }
            SlashCommand::Quit => {
                self.shutdown_playback();
                self.running = false;
                self.status_message = "Bye".to_string();
            }
        }
    }

    fn report(&mut self, action: &str, outcome: Outcome, applied_message: String) {
        self.status_message = match outcome {
            Outcome::Applied => applied_message,
            Outcome::Ignored(reason) => format!("{action} ignored: {}", reason.label()),
        };
    }

    fn report_volume(&mut self, action: &str, outcome: Outcome) {
        let message = match self.playback_state() {
            Some(state) if state.is_muted => {
                format!("Volume {:.0}% (muted)", state.volume * 100.0)
            }
            Some(state) => format!("Volume {:.0}%", state.volume * 100.0),
            None => String::new(),
        };
        self.report(action, outcome, message);
    }

    fn report_rate(&mut self, outcome: Outcome) {
        let message = match self.playback_state() {
            Some(state) => format!("Speed {}x", state.playback_rate),
            None => String::new(),
        };
        self.report("Speed", outcome, message);
    }

    fn clock_label(&self) -> String {
        match self.playback_state() {
            Some(state) => format_clock(state.current_time),
            None => format_clock(0.0),
        }
    }

    fn palette_results(&self) -> Vec<PaletteItem> {
        fuzzy_filter(&self.palette_items, &self.palette_input)
    }

    fn set_focus(&mut self, focus: Focus) {
        self.focus = focus;
        if self.focus != Focus::Palette {
            self.focus_before_palette = self.focus;
        }
        self.status_message = format!("Focus: {}", self.focus.label());
    }
}

#[derive(Debug, Clone, Default)]
pub struct RunOptions {
    pub debug: bool,
    pub config_path: Option<PathBuf>,
    pub backend: Option<Backend>,
    pub log_file: Option<PathBuf>,
}

pub fn run(options: RunOptions) -> Result<()> {
    init_tracing(options.debug, options.log_file.as_deref())?;

    let config = match options.config_path.as_deref() {
        Some(path) => RuntimeConfig::load_from_path(path),
        None => RuntimeConfig::load(),
    }
    .context("load runtime config")?;

    let backend = options.backend.unwrap_or(config.playback.backend);
    let resource = build_resource(backend, &config)
        .with_context(|| format!("start {} playback backend", backend.label()))?;
    info!(backend = backend.label(), "playback backend ready");

    let mut app = App::new(resource, AppSettings::from(&config.playback));
    let mut tui = Tui::new(Duration::from_millis(config.playback.tick_ms))?;

    if let Err(err) = tui.run(&mut app) {
        warn!(error = ?err, "tui exited with error");
        app.shutdown_playback();
        return Err(err);
    }

    app.shutdown_playback();
    Ok(())
}

pub fn build_resource(backend: Backend, config: &RuntimeConfig) -> Result<Box<dyn MediaResource>> {
    match backend {
        Backend::Simulated => {
            let simulated = &config.simulated;
            Ok(Box::new(SimulatedResource::new(SimulatedMedia {
                duration_secs: simulated.duration_secs,
                metadata_delay: Duration::from_millis(simulated.metadata_delay_ms),
                buffer_ahead_secs: simulated.buffer_ahead_secs,
                block_autoplay: simulated.block_autoplay,
                deny_fullscreen: simulated.deny_fullscreen,
            })))
        }
        Backend::VlcHttp => {
            let vlc = &config.vlc_http;
            let client = VlcHttpClient::new(
                vlc.base_url.clone(),
                vlc.password.clone(),
                Duration::from_millis(vlc.timeout_ms),
            )?;
            let resource =
                VlcHttpResource::connect(client, Duration::from_millis(vlc.poll_interval_ms))?;
            Ok(Box::new(resource))
        }
    }
}

fn init_tracing(debug: bool, log_file: Option<&Path>) -> Result<()> {
    let default_filter = match (debug, log_file.is_some()) {
        (true, _) => "playdeck=debug",
        (false, true) => "playdeck=info",
        // The terminal UI owns stdout; only warnings go to stderr.
        (false, false) => "playdeck=warn",
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| default_filter.into());

    match log_file {
        Some(path) => {
            let file = File::create(path)
                .with_context(|| format!("failed to create log file: {}", path.display()))?;
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_ansi(false)
                .with_writer(Mutex::new(file))
                .try_init();
        }
        None => {
            let _ = tracing_subscriber::fmt()
                .with_env_filter(filter)
                .with_writer(std::io::stderr)
                .try_init();
        }
    }
    Ok(())
}
