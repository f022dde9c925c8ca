pub mod render;

use std::io::{self, Stdout};
use std::time::{Duration, Instant};

use anyhow::Result;
use crossterm::event::{self, Event, KeyCode, KeyEvent, KeyEventKind, KeyModifiers};
use crossterm::terminal::{
    disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen,
};
use crossterm::ExecutableCommand;
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;

use crate::app::{App, Focus};
use crate::domain::commands::SlashCommand;

pub struct Tui {
    terminal: Terminal<CrosstermBackend<Stdout>>,
    tick: Duration,
}

impl Tui {
    pub fn new(tick: Duration) -> Result<Self> {
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        stdout.execute(EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let terminal = Terminal::new(backend)?;
        Ok(Self { terminal, tick })
    }

    pub fn run(&mut self, app: &mut App) -> Result<()> {
        let mut last_tick = Instant::now();
        while app.running {
            let now = Instant::now();
            app.tick(now.duration_since(last_tick));
            last_tick = now;

            self.terminal
                .draw(|frame| render::render(frame, app))
                .map_err(anyhow::Error::from)?;

            if event::poll(self.tick)? {
                if let Event::Key(key) = event::read()? {
                    if key.kind == KeyEventKind::Press {
                        self.handle_key_event(app, key);
                    }
                }
            }
        }

        Ok(())
    }

    fn handle_key_event(&mut self, app: &mut App, key: KeyEvent) {
        match (key.modifiers, key.code) {
            (KeyModifiers::CONTROL, KeyCode::Char('c')) => app.request_quit(),
            (KeyModifiers::CONTROL, KeyCode::Char('p')) => app.toggle_palette(),
            (_, KeyCode::Esc) => app.close_overlays(),
            (_, KeyCode::Tab) => app.toggle_focus(),
            (_, KeyCode::Enter) => {
                if let Err(err) = app.submit_current_input() {
                    app.status_message = format!("Error: {err:#}");
                }
            }
            _ => self.handle_focused_key(app, key.code),
        }
    }

    fn handle_focused_key(&mut self, app: &mut App, code: KeyCode) {
        if app.focus == Focus::Transport {
            match code {
                KeyCode::Char(' ') => app.toggle_play_pause(),
                KeyCode::Left => app.skip_backward(),
                KeyCode::Right => app.skip_forward(),
                KeyCode::Up => app.volume_up(),
                KeyCode::Down => app.volume_down(),
                KeyCode::Char('m') => app.execute_command(SlashCommand::Mute),
                KeyCode::Char('f') => app.execute_command(SlashCommand::Fullscreen),
                KeyCode::Char('r') => app.execute_command(SlashCommand::Restart),
                KeyCode::Char('[') => app.slower(),
                KeyCode::Char(']') => app.faster(),
                KeyCode::Char('/') => app.open_slash_input(),
                KeyCode::Char('q') => app.request_quit(),
                KeyCode::Char(c) => {
                    if let Some(digit) = c.to_digit(10) {
                        app.seek_to_decile(digit);
                    }
                }
                _ => {}
            }
            return;
        }

        match code {
            KeyCode::Backspace => app.backspace_input(),
            KeyCode::Up => app.select_previous(),
            KeyCode::Down => app.select_next(),
            KeyCode::Char(c) => app.push_char(c),
            _ => {}
        }
    }
}

impl Drop for Tui {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = self.terminal.backend_mut().execute(LeaveAlternateScreen);
    }
}
