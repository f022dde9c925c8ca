use ratatui::layout::{Constraint, Direction, Layout, Rect};
use ratatui::style::{Color, Modifier, Style};
use ratatui::text::{Line, Text};
use ratatui::widgets::{Block, Borders, Gauge, List, ListItem, Paragraph, Wrap};

use crate::app::{App, Focus};
use crate::domain::state::{format_clock, PlaybackState};

pub fn render(frame: &mut ratatui::Frame<'_>, app: &App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(6),
            Constraint::Length(3),
            Constraint::Length(2),
        ])
        .split(frame.area());

    let header = Paragraph::new(format!(
        "playdeck | Focus: {} | Tab switch focus | / open command | Ctrl+P palette",
        app.focus.label()
    ))
    .style(
        Style::default()
            .fg(Color::Cyan)
            .add_modifier(Modifier::BOLD),
    )
    .block(Block::default().borders(Borders::ALL).title("Session"));
    frame.render_widget(header, chunks[0]);

    let state = app.playback_state().unwrap_or_default();
    render_gauges(frame, &state, chunks[1], chunks[2]);

    let body = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(chunks[3]);

    let details = Paragraph::new(Text::from(detail_lines(app, &state)))
        .block(Block::default().borders(Borders::ALL).title("Playback"))
        .wrap(Wrap { trim: true });
    frame.render_widget(details, body[0]);

    let palette_items: Vec<ListItem<'_>> = app
        .palette_preview(body[1].height.saturating_sub(2) as usize)
        .into_iter()
        .enumerate()
        .map(|(idx, item)| {
            let mut style = Style::default();
            if app.focus == Focus::Palette && idx == app.palette_selected_index() {
                style = style.bg(Color::Blue).fg(Color::White);
            }
            ListItem::new(Line::from(format!("{}  {}", item.label, item.command))).style(style)
        })
        .collect();
    let palette =
        List::new(palette_items).block(Block::default().borders(Borders::ALL).title("Commands"));
    frame.render_widget(palette, body[1]);

    let input_title = match app.focus {
        Focus::Transport => "Transport (space play/pause, arrows skip/volume, m mute, f fullscreen)",
        Focus::Slash => "Slash Command",
        Focus::Palette => "Command Palette",
    };
    let input = Paragraph::new(Text::from(app.current_input()))
        .block(Block::default().borders(Borders::ALL).title(input_title));
    frame.render_widget(input, chunks[4]);

    let status = Paragraph::new(app.status_message.clone())
        .style(Style::default().fg(Color::Yellow))
        .wrap(Wrap { trim: true });
    frame.render_widget(status, chunks[5]);
}

fn render_gauges(
    frame: &mut ratatui::Frame<'_>,
    state: &PlaybackState,
    progress_area: Rect,
    buffer_area: Rect,
) {
    let duration_label = state
        .duration
        .map(format_clock)
        .unwrap_or_else(|| "--:--".to_string());

    let progress = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Progress"))
        .gauge_style(Style::default().fg(Color::Green))
        .ratio(state.progress_percent() / 100.0)
        .label(format!(
            "{} / {}",
            format_clock(state.current_time),
            duration_label
        ));
    frame.render_widget(progress, progress_area);

    let buffered = Gauge::default()
        .block(Block::default().borders(Borders::ALL).title("Buffered"))
        .gauge_style(Style::default().fg(Color::DarkGray))
        .ratio(state.buffered_percent() / 100.0)
        .label(format!("{:.0}%", state.buffered_percent()));
    frame.render_widget(buffered, buffer_area);
}

fn detail_lines(app: &App, state: &PlaybackState) -> Vec<Line<'static>> {
    if app.playback_state().is_none() {
        return vec![Line::from("No media attached")];
    }

    let volume = if state.is_muted {
        format!("{:.0}% (muted)", state.volume * 100.0)
    } else {
        format!("{:.0}%", state.volume * 100.0)
    };
    vec![
        Line::from(format!("State: {}", state.phase.label())),
        Line::from(format!(
            "Position: {} ({:.1}%)",
            format_clock(state.current_time),
            state.progress_percent()
        )),
        Line::from(format!(
            "Duration: {}",
            state
                .duration
                .map(format_clock)
                .unwrap_or_else(|| "loading metadata".to_string())
        )),
        Line::from(format!("Volume: {volume}")),
        Line::from(format!("Speed: {}x", state.playback_rate)),
        Line::from(format!(
            "Fullscreen: {}",
            if state.is_fullscreen { "on" } else { "off" }
        )),
    ]
}
