use playdeck::app::{App, AppSettings};
use playdeck::domain::commands::SlashCommand;
use playdeck::integrations::simulated::SimulatedResource;
use playdeck::ui::render::render;
use ratatui::backend::TestBackend;
use ratatui::Terminal;

fn screen_text(app: &App) -> String {
    let mut terminal = Terminal::new(TestBackend::new(100, 30)).expect("create test terminal");
    terminal
        .draw(|frame| render(frame, app))
        .expect("draw frame");
    terminal
        .backend()
        .buffer()
        .content
        .iter()
        .map(|cell| cell.symbol())
        .collect()
}

#[test]
fn progress_label_follows_seek_before_any_time_update() {
    let resource = Box::new(SimulatedResource::with_duration(120.0));
    let mut app = App::new(resource, AppSettings::default());

    app.seek_to_decile(5);

    let screen = screen_text(&app);
    assert!(screen.contains("1:00 / 2:00"), "screen was:\n{screen}");
}

#[test]
fn progress_label_returns_to_zero_on_restart() {
    let resource = Box::new(SimulatedResource::with_duration(120.0));
    let mut app = App::new(resource, AppSettings::default());
    app.seek_to_decile(9);

    app.execute_command(SlashCommand::Restart);

    let screen = screen_text(&app);
    assert!(screen.contains("0:00 / 2:00"), "screen was:\n{screen}");
}
