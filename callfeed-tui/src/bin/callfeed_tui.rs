use callfeed::wire::ServerMessage;
use callfeed_tui::{
    client::{ConnectionStatus, WebSocketClient, WebSocketConfig},
    state::AppState,
    widget::{render_feed_panel, render_status_bar, render_ticker},
};
use crossterm::{
    event::{self, DisableMouseCapture, EnableMouseCapture, Event, KeyCode},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use ratatui::{
    Frame, Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout},
};
use std::{io, time::Duration};
use tokio::sync::mpsc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Start WebSocket connection before taking over the terminal
    let (messages, statuses) = WebSocketClient::with_config(WebSocketConfig::from_env()).start();

    // Setup terminal
    enable_raw_mode()?;
    let mut stdout = io::stdout();
    execute!(stdout, EnterAlternateScreen, EnableMouseCapture)?;
    let backend = CrosstermBackend::new(stdout);
    let mut terminal = Terminal::new(backend)?;

    let res = run_app(&mut terminal, messages, statuses).await;

    // Restore terminal
    disable_raw_mode()?;
    execute!(
        terminal.backend_mut(),
        LeaveAlternateScreen,
        DisableMouseCapture
    )?;
    terminal.show_cursor()?;

    res?;
    Ok(())
}

async fn run_app<B: ratatui::backend::Backend>(
    terminal: &mut Terminal<B>,
    mut messages: mpsc::Receiver<ServerMessage>,
    mut statuses: mpsc::Receiver<ConnectionStatus>,
) -> io::Result<()> {
    let tick_rate = Duration::from_millis(250);
    let mut last_tick = std::time::Instant::now();
    let mut state = AppState::default();

    loop {
        while let Ok(status) = statuses.try_recv() {
            state.set_connection(status);
        }
        while let Ok(message) = messages.try_recv() {
            state.apply(message);
        }

        terminal.draw(|f| ui(f, &state))?;

        let timeout = tick_rate.saturating_sub(last_tick.elapsed());
        if event::poll(timeout)? {
            if let Event::Key(key) = event::read()? {
                if key.code == KeyCode::Char('q') || key.code == KeyCode::Esc {
                    return Ok(());
                }
            }
        }

        if last_tick.elapsed() >= tick_rate {
            last_tick = std::time::Instant::now();
        }
    }
}

fn ui(f: &mut Frame, state: &AppState) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(3),
            Constraint::Min(0),
        ])
        .split(f.area());

    render_status_bar(f, chunks[0], state);
    render_ticker(f, chunks[1], &state.ticker_view());
    render_feed_panel(f, chunks[2], &state.feed_view());
}
