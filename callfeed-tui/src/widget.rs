//! Ratatui widgets for the live calls panel and the top gainers ticker.

use crate::{client::ConnectionStatus, state::AppState};
use callfeed::presentation::{CallCard, FeedView, GainerTick};
use ratatui::{
    Frame,
    layout::{Alignment, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, BorderType, Borders, Paragraph, Wrap},
};

const C_GAIN: Color = Color::Rgb(100, 220, 100);
const C_LOSS: Color = Color::Rgb(220, 100, 100);
const C_BADGE: Color = Color::Rgb(255, 215, 0);
const C_DIM: Color = Color::Rgb(120, 120, 120);
const C_BRIGHT: Color = Color::Rgb(220, 220, 220);
const C_ACCENT: Color = Color::Rgb(100, 180, 220);

/// One-line status bar: connection, last update and help.
pub fn render_status_bar(f: &mut Frame, area: Rect, state: &AppState) {
    let (symbol, text, color) = match state.connection {
        ConnectionStatus::Connected => ("●", "CONNECTED", Color::Rgb(0, 255, 127)),
        ConnectionStatus::Reconnecting => ("◌", "CONNECTING", C_BADGE),
        ConnectionStatus::Disconnected => ("○", "DISCONNECTED", Color::Rgb(255, 69, 58)),
    };

    let updated = state
        .calls
        .updated_at
        .map(|time| time.format("%H:%M:%S").to_string())
        .unwrap_or_else(|| "--:--:--".to_string());

    let line = Line::from(vec![
        Span::styled(
            format!(" {symbol} {text} "),
            Style::default().fg(color).add_modifier(Modifier::BOLD),
        ),
        Span::styled(format!(" ⏱  {updated} "), Style::default().fg(C_ACCENT)),
        Span::styled(
            " ◆ LIVE CALLS ◆ ",
            Style::default().fg(C_BADGE).add_modifier(Modifier::BOLD),
        ),
        Span::styled(" [Q] Quit ", Style::default().fg(C_DIM)),
    ]);

    let block = Block::default()
        .borders(Borders::ALL)
        .border_type(BorderType::Double)
        .border_style(Style::default().fg(C_ACCENT));

    f.render_widget(
        Paragraph::new(line).block(block).alignment(Alignment::Center),
        area,
    );
}

/// Scrolling ticker of top gainers.
pub fn render_ticker(f: &mut Frame, area: Rect, view: &FeedView<Vec<GainerTick>>) {
    let block = Block::default()
        .title(" TOP GAINERS ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(C_ACCENT));

    let line = match view {
        FeedView::Ready(ticks) => ticker_line(ticks),
        other => placeholder_line(other, "No gainers yet"),
    };

    f.render_widget(Paragraph::new(line).block(block), area);
}

/// Live calls panel, newest first.
pub fn render_feed_panel(f: &mut Frame, area: Rect, view: &FeedView<Vec<CallCard>>) {
    let block = Block::default()
        .title(" LIVE CALLS ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(match view {
            FeedView::Unavailable(_) => C_LOSS,
            _ => C_ACCENT,
        }));

    let lines = match view {
        FeedView::Ready(cards) => {
            let mut lines = Vec::with_capacity(cards.len() * 3);
            for card in cards {
                lines.extend(card_lines(card));
                lines.push(Line::from(""));
            }
            lines
        }
        other => vec![placeholder_line(other, "No calls yet")],
    };

    f.render_widget(
        Paragraph::new(lines).block(block).wrap(Wrap { trim: false }),
        area,
    );
}

fn placeholder_line<T>(view: &FeedView<T>, empty: &'static str) -> Line<'static> {
    match view {
        FeedView::Loading => Line::from(Span::styled("Loading...", Style::default().fg(C_DIM))),
        FeedView::Unavailable(message) => Line::from(vec![
            Span::styled(
                "Unable to connect",
                Style::default().fg(C_LOSS).add_modifier(Modifier::BOLD),
            ),
            Span::styled(format!(" ({message})"), Style::default().fg(C_DIM)),
        ]),
        FeedView::Empty | FeedView::Ready(_) => {
            Line::from(Span::styled(empty, Style::default().fg(C_DIM)))
        }
    }
}

pub fn ticker_line(ticks: &[GainerTick]) -> Line<'static> {
    let mut spans = Vec::with_capacity(ticks.len() * 4);
    for tick in ticks {
        spans.push(Span::styled(
            tick.label.clone(),
            Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
        ));
        spans.push(Span::styled(format!(" {}", tick.gain), Style::default().fg(C_GAIN)));
        if let Some(badge) = &tick.badge {
            spans.push(Span::styled(format!(" {badge}"), Style::default().fg(C_BADGE)));
        }
        spans.push(Span::styled("  │  ", Style::default().fg(C_DIM)));
    }
    spans.pop();
    Line::from(spans)
}

pub fn card_lines(card: &CallCard) -> Vec<Line<'static>> {
    let mut header = vec![Span::styled(
        card.title.clone(),
        Style::default().fg(C_BRIGHT).add_modifier(Modifier::BOLD),
    )];
    if card.resolving {
        header.push(Span::styled(" (resolving)", Style::default().fg(C_DIM)));
    }
    header.push(Span::styled(
        format!("  {}", card.status_label),
        Style::default().fg(C_ACCENT),
    ));
    if card.shot_caller {
        header.push(Span::styled("  ★ SHOT CALLER", Style::default().fg(C_BADGE)));
    }
    for badge in [&card.ath_badge, &card.multiplier_badge].into_iter().flatten() {
        header.push(Span::styled(
            format!("  {badge}"),
            Style::default().fg(C_BADGE).add_modifier(Modifier::BOLD),
        ));
    }

    let change_color = match &card.market_cap_change {
        Some(change) if change.starts_with('-') => C_LOSS,
        Some(_) => C_GAIN,
        None => C_DIM,
    };
    let metrics = vec![
        Span::styled("MC ", Style::default().fg(C_DIM)),
        Span::styled(card.market_cap.clone(), Style::default().fg(C_BRIGHT)),
        Span::styled(
            card.market_cap_change
                .as_ref()
                .map(|change| format!(" {change}"))
                .unwrap_or_default(),
            Style::default().fg(change_color),
        ),
        Span::styled("  Entry ", Style::default().fg(C_DIM)),
        Span::styled(card.initial_market_cap.clone(), Style::default().fg(C_BRIGHT)),
        Span::styled("  ATH ", Style::default().fg(C_DIM)),
        Span::styled(card.ath_market_cap.clone(), Style::default().fg(C_BRIGHT)),
        Span::styled(
            card.ath_gain
                .as_ref()
                .map(|gain| format!(" {gain}"))
                .unwrap_or_default(),
            Style::default().fg(C_GAIN),
        ),
        Span::styled("  Vol ", Style::default().fg(C_DIM)),
        Span::styled(card.volume.clone(), Style::default().fg(C_BRIGHT)),
    ];

    let footer = vec![
        Span::styled(card.observed.clone(), Style::default().fg(C_DIM)),
        Span::styled(format!("  {}", card.dex_link), Style::default().fg(C_ACCENT)),
    ];

    vec![Line::from(header), Line::from(metrics), Line::from(footer)]
}

#[cfg(test)]
mod tests {
    use super::*;
    use ratatui::{Terminal, backend::TestBackend};

    fn line_text(line: &Line<'_>) -> String {
        line.spans.iter().map(|span| span.content.as_ref()).collect()
    }

    fn tick(label: &str, gain: &str, badge: Option<&str>) -> GainerTick {
        GainerTick {
            label: label.to_string(),
            gain: gain.to_string(),
            badge: badge.map(str::to_string),
            dex_link: String::new(),
        }
    }

    fn render<F>(draw: F) -> String
    where
        F: FnOnce(&mut Frame),
    {
        let mut terminal = Terminal::new(TestBackend::new(80, 8)).unwrap();
        terminal.draw(draw).unwrap();
        terminal
            .backend()
            .buffer()
            .content()
            .iter()
            .map(|cell| cell.symbol())
            .collect()
    }

    #[test]
    fn test_ticker_line() {
        let line = ticker_line(&[tick("$FOO", "+212%", Some("3x")), tick("$BAR", "+40%", None)]);
        assert_eq!(line_text(&line), "$FOO +212% 3x  │  $BAR +40%");

        assert_eq!(line_text(&ticker_line(&[])), "");
    }

    #[test]
    fn test_render_feed_panel_states() {
        let loading = render(|f| render_feed_panel(f, f.area(), &FeedView::Loading));
        assert!(loading.contains("Loading..."));

        let empty = render(|f| render_feed_panel(f, f.area(), &FeedView::Empty));
        assert!(empty.contains("No calls yet"));

        let unavailable = render(|f| {
            render_feed_panel(f, f.area(), &FeedView::Unavailable("refused".to_string()))
        });
        assert!(unavailable.contains("Unable to connect"));
        assert!(!unavailable.contains("No calls yet"));
    }

    #[test]
    fn test_render_ticker_ready() {
        let view = FeedView::Ready(vec![tick("$FOO", "+50%", None)]);
        let rendered = render(|f| render_ticker(f, f.area(), &view));
        assert!(rendered.contains("TOP GAINERS"));
        assert!(rendered.contains("$FOO +50%"));
    }
}
