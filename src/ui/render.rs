use std::time::Instant;

use chrono::{DateTime, Local};
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::App;
use crate::poll::PollState;
use crate::theme::ThemePreference;
use crate::types::*;

pub fn draw(f: &mut Frame, app: &App) {
    // Fill background
    let bg_block = Block::default().style(Style::default().bg(app.theme.bg));
    f.render_widget(bg_block, f.area());

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),                      // rate
            Constraint::Length(4),                      // input
            Constraint::Length(3),                      // result
            Constraint::Length(HISTORY_CAP as u16 + 2), // history
            Constraint::Min(0),
            Constraint::Length(1), // bottom bar
        ])
        .split(f.area());

    draw_rate(f, app, chunks[0]);
    draw_input(f, app, chunks[1]);
    draw_result(f, app, chunks[2]);
    draw_history(f, app, chunks[3]);
    draw_bottom_bar(f, app, chunks[5]);

    if app.input_mode == InputMode::ConfirmClearHistory {
        draw_confirm_popup(f, app);
    }
}

// -- Rate --

fn draw_rate(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;

    let block = Block::default()
        .title(Span::styled(
            " btcbrl ",
            Style::default().fg(t.title).add_modifier(Modifier::BOLD),
        ))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.border));

    let mut spans = vec![Span::styled(" 1 BTC = ", Style::default().fg(t.dim))];

    match (app.rate, app.rate_status) {
        (Some(rate), _) => spans.push(Span::styled(
            format_brl(rate.value()),
            Style::default().fg(t.fg).add_modifier(Modifier::BOLD),
        )),
        (None, RateStatus::Error) => spans.push(Span::styled(
            "Failed to load",
            Style::default().fg(t.error),
        )),
        (None, _) => spans.push(Span::styled("loading...", Style::default().fg(t.dim))),
    }

    spans.push(Span::styled("  \u{2502}  ", Style::default().fg(t.dim)));

    match app.rate_status {
        RateStatus::Live => {
            spans.push(Span::styled("\u{25cf} ", Style::default().fg(t.positive)));
            if let Some(at) = app.last_updated {
                spans.push(Span::styled(
                    format!("Last update: {}", format_time(&at)),
                    Style::default().fg(t.dim),
                ));
            }
        }
        RateStatus::Stale | RateStatus::Error => spans.push(Span::styled(
            "Connection failed. Retrying soon...",
            Style::default().fg(t.warning),
        )),
        RateStatus::Loading => {}
    }

    if app.fetch_in_flight {
        spans.push(Span::styled("  \u{27f3}", Style::default().fg(t.accent)));
    }
    match app.poller.time_until_next(Instant::now()) {
        _ if app.poller.state() == PollState::Paused => {
            spans.push(Span::styled("  paused", Style::default().fg(t.dim)));
        }
        Some(left) if !app.fetch_in_flight => spans.push(Span::styled(
            format!("  next in {}s", left.as_secs()),
            Style::default().fg(t.dim),
        )),
        _ => {}
    }

    f.render_widget(Paragraph::new(Line::from(spans)).block(block), area);
}

// -- Input --

fn draw_input(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;

    let block = Block::default()
        .title(" Amount (BTC) ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.input_accent));

    let mut lines = vec![Line::from(Span::styled(
        format!(" {}_", app.input_buf),
        Style::default().fg(t.fg),
    ))];

    if let Some(ref err) = app.input_error {
        lines.push(Line::from(Span::styled(
            format!(" {}", err),
            Style::default().fg(t.error),
        )));
    }

    f.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_result(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;

    let block = Block::default()
        .title(" BRL ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.border));

    let line = match app.result {
        Some(ref rec) => Line::from(Span::styled(
            format!(" {}", format_brl(rec.amount_fiat)),
            Style::default().fg(t.accent).add_modifier(Modifier::BOLD),
        )),
        None => Line::from(""),
    };

    f.render_widget(Paragraph::new(line).block(block), area);
}

// -- History --

fn draw_history(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;

    let block = Block::default()
        .title(" History ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.border));

    let lines: Vec<Line> = if app.history.is_empty() {
        vec![Line::from(Span::styled(
            " No recent conversions.",
            Style::default().fg(t.dim).add_modifier(Modifier::ITALIC),
        ))]
    } else {
        app.history
            .entries()
            .iter()
            .map(|rec| {
                let when = rec.timestamp.with_timezone(&Local);
                Line::from(vec![
                    Span::styled(
                        format!(" {:>16} BTC", format_btc(rec.amount_btc)),
                        Style::default().fg(t.fg).add_modifier(Modifier::BOLD),
                    ),
                    Span::styled(
                        format!("  {}  ", format_time(&when)),
                        Style::default().fg(t.dim),
                    ),
                    Span::styled(format_brl(rec.amount_fiat), Style::default().fg(t.accent)),
                ])
            })
            .collect()
    };

    f.render_widget(Paragraph::new(lines).block(block), area);
}

// -- Bottom bar --

fn draw_bottom_bar(f: &mut Frame, app: &App, area: Rect) {
    let t = &app.theme;

    let theme_hint = match app.theme_pref {
        ThemePreference::Dark => "^T light",
        ThemePreference::Light => "^T dark",
    };
    let hints = format!(
        " Enter convert | Esc clear | ^X clear history | {} | ^R refresh | ^Q quit ",
        theme_hint
    );

    f.render_widget(
        Paragraph::new(hints).style(Style::default().fg(t.dim)),
        area,
    );
}

fn draw_confirm_popup(f: &mut Frame, app: &App) {
    let t = &app.theme;

    let area = centered_rect(50, 20, f.area());
    let area = Rect {
        height: area.height.max(3),
        ..area
    };
    f.render_widget(Clear, area);

    let block = Block::default()
        .title(" Clear history ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(t.warning));

    let text = Paragraph::new(" Delete all history? (y/n)")
        .style(Style::default().fg(t.fg))
        .block(block);
    f.render_widget(text, area);
}

fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_width = r.width * percent_x / 100;
    let popup_height = r.height * percent_y / 100;
    let x = (r.width.saturating_sub(popup_width)) / 2;
    let y = (r.height.saturating_sub(popup_height)) / 2;
    Rect::new(r.x + x, r.y + y, popup_width, popup_height)
}

/// pt-BR currency: `R$ 175.000,00`.
fn format_brl(v: f64) -> String {
    let cents = (v.abs() * 100.0).round() as u128;
    let sign = if v < 0.0 && cents > 0 { "-" } else { "" };
    format!(
        "{}R$ {},{:02}",
        sign,
        group_thousands(&(cents / 100).to_string()),
        cents % 100
    )
}

fn format_btc(v: f64) -> String {
    v.to_string().replace('.', ",")
}

fn format_time(at: &DateTime<Local>) -> String {
    at.format("%H:%M:%S").to_string()
}

fn group_thousands(digits: &str) -> String {
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, ch) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push('.');
        }
        out.push(ch);
    }
    out
}
