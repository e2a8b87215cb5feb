use crate::{
    app::{AppState, View},
    history::format_timer,
    settings::{GOAL_RANGE, PHASE_RANGE, SettingsField, ThemeName, VOLUME_RANGE},
};
use ratatui::{prelude::*, symbols::Marker, widgets::*};
use std::time::Duration;

const BANNER: &str = "Practice regularly to increase cycle from 4s to 10s";
const CIRCLE_BASE_PCT: f64 = 60.0;

// ============================================================================
// Themes
// ============================================================================

#[derive(Clone, Copy)]
pub struct Theme {
    pub background: Color,
    pub text: Color,
    pub muted: Color,
    pub accent: Color,
    pub border: Color,
    pub dot_empty: Color,
}

pub fn get_theme(name: ThemeName) -> Theme {
    match name {
        ThemeName::Dark => Theme {
            background: Color::Rgb(15, 23, 42),
            text: Color::Rgb(226, 232, 240),
            muted: Color::Rgb(148, 163, 184),
            accent: Color::Rgb(151, 117, 250),
            border: Color::Rgb(71, 85, 105),
            dot_empty: Color::Rgb(51, 65, 85),
        },
        ThemeName::Light => Theme {
            background: Color::Rgb(248, 250, 252),
            text: Color::Rgb(30, 41, 59),
            muted: Color::Rgb(100, 116, 139),
            accent: Color::Rgb(121, 80, 242),
            border: Color::Rgb(203, 213, 225),
            dot_empty: Color::Rgb(209, 213, 219),
        },
    }
}

// ============================================================================
// UI Rendering
// ============================================================================

pub fn render_ui(f: &mut Frame, app: &AppState) {
    let theme = get_theme(app.settings.theme);
    f.render_widget(
        Block::default().style(Style::default().bg(theme.background).fg(theme.text)),
        f.size(),
    );

    match app.view {
        View::Timer => render_timer(f, app, &theme),
        View::Stats => render_stats(f, app, &theme),
        View::Settings => render_settings(f, app, &theme),
        View::Help => render_help(f, &theme),
    }
}

fn card<'a>(title: &'a str, theme: &Theme) -> Block<'a> {
    Block::default()
        .title(Span::styled(format!(" {title} "), Style::default().fg(theme.muted)))
        .borders(Borders::ALL)
        .border_type(BorderType::Rounded)
        .border_style(Style::default().fg(theme.border))
}

fn render_timer(f: &mut Frame, app: &AppState, theme: &Theme) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Length(1),
            Constraint::Min(7),
            Constraint::Length(4),
            Constraint::Length(2),
        ])
        .split(f.size());

    f.render_widget(
        Paragraph::new(Line::from(vec![
            Span::styled("ⓘ ", Style::default().fg(theme.accent)),
            Span::styled(BANNER, Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
        ]))
        .alignment(Alignment::Center),
        chunks[0],
    );

    let elapsed = if app.cycle.is_active() {
        Line::from(Span::styled(
            format_timer(app.cycle.total_time()),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ))
    } else if let Some(last) = app.last_session {
        Line::from(Span::styled(
            format!("Last Session: {}", format_timer(last)),
            Style::default().fg(theme.muted),
        ))
    } else {
        Line::from("")
    };
    f.render_widget(Paragraph::new(elapsed).alignment(Alignment::Center), chunks[2]);

    render_circle(f, app, theme, chunks[3]);
    render_cards(f, app, theme, chunks[4]);

    let controls = vec![
        Line::from(vec![
            span_key("Enter", theme), Span::raw(" Start/Stop  •  "),
            span_key("Space", theme), Span::raw(" Pause  •  "),
            span_key("S", theme), Span::raw(" Stats  •  "),
            span_key("C", theme), Span::raw(" Config  •  "),
            span_key("H", theme), Span::raw(" Help  •  "),
            span_key("Q", theme), Span::raw(" Quit"),
        ]),
        status_line(app, theme),
    ];
    f.render_widget(
        Paragraph::new(controls).alignment(Alignment::Center).style(Style::default().fg(theme.muted)),
        chunks[5],
    );
}

/// Size tracks the cycle's scale so the circle grows while inhaling.
fn circle_rect(area: Rect, scale: f64) -> Rect {
    let pct = (CIRCLE_BASE_PCT * scale).round().clamp(10.0, 100.0) as u16;
    centered_rect(pct, pct, area)
}

fn render_circle(f: &mut Frame, app: &AppState, theme: &Theme, area: Rect) {
    let rect = circle_rect(area, app.cycle.scale());
    let active = app.cycle.is_active();

    let (label, big, hint) = if active {
        let hint = if app.cycle.is_paused() { "Paused" } else { "Stop Session" };
        (app.cycle.phase().label().to_uppercase(), app.cycle.countdown().to_string(), hint)
    } else {
        ("READY?".to_string(), "GO".to_string(), "Start Session")
    };

    let inner_height = rect.height.saturating_sub(2);
    let pad = inner_height.saturating_sub(5) / 2;
    let mut lines: Vec<Line> = (0..pad).map(|_| Line::from("")).collect();
    lines.extend([
        Line::from(Span::styled(label, Style::default().fg(theme.muted))),
        Line::from(""),
        Line::from(Span::styled(big, Style::default().fg(theme.text).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from(Span::styled(hint, Style::default().fg(theme.accent))),
    ]);

    let border = if active && !app.cycle.is_paused() { theme.accent } else { theme.border };
    f.render_widget(
        Paragraph::new(lines).alignment(Alignment::Center).block(
            Block::default()
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(border)),
        ),
        rect,
    );
}

fn render_cards(f: &mut Frame, app: &AppState, theme: &Theme, area: Rect) {
    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let goal = vec![
        Line::from(Span::styled(
            format!("{}m", app.settings.goal_duration),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        )),
        Line::from(Span::styled("daily goal", Style::default().fg(theme.muted))),
    ];
    f.render_widget(Paragraph::new(goal).block(card("Goal", theme)), cols[0]);

    let config = vec![
        Line::from(Span::styled("Customize", Style::default().fg(theme.text).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(
            format!("{}s cycle", app.settings.phase_duration),
            Style::default().fg(theme.muted),
        )),
    ];
    f.render_widget(Paragraph::new(config).block(card("Config", theme)), cols[1]);
}

fn status_line<'a>(app: &'a AppState, theme: &Theme) -> Line<'a> {
    match &app.status {
        Some(msg) => Line::from(Span::styled(msg.as_str(), Style::default().fg(theme.accent))),
        None => Line::from(""),
    }
}

fn span_key<'a>(text: &'a str, theme: &Theme) -> Span<'a> {
    Span::styled(text, Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))
}

fn render_stats(f: &mut Frame, app: &AppState, theme: &Theme) {
    let area = centered_rect(80, 90, f.size());
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(6), Constraint::Min(8), Constraint::Length(2)])
        .split(area);

    let history = &app.history;
    let progress = history.goal_progress(app.settings.goal_duration);
    let dots: Vec<Span> = (0..progress.total)
        .map(|i| {
            let color = if i < progress.filled { theme.accent } else { theme.dot_empty };
            Span::styled("● ", Style::default().fg(color))
        })
        .collect();

    let cols = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage(25),
            Constraint::Percentage(25),
            Constraint::Percentage(50),
        ])
        .split(chunks[0]);

    let big = |ms: u64| {
        Line::from(Span::styled(
            format_timer(Duration::from_millis(ms)),
            Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
        ))
    };
    f.render_widget(
        Paragraph::new(big(history.last_duration())).alignment(Alignment::Center).block(card("Last Session", theme)),
        cols[0],
    );
    f.render_widget(
        Paragraph::new(big(history.highest_duration())).alignment(Alignment::Center).block(card("Highest", theme)),
        cols[1],
    );
    let today = history.sessions_on(chrono::Local::now().date_naive());
    f.render_widget(
        Paragraph::new(vec![
            Line::from(dots),
            Line::from(Span::styled(
                format!(
                    "{today} today  •  {} total",
                    format_timer(Duration::from_millis(history.total_duration()))
                ),
                Style::default().fg(theme.muted),
            )),
        ])
        .alignment(Alignment::Center)
        .wrap(Wrap { trim: true })
        .block(card("Session Goal", theme)),
        cols[2],
    );

    render_chart(f, app, theme, chunks[1]);

    let footer = vec![
        Line::from(vec![
            span_key("E", theme), Span::raw(" Export CSV  •  "),
            span_key("S/Esc", theme), Span::raw(" Back  •  "),
            span_key("Q", theme), Span::raw(" Quit"),
        ]),
        status_line(app, theme),
    ];
    f.render_widget(
        Paragraph::new(footer).alignment(Alignment::Center).style(Style::default().fg(theme.muted)),
        chunks[2],
    );
}

fn render_chart(f: &mut Frame, app: &AppState, theme: &Theme, area: Rect) {
    let data = app.history.chart_data();
    let points: Vec<(f64, f64)> = data.iter().enumerate().map(|(i, (_, m))| (i as f64, *m)).collect();
    let y_max = points.iter().map(|&(_, y)| y).fold(0.0_f64, f64::max).max(1.0).ceil();
    let x_max = (points.len().saturating_sub(1) as f64).max(1.0);

    let x_labels: Vec<Span> = data.iter().map(|(label, _)| Span::raw(label.clone())).collect();
    let y_labels = vec![
        Span::raw("0"),
        Span::raw(format!("{:.0}", y_max / 2.0)),
        Span::raw(format!("{y_max:.0}")),
    ];

    let datasets = vec![
        Dataset::default()
            .name("Duration (min)")
            .marker(Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(theme.accent))
            .data(&points),
        Dataset::default()
            .marker(Marker::Dot)
            .graph_type(GraphType::Scatter)
            .style(Style::default().fg(theme.accent))
            .data(&points),
    ];

    let chart = Chart::new(datasets)
        .block(card("Session History", theme))
        .x_axis(
            Axis::default()
                .style(Style::default().fg(theme.muted))
                .bounds([0.0, x_max])
                .labels(x_labels),
        )
        .y_axis(
            Axis::default()
                .style(Style::default().fg(theme.muted))
                .bounds([0.0, y_max])
                .labels(y_labels),
        );
    f.render_widget(chart, area);
}

fn slider(value: u64, min: u64, max: u64, unit: &str) -> String {
    const WIDTH: u64 = 20;
    let filled = if max > min { value.clamp(min, max).saturating_sub(min) * WIDTH / (max - min) } else { WIDTH };
    format!(
        "{}{} {value}{unit}",
        "■".repeat(filled as usize),
        "□".repeat((WIDTH - filled) as usize)
    )
}

fn render_settings(f: &mut Frame, app: &AppState, theme: &Theme) {
    let area = centered_rect(70, 85, f.size());
    let s = &app.settings;

    let mut lines = vec![
        Line::from(""),
        Line::from(Span::styled("CUSTOMIZE YOUR FLOW", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
        Line::from(Span::styled(
            "  Adjust your breathing session to your liking.",
            Style::default().fg(theme.muted),
        )),
        Line::from(""),
        Line::from(Span::styled(
            "  ↑↓/jk: Navigate  •  ←→/hl: Adjust  •  Space: Toggle  •  Esc: Back",
            Style::default().fg(theme.muted).add_modifier(Modifier::ITALIC),
        )),
    ];

    let soundscape = match (&s.soundscape, s.soundscape_enabled) {
        (None, _) => "no file (use --soundscape <file>)".to_string(),
        (Some(path), enabled) => format!(
            "{}  {}",
            if enabled { "ON " } else { "OFF" },
            path.file_name().map(|n| n.to_string_lossy()).unwrap_or_default()
        ),
    };

    let rows = [
        (
            SettingsField::PhaseDuration,
            format!("Cycle Duration: {} seconds", s.phase_duration),
            slider(s.phase_duration, *PHASE_RANGE.start(), *PHASE_RANGE.end(), "s"),
        ),
        (
            SettingsField::GoalDuration,
            format!("Daily Goal: {} minutes", s.goal_duration),
            slider(s.goal_duration, *GOAL_RANGE.start(), *GOAL_RANGE.end(), "m"),
        ),
        (
            SettingsField::Theme,
            "Theme".to_string(),
            match s.theme {
                ThemeName::Light => "(•) Light   ( ) Dark".to_string(),
                ThemeName::Dark => "( ) Light   (•) Dark".to_string(),
            },
        ),
        (
            SettingsField::Voice,
            "Voice Prompts".to_string(),
            if s.voice_enabled { "ON" } else { "OFF" }.to_string(),
        ),
        (SettingsField::Soundscape, "Background Audio".to_string(), soundscape),
        (
            SettingsField::Volume,
            "Volume".to_string(),
            slider(
                u64::from(s.volume),
                u64::from(*VOLUME_RANGE.start()),
                u64::from(*VOLUME_RANGE.end()),
                "%",
            ),
        ),
    ];

    for (field, label, value) in rows {
        let selected = app.settings_field == field;
        let (prefix, label_style, value_style) = if selected {
            (
                "  > ",
                Style::default().fg(theme.accent).add_modifier(Modifier::BOLD),
                Style::default().fg(theme.text).add_modifier(Modifier::BOLD),
            )
        } else {
            ("    ", Style::default().fg(theme.text), Style::default().fg(theme.muted))
        };

        lines.push(Line::from(""));
        lines.push(Line::from(vec![Span::styled(prefix, label_style), Span::styled(label, label_style)]));
        lines.push(Line::from(vec![Span::raw("    "), Span::styled(value, value_style)]));
    }

    f.render_widget(
        Paragraph::new(lines).block(
            Block::default()
                .title(" Settings ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border)),
        ),
        area,
    );
}

fn render_help(f: &mut Frame, theme: &Theme) {
    let area = centered_rect(70, 80, f.size());

    let help_text = vec![
        Line::from(""),
        Line::from(Span::styled("KEYBOARD SHORTCUTS", Style::default().fg(theme.accent).add_modifier(Modifier::BOLD))),
        Line::from(""),
        Line::from("  Session:"),
        help_line("Enter", "Start / stop a session", theme),
        help_line("Space", "Pause / resume (starts when idle)", theme),
        Line::from(""),
        Line::from("  Navigation:"),
        help_line("S", "Toggle statistics", theme),
        help_line("C", "Open settings", theme),
        help_line("H / ?", "Toggle help", theme),
        help_line("E", "Export history (stats view)", theme),
        Line::from(""),
        Line::from("  General:"),
        help_line("Q / Esc", "Quit / go back", theme),
        help_line("Ctrl+C", "Force quit", theme),
        Line::from(""),
        Line::from(Span::styled(
            "Each phase lasts the cycle duration: Breathe In, Hold, Breathe Out, Hold.",
            Style::default().fg(theme.muted).add_modifier(Modifier::ITALIC),
        )),
    ];

    f.render_widget(
        Paragraph::new(help_text).block(
            Block::default()
                .title(" Help ")
                .title_alignment(Alignment::Center)
                .borders(Borders::ALL)
                .border_type(BorderType::Rounded)
                .border_style(Style::default().fg(theme.border)),
        ),
        area,
    );
}

fn help_line<'a>(key: &'a str, desc: &'a str, theme: &Theme) -> Line<'a> {
    Line::from(vec![
        Span::raw("    "),
        Span::styled(key, Style::default().fg(theme.accent).add_modifier(Modifier::BOLD)),
        Span::raw(format!("  {}", desc)),
    ])
}

fn centered_rect(w: u16, h: u16, r: Rect) -> Rect {
    let v = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - h) / 2),
            Constraint::Percentage(h),
            Constraint::Percentage((100 - h) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - w) / 2),
            Constraint::Percentage(w),
            Constraint::Percentage((100 - w) / 2),
        ])
        .split(v[1])[1]
}
