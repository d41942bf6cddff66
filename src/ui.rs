//! Terminal user interface with ratatui.

use crate::api::MarketData;
use crate::app::{App, Mode, Notice, strip_listing_suffix};
use crate::models::{Bar, Period};
use chrono::Local;
use num_format::{Locale, ToFormattedString};
use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    symbols,
    text::{Line, Span},
    widgets::{
        Axis, Bar as ChartBar, BarChart, BarGroup, Block, Borders, Chart, Clear, Dataset,
        GraphType, List, ListItem, Paragraph, Wrap,
    },
};

/// Colors for the UI.
pub struct UiColors {
    pub gain: Color,
    pub loss: Color,
    pub neutral: Color,
    pub accent: Color,
    pub border: Color,
    pub muted: Color,
}

impl Default for UiColors {
    fn default() -> Self {
        Self {
            gain: Color::Green,
            loss: Color::Red,
            neutral: Color::White,
            accent: Color::Cyan,
            border: Color::DarkGray,
            muted: Color::DarkGray,
        }
    }
}

/// Render the main UI.
pub fn render<P: MarketData + 'static>(frame: &mut Frame, app: &App<P>) {
    let colors = UiColors::default();

    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3), // Header + search box
            Constraint::Min(12),   // Stats/favorites + charts
            Constraint::Length(1), // Footer
        ])
        .split(frame.area());

    render_header(frame, app, chunks[0], &colors);
    render_body(frame, app, chunks[1], &colors);
    render_footer(frame, app, chunks[2], &colors);

    if app.show_help {
        render_help_overlay(frame, &colors);
    }

    match app.mode {
        Mode::AlertPrice | Mode::AlertDirection => render_alert_dialog(frame, app, &colors),
        _ => {}
    }

    if let Some(ref notice) = app.notice {
        render_notice(frame, notice, &colors);
    }
}

/// Render the title line and the search box.
fn render_header<P: MarketData + 'static>(frame: &mut Frame, app: &App<P>, area: Rect, colors: &UiColors) {
    let mut title = vec![
        Span::styled(
            "TICKERDASH ",
            Style::default()
                .fg(colors.accent)
                .add_modifier(Modifier::BOLD),
        ),
    ];

    if let Some(ref quote) = app.quote {
        let price_color = match quote.change {
            Some(c) if c > 0.0 => colors.gain,
            Some(c) if c < 0.0 => colors.loss,
            _ => colors.neutral,
        };
        title.push(Span::raw(format!(
            "{} - {}  ",
            quote.resolved_symbol, quote.display_name
        )));
        title.push(Span::styled(
            format!("$ {:.2}", quote.current_price),
            Style::default().fg(price_color).add_modifier(Modifier::BOLD),
        ));
        if app.is_favorite() {
            title.push(Span::styled(" ★", Style::default().fg(Color::Yellow)));
        }
    } else {
        title.push(Span::styled(
            "no quote yet",
            Style::default().fg(colors.muted),
        ));
    }

    if app.auto_refresh {
        title.push(Span::styled(
            "  [auto]",
            Style::default().fg(colors.accent),
        ));
    }
    if app.fetching() {
        title.push(Span::styled(
            "  fetching...",
            Style::default().fg(Color::Yellow),
        ));
    }

    let editing = app.mode == Mode::EditSymbol;
    let search = Line::from(vec![
        Span::styled("Search: ", Style::default().fg(colors.muted)),
        Span::styled(
            app.input.clone(),
            if editing {
                Style::default()
                    .fg(Color::Yellow)
                    .add_modifier(Modifier::BOLD)
            } else {
                Style::default()
            },
        ),
        if editing {
            Span::styled("█", Style::default().fg(Color::Yellow))
        } else {
            Span::raw("")
        },
    ]);

    let header = Paragraph::new(vec![Line::from(title), search]).block(
        Block::default()
            .borders(Borders::BOTTOM)
            .border_style(Style::default().fg(colors.border)),
    );

    frame.render_widget(header, area);
}

/// Render the stats/favorites column and the chart column.
fn render_body<P: MarketData + 'static>(frame: &mut Frame, app: &App<P>, area: Rect, colors: &UiColors) {
    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Length(30), Constraint::Min(40)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(12), Constraint::Min(3)])
        .split(columns[0]);

    render_stats(frame, app, left[0], colors);
    render_favorites(frame, app, left[1], colors);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Min(10), Constraint::Length(9)])
        .split(columns[1]);

    render_price_chart(frame, app, right[0], colors);
    render_volume_chart(frame, app, right[1], colors);
}

/// Render the day's numbers for the displayed quote.
fn render_stats<P: MarketData + 'static>(frame: &mut Frame, app: &App<P>, area: Rect, colors: &UiColors) {
    let block = Block::default()
        .title(" Stats ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.border));

    let Some(ref quote) = app.quote else {
        let placeholder = Paragraph::new("Press / to search for a ticker")
            .style(Style::default().fg(colors.muted))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    };

    let change_color = match quote.change {
        Some(c) if c > 0.0 => colors.gain,
        Some(c) if c < 0.0 => colors.loss,
        _ => colors.neutral,
    };
    let change_text = match (quote.change, quote.change_percent) {
        (Some(change), Some(pct)) => format!("{:+.2} ({:+.2}%)", change, pct),
        _ => "-".to_string(),
    };
    let prev_close = match quote.previous_close {
        Some(pc) => format!("{:>10.2}", pc),
        None => format!("{:>10}", "-"),
    };

    let mut lines = vec![
        stat_line("Open", format!("{:>10.2}", quote.day_open)),
        stat_line("High", format!("{:>10.2}", quote.day_high)),
        stat_line("Low", format!("{:>10.2}", quote.day_low)),
        stat_line("Prev Close", prev_close),
        Line::from(vec![
            Span::raw(format!("{:<11}", "Change")),
            Span::styled(change_text, Style::default().fg(change_color)),
        ]),
        stat_line("Volume", format_volume(quote.current_volume())),
    ];

    if let Some(rule) = app.alerts.get(&quote.resolved_symbol) {
        lines.push(Line::from(vec![
            Span::raw(format!("{:<11}", "Alert")),
            Span::styled(
                format!("{} ${:.2}", rule.direction, rule.target),
                Style::default().fg(Color::Yellow),
            ),
        ]));
    }

    lines.push(Line::from(""));
    lines.push(Line::from(Span::styled(
        format!("Updated {}", app.time_since_update()),
        Style::default().fg(colors.muted),
    )));
    if let Some(elapsed) = app.last_elapsed {
        lines.push(Line::from(Span::styled(
            format!("Fetched in {:.2}s", elapsed.as_secs_f64()),
            Style::default().fg(colors.muted),
        )));
    }

    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn stat_line(label: &str, value: String) -> Line<'static> {
    Line::from(vec![
        Span::raw(format!("{:<11}", label)),
        Span::raw(value),
    ])
}

/// Render the favorites list; the displayed symbol gets a star, the Tab
/// cursor a highlight.
fn render_favorites<P: MarketData + 'static>(frame: &mut Frame, app: &App<P>, area: Rect, colors: &UiColors) {
    let block = Block::default()
        .title(format!(" Favorites ({}) ", app.favorites.len()))
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.border));

    if app.favorites.is_empty() {
        let placeholder = Paragraph::new("Press f to star a stock")
            .style(Style::default().fg(colors.muted))
            .block(block);
        frame.render_widget(placeholder, area);
        return;
    }

    let current = app.current_symbol.as_deref();
    let items: Vec<ListItem> = app
        .favorites
        .symbols()
        .iter()
        .enumerate()
        .map(|(i, symbol)| {
            let marker = if current == Some(symbol.as_str()) {
                "★ "
            } else {
                "  "
            };
            let style = if app.selected_favorite() == Some(i) {
                Style::default().bg(Color::Rgb(40, 40, 60))
            } else {
                Style::default()
            };
            ListItem::new(format!("{}{}", marker, strip_listing_suffix(symbol))).style(style)
        })
        .collect();

    frame.render_widget(List::new(items).block(block), area);
}

/// Render the close-price trend as a line chart.
fn render_price_chart<P: MarketData + 'static>(
    frame: &mut Frame,
    app: &App<P>,
    area: Rect,
    colors: &UiColors,
) {
    let Some(ref quote) = app.quote else {
        let block = Block::default()
            .title(" Price ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.border));
        frame.render_widget(block, area);
        return;
    };

    let points: Vec<(f64, f64)> = quote
        .bars
        .iter()
        .enumerate()
        .map(|(i, bar)| (i as f64, bar.close))
        .collect();

    let (min_price, max_price) = points
        .iter()
        .fold((f64::MAX, f64::MIN), |(min, max), &(_, y)| {
            (min.min(y), max.max(y))
        });

    // 5% headroom so the line does not hug the frame.
    let margin = ((max_price - min_price) * 0.05).max(0.01);
    let y_min = (min_price - margin).max(0.0);
    let y_max = max_price + margin;
    let x_max = (points.len().saturating_sub(1)).max(1) as f64;

    let line_color = match quote.change {
        Some(c) if c < 0.0 => colors.loss,
        _ => colors.gain,
    };

    let datasets = vec![
        Dataset::default()
            .name(quote.resolved_symbol.as_str())
            .marker(symbols::Marker::Braille)
            .graph_type(GraphType::Line)
            .style(Style::default().fg(line_color))
            .data(&points),
    ];

    let x_axis = Axis::default()
        .style(Style::default().fg(colors.muted))
        .bounds([0.0, x_max])
        .labels(time_axis_labels(&quote.bars, quote.period));

    let y_axis = Axis::default()
        .style(Style::default().fg(colors.muted))
        .bounds([y_min, y_max])
        .labels(vec![
            format!("{:.2}", y_min),
            format!("{:.2}", (y_min + y_max) / 2.0),
            format!("{:.2}", y_max),
        ]);

    let chart = Chart::new(datasets)
        .block(
            Block::default()
                .title(format!(
                    " {} {} ",
                    quote.resolved_symbol,
                    quote.period.label()
                ))
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .x_axis(x_axis)
        .y_axis(y_axis);

    frame.render_widget(chart, area);
}

/// First/middle/last bar timestamps, formatted for the period's granularity.
fn time_axis_labels(bars: &[Bar], period: Period) -> Vec<String> {
    let fmt = period.axis_format();
    let stamp = |bar: &Bar| bar.timestamp.with_timezone(&Local).format(fmt).to_string();

    match bars {
        [] => Vec::new(),
        [only] => vec![stamp(only)],
        _ => {
            let mid = &bars[bars.len() / 2];
            vec![
                stamp(&bars[0]),
                stamp(mid),
                stamp(&bars[bars.len() - 1]),
            ]
        }
    }
}

/// Render trading volume, one bar per history bar, colored against the prior
/// close (first bar neutral).
fn render_volume_chart<P: MarketData + 'static>(
    frame: &mut Frame,
    app: &App<P>,
    area: Rect,
    colors: &UiColors,
) {
    let block = Block::default()
        .title(" Volume ")
        .borders(Borders::ALL)
        .border_style(Style::default().fg(colors.border));

    let Some(ref quote) = app.quote else {
        frame.render_widget(block, area);
        return;
    };

    // Only the most recent bars fit; one terminal column per bar.
    let capacity = area.width.saturating_sub(2) as usize;
    let skip = quote.bars.len().saturating_sub(capacity);

    let bars: Vec<ChartBar> = quote
        .bars
        .iter()
        .enumerate()
        .skip(skip)
        .map(|(i, bar)| {
            let color = if i == 0 {
                colors.muted
            } else if bar.close >= quote.bars[i - 1].close {
                colors.gain
            } else {
                colors.loss
            };
            ChartBar::default()
                .value(bar.volume)
                .text_value(String::new())
                .style(Style::default().fg(color))
        })
        .collect();

    let chart = BarChart::default()
        .block(block)
        .bar_width(1)
        .bar_gap(0)
        .data(BarGroup::default().bars(&bars));

    frame.render_widget(chart, area);
}

/// Render the footer with period tabs and keybindings.
fn render_footer<P: MarketData + 'static>(frame: &mut Frame, app: &App<P>, area: Rect, colors: &UiColors) {
    let mut spans = Vec::new();
    for (i, period) in Period::all().iter().enumerate() {
        let style = if *period == app.period {
            Style::default()
                .fg(Color::Yellow)
                .add_modifier(Modifier::BOLD)
        } else {
            Style::default().fg(colors.muted)
        };
        spans.push(Span::styled(format!(" {}:{}", i + 1, period.key()), style));
    }
    spans.push(Span::raw("  "));
    for (key, action) in [
        ("/", "search"),
        ("f", "favorite"),
        ("Tab", "next fav"),
        ("a", "alert"),
        ("r", "auto"),
        ("Space", "refresh"),
        ("?", "help"),
        ("q", "quit"),
    ] {
        spans.push(Span::styled(key, Style::default().fg(Color::Yellow)));
        spans.push(Span::raw(format!(":{} ", action)));
    }

    let footer = Paragraph::new(Line::from(spans)).style(Style::default().bg(Color::DarkGray));
    frame.render_widget(footer, area);
}

/// Render the alert dialog: price entry, then direction choice.
fn render_alert_dialog<P: MarketData + 'static>(frame: &mut Frame, app: &App<P>, colors: &UiColors) {
    let area = centered_rect(40, 20, frame.area());
    let symbol = app.current_symbol.as_deref().unwrap_or("?");

    let lines = match app.mode {
        Mode::AlertPrice => vec![
            Line::from(format!("Target price for {}:", symbol)),
            Line::from(""),
            Line::from(vec![
                Span::styled(
                    format!("  {}", app.alert_price_input),
                    Style::default().fg(Color::Yellow),
                ),
                Span::styled("█", Style::default().fg(Color::Yellow)),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Enter to continue, Esc to cancel",
                Style::default().fg(colors.muted),
            )),
        ],
        _ => vec![
            Line::from(format!("Alert for {}:", symbol)),
            Line::from(""),
            Line::from(vec![
                Span::styled("  a", Style::default().fg(Color::Yellow)),
                Span::raw(" - notify above target"),
            ]),
            Line::from(vec![
                Span::styled("  b", Style::default().fg(Color::Yellow)),
                Span::raw(" - notify below target"),
            ]),
            Line::from(""),
            Line::from(Span::styled(
                "Esc to cancel",
                Style::default().fg(colors.muted),
            )),
        ],
    };

    let dialog = Paragraph::new(lines).block(
        Block::default()
            .title(" Price Alert ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(colors.accent)),
    );

    frame.render_widget(Clear, area);
    frame.render_widget(dialog, area);
}

/// Render a modal notice.
fn render_notice(frame: &mut Frame, notice: &Notice, colors: &UiColors) {
    let (title, text, color) = match notice {
        Notice::Info(msg) => (" Notice ", msg, colors.accent),
        Notice::Error(msg) => (" Error ", msg, colors.loss),
        Notice::AlertTriggered(msg) => (" Price Alert ", msg, Color::Yellow),
    };

    let area = centered_rect(50, 25, frame.area());
    let widget = Paragraph::new(text.as_str())
        .alignment(Alignment::Center)
        .block(
            Block::default()
                .title(title)
                .borders(Borders::ALL)
                .border_style(Style::default().fg(color)),
        )
        .style(Style::default().fg(color))
        .wrap(Wrap { trim: true });

    frame.render_widget(Clear, area);
    frame.render_widget(widget, area);
}

/// Render help overlay.
fn render_help_overlay(frame: &mut Frame, colors: &UiColors) {
    let area = centered_rect(60, 70, frame.area());

    let help_text = vec![
        Line::from(Span::styled(
            "TICKERDASH HELP",
            Style::default().add_modifier(Modifier::BOLD),
        )),
        Line::from(""),
        Line::from("Search:"),
        Line::from("  /, s      Edit the ticker"),
        Line::from("  Enter     Search again"),
        Line::from("  Tab       Fetch the next favorite"),
        Line::from(""),
        Line::from("Periods:"),
        Line::from("  1-5       1d, 1w, 1mo, 3mo, 1y"),
        Line::from(""),
        Line::from("Actions:"),
        Line::from("  f         Toggle favorite"),
        Line::from("  a         Set a one-shot price alert"),
        Line::from("  r         Toggle auto-refresh"),
        Line::from("  Space/R   Refresh now"),
        Line::from(""),
        Line::from("  q/Esc     Quit"),
        Line::from("  h/?       Toggle help"),
        Line::from(""),
        Line::from("Press any key to close"),
    ];

    let help = Paragraph::new(help_text)
        .block(
            Block::default()
                .title(" Help ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(colors.border)),
        )
        .wrap(Wrap { trim: false });

    frame.render_widget(Clear, area);
    frame.render_widget(help, area);
}

/// Create a centered rectangle.
fn centered_rect(percent_x: u16, percent_y: u16, r: Rect) -> Rect {
    let popup_layout = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Percentage((100 - percent_y) / 2),
            Constraint::Percentage(percent_y),
            Constraint::Percentage((100 - percent_y) / 2),
        ])
        .split(r);

    Layout::default()
        .direction(Direction::Horizontal)
        .constraints([
            Constraint::Percentage((100 - percent_x) / 2),
            Constraint::Percentage(percent_x),
            Constraint::Percentage((100 - percent_x) / 2),
        ])
        .split(popup_layout[1])[1]
}

/// Format volume with suffixes.
fn format_volume(volume: u64) -> String {
    if volume >= 1_000_000_000 {
        format!("{:.2}B", volume as f64 / 1_000_000_000.0)
    } else if volume >= 1_000_000 {
        format!("{:.2}M", volume as f64 / 1_000_000.0)
    } else if volume >= 1_000 {
        format!("{:.2}K", volume as f64 / 1_000.0)
    } else {
        volume.to_formatted_string(&Locale::en)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};

    fn bar_at(ts: i64, close: f64) -> Bar {
        Bar {
            timestamp: Utc.timestamp_opt(ts, 0).unwrap(),
            open: close,
            high: close,
            low: close,
            close,
            volume: 100,
        }
    }

    #[test]
    fn test_format_volume() {
        assert_eq!(format_volume(512), "512");
        assert_eq!(format_volume(1_500), "1.50K");
        assert_eq!(format_volume(2_340_000), "2.34M");
        assert_eq!(format_volume(1_000_000_000), "1.00B");
    }

    #[test]
    fn test_time_axis_labels_count() {
        assert!(time_axis_labels(&[], Period::Month).is_empty());
        assert_eq!(
            time_axis_labels(&[bar_at(1_700_000_000, 1.0)], Period::Month).len(),
            1
        );

        let bars: Vec<Bar> = (0..30)
            .map(|i| bar_at(1_700_000_000 + i * 86_400, 1.0))
            .collect();
        let labels = time_axis_labels(&bars, Period::Month);
        assert_eq!(labels.len(), 3);
    }

    #[test]
    fn test_time_axis_labels_use_period_format() {
        let bars = vec![
            bar_at(1_700_000_000, 1.0),
            bar_at(1_700_086_400, 1.0),
            bar_at(1_700_172_800, 1.0),
        ];
        // Intraday labels carry an hour:minute component.
        let labels = time_axis_labels(&bars, Period::Day);
        assert!(labels[0].contains(':'));
        // Yearly labels do not.
        let labels = time_axis_labels(&bars, Period::Year);
        assert!(!labels[0].contains(':'));
    }
}
