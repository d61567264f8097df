use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Modifier, Style},
    text::{Line, Span},
    widgets::{Block, Borders, List, ListItem, Paragraph, Row, Table},
    Frame,
};

use crate::ui::app::{App, AppView, InputMode, StockDetail};
use crate::ui::components::{format_large_opt, format_metric, score_color, score_span};

/// Render the current view.
pub fn render(f: &mut Frame, app: &mut App) {
    let chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Min(8),
            Constraint::Length(4),
        ])
        .split(f.area());

    render_header(f, chunks[0], app);

    match app.view {
        AppView::Detail => render_detail(f, chunks[1], app),
        _ => render_table(f, chunks[1], app),
    }

    render_footer(f, chunks[2], app);
}

fn render_header(f: &mut Frame, area: Rect, app: &App) {
    let mut spans = vec![
        Span::styled(
            " BIST Radar ",
            Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD),
        ),
        Span::styled("| ", Style::default().fg(Color::DarkGray)),
    ];

    match app.view {
        AppView::Listing => spans.push(Span::styled(
            "Listing",
            Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
        )),
        AppView::Watchlist => spans.push(Span::styled(
            format!("Watchlist ({})", app.watchlist.len()),
            Style::default().fg(Color::Magenta).add_modifier(Modifier::BOLD),
        )),
        AppView::Detail => {
            if let Some(detail) = &app.detail {
                spans.push(Span::styled(
                    format!("{} [{}]", detail.record.name, detail.record.code),
                    Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD),
                ));
                spans.push(Span::raw(format!("  {} sector", detail.record.sector)));
                if detail.assessment.is_sector_leader {
                    spans.push(Span::styled(
                        "  ★ Sector Leader",
                        Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
                    ));
                }
                if detail.in_watchlist {
                    spans.push(Span::styled("  ● watched", Style::default().fg(Color::Blue)));
                }
            }
        }
    }

    if let Some(sector) = &app.sector_filter {
        spans.push(Span::styled(
            format!("  (sector: {sector})"),
            Style::default().fg(Color::Cyan),
        ));
    }
    if !app.search_query.is_empty() {
        spans.push(Span::styled(
            format!("  (search: {})", app.search_query),
            Style::default().fg(Color::Cyan),
        ));
    }

    spans.push(Span::styled(
        format!("  [{}]", chrono::Local::now().format("%H:%M:%S")),
        Style::default().fg(Color::DarkGray),
    ));

    let header = Paragraph::new(Line::from(spans)).block(Block::default().borders(Borders::ALL));
    f.render_widget(header, area);
}

fn render_table(f: &mut Frame, area: Rect, app: &mut App) {
    let visible = app.visible_rows();

    if visible.is_empty() {
        let message = if app.view == AppView::Watchlist {
            "Watchlist is empty. Press w on a stock to add it."
        } else {
            "No stocks match the current search or filter."
        };
        let empty = Paragraph::new(message)
            .block(Block::default().borders(Borders::ALL))
            .style(Style::default().fg(Color::DarkGray));
        f.render_widget(empty, area);
        return;
    }

    let rows: Vec<Row> = visible
        .iter()
        .map(|row| match row.record_idx {
            Some(idx) => {
                let record = app.record(idx);
                Row::new(vec![
                    record.code.clone(),
                    record.name.clone(),
                    record.sector.clone(),
                    format_metric(record.closing_price),
                    format_large_opt(record.market_cap),
                    format_metric(record.pe_ratio),
                    format_metric(record.price_to_book),
                    format_metric(record.ev_to_ebitda),
                    format_metric(record.return_on_equity),
                ])
            }
            None => Row::new(vec![
                row.code.clone(),
                "not in dataset".to_string(),
                "—".to_string(),
                "—".to_string(),
                "—".to_string(),
                "—".to_string(),
                "—".to_string(),
                "—".to_string(),
                "—".to_string(),
            ])
            .style(Style::default().fg(Color::DarkGray)),
        })
        .collect();

    let sort_marker = if app.sort_descending { "↓" } else { "↑" };
    let title = match app.view {
        AppView::Watchlist => " Watchlist (oldest first) ".to_string(),
        _ => format!(" Stocks | sort: {} {} ", app.sort_field.label(), sort_marker),
    };

    let header = Row::new(vec![
        "Code", "Name", "Sector", "Close", "MCap", "P/E", "P/B", "EV/EBITDA", "ROE %",
    ])
    .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let widths = [
        Constraint::Length(7),
        Constraint::Min(18),
        Constraint::Length(18),
        Constraint::Length(9),
        Constraint::Length(8),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(10),
        Constraint::Length(8),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(title))
        .highlight_style(
            Style::default()
                .bg(Color::DarkGray)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");

    f.render_stateful_widget(table, area, &mut app.table_state);
}

fn render_detail(f: &mut Frame, area: Rect, app: &App) {
    let Some(detail) = &app.detail else {
        return;
    };

    let columns = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(55), Constraint::Percentage(45)])
        .split(area);

    let left = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(12),
            Constraint::Min(6),
            Constraint::Length(5),
        ])
        .split(columns[0]);

    render_summary(f, left[0], detail);
    render_commentary(f, left[1], detail);
    render_note(f, left[2], app, detail);

    let right = Layout::default()
        .direction(Direction::Vertical)
        .constraints([Constraint::Length(8), Constraint::Min(5)])
        .split(columns[1]);

    render_averages(f, right[0], detail);
    render_ranking(f, right[1], detail);
}

fn render_summary(f: &mut Frame, area: Rect, detail: &StockDetail) {
    let record = &detail.record;
    let averages = &detail.assessment.sector_averages;

    // Flag ratios that sit on the wrong side of the sector average.
    let ratio_style = |value: Option<f64>, average: f64, lower_is_better: bool| {
        match value {
            Some(v) if v > 0.0 && average > 0.0 => {
                let worse = if lower_is_better { v > average } else { v < average * 0.5 };
                if worse {
                    Style::default().fg(Color::Red)
                } else {
                    Style::default()
                }
            }
            _ => Style::default().fg(Color::DarkGray),
        }
    };

    let ratio_line = |label: &str, value: Option<f64>, average: f64, lower_is_better: bool| {
        Line::from(vec![
            Span::raw(format!("{label:<18}")),
            Span::styled(
                format!("{:>8}", format_metric(value)),
                ratio_style(value, average, lower_is_better),
            ),
            Span::styled(
                format!("   sector avg {average:.2}"),
                Style::default().fg(Color::DarkGray),
            ),
        ])
    };

    let mut lines = vec![
        Line::from(format!("Closing price     {:>8} TL", format_metric(record.closing_price))),
        Line::from(format!("Market cap        {:>8} mn TL", format_large_opt(record.market_cap))),
        Line::from(format!("Paid-in capital   {:>8} mn TL", format_large_opt(record.paid_in_capital))),
        Line::from(format!("Free float        {:>8} %", format_metric(record.free_float_pct))),
        Line::default(),
        ratio_line("P/E ratio", record.pe_ratio, averages.pe_ratio, true),
        ratio_line("P/B ratio", record.price_to_book, averages.price_to_book, true),
        ratio_line("EV/EBITDA", record.ev_to_ebitda, averages.ev_to_ebitda, true),
        ratio_line("Return on equity", record.return_on_equity, averages.return_on_equity, false),
        Line::default(),
    ];

    let mut score_line = vec![
        Span::raw(format!("{:<18}", "Total score")),
        score_span(detail.assessment.final_score, detail.assessment.valid_count),
        Span::styled(
            format!("   {}/4 valid ratios", detail.assessment.valid_count),
            Style::default().fg(Color::DarkGray),
        ),
    ];
    if detail.assessment.is_sector_leader {
        score_line.push(Span::styled(
            "   ★ Sector Leader",
            Style::default().fg(Color::Green).add_modifier(Modifier::BOLD),
        ));
    }
    lines.push(Line::from(score_line));

    let summary = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Financial Summary "));
    f.render_widget(summary, area);
}

fn render_commentary(f: &mut Frame, area: Rect, detail: &StockDetail) {
    let halves = Layout::default()
        .direction(Direction::Horizontal)
        .constraints([Constraint::Percentage(50), Constraint::Percentage(50)])
        .split(area);

    let strengths: Vec<ListItem> = detail
        .assessment
        .strengths
        .iter()
        .map(|s| ListItem::new(format!("+ {s}")).style(Style::default().fg(Color::Green)))
        .collect();
    let weaknesses: Vec<ListItem> = detail
        .assessment
        .weaknesses
        .iter()
        .map(|s| ListItem::new(format!("- {s}")).style(Style::default().fg(Color::Red)))
        .collect();

    f.render_widget(
        List::new(strengths).block(Block::default().borders(Borders::ALL).title(" Strengths ")),
        halves[0],
    );
    f.render_widget(
        List::new(weaknesses).block(Block::default().borders(Borders::ALL).title(" Weaknesses ")),
        halves[1],
    );
}

fn render_note(f: &mut Frame, area: Rect, app: &App, detail: &StockDetail) {
    let editing = app.input_mode == InputMode::Note;
    let (title, body, style) = if editing {
        (
            " Note (Enter saves, Esc discards) ",
            format!("{}█", app.note_buffer),
            Style::default().fg(Color::Yellow),
        )
    } else if detail.note.is_empty() {
        (
            " Note (press n to edit) ",
            "No note yet.".to_string(),
            Style::default().fg(Color::DarkGray),
        )
    } else {
        (" Note (press n to edit) ", detail.note.clone(), Style::default())
    };

    let note = Paragraph::new(body)
        .style(style)
        .block(Block::default().borders(Borders::ALL).title(title));
    f.render_widget(note, area);
}

fn render_averages(f: &mut Frame, area: Rect, detail: &StockDetail) {
    let averages = &detail.assessment.sector_averages;
    let lines = vec![
        Line::from(format!("P/E ratio         {:>8.2}", averages.pe_ratio)),
        Line::from(format!("P/B ratio         {:>8.2}", averages.price_to_book)),
        Line::from(format!("EV/EBITDA         {:>8.2}", averages.ev_to_ebitda)),
        Line::from(format!("Return on equity  {:>7.2}%", averages.return_on_equity)),
        Line::from(format!("Free float        {:>7.2}%", averages.free_float_pct)),
    ];

    let block = Paragraph::new(lines)
        .block(Block::default().borders(Borders::ALL).title(" Sector Averages "));
    f.render_widget(block, area);
}

fn render_ranking(f: &mut Frame, area: Rect, detail: &StockDetail) {
    let rows: Vec<Row> = detail
        .assessment
        .sector_ranking
        .iter()
        .enumerate()
        .map(|(i, entry)| {
            let score_cell = if entry.valid_count == 0 {
                Span::styled("N/A", Style::default().fg(Color::DarkGray))
            } else {
                Span::styled(
                    format!("{:.2}", entry.final_score),
                    Style::default().fg(score_color(entry.final_score)),
                )
            };

            let row = Row::new(vec![
                Line::from(format!("{}", i + 1)),
                Line::from(entry.code.clone()),
                Line::from(score_cell),
                Line::from(format!("{}/4", entry.valid_count)),
            ]);

            if entry.code == detail.record.code {
                row.style(Style::default().add_modifier(Modifier::BOLD))
            } else {
                row
            }
        })
        .collect();

    let header = Row::new(vec!["#", "Code", "Score", "Ratios"])
        .style(Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD));

    let widths = [
        Constraint::Length(3),
        Constraint::Length(7),
        Constraint::Length(7),
        Constraint::Length(6),
    ];

    let table = Table::new(rows, widths)
        .header(header)
        .block(Block::default().borders(Borders::ALL).title(" Sector Ranking "));
    f.render_widget(table, area);
}

fn render_footer(f: &mut Frame, area: Rect, app: &App) {
    let keys = match (app.input_mode, app.view) {
        (InputMode::Search, _) => format!("Search: {}█  (Enter applies, Esc clears)", app.search_query),
        (InputMode::Note, _) => "Editing note: Enter saves, Esc discards".to_string(),
        (_, AppView::Detail) => {
            "[b/Esc] back  [w] watchlist  [n] note  [q] quit".to_string()
        }
        _ => "[↑↓] move  [Enter] detail  [w] watchlist  [s] sort  [r] reverse  [f] sector  [/] search  [Tab] view  [q] quit"
            .to_string(),
    };

    let footer = Paragraph::new(vec![
        Line::from(Span::styled(app.status.clone(), Style::default().fg(Color::DarkGray))),
        Line::from(keys),
    ])
    .block(Block::default().borders(Borders::ALL));
    f.render_widget(footer, area);
}
