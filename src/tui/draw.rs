//! TUI drawing functions - renders all UI components.

use super::app::App;
use super::state::{result_color, stage_color, Field, InputMode};
use crate::types::MatchedRow;
use ratatui::{
    prelude::*,
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
};

pub fn draw_ui(frame: &mut Frame, app: &mut App) {
    let area = frame.area();
    let main_chunks = Layout::default()
        .direction(Direction::Vertical)
        .constraints([
            Constraint::Length(3),
            Constraint::Length(5),
            Constraint::Length(4),
            Constraint::Min(6),
            Constraint::Length(3),
        ])
        .split(area);

    draw_title(frame, main_chunks[0]);
    draw_form(frame, main_chunks[1], app);
    draw_stage(frame, main_chunks[2], app);
    draw_results(frame, main_chunks[3], app);
    draw_footer(frame, main_chunks[4], app);
}

fn draw_title(frame: &mut Frame, area: Rect) {
    let title = Paragraph::new("HWOL OEMA: lab results to template")
        .style(
            Style::default()
                .fg(Color::Cyan)
                .add_modifier(Modifier::BOLD),
        )
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(title, area);
}

fn field_line(app: &App, field: Field, value: &str) -> Line<'static> {
    let focused = app.focus == field;
    let editing = focused && app.input_mode == InputMode::Editing;
    let marker = if focused { "▶ " } else { "  " };
    let label_style = if focused {
        Style::default().fg(Color::Cyan).add_modifier(Modifier::BOLD)
    } else {
        Style::default().fg(Color::DarkGray)
    };
    let mut spans = vec![
        Span::styled(marker, label_style),
        Span::styled(format!("{:<14}", field.label()), label_style),
        Span::raw(value.to_string()),
    ];
    if editing {
        spans.push(Span::styled("█", Style::default().fg(Color::Cyan)));
    }
    Line::from(spans)
}

fn draw_form(frame: &mut Frame, area: Rect, app: &App) {
    let lab = if app.lab_path.is_empty() {
        "(none)"
    } else {
        app.lab_path.as_str()
    };
    let lines = vec![
        field_line(app, Field::Lab, lab),
        field_line(app, Field::Column, &app.column),
        field_line(app, Field::Variant, app.variant.label()),
    ];
    let form = Paragraph::new(lines).block(
        Block::default()
            .title(" Request ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(Color::Cyan)),
    );
    frame.render_widget(form, area);
}

fn draw_stage(frame: &mut Frame, area: Rect, app: &App) {
    let mut lines = vec![Line::from(vec![
        Span::raw("Stage: "),
        Span::styled(
            app.stage.label(),
            Style::default()
                .fg(stage_color(app.stage))
                .add_modifier(Modifier::BOLD),
        ),
    ])];
    if let Some(message) = &app.failure {
        lines.push(Line::from(Span::styled(
            message.clone(),
            Style::default().fg(Color::Red),
        )));
    } else if let Some(report) = &app.report {
        let table = &report.table;
        let mut spans = vec![
            Span::styled(
                report.artifact.file_name.clone(),
                Style::default().fg(Color::Green),
            ),
            Span::raw(format!(
                " | {}/{} matched",
                table.matched_count(),
                table.determinand_count()
            )),
        ];
        if !table.unmatched.is_empty() {
            spans.push(Span::styled(
                format!(" | unmatched: {}", table.unmatched.join(", ")),
                Style::default().fg(Color::Yellow),
            ));
        }
        lines.push(Line::from(spans));
    }
    let widget = Paragraph::new(lines).wrap(Wrap { trim: true }).block(
        Block::default()
            .title(" Status ")
            .borders(Borders::ALL)
            .border_style(Style::default().fg(stage_color(app.stage))),
    );
    frame.render_widget(widget, area);
}

fn format_row_item(sheet_row: usize, row: &MatchedRow) -> ListItem<'static> {
    let key = if row.is_placeholder() {
        "—".to_string()
    } else {
        row.key.clone()
    };
    let source = row
        .source
        .as_ref()
        .map_or_else(String::new, |s| format!("  ← {s}"));
    let line = Line::from(vec![
        Span::styled(format!("{sheet_row:>3} "), Style::default().fg(Color::DarkGray)),
        Span::raw(format!("{key:<22}")),
        Span::styled(
            format!("{:<12}", row.result.to_string()),
            Style::default().fg(result_color(&row.result)),
        ),
        Span::styled(source, Style::default().fg(Color::DarkGray)),
    ]);
    ListItem::new(line)
}

fn draw_results(frame: &mut Frame, area: Rect, app: &mut App) {
    let first_row = app.variant.layout().output_first_row as usize + 1;
    let items: Vec<ListItem> = app
        .report
        .as_ref()
        .map(|r| {
            r.table
                .rows
                .iter()
                .enumerate()
                .map(|(i, row)| format_row_item(first_row + i, row))
                .collect()
        })
        .unwrap_or_default();
    let list = List::new(items)
        .block(
            Block::default()
                .title(" Results (template rows) ")
                .borders(Borders::ALL)
                .border_style(Style::default().fg(Color::DarkGray)),
        )
        .highlight_style(
            Style::default()
                .add_modifier(Modifier::REVERSED)
                .add_modifier(Modifier::BOLD),
        )
        .highlight_symbol("▶ ");
    frame.render_stateful_widget(list, area, &mut app.list_state);
}

fn draw_footer(frame: &mut Frame, area: Rect, app: &App) {
    if let Some(status) = app.status_message() {
        let footer = Paragraph::new(status)
            .style(
                Style::default()
                    .fg(Color::Green)
                    .add_modifier(Modifier::BOLD),
            )
            .alignment(Alignment::Center)
            .block(Block::default().borders(Borders::ALL));
        frame.render_widget(footer, area);
        return;
    }
    let (hints, style) = match app.input_mode {
        InputMode::Editing => (
            "Typing │ Enter/Esc:done │ Backspace:delete",
            Style::default().fg(Color::Cyan),
        ),
        InputMode::Normal if app.can_save() => (
            "Tab:field │ e:edit │ v:variant │ Enter:generate │ ↑/↓:rows │ s:save │ q:quit",
            Style::default().fg(Color::DarkGray),
        ),
        InputMode::Normal => (
            "Tab:field │ e:edit │ v:variant │ Enter:generate │ q:quit",
            Style::default().fg(Color::DarkGray),
        ),
    };
    let footer = Paragraph::new(hints)
        .style(style)
        .alignment(Alignment::Center)
        .block(Block::default().borders(Borders::ALL));
    frame.render_widget(footer, area);
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::{Reading, ResultValue};

    #[test]
    fn format_row_item_shows_key_and_source() {
        let row = MatchedRow {
            key: "lead".into(),
            source: Some("Lead (total)".into()),
            result: ResultValue::Parsed(Reading::parse("<0.5", true).unwrap()),
        };
        let item = format!("{:?}", format_row_item(15, &row));
        assert!(item.contains("lead"));
        assert!(item.contains("<0.5"));
        assert!(item.contains("Lead (total)"));
        assert!(item.contains(" 15 "));
    }

    #[test]
    fn format_row_item_placeholder() {
        let item = format!("{:?}", format_row_item(3, &MatchedRow::placeholder()));
        assert!(item.contains('—'));
    }
}
