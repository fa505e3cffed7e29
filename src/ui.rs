use ratatui::{
    Frame,
    layout::{Constraint, Layout, Rect},
    style::Stylize,
    text::{Line, Span},
    widgets::{Block, Clear, Paragraph},
};

use crate::inputter::InputResult;
use crate::model::{Model, UiData};
use crate::records::{DeskView, Market, Sport};
use crate::wizard::{ScopeFocus, WizardSnapshot, WizardStep};

pub const TITLE_HEIGHT: usize = 1;
pub const TABLE_HEADER_HEIGHT: usize = 1;
pub const CMDLINE_HEIGHT: usize = 1;
pub const COLUMN_GAP: usize = 1;
pub const COLUMN_WIDTH_MARGIN: usize = 2;

/// Draws whatever the model prepared. All sizing decisions were made
/// during refresh; this only turns UiData into widgets.
#[derive(Default)]
pub struct DeskUi;

impl DeskUi {
    pub fn new() -> Self {
        DeskUi
    }

    pub fn draw(&self, model: &Model, frame: &mut Frame) {
        let uidata = model.get_uidata();
        let [title_area, header_area, table_area, cmd_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT as u16),
            Constraint::Length(TABLE_HEADER_HEIGHT as u16),
            Constraint::Min(0),
            Constraint::Length(CMDLINE_HEIGHT as u16),
        ])
        .areas(frame.area());

        frame.render_widget(Paragraph::new(title_line(uidata)), title_area);
        frame.render_widget(Paragraph::new(header_line(uidata)), header_area);
        frame.render_widget(Paragraph::new(table_lines(uidata)), table_area);
        draw_cmdline(frame, cmd_area, uidata);

        if uidata.show_popup {
            draw_popup(frame, &uidata.popup_message);
        }
        if let Some(wizard) = &uidata.wizard {
            draw_wizard(frame, wizard);
        }
    }
}

fn title_line(uidata: &UiData) -> Line<'static> {
    let mut spans: Vec<Span> = vec![" ".into()];
    for (pos, view) in DeskView::ALL.iter().enumerate() {
        let label = format!("{}:{}", pos + 1, view.label());
        if *view == uidata.view {
            spans.push(label.bold().reversed());
        } else {
            spans.push(label.dim());
        }
        spans.push("  ".into());
    }
    let position = if uidata.nrows == 0 {
        format!("{} (0 rows)", uidata.name)
    } else {
        format!(
            "{} ({}/{} rows)",
            uidata.name,
            uidata.abs_selected_row + 1,
            uidata.nrows
        )
    };
    spans.push(position.bold());
    Line::from(spans)
}

fn header_line(uidata: &UiData) -> Line<'static> {
    let mut spans: Vec<Span> = Vec::new();
    if uidata.layout.index_width > 0 {
        spans.push(pad(&uidata.index.name, uidata.layout.index_width).dim());
        spans.push(" ".into());
    }
    for (cidx, column) in uidata.table.iter().enumerate() {
        let text = pad(&column.name, column.width);
        if cidx == uidata.selected_column {
            spans.push(text.bold().underlined());
        } else {
            spans.push(text.bold());
        }
        spans.push(" ".into());
    }
    Line::from(spans)
}

fn table_lines(uidata: &UiData) -> Vec<Line<'static>> {
    let nrows = uidata
        .table
        .first()
        .map(|column| column.data.len())
        .unwrap_or(0);
    let mut lines = Vec::with_capacity(nrows);
    for ridx in 0..nrows {
        let selected = ridx == uidata.selected_row;
        let mut spans: Vec<Span> = Vec::new();
        if uidata.layout.index_width > 0 {
            let cell = pad(
                uidata.index.data.get(ridx).map(String::as_str).unwrap_or(""),
                uidata.layout.index_width,
            );
            spans.push(if selected {
                cell.dim().reversed()
            } else {
                cell.dim()
            });
            spans.push(" ".into());
        }
        for (cidx, column) in uidata.table.iter().enumerate() {
            let cell = pad(
                column.data.get(ridx).map(String::as_str).unwrap_or(""),
                column.width,
            );
            let span = match (selected, cidx == uidata.selected_column) {
                (true, true) => cell.bold().reversed(),
                (true, false) => cell.reversed(),
                (false, _) => cell.into(),
            };
            spans.push(span);
            spans.push(if selected { " ".reversed() } else { " ".into() });
        }
        lines.push(Line::from(spans));
    }
    lines
}

fn draw_cmdline(frame: &mut Frame, area: Rect, uidata: &UiData) {
    if uidata.active_cmdinput {
        frame.render_widget(Paragraph::new(input_line(&uidata.cmdinput)), area);
        return;
    }

    let query_width = uidata.query_line.chars().count().min(u16::MAX as usize) as u16;
    let [status_area, query_area] = Layout::horizontal([
        Constraint::Min(0),
        Constraint::Length(query_width.saturating_add(1)),
    ])
    .areas(area);

    frame.render_widget(
        Paragraph::new(Line::from(format!(" {}", uidata.status_message))),
        status_area,
    );
    if !uidata.query_line.is_empty() {
        frame.render_widget(
            Paragraph::new(Line::from(uidata.query_line.clone().dim().italic())),
            query_area,
        );
    }
}

/// Prompt plus the collected text with the cursor cell reversed.
fn input_line(input: &InputResult) -> Line<'static> {
    let chars: Vec<char> = input.input.chars().collect();
    let before: String = chars.iter().take(input.cursor_pos).collect();
    let at: String = chars
        .get(input.cursor_pos)
        .map(|chr| chr.to_string())
        .unwrap_or_else(|| " ".to_string());
    let after: String = chars.iter().skip(input.cursor_pos + 1).collect();
    Line::from(vec![
        format!(" {}: ", input.prompt).bold(),
        before.into(),
        at.reversed(),
        after.into(),
    ])
}

fn draw_popup(frame: &mut Frame, message: &str) {
    let width = message
        .lines()
        .map(|line| line.chars().count())
        .max()
        .unwrap_or(0) as u16
        + 4;
    let height = message.lines().count() as u16 + 2;
    let area = centered_rect(width, height, frame.area());
    frame.render_widget(Clear, area);

    let lines: Vec<Line> = message
        .lines()
        .map(|line| Line::from(line.to_string()))
        .collect();
    let block = Block::bordered().title(" keys ".bold());
    frame.render_widget(Paragraph::new(lines).block(block), area);
}

fn draw_wizard(frame: &mut Frame, wizard: &WizardSnapshot) {
    let area = centered_rect(56, 9, frame.area());
    frame.render_widget(Clear, area);
    let block = Block::bordered().title(" new margin rule ".bold());
    let inner = block.inner(area);
    frame.render_widget(block, area);

    let mut lines = Vec::new();
    match wizard.step {
        WizardStep::SelectScope => {
            lines.push(Line::from(" pick a scope".bold()));
            lines.push(Line::from(""));
            lines.push(option_row(
                " sport  ",
                Sport::ALL.iter().map(|sport| sport.label()),
                wizard.sport_idx,
                wizard.focus == ScopeFocus::Sport,
            ));
            lines.push(option_row(
                " market ",
                Market::ALL.iter().map(|market| market.label()),
                wizard.market_idx,
                wizard.focus == ScopeFocus::Market,
            ));
            lines.push(Line::from(""));
            let footer = if let Some(message) = &wizard.message {
                Line::from(format!(" {}", message).italic())
            } else if wizard.scope_taken {
                Line::from(" this scope already has a rule".italic())
            } else {
                Line::from(" arrows pick, Enter continue, Esc cancel".dim())
            };
            lines.push(footer);
        }
        WizardStep::SetValue => {
            lines.push(Line::from(
                format!(" margin for {} {}", wizard.sport, wizard.market).bold(),
            ));
            lines.push(Line::from(""));
            lines.push(input_line(&wizard.input));
            lines.push(Line::from(""));
            let footer = if let Some(message) = &wizard.message {
                Line::from(format!(" {}", message).italic())
            } else {
                Line::from(" Enter create, Esc back to scope".dim())
            };
            lines.push(footer);
        }
    }
    frame.render_widget(Paragraph::new(lines), inner);
}

fn option_row<'a>(
    title: &'static str,
    options: impl Iterator<Item = &'a str>,
    selected: usize,
    focused: bool,
) -> Line<'static> {
    let mut spans: Vec<Span> = Vec::new();
    spans.push(if focused { title.bold() } else { title.dim() });
    for (pos, option) in options.enumerate() {
        let text = format!(" {} ", option);
        let span = if pos == selected {
            if focused {
                text.bold().reversed()
            } else {
                text.reversed()
            }
        } else {
            text.into()
        };
        spans.push(span);
        spans.push(" ".into());
    }
    Line::from(spans)
}

fn pad(text: &str, width: usize) -> String {
    format!("{:<width$.width$}", text)
}

fn centered_rect(width: u16, height: u16, area: Rect) -> Rect {
    let x = area.x + (area.width.saturating_sub(width)) / 2;
    let y = area.y + (area.height.saturating_sub(height)) / 2;
    Rect::new(x, y, width.min(area.width), height.min(area.height))
}
