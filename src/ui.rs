use ratatui::{
    Frame,
    layout::{Alignment, Constraint, Flex, Layout, Position, Rect},
    style::{Modifier, Style, Stylize},
    text::{Line, Span},
    widgets::{Block, Cell, Clear, Paragraph, Row, Table, TableState, Wrap},
};

use crate::domain::{CMDMode, TVConfig};
use crate::model::{Model, TableBody, UIData};
use crate::pager::{PageToken, PageWindow};

pub const CMDLINE_HEIGH: u16 = 1;
pub const PAGINATION_HEIGHT: u16 = 1;
pub const TITLE_HEIGHT: u16 = 1;
pub const COLUMN_SPACING: u16 = 2;

#[derive(Debug)]
pub struct TableUI {
    column_spacing: u16,
}

impl TableUI {
    pub fn new(_cfg: &TVConfig) -> Self {
        Self {
            column_spacing: COLUMN_SPACING,
        }
    }

    pub fn draw(&mut self, model: &Model, frame: &mut Frame) {
        let data = model.get_uidata();
        let [title_area, table_area, pager_area, cmd_area] = Layout::vertical([
            Constraint::Length(TITLE_HEIGHT),
            Constraint::Min(1),
            Constraint::Length(PAGINATION_HEIGHT),
            Constraint::Length(CMDLINE_HEIGH),
        ])
        .areas(frame.area());

        frame.render_widget(Paragraph::new(title_line(data)), title_area);
        self.render_table(data, frame, table_area);
        frame.render_widget(
            Paragraph::new(pagination_line(&data.pagination)).alignment(Alignment::Center),
            pager_area,
        );
        render_cmdline(data, frame, cmd_area);

        if data.show_popup {
            render_popup(&data.popup_message, frame);
        }
    }

    fn render_table(&self, data: &UIData, frame: &mut Frame, area: Rect) {
        if data.body == TableBody::Loading {
            let [middle] = Layout::vertical([Constraint::Length(1)])
                .flex(Flex::Center)
                .areas(area);
            frame.render_widget(Paragraph::new("Loading").centered().bold(), middle);
            return;
        }

        let header = Row::new(data.headers.iter().map(|h| Cell::from(h.as_str())))
            .style(Style::new().bold().underlined());
        let widths = data
            .widths
            .iter()
            .map(|&w| Constraint::Length(w as u16));

        if data.body == TableBody::NoMatches {
            let table = Table::new(Vec::<Row>::new(), widths)
                .header(header)
                .column_spacing(self.column_spacing);
            frame.render_widget(table, area);
            let [_, message] =
                Layout::vertical([Constraint::Length(2), Constraint::Length(1)]).areas(area);
            frame.render_widget(Paragraph::new("No matching records").centered().italic(), message);
            return;
        }

        let rows = data
            .rows
            .iter()
            .map(|r| Row::new(r.iter().map(|c| Cell::from(c.as_str()))));
        let table = Table::new(rows, widths)
            .header(header)
            .column_spacing(self.column_spacing)
            .row_highlight_style(Style::new().add_modifier(Modifier::REVERSED))
            .cell_highlight_style(Style::new().bold().yellow());

        let mut state = TableState::default()
            .with_selected(Some(data.selected_row))
            .with_selected_column(Some(data.selected_column));
        frame.render_stateful_widget(table, area, &mut state);
    }
}

fn title_line(data: &UIData) -> Line<'_> {
    let mut spans = vec![
        " rtv ".bold().reversed(),
        " ".into(),
        if data.name.is_empty() {
            "no resource".dim()
        } else {
            data.name.as_str().yellow().bold()
        },
    ];
    if data.loading {
        spans.push(" loading…".dim());
    }
    if !data.search_text.is_empty() {
        spans.push("  search: ".into());
        spans.push(data.search_text.as_str().cyan());
    }
    if data.body != TableBody::Loading {
        spans.push(format!("  {} of {} records", data.filtered_count, data.total_records).dim());
    }
    Line::from(spans)
}

/// Previous control, page tokens and next control as one line.
pub fn pagination_line(window: &PageWindow) -> Line<'static> {
    let nav = |label: &'static str, enabled: bool| {
        if enabled {
            Span::raw(label)
        } else {
            Span::raw(label).dim()
        }
    };

    let mut spans = vec![nav("‹ Previous", window.previous.enabled), Span::raw(" ")];
    for token in &window.tokens {
        let text = format!(" {token} ");
        if window.is_current(*token) {
            spans.push(Span::raw(text).reversed().bold());
        } else if *token == PageToken::Ellipsis {
            spans.push(Span::raw(text).dim());
        } else {
            spans.push(Span::raw(text));
        }
    }
    spans.push(Span::raw(" "));
    spans.push(nav("Next ›", window.next.enabled));
    Line::from(spans)
}

fn render_cmdline(data: &UIData, frame: &mut Frame, area: Rect) {
    if data.active_cmdinput {
        let prefix = match data.cmd_mode {
            Some(CMDMode::Search) => "/",
            Some(CMDMode::Resource) | None => ":",
        };
        let line = Line::from(vec![prefix.bold(), data.cmdinput.input.as_str().into()]);
        frame.render_widget(Paragraph::new(line), area);
        frame.set_cursor_position(Position::new(cursor_column(data, area), area.y));
    } else {
        frame.render_widget(
            Paragraph::new(data.status_message.as_str()).dim(),
            area,
        );
    }
}

// Cursor column after the prefix, kept inside the command line.
fn cursor_column(data: &UIData, area: Rect) -> u16 {
    let before_cursor = data
        .cmdinput
        .curser_pos
        .min(data.cmdinput.input.chars().count());
    let offset = u16::try_from(before_cursor)
        .unwrap_or(u16::MAX)
        .saturating_add(1)
        .min(area.width.saturating_sub(1));
    area.x.saturating_add(offset)
}

fn render_popup(message: &str, frame: &mut Frame) {
    let area = popup_area(frame.area(), 60, 70);
    frame.render_widget(Clear, area);
    frame.render_widget(
        Paragraph::new(message)
            .wrap(Wrap { trim: false })
            .block(Block::bordered().title(" Help ".bold())),
        area,
    );
}

fn popup_area(area: Rect, percent_x: u16, percent_y: u16) -> Rect {
    let [area] = Layout::vertical([Constraint::Percentage(percent_y)])
        .flex(Flex::Center)
        .areas(area);
    let [area] = Layout::horizontal([Constraint::Percentage(percent_x)])
        .flex(Flex::Center)
        .areas(area);
    area
}
