use std::sync::Arc;

use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use tracing::{debug, info, trace, warn};

use crate::domain::{CMDMode, HELP_TEXT, Message, NULL_PLACEHOLDER, TVConfig, TVError};
use crate::inputter::{InputResult, Inputter};
use crate::pager::{PageWindow, page_window};
use crate::pipeline::{self, QueryResult};
use crate::record::{RecordCollection, RowKey};
use crate::store::{RecordStore, StoreEvent};
use crate::view_state::ViewState;

pub const COLUMN_WIDTH_MIN: usize = 4;
pub const COLUMN_WIDTH_MAX: usize = 40;

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CMDINPUT,
}

/// What the table body shows.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum TableBody {
    Loading,
    NoMatches,
    Rows,
}

/// Everything the UI needs to draw one frame.
#[derive(Debug, Clone)]
pub struct UIData {
    pub name: String,
    pub headers: Vec<String>,
    pub widths: Vec<usize>,
    pub rows: Vec<Vec<String>>,
    pub row_keys: Vec<RowKey>,
    pub body: TableBody,
    pub selected_row: usize,
    pub selected_column: usize,
    pub filtered_count: usize,
    pub total_records: usize,
    pub total_pages: usize,
    pub pagination: PageWindow,
    pub search_text: String,
    pub loading: bool,
    pub show_popup: bool,
    pub popup_message: String,
    pub cmdinput: InputResult,
    pub cmd_mode: Option<CMDMode>,
    pub active_cmdinput: bool,
    pub status_message: String,
}

impl UIData {
    pub fn empty() -> Self {
        UIData {
            name: String::new(),
            headers: Vec::new(),
            widths: Vec::new(),
            rows: Vec::new(),
            row_keys: Vec::new(),
            body: TableBody::Loading,
            selected_row: 0,
            selected_column: 0,
            filtered_count: 0,
            total_records: 0,
            total_pages: 0,
            pagination: page_window(1, 0, 0),
            search_text: String::new(),
            loading: false,
            show_popup: false,
            popup_message: String::new(),
            cmdinput: InputResult::default(),
            cmd_mode: None,
            active_cmdinput: false,
            status_message: String::new(),
        }
    }
}

pub struct Model {
    config: TVConfig,
    pub status: Status,
    modus: Modus,
    store: RecordStore,
    view: ViewState,
    collection: Option<Arc<RecordCollection>>,
    query: QueryResult,
    selected_row: usize,
    selected_column: usize,
    selected_key: Option<RowKey>,
    ui_width: usize,
    uidata: UIData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    search_before_edit: String,
    page_before_edit: usize,
    last_input: InputResult,
    popup_message: String,
    status_message: String,
}

impl Model {
    pub fn init(config: &TVConfig, store: RecordStore, ui_width: usize) -> Self {
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            store,
            view: ViewState::default(),
            collection: None,
            query: QueryResult::Loading,
            selected_row: 0,
            selected_column: 0,
            selected_key: None,
            ui_width,
            uidata: UIData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            search_before_edit: String::new(),
            page_before_edit: 1,
            last_input: InputResult::default(),
            popup_message: String::new(),
            status_message: "Started rtv! Press : to open a resource.".to_string(),
        };
        model.recompute();
        model
    }

    pub fn get_uidata(&self) -> &UIData {
        &self.uidata
    }

    pub fn view(&self) -> &ViewState {
        &self.view
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    /// Select `resource`; a new resource starts with a fresh view state.
    pub fn open(&mut self, resource: &str) {
        let resource = resource.trim();
        if resource.is_empty() {
            return;
        }
        if self.store.select(resource) {
            self.view.reset();
            self.selected_row = 0;
            self.selected_column = 0;
            self.selected_key = None;
            self.set_status_message(format!("Loading {resource} ..."));
        }
        self.recompute();
    }

    /// Apply resolved fetches. Returns true if anything changed.
    pub fn tick(&mut self) -> bool {
        let events = self.store.poll();
        let changed = !events.is_empty();
        for event in events {
            self.apply_store_event(event);
        }
        changed
    }

    pub fn apply_store_event(&mut self, event: StoreEvent) {
        match event {
            StoreEvent::Loaded { resource, records } => {
                self.set_status_message(format!("Loaded {records} records from {resource}"));
            }
            StoreEvent::Failed { resource, error } => {
                self.set_status_message(format!("Failed to load {resource}: {error}"));
            }
            StoreEvent::Discarded { resource } => {
                trace!("Ignoring stale data for {resource}");
                return;
            }
        }
        self.recompute();
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), TVError> {
        if self.tick() {
            trace!("Store changed before handling {message:?}");
        }

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::MoveUp => self.move_selection_up(),
                    Message::MoveDown => self.move_selection_down(),
                    Message::MoveLeft => self.move_selection_left(),
                    Message::MoveRight => self.move_selection_right(),
                    Message::NextPage => self.next_page(),
                    Message::PreviousPage => self.previous_page(),
                    Message::FirstPage => self.go_to_page(1),
                    Message::LastPage => self.go_to_page(self.total_pages().max(1)),
                    Message::GoToPage(page) => self.go_to_page(page),
                    Message::Sort => self.sort_selected_column(),
                    Message::SortBy(field) => self.sort_by(&field),
                    Message::Search => self.enter_cmd_mode(CMDMode::Search),
                    Message::SearchChanged(text) => self.set_search(text),
                    Message::EnterCommand => self.enter_cmd_mode(CMDMode::Resource),
                    Message::SelectResource(resource) => self.open(&resource),
                    Message::Reload => self.reload(),
                    Message::CopyCell => self.copy_cell(),
                    Message::CopyRow => self.copy_row(),
                    Message::Help => self.show_help(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    Message::Exit | Message::RawKey(_) => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Help => self.close_popup(),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
                Modus::CMDINPUT => match msg {
                    Message::RawKey(key) => self.raw_input(key),
                    Message::Resize(width, height) => self.ui_resize(width, height),
                    _ => (),
                },
            }
        }
        Ok(())
    }

    fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        debug!("Status: {}", self.status_message);
        self.update_uidata();
    }

    fn total_pages(&self) -> usize {
        self.query.page().map(|p| p.total_pages).unwrap_or(0)
    }

    fn page_rows(&self) -> &[usize] {
        self.query.page().map(|p| p.rows.as_slice()).unwrap_or(&[])
    }

    // Re-run the pipeline and rebuild the ui snapshot.
    fn recompute(&mut self) {
        self.collection = self.store.collection();
        self.query = pipeline::derive(
            self.collection.as_deref(),
            &self.view,
            self.config.page_size,
        );
        if self.config.clamp_page
            && let QueryResult::Page(slice) = &self.query
            && self.view.clamp_page(slice.total_pages)
        {
            debug!("Clamped page to {}", self.view.current_page());
            self.query = pipeline::derive(
                self.collection.as_deref(),
                &self.view,
                self.config.page_size,
            );
        }
        self.restore_selection();
        self.update_uidata();
    }

    // Keep the cursor on the same record if it is still on the page.
    fn restore_selection(&mut self) {
        let keys = self.page_keys();
        if let Some(pos) = self
            .selected_key
            .as_ref()
            .and_then(|key| keys.iter().position(|k| k == key))
        {
            self.selected_row = pos;
        } else {
            self.selected_row = self.selected_row.min(keys.len().saturating_sub(1));
        }
        self.selected_key = keys.get(self.selected_row).cloned();

        let columns = self
            .collection
            .as_ref()
            .map(|c| c.schema().len())
            .unwrap_or(0);
        self.selected_column = self.selected_column.min(columns.saturating_sub(1));
    }

    fn page_keys(&self) -> Vec<RowKey> {
        match &self.collection {
            Some(collection) => self
                .page_rows()
                .iter()
                .map(|&idx| collection.row_key(idx))
                .collect(),
            None => Vec::new(),
        }
    }

    fn update_uidata(&mut self) {
        let mut uidata = UIData {
            name: self.store.resource().unwrap_or_default().to_string(),
            selected_row: self.selected_row,
            selected_column: self.selected_column,
            pagination: page_window(
                self.view.current_page(),
                self.total_pages(),
                self.config.window_size,
            ),
            search_text: self.view.search_text().to_string(),
            loading: self.store.is_loading(),
            show_popup: self.modus == Modus::POPUP,
            popup_message: self.popup_message.clone(),
            cmdinput: self.last_input.clone(),
            cmd_mode: self.cmd_mode,
            active_cmdinput: self.modus == Modus::CMDINPUT,
            status_message: self.status_message.clone(),
            ..UIData::empty()
        };

        if let (Some(collection), QueryResult::Page(slice)) = (&self.collection, &self.query) {
            let schema = collection.schema();
            uidata.headers = schema
                .fields()
                .iter()
                .map(|field| match self.view.sort_field() {
                    Some(sorted) if sorted == field => {
                        format!("{field} {}", self.view.sort_direction().arrow())
                    }
                    _ => field.clone(),
                })
                .collect();
            uidata.rows = slice
                .rows
                .iter()
                .map(|&idx| {
                    let record = &collection.records()[idx];
                    schema
                        .fields()
                        .iter()
                        .map(|f| record.get(f).display(NULL_PLACEHOLDER))
                        .collect()
                })
                .collect();
            uidata.row_keys = slice.rows.iter().map(|&idx| collection.row_key(idx)).collect();
            uidata.widths = self.column_widths(&uidata.headers, &uidata.rows);
            uidata.body = if slice.is_no_match() {
                TableBody::NoMatches
            } else {
                TableBody::Rows
            };
            uidata.filtered_count = slice.filtered_count;
            uidata.total_records = collection.len();
            uidata.total_pages = slice.total_pages;
        }
        self.uidata = uidata;
    }

    fn column_widths(&self, headers: &[String], rows: &[Vec<String>]) -> Vec<usize> {
        let cap = if headers.is_empty() {
            COLUMN_WIDTH_MAX
        } else {
            (self.ui_width / headers.len()).clamp(COLUMN_WIDTH_MIN, COLUMN_WIDTH_MAX)
        };
        headers
            .iter()
            .enumerate()
            .map(|(col, header)| {
                rows.iter()
                    .map(|row| row[col].chars().count())
                    .chain(std::iter::once(header.chars().count()))
                    .max()
                    .unwrap_or(0)
                    .clamp(COLUMN_WIDTH_MIN, cap)
            })
            .collect()
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!("UI was resized! w:{}->{}, h:{}", self.ui_width, width, height);
        self.ui_width = width;
        self.update_uidata();
    }

    // -------------------- Control handling functions ---------------------- //

    fn set_search(&mut self, text: String) {
        if text == self.view.search_text() {
            return;
        }
        trace!("Searching for {text:?}");
        self.view.set_search_text(text);
        self.recompute();
    }

    fn sort_selected_column(&mut self) {
        let field = self
            .collection
            .as_ref()
            .and_then(|c| c.schema().fields().get(self.selected_column).cloned());
        match field {
            Some(field) => self.sort_by(&field),
            None => self.set_status_message("Nothing to sort"),
        }
    }

    fn sort_by(&mut self, field: &str) {
        let known = self
            .collection
            .as_ref()
            .and_then(|c| c.schema().position(field));
        let Some(column) = known else {
            warn!("Cannot sort by unknown field {field}");
            self.set_status_message(format!("Unknown field {field}"));
            return;
        };
        self.view.toggle_sort(field);
        self.selected_column = column;
        info!("Sorting by {field} {}", self.view.sort_direction());
        self.status_message = format!("Sorted by {field} ({})", self.view.sort_direction());
        self.recompute();
    }

    fn go_to_page(&mut self, page: usize) {
        let total = self.total_pages();
        if page == 0 || page > total.max(1) {
            self.set_status_message(format!("No page {page} (1-{total})"));
            return;
        }
        self.view.go_to_page(page);
        self.selected_row = 0;
        self.selected_key = None;
        self.recompute();
    }

    fn next_page(&mut self) {
        let window = &self.uidata.pagination;
        if window.next.enabled {
            let target = window.next.target;
            self.go_to_page(target);
        }
    }

    fn previous_page(&mut self) {
        let window = &self.uidata.pagination;
        if window.previous.enabled {
            let target = window.previous.target;
            self.go_to_page(target);
        }
    }

    fn reload(&mut self) {
        if self.store.reload() {
            self.set_status_message("Reloading ...");
        } else {
            self.set_status_message("No resource selected");
        }
    }

    fn move_selection_up(&mut self) {
        self.selected_row = self.selected_row.saturating_sub(1);
        self.selected_key = self.page_keys().get(self.selected_row).cloned();
        self.update_uidata();
    }

    fn move_selection_down(&mut self) {
        let rows = self.page_rows().len();
        if self.selected_row + 1 < rows {
            self.selected_row += 1;
        }
        self.selected_key = self.page_keys().get(self.selected_row).cloned();
        self.update_uidata();
    }

    fn move_selection_left(&mut self) {
        self.selected_column = self.selected_column.saturating_sub(1);
        self.update_uidata();
    }

    fn move_selection_right(&mut self) {
        if self.selected_column + 1 < self.uidata.headers.len() {
            self.selected_column += 1;
        }
        self.update_uidata();
    }

    fn selected_row_cells(&self) -> Option<&Vec<String>> {
        self.uidata.rows.get(self.selected_row)
    }

    fn copy_cell(&mut self) {
        let cell = self
            .selected_row_cells()
            .and_then(|row| row.get(self.selected_column))
            .cloned();
        if let Some(cell) = cell {
            trace!("Cell content: {}", cell);
            self.copy_to_clipboard(cell);
        }
    }

    fn copy_row(&mut self) {
        if let Some(row) = self.selected_row_cells() {
            let content = row_as_csv(row);
            self.copy_to_clipboard(content);
        }
    }

    fn copy_to_clipboard(&mut self, text: String) {
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(clipboard) => self.clipboard = Some(clipboard),
                Err(e) => {
                    warn!("Clipboard unavailable: {e:?}");
                    self.set_status_message("Clipboard unavailable");
                    return;
                }
            }
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            return;
        };
        match clipboard.set_text(text) {
            Ok(_) => self.set_status_message("Copied to clipboard"),
            Err(e) => {
                warn!("Error copying to clipboard: {e:?}");
                self.set_status_message("Copy failed");
            }
        }
    }

    fn show_help(&mut self) {
        self.popup_message = HELP_TEXT.to_string();
        self.modus = Modus::POPUP;
        self.update_uidata();
    }

    fn close_popup(&mut self) {
        self.modus = Modus::TABLE;
        self.update_uidata();
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        self.cmd_mode = Some(mode);
        self.modus = Modus::CMDINPUT;
        match mode {
            CMDMode::Search => {
                self.search_before_edit = self.view.search_text().to_string();
                self.page_before_edit = self.view.current_page();
                self.input.set(&self.search_before_edit);
            }
            CMDMode::Resource => self.input.clear(),
        }
        self.last_input = self.input.get();
        self.update_uidata();
    }

    fn raw_input(&mut self, key: KeyEvent) {
        self.last_input = self.input.read(key);
        let input = self.last_input.clone();

        match self.cmd_mode {
            Some(CMDMode::Search) => {
                if input.canceled {
                    let previous = self.search_before_edit.clone();
                    self.set_search(previous);
                    self.view.go_to_page(self.page_before_edit);
                    self.recompute();
                } else {
                    // Search is live, every keystroke filters.
                    self.set_search(input.input.clone());
                }
            }
            Some(CMDMode::Resource) if input.finished && !input.canceled => {
                self.handle_command(input.input.trim());
            }
            _ => {}
        }

        if input.finished {
            self.modus = Modus::TABLE;
            self.cmd_mode = None;
            self.input.clear();
            self.last_input = InputResult::default();
        }
        self.update_uidata();
    }

    fn handle_command(&mut self, command: &str) {
        if command.is_empty() {
            return;
        }
        match command.parse::<usize>() {
            Ok(page) => self.go_to_page(page),
            Err(_) => self.open(command),
        }
    }
}

/// Join cells as one csv line, quoting where needed.
pub fn row_as_csv(cells: &[String]) -> String {
    cells
        .iter()
        .map(|c| wrap_cell_content(c))
        .collect::<Vec<String>>()
        .join(",")
}

fn wrap_cell_content(c: &str) -> String {
    let needs_escaping = c.contains('"');
    let needs_wrapping =
        needs_escaping || c.chars().any(|c| matches!(c, ' ' | '\t' | ',' | '\n'));
    let mut out = String::from(c);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}
