use arboard::Clipboard;
use ratatui::crossterm::event::KeyEvent;
use std::collections::BTreeMap;
use tracing::trace;

use crate::domain::{CmdMode, DeskConfig, DeskError, HELP_TEXT, Message};
use crate::inputter::{InputResult, Inputter};
use crate::query::{self, FieldValue, FilterSet, Row, SortOrder, SortSpec};
use crate::records::{AlertStatus, DeskView, MarginRule};
use crate::store::DeskStore;
use crate::ui::{CMDLINE_HEIGHT, COLUMN_GAP, COLUMN_WIDTH_MARGIN, TABLE_HEADER_HEIGHT, TITLE_HEIGHT};
use crate::wizard::{MarginWizard, WizardOutcome, WizardSnapshot};

#[derive(Debug, PartialEq)]
pub enum Status {
    Ready,
    Quitting,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    Table,
    Record,
    Breakdown,
    Wizard,
    Popup,
    CmdInput,
}

/// One rendered column, clipped to the visible window.
#[derive(Clone)]
pub struct ColumnView {
    pub name: String,
    pub width: usize,
    pub data: Vec<String>,
}

impl ColumnView {
    fn empty() -> Self {
        ColumnView {
            name: String::new(),
            width: 0,
            data: Vec::new(),
        }
    }
}

/// Query and cursor state of one desk view. The row mapping is the
/// pipeline output: positions into the store's collection order. It is
/// recomputed from the records on every refresh, never cached across
/// changes.
struct ViewState {
    filters: FilterSet,
    search: String,
    sort: Option<SortSpec>,
    rows: Vec<usize>,
    cursor_row: usize,
    offset_row: usize,
    cursor_column: usize,
    offset_column: usize,
    visible_columns: usize,
    show_index: bool,
}

impl ViewState {
    fn empty() -> Self {
        ViewState {
            filters: FilterSet::new(),
            search: String::new(),
            sort: None,
            rows: Vec::new(),
            cursor_row: 0,
            offset_row: 0,
            cursor_column: 0,
            offset_column: 0,
            visible_columns: 0,
            show_index: false,
        }
    }
}

struct RecordState {
    record_pos: usize,
    cursor_row: usize,
    offset_row: usize,
}

impl RecordState {
    fn empty() -> Self {
        RecordState {
            record_pos: 0,
            cursor_row: 0,
            offset_row: 0,
        }
    }
}

struct BreakdownState {
    field: &'static str,
    entries: Vec<(String, usize)>,
    cursor_row: usize,
    offset_row: usize,
}

impl BreakdownState {
    fn empty() -> Self {
        BreakdownState {
            field: "",
            entries: Vec::new(),
            cursor_row: 0,
            offset_row: 0,
        }
    }
}

/// Everything the ui needs to draw one frame.
pub struct UiData {
    pub view: DeskView,
    pub name: String,
    pub table: Vec<ColumnView>,
    pub index: ColumnView,
    pub nrows: usize,
    pub selected_row: usize,
    pub selected_column: usize,
    pub abs_selected_row: usize,
    pub show_popup: bool,
    pub popup_message: String,
    pub layout: UiLayout,
    pub cmdinput: InputResult,
    pub active_cmdinput: bool,
    pub wizard: Option<WizardSnapshot>,
    pub status_message: String,
    pub query_line: String,
}

impl UiData {
    pub fn empty() -> Self {
        UiData {
            view: DeskView::Fixtures,
            name: String::new(),
            table: Vec::new(),
            index: ColumnView::empty(),
            nrows: 0,
            selected_row: 0,
            selected_column: 0,
            abs_selected_row: 0,
            show_popup: false,
            popup_message: String::new(),
            layout: UiLayout::default(),
            cmdinput: InputResult::default(),
            active_cmdinput: false,
            wizard: None,
            status_message: String::new(),
            query_line: String::new(),
        }
    }
}

#[derive(Default, Clone, Debug)]
pub struct UiLayout {
    pub width: usize,
    pub height: usize,
    pub table_width: usize,
    pub table_height: usize,
    pub index_width: usize,
}

impl UiLayout {
    pub fn from_values(index_width: usize, ui_width: usize, ui_height: usize) -> Self {
        let table_width = ui_width.saturating_sub(index_width);
        let table_height =
            ui_height.saturating_sub(TITLE_HEIGHT + TABLE_HEADER_HEIGHT + CMDLINE_HEIGHT);
        let layout = UiLayout {
            width: ui_width,
            height: ui_height,
            table_width,
            table_height,
            index_width,
        };
        trace!("Build UiLayout: {:?}", layout);
        layout
    }
}

pub struct Model {
    config: DeskConfig,
    pub status: Status,
    modus: Modus,
    previous_modus: Modus,
    store: DeskStore,
    current_view: DeskView,
    views: [ViewState; 5],
    record: RecordState,
    breakdown: BreakdownState,
    wizard: Option<MarginWizard>,
    uilayout: UiLayout,
    uidata: UiData,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CmdMode>,
    last_input: InputResult,
    active_cmdinput: bool,
    status_message: String,
}

impl Model {
    pub fn new(config: &DeskConfig, store: DeskStore, ui_width: usize, ui_height: usize) -> Model {
        let mut model = Model {
            config: config.clone(),
            status: Status::Ready,
            modus: Modus::Table,
            previous_modus: Modus::Table,
            current_view: config.start_view,
            views: std::array::from_fn(|_| ViewState::empty()),
            record: RecordState::empty(),
            breakdown: BreakdownState::empty(),
            wizard: None,
            store,
            uilayout: UiLayout::from_values(0, ui_width, ui_height),
            uidata: UiData::empty(),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            active_cmdinput: false,
            status_message: String::new(),
        };
        model.refresh();
        let active_alerts = model
            .store
            .alerts
            .iter()
            .filter(|alert| alert.status == AlertStatus::Active)
            .count();
        model.set_status_message(format!(
            "{} fixtures, {} active alerts",
            model.store.fixtures.len(),
            active_alerts
        ));
        model
    }

    pub fn get_uidata(&self) -> &UiData {
        &self.uidata
    }

    /// While the command line or the wizard's value step is collecting
    /// text, the controller forwards key events unmapped.
    pub fn raw_keyevents(&self) -> bool {
        self.active_cmdinput
            || self
                .wizard
                .as_ref()
                .is_some_and(MarginWizard::wants_raw_keys)
    }

    pub fn quit(&mut self) {
        self.status = Status::Quitting;
    }

    pub fn update(&mut self, message: Message) -> Result<(), DeskError> {
        match self.modus {
            Modus::Table => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_table_selection_up(1),
                Message::MoveDown => self.move_table_selection_down(1),
                Message::MoveLeft => self.move_table_selection_left(),
                Message::MoveRight => self.move_table_selection_right(),
                Message::MovePageUp => self.move_table_selection_up(self.uilayout.table_height),
                Message::MovePageDown => self.move_table_selection_down(self.uilayout.table_height),
                Message::MoveBeginning => self.move_table_selection_beginning(),
                Message::MoveEnd => self.move_table_selection_end(),
                Message::ShowView(view) => self.show_view(view),
                Message::Enter => self.enter(),
                Message::Exit => self.exit(),
                Message::Help => self.show_help(),
                Message::Search => self.enter_cmd_mode(CmdMode::SearchTable),
                Message::Filter => self.enter_cmd_mode(CmdMode::FilterColumn),
                Message::SortAscending => self.sort_current_column(true),
                Message::SortDescending => self.sort_current_column(false),
                Message::ClearSort => self.clear_sort(),
                Message::ToggleIndex => self.toggle_table_index(),
                Message::CopyCell => self.copy_table_cell(),
                Message::CopyRow => self.copy_table_row(),
                Message::Breakdown => self.build_breakdown(),
                Message::NewRule => self.start_wizard(),
                Message::Acknowledge => self.acknowledge_selected(),
                Message::Remove => self.remove_selected(),
                Message::Toggle => self.toggle_selected(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::Record => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_record_selection_up(1),
                Message::MoveDown => self.move_record_selection_down(1),
                Message::MovePageUp => self.move_record_selection_up(10),
                Message::MovePageDown => self.move_record_selection_down(10),
                Message::MoveLeft => self.previous_record(),
                Message::MoveRight => self.next_record(),
                Message::CopyCell => self.copy_record_cell(),
                Message::Help => self.show_help(),
                Message::Exit => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::Breakdown => match message {
                Message::Quit => self.quit(),
                Message::MoveUp => self.move_breakdown_selection_up(1),
                Message::MoveDown => self.move_breakdown_selection_down(1),
                Message::MovePageUp => self.move_breakdown_selection_up(10),
                Message::MovePageDown => self.move_breakdown_selection_down(10),
                Message::Enter => self.enter(),
                Message::Exit => self.exit(),
                Message::Help => self.show_help(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::Wizard => match message {
                Message::Quit => self.quit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                Message::RawKey(key) => self.wizard_key(key),
                other => self.wizard_message(other),
            },
            Modus::Popup => match message {
                Message::Quit => self.quit(),
                Message::Exit => self.exit(),
                Message::Resize(width, height) => self.ui_resize(width, height),
                _ => (),
            },
            Modus::CmdInput => {
                if let Message::RawKey(key) = message {
                    self.raw_input(key);
                }
            }
        }
        Ok(())
    }

    // ------------------------- View refreshing ------------------------- //

    fn view(&self) -> &ViewState {
        &self.views[self.current_view.index()]
    }

    fn view_mut(&mut self) -> &mut ViewState {
        &mut self.views[self.current_view.index()]
    }

    fn current_field(&self) -> &'static str {
        let columns = self.current_view.columns();
        let state = self.view();
        let idx = (state.offset_column + state.cursor_column).min(columns.len() - 1);
        columns[idx]
    }

    fn refresh(&mut self) {
        match self.modus {
            Modus::Table | Modus::CmdInput | Modus::Wizard => self.refresh_table(),
            Modus::Record => self.refresh_record(),
            Modus::Breakdown => self.refresh_breakdown(),
            Modus::Popup => {}
        }
    }

    fn refresh_table(&mut self) {
        let view = self.current_view;
        let columns = view.columns();
        let all_rows = self.store.rows_for(view);

        let show_index = self.views[view.index()].show_index;
        let index_width = if show_index {
            self.store.len_of(view).to_string().len() + COLUMN_WIDTH_MARGIN
        } else {
            0
        };
        self.uilayout = UiLayout::from_values(index_width, self.uilayout.width, self.uilayout.height);
        let table_width = self.uilayout.table_width;
        let table_height = self.uilayout.table_height.max(1);
        let max_column_width = self.config.max_column_width;

        let state = &mut self.views[view.index()];
        state.rows = query::apply(&all_rows, &state.filters, &state.search, state.sort.as_ref());
        let nrows = state.rows.len();

        // Clamp the cursor and keep it inside the visible window.
        if nrows == 0 {
            state.cursor_row = 0;
            state.offset_row = 0;
        } else {
            state.cursor_row = state.cursor_row.min(nrows - 1);
            state.offset_row = state.offset_row.min(state.cursor_row);
            if state.cursor_row >= state.offset_row + table_height {
                state.offset_row = state.cursor_row + 1 - table_height;
            }
        }
        let rbegin = state.offset_row;
        let rend = (rbegin + table_height).min(nrows);

        // Column widths follow the widest mapped value, capped by config.
        let widths: Vec<usize> = columns
            .iter()
            .map(|&name| {
                let content = state
                    .rows
                    .iter()
                    .map(|&idx| rendered_len(&all_rows[idx], name))
                    .max()
                    .unwrap_or(0);
                (content.max(name.len()) + COLUMN_WIDTH_MARGIN).min(max_column_width)
            })
            .collect();

        // Consecutive run of columns that fits the area, the last one
        // possibly clipped.
        state.offset_column = state.offset_column.min(columns.len() - 1);
        let mut visible: Vec<(usize, usize)> = Vec::new();
        let mut used = 0;
        for cidx in state.offset_column..columns.len() {
            let width = widths[cidx];
            if used + width + COLUMN_GAP <= table_width {
                visible.push((cidx, width));
                used += width + COLUMN_GAP;
            } else {
                let remaining = table_width.saturating_sub(used + COLUMN_GAP);
                if remaining >= 2 {
                    visible.push((cidx, remaining));
                }
                break;
            }
        }
        if visible.is_empty() {
            visible.push((state.offset_column, table_width.max(1)));
        }
        state.visible_columns = visible.len();
        state.cursor_column = state.cursor_column.min(visible.len() - 1);

        let mut table = Vec::with_capacity(visible.len());
        for &(cidx, width) in &visible {
            let name = columns[cidx];
            let data: Vec<String> = state.rows[rbegin..rend]
                .iter()
                .map(|&idx| rendered_cell(&all_rows[idx], name))
                .collect();
            table.push(ColumnView {
                name: visible_name(name, width),
                width,
                data,
            });
        }

        let index = if show_index {
            let data: Vec<String> = state.rows[rbegin..rend]
                .iter()
                .map(|&idx| (idx + 1).to_string())
                .collect();
            ColumnView {
                name: "#".to_string(),
                width: index_width,
                data,
            }
        } else {
            ColumnView::empty()
        };

        trace!(
            "Table {}: {} mapped rows, window {}..{}, {} visible columns",
            view.label(),
            nrows,
            rbegin,
            rend,
            visible.len()
        );

        let selected_row = state.cursor_row - rbegin;
        let selected_column = state.cursor_column;
        let abs_selected_row = state.cursor_row;
        let query_line = describe_query(state);

        self.uidata = UiData {
            view,
            name: view.label().to_string(),
            table,
            index,
            nrows,
            selected_row,
            selected_column,
            abs_selected_row,
            show_popup: false,
            popup_message: String::new(),
            layout: self.uilayout.clone(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.active_cmdinput,
            wizard: self.wizard.as_ref().map(|wizard| wizard.snapshot()),
            status_message: self.status_message.clone(),
            query_line,
        };
    }

    fn refresh_record(&mut self) {
        let view = self.current_view;
        let columns = view.columns();
        let all_rows = self.store.rows_for(view);
        self.uilayout = UiLayout::from_values(0, self.uilayout.width, self.uilayout.height);
        let height = self.uilayout.table_height.max(1);

        let mapped = self.views[view.index()].rows.clone();
        if mapped.is_empty() {
            self.modus = Modus::Table;
            self.previous_modus = Modus::Record;
            self.refresh_table();
            return;
        }

        let record = &mut self.record;
        record.record_pos = record.record_pos.min(mapped.len() - 1);
        let row = &all_rows[mapped[record.record_pos]];

        record.cursor_row = record.cursor_row.min(columns.len() - 1);
        record.offset_row = record.offset_row.min(record.cursor_row);
        if record.cursor_row >= record.offset_row + height {
            record.offset_row = record.cursor_row + 1 - height;
        }
        let rbegin = record.offset_row;
        let rend = (rbegin + height).min(columns.len());

        let labels: Vec<String> = columns[rbegin..rend]
            .iter()
            .map(|name| name.to_string())
            .collect();
        let values: Vec<String> = columns[rbegin..rend]
            .iter()
            .map(|&name| rendered_cell(row, name))
            .collect();
        let label_width =
            columns.iter().map(|name| name.len()).max().unwrap_or(0) + COLUMN_WIDTH_MARGIN;
        let value_width = self
            .uilayout
            .table_width
            .saturating_sub(label_width + COLUMN_GAP)
            .max(1);

        let table = vec![
            ColumnView {
                name: "Field".to_string(),
                width: label_width,
                data: labels,
            },
            ColumnView {
                name: "Value".to_string(),
                width: value_width,
                data: values,
            },
        ];

        let selected_row = record.cursor_row - rbegin;
        let abs_selected_row = record.record_pos;
        let query_line = describe_query(&self.views[view.index()]);

        self.uidata = UiData {
            view,
            name: format!("R[{}]", view.label()),
            table,
            index: ColumnView::empty(),
            nrows: mapped.len(),
            selected_row,
            selected_column: 1,
            abs_selected_row,
            show_popup: false,
            popup_message: String::new(),
            layout: self.uilayout.clone(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.active_cmdinput,
            wizard: None,
            status_message: self.status_message.clone(),
            query_line,
        };
    }

    fn refresh_breakdown(&mut self) {
        let view = self.current_view;
        self.uilayout = UiLayout::from_values(0, self.uilayout.width, self.uilayout.height);
        let height = self.uilayout.table_height.max(1);
        let table_width = self.uilayout.table_width;

        let breakdown = &mut self.breakdown;
        let total: usize = breakdown.entries.iter().map(|(_, count)| count).sum();
        let nrows = breakdown.entries.len();
        if nrows == 0 {
            breakdown.cursor_row = 0;
            breakdown.offset_row = 0;
        } else {
            breakdown.cursor_row = breakdown.cursor_row.min(nrows - 1);
            breakdown.offset_row = breakdown.offset_row.min(breakdown.cursor_row);
            if breakdown.cursor_row >= breakdown.offset_row + height {
                breakdown.offset_row = breakdown.cursor_row + 1 - height;
            }
        }
        let rbegin = breakdown.offset_row;
        let rend = (rbegin + height).min(nrows);

        let count_data: Vec<String> = breakdown.entries[rbegin..rend]
            .iter()
            .map(|(_, count)| {
                format!(
                    "{:.0}% {}",
                    *count as f64 * 100.0 / total.max(1) as f64,
                    count
                )
            })
            .collect();
        let value_data: Vec<String> = breakdown.entries[rbegin..rend]
            .iter()
            .map(|(value, _)| value.clone())
            .collect();

        let count_width = count_data
            .iter()
            .map(String::len)
            .max()
            .unwrap_or(0)
            .max("Count".len())
            + COLUMN_WIDTH_MARGIN;
        let value_width = table_width.saturating_sub(count_width + COLUMN_GAP).max(1);

        let table = vec![
            ColumnView {
                name: "Count".to_string(),
                width: count_width,
                data: count_data,
            },
            ColumnView {
                name: breakdown.field.to_string(),
                width: value_width,
                data: value_data,
            },
        ];

        let name = format!("B[{}:{}]", view.label(), breakdown.field);
        let selected_row = breakdown.cursor_row - rbegin;
        let abs_selected_row = breakdown.cursor_row;
        let query_line = describe_query(&self.views[view.index()]);

        self.uidata = UiData {
            view,
            name,
            table,
            index: ColumnView::empty(),
            nrows,
            selected_row,
            selected_column: 1,
            abs_selected_row,
            show_popup: false,
            popup_message: String::new(),
            layout: self.uilayout.clone(),
            cmdinput: self.last_input.clone(),
            active_cmdinput: self.active_cmdinput,
            wizard: None,
            status_message: self.status_message.clone(),
            query_line,
        };
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        self.uidata.status_message = self.status_message.clone();
    }

    // ---------------------- Control handling functions ---------------------- //

    fn show_view(&mut self, view: DeskView) {
        self.current_view = view;
        self.refresh();
        let message = format!(
            "{}: {} of {} rows",
            view.label(),
            self.view().rows.len(),
            self.store.len_of(view)
        );
        self.set_status_message(message);
    }

    fn enter(&mut self) {
        match self.modus {
            Modus::Table => {
                if self.view().rows.is_empty() {
                    self.set_status_message("no row selected");
                    return;
                }
                self.record = RecordState {
                    record_pos: self.view().cursor_row,
                    cursor_row: 0,
                    offset_row: 0,
                };
                self.previous_modus = self.modus;
                self.modus = Modus::Record;
                self.refresh();
            }
            Modus::Breakdown => {
                let field = self.breakdown.field;
                let Some(entry) = self.breakdown.entries.get(self.breakdown.cursor_row) else {
                    self.set_status_message("nothing to filter");
                    return;
                };
                let value = entry.0.clone();
                self.views[self.current_view.index()]
                    .filters
                    .allow(field, value.clone());
                self.previous_modus = self.modus;
                self.modus = Modus::Table;
                self.refresh();
                let shown = self.view().rows.len();
                self.set_status_message(format!("filter {} = {} ({} rows)", field, value, shown));
            }
            _ => {}
        }
    }

    fn exit(&mut self) {
        match self.modus {
            Modus::Table => {
                let cleared = {
                    let state = self.view_mut();
                    if state.filters.is_empty() && state.search.is_empty() {
                        false
                    } else {
                        state.filters.clear();
                        state.search.clear();
                        true
                    }
                };
                if cleared {
                    self.refresh();
                    self.set_status_message("filters and search cleared");
                } else {
                    self.set_status_message("nothing to clear");
                }
            }
            Modus::Record | Modus::Breakdown => {
                self.previous_modus = self.modus;
                self.modus = Modus::Table;
                self.refresh();
            }
            Modus::Popup => {
                trace!("Close popup ...");
                self.modus = self.previous_modus;
                self.previous_modus = Modus::Popup;
                self.uidata.show_popup = false;
            }
            Modus::CmdInput | Modus::Wizard => {}
        }
    }

    fn show_help(&mut self) {
        self.previous_modus = self.modus;
        self.modus = Modus::Popup;
        self.uidata.popup_message = HELP_TEXT.to_string();
        self.uidata.show_popup = true;
    }

    fn ui_resize(&mut self, width: usize, height: usize) {
        trace!(
            "UI was resized! w:{}->{}, h:{}->{}",
            self.uilayout.width, width, self.uilayout.height, height
        );
        self.uilayout.width = width;
        self.uilayout.height = height;
        self.refresh();
    }

    // ------------------------- Command line input ------------------------- //

    fn enter_cmd_mode(&mut self, mode: CmdMode) {
        let prompt = match mode {
            CmdMode::SearchTable => "search".to_string(),
            CmdMode::FilterColumn => format!("filter {}", self.current_field()),
        };
        trace!("Entering command mode: {} ...", prompt);
        self.previous_modus = self.modus;
        self.modus = Modus::CmdInput;
        self.cmd_mode = Some(mode);
        self.active_cmdinput = true;
        self.input.arm(&prompt);
        self.last_input = self.input.get();

        self.uidata.cmdinput = self.last_input.clone();
        self.uidata.active_cmdinput = true;
    }

    fn raw_input(&mut self, key: KeyEvent) {
        if self.active_cmdinput {
            self.last_input = self.input.read(key);
            if self.last_input.finished {
                self.handle_cmd_input();
            }
            self.uidata.cmdinput = self.last_input.clone();
        }
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {}", self.last_input.input);
        self.active_cmdinput = false;
        self.modus = self.previous_modus;
        self.previous_modus = Modus::CmdInput;
        self.uidata.active_cmdinput = false;

        let result = self.last_input.clone();
        let mode = self.cmd_mode.take();
        if result.canceled {
            self.refresh();
            self.set_status_message("input cancelled");
            return;
        }
        match mode {
            Some(CmdMode::SearchTable) => self.apply_search(result.input),
            Some(CmdMode::FilterColumn) => self.apply_filter(result.input),
            None => {}
        }
    }

    fn apply_search(&mut self, term: String) {
        let view = self.current_view;
        self.views[view.index()].search = term.trim().to_string();
        self.refresh();
        let state = self.view();
        let message = if state.search.is_empty() {
            "search cleared".to_string()
        } else {
            format!("{} rows match \"{}\"", state.rows.len(), state.search)
        };
        self.set_status_message(message);
    }

    fn apply_filter(&mut self, value: String) {
        let field = self.current_field();
        let view_idx = self.current_view.index();
        let value = value.trim().to_string();
        let message = if value.is_empty() {
            self.views[view_idx].filters.clear_field(field);
            format!("filter cleared for {}", field)
        } else {
            self.views[view_idx].filters.allow(field, value.clone());
            format!("filter {} = {}", field, value)
        };
        self.refresh();
        let shown = self.view().rows.len();
        self.set_status_message(format!("{} ({} rows)", message, shown));
    }

    // ------------------------- Query operations ------------------------- //

    fn sort_current_column(&mut self, ascending: bool) {
        let field = self.current_field();
        let spec = if ascending {
            SortSpec::ascending(field)
        } else {
            SortSpec::descending(field)
        };
        self.view_mut().sort = Some(spec);
        self.refresh();
        let direction = if ascending { "asc" } else { "desc" };
        self.set_status_message(format!("sorted by {} {}", field, direction));
    }

    fn clear_sort(&mut self) {
        self.view_mut().sort = None;
        self.refresh();
        self.set_status_message("sort cleared");
    }

    fn build_breakdown(&mut self) {
        let view = self.current_view;
        let field = self.current_field();
        let all_rows = self.store.rows_for(view);
        let state = self.view();

        let mut counts: BTreeMap<String, usize> = BTreeMap::new();
        for &idx in &state.rows {
            let value = rendered_cell(&all_rows[idx], field);
            *counts.entry(value).or_insert(0) += 1;
        }
        let mut entries: Vec<(String, usize)> = counts.into_iter().collect();
        entries.sort_by(|a, b| b.1.cmp(&a.1).then_with(|| a.0.cmp(&b.0)));

        self.breakdown = BreakdownState {
            field,
            entries,
            cursor_row: 0,
            offset_row: 0,
        };
        self.previous_modus = self.modus;
        self.modus = Modus::Breakdown;
        self.refresh();
    }

    fn toggle_table_index(&mut self) {
        let state = self.view_mut();
        state.show_index = !state.show_index;
        self.refresh();
    }

    // ------------------------- Desk actions ------------------------- //

    fn selected_store_pos(&self) -> Option<usize> {
        let state = self.view();
        state.rows.get(state.cursor_row).copied()
    }

    fn selected_id(&self) -> Option<u32> {
        self.selected_store_pos()
            .and_then(|pos| self.store.id_at(self.current_view, pos))
    }

    fn acknowledge_selected(&mut self) {
        if self.current_view != DeskView::Alerts {
            self.set_status_message("acknowledge applies to alerts");
            return;
        }
        let Some(id) = self.selected_id() else {
            self.set_status_message("no row selected");
            return;
        };
        let message = self.store.ack_alert(id, &self.config.operator);
        self.refresh();
        self.set_status_message(message);
    }

    fn remove_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status_message("no row selected");
            return;
        };
        let message = match self.current_view {
            DeskView::Alerts => self.store.dismiss_alert(id, &self.config.operator),
            DeskView::Margins => self.store.delete_margin_rule(id, &self.config.operator),
            _ => "nothing to remove here".to_string(),
        };
        self.refresh();
        self.set_status_message(message);
    }

    fn toggle_selected(&mut self) {
        let Some(id) = self.selected_id() else {
            self.set_status_message("no row selected");
            return;
        };
        let message = match self.current_view {
            DeskView::Fixtures => self.store.toggle_fixture(id, &self.config.operator),
            DeskView::Models => self.store.toggle_model(id, &self.config.operator),
            _ => "nothing to toggle here".to_string(),
        };
        self.refresh();
        self.set_status_message(message);
    }

    // ------------------------- Rule wizard ------------------------- //

    fn start_wizard(&mut self) {
        if self.current_view != DeskView::Margins {
            self.set_status_message("rule creation applies to margins");
            return;
        }
        let taken = self.store.margins.iter().map(MarginRule::scope).collect();
        self.wizard = Some(MarginWizard::new(taken));
        self.previous_modus = self.modus;
        self.modus = Modus::Wizard;
        self.refresh();
    }

    fn wizard_message(&mut self, message: Message) {
        let Some(wizard) = self.wizard.as_mut() else {
            return;
        };
        let outcome = wizard.handle(&message);
        self.apply_wizard_outcome(outcome);
    }

    fn wizard_key(&mut self, key: KeyEvent) {
        let Some(wizard) = self.wizard.as_mut() else {
            return;
        };
        let outcome = wizard.handle_key(key);
        self.apply_wizard_outcome(outcome);
    }

    fn apply_wizard_outcome(&mut self, outcome: WizardOutcome) {
        match outcome {
            WizardOutcome::Pending => self.refresh(),
            WizardOutcome::Cancelled => {
                self.wizard = None;
                self.modus = Modus::Table;
                self.previous_modus = Modus::Wizard;
                self.refresh();
                self.set_status_message("rule creation cancelled");
            }
            WizardOutcome::Finished {
                sport,
                market,
                margin_pct,
            } => {
                let message =
                    self.store
                        .create_margin_rule(sport, market, margin_pct, &self.config.operator);
                self.wizard = None;
                self.modus = Modus::Table;
                self.previous_modus = Modus::Wizard;
                self.refresh();
                self.set_status_message(message);
            }
        }
    }

    // ------------------------- Clipboard ------------------------- //

    fn clipboard_set(&mut self, content: String) {
        if self.clipboard.is_none() {
            self.clipboard = Clipboard::new().ok();
        }
        let Some(clipboard) = self.clipboard.as_mut() else {
            self.set_status_message("clipboard unavailable");
            return;
        };
        match clipboard.set_text(content) {
            Ok(_) => self.set_status_message("copied to clipboard"),
            Err(err) => {
                trace!("Error copying to clipboard: {:?}", err);
                self.set_status_message("copy failed");
            }
        }
    }

    fn copy_table_cell(&mut self) {
        let view = self.current_view;
        let field = self.current_field();
        let Some(pos) = self.selected_store_pos() else {
            self.set_status_message("no row selected");
            return;
        };
        let rows = self.store.rows_for(view);
        let content = rendered_cell(&rows[pos], field);
        trace!("Cell content: {}", content);
        self.clipboard_set(content);
    }

    fn copy_table_row(&mut self) {
        let view = self.current_view;
        let Some(pos) = self.selected_store_pos() else {
            self.set_status_message("no row selected");
            return;
        };
        let rows = self.store.rows_for(view);
        let content: Vec<String> = rows[pos]
            .values()
            .map(|value| wrap_cell_content(&value.render()))
            .collect();
        self.clipboard_set(content.join(","));
    }

    fn copy_record_cell(&mut self) {
        let view = self.current_view;
        let columns = view.columns();
        let Some(&store_idx) = self.views[view.index()].rows.get(self.record.record_pos) else {
            self.set_status_message("no row selected");
            return;
        };
        let field = columns[self.record.cursor_row.min(columns.len() - 1)];
        let rows = self.store.rows_for(view);
        let content = rendered_cell(&rows[store_idx], field);
        trace!("Cell content: {}", content);
        self.clipboard_set(content);
    }

    // ------------------------- Cursor movement ------------------------- //

    fn move_table_selection_up(&mut self, size: usize) {
        let state = self.view_mut();
        state.cursor_row = state.cursor_row.saturating_sub(size);
        self.refresh();
    }

    fn move_table_selection_down(&mut self, size: usize) {
        let state = self.view_mut();
        state.cursor_row = state.cursor_row.saturating_add(size);
        self.refresh();
    }

    fn move_table_selection_beginning(&mut self) {
        let state = self.view_mut();
        state.cursor_row = 0;
        state.offset_row = 0;
        self.refresh();
    }

    fn move_table_selection_end(&mut self) {
        let state = self.view_mut();
        state.cursor_row = state.rows.len().saturating_sub(1);
        self.refresh();
    }

    fn move_table_selection_left(&mut self) {
        let state = self.view_mut();
        if state.cursor_column > 0 {
            state.cursor_column -= 1;
        } else {
            state.offset_column = state.offset_column.saturating_sub(1);
        }
        self.refresh();
    }

    fn move_table_selection_right(&mut self) {
        let ncols = self.current_view.columns().len();
        let state = self.view_mut();
        if state.offset_column + state.cursor_column + 1 < ncols {
            if state.cursor_column + 1 < state.visible_columns {
                state.cursor_column += 1;
            } else {
                state.offset_column += 1;
            }
        }
        self.refresh();
    }

    fn move_record_selection_up(&mut self, size: usize) {
        self.record.cursor_row = self.record.cursor_row.saturating_sub(size);
        self.refresh();
    }

    fn move_record_selection_down(&mut self, size: usize) {
        self.record.cursor_row = self.record.cursor_row.saturating_add(size);
        self.refresh();
    }

    fn previous_record(&mut self) {
        self.record.record_pos = self.record.record_pos.saturating_sub(1);
        self.refresh();
    }

    fn next_record(&mut self) {
        self.record.record_pos = self.record.record_pos.saturating_add(1);
        self.refresh();
    }

    fn move_breakdown_selection_up(&mut self, size: usize) {
        self.breakdown.cursor_row = self.breakdown.cursor_row.saturating_sub(size);
        self.refresh();
    }

    fn move_breakdown_selection_down(&mut self, size: usize) {
        self.breakdown.cursor_row = self.breakdown.cursor_row.saturating_add(size);
        self.refresh();
    }
}

fn rendered_cell(row: &Row, field: &str) -> String {
    row.get(field).map(FieldValue::render).unwrap_or_default()
}

fn rendered_len(row: &Row, field: &str) -> usize {
    row.get(field).map(|value| value.render().len()).unwrap_or(0)
}

fn visible_name(name: &str, width: usize) -> String {
    if width < 3 {
        return String::new();
    }
    if name.len() > width {
        format!("{}...", &name[..width - 3])
    } else {
        name.to_string()
    }
}

fn wrap_cell_content(content: &str) -> String {
    let needs_escaping = content.contains('"');
    let needs_wrapping = content
        .chars()
        .any(|chr| chr == ' ' || chr == '\t' || chr == ',');
    let mut out = String::from(content);

    if needs_escaping {
        out = out.replace('"', "\"\"");
    }
    if needs_wrapping {
        out = format!("\"{out}\"");
    }
    out
}

fn describe_query(state: &ViewState) -> String {
    let mut parts = Vec::new();
    if !state.filters.is_empty() {
        parts.push(format!("filter {}", state.filters.describe()));
    }
    if !state.search.is_empty() {
        parts.push(format!("search \"{}\"", state.search));
    }
    if let Some(spec) = &state.sort {
        let direction = match spec.order {
            SortOrder::Ascending => "asc",
            SortOrder::Descending => "desc",
        };
        parts.push(format!("sort {} {}", spec.field, direction));
    }
    parts.join("  ")
}
