use std::collections::HashMap;
use std::sync::Arc;
use std::sync::mpsc::{Receiver, Sender, channel};

use arboard::Clipboard;
use tracing::{debug, error, info, trace, warn};

use crate::domain::{AppConfig, CMDMode, CarteraError, ExportFormat, HELP_TEXT, Message, PAGE_SIZE_OPTIONS, TableKind};
use crate::export::{Cell, FileDownload, to_delimited_row};
use crate::filter::{FilterCriteria, valid_month};
use crate::inputter::{InputResult, Inputter};
use crate::paging::PagerState;
use crate::records::{Collector, Debtor, Loan, Lookups, Payment, RawRecord, ROLE_COLLECTOR};
use crate::sort::get_sort_options;
use crate::source::DataSource;
use crate::table::{FetchTicket, Render, TableController, TableOps};

#[derive(Debug, PartialEq)]
pub enum Status {
    READY,
    LOADING,
    QUITTING,
}

#[derive(Debug, Clone, Copy, PartialEq)]
enum Modus {
    TABLE,
    POPUP,
    CONFIRM,
    CMDINPUT,
}

/// Last rendered page of one table.
#[derive(Debug, Clone, Default)]
pub struct TablePage {
    pub headers: Vec<&'static str>,
    pub rows: Vec<Vec<Cell>>,
    pub pager: PagerState,
    pub selected: usize,
}

/// Render collaborator of the dashboard: keeps what each table last drew.
#[derive(Debug, Default)]
pub struct PageStore {
    pages: HashMap<TableKind, TablePage>,
}

impl PageStore {
    pub fn get(&self, kind: TableKind) -> Option<&TablePage> {
        self.pages.get(&kind)
    }

    fn get_mut(&mut self, kind: TableKind) -> &mut TablePage {
        self.pages.entry(kind).or_default()
    }
}

impl Render for PageStore {
    fn render_page(&mut self, kind: TableKind, headers: &[&'static str], rows: Vec<Vec<Cell>>) {
        let page = self.get_mut(kind);
        page.headers = headers.to_vec();
        page.selected = page.selected.min(rows.len().saturating_sub(1));
        page.rows = rows;
    }

    fn update_pager(&mut self, kind: TableKind, pager: PagerState) {
        self.get_mut(kind).pager = pager;
    }
}

struct Tables {
    debtors: TableController<Debtor>,
    loans: TableController<Loan>,
    payments: TableController<Payment>,
    collectors: TableController<Collector>,
}

impl Tables {
    fn new(page_size: usize) -> Self {
        Tables {
            debtors: TableController::new(page_size),
            loans: TableController::new(page_size),
            payments: TableController::new(page_size),
            collectors: TableController::new(page_size),
        }
    }

    fn get(&self, kind: TableKind) -> &dyn TableOps {
        match kind {
            TableKind::Debtors => &self.debtors,
            TableKind::Loans => &self.loans,
            TableKind::Payments => &self.payments,
            TableKind::Collectors => &self.collectors,
        }
    }

    fn get_mut(&mut self, kind: TableKind) -> &mut dyn TableOps {
        match kind {
            TableKind::Debtors => &mut self.debtors,
            TableKind::Loans => &mut self.loans,
            TableKind::Payments => &mut self.payments,
            TableKind::Collectors => &mut self.collectors,
        }
    }

    fn lookups(&self) -> Lookups {
        Lookups::build(
            self.debtors.dataset(),
            self.collectors.dataset(),
            self.loans.dataset(),
        )
    }
}

/// Dashboard figures shown above the tables.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Summary {
    pub debtors: usize,
    pub loans: usize,
    pub payments: usize,
    pub collectors: usize,
    pub total_collected: f64,
}

struct FetchResult {
    kind: TableKind,
    ticket: FetchTicket,
    result: Result<Vec<RawRecord>, CarteraError>,
}

struct PendingDelete {
    kind: TableKind,
    id: String,
    label: String,
}

pub struct UIData<'a> {
    pub active: TableKind,
    pub page: Option<&'a TablePage>,
    pub sort_label: &'static str,
    pub filter: String,
    pub summary: Summary,
    pub status_message: &'a str,
    pub popup_message: Option<String>,
    pub cmdinput: Option<(CMDMode, &'a InputResult)>,
    pub loading: bool,
}

pub struct Model {
    config: AppConfig,
    pub status: Status,
    modus: Modus,
    active: TableKind,
    tables: Tables,
    lookups: Lookups,
    pages: PageStore,
    source: Arc<dyn DataSource>,
    fetch_tx: Sender<FetchResult>,
    fetch_rx: Receiver<FetchResult>,
    in_flight: usize,
    download: FileDownload,
    clipboard: Option<Clipboard>,
    input: Inputter,
    cmd_mode: Option<CMDMode>,
    last_input: InputResult,
    pending_delete: Option<PendingDelete>,
    popup_message: String,
    status_message: String,
}

impl Model {
    pub fn init(config: &AppConfig, source: Arc<dyn DataSource>) -> Self {
        let (fetch_tx, fetch_rx) = channel();
        let mut model = Self {
            config: config.clone(),
            status: Status::READY,
            modus: Modus::TABLE,
            active: TableKind::Debtors,
            tables: Tables::new(config.page_size),
            lookups: Lookups::default(),
            pages: PageStore::default(),
            source,
            fetch_tx,
            fetch_rx,
            in_flight: 0,
            download: FileDownload::new(config.export_dir.clone()),
            clipboard: None,
            input: Inputter::default(),
            cmd_mode: None,
            last_input: InputResult::default(),
            pending_delete: None,
            popup_message: String::new(),
            status_message: "Started cartera!".to_string(),
        };
        for kind in TableKind::ALL {
            model.tables.get(kind).rerender(&model.lookups, &mut model.pages);
        }
        model
    }

    /// Starts a background fetch of `kind`; the result arrives through
    /// [`Model::poll_fetches`].
    pub fn reload(&mut self, kind: TableKind) {
        let ticket = self.tables.get_mut(kind).begin_fetch();
        let source = Arc::clone(&self.source);
        let tx = self.fetch_tx.clone();
        self.in_flight += 1;
        self.status = Status::LOADING;
        debug!("Fetching {kind:?} as #{}", ticket.0);
        rayon::spawn(move || {
            let result = source.fetch(kind);
            if tx.send(FetchResult { kind, ticket, result }).is_err() {
                trace!("Dropped {kind:?} fetch result, model is gone");
            }
        });
        self.set_status_message(format!("Loading {} ...", kind.title()));
    }

    pub fn reload_all(&mut self) {
        for kind in TableKind::ALL {
            self.reload(kind);
        }
    }

    /// Applies every fetch result that has arrived. Returns how many were applied.
    pub fn poll_fetches(&mut self) -> usize {
        let mut applied = 0;
        while let Ok(fetched) = self.fetch_rx.try_recv() {
            self.in_flight = self.in_flight.saturating_sub(1);
            if self.apply_fetch(fetched) {
                applied += 1;
            }
        }
        if self.in_flight == 0 && self.status == Status::LOADING {
            self.status = Status::READY;
        }
        applied
    }

    fn apply_fetch(&mut self, fetched: FetchResult) -> bool {
        let FetchResult { kind, ticket, result } = fetched;
        match result {
            Ok(raw) => {
                let applied =
                    self.tables
                        .get_mut(kind)
                        .refresh_raw(ticket, &raw, &self.lookups, &mut self.pages);
                if applied {
                    self.after_dataset_change(kind);
                    self.set_status_message(format!("Loaded {} {}", raw.len(), kind.title()));
                }
                applied
            }
            Err(e) => {
                error!("Fetching {kind:?} failed: {e}");
                self.set_status_message(format!("Error cargando {}: {e}", kind.title()));
                false
            }
        }
    }

    // Names shown by loans and payments come from the other tables.
    fn after_dataset_change(&mut self, kind: TableKind) {
        let dependents: &[TableKind] = match kind {
            TableKind::Debtors | TableKind::Collectors => &[TableKind::Loans, TableKind::Payments],
            TableKind::Loans => &[TableKind::Payments],
            TableKind::Payments => &[],
        };
        self.lookups = self.tables.lookups();
        // Own rows may show resolved names too.
        self.tables.get(kind).rerender(&self.lookups, &mut self.pages);
        for dep in dependents {
            let criteria = self.tables.get(*dep).criteria().clone();
            self.tables
                .get_mut(*dep)
                .on_filter_changed(criteria, &self.lookups, &mut self.pages);
        }
    }

    pub fn summary(&self) -> Summary {
        Summary {
            debtors: self.tables.debtors.dataset().len(),
            loans: self.tables.loans.dataset().len(),
            payments: self.tables.payments.dataset().len(),
            collectors: self
                .tables
                .collectors
                .dataset()
                .iter()
                .filter(|c| c.rol == ROLE_COLLECTOR)
                .count(),
            total_collected: self.tables.payments.view().iter().map(|p| p.monto_pagado).sum(),
        }
    }

    pub fn config(&self) -> &AppConfig {
        &self.config
    }

    pub fn active(&self) -> TableKind {
        self.active
    }

    pub fn page(&self, kind: TableKind) -> Option<&TablePage> {
        self.pages.get(kind)
    }

    pub fn raw_keyevents(&self) -> bool {
        self.modus == Modus::CMDINPUT
    }

    pub fn awaiting_confirmation(&self) -> bool {
        self.modus == Modus::CONFIRM
    }

    pub fn get_uidata(&self) -> UIData<'_> {
        let table = self.tables.get(self.active);
        let popup_message = match self.modus {
            Modus::POPUP => Some(self.popup_message.clone()),
            Modus::CONFIRM => self
                .pending_delete
                .as_ref()
                .map(|p| format!("¿Eliminar {}? (y/n)", p.label)),
            _ => None,
        };
        UIData {
            active: self.active,
            page: self.pages.get(self.active),
            sort_label: table.sort_label(),
            filter: table.criteria().describe(),
            summary: self.summary(),
            status_message: &self.status_message,
            popup_message,
            cmdinput: match (self.modus, self.cmd_mode) {
                (Modus::CMDINPUT, Some(mode)) => Some((mode, &self.last_input)),
                _ => None,
            },
            loading: self.status == Status::LOADING,
        }
    }

    fn set_status_message(&mut self, message: impl Into<String>) {
        self.status_message = message.into();
        trace!("Status: {}", self.status_message);
    }

    pub fn quit(&mut self) {
        self.status = Status::QUITTING;
    }

    pub fn update(&mut self, message: Option<Message>) -> Result<(), CarteraError> {
        self.poll_fetches();

        if let Some(msg) = message {
            match self.modus {
                Modus::TABLE => match msg {
                    Message::Quit => self.quit(),
                    Message::NextTable => self.active = self.active.next(),
                    Message::PrevTable => self.active = self.active.prev(),
                    Message::MoveUp => self.move_selection(-1),
                    Message::MoveDown => self.move_selection(1),
                    Message::PrevPage => self
                        .tables
                        .get_mut(self.active)
                        .on_prev_page(&self.lookups, &mut self.pages),
                    Message::NextPage => self
                        .tables
                        .get_mut(self.active)
                        .on_next_page(&self.lookups, &mut self.pages),
                    Message::PageSizeUp => self.step_page_size(1),
                    Message::PageSizeDown => self.step_page_size(-1),
                    Message::NextSortMode => self.cycle_sort(1),
                    Message::PrevSortMode => self.cycle_sort(-1),
                    Message::EnterCommand(mode) => self.enter_cmd_mode(mode),
                    Message::ClearFilters => self.apply_criteria(FilterCriteria::default()),
                    Message::Export(format) => self.export(format),
                    Message::CopyRow => self.copy_row(),
                    Message::Delete => self.request_delete(),
                    Message::Reload => self.reload(self.active),
                    Message::Help => self.show_help(),
                    _ => (),
                },
                Modus::POPUP => match msg {
                    Message::Quit => self.quit(),
                    Message::Exit | Message::Confirm | Message::Help => self.modus = Modus::TABLE,
                    _ => (),
                },
                Modus::CONFIRM => match msg {
                    Message::Confirm => self.confirm_delete(),
                    Message::Exit => {
                        self.pending_delete = None;
                        self.modus = Modus::TABLE;
                    }
                    _ => (),
                },
                Modus::CMDINPUT => {
                    if let Message::RawKey(key) = msg {
                        self.last_input = self.input.read(key);
                        if self.last_input.finished {
                            self.handle_cmd_input();
                        }
                    }
                }
            }
        }
        Ok(())
    }

    // -------------------- Control handling functions ---------------------- //

    fn move_selection(&mut self, step: isize) {
        let page = self.pages.get_mut(self.active);
        let last = page.rows.len().saturating_sub(1);
        page.selected = page.selected.saturating_add_signed(step).min(last);
    }

    fn step_page_size(&mut self, step: isize) {
        let table = self.tables.get_mut(self.active);
        let size = next_page_size(table.page_size(), step);
        table.on_page_size_changed(size, &self.lookups, &mut self.pages);
        self.set_status_message(format!("Filas por página: {size}"));
    }

    fn cycle_sort(&mut self, step: isize) {
        let table = self.tables.get_mut(self.active);
        table.cycle_sort(step, &self.lookups, &mut self.pages);
        let label = table.sort_label();
        self.set_status_message(format!("Orden: {label}"));
    }

    fn apply_criteria(&mut self, criteria: FilterCriteria) {
        debug!("{:?} filter: {:?}", self.active, criteria);
        self.tables
            .get_mut(self.active)
            .on_filter_changed(criteria, &self.lookups, &mut self.pages);
        let total = self.pages.get_mut(self.active).pager.total;
        self.set_status_message(format!("{total} resultados"));
    }

    fn enter_cmd_mode(&mut self, mode: CMDMode) {
        let criteria = self.tables.get(self.active).criteria();
        let current = match mode {
            CMDMode::Search => criteria.text.clone(),
            CMDMode::Status => criteria.status.clone(),
            CMDMode::Collector => criteria.collector.clone(),
            CMDMode::Month => criteria.month.clone(),
        };
        self.input.set(current.as_deref().unwrap_or_default());
        self.last_input = self.input.get();
        self.cmd_mode = Some(mode);
        self.modus = Modus::CMDINPUT;
    }

    fn handle_cmd_input(&mut self) {
        trace!("Handle cmd input {:?}", self.last_input);
        self.modus = Modus::TABLE;
        let mode = self.cmd_mode.take();
        if self.last_input.canceled {
            return;
        }
        let value = Some(self.last_input.input.trim().to_string()).filter(|v| !v.is_empty());
        let mut criteria = self.tables.get(self.active).criteria().clone();
        match mode {
            Some(CMDMode::Search) => criteria.text = value,
            Some(CMDMode::Status) => criteria.status = value,
            Some(CMDMode::Collector) => criteria.collector = value,
            Some(CMDMode::Month) => {
                if let Some(month) = value.as_deref()
                    && !valid_month(month)
                {
                    debug!("Rejected month {month:?}");
                    self.set_status_message(format!("Mes inválido: {month} (use YYYY-MM)"));
                    return;
                }
                criteria.month = value
            }
            None => {
                warn!("Cmd input finished without a mode");
                return;
            }
        }
        self.apply_criteria(criteria);
    }

    fn export(&mut self, format: ExportFormat) {
        let result = self
            .tables
            .get(self.active)
            .on_export_requested(format, &self.lookups, &mut self.download);
        match result {
            Ok(path) => self.set_status_message(format!("Exportado a {}", path.display())),
            Err(e) => {
                error!("Export of {:?} failed: {e}", self.active);
                self.set_status_message(format!("Error exportando: {e}"));
            }
        }
    }

    fn selected_row(&self) -> Option<(usize, &Vec<Cell>)> {
        let page = self.pages.get(self.active)?;
        page.rows.get(page.selected).map(|r| (page.selected, r))
    }

    fn copy_row(&mut self) {
        let Some((_, row)) = self.selected_row() else {
            return;
        };
        let line = to_delimited_row(row);
        if self.clipboard.is_none() {
            match Clipboard::new() {
                Ok(c) => self.clipboard = Some(c),
                Err(e) => {
                    warn!("Clipboard unavailable: {e:?}");
                    self.set_status_message("Portapapeles no disponible");
                    return;
                }
            }
        }
        if let Some(clipboard) = self.clipboard.as_mut() {
            match clipboard.set_text(line) {
                Ok(_) => self.set_status_message("Fila copiada"),
                Err(e) => trace!("Error copying to clipboard: {:?}", e),
            }
        }
    }

    fn request_delete(&mut self) {
        if !matches!(self.active, TableKind::Debtors | TableKind::Collectors) {
            self.set_status_message(format!("{} es de solo lectura", self.active.title()));
            return;
        }
        let Some((index, row)) = self.selected_row() else {
            return;
        };
        let label = row.first().map(|c| c.to_string()).unwrap_or_default();
        let Some(id) = self.tables.get(self.active).id_on_page(index) else {
            return;
        };
        self.pending_delete = Some(PendingDelete {
            kind: self.active,
            id,
            label,
        });
        self.modus = Modus::CONFIRM;
    }

    fn confirm_delete(&mut self) {
        self.modus = Modus::TABLE;
        let Some(pending) = self.pending_delete.take() else {
            return;
        };
        let removed = self
            .tables
            .get_mut(pending.kind)
            .remove(&pending.id, &self.lookups, &mut self.pages);
        if removed {
            info!("Deleted {:?} {}", pending.kind, pending.id);
            self.after_dataset_change(pending.kind);
            self.set_status_message("Eliminado correctamente");
        }
    }

    fn show_help(&mut self) {
        let current = self.tables.get(self.active).sort_label();
        let modes: Vec<String> = get_sort_options(self.active)
            .into_iter()
            .map(|(_, label)| {
                let marker = if label == current { '*' } else { ' ' };
                format!(" {marker} {label}")
            })
            .collect();
        self.popup_message = format!(
            "{HELP_TEXT}\n\nOrden de {} (o / O):\n{}",
            self.active.title(),
            modes.join("\n")
        );
        self.modus = Modus::POPUP;
    }

    pub fn popup_message(&self) -> Option<&str> {
        matches!(self.modus, Modus::POPUP).then_some(self.popup_message.as_str())
    }
}

/// Steps through [`PAGE_SIZE_OPTIONS`]. A size outside the list moves to the
/// nearest option in the step's direction.
fn next_page_size(current: usize, step: isize) -> usize {
    let last = PAGE_SIZE_OPTIONS.len() - 1;
    let index = match PAGE_SIZE_OPTIONS.iter().position(|&n| n == current) {
        Some(i) => i.saturating_add_signed(step).min(last),
        None if step > 0 => PAGE_SIZE_OPTIONS
            .iter()
            .position(|&n| n > current)
            .unwrap_or(last),
        None if step < 0 => PAGE_SIZE_OPTIONS
            .iter()
            .rposition(|&n| n < current)
            .unwrap_or(0),
        None => return current,
    };
    PAGE_SIZE_OPTIONS[index]
}
