//! Per-table controller: filter → sort → paginate → render, plus export.
//!
//! One controller exists per named table and owns all of that table's state.
//! It never talks to a terminal or a file directly; rendering and downloads go
//! through the [`Render`] and [`Download`] collaborators.

use std::path::PathBuf;

use tracing::{debug, info, trace};

use crate::domain::{CarteraError, ExportFormat, TableKind};
use crate::export::{Cell, Download, ExportTable, build_export_table, export_filename};
use crate::filter::{FilterCriteria, filter_dataset};
use crate::paging::{PagerState, ViewState};
use crate::records::{Lookups, RawRecord, Record, ingest};
use crate::sort::{SortMode, apply_sort};

/// Display side of a table.
pub trait Render {
    fn render_page(&mut self, kind: TableKind, headers: &[&'static str], rows: Vec<Vec<Cell>>);
    fn update_pager(&mut self, kind: TableKind, pager: PagerState);
}

/// Tag of one fetch. Tickets of a table are strictly increasing.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub struct FetchTicket(pub u64);

pub struct TableController<R: Record> {
    dataset: Vec<R>,
    filtered: Vec<R>,
    criteria: FilterCriteria,
    mode: R::Sort,
    state: ViewState<R>,
    issued: u64,
    applied: u64,
}

impl<R: Record> TableController<R> {
    pub fn new(page_size: usize) -> Self {
        TableController {
            dataset: Vec::new(),
            filtered: Vec::new(),
            criteria: FilterCriteria::default(),
            mode: R::Sort::DEFAULT,
            state: ViewState::new(page_size),
            issued: 0,
            applied: 0,
        }
    }

    pub fn dataset(&self) -> &[R] {
        &self.dataset
    }

    pub fn view(&self) -> &[R] {
        self.state.view()
    }

    pub fn page(&self) -> &[R] {
        self.state.slice_page()
    }

    pub fn state(&self) -> &ViewState<R> {
        &self.state
    }

    pub fn mode(&self) -> R::Sort {
        self.mode
    }

    pub fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    pub fn begin_fetch(&mut self) -> FetchTicket {
        self.issued += 1;
        FetchTicket(self.issued)
    }

    fn rerender(&self, lookups: &Lookups, render: &mut dyn Render) {
        let rows = self
            .state
            .slice_page()
            .iter()
            .map(|r| r.cells(lookups))
            .collect();
        render.render_page(R::KIND, R::headers(), rows);
        render.update_pager(R::KIND, self.state.pager());
    }

    // Filter first, then sort; the order is fixed.
    fn rebuild(&mut self, lookups: &Lookups, render: &mut dyn Render) {
        self.filtered = filter_dataset(&self.dataset, &self.criteria, lookups);
        let view = apply_sort(&self.filtered, self.mode, lookups);
        self.state.set_view(view);
        self.rerender(lookups, render);
    }

    pub fn refresh(&mut self, dataset: Vec<R>, lookups: &Lookups, render: &mut dyn Render) {
        debug!("Refreshing {:?} with {} records", R::KIND, dataset.len());
        self.dataset = dataset;
        self.rebuild(lookups, render);
    }

    /// Applies a fetched dataset unless a newer fetch was applied already.
    pub fn refresh_fetched(
        &mut self,
        ticket: FetchTicket,
        dataset: Vec<R>,
        lookups: &Lookups,
        render: &mut dyn Render,
    ) -> bool {
        if ticket.0 <= self.applied {
            debug!(
                "Discarding stale {:?} fetch #{} (applied #{})",
                R::KIND,
                ticket.0,
                self.applied
            );
            return false;
        }
        self.applied = ticket.0;
        self.refresh(dataset, lookups, render);
        true
    }

    pub fn on_filter_changed(&mut self, criteria: FilterCriteria, lookups: &Lookups, render: &mut dyn Render) {
        self.criteria = criteria;
        self.rebuild(lookups, render);
    }

    /// Re-sorts the already filtered rows; the current page is kept.
    pub fn on_sort_mode_changed(&mut self, mode: R::Sort, lookups: &Lookups, render: &mut dyn Render) {
        trace!("{:?} sort mode {:?} -> {:?}", R::KIND, self.mode, mode);
        self.mode = mode;
        let view = apply_sort(&self.filtered, mode, lookups);
        self.state.replace_view(view);
        self.rerender(lookups, render);
    }

    pub fn on_page_size_changed(&mut self, page_size: usize, lookups: &Lookups, render: &mut dyn Render) {
        self.state.set_page_size(page_size);
        self.rerender(lookups, render);
    }

    pub fn on_prev_page(&mut self, lookups: &Lookups, render: &mut dyn Render) {
        self.state.prev_page();
        self.rerender(lookups, render);
    }

    pub fn on_next_page(&mut self, lookups: &Lookups, render: &mut dyn Render) {
        self.state.next_page();
        self.rerender(lookups, render);
    }

    pub fn build_export_table(&self, lookups: &Lookups) -> ExportTable {
        build_export_table(self.state.view(), lookups)
    }

    pub fn on_export_requested(
        &self,
        format: ExportFormat,
        lookups: &Lookups,
        download: &mut dyn Download,
    ) -> Result<PathBuf, CarteraError> {
        let table = self.build_export_table(lookups);
        let payload = format.render(&table);
        info!("Exporting {} {:?} rows as {:?}", table.rows.len(), R::KIND, format);
        download.download(payload.as_bytes(), &export_filename(R::KIND, format), format.mime())
    }

    /// Removes every record with `id` and reloads the view from page 1.
    pub fn remove(&mut self, id: &str, lookups: &Lookups, render: &mut dyn Render) -> bool {
        let before = self.dataset.len();
        self.dataset.retain(|r| r.id() != id);
        let removed = self.dataset.len() != before;
        if removed {
            self.rebuild(lookups, render);
        }
        removed
    }
}

/// Object-safe face of a [`TableController`], so the dashboard can address
/// tables by [`TableKind`].
pub trait TableOps {
    fn kind(&self) -> TableKind;
    fn begin_fetch(&mut self) -> FetchTicket;
    fn refresh_raw(&mut self, ticket: FetchTicket, raw: &[RawRecord], lookups: &Lookups, render: &mut dyn Render) -> bool;
    fn rerender(&self, lookups: &Lookups, render: &mut dyn Render);
    fn cycle_sort(&mut self, step: isize, lookups: &Lookups, render: &mut dyn Render);
    fn sort_label(&self) -> &'static str;
    fn criteria(&self) -> &FilterCriteria;
    fn on_filter_changed(&mut self, criteria: FilterCriteria, lookups: &Lookups, render: &mut dyn Render);
    fn page_size(&self) -> usize;
    fn on_page_size_changed(&mut self, page_size: usize, lookups: &Lookups, render: &mut dyn Render);
    fn on_prev_page(&mut self, lookups: &Lookups, render: &mut dyn Render);
    fn on_next_page(&mut self, lookups: &Lookups, render: &mut dyn Render);
    fn on_export_requested(
        &self,
        format: ExportFormat,
        lookups: &Lookups,
        download: &mut dyn Download,
    ) -> Result<PathBuf, CarteraError>;
    /// Id of the row at `index` on the current page.
    fn id_on_page(&self, index: usize) -> Option<String>;
    fn remove(&mut self, id: &str, lookups: &Lookups, render: &mut dyn Render) -> bool;
}

impl<R: Record> TableOps for TableController<R> {
    fn kind(&self) -> TableKind {
        R::KIND
    }

    fn begin_fetch(&mut self) -> FetchTicket {
        TableController::begin_fetch(self)
    }

    fn refresh_raw(&mut self, ticket: FetchTicket, raw: &[RawRecord], lookups: &Lookups, render: &mut dyn Render) -> bool {
        self.refresh_fetched(ticket, ingest(raw), lookups, render)
    }

    fn rerender(&self, lookups: &Lookups, render: &mut dyn Render) {
        TableController::rerender(self, lookups, render)
    }

    fn cycle_sort(&mut self, step: isize, lookups: &Lookups, render: &mut dyn Render) {
        let mode = self.mode.cycle(step);
        self.on_sort_mode_changed(mode, lookups, render);
    }

    fn sort_label(&self) -> &'static str {
        self.mode.label()
    }

    fn criteria(&self) -> &FilterCriteria {
        &self.criteria
    }

    fn on_filter_changed(&mut self, criteria: FilterCriteria, lookups: &Lookups, render: &mut dyn Render) {
        TableController::on_filter_changed(self, criteria, lookups, render)
    }

    fn page_size(&self) -> usize {
        self.state.page_size()
    }

    fn on_page_size_changed(&mut self, page_size: usize, lookups: &Lookups, render: &mut dyn Render) {
        TableController::on_page_size_changed(self, page_size, lookups, render)
    }

    fn on_prev_page(&mut self, lookups: &Lookups, render: &mut dyn Render) {
        TableController::on_prev_page(self, lookups, render)
    }

    fn on_next_page(&mut self, lookups: &Lookups, render: &mut dyn Render) {
        TableController::on_next_page(self, lookups, render)
    }

    fn on_export_requested(
        &self,
        format: ExportFormat,
        lookups: &Lookups,
        download: &mut dyn Download,
    ) -> Result<PathBuf, CarteraError> {
        TableController::on_export_requested(self, format, lookups, download)
    }

    fn id_on_page(&self, index: usize) -> Option<String> {
        self.state.slice_page().get(index).map(|r| r.id().to_string())
    }

    fn remove(&mut self, id: &str, lookups: &Lookups, render: &mut dyn Render) -> bool {
        TableController::remove(self, id, lookups, render)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::records::{Collector, Debtor, Loan};
    use crate::sort::LoanSort;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct Recorder {
        rows: Vec<Vec<Cell>>,
        pager: PagerState,
        renders: usize,
    }

    impl Render for Recorder {
        fn render_page(&mut self, _kind: TableKind, _headers: &[&'static str], rows: Vec<Vec<Cell>>) {
            self.rows = rows;
            self.renders += 1;
        }

        fn update_pager(&mut self, _kind: TableKind, pager: PagerState) {
            self.pager = pager;
        }
    }

    fn loans(n: usize) -> Vec<Loan> {
        (0..n)
            .map(|i| Loan {
                id: i.to_string(),
                monto: (i * 100) as f64,
                estado: (i % 3 + 1) as i64,
                fecha: format!("2024-01-{:02}", i % 28 + 1),
                ..Default::default()
            })
            .collect()
    }

    #[test]
    fn refresh_renders_first_page() {
        let mut table = TableController::<Loan>::new(10);
        let mut rec = Recorder::default();
        table.refresh(loans(25), &Lookups::default(), &mut rec);
        assert_eq!(rec.rows.len(), 10);
        assert_eq!(rec.pager.label(), "1 / 3");
        assert!(!rec.pager.prev_enabled);
        assert!(rec.pager.next_enabled);
    }

    #[test]
    fn resort_keeps_page_but_filter_resets_it() {
        let lookups = Lookups::default();
        let mut table = TableController::<Loan>::new(10);
        let mut rec = Recorder::default();
        table.refresh(loans(25), &lookups, &mut rec);
        table.on_next_page(&lookups, &mut rec);
        table.on_sort_mode_changed(LoanSort::MontoAsc, &lookups, &mut rec);
        assert_eq!(rec.pager.page, 2);
        assert_eq!(table.page()[0].id, "10");

        let criteria = FilterCriteria {
            status: Some("1".into()),
            ..Default::default()
        };
        table.on_filter_changed(criteria, &lookups, &mut rec);
        assert_eq!(rec.pager.page, 1);
        assert_eq!(table.view().len(), 9);
    }

    #[test]
    fn resort_uses_filtered_rows() {
        let lookups = Lookups::default();
        let mut table = TableController::<Loan>::new(10);
        let mut rec = Recorder::default();
        table.refresh(loans(9), &lookups, &mut rec);
        let criteria = FilterCriteria {
            status: Some("2".into()),
            ..Default::default()
        };
        table.on_filter_changed(criteria, &lookups, &mut rec);
        table.on_sort_mode_changed(LoanSort::MontoDesc, &lookups, &mut rec);
        let ids: Vec<&str> = table.view().iter().map(|l| l.id.as_str()).collect();
        assert_eq!(ids, vec!["7", "4", "1"]);
    }

    #[test]
    fn stale_fetches_are_discarded() {
        let lookups = Lookups::default();
        let mut table = TableController::<Loan>::new(10);
        let mut rec = Recorder::default();
        let old = table.begin_fetch();
        let new = table.begin_fetch();
        assert!(table.refresh_fetched(new, loans(3), &lookups, &mut rec));
        assert!(!table.refresh_fetched(old, loans(20), &lookups, &mut rec));
        assert_eq!(table.dataset().len(), 3);
    }

    #[test]
    fn out_of_order_older_fetch_applies_when_first() {
        let lookups = Lookups::default();
        let mut table = TableController::<Loan>::new(10);
        let mut rec = Recorder::default();
        let old = table.begin_fetch();
        let new = table.begin_fetch();
        assert!(table.refresh_fetched(old, loans(2), &lookups, &mut rec));
        assert!(table.refresh_fetched(new, loans(5), &lookups, &mut rec));
        assert_eq!(table.dataset().len(), 5);
    }

    #[test]
    fn collectors_table_hides_admins() {
        let lookups = Lookups::default();
        let mut table = TableController::<Collector>::new(10);
        let mut rec = Recorder::default();
        let users = vec![
            Collector {
                id: "1".into(),
                nombre: "Admin".into(),
                rol: 1,
                ..Default::default()
            },
            Collector {
                id: "2".into(),
                nombre: "Beto".into(),
                rol: 2,
                ..Default::default()
            },
        ];
        table.refresh(users, &lookups, &mut rec);
        assert_eq!(rec.rows, vec![vec![Cell::from("Beto"), Cell::from(""), Cell::from("")]]);
    }

    #[test]
    fn remove_drops_row_and_resets_page() {
        let lookups = Lookups::default();
        let mut table = TableController::<Debtor>::new(1);
        let mut rec = Recorder::default();
        let debtors = ["Ana", "Beto", "Carla"]
            .iter()
            .enumerate()
            .map(|(i, n)| Debtor {
                id: i.to_string(),
                nombre: n.to_string(),
                ..Default::default()
            })
            .collect();
        table.refresh(debtors, &lookups, &mut rec);
        table.on_next_page(&lookups, &mut rec);
        assert_eq!(TableOps::id_on_page(&table, 0).as_deref(), Some("1"));
        assert!(table.remove("1", &lookups, &mut rec));
        assert!(!table.remove("1", &lookups, &mut rec));
        assert_eq!(rec.pager.label(), "1 / 2");
    }

    #[test]
    fn export_reads_full_view() {
        let lookups = Lookups::default();
        let mut table = TableController::<Loan>::new(10);
        let mut rec = Recorder::default();
        table.refresh(loans(25), &lookups, &mut rec);
        let export = table.build_export_table(&lookups);
        assert_eq!(export.rows.len(), 25);
        assert_eq!(export.rows[..10].to_vec(), rec.rows);
    }

    #[test]
    fn cycle_sort_moves_through_modes() {
        let lookups = Lookups::default();
        let mut table = TableController::<Loan>::new(10);
        let mut rec = Recorder::default();
        TableOps::cycle_sort(&mut table, 1, &lookups, &mut rec);
        assert_eq!(table.mode(), LoanSort::FechaAsc);
        assert_eq!(TableOps::sort_label(&table), "Fecha (antiguos primero)");
    }
}
