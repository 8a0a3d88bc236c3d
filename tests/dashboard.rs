use std::path::PathBuf;
use std::sync::Arc;
use std::time::{Duration, Instant};

use cartera::domain::{AppConfig, CMDMode, ExportFormat, Message, TableKind};
use cartera::export::Cell;
use cartera::model::{Model, Status, Summary};
use cartera::source::DirectorySource;
use pretty_assertions::assert_eq;
use ratatui::crossterm::event::{KeyCode, KeyEvent, KeyModifiers};

fn fixtures() -> PathBuf {
    PathBuf::from(env!("CARGO_MANIFEST_DIR")).join("tests/fixtures")
}

fn load(config: AppConfig) -> Model {
    let mut model = Model::init(&config, Arc::new(DirectorySource::new(fixtures())));
    model.reload_all();
    let deadline = Instant::now() + Duration::from_secs(10);
    while model.status == Status::LOADING && Instant::now() < deadline {
        model.poll_fetches();
        std::thread::sleep(Duration::from_millis(10));
    }
    assert_eq!(model.status, Status::READY);
    model
}

fn send(model: &mut Model, msg: Message) {
    model.update(Some(msg)).unwrap();
}

// The prompt opens pre-filled with the current value; Ctrl-U clears it.
fn type_filter(model: &mut Model, mode: CMDMode, value: &str) {
    send(model, Message::EnterCommand(mode));
    send(model, Message::RawKey(KeyEvent::new(KeyCode::Char('u'), KeyModifiers::CONTROL)));
    for c in value.chars() {
        send(model, Message::RawKey(KeyEvent::from(KeyCode::Char(c))));
    }
    send(model, Message::RawKey(KeyEvent::from(KeyCode::Enter)));
}

fn first_column(model: &Model, kind: TableKind) -> Vec<String> {
    model
        .page(kind)
        .map(|p| p.rows.iter().map(|r| r[0].to_string()).collect())
        .unwrap_or_default()
}

#[test]
fn fixture_portfolio_summary() {
    let model = load(AppConfig::default());
    assert_eq!(
        model.summary(),
        Summary {
            debtors: 4,
            loans: 4,
            payments: 5,
            collectors: 2,
            total_collected: 2_060_000.0,
        }
    );
    // Admins are not collectors.
    assert_eq!(first_column(&model, TableKind::Collectors), vec!["Carla Díaz", "Luis Mora"]);
}

#[test]
fn debtors_sort_accent_insensitive() {
    let model = load(AppConfig::default());
    assert_eq!(
        first_column(&model, TableKind::Debtors),
        vec!["Álvaro Núñez", "María López", "Ñusta Quispe", "Pedro Ruiz"]
    );
}

#[test]
fn payments_resolve_through_loans() {
    let model = load(AppConfig::default());
    let page = model.page(TableKind::Payments).unwrap();
    assert_eq!(page.rows.len(), 5);
    assert_eq!(
        page.rows[0],
        vec![
            Cell::from("María López"),
            Cell::from("Luis Mora"),
            Cell::Number(500000.0),
            Cell::from("05/03/2024, 10:00"),
        ]
    );
    assert_eq!(page.rows[1][0], Cell::from("Préstamo no encontrado"));
}

#[test]
fn month_filter_narrows_payments_and_total() {
    let mut model = load(AppConfig::default());
    send(&mut model, Message::NextTable);
    send(&mut model, Message::NextTable);
    assert_eq!(model.active(), TableKind::Payments);

    type_filter(&mut model, CMDMode::Month, "2024-03");
    assert_eq!(model.page(TableKind::Payments).unwrap().pager.total, 3);
    assert_eq!(model.summary().total_collected, 760_000.0);

    send(&mut model, Message::ClearFilters);
    assert_eq!(model.page(TableKind::Payments).unwrap().pager.total, 5);
}

#[test]
fn loans_filter_by_status_and_collector() {
    let mut model = load(AppConfig::default());
    send(&mut model, Message::NextTable);
    type_filter(&mut model, CMDMode::Status, "1");
    type_filter(&mut model, CMDMode::Collector, "12");
    assert_eq!(first_column(&model, TableKind::Loans), vec!["Álvaro Núñez"]);
}

#[test]
fn page_size_steps_through_options() {
    let mut model = load(AppConfig::default().page_size(2));
    assert_eq!(model.page(TableKind::Debtors).unwrap().pager.label(), "1 / 2");
    send(&mut model, Message::NextPage);
    assert_eq!(first_column(&model, TableKind::Debtors), vec!["Ñusta Quispe", "Pedro Ruiz"]);
    send(&mut model, Message::PageSizeUp);
    let pager = &model.page(TableKind::Debtors).unwrap().pager;
    assert_eq!((pager.page, pager.page_size, pager.page_count), (1, 10, 1));
    send(&mut model, Message::PageSizeUp);
    assert_eq!(model.page(TableKind::Debtors).unwrap().pager.page_size, 25);
    send(&mut model, Message::PageSizeDown);
    send(&mut model, Message::PageSizeDown);
    assert_eq!(model.page(TableKind::Debtors).unwrap().pager.page_size, 10);
}

#[test]
fn page_size_down_from_unlisted_size_never_grows() {
    let mut model = load(AppConfig::default().page_size(30));
    send(&mut model, Message::PageSizeDown);
    assert_eq!(model.page(TableKind::Debtors).unwrap().pager.page_size, 25);
}

#[test]
fn search_prompt_replaces_previous_query() {
    let mut model = load(AppConfig::default());
    type_filter(&mut model, CMDMode::Search, "pedro");
    assert_eq!(first_column(&model, TableKind::Debtors), vec!["Pedro Ruiz"]);
    type_filter(&mut model, CMDMode::Search, "maría");
    assert_eq!(first_column(&model, TableKind::Debtors), vec!["María López"]);
}

#[test]
fn export_writes_filtered_view() {
    let dir = tempfile::tempdir().unwrap();
    let mut model = load(AppConfig::default().export_dir(dir.path().to_path_buf()));
    send(&mut model, Message::NextTable);
    type_filter(&mut model, CMDMode::Search, "lopez");
    // Free text is accent sensitive; nothing matches "lopez".
    assert_eq!(model.page(TableKind::Loans).unwrap().pager.total, 0);
    type_filter(&mut model, CMDMode::Search, "lópez");
    send(&mut model, Message::Export(ExportFormat::Csv));

    let csv = std::fs::read_to_string(dir.path().join("prestamos.csv")).unwrap();
    assert_eq!(
        csv,
        "Deudor,Monto,Saldo Pendiente,Meses,Fecha,Estado,Cobrador\n\
         María López,1500000,500000,12,\"05/01/2024, 09:30\",Pendiente,Luis Mora"
    );
}
