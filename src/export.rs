//! Serialization of a table's full view into download artifacts.
//!
//! Row cells come from the same derivation the screen uses, so an export
//! always matches what was last rendered.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use tracing::{debug, info};

use crate::compare::format_date;
use crate::domain::{CarteraError, ExportFormat, TableKind};
use crate::records::{Collector, Debtor, Loan, Lookups, Payment, Resolved, status_label};

#[derive(Debug, Clone, PartialEq)]
pub enum Cell {
    Text(String),
    Number(f64),
}

impl fmt::Display for Cell {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Cell::Text(s) => f.write_str(s),
            Cell::Number(n) => write!(f, "{n}"),
        }
    }
}

impl From<&str> for Cell {
    fn from(s: &str) -> Self {
        Cell::Text(s.to_string())
    }
}

impl From<String> for Cell {
    fn from(s: String) -> Self {
        Cell::Text(s)
    }
}

impl From<f64> for Cell {
    fn from(n: f64) -> Self {
        Cell::Number(n)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ExportTable {
    pub headers: Vec<String>,
    pub rows: Vec<Vec<Cell>>,
}

/// Column layout of a record type, shared by rendering and export.
pub trait Tabular {
    fn headers() -> &'static [&'static str];
    fn cells(&self, lookups: &Lookups) -> Vec<Cell>;
}

pub fn build_export_table<R: Tabular>(view: &[R], lookups: &Lookups) -> ExportTable {
    ExportTable {
        headers: R::headers().iter().map(|h| h.to_string()).collect(),
        rows: view.iter().map(|r| r.cells(lookups)).collect(),
    }
}

fn quote_cell(v: &str) -> String {
    if v.contains(['"', ',', '\n', ';']) {
        format!("\"{}\"", v.replace('"', "\"\""))
    } else {
        v.to_string()
    }
}

/// One line per row, cells separated by commas.
pub fn to_delimited_row(row: &[Cell]) -> String {
    row.iter()
        .map(|c| quote_cell(&c.to_string()))
        .collect::<Vec<_>>()
        .join(",")
}

pub fn to_delimited_text(matrix: &[Vec<Cell>]) -> String {
    matrix
        .iter()
        .map(|row| to_delimited_row(row))
        .collect::<Vec<_>>()
        .join("\n")
}

pub fn escape_html(v: &str) -> String {
    v.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
        .replace('\'', "&#39;")
}

pub fn to_markup_table(headers: &[String], rows: &[Vec<Cell>]) -> String {
    let head: String = headers
        .iter()
        .map(|h| format!("<th>{}</th>", escape_html(h)))
        .collect();
    let body: String = rows
        .iter()
        .map(|cells| {
            let tds: String = cells
                .iter()
                .map(|c| format!("<td>{}</td>", escape_html(&c.to_string())))
                .collect();
            format!("<tr>{tds}</tr>")
        })
        .collect();
    format!(
        "<!doctype html><html><head><meta charset=\"utf-8\"></head><body><table><tr>{head}</tr>{body}</table></body></html>"
    )
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Xls => "xls",
        }
    }

    pub fn mime(self) -> &'static str {
        match self {
            ExportFormat::Csv => "text/csv;charset=utf-8;",
            ExportFormat::Xls => "application/vnd.ms-excel;charset=utf-8;",
        }
    }

    pub fn render(self, table: &ExportTable) -> String {
        match self {
            ExportFormat::Csv => {
                let mut matrix = Vec::with_capacity(table.rows.len() + 1);
                matrix.push(table.headers.iter().map(|h| Cell::from(h.as_str())).collect());
                matrix.extend(table.rows.iter().cloned());
                to_delimited_text(&matrix)
            }
            ExportFormat::Xls => to_markup_table(&table.headers, &table.rows),
        }
    }
}

pub fn export_filename(kind: TableKind, format: ExportFormat) -> String {
    format!("{}.{}", kind.export_stem(), format.extension())
}

/// Receives a finished artifact and saves it somewhere the user can reach.
pub trait Download {
    fn download(&mut self, payload: &[u8], filename: &str, mime: &str) -> Result<PathBuf, CarteraError>;
}

/// Saves artifacts into a directory, creating it when needed.
#[derive(Debug, Clone)]
pub struct FileDownload {
    dir: PathBuf,
}

impl FileDownload {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl Download for FileDownload {
    fn download(&mut self, payload: &[u8], filename: &str, mime: &str) -> Result<PathBuf, CarteraError> {
        fs::create_dir_all(&self.dir)?;
        let path = self.dir.join(filename);
        debug!("Writing {} bytes ({mime}) to {}", payload.len(), path.display());
        fs::write(&path, payload)?;
        info!("Exported {}", path.display());
        Ok(path)
    }
}

fn resolved_or(resolved: Resolved, missing: &str) -> String {
    match resolved {
        Resolved::Name(n) => n,
        Resolved::LoanMissing => "Préstamo no encontrado".to_string(),
        Resolved::Missing => missing.to_string(),
    }
}

impl Tabular for Debtor {
    fn headers() -> &'static [&'static str] {
        &["Nombre", "Identificación", "Teléfono", "Dirección", "Tipo"]
    }

    fn cells(&self, _lookups: &Lookups) -> Vec<Cell> {
        vec![
            self.display_name().into(),
            self.id.as_str().into(),
            self.telefono.as_str().into(),
            self.direccion.as_str().into(),
            self.tipo_label().into(),
        ]
    }
}

impl Tabular for Collector {
    fn headers() -> &'static [&'static str] {
        &["Nombre", "Identificación", "Teléfono"]
    }

    fn cells(&self, _lookups: &Lookups) -> Vec<Cell> {
        vec![
            self.display_name().into(),
            self.identificacion.as_str().into(),
            self.telefono.as_str().into(),
        ]
    }
}

impl Tabular for Loan {
    fn headers() -> &'static [&'static str] {
        &["Deudor", "Monto", "Saldo Pendiente", "Meses", "Fecha", "Estado", "Cobrador"]
    }

    fn cells(&self, lookups: &Lookups) -> Vec<Cell> {
        let debtor = lookups
            .debtor_name(&self.deudor)
            .map(str::to_string)
            .unwrap_or_else(|| format!("ID: {}", self.deudor));
        let collector = lookups
            .collector_name(&self.cobrador)
            .map(str::to_string)
            .unwrap_or_else(|| format!("ID: {}", self.cobrador));
        vec![
            debtor.into(),
            self.monto.into(),
            self.saldo_pendiente.into(),
            self.meses
                .map(|m| Cell::Number(m as f64))
                .unwrap_or_else(|| Cell::Text(String::new())),
            format_date(&self.fecha).into(),
            status_label(self.estado).into(),
            collector.into(),
        ]
    }
}

impl Tabular for Payment {
    fn headers() -> &'static [&'static str] {
        &["Deudor", "Cobrador", "Monto", "Fecha"]
    }

    fn cells(&self, lookups: &Lookups) -> Vec<Cell> {
        vec![
            resolved_or(lookups.payment_debtor(&self.prestamo), "Deudor no encontrado").into(),
            resolved_or(lookups.payment_collector(&self.prestamo), "Cobrador no encontrado").into(),
            self.monto_pagado.into(),
            format_date(&self.fecha).into(),
        ]
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn csv_quotes_only_when_needed() {
        let matrix = vec![
            vec![Cell::from("plain"), Cell::from(1500000.0)],
            vec![Cell::from("a;b"), Cell::from("line\nbreak")],
            vec![Cell::from("O'Brian, \"Tex\""), Cell::from(1.5)],
        ];
        assert_eq!(
            to_delimited_text(&matrix),
            "plain,1500000\n\"a;b\",\"line\nbreak\"\n\"O'Brian, \"\"Tex\"\"\",1.5"
        );
    }

    #[test]
    fn markup_escapes_every_cell() {
        let html = to_markup_table(
            &["<Nombre>".to_string()],
            &[vec![Cell::from("O'Brian, \"Tex\" & co")]],
        );
        assert!(html.contains("<th>&lt;Nombre&gt;</th>"));
        assert!(html.contains("<td>O&#39;Brian, &quot;Tex&quot; &amp; co</td>"));
        assert!(html.starts_with("<!doctype html>"));
        assert!(html.ends_with("</table></body></html>"));
    }

    #[test]
    fn loan_cells_resolve_names_and_labels() {
        let loan = Loan {
            deudor: "4".into(),
            cobrador: "9".into(),
            monto: 1000.0,
            saldo_pendiente: 250.0,
            meses: Some(6),
            fecha: "2024-01-05".into(),
            estado: 3,
            ..Default::default()
        };
        let collectors = vec![Collector {
            id: "9".into(),
            nombre: "Luis".into(),
            apellido: "Mora".into(),
            rol: 2,
            ..Default::default()
        }];
        let lookups = Lookups::build(&[], &collectors, &[]);
        assert_eq!(
            loan.cells(&lookups),
            vec![
                Cell::from("ID: 4"),
                Cell::Number(1000.0),
                Cell::Number(250.0),
                Cell::Number(6.0),
                Cell::from("05/01/2024, 00:00"),
                Cell::from("En mora"),
                Cell::from("Luis Mora"),
            ]
        );
    }

    #[test]
    fn payment_cells_report_missing_chain() {
        let payment = Payment {
            prestamo: "77".into(),
            monto_pagado: 5.0,
            ..Default::default()
        };
        let cells = payment.cells(&Lookups::default());
        assert_eq!(cells[0], Cell::from("Préstamo no encontrado"));
        assert_eq!(cells[1], Cell::from("Préstamo no encontrado"));
        assert_eq!(cells[3], Cell::from(""));
    }

    #[test]
    fn export_table_covers_whole_view() {
        let view: Vec<Debtor> = (0..13)
            .map(|i| Debtor {
                id: i.to_string(),
                ..Default::default()
            })
            .collect();
        let table = build_export_table(&view, &Lookups::default());
        assert_eq!(table.rows.len(), 13);
        assert_eq!(table.headers[1], "Identificación");
    }

    #[test]
    fn csv_render_puts_headers_first() {
        let table = ExportTable {
            headers: vec!["Nombre".into(), "Monto".into()],
            rows: vec![vec![Cell::from("Ana"), Cell::from(10.0)]],
        };
        assert_eq!(ExportFormat::Csv.render(&table), "Nombre,Monto\nAna,10");
    }

    #[test]
    fn file_download_writes_payload() {
        let dir = tempfile::tempdir().unwrap();
        let mut download = FileDownload::new(dir.path().join("out"));
        let path = download
            .download(b"a,b", &export_filename(TableKind::Collectors, ExportFormat::Csv), ExportFormat::Csv.mime())
            .unwrap();
        assert!(path.ends_with("cobradores.csv"));
        assert_eq!(std::fs::read_to_string(path).unwrap(), "a,b");
    }
}
