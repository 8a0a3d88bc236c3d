use std::path::PathBuf;

use derive_setters::Setters;
use polars::error::PolarsError;
use ratatui::crossterm::event::KeyEvent;
use thiserror::Error;

pub const DEFAULT_PAGE_SIZE: usize = 10;
pub const PAGE_SIZE_OPTIONS: [usize; 4] = [10, 25, 50, 100];

pub const HELP_TEXT: &str = "\
Tab / Shift-Tab  switch table
Up / Down        select row
Left / Right     previous / next page
+ / -            page size
o / O            next / previous sort mode
/                search by name
f                filter by status (1 Pendiente, 2 Pagado, 3 En mora)
c                filter by collector id
m                filter by month (YYYY-MM)
x                clear filters
e / E            export csv / excel
y                copy row
d                delete row (debtors, collectors)
r                reload table
?                help
q                quit";

#[derive(Debug, Error)]
pub enum CarteraError {
    #[error("io error: {0}")]
    IoError(#[from] std::io::Error),
    #[error("polars error: {0}")]
    PolarsError(#[from] PolarsError),
    #[error("no data file for table {0}")]
    FileNotFound(String),
    #[error("permission denied: {0}")]
    PermissionDenied(String),
    #[error("invalid path {0}")]
    InvalidPath(String),
    #[error("logging setup failed: {0}")]
    Logging(String),
}

/// The four tables of the dashboard.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TableKind {
    Debtors,
    Loans,
    Payments,
    Collectors,
}

impl TableKind {
    pub const ALL: [TableKind; 4] = [
        TableKind::Debtors,
        TableKind::Loans,
        TableKind::Payments,
        TableKind::Collectors,
    ];

    pub fn title(self) -> &'static str {
        match self {
            TableKind::Debtors => "Deudores",
            TableKind::Loans => "Préstamos",
            TableKind::Payments => "Pagos",
            TableKind::Collectors => "Cobradores",
        }
    }

    /// File stem of the data source file, named after the API resource.
    pub fn source_stem(self) -> &'static str {
        match self {
            TableKind::Debtors => "deudores",
            TableKind::Loans => "prestamos",
            TableKind::Payments => "pagos",
            TableKind::Collectors => "usuarios",
        }
    }

    /// Base name of exported artifacts.
    pub fn export_stem(self) -> &'static str {
        match self {
            TableKind::Debtors => "deudores",
            TableKind::Loans => "prestamos",
            TableKind::Payments => "pagos",
            TableKind::Collectors => "cobradores",
        }
    }

    pub fn index(self) -> usize {
        match self {
            TableKind::Debtors => 0,
            TableKind::Loans => 1,
            TableKind::Payments => 2,
            TableKind::Collectors => 3,
        }
    }

    pub fn next(self) -> Self {
        TableKind::ALL[(self.index() + 1) % TableKind::ALL.len()]
    }

    pub fn prev(self) -> Self {
        TableKind::ALL[(self.index() + TableKind::ALL.len() - 1) % TableKind::ALL.len()]
    }
}

/// Which filter field the command line is editing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CMDMode {
    Search,
    Status,
    Collector,
    Month,
}

impl CMDMode {
    pub fn prompt(self) -> &'static str {
        match self {
            CMDMode::Search => "/",
            CMDMode::Status => "estado: ",
            CMDMode::Collector => "cobrador: ",
            CMDMode::Month => "mes: ",
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExportFormat {
    Csv,
    Xls,
}

#[derive(Debug, Clone)]
pub enum Message {
    Quit,
    NextTable,
    PrevTable,
    MoveUp,
    MoveDown,
    PrevPage,
    NextPage,
    PageSizeUp,
    PageSizeDown,
    NextSortMode,
    PrevSortMode,
    EnterCommand(CMDMode),
    ClearFilters,
    Export(ExportFormat),
    CopyRow,
    Delete,
    Confirm,
    Exit,
    Reload,
    Help,
    RawKey(KeyEvent),
}

#[derive(Debug, Clone, Setters)]
pub struct AppConfig {
    pub data_dir: PathBuf,
    pub export_dir: PathBuf,
    pub page_size: usize,
    pub event_poll_time: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("."),
            export_dir: PathBuf::from("."),
            page_size: DEFAULT_PAGE_SIZE,
            event_poll_time: 100,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_kind_cycles_through_all_tables() {
        let mut kind = TableKind::Debtors;
        for _ in 0..TableKind::ALL.len() {
            kind = kind.next();
        }
        assert_eq!(kind, TableKind::Debtors);
        assert_eq!(TableKind::Debtors.prev(), TableKind::Collectors);
    }

    #[test]
    fn config_setters_chain() {
        let cfg = AppConfig::default().page_size(25).event_poll_time(50);
        assert_eq!(cfg.page_size, 25);
        assert_eq!(cfg.event_poll_time, 50);
    }
}
