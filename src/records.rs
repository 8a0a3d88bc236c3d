//! Typed records and the ingestion boundary.
//!
//! Every raw field goes through [`Fields`] exactly once. Missing, null or
//! malformed values become `""` or `0` there, so nothing past this module has
//! to guard against bad data.

use std::collections::HashMap;
use std::fmt::Debug;

use tracing::trace;

use crate::domain::TableKind;
use crate::export::Tabular;
use crate::filter::Filterable;
use crate::sort::SortMode;

/// A record as delivered by the data source: column name to string value,
/// null values left out.
pub type RawRecord = HashMap<String, String>;

/// Normalizing accessor over a raw record.
pub struct Fields<'a>(pub &'a RawRecord);

impl Fields<'_> {
    pub fn text(&self, name: &str) -> String {
        self.0
            .get(name)
            .map(|s| s.trim().to_string())
            .unwrap_or_default()
    }

    /// Ids are compared as strings; numeric ids lose a trailing `.0` so `5`
    /// and `5.0` name the same entity.
    pub fn id(&self, name: &str) -> String {
        let raw = self.text(name);
        match raw.strip_suffix(".0") {
            Some(int) if !int.is_empty() && int.chars().all(|c| c.is_ascii_digit() || c == '-') => {
                int.to_string()
            }
            _ => raw,
        }
    }

    pub fn number(&self, name: &str) -> f64 {
        self.0
            .get(name)
            .and_then(|s| s.trim().parse::<f64>().ok())
            .filter(|v| v.is_finite())
            .unwrap_or(0.0)
    }

    pub fn opt_integer(&self, name: &str) -> Option<i64> {
        let s = self.0.get(name)?.trim();
        s.parse::<i64>()
            .ok()
            .or_else(|| s.parse::<f64>().ok().filter(|v| v.is_finite()).map(|v| v as i64))
    }

    pub fn integer(&self, name: &str) -> i64 {
        self.opt_integer(name).unwrap_or(0)
    }
}

/// A record type that can back a table.
pub trait Record: Clone + Debug + Send + Filterable + Tabular + 'static {
    const KIND: TableKind;
    type Sort: SortMode<Record = Self>;

    fn from_raw(raw: &RawRecord) -> Self;

    /// Identity used for deletion.
    fn id(&self) -> &str;

    /// Rows hidden from the table regardless of the filter criteria.
    fn is_listed(&self) -> bool {
        true
    }
}

pub fn ingest<R: Record>(raw: &[RawRecord]) -> Vec<R> {
    let records: Vec<R> = raw.iter().map(R::from_raw).collect();
    trace!("Ingested {} {:?} records", records.len(), R::KIND);
    records
}

fn full_name(nombre: &str, apellido: &str) -> String {
    format!("{nombre} {apellido}").trim().to_string()
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Debtor {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub identificacion: String,
    pub telefono: String,
    pub direccion: String,
    pub tipo: String,
    pub cobrador_id: String,
}

impl Debtor {
    pub fn display_name(&self) -> String {
        full_name(&self.nombre, &self.apellido)
    }

    pub fn tipo_label(&self) -> &'static str {
        match self.tipo.as_str() {
            "1" => "normal",
            "2" => "especial",
            _ => "",
        }
    }
}

impl Record for Debtor {
    const KIND: TableKind = TableKind::Debtors;
    type Sort = crate::sort::DebtorSort;

    fn from_raw(raw: &RawRecord) -> Self {
        let f = Fields(raw);
        Debtor {
            id: f.id("id"),
            nombre: f.text("nombre"),
            apellido: f.text("apellido"),
            identificacion: f.text("identificacion"),
            telefono: f.text("telefono"),
            direccion: f.text("direccion"),
            tipo: f.id("tipo"),
            cobrador_id: f.id("cobrador_id"),
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Collector {
    pub id: String,
    pub nombre: String,
    pub apellido: String,
    pub identificacion: String,
    pub telefono: String,
    pub rol: i64,
}

pub const ROLE_ADMIN: i64 = 1;
pub const ROLE_COLLECTOR: i64 = 2;

impl Collector {
    pub fn display_name(&self) -> String {
        full_name(&self.nombre, &self.apellido)
    }
}

impl Record for Collector {
    const KIND: TableKind = TableKind::Collectors;
    type Sort = crate::sort::CollectorSort;

    fn from_raw(raw: &RawRecord) -> Self {
        let f = Fields(raw);
        Collector {
            id: f.id("id"),
            nombre: f.text("nombre"),
            apellido: f.text("apellido"),
            identificacion: f.text("identificacion"),
            telefono: f.text("telefono"),
            rol: f.integer("rol"),
        }
    }

    fn id(&self) -> &str {
        &self.id
    }

    // Administrators share the users resource but are not collectors.
    fn is_listed(&self) -> bool {
        self.rol == ROLE_COLLECTOR
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Loan {
    pub id: String,
    pub deudor: String,
    pub cobrador: String,
    pub monto: f64,
    pub saldo_pendiente: f64,
    pub interes: f64,
    pub meses: Option<i64>,
    pub fecha: String,
    pub estado: i64,
}

impl Record for Loan {
    const KIND: TableKind = TableKind::Loans;
    type Sort = crate::sort::LoanSort;

    fn from_raw(raw: &RawRecord) -> Self {
        let f = Fields(raw);
        Loan {
            id: f.id("id"),
            deudor: f.id("deudor"),
            cobrador: f.id("cobrador"),
            monto: f.number("monto"),
            saldo_pendiente: f.number("saldo_pendiente"),
            interes: f.number("interes"),
            meses: f.opt_integer("meses"),
            fecha: f.text("fecha"),
            estado: f.integer("estado"),
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

#[derive(Debug, Clone, Default, PartialEq)]
pub struct Payment {
    pub id: String,
    pub prestamo: String,
    pub monto_pagado: f64,
    pub fecha: String,
}

impl Record for Payment {
    const KIND: TableKind = TableKind::Payments;
    type Sort = crate::sort::PaymentSort;

    fn from_raw(raw: &RawRecord) -> Self {
        let f = Fields(raw);
        Payment {
            id: f.id("id"),
            prestamo: f.id("prestamo"),
            monto_pagado: f.number("monto_pagado"),
            fecha: f.text("fecha"),
        }
    }

    fn id(&self) -> &str {
        &self.id
    }
}

pub const STATUS_PENDING: i64 = 1;
pub const STATUS_PAID: i64 = 2;
pub const STATUS_OVERDUE: i64 = 3;

pub fn status_label(code: i64) -> &'static str {
    match code {
        STATUS_PENDING => "Pendiente",
        STATUS_PAID => "Pagado",
        STATUS_OVERDUE => "En mora",
        _ => "Desconocido",
    }
}

#[derive(Debug, Clone, Default)]
struct LoanRef {
    deudor: String,
    cobrador: String,
}

/// Resolves foreign ids to display names.
#[derive(Debug, Clone, Default)]
pub struct Lookups {
    debtors: HashMap<String, String>,
    collectors: HashMap<String, String>,
    loans: HashMap<String, LoanRef>,
}

/// How a payment's loan chain resolved.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Resolved {
    Name(String),
    LoanMissing,
    Missing,
}

impl Lookups {
    pub fn build(debtors: &[Debtor], collectors: &[Collector], loans: &[Loan]) -> Self {
        Lookups {
            debtors: debtors
                .iter()
                .map(|d| (d.id.clone(), d.display_name()))
                .collect(),
            collectors: collectors
                .iter()
                .map(|c| (c.id.clone(), c.display_name()))
                .collect(),
            loans: loans
                .iter()
                .map(|l| {
                    (
                        l.id.clone(),
                        LoanRef {
                            deudor: l.deudor.clone(),
                            cobrador: l.cobrador.clone(),
                        },
                    )
                })
                .collect(),
        }
    }

    pub fn debtor_name(&self, id: &str) -> Option<&str> {
        self.debtors.get(id).map(String::as_str)
    }

    pub fn collector_name(&self, id: &str) -> Option<&str> {
        self.collectors.get(id).map(String::as_str)
    }

    pub fn payment_debtor(&self, loan_id: &str) -> Resolved {
        match self.loans.get(loan_id) {
            None => Resolved::LoanMissing,
            Some(loan) => self
                .debtor_name(&loan.deudor)
                .map(|n| Resolved::Name(n.to_string()))
                .unwrap_or(Resolved::Missing),
        }
    }

    pub fn payment_collector(&self, loan_id: &str) -> Resolved {
        match self.loans.get(loan_id) {
            None => Resolved::LoanMissing,
            Some(loan) => self
                .collector_name(&loan.cobrador)
                .map(|n| Resolved::Name(n.to_string()))
                .unwrap_or(Resolved::Missing),
        }
    }

    /// Debtor name behind a payment, "" when the chain does not resolve.
    pub fn payment_debtor_name(&self, loan_id: &str) -> String {
        match self.payment_debtor(loan_id) {
            Resolved::Name(n) => n,
            _ => String::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw(pairs: &[(&str, &str)]) -> RawRecord {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn missing_fields_default_to_empty_and_zero() {
        let loan = Loan::from_raw(&raw(&[("id", "7"), ("monto", "abc")]));
        assert_eq!(loan.id, "7");
        assert_eq!(loan.monto, 0.0);
        assert_eq!(loan.saldo_pendiente, 0.0);
        assert_eq!(loan.meses, None);
        assert_eq!(loan.estado, 0);
        assert_eq!(loan.fecha, "");
    }

    #[test]
    fn float_ids_match_integer_ids() {
        let loan = Loan::from_raw(&raw(&[("deudor", "5.0"), ("estado", "2.0")]));
        assert_eq!(loan.deudor, "5");
        assert_eq!(loan.estado, 2);
        assert_eq!(Fields(&raw(&[("x", "1.05")])).id("x"), "1.05");
    }

    #[test]
    fn collectors_hide_admins() {
        let admin = Collector::from_raw(&raw(&[("rol", "1")]));
        let collector = Collector::from_raw(&raw(&[("rol", "2")]));
        assert!(!admin.is_listed());
        assert!(collector.is_listed());
    }

    #[test]
    fn debtor_labels() {
        let d = Debtor::from_raw(&raw(&[("nombre", "Ana"), ("tipo", "2")]));
        assert_eq!(d.display_name(), "Ana");
        assert_eq!(d.tipo_label(), "especial");
    }

    #[test]
    fn payment_chain_resolution() {
        let debtors = vec![Debtor {
            id: "1".into(),
            nombre: "Ana".into(),
            apellido: "Gómez".into(),
            ..Default::default()
        }];
        let loans = vec![
            Loan {
                id: "10".into(),
                deudor: "1".into(),
                cobrador: "9".into(),
                ..Default::default()
            },
            Loan {
                id: "11".into(),
                deudor: "2".into(),
                ..Default::default()
            },
        ];
        let lookups = Lookups::build(&debtors, &[], &loans);
        assert_eq!(lookups.payment_debtor("10"), Resolved::Name("Ana Gómez".into()));
        assert_eq!(lookups.payment_debtor("11"), Resolved::Missing);
        assert_eq!(lookups.payment_debtor("12"), Resolved::LoanMissing);
        assert_eq!(lookups.payment_collector("10"), Resolved::Missing);
        assert_eq!(lookups.payment_debtor_name("12"), "");
    }

    #[test]
    fn status_labels() {
        assert_eq!(status_label(1), "Pendiente");
        assert_eq!(status_label(2), "Pagado");
        assert_eq!(status_label(3), "En mora");
        assert_eq!(status_label(0), "Desconocido");
    }
}
