//! Predicate-based subsetting.
//!
//! Criteria are ANDed. An empty criterion matches everything, and so does a
//! criterion the record type has no field for.

use chrono::NaiveDate;
use tracing::trace;

use crate::compare::normalize_text;
use crate::records::{Collector, Debtor, Loan, Lookups, Payment, Record};

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FilterCriteria {
    pub text: Option<String>,
    pub status: Option<String>,
    pub collector: Option<String>,
    /// `YYYY-MM`
    pub month: Option<String>,
}

/// `true` for a `YYYY-MM` month with a real month number.
pub fn valid_month(month: &str) -> bool {
    let b = month.as_bytes();
    month.len() == 7
        && b[4] == b'-'
        && b.iter().enumerate().all(|(i, c)| i == 4 || c.is_ascii_digit())
        && NaiveDate::parse_from_str(&format!("{month}-01"), "%Y-%m-%d").is_ok()
}

fn active(criterion: &Option<String>) -> Option<&str> {
    criterion.as_deref().map(str::trim).filter(|s| !s.is_empty())
}

impl FilterCriteria {
    pub fn is_empty(&self) -> bool {
        active(&self.text).is_none()
            && active(&self.status).is_none()
            && active(&self.collector).is_none()
            && active(&self.month).is_none()
    }

    /// One-line summary for the status bar.
    pub fn describe(&self) -> String {
        let mut parts = Vec::new();
        if let Some(t) = active(&self.text) {
            parts.push(format!("texto={t}"));
        }
        if let Some(s) = active(&self.status) {
            parts.push(format!("estado={s}"));
        }
        if let Some(c) = active(&self.collector) {
            parts.push(format!("cobrador={c}"));
        }
        if let Some(m) = active(&self.month) {
            parts.push(format!("mes={m}"));
        }
        parts.join(" ")
    }
}

/// Fields a record exposes to the filter engine. `None` means the record
/// type has no such field.
pub trait Filterable {
    /// Candidate strings for the free-text criterion.
    fn search_candidates(&self, lookups: &Lookups) -> Vec<String>;

    fn status_code(&self) -> Option<String> {
        None
    }

    fn collector_id(&self) -> Option<String> {
        None
    }

    fn date(&self) -> Option<&str> {
        None
    }
}

pub fn matches<R: Filterable>(record: &R, criteria: &FilterCriteria, lookups: &Lookups) -> bool {
    if let Some(q) = active(&criteria.text) {
        let q = normalize_text(Some(q));
        let hit = record
            .search_candidates(lookups)
            .iter()
            .any(|c| normalize_text(Some(c)).contains(&q));
        if !hit {
            return false;
        }
    }
    if let (Some(want), Some(have)) = (active(&criteria.status), record.status_code())
        && have != want
    {
        return false;
    }
    if let (Some(want), Some(have)) = (active(&criteria.collector), record.collector_id())
        && have != want
    {
        return false;
    }
    // A malformed month matches nothing.
    if let (Some(month), Some(date)) = (active(&criteria.month), record.date())
        && !(valid_month(month) && date.trim().get(..7) == Some(month))
    {
        return false;
    }
    true
}

pub fn filter_dataset<R: Record>(dataset: &[R], criteria: &FilterCriteria, lookups: &Lookups) -> Vec<R> {
    let filtered: Vec<R> = dataset
        .iter()
        .filter(|r| r.is_listed() && matches(*r, criteria, lookups))
        .cloned()
        .collect();
    trace!(
        "Filter {:?} kept {}/{} {:?} records",
        criteria.describe(),
        filtered.len(),
        dataset.len(),
        R::KIND
    );
    filtered
}

impl Filterable for Debtor {
    fn search_candidates(&self, _lookups: &Lookups) -> Vec<String> {
        let ident = if self.identificacion.is_empty() {
            self.id.clone()
        } else {
            self.identificacion.clone()
        };
        vec![self.display_name(), ident]
    }

    fn collector_id(&self) -> Option<String> {
        Some(self.cobrador_id.clone())
    }
}

impl Filterable for Collector {
    fn search_candidates(&self, _lookups: &Lookups) -> Vec<String> {
        vec![self.display_name()]
    }
}

impl Filterable for Loan {
    fn search_candidates(&self, lookups: &Lookups) -> Vec<String> {
        vec![lookups.debtor_name(&self.deudor).unwrap_or_default().to_string()]
    }

    fn status_code(&self) -> Option<String> {
        Some(self.estado.to_string())
    }

    fn collector_id(&self) -> Option<String> {
        Some(self.cobrador.clone())
    }

    fn date(&self) -> Option<&str> {
        Some(&self.fecha)
    }
}

impl Filterable for Payment {
    fn search_candidates(&self, lookups: &Lookups) -> Vec<String> {
        vec![lookups.payment_debtor_name(&self.prestamo)]
    }

    fn date(&self) -> Option<&str> {
        Some(&self.fecha)
    }
}
