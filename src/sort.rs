//! Per-table ordering rules.
//!
//! Each table type has a closed set of sort modes, each bound to a statically
//! typed comparator. Sorting always works on a copy and is stable, so records
//! that compare equal keep their incoming order.

use std::cmp::Ordering;
use std::fmt::Debug;

use tracing::debug;

use crate::compare::{compare_numeric, compare_text, to_epoch_millis};
use crate::domain::TableKind;
use crate::records::{Collector, Debtor, Loan, Lookups, Payment};

pub trait SortMode: Copy + Eq + Debug + Send + 'static {
    type Record;

    /// Active mode of a freshly created table.
    const DEFAULT: Self;
    /// Presentation order of the selection control.
    const ALL: &'static [Self];

    fn tag(self) -> &'static str;
    fn label(self) -> &'static str;
    fn compare(self, a: &Self::Record, b: &Self::Record, lookups: &Lookups) -> Ordering;

    fn from_tag(tag: &str) -> Option<Self> {
        Self::ALL.iter().copied().find(|m| m.tag() == tag)
    }

    /// Steps through [`SortMode::ALL`], wrapping at both ends.
    fn cycle(self, step: isize) -> Self {
        let len = Self::ALL.len() as isize;
        let pos = Self::ALL.iter().position(|m| *m == self).unwrap_or(0) as isize;
        Self::ALL[(pos + step).rem_euclid(len) as usize]
    }
}

pub fn apply_sort<M>(dataset: &[M::Record], mode: M, lookups: &Lookups) -> Vec<M::Record>
where
    M: SortMode,
    M::Record: Clone,
{
    let mut sorted = dataset.to_vec();
    sorted.sort_by(|a, b| mode.compare(a, b, lookups));
    sorted
}

/// Sorts by a mode tag; an unknown tag returns an unchanged copy.
pub fn apply_sort_tag<M>(dataset: &[M::Record], tag: &str, lookups: &Lookups) -> Vec<M::Record>
where
    M: SortMode,
    M::Record: Clone,
{
    match M::from_tag(tag) {
        Some(mode) => apply_sort(dataset, mode, lookups),
        None => {
            debug!("Unknown sort mode {tag:?}, keeping order");
            dataset.to_vec()
        }
    }
}

pub fn sort_options<M: SortMode>() -> Vec<(&'static str, &'static str)> {
    M::ALL.iter().map(|m| (m.tag(), m.label())).collect()
}

pub fn get_sort_options(kind: TableKind) -> Vec<(&'static str, &'static str)> {
    match kind {
        TableKind::Debtors => sort_options::<DebtorSort>(),
        TableKind::Loans => sort_options::<LoanSort>(),
        TableKind::Payments => sort_options::<PaymentSort>(),
        TableKind::Collectors => sort_options::<CollectorSort>(),
    }
}

fn by_date(a: &str, b: &str) -> Ordering {
    to_epoch_millis(a).cmp(&to_epoch_millis(b))
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DebtorSort {
    NombreAsc,
    NombreDesc,
    IdentificacionAsc,
}

impl SortMode for DebtorSort {
    type Record = Debtor;
    const DEFAULT: Self = DebtorSort::NombreAsc;
    const ALL: &'static [Self] = &[
        DebtorSort::NombreAsc,
        DebtorSort::NombreDesc,
        DebtorSort::IdentificacionAsc,
    ];

    fn tag(self) -> &'static str {
        match self {
            DebtorSort::NombreAsc => "nombre_asc",
            DebtorSort::NombreDesc => "nombre_desc",
            DebtorSort::IdentificacionAsc => "identificacion_asc",
        }
    }

    fn label(self) -> &'static str {
        match self {
            DebtorSort::NombreAsc => "Nombre (A-Z)",
            DebtorSort::NombreDesc => "Nombre (Z-A)",
            DebtorSort::IdentificacionAsc => "Identificación",
        }
    }

    fn compare(self, a: &Debtor, b: &Debtor, _lookups: &Lookups) -> Ordering {
        match self {
            DebtorSort::NombreAsc => compare_text(&a.display_name(), &b.display_name()),
            DebtorSort::NombreDesc => compare_text(&b.display_name(), &a.display_name()),
            DebtorSort::IdentificacionAsc => compare_text(&a.id, &b.id),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CollectorSort {
    NombreAsc,
    NombreDesc,
}

impl SortMode for CollectorSort {
    type Record = Collector;
    const DEFAULT: Self = CollectorSort::NombreAsc;
    const ALL: &'static [Self] = &[CollectorSort::NombreAsc, CollectorSort::NombreDesc];

    fn tag(self) -> &'static str {
        match self {
            CollectorSort::NombreAsc => "nombre_asc",
            CollectorSort::NombreDesc => "nombre_desc",
        }
    }

    fn label(self) -> &'static str {
        match self {
            CollectorSort::NombreAsc => "Nombre (A-Z)",
            CollectorSort::NombreDesc => "Nombre (Z-A)",
        }
    }

    fn compare(self, a: &Collector, b: &Collector, _lookups: &Lookups) -> Ordering {
        match self {
            CollectorSort::NombreAsc => compare_text(&a.display_name(), &b.display_name()),
            CollectorSort::NombreDesc => compare_text(&b.display_name(), &a.display_name()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoanSort {
    FechaDesc,
    FechaAsc,
    MontoDesc,
    MontoAsc,
    SaldoDesc,
    SaldoAsc,
    DeudorAsc,
    DeudorDesc,
    EstadoAsc,
}

impl SortMode for LoanSort {
    type Record = Loan;
    const DEFAULT: Self = LoanSort::FechaDesc;
    const ALL: &'static [Self] = &[
        LoanSort::FechaDesc,
        LoanSort::FechaAsc,
        LoanSort::MontoDesc,
        LoanSort::MontoAsc,
        LoanSort::SaldoDesc,
        LoanSort::SaldoAsc,
        LoanSort::DeudorAsc,
        LoanSort::DeudorDesc,
        LoanSort::EstadoAsc,
    ];

    fn tag(self) -> &'static str {
        match self {
            LoanSort::FechaDesc => "fecha_desc",
            LoanSort::FechaAsc => "fecha_asc",
            LoanSort::MontoDesc => "monto_desc",
            LoanSort::MontoAsc => "monto_asc",
            LoanSort::SaldoDesc => "saldo_desc",
            LoanSort::SaldoAsc => "saldo_asc",
            LoanSort::DeudorAsc => "deudor_asc",
            LoanSort::DeudorDesc => "deudor_desc",
            LoanSort::EstadoAsc => "estado_asc",
        }
    }

    fn label(self) -> &'static str {
        match self {
            LoanSort::FechaDesc => "Fecha (recientes primero)",
            LoanSort::FechaAsc => "Fecha (antiguos primero)",
            LoanSort::MontoDesc => "Monto (mayor a menor)",
            LoanSort::MontoAsc => "Monto (menor a mayor)",
            LoanSort::SaldoDesc => "Saldo (mayor a menor)",
            LoanSort::SaldoAsc => "Saldo (menor a mayor)",
            LoanSort::DeudorAsc => "Deudor (A-Z)",
            LoanSort::DeudorDesc => "Deudor (Z-A)",
            LoanSort::EstadoAsc => "Estado",
        }
    }

    fn compare(self, a: &Loan, b: &Loan, lookups: &Lookups) -> Ordering {
        let debtor = |l: &Loan| lookups.debtor_name(&l.deudor).unwrap_or_default().to_string();
        match self {
            LoanSort::FechaDesc => by_date(&b.fecha, &a.fecha),
            LoanSort::FechaAsc => by_date(&a.fecha, &b.fecha),
            LoanSort::MontoDesc => compare_numeric(Some(b.monto), Some(a.monto)),
            LoanSort::MontoAsc => compare_numeric(Some(a.monto), Some(b.monto)),
            LoanSort::SaldoDesc => {
                compare_numeric(Some(b.saldo_pendiente), Some(a.saldo_pendiente))
            }
            LoanSort::SaldoAsc => compare_numeric(Some(a.saldo_pendiente), Some(b.saldo_pendiente)),
            LoanSort::DeudorAsc => compare_text(&debtor(a), &debtor(b)),
            LoanSort::DeudorDesc => compare_text(&debtor(b), &debtor(a)),
            LoanSort::EstadoAsc => a.estado.cmp(&b.estado),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PaymentSort {
    FechaDesc,
    FechaAsc,
    MontoDesc,
    MontoAsc,
    DeudorAsc,
    DeudorDesc,
}

impl SortMode for PaymentSort {
    type Record = Payment;
    const DEFAULT: Self = PaymentSort::FechaDesc;
    const ALL: &'static [Self] = &[
        PaymentSort::FechaDesc,
        PaymentSort::FechaAsc,
        PaymentSort::MontoDesc,
        PaymentSort::MontoAsc,
        PaymentSort::DeudorAsc,
        PaymentSort::DeudorDesc,
    ];

    fn tag(self) -> &'static str {
        match self {
            PaymentSort::FechaDesc => "fecha_desc",
            PaymentSort::FechaAsc => "fecha_asc",
            PaymentSort::MontoDesc => "monto_desc",
            PaymentSort::MontoAsc => "monto_asc",
            PaymentSort::DeudorAsc => "deudor_asc",
            PaymentSort::DeudorDesc => "deudor_desc",
        }
    }

    fn label(self) -> &'static str {
        match self {
            PaymentSort::FechaDesc => "Fecha (recientes primero)",
            PaymentSort::FechaAsc => "Fecha (antiguos primero)",
            PaymentSort::MontoDesc => "Monto (mayor a menor)",
            PaymentSort::MontoAsc => "Monto (menor a mayor)",
            PaymentSort::DeudorAsc => "Deudor (A-Z)",
            PaymentSort::DeudorDesc => "Deudor (Z-A)",
        }
    }

    fn compare(self, a: &Payment, b: &Payment, lookups: &Lookups) -> Ordering {
        match self {
            PaymentSort::FechaDesc => by_date(&b.fecha, &a.fecha),
            PaymentSort::FechaAsc => by_date(&a.fecha, &b.fecha),
            PaymentSort::MontoDesc => compare_numeric(Some(b.monto_pagado), Some(a.monto_pagado)),
            PaymentSort::MontoAsc => compare_numeric(Some(a.monto_pagado), Some(b.monto_pagado)),
            PaymentSort::DeudorAsc => compare_text(
                &lookups.payment_debtor_name(&a.prestamo),
                &lookups.payment_debtor_name(&b.prestamo),
            ),
            PaymentSort::DeudorDesc => compare_text(
                &lookups.payment_debtor_name(&b.prestamo),
                &lookups.payment_debtor_name(&a.prestamo),
            ),
        }
    }
}
