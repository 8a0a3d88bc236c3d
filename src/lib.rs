//! Terminal dashboard over a lending portfolio: debtors, loans, payments and
//! collectors, each browsable as a filtered, sorted, paginated and exportable
//! table.

pub mod compare;
pub mod controller;
pub mod domain;
pub mod export;
pub mod filter;
pub mod inputter;
pub mod model;
pub mod paging;
pub mod records;
pub mod sort;
pub mod source;
pub mod table;
pub mod ui;
