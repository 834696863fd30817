//! Common datatypes supporting functions throughout the converter

use std::{collections::HashMap, fmt::Display};

use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::Deserialize;

/// Currency tag stamped into every emitted statement
pub const CURRENCY: &str = "AUD";

/// Format of the date token inside the "Date and time" column (day first,
/// two-digit year)
pub const DATE_FMT: &str = "%d-%m-%y";

/// Payment type marking a transfer between the user's own accounts
pub const INTERNAL_TRANSFER: &str = "Internal Transfer";

/// One record of the ubank CSV export, keyed by the bank's header names.
///
/// All cells arrive as strings; derivation into typed OFX fields happens
/// on demand through the extractor methods in [`ops`](crate::ops). A row
/// is never mutated after it is read.
#[derive(Debug, Deserialize, Clone, Default, PartialEq, Eq)]
pub struct Row {
    /// Time and date of the transaction, e.g. `15-03-23 10:00`
    #[serde(rename = "Date and time")]
    pub(crate) date_time: String,
    /// Amount leaving the account, e.g. `$1,234.56`; empty for credits
    #[serde(rename = "Debit")]
    pub(crate) debit: String,
    /// Amount entering the account; empty for debits
    #[serde(rename = "Credit")]
    pub(crate) credit: String,
    /// Bank's payment classification, e.g. `Purchase`
    #[serde(rename = "Payment type")]
    pub(crate) payment_type: String,
    /// Account the funds came from
    #[serde(rename = "From account")]
    pub(crate) from_account: String,
    /// Account the funds went to; often empty on debits
    #[serde(rename = "To account")]
    pub(crate) to_account: String,
    /// Free-text description
    #[serde(rename = "Description")]
    pub(crate) description: String,
    /// Bank-assigned spending category
    #[serde(rename = "Category")]
    pub(crate) category: String,
    /// Bank-assigned transaction identifier; shared by both legs of an
    /// internal transfer
    #[serde(rename = "Transaction ID")]
    pub(crate) transaction_id: String,
    /// Receipt number; unique per leg
    #[serde(rename = "Receipt number")]
    pub(crate) receipt_number: String,
}

/// Direction of a transaction relative to the account it is keyed to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnKind {
    /// Funds leaving the account
    Debit,
    /// Funds entering the account
    Credit,
}

impl Display for TxnKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TxnKind::Debit => write!(f, "DEBIT"),
            TxnKind::Credit => write!(f, "CREDIT"),
        }
    }
}

/// A [`Row`] mapped into OFX-ready fields.
///
/// Produced on demand by [`Mapping::map`](crate::ofx::Mapping::map) during
/// emission; never stored between runs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Txn {
    /// Posted date
    pub date: NaiveDate,
    /// Amount as exported, always non-negative; the serializer applies
    /// the sign from `kind`
    pub amount: Decimal,
    /// Whether the amount debits or credits the account
    pub kind: TxnKind,
    /// Derived account identifier
    pub account: String,
    /// Counterparty name
    pub payee: String,
    /// Free-text description
    pub description: String,
    /// Spending category; carried for mapping completeness, OFX 1.x has
    /// no tag for it
    pub class: String,
    /// Identifier used as FITID
    pub id: String,
}

/// Inclusive date range covered by a batch of rows
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timespan {
    /// Earliest transaction date seen
    pub(crate) start: NaiveDate,
    /// Latest transaction date seen
    pub(crate) end: NaiveDate,
}

impl Timespan {
    /// Returns the earliest transaction date
    #[must_use]
    #[inline]
    pub fn start(&self) -> NaiveDate {
        self.start
    }

    /// Returns the latest transaction date
    #[must_use]
    #[inline]
    pub fn end(&self) -> NaiveDate {
        self.end
    }
}

/// Rows bucketed by derived account identifier.
///
/// Row insertion order is preserved within a bucket, and buckets iterate
/// in first-occurrence order, so a given input always produces the same
/// files with the same transaction order.
///
/// # Limitations
/// Built once per run from a single batch; no incremental updates.
#[derive(Default, Debug)]
pub struct Ledger {
    /// Storage for the map of account identifier to its rows
    pub(crate) buckets: HashMap<String, Vec<Row>>,
    /// Account identifiers in first-occurrence order
    pub(crate) order: Vec<String>,
}

impl Ledger {
    /// Creates a new, empty [`Ledger`]
    #[must_use]
    pub fn new() -> Self {
        Ledger::default()
    }

    /// Returns the number of account buckets
    #[must_use]
    pub fn len(&self) -> usize {
        self.order.len()
    }

    /// Returns whether the ledger holds no buckets at all
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }
}
