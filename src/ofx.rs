//! OFX 1.02 statement assembly and serialization.
//!
//! One [`OfxStatement`] holds one account's transactions for one run. The
//! serialized form is a three-part SGML document: a header (OFX
//! declaration, signon block, statement opening), one chunk per
//! transaction, and a footer closing the aggregates. [`Chunks`] yields
//! those parts in order as an explicit finite sequence.

use std::collections::HashSet;
use std::io::Write;

use chrono::{NaiveDate, NaiveDateTime};
use rust_decimal::Decimal;

use crate::errors::Error;
use crate::types::{Row, Txn, TxnKind, CURRENCY, DATE_FMT};

/// Predicate deciding whether a row is emitted at all
pub type RowFilter = fn(&Row) -> bool;

/// Field-mapping strategy handed to the emission pipeline.
///
/// Fixed at construction: the currency tag, the date parse format, and an
/// optional row filter. Earlier exporters dropped internal transfers via
/// the filter; the default mapping keeps every row and synthesizes a
/// payee for internal legs instead.
#[derive(Debug, Clone)]
pub struct Mapping {
    /// Currency tag written as CURDEF
    pub currency: &'static str,
    /// chrono format of the date token in the "Date and time" column
    pub date_fmt: &'static str,
    /// Rows failing this predicate are dropped before mapping
    pub filter: Option<RowFilter>,
}

impl Default for Mapping {
    fn default() -> Self {
        Self {
            currency: CURRENCY,
            date_fmt: DATE_FMT,
            filter: None,
        }
    }
}

impl Mapping {
    /// The mapping used for ubank exports: AUD, day-first dates, every
    /// row kept
    #[must_use]
    pub fn ubank() -> Self {
        Self::default()
    }

    /// Whether the row survives the mapping's filter
    #[must_use]
    pub fn retain(&self, row: &Row) -> bool {
        self.filter.map_or(true, |keep| keep(row))
    }

    /// Derives the OFX-ready fields from one row.
    /// # Errors
    /// Date or amount derivation failures; see [`Row::date_in`] and
    /// [`Row::amount`]
    pub fn map(&self, row: &Row) -> Result<Txn, Error> {
        Ok(Txn {
            date: row.date_in(self.date_fmt)?,
            amount: row.amount()?,
            kind: row.kind(),
            account: row.account().to_string(),
            payee: row.payee().to_string(),
            description: row.description().to_string(),
            class: row.class().to_string(),
            id: row.txn_id().to_string(),
        })
    }
}

/// One account's transactions, assembled and ready to serialize
#[derive(Debug)]
pub struct OfxStatement {
    /// Account identifier written as ACCTID
    account: String,
    /// Currency tag written as CURDEF
    currency: &'static str,
    /// Generation timestamp written as DTSERVER; supplied by the caller
    dtserver: NaiveDateTime,
    /// Earliest posted date in the statement
    dtstart: NaiveDate,
    /// Latest posted date in the statement
    dtend: NaiveDate,
    /// Transactions in input order, FITIDs already unique
    txns: Vec<Txn>,
}

impl OfxStatement {
    /// Filters, maps and cleans one account bucket.
    ///
    /// Rows failing the mapping's filter are dropped; among the rest,
    /// duplicate FITIDs keep their first occurrence only. The statement's
    /// DTSTART/DTEND are the min/max posted date of what remains.
    /// Returns `Ok(None)` when nothing survives.
    /// # Errors
    /// Any retained row failing field derivation fails the whole build.
    pub fn build(
        account: &str,
        rows: &[Row],
        mapping: &Mapping,
        dtserver: NaiveDateTime,
    ) -> Result<Option<Self>, Error> {
        let mut txns: Vec<Txn> = Vec::new();
        let mut seen = HashSet::new();
        for row in rows {
            if !mapping.retain(row) {
                continue;
            }
            let txn = mapping.map(row)?;
            if seen.insert(txn.id.clone()) {
                txns.push(txn);
            }
        }
        let Some(first) = txns.first() else {
            return Ok(None);
        };
        let (mut dtstart, mut dtend) = (first.date, first.date);
        for txn in &txns {
            dtstart = dtstart.min(txn.date);
            dtend = dtend.max(txn.date);
        }
        Ok(Some(Self {
            account: account.to_string(),
            currency: mapping.currency,
            dtserver,
            dtstart,
            dtend,
            txns,
        }))
    }

    /// Returns the number of transactions in the statement, at least one
    #[must_use]
    pub fn txn_count(&self) -> usize {
        self.txns.len()
    }

    /// The document as a finite sequence of text chunks: one header, one
    /// chunk per transaction, one footer. Single pass, not restartable;
    /// call again for a fresh pass.
    #[must_use]
    pub fn chunks(&self) -> Chunks<'_> {
        Chunks {
            statement: self,
            state: ChunkState::Header,
        }
    }

    /// Serializes the whole statement into `writer`, chunk by chunk.
    /// # Errors
    /// [`Error::Io`] if the writer fails
    pub fn write_to<W: Write>(&self, writer: &mut W) -> Result<(), Error> {
        for chunk in self.chunks() {
            writer.write_all(chunk.as_bytes())?;
        }
        Ok(())
    }

    /// OFX 1.02 declaration, signon block, and statement opening up to
    /// and including the transaction list's date range
    fn header(&self) -> String {
        format!(
            "OFXHEADER:100\n\
             DATA:OFXSGML\n\
             VERSION:102\n\
             SECURITY:NONE\n\
             ENCODING:UTF-8\n\
             CHARSET:NONE\n\
             COMPRESSION:NONE\n\
             OLDFILEUID:NONE\n\
             NEWFILEUID:NONE\n\
             \n\
             <OFX>\n\
             <SIGNONMSGSRSV1>\n\
             <SONRS>\n\
             <STATUS>\n\
             <CODE>0\n\
             <SEVERITY>INFO\n\
             </STATUS>\n\
             <DTSERVER>{dtserver}\n\
             <LANGUAGE>ENG\n\
             </SONRS>\n\
             </SIGNONMSGSRSV1>\n\
             <BANKMSGSRSV1>\n\
             <STMTTRNRS>\n\
             <TRNUID>1\n\
             <STATUS>\n\
             <CODE>0\n\
             <SEVERITY>INFO\n\
             </STATUS>\n\
             <STMTRS>\n\
             <CURDEF>{currency}\n\
             <BANKACCTFROM>\n\
             <ACCTID>{account}\n\
             <ACCTTYPE>CHECKING\n\
             </BANKACCTFROM>\n\
             <BANKTRANLIST>\n\
             <DTSTART>{dtstart}\n\
             <DTEND>{dtend}\n",
            dtserver = self.dtserver.format("%Y%m%d%H%M%S"),
            currency = self.currency,
            account = escape(&self.account),
            dtstart = self.dtstart.format("%Y%m%d"),
            dtend = self.dtend.format("%Y%m%d"),
        )
    }

    /// One STMTTRN aggregate
    fn transaction(&self, txn: &Txn) -> String {
        format!(
            "<STMTTRN>\n\
             <TRNTYPE>{kind}\n\
             <DTPOSTED>{date}\n\
             <TRNAMT>{amount}\n\
             <FITID>{id}\n\
             <NAME>{payee}\n\
             <MEMO>{memo}\n\
             </STMTTRN>\n",
            kind = txn.kind,
            date = txn.date.format("%Y%m%d"),
            amount = signed_amount(txn),
            id = escape(&txn.id),
            payee = escape(&txn.payee),
            memo = escape(&txn.description),
        )
    }

    /// Closes the aggregates opened by the header
    fn footer(&self) -> String {
        "</BANKTRANLIST>\n\
         </STMTRS>\n\
         </STMTTRNRS>\n\
         </BANKMSGSRSV1>\n\
         </OFX>\n"
            .to_string()
    }
}

/// TRNAMT with the OFX sign convention applied: debits negative, credits
/// positive
fn signed_amount(txn: &Txn) -> Decimal {
    match txn.kind {
        TxnKind::Debit => -txn.amount,
        TxnKind::Credit => txn.amount,
    }
}

/// Escapes the characters SGML reserves inside element content
fn escape(text: &str) -> String {
    let mut out = String::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            _ => out.push(c),
        }
    }
    out
}

/// Serialization state for [`Chunks`]
#[derive(Debug, Clone, Copy)]
enum ChunkState {
    /// Header not yet emitted
    Header,
    /// Next transaction index to emit; past the end means footer
    Txn(usize),
    /// Everything emitted
    Done,
}

/// Single-pass iterator over a statement's serialized text chunks
#[derive(Debug)]
pub struct Chunks<'a> {
    /// Statement being serialized
    statement: &'a OfxStatement,
    /// Progress through the three-part document
    state: ChunkState,
}

impl Iterator for Chunks<'_> {
    type Item = String;

    fn next(&mut self) -> Option<Self::Item> {
        match self.state {
            ChunkState::Header => {
                self.state = ChunkState::Txn(0);
                Some(self.statement.header())
            }
            ChunkState::Txn(index) => match self.statement.txns.get(index) {
                Some(txn) => {
                    self.state = ChunkState::Txn(index + 1);
                    Some(self.statement.transaction(txn))
                }
                None => {
                    self.state = ChunkState::Done;
                    Some(self.statement.footer())
                }
            },
            ChunkState::Done => None,
        }
    }
}
