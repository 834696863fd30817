use std::collections::HashMap;
use std::str::FromStr;

use chrono::NaiveDate;
use rust_decimal::Decimal;

use crate::{
    errors::Error,
    types::{Ledger, Row, Timespan, TxnKind, DATE_FMT, INTERNAL_TRANSFER},
};

impl Row {
    /// Returns the date token of the "Date and time" cell.
    ///
    /// The cell carries a date and a time separated by whitespace; only
    /// the leading date token is meaningful here.
    /// # Errors
    /// [`Error::MalformedDate`] if the cell has no whitespace-separated
    /// date token
    pub fn raw_date(&self) -> Result<&str, Error> {
        match self.date_time.trim().split_once(char::is_whitespace) {
            Some((date, _time)) => Ok(date),
            None => Err(Error::MalformedDate(self.date_time.clone())),
        }
    }

    /// Parses the date token with the supplied chrono format string.
    /// # Errors
    /// [`Error::MalformedDate`] or [`Error::DateParse`]
    pub fn date_in(&self, fmt: &str) -> Result<NaiveDate, Error> {
        let raw = self.raw_date()?;
        NaiveDate::parse_from_str(raw, fmt).map_err(|source| Error::DateParse {
            value: raw.to_string(),
            source,
        })
    }

    /// Parses the date token day-first ([`DATE_FMT`]).
    /// # Errors
    /// [`Error::MalformedDate`] or [`Error::DateParse`]
    pub fn date(&self) -> Result<NaiveDate, Error> {
        self.date_in(DATE_FMT)
    }

    /// Returns the row's amount: Debit when populated, Credit otherwise.
    ///
    /// ubank writes amounts with a currency symbol and thousands
    /// separators (`$1,234.56`); both are scrubbed before parsing.
    /// # Errors
    /// [`Error::AmountParse`] if the scrubbed cell is not a decimal
    /// number, including the case where both cells are empty
    pub fn amount(&self) -> Result<Decimal, Error> {
        let raw = if self.debit.is_empty() {
            &self.credit
        } else {
            &self.debit
        };
        Decimal::from_str(&raw.replace(['$', ','], "")).map_err(|source| Error::AmountParse {
            value: raw.clone(),
            source,
        })
    }

    /// DEBIT when the Debit cell is populated, CREDIT otherwise.
    ///
    /// Agrees with [`Row::amount`] on which cell is read.
    #[must_use]
    pub fn kind(&self) -> TxnKind {
        if self.debit.is_empty() {
            TxnKind::Credit
        } else {
            TxnKind::Debit
        }
    }

    /// Whether this row is one leg of a transfer between the user's own
    /// accounts
    #[must_use]
    pub fn is_internal(&self) -> bool {
        self.payment_type == INTERNAL_TRANSFER
    }

    /// Identifier for this row, used as the OFX FITID.
    ///
    /// Both legs of an internal transfer share a Transaction ID but carry
    /// distinct receipt numbers, so internal rows are keyed by receipt
    /// number instead.
    #[must_use]
    pub fn txn_id(&self) -> &str {
        if self.is_internal() {
            &self.receipt_number
        } else {
            &self.transaction_id
        }
    }

    /// The account this row belongs to.
    ///
    /// Credits are keyed by their destination account; debits, and
    /// credits without a destination, fall back to the source account.
    /// Total: every row lands somewhere, even if both cells are empty.
    #[must_use]
    pub fn account(&self) -> &str {
        if self.kind() == TxnKind::Credit && !self.to_account.is_empty() {
            &self.to_account
        } else {
            &self.from_account
        }
    }

    /// Counterparty name for the OFX NAME tag.
    ///
    /// On internal transfers the counterparty account stands in for the
    /// description: the source account on the credit leg, the destination
    /// account on the debit leg.
    #[must_use]
    pub fn payee(&self) -> &str {
        if self.is_internal() {
            match self.kind() {
                TxnKind::Credit => &self.from_account,
                TxnKind::Debit => &self.to_account,
            }
        } else {
            &self.description
        }
    }

    /// The free-text description, used as the OFX MEMO
    #[must_use]
    pub fn description(&self) -> &str {
        &self.description
    }

    /// The bank-assigned spending category
    #[must_use]
    pub fn class(&self) -> &str {
        &self.category
    }
}

impl Ledger {
    /// Buckets rows by derived account in a single pass.
    ///
    /// Buckets are created on first occurrence; rows keep their input
    /// order within a bucket. Account derivation is total, so this cannot
    /// fail: rows with neither account cell populated form the
    /// empty-string bucket.
    #[must_use]
    pub fn partition<I>(rows: I) -> Self
    where
        I: IntoIterator<Item = Row>,
    {
        let mut ledger = Ledger::new();
        for row in rows {
            let account = row.account().to_string();
            if !ledger.buckets.contains_key(&account) {
                ledger.order.push(account.clone());
            }
            ledger.buckets.entry(account).or_default().push(row);
        }
        ledger
    }

    /// Iterates buckets as `(account, rows)` pairs in first-occurrence
    /// order
    pub fn iter(&self) -> impl Iterator<Item = (&str, &[Row])> + '_ {
        self.order.iter().map(|account| {
            let rows = self
                .buckets
                .get(account)
                .map(Vec::as_slice)
                .unwrap_or_default();
            (account.as_str(), rows)
        })
    }
}

/// Owning iterator over a [`Ledger`]'s buckets in first-occurrence order
#[derive(Debug)]
pub struct IntoBuckets {
    /// Remaining account identifiers, in order
    order: std::vec::IntoIter<String>,
    /// Remaining buckets, drained as `order` advances
    buckets: HashMap<String, Vec<Row>>,
}

impl Iterator for IntoBuckets {
    type Item = (String, Vec<Row>);

    fn next(&mut self) -> Option<Self::Item> {
        let account = self.order.next()?;
        let rows = self.buckets.remove(&account).unwrap_or_default();
        Some((account, rows))
    }
}

impl IntoIterator for Ledger {
    type Item = (String, Vec<Row>);
    type IntoIter = IntoBuckets;

    fn into_iter(self) -> Self::IntoIter {
        IntoBuckets {
            order: self.order.into_iter(),
            buckets: self.buckets,
        }
    }
}

/// Scans every row for the earliest and latest transaction date.
///
/// Computed once per run, across all accounts; used only to label output
/// file names. An empty batch yields `Ok(None)`.
/// # Errors
/// Any row with a malformed or unparseable date fails the whole scan.
pub fn timespan(rows: &[Row]) -> Result<Option<Timespan>, Error> {
    let mut span: Option<Timespan> = None;
    for row in rows {
        let date = row.date()?;
        span = Some(match span {
            None => Timespan {
                start: date,
                end: date,
            },
            Some(running) => Timespan {
                start: running.start.min(date),
                end: running.end.max(date),
            },
        });
    }
    Ok(span)
}

#[cfg(test)]
mod tests {
    use rust_decimal_macros::dec;

    use super::*;

    /// The purchase row from the ubank export documentation
    fn purchase_row() -> Row {
        Row {
            date_time: "15-03-23 10:00".to_string(),
            debit: "$1,234.56".to_string(),
            payment_type: "Purchase".to_string(),
            from_account: "AcctA".to_string(),
            description: "Shop".to_string(),
            category: "Groceries".to_string(),
            transaction_id: "T1".to_string(),
            ..Row::default()
        }
    }

    /// The credit leg of an internal transfer from AcctA to AcctB
    fn internal_credit_row() -> Row {
        Row {
            date_time: "16-03-23 09:30".to_string(),
            credit: "$50.00".to_string(),
            payment_type: "Internal Transfer".to_string(),
            from_account: "AcctA".to_string(),
            to_account: "AcctB".to_string(),
            description: "Transfer".to_string(),
            transaction_id: "T2".to_string(),
            receipt_number: "R9".to_string(),
            ..Row::default()
        }
    }

    #[test]
    fn test_raw_date_drops_time_component() {
        assert_eq!(purchase_row().raw_date().unwrap(), "15-03-23");
    }

    #[test]
    fn test_date_parses_day_first() {
        assert_eq!(
            purchase_row().date().unwrap(),
            NaiveDate::from_ymd_opt(2023, 3, 15).unwrap()
        );
    }

    #[test]
    fn test_date_without_time_token_is_malformed() {
        let row = Row {
            date_time: "15-03-23".to_string(),
            ..Row::default()
        };
        assert!(matches!(row.date(), Err(Error::MalformedDate(_))));
    }

    #[test]
    fn test_date_with_bad_token_fails_parse() {
        let row = Row {
            date_time: "2023/03/15 10:00".to_string(),
            ..Row::default()
        };
        assert!(matches!(row.date(), Err(Error::DateParse { .. })));
    }

    #[test]
    fn test_amount_scrubs_currency_and_separators() {
        assert_eq!(purchase_row().amount().unwrap(), dec!(1234.56));
    }

    #[test]
    fn test_amount_falls_back_to_credit() {
        assert_eq!(internal_credit_row().amount().unwrap(), dec!(50.00));
    }

    #[test]
    fn test_amount_empty_cells_fail() {
        assert!(matches!(
            Row::default().amount(),
            Err(Error::AmountParse { .. })
        ));
    }

    #[test]
    fn test_kind_agrees_with_amount_cell() {
        // Debit populated: kind says DEBIT and amount reads the Debit cell
        let debit = purchase_row();
        assert_eq!(debit.kind(), TxnKind::Debit);
        assert_eq!(debit.amount().unwrap(), dec!(1234.56));
        // Debit empty: kind says CREDIT and amount reads the Credit cell
        let credit = internal_credit_row();
        assert_eq!(credit.kind(), TxnKind::Credit);
        assert_eq!(credit.amount().unwrap(), dec!(50.00));
    }

    #[test]
    fn test_kind_displays_ofx_trntype() {
        assert_eq!(TxnKind::Debit.to_string(), "DEBIT");
        assert_eq!(TxnKind::Credit.to_string(), "CREDIT");
    }

    #[test]
    fn test_purchase_row_maps_like_the_export_doc_says() {
        let row = purchase_row();
        assert_eq!(row.raw_date().unwrap(), "15-03-23");
        assert_eq!(row.amount().unwrap(), dec!(1234.56));
        assert_eq!(row.kind(), TxnKind::Debit);
        assert_eq!(row.account(), "AcctA");
        assert_eq!(row.payee(), "Shop");
        assert_eq!(row.txn_id(), "T1");
        assert!(!row.is_internal());
    }

    #[test]
    fn test_internal_credit_leg_derivation() {
        let row = internal_credit_row();
        assert!(row.is_internal());
        assert_eq!(row.account(), "AcctB");
        assert_eq!(row.payee(), "AcctA");
        assert_eq!(row.txn_id(), "R9");
    }

    #[test]
    fn test_internal_debit_leg_payee_is_destination() {
        let row = Row {
            debit: "$50.00".to_string(),
            payment_type: "Internal Transfer".to_string(),
            from_account: "AcctA".to_string(),
            to_account: "AcctB".to_string(),
            description: "Transfer".to_string(),
            receipt_number: "R8".to_string(),
            ..Row::default()
        };
        assert_eq!(row.account(), "AcctA");
        assert_eq!(row.payee(), "AcctB");
        assert_eq!(row.txn_id(), "R8");
    }

    #[test]
    fn test_account_credit_without_destination_uses_source() {
        let row = Row {
            credit: "$10.00".to_string(),
            from_account: "AcctA".to_string(),
            ..Row::default()
        };
        assert_eq!(row.account(), "AcctA");
    }

    #[test]
    fn test_account_total_even_when_both_cells_empty() {
        assert_eq!(Row::default().account(), "");
    }

    #[test]
    fn test_partition_preserves_order_and_rows() {
        let rows = vec![
            Row {
                debit: "$1.00".to_string(),
                from_account: "B".to_string(),
                transaction_id: "1".to_string(),
                ..Row::default()
            },
            Row {
                debit: "$2.00".to_string(),
                from_account: "A".to_string(),
                transaction_id: "2".to_string(),
                ..Row::default()
            },
            Row {
                debit: "$3.00".to_string(),
                from_account: "B".to_string(),
                transaction_id: "3".to_string(),
                ..Row::default()
            },
        ];
        let ledger = Ledger::partition(rows.clone());
        assert_eq!(ledger.len(), 2);

        let buckets: Vec<(String, Vec<Row>)> = ledger.into_iter().collect();
        // First-occurrence order: B before A
        assert_eq!(buckets[0].0, "B");
        assert_eq!(buckets[1].0, "A");
        // Disjoint buckets whose union is the input, in input order
        assert_eq!(buckets[0].1, vec![rows[0].clone(), rows[2].clone()]);
        assert_eq!(buckets[1].1, vec![rows[1].clone()]);
        assert_eq!(buckets.iter().map(|(_, rows)| rows.len()).sum::<usize>(), 3);
    }

    #[test]
    fn test_partition_buckets_agree_with_account_derivation() {
        let rows = vec![purchase_row(), internal_credit_row()];
        let ledger = Ledger::partition(rows);
        for (account, bucket) in ledger.iter() {
            for row in bucket {
                assert_eq!(row.account(), account);
            }
        }
    }

    #[test]
    fn test_timespan_tracks_min_and_max() {
        let rows = vec![
            Row {
                date_time: "20-03-23 08:00".to_string(),
                ..Row::default()
            },
            Row {
                date_time: "01-03-23 09:00".to_string(),
                ..Row::default()
            },
            Row {
                date_time: "15-03-23 10:00".to_string(),
                ..Row::default()
            },
        ];
        let span = timespan(&rows).unwrap().unwrap();
        assert_eq!(span.start(), NaiveDate::from_ymd_opt(2023, 3, 1).unwrap());
        assert_eq!(span.end(), NaiveDate::from_ymd_opt(2023, 3, 20).unwrap());
        assert!(span.start() <= span.end());
    }

    #[test]
    fn test_timespan_empty_batch_is_absent() {
        assert_eq!(timespan(&[]).unwrap(), None);
    }

    #[test]
    fn test_timespan_bad_date_fails_whole_scan() {
        let rows = vec![
            purchase_row(),
            Row {
                date_time: "soon".to_string(),
                ..Row::default()
            },
        ];
        assert!(timespan(&rows).is_err());
    }
}
