use chrono::NaiveDate;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use crate::error::{Error, Result};
use crate::models::invoice::Invoice;

/// Portal (booking channel) commission on gross revenue.
pub const PORTAL_COMMISSION_RATE: Decimal = Decimal::from_parts(15, 0, 0, false, 2);
/// Management commission on what remains after portal and cleaning.
pub const MANAGEMENT_COMMISSION_RATE: Decimal = Decimal::from_parts(25, 0, 0, false, 2);
/// Flat cleaning charge per invoice, regardless of invoice contents.
pub const CLEANING_FEE_PER_INVOICE: Decimal = Decimal::from_parts(75, 0, 0, false, 0);

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatementBreakdown {
    pub gross_amount: Decimal,
    pub portal_commission: Decimal,
    pub cleaning_fee: Decimal,
    pub management_commission: Decimal,
    pub final_owner_amount: Decimal,
    pub invoice_count: usize,
    pub period: Period,
}

pub struct StatementService;

impl StatementService {
    /// Commission split for one property over a period. Every figure is
    /// derived from unrounded intermediates and rounded to cents on its own.
    /// Totals beyond the decimal range are rejected instead of wrapping.
    pub fn compute(
        is_admin_owned: bool,
        invoices: &[Invoice],
        period: Period,
    ) -> Result<StatementBreakdown> {
        let gross = invoices
            .iter()
            .map(|inv| parse_amount(&inv.value))
            .try_fold(Decimal::ZERO, |acc, value| acc.checked_add(value))
            .ok_or_else(out_of_range)?;
        let portal = gross
            .checked_mul(PORTAL_COMMISSION_RATE)
            .ok_or_else(out_of_range)?;
        let cleaning = Decimal::from(invoices.len())
            .checked_mul(CLEANING_FEE_PER_INVOICE)
            .ok_or_else(out_of_range)?;
        let management = if is_admin_owned {
            Decimal::ZERO
        } else {
            gross
                .checked_sub(cleaning)
                .and_then(|v| v.checked_sub(portal))
                .and_then(|v| v.checked_mul(MANAGEMENT_COMMISSION_RATE))
                .ok_or_else(out_of_range)?
        };
        let final_owner = gross
            .checked_sub(portal)
            .and_then(|v| v.checked_sub(cleaning))
            .and_then(|v| v.checked_sub(management))
            .ok_or_else(out_of_range)?;

        Ok(StatementBreakdown {
            gross_amount: to_cents(gross),
            portal_commission: to_cents(portal),
            cleaning_fee: to_cents(cleaning),
            management_commission: to_cents(management),
            final_owner_amount: to_cents(final_owner),
            invoice_count: invoices.len(),
            period,
        })
    }
}

fn out_of_range() -> Error {
    Error::invalid("invoice total out of range")
}

/// Lenient amount parsing: unparseable values count as zero.
pub fn parse_amount(raw: &str) -> Decimal {
    let trimmed = raw.trim();
    Decimal::from_str(trimmed)
        .or_else(|_| Decimal::from_scientific(trimmed))
        .unwrap_or_else(|_| {
            tracing::debug!(value = %raw, "invoice value is not a number, counting as zero");
            Decimal::ZERO
        })
}

pub fn to_cents(value: Decimal) -> Decimal {
    let mut rounded = value.round_dp_with_strategy(2, RoundingStrategy::MidpointAwayFromZero);
    rounded.rescale(2);
    rounded
}
