//! # Requisite eligibility
//!
//! The rules that decide whether a requisite may receive a new invoice for a given amount.
//!
//! A requisite is eligible when the requisite itself, its terminal and its owning trader account all accept the
//! amount. Each of the three carries static limits (active flags, amount bounds, invoice ceilings, cooldowns) and each
//! is measured against [`UsageAggregates`]: figures computed over today's invoices (since 00:00 UTC) whose status is
//! one of [`InvoiceStatus::COUNTED`](crate::db_types::InvoiceStatus::COUNTED).
//!
//! Backends are free to pre-filter in whatever way is cheap for them, but the final word on eligibility is
//! [`ChannelSnapshot::check`], so that every backend applies the same rules.
use std::fmt::Display;

use chrono::{DateTime, Duration, Utc};
use rust_decimal::Decimal;
use thiserror::Error;

use crate::{db_types::Requisite, traits::CandidateQuery};

//--------------------------------------      AmountBand       ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Invalid constraint input: {0}")]
pub struct InvalidConstraintInput(pub String);

/// An inclusive range of quantised amounts, `low, low + step, ..., <= high`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AmountBand {
    low: Decimal,
    high: Decimal,
    step: Decimal,
}

impl AmountBand {
    pub fn new(low: Decimal, high: Decimal, step: Decimal) -> Result<Self, InvalidConstraintInput> {
        if step <= Decimal::ZERO {
            return Err(InvalidConstraintInput(format!("amount step must be positive, got {step}")));
        }
        if low > high {
            return Err(InvalidConstraintInput(format!("band minimum {low} is greater than the maximum {high}")));
        }
        Ok(Self { low, high, step })
    }

    pub fn low(&self) -> Decimal {
        self.low
    }

    pub fn high(&self) -> Decimal {
        self.high
    }

    pub fn step(&self) -> Decimal {
        self.step
    }

    /// Every amount in the band, smallest first.
    pub fn amounts(&self) -> impl Iterator<Item = Decimal> + '_ {
        std::iter::successors(Some(self.low), move |a| a.checked_add(self.step)).take_while(move |a| *a <= self.high)
    }

    /// The part of the band between `lowest` and `highest`, keeping the original grid. `None` if nothing is left.
    pub fn clip(&self, lowest: Decimal, highest: Decimal) -> Option<AmountBand> {
        let low = if lowest > self.low {
            let steps = (lowest.checked_sub(self.low)?.checked_div(self.step)?).ceil();
            self.low.checked_add(steps.checked_mul(self.step)?)?
        } else {
            self.low
        };
        let high = self.high.min(highest);
        (low <= high).then_some(AmountBand { low, high, step: self.step })
    }
}

impl Display for AmountBand {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}..{} step {}]", self.low, self.high, self.step)
    }
}

/// Rounds `amount` up to the nearest multiple of `step`. `None` when `step` is zero or the result overflows.
pub fn ceil_to_step(amount: Decimal, step: Decimal) -> Option<Decimal> {
    amount.checked_div(step)?.ceil().checked_mul(step)
}

//--------------------------------------        Limits         ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequisiteLimits {
    pub is_can_work: bool,
    pub is_blocked: bool,
    pub min_invoice_amount: Decimal,
    pub max_invoice_amount: Decimal,
    pub max_active_invoice: Option<i64>,
    pub daily_limit_invoices: Option<i64>,
    /// Minimum number of minutes between two invoices on this requisite
    pub invoice_interval: i64,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TerminalLimits {
    pub is_can_work: bool,
    pub is_blocked: bool,
    pub min_invoice_amount: Decimal,
    pub max_invoice_amount: Decimal,
    pub daily_limit_money: Option<Decimal>,
    pub max_active_invoice: Option<i64>,
    pub daily_limit_invoices: Option<i64>,
    /// Minimum number of minutes between two invoices on this terminal
    pub invoice_interval: i64,
}

/// Limits of the trader account owning the requisite, already resolved for the requested requisite type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AccountLimits {
    pub is_can_work: bool,
    pub is_blocked: bool,
    /// Whether the account takes pay-ins of this requisite type at all
    pub is_work_on_type: bool,
    pub min_invoice_amount: Decimal,
    pub max_invoice_amount: Decimal,
    pub max_active_invoices_in: Option<i64>,
    /// The pay-in balance of the account's wallet
    pub pay_in_balance: Decimal,
    /// Whether the merchant asking for the invoice may route pay-ins to this account
    pub merchant_authorized: bool,
}

//--------------------------------------        Usage          ---------------------------------------------------------
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AccountUsage {
    pub invoice_count: i64,
    /// Sum of today's invoices still in `CREATED` status
    pub pending_sum: Decimal,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TerminalUsage {
    pub invoice_count: i64,
    pub total_amount: Decimal,
    pub last_invoice_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequisiteUsage {
    pub invoice_count: i64,
    pub last_invoice_at: Option<DateTime<Utc>>,
    /// Amounts of today's invoices on this requisite still in `CREATED` status
    pub pending_amounts: Vec<Decimal>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct UsageAggregates {
    pub account: AccountUsage,
    pub terminal: TerminalUsage,
    pub requisite: RequisiteUsage,
}

//--------------------------------------      Rejection        ---------------------------------------------------------
/// The first rule a requisite failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Rejection {
    #[error("requisite type does not match")]
    WrongType,
    #[error("bank does not match the filter")]
    BankMismatch,
    #[error("requisite was excluded by the caller")]
    Excluded,
    #[error("merchant is not authorized on the trader account")]
    MerchantNotAuthorized,
    #[error("trader account is disabled or blocked")]
    AccountInactive,
    #[error("trader account does not work with this requisite type")]
    AccountTypeDisabled,
    #[error("amount is outside the trader account bounds")]
    AccountAmountBounds,
    #[error("wallet balance does not cover pending invoices")]
    InsufficientBalance,
    #[error("trader account has too many invoices today")]
    AccountInvoiceLimit,
    #[error("terminal is disabled or blocked")]
    TerminalInactive,
    #[error("amount is outside the terminal bounds")]
    TerminalAmountBounds,
    #[error("terminal daily money limit would be exceeded")]
    TerminalDailyMoneyLimit,
    #[error("terminal cooldown has not elapsed")]
    TerminalCooldown,
    #[error("terminal has too many active invoices")]
    TerminalActiveLimit,
    #[error("terminal daily invoice limit reached")]
    TerminalDailyInvoiceLimit,
    #[error("requisite is disabled or blocked")]
    RequisiteInactive,
    #[error("amount is outside the requisite bounds")]
    RequisiteAmountBounds,
    #[error("requisite has too many active invoices")]
    RequisiteActiveLimit,
    #[error("requisite already has a pending invoice for this amount")]
    DuplicatePendingAmount,
    #[error("requisite cooldown has not elapsed")]
    RequisiteCooldown,
    #[error("requisite daily invoice limit reached")]
    RequisiteDailyInvoiceLimit,
}

//--------------------------------------   ChannelSnapshot     ---------------------------------------------------------
/// A requisite together with everything needed to decide whether it can take an invoice right now.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChannelSnapshot {
    pub requisite: Requisite,
    pub requisite_limits: RequisiteLimits,
    pub terminal: TerminalLimits,
    pub account: AccountLimits,
    pub usage: UsageAggregates,
}

fn below(count: i64, ceiling: Option<i64>) -> bool {
    ceiling.map(|c| count < c).unwrap_or(true)
}

fn cooled_down(last: Option<DateTime<Utc>>, interval_minutes: i64, now: DateTime<Utc>) -> bool {
    last.map(|t| now - t >= Duration::minutes(interval_minutes)).unwrap_or(true)
}

impl ChannelSnapshot {
    /// Checks the query-level filters: requisite type, bank filter and caller exclusions.
    pub fn matches(&self, query: &CandidateQuery) -> Result<(), Rejection> {
        if self.requisite.channel_type != query.channel_type {
            return Err(Rejection::WrongType);
        }
        if let Some(bank_id) = &query.bank_id {
            if &self.requisite.bank_id != bank_id {
                return Err(Rejection::BankMismatch);
            }
        }
        if query.excluded_requisites.contains(&self.requisite.id) {
            return Err(Rejection::Excluded);
        }
        Ok(())
    }

    /// Checks every amount- and usage-dependent rule for `amount` at time `now`.
    pub fn check(&self, amount: Decimal, now: DateTime<Utc>) -> Result<(), Rejection> {
        let acc = &self.account;
        let usage = &self.usage;
        if !acc.merchant_authorized {
            return Err(Rejection::MerchantNotAuthorized);
        }
        if !acc.is_can_work || acc.is_blocked {
            return Err(Rejection::AccountInactive);
        }
        if !acc.is_work_on_type {
            return Err(Rejection::AccountTypeDisabled);
        }
        if acc.min_invoice_amount > amount || acc.max_invoice_amount < amount {
            return Err(Rejection::AccountAmountBounds);
        }
        if acc.pay_in_balance <= usage.account.pending_sum {
            return Err(Rejection::InsufficientBalance);
        }
        if !below(usage.account.invoice_count, acc.max_active_invoices_in) {
            return Err(Rejection::AccountInvoiceLimit);
        }

        let term = &self.terminal;
        if !term.is_can_work || term.is_blocked {
            return Err(Rejection::TerminalInactive);
        }
        if term.min_invoice_amount > amount || term.max_invoice_amount < amount {
            return Err(Rejection::TerminalAmountBounds);
        }
        if let Some(limit) = term.daily_limit_money {
            match usage.terminal.total_amount.checked_add(amount) {
                Some(total) if total <= limit => {},
                _ => return Err(Rejection::TerminalDailyMoneyLimit),
            }
        }
        if !cooled_down(usage.terminal.last_invoice_at, term.invoice_interval, now) {
            return Err(Rejection::TerminalCooldown);
        }
        if !below(usage.terminal.invoice_count, term.max_active_invoice) {
            return Err(Rejection::TerminalActiveLimit);
        }
        if !below(usage.terminal.invoice_count, term.daily_limit_invoices) {
            return Err(Rejection::TerminalDailyInvoiceLimit);
        }

        let req = &self.requisite_limits;
        if !req.is_can_work || req.is_blocked {
            return Err(Rejection::RequisiteInactive);
        }
        if req.min_invoice_amount > amount || req.max_invoice_amount < amount {
            return Err(Rejection::RequisiteAmountBounds);
        }
        if !below(usage.requisite.invoice_count, req.max_active_invoice) {
            return Err(Rejection::RequisiteActiveLimit);
        }
        if usage.requisite.pending_amounts.contains(&amount) {
            return Err(Rejection::DuplicatePendingAmount);
        }
        if !cooled_down(usage.requisite.last_invoice_at, req.invoice_interval, now) {
            return Err(Rejection::RequisiteCooldown);
        }
        if !below(usage.requisite.invoice_count, req.daily_limit_invoices) {
            return Err(Rejection::RequisiteDailyInvoiceLimit);
        }
        Ok(())
    }

    /// The amounts every bound of the account, terminal and requisite admits, including what is left of the
    /// terminal's daily money limit. The range is empty when `lowest > highest`.
    pub fn amount_bounds(&self) -> (Decimal, Decimal) {
        let lowest = self
            .account
            .min_invoice_amount
            .max(self.terminal.min_invoice_amount)
            .max(self.requisite_limits.min_invoice_amount);
        let mut highest = self
            .account
            .max_invoice_amount
            .min(self.terminal.max_invoice_amount)
            .min(self.requisite_limits.max_invoice_amount);
        if let Some(limit) = self.terminal.daily_limit_money {
            let headroom = limit.checked_sub(self.usage.terminal.total_amount).unwrap_or(Decimal::MIN);
            highest = highest.min(headroom);
        }
        (lowest, highest)
    }

    /// The smallest amount in `band` that this requisite accepts, if any.
    ///
    /// The band is first narrowed to [`Self::amount_bounds`]. Inside it, the only rule that depends on the amount is
    /// the duplicate pending amount check, so any other rejection ends the search. The number of amounts tried is
    /// therefore bounded by the number of pending invoices, whatever the width of the band.
    pub fn first_accepted(&self, band: &AmountBand, now: DateTime<Utc>) -> Option<Decimal> {
        let (lowest, highest) = self.amount_bounds();
        let band = band.clip(lowest, highest)?;
        for amount in band.amounts() {
            match self.check(amount, now) {
                Ok(()) => return Some(amount),
                Err(Rejection::DuplicatePendingAmount) => continue,
                Err(_) => return None,
            }
        }
        None
    }
}
