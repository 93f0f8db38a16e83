//! Data types shared between the engine API and its database backends.
use std::{fmt::Display, str::FromStr};

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use sqlx::Type;
use thiserror::Error;

//--------------------------------------    RequisiteType      ---------------------------------------------------------
/// The kind of payment endpoint a requisite exposes to the payer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RequisiteType {
    Card,
    Wallet,
    Sbp,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("Unknown requisite type: {0}")]
pub struct UnknownChannelType(pub String);

impl Display for RequisiteType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RequisiteType::Card => write!(f, "CARD"),
            RequisiteType::Wallet => write!(f, "WALLET"),
            RequisiteType::Sbp => write!(f, "SBP"),
        }
    }
}

impl FromStr for RequisiteType {
    type Err = UnknownChannelType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "CARD" => Ok(Self::Card),
            "WALLET" => Ok(Self::Wallet),
            "SBP" => Ok(Self::Sbp),
            s => Err(UnknownChannelType(s.to_string())),
        }
    }
}

//--------------------------------------    InvoiceStatus      ---------------------------------------------------------
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Type)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
#[sqlx(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InvoiceStatus {
    /// The invoice has been issued and is waiting for the payer.
    Created,
    Success,
    /// Confirmed manually by an operator.
    SuccessHand,
    /// Confirmed after an appeal.
    SuccessAppeal,
    Cancelled,
    Expired,
}

impl InvoiceStatus {
    /// Statuses that count towards the daily quotas, balances and cooldowns of a requisite.
    pub const COUNTED: [InvoiceStatus; 4] =
        [InvoiceStatus::Created, InvoiceStatus::Success, InvoiceStatus::SuccessHand, InvoiceStatus::SuccessAppeal];

    pub fn is_counted(&self) -> bool {
        Self::COUNTED.contains(self)
    }
}

impl Display for InvoiceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            InvoiceStatus::Created => "CREATED",
            InvoiceStatus::Success => "SUCCESS",
            InvoiceStatus::SuccessHand => "SUCCESS_HAND",
            InvoiceStatus::SuccessAppeal => "SUCCESS_APPEAL",
            InvoiceStatus::Cancelled => "CANCELLED",
            InvoiceStatus::Expired => "EXPIRED",
        };
        write!(f, "{s}")
    }
}

//--------------------------------------      Requisite        ---------------------------------------------------------
/// A payment channel: the card, wallet or SBP phone number that a payer sends funds to.
///
/// Every requisite hangs off a terminal, which in turn belongs to exactly one trader account. The account's team
/// determines whether the requisite is boosted.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Requisite {
    pub id: String,
    pub channel_type: RequisiteType,
    pub user_id: String,
    pub trader_account_id: String,
    pub terminal_id: String,
    pub team_id: Option<String>,
    pub bank_id: String,
    pub bank_name: String,
    pub phone_number: String,
    pub card_number: String,
    pub wallet_number: String,
    pub recipient_name: String,
}

impl Requisite {
    pub fn is_in_team(&self, team_ids: &std::collections::HashSet<String>) -> bool {
        self.team_id.as_ref().map(|t| team_ids.contains(t)).unwrap_or(false)
    }
}

//--------------------------------------    FlexibleMatch      ---------------------------------------------------------
/// A requisite found by the flexible-amount search, together with the smallest quantised amount it can accept.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlexibleMatch {
    pub requisite: Requisite,
    pub selected_amount: Decimal,
}

//--------------------------------------      Allocation       ---------------------------------------------------------
/// The outcome of a successful requisite selection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Allocation {
    pub requisite: Requisite,
    /// The amount the invoice will be issued for. Equal to the requested amount for exact matches.
    pub amount: Decimal,
    pub is_flexible: bool,
}

impl Allocation {
    pub fn exact(requisite: Requisite, amount: Decimal) -> Self {
        Self { requisite, amount, is_flexible: false }
    }
}

impl From<FlexibleMatch> for Allocation {
    fn from(m: FlexibleMatch) -> Self {
        Self { requisite: m.requisite, amount: m.selected_amount, is_flexible: true }
    }
}

//--------------------------------------       Merchant        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Merchant {
    pub id: String,
    pub in_limit_card: Decimal,
    pub in_limit_wallet: Decimal,
    pub in_limit_sbp: Decimal,
}

impl Merchant {
    /// The smallest invoice amount this merchant accepts for the given requisite type.
    pub fn min_amount_for(&self, channel_type: RequisiteType) -> Decimal {
        match channel_type {
            RequisiteType::Card => self.in_limit_card,
            RequisiteType::Wallet => self.in_limit_wallet,
            RequisiteType::Sbp => self.in_limit_sbp,
        }
    }
}

//--------------------------------------      NewInvoice       ---------------------------------------------------------
/// An invoice that has been assembled but not yet stored. The backend assigns the id.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewInvoice {
    pub merchant_id: String,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub channel_type: RequisiteType,
    pub is_flexible_amount: bool,
    pub terminal_id: String,
    pub user_id: String,
    pub bank_id: String,
    pub trader_account_id: String,
    pub requisite_id: String,
    pub callback_url: String,
    pub callback_key: String,
    pub internal_request_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub exchange_rate: Decimal,
}

impl NewInvoice {
    pub fn into_invoice(self, id: String) -> Invoice {
        Invoice {
            id,
            merchant_id: self.merchant_id,
            amount: self.amount,
            status: self.status,
            channel_type: self.channel_type,
            is_flexible_amount: self.is_flexible_amount,
            terminal_id: self.terminal_id,
            user_id: self.user_id,
            bank_id: self.bank_id,
            trader_account_id: self.trader_account_id,
            requisite_id: self.requisite_id,
            callback_url: self.callback_url,
            callback_key: self.callback_key,
            internal_request_id: self.internal_request_id,
            created_at: self.created_at,
            expires_at: self.expires_at,
            exchange_rate: self.exchange_rate,
        }
    }
}

//--------------------------------------        Invoice        ---------------------------------------------------------
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct Invoice {
    pub id: String,
    pub merchant_id: String,
    pub amount: Decimal,
    pub status: InvoiceStatus,
    pub channel_type: RequisiteType,
    pub is_flexible_amount: bool,
    pub terminal_id: String,
    pub user_id: String,
    pub bank_id: String,
    pub trader_account_id: String,
    pub requisite_id: String,
    pub callback_url: String,
    pub callback_key: String,
    pub internal_request_id: String,
    pub created_at: DateTime<Utc>,
    pub expires_at: DateTime<Utc>,
    pub exchange_rate: Decimal,
}

//--------------------------------------    IssuedInvoice      ---------------------------------------------------------
/// A stored invoice together with the requisite the payer has to send funds to.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct IssuedInvoice {
    pub invoice: Invoice,
    pub requisite: Requisite,
}
