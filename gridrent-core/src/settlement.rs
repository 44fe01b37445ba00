//! 402 settlement handshake: converting accrued usage cost into payment
//! records.
//!
//! The default settler keeps an in-memory ledger and audit log. A production
//! backend submits real ledger transfers behind [`PaymentSettler`]; session
//! and broker code never needs to know the difference.

use async_trait::async_trait;
use nanoid::nanoid;
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Mutex;
use std::time::{SystemTime, UNIX_EPOCH};

use crate::error::Error;

/// Minor units per whole marketplace token.
pub const MINOR_UNITS_PER_TOKEN: u64 = 1_000_000_000;

/// Flat network fee approximation, in whole tokens.
const FLAT_NETWORK_FEE: f64 = 0.000_005;

/// Base58 alphabet used for transaction ids and block references.
const BASE58: [char; 58] = [
    '1', '2', '3', '4', '5', '6', '7', '8', '9', 'A', 'B', 'C', 'D', 'E', 'F', 'G', 'H', 'J', 'K',
    'L', 'M', 'N', 'P', 'Q', 'R', 'S', 'T', 'U', 'V', 'W', 'X', 'Y', 'Z', 'a', 'b', 'c', 'd', 'e',
    'f', 'g', 'h', 'i', 'j', 'k', 'm', 'n', 'o', 'p', 'q', 'r', 's', 't', 'u', 'v', 'w', 'x', 'y',
    'z',
];

fn now_ms() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .unwrap_or_default()
        .as_millis() as u64
}

/// An unsigned transfer artifact. Built but never signed or broadcast here.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct UnsignedTransfer {
    pub from: String,
    pub to: String,
    pub amount_minor: u64,
    pub fee_payer: String,
    /// Current network reference the transfer is anchored to
    pub recent_block_ref: String,
}

/// Audit entry recorded for every settlement
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SettlementRecord {
    pub session_id: String,
    /// Settled amount in whole tokens
    pub amount: f64,
    /// Settled amount in minor units
    pub amount_minor: u64,
    /// Total session duration covered by this settlement
    pub duration_ms: u64,
    pub tx_id: String,
    pub timestamp: u64,
}

/// Contract for settlement backends.
#[async_trait]
pub trait PaymentSettler: Send + Sync {
    /// Settle a completed session's accumulated cost. Returns a unique,
    /// non-empty transaction id. Safe to retry: a repeated call records a
    /// new attempt rather than corrupting earlier ones.
    async fn settle(&self, amount: f64, session_id: &str, duration_ms: u64)
    -> Result<String, Error>;

    /// Non-negative flat fee estimate, independent of `amount`.
    fn estimate_fee(&self, amount: f64) -> f64;

    /// Current balance for the configured wallet. Lookup failures yield 0
    /// instead of an error; callers must not treat 0 as proof of an empty
    /// wallet.
    async fn get_balance(&self) -> f64;

    /// Build an unsigned transfer with a current network reference attached.
    async fn create_transaction(
        &self,
        from: &str,
        to: &str,
        amount_minor: u64,
    ) -> Result<UnsignedTransfer, Error>;
}

/// Settlement backend over an in-memory ledger.
pub struct InMemorySettler {
    wallet_address: String,
    /// Wallet address -> balance in whole tokens
    ledger: Mutex<HashMap<String, f64>>,
    records: Mutex<Vec<SettlementRecord>>,
}

impl InMemorySettler {
    pub fn new(wallet_address: impl Into<String>) -> Self {
        Self {
            wallet_address: wallet_address.into(),
            ledger: Mutex::new(HashMap::new()),
            records: Mutex::new(Vec::new()),
        }
    }

    /// Seed a wallet balance in the ledger.
    pub fn credit(&self, wallet: impl Into<String>, amount: f64) {
        let mut ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        *ledger.entry(wallet.into()).or_insert(0.0) += amount;
    }

    /// Copy of the audit log, oldest first.
    pub fn records(&self) -> Vec<SettlementRecord> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .clone()
    }

    /// How many settlements have been recorded.
    pub fn settle_count(&self) -> usize {
        self.records.lock().unwrap_or_else(|e| e.into_inner()).len()
    }
}

#[async_trait]
impl PaymentSettler for InMemorySettler {
    async fn settle(
        &self,
        amount: f64,
        session_id: &str,
        duration_ms: u64,
    ) -> Result<String, Error> {
        let amount_minor = (amount * MINOR_UNITS_PER_TOKEN as f64).floor() as u64;
        let tx_id = nanoid!(88, &BASE58);

        let record = SettlementRecord {
            session_id: session_id.to_string(),
            amount,
            amount_minor,
            duration_ms,
            tx_id: tx_id.clone(),
            timestamp: now_ms(),
        };

        tracing::info!(
            session_id = %session_id,
            amount = amount,
            amount_minor = amount_minor,
            duration_ms = duration_ms,
            tx_id = %tx_id,
            "Payment settled"
        );

        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record);

        Ok(tx_id)
    }

    fn estimate_fee(&self, _amount: f64) -> f64 {
        FLAT_NETWORK_FEE
    }

    async fn get_balance(&self) -> f64 {
        let ledger = self.ledger.lock().unwrap_or_else(|e| e.into_inner());
        ledger.get(&self.wallet_address).copied().unwrap_or(0.0)
    }

    async fn create_transaction(
        &self,
        from: &str,
        to: &str,
        amount_minor: u64,
    ) -> Result<UnsignedTransfer, Error> {
        Ok(UnsignedTransfer {
            from: from.to_string(),
            to: to.to_string(),
            amount_minor,
            fee_payer: from.to_string(),
            recent_block_ref: nanoid!(44, &BASE58),
        })
    }
}
