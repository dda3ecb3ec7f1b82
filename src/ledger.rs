// 2.0: the transaction log. append-only record of every balance-affecting
// event; the audit trail, never the source of truth for the current balance
// (that is the Account field). all money movement routes through here so a
// single history captures it.

use serde::{Deserialize, Serialize};

use crate::types::{AccountId, Eur, Price, Symbol, Timestamp, TransactionId};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TxKind {
    LeverageOpen,
    LeverageClose,
    LeveragePartialClose,
    Liquidation,
    SeasonPrize,
    Bonus,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Transaction {
    pub id: TransactionId,
    pub account: AccountId,
    pub kind: TxKind,
    pub symbol: Option<Symbol>,
    // signed principal: collateral posted, payout received, loss booked
    pub amount: Eur,
    pub price: Option<Price>,
    pub fee: Eur,
    // net effect on the balance (negative = debit)
    pub total: Eur,
    pub timestamp: Timestamp,
}

#[derive(Debug, Default)]
pub struct Ledger {
    transactions: Vec<Transaction>,
    next_id: u64,
}

impl Ledger {
    pub fn new() -> Self {
        Self::default()
    }

    #[allow(clippy::too_many_arguments)]
    pub fn log(
        &mut self,
        account: AccountId,
        kind: TxKind,
        symbol: Option<Symbol>,
        amount: Eur,
        price: Option<Price>,
        fee: Eur,
        total: Eur,
        timestamp: Timestamp,
    ) -> TransactionId {
        let id = TransactionId(self.next_id);
        self.next_id += 1;
        self.transactions.push(Transaction {
            id,
            account,
            kind,
            symbol,
            amount,
            price,
            fee,
            total,
            timestamp,
        });
        id
    }

    pub fn all(&self) -> &[Transaction] {
        &self.transactions
    }

    pub fn history(&self, account: AccountId) -> Vec<&Transaction> {
        self.transactions
            .iter()
            .filter(|tx| tx.account == account)
            .collect()
    }
}
