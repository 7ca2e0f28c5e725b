use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CandleInterval {
    Day,
    Minute1,
}

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct AccountBalances {
    pub krw: f64,
    pub btc: f64,
    /// Zero when the exchange reports no average price.
    pub btc_avg_price: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OrderReceipt {
    pub order_id: String,
    /// Filled price when known (paper fills), otherwise the quoted price.
    pub price: f64,
    pub volume: f64,
    pub funds: f64,
}

/// Account snapshot taken at the start of a cycle.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct InvestmentStatus {
    pub krw_balance: f64,
    pub btc_balance: f64,
    pub btc_avg_price: f64,
    pub current_price: f64,
}

impl InvestmentStatus {
    pub fn new(balances: AccountBalances, current_price: f64) -> Self {
        Self {
            krw_balance: balances.krw,
            btc_balance: balances.btc,
            btc_avg_price: balances.btc_avg_price,
            current_price,
        }
    }

    pub fn btc_value(&self) -> f64 {
        self.btc_balance * self.current_price
    }

    pub fn total_assets(&self) -> f64 {
        self.krw_balance + self.btc_value()
    }

    pub fn btc_ratio_pct(&self) -> f64 {
        let total = self.total_assets();
        if total > 0.0 {
            self.btc_value() / total * 100.0
        } else {
            0.0
        }
    }

    /// Holdings value minus cost basis. `None` without a position or a known
    /// average price.
    pub fn total_profit_loss(&self) -> Option<f64> {
        if self.btc_balance <= 0.0 || self.btc_avg_price <= 0.0 || self.current_price <= 0.0 {
            return None;
        }
        Some(self.btc_value() - self.btc_avg_price * self.btc_balance)
    }

    pub fn total_profit_loss_pct(&self) -> Option<f64> {
        let invested = self.btc_avg_price * self.btc_balance;
        self.total_profit_loss().map(|pl| pl / invested * 100.0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_profit_loss_requires_position() {
        let flat = InvestmentStatus {
            krw_balance: 10_000.0,
            current_price: 100.0,
            ..Default::default()
        };
        assert!(flat.total_profit_loss().is_none());
        assert_eq!(flat.btc_ratio_pct(), 0.0);

        let holding = InvestmentStatus {
            krw_balance: 0.0,
            btc_balance: 2.0,
            btc_avg_price: 80.0,
            current_price: 100.0,
        };
        assert_eq!(holding.total_profit_loss(), Some(40.0));
        assert_eq!(holding.total_profit_loss_pct(), Some(25.0));
        assert_eq!(holding.btc_ratio_pct(), 100.0);
    }
}
