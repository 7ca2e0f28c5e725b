use chrono::{DateTime, Local, Utc};
use serde::{Deserialize, Serialize};
use std::fs::{self, OpenOptions};
use std::io::Write;
use std::path::PathBuf;
use std::sync::Mutex;
use tracing::warn;

use crate::analysis::{Decision, RiskLevel};
use crate::error::StoreError;
use crate::strategies::stop_loss::TradeReferenceInfo;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ExecutionStatus {
    Executed,
    Held,
    InsufficientBalance,
    Failed,
}

impl ExecutionStatus {
    pub fn as_str(self) -> &'static str {
        match self {
            ExecutionStatus::Executed => "executed",
            ExecutionStatus::Held => "held",
            ExecutionStatus::InsufficientBalance => "insufficient_balance",
            ExecutionStatus::Failed => "failed",
        }
    }
}

/// One line of the trade ledger.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TradeRecord {
    pub id: String,
    pub timestamp: DateTime<Utc>,
    pub action: Decision,
    pub status: ExecutionStatus,
    pub price: f64,
    /// BTC volume
    pub amount: f64,
    /// KRW value
    pub total_value: f64,
    pub fee: f64,
    #[serde(default)]
    pub order_id: Option<String>,
    #[serde(default)]
    pub confidence: Option<f64>,
    #[serde(default)]
    pub risk_level: Option<RiskLevel>,
    #[serde(default)]
    pub reason: String,
    #[serde(default)]
    pub forced: bool,
}

impl TradeRecord {
    pub fn is_executed_buy(&self) -> bool {
        self.status == ExecutionStatus::Executed && self.action == Decision::Buy
    }

    pub fn is_executed_sell(&self) -> bool {
        self.status == ExecutionStatus::Executed && self.action == Decision::Sell
    }
}

pub trait TradeStore: Send + Sync {
    fn append(&self, record: &TradeRecord) -> Result<(), StoreError>;

    /// All records, oldest first.
    fn load_all(&self) -> Result<Vec<TradeRecord>, StoreError>;

    /// Stop-loss baseline as of `now`.
    fn reference_trade(&self, now: DateTime<Local>) -> Result<Option<TradeReferenceInfo>, StoreError> {
        let trades = self.load_all()?;
        Ok(select_reference_trade(&trades, local_midnight(now)))
    }
}

pub fn local_midnight(now: DateTime<Local>) -> DateTime<Local> {
    now.date_naive()
        .and_hms_opt(0, 0, 0)
        .and_then(|naive| naive.and_local_timezone(Local).earliest())
        .unwrap_or(now)
}

/// Earliest executed buy at or after `since`; otherwise the latest executed buy.
pub fn select_reference_trade(
    trades: &[TradeRecord],
    since: DateTime<Local>,
) -> Option<TradeReferenceInfo> {
    let since = since.with_timezone(&Utc);
    let buys = trades.iter().filter(|t| t.is_executed_buy());

    let today = buys
        .clone()
        .filter(|t| t.timestamp >= since)
        .min_by_key(|t| t.timestamp);
    let chosen = today.or_else(|| buys.max_by_key(|t| t.timestamp))?;

    Some(TradeReferenceInfo {
        buy_price: chosen.price,
        buy_amount: chosen.amount,
        buy_time: chosen.timestamp.with_timezone(&Local),
    })
}

/// Append-only JSON-lines file.
pub struct JsonlTradeStore {
    path: PathBuf,
    write_lock: Mutex<()>,
}

impl JsonlTradeStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            write_lock: Mutex::new(()),
        }
    }

    pub fn path(&self) -> &std::path::Path {
        &self.path
    }
}

impl TradeStore for JsonlTradeStore {
    fn append(&self, record: &TradeRecord) -> Result<(), StoreError> {
        let _guard = self.write_lock.lock().unwrap_or_else(|e| e.into_inner());
        if let Some(parent) = self.path.parent().filter(|p| !p.as_os_str().is_empty()) {
            fs::create_dir_all(parent)?;
        }
        let mut line = serde_json::to_string(record)?;
        line.push('\n');
        let mut file = OpenOptions::new().create(true).append(true).open(&self.path)?;
        file.write_all(line.as_bytes())?;
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<TradeRecord>, StoreError> {
        let raw = match fs::read_to_string(&self.path) {
            Ok(raw) => raw,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(Vec::new()),
            Err(e) => return Err(e.into()),
        };

        let mut records = Vec::new();
        for (n, line) in raw.lines().enumerate() {
            if line.trim().is_empty() {
                continue;
            }
            match serde_json::from_str::<TradeRecord>(line) {
                Ok(record) => records.push(record),
                Err(e) => warn!("⚠️ Skipping ledger line {} in {}: {}", n + 1, self.path.display(), e),
            }
        }
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

#[derive(Default)]
pub struct MemoryTradeStore {
    records: Mutex<Vec<TradeRecord>>,
}

impl MemoryTradeStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TradeStore for MemoryTradeStore {
    fn append(&self, record: &TradeRecord) -> Result<(), StoreError> {
        self.records
            .lock()
            .unwrap_or_else(|e| e.into_inner())
            .push(record.clone());
        Ok(())
    }

    fn load_all(&self) -> Result<Vec<TradeRecord>, StoreError> {
        let mut records = self.records.lock().unwrap_or_else(|e| e.into_inner()).clone();
        records.sort_by_key(|r| r.timestamp);
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    fn record(action: Decision, at: DateTime<Utc>, price: f64) -> TradeRecord {
        TradeRecord {
            id: uuid::Uuid::new_v4().to_string(),
            timestamp: at,
            action,
            status: ExecutionStatus::Executed,
            price,
            amount: 1.0,
            total_value: price,
            fee: 0.0,
            order_id: None,
            confidence: None,
            risk_level: None,
            reason: String::new(),
            forced: false,
        }
    }

    #[test]
    fn test_reference_prefers_earliest_buy_today() {
        let midnight = Local.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let m = midnight.with_timezone(&Utc);
        let trades = vec![
            record(Decision::Buy, m - Duration::hours(3), 70.0),
            record(Decision::Buy, m + Duration::hours(2), 90.0),
            record(Decision::Buy, m + Duration::hours(1), 80.0),
            record(Decision::Sell, m + Duration::minutes(30), 85.0),
        ];
        let reference = select_reference_trade(&trades, midnight).unwrap();
        assert_eq!(reference.buy_price, 80.0);
    }

    #[test]
    fn test_reference_falls_back_to_latest_buy() {
        let midnight = Local.with_ymd_and_hms(2024, 5, 2, 0, 0, 0).unwrap();
        let m = midnight.with_timezone(&Utc);
        let mut held = record(Decision::Buy, m - Duration::hours(1), 99.0);
        held.status = ExecutionStatus::InsufficientBalance;
        let trades = vec![
            record(Decision::Buy, m - Duration::days(2), 60.0),
            record(Decision::Buy, m - Duration::days(1), 65.0),
            held,
        ];
        let reference = select_reference_trade(&trades, midnight).unwrap();
        assert_eq!(reference.buy_price, 65.0);

        assert!(select_reference_trade(&[], midnight).is_none());
    }

    #[test]
    fn test_jsonl_store_appends_and_skips_garbage() {
        let dir = tempfile::tempdir().unwrap();
        let store = JsonlTradeStore::new(dir.path().join("nested/trades.jsonl"));
        assert!(store.load_all().unwrap().is_empty());

        let now = Utc::now();
        store.append(&record(Decision::Buy, now, 100.0)).unwrap();
        store.append(&record(Decision::Sell, now + Duration::minutes(1), 110.0)).unwrap();

        let mut file = OpenOptions::new().append(true).open(store.path()).unwrap();
        writeln!(file, "not json").unwrap();

        let loaded = store.load_all().unwrap();
        assert_eq!(loaded.len(), 2);
        assert_eq!(loaded[0].action, Decision::Buy);
        assert_eq!(loaded[1].price, 110.0);
    }
}
