#![allow(dead_code)]

use pgfluent::prelude::*;
use pgfluent::BuiltQuery;
use std::collections::VecDeque;
use std::sync::Mutex;

#[derive(Debug, Clone, PartialEq, Entity)]
#[orm(table = "orders", alias = "o")]
pub struct Order {
    #[orm(id)]
    pub id: i64,
    pub status: String,
    pub amount: Decimal,
    #[orm(column = "placed_on")]
    pub created_at: NaiveDateTime,
    pub note: Option<String>,
    #[orm(association = "Customer", target_table = "customers")]
    pub customer: Option<i64>,
}

pub fn placed_on(day: u32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 3, day)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap()
}

pub fn order_record(id: i64, status: &str, cents: i64) -> Record {
    Record::new()
        .with("id", id)
        .with("status", status)
        .with("amount", Decimal::new(cents, 2))
        .with("placed_on", placed_on(1))
        .with("note", Value::Null)
        .with("customer_id", 7i64)
}

/// Records every statement and answers fetches from a queue of canned results.
#[derive(Default)]
pub struct RecordingExecutor {
    pub fetched: Mutex<Vec<(BuiltQuery, HydrationMode)>>,
    pub executed: Mutex<Vec<BuiltQuery>>,
    results: Mutex<VecDeque<Vec<Record>>>,
    affected: u64,
}

impl RecordingExecutor {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_affected(affected: u64) -> Self {
        Self {
            affected,
            ..Self::default()
        }
    }

    /// Queue the records returned by the next fetch.
    pub fn respond(self, records: Vec<Record>) -> Self {
        self.results.lock().unwrap().push_back(records);
        self
    }

    pub fn last_fetch(&self) -> (BuiltQuery, HydrationMode) {
        self.fetched.lock().unwrap().last().cloned().expect("no fetch recorded")
    }

    pub fn fetch_count(&self) -> usize {
        self.fetched.lock().unwrap().len()
    }
}

impl QueryExecutor for RecordingExecutor {
    async fn fetch(&self, query: &BuiltQuery, mode: HydrationMode) -> OrmResult<Vec<Record>> {
        self.fetched.lock().unwrap().push((query.clone(), mode));
        Ok(self.results.lock().unwrap().pop_front().unwrap_or_default())
    }

    async fn execute(&self, query: &BuiltQuery) -> OrmResult<u64> {
        self.executed.lock().unwrap().push(query.clone());
        Ok(self.affected)
    }
}
