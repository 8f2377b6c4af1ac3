//! 완료된 transaction 기록
//!
//! 완료/폐기된 transaction id 를 일정 시간 기억하여, 늦게 도착한 중복 fragment 나
//! ACK 가 새 태스크를 만들지 않도록 한다.

use std::time::{Duration, Instant};

use dashmap::DashMap;

use crate::transaction::TransactionId;

/// transaction id -> 완료 시각
#[derive(Debug)]
pub struct FinishedCache {
    entries: DashMap<TransactionId, Instant>,
    ttl: Duration,
}

impl FinishedCache {
    pub fn new(ttl: Duration) -> Self {
        Self {
            entries: DashMap::new(),
            ttl,
        }
    }

    /// 완료 기록
    pub fn record(&self, transaction_id: TransactionId, now: Instant) {
        self.entries.insert(transaction_id, now);
    }

    pub fn contains(&self, transaction_id: &TransactionId) -> bool {
        self.entries.contains_key(transaction_id)
    }

    /// ttl 이 지난 항목 제거, 제거된 수 반환
    pub fn purge(&self, now: Instant) -> usize {
        let before = self.entries.len();
        self.entries
            .retain(|_, finished_at| now.saturating_duration_since(*finished_at) < self.ttl);
        before.saturating_sub(self.entries.len())
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn ttl(&self) -> Duration {
        self.ttl
    }
}
