//! 도착 태스크와 도착 풀
//!
//! - Arrival: fragment 를 모두 모아야 사용할 수 있는 수신 단위
//! - ArrivalPool: 조립 중인 arrival 추적, 정체된 조립 폐기, 완료 후 중복 fragment 억제
//!
//! 분할되지 않은 단일 Message 는 이 풀을 거치지 않는다.

use std::collections::HashMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace};

use crate::finished::FinishedCache;
use crate::package::Package;
use crate::packer::{Assembly, InsertOutcome};
use crate::transaction::TransactionId;
use crate::Config;

/// 수신 태스크
#[derive(Debug)]
pub struct Arrival {
    pub transaction_id: TransactionId,
    pub pages: u32,
    pub source: SocketAddr,
    pub destination: SocketAddr,
    assembly: Assembly,
    created_at: Instant,
    deadline: Instant,
}

impl Arrival {
    fn new(fragment: &Package, source: SocketAddr, destination: SocketAddr, deadline: Instant, now: Instant) -> Self {
        Self {
            transaction_id: fragment.transaction_id(),
            pages: fragment.pages(),
            source,
            destination,
            assembly: Assembly::new(fragment.transaction_id(), fragment.pages()),
            created_at: now,
            deadline,
        }
    }

    /// 받은 fragment 수
    pub fn received(&self) -> usize {
        self.assembly.received()
    }

    pub fn missing_indexes(&self) -> Vec<u32> {
        self.assembly.missing_indexes()
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    pub fn deadline(&self) -> Instant {
        self.deadline
    }
}

/// fragment 수신 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AcceptOutcome {
    /// 저장됨, 조립 대기
    Pending { received: usize, pages: u32 },

    /// 이미 받은 fragment
    Duplicate,

    /// 조립 중인 arrival 과 맞지 않는 fragment
    Rejected,

    /// 이미 완료/폐기된 transaction 의 늦은 fragment
    Late,

    /// 조립 완료된 메시지
    Complete(Package),
}

impl AcceptOutcome {
    pub fn into_message(self) -> Option<Package> {
        match self {
            AcceptOutcome::Complete(package) => Some(package),
            _ => None,
        }
    }
}

/// 도착 풀
pub struct ArrivalPool {
    arrivals: RwLock<HashMap<TransactionId, Arrival>>,
    finished: FinishedCache,
    timeout: Duration,
}

impl ArrivalPool {
    pub fn new(config: &Config) -> Self {
        Self {
            arrivals: RwLock::new(HashMap::new()),
            finished: FinishedCache::new(config.finished_ttl()),
            timeout: config.arrival_timeout(),
        }
    }

    /// fragment 수신
    pub fn accept(
        &self,
        fragment: &Package,
        source: SocketAddr,
        destination: SocketAddr,
        now: Instant,
    ) -> AcceptOutcome {
        let transaction_id = fragment.transaction_id();
        // 완료 기록 확인과 삽입은 같은 lock 안에서
        let mut arrivals = self.arrivals.write();
        if self.finished.contains(&transaction_id) {
            trace!("완료된 transaction 의 fragment 무시: {}", transaction_id);
            return AcceptOutcome::Late;
        }

        let deadline = now + self.timeout;
        let arrival = arrivals
            .entry(transaction_id)
            .or_insert_with(|| Arrival::new(fragment, source, destination, deadline, now));

        match arrival.assembly.insert(fragment) {
            InsertOutcome::Pending => AcceptOutcome::Pending {
                received: arrival.received(),
                pages: arrival.pages,
            },
            InsertOutcome::Duplicate => AcceptOutcome::Duplicate,
            InsertOutcome::Rejected => AcceptOutcome::Rejected,
            InsertOutcome::Complete(package) => {
                arrivals.remove(&transaction_id);
                self.finished.record(transaction_id, now);
                debug!(
                    "메시지 조립 완료: {} ({} bytes) from {}",
                    transaction_id,
                    package.body.len(),
                    source
                );
                AcceptOutcome::Complete(package)
            }
        }
    }

    /// 기한이 지난 미완성 arrival 제거
    ///
    /// 폐기된 transaction 은 완료 기록에 남겨 늦은 fragment 로 조립이 다시 시작되지 않게 한다.
    pub fn sweep(&self, now: Instant) -> Vec<Arrival> {
        let mut arrivals = self.arrivals.write();
        let expired: Vec<TransactionId> = arrivals
            .values()
            .filter(|arrival| arrival.deadline <= now)
            .map(|arrival| arrival.transaction_id)
            .collect();

        expired
            .into_iter()
            .filter_map(|transaction_id| arrivals.remove(&transaction_id))
            .inspect(|arrival| {
                self.finished.record(arrival.transaction_id, now);
                debug!(
                    "조립 포기: {} ({}/{} fragments) from {}",
                    arrival.transaction_id,
                    arrival.received(),
                    arrival.pages,
                    arrival.source
                );
            })
            .collect()
    }

    /// 오래된 완료 기록 정리
    pub fn purge_finished(&self, now: Instant) -> usize {
        self.finished.purge(now)
    }

    pub fn is_finished(&self, transaction_id: &TransactionId) -> bool {
        self.finished.contains(transaction_id)
    }

    /// 조립 중인 arrival 수
    pub fn len(&self) -> usize {
        self.arrivals.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.arrivals.read().is_empty()
    }
}
