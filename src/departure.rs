//! 출발 태스크와 출발 풀
//!
//! - Departure: ACK 를 기다리는 송신 단위 (프레임 1개 이상)
//! - DeparturePool: 진행 중인 송신을 추적하고 재전송/만료/ACK 처리

use std::collections::BTreeMap;
use std::net::SocketAddr;
use std::time::{Duration, Instant};

use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::finished::FinishedCache;
use crate::header::DataType;
use crate::package::Package;
use crate::packer;
use crate::transaction::TransactionId;
use crate::{Config, Result};

/// 송신 태스크
#[derive(Debug, Clone)]
pub struct Departure {
    pub transaction_id: TransactionId,

    /// 요청 타입 (분할된 메시지는 Message)
    pub data_type: DataType,

    pub source: SocketAddr,
    pub destination: SocketAddr,

    /// ACK 를 받지 못한 프레임 (index 순)
    frames: BTreeMap<u32, Package>,

    /// 남은 재전송 횟수, 음수가 되면 실패
    retries_left: i32,

    next_retry_deadline: Instant,

    created_at: Instant,
}

impl Departure {
    /// 남은 프레임 (index 순)
    pub fn frames(&self) -> impl Iterator<Item = &Package> {
        self.frames.values()
    }

    pub fn remaining(&self) -> usize {
        self.frames.len()
    }

    pub fn is_done(&self) -> bool {
        self.frames.is_empty()
    }

    pub fn retries_left(&self) -> i32 {
        self.retries_left
    }

    pub fn next_retry_deadline(&self) -> Instant {
        self.next_retry_deadline
    }

    pub fn created_at(&self) -> Instant {
        self.created_at
    }

    /// 분할된 송신인지 여부
    pub fn is_fragmented(&self) -> bool {
        self.frames.values().any(|frame| frame.is_fragment())
    }

    fn remove_frame(&mut self, index: u32) -> bool {
        self.frames.remove(&index).is_some()
    }
}

/// sweep 결과
#[derive(Debug)]
pub enum SweepOutcome {
    /// 재전송할 송신 (남은 프레임만 포함)
    Resend(Departure),

    /// 재시도 소진, 풀에서 제거됨
    Failed(Departure),
}

/// ACK 처리 결과
#[derive(Debug)]
pub enum AckOutcome {
    /// 프레임 하나 제거, 아직 남음
    Partial { remaining: usize },

    /// 마지막 프레임까지 확인됨, 풀에서 제거됨
    Completed(Departure),

    /// 이미 완료된 transaction 이거나 이미 확인된 프레임
    Duplicate,

    /// 해당 송신 없음
    Unknown,
}

/// 출발 풀
pub struct DeparturePool {
    departures: RwLock<Vec<Departure>>,
    finished: FinishedCache,
    max_fragment_body_size: usize,
    retry_budget: u32,
    retry_timeout: Duration,
}

impl DeparturePool {
    pub fn new(config: &Config) -> Self {
        Self {
            departures: RwLock::new(Vec::new()),
            finished: FinishedCache::new(config.finished_ttl()),
            max_fragment_body_size: config.max_fragment_body_size,
            retry_budget: config.retry_budget,
            retry_timeout: config.retry_timeout(),
        }
    }

    /// 송신 등록
    ///
    /// Message 는 필요하면 분할한다. 반환된 Departure 는 호출자가 즉시 첫 전송에 사용.
    pub fn submit(
        &self,
        package: Package,
        source: SocketAddr,
        destination: SocketAddr,
        now: Instant,
    ) -> Result<Departure> {
        let transaction_id = package.transaction_id();
        let data_type = package.data_type();

        let frames = if data_type == DataType::Message {
            packer::split(package, self.max_fragment_body_size)?
        } else {
            vec![package]
        };

        let departure = Departure {
            transaction_id,
            data_type,
            source,
            destination,
            frames: frames.into_iter().map(|frame| (frame.index(), frame)).collect(),
            retries_left: self.retry_budget as i32,
            next_retry_deadline: now + self.retry_timeout,
            created_at: now,
        };

        trace!(
            "송신 등록: {} -> {} ({} frames)",
            transaction_id,
            destination,
            departure.remaining()
        );

        self.departures.write().push(departure.clone());
        Ok(departure)
    }

    /// 만료된 송신 하나를 처리
    ///
    /// 재전송 시각이 지난 첫 송신의 재시도 횟수를 줄인다. 아직 남아 있으면 다음
    /// 재전송 시각을 갱신해 돌려주고, 소진됐으면 풀에서 제거해 실패로 돌려준다.
    /// 만료된 송신이 없으면 None. 호출자는 None 이 나올 때까지 반복 호출한다.
    pub fn sweep(&self, now: Instant) -> Option<SweepOutcome> {
        let mut departures = self.departures.write();
        let position = departures
            .iter()
            .position(|departure| departure.next_retry_deadline <= now)?;

        let departure = &mut departures[position];
        departure.retries_left -= 1;

        if departure.retries_left >= 0 {
            departure.next_retry_deadline = now + self.retry_timeout;
            debug!(
                "재전송: {} -> {} ({} frames, 남은 재시도 {})",
                departure.transaction_id,
                departure.destination,
                departure.remaining(),
                departure.retries_left
            );
            return Some(SweepOutcome::Resend(departure.clone()));
        }

        let departure = departures.remove(position);
        self.finished.record(departure.transaction_id, now);
        warn!(
            "송신 실패 (재시도 소진): {} -> {}, {} frames 미확인",
            departure.transaction_id,
            departure.destination,
            departure.remaining()
        );
        Some(SweepOutcome::Failed(departure))
    }

    /// ACK 처리
    pub fn acknowledge(
        &self,
        transaction_id: TransactionId,
        index: u32,
        destination: SocketAddr,
        now: Instant,
    ) -> AckOutcome {
        let mut departures = self.departures.write();
        if self.finished.contains(&transaction_id) {
            return AckOutcome::Duplicate;
        }

        let Some(position) = departures.iter().position(|departure| {
            departure.transaction_id == transaction_id && departure.destination == destination
        }) else {
            return AckOutcome::Unknown;
        };

        let departure = &mut departures[position];
        if !departure.remove_frame(index) {
            return AckOutcome::Duplicate;
        }
        if !departure.is_done() {
            return AckOutcome::Partial {
                remaining: departure.remaining(),
            };
        }

        let departure = departures.remove(position);
        self.finished.record(transaction_id, now);
        debug!("송신 완료: {} -> {}", transaction_id, destination);
        AckOutcome::Completed(departure)
    }

    /// 오래된 완료 기록 정리
    pub fn purge_finished(&self, now: Instant) -> usize {
        self.finished.purge(now)
    }

    pub fn is_finished(&self, transaction_id: &TransactionId) -> bool {
        self.finished.contains(transaction_id)
    }

    pub fn contains(&self, transaction_id: &TransactionId) -> bool {
        self.departures
            .read()
            .iter()
            .any(|departure| departure.transaction_id == *transaction_id)
    }

    /// 진행 중인 송신 수
    pub fn len(&self) -> usize {
        self.departures.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.departures.read().is_empty()
    }
}
