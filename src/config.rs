//! 프로토콜 설정

use std::time::Duration;

use crate::{Error, Result, DEFAULT_FRAGMENT_SIZE, DEFAULT_RETRY_BUDGET, MAX_BODY_LENGTH};

/// 타임아웃 계열 설정의 상한 (7일, 밀리초)
pub const MAX_TIMEOUT_MS: u64 = 7 * 24 * 60 * 60 * 1000;

/// 재전송 횟수 상한
pub const MAX_RETRY_BUDGET: u32 = 1_000;

/// DMTP 프로토콜 설정
#[derive(Debug, Clone)]
pub struct Config {
    /// fragment 하나에 담는 최대 body 크기 (바이트)
    /// 이보다 큰 메시지는 MessageFragment 들로 분할됨
    pub max_fragment_body_size: usize,

    /// 첫 전송 이후 추가 재전송 횟수
    /// 예: 3 = 총 4회 전송
    pub retry_budget: u32,

    /// ACK 대기 후 재전송까지의 시간 (밀리초)
    pub retry_timeout_ms: u64,

    /// 조립 중인 arrival 을 포기하기까지의 시간 (밀리초)
    pub arrival_timeout_ms: u64,

    /// 완료된 transaction 을 기억하는 시간 (밀리초)
    /// 재전송/폐기 타임아웃보다 충분히 길어야 함
    pub finished_ttl_ms: u64,

    /// pool sweep 주기 (밀리초)
    pub tick_interval_ms: u64,

    /// 수신 버퍼 크기
    pub recv_buffer_size: usize,

    /// 송신 큐 길이 (프레임 수)
    pub send_queue_size: usize,

    /// 애플리케이션 이벤트 큐 길이
    pub event_queue_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            max_fragment_body_size: DEFAULT_FRAGMENT_SIZE,
            retry_budget: DEFAULT_RETRY_BUDGET,
            retry_timeout_ms: 120_000,         // 2분
            arrival_timeout_ms: 120_000,       // 2분
            finished_ttl_ms: 600_000,          // 10분
            tick_interval_ms: 500,
            recv_buffer_size: 65535,
            send_queue_size: 10_000,
            event_queue_size: 1000,
        }
    }
}

impl Config {
    /// 새 설정 생성
    pub fn new() -> Self {
        Self::default()
    }

    pub fn retry_timeout(&self) -> Duration {
        Duration::from_millis(self.retry_timeout_ms)
    }

    pub fn arrival_timeout(&self) -> Duration {
        Duration::from_millis(self.arrival_timeout_ms)
    }

    pub fn finished_ttl(&self) -> Duration {
        Duration::from_millis(self.finished_ttl_ms)
    }

    pub fn tick_interval(&self) -> Duration {
        Duration::from_millis(self.tick_interval_ms)
    }

    /// 메시지 하나를 보내는 데 필요한 총 전송 횟수
    pub fn total_transmissions(&self) -> u32 {
        self.retry_budget + 1
    }

    /// 설정 검증
    pub fn validate(&self) -> Result<()> {
        if self.max_fragment_body_size == 0 {
            return Err(Error::InvalidConfig("max_fragment_body_size 는 0보다 커야 함".into()));
        }
        if self.max_fragment_body_size > MAX_BODY_LENGTH as usize {
            return Err(Error::InvalidConfig(format!(
                "max_fragment_body_size 가 너무 큼: {}",
                self.max_fragment_body_size
            )));
        }
        if self.retry_budget > MAX_RETRY_BUDGET {
            return Err(Error::InvalidConfig(format!(
                "retry_budget 이 너무 큼: {} (최대 {})",
                self.retry_budget, MAX_RETRY_BUDGET
            )));
        }
        for (name, value) in [
            ("retry_timeout_ms", self.retry_timeout_ms),
            ("arrival_timeout_ms", self.arrival_timeout_ms),
            ("finished_ttl_ms", self.finished_ttl_ms),
            ("tick_interval_ms", self.tick_interval_ms),
        ] {
            if value > MAX_TIMEOUT_MS {
                return Err(Error::InvalidConfig(format!(
                    "{} 가 너무 큼: {} (최대 {})",
                    name, value, MAX_TIMEOUT_MS
                )));
            }
        }
        if self.retry_timeout_ms == 0 || self.arrival_timeout_ms == 0 {
            return Err(Error::InvalidConfig("타임아웃은 0보다 커야 함".into()));
        }
        if self.tick_interval_ms == 0 || self.tick_interval_ms >= self.retry_timeout_ms {
            return Err(Error::InvalidConfig(format!(
                "tick_interval_ms({}) 는 retry_timeout_ms({}) 보다 작아야 함",
                self.tick_interval_ms, self.retry_timeout_ms
            )));
        }
        if self.finished_ttl_ms <= self.retry_timeout_ms.max(self.arrival_timeout_ms) {
            return Err(Error::InvalidConfig(
                "finished_ttl_ms 는 재전송/폐기 타임아웃보다 길어야 함".into(),
            ));
        }
        if self.send_queue_size == 0 || self.event_queue_size == 0 {
            return Err(Error::InvalidConfig("큐 길이는 0보다 커야 함".into()));
        }
        Ok(())
    }

    /// 저지연 환경용 설정 (LAN, 루프백)
    pub fn low_latency() -> Self {
        Self {
            max_fragment_body_size: 1400,
            retry_budget: 3,
            retry_timeout_ms: 1_000,
            arrival_timeout_ms: 5_000,
            finished_ttl_ms: 30_000,
            tick_interval_ms: 100,
            recv_buffer_size: 65535,
            send_queue_size: 10_000,
            event_queue_size: 1000,
        }
    }

    /// 불안정한 네트워크용 설정
    pub fn unstable_network() -> Self {
        Self {
            max_fragment_body_size: 512,       // 작은 fragment
            retry_budget: 8,
            retry_timeout_ms: 5_000,
            arrival_timeout_ms: 60_000,
            finished_ttl_ms: 300_000,
            tick_interval_ms: 250,
            recv_buffer_size: 65535,
            send_queue_size: 20_000,
            event_queue_size: 1000,
        }
    }
}
