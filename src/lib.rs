//! # DMTP (DIM Message Transfer Protocol)
//!
//! UDP 기반 ACK 확인형 메시지 전송 프로토콜
//!
//! ## 핵심 특징
//! - **가변 헤더**: 필요한 필드만 담는 4~24바이트 헤더
//! - **조각 분할**: 큰 메시지를 fragment로 나누고 index 순서대로 조립
//! - **ACK + 재전송**: 출발 태스크는 ACK를 받을 때까지 재시도 예산 내에서 재전송
//! - **중복 억제**: 완료된 transaction은 일정 시간 기억하여 늦게 온 중복을 무시
//! - **제어 어휘**: PING/PONG/OK/AGAIN/NOOP

pub mod arrival;
pub mod config;
pub mod departure;
pub mod dispatcher;
pub mod error;
pub mod finished;
pub mod header;
pub mod message;
pub mod node;
pub mod package;
pub mod packer;
pub mod stats;
pub mod transaction;

pub use arrival::{AcceptOutcome, Arrival, ArrivalPool};
pub use config::Config;
pub use departure::{AckOutcome, Departure, DeparturePool, SweepOutcome};
pub use dispatcher::{Delegate, Dispatcher, Transport};
pub use error::{Error, Result};
pub use finished::FinishedCache;
pub use header::{DataType, Header};
pub use node::{Node, NodeEvent};
pub use package::Package;
pub use packer::{Assembly, InsertOutcome};
pub use stats::ProtocolStats;
pub use transaction::TransactionId;

/// 매직 바이트 (프레임 식별용)
pub const MAGIC: [u8; 3] = *b"DIM";

/// 최대 fragment 수
pub const MAX_PAGES: u32 = 2_097_152;

/// 최대 body 길이 (1 GiB)
pub const MAX_BODY_LENGTH: u32 = 1 << 30;

/// 기본 fragment body 크기 (바이트)
pub const DEFAULT_FRAGMENT_SIZE: usize = 512;

/// 기본 재시도 횟수 (첫 전송 제외)
pub const DEFAULT_RETRY_BUDGET: u32 = 3;
