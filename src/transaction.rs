//! Transaction ID
//!
//! 요청/fragment 묶음과 그 응답을 연결하는 8바이트 식별자.
//! 프로세스 수명 동안만 유일하며 암호학적 유일성은 보장하지 않음.

use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::OnceLock;

/// Transaction ID 크기 (바이트)
pub const TRANSACTION_ID_SIZE: usize = 8;

/// 8바이트 transaction id (network order)
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct TransactionId([u8; TRANSACTION_ID_SIZE]);

/// 전역 카운터 (난수 시작점)
static COUNTER: OnceLock<AtomicU64> = OnceLock::new();

impl TransactionId {
    /// "id 없음" 예약값
    pub const ZERO: TransactionId = TransactionId([0u8; TRANSACTION_ID_SIZE]);

    pub fn from_bytes(bytes: [u8; TRANSACTION_ID_SIZE]) -> Self {
        Self(bytes)
    }

    pub fn from_u64(value: u64) -> Self {
        Self(value.to_be_bytes())
    }

    /// 새 id 생성
    ///
    /// 난수로 시작한 64비트 카운터를 1씩 증가시킨다. 하위 32비트가 넘치면
    /// 상위 32비트로 올림되고, 64비트 전체가 넘치면 0으로 돌아간다.
    /// ZERO 는 건너뛴다.
    pub fn generate() -> Self {
        let counter = COUNTER.get_or_init(|| AtomicU64::new(rand::random::<u64>()));
        loop {
            let value = counter.fetch_add(1, Ordering::Relaxed).wrapping_add(1);
            if value != 0 {
                return Self::from_u64(value);
            }
        }
    }

    pub fn is_zero(&self) -> bool {
        *self == Self::ZERO
    }

    pub fn as_bytes(&self) -> &[u8; TRANSACTION_ID_SIZE] {
        &self.0
    }

    pub fn as_u64(&self) -> u64 {
        u64::from_be_bytes(self.0)
    }
}

impl fmt::Display for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x}", self.as_u64())
    }
}

impl fmt::Debug for TransactionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TransactionId({})", self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashSet;

    #[test]
    fn test_generate_is_unique_and_nonzero() {
        let ids: HashSet<TransactionId> = (0..1000).map(|_| TransactionId::generate()).collect();
        assert_eq!(ids.len(), 1000);
        assert!(!ids.contains(&TransactionId::ZERO));
    }

    #[test]
    fn test_generate_advances() {
        let a = TransactionId::generate().as_u64();
        let b = TransactionId::generate().as_u64();
        // 다른 테스트 스레드가 사이에 끼어들 수 있으므로 증가 방향만 확인
        assert_ne!(a, b);
        assert!(b.wrapping_sub(a) < 1 << 32);
    }

    #[test]
    fn test_display_hex() {
        let id = TransactionId::from_u64(0x0102_0304_0506_0708);
        assert_eq!(id.to_string(), "0102030405060708");
        assert_eq!(id.as_bytes(), &[1, 2, 3, 4, 5, 6, 7, 8]);
    }
}
