//! 에러 타입 정의

use thiserror::Error;

/// DMTP 프로토콜 에러 타입
#[derive(Error, Debug)]
pub enum Error {
    #[error("IO 에러: {0}")]
    Io(#[from] std::io::Error),

    #[error("유효하지 않은 매직 바이트: {got:02X?}")]
    InvalidMagic { got: [u8; 3] },

    #[error("지원하지 않는 헤더 길이: {length} bytes")]
    UnsupportedHeaderLength { length: usize },

    #[error("알 수 없는 데이터 타입: {nibble:#06b}")]
    UnknownDataType { nibble: u8 },

    #[error("데이터 부족: {needed} bytes 필요, {available} bytes 있음")]
    Incomplete { needed: usize, available: usize },

    #[error("pages 범위 초과: {pages}")]
    PagesOutOfRange { pages: u32 },

    #[error("index 범위 초과: index={index}, pages={pages}")]
    IndexOutOfRange { index: u32, pages: u32 },

    #[error("body 길이 범위 초과: {length}")]
    BodyLengthOutOfRange { length: u32 },

    #[error("스트림 전송에는 body 길이가 필요함")]
    MissingBodyLength,

    #[error("body가 너무 큼: {size} bytes")]
    BodyTooLarge { size: usize },

    #[error("잘못된 설정: {0}")]
    InvalidConfig(String),
}

impl Error {
    /// 스트림 전송에서 "데이터를 더 받아야 함"을 의미하는지 여부
    pub fn is_incomplete(&self) -> bool {
        matches!(self, Error::Incomplete { .. })
    }
}

/// Result 타입 별칭
pub type Result<T> = std::result::Result<T, Error>;
