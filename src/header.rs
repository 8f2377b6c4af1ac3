//! 프레임 헤더
//!
//! ```text
//! byte0..2   magic = 'D','I','M'
//! byte3      bits7-4: header_length/4 (1..6), bits3-0: data_type
//! [8 bytes]  transaction_id   -- header_length >= 12
//! [4 bytes]  pages            -- header_length >= 20
//! [4 bytes]  index            -- header_length >= 20
//! [4 bytes]  body_length      -- header_length in {8, 16, 24}
//! ```
//!
//! 모든 정수는 Big Endian. 헤더 길이가 어떤 선택 필드가 있는지를 결정한다.

use bytes::{Buf, BufMut};

use crate::transaction::{TransactionId, TRANSACTION_ID_SIZE};
use crate::{Error, Result, MAGIC, MAX_BODY_LENGTH, MAX_PAGES};

/// 최소 헤더 크기 (magic + 길이/타입 바이트)
pub const MIN_HEADER_SIZE: usize = 4;

/// 최대 헤더 크기
pub const MAX_HEADER_SIZE: usize = 24;

/// 데이터 타입 (4비트)
///
/// bit0 = 응답 플래그, bit3 = fragment 플래그
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[repr(u8)]
pub enum DataType {
    Command = 0b0000,
    CommandResponse = 0b0001,
    Message = 0b0010,
    MessageResponse = 0b0011,
    MessageFragment = 0b1010,
}

impl DataType {
    pub const RESPONSE_FLAG: u8 = 0b0001;
    pub const FRAGMENT_FLAG: u8 = 0b1000;

    pub fn from_nibble(nibble: u8) -> Result<Self> {
        match nibble {
            0b0000 => Ok(DataType::Command),
            0b0001 => Ok(DataType::CommandResponse),
            0b0010 => Ok(DataType::Message),
            0b0011 => Ok(DataType::MessageResponse),
            0b1010 => Ok(DataType::MessageFragment),
            _ => Err(Error::UnknownDataType { nibble }),
        }
    }

    pub fn nibble(self) -> u8 {
        self as u8
    }

    pub fn is_response(self) -> bool {
        self.nibble() & Self::RESPONSE_FLAG != 0
    }

    pub fn is_fragment(self) -> bool {
        self.nibble() & Self::FRAGMENT_FLAG != 0
    }

    /// 이 타입의 요청에 대한 응답 타입
    pub fn response(self) -> DataType {
        match self {
            DataType::Command | DataType::CommandResponse => DataType::CommandResponse,
            DataType::Message | DataType::MessageResponse | DataType::MessageFragment => {
                DataType::MessageResponse
            }
        }
    }
}

/// 프레임 헤더
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Header {
    pub data_type: DataType,

    /// ZERO 면 "id 없음"
    pub transaction_id: TransactionId,

    /// 이 transaction 의 총 fragment 수 (분할되지 않았으면 1)
    pub pages: u32,

    /// 0부터 시작하는 fragment 위치
    pub index: u32,

    /// None 이면 datagram 끝까지가 body
    /// 바이트 스트림 전송에서만 Some 을 사용
    pub body_length: Option<u32>,
}

impl Header {
    /// 필드 범위를 검증하며 헤더 생성
    pub fn new(
        data_type: DataType,
        transaction_id: TransactionId,
        pages: u32,
        index: u32,
        body_length: Option<u32>,
    ) -> Result<Self> {
        let header = Self {
            data_type,
            transaction_id,
            pages,
            index,
            body_length,
        };
        header.validate()?;
        Ok(header)
    }

    /// 분할되지 않은 단일 프레임 헤더
    pub fn single(data_type: DataType, transaction_id: TransactionId) -> Self {
        Self {
            data_type,
            transaction_id,
            pages: 1,
            index: 0,
            body_length: None,
        }
    }

    fn validate(&self) -> Result<()> {
        if self.pages == 0 || self.pages > MAX_PAGES {
            return Err(Error::PagesOutOfRange { pages: self.pages });
        }
        if self.index >= self.pages {
            return Err(Error::IndexOutOfRange {
                index: self.index,
                pages: self.pages,
            });
        }
        if let Some(length) = self.body_length {
            if length > MAX_BODY_LENGTH {
                return Err(Error::BodyLengthOutOfRange { length });
            }
        }
        Ok(())
    }

    fn has_pages(&self) -> bool {
        self.pages > 1
    }

    fn has_transaction_id(&self) -> bool {
        !self.transaction_id.is_zero() || self.has_pages()
    }

    /// 필드를 모두 표현하는 최소 헤더 길이 (4, 8, 12, 16, 20, 24)
    pub fn header_length(&self) -> usize {
        let mut length = MIN_HEADER_SIZE;
        if self.has_transaction_id() {
            length += TRANSACTION_ID_SIZE;
        }
        if self.has_pages() {
            length += 8;
        }
        if self.body_length.is_some() {
            length += 4;
        }
        length
    }

    /// 헤더를 버퍼에 기록
    pub fn write<B: BufMut>(&self, buf: &mut B) {
        let length = self.header_length();
        buf.put_slice(&MAGIC);
        buf.put_u8((((length / 4) as u8) << 4) | self.data_type.nibble());
        if self.has_transaction_id() {
            buf.put_slice(self.transaction_id.as_bytes());
        }
        if self.has_pages() {
            buf.put_u32(self.pages);
            buf.put_u32(self.index);
        }
        if let Some(body_length) = self.body_length {
            buf.put_u32(body_length);
        }
    }

    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = Vec::with_capacity(self.header_length());
        self.write(&mut buf);
        buf
    }

    /// 버퍼 앞쪽에서 헤더 파싱
    ///
    /// 헤더 전체가 아직 도착하지 않았으면 `Error::Incomplete` 를 반환한다.
    /// 반환값의 두 번째 항목은 헤더 길이(바이트).
    pub fn parse(bytes: &[u8]) -> Result<(Self, usize)> {
        if bytes.len() < MIN_HEADER_SIZE {
            return Err(Error::Incomplete {
                needed: MIN_HEADER_SIZE,
                available: bytes.len(),
            });
        }
        if bytes[..3] != MAGIC {
            return Err(Error::InvalidMagic {
                got: [bytes[0], bytes[1], bytes[2]],
            });
        }

        let length = ((bytes[3] >> 4) as usize) * 4;
        if length < MIN_HEADER_SIZE || length > MAX_HEADER_SIZE {
            return Err(Error::UnsupportedHeaderLength { length });
        }
        let data_type = DataType::from_nibble(bytes[3] & 0x0F)?;
        if bytes.len() < length {
            return Err(Error::Incomplete {
                needed: length,
                available: bytes.len(),
            });
        }

        let mut buf = &bytes[MIN_HEADER_SIZE..length];

        let transaction_id = if length >= 12 {
            let mut id = [0u8; TRANSACTION_ID_SIZE];
            buf.copy_to_slice(&mut id);
            TransactionId::from_bytes(id)
        } else {
            TransactionId::ZERO
        };

        let (pages, index) = if length >= 20 {
            (buf.get_u32(), buf.get_u32())
        } else {
            (1, 0)
        };

        // 8, 16, 24 형식에만 body_length 가 있음
        let body_length = if length % 8 == 0 {
            Some(buf.get_u32())
        } else {
            None
        };

        let header = Header::new(data_type, transaction_id, pages, index, body_length)?;
        Ok((header, length))
    }
}
