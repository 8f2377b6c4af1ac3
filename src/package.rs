//! 패키지 (헤더 + body)
//!
//! 송신측은 `create` 로 만들고 수신측은 `parse` 로 만든다.
//! 생성 이후에는 변경되지 않는다.

use bytes::{Bytes, BytesMut};

use crate::header::{DataType, Header};
use crate::transaction::TransactionId;
use crate::{Error, Result, MAX_BODY_LENGTH};

/// 와이어 프레임 하나
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Package {
    pub header: Header,
    pub body: Bytes,
}

impl Package {
    /// 새 패키지 생성 (datagram 용, body_length 생략)
    pub fn create(
        data_type: DataType,
        transaction_id: TransactionId,
        pages: u32,
        index: u32,
        body: Bytes,
    ) -> Result<Self> {
        check_body_size(body.len())?;
        let header = Header::new(data_type, transaction_id, pages, index, None)?;
        Ok(Self { header, body })
    }

    /// 분할되지 않은 단일 프레임
    pub fn single(data_type: DataType, transaction_id: TransactionId, body: Bytes) -> Result<Self> {
        Self::create(data_type, transaction_id, 1, 0, body)
    }

    /// 바이트 스트림 전송용: body_length 를 헤더에 기록
    pub fn with_body_length(mut self) -> Self {
        self.header.body_length = Some(self.body.len() as u32);
        self
    }

    pub fn data_type(&self) -> DataType {
        self.header.data_type
    }

    pub fn transaction_id(&self) -> TransactionId {
        self.header.transaction_id
    }

    pub fn pages(&self) -> u32 {
        self.header.pages
    }

    pub fn index(&self) -> u32 {
        self.header.index
    }

    pub fn is_fragment(&self) -> bool {
        self.header.data_type.is_fragment()
    }

    /// 인코딩된 프레임 크기
    pub fn frame_len(&self) -> usize {
        self.header.header_length() + self.body.len()
    }

    /// 프레임으로 직렬화
    pub fn to_bytes(&self) -> Bytes {
        let mut buf = BytesMut::with_capacity(self.frame_len());
        self.header.write(&mut buf);
        buf.extend_from_slice(&self.body);
        buf.freeze()
    }

    /// datagram 하나를 파싱
    ///
    /// body_length 가 없으면 datagram 나머지 전체가 body.
    pub fn parse(data: &[u8]) -> Result<Self> {
        let (header, header_len) = Header::parse(data)?;
        let rest = &data[header_len..];

        let body = match header.body_length {
            None => Bytes::copy_from_slice(rest),
            Some(length) => {
                let length = length as usize;
                if rest.len() < length {
                    return Err(Error::Incomplete {
                        needed: header_len + length,
                        available: data.len(),
                    });
                }
                Bytes::copy_from_slice(&rest[..length])
            }
        };

        Ok(Self { header, body })
    }

    /// 바이트 스트림 버퍼에서 완성된 프레임 하나를 꺼냄
    ///
    /// 데이터가 부족하면 `Ok(None)` 을 반환하고 버퍼는 건드리지 않는다.
    pub fn parse_stream(buf: &mut BytesMut) -> Result<Option<Self>> {
        let (header, header_len) = match Header::parse(&buf[..]) {
            Ok(parsed) => parsed,
            Err(e) if e.is_incomplete() => return Ok(None),
            Err(e) => return Err(e),
        };

        let body_len = header.body_length.ok_or(Error::MissingBodyLength)? as usize;
        let total = header_len + body_len;
        if buf.len() < total {
            buf.reserve(total - buf.len());
            return Ok(None);
        }

        let mut frame = buf.split_to(total).freeze();
        let body = frame.split_off(header_len);
        Ok(Some(Self { header, body }))
    }
}

fn check_body_size(size: usize) -> Result<()> {
    if size > MAX_BODY_LENGTH as usize {
        return Err(Error::BodyTooLarge { size });
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_datagram_roundtrip() {
        let tid = TransactionId::generate();
        let package = Package::create(
            DataType::MessageFragment,
            tid,
            3,
            1,
            Bytes::from_static(b"fragment body"),
        )
        .unwrap();

        let bytes = package.to_bytes();
        assert_eq!(bytes.len(), 20 + 13);
        assert_eq!(Package::parse(&bytes).unwrap(), package);
    }

    #[test]
    fn test_minimal_command() {
        let package =
            Package::single(DataType::Command, TransactionId::ZERO, Bytes::from_static(b"NOOP")).unwrap();
        assert_eq!(&package.to_bytes()[..], b"DIM\x10NOOP");
    }

    #[test]
    fn test_empty_body() {
        let package = Package::single(DataType::Message, TransactionId::generate(), Bytes::new()).unwrap();
        let parsed = Package::parse(&package.to_bytes()).unwrap();
        assert!(parsed.body.is_empty());
        assert_eq!(parsed.header.header_length(), 12);
    }

    #[test]
    fn test_datagram_with_body_length_truncates() {
        let package = Package::single(DataType::Message, TransactionId::generate(), Bytes::from_static(b"hello"))
            .unwrap()
            .with_body_length();
        let mut bytes = package.to_bytes().to_vec();
        bytes.extend_from_slice(b"trailing");

        let parsed = Package::parse(&bytes).unwrap();
        assert_eq!(&parsed.body[..], b"hello");
    }

    #[test]
    fn test_stream_parsing() {
        let first = Package::single(DataType::Message, TransactionId::generate(), Bytes::from_static(b"first"))
            .unwrap()
            .with_body_length();
        let second = Package::create(
            DataType::MessageFragment,
            TransactionId::generate(),
            2,
            0,
            Bytes::from_static(b"second"),
        )
        .unwrap()
        .with_body_length();

        let mut wire = BytesMut::new();
        wire.extend_from_slice(&first.to_bytes());
        wire.extend_from_slice(&second.to_bytes());

        // 한 바이트씩 흘려보내도 프레임 경계를 정확히 찾아야 함
        let mut buf = BytesMut::new();
        let mut frames = Vec::new();
        for byte in wire.iter() {
            buf.extend_from_slice(&[*byte]);
            if let Some(package) = Package::parse_stream(&mut buf).unwrap() {
                frames.push(package);
            }
        }

        assert_eq!(frames, vec![first, second]);
        assert!(buf.is_empty());
    }

    #[test]
    fn test_stream_requires_body_length() {
        let package = Package::single(DataType::Message, TransactionId::generate(), Bytes::from_static(b"x")).unwrap();
        let mut buf = BytesMut::from(&package.to_bytes()[..]);
        assert!(matches!(Package::parse_stream(&mut buf), Err(Error::MissingBodyLength)));
    }

    #[test]
    fn test_stream_corrupt_frame() {
        let mut buf = BytesMut::from(&b"XYZ\x10abc"[..]);
        assert!(matches!(Package::parse_stream(&mut buf), Err(Error::InvalidMagic { .. })));
    }
}
