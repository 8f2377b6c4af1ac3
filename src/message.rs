//! 제어 메시지 정의
//!
//! 제어 body 는 ASCII 리터럴이며 대소문자를 구분한다.
//! fragment ACK 의 body 는 pages(4) + index(4) 뒤에 선택적으로 "OK".

use bytes::{Buf, BufMut, Bytes, BytesMut};

pub const PING: &[u8] = b"PING";
pub const PONG: &[u8] = b"PONG";
pub const OK: &[u8] = b"OK";
pub const AGAIN: &[u8] = b"AGAIN";
pub const NOOP: &[u8] = b"NOOP";

/// fragment 위치 필드 크기 (pages + index)
pub const FRAGMENT_POSITION_SIZE: usize = 8;

/// 제어 어휘
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Control {
    Ping,
    Pong,
    Ok,
    Again,
    Noop,
}

impl Control {
    pub fn parse(body: &[u8]) -> Option<Self> {
        match body {
            b"PING" => Some(Control::Ping),
            b"PONG" => Some(Control::Pong),
            b"OK" => Some(Control::Ok),
            b"AGAIN" => Some(Control::Again),
            b"NOOP" => Some(Control::Noop),
            _ => None,
        }
    }

    pub fn as_bytes(self) -> &'static [u8] {
        match self {
            Control::Ping => PING,
            Control::Pong => PONG,
            Control::Ok => OK,
            Control::Again => AGAIN,
            Control::Noop => NOOP,
        }
    }

    pub fn body(self) -> Bytes {
        Bytes::from_static(self.as_bytes())
    }
}

/// fragment 위치 (ACK 대상)
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FragmentPosition {
    pub pages: u32,
    pub index: u32,
}

/// fragment ACK body 생성: pages + index + "OK"
pub fn fragment_ack_body(pages: u32, index: u32) -> Bytes {
    let mut buf = BytesMut::with_capacity(FRAGMENT_POSITION_SIZE + OK.len());
    buf.put_u32(pages);
    buf.put_u32(index);
    buf.put_slice(OK);
    buf.freeze()
}

/// MessageResponse body 해석 결과
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum MessageReply {
    /// 수신 확인 (fragment 이면 위치 포함)
    Ok(Option<FragmentPosition>),

    /// 재전송 요청 힌트
    Again(Option<FragmentPosition>),

    /// 알 수 없는 body
    Other(Bytes),
}

impl MessageReply {
    pub fn parse(body: &Bytes) -> Self {
        if body.len() >= FRAGMENT_POSITION_SIZE {
            let mut buf = &body[..FRAGMENT_POSITION_SIZE];
            let position = FragmentPosition {
                pages: buf.get_u32(),
                index: buf.get_u32(),
            };
            match &body[FRAGMENT_POSITION_SIZE..] {
                b"" | b"OK" => return MessageReply::Ok(Some(position)),
                b"AGAIN" => return MessageReply::Again(Some(position)),
                _ => {}
            }
        }

        match Control::parse(body) {
            Some(Control::Ok) => MessageReply::Ok(None),
            Some(Control::Again) => MessageReply::Again(None),
            _ => MessageReply::Other(body.clone()),
        }
    }
}
