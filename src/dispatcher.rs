//! 프로토콜 디스패처
//!
//! 받은 프레임을 데이터 타입별로 분류하여 제어 어휘(PING/PONG/OK/AGAIN/NOOP)를 처리하고,
//! 애플리케이션에 전달할 프레임과 내부에서 소비할 프레임을 구분한다.
//!
//! | data_type | body | 동작 |
//! |---|---|---|
//! | Command | PING | PONG 응답, 전달 안 함 |
//! | Command | 그 외 | OK 응답, 전달 |
//! | CommandResponse | PONG / OK | 송신 확인, 전달 안 함 |
//! | CommandResponse | 그 외 | 송신 확인, 전달 |
//! | Message | - | OK 응답, 전달 |
//! | MessageFragment | - | pages/index + OK 응답, 조립 완료 시 전달 |
//! | MessageResponse | OK | 해당 프레임 송신 확인 |
//! | MessageResponse | AGAIN | 재전송 힌트, 다음 sweep 까지 대기 |
//! | 모든 타입 | NOOP | 무시 |
//!
//! 소켓 I/O 는 `Transport` 에 위임하며, 풀 잠금을 잡은 채로 전송하거나
//! 애플리케이션 콜백을 호출하지 않는다.

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Instant;

use bytes::Bytes;
use parking_lot::RwLock;
use tracing::{debug, trace, warn};

use crate::arrival::{AcceptOutcome, ArrivalPool};
use crate::departure::{AckOutcome, DeparturePool, SweepOutcome};
use crate::header::DataType;
use crate::message::{fragment_ack_body, Control, MessageReply};
use crate::package::Package;
use crate::stats::ProtocolStats;
use crate::transaction::TransactionId;
use crate::{Config, Result};

/// 하위 전송 계층 (UDP 소켓 등)
pub trait Transport: Send + Sync {
    /// 바이트 버퍼를 목적지로 전송 (전달 보장 없음, 블로킹 금지)
    fn send(&self, data: &[u8], destination: SocketAddr) -> io::Result<usize>;

    /// 목적지에 현재 도달 가능한지 여부
    fn is_reachable(&self, _destination: SocketAddr) -> bool {
        true
    }
}

/// 애플리케이션 콜백
pub trait Delegate: Send + Sync {
    fn on_command(&self, body: Bytes, source: SocketAddr);

    fn on_message(&self, body: Bytes, source: SocketAddr);

    fn on_send_succeeded(&self, _handle: TransactionId, _destination: SocketAddr) {}

    fn on_send_timed_out(&self, _handle: TransactionId, _destination: SocketAddr) {}
}

impl<T: Transport + ?Sized> Transport for Arc<T> {
    fn send(&self, data: &[u8], destination: SocketAddr) -> io::Result<usize> {
        (**self).send(data, destination)
    }

    fn is_reachable(&self, destination: SocketAddr) -> bool {
        (**self).is_reachable(destination)
    }
}

impl<D: Delegate + ?Sized> Delegate for Arc<D> {
    fn on_command(&self, body: Bytes, source: SocketAddr) {
        (**self).on_command(body, source)
    }

    fn on_message(&self, body: Bytes, source: SocketAddr) {
        (**self).on_message(body, source)
    }

    fn on_send_succeeded(&self, handle: TransactionId, destination: SocketAddr) {
        (**self).on_send_succeeded(handle, destination)
    }

    fn on_send_timed_out(&self, handle: TransactionId, destination: SocketAddr) {
        (**self).on_send_timed_out(handle, destination)
    }
}

/// 프로토콜 디스패처
pub struct Dispatcher<T: Transport, D: Delegate> {
    local_addr: SocketAddr,
    transport: T,
    delegate: D,
    departures: DeparturePool,
    arrivals: ArrivalPool,
    stats: RwLock<ProtocolStats>,
}

impl<T: Transport, D: Delegate> Dispatcher<T, D> {
    pub fn new(config: &Config, local_addr: SocketAddr, transport: T, delegate: D) -> Result<Self> {
        config.validate()?;
        Ok(Self {
            local_addr,
            transport,
            delegate,
            departures: DeparturePool::new(config),
            arrivals: ArrivalPool::new(config),
            stats: RwLock::new(ProtocolStats::new()),
        })
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.local_addr
    }

    /// 명령 전송 (ACK 추적)
    pub fn send_command(&self, body: Bytes, destination: SocketAddr) -> Result<TransactionId> {
        self.submit(DataType::Command, body, destination)
    }

    /// 메시지 전송 (필요하면 분할, ACK 추적)
    pub fn send_message(&self, body: Bytes, destination: SocketAddr) -> Result<TransactionId> {
        self.submit(DataType::Message, body, destination)
    }

    /// PING 전송, PONG 이 오면 송신 완료
    pub fn ping(&self, destination: SocketAddr) -> Result<TransactionId> {
        self.send_command(Control::Ping.body(), destination)
    }

    /// NOOP 전송 (추적하지 않음)
    pub fn send_noop(&self, destination: SocketAddr) -> Result<()> {
        let package = Package::single(DataType::Command, TransactionId::ZERO, Control::Noop.body())?;
        self.transmit(&package, destination);
        Ok(())
    }

    fn submit(&self, data_type: DataType, body: Bytes, destination: SocketAddr) -> Result<TransactionId> {
        let transaction_id = TransactionId::generate();
        let package = Package::single(data_type, transaction_id, body)?;
        let departure = self
            .departures
            .submit(package, self.local_addr, destination, Instant::now())?;

        for frame in departure.frames() {
            self.transmit(frame, destination);
        }
        Ok(transaction_id)
    }

    /// 프레임 전송, 실패해도 송신은 재전송 대상으로 남음
    fn transmit(&self, package: &Package, destination: SocketAddr) -> bool {
        let bytes = package.to_bytes();
        trace!(
            "-> {} {:?} {} [{}/{}] {} bytes",
            destination,
            package.data_type(),
            package.transaction_id(),
            package.index(),
            package.pages(),
            bytes.len()
        );

        match self.transport.send(&bytes, destination) {
            Ok(sent) => {
                let mut stats = self.stats.write();
                stats.frames_sent += 1;
                stats.bytes_sent += sent as u64;
                true
            }
            Err(e) => {
                warn!("프레임 전송 실패 -> {}: {}", destination, e);
                self.stats.write().send_errors += 1;
                false
            }
        }
    }

    fn respond(&self, request: &Package, body: Bytes, destination: SocketAddr) {
        let response = request.data_type().response();
        match Package::single(response, request.transaction_id(), body) {
            Ok(package) => {
                self.transmit(&package, destination);
            }
            Err(e) => warn!("응답 생성 실패: {}", e),
        }
    }

    /// 받은 datagram 처리
    pub fn on_receive(&self, data: &[u8], source: SocketAddr) {
        self.on_receive_at(data, source, Instant::now());
    }

    /// 받은 datagram 처리 (시각 지정)
    pub fn on_receive_at(&self, data: &[u8], source: SocketAddr, now: Instant) {
        {
            let mut stats = self.stats.write();
            stats.frames_received += 1;
            stats.bytes_received += data.len() as u64;
        }

        let package = match Package::parse(data) {
            Ok(package) => package,
            Err(e) => {
                // UDP 는 송신자에게 알릴 방법이 없으므로 조용히 버림
                debug!("형식 오류 프레임 버림 <- {}: {}", source, e);
                self.stats.write().malformed_frames += 1;
                return;
            }
        };

        trace!(
            "<- {} {:?} {} [{}/{}] {} bytes",
            source,
            package.data_type(),
            package.transaction_id(),
            package.index(),
            package.pages(),
            package.body.len()
        );

        let control = Control::parse(&package.body);
        if control == Some(Control::Noop) {
            return;
        }

        match package.data_type() {
            DataType::Command => {
                if control == Some(Control::Ping) {
                    self.respond(&package, Control::Pong.body(), source);
                } else {
                    self.respond(&package, Control::Ok.body(), source);
                    self.stats.write().commands_delivered += 1;
                    self.delegate.on_command(package.body, source);
                }
            }

            DataType::CommandResponse => {
                self.acknowledge(package.transaction_id(), 0, source, now);
                if !matches!(control, Some(Control::Pong) | Some(Control::Ok)) {
                    self.stats.write().commands_delivered += 1;
                    self.delegate.on_command(package.body, source);
                }
            }

            DataType::Message => {
                self.respond(&package, Control::Ok.body(), source);
                self.stats.write().messages_delivered += 1;
                self.delegate.on_message(package.body, source);
            }

            DataType::MessageFragment => {
                // 중복이든 늦었든 ACK 는 항상 보냄 (송신측 재전송 중단)
                self.respond(
                    &package,
                    fragment_ack_body(package.pages(), package.index()),
                    source,
                );

                match self.arrivals.accept(&package, source, self.local_addr, now) {
                    AcceptOutcome::Complete(message) => {
                        self.stats.write().messages_delivered += 1;
                        self.delegate.on_message(message.body, source);
                    }
                    AcceptOutcome::Duplicate | AcceptOutcome::Late => {
                        self.stats.write().duplicate_fragments += 1;
                    }
                    AcceptOutcome::Rejected => {
                        debug!(
                            "조립과 맞지 않는 fragment 버림 <- {}: {} [{}/{}]",
                            source,
                            package.transaction_id(),
                            package.index(),
                            package.pages()
                        );
                        self.stats.write().malformed_frames += 1;
                    }
                    AcceptOutcome::Pending { .. } => {}
                }
            }

            DataType::MessageResponse => match MessageReply::parse(&package.body) {
                MessageReply::Ok(position) => {
                    let index = position.map(|p| p.index).unwrap_or(0);
                    self.acknowledge(package.transaction_id(), index, source, now);
                }
                MessageReply::Again(position) => {
                    // 다음 sweep 의 일반 재전송에 맡김
                    debug!(
                        "재전송 요청 수신 <- {}: {} {:?}",
                        source,
                        package.transaction_id(),
                        position
                    );
                }
                MessageReply::Other(_) => {
                    debug!(
                        "알 수 없는 메시지 응답 무시 <- {}: {}",
                        source,
                        package.transaction_id()
                    );
                }
            },
        }
    }

    fn acknowledge(&self, transaction_id: TransactionId, index: u32, source: SocketAddr, now: Instant) {
        match self.departures.acknowledge(transaction_id, index, source, now) {
            AckOutcome::Completed(departure) => {
                self.stats.write().sends_succeeded += 1;
                self.delegate
                    .on_send_succeeded(departure.transaction_id, departure.destination);
            }
            AckOutcome::Partial { remaining } => {
                trace!("부분 확인: {} ({} frames 남음)", transaction_id, remaining);
            }
            AckOutcome::Duplicate | AckOutcome::Unknown => {}
        }
    }

    /// 주기적 처리: 만료된 송신 재전송/실패 처리, 정체된 조립 폐기
    pub fn tick(&self, now: Instant) {
        while let Some(outcome) = self.departures.sweep(now) {
            match outcome {
                SweepOutcome::Resend(departure) => {
                    if !self.transport.is_reachable(departure.destination) {
                        trace!("도달 불가, 재전송 건너뜀: {}", departure.destination);
                        continue;
                    }
                    for frame in departure.frames() {
                        if self.transmit(frame, departure.destination) {
                            self.stats.write().frames_retransmitted += 1;
                        }
                    }
                }
                SweepOutcome::Failed(departure) => {
                    self.stats.write().sends_timed_out += 1;
                    self.delegate
                        .on_send_timed_out(departure.transaction_id, departure.destination);
                }
            }
        }

        let discarded = self.arrivals.sweep(now);
        if !discarded.is_empty() {
            self.stats.write().arrivals_discarded += discarded.len() as u64;
        }

        self.departures.purge_finished(now);
        self.arrivals.purge_finished(now);
    }

    /// ACK 대기 중인 송신 수
    pub fn pending_departures(&self) -> usize {
        self.departures.len()
    }

    /// 조립 중인 수신 수
    pub fn pending_arrivals(&self) -> usize {
        self.arrivals.len()
    }

    /// 통계 반환
    pub fn stats(&self) -> ProtocolStats {
        self.stats.read().clone()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::message::FragmentPosition;
    use parking_lot::Mutex;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::time::Duration;

    #[derive(Default)]
    struct RecordingTransport {
        sent: Mutex<Vec<(Bytes, SocketAddr)>>,
        unreachable: AtomicBool,
    }

    impl RecordingTransport {
        fn take(&self) -> Vec<(Bytes, SocketAddr)> {
            std::mem::take(&mut *self.sent.lock())
        }

        fn take_packages(&self) -> Vec<Package> {
            self.take()
                .into_iter()
                .map(|(bytes, _)| Package::parse(&bytes).unwrap())
                .collect()
        }
    }

    impl Transport for RecordingTransport {
        fn send(&self, data: &[u8], destination: SocketAddr) -> io::Result<usize> {
            self.sent.lock().push((Bytes::copy_from_slice(data), destination));
            Ok(data.len())
        }

        fn is_reachable(&self, _destination: SocketAddr) -> bool {
            !self.unreachable.load(Ordering::SeqCst)
        }
    }

    #[derive(Debug, Clone, PartialEq, Eq)]
    enum Event {
        Command(Bytes, SocketAddr),
        Message(Bytes, SocketAddr),
        Succeeded(TransactionId),
        TimedOut(TransactionId),
    }

    #[derive(Default)]
    struct RecordingDelegate {
        events: Mutex<Vec<Event>>,
    }

    impl RecordingDelegate {
        fn take(&self) -> Vec<Event> {
            std::mem::take(&mut *self.events.lock())
        }
    }

    impl Delegate for RecordingDelegate {
        fn on_command(&self, body: Bytes, source: SocketAddr) {
            self.events.lock().push(Event::Command(body, source));
        }

        fn on_message(&self, body: Bytes, source: SocketAddr) {
            self.events.lock().push(Event::Message(body, source));
        }

        fn on_send_succeeded(&self, handle: TransactionId, _destination: SocketAddr) {
            self.events.lock().push(Event::Succeeded(handle));
        }

        fn on_send_timed_out(&self, handle: TransactionId, _destination: SocketAddr) {
            self.events.lock().push(Event::TimedOut(handle));
        }
    }

    struct Peer {
        addr: SocketAddr,
        transport: Arc<RecordingTransport>,
        delegate: Arc<RecordingDelegate>,
        dispatcher: Dispatcher<Arc<RecordingTransport>, Arc<RecordingDelegate>>,
    }

    impl Peer {
        fn new(port: u16) -> Self {
            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            let transport = Arc::new(RecordingTransport::default());
            let delegate = Arc::new(RecordingDelegate::default());
            let dispatcher =
                Dispatcher::new(&Config::default(), addr, transport.clone(), delegate.clone()).unwrap();
            Self {
                addr,
                transport,
                delegate,
                dispatcher,
            }
        }

        /// 이 peer 가 보낸 프레임을 상대에게 전달, 전달한 프레임 수 반환
        fn deliver_to(&self, other: &Peer) -> usize {
            let frames = self.transport.take();
            for (bytes, destination) in &frames {
                assert_eq!(*destination, other.addr);
                other.dispatcher.on_receive(bytes, self.addr);
            }
            frames.len()
        }
    }

    #[test]
    fn test_small_message_scenario() {
        let a = Peer::new(1001);
        let b = Peer::new(1002);

        let handle = a.dispatcher.send_message(Bytes::from_static(b"hello"), b.addr).unwrap();
        let frames = a.transport.take_packages();
        assert_eq!(frames.len(), 1);
        assert_eq!(frames[0].data_type(), DataType::Message);
        assert_eq!(frames[0].transaction_id(), handle);

        b.dispatcher.on_receive(&frames[0].to_bytes(), a.addr);
        assert_eq!(
            b.delegate.take(),
            vec![Event::Message(Bytes::from_static(b"hello"), a.addr)]
        );

        let replies = b.transport.take_packages();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].data_type(), DataType::MessageResponse);
        assert_eq!(&replies[0].body[..], b"OK");
        assert_eq!(replies[0].transaction_id(), handle);

        a.dispatcher.on_receive(&replies[0].to_bytes(), b.addr);
        assert_eq!(a.dispatcher.pending_departures(), 0);
        assert_eq!(a.delegate.take(), vec![Event::Succeeded(handle)]);
    }

    #[test]
    fn test_large_message_scenario() {
        let a = Peer::new(1011);
        let b = Peer::new(1012);
        let data: Vec<u8> = (0..1500u32).map(|i| (i % 253) as u8).collect();

        let handle = a.dispatcher.send_message(Bytes::from(data.clone()), b.addr).unwrap();
        let fragments = a.transport.take_packages();
        assert_eq!(fragments.len(), 3);
        for (i, fragment) in fragments.iter().enumerate() {
            assert_eq!(fragment.data_type(), DataType::MessageFragment);
            assert_eq!(fragment.pages(), 3);
            assert_eq!(fragment.index(), i as u32);
            assert_eq!(fragment.transaction_id(), handle);
        }

        // 순서를 섞어서 전달
        for i in [2usize, 0, 1] {
            b.dispatcher.on_receive(&fragments[i].to_bytes(), a.addr);
        }
        // 중복 fragment 는 다시 전달되지 않음
        b.dispatcher.on_receive(&fragments[1].to_bytes(), a.addr);

        let delivered = b.delegate.take();
        assert_eq!(delivered, vec![Event::Message(Bytes::from(data), a.addr)]);

        let acks = b.transport.take_packages();
        assert_eq!(acks.len(), 4);
        let positions: Vec<MessageReply> = acks.iter().map(|ack| MessageReply::parse(&ack.body)).collect();
        assert_eq!(positions[0], MessageReply::Ok(Some(FragmentPosition { pages: 3, index: 2 })));
        assert!(acks.iter().all(|ack| ack.body.len() == 10));

        for ack in &acks {
            a.dispatcher.on_receive(&ack.to_bytes(), b.addr);
        }
        assert_eq!(a.dispatcher.pending_departures(), 0);
        assert_eq!(a.delegate.take(), vec![Event::Succeeded(handle)]);
        assert_eq!(b.dispatcher.stats().duplicate_fragments, 1);
    }

    #[test]
    fn test_ping_pong() {
        let a = Peer::new(1021);
        let b = Peer::new(1022);

        let handle = a.dispatcher.ping(b.addr).unwrap();
        assert_eq!(a.deliver_to(&b), 1);
        assert!(b.delegate.take().is_empty());

        let replies = b.transport.take_packages();
        assert_eq!(replies.len(), 1);
        assert_eq!(replies[0].data_type(), DataType::CommandResponse);
        assert_eq!(&replies[0].body[..], b"PONG");

        a.dispatcher.on_receive(&replies[0].to_bytes(), b.addr);
        assert_eq!(a.delegate.take(), vec![Event::Succeeded(handle)]);
        assert!(a.delegate.take().is_empty());
    }

    #[test]
    fn test_command_delivered_and_acknowledged() {
        let a = Peer::new(1031);
        let b = Peer::new(1032);

        let handle = a.dispatcher.send_command(Bytes::from_static(b"login"), b.addr).unwrap();
        a.deliver_to(&b);
        assert_eq!(
            b.delegate.take(),
            vec![Event::Command(Bytes::from_static(b"login"), a.addr)]
        );

        b.deliver_to(&a);
        assert_eq!(a.delegate.take(), vec![Event::Succeeded(handle)]);
    }

    #[test]
    fn test_unexpected_command_response_is_delivered() {
        let a = Peer::new(1041);
        let b = Peer::new(1042);

        let handle = a.dispatcher.send_command(Bytes::from_static(b"whoami"), b.addr).unwrap();
        a.transport.take();

        let reply = Package::single(DataType::CommandResponse, handle, Bytes::from_static(b"alice")).unwrap();
        a.dispatcher.on_receive(&reply.to_bytes(), b.addr);
        assert_eq!(
            a.delegate.take(),
            vec![
                Event::Succeeded(handle),
                Event::Command(Bytes::from_static(b"alice"), b.addr)
            ]
        );
    }

    #[test]
    fn test_noop_ignored() {
        let a = Peer::new(1051);
        let b = Peer::new(1052);

        a.dispatcher.send_noop(b.addr).unwrap();
        assert_eq!(a.dispatcher.pending_departures(), 0);
        assert_eq!(a.deliver_to(&b), 1);
        assert!(b.delegate.take().is_empty());
        assert!(b.transport.take().is_empty());
    }

    #[test]
    fn test_malformed_frame_dropped() {
        let b = Peer::new(1062);
        let source = SocketAddr::from(([127, 0, 0, 1], 9));

        b.dispatcher.on_receive(b"garbage", source);
        b.dispatcher.on_receive(b"DIM\x00", source);
        b.dispatcher.on_receive(b"DI", source);

        assert!(b.delegate.take().is_empty());
        assert!(b.transport.take().is_empty());
        assert_eq!(b.dispatcher.stats().malformed_frames, 3);
    }

    #[test]
    fn test_again_leaves_departure_pending() {
        let a = Peer::new(1071);
        let b = Peer::new(1072);

        let handle = a.dispatcher.send_message(Bytes::from_static(b"hello"), b.addr).unwrap();
        a.transport.take();

        let again = Package::single(DataType::MessageResponse, handle, Control::Again.body()).unwrap();
        a.dispatcher.on_receive(&again.to_bytes(), b.addr);
        assert_eq!(a.dispatcher.pending_departures(), 1);
        assert!(a.delegate.take().is_empty());
        assert!(a.transport.take().is_empty());
    }

    #[test]
    fn test_partial_ack_then_retransmit_missing_only() {
        let a = Peer::new(1081);
        let b = Peer::new(1082);
        let start = Instant::now();

        a.dispatcher.send_message(Bytes::from(vec![5u8; 1500]), b.addr).unwrap();
        let fragments = a.transport.take_packages();

        // fragment 1 만 도착
        b.dispatcher.on_receive(&fragments[1].to_bytes(), a.addr);
        b.deliver_to(&a);

        a.dispatcher.tick(start + Duration::from_secs(121));
        let resent = a.transport.take_packages();
        let indexes: Vec<u32> = resent.iter().map(|f| f.index()).collect();
        assert_eq!(indexes, vec![0, 2]);
        assert_eq!(a.dispatcher.stats().frames_retransmitted, 2);
    }

    #[test]
    fn test_retry_exhaustion_reports_timeout() {
        let a = Peer::new(1091);
        let nowhere = SocketAddr::from(([127, 0, 0, 1], 1099));
        let config = Config::default();
        let start = Instant::now();

        let handle = a.dispatcher.send_message(Bytes::from_static(b"lost"), nowhere).unwrap();
        let mut now = start;
        for _ in 0..10 {
            now += config.retry_timeout() + Duration::from_secs(1);
            a.dispatcher.tick(now);
        }

        assert_eq!(a.transport.take().len(), config.total_transmissions() as usize);
        assert_eq!(a.delegate.take(), vec![Event::TimedOut(handle)]);
        assert_eq!(a.dispatcher.pending_departures(), 0);
        assert_eq!(a.dispatcher.stats().sends_timed_out, 1);
    }

    #[test]
    fn test_unreachable_destination_consumes_budget() {
        let a = Peer::new(1101);
        let b = Peer::new(1102);
        let config = Config::default();
        let start = Instant::now();

        let handle = a.dispatcher.send_message(Bytes::from_static(b"hi"), b.addr).unwrap();
        a.transport.take();
        a.transport.unreachable.store(true, Ordering::SeqCst);

        let mut now = start;
        for _ in 0..config.total_transmissions() {
            now += config.retry_timeout() + Duration::from_secs(1);
            a.dispatcher.tick(now);
        }
        assert!(a.transport.take().is_empty());
        assert_eq!(a.delegate.take(), vec![Event::TimedOut(handle)]);
    }

    #[test]
    fn test_stalled_fragment_set_scenario() {
        let a = Peer::new(1111);
        let b = Peer::new(1112);
        let start = Instant::now();

        a.dispatcher.send_message(Bytes::from(vec![3u8; 1500]), b.addr).unwrap();
        let fragments = a.transport.take_packages();

        b.dispatcher.on_receive(&fragments[0].to_bytes(), a.addr);
        assert_eq!(b.dispatcher.pending_arrivals(), 1);

        b.dispatcher.tick(start + Duration::from_secs(121));
        assert_eq!(b.dispatcher.pending_arrivals(), 0);
        assert_eq!(b.dispatcher.stats().arrivals_discarded, 1);

        // 늦은 fragment 는 새 조립을 시작하지 않지만 ACK 는 보냄
        b.transport.take();
        b.dispatcher.on_receive(&fragments[1].to_bytes(), a.addr);
        assert_eq!(b.dispatcher.pending_arrivals(), 0);
        assert!(b.delegate.take().is_empty());
        assert_eq!(b.transport.take().len(), 1);
    }
}
