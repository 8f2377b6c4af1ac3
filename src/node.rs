//! UDP 노드
//!
//! tokio `UdpSocket` 위에서 `Dispatcher` 를 구동한다.
//! - 수신 태스크: datagram 을 디스패처로 전달
//! - tick 태스크: 주기적으로 pool sweep
//! - 송신 태스크: 송신 큐를 비우며 소켓으로 전송
//!
//! 애플리케이션 콜백은 `NodeEvent` 로 채널을 통해 전달된다.

use std::io;
use std::net::SocketAddr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::{Duration, Instant};

use bytes::Bytes;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{info, warn};

use crate::dispatcher::{Delegate, Dispatcher, Transport};
use crate::stats::ProtocolStats;
use crate::transaction::TransactionId;
use crate::{Config, Result};

/// 애플리케이션 이벤트
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeEvent {
    Command { body: Bytes, source: SocketAddr },
    Message { body: Bytes, source: SocketAddr },
    SendSucceeded { handle: TransactionId, destination: SocketAddr },
    SendTimedOut { handle: TransactionId, destination: SocketAddr },
}

/// 이벤트 채널 수신기 타입
pub type EventReceiver = mpsc::Receiver<NodeEvent>;

/// 송신 큐에 프레임을 넣는 transport
struct QueueTransport {
    tx: mpsc::Sender<(Bytes, SocketAddr)>,
}

impl Transport for QueueTransport {
    fn send(&self, data: &[u8], destination: SocketAddr) -> io::Result<usize> {
        self.tx
            .try_send((Bytes::copy_from_slice(data), destination))
            .map_err(|e| match e {
                mpsc::error::TrySendError::Full(_) => {
                    io::Error::new(io::ErrorKind::WouldBlock, "송신 큐가 가득 참")
                }
                mpsc::error::TrySendError::Closed(_) => {
                    io::Error::new(io::ErrorKind::BrokenPipe, "송신 큐 닫힘")
                }
            })?;
        Ok(data.len())
    }
}

/// 콜백을 이벤트 채널로 보내는 delegate
struct ChannelDelegate {
    tx: mpsc::Sender<NodeEvent>,
}

impl ChannelDelegate {
    fn emit(&self, event: NodeEvent) {
        if let Err(e) = self.tx.try_send(event) {
            warn!("이벤트 전달 실패: {}", e);
        }
    }
}

impl Delegate for ChannelDelegate {
    fn on_command(&self, body: Bytes, source: SocketAddr) {
        self.emit(NodeEvent::Command { body, source });
    }

    fn on_message(&self, body: Bytes, source: SocketAddr) {
        self.emit(NodeEvent::Message { body, source });
    }

    fn on_send_succeeded(&self, handle: TransactionId, destination: SocketAddr) {
        self.emit(NodeEvent::SendSucceeded { handle, destination });
    }

    fn on_send_timed_out(&self, handle: TransactionId, destination: SocketAddr) {
        self.emit(NodeEvent::SendTimedOut { handle, destination });
    }
}

type NodeDispatcher = Dispatcher<QueueTransport, ChannelDelegate>;

/// UDP 노드 핸들
pub struct Node {
    dispatcher: Arc<NodeDispatcher>,
    running: Arc<AtomicBool>,
    tasks: Vec<JoinHandle<()>>,
}

impl Node {
    /// 소켓 바인딩 후 수신/tick/송신 태스크 시작
    pub async fn bind(config: Config, bind_addr: SocketAddr) -> Result<(Self, EventReceiver)> {
        config.validate()?;

        let socket = Arc::new(UdpSocket::bind(bind_addr).await?);
        let local_addr = socket.local_addr()?;

        let (send_tx, mut send_rx) = mpsc::channel::<(Bytes, SocketAddr)>(config.send_queue_size);
        let (event_tx, event_rx) = mpsc::channel::<NodeEvent>(config.event_queue_size);

        let dispatcher = Arc::new(Dispatcher::new(
            &config,
            local_addr,
            QueueTransport { tx: send_tx },
            ChannelDelegate { tx: event_tx },
        )?);
        let running = Arc::new(AtomicBool::new(true));

        info!("DMTP node started on {}", local_addr);

        // 송신 태스크
        let send_socket = socket.clone();
        let send_task = tokio::spawn(async move {
            while let Some((bytes, addr)) = send_rx.recv().await {
                if let Err(e) = send_socket.send_to(&bytes, addr).await {
                    warn!("송신 에러 -> {}: {}", addr, e);
                }
            }
        });

        // 수신 태스크
        let recv_socket = socket.clone();
        let recv_dispatcher = dispatcher.clone();
        let recv_running = running.clone();
        let recv_buffer_size = config.recv_buffer_size;
        let recv_task = tokio::spawn(async move {
            let mut buf = vec![0u8; recv_buffer_size];

            while recv_running.load(Ordering::SeqCst) {
                match tokio::time::timeout(Duration::from_millis(100), recv_socket.recv_from(&mut buf)).await {
                    Ok(Ok((len, addr))) => {
                        recv_dispatcher.on_receive(&buf[..len], addr);
                    }
                    Ok(Err(e)) => {
                        warn!("수신 에러: {}", e);
                    }
                    Err(_) => {
                        // 타임아웃, 계속
                    }
                }
            }
        });

        // tick 태스크
        let tick_dispatcher = dispatcher.clone();
        let tick_running = running.clone();
        let tick_interval = config.tick_interval();
        let tick_task = tokio::spawn(async move {
            let mut interval = tokio::time::interval(tick_interval);
            while tick_running.load(Ordering::SeqCst) {
                interval.tick().await;
                tick_dispatcher.tick(Instant::now());
            }
        });

        let node = Self {
            dispatcher,
            running,
            tasks: vec![send_task, recv_task, tick_task],
        };

        Ok((node, event_rx))
    }

    pub fn local_addr(&self) -> SocketAddr {
        self.dispatcher.local_addr()
    }

    pub fn send_command(&self, body: Bytes, destination: SocketAddr) -> Result<TransactionId> {
        self.dispatcher.send_command(body, destination)
    }

    pub fn send_message(&self, body: Bytes, destination: SocketAddr) -> Result<TransactionId> {
        self.dispatcher.send_message(body, destination)
    }

    pub fn ping(&self, destination: SocketAddr) -> Result<TransactionId> {
        self.dispatcher.ping(destination)
    }

    pub fn send_noop(&self, destination: SocketAddr) -> Result<()> {
        self.dispatcher.send_noop(destination)
    }

    pub fn pending_departures(&self) -> usize {
        self.dispatcher.pending_departures()
    }

    pub fn pending_arrivals(&self) -> usize {
        self.dispatcher.pending_arrivals()
    }

    /// 통계 반환
    pub fn stats(&self) -> ProtocolStats {
        self.dispatcher.stats()
    }

    /// 실행 중 여부
    pub fn is_running(&self) -> bool {
        self.running.load(Ordering::SeqCst)
    }

    /// 정지
    pub fn stop(&self) {
        self.running.store(false, Ordering::SeqCst);
        for task in &self.tasks {
            task.abort();
        }
    }
}

impl Drop for Node {
    fn drop(&mut self) {
        self.stop();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn next_event(rx: &mut EventReceiver) -> NodeEvent {
        tokio::time::timeout(Duration::from_secs(5), rx.recv())
            .await
            .expect("이벤트 대기 시간 초과")
            .expect("이벤트 채널 닫힘")
    }

    fn localhost() -> SocketAddr {
        SocketAddr::from(([127, 0, 0, 1], 0))
    }

    #[tokio::test]
    async fn test_message_over_udp() {
        let (a, mut a_events) = Node::bind(Config::low_latency(), localhost()).await.unwrap();
        let (b, mut b_events) = Node::bind(Config::low_latency(), localhost()).await.unwrap();

        let data: Vec<u8> = (0..5000u32).map(|i| (i % 256) as u8).collect();
        let handle = a.send_message(Bytes::from(data.clone()), b.local_addr()).unwrap();

        assert_eq!(
            next_event(&mut b_events).await,
            NodeEvent::Message {
                body: Bytes::from(data),
                source: a.local_addr()
            }
        );
        assert_eq!(
            next_event(&mut a_events).await,
            NodeEvent::SendSucceeded {
                handle,
                destination: b.local_addr()
            }
        );
        assert_eq!(a.pending_departures(), 0);
        assert_eq!(b.pending_arrivals(), 0);
    }

    #[tokio::test]
    async fn test_ping_over_udp() {
        let (a, mut a_events) = Node::bind(Config::low_latency(), localhost()).await.unwrap();
        let (b, _b_events) = Node::bind(Config::low_latency(), localhost()).await.unwrap();

        let handle = a.ping(b.local_addr()).unwrap();
        assert_eq!(
            next_event(&mut a_events).await,
            NodeEvent::SendSucceeded {
                handle,
                destination: b.local_addr()
            }
        );
        assert_eq!(b.stats().commands_delivered, 0);
    }
}
