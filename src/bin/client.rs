//! DMTP 클라이언트 - 메시지나 파일을 보내고 결과를 기다림
//!
//! 사용법:
//!   cargo run --release --bin dmtp-client -- --server <ADDR> [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin dmtp-client -- -s 127.0.0.1:9394 -m "hello"
//!   cargo run --release --bin dmtp-client -- -s 127.0.0.1:9394 -f data.bin --ping

use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

use bytes::Bytes;
use tracing::{error, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dmtp::{Config, Node, NodeEvent, TransactionId};

/// 클라이언트 설정
struct ClientConfig {
    server_addr: SocketAddr,
    bind_addr: SocketAddr,
    message: Option<String>,
    file_path: Option<PathBuf>,
    size: usize,
    ping: bool,
    config: Config,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            server_addr: SocketAddr::from(([127, 0, 0, 1], 9394)),
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 0)),
            message: None,
            file_path: None,
            size: 0,
            ping: false,
            config: Config::default(),
        }
    }
}

fn parse_args() -> ClientConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ClientConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--server" | "-s" => {
                if i + 1 < args.len() {
                    config.server_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--message" | "-m" => {
                if i + 1 < args.len() {
                    config.message = Some(args[i + 1].clone());
                    i += 1;
                }
            }
            "--file" | "-f" => {
                if i + 1 < args.len() {
                    config.file_path = Some(PathBuf::from(&args[i + 1]));
                    i += 1;
                }
            }
            "--size" => {
                if i + 1 < args.len() {
                    config.size = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--fragment-size" => {
                if i + 1 < args.len() {
                    config.config.max_fragment_body_size = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--ping" | "-p" => {
                config.ping = true;
            }
            "--low-latency" => {
                config.config = Config::low_latency();
            }
            "--unstable" => {
                config.config = Config::unstable_network();
            }
            "--help" | "-h" => {
                println!(
                    r#"DMTP Client - 메시지를 보내고 ACK 를 기다림

사용법:
  cargo run --release --bin dmtp-client -- --server <ADDR> [OPTIONS]

옵션:
  -s, --server <ADDR>        서버 주소 (기본: 127.0.0.1:9394)
  -b, --bind <ADDR>          로컬 바인드 주소 (기본: 0.0.0.0:0)
  -m, --message <TEXT>       보낼 텍스트
  -f, --file <PATH>          보낼 파일
  --size <N>                 N 바이트 테스트 데이터 전송
  --fragment-size <SIZE>     fragment body 크기 바이트 (기본: 512)
  -p, --ping                 먼저 PING 전송
  --low-latency              저지연 프리셋 사용
  --unstable                 불안정 네트워크 프리셋 사용
  -h, --help                 이 도움말 출력
"#
                );
                std::process::exit(0);
            }
            _ => {}
        }
        i += 1;
    }

    config
}

/// 핸들의 결과를 기다림 (true = ACK 수신)
async fn wait_for(
    events: &mut dmtp::node::EventReceiver,
    handle: TransactionId,
    echo: &mut Option<Bytes>,
) -> bool {
    while let Some(event) = events.recv().await {
        match event {
            NodeEvent::SendSucceeded { handle: done, .. } if done == handle => return true,
            NodeEvent::SendTimedOut { handle: done, .. } if done == handle => return false,
            NodeEvent::Message { body, source } => {
                info!("메시지 수신 <- {}: {} bytes", source, body.len());
                *echo = Some(body);
            }
            NodeEvent::Command { body, source } => {
                info!("명령 수신 <- {}: {:?}", source, String::from_utf8_lossy(&body));
            }
            _ => {}
        }
    }
    false
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let client_config = parse_args();
    let config = client_config.config.clone();

    // 전송할 데이터 준비
    let data = if let Some(path) = &client_config.file_path {
        info!("Loading file: {:?}", path);
        Bytes::from(std::fs::read(path)?)
    } else if let Some(message) = &client_config.message {
        Bytes::from(message.clone().into_bytes())
    } else if client_config.size > 0 {
        info!("Using test data ({} bytes)", client_config.size);
        Bytes::from((0..client_config.size).map(|i| (i % 251) as u8).collect::<Vec<u8>>())
    } else {
        Bytes::from_static(b"hello")
    };

    let (node, mut events) = Node::bind(config.clone(), client_config.bind_addr).await?;
    info!("Client bound on {}, server: {}", node.local_addr(), client_config.server_addr);

    // 재시도를 모두 소진할 때까지 + 여유
    let deadline = config.retry_timeout() * config.total_transmissions() + Duration::from_secs(5);
    let mut echo = None;

    if client_config.ping {
        let handle = node.ping(client_config.server_addr)?;
        match tokio::time::timeout(deadline, wait_for(&mut events, handle, &mut echo)).await {
            Ok(true) => info!("PONG 수신"),
            _ => error!("PING 응답 없음"),
        }
    }

    info!("Sending {} bytes...", data.len());
    let start = std::time::Instant::now();
    let handle = node.send_message(data.clone(), client_config.server_addr)?;

    match tokio::time::timeout(deadline, wait_for(&mut events, handle, &mut echo)).await {
        Ok(true) => {
            info!(
                "전송 완료: {} ({:.2}ms)",
                handle,
                start.elapsed().as_secs_f64() * 1000.0
            );

            // 에코 대기 (짧게)
            if echo.is_none() {
                if let Ok(Some(NodeEvent::Message { body, .. })) =
                    tokio::time::timeout(Duration::from_secs(2), events.recv()).await
                {
                    echo = Some(body);
                }
            }
            match echo {
                Some(body) if body == data => info!("에코 일치: {} bytes", body.len()),
                Some(body) => warn!("에코 불일치: {} bytes", body.len()),
                None => info!("에코 없음"),
            }
        }
        _ => error!("전송 실패 (재시도 소진): {}", handle),
    }

    node.stop();
    info!("{}", node.stats().summary());
    Ok(())
}
