//! DMTP 서버 - 받은 메시지/명령을 출력하고 메시지는 되돌려 보냄
//!
//! 사용법:
//!   cargo run --release --bin dmtp-server -- [OPTIONS]
//!
//! 예시:
//!   cargo run --release --bin dmtp-server -- --bind 0.0.0.0:9394
//!   RUST_LOG=dmtp=debug cargo run --bin dmtp-server -- --no-echo

use std::net::SocketAddr;

use tracing::{debug, info, warn};
use tracing_subscriber::{EnvFilter, FmtSubscriber};

use dmtp::{Config, Node, NodeEvent};

/// 서버 설정
struct ServerConfig {
    bind_addr: SocketAddr,
    echo: bool,
    config: Config,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            bind_addr: SocketAddr::from(([0, 0, 0, 0], 9394)),
            echo: true,
            config: Config::default(),
        }
    }
}

fn parse_args() -> ServerConfig {
    let args: Vec<String> = std::env::args().collect();
    let mut config = ServerConfig::default();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--bind" | "-b" => {
                if i + 1 < args.len() {
                    config.bind_addr = args[i + 1].parse().expect("유효한 주소 필요");
                    i += 1;
                }
            }
            "--fragment-size" => {
                if i + 1 < args.len() {
                    config.config.max_fragment_body_size = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--retry" => {
                if i + 1 < args.len() {
                    config.config.retry_budget = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--retry-timeout" => {
                if i + 1 < args.len() {
                    config.config.retry_timeout_ms = args[i + 1].parse().expect("유효한 숫자 필요");
                    i += 1;
                }
            }
            "--low-latency" => {
                config.config = Config::low_latency();
            }
            "--unstable" => {
                config.config = Config::unstable_network();
            }
            "--no-echo" => {
                config.echo = false;
            }
            "--help" | "-h" => {
                println!(
                    r#"DMTP Server - 받은 메시지를 출력하고 되돌려 보냄

사용법:
  cargo run --release --bin dmtp-server -- [OPTIONS]

옵션:
  -b, --bind <ADDR>          바인드 주소 (기본: 0.0.0.0:9394)
  --fragment-size <SIZE>     fragment body 크기 바이트 (기본: 512)
  --retry <N>                추가 재전송 횟수 (기본: 3)
  --retry-timeout <MS>       재전송 대기 시간 밀리초 (기본: 120000)
  --low-latency              저지연 프리셋 사용
  --unstable                 불안정 네트워크 프리셋 사용
  --no-echo                  메시지를 되돌려 보내지 않음
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

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 로깅 설정
    let subscriber = FmtSubscriber::builder()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .finish();
    tracing::subscriber::set_global_default(subscriber)?;

    let server_config = parse_args();

    info!("DMTP Server starting...");
    info!("Fragment size: {} bytes", server_config.config.max_fragment_body_size);
    info!(
        "Retry: {} x {}ms",
        server_config.config.retry_budget, server_config.config.retry_timeout_ms
    );

    let (node, mut events) = Node::bind(server_config.config.clone(), server_config.bind_addr).await?;
    info!("Server listening on {}", node.local_addr());

    loop {
        tokio::select! {
            event = events.recv() => {
                let Some(event) = event else { break };
                match event {
                    NodeEvent::Message { body, source } => {
                        info!("메시지 수신 <- {}: {} bytes", source, body.len());
                        if server_config.echo {
                            if let Err(e) = node.send_message(body, source) {
                                warn!("응답 전송 실패 -> {}: {}", source, e);
                            }
                        }
                    }
                    NodeEvent::Command { body, source } => {
                        info!("명령 수신 <- {}: {:?}", source, String::from_utf8_lossy(&body));
                    }
                    NodeEvent::SendSucceeded { handle, destination } => {
                        debug!("전송 완료 -> {}: {}", destination, handle);
                    }
                    NodeEvent::SendTimedOut { handle, destination } => {
                        warn!("전송 시간 초과 -> {}: {}", destination, handle);
                    }
                }
            }
            _ = tokio::signal::ctrl_c() => {
                info!("Shutting down...");
                break;
            }
        }
    }

    node.stop();
    info!("{}", node.stats().summary());
    Ok(())
}
