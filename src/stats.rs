//! 프로토콜 통계

use std::time::{Duration, Instant};

/// 송수신 통계
#[derive(Debug, Clone)]
pub struct ProtocolStats {
    /// 시작 시간
    pub start_time: Instant,

    /// 전송한 프레임 수 (응답/재전송 포함)
    pub frames_sent: u64,

    /// 재전송한 프레임 수
    pub frames_retransmitted: u64,

    /// 전송 실패한 프레임 수 (transport 에러)
    pub send_errors: u64,

    /// 받은 프레임 수
    pub frames_received: u64,

    /// 형식 오류로 버린 프레임 수
    pub malformed_frames: u64,

    /// 중복/늦은 fragment 수
    pub duplicate_fragments: u64,

    /// 애플리케이션에 전달한 명령 수
    pub commands_delivered: u64,

    /// 애플리케이션에 전달한 메시지 수
    pub messages_delivered: u64,

    /// ACK 로 완료된 송신 수
    pub sends_succeeded: u64,

    /// 재시도 소진으로 실패한 송신 수
    pub sends_timed_out: u64,

    /// 조립을 포기한 arrival 수
    pub arrivals_discarded: u64,

    /// 총 송신 바이트
    pub bytes_sent: u64,

    /// 총 수신 바이트
    pub bytes_received: u64,
}

impl ProtocolStats {
    pub fn new() -> Self {
        Self {
            start_time: Instant::now(),
            frames_sent: 0,
            frames_retransmitted: 0,
            send_errors: 0,
            frames_received: 0,
            malformed_frames: 0,
            duplicate_fragments: 0,
            commands_delivered: 0,
            messages_delivered: 0,
            sends_succeeded: 0,
            sends_timed_out: 0,
            arrivals_discarded: 0,
            bytes_sent: 0,
            bytes_received: 0,
        }
    }

    /// 경과 시간
    pub fn elapsed(&self) -> Duration {
        self.start_time.elapsed()
    }

    /// 재전송 비율
    pub fn retransmit_ratio(&self) -> f64 {
        if self.frames_sent == 0 {
            return 0.0;
        }
        self.frames_retransmitted as f64 / self.frames_sent as f64
    }

    /// 송신 성공률 (완료된 송신 기준)
    pub fn success_rate(&self) -> f64 {
        let total = self.sends_succeeded + self.sends_timed_out;
        if total == 0 {
            return 1.0;
        }
        self.sends_succeeded as f64 / total as f64
    }

    /// 통계 요약 문자열
    pub fn summary(&self) -> String {
        format!(
            "Elapsed: {:.2}s | Frames: {} sent / {} recv | Retransmit: {:.1}% | Sends: {} ok / {} timeout | Delivered: {} msg / {} cmd | Dropped: {} malformed / {} dup",
            self.elapsed().as_secs_f64(),
            self.frames_sent,
            self.frames_received,
            self.retransmit_ratio() * 100.0,
            self.sends_succeeded,
            self.sends_timed_out,
            self.messages_delivered,
            self.commands_delivered,
            self.malformed_frames,
            self.duplicate_fragments,
        )
    }
}

impl Default for ProtocolStats {
    fn default() -> Self {
        Self::new()
    }
}
