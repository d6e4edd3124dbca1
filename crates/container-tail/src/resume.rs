//! 로그 재개 정책
//!
//! Docker의 로그 API는 컨테이너가 멈췄다가 다시 시작되면 끊긴 지점부터 정확히
//! 이어 주지 못합니다. `since` 필터는 초 단위이고 start 이벤트와 첫 로그 줄의
//! 순서도 보장하지 않으므로, 재시작 경계에서 몇 줄이 중복될 수 있습니다.
//!
//! - 최초 시작 (또는 부트스트랩 attach): 마지막 N줄 + follow
//! - 재시작: `이벤트 시각 - 1초` 이후 (초 단위 절삭) + follow

use std::time::{Duration, SystemTime, UNIX_EPOCH};

/// 로그 스트림 요청 옵션
///
/// stdout/stderr는 항상 둘 다 요청하며, follow는 항상 켜져 있습니다.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LogStreamOptions {
    /// 과거 로그 중 마지막 몇 줄을 받을지
    pub tail: Option<usize>,
    /// 이 unix 시각(초) 이후 로그만 받음
    pub since: Option<i64>,
    /// 새 로그를 계속 따라갈지
    pub follow: bool,
}

impl LogStreamOptions {
    /// 마지막 `lines`줄과 이후 로그를 요청합니다.
    pub fn backlog(lines: usize) -> Self {
        Self {
            tail: Some(lines),
            since: None,
            follow: true,
        }
    }

    /// `since`(unix 초) 이후 로그를 요청합니다.
    pub fn since(unix_secs: i64) -> Self {
        Self {
            tail: None,
            since: Some(unix_secs),
            follow: true,
        }
    }
}

/// 이번 시작에 적용할 스트림 옵션을 고릅니다.
///
/// `resume`이 참이면 이전에 스트리밍하던 컨테이너가 다시 시작된 경우입니다.
pub fn resume_options(resume: bool, event_time: SystemTime, backlog_lines: usize) -> LogStreamOptions {
    if resume {
        LogStreamOptions::since(since_secs(event_time))
    } else {
        LogStreamOptions::backlog(backlog_lines)
    }
}

/// `event_time - 1초`를 unix 초로 절삭합니다.
fn since_secs(event_time: SystemTime) -> i64 {
    let shifted = event_time
        .checked_sub(Duration::from_secs(1))
        .unwrap_or(UNIX_EPOCH);
    match shifted.duration_since(UNIX_EPOCH) {
        Ok(elapsed) => i64::try_from(elapsed.as_secs()).unwrap_or(i64::MAX),
        // epoch 이전 시각은 런타임이 보내지 않지만, 0으로 고정
        Err(_) => 0,
    }
}
