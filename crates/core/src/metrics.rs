//! 메트릭 상수 및 설명 등록
//!
//! 모든 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 크레이트는 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`
//! 매크로를 호출합니다. 데몬은 익스포터를 설치하지 않으므로, 레코더가 없으면
//! 기록은 no-op입니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `tailpost_`
//! - 접미어: `_total` (counter), 없음 (gauge)

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 라이프사이클 액션 레이블 키 (start, stop, die, other)
pub const LABEL_ACTION: &str = "action";

/// 출력 스트림 레이블 키 (stdout, stderr)
pub const LABEL_STREAM: &str = "stream";

/// 스트림 실패 종류 레이블 키 (open, read)
pub const LABEL_STAGE: &str = "stage";

// ─── Dispatcher 메트릭 ──────────────────────────────────────────────

/// 수신한 컨테이너 라이프사이클 이벤트 수 (counter, label: action)
pub const EVENTS_RECEIVED_TOTAL: &str = "tailpost_events_received_total";

/// 서비스 필터에 걸러진 이벤트 수 (counter)
pub const EVENTS_FILTERED_TOTAL: &str = "tailpost_events_filtered_total";

// ─── Watcher 메트릭 ─────────────────────────────────────────────────

/// 레지스트리에 등록된 watcher 수 (gauge)
pub const WATCHERS_REGISTERED: &str = "tailpost_watchers_registered";

/// 시작된 로그 스트림 수 (counter)
pub const STREAMS_STARTED_TOTAL: &str = "tailpost_streams_started_total";

/// 취소된 로그 스트림 수 (counter)
pub const STREAMS_STOPPED_TOTAL: &str = "tailpost_streams_stopped_total";

/// 실패한 로그 스트림 수 (counter, label: stage)
pub const STREAM_FAILURES_TOTAL: &str = "tailpost_stream_failures_total";

/// 싱크로 전달된 로그 줄 수 (counter, label: stream)
pub const LINES_FORWARDED_TOTAL: &str = "tailpost_lines_forwarded_total";

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더를 설치한 뒤 한 번 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge};

    describe_counter!(
        EVENTS_RECEIVED_TOTAL,
        "Container lifecycle events received from the runtime"
    );
    describe_counter!(
        EVENTS_FILTERED_TOTAL,
        "Lifecycle events discarded by the service filter"
    );
    describe_gauge!(
        WATCHERS_REGISTERED,
        "Number of container watchers in the registry"
    );
    describe_counter!(STREAMS_STARTED_TOTAL, "Log streams started");
    describe_counter!(STREAMS_STOPPED_TOTAL, "Log streams cancelled by a stop");
    describe_counter!(
        STREAM_FAILURES_TOTAL,
        "Log streams that ended with an error (open or read)"
    );
    describe_counter!(
        LINES_FORWARDED_TOTAL,
        "Log lines forwarded to the output sink"
    );
}
