//! 에러 타입 -- 도메인별 에러 정의

/// tailpost 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum TailpostError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 컨테이너 런타임 관련 에러
    #[error("runtime error: {0}")]
    Runtime(#[from] RuntimeError),

    /// 디스패치/감시 태스크 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 컨테이너 런타임 에러
#[derive(Debug, thiserror::Error)]
pub enum RuntimeError {
    /// 런타임 데몬 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 런타임 API 호출 실패
    #[error("api error: {0}")]
    Api(String),

    /// 이벤트 스트림을 더 이상 사용할 수 없음
    #[error("event stream failed: {0}")]
    EventStream(String),

    /// 로그 스트림 열기/읽기 실패
    #[error("log stream failed for container '{container_id}': {reason}")]
    LogStream {
        container_id: String,
        reason: String,
    },
}

/// 디스패치/감시 태스크 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 채널 통신 실패
    #[error("channel error: {0}")]
    Channel(String),

    /// 초기화 실패
    #[error("init failed: {0}")]
    InitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_into_top_level() {
        let err: TailpostError = ConfigError::InvalidValue {
            field: "tail.services".to_owned(),
            reason: "must not be empty".to_owned(),
        }
        .into();
        assert!(matches!(err, TailpostError::Config(_)));
        assert!(err.to_string().contains("tail.services"));
    }

    #[test]
    fn log_stream_error_display_names_container() {
        let err = RuntimeError::LogStream {
            container_id: "c0ffee".to_owned(),
            reason: "no such container".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("c0ffee"));
        assert!(msg.contains("no such container"));
    }

    #[test]
    fn io_error_converts_into_top_level() {
        let io = std::io::Error::new(std::io::ErrorKind::BrokenPipe, "pipe closed");
        let err: TailpostError = io.into();
        assert!(matches!(err, TailpostError::Io(_)));
    }
}
