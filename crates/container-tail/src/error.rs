//! 컨테이너 테일 에러 타입
//!
//! [`ContainerTailError`]는 watcher, 레지스트리, 디스패처에서 발생하는 모든 에러를
//! 표현합니다. `From<ContainerTailError> for TailpostError` 변환이 구현되어 있어
//! 상위 레이어에서 `?` 연산자로 자연스럽게 전파할 수 있습니다.

use tailpost_core::error::{ConfigError, PipelineError, RuntimeError, TailpostError};

/// 컨테이너 테일 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum ContainerTailError {
    /// Docker 소켓 연결 실패
    #[error("docker connection error: {0}")]
    DockerConnection(String),

    /// Docker API 호출 실패
    #[error("docker api error: {0}")]
    DockerApi(String),

    /// 이벤트 스트림 에러 또는 종료
    #[error("event stream error: {0}")]
    EventStream(String),

    /// 로그 스트림 열기 실패
    #[error("failed to open log stream for container '{container_id}': {reason}")]
    LogStreamOpen {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 실패 사유
        reason: String,
    },

    /// 로그 스트림 읽기 실패
    #[error("failed to read log stream for container '{container_id}': {reason}")]
    LogStreamRead {
        /// 대상 컨테이너 ID
        container_id: String,
        /// 실패 사유
        reason: String,
    },

    /// watcher 중지로 인한 취소
    #[error("cancelled")]
    Cancelled,

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },

    /// 채널 통신 에러
    #[error("channel error: {0}")]
    Channel(String),
}

impl ContainerTailError {
    /// 취소로 인해 발생한 에러인지 확인합니다.
    ///
    /// HTTP 클라이언트는 요청이 중단되면 "canceled"로 끝나는 메시지를 돌려주므로
    /// 문자열 꼬리도 함께 확인합니다.
    pub fn is_cancellation(&self) -> bool {
        match self {
            Self::Cancelled => true,
            Self::LogStreamOpen { reason, .. } | Self::LogStreamRead { reason, .. } => {
                let reason = reason.trim_end().to_ascii_lowercase();
                reason.ends_with("canceled") || reason.ends_with("cancelled")
            }
            _ => false,
        }
    }
}

impl From<ContainerTailError> for TailpostError {
    fn from(err: ContainerTailError) -> Self {
        match err {
            ContainerTailError::DockerConnection(msg) => {
                TailpostError::Runtime(RuntimeError::Connection(msg))
            }
            ContainerTailError::DockerApi(msg) => TailpostError::Runtime(RuntimeError::Api(msg)),
            ContainerTailError::EventStream(msg) => {
                TailpostError::Runtime(RuntimeError::EventStream(msg))
            }
            ContainerTailError::LogStreamOpen {
                container_id,
                reason,
            }
            | ContainerTailError::LogStreamRead {
                container_id,
                reason,
            } => TailpostError::Runtime(RuntimeError::LogStream {
                container_id,
                reason,
            }),
            ContainerTailError::Config { field, reason } => {
                TailpostError::Config(ConfigError::InvalidValue { field, reason })
            }
            err @ (ContainerTailError::Cancelled | ContainerTailError::Channel(_)) => {
                TailpostError::Pipeline(PipelineError::Channel(err.to_string()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn log_stream_open_display() {
        let err = ContainerTailError::LogStreamOpen {
            container_id: "abc123".to_owned(),
            reason: "no such container".to_owned(),
        };
        let msg = err.to_string();
        assert!(msg.contains("abc123"));
        assert!(msg.contains("no such container"));
    }

    #[test]
    fn cancelled_is_cancellation() {
        assert!(ContainerTailError::Cancelled.is_cancellation());
    }

    #[test]
    fn canceled_suffix_is_cancellation() {
        let err = ContainerTailError::LogStreamOpen {
            container_id: "abc".to_owned(),
            reason: "error trying to connect: operation was canceled".to_owned(),
        };
        assert!(err.is_cancellation());

        let err = ContainerTailError::LogStreamRead {
            container_id: "abc".to_owned(),
            reason: "request Cancelled ".to_owned(),
        };
        assert!(err.is_cancellation());
    }

    #[test]
    fn other_errors_are_not_cancellation() {
        let err = ContainerTailError::LogStreamRead {
            container_id: "abc".to_owned(),
            reason: "connection reset by peer".to_owned(),
        };
        assert!(!err.is_cancellation());
        assert!(!ContainerTailError::EventStream("closed".to_owned()).is_cancellation());
        assert!(!ContainerTailError::DockerApi("canceled".to_owned()).is_cancellation());
    }

    #[test]
    fn converts_event_stream_to_runtime_error() {
        let err: TailpostError = ContainerTailError::EventStream("eof".to_owned()).into();
        assert!(matches!(
            err,
            TailpostError::Runtime(RuntimeError::EventStream(_))
        ));
    }

    #[test]
    fn converts_log_stream_errors_to_runtime_error() {
        let err: TailpostError = ContainerTailError::LogStreamRead {
            container_id: "c1".to_owned(),
            reason: "reset".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            TailpostError::Runtime(RuntimeError::LogStream { .. })
        ));
    }

    #[test]
    fn converts_config_error() {
        let err: TailpostError = ContainerTailError::Config {
            field: "backlog_lines".to_owned(),
            reason: "must be 1-100000".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            TailpostError::Config(ConfigError::InvalidValue { .. })
        ));
    }
}
