//! Container lifecycle events.
//!
//! [`LifecycleEvent`] is the runtime-neutral form of a Docker container event.
//! Only [`ContainerAction::Start`], [`ContainerAction::Stop`] and
//! [`ContainerAction::Die`] drive the watcher registry; every other action is
//! carried as [`ContainerAction::Other`] and ignored by the dispatcher.
//!
//! # Examples
//!
//! ```
//! use std::time::{Duration, UNIX_EPOCH};
//! use tailpost_container_tail::{ContainerAction, LifecycleEvent};
//!
//! let event = LifecycleEvent::new(
//!     "abc123def456",
//!     "web",
//!     ContainerAction::from("start"),
//!     UNIX_EPOCH + Duration::from_secs(100),
//! );
//! assert!(event.action.is_start());
//! ```

use std::fmt;
use std::time::SystemTime;

use serde::{Deserialize, Serialize};
use tailpost_core::types::short_id;

/// Container lifecycle action reported by the runtime.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ContainerAction {
    /// 컨테이너 시작됨
    Start,
    /// 컨테이너 정지됨
    Stop,
    /// 컨테이너 프로세스 종료됨
    Die,
    /// 그 외 액션 (create, destroy, exec_start, health_status 등)
    Other(String),
}

impl ContainerAction {
    /// Whether this action should start a watcher.
    pub fn is_start(&self) -> bool {
        matches!(self, Self::Start)
    }

    /// Whether this action should stop a watcher (`stop` or `die`).
    pub fn is_stop(&self) -> bool {
        matches!(self, Self::Stop | Self::Die)
    }

    /// Metric label value for this action.
    pub fn label(&self) -> &'static str {
        match self {
            Self::Start => "start",
            Self::Stop => "stop",
            Self::Die => "die",
            Self::Other(_) => "other",
        }
    }
}

impl From<&str> for ContainerAction {
    fn from(action: &str) -> Self {
        match action {
            "start" => Self::Start,
            "stop" => Self::Stop,
            "die" => Self::Die,
            other => Self::Other(other.to_owned()),
        }
    }
}

impl fmt::Display for ContainerAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(action) => write!(f, "{action}"),
            known => write!(f, "{}", known.label()),
        }
    }
}

/// A container-scoped lifecycle notification.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LifecycleEvent {
    /// 대상 컨테이너 ID
    pub container_id: String,
    /// 서비스 레이블 값 (없으면 빈 문자열)
    pub service: String,
    /// 액션
    pub action: ContainerAction,
    /// 런타임이 기록한 이벤트 시각
    pub time: SystemTime,
}

impl LifecycleEvent {
    /// Creates a lifecycle event.
    pub fn new(
        container_id: impl Into<String>,
        service: impl Into<String>,
        action: ContainerAction,
        time: SystemTime,
    ) -> Self {
        Self {
            container_id: container_id.into(),
            service: service.into(),
            action,
            time,
        }
    }
}

impl fmt::Display for LifecycleEvent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "LifecycleEvent[{}] service={} container={}",
            self.action,
            self.service,
            short_id(&self.container_id),
        )
    }
}
