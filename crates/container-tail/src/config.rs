//! 컨테이너 테일 설정
//!
//! [`ContainerTailConfig`]는 core의 [`TailpostConfig`](tailpost_core::config::TailpostConfig)에서
//! `[docker]`, `[tail]` 섹션을 모아 watcher와 디스패처가 사용하는 형태로 제공합니다.
//!
//! # 사용 예시
//! ```ignore
//! use tailpost_core::config::TailpostConfig;
//! use tailpost_container_tail::config::ContainerTailConfig;
//!
//! let core_config = TailpostConfig::default();
//! let config = ContainerTailConfig::from_core(&core_config);
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};
use tailpost_core::config::{
    DEFAULT_BACKLOG_LINES, DEFAULT_SERVICE_LABEL, MAX_ATTACH_BUFFER_SECS, MAX_BACKLOG_LINES,
    MAX_DOCKER_TIMEOUT_SECS, TailpostConfig,
};

use crate::error::ContainerTailError;

/// 컨테이너 테일 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ContainerTailConfig {
    /// 감시할 서비스 이름 목록
    pub services: Vec<String>,
    /// 서비스 이름을 담은 컨테이너 레이블 키
    pub service_label: String,
    /// Docker 소켓 경로 (비어 있으면 플랫폼 기본값)
    pub docker_socket: String,
    /// Docker API 타임아웃 (초)
    pub docker_timeout_secs: u64,
    /// 최초 시작 시 가져올 과거 로그 줄 수
    pub backlog_lines: usize,
    /// 부트스트랩 시 "지금"에서 빼는 시간 (초)
    pub attach_buffer_secs: u64,
    /// 컬러 출력 여부
    pub color: bool,
}

impl Default for ContainerTailConfig {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            service_label: DEFAULT_SERVICE_LABEL.to_owned(),
            docker_socket: String::new(),
            docker_timeout_secs: 120,
            backlog_lines: DEFAULT_BACKLOG_LINES,
            attach_buffer_secs: 1,
            color: true,
        }
    }
}

impl ContainerTailConfig {
    /// core 설정에서 테일 설정을 생성합니다.
    pub fn from_core(core: &TailpostConfig) -> Self {
        Self {
            services: core.tail.services.clone(),
            service_label: core.docker.service_label.clone(),
            docker_socket: core.docker.socket.clone(),
            docker_timeout_secs: core.docker.timeout_secs,
            backlog_lines: core.tail.backlog_lines,
            attach_buffer_secs: core.tail.attach_buffer_secs,
            color: core.tail.color,
        }
    }

    /// 부트스트랩 시각 보정값
    pub fn attach_buffer(&self) -> Duration {
        Duration::from_secs(self.attach_buffer_secs)
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ContainerTailError> {
        if self.services.is_empty() {
            return Err(config_err("services", "at least one service is required"));
        }

        if let Some(blank) = self.services.iter().position(|s| s.trim().is_empty()) {
            return Err(config_err(
                "services",
                format!("service name at index {blank} is empty"),
            ));
        }

        if self.service_label.trim().is_empty() {
            return Err(config_err("service_label", "must not be empty"));
        }

        if self.docker_timeout_secs == 0 || self.docker_timeout_secs > MAX_DOCKER_TIMEOUT_SECS {
            return Err(config_err(
                "docker_timeout_secs",
                format!("must be 1-{MAX_DOCKER_TIMEOUT_SECS}"),
            ));
        }

        if self.backlog_lines == 0 || self.backlog_lines > MAX_BACKLOG_LINES {
            return Err(config_err(
                "backlog_lines",
                format!("must be 1-{MAX_BACKLOG_LINES}"),
            ));
        }

        if self.attach_buffer_secs > MAX_ATTACH_BUFFER_SECS {
            return Err(config_err(
                "attach_buffer_secs",
                format!("must be 0-{MAX_ATTACH_BUFFER_SECS}"),
            ));
        }

        Ok(())
    }
}

fn config_err(field: &str, reason: impl Into<String>) -> ContainerTailError {
    ContainerTailError::Config {
        field: field.to_owned(),
        reason: reason.into(),
    }
}

/// 컨테이너 테일 설정 빌더
#[derive(Default)]
pub struct ContainerTailConfigBuilder {
    config: ContainerTailConfig,
}

impl ContainerTailConfigBuilder {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 감시할 서비스 목록을 설정합니다.
    pub fn services<I, S>(mut self, services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.config.services = services.into_iter().map(Into::into).collect();
        self
    }

    /// 서비스 레이블 키를 설정합니다.
    pub fn service_label(mut self, label: impl Into<String>) -> Self {
        self.config.service_label = label.into();
        self
    }

    /// Docker 소켓 경로를 설정합니다.
    pub fn docker_socket(mut self, socket: impl Into<String>) -> Self {
        self.config.docker_socket = socket.into();
        self
    }

    /// Docker API 타임아웃(초)을 설정합니다.
    pub fn docker_timeout_secs(mut self, secs: u64) -> Self {
        self.config.docker_timeout_secs = secs;
        self
    }

    /// 백로그 줄 수를 설정합니다.
    pub fn backlog_lines(mut self, lines: usize) -> Self {
        self.config.backlog_lines = lines;
        self
    }

    /// 부트스트랩 시각 보정값(초)을 설정합니다.
    pub fn attach_buffer_secs(mut self, secs: u64) -> Self {
        self.config.attach_buffer_secs = secs;
        self
    }

    /// 컬러 출력 여부를 설정합니다.
    pub fn color(mut self, color: bool) -> Self {
        self.config.color = color;
        self
    }

    /// 설정을 검증하고 `ContainerTailConfig`를 생성합니다.
    pub fn build(self) -> Result<ContainerTailConfig, ContainerTailError> {
        self.config.validate()?;
        Ok(self.config)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_requires_services() {
        let err = ContainerTailConfig::default().validate().unwrap_err();
        assert!(err.to_string().contains("services"));
    }

    #[test]
    fn from_core_preserves_values() {
        let mut core = TailpostConfig::default();
        core.tail.services = vec!["web".to_owned(), "db".to_owned()];
        core.tail.backlog_lines = 25;
        core.tail.color = false;
        core.docker.socket = "/run/docker.sock".to_owned();
        core.docker.service_label = "app".to_owned();

        let config = ContainerTailConfig::from_core(&core);
        assert_eq!(config.services, vec!["web", "db"]);
        assert_eq!(config.backlog_lines, 25);
        assert!(!config.color);
        assert_eq!(config.docker_socket, "/run/docker.sock");
        assert_eq!(config.service_label, "app");
        config.validate().unwrap();
    }

    #[test]
    fn builder_validates() {
        let config = ContainerTailConfigBuilder::new()
            .services(["web"])
            .backlog_lines(10)
            .attach_buffer_secs(2)
            .build()
            .unwrap();
        assert_eq!(config.backlog_lines, 10);
        assert_eq!(config.attach_buffer(), Duration::from_secs(2));
    }

    #[test]
    fn builder_rejects_zero_backlog() {
        let err = ContainerTailConfigBuilder::new()
            .services(["web"])
            .backlog_lines(0)
            .build()
            .unwrap_err();
        assert!(matches!(err, ContainerTailError::Config { ref field, .. } if field == "backlog_lines"));
    }

    #[test]
    fn builder_rejects_blank_service() {
        let err = ContainerTailConfigBuilder::new()
            .services(["web", ""])
            .build()
            .unwrap_err();
        assert!(err.to_string().contains("index 1"));
    }

    #[test]
    fn builder_rejects_zero_timeout() {
        let result = ContainerTailConfigBuilder::new()
            .services(["web"])
            .docker_timeout_secs(0)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn builder_rejects_large_attach_buffer() {
        let result = ContainerTailConfigBuilder::new()
            .services(["web"])
            .attach_buffer_secs(120)
            .build();
        assert!(result.is_err());
    }

    #[test]
    fn limits_match_core_validation() {
        let mut core = TailpostConfig::default();
        core.tail.services = vec!["web".to_owned()];
        core.tail.backlog_lines = MAX_BACKLOG_LINES;
        core.tail.attach_buffer_secs = MAX_ATTACH_BUFFER_SECS;
        core.docker.timeout_secs = MAX_DOCKER_TIMEOUT_SECS;
        core.validate().unwrap();
        ContainerTailConfig::from_core(&core).validate().unwrap();

        core.tail.backlog_lines = MAX_BACKLOG_LINES + 1;
        assert!(core.validate().is_err());
        assert!(ContainerTailConfig::from_core(&core).validate().is_err());
    }
}
