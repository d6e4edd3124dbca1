//! 설정 관리 -- tailpost.toml 파싱 및 런타임 설정
//!
//! [`TailpostConfig`]는 모든 크레이트의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선, 데몬에서 적용)
//! 2. 환경변수 (`TAILPOST_TAIL_BACKLOG_LINES=500` 형식)
//! 3. 설정 파일 (`tailpost.toml`, 선택)
//! 4. 기본값 (`Default` 구현)
//!
//! 로딩 함수는 검증을 수행하지 않습니다. 감시할 서비스 목록은 보통 CLI 인자로
//! 주어지므로, 호출자는 모든 오버라이드를 적용한 뒤 [`TailpostConfig::validate`]를
//! 호출해야 합니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), tailpost_core::error::TailpostError> {
//! use tailpost_core::config::TailpostConfig;
//!
//! let mut config = TailpostConfig::load_or_default("tailpost.toml").await?;
//! config.tail.services = vec!["web".to_owned(), "db".to_owned()];
//! config.validate()?;
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, TailpostError};

/// Docker compose가 컨테이너에 붙이는 서비스 레이블 키
pub const DEFAULT_SERVICE_LABEL: &str = "com.docker.compose.service";

/// 최초 시작 시 요청하는 기본 로그 백로그 줄 수
pub const DEFAULT_BACKLOG_LINES: usize = 1000;

/// `tail.backlog_lines` 상한
pub const MAX_BACKLOG_LINES: usize = 100_000;
/// `tail.attach_buffer_secs` 상한
pub const MAX_ATTACH_BUFFER_SECS: u64 = 60;
/// `docker.timeout_secs` 상한
pub const MAX_DOCKER_TIMEOUT_SECS: u64 = 3600;

/// tailpost 통합 설정
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct TailpostConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// Docker 연결 설정
    #[serde(default)]
    pub docker: DockerConfig,
    /// 로그 테일링 설정
    #[serde(default)]
    pub tail: TailConfig,
}

impl TailpostConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용합니다.
    ///
    /// 파일이 없으면 `ConfigError::FileNotFound`를 반환합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, TailpostError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        Ok(config)
    }

    /// [`load`](Self::load)와 같지만 파일이 없으면 기본값에서 시작합니다.
    pub async fn load_or_default(path: impl AsRef<Path>) -> Result<Self, TailpostError> {
        let mut config = match Self::from_file(path).await {
            Ok(config) => config,
            Err(TailpostError::Config(ConfigError::FileNotFound { .. })) => Self::default(),
            Err(e) => return Err(e),
        };
        config.apply_env_overrides();
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, TailpostError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                TailpostError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                TailpostError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, TailpostError> {
        toml::from_str(toml_str).map_err(|e| {
            TailpostError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `TAILPOST_{SECTION}_{FIELD}`
    /// 예: `TAILPOST_DOCKER_SOCKET=/run/docker.sock`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "TAILPOST_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "TAILPOST_GENERAL_LOG_FORMAT");

        // Docker
        override_string(&mut self.docker.socket, "TAILPOST_DOCKER_SOCKET");
        override_string(
            &mut self.docker.service_label,
            "TAILPOST_DOCKER_SERVICE_LABEL",
        );
        override_u64(&mut self.docker.timeout_secs, "TAILPOST_DOCKER_TIMEOUT_SECS");

        // Tail
        override_csv(&mut self.tail.services, "TAILPOST_TAIL_SERVICES");
        override_usize(&mut self.tail.backlog_lines, "TAILPOST_TAIL_BACKLOG_LINES");
        override_u64(
            &mut self.tail.attach_buffer_secs,
            "TAILPOST_TAIL_ATTACH_BUFFER_SECS",
        );
        override_bool(&mut self.tail.color, "TAILPOST_TAIL_COLOR");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), TailpostError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty", "compact"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        if self.docker.service_label.trim().is_empty() {
            return Err(invalid("docker.service_label", "must not be empty"));
        }

        if self.docker.timeout_secs == 0 || self.docker.timeout_secs > MAX_DOCKER_TIMEOUT_SECS {
            return Err(invalid(
                "docker.timeout_secs",
                format!("must be 1-{MAX_DOCKER_TIMEOUT_SECS}"),
            ));
        }

        if self.tail.services.is_empty() {
            return Err(invalid(
                "tail.services",
                "at least one service name is required",
            ));
        }

        if self.tail.services.iter().any(|s| s.trim().is_empty()) {
            return Err(invalid(
                "tail.services",
                "service names must not be empty",
            ));
        }

        if self.tail.backlog_lines == 0 || self.tail.backlog_lines > MAX_BACKLOG_LINES {
            return Err(invalid(
                "tail.backlog_lines",
                format!("must be 1-{MAX_BACKLOG_LINES}"),
            ));
        }

        if self.tail.attach_buffer_secs > MAX_ATTACH_BUFFER_SECS {
            return Err(invalid(
                "tail.attach_buffer_secs",
                format!("must be 0-{MAX_ATTACH_BUFFER_SECS}"),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: impl Into<String>) -> TailpostError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason: reason.into(),
    }
    .into()
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty, compact)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "warn".to_owned(),
            log_format: "compact".to_owned(),
        }
    }
}

/// Docker 연결 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DockerConfig {
    /// Docker 소켓 경로 (비어 있으면 플랫폼 기본값 사용)
    pub socket: String,
    /// 서비스 이름을 담고 있는 컨테이너 레이블 키
    pub service_label: String,
    /// API 요청 타임아웃 (초)
    pub timeout_secs: u64,
}

impl Default for DockerConfig {
    fn default() -> Self {
        Self {
            socket: String::new(),
            service_label: DEFAULT_SERVICE_LABEL.to_owned(),
            timeout_secs: 120,
        }
    }
}

/// 로그 테일링 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TailConfig {
    /// 감시할 서비스 이름 목록
    pub services: Vec<String>,
    /// 최초 시작 시 가져올 과거 로그 줄 수
    pub backlog_lines: usize,
    /// 이미 실행 중인 컨테이너에 붙을 때 사용하는 시각 보정값 (초)
    pub attach_buffer_secs: u64,
    /// 컬러 출력 여부
    pub color: bool,
}

impl Default for TailConfig {
    fn default() -> Self {
        Self {
            services: Vec::new(),
            backlog_lines: DEFAULT_BACKLOG_LINES,
            attach_buffer_secs: 1,
            color: true,
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}

fn override_csv(target: &mut Vec<String>, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val
            .split(',')
            .map(|s| s.trim().to_owned())
            .filter(|s| !s.is_empty())
            .collect();
    }
}
