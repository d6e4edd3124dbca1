//! 도메인 타입 -- 런타임 경계에서 교환되는 공통 타입

use std::fmt;

use serde::{Deserialize, Serialize};

/// 실행 중인 컨테이너 정보
///
/// 부트스트랩 시 런타임의 컨테이너 목록에서 얻습니다.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ContainerInfo {
    /// 런타임이 부여한 컨테이너 ID
    pub id: String,
    /// 서비스 레이블 값 (레이블이 없으면 빈 문자열)
    pub service: String,
}

impl ContainerInfo {
    /// 새 컨테이너 정보를 생성합니다.
    pub fn new(id: impl Into<String>, service: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            service: service.into(),
        }
    }
}

impl fmt::Display for ContainerInfo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} ({})", self.service, short_id(&self.id))
    }
}

/// 컨테이너 ID의 앞 12자리를 반환합니다 (`docker ps` 표기와 동일).
pub fn short_id(id: &str) -> &str {
    id.get(..12).unwrap_or(id)
}

/// 역다중화된 로그 출력 스트림
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum OutputStream {
    /// 표준 출력
    Stdout,
    /// 표준 에러
    Stderr,
}

impl fmt::Display for OutputStream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Stdout => write!(f, "stdout"),
            Self::Stderr => write!(f, "stderr"),
        }
    }
}
