//! tailpost 공통 크레이트
//!
//! 모든 tailpost 크레이트가 공유하는 에러, 설정, 도메인 타입, 메트릭 이름을 정의합니다.
//!
//! - [`error`]: 최상위 에러 타입 (`TailpostError`)
//! - [`config`]: `tailpost.toml` 파싱, 환경변수 오버라이드, 검증
//! - [`types`]: 런타임 경계에서 교환되는 도메인 타입
//! - [`metrics`]: 메트릭 이름 상수

pub mod config;
pub mod error;
pub mod metrics;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, PipelineError, RuntimeError, TailpostError};

// 설정
pub use config::TailpostConfig;

// 도메인 타입
pub use types::{ContainerInfo, OutputStream, short_id};
