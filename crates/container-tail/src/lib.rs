//! # tailpost-container-tail
//!
//! 서비스 레이블로 고른 컨테이너들의 로그를 하나의 출력으로 모아 따라갑니다.
//!
//! 시작 시 이미 실행 중인 컨테이너에 붙고(부트스트랩), 이후 컨테이너 라이프사이클
//! 이벤트를 받아 컨테이너별 로그 스트림을 열고 닫습니다. 재시작된 컨테이너는
//! 처음부터 다시 읽지 않고 재시작 시각 근처부터 이어 붙입니다.
//!
//! ## 아키텍처
//!
//! ```text
//! ContainerRuntime ──list──> Dispatcher::bootstrap ──┐
//!        │                                          ├──> WatcherRegistry
//!        └──events──> Dispatcher::watch_events ─────┘         │
//!                                                              ▼
//!                                      Watcher (컨테이너당 하나, 스트리밍 태스크)
//!                                                              │
//!                                                              ▼
//!                                                   LogSink (ConsoleSink)
//! ```
//!
//! ## 모듈
//!
//! - [`config`]: 테일 설정과 빌더
//! - [`error`]: 도메인 에러 타입
//! - [`event`]: 런타임 중립 라이프사이클 이벤트
//! - [`filter`]: 서비스 화이트리스트
//! - [`resume`]: 로그 재개 정책
//! - [`runtime`]: 컨테이너 런타임 추상화와 bollard 구현
//! - [`sink`]: 출력 싱크와 줄 분리기
//! - [`watcher`]: 컨테이너별 start/stop 상태 머신
//! - [`registry`]: watcher 레지스트리
//! - [`dispatcher`]: 부트스트랩과 이벤트 처리

pub mod config;
pub mod context;
pub mod dispatcher;
pub mod error;
pub mod event;
pub mod filter;
pub mod registry;
pub mod resume;
pub mod runtime;
pub mod sink;
pub mod watcher;

// Re-exports
pub use config::{ContainerTailConfig, ContainerTailConfigBuilder};
pub use context::TailContext;
pub use dispatcher::{DispatchOutcome, Dispatcher, DispatcherBuilder};
pub use error::ContainerTailError;
pub use event::{ContainerAction, LifecycleEvent};
pub use filter::ServiceFilter;
pub use registry::WatcherRegistry;
pub use resume::{LogStreamOptions, resume_options};
pub use runtime::{BollardRuntime, ContainerRuntime, EventStream, LogChunk, LogStream};
pub use sink::{ConsoleSink, LineSplitter, LogSink, MAX_LINE_BYTES, Notice, format_prefix};
pub use watcher::{StartOrigin, Watcher, WatcherStatus};
