//! 공유 실행 컨텍스트
//!
//! [`TailContext`]는 레지스트리, 디스패처, 그리고 모든 스트리밍 태스크가 함께 쓰는
//! 읽기 전용 상태(런타임, 싱크, 서비스 필터, 설정)와 치명적 에러 보고 채널을 묶습니다.

use std::sync::Arc;

use tokio::sync::mpsc;
use tracing::warn;

use crate::config::ContainerTailConfig;
use crate::error::ContainerTailError;
use crate::filter::ServiceFilter;
use crate::runtime::ContainerRuntime;
use crate::sink::LogSink;

/// 치명적 에러 채널 용량
///
/// 첫 에러만 소비되므로 작게 유지합니다.
const FATAL_CHANNEL_CAPACITY: usize = 16;

/// 모든 태스크가 공유하는 컨텍스트
pub struct TailContext<R: ContainerRuntime> {
    runtime: Arc<R>,
    sink: Arc<dyn LogSink>,
    filter: ServiceFilter,
    config: ContainerTailConfig,
    fatal_tx: mpsc::Sender<ContainerTailError>,
}

impl<R: ContainerRuntime> TailContext<R> {
    /// 컨텍스트와 치명적 에러 수신 채널을 생성합니다.
    pub fn new(
        runtime: Arc<R>,
        sink: Arc<dyn LogSink>,
        config: ContainerTailConfig,
    ) -> (Arc<Self>, mpsc::Receiver<ContainerTailError>) {
        let (fatal_tx, fatal_rx) = mpsc::channel(FATAL_CHANNEL_CAPACITY);
        let filter = ServiceFilter::new(config.services.iter().cloned());
        let ctx = Self {
            runtime,
            sink,
            filter,
            config,
            fatal_tx,
        };
        (Arc::new(ctx), fatal_rx)
    }

    /// 컨테이너 런타임
    pub fn runtime(&self) -> &Arc<R> {
        &self.runtime
    }

    /// 출력 싱크
    pub fn sink(&self) -> &dyn LogSink {
        self.sink.as_ref()
    }

    /// 서비스 필터
    pub fn filter(&self) -> &ServiceFilter {
        &self.filter
    }

    /// 설정
    pub fn config(&self) -> &ContainerTailConfig {
        &self.config
    }

    /// 치명적 에러를 보고합니다.
    ///
    /// 수신 측이 이미 종료 중이거나 채널이 가득 찼으면 로그만 남깁니다.
    pub fn report_fatal(&self, err: ContainerTailError) {
        if let Err(e) = self.fatal_tx.try_send(err) {
            warn!(error = %e, "fatal error dropped, shutdown already in progress");
        }
    }
}
