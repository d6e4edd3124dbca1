//! 디스패처 -- 부트스트랩 열거와 실시간 이벤트 처리
//!
//! [`Dispatcher`]는 두 개의 태스크를 동시에 실행합니다.
//!
//! # 내부 아키텍처
//! ```text
//! list_running_containers ──> bootstrap ──┐
//!                                         ├──> WatcherRegistry ──> Watcher tasks ──> LogSink
//! events() ──────────────> watch_events ──┘
//!
//! (fatal errors) ──mpsc──> run() ──> caller
//! ```
//!
//! 부트스트랩 실패, 이벤트 스트림 에러/종료, 로그 스트림 열기 실패는 모두
//! 치명적 에러로 `run()`에 전달되며, 첫 번째 에러가 반환됩니다.

use std::sync::Arc;
use std::time::SystemTime;

use futures::StreamExt;
use metrics::counter;
use tailpost_core::metrics::{EVENTS_FILTERED_TOTAL, EVENTS_RECEIVED_TOTAL, LABEL_ACTION};
use tailpost_core::types::short_id;
use tokio::sync::mpsc;
use tokio::task::JoinSet;
use tracing::{debug, error, info, trace};

use crate::config::ContainerTailConfig;
use crate::context::TailContext;
use crate::error::ContainerTailError;
use crate::event::LifecycleEvent;
use crate::registry::WatcherRegistry;
use crate::runtime::ContainerRuntime;
use crate::sink::{ConsoleSink, LogSink, Notice};
use crate::watcher::StartOrigin;

/// 이벤트 하나를 처리한 결과
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DispatchOutcome {
    /// start/stop/die 이외의 액션
    Ignored,
    /// 감시 대상이 아닌 서비스
    Filtered,
    /// 새 스트리밍 태스크 시작
    Started,
    /// 이미 스트리밍 중이라 무시
    AlreadyActive,
    /// 활성 스트림 중지
    Stopped,
    /// 이미 비활성이라 무시
    NotActive,
}

/// 부트스트랩과 이벤트 피드를 구동하는 디스패처
pub struct Dispatcher<R: ContainerRuntime> {
    registry: Arc<WatcherRegistry<R>>,
}

impl<R: ContainerRuntime> Clone for Dispatcher<R> {
    fn clone(&self) -> Self {
        Self {
            registry: Arc::clone(&self.registry),
        }
    }
}

impl<R: ContainerRuntime> Dispatcher<R> {
    /// watcher 레지스트리
    pub fn registry(&self) -> &Arc<WatcherRegistry<R>> {
        &self.registry
    }

    fn ctx(&self) -> &Arc<TailContext<R>> {
        self.registry.context()
    }

    /// 이미 실행 중인 컨테이너 중 감시 대상에 붙습니다.
    ///
    /// 시작 시각은 `지금 - attach_buffer`로 잡고, 이력과 무관하게 백로그 정책을
    /// 사용합니다. 새로 스트리밍을 시작한 컨테이너 수를 반환합니다.
    ///
    /// # Errors
    ///
    /// 컨테이너 목록 조회가 실패하면 에러를 반환합니다.
    pub async fn bootstrap(&self) -> Result<usize, ContainerTailError> {
        let ctx = self.ctx();
        let containers = ctx.runtime().list_running_containers().await?;
        let now = SystemTime::now();
        let attach_time = now.checked_sub(ctx.config().attach_buffer()).unwrap_or(now);

        let mut attached = 0;
        for container in &containers {
            if !ctx.filter().contains(&container.service) {
                trace!(container = %container, "not a watched service");
                continue;
            }

            ctx.sink()
                .notice(&container.service, Notice::Watching, short_id(&container.id));
            if self
                .registry
                .start(
                    &container.id,
                    &container.service,
                    attach_time,
                    StartOrigin::Bootstrap,
                )
                .await
            {
                attached += 1;
            }
        }

        info!(
            running = containers.len(),
            attached, "bootstrap enumeration complete"
        );
        Ok(attached)
    }

    /// 이벤트 하나를 처리합니다.
    pub async fn dispatch(&self, event: LifecycleEvent) -> DispatchOutcome {
        let ctx = self.ctx();
        counter!(EVENTS_RECEIVED_TOTAL, LABEL_ACTION => event.action.label()).increment(1);

        if !event.action.is_start() && !event.action.is_stop() {
            trace!(event = %event, "ignoring action");
            return DispatchOutcome::Ignored;
        }

        if !ctx.filter().contains(&event.service) {
            counter!(EVENTS_FILTERED_TOTAL).increment(1);
            trace!(event = %event, "not a watched service");
            return DispatchOutcome::Filtered;
        }

        debug!(event = %event, "dispatching lifecycle event");

        if event.action.is_start() {
            ctx.sink()
                .notice(&event.service, Notice::Started, short_id(&event.container_id));
            if self
                .registry
                .start(
                    &event.container_id,
                    &event.service,
                    event.time,
                    StartOrigin::Event,
                )
                .await
            {
                DispatchOutcome::Started
            } else {
                DispatchOutcome::AlreadyActive
            }
        } else {
            ctx.sink()
                .notice(&event.service, Notice::Stopped, short_id(&event.container_id));
            if self.registry.stop(&event.container_id).await {
                DispatchOutcome::Stopped
            } else {
                DispatchOutcome::NotActive
            }
        }
    }

    /// 이벤트 피드를 끝까지 소비합니다.
    ///
    /// 정상 종료는 없습니다. 피드가 끝나거나 에러를 내면 에러를 반환합니다.
    ///
    /// # Errors
    ///
    /// 항상 `ContainerTailError::EventStream`을 반환합니다.
    pub async fn watch_events(&self) -> Result<(), ContainerTailError> {
        let mut events = self.ctx().runtime().events();
        info!("subscribed to container events");

        while let Some(item) = events.next().await {
            let event = item.map_err(|e| match e {
                ContainerTailError::EventStream(_) => e,
                other => ContainerTailError::EventStream(other.to_string()),
            })?;
            self.dispatch(event).await;
        }

        Err(ContainerTailError::EventStream(
            "event stream ended".to_owned(),
        ))
    }

    /// 부트스트랩과 이벤트 피드를 동시에 실행하고, 첫 치명적 에러를 반환합니다.
    ///
    /// 반환 전에 두 태스크를 모두 중단합니다. 이 future가 드롭되어도 태스크는
    /// 함께 중단됩니다.
    pub async fn run(&self, mut fatal_rx: mpsc::Receiver<ContainerTailError>) -> ContainerTailError {
        let mut tasks = JoinSet::new();

        let events = self.clone();
        tasks.spawn(async move {
            if let Err(e) = events.watch_events().await {
                error!(error = %e, "container event feed failed");
                events.ctx().report_fatal(e);
            }
        });

        let bootstrap = self.clone();
        tasks.spawn(async move {
            if let Err(e) = bootstrap.bootstrap().await {
                error!(error = %e, "bootstrap enumeration failed");
                bootstrap.ctx().report_fatal(e);
            }
        });

        let err = fatal_rx.recv().await.unwrap_or_else(|| {
            ContainerTailError::Channel("fatal error channel closed".to_owned())
        });
        tasks.abort_all();
        err
    }

    /// 모든 활성 스트림을 중지합니다. 중지한 개수를 반환합니다.
    pub async fn shutdown(&self) -> usize {
        let stopped = self.registry.stop_all().await;
        info!(stopped, "all log streams stopped");
        stopped
    }
}

/// 디스패처 빌더
///
/// 컨텍스트를 구성하고 치명적 에러 채널을 생성합니다.
///
/// # 사용 예시
/// ```ignore
/// use tailpost_container_tail::{BollardRuntime, DispatcherBuilder};
///
/// let runtime = Arc::new(BollardRuntime::connect(&config).await?);
/// let (dispatcher, fatal_rx) = DispatcherBuilder::new()
///     .config(config)
///     .runtime(runtime)
///     .build()?;
///
/// let err = dispatcher.run(fatal_rx).await;
/// ```
pub struct DispatcherBuilder<R: ContainerRuntime> {
    config: ContainerTailConfig,
    runtime: Option<Arc<R>>,
    sink: Option<Arc<dyn LogSink>>,
}

impl<R: ContainerRuntime> Default for DispatcherBuilder<R> {
    fn default() -> Self {
        Self::new()
    }
}

impl<R: ContainerRuntime> DispatcherBuilder<R> {
    /// 새 빌더를 생성합니다.
    pub fn new() -> Self {
        Self {
            config: ContainerTailConfig::default(),
            runtime: None,
            sink: None,
        }
    }

    /// 테일 설정을 지정합니다.
    pub fn config(mut self, config: ContainerTailConfig) -> Self {
        self.config = config;
        self
    }

    /// 컨테이너 런타임을 설정합니다.
    pub fn runtime(mut self, runtime: Arc<R>) -> Self {
        self.runtime = Some(runtime);
        self
    }

    /// 출력 싱크를 설정합니다.
    ///
    /// 설정하지 않으면 표준 에러에 쓰는 [`ConsoleSink`]를 사용합니다.
    pub fn sink(mut self, sink: Arc<dyn LogSink>) -> Self {
        self.sink = Some(sink);
        self
    }

    /// 디스패처를 빌드합니다.
    ///
    /// # Returns
    /// - `Dispatcher`: 디스패처 인스턴스
    /// - `mpsc::Receiver<ContainerTailError>`: 치명적 에러 수신 채널 (`run()`에 전달)
    pub fn build(
        self,
    ) -> Result<(Dispatcher<R>, mpsc::Receiver<ContainerTailError>), ContainerTailError> {
        self.config.validate()?;

        let runtime = self.runtime.ok_or_else(|| ContainerTailError::Config {
            field: "runtime".to_owned(),
            reason: "container runtime must be provided".to_owned(),
        })?;

        let sink = match self.sink {
            Some(sink) => sink,
            None => {
                let filter = crate::filter::ServiceFilter::new(self.config.services.iter().cloned());
                Arc::new(ConsoleSink::stderr(&filter, self.config.color))
            }
        };

        let (ctx, fatal_rx) = TailContext::new(runtime, sink, self.config);
        let dispatcher = Dispatcher {
            registry: Arc::new(WatcherRegistry::new(ctx)),
        };
        Ok((dispatcher, fatal_rx))
    }
}

#[cfg(test)]
mod tests {
    use std::time::{Duration, UNIX_EPOCH};

    use tailpost_core::types::ContainerInfo;

    use crate::config::ContainerTailConfigBuilder;
    use crate::event::ContainerAction;
    use crate::resume::LogStreamOptions;
    use crate::runtime::mock::{LogScript, MockRuntime};
    use crate::watcher::tests::RecordingSink;

    use super::*;

    fn at(secs: u64) -> SystemTime {
        UNIX_EPOCH + Duration::from_secs(secs)
    }

    async fn settle() {
        for _ in 0..10 {
            tokio::task::yield_now().await;
        }
    }

    fn event(id: &str, service: &str, action: &str, secs: u64) -> LifecycleEvent {
        LifecycleEvent::new(id, service, ContainerAction::from(action), at(secs))
    }

    fn build(
        runtime: MockRuntime,
    ) -> (
        Dispatcher<MockRuntime>,
        mpsc::Receiver<ContainerTailError>,
        Arc<RecordingSink>,
    ) {
        let config = ContainerTailConfigBuilder::new()
            .services(["web", "api"])
            .backlog_lines(1000)
            .build()
            .unwrap();
        let sink = Arc::new(RecordingSink::default());
        let (dispatcher, rx) = DispatcherBuilder::new()
            .config(config)
            .runtime(Arc::new(runtime))
            .sink(sink.clone())
            .build()
            .unwrap();
        (dispatcher, rx, sink)
    }

    #[test]
    fn builder_requires_runtime() {
        let config = ContainerTailConfigBuilder::new()
            .services(["web"])
            .build()
            .unwrap();
        let result = DispatcherBuilder::<MockRuntime>::new().config(config).build();
        assert!(matches!(result, Err(ContainerTailError::Config { .. })));
    }

    #[test]
    fn builder_validates_config() {
        let result = DispatcherBuilder::new()
            .runtime(Arc::new(MockRuntime::new()))
            .build();
        assert!(result.is_err());
    }

    #[tokio::test]
    async fn bootstrap_attaches_only_watched_services() {
        let runtime = MockRuntime::new().with_containers(vec![
            ContainerInfo::new("c1", "web"),
            ContainerInfo::new("c2", "db"),
            ContainerInfo::new("c3", ""),
        ]);
        let (dispatcher, _rx, sink) = build(runtime);

        assert_eq!(dispatcher.bootstrap().await.unwrap(), 1);
        assert_eq!(dispatcher.registry().len().await, 1);

        let notices = sink.notices.lock().unwrap().clone();
        assert_eq!(
            notices,
            vec![("web".to_owned(), Notice::Watching, "c1".to_owned())]
        );

        settle().await;
        let requests = dispatcher.ctx().runtime().requests();
        assert_eq!(requests, vec![("c1".to_owned(), LogStreamOptions::backlog(1000))]);
    }

    #[tokio::test]
    async fn bootstrap_failure_is_error() {
        let (dispatcher, _rx, _sink) = build(MockRuntime::new().with_failing_list());
        assert!(dispatcher.bootstrap().await.is_err());
    }

    #[tokio::test]
    async fn dispatch_filters_unwatched_services() {
        let (dispatcher, _rx, sink) = build(MockRuntime::new());
        let outcome = dispatcher.dispatch(event("c2", "db", "start", 100)).await;
        assert_eq!(outcome, DispatchOutcome::Filtered);
        assert!(dispatcher.registry().is_empty().await);
        assert!(sink.notices.lock().unwrap().is_empty());
    }

    #[tokio::test]
    async fn dispatch_ignores_other_actions() {
        let (dispatcher, _rx, _sink) = build(MockRuntime::new());
        let outcome = dispatcher.dispatch(event("c1", "web", "create", 100)).await;
        assert_eq!(outcome, DispatchOutcome::Ignored);
        assert!(dispatcher.registry().is_empty().await);
    }

    #[tokio::test]
    async fn dispatch_start_stop_cycle() {
        let (dispatcher, _rx, sink) = build(MockRuntime::new());

        assert_eq!(
            dispatcher.dispatch(event("c3", "web", "start", 100)).await,
            DispatchOutcome::Started
        );
        assert_eq!(
            dispatcher.dispatch(event("c3", "web", "start", 100)).await,
            DispatchOutcome::AlreadyActive
        );
        assert_eq!(
            dispatcher.dispatch(event("c3", "web", "die", 150)).await,
            DispatchOutcome::Stopped
        );
        assert_eq!(
            dispatcher.dispatch(event("c3", "web", "stop", 151)).await,
            DispatchOutcome::NotActive
        );
        assert_eq!(
            dispatcher.dispatch(event("c3", "web", "start", 200)).await,
            DispatchOutcome::Started
        );

        settle().await;
        let requests = dispatcher.ctx().runtime().requests();
        assert_eq!(requests.len(), 2);
        assert_eq!(requests[0].1, LogStreamOptions::backlog(1000));
        assert_eq!(requests[1].1, LogStreamOptions::since(199));

        let kinds: Vec<_> = sink
            .notices
            .lock()
            .unwrap()
            .iter()
            .map(|(_, notice, _)| *notice)
            .collect();
        assert_eq!(
            kinds,
            vec![
                Notice::Started,
                Notice::Started,
                Notice::Stopped,
                Notice::Stopped,
                Notice::Started
            ]
        );
    }

    #[tokio::test]
    async fn stop_for_unknown_container_is_noop() {
        let (dispatcher, _rx, _sink) = build(MockRuntime::new());
        assert_eq!(
            dispatcher.dispatch(event("c9", "web", "stop", 100)).await,
            DispatchOutcome::NotActive
        );
        assert!(dispatcher.registry().is_empty().await);
    }

    #[tokio::test]
    async fn watch_events_errors_when_feed_ends() {
        let runtime = MockRuntime::new()
            .with_events(vec![Ok(event("c1", "web", "start", 100))])
            .with_ending_events();
        let (dispatcher, _rx, _sink) = build(runtime);

        let err = dispatcher.watch_events().await.unwrap_err();
        assert!(matches!(err, ContainerTailError::EventStream(_)));
        assert_eq!(dispatcher.registry().len().await, 1);
    }

    #[tokio::test]
    async fn watch_events_propagates_feed_error() {
        let runtime = MockRuntime::new().with_events(vec![Err(ContainerTailError::EventStream(
            "decode failed".to_owned(),
        ))]);
        let (dispatcher, _rx, _sink) = build(runtime);

        let err = dispatcher.watch_events().await.unwrap_err();
        assert!(err.to_string().contains("decode failed"));
    }

    #[tokio::test]
    async fn run_returns_first_fatal_error() {
        let runtime = MockRuntime::new()
            .with_containers(vec![ContainerInfo::new("c1", "web")])
            .with_logs(LogScript::FailOpen("no such container".to_owned()));
        let (dispatcher, rx, _sink) = build(runtime);

        let err = tokio::time::timeout(Duration::from_secs(1), dispatcher.run(rx))
            .await
            .unwrap();
        assert!(matches!(err, ContainerTailError::LogStreamOpen { .. }));
    }

    #[tokio::test]
    async fn run_returns_bootstrap_failure() {
        let (dispatcher, rx, _sink) = build(MockRuntime::new().with_failing_list());
        let err = tokio::time::timeout(Duration::from_secs(1), dispatcher.run(rx))
            .await
            .unwrap();
        assert!(matches!(err, ContainerTailError::DockerApi(_)));
    }

    #[tokio::test]
    async fn shutdown_stops_active_streams() {
        let (dispatcher, _rx, _sink) = build(MockRuntime::new());
        dispatcher.dispatch(event("c1", "web", "start", 100)).await;
        dispatcher.dispatch(event("c2", "api", "start", 100)).await;
        assert_eq!(dispatcher.shutdown().await, 2);
        assert_eq!(dispatcher.registry().active_count().await, 0);
    }
}
