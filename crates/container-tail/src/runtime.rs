//! Container runtime abstraction for testability.
//!
//! The [`ContainerRuntime`] trait is the boundary to the container runtime:
//! listing running containers, the live lifecycle event feed, and per-container
//! log streams. Production code uses [`BollardRuntime`]; unit tests use
//! `MockRuntime`.
//!
//! # Architecture
//!
//! ```text
//! ┌────────────┐   ┌─────────┐
//! │ Dispatcher │   │ Watcher │
//! └─────┬──────┘   └────┬────┘
//!       │               │
//!       ▼               ▼
//!   ┌──────────────────────┐
//!   │ ContainerRuntime     │ (trait)
//!   └──────────────────────┘
//!        │           │
//!        ▼           ▼
//!   ┌─────────┐  ┌──────┐
//!   │ Bollard │  │ Mock │
//!   └────┬────┘  └──────┘
//!        │
//!        ▼
//!   Docker Daemon
//! ```
//!
//! The event feed yields `Err` items when the feed itself is unusable; the
//! dispatcher treats those as fatal. Log streams are already demultiplexed into
//! [`LogChunk`]s tagged with their [`OutputStream`].
//!
//! # Examples
//!
//! ```ignore
//! use tailpost_container_tail::{BollardRuntime, ContainerRuntime, ContainerTailConfig};
//!
//! let runtime = BollardRuntime::connect(&ContainerTailConfig::default()).await?;
//! let running = runtime.list_running_containers().await?;
//! # Ok::<(), tailpost_container_tail::ContainerTailError>(())
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use bytes::Bytes;
use futures::StreamExt;
use futures::future::ready;
use futures::stream::BoxStream;
use tailpost_core::types::{ContainerInfo, OutputStream};

use crate::config::ContainerTailConfig;
use crate::error::ContainerTailError;
use crate::event::{ContainerAction, LifecycleEvent};
use crate::resume::LogStreamOptions;

/// Live lifecycle event feed. An `Err` item means the feed is unusable.
pub type EventStream = BoxStream<'static, Result<LifecycleEvent, ContainerTailError>>;

/// Demultiplexed log stream of one container.
pub type LogStream = BoxStream<'static, Result<LogChunk, ContainerTailError>>;

/// A chunk of container output from one stream.
///
/// Chunks are not line-aligned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LogChunk {
    /// 출력 스트림
    pub stream: OutputStream,
    /// 원시 바이트
    pub bytes: Bytes,
}

impl LogChunk {
    /// Chunk from standard output.
    pub fn stdout(bytes: impl Into<Bytes>) -> Self {
        Self {
            stream: OutputStream::Stdout,
            bytes: bytes.into(),
        }
    }

    /// Chunk from standard error.
    pub fn stderr(bytes: impl Into<Bytes>) -> Self {
        Self {
            stream: OutputStream::Stderr,
            bytes: bytes.into(),
        }
    }
}

/// Trait abstracting the container runtime.
///
/// The trait is `Send + Sync + 'static` so a single runtime can be shared by
/// the dispatcher and every streaming task through an `Arc`.
///
/// # Cancellation
///
/// Dropping a returned stream must abort the underlying request. Watchers rely
/// on this: stopping a watcher drops its stream while a read is pending.
pub trait ContainerRuntime: Send + Sync + 'static {
    /// Lists currently running containers with their service label.
    ///
    /// # Errors
    ///
    /// Returns `ContainerTailError::DockerApi` if the runtime call fails.
    fn list_running_containers(
        &self,
    ) -> impl Future<Output = Result<Vec<ContainerInfo>, ContainerTailError>> + Send;

    /// Subscribes to container lifecycle events.
    fn events(&self) -> EventStream;

    /// Opens a follow-mode log stream for `container_id`.
    ///
    /// Failures to establish the stream arrive as
    /// `ContainerTailError::LogStreamOpen`; failures while reading an
    /// established stream arrive as `ContainerTailError::LogStreamRead`.
    fn logs(&self, container_id: &str, options: LogStreamOptions) -> LogStream;

    /// Checks runtime connectivity.
    ///
    /// # Errors
    ///
    /// Returns `ContainerTailError::DockerConnection` if the daemon is unreachable.
    fn ping(&self) -> impl Future<Output = Result<(), ContainerTailError>> + Send;
}

/// Production runtime backed by `bollard`.
///
/// Communicates with the Docker daemon via a Unix socket (or whatever
/// `DOCKER_HOST` points at when no socket is configured). The API version is
/// negotiated with the daemon at connect time.
pub struct BollardRuntime {
    docker: Arc<bollard::Docker>,
    service_label: String,
}

impl BollardRuntime {
    /// Connects using the socket and label from `config`.
    ///
    /// An empty `docker_socket` uses the platform defaults. The configured
    /// timeout applies on both paths.
    ///
    /// # Errors
    ///
    /// Returns `ContainerTailError::DockerConnection` if the client cannot be
    /// created or version negotiation fails.
    pub async fn connect(config: &ContainerTailConfig) -> Result<Self, ContainerTailError> {
        let docker = client(config)?.negotiate_version().await.map_err(|e| {
            ContainerTailError::DockerConnection(format!("api version negotiation failed: {e}"))
        })?;

        Ok(Self {
            docker: Arc::new(docker),
            service_label: config.service_label.clone(),
        })
    }
}

/// Creates the bollard client without contacting the daemon.
fn client(config: &ContainerTailConfig) -> Result<bollard::Docker, ContainerTailError> {
    let docker = if config.docker_socket.is_empty() {
        bollard::Docker::connect_with_local_defaults().map_err(|e| {
            ContainerTailError::DockerConnection(format!("failed to connect to docker: {e}"))
        })?
    } else {
        bollard::Docker::connect_with_socket(
            &config.docker_socket,
            config.docker_timeout_secs,
            bollard::API_DEFAULT_VERSION,
        )
        .map_err(|e| {
            ContainerTailError::DockerConnection(format!(
                "failed to connect to docker at {}: {e}",
                config.docker_socket
            ))
        })?
    };

    Ok(docker.with_timeout(Duration::from_secs(config.docker_timeout_secs)))
}

impl ContainerRuntime for BollardRuntime {
    async fn list_running_containers(&self) -> Result<Vec<ContainerInfo>, ContainerTailError> {
        use bollard::container::ListContainersOptions;

        let options = ListContainersOptions::<String> {
            all: false,
            ..Default::default()
        };

        let containers = self
            .docker
            .list_containers(Some(options))
            .await
            .map_err(|e| ContainerTailError::DockerApi(format!("list containers failed: {e}")))?;

        Ok(containers
            .into_iter()
            .filter_map(|container| {
                let id = container.id?;
                let service = container
                    .labels
                    .and_then(|mut labels| labels.remove(&self.service_label))
                    .unwrap_or_default();
                Some(ContainerInfo { id, service })
            })
            .collect())
    }

    fn events(&self) -> EventStream {
        use bollard::system::EventsOptions;

        let mut filters = HashMap::new();
        filters.insert("type".to_owned(), vec!["container".to_owned()]);
        let options = EventsOptions::<String> {
            filters,
            ..Default::default()
        };

        let label = self.service_label.clone();
        self.docker
            .events(Some(options))
            .filter_map(move |item| {
                ready(match item {
                    Ok(message) => lifecycle_event(message, &label).map(Ok),
                    Err(e) => Some(Err(ContainerTailError::EventStream(e.to_string()))),
                })
            })
            .boxed()
    }

    fn logs(&self, container_id: &str, options: LogStreamOptions) -> LogStream {
        use bollard::container::{LogOutput, LogsOptions};

        let options = LogsOptions::<String> {
            follow: options.follow,
            stdout: true,
            stderr: true,
            since: options.since.unwrap_or(0),
            tail: options
                .tail
                .map_or_else(|| "all".to_owned(), |lines| lines.to_string()),
            ..Default::default()
        };

        let id = container_id.to_owned();
        self.docker
            .logs(container_id, Some(options))
            .filter_map(move |item| {
                ready(match item {
                    Ok(LogOutput::StdOut { message } | LogOutput::Console { message }) => {
                        Some(Ok(LogChunk::stdout(message)))
                    }
                    Ok(LogOutput::StdErr { message }) => Some(Ok(LogChunk::stderr(message))),
                    Ok(LogOutput::StdIn { .. }) => None,
                    Err(e) => Some(Err(log_stream_error(&id, e))),
                })
            })
            .boxed()
    }

    async fn ping(&self) -> Result<(), ContainerTailError> {
        self.docker
            .ping()
            .await
            .map_err(|e| ContainerTailError::DockerConnection(format!("ping failed: {e}")))?;
        Ok(())
    }
}

/// Classifies a bollard log stream error.
///
/// Errors raised before the daemon answered with a body (error status, socket
/// connect or request send failure, request timeout) mean the stream never
/// opened. Anything else came from reading the response body.
fn log_stream_error(container_id: &str, err: bollard::errors::Error) -> ContainerTailError {
    use bollard::errors::Error;

    let reason = err.to_string();
    match err {
        Error::DockerResponseServerError { .. }
        | Error::HyperLegacyError { .. }
        | Error::RequestTimeoutError
        | Error::SocketNotFoundError(_)
        | Error::UnsupportedURISchemeError { .. }
        | Error::HttpClientError { .. }
        | Error::URLEncodedError { .. }
        | Error::InvalidURIError { .. } => ContainerTailError::LogStreamOpen {
            container_id: container_id.to_owned(),
            reason,
        },
        _ => ContainerTailError::LogStreamRead {
            container_id: container_id.to_owned(),
            reason,
        },
    }
}

/// Converts a Docker event message into a [`LifecycleEvent`].
///
/// Returns `None` for non-container events and events without an actor id.
fn lifecycle_event(
    message: bollard::models::EventMessage,
    service_label: &str,
) -> Option<LifecycleEvent> {
    use bollard::models::EventMessageTypeEnum;

    if message.typ != Some(EventMessageTypeEnum::CONTAINER) {
        return None;
    }

    let actor = message.actor?;
    let container_id = actor.id?;
    let service = actor
        .attributes
        .and_then(|mut attrs| attrs.remove(service_label))
        .unwrap_or_default();
    let action = ContainerAction::from(message.action.as_deref().unwrap_or_default());

    Some(LifecycleEvent {
        container_id,
        service,
        action,
        time: event_time(message.time, message.time_nano),
    })
}

/// Event timestamp, preferring nanosecond precision when present.
fn event_time(secs: Option<i64>, nanos: Option<i64>) -> SystemTime {
    if let Some(nanos) = nanos.and_then(|n| u64::try_from(n).ok()) {
        return UNIX_EPOCH + Duration::from_nanos(nanos);
    }
    if let Some(secs) = secs.and_then(|s| u64::try_from(s).ok()) {
        return UNIX_EPOCH + Duration::from_secs(secs);
    }
    SystemTime::now()
}

/// 테스트용 Mock 런타임
///
/// 스크립트된 이벤트와 로그를 반환하고, 로그 스트림 요청과 드롭된 스트림 수를
/// 기록합니다.
#[cfg(test)]
pub(crate) mod mock {
    use std::sync::Mutex;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use futures::stream;

    use super::*;

    /// 로그 스트림 동작
    #[derive(Debug, Clone)]
    pub enum LogScript {
        /// 청크를 보낸 뒤 계속 대기 (follow)
        Follow(Vec<LogChunk>),
        /// 청크를 보낸 뒤 종료
        End(Vec<LogChunk>),
        /// 스트림 열기 실패 (`LogStreamOpen`)
        FailOpen(String),
        /// 청크를 보낸 뒤 읽기 실패 (`LogStreamRead`), 청크가 없어도 됨
        FailAfter(Vec<LogChunk>, String),
    }

    struct DropCounter(Arc<AtomicUsize>);

    impl Drop for DropCounter {
        fn drop(&mut self) {
            self.0.fetch_add(1, Ordering::SeqCst);
        }
    }

    pub struct MockRuntime {
        pub containers: Vec<ContainerInfo>,
        pub fail_list: bool,
        pub events: Mutex<Vec<Result<LifecycleEvent, ContainerTailError>>>,
        pub end_events: bool,
        pub script: LogScript,
        pub requests: Mutex<Vec<(String, LogStreamOptions)>>,
        pub dropped_streams: Arc<AtomicUsize>,
    }

    impl Default for MockRuntime {
        fn default() -> Self {
            Self {
                containers: Vec::new(),
                fail_list: false,
                events: Mutex::new(Vec::new()),
                end_events: false,
                script: LogScript::Follow(Vec::new()),
                requests: Mutex::new(Vec::new()),
                dropped_streams: Arc::new(AtomicUsize::new(0)),
            }
        }
    }

    impl MockRuntime {
        pub fn new() -> Self {
            Self::default()
        }

        pub fn with_containers(mut self, containers: Vec<ContainerInfo>) -> Self {
            self.containers = containers;
            self
        }

        pub fn with_failing_list(mut self) -> Self {
            self.fail_list = true;
            self
        }

        pub fn with_events(self, events: Vec<Result<LifecycleEvent, ContainerTailError>>) -> Self {
            *self.events.lock().unwrap() = events;
            self
        }

        pub fn with_ending_events(mut self) -> Self {
            self.end_events = true;
            self
        }

        pub fn with_logs(mut self, script: LogScript) -> Self {
            self.script = script;
            self
        }

        pub fn requests(&self) -> Vec<(String, LogStreamOptions)> {
            self.requests.lock().unwrap().clone()
        }

        pub fn dropped_streams(&self) -> usize {
            self.dropped_streams.load(Ordering::SeqCst)
        }
    }

    impl ContainerRuntime for MockRuntime {
        async fn list_running_containers(
            &self,
        ) -> Result<Vec<ContainerInfo>, ContainerTailError> {
            if self.fail_list {
                return Err(ContainerTailError::DockerApi("mock list failure".to_owned()));
            }
            Ok(self.containers.clone())
        }

        fn events(&self) -> EventStream {
            let events = std::mem::take(&mut *self.events.lock().unwrap());
            let scripted = stream::iter(events);
            if self.end_events {
                scripted.boxed()
            } else {
                scripted.chain(stream::pending()).boxed()
            }
        }

        fn logs(&self, container_id: &str, options: LogStreamOptions) -> LogStream {
            self.requests
                .lock()
                .unwrap()
                .push((container_id.to_owned(), options));

            let items: Vec<Result<LogChunk, ContainerTailError>> = match &self.script {
                LogScript::Follow(chunks) | LogScript::End(chunks) => {
                    chunks.iter().cloned().map(Ok).collect()
                }
                LogScript::FailOpen(reason) => vec![Err(ContainerTailError::LogStreamOpen {
                    container_id: container_id.to_owned(),
                    reason: reason.clone(),
                })],
                LogScript::FailAfter(chunks, reason) => chunks
                    .iter()
                    .cloned()
                    .map(Ok)
                    .chain(std::iter::once(Err(ContainerTailError::LogStreamRead {
                        container_id: container_id.to_owned(),
                        reason: reason.clone(),
                    })))
                    .collect(),
            };

            let guard = DropCounter(Arc::clone(&self.dropped_streams));
            let scripted = stream::iter(items).map(move |item| {
                let _held = &guard;
                item
            });
            match self.script {
                LogScript::Follow(_) => scripted.chain(stream::pending()).boxed(),
                _ => scripted.boxed(),
            }
        }

        async fn ping(&self) -> Result<(), ContainerTailError> {
            Ok(())
        }
    }
}
