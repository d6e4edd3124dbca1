//! 컨테이너별 watcher -- 로그 스트림 시작/중지 상태 머신
//!
//! # 상태 전이
//! ```text
//!            start()                      stop() / 스트림 종료
//! Inactive ──────────> Active(task) ──────────────────────> Inactive
//!    ^                                                         │
//!    └─────────────────────────────────────────────────────────┘
//! ```
//!
//! 활성 여부는 "핸들을 가지고 있고 태스크가 아직 끝나지 않았음"으로 판단합니다.
//! 스트리밍 태스크는 watcher 상태를 직접 바꾸지 않으므로, 스트림이 스스로 끝난
//! 뒤에도 다음 start 이벤트에서 새 스트림을 열 수 있습니다.
//!
//! 첫 시작(또는 부트스트랩 attach)은 백로그를, 재시작은 이벤트 시각 기준 since를
//! 사용합니다. 자세한 내용은 [`resume`](crate::resume) 모듈을 참고하세요.

use std::sync::Arc;
use std::time::SystemTime;

use futures::StreamExt;
use metrics::counter;
use tailpost_core::metrics::{
    LABEL_STAGE, LABEL_STREAM, LINES_FORWARDED_TOTAL, STREAM_FAILURES_TOTAL,
    STREAMS_STARTED_TOTAL, STREAMS_STOPPED_TOTAL,
};
use tailpost_core::types::{OutputStream, short_id};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use crate::context::TailContext;
use crate::error::ContainerTailError;
use crate::resume::{LogStreamOptions, resume_options};
use crate::runtime::ContainerRuntime;
use crate::sink::LineSplitter;

/// start 요청의 출처
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StartOrigin {
    /// 시작 시 이미 실행 중인 컨테이너 열거
    Bootstrap,
    /// 실시간 start 이벤트
    Event,
}

/// watcher 상태 스냅샷
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WatcherStatus {
    /// 컨테이너 ID
    pub container_id: String,
    /// 서비스 이름
    pub service: String,
    /// 스트리밍 중 여부
    pub active: bool,
    /// 한 번이라도 시작된 적이 있는지
    pub previously_started: bool,
}

struct ActiveStream {
    cancel: CancellationToken,
    task: JoinHandle<()>,
}

/// 컨테이너 하나에 대한 로그 스트리밍 상태
pub struct Watcher {
    service: String,
    container_id: String,
    active: Option<ActiveStream>,
    previously_started: bool,
}

impl Watcher {
    /// 비활성 watcher를 생성합니다.
    pub fn new(service: impl Into<String>, container_id: impl Into<String>) -> Self {
        Self {
            service: service.into(),
            container_id: container_id.into(),
            active: None,
            previously_started: false,
        }
    }

    /// 서비스 이름
    pub fn service(&self) -> &str {
        &self.service
    }

    /// 컨테이너 ID
    pub fn container_id(&self) -> &str {
        &self.container_id
    }

    /// 한 번이라도 스트림을 시작했는지
    pub fn previously_started(&self) -> bool {
        self.previously_started
    }

    /// 스트리밍 태스크가 살아 있는지
    pub fn is_active(&self) -> bool {
        self.active
            .as_ref()
            .is_some_and(|active| !active.task.is_finished())
    }

    /// 현재 상태 스냅샷
    pub fn status(&self) -> WatcherStatus {
        WatcherStatus {
            container_id: self.container_id.clone(),
            service: self.service.clone(),
            active: self.is_active(),
            previously_started: self.previously_started,
        }
    }

    /// 로그 스트리밍을 시작합니다.
    ///
    /// 이미 활성 상태이면 아무것도 하지 않고 `false`를 반환합니다. 새 태스크를
    /// 띄웠으면 `true`를 반환합니다.
    pub fn start<R: ContainerRuntime>(
        &mut self,
        ctx: &Arc<TailContext<R>>,
        event_time: SystemTime,
        origin: StartOrigin,
    ) -> bool {
        if self.is_active() {
            debug!(
                container_id = %short_id(&self.container_id),
                service = %self.service,
                "already streaming, start ignored"
            );
            return false;
        }

        let resume = self.previously_started && origin == StartOrigin::Event;
        let options = resume_options(resume, event_time, ctx.config().backlog_lines);

        info!(
            container_id = %short_id(&self.container_id),
            service = %self.service,
            tail = ?options.tail,
            since = ?options.since,
            "starting log stream"
        );

        let cancel = CancellationToken::new();
        let task = tokio::spawn(stream_logs(
            Arc::clone(ctx),
            self.service.clone(),
            self.container_id.clone(),
            options,
            cancel.clone(),
        ));

        self.active = Some(ActiveStream { cancel, task });
        self.previously_started = true;
        counter!(STREAMS_STARTED_TOTAL).increment(1);
        true
    }

    /// 로그 스트리밍을 중지합니다.
    ///
    /// 활성 스트림을 취소했으면 `true`, 이미 비활성이면 `false`를 반환합니다.
    /// 취소는 요청만 하고 태스크 종료를 기다리지 않습니다.
    pub fn stop(&mut self) -> bool {
        let Some(active) = self.active.take() else {
            return false;
        };

        if active.task.is_finished() {
            return false;
        }

        active.cancel.cancel();
        counter!(STREAMS_STOPPED_TOTAL).increment(1);
        info!(
            container_id = %short_id(&self.container_id),
            service = %self.service,
            "log stream stopped"
        );
        true
    }
}

impl Drop for Watcher {
    fn drop(&mut self) {
        if let Some(active) = self.active.take() {
            active.cancel.cancel();
        }
    }
}

/// 스트리밍 태스크 본문
///
/// 청크를 stdout/stderr별로 줄 단위로 잘라 싱크에 넘깁니다. 런타임이
/// `LogStreamOpen`으로 분류한 에러만 치명적 에러로 보고합니다. 읽기 에러는
/// 경고만 남기고 다음 start 이벤트를 기다립니다.
///
/// 스트림이 스스로 끝나면 남은 부분 줄을 내보내고, 취소되면 버립니다.
async fn stream_logs<R: ContainerRuntime>(
    ctx: Arc<TailContext<R>>,
    service: String,
    container_id: String,
    options: LogStreamOptions,
    cancel: CancellationToken,
) {
    let mut stream = ctx.runtime().logs(&container_id, options);
    let mut stdout = LineSplitter::default();
    let mut stderr = LineSplitter::default();

    loop {
        let next = tokio::select! {
            biased;
            () = cancel.cancelled() => {
                debug!(container_id = %short_id(&container_id), "log stream cancelled");
                return;
            }
            next = stream.next() => next,
        };

        match next {
            Some(Ok(chunk)) => {
                let splitter = match chunk.stream {
                    OutputStream::Stdout => &mut stdout,
                    OutputStream::Stderr => &mut stderr,
                };
                let lines = splitter.push(&chunk.bytes);
                for line in &lines {
                    ctx.sink().line(&service, chunk.stream, line);
                }
                counter!(LINES_FORWARDED_TOTAL, LABEL_STREAM => chunk.stream.to_string())
                    .increment(lines.len() as u64);
            }
            Some(Err(e)) => {
                if e.is_cancellation() || cancel.is_cancelled() {
                    debug!(container_id = %short_id(&container_id), "log stream cancelled");
                    return;
                }
                if matches!(e, ContainerTailError::LogStreamOpen { .. }) {
                    counter!(STREAM_FAILURES_TOTAL, LABEL_STAGE => "open").increment(1);
                    error!(
                        container_id = %short_id(&container_id),
                        service = %service,
                        error = %e,
                        "failed to open log stream"
                    );
                    ctx.report_fatal(e);
                    return;
                }

                let err = match e {
                    read @ ContainerTailError::LogStreamRead { .. } => read,
                    other => ContainerTailError::LogStreamRead {
                        container_id: container_id.clone(),
                        reason: other.to_string(),
                    },
                };
                counter!(STREAM_FAILURES_TOTAL, LABEL_STAGE => "read").increment(1);
                warn!(
                    container_id = %short_id(&container_id),
                    service = %service,
                    error = %err,
                    "log stream failed, waiting for next start event"
                );
                break;
            }
            None => {
                debug!(container_id = %short_id(&container_id), "log stream ended");
                break;
            }
        }
    }

    for (output, splitter) in [
        (OutputStream::Stdout, &mut stdout),
        (OutputStream::Stderr, &mut stderr),
    ] {
        if let Some(line) = splitter.finish() {
            ctx.sink().line(&service, output, &line);
            counter!(LINES_FORWARDED_TOTAL, LABEL_STREAM => output.to_string()).increment(1);
        }
    }
}
