//! watcher 레지스트리
//!
//! 컨테이너 ID별로 [`Watcher`]를 하나씩 보관합니다. 부트스트랩 태스크와 이벤트
//! 태스크가 동시에 접근하므로 맵 전체를 하나의 `tokio::sync::Mutex`로 보호하고,
//! 조회/생성과 상태 전이를 같은 잠금 안에서 수행합니다.
//!
//! 한 번 등록된 watcher는 제거하지 않습니다. 같은 컨테이너가 다시 시작되면
//! `previously_started` 기록을 이용해 since 기반으로 이어 붙입니다.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::SystemTime;

use metrics::gauge;
use tailpost_core::metrics::WATCHERS_REGISTERED;
use tailpost_core::types::short_id;
use tokio::sync::Mutex;
use tracing::debug;

use crate::context::TailContext;
use crate::runtime::ContainerRuntime;
use crate::watcher::{StartOrigin, Watcher, WatcherStatus};

/// 컨테이너 ID -> watcher 맵
pub struct WatcherRegistry<R: ContainerRuntime> {
    ctx: Arc<TailContext<R>>,
    watchers: Mutex<HashMap<String, Watcher>>,
}

impl<R: ContainerRuntime> WatcherRegistry<R> {
    /// 빈 레지스트리를 생성합니다.
    pub fn new(ctx: Arc<TailContext<R>>) -> Self {
        Self {
            ctx,
            watchers: Mutex::new(HashMap::new()),
        }
    }

    /// 공유 컨텍스트
    pub fn context(&self) -> &Arc<TailContext<R>> {
        &self.ctx
    }

    /// watcher를 조회하고, 없으면 비활성 상태로 생성합니다.
    pub async fn get_or_create(&self, container_id: &str, service: &str) -> WatcherStatus {
        let mut watchers = self.watchers.lock().await;
        ensure(&mut watchers, container_id, service);
        match watchers.get(container_id) {
            Some(watcher) => watcher.status(),
            None => Watcher::new(service, container_id).status(),
        }
    }

    /// watcher를 조회합니다.
    pub async fn get(&self, container_id: &str) -> Option<WatcherStatus> {
        self.watchers
            .lock()
            .await
            .get(container_id)
            .map(Watcher::status)
    }

    /// 컨테이너의 스트리밍을 시작합니다. 새 태스크를 띄웠으면 `true`.
    pub async fn start(
        &self,
        container_id: &str,
        service: &str,
        event_time: SystemTime,
        origin: StartOrigin,
    ) -> bool {
        let mut watchers = self.watchers.lock().await;
        ensure(&mut watchers, container_id, service);
        let Some(watcher) = watchers.get_mut(container_id) else {
            return false;
        };
        watcher.start(&self.ctx, event_time, origin)
    }

    /// 컨테이너의 스트리밍을 중지합니다. 활성 스트림을 멈췄으면 `true`.
    ///
    /// 등록되지 않은 컨테이너는 새로 등록하지 않습니다.
    pub async fn stop(&self, container_id: &str) -> bool {
        match self.watchers.lock().await.get_mut(container_id) {
            Some(watcher) => watcher.stop(),
            None => {
                debug!(container_id = %short_id(container_id), "stop for unknown container ignored");
                false
            }
        }
    }

    /// 모든 활성 스트림을 중지하고 중지한 개수를 반환합니다.
    pub async fn stop_all(&self) -> usize {
        self.watchers
            .lock()
            .await
            .values_mut()
            .map(Watcher::stop)
            .filter(|stopped| *stopped)
            .count()
    }

    /// 등록된 watcher 수
    pub async fn len(&self) -> usize {
        self.watchers.lock().await.len()
    }

    /// 등록된 watcher가 없는지
    pub async fn is_empty(&self) -> bool {
        self.watchers.lock().await.is_empty()
    }

    /// 스트리밍 중인 watcher 수
    pub async fn active_count(&self) -> usize {
        self.watchers
            .lock()
            .await
            .values()
            .filter(|w| w.is_active())
            .count()
    }

    /// 전체 watcher 상태 (컨테이너 ID 순)
    pub async fn snapshot(&self) -> Vec<WatcherStatus> {
        let mut statuses: Vec<_> = self
            .watchers
            .lock()
            .await
            .values()
            .map(Watcher::status)
            .collect();
        statuses.sort_by(|a, b| a.container_id.cmp(&b.container_id));
        statuses
    }
}

fn ensure(watchers: &mut HashMap<String, Watcher>, container_id: &str, service: &str) {
    if watchers.contains_key(container_id) {
        return;
    }
    debug!(
        container_id = %short_id(container_id),
        service = %service,
        "registering watcher"
    );
    watchers.insert(container_id.to_owned(), Watcher::new(service, container_id));
    gauge!(WATCHERS_REGISTERED).set(watchers.len() as f64);
}
