//! 서비스 필터
//!
//! 시작 시 한 번 만들어지고 이후 변경되지 않는 서비스 이름 집합입니다.
//! 이벤트를 처리할지 결정하는 유일한 지점입니다.

use std::collections::HashSet;

/// Immutable whitelist of service names.
#[derive(Debug, Clone)]
pub struct ServiceFilter {
    services: HashSet<String>,
    prefix_width: usize,
}

impl ServiceFilter {
    /// Builds the filter from the configured service list. Duplicates collapse.
    pub fn new<I, S>(services: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let services: HashSet<String> = services.into_iter().map(Into::into).collect();
        let prefix_width = services
            .iter()
            .map(|s| s.chars().count())
            .max()
            .unwrap_or(0);
        Self {
            services,
            prefix_width,
        }
    }

    /// Membership test.
    pub fn contains(&self, service: &str) -> bool {
        self.services.contains(service)
    }

    /// Number of distinct whitelisted services.
    pub fn len(&self) -> usize {
        self.services.len()
    }

    /// True when no service is whitelisted.
    pub fn is_empty(&self) -> bool {
        self.services.is_empty()
    }

    /// Width of the prefix column (longest service name, in chars).
    pub fn prefix_width(&self) -> usize {
        self.prefix_width
    }

    /// Prefixes are only shown when more than one service is tailed.
    pub fn shows_prefix(&self) -> bool {
        self.services.len() > 1
    }
}
