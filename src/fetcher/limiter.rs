use std::sync::Arc;

use tokio::sync::{OwnedSemaphorePermit, Semaphore};
use tokio_util::sync::CancellationToken;
use tracing::debug;

use crate::common::api::error::ApiError;

/// 限制同时在途的剧集请求数
///
/// tokio 的 `Semaphore` 是公平的，排队的调用方按到达顺序获得槽位。
#[derive(Debug, Clone)]
pub struct EpisodeLimiter {
    semaphore: Arc<Semaphore>,
    limit: usize,
}

/// 持有期间占用一个槽位，drop 时释放（包括出错、超时和取消）
#[derive(Debug)]
pub struct EpisodeSlot {
    _permit: OwnedSemaphorePermit,
}

impl EpisodeLimiter {
    pub fn new(limit: usize) -> Self {
        let limit = limit.max(1);
        Self {
            semaphore: Arc::new(Semaphore::new(limit)),
            limit,
        }
    }

    pub async fn acquire(&self) -> Result<EpisodeSlot, ApiError> {
        if self.semaphore.available_permits() == 0 {
            debug!("剧集请求槽位已满 ({}), 排队等待", self.limit);
        }
        let permit = Arc::clone(&self.semaphore)
            .acquire_owned()
            .await
            .map_err(|_| ApiError::LimiterClosed)?;
        Ok(EpisodeSlot { _permit: permit })
    }

    // 排队期间被取消的调用方直接离开队列，不占用槽位
    pub async fn acquire_with_cancel(
        &self,
        cancel: Option<&CancellationToken>,
    ) -> Result<EpisodeSlot, ApiError> {
        let Some(token) = cancel else {
            return self.acquire().await;
        };
        tokio::select! {
            biased;
            _ = token.cancelled() => Err(ApiError::Cancelled),
            slot = self.acquire() => slot,
        }
    }

    pub fn active(&self) -> usize {
        self.limit - self.semaphore.available_permits()
    }

    pub fn limit(&self) -> usize {
        self.limit
    }
}
