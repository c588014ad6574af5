use std::future::Future;
use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::debug;

use super::error::ApiError;

/// 给请求套上超时和外部取消信号，先触发的一方决定结果
///
/// 超时返回 `ApiError::Timeout`，外部取消返回 `ApiError::Cancelled`。
/// 落败的请求 future 会被直接 drop，底层连接随之中断。
pub async fn with_timeout<F, T>(
    fut: F,
    timeout: Duration,
    cancel: Option<&CancellationToken>,
) -> Result<T, ApiError>
where
    F: Future<Output = Result<T, ApiError>>,
{
    let cancelled = async {
        match cancel {
            Some(token) => token.cancelled().await,
            None => std::future::pending::<()>().await,
        }
    };

    tokio::select! {
        biased;
        _ = cancelled => {
            debug!("请求被调用方取消");
            Err(ApiError::Cancelled)
        }
        _ = tokio::time::sleep(timeout) => {
            debug!("请求超时: {:?}", timeout);
            Err(ApiError::Timeout(timeout))
        }
        result = fut => result,
    }
}
