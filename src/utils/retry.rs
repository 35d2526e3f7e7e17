use crate::utils::error::{DigestError, Result};
use std::future::Future;
use std::time::Duration;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Backoff {
    /// 每次重試等待相同時間
    Fixed(Duration),
    /// 第 n 次重試 (從 0 起算) 等待 base * 2^(n+1)
    Exponential { base: Duration },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_retries: u32,
    pub backoff: Backoff,
}

impl RetryPolicy {
    pub fn fixed(max_retries: u32, delay: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Fixed(delay),
        }
    }

    pub fn exponential(max_retries: u32, base: Duration) -> Self {
        Self {
            max_retries,
            backoff: Backoff::Exponential { base },
        }
    }

    pub fn delay_for(&self, retry: u32) -> Duration {
        match self.backoff {
            Backoff::Fixed(delay) => delay,
            Backoff::Exponential { base } => base.saturating_mul(2u32.saturating_pow(retry + 1)),
        }
    }

    /// 執行 `op`，遇到 `should_retry` 判定可重試的錯誤時依策略等待後再試
    pub async fn run<T, F, Fut, P>(&self, label: &str, should_retry: P, mut op: F) -> Result<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = Result<T>>,
        P: Fn(&DigestError) -> bool,
    {
        let mut retries = 0;
        loop {
            match op().await {
                Ok(value) => return Ok(value),
                Err(e) if retries < self.max_retries && should_retry(&e) => {
                    let delay = self.delay_for(retries);
                    retries += 1;
                    tracing::warn!(
                        "🔁 {} failed (attempt {}/{}): {}, retrying in {:?}",
                        label,
                        retries,
                        self.max_retries,
                        e,
                        delay
                    );
                    tokio::time::sleep(delay).await;
                }
                Err(e) => return Err(e),
            }
        }
    }
}
