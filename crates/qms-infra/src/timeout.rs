//! Timeout handling for database work.

use qms_core::DatabaseConfig;
use std::future::Future;
use std::time::Duration;
use tracing::warn;

/// Timeout error
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TimeoutError {
    /// Duration that was exceeded
    pub duration: Duration,
    /// Operation name
    pub operation: String,
}

impl std::fmt::Display for TimeoutError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "Operation '{}' timed out after {}ms",
            self.operation,
            self.duration.as_millis()
        )
    }
}

impl std::error::Error for TimeoutError {}

/// Either a timeout or an operation error
#[derive(Debug)]
pub enum TimeoutOrError<E> {
    Timeout(TimeoutError),
    Error(E),
}

impl<E: std::fmt::Display> std::fmt::Display for TimeoutOrError<E> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TimeoutOrError::Timeout(e) => write!(f, "{}", e),
            TimeoutOrError::Error(e) => write!(f, "{}", e),
        }
    }
}

impl<E: std::error::Error + 'static> std::error::Error for TimeoutOrError<E> {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            TimeoutOrError::Timeout(e) => Some(e),
            TimeoutOrError::Error(e) => Some(e),
        }
    }
}

/// Deadlines for database queries and connection attempts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeoutPolicy {
    pub query_timeout: Duration,
    pub connect_timeout: Duration,
}

impl Default for TimeoutPolicy {
    fn default() -> Self {
        Self::from_config(&DatabaseConfig::default())
    }
}

impl TimeoutPolicy {
    pub fn new(query_timeout: Duration) -> Self {
        Self {
            query_timeout,
            connect_timeout: DatabaseConfig::default().connect_timeout(),
        }
    }

    pub fn from_config(config: &DatabaseConfig) -> Self {
        Self {
            query_timeout: config.query_timeout(),
            connect_timeout: config.connect_timeout(),
        }
    }

    pub fn with_connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Run a fallible query under the query deadline.
    pub async fn run_query<F, T, E>(&self, operation: &str, fut: F) -> Result<T, TimeoutOrError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.run(operation, self.query_timeout, fut).await
    }

    /// Run a fallible connection attempt under the connect deadline.
    pub async fn run_connect<F, T, E>(
        &self,
        operation: &str,
        fut: F,
    ) -> Result<T, TimeoutOrError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        self.run(operation, self.connect_timeout, fut).await
    }

    async fn run<F, T, E>(
        &self,
        operation: &str,
        timeout: Duration,
        fut: F,
    ) -> Result<T, TimeoutOrError<E>>
    where
        F: Future<Output = Result<T, E>>,
    {
        match tokio::time::timeout(timeout, fut).await {
            Ok(Ok(value)) => Ok(value),
            Ok(Err(e)) => Err(TimeoutOrError::Error(e)),
            Err(_) => {
                warn!(
                    operation = operation,
                    timeout_ms = timeout.as_millis() as u64,
                    "Operation timed out"
                );
                Err(TimeoutOrError::Timeout(TimeoutError {
                    duration: timeout,
                    operation: operation.to_string(),
                }))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_query_within_deadline() {
        let policy = TimeoutPolicy::new(Duration::from_secs(1));
        let result: Result<i32, TimeoutOrError<&str>> =
            policy.run_query("select", async { Ok(42) }).await;
        assert_eq!(result.unwrap(), 42);
    }

    #[tokio::test]
    async fn test_query_error_passes_through() {
        let policy = TimeoutPolicy::new(Duration::from_secs(1));
        let result: Result<i32, TimeoutOrError<&str>> =
            policy.run_query("select", async { Err("syntax error") }).await;
        match result {
            Err(TimeoutOrError::Error(e)) => assert_eq!(e, "syntax error"),
            other => panic!("expected error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_query_timeout() {
        let policy = TimeoutPolicy::new(Duration::from_millis(10));
        let result: Result<i32, TimeoutOrError<&str>> = policy
            .run_query("slow_select", async {
                tokio::time::sleep(Duration::from_millis(200)).await;
                Ok(1)
            })
            .await;
        match result {
            Err(TimeoutOrError::Timeout(e)) => {
                assert_eq!(e.operation, "slow_select");
                assert_eq!(e.duration, Duration::from_millis(10));
                assert_eq!(e.to_string(), "Operation 'slow_select' timed out after 10ms");
            }
            other => panic!("expected timeout, got {:?}", other),
        }
    }

    #[test]
    fn test_policy_from_config() {
        let config = DatabaseConfig::default().with_query_timeout(Duration::from_millis(1500));
        let policy = TimeoutPolicy::from_config(&config);
        assert_eq!(policy.query_timeout, Duration::from_millis(1500));
        assert_eq!(TimeoutPolicy::default().query_timeout, Duration::from_millis(3000));
    }
}
