//! Hierarchical request timeouts.
//!
//! A [`Timeout`] is a declarative policy: an overall `total` budget plus
//! finer ceilings for connection establishment and socket reads. The
//! orchestrator opens one [`TimeoutScope`] per request; the scope pins the
//! `total` deadline at start time so that every suspension point of the
//! request, redirects included, races the same wall-clock instant. What is
//! left of the budget travels into the [`Response`][crate::Response] as a
//! [`Budget`] so body reads stay under the same deadline.

use std::future::Future;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::time::Instant;
use url::Url;

use crate::error;

/// Timeout policy for a single request, or for every request of a client.
///
/// `None` fields are unbounded. The default carries a 300 second total and
/// no finer ceilings.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timeout {
    /// Budget for the whole operation: connecting, sending, waiting for the
    /// response head, every redirect hop, and reading the body.
    pub total: Option<Duration>,
    /// Ceiling on acquiring a connection from the provider, including any
    /// time spent waiting for a pool slot.
    pub connect: Option<Duration>,
    /// Ceiling on establishing a single new connection to a peer. Handed to
    /// the provider, which is closer to the socket.
    pub sock_connect: Option<Duration>,
    /// Ceiling on a single read from the peer. Handed to the provider via
    /// the response read parameters.
    pub sock_read: Option<Duration>,
}

impl Timeout {
    /// No ceilings at all.
    pub const fn off() -> Timeout {
        Timeout {
            total: None,
            connect: None,
            sock_connect: None,
            sock_read: None,
        }
    }

    /// A policy bounding only the total duration.
    pub const fn total_only(total: Duration) -> Timeout {
        Timeout {
            total: Some(total),
            connect: None,
            sock_connect: None,
            sock_read: None,
        }
    }
}

impl Default for Timeout {
    fn default() -> Timeout {
        // 5 minutes, matching the long-standing client default.
        Timeout::total_only(Duration::from_secs(300))
    }
}

/// Cancellation handle shared between a scope and the budget it leaves
/// behind. Cancelling is idempotent.
#[derive(Clone, Debug)]
pub struct ScopeHandle {
    armed: Arc<AtomicBool>,
}

impl ScopeHandle {
    fn new() -> ScopeHandle {
        ScopeHandle {
            armed: Arc::new(AtomicBool::new(true)),
        }
    }

    pub fn cancel(&self) {
        self.armed.store(false, Ordering::SeqCst);
    }

    pub fn is_cancelled(&self) -> bool {
        !self.armed.load(Ordering::SeqCst)
    }
}

/// One request's view of its `total` budget: a fixed deadline pinned when
/// the request started.
#[derive(Debug)]
pub(crate) struct TimeoutScope {
    deadline: Option<Instant>,
    handle: ScopeHandle,
}

impl TimeoutScope {
    pub(crate) fn start(policy: &Timeout) -> TimeoutScope {
        TimeoutScope {
            deadline: policy.total.map(|d| Instant::now() + d),
            handle: ScopeHandle::new(),
        }
    }

    pub(crate) fn handle(&self) -> ScopeHandle {
        self.handle.clone()
    }

    /// Races `fut` against the total deadline, reporting expiry as a
    /// request timeout for `url`.
    pub(crate) async fn within<T, F>(&self, url: &Url, fut: F) -> crate::Result<T>
    where
        F: Future<Output = crate::Result<T>>,
    {
        match self.deadline {
            Some(deadline) if !self.handle.is_cancelled() => {
                match tokio::time::timeout_at(deadline, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(error::timed_out(url.clone())),
                }
            }
            _ => fut.await,
        }
    }

    /// The remaining budget, for handing into a response.
    pub(crate) fn budget(&self) -> Budget {
        Budget {
            deadline: self.deadline,
            handle: self.handle.clone(),
        }
    }
}

/// What is left of a request's total budget once the head has arrived.
/// Body reads race the same deadline; a cancelled budget no longer bounds
/// anything.
#[derive(Clone, Debug)]
pub(crate) struct Budget {
    deadline: Option<Instant>,
    handle: ScopeHandle,
}

impl Budget {
    pub(crate) async fn within<T, F>(&self, url: &Url, fut: F) -> crate::Result<T>
    where
        F: Future<Output = crate::Result<T>>,
    {
        match self.deadline {
            Some(deadline) if !self.handle.is_cancelled() => {
                match tokio::time::timeout_at(deadline, fut).await {
                    Ok(res) => res,
                    Err(_) => Err(error::timed_out(url.clone())),
                }
            }
            _ => fut.await,
        }
    }

    pub(crate) fn cancel(&self) {
        self.handle.cancel();
    }
}

/// An independent ceiling on one phase of a request. The timer never
/// outlives the phase. `Err` means the ceiling fired.
pub(crate) async fn ceil<F>(limit: Option<Duration>, fut: F) -> Result<F::Output, error::TimedOut>
where
    F: Future,
{
    match limit {
        Some(limit) => tokio::time::timeout(limit, fut)
            .await
            .map_err(|_| error::TimedOut),
        None => Ok(fut.await),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_policy() {
        let t = Timeout::default();
        assert_eq!(t.total, Some(Duration::from_secs(300)));
        assert_eq!(t.connect, None);
        assert_eq!(t.sock_connect, None);
        assert_eq!(t.sock_read, None);
    }

    #[test]
    fn cancel_is_idempotent() {
        let handle = ScopeHandle::new();
        assert!(!handle.is_cancelled());
        handle.cancel();
        handle.cancel();
        assert!(handle.is_cancelled());
    }

    #[tokio::test]
    async fn scope_deadline_is_pinned_at_start() {
        let scope = TimeoutScope::start(&Timeout::total_only(Duration::from_millis(40)));
        let url = Url::parse("http://example.local/").unwrap();

        // First phase eats most of the budget.
        scope
            .within(&url, async {
                tokio::time::sleep(Duration::from_millis(25)).await;
                Ok(())
            })
            .await
            .unwrap();

        // The second phase does not get a fresh 40ms.
        let err = scope
            .within(&url, async {
                tokio::time::sleep(Duration::from_millis(60)).await;
                Ok(())
            })
            .await
            .unwrap_err();
        assert!(err.is_timeout());
        assert_eq!(err.url().map(Url::as_str), Some("http://example.local/"));
    }

    #[tokio::test]
    async fn cancelled_budget_stops_bounding() {
        let scope = TimeoutScope::start(&Timeout::total_only(Duration::from_millis(10)));
        let url = Url::parse("http://example.local/").unwrap();
        let budget = scope.budget();
        budget.cancel();

        budget
            .within(&url, async {
                tokio::time::sleep(Duration::from_millis(30)).await;
                Ok(())
            })
            .await
            .unwrap();
    }

    #[tokio::test]
    async fn ceil_fires_independently() {
        assert!(ceil(Some(Duration::from_millis(5)), async {
            tokio::time::sleep(Duration::from_millis(50)).await;
        })
        .await
        .is_err());

        assert!(ceil(None, async { 7 }).await.is_ok());
    }
}
