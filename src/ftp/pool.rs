use std::collections::VecDeque;
use std::ops::{Deref, DerefMut};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use crate::error::FtpError;
use crate::ftp::client::{FtpSession, SessionFactory};

/// Bounded pool of logged-in sessions, opened on first use.
pub struct FtpPool<F> {
    factory: F,
    idle: Mutex<VecDeque<FtpSession>>,
    semaphore: Arc<Semaphore>,
    size: usize,
}

impl<F: SessionFactory> FtpPool<F> {
    pub fn new(factory: F, size: usize) -> Arc<Self> {
        Arc::new(Self {
            factory,
            idle: Mutex::new(VecDeque::with_capacity(size)),
            semaphore: Arc::new(Semaphore::new(size)),
            size,
        })
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn idle_count(&self) -> usize {
        self.idle().len()
    }

    pub fn factory(&self) -> &F {
        &self.factory
    }

    /// Waits for a free slot, then hands out an idle session that still
    /// answers `NOOP` within the factory's reply timeout, or opens a new one.
    pub async fn get(self: &Arc<Self>) -> Result<FtpSessionGuard<F>, FtpError> {
        let permit = self
            .semaphore
            .clone()
            .acquire_owned()
            .await
            .map_err(|_| FtpError::PoolClosed)?;

        loop {
            let Some(mut session) = self.idle().pop_front() else {
                break;
            };
            match session.noop_within(self.factory.reply_timeout()).await {
                Ok(()) => return Ok(self.guard(session, permit)),
                Err(e) => log::warn!("dropping stale ftp session: {e}"),
            }
        }

        let session = self.factory.open_session().await?;
        log::info!("opened new ftp session ({} slots)", self.size);
        Ok(self.guard(session, permit))
    }

    fn guard(self: &Arc<Self>, session: FtpSession, permit: OwnedSemaphorePermit) -> FtpSessionGuard<F> {
        FtpSessionGuard {
            session: Some(session),
            pool: self.clone(),
            _permit: permit,
        }
    }

    fn idle(&self) -> MutexGuard<'_, VecDeque<FtpSession>> {
        self.idle.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

/// A checked-out session. Returns to the pool on drop.
pub struct FtpSessionGuard<F: SessionFactory> {
    session: Option<FtpSession>,
    pool: Arc<FtpPool<F>>,
    _permit: OwnedSemaphorePermit,
}

impl<F: SessionFactory> FtpSessionGuard<F> {
    /// Drops the session instead of returning it, e.g. after a protocol error.
    pub fn discard(mut self) {
        self.session.take();
    }
}

impl<F: SessionFactory> Deref for FtpSessionGuard<F> {
    type Target = FtpSession;

    fn deref(&self) -> &FtpSession {
        self.session.as_ref().expect("session present until drop")
    }
}

impl<F: SessionFactory> DerefMut for FtpSessionGuard<F> {
    fn deref_mut(&mut self) -> &mut FtpSession {
        self.session.as_mut().expect("session present until drop")
    }
}

impl<F: SessionFactory> Drop for FtpSessionGuard<F> {
    fn drop(&mut self) {
        if let Some(session) = self.session.take() {
            self.pool.idle().push_back(session);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ftp::client::FtpConnector;
    use crate::ftp::testing::{FakeFtpServer, descriptor_for};
    use std::time::Duration;

    #[tokio::test]
    async fn new_pool_does_not_connect() {
        let server = FakeFtpServer::start("eva", "pw").await;
        let pool = FtpPool::new(descriptor_for(server.addr, "eva", "pw"), 2);
        assert_eq!(pool.size(), 2);
        assert_eq!(pool.idle_count(), 0);
        assert_eq!(server.connections(), 0);
    }

    #[tokio::test]
    async fn reuses_returned_sessions() {
        let server = FakeFtpServer::start("eva", "pw").await;
        let pool = FtpPool::new(descriptor_for(server.addr, "eva", "pw"), 2);

        {
            let mut session = pool.get().await.unwrap();
            session.noop().await.unwrap();
        }
        assert_eq!(pool.idle_count(), 1);

        let _again = pool.get().await.unwrap();
        assert_eq!(server.connections(), 1);
        assert_eq!(pool.idle_count(), 0);
    }

    #[tokio::test]
    async fn discarded_sessions_are_not_reused() {
        let server = FakeFtpServer::start("eva", "pw").await;
        let pool = FtpPool::new(descriptor_for(server.addr, "eva", "pw"), 1);

        pool.get().await.unwrap().discard();
        assert_eq!(pool.idle_count(), 0);

        let _fresh = pool.get().await.unwrap();
        assert_eq!(server.connections(), 2);
    }

    #[tokio::test]
    async fn concurrent_checkouts_open_separate_sessions() {
        let server = FakeFtpServer::start("eva", "pw").await;
        let pool = FtpPool::new(descriptor_for(server.addr, "eva", "pw"), 2);

        let a = pool.get().await.unwrap();
        let b = pool.get().await.unwrap();
        assert_eq!(server.connections(), 2);
        drop(a);
        drop(b);
        assert_eq!(pool.idle_count(), 2);
    }

    #[tokio::test]
    async fn unresponsive_idle_session_is_replaced() {
        let server = FakeFtpServer::silent_after_login("eva", "pw").await;
        let descriptor = descriptor_for(server.addr, "eva", "pw");
        let connector = FtpConnector::new(Arc::new(descriptor), Duration::from_millis(200));
        let pool = FtpPool::new(connector, 1);

        drop(pool.get().await.unwrap());
        assert_eq!(pool.idle_count(), 1);

        let fresh = tokio::time::timeout(Duration::from_secs(3), pool.get())
            .await
            .expect("get() must not wait on a silent idle session")
            .unwrap();
        assert_eq!(server.connections(), 2);
        drop(fresh);
        assert_eq!(pool.idle_count(), 1);
    }

    #[tokio::test]
    async fn login_failure_propagates() {
        let server = FakeFtpServer::start("eva", "pw").await;
        let pool = FtpPool::new(descriptor_for(server.addr, "eva", "nope"), 1);
        assert!(matches!(pool.get().await, Err(FtpError::AuthFailed { .. })));
        // the slot is released after the failure
        assert!(matches!(pool.get().await, Err(FtpError::AuthFailed { .. })));
    }
}
