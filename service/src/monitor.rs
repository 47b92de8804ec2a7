//! Background task that warns about certificates nearing expiry.
//!
//! The monitor wakes every `interval`, asks the service for certificates
//! whose validity ends within `window` (already expired ones are left out)
//! and emits one warning per certificate. Ids it has warned about are kept in
//! memory for the lifetime of the task, so each certificate is reported at
//! most once per run. Nothing is persisted: a restarted monitor reports
//! everything again on its first tick.
//!
//! A failed lookup is logged and the tick skipped; the next tick tries again.

use std::{collections::HashSet, sync::Arc, time::Duration};

use certwatch_common::views::Certificate;
use tokio::{
    task::JoinHandle,
    time::{Instant, MissedTickBehavior, interval_at},
};
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::{
    certificates::{CertificateService, ExpiryOption},
    error::CertificateError,
};

const MIN_INTERVAL: Duration = Duration::from_secs(1);

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    /// Time between scans. The first scan happens one interval after start.
    pub interval: Duration,
    /// How far ahead of now a certificate's expiry counts as "soon".
    pub window: Duration,
}

pub struct ExpiryMonitor {
    service: Arc<dyn CertificateService>,
    config: MonitorConfig,
    alerted: HashSet<String>,
}

impl ExpiryMonitor {
    pub fn new(service: Arc<dyn CertificateService>, config: MonitorConfig) -> Self {
        Self {
            service,
            config,
            alerted: HashSet::new(),
        }
    }

    pub fn has_alerted(&self, id: &str) -> bool {
        self.alerted.contains(id)
    }

    /// Look for expiring certificates once and warn about the ones not seen
    /// before. Returns the newly reported certificates.
    pub async fn scan(&mut self) -> Result<Vec<Certificate>, CertificateError> {
        let certs = self
            .service
            .list_expiring(self.config.window, ExpiryOption::ExcludeExpired)
            .await?;

        if !certs.is_empty() {
            info!(count = certs.len(), "Found expiring certificates");
        }

        let mut fresh = Vec::new();
        for cert in certs {
            if !self.alerted.insert(cert.id.clone()) {
                continue;
            }

            warn!(
                id = %cert.id,
                common_name = %cert.common_name,
                fingerprint = %cert.fingerprint_sha256,
                expires_at = %cert.not_after,
                "Certificate expiring soon"
            );
            fresh.push(cert);
        }

        Ok(fresh)
    }

    /// Scan on every tick until `cancel` fires.
    pub async fn run(mut self, cancel: CancellationToken) {
        let period = self.config.interval.max(MIN_INTERVAL);
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Skip);

        info!(
            interval_secs = period.as_secs(),
            window_secs = self.config.window.as_secs(),
            "Expiry monitor started"
        );

        loop {
            tokio::select! {
                biased;

                _ = cancel.cancelled() => break,
                _ = ticker.tick() => {
                    let outcome = tokio::select! {
                        biased;

                        _ = cancel.cancelled() => break,
                        outcome = self.scan() => outcome,
                    };

                    if let Err(e) = outcome {
                        warn!(error = %e, "Expiry scan failed, retrying on next tick");
                    }
                }
            }
        }

        info!(alerted = self.alerted.len(), "Expiry monitor shutting down");
    }
}

/// Start an [`ExpiryMonitor`] on the current runtime.
pub fn spawn_expiry_monitor(
    service: Arc<dyn CertificateService>,
    config: MonitorConfig,
    cancel: CancellationToken,
) -> JoinHandle<()> {
    let monitor = ExpiryMonitor::new(service, config);
    tokio::spawn(monitor.run(cancel))
}

#[cfg(test)]
mod tests {
    use std::sync::{
        Mutex,
        atomic::{AtomicUsize, Ordering},
    };

    use async_trait::async_trait;
    use certwatch_common::params::CreateCertificateParams;
    use certwatch_db::storage::{StoreError, memory::MemoryStorage};
    use chrono::{DateTime, TimeDelta, Utc};

    use super::*;
    use crate::{certificates::CertificateManager, clock::Clock};

    /// A clock tests can move forward by hand.
    struct ManualClock(Mutex<DateTime<Utc>>);

    impl ManualClock {
        fn advance(&self, by: TimeDelta) {
            *self.0.lock().unwrap() += by;
        }
    }

    impl Clock for ManualClock {
        fn now(&self) -> DateTime<Utc> {
            *self.0.lock().unwrap()
        }
    }

    /// Serves whatever the test last put in `expiring`.
    #[derive(Default)]
    struct FakeService {
        expiring: Mutex<Vec<Certificate>>,
        failing: Mutex<bool>,
        calls: AtomicUsize,
        last_request: Mutex<Option<(Duration, ExpiryOption)>>,
    }

    impl FakeService {
        fn set_expiring(&self, certs: Vec<Certificate>) {
            *self.expiring.lock().unwrap() = certs;
        }

        fn set_failing(&self, failing: bool) {
            *self.failing.lock().unwrap() = failing;
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }
    }

    #[async_trait]
    impl CertificateService for FakeService {
        async fn create(
            &self,
            _params: CreateCertificateParams,
        ) -> Result<Certificate, CertificateError> {
            unimplemented!()
        }

        async fn get(&self, _id: &str) -> Result<Certificate, CertificateError> {
            unimplemented!()
        }

        async fn list(&self) -> Result<Vec<Certificate>, CertificateError> {
            unimplemented!()
        }

        async fn list_expiring(
            &self,
            window: Duration,
            option: ExpiryOption,
        ) -> Result<Vec<Certificate>, CertificateError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_request.lock().unwrap() = Some((window, option));

            if *self.failing.lock().unwrap() {
                return Err(CertificateError::Other(StoreError::Timeout(
                    Duration::from_secs(5),
                )));
            }
            Ok(self.expiring.lock().unwrap().clone())
        }

        async fn delete(&self, _id: &str) -> Result<(), CertificateError> {
            unimplemented!()
        }
    }

    fn cert(id: &str, expires_in: TimeDelta) -> Certificate {
        let now = Utc::now();
        Certificate {
            id: id.into(),
            common_name: format!("{id}.example.com"),
            serial_number: "01".into(),
            issuer: "Example CA".into(),
            not_before: now - TimeDelta::days(90),
            not_after: now + expires_in,
            fingerprint_sha256: "ab".repeat(32),
            created_at: now,
        }
    }

    fn config() -> MonitorConfig {
        MonitorConfig {
            interval: Duration::from_secs(60),
            window: Duration::from_secs(3600),
        }
    }

    #[tokio::test]
    async fn test_alerts_once_per_certificate() {
        let service = Arc::new(FakeService::default());
        let mut monitor = ExpiryMonitor::new(service.clone(), config());

        let a = cert("a", TimeDelta::minutes(30));
        let b = cert("b", TimeDelta::minutes(45));

        // B is not in the service's answer yet.
        service.set_expiring(vec![a.clone()]);
        assert_eq!(monitor.scan().await.unwrap(), vec![a.clone()]);

        // A unchanged: nothing new.
        assert!(monitor.scan().await.unwrap().is_empty());

        // B has moved into the window.
        service.set_expiring(vec![a.clone(), b.clone()]);
        assert_eq!(monitor.scan().await.unwrap(), vec![b.clone()]);
        assert!(monitor.scan().await.unwrap().is_empty());

        assert!(monitor.has_alerted("a"));
        assert!(monitor.has_alerted("b"));
    }

    #[tokio::test]
    async fn test_certificate_entering_window_is_alerted_once() {
        let start = DateTime::from_timestamp(1_700_000_000, 0).unwrap();
        let clock = Arc::new(ManualClock(Mutex::new(start)));
        let service = Arc::new(CertificateManager::with_clock(
            Arc::new(MemoryStorage::new()),
            clock.clone(),
        ));

        let register = |fingerprint: String, not_after: DateTime<Utc>| CreateCertificateParams {
            common_name: "example.com".into(),
            serial_number: "01".into(),
            issuer: "Example CA".into(),
            not_before: Some((not_after - TimeDelta::days(90)).fixed_offset()),
            not_after: Some(not_after.fixed_offset()),
            fingerprint_sha256: fingerprint,
        };
        let a = service
            .create(register("a".repeat(64), start + TimeDelta::minutes(30)))
            .await
            .unwrap();
        let b = service
            .create(register("b".repeat(64), start + TimeDelta::hours(2)))
            .await
            .unwrap();

        let mut monitor = ExpiryMonitor::new(service, config());

        assert_eq!(monitor.scan().await.unwrap(), vec![a.clone()]);
        assert!(monitor.scan().await.unwrap().is_empty());

        // A has now expired and B is 50 minutes out.
        clock.advance(TimeDelta::minutes(70));
        assert_eq!(monitor.scan().await.unwrap(), vec![b.clone()]);
        assert!(monitor.has_alerted(&a.id));
        assert!(monitor.has_alerted(&b.id));
    }

    #[tokio::test]
    async fn test_scan_asks_for_unexpired_within_window() {
        let service = Arc::new(FakeService::default());
        let mut monitor = ExpiryMonitor::new(service.clone(), config());

        monitor.scan().await.unwrap();

        assert_eq!(
            *service.last_request.lock().unwrap(),
            Some((Duration::from_secs(3600), ExpiryOption::ExcludeExpired))
        );
    }

    #[tokio::test]
    async fn test_failed_scan_keeps_state() {
        let service = Arc::new(FakeService::default());
        let mut monitor = ExpiryMonitor::new(service.clone(), config());
        let a = cert("a", TimeDelta::minutes(30));

        service.set_expiring(vec![a.clone()]);
        service.set_failing(true);
        assert!(monitor.scan().await.is_err());
        assert!(!monitor.has_alerted("a"));

        service.set_failing(false);
        assert_eq!(monitor.scan().await.unwrap(), vec![a]);
    }

    #[tokio::test]
    async fn test_fresh_monitor_alerts_again() {
        let service = Arc::new(FakeService::default());
        let a = cert("a", TimeDelta::minutes(30));
        service.set_expiring(vec![a.clone()]);

        let mut first = ExpiryMonitor::new(service.clone(), config());
        assert_eq!(first.scan().await.unwrap().len(), 1);

        let mut restarted = ExpiryMonitor::new(service.clone(), config());
        assert_eq!(restarted.scan().await.unwrap(), vec![a]);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_ticks_until_cancelled() {
        let service = Arc::new(FakeService::default());
        let cancel = CancellationToken::new();
        let handle = spawn_expiry_monitor(service.clone(), config(), cancel.clone());

        tokio::time::sleep(Duration::from_secs(30)).await;
        assert_eq!(service.calls(), 0, "first scan waits a full interval");

        tokio::time::sleep(Duration::from_secs(35)).await;
        assert_eq!(service.calls(), 1);

        // Failures do not stop the loop.
        service.set_failing(true);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.calls(), 2);

        service.set_failing(false);
        tokio::time::sleep(Duration::from_secs(60)).await;
        assert_eq!(service.calls(), 3);

        cancel.cancel();
        handle.await.unwrap();

        tokio::time::sleep(Duration::from_secs(600)).await;
        assert_eq!(service.calls(), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_exits_when_already_cancelled() {
        let service = Arc::new(FakeService::default());
        let cancel = CancellationToken::new();
        cancel.cancel();

        spawn_expiry_monitor(service.clone(), config(), cancel)
            .await
            .unwrap();

        assert_eq!(service.calls(), 0);
    }
}
