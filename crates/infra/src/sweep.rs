//! Periodic share-expiry sweep.
//!
//! Walks every account and transitions shares past their `expires_at` to
//! `expired`. Read-time access checks already treat overdue shares as
//! expired; the sweep catches the stored rows up so listings and audits
//! agree with what callers were actually allowed to do.

use std::sync::mpsc;
use std::sync::Arc;
use std::thread;
use std::time::Duration;

use chrono::{DateTime, Utc};
use tracing::{debug, info};

use docuvault_core::{ProfileId, TenantId};
use docuvault_tenancy::{Account, TenantContext, UserProfile};

use crate::directory::Directory;
use crate::sharing::SharingLedger;
use crate::store::TenantStore;

#[derive(Debug, Clone)]
pub struct ShareExpirySweepConfig {
    /// Pause between passes.
    pub poll_interval: Duration,
    /// Thread and logging name.
    pub name: String,
}

impl Default for ShareExpirySweepConfig {
    fn default() -> Self {
        Self {
            poll_interval: Duration::from_secs(30),
            name: "share-expiry-sweep".to_string(),
        }
    }
}

impl ShareExpirySweepConfig {
    pub fn with_poll_interval(mut self, poll_interval: Duration) -> Self {
        self.poll_interval = poll_interval;
        self
    }

    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }
}

/// Handle to control a running sweep.
#[derive(Debug)]
pub struct ShareExpirySweepHandle {
    shutdown: mpsc::Sender<()>,
    join: Option<thread::JoinHandle<()>>,
}

impl ShareExpirySweepHandle {
    /// Request graceful shutdown and wait for the thread to finish.
    pub fn shutdown(mut self) {
        let _ = self.shutdown.send(());
        if let Some(join) = self.join.take() {
            let _ = join.join();
        }
    }
}

pub struct ShareExpirySweep<A, P, L> {
    directory: Arc<Directory<A, P>>,
    ledger: L,
}

impl<A, P, L> ShareExpirySweep<A, P, L>
where
    A: TenantStore<TenantId, Account>,
    P: TenantStore<ProfileId, UserProfile>,
    L: SharingLedger,
{
    pub fn new(directory: Arc<Directory<A, P>>, ledger: L) -> Self {
        Self { directory, ledger }
    }

    /// One pass over all accounts. Each account is visited inside its own
    /// context scope, and the tenant handed to the ledger comes from that
    /// scope. Returns how many shares were transitioned.
    pub fn run_once(&self, now: DateTime<Utc>) -> usize {
        let mut total = 0;
        for account in self.directory.list_accounts() {
            let expired = TenantContext::enter(Some(account.id), || {
                TenantContext::require()
                    .map(|tenant| self.ledger.mark_expired_due(tenant, now))
                    .unwrap_or_default()
            });
            if !expired.is_empty() {
                info!(
                    tenant = %account.id,
                    count = expired.len(),
                    "expired overdue shares"
                );
            }
            total += expired.len();
        }
        total
    }

    /// Spawn the sweep in a background thread.
    pub fn spawn(self, config: ShareExpirySweepConfig) -> ShareExpirySweepHandle
    where
        A: 'static,
        P: 'static,
        L: 'static,
    {
        let (shutdown_tx, shutdown_rx) = mpsc::channel::<()>();

        let name = config.name.clone();
        let join = thread::Builder::new()
            .name(name)
            .spawn(move || {
                sweep_loop(self, config, shutdown_rx);
            })
            .expect("failed to spawn share expiry sweep thread");

        ShareExpirySweepHandle {
            shutdown: shutdown_tx,
            join: Some(join),
        }
    }
}

fn sweep_loop<A, P, L>(
    sweep: ShareExpirySweep<A, P, L>,
    config: ShareExpirySweepConfig,
    shutdown_rx: mpsc::Receiver<()>,
) where
    A: TenantStore<TenantId, Account>,
    P: TenantStore<ProfileId, UserProfile>,
    L: SharingLedger,
{
    info!(sweep = %config.name, "share expiry sweep started");

    loop {
        let expired = sweep.run_once(Utc::now());
        if expired > 0 {
            debug!(sweep = %config.name, expired, "sweep pass complete");
        }

        // recv_timeout doubles as the inter-pass pause, so a shutdown
        // request interrupts the wait instead of riding it out.
        match shutdown_rx.recv_timeout(config.poll_interval) {
            Ok(()) | Err(mpsc::RecvTimeoutError::Disconnected) => break,
            Err(mpsc::RecvTimeoutError::Timeout) => {}
        }
    }

    info!(sweep = %config.name, "share expiry sweep stopped");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::sharing::InMemorySharingLedger;
    use crate::store::InMemoryTenantStore;
    use docuvault_auth::Role;
    use docuvault_core::{DocumentId, UserId};
    use docuvault_documents::{DocumentShare, ShareNotification, SharePermissions, ShareStatus};

    type TestDirectory = Directory<
        InMemoryTenantStore<TenantId, Account>,
        InMemoryTenantStore<ProfileId, UserProfile>,
    >;

    fn seeded() -> (Arc<TestDirectory>, Arc<InMemorySharingLedger>) {
        (
            Arc::new(Directory::new(
                InMemoryTenantStore::new(),
                InMemoryTenantStore::new(),
            )),
            Arc::new(InMemorySharingLedger::new()),
        )
    }

    fn share_expiring_at(
        expires_at: Option<DateTime<Utc>>,
        now: DateTime<Utc>,
    ) -> (DocumentShare, ShareNotification) {
        let share = DocumentShare::new(
            DocumentId::new(),
            UserId::new(),
            UserId::new(),
            SharePermissions::default(),
            String::new(),
            expires_at,
            now,
        )
        .unwrap();
        let draft = share.created_notification();
        let notification =
            ShareNotification::new(draft.recipient, share.id, draft.kind, Some(share.shared_by), now);
        (share, notification)
    }

    #[test]
    fn a_pass_expires_due_shares_in_every_account() {
        let (directory, ledger) = seeded();
        let now = Utc::now();
        let soon = now + chrono::Duration::hours(1);
        let later = now + chrono::Duration::days(7);

        let acme = directory.create_account("Acme", "acme", now).unwrap();
        let globex = directory.create_account("Globex", "globex", now).unwrap();

        let (due_a, note_a) = share_expiring_at(Some(soon), now);
        let (due_b, note_b) = share_expiring_at(Some(soon), now);
        let (not_due, note_c) = share_expiring_at(Some(later), now);
        let (open_ended, note_d) = share_expiring_at(None, now);
        ledger.create(acme.id, due_a.clone(), note_a, now).unwrap();
        ledger.create(globex.id, due_b.clone(), note_b, now).unwrap();
        ledger.create(globex.id, not_due.clone(), note_c, now).unwrap();
        ledger.create(acme.id, open_ended.clone(), note_d, now).unwrap();

        let sweep = ShareExpirySweep::new(directory, ledger.clone());
        let after_expiry = now + chrono::Duration::hours(2);
        assert_eq!(sweep.run_once(after_expiry), 2);

        let stored_a = ledger.get_share(acme.id, &due_a.id).unwrap();
        let stored_b = ledger.get_share(globex.id, &due_b.id).unwrap();
        assert_eq!(stored_a.status, ShareStatus::Expired);
        assert_eq!(stored_b.status, ShareStatus::Expired);
        assert_eq!(
            ledger.get_share(globex.id, &not_due.id).unwrap().status,
            ShareStatus::Pending
        );
        assert_eq!(
            ledger.get_share(acme.id, &open_ended.id).unwrap().status,
            ShareStatus::Pending
        );

        // Second pass finds nothing left to do.
        assert_eq!(sweep.run_once(after_expiry), 0);
    }

    #[test]
    fn sweep_leaves_no_binding_behind() {
        let (directory, ledger) = seeded();
        let now = Utc::now();
        directory.create_account("Acme", "acme", now).unwrap();

        let sweep = ShareExpirySweep::new(directory, ledger);
        sweep.run_once(now);

        assert_eq!(TenantContext::current(), None);
    }

    #[test]
    fn spawned_sweep_shuts_down_cleanly() {
        let (directory, ledger) = seeded();
        let now = Utc::now();
        let acme = directory.create_account("Acme", "acme", now).unwrap();
        let (due, note) = share_expiring_at(Some(now + chrono::Duration::milliseconds(1)), now);
        ledger.create(acme.id, due.clone(), note, now).unwrap();

        let handle = ShareExpirySweep::new(directory, ledger.clone()).spawn(
            ShareExpirySweepConfig::default()
                .with_poll_interval(Duration::from_millis(5))
                .with_name("sweep-under-test"),
        );

        // Give the loop a couple of passes to notice the overdue row.
        let deadline = std::time::Instant::now() + Duration::from_secs(2);
        loop {
            let status = ledger.get_share(acme.id, &due.id).unwrap().status;
            if status == ShareStatus::Expired || std::time::Instant::now() > deadline {
                break;
            }
            thread::sleep(Duration::from_millis(5));
        }

        handle.shutdown();
        assert_eq!(
            ledger.get_share(acme.id, &due.id).unwrap().status,
            ShareStatus::Expired
        );
    }

    #[test]
    fn deactivated_accounts_are_still_swept() {
        // Expiry is bookkeeping, not an access decision, so rows in dark
        // accounts still settle.
        let (directory, ledger) = seeded();
        let now = Utc::now();
        let acme = directory.create_account("Acme", "acme", now).unwrap();
        directory
            .create_profile(UserId::new(), acme.id, Role::Admin, now)
            .unwrap();
        directory.deactivate_account(acme.id, now).unwrap();

        let (due, note) = share_expiring_at(Some(now + chrono::Duration::hours(1)), now);
        ledger.create(acme.id, due.clone(), note, now).unwrap();

        let sweep = ShareExpirySweep::new(directory, ledger.clone());
        assert_eq!(sweep.run_once(now + chrono::Duration::hours(2)), 1);
    }
}
