use std::{convert::Infallible, sync::Arc, time::Duration};

use axum::response::sse::{Event as SseEvent, KeepAlive, Sse};
use tokio::sync::broadcast;
use tokio_stream::{wrappers::BroadcastStream, StreamExt};

use docuvault_core::{DocumentId, FolderId, ProfileId, TenantId, UserId};
use docuvault_documents::{Document, Folder, FolderUserState};
use docuvault_infra::{
    Directory, InMemoryObjectStore, InMemorySharingLedger, InMemoryTenantStore, ObjectStore,
    SharingLedger, TenantScopedStore, TenantStore,
};
use docuvault_tenancy::{Account, UserProfile};

#[cfg(feature = "postgres")]
use docuvault_infra::{PostgresSharingLedger, PostgresTenantStore};
#[cfg(feature = "postgres")]
use sqlx::PgPool;

/// Notification event broadcast to SSE subscribers. Addressed to one
/// recipient inside one tenant; the stream endpoint filters on both.
#[derive(Debug, Clone, serde::Serialize)]
pub struct RealtimeMessage {
    pub tenant_id: TenantId,
    pub recipient: UserId,
    pub topic: String,
    pub payload: serde_json::Value,
}

type SharedStore<K, V> = Arc<dyn TenantStore<K, V>>;
type ScopedStore<K, V> = TenantScopedStore<K, V, SharedStore<K, V>>;

pub type AppDirectory = Directory<SharedStore<TenantId, Account>, SharedStore<ProfileId, UserProfile>>;

/// Everything the handlers touch, behind one `Arc`.
///
/// Stores and the ledger are trait objects so the in-memory and Postgres
/// wirings produce the same type; only `build_services` knows which backend
/// sits underneath.
pub struct AppServices {
    pub directory: Arc<AppDirectory>,
    pub folders: ScopedStore<FolderId, Folder>,
    pub documents: ScopedStore<DocumentId, Document>,
    pub folder_states: ScopedStore<(UserId, FolderId), FolderUserState>,
    pub ledger: Arc<dyn SharingLedger>,
    pub objects: Arc<dyn ObjectStore>,
    pub bucket: String,
    realtime_tx: broadcast::Sender<RealtimeMessage>,
}

impl AppServices {
    pub fn realtime_tx(&self) -> &broadcast::Sender<RealtimeMessage> {
        &self.realtime_tx
    }

    /// Lossy broadcast; a full or subscriber-less channel never blocks the
    /// write path that triggered the event.
    pub fn publish(&self, message: RealtimeMessage) {
        let _ = self.realtime_tx.send(message);
    }
}

pub async fn build_services() -> AppServices {
    let use_persistent = std::env::var("USE_PERSISTENT_STORES")
        .unwrap_or_else(|_| "false".to_string())
        .parse::<bool>()
        .unwrap_or(false);

    if use_persistent {
        #[cfg(feature = "postgres")]
        {
            return build_persistent_services().await;
        }
        #[cfg(not(feature = "postgres"))]
        {
            tracing::warn!(
                "USE_PERSISTENT_STORES=true but postgres feature not enabled, falling back to in-memory"
            );
            return build_in_memory_services();
        }
    }

    build_in_memory_services()
}

fn bucket_name() -> String {
    std::env::var("DOCUVAULT_BUCKET").unwrap_or_else(|_| "docuvault".to_string())
}

fn build_in_memory_services() -> AppServices {
    let accounts: SharedStore<TenantId, Account> =
        Arc::new(InMemoryTenantStore::<TenantId, Account>::new());
    let profiles: SharedStore<ProfileId, UserProfile> =
        Arc::new(InMemoryTenantStore::<ProfileId, UserProfile>::new());
    let folders: SharedStore<FolderId, Folder> =
        Arc::new(InMemoryTenantStore::<FolderId, Folder>::new());
    let documents: SharedStore<DocumentId, Document> =
        Arc::new(InMemoryTenantStore::<DocumentId, Document>::new());
    let folder_states: SharedStore<(UserId, FolderId), FolderUserState> =
        Arc::new(InMemoryTenantStore::<(UserId, FolderId), FolderUserState>::new());

    let bucket = bucket_name();
    let (realtime_tx, _) = broadcast::channel(256);

    AppServices {
        directory: Arc::new(Directory::new(accounts, profiles)),
        folders: TenantScopedStore::new(folders),
        documents: TenantScopedStore::new(documents),
        folder_states: TenantScopedStore::new(folder_states),
        ledger: Arc::new(InMemorySharingLedger::new()),
        objects: Arc::new(InMemoryObjectStore::new(bucket.clone())),
        bucket,
        realtime_tx,
    }
}

#[cfg(feature = "postgres")]
async fn build_persistent_services() -> AppServices {
    let database_url =
        std::env::var("DATABASE_URL").expect("DATABASE_URL must be set when USE_PERSISTENT_STORES=true");

    let pool = PgPool::connect(&database_url)
        .await
        .expect("failed to connect to Postgres");

    let accounts: SharedStore<TenantId, Account> =
        Arc::new(PostgresTenantStore::<TenantId, Account>::new(pool.clone(), "accounts"));
    let profiles: SharedStore<ProfileId, UserProfile> =
        Arc::new(PostgresTenantStore::<ProfileId, UserProfile>::new(pool.clone(), "user_profiles"));
    let folders: SharedStore<FolderId, Folder> =
        Arc::new(PostgresTenantStore::<FolderId, Folder>::new(pool.clone(), "folders"));
    let documents: SharedStore<DocumentId, Document> =
        Arc::new(PostgresTenantStore::<DocumentId, Document>::new(pool.clone(), "documents"));
    let folder_states: SharedStore<(UserId, FolderId), FolderUserState> = Arc::new(
        PostgresTenantStore::<(UserId, FolderId), FolderUserState>::new(pool.clone(), "folder_user_states"),
    );

    let bucket = bucket_name();
    let (realtime_tx, _) = broadcast::channel(256);

    AppServices {
        directory: Arc::new(Directory::new(accounts, profiles)),
        folders: TenantScopedStore::new(folders),
        documents: TenantScopedStore::new(documents),
        folder_states: TenantScopedStore::new(folder_states),
        ledger: Arc::new(PostgresSharingLedger::new(pool)),
        // Object storage stays in-memory until an S3 client is wired in;
        // presigned URLs are minted locally either way.
        objects: Arc::new(InMemoryObjectStore::new(bucket.clone())),
        bucket,
        realtime_tx,
    }
}

/// SSE stream of one user's notification events (used by
/// `/notifications/stream`).
pub fn notification_sse_stream(
    services: Arc<AppServices>,
    tenant_id: TenantId,
    recipient: UserId,
) -> Sse<impl tokio_stream::Stream<Item = Result<SseEvent, Infallible>>> {
    let rx = services.realtime_tx().subscribe();
    let stream = BroadcastStream::new(rx).filter_map(move |msg| match msg {
        Ok(m) if m.tenant_id == tenant_id && m.recipient == recipient => {
            let data = serde_json::to_string(&m.payload).unwrap_or_else(|_| "{}".to_string());
            Some(Ok(SseEvent::default().event(m.topic).data(data)))
        }
        _ => None,
    });

    Sse::new(stream).keep_alive(KeepAlive::new().interval(Duration::from_secs(15)))
}
