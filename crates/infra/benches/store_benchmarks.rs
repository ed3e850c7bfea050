use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};

use std::sync::Arc;

use docuvault_core::{TenantId, TenantScoped};
use docuvault_infra::{InMemoryTenantStore, TenantScopedStore, TenantStore};
use docuvault_tenancy::TenantContext;

/// Minimal tenant-owned row, so the numbers measure the store and the
/// context machinery rather than domain payloads.
#[derive(Debug, Clone)]
struct BenchRow {
    tenant_id: TenantId,
    payload: String,
}

impl TenantScoped for BenchRow {
    fn tenant_id(&self) -> TenantId {
        self.tenant_id
    }

    fn assign_tenant(&mut self, tenant_id: TenantId) {
        self.tenant_id = tenant_id;
    }
}

fn row(payload: &str) -> BenchRow {
    BenchRow {
        tenant_id: TenantId::nil(),
        payload: payload.to_string(),
    }
}

type ScopedBenchStore = TenantScopedStore<u32, BenchRow, Arc<InMemoryTenantStore<u32, BenchRow>>>;

fn scoped_store() -> ScopedBenchStore {
    TenantScopedStore::new(Arc::new(InMemoryTenantStore::new()))
}

/// What does deriving the tenant from the context cost over passing it
/// explicitly?
fn bench_scoped_store_overhead(c: &mut Criterion) {
    let mut group = c.benchmark_group("scoped_store_overhead");
    group.sample_size(1000);

    group.bench_function("raw_upsert", |b| {
        let store = InMemoryTenantStore::new();
        let tenant = TenantId::new();
        b.iter(|| {
            store.upsert(tenant, black_box(7u32), row("payload"));
        });
    });

    group.bench_function("scoped_upsert", |b| {
        let store = scoped_store();
        let tenant = TenantId::new();
        b.iter(|| {
            TenantContext::enter(Some(tenant), || {
                store.upsert(black_box(7u32), row("payload")).unwrap();
            });
        });
    });

    group.bench_function("raw_get", |b| {
        let store = InMemoryTenantStore::new();
        let tenant = TenantId::new();
        store.upsert(tenant, 7u32, row("payload"));
        b.iter(|| {
            black_box(store.get(tenant, black_box(&7u32)));
        });
    });

    group.bench_function("scoped_get", |b| {
        let store = scoped_store();
        let tenant = TenantId::new();
        TenantContext::enter(Some(tenant), || {
            store.upsert(7u32, row("payload")).unwrap();
        });
        b.iter(|| {
            TenantContext::enter(Some(tenant), || {
                black_box(store.get(black_box(&7u32)));
            });
        });
    });

    group.finish();
}

/// Listing one tenant's rows as the number of co-resident tenants grows.
/// The interesting property is that the cost tracks the tenant's own row
/// count, not the table's total.
fn bench_tenant_filtered_list(c: &mut Criterion) {
    let mut group = c.benchmark_group("tenant_filtered_list");
    const ROWS_PER_TENANT: u32 = 1000;

    for tenant_count in [1usize, 10, 100].iter() {
        group.throughput(Throughput::Elements(ROWS_PER_TENANT as u64));
        group.bench_with_input(
            BenchmarkId::new("list_one_tenant", tenant_count),
            tenant_count,
            |b, &count| {
                let store = scoped_store();
                let tenants: Vec<TenantId> = (0..count).map(|_| TenantId::new()).collect();
                for tenant in &tenants {
                    TenantContext::enter(Some(*tenant), || {
                        for key in 0..ROWS_PER_TENANT {
                            store.upsert(key, row("payload")).unwrap();
                        }
                    });
                }

                let probe = tenants[0];
                b.iter(|| {
                    TenantContext::enter(Some(probe), || {
                        let rows = store.list();
                        assert_eq!(rows.len(), ROWS_PER_TENANT as usize);
                        black_box(rows);
                    });
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_scoped_store_overhead,
    bench_tenant_filtered_list
);
criterion_main!(benches);
