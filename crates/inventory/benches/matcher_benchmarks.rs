use criterion::{
    BenchmarkId, Criterion, Throughput, black_box, criterion_group, criterion_main,
};

use stocksync_core::{AssortmentId, DocumentId, OrganizationId, PositionId, StoreId};
use stocksync_inventory::{
    DocumentSet, MarketplaceId, Position, PositionMatcher, Product, StockEntryDocument,
};

/// Snapshot of `documents` full documents plus the ids placed in them.
fn full_snapshot(documents: usize) -> (DocumentSet, Vec<AssortmentId>) {
    let mut set = DocumentSet::new(999);
    let mut placed = Vec::with_capacity(documents * 999);

    for _ in 0..documents {
        let doc = StockEntryDocument {
            id: DocumentId::new(),
            organization: OrganizationId::new(),
            store: StoreId::new(),
        };
        let positions: Vec<Position> = (0..999)
            .map(|_| {
                let assortment = AssortmentId::new();
                placed.push(assortment);
                Position {
                    id: PositionId::new(),
                    document_id: doc.id,
                    assortment,
                    quantity: 1.0,
                }
            })
            .collect();
        set.push(doc, positions);
    }

    (set, placed)
}

fn page(ids: &[AssortmentId], size: usize) -> Vec<Product> {
    ids.iter()
        .rev()
        .take(size)
        .enumerate()
        .map(|(i, id)| Product {
            external_id: *id,
            product_id: i as i64,
            marketplace_id: MarketplaceId(1),
            stock_quantity: 4.0,
        })
        .collect()
}

fn bench_classify_worst_case(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_last_position");

    for documents in [1usize, 4, 16] {
        let (set, placed) = full_snapshot(documents);
        let products = page(&placed, 1);

        group.throughput(Throughput::Elements((documents * 999) as u64));
        group.bench_with_input(BenchmarkId::from_parameter(documents), &documents, |b, _| {
            b.iter(|| PositionMatcher::classify(black_box(&set), black_box(products.clone())));
        });
    }

    group.finish();
}

fn bench_classify_page_sizes(c: &mut Criterion) {
    let mut group = c.benchmark_group("classify_page");
    let (set, placed) = full_snapshot(4);

    for page_size in [1usize, 50, 200] {
        let products = page(&placed, page_size);

        group.throughput(Throughput::Elements(page_size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(page_size), &page_size, |b, _| {
            b.iter(|| PositionMatcher::classify(black_box(&set), black_box(products.clone())));
        });
    }

    group.finish();
}

criterion_group!(benches, bench_classify_worst_case, bench_classify_page_sizes);
criterion_main!(benches);
