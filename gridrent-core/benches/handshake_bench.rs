use criterion::{Criterion, black_box, criterion_group, criterion_main};

use gridrent_core::identity::{IdentityVerifier, Sha256IdentityVerifier};
use gridrent_core::pricing;
use gridrent_core::types::{ResourceKind, Tier};

fn bench_generate_proof(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let verifier = Sha256IdentityVerifier::new("bench-identity-key");

    c.bench_function("identity_generate_proof", |b| {
        b.iter(|| rt.block_on(verifier.generate_proof()).unwrap());
    });
}

fn bench_verify_proof(c: &mut Criterion) {
    let rt = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let verifier = Sha256IdentityVerifier::new("bench-identity-key");
    let proof = rt.block_on(verifier.generate_proof()).unwrap();

    c.bench_function("identity_verify_proof", |b| {
        b.iter(|| verifier.verify(black_box(&proof)));
    });
}

fn bench_rate_lookup(c: &mut Criterion) {
    c.bench_function("pricing_effective_rate", |b| {
        b.iter(|| {
            pricing::effective_rate(
                black_box(Tier::Performance),
                black_box(ResourceKind::Gpu),
                black_box(Some(16)),
            )
        });
    });
}

criterion_group!(
    benches,
    bench_generate_proof,
    bench_verify_proof,
    bench_rate_lookup
);
criterion_main!(benches);
