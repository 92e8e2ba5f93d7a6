use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use indexmap::IndexMap;
use odbgroup::bio::alignment::global::GlobalAligner;
use odbgroup::bio::sequence::{SequenceRecord, STANDARD_AMINO_ACIDS};
use odbgroup::core::identity::{kmer_identity, msa_identity, IdentityEngine, IdentityMethod};
use odbgroup::tools::testing::MockAligner;
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use std::hint::black_box;

fn random_protein(rng: &mut StdRng, length: usize) -> Vec<u8> {
    (0..length)
        .map(|_| STANDARD_AMINO_ACIDS[rng.gen_range(0..20)])
        .collect()
}

/// Substitute roughly `rate` of the residues
fn diverge(rng: &mut StdRng, sequence: &[u8], rate: f64) -> Vec<u8> {
    sequence
        .iter()
        .map(|&c| {
            if rng.gen_bool(rate) {
                STANDARD_AMINO_ACIDS[rng.gen_range(0..20)]
            } else {
                c
            }
        })
        .collect()
}

fn ortholog_group(size: usize, length: usize) -> (SequenceRecord, IndexMap<String, SequenceRecord>) {
    let mut rng = StdRng::seed_from_u64(42);
    let query = SequenceRecord::new("9606_0:000000", random_protein(&mut rng, length));
    let mut members = IndexMap::new();
    members.insert(query.id.clone(), query.clone());
    for i in 1..size {
        let id = format!("{}_0:{:06x}", 10000 + i, i);
        let sequence = diverge(&mut rng, &query.sequence, 0.05 + (i as f64 / size as f64) * 0.4);
        members.insert(id.clone(), SequenceRecord::new(id, sequence));
    }
    (query, members)
}

fn bench_global_alignment(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity/global");
    let mut rng = StdRng::seed_from_u64(7);
    let aligner = GlobalAligner::default();

    for length in [100, 350, 1000] {
        let a = random_protein(&mut rng, length);
        let b = diverge(&mut rng, &a, 0.2);
        group.bench_with_input(BenchmarkId::from_parameter(length), &length, |bench, _| {
            bench.iter(|| aligner.summarize(black_box(&a), black_box(&b)).percent_identity());
        });
    }

    group.finish();
}

fn bench_row_identity(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity/rows");
    let mut rng = StdRng::seed_from_u64(11);
    let query = random_protein(&mut rng, 1000);
    let candidate = diverge(&mut rng, &query, 0.3);

    group.bench_function("msa_row", |b| {
        b.iter(|| msa_identity(black_box(&query), black_box(&candidate)))
    });
    for k in [3, 5] {
        group.bench_with_input(BenchmarkId::new("kmer", k), &k, |b, &k| {
            b.iter(|| kmer_identity(black_box(&query), black_box(&candidate), k))
        });
    }

    group.finish();
}

fn bench_group_scoring(c: &mut Criterion) {
    let mut group = c.benchmark_group("identity/group");
    group.sample_size(10);
    let aligner = MockAligner::new();

    for size in [20, 80] {
        let (query, members) = ortholog_group(size, 350);
        for method in [IdentityMethod::Pairwise, IdentityMethod::Kmer] {
            let engine = IdentityEngine::new(method, &aligner);
            group.bench_with_input(
                BenchmarkId::new(method.to_string(), size),
                &size,
                |b, _| b.iter(|| engine.score(black_box(&members), &query, "bench")),
            );
        }
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_global_alignment,
    bench_row_identity,
    bench_group_scoring
);
criterion_main!(benches);
