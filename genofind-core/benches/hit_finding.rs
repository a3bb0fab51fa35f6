use criterion::{black_box, criterion_group, criterion_main, Criterion};
use genofind_core::{GenoFind, IndexParams};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};

fn generate_genome(seed: u64, length: usize) -> Vec<u8> {
    let mut rng = StdRng::seed_from_u64(seed);
    (0..length).map(|_| b"acgt"[rng.gen_range(0..4)]).collect()
}

fn build(params: IndexParams, genome: &[u8]) -> GenoFind {
    GenoFind::from_sequences(params, vec![("chr1".to_string(), genome.to_vec())])
        .expect("index build")
}

fn bench_build(c: &mut Criterion) {
    let genome = generate_genome(1, 1_000_000);

    c.bench_function("build_1mb_tile11", |b| {
        b.iter(|| black_box(build(IndexParams::dna(11), black_box(&genome))))
    });
}

fn bench_hit_modes(c: &mut Criterion) {
    let genome = generate_genome(2, 1_000_000);
    let query = genome[400_000..401_000].to_vec();

    let mut group = c.benchmark_group("find_clumps_1kb");

    let flat = build(IndexParams::dna(11), &genome);
    group.bench_function("flat_exact", |b| {
        b.iter(|| black_box(flat.find_clumps(black_box(&query), None)))
    });

    let mut params = IndexParams::dna(11);
    params.allow_one_mismatch = true;
    let near = build(params, &genome);
    group.bench_function("flat_near_miss", |b| {
        b.iter(|| black_box(near.find_clumps(black_box(&query), None)))
    });

    let segmented = build(IndexParams::dna(14), &genome);
    group.bench_function("segmented_exact", |b| {
        b.iter(|| black_box(segmented.find_clumps(black_box(&query), None)))
    });

    group.finish();
}

fn bench_pcr(c: &mut Criterion) {
    let genome = generate_genome(3, 1_000_000);
    let index = build(IndexParams::dna(10), &genome);
    let forward = genome[500_000..500_020].to_vec();
    let reverse = genofind_core::tile::reverse_complement(&genome[500_400..500_420]);

    c.bench_function("pcr_primer_pair", |b| {
        b.iter(|| black_box(index.find_primer_pairs(&forward, &reverse, 100, 1000)))
    });
}

criterion_group!(benches, bench_build, bench_hit_modes, bench_pcr);
criterion_main!(benches);
