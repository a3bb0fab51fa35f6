mod common;

use common::{named, random_dna};
use genofind_core::tile::{dna_tile, reverse_complement};
use genofind_core::{GenoFind, HitMode, IndexParams};
use std::collections::BTreeSet;

fn two_chromosomes(params: IndexParams) -> (GenoFind, Vec<u8>, Vec<u8>) {
    let chr1 = random_dna(1, 1000);
    let chr2 = random_dna(2, 1000);
    let idx = GenoFind::from_sequences(
        params,
        vec![named("chr1", chr1.clone()), named("chr2", chr2.clone())],
    )
    .unwrap();
    (idx, chr1, chr2)
}

fn hit_set(idx: &GenoFind, query: &[u8]) -> BTreeSet<(usize, u64)> {
    idx.find_hits(query, None, None)
        .into_iter()
        .map(|h| (h.q_start, h.t_start))
        .collect()
}

#[test]
fn query_from_chr1_forms_one_clump() {
    let (idx, chr1, _) = two_chromosomes(IndexParams::dna(11));
    assert_eq!(idx.hit_mode(), HitMode::FlatExact);

    let search = idx.find_clumps(&chr1[198..242], None).unwrap();
    assert_eq!(search.hit_count, 4);
    assert_eq!(search.clumps.len(), 1);
    let clump = &search.clumps[0];
    assert_eq!((clump.q_start, clump.q_end), (0, 44));
    assert_eq!((clump.t_start, clump.t_end), (198, 242));
    assert_eq!(clump.source, 0);
    assert_eq!(clump.query_coverage, 44);
    assert_eq!(idx.clump_summary(clump), "0-44 chr1 198-242, hits 4");
}

/// A query off the tile grid needs every position indexed (step 1) to
/// hit each of its tiles.
#[test]
fn unaligned_query_with_step_one_forms_one_clump() {
    let mut params = IndexParams::dna(11);
    params.step_size = 1;
    let (idx, chr1, _) = two_chromosomes(params);

    let search = idx.find_clumps(&chr1[200..225], None).unwrap();
    assert!(search.hit_count >= 15);
    let clump = &search.clumps[0];
    assert_eq!((clump.q_start, clump.q_end), (0, 25));
    assert_eq!((clump.t_start, clump.t_end), (200, 225));
    assert_eq!(clump.source, 0);
    assert_eq!(clump.hit_count, 15);
    assert_eq!(clump.query_coverage, 25);
}

#[test]
fn clumps_in_later_sources_use_global_offsets() {
    let (idx, _, chr2) = two_chromosomes(IndexParams::dna(11));
    let search = idx.find_clumps(&chr2[330..374], None).unwrap();
    assert_eq!(search.clumps.len(), 1);
    let clump = &search.clumps[0];
    assert_eq!(clump.source, 1);
    assert_eq!((clump.t_start, clump.t_end), (1330, 1374));
    assert_eq!(idx.clump_summary(clump), "0-44 chr2 330-374, hits 4");
}

#[test]
fn region_search_reports_local_coordinates() {
    let (idx, _, chr2) = two_chromosomes(IndexParams::dna(11));
    let (source, _) = idx.find_named_source("chr2").unwrap();
    let hits = idx
        .find_hits_in_region(&chr2[330..374], None, source, 340, 360)
        .unwrap();
    let got: Vec<_> = hits.iter().map(|h| (h.q_start, h.t_start)).collect();
    assert_eq!(got, vec![(11, 341), (22, 352)]);
    assert!(idx.find_hits_in_region(b"acgt", None, 5, 0, 10).is_err());
}

#[test]
fn clumps_are_ranked_by_query_coverage() {
    let (idx, chr1, _) = two_chromosomes(IndexParams::dna(11));
    let mut query = chr1[198..242].to_vec();
    query.extend_from_slice(&chr1[605..627]);
    let search = idx.find_clumps(&query, None).unwrap();
    assert_eq!(search.clumps.len(), 2);
    assert_eq!(search.clumps[0].t_start, 198);
    assert_eq!(search.clumps[0].query_coverage, 44);
    assert_eq!(search.clumps[1].t_start, 605);
    assert_eq!(search.clumps[1].query_coverage, 22);
    assert_eq!(search.clumps[1].q_start, 44);
}

#[test]
fn forced_segmentation_finds_the_same_hits() {
    let (flat, chr1, chr2) = two_chromosomes(IndexParams::dna(11));
    let mut params = IndexParams::dna(11);
    params.seg_size = Some(3);
    let (seg, _, _) = two_chromosomes(params);
    assert_eq!(seg.hit_mode(), HitMode::SegmentedExact);

    for query in [&chr1[198..242], &chr2[10..300], &chr1[500..520]] {
        assert_eq!(hit_set(&flat, query), hit_set(&seg, query));
        assert_eq!(
            flat.find_clumps(query, None).unwrap().clumps,
            seg.find_clumps(query, None).unwrap().clumps
        );
    }
}

#[test]
fn layouts_agree_on_overused_tiles() {
    // 297 random bases, five copies of one tile on the tile grid, then more
    // random sequence
    let unit = random_dna(5, 11);
    let mut seq = random_dna(7, 297);
    seq.extend(unit.repeat(5));
    seq.extend(random_dna(8, 248));
    let tile = dna_tile(&unit).unwrap() as usize;

    let mut params = IndexParams::dna(11);
    params.max_pat = 3;
    let flat: GenoFind =
        GenoFind::from_sequences(params.clone(), vec![named("rep", seq.clone())]).unwrap();
    params.seg_size = Some(3);
    let seg: GenoFind =
        GenoFind::from_sequences(params, vec![named("rep", seq.clone())]).unwrap();
    assert_eq!(flat.list_sizes()[tile], 0);

    let query = &seq[280..380];
    let flat_search = flat.find_clumps(query, None).unwrap();
    let seg_search = seg.find_clumps(query, None).unwrap();
    assert_eq!(flat_search.hit_count, seg_search.hit_count);
    assert_eq!(flat_search.clumps, seg_search.clumps);
    assert!(seg
        .find_hits(query, None, None)
        .iter()
        .all(|h| h.t_start < 297 || h.t_start >= 352));
    assert!(seg.find_hits(&unit, None, None).is_empty());
}

#[test]
fn long_tiles_use_the_segmented_layout() {
    let (idx, chr1, _) = two_chromosomes(IndexParams::dna(14));
    assert!(idx.is_segmented());
    let search = idx.find_clumps(&chr1[140..210], None).unwrap();
    assert_eq!(search.clumps.len(), 1);
    let clump = &search.clumps[0];
    assert_eq!(clump.hit_count, 5);
    assert_eq!((clump.t_start, clump.t_end), (140, 210));
}

fn substitute(seq: &mut [u8], pos: usize) {
    seq[pos] = if seq[pos] == b'a' { b'c' } else { b'a' };
}

#[test]
fn near_miss_tolerates_one_substitution_per_tile() {
    let (exact, chr1, _) = two_chromosomes(IndexParams::dna(11));
    let mut params = IndexParams::dna(11);
    params.allow_one_mismatch = true;
    let (near, _, _) = two_chromosomes(params);
    assert_eq!(near.hit_mode(), HitMode::FlatNearMiss);

    let mut query = chr1[198..242].to_vec();
    substitute(&mut query, 5);
    assert!(!hit_set(&exact, &query).contains(&(0, 198)));
    let hits = hit_set(&near, &query);
    for expected in [(0, 198), (11, 209), (22, 220), (33, 231)] {
        assert!(hits.contains(&expected), "missing {:?}", expected);
    }
}

#[test]
fn segmented_near_miss_covers_head_and_tail() {
    let mut params = IndexParams::dna(14);
    params.allow_one_mismatch = true;
    let (idx, chr1, _) = two_chromosomes(params);
    assert_eq!(idx.hit_mode(), HitMode::SegmentedNearMiss);

    let mut query = chr1[140..210].to_vec();
    substitute(&mut query, 1);
    substitute(&mut query, 14 + 13);
    let hits = hit_set(&idx, &query);
    for q in [0, 14, 28, 42, 56] {
        assert!(hits.contains(&(q, 140 + q as u64)), "missing tile at {}", q);
    }
}

#[test]
fn overused_tiles_are_not_indexed() {
    let unit = random_dna(5, 11);
    let mut seq = unit.repeat(4);
    seq.extend(random_dna(6, 300));
    let tile = dna_tile(&unit).unwrap() as usize;

    let mut params = IndexParams::dna(11);
    params.max_pat = 3;
    let idx: GenoFind = GenoFind::from_sequences(params, vec![named("rep", seq.clone())]).unwrap();
    assert_eq!(idx.list_sizes()[tile], 0);
    assert!(idx.find_hits(&unit, None, None).is_empty());

    let idx: GenoFind =
        GenoFind::from_sequences(IndexParams::dna(11), vec![named("rep", seq)]).unwrap();
    assert_eq!(idx.list_sizes()[tile], 4);
    assert_eq!(idx.find_hits(&unit, None, None).len(), 4);
}

#[test]
fn pcr_product_in_second_source() {
    let (idx, _, chr2) = two_chromosomes(IndexParams::dna(10));
    let forward = &chr2[100..120];
    let reverse = reverse_complement(&chr2[300..320]);
    let products = idx.find_primer_pairs(forward, &reverse, 150, 250).unwrap();
    assert_eq!(products.len(), 1);
    assert_eq!(products[0].source, 1);
    assert_eq!((products[0].t_start, products[0].t_end), (1100, 1320));
}
