mod common;

use common::{named, random_dna};
use genofind_core::store::read_file_header;
use genofind_core::{
    AddressWidth, GenoFind, IndexParams, LoadMode, Offset, Strand, TranslatedIndex,
};

fn build<O: Offset>(params: IndexParams) -> GenoFind<O> {
    GenoFind::from_sequences(
        params,
        vec![
            named("chr1", random_dna(1, 1500)),
            named("empty", Vec::new()),
            named("chr2", random_dna(2, 800)),
        ],
    )
    .unwrap()
}

fn assert_same<O: Offset>(a: &GenoFind<O>, b: &GenoFind<O>, query: &[u8]) {
    assert_eq!(a.params(), b.params());
    assert_eq!(a.shape(), b.shape());
    assert_eq!(a.total_seq_size(), b.total_seq_size());
    assert_eq!(a.list_sizes(), b.list_sizes());
    assert_eq!(a.entry_count(), b.entry_count());
    let names = |g: &GenoFind<O>| {
        g.sources()
            .iter()
            .map(|s| (s.name.clone(), s.start, s.end))
            .collect::<Vec<_>>()
    };
    assert_eq!(names(a), names(b));
    assert_eq!(
        a.find_clumps(query, None).unwrap().clumps,
        b.find_clumps(query, None).unwrap().clumps
    );
}

fn round_trip<O: Offset>(params: IndexParams) {
    let idx = build::<O>(params);
    let query = random_dna(2, 800)[300..400].to_vec();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("test.gfidx");
    idx.save(&path).unwrap();

    let header = read_file_header(&path).unwrap();
    assert_eq!(header.width, O::WIDTH);
    assert!(!header.translated);
    assert_eq!(header.index_count, 1);

    for mode in [LoadMode::Mapped, LoadMode::Streamed] {
        let back = GenoFind::<O>::load(&path, mode).unwrap();
        assert_eq!(back.is_mapped(), mode == LoadMode::Mapped);
        assert!(back.sources().iter().all(|s| s.sequence.is_none()));
        assert_same(&idx, &back, &query);
    }
}

#[test]
fn flat_index_round_trips() {
    let mut params = IndexParams::dna(11);
    params.step_size = 5;
    round_trip::<u32>(params);
}

#[test]
fn segmented_index_round_trips() {
    round_trip::<u32>(IndexParams::dna(14));
    let mut params = IndexParams::dna(11);
    params.seg_size = Some(3);
    round_trip::<u32>(params);
}

#[test]
fn wide_offsets_round_trip() {
    let mut params = IndexParams::dna(11);
    params.step_size = 3;
    round_trip::<u64>(params);
}

#[test]
fn protein_index_round_trips() {
    let idx: GenoFind = GenoFind::from_sequences(
        IndexParams::protein(4),
        vec![named("p1", b"MKVLAWHRDEQMKKLLPPWWYYSTGA".to_vec())],
    )
    .unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("pep.gfidx");
    idx.save(&path).unwrap();
    let back: GenoFind = GenoFind::load(&path, LoadMode::Mapped).unwrap();
    assert_same(&idx, &back, b"MKVLAWHRDEQMKK");
}

#[test]
fn translated_index_round_trips() {
    let mut params = IndexParams::protein(4);
    params.step_size = 1;
    let dna = random_dna(9, 600);
    let idx: TranslatedIndex =
        TranslatedIndex::from_sequences(params, vec![named("g", dna.clone())]).unwrap();
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("six.gfidx");
    idx.save(&path).unwrap();

    let header = read_file_header(&path).unwrap();
    assert!(header.translated);
    assert_eq!(header.index_count, 6);
    assert_eq!(header.width, AddressWidth::Narrow);

    let back: TranslatedIndex = TranslatedIndex::load(&path, LoadMode::Mapped).unwrap();
    for (a, b) in idx.indexes().iter().zip(back.indexes()) {
        assert_eq!(a.total_seq_size(), b.total_seq_size());
        assert_eq!(a.list_sizes(), b.list_sizes());
    }
    let query = &dna[150..330];
    let before = idx.find_clumps_translated(Strand::Forward, query).unwrap();
    let after = back.find_clumps_translated(Strand::Forward, query).unwrap();
    assert_eq!(before.hit_count, after.hit_count);
    assert!(after.hit_count > 0);
}
