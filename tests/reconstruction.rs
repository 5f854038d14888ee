use cdsprot::codon;
use cdsprot::config::ReconstructionConfig;
use cdsprot::error::Error;
use cdsprot::feature::{FeatureId, FeatureKind, FeatureTree, GeneFeature};
use cdsprot::manager::ProteinSequenceManager;
use cdsprot::protein::ProteinSequenceEntry;
use cdsprot::source::{InMemoryAnnotations, InMemoryReference};
use cdsprot::strand::Strand;
use cdsprot::variant::Variation;
use cdsprot::window::TrackWindow;

const CHROM: &str = "chr1";
const REFERENCE_ID: u64 = 1;

type Manager = ProteinSequenceManager<InMemoryAnnotations, InMemoryReference>;

/// (start, end, frame) of one CDS block, listed in genomic order.
type Block = (i32, i32, u8);

struct Built {
    tree: FeatureTree,
    transcripts: Vec<FeatureId>,
    cds: Vec<Vec<FeatureId>>,
}

fn build(transcripts: &[(&str, Strand, &[Block])]) -> Built {
    let mut tree = FeatureTree::new();
    let mut transcript_ids = Vec::new();
    let mut cds_ids = Vec::new();
    for (name, strand, blocks) in transcripts {
        let start = blocks.iter().map(|b| b.0).min().unwrap();
        let end = blocks.iter().map(|b| b.1).max().unwrap();
        let gene = tree.add_root(
            GeneFeature::new(FeatureKind::Gene, CHROM, start, end, *strand)
                .with_name(format!("{name}-gene")),
        );
        let mrna = tree
            .add_child(
                gene,
                GeneFeature::new(FeatureKind::Mrna, CHROM, start, end, *strand)
                    .with_name(*name)
                    .with_attribute("transcript_id", *name),
            )
            .unwrap();
        let ids = blocks
            .iter()
            .map(|&(s, e, frame)| {
                tree.add_child(
                    mrna,
                    GeneFeature::new(FeatureKind::Cds, CHROM, s, e, *strand).with_frame(frame),
                )
                .unwrap()
            })
            .collect();
        transcript_ids.push(mrna);
        cds_ids.push(ids);
    }
    Built {
        tree,
        transcripts: transcript_ids,
        cds: cds_ids,
    }
}

/// A chromosome of `len` bases filled with `T`, with `placements` written at 1-based positions.
fn genome(len: usize, placements: &[(i32, &str)]) -> Vec<u8> {
    let mut seq = vec![b'T'; len];
    for &(position, bases) in placements {
        let from = (position - 1) as usize;
        seq[from..from + bases.len()].copy_from_slice(bases.as_bytes());
    }
    seq
}

fn manager(tree: FeatureTree, sequence: &[u8]) -> Manager {
    let mut reference = InMemoryReference::new();
    reference.insert(REFERENCE_ID, CHROM, sequence);
    ProteinSequenceManager::new(InMemoryAnnotations::new(tree), reference)
}

fn window(start: i32, end: i32) -> TrackWindow {
    TrackWindow::new("genes", CHROM, start, end).with_reference(REFERENCE_ID)
}

fn residues(entries: &[ProteinSequenceEntry]) -> String {
    entries.iter().map(|e| e.amino_acid).collect()
}

#[test]
fn met_lys_pro_with_trailing_base_dropped() {
    let built = build(&[("T1", Strand::Plus, &[(100, 109, 0)])]);
    let seq = genome(120, &[(100, "ATGAAACCCG")]);
    let manager = manager(built.tree, &seq);

    let result = manager.reconstruct(&window(1, 120), true).unwrap();
    let entries = &result.transcripts[&built.transcripts[0]];
    assert_eq!(residues(entries), "MKP");
    let indices: Vec<usize> = entries.iter().map(|e| e.index).collect();
    assert_eq!(indices, vec![0, 1, 2]);
    let spans: Vec<(i32, i32)> = entries.iter().map(|e| (e.triple_start, e.triple_end)).collect();
    assert_eq!(spans, vec![(100, 102), (103, 105), (106, 108)]);
}

#[test]
fn frame_continuity_across_blocks() {
    // ATG A|AA CCC|GGG split 4 + 5 + 3; frames count bases finishing the previous codon
    let blocks: &[Block] = &[(10, 13, 0), (20, 24, 2), (30, 32, 0)];
    let built = build(&[("T1", Strand::Plus, blocks)]);
    let seq = genome(40, &[(10, "ATGA"), (20, "AACCC"), (30, "GGG")]);
    let manager = manager(built.tree, &seq);

    for extend in [false, true] {
        let result = manager.reconstruct(&window(1, 40), extend).unwrap();
        let entries = &result.transcripts[&built.transcripts[0]];
        assert_eq!(residues(entries), "MKPG", "extend {extend}");
        let indices: Vec<usize> = entries.iter().map(|e| e.index).collect();
        assert_eq!(indices, vec![0, 1, 2, 3], "extend {extend}");
    }
}

#[test]
fn short_previous_block_leaves_frame_untrimmed() {
    let built = build(&[("T1", Strand::Plus, &[(10, 10, 0), (20, 26, 1)])]);
    let seq = genome(30, &[(10, "A"), (20, "GATGAAA")]);
    let manager = manager(built.tree, &seq);

    let result = manager.reconstruct(&window(1, 30), false).unwrap();
    let entries = &result.transcripts[&built.transcripts[0]];
    assert_eq!(residues(entries), "DE");
    let spans: Vec<(i32, i32)> = entries.iter().map(|e| (e.triple_start, e.triple_end)).collect();
    assert_eq!(spans, vec![(20, 22), (23, 25)]);
}

#[test]
fn strand_symmetry() {
    let len = 40;
    let plus_blocks: &[Block] = &[(10, 13, 0), (20, 24, 2), (30, 32, 0)];
    let plus_seq = genome(len, &[(10, "ATGA"), (20, "AACCC"), (30, "GGG")]);

    // mirror every coordinate onto the reverse strand
    let mirror = |p: i32| len as i32 - p + 1;
    let mut minus_blocks: Vec<Block> = plus_blocks
        .iter()
        .map(|&(s, e, frame)| (mirror(e), mirror(s), frame))
        .collect();
    minus_blocks.sort_by_key(|b| b.0);
    let minus_seq = codon::reverse_complement(&plus_seq).unwrap();

    for extend in [false, true] {
        let plus = build(&[("T1", Strand::Plus, plus_blocks)]);
        let plus_result = manager(plus.tree, &plus_seq)
            .reconstruct(&window(1, len as i32), extend)
            .unwrap();

        let minus = build(&[("T1", Strand::Minus, &minus_blocks)]);
        let minus_result = manager(minus.tree, &minus_seq)
            .reconstruct(&window(1, len as i32), extend)
            .unwrap();

        let plus_protein = residues(&plus_result.transcripts[&plus.transcripts[0]]);
        let minus_protein = residues(&minus_result.transcripts[&minus.transcripts[0]]);
        assert_eq!(plus_protein, "MKPG");
        assert_eq!(minus_protein, "MKPG");
    }
}

#[test]
fn boundary_codon_reports_first_block_start() {
    let built = build(&[("T1", Strand::Plus, &[(10, 14, 0), (20, 26, 2)])]);
    let seq = genome(30, &[(10, "ATGAA"), (20, "GCCCAAA")]);
    let manager = manager(built.tree, &seq);

    let result = manager.reconstruct(&window(1, 30), true).unwrap();
    let entries = &result.transcripts[&built.transcripts[0]];
    let first_cds = built.cds[0][0];
    let boundary = entries
        .iter()
        .find(|e| e.cds == first_cds && e.index == 1)
        .unwrap();
    // AA from the first block, G from the second
    assert_eq!(boundary.amino_acid, 'K');
    assert_eq!((boundary.triple_start, boundary.triple_end), (13, 14));
    assert_eq!(boundary.cds_start, 10);
    let indices: Vec<usize> = entries.iter().map(|e| e.index).collect();
    assert!(indices.windows(2).all(|w| w[0] < w[1]), "{indices:?}");
}

#[test]
fn windowing_is_idempotent() {
    let seq = genome(
        80,
        &[(10, "ATGA"), (20, "AACCC"), (30, "GGGTA"), (50, "CATTTGGT"), (66, "TCAT")],
    );
    let built = build(&[
        ("T1", Strand::Plus, &[(10, 13, 0), (20, 24, 2), (30, 34, 0)]),
        ("T2", Strand::Minus, &[(50, 57, 0), (66, 69, 1)]),
    ]);
    let manager = manager(built.tree, &seq);

    let full_window = window(1, 80);
    for extend in [false, true] {
        let full = manager.reconstruct(&full_window, extend).unwrap();
        for (a, b) in [(1, 15), (12, 22), (21, 21), (24, 31), (13, 20), (52, 67), (60, 65)] {
            let sub = manager
                .reconstruct(&full_window.with_bounds(a, b), extend)
                .unwrap();
            for (transcript, entries) in &full.transcripts {
                let expected: Vec<ProteinSequenceEntry> =
                    entries.iter().filter(|e| e.overlaps(a, b)).cloned().collect();
                let actual = sub.transcripts.get(transcript).cloned().unwrap_or_default();
                assert_eq!(actual, expected, "window {a}-{b}, extend {extend}");
            }
        }
    }
}

#[test]
fn two_by_three_variant_candidates() {
    let built = build(&[("T1", Strand::Plus, &[(1, 6, 0), (11, 16, 0)])]);
    let seq = genome(20, &[(1, "ATGAAA"), (11, "CCCGGG")]);
    let manager = manager(built.tree, &seq);
    let variations = vec![
        Variation::new(4, 4, &["C", "G"]),
        Variation::new(13, 13, &["A", "G", "T"]),
    ];

    let result = manager
        .reconstruct_with_variants(&window(1, 20), &variations)
        .unwrap();
    let candidates = &result.transcripts[&built.transcripts[0]];
    assert_eq!(candidates.len(), 6);
    let mut proteins: Vec<String> = candidates.iter().map(|c| residues(c)).collect();
    proteins.sort();
    proteins.dedup();
    assert_eq!(proteins, vec!["MEPG", "MQPG"]);
}

#[test]
fn variant_track_keyed_by_transcript_id() {
    let built = build(&[
        ("T1", Strand::Plus, &[(1, 7, 0)]),
        ("T2", Strand::Plus, &[(11, 16, 0)]),
    ]);
    let seq = genome(20, &[(1, "ATGCTGA"), (11, "ATGAAA")]);
    let manager = manager(built.tree, &seq);
    let variations = vec![Variation::new(3, 4, &["G"])];

    let track = manager
        .load_protein_variants_track(&window(1, 20), &variations)
        .unwrap();
    // GC -> G turns ATG CTG A into ATG TGA
    assert_eq!(residues(&track.transcripts["T1"][0]), "M*");
    assert_eq!(track.transcripts["T1"].len(), 1);
    // untouched transcript keeps its reference translation
    assert_eq!(residues(&track.transcripts["T2"][0]), "MK");
}

#[test]
fn minus_strand_variants_follow_transcript_orientation() {
    // genomic TGGAAATC at 8-15 reads GATTTCCA on the transcript
    let built = build(&[("T1", Strand::Minus, &[(8, 15, 0)])]);
    let seq = genome(20, &[(8, "TGGAAATC")]);
    let manager = manager(built.tree, &seq);
    let variations = vec![Variation::new(8, 9, &["T"]), Variation::new(11, 13, &["ATA"])];

    let result = manager
        .reconstruct_with_variants(&window(1, 20), &variations)
        .unwrap();
    let candidates = &result.transcripts[&built.transcripts[0]];
    assert_eq!(candidates.len(), 1);
    // GATATCA: GAT ATC -> D I
    assert_eq!(residues(&candidates[0]), "DI");
}

#[test]
fn variant_combinations_are_bounded() {
    let built = build(&[("T1", Strand::Plus, &[(1, 6, 0), (11, 16, 0)])]);
    let seq = genome(20, &[(1, "ATGAAA"), (11, "CCCGGG")]);
    let config = ReconstructionConfig {
        max_variant_combinations: 5,
        ..ReconstructionConfig::default()
    };
    let manager = manager(built.tree, &seq).with_config(config);
    let variations = vec![
        Variation::new(4, 4, &["C", "G"]),
        Variation::new(13, 13, &["A", "G", "T"]),
    ];

    let err = manager
        .reconstruct_with_variants(&window(1, 20), &variations)
        .unwrap_err();
    assert!(matches!(
        err,
        Error::TooManyVariantCombinations { limit: 5, required: 6 }
    ));
}

#[test]
fn missing_reference_id_is_rejected() {
    let built = build(&[("T1", Strand::Plus, &[(1, 6, 0)])]);
    let manager = manager(built.tree, b"ATGAAA");
    let no_reference = TrackWindow::new("genes", CHROM, 1, 6);
    assert!(matches!(
        manager.reconstruct(&no_reference, true),
        Err(Error::MissingReferenceId)
    ));
    assert!(matches!(
        manager.reconstruct_with_variants(&no_reference, &[]),
        Err(Error::MissingReferenceId)
    ));
}

#[test]
fn inverted_window_is_rejected() {
    let built = build(&[("T1", Strand::Plus, &[(1, 6, 0)])]);
    let manager = manager(built.tree, b"ATGAAA");
    assert!(matches!(
        manager.reconstruct(&window(6, 1), true),
        Err(Error::InvalidWindow { start: 6, end: 1 })
    ));
}

#[test]
fn short_reference_aborts_transcript() {
    let built = build(&[("T1", Strand::Plus, &[(15, 25, 0)])]);
    let manager = manager(built.tree, &genome(20, &[]));
    assert!(matches!(
        manager.reconstruct(&window(1, 30), true),
        Err(Error::InsufficientNucleotides { expected: 11, actual: 6, .. })
    ));
}

#[test]
fn identical_cds_in_two_transcripts() {
    let built = build(&[
        ("T1", Strand::Plus, &[(1, 6, 0)]),
        ("T2", Strand::Plus, &[(1, 6, 0)]),
    ]);
    let manager = manager(built.tree, b"ATGAAACC");
    let result = manager.reconstruct(&window(1, 8), true).unwrap();
    assert_eq!(result.transcripts.len(), 2);
    for transcript in &built.transcripts {
        assert_eq!(residues(&result.transcripts[transcript]), "MK");
    }
    assert_ne!(built.cds[0][0], built.cds[1][0]);
}

#[test]
fn single_cds_is_not_stitched() {
    let built = build(&[("T1", Strand::Plus, &[(10, 14, 0), (20, 26, 2)])]);
    let seq = genome(30, &[(10, "ATGAA"), (20, "GCCCAAA")]);
    let manager = manager(built.tree.clone(), &seq);
    let entries = manager
        .reconstruct_for_single_cds(&window(1, 30), &built.tree, built.cds[0][0])
        .unwrap();
    assert_eq!(residues(&entries), "M");
}
