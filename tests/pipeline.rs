use std::path::Path;

use decoy_forge::chem::graph::{
    Atom, BondOrder, Element, GraphChemistry, Molecule, Query, QueryAtom,
};
use decoy_forge::compile::compile_chunk;
use decoy_forge::generate::{self, WorkerConfig};
use decoy_forge::io::{Format, RecordWriter, read_records};
use decoy_forge::merge::{MergeOptions, MergePipeline, export_chunk};
use decoy_forge::{Metadata, ReactionRecord, ReactionSummary, ReactionType, RuleTemplate};

fn substitution(reaction_id: &str) -> ReactionRecord<Molecule> {
    let mut bromoethane = Molecule::new();
    bromoethane.add_atom(1, Atom::new(Element::C));
    bromoethane.add_atom(2, Atom::new(Element::C));
    bromoethane.add_atom(3, Atom::new(Element::Br));
    bromoethane.add_bond(1, 2, BondOrder::Single);
    bromoethane.add_bond(2, 3, BondOrder::Single);

    let mut hydroxide = Molecule::new();
    hydroxide.add_atom(4, Atom::new(Element::O).with_charge(-1));

    let mut ethanol = Molecule::new();
    ethanol.add_atom(1, Atom::new(Element::C));
    ethanol.add_atom(2, Atom::new(Element::C));
    ethanol.add_atom(4, Atom::new(Element::O));
    ethanol.add_bond(1, 2, BondOrder::Single);
    ethanol.add_bond(2, 4, BondOrder::Single);

    let mut bromide = Molecule::new();
    bromide.add_atom(3, Atom::new(Element::Br).with_charge(-1));

    ReactionRecord::new(
        vec![
            bromoethane.with_implicit_hydrogens(),
            hydroxide.with_implicit_hydrogens(),
        ],
        vec![ethanol.with_implicit_hydrogens(), bromide],
        Metadata::new(reaction_id),
    )
}

/// Moves bromine onto the nucleophile, which no real substitution does.
fn halogen_transfer(rule_id: u64) -> RuleTemplate<Query> {
    let mut halide = Query::new();
    halide.add_atom(1, QueryAtom::new(Element::C));
    halide.add_atom(2, QueryAtom::new(Element::Br));
    halide.add_bond(1, 2, BondOrder::Single);

    let mut nucleophile = Query::new();
    nucleophile.add_atom(3, QueryAtom { charge: -1, ..QueryAtom::new(Element::O) });

    let mut carbanion = Query::new();
    carbanion.add_atom(1, QueryAtom { charge: -1, ..QueryAtom::new(Element::C) });

    let mut hypobromite = Query::new();
    hypobromite.add_atom(2, QueryAtom::new(Element::Br));
    hypobromite.add_atom(3, QueryAtom::new(Element::O));
    hypobromite.add_bond(2, 3, BondOrder::Single);

    ReactionRecord::new(
        vec![halide, nucleophile],
        vec![carbanion, hypobromite],
        Metadata::new("library").with_rule_id(rule_id),
    )
}

fn write_inputs(dir: &Path, ids: &[&str]) -> WorkerConfig {
    let input = dir.join("reactions.jsonl");
    let rules = dir.join("rules.jsonl");
    let reactions: Vec<_> = ids.iter().map(|id| substitution(id)).collect();
    RecordWriter::new(&input, Format::Reactions)
        .append_all(&reactions)
        .unwrap();
    RecordWriter::new(&rules, Format::Rules)
        .append_all(&[halogen_transfer(7)])
        .unwrap();

    WorkerConfig {
        input,
        rules,
        output: dir.join("decoys.jsonl"),
        log: false,
        ..Default::default()
    }
}

fn read_all<T: serde::de::DeserializeOwned>(path: &Path, format: Format) -> Vec<T> {
    read_records(path, format)
        .unwrap()
        .collect::<Result<_, _>>()
        .unwrap()
}

#[test]
fn generate_merge_compile() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path(), &["r0", "r1"]);
    let chem = GraphChemistry::new();

    // One shard on one thread keeps the output in input order
    let reports = generate::run_all(&chem, &config, 1, || {}).unwrap();
    assert_eq!(reports.len(), 1);
    assert_eq!(reports[0].recovered, 2);

    let generated: Vec<ReactionRecord<Molecule>> = read_all(&config.output, Format::Reactions);
    assert_eq!(generated.len(), 4);

    let options = MergeOptions {
        chunk_base: dir.path().join("merged"),
        ..Default::default()
    };
    let pipeline = MergePipeline::new(&chem, options).unwrap();
    let records = read_records::<ReactionRecord<Molecule>>(&config.output, Format::Reactions).unwrap();
    let report = pipeline.run(records, || {}).unwrap();
    assert_eq!(report.records_seen, 4);
    assert_eq!((report.kept, report.replaced, report.duplicates), (2, 1, 1));
    assert!(report.chunk_path.exists());

    // The later reconstruction displaces the earlier one; the first decoy stays
    let exported = dir.path().join("clean.jsonl");
    assert_eq!(export_chunk::<Molecule>(&report.chunk_path, &exported).unwrap(), 2);
    let clean: Vec<ReactionRecord<Molecule>> = read_all(&exported, Format::Reactions);
    let kinds: Vec<_> = clean
        .iter()
        .map(|r| (r.reaction_id().to_string(), r.reaction_type()))
        .collect();
    assert_eq!(
        kinds,
        vec![
            ("r0".to_string(), Some(ReactionType::Decoy)),
            ("r1".to_string(), Some(ReactionType::Reconstructed)),
        ]
    );

    let main_path = dir.path().join("summaries.jsonl");
    let unrec_path = dir.path().join("unreconstructed.jsonl");
    let mut main = RecordWriter::create(&main_path, Format::Summaries).unwrap();
    let mut unrec = RecordWriter::create(&unrec_path, Format::Summaries).unwrap();
    let compiled =
        compile_chunk::<Molecule, _, _>(&report.chunk_path, &mut main, &mut unrec, || {}).unwrap();
    assert_eq!((compiled.summaries, compiled.unreconstructed), (1, 1));

    let summaries: Vec<ReactionSummary<Molecule>> = read_all(&main_path, Format::Summaries);
    assert_eq!(summaries.len(), 1);
    assert_eq!(summaries[0].reaction_id, "r1");
    assert!(summaries[0].is_reconstructed());

    let orphans: Vec<ReactionSummary<Molecule>> = read_all(&unrec_path, Format::Summaries);
    assert_eq!(orphans.len(), 1);
    assert_eq!(orphans[0].reaction_id, "r0");
    assert_eq!(orphans[0].total_decoys, 1);
    assert_eq!(orphans[0].random_rule_ids, vec![7]);
}

#[test]
fn worker_config_round_trips_through_disk() {
    let dir = tempfile::tempdir().unwrap();
    let config = write_inputs(dir.path(), &["r0", "r1", "r2"]);
    let saved = dir.path().join("worker_config.toml");
    config.save(&saved).unwrap();

    let loaded = WorkerConfig::load(&saved).unwrap();
    assert_eq!(loaded, config);

    let chem = GraphChemistry::new();
    let report = generate::run_shard(&chem, &loaded, 0, || {}).unwrap();
    assert_eq!(report.processed, 3);
    assert_eq!(report.written, 6);
}
