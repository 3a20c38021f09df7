use flate2::write::GzEncoder;
use flate2::Compression;
use insertion_features::engine::{ExternalEngine, LapperEngine, PrecomputedEngine};
use insertion_features::error::InsertionError;
use insertion_features::options::{MergeOptions, PipelineConfig};
use insertion_features::pipeline::{run, PipelineSummary};
use std::fs::File;
use std::io::Write;
use std::path::Path;

const ANNOTATION: &str = "##gff-version 3
chr1\tcshl\tgene\t100\t500\t.\t+\t.\tID=G1;logic_name=cshl_gene
chr1\tcshl\texon\t100\t200\t.\t+\t.\tID=G1.e1;Parent=G1.t1;logic_name=cshl_exon
chr1\tcshl\tgene\t450\t900\t.\t-\t.\tID=G2;logic_name=cshl_gene
chr2\tcshl\texon\t10\t40\t.\t-\t.\tID=G3.e1;logic_name=cshl_exon
";

const INSERTIONS: &str = "##gff-version 3
chr1\tdsgfp\tinsertion\t150\t151\t.\t.\t.\tID=R1;Name=ds1
chr1\tdsgfp\tinsertion\t460\t461\t.\t.\t.\tID=R4
chr2\tdsgfp\tinsertion\t20\t21\t.\t.\t.\tID=R2
chr3\tdsgfp\tinsertion\t1\t2\t.\t.\t.\tID=R3
";

fn write_gz(path: &Path, text: &str) -> anyhow::Result<()> {
    let mut enc = GzEncoder::new(File::create(path)?, Compression::default());
    enc.write_all(text.as_bytes())?;
    enc.finish()?;
    Ok(())
}

#[test]
fn test_lapper_engine_end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PipelineConfig::in_dir(dir.path());
    write_gz(&config.annotation, ANNOTATION)?;
    std::fs::write(&config.insertions, INSERTIONS)?;
    std::fs::write(&config.template, "Ds_GFP_allele,otherCol\nR1,X\nR9,Z\n")?;

    let summary = run(&config, &LapperEngine::new())?;
    assert_eq!(
        summary,
        PipelineSummary {
            overlap_rows: 3,
            resolved_genes: 2,
            unparsable_keys: 0,
            output_rows: 4,
        }
    );

    // R4 overlaps both genes; the first one in start order wins
    assert_eq!(
        std::fs::read_to_string(&config.output)?,
        "Ds_GFP_allele,otherCol,gene_id,strand\nR1,X,G1,+\nR2,,,\nR4,,G1,+\nR9,Z,,\n"
    );
    Ok(())
}

#[test]
fn test_saved_table_end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let saved = dir.path().join("bisearch_overlaps.tab");
    std::fs::write(
        &saved,
        "# bisearch -G genome_annotation.gff3 insertion_location.gff3\n\
         Ds_GFP_allele\tv5_gene\tGene_ID_strand\n\
         ID=INS1;\ta|logic_name=cshl_gene;ID=GENEX;Strand:-|b\tchr1:1-2\n",
    )?;

    let config = PipelineConfig::in_dir(dir.path());
    std::fs::write(&config.annotation, "")?;
    std::fs::write(&config.insertions, "")?;
    std::fs::write(&config.template, "Ds_GFP_allele,otherCol\nINS1,X\n")?;

    run(&config, &PrecomputedEngine::new(&saved))?;
    let first = std::fs::read(&config.output)?;
    assert_eq!(
        String::from_utf8(first.clone())?,
        "Ds_GFP_allele,otherCol,gene_id,strand\nINS1,X,GENEX,-\n"
    );

    run(&config, &PrecomputedEngine::new(&saved))?;
    assert_eq!(std::fs::read(&config.output)?, first);
    Ok(())
}

#[test]
fn test_keep_overlaps_replays_identically() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let kept = dir.path().join("kept.tab");
    let config = PipelineConfig::in_dir(dir.path())
        .with_keep_overlaps(Some(kept.clone()))
        .with_merge_options(MergeOptions::new("Ds_GFP_allele", "v5_gene", "Gene_ID_strand"));
    std::fs::write(&config.annotation, ANNOTATION)?;
    std::fs::write(&config.insertions, INSERTIONS)?;
    File::create(&config.template)?;

    let live = run(&config, &LapperEngine::new())?;
    let live_output = std::fs::read(&config.output)?;
    assert_eq!(
        String::from_utf8(live_output.clone())?,
        "Ds_GFP_allele,v5_gene,Gene_ID_strand\nR1,G1,+\nR2,,\nR4,G1,+\n"
    );

    let replay_config = config.clone().with_keep_overlaps(None);
    let replayed = run(&replay_config, &PrecomputedEngine::new(&kept))?;
    assert_eq!(replayed, live);
    assert_eq!(std::fs::read(&config.output)?, live_output);
    Ok(())
}

#[test]
fn test_missing_script_is_reported_with_the_inputs() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PipelineConfig::in_dir(dir.path());
    std::fs::write(&config.annotation, ANNOTATION)?;
    std::fs::write(&config.insertions, INSERTIONS)?;

    let script = dir.path().join("gff_genomics.pl");
    let engine = ExternalEngine::default().with_script(&script);
    match run(&config, &engine) {
        Err(InsertionError::MissingInputs(missing)) => {
            assert_eq!(missing, vec![config.template.clone(), script]);
        }
        other => panic!("expected missing inputs, got {:?}", other),
    }
    assert!(!config.output.exists());
    Ok(())
}

#[test]
fn test_template_without_key_column() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PipelineConfig::in_dir(dir.path());
    std::fs::write(&config.annotation, ANNOTATION)?;
    std::fs::write(&config.insertions, INSERTIONS)?;
    std::fs::write(&config.template, "allele,otherCol\nR1,X\n")?;

    let err = run(&config, &LapperEngine::new()).unwrap_err();
    assert!(matches!(err, InsertionError::MissingKeyColumn { .. }));
    assert!(err.is_format_violation());
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_external_engine_end_to_end() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PipelineConfig::in_dir(dir.path());
    std::fs::write(&config.annotation, ANNOTATION)?;
    std::fs::write(&config.insertions, INSERTIONS)?;
    std::fs::write(&config.template, "Ds_GFP_allele,otherCol\nINS1,X\nINS2,Y\n")?;

    let script = dir.path().join("bisearch.sh");
    std::fs::write(
        &script,
        "[ \"$1\" = \"-G\" ] || exit 2\n\
         printf '#%s\\n' \"$2\"\n\
         printf 'Ds_GFP_allele\\tv5_gene\\tGene_ID_strand\\n'\n\
         printf 'ID=INS1;\\tID=GENEX;logic_name=cshl_gene;Strand:-\\tchr1:1-2\\n'\n",
    )?;
    let engine = ExternalEngine::new("sh")
        .with_script(&script)
        .with_args(["-G"]);

    let summary = run(&config, &engine)?;
    assert_eq!(summary.overlap_rows, 1);
    assert_eq!(
        std::fs::read_to_string(&config.output)?,
        "Ds_GFP_allele,otherCol,gene_id,strand\nINS1,X,GENEX,-\nINS2,Y,,\n"
    );
    Ok(())
}

#[cfg(unix)]
#[test]
fn test_header_only_engine_output_aborts_the_run() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let config = PipelineConfig::in_dir(dir.path());
    std::fs::write(&config.annotation, ANNOTATION)?;
    std::fs::write(&config.insertions, INSERTIONS)?;
    std::fs::write(&config.template, "Ds_GFP_allele,otherCol\nINS1,X\n")?;

    let script = dir.path().join("bisearch.sh");
    std::fs::write(
        &script,
        "printf 'Ds_GFP_allele\\tv5_gene\\tGene_ID_strand\\n'\n",
    )?;
    let engine = ExternalEngine::new("sh").with_script(&script);

    let err = run(&config, &engine).unwrap_err();
    assert!(matches!(err, InsertionError::EngineNoOutput(_)));
    assert!(!config.output.exists());
    Ok(())
}
