//! The pipeline driver: check inputs, find overlaps, normalize, merge, write.

use crate::engine::OverlapEngine;
use crate::error::InsertionError;
use crate::merge::{merge, read_template, write_features};
use crate::options::PipelineConfig;
use crate::overlap::{normalize, write_overlap_table};
use crate::utils::missing_files;
use std::fs::File;
use std::io::BufWriter;
use std::path::Path;
use tracing::{info, warn};

/// What one pipeline run did.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct PipelineSummary {
    /// Records reported by the overlap engine, header row excluded.
    pub overlap_rows: usize,
    /// Records whose annotation named a gene.
    pub resolved_genes: usize,
    /// Records without a usable insertion id.
    pub unparsable_keys: usize,
    /// Rows written to the output table.
    pub output_rows: usize,
}

/// Fails with [`InsertionError::MissingInputs`] listing every absent file among the
/// configured inputs and the files `engine` requires.
pub fn check_inputs(
    config: &PipelineConfig,
    engine: &dyn OverlapEngine,
) -> Result<(), InsertionError> {
    let required: Vec<&Path> = config
        .input_files()
        .into_iter()
        .chain(engine.required_inputs())
        .collect();
    let missing = missing_files(required.iter().copied());
    if !missing.is_empty() {
        return Err(InsertionError::MissingInputs(missing));
    }
    info!("All {} input files are present.", required.len());
    Ok(())
}

/// Runs the whole pipeline once with the given engine.
///
/// Nothing is written unless every step before the final write succeeds.
pub fn run(
    config: &PipelineConfig,
    engine: &dyn OverlapEngine,
) -> Result<PipelineSummary, InsertionError> {
    check_inputs(config, engine)?;

    info!("Finding overlaps with {}", engine.name());
    let records = engine.find_overlaps(&config.annotation, &config.insertions)?;
    if records.is_empty() {
        warn!("{} reported no overlaps; no gene will be resolved.", engine.name());
    } else {
        info!("The overlap engine reported {} records.", records.len());
    }

    if let Some(path) = &config.keep_overlaps {
        let writer = BufWriter::new(File::create(path)?);
        write_overlap_table(&records, engine.name(), writer)?;
        info!("Saved the raw overlap table to {:?}", path);
    }

    let normalized = normalize(&records)?;
    let template = read_template(&config.template, &config.merge)?;
    let mut features = merge(&template, &normalized.insertions, &config.merge)?;
    write_features(&mut features, &config.output)?;

    Ok(PipelineSummary {
        overlap_rows: records.len(),
        resolved_genes: normalized.n_genes(),
        unparsable_keys: normalized.unparsable_keys.len(),
        output_rows: features.height(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::PrecomputedEngine;
    use crate::overlap::OverlapRecord;

    struct FixedEngine(Vec<OverlapRecord>);

    impl OverlapEngine for FixedEngine {
        fn name(&self) -> &str {
            "fixed"
        }

        fn find_overlaps(
            &self,
            _annotation: &Path,
            _insertions: &Path,
        ) -> Result<Vec<OverlapRecord>, InsertionError> {
            Ok(self.0.clone())
        }
    }

    fn touch_inputs(config: &PipelineConfig) {
        for p in config.input_files() {
            std::fs::write(p, "").unwrap();
        }
    }

    #[test]
    fn test_check_inputs_lists_all_missing() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::in_dir(dir.path());
        std::fs::write(&config.annotation, "").unwrap();
        let engine = PrecomputedEngine::new(dir.path().join("saved.tab"));

        match check_inputs(&config, &engine) {
            Err(InsertionError::MissingInputs(missing)) => assert_eq!(
                missing,
                vec![
                    config.insertions.clone(),
                    config.template.clone(),
                    dir.path().join("saved.tab"),
                ]
            ),
            other => panic!("expected missing inputs, got {:?}", other),
        }
    }

    #[test]
    fn test_missing_inputs_stop_before_the_engine_runs() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::in_dir(dir.path());
        let err = run(&config, &FixedEngine(Vec::new())).unwrap_err();
        assert!(matches!(err, InsertionError::MissingInputs(ref m) if m.len() == 3));
        assert!(!config.output.exists());
    }

    #[test]
    fn test_run_with_blank_template() {
        let dir = tempfile::tempdir().unwrap();
        let keep = dir.path().join("bisearch_overlaps.tab");
        let config = PipelineConfig::in_dir(dir.path()).with_keep_overlaps(Some(keep.clone()));
        touch_inputs(&config);

        let engine = FixedEngine(vec![
            OverlapRecord::new("ID=INS2;", "ID=G2;logic_name=cshl_gene;Strand:-"),
            OverlapRecord::new("no id here", "ID=E1;Strand:+"),
            OverlapRecord::new("ID=INS1;", ""),
        ]);
        let summary = run(&config, &engine).unwrap();
        assert_eq!(
            summary,
            PipelineSummary {
                overlap_rows: 3,
                resolved_genes: 1,
                unparsable_keys: 1,
                output_rows: 3,
            }
        );
        assert_eq!(
            std::fs::read_to_string(&config.output).unwrap(),
            "Ds_GFP_allele,gene_id,strand\nINS1,,\nINS2,G2,-\n,,\n"
        );

        let replayed = run(&config, &PrecomputedEngine::new(&keep)).unwrap();
        assert_eq!(replayed, summary);
    }

    #[test]
    fn test_malformed_attribute_writes_nothing() {
        let dir = tempfile::tempdir().unwrap();
        let config = PipelineConfig::in_dir(dir.path());
        touch_inputs(&config);

        let engine = FixedEngine(vec![OverlapRecord::new(
            "ID=INS1;",
            "ID=G1;logic_name=cshl_gene",
        )]);
        let err = run(&config, &engine).unwrap_err();
        assert!(matches!(err, InsertionError::MalformedAttribute { row: 1, .. }));
        assert!(!config.output.exists());
    }
}
