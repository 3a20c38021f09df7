use crate::engine::OverlapEngine;
use crate::error::InsertionError;
use crate::overlap::{read_overlap_table_from_path, OverlapRecord};
use std::path::{Path, PathBuf};
use tracing::info;

/// Replays a raw overlap table saved earlier, e.g. by running the external
/// search program by hand or with `--keep-overlaps`. The annotation and
/// insertion files are not read.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PrecomputedEngine {
    pub table: PathBuf,
}

impl PrecomputedEngine {
    pub fn new<P: Into<PathBuf>>(table: P) -> PrecomputedEngine {
        PrecomputedEngine {
            table: table.into(),
        }
    }
}

impl OverlapEngine for PrecomputedEngine {
    fn name(&self) -> &str {
        "overlap table"
    }

    fn required_inputs(&self) -> Vec<&Path> {
        vec![self.table.as_path()]
    }

    fn find_overlaps(
        &self,
        _annotation: &Path,
        _insertions: &Path,
    ) -> Result<Vec<OverlapRecord>, InsertionError> {
        info!("Reading precomputed overlaps from {:?}", self.table);
        Ok(read_overlap_table_from_path(&self.table)?.records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::overlap::write_overlap_table;
    use std::fs::File;

    #[test]
    fn test_replays_saved_table() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("bisearch_overlaps.tab");
        let records = vec![
            OverlapRecord::new("ID=INS1;", "ID=G1;logic_name=cshl_gene;Strand:+").with_locus("chr1:5-6"),
            OverlapRecord::new("ID=INS2;", "ID=E1;Strand:-").with_locus("chr1:9-9"),
        ];
        write_overlap_table(&records, "rust-lapper", File::create(&path).unwrap()).unwrap();

        let engine = PrecomputedEngine::new(&path);
        assert_eq!(engine.required_inputs(), vec![path.as_path()]);
        let replayed = engine
            .find_overlaps(Path::new("unused"), Path::new("unused"))
            .unwrap();
        assert_eq!(replayed, records);
    }
}
