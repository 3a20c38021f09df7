use crate::attributes::{ATTRIBUTE_DELIMITER, STRAND_MARKER, SUB_RECORD_DELIMITER};
use crate::engine::OverlapEngine;
use crate::error::InsertionError;
use crate::overlap::OverlapRecord;
use crate::reader::gff::{read_gff_intervals, GffInterval};
use rust_lapper::{Interval, Lapper};
use std::collections::HashMap;
use std::path::Path;
use std::time::Instant;
use tracing::{debug, info};

type Iv = Interval<u64, usize>;

/// An in-process overlap engine backed by one `rust-lapper` interval tree per
/// sequence id of the annotation.
///
/// Each insertion overlapping at least one annotation feature yields one record:
///
/// * `insertion_attr`: the insertion's attribute column, terminated by `;`.
/// * `annotation_attr`: every overlapping feature in start order, rendered as
///   `<attributes>;Strand:<strand>` and joined by `|`.
/// * `locus`: the insertion's `seqid:start-end`.
///
/// Strand is not considered when searching.
#[derive(Clone, Copy, Debug, Default)]
pub struct LapperEngine;

impl LapperEngine {
    pub fn new() -> LapperEngine {
        LapperEngine
    }

    /// Builds the lappers over `annotation`; the interval values index into it.
    fn build_lappers(annotation: &[GffInterval]) -> HashMap<&str, Lapper<u64, usize>> {
        let start_time = Instant::now();
        let mut lapper_tree_vec_hm: HashMap<&str, Vec<Iv>> = HashMap::new();

        for (idx, feature) in annotation.iter().enumerate() {
            // we add 1 to the end because rust-lappers uses right-exclusive intervals
            lapper_tree_vec_hm
                .entry(feature.seqid.as_str())
                .or_default()
                .push(Iv {
                    start: feature.start,
                    stop: feature.end + 1,
                    val: idx,
                });
        }

        let lappers: HashMap<&str, Lapper<u64, usize>> = lapper_tree_vec_hm
            .into_iter()
            .map(|(seqid, ivs)| (seqid, Lapper::new(ivs)))
            .collect();

        debug!(
            "built {} rust-lappers in {:?}",
            lappers.len(),
            start_time.elapsed()
        );
        lappers
    }

    /// Finds the overlaps of every insertion against already-parsed annotation features.
    pub fn overlaps_of(
        &self,
        annotation: &[GffInterval],
        insertions: &[GffInterval],
    ) -> Vec<OverlapRecord> {
        let lappers = LapperEngine::build_lappers(annotation);
        let mut records = Vec::new();

        for ins in insertions {
            let Some(lapper) = lappers.get(ins.seqid.as_str()) else {
                continue;
            };
            let mut hits: Vec<&Iv> = lapper.find(ins.start, ins.end + 1).collect();
            if hits.is_empty() {
                continue;
            }
            hits.sort_by_key(|iv| (iv.start, iv.val));

            let annotation_attr = hits
                .iter()
                .map(|iv| render_sub_record(&annotation[iv.val]))
                .collect::<Vec<_>>()
                .join(SUB_RECORD_DELIMITER.to_string().as_str());

            let mut insertion_attr = ins.attributes.clone();
            if !insertion_attr.ends_with(ATTRIBUTE_DELIMITER) {
                insertion_attr.push(ATTRIBUTE_DELIMITER);
            }
            records.push(
                OverlapRecord::new(insertion_attr, annotation_attr).with_locus(ins.locus()),
            );
        }

        info!(
            "{} of {} insertions overlap an annotation feature",
            records.len(),
            insertions.len()
        );
        records
    }
}

fn render_sub_record(feature: &GffInterval) -> String {
    if feature.attributes.is_empty() {
        format!("{}{}", STRAND_MARKER, feature.strand)
    } else {
        format!(
            "{}{}{}{}",
            feature.attributes, ATTRIBUTE_DELIMITER, STRAND_MARKER, feature.strand
        )
    }
}

impl OverlapEngine for LapperEngine {
    fn name(&self) -> &str {
        "rust-lapper"
    }

    fn find_overlaps(
        &self,
        annotation: &Path,
        insertions: &Path,
    ) -> Result<Vec<OverlapRecord>, InsertionError> {
        info!("Reading annotation features from {:?}", annotation);
        let annotation = read_gff_intervals(annotation)?;
        info!("Reading insertions from {:?}", insertions);
        let insertions = read_gff_intervals(insertions)?;
        Ok(self.overlaps_of(&annotation, &insertions))
    }
}
