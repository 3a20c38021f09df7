//! Overlap engines: anything that, given an annotation file and an insertion file,
//! reports which annotation features overlap each insertion.
//!
//! Every engine hands back headerless [`OverlapRecord`]s; engines that parse a raw
//! overlap table drop its header row themselves.

pub mod external;
pub mod lapper;
pub mod precomputed;

pub use external::ExternalEngine;
pub use lapper::LapperEngine;
pub use precomputed::PrecomputedEngine;

use crate::error::InsertionError;
use crate::overlap::OverlapRecord;
use std::path::Path;

/// OverlapEngine defines how interval overlaps between two GFF3 files are found.
///
/// Implementors are free to search in-process, call out to an external program, or
/// replay a table saved earlier. The pipeline only relies on the returned records.
pub trait OverlapEngine {
    /// A short name used in log messages and saved overlap tables.
    fn name(&self) -> &str;

    /// Files this engine needs on top of the annotation and insertion files. They are
    /// checked for presence together with the other inputs before anything runs.
    fn required_inputs(&self) -> Vec<&Path> {
        Vec::new()
    }

    /// Finds the annotation features overlapping each insertion.
    ///
    /// # Arguments
    ///
    /// * `annotation` - The reference genome annotation (GFF3)
    /// * `insertions` - The insertion locations (GFF3)
    ///
    /// # Returns
    ///
    /// One record per reported overlap, in the order the engine produced them.
    fn find_overlaps(
        &self,
        annotation: &Path,
        insertions: &Path,
    ) -> Result<Vec<OverlapRecord>, InsertionError>;
}
