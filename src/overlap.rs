//! The overlap records produced by an overlap engine and their normalization into
//! [`ResolvedInsertion`]s.
//!
//! The raw overlap table is tab-separated with three columns per row: the insertion's
//! attribute list, the packed annotation attributes (see [`crate::attributes`]) and a
//! locus field that is kept only for reference. Lines starting with `#` are comments.
//! The first data row is a header the engine emits as data; it is dropped by position.

use crate::attributes::{extract_gene_and_strand, GeneHit};
use crate::error::InsertionError;
use crate::utils::{is_skippable_line, open_line_reader};
use nutype::nutype;
use std::io::{BufRead, Write};
use std::path::Path;
use tracing::{debug, info, warn};

/// Column names written in the header row of a saved overlap table.
pub const OVERLAP_COLUMNS: [&str; 3] = ["insertion_attributes", "annotation_attributes", "locus"];

#[nutype(
    sanitize(trim),
    validate(not_empty),
    derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Display)
)]
/// The unique allele identifier of an insertion, used as the merge key.
pub struct InsertionId(String);

/// One raw row emitted by an overlap engine.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OverlapRecord {
    /// The insertion's `key=value;...` attribute list.
    pub insertion_attr: String,
    /// Zero or more `|`-delimited annotation sub-records.
    pub annotation_attr: String,
    /// The redundant third column, when present.
    pub locus: Option<String>,
}

impl OverlapRecord {
    pub fn new<I: Into<String>, A: Into<String>>(insertion_attr: I, annotation_attr: A) -> Self {
        OverlapRecord {
            insertion_attr: insertion_attr.into(),
            annotation_attr: annotation_attr.into(),
            locus: None,
        }
    }

    pub fn with_locus<L: Into<String>>(mut self, locus: L) -> Self {
        self.locus = Some(locus.into());
        self
    }

    // Missing trailing fields are left empty rather than rejected.
    fn from_line(line: &str, line_number: usize) -> OverlapRecord {
        let mut fields = line.splitn(3, '\t');
        let insertion_attr = fields.next().unwrap_or_default();
        let annotation_attr = match fields.next() {
            Some(a) => a,
            None => {
                warn!(
                    "Overlap table line {} has a single column; treating its annotation field as empty.",
                    line_number
                );
                ""
            }
        };
        OverlapRecord {
            insertion_attr: insertion_attr.to_string(),
            annotation_attr: annotation_attr.to_string(),
            locus: fields.next().map(String::from),
        }
    }
}

/// A raw overlap table: the dropped header row (if any data row existed) and
/// the records that follow it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OverlapTable {
    pub header: Option<String>,
    pub records: Vec<OverlapRecord>,
}

/// Reads a raw overlap table, skipping comment and blank lines and discarding
/// the first data row unconditionally.
pub fn read_overlap_table<R: BufRead>(reader: R) -> Result<OverlapTable, InsertionError> {
    let mut table = OverlapTable::default();

    for (idx, l) in reader.lines().enumerate() {
        let line = l?;
        let line = line.trim_end_matches('\r');
        if is_skippable_line(line) {
            continue;
        }
        if table.header.is_none() {
            debug!("Dropping the header row emitted as data: {:?}", line);
            table.header = Some(line.to_string());
            continue;
        }
        table.records.push(OverlapRecord::from_line(line, idx + 1));
    }

    debug!("Read {} raw overlap records.", table.records.len());
    Ok(table)
}

/// Reads a raw overlap table from a (possibly gzipped) file.
pub fn read_overlap_table_from_path<T: AsRef<Path>>(
    file_path: T,
) -> Result<OverlapTable, InsertionError> {
    let rdr = open_line_reader(file_path)?;
    read_overlap_table(rdr)
}

/// Writes `records` in the raw overlap-table layout, header row included, so that
/// [`read_overlap_table`] reads them back unchanged.
pub fn write_overlap_table<W: Write>(
    records: &[OverlapRecord],
    engine_name: &str,
    mut writer: W,
) -> Result<(), InsertionError> {
    writeln!(writer, "# overlaps reported by {}", engine_name)?;
    writeln!(writer, "{}", OVERLAP_COLUMNS.join("\t"))?;
    for rec in records {
        match &rec.locus {
            Some(locus) => writeln!(
                writer,
                "{}\t{}\t{}",
                rec.insertion_attr, rec.annotation_attr, locus
            )?,
            None => writeln!(writer, "{}\t{}", rec.insertion_attr, rec.annotation_attr)?,
        }
    }
    writer.flush()?;
    Ok(())
}

/// Extracts the insertion id from an insertion attribute list: the text between the
/// first `=` and the following `;`. Fields lacking either delimiter, or yielding an
/// empty id, have no id.
pub fn extract_insertion_id(insertion_attr: &str) -> Option<InsertionId> {
    if !(insertion_attr.contains('=') && insertion_attr.contains(';')) {
        return None;
    }
    let value = insertion_attr.split('=').nth(1)?.split(';').next()?;
    InsertionId::try_new(value.to_string()).ok()
}

/// An overlap record reduced to its merge key and gene call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedInsertion {
    pub insertion_id: Option<InsertionId>,
    pub gene: Option<GeneHit>,
}

impl ResolvedInsertion {
    pub fn key(&self) -> Option<String> {
        self.insertion_id.as_ref().map(|id| id.to_string())
    }

    pub fn gene_id(&self) -> Option<&str> {
        self.gene.as_ref().map(|g| g.gene_id.as_str())
    }

    pub fn strand(&self) -> Option<&str> {
        self.gene.as_ref().map(|g| g.strand.as_str())
    }
}

/// A row whose insertion field did not yield an id. Such rows are kept, but can
/// only appear in the merged table without a key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UnparsableKey {
    /// 1-based position among the overlap records.
    pub row: usize,
    pub field: String,
}

/// The outcome of normalizing an overlap table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NormalizedOverlaps {
    /// One entry per overlap record, in input order.
    pub insertions: Vec<ResolvedInsertion>,
    pub unparsable_keys: Vec<UnparsableKey>,
}

impl NormalizedOverlaps {
    pub fn len(&self) -> usize {
        self.insertions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.insertions.is_empty()
    }

    /// The number of insertions with a resolved gene.
    pub fn n_genes(&self) -> usize {
        self.insertions.iter().filter(|r| r.gene.is_some()).count()
    }
}

/// Resolves each overlap record into its insertion id and gene call.
///
/// Unparsable insertion ids are collected, not fatal. A gene-marked annotation
/// sub-record that cannot be decoded stops normalization with
/// [`InsertionError::MalformedAttribute`].
pub fn normalize(records: &[OverlapRecord]) -> Result<NormalizedOverlaps, InsertionError> {
    let mut out = NormalizedOverlaps {
        insertions: Vec::with_capacity(records.len()),
        unparsable_keys: Vec::new(),
    };

    for (idx, rec) in records.iter().enumerate() {
        let row = idx + 1;
        let insertion_id = extract_insertion_id(&rec.insertion_attr);
        if insertion_id.is_none() {
            warn!(
                "Could not extract an insertion id from overlap row {}: {:?}",
                row, rec.insertion_attr
            );
            out.unparsable_keys.push(UnparsableKey {
                row,
                field: rec.insertion_attr.clone(),
            });
        }

        let gene = extract_gene_and_strand(&rec.annotation_attr)
            .map_err(|source| InsertionError::MalformedAttribute { row, source })?;

        out.insertions.push(ResolvedInsertion { insertion_id, gene });
    }

    info!(
        "Normalized {} overlap records: {} with a gene, {} without an insertion id.",
        out.len(),
        out.n_genes(),
        out.unparsable_keys.len()
    );
    Ok(out)
}

/// Reads a raw overlap table and normalizes its records.
pub fn normalize_reader<R: BufRead>(reader: R) -> Result<NormalizedOverlaps, InsertionError> {
    let table = read_overlap_table(reader)?;
    normalize(&table.records)
}
