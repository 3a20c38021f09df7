use crate::error::InsertionError;
use crate::utils::open_line_reader;
use noodles::gff;
use std::io::BufRead;
use std::path::Path;
use tracing::{info, warn};

#[derive(Clone, Debug, PartialEq, Eq)]
/// A GFF3 feature reduced to what overlap search needs.
///
/// # Fields
///
/// * `seqid`: The reference sequence (chromosome) name.
/// * `feature_type`: The feature type column, e.g. `gene` or `exon`.
/// * `start`, `end`: 1-based, inclusive coordinates, as written in the file.
/// * `strand`: `+`, `-`, or `.` when the record carries no usable strand.
/// * `attributes`: The attribute column as a `key=value;...` string.
pub struct GffInterval {
    pub seqid: String,
    pub feature_type: String,
    pub start: u64,
    pub end: u64,
    pub strand: String,
    pub attributes: String,
}

impl GffInterval {
    /// The `seqid:start-end` label of this feature.
    pub fn locus(&self) -> String {
        format!("{}:{}-{}", self.seqid, self.start, self.end)
    }
}

/// Reads every feature record of a GFF3 file.
///
/// Gzip compression is detected from the magic bytes. Comments and directives
/// are counted and skipped. A record noodles cannot parse is reported as
/// [`InsertionError::Gff`] naming the file.
///
/// ### Arguments
/// * `file_path`: The path to the GFF3 file.
///
/// ### Returns
/// The feature records in file order.
pub fn read_gff_intervals<T: AsRef<Path>>(
    file_path: T,
) -> Result<Vec<GffInterval>, InsertionError> {
    let file_path = file_path.as_ref();
    let rdr = open_line_reader(file_path)?;
    _read_gff_intervals(rdr).map_err(|e| InsertionError::Gff {
        path: file_path.to_path_buf(),
        reason: e.to_string(),
    })
}

/// Like [`read_gff_intervals`], for GFF3 text available as any [`BufRead`].
pub fn read_gff_intervals_from_reader<R: BufRead>(
    reader: R,
) -> Result<Vec<GffInterval>, InsertionError> {
    Ok(_read_gff_intervals(reader)?)
}

fn _read_gff_intervals<R: BufRead>(reader: R) -> std::io::Result<Vec<GffInterval>> {
    let mut rdr = gff::Reader::new(reader);
    let mut intervals = Vec::new();
    let mut n_comments = 0usize;
    let mut n_directives = 0usize;
    let mut n_strand_unknown = 0usize;

    for l in rdr.lines() {
        match l? {
            gff::Line::Record(r) => {
                let strand = match r.strand() {
                    gff::record::Strand::Forward => String::from("+"),
                    gff::record::Strand::Reverse => String::from("-"),
                    _ => {
                        n_strand_unknown += 1;
                        String::from(".")
                    }
                };
                intervals.push(GffInterval {
                    seqid: r.reference_sequence_name().to_string(),
                    feature_type: r.ty().to_string(),
                    start: r.start().get() as u64,
                    end: r.end().get() as u64,
                    strand,
                    attributes: r.attributes().to_string(),
                });
            }
            gff::Line::Comment(_) => {
                n_comments += 1;
            }
            gff::Line::Directive(_) => {
                n_directives += 1;
            }
        }
    }

    if n_strand_unknown > 0 {
        warn!(
            "{} records have no or unknown strand information, reported as '.'",
            n_strand_unknown
        );
    }
    info!(
        "Finished parsing the input file. Found {} comments, {} directives, and {} records.",
        n_comments,
        n_directives,
        intervals.len()
    );
    Ok(intervals)
}
