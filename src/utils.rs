use flate2::bufread::MultiGzDecoder;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing::trace;

/// The column used to join resolved insertions against the template table.
pub const DEFAULT_KEY_COLUMN: &str = "Ds_GFP_allele";
pub const DEFAULT_GENE_COLUMN: &str = "gene_id";
pub const DEFAULT_STRAND_COLUMN: &str = "strand";

// the fixed file layout of a run directory
pub const ANNOTATION_FILE: &str = "genome_annotation.gff3";
pub const INSERTION_FILE: &str = "insertion_location.gff3";
pub const TEMPLATE_FILE: &str = "template.csv";
pub const ENGINE_SCRIPT_FILE: &str = "gff_genomics.pl";
pub const OUTPUT_FILE: &str = "new_insertion_features.csv";
pub const OVERLAP_TABLE_FILE: &str = "bisearch_overlaps.tab";

pub(crate) const COMMENT_PREFIX: char = '#';

/// Type alias for a line reader that may be backed by either a plain
/// or a gzip-compressed file.
pub type LineReader = Box<dyn BufRead>;

/// Tests if the stream underlying the [BufReader] `reader` is gzipped or not by examining the
/// first 2 bytes for the magic header.  This function *requires*, but does not check, that
/// none of the stream has yet been consumed. It will fill the buffer to examine the first
/// two bytes, but will not consume them.
///
/// If the first 2 bytes could not be succesfully read, then this
/// returns the relevant [std::io::Error].
pub fn is_gzipped<T: BufRead>(reader: &mut T) -> std::io::Result<bool> {
    const GZIP_MAGIC_NUMBER: [u8; 2] = [0x1f, 0x8b];

    let src = reader.fill_buf()?;
    if src.get(..2) == Some(&GZIP_MAGIC_NUMBER) {
        Ok(true)
    } else {
        Ok(false)
    }
}

/// Opens `p` for line-oriented reading, transparently decompressing it
/// when it is gzipped.
pub fn open_line_reader<T: AsRef<Path>>(p: T) -> std::io::Result<LineReader> {
    let file = File::open(p.as_ref())?;
    let mut inner_rdr = BufReader::new(file);
    if is_gzipped(&mut inner_rdr)? {
        trace!(
            "auto-detected gzipped file {:?} - reading via decompression",
            p.as_ref()
        );
        Ok(Box::new(BufReader::new(MultiGzDecoder::new(inner_rdr))))
    } else {
        Ok(Box::new(inner_rdr))
    }
}

/// Returns the paths among `paths` that do not point to an existing file,
/// preserving their order.
pub fn missing_files<'a, I>(paths: I) -> Vec<PathBuf>
where
    I: IntoIterator<Item = &'a Path>,
{
    paths
        .into_iter()
        .filter(|p| !p.is_file())
        .map(Path::to_path_buf)
        .collect()
}

// Returns `true` if the line carries no data: blank, or a `#` comment.
pub(crate) fn is_skippable_line(line: &str) -> bool {
    let trimmed = line.trim();
    trimmed.is_empty() || trimmed.starts_with(COMMENT_PREFIX)
}
