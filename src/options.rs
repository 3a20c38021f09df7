use crate::utils::{
    ANNOTATION_FILE, DEFAULT_GENE_COLUMN, DEFAULT_KEY_COLUMN, DEFAULT_STRAND_COLUMN,
    INSERTION_FILE, OUTPUT_FILE, TEMPLATE_FILE,
};
use std::path::{Path, PathBuf};
use tracing::warn;

#[derive(Clone, Debug, PartialEq, Eq)]
/// Column naming used when merging resolved insertions into the template table.
///
/// # Fields
///
/// * `key`: The join column. It must exist in the template table; resolved insertions
///   contribute their insertion id under this name.
/// * `gene_column`: The output column receiving the overlapping gene id.
/// * `strand_column`: The output column receiving the strand of that gene.
///
/// # Examples
///
/// ```rust
/// use insertion_features::options::MergeOptions;
///
/// let mo = MergeOptions::default();
/// assert_eq!(mo.key, "Ds_GFP_allele");
///
/// let mo = MergeOptions::new("Ds_GFP_allele", "v5_gene", "Gene_ID_strand");
/// assert_eq!(mo.gene_column, "v5_gene");
/// ```
pub struct MergeOptions {
    pub key: String,
    pub gene_column: String,
    pub strand_column: String,
}

impl Default for MergeOptions {
    fn default() -> MergeOptions {
        MergeOptions {
            key: String::from(DEFAULT_KEY_COLUMN),
            gene_column: String::from(DEFAULT_GENE_COLUMN),
            strand_column: String::from(DEFAULT_STRAND_COLUMN),
        }
    }
}

impl MergeOptions {
    /// Creates a new `MergeOptions` with the given column names.
    ///
    /// Naming the gene or strand column after the key makes no sense, since the key
    /// would then be overwritten by resolved values. This is reported with a warning
    /// and the clashing name is replaced by its default.
    pub fn new<K: AsRef<str>, G: AsRef<str>, S: AsRef<str>>(
        key: K,
        gene_column: G,
        strand_column: S,
    ) -> MergeOptions {
        let key = key.as_ref().to_string();
        let mut gene_column = gene_column.as_ref().to_string();
        let mut strand_column = strand_column.as_ref().to_string();

        if gene_column == key {
            warn!(
                "The gene column cannot share the key name `{}`; using `{}` instead.",
                key, DEFAULT_GENE_COLUMN
            );
            gene_column = String::from(DEFAULT_GENE_COLUMN);
        }
        if strand_column == key || strand_column == gene_column {
            warn!(
                "The strand column must differ from the key and gene columns; using `{}` instead.",
                DEFAULT_STRAND_COLUMN
            );
            strand_column = String::from(DEFAULT_STRAND_COLUMN);
        }

        MergeOptions {
            key,
            gene_column,
            strand_column,
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq)]
/// The input and output locations of one pipeline run.
///
/// # Fields
///
/// * `annotation`: The reference genome annotation (GFF3).
/// * `insertions`: The insertion locations (GFF3).
/// * `template`: The feature table (CSV) resolved genes are merged into.
/// * `output`: Where the merged feature table is written. An existing file is overwritten.
/// * `keep_overlaps`: If set, the raw overlap table produced by the engine is also saved here.
/// * `merge`: Column naming for the merge step.
pub struct PipelineConfig {
    pub annotation: PathBuf,
    pub insertions: PathBuf,
    pub template: PathBuf,
    pub output: PathBuf,
    pub keep_overlaps: Option<PathBuf>,
    pub merge: MergeOptions,
}

impl PipelineConfig {
    pub fn new<A, I, T, O>(annotation: A, insertions: I, template: T, output: O) -> PipelineConfig
    where
        A: Into<PathBuf>,
        I: Into<PathBuf>,
        T: Into<PathBuf>,
        O: Into<PathBuf>,
    {
        PipelineConfig {
            annotation: annotation.into(),
            insertions: insertions.into(),
            template: template.into(),
            output: output.into(),
            keep_overlaps: None,
            merge: MergeOptions::default(),
        }
    }

    /// The conventional layout of a run directory: `genome_annotation.gff3`,
    /// `insertion_location.gff3` and `template.csv` as inputs, and
    /// `new_insertion_features.csv` as output, all inside `dir`.
    pub fn in_dir<P: AsRef<Path>>(dir: P) -> PipelineConfig {
        let dir = dir.as_ref();
        PipelineConfig::new(
            dir.join(ANNOTATION_FILE),
            dir.join(INSERTION_FILE),
            dir.join(TEMPLATE_FILE),
            dir.join(OUTPUT_FILE),
        )
    }

    pub fn with_merge_options(mut self, merge: MergeOptions) -> PipelineConfig {
        self.merge = merge;
        self
    }

    pub fn with_keep_overlaps(mut self, path: Option<PathBuf>) -> PipelineConfig {
        self.keep_overlaps = path;
        self
    }

    /// The files that must exist before a run starts.
    pub fn input_files(&self) -> [&Path; 3] {
        [
            self.annotation.as_path(),
            self.insertions.as_path(),
            self.template.as_path(),
        ]
    }
}
