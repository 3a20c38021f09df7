//! Joining resolved insertions into the template feature table, and reading and
//! writing that table.
//!
//! The join is a polars full outer join on the key column. Keys are emitted in
//! ascending order; rows sharing a key fan out as template rows × resolved rows, each
//! side in input order. Rows without a key never match anything: template rows without
//! a key follow the keyed rows, and resolved rows without a key come last.

use crate::error::InsertionError;
use crate::options::MergeOptions;
use crate::overlap::ResolvedInsertion;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::{debug, info, warn};

/// Reads the template table with every column as a string, so values are written back
/// exactly as they were read.
///
/// A zero-byte file stands for a blank template: a table holding only the key column
/// and no rows.
///
/// ### Arguments
/// * `file_path`: The comma-separated template file, header row included.
/// * `opts`: The merge options naming the key column.
///
/// ### Returns
/// The template table, or [`InsertionError::MissingKeyColumn`] if it has no key column.
pub fn read_template<T: AsRef<Path>>(
    file_path: T,
    opts: &MergeOptions,
) -> Result<DataFrame, InsertionError> {
    let file_path = file_path.as_ref();

    if std::fs::metadata(file_path)?.len() == 0 {
        info!(
            "The template {:?} is blank; starting from an empty '{}' column.",
            file_path, opts.key
        );
        let df = DataFrame::new(vec![Series::new_empty(&opts.key, &DataType::String)])?;
        return Ok(df);
    }

    let df = CsvReadOptions::default()
        .with_has_header(true)
        .with_infer_schema_length(Some(0))
        .try_into_reader_with_file_path(Some(file_path.to_path_buf()))?
        .finish()?;

    if df.get_column_index(&opts.key).is_none() {
        return Err(InsertionError::MissingKeyColumn {
            column: opts.key.clone(),
            path: file_path.to_path_buf(),
        });
    }

    debug!(
        "Read template {:?} with {} rows and {} columns.",
        file_path,
        df.height(),
        df.width()
    );
    Ok(df)
}

// Helper columns that only live during the join.
const JOIN_KEY: &str = "__join_key";
const RESOLVED_JOIN_KEY: &str = "__resolved_join_key";
const RESOLVED_KEY: &str = "__resolved_key";
const SORT_KEY: &str = "__sort_key";
const TEMPLATE_ROW: &str = "__template_row";
const RESOLVED_ROW: &str = "__resolved_row";

/// The key a template cell joins on: trimmed, and absent when empty.
fn join_key(cell: Option<&str>) -> Option<&str> {
    cell.map(str::trim).filter(|k| !k.is_empty())
}

/// Builds the right-hand side of the join: one row per resolved insertion, holding
/// its key, gene id and strand, plus its input position.
fn resolved_frame(
    resolved: &[ResolvedInsertion],
    opts: &MergeOptions,
) -> Result<DataFrame, InsertionError> {
    let keys: Vec<Option<String>> = resolved.iter().map(ResolvedInsertion::key).collect();
    let genes: Vec<Option<&str>> = resolved.iter().map(ResolvedInsertion::gene_id).collect();
    let strands: Vec<Option<&str>> = resolved.iter().map(ResolvedInsertion::strand).collect();

    let df = DataFrame::new(vec![
        Series::new(RESOLVED_JOIN_KEY, &keys),
        Series::new(RESOLVED_KEY, &keys),
        Series::new(&opts.gene_column, genes),
        Series::new(&opts.strand_column, strands),
    ])?
    .with_row_index(RESOLVED_ROW, None)?;
    Ok(df)
}

/// Joins `resolved` into `template` on the key column named in `opts`.
///
/// The output holds every template column in template order, followed by the gene and
/// strand columns unless the template already has columns of those names. Such template
/// columns are overwritten with the resolved values. Every other template column keeps
/// its values; cells with no source are null and are written as empty.
///
/// Template keys are trimmed before matching, and empty keys match nothing. The key
/// column itself keeps the template's value, or the insertion id on rows that only
/// exist on the overlap side.
///
/// The template table must contain the key column.
pub fn merge(
    template: &DataFrame,
    resolved: &[ResolvedInsertion],
    opts: &MergeOptions,
) -> Result<DataFrame, InsertionError> {
    let key_series = template.column(&opts.key)?.cast(&DataType::String)?;
    let join_keys: Vec<Option<&str>> = key_series.str()?.into_iter().map(join_key).collect();

    // output column order, and the template side with colliding columns dropped
    let mut output_columns: Vec<String> = Vec::with_capacity(template.width() + 2);
    let mut left_columns: Vec<Series> = Vec::with_capacity(template.width() + 1);
    for series in template.get_columns() {
        let name = series.name();
        output_columns.push(name.to_string());
        if name == opts.gene_column || name == opts.strand_column {
            warn!(
                "The template column '{}' is replaced by resolved values.",
                name
            );
            continue;
        }
        left_columns.push(series.cast(&DataType::String)?);
    }
    for name in [&opts.gene_column, &opts.strand_column] {
        if !output_columns.contains(name) {
            output_columns.push(name.clone());
        }
    }
    left_columns.push(Series::new(JOIN_KEY, join_keys));
    let left = DataFrame::new(left_columns)?.with_row_index(TEMPLATE_ROW, None)?;
    let right = resolved_frame(resolved, opts)?;

    // null keys never match, so unkeyed rows from either side stay on their own
    let from_template = col(TEMPLATE_ROW).is_not_null();
    let joined = left
        .lazy()
        .join(
            right.lazy(),
            [col(JOIN_KEY)],
            [col(RESOLVED_JOIN_KEY)],
            JoinArgs::new(JoinType::Full),
        )
        .with_columns([
            when(from_template.clone())
                .then(col(JOIN_KEY))
                .otherwise(col(RESOLVED_KEY))
                .alias(SORT_KEY),
            when(from_template)
                .then(col(&opts.key))
                .otherwise(col(RESOLVED_KEY))
                .alias(&opts.key),
        ])
        .sort(
            [SORT_KEY, TEMPLATE_ROW, RESOLVED_ROW],
            SortMultipleOptions::default()
                .with_nulls_last(true)
                .with_maintain_order(true),
        )
        .collect()?;

    let n_overlap_only = joined.column(TEMPLATE_ROW)?.null_count();
    let n_template_only = joined.column(RESOLVED_ROW)?.null_count();
    info!(
        "Merged {} rows: {} found on both sides, {} template-only, {} overlap-only.",
        joined.height(),
        joined.height() - n_overlap_only - n_template_only,
        n_template_only,
        n_overlap_only
    );

    Ok(joined.select(output_columns)?)
}

/// Writes `df` as comma-separated text with a header row, replacing any existing
/// file. Missing parent directories are created.
pub fn write_features<T: AsRef<Path>>(
    df: &mut DataFrame,
    file_path: T,
) -> Result<(), InsertionError> {
    let file_path = file_path.as_ref();
    if let Some(parent) = file_path.parent() {
        if !parent.as_os_str().is_empty() {
            std::fs::create_dir_all(parent)?;
        }
    }
    let mut file = File::create(file_path)?;
    CsvWriter::new(&mut file)
        .include_header(true)
        .with_separator(b',')
        .finish(df)?;
    info!("Wrote {} rows to {:?}", df.height(), file_path);
    Ok(())
}
