//! `insertion_features` resolves Ds-GFP insertion loci against a reference genome
//! annotation. It reports which gene (if any) overlaps each insertion and on which
//! strand that gene lies, and merges the result into a caller-supplied feature table
//! keyed by insertion identifier.
//!
//! A run goes through four steps:
//!
//! 1. an [`engine::OverlapEngine`] reports, per insertion, the packed attributes of
//!    every overlapping annotation feature;
//! 2. [`overlap::normalize`] drops nothing but the engine's spurious header row,
//!    extracts the insertion key and decodes the first gene-marked sub-record with
//!    [`attributes::extract_gene_and_strand`];
//! 3. [`merge::merge`] outer-joins the result into the template table;
//! 4. [`merge::write_features`] persists the merged table.
//!
//! [`pipeline::run`] chains these steps for a [`options::PipelineConfig`].

pub mod attributes;
pub mod engine;
pub mod error;
pub mod merge;
pub mod options;
pub mod overlap;
pub mod pipeline;
pub mod reader;
pub mod utils;

pub use attributes::{extract_gene_and_strand, GeneHit};
pub use engine::{ExternalEngine, LapperEngine, OverlapEngine, PrecomputedEngine};
pub use error::{AttributeError, InsertionError};
pub use options::{MergeOptions, PipelineConfig};
pub use overlap::{InsertionId, OverlapRecord, ResolvedInsertion};
pub use pipeline::{run, PipelineSummary};
