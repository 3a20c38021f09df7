//! Decoding of the nested annotation-attribute strings emitted by the overlap engine.
//!
//! An annotation-attribute string packs every annotation feature overlapping an
//! insertion into one field. The grammar is
//!
//! ```text
//! annotation  := sub_record ( '|' sub_record )*
//! sub_record  := token ( ';' token )*
//! token       := key '=' value | 'Strand:' strand | flag
//! ```
//!
//! A sub-record describes a gene feature when it carries the marker attribute
//! `logic_name=cshl_gene`; every other sub-record (exons, mRNAs, ...) is ignored.
//! Only the *first* gene-marked sub-record is used.

use crate::error::AttributeError;

/// Separates the sub-records of one annotation-attribute string.
pub const SUB_RECORD_DELIMITER: char = '|';
/// Separates the attribute tokens of one sub-record.
pub const ATTRIBUTE_DELIMITER: char = ';';
/// Separates an attribute key from its value.
pub const KEY_VALUE_DELIMITER: char = '=';
/// Introduces the strand of the feature described by a sub-record.
pub const STRAND_MARKER: &str = "Strand:";
/// Marks a sub-record as a gene feature.
pub const GENE_MARKER: &str = "logic_name=cshl_gene";

const ID_KEY: &str = "ID";

/// One attribute token of a sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Attribute<'a> {
    /// A `key=value` pair, split on the first `=`.
    Pair { key: &'a str, value: &'a str },
    /// Any token without a `=`, such as `Strand:+`.
    Flag(&'a str),
}

/// A borrowed view of one `|`-delimited sub-record.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SubRecord<'a> {
    raw: &'a str,
}

impl<'a> SubRecord<'a> {
    pub fn new(raw: &'a str) -> Self {
        SubRecord { raw }
    }

    pub fn as_str(&self) -> &'a str {
        self.raw
    }

    /// Whether this sub-record carries the gene marker.
    pub fn is_gene(&self) -> bool {
        self.raw.contains(GENE_MARKER)
    }

    /// Iterates over the `;`-delimited attribute tokens, skipping empty ones.
    pub fn attributes(&self) -> impl Iterator<Item = Attribute<'a>> + 'a {
        self.raw
            .split(ATTRIBUTE_DELIMITER)
            .filter(|token| !token.is_empty())
            .map(|token| match token.split_once(KEY_VALUE_DELIMITER) {
                Some((key, value)) => Attribute::Pair { key, value },
                None => Attribute::Flag(token),
            })
    }

    /// Returns the value of the first attribute named `key`.
    pub fn get(&self, key: &str) -> Option<&'a str> {
        self.attributes().find_map(|attr| match attr {
            Attribute::Pair { key: k, value } if k == key => Some(value),
            _ => None,
        })
    }

    /// The feature id: the `ID` attribute if there is one, otherwise the value
    /// of the first `key=value` token.
    pub fn gene_id(&self) -> Result<&'a str, AttributeError> {
        let id = match self.get(ID_KEY) {
            Some(id) => id,
            None => self
                .attributes()
                .find_map(|attr| match attr {
                    Attribute::Pair { value, .. } => Some(value),
                    Attribute::Flag(_) => None,
                })
                .ok_or_else(|| AttributeError::MissingDelimiter {
                    delimiter: "=",
                    sub_record: self.raw.to_string(),
                })?,
        };
        if id.is_empty() {
            return Err(AttributeError::EmptyValue {
                field: "gene id",
                sub_record: self.raw.to_string(),
            });
        }
        Ok(id)
    }

    /// The strand text: everything after the first `Strand:` up to a following
    /// `Strand:`, if any. Trailing text is kept as is.
    pub fn strand(&self) -> Result<&'a str, AttributeError> {
        let strand = self
            .raw
            .split(STRAND_MARKER)
            .nth(1)
            .ok_or_else(|| AttributeError::MissingDelimiter {
                delimiter: STRAND_MARKER,
                sub_record: self.raw.to_string(),
            })?;
        if strand.is_empty() {
            return Err(AttributeError::EmptyValue {
                field: "strand",
                sub_record: self.raw.to_string(),
            });
        }
        Ok(strand)
    }
}

/// Splits an annotation-attribute string into its sub-records.
pub fn sub_records(annotation_attr: &str) -> impl Iterator<Item = SubRecord<'_>> {
    annotation_attr.split(SUB_RECORD_DELIMITER).map(SubRecord::new)
}

/// The gene overlapping an insertion together with its strand. Both are
/// always taken from the same gene-marked sub-record.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct GeneHit {
    pub gene_id: String,
    pub strand: String,
}

impl GeneHit {
    pub fn new<T: Into<String>, S: Into<String>>(gene_id: T, strand: S) -> Self {
        GeneHit {
            gene_id: gene_id.into(),
            strand: strand.into(),
        }
    }

    pub fn into_parts(self) -> (String, String) {
        (self.gene_id, self.strand)
    }
}

/// Extracts the gene id and strand from an annotation-attribute string.
///
/// Returns [Ok]`(None)` when no sub-record carries the gene marker. When one or
/// more do, only the first is decoded; later gene-marked sub-records are
/// discarded. A gene-marked sub-record lacking its id or `Strand:` is a format
/// violation and yields an [`AttributeError`].
///
/// ### Example
///
/// ```rust
/// use insertion_features::attributes::{extract_gene_and_strand, GeneHit};
///
/// let hit = extract_gene_and_strand("foo|ID=GENE123;type=gene;logic_name=cshl_gene;Strand:+|bar")?;
/// assert_eq!(hit, Some(GeneHit::new("GENE123", "+")));
/// assert_eq!(extract_gene_and_strand("ID=exon1;Strand:+")?, None);
/// # Ok::<(), insertion_features::error::AttributeError>(())
/// ```
pub fn extract_gene_and_strand(annotation_attr: &str) -> Result<Option<GeneHit>, AttributeError> {
    let Some(gene) = sub_records(annotation_attr).find(SubRecord::is_gene) else {
        return Ok(None);
    };
    let gene_id = gene.gene_id()?;
    let strand = gene.strand()?;
    Ok(Some(GeneHit::new(gene_id, strand)))
}
