pub mod gff;
pub use gff::GffInterval;
