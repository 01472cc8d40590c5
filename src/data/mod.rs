//! Incoming sample lines: parsing and sources

mod parser;
pub mod source;

pub use parser::{parse_line, ParseError, ParsedLine, Sample};
pub use source::{open_source, DataSource, SerialSource, SourceError, SyntheticSource};
