pub mod vinted_parser;

pub use vinted_parser::{Parser, VintedParser};
