pub mod csv_parser;
pub mod csv_serializer;

pub use csv_parser::{parse_records, parse_rows};
pub use csv_serializer::serialize_records;
