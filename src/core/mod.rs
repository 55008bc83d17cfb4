// Core modules implementing table decoding, ordered JSONL encoding, and error modeling.
pub mod convert;
pub mod error;
pub mod profile;
pub mod reader;
pub mod table;
pub mod writer;
