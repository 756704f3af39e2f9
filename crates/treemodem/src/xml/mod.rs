//! The XML encoding: human-readable records for diagnostics and
//! interchange with tooling that wants to look at the stream.
//!
//! Interface-equivalent to the packed engine: the same abstract contract
//! over a pre-parsed document tree instead of a byte stream.

pub mod document;

mod decode;
mod encode;

pub use decode::XmlDecoder;
pub use encode::XmlEncoder;

#[cfg(test)]
mod tests;
