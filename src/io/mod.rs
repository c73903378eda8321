//! Types and methods for talking to the backend and writing output.

pub mod file;
pub mod http;

pub use file::OutputFile;
pub use http::HttpSource;
