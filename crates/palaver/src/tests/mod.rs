//! Unit tests for the palaver crate.

mod dispatch_tests;
mod pipeline_tests;
mod reader_tests;
mod tokenize_tests;
