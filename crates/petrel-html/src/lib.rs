//! # Petrel HTML
//!
//! HTML tokenizer for the Petrel pipeline.
//!
//! This is a small, well-formed-input subset of the HTML5 tokenization
//! algorithm: start tags, end tags, attributes in all three quoting styles,
//! self-closing tags, and single-character text tokens. Comments, doctypes,
//! character references, and CDATA are out of scope; text coalescing is the
//! tree builder's job, not the tokenizer's.

pub mod tokenizer;

pub use tokenizer::{tokenize, Attribute, Token, Tokenizer};
