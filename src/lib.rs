//! Wikibeamer - wiki-style markup to LaTeX/Beamer converter
//!
//! Converts a lightweight wiki-style markup (headings, lists, inline
//! markup, code blocks with Beamer overlay animations, autotemplate
//! preambles) into LaTeX beamer source. The conversion is a pure,
//! single-pass fold over the input line sequence; file reading, inclusion
//! and output live at the edges.
//!
//! ```
//! use wikibeamer::convert_to_beamer;
//!
//! let lines = vec!["== Introduction ==".to_string()];
//! let output = convert_to_beamer(&lines).unwrap();
//! assert!(output.join("").contains("\\section{Introduction}"));
//! ```

pub mod core;
pub mod include;
pub mod utils;

pub use core::driver::{convert_to_beamer, convert_to_beamer_full};
pub use core::joiner::{join_lines, munge_input_lines};
pub use core::state::ConversionState;
pub use include::{include_file_recursive, FileCache};
pub use utils::error::{ConversionError, ConversionResult};
