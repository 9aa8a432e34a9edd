//! Logging pipeline
//!
//! Renders command results as text and writes them to the console and, when
//! enabled, to a timestamped log file.

mod format;
mod sink;

pub use format::{csv_row, hex_rows, iac_position, raw_frames, timestamp, verbose_block, CSV_HEADER};
pub use sink::{log_file_name, LogFile, LogSink};
