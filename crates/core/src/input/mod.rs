//! Input model: delimited segment sequences and named request partitions.

mod data;
mod sequence;

pub use data::{RequestData, HEAD};
pub use sequence::{IntoSegments, SegmentSequence, DELIMITER};
