pub mod classify;
pub mod decode;
pub mod filter;
pub mod nms;

pub use classify::{Candidate, ClassMapper};
pub use decode::{RawCandidate, RawModelOutput, TensorDecoder};
pub use filter::ConfidenceFilter;
pub use nms::Suppressor;
