pub mod attempt_reader;

pub use attempt_reader::{AttemptReader, AttemptRecord};
