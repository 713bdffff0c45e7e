pub mod error;

pub use error::StanceError;
