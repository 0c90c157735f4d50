pub mod error;

pub use error::{OglError, Result};
