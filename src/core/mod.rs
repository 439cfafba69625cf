pub mod dates;
pub mod etl;
pub mod loader;
pub mod validator;

pub use crate::domain::model::{Batch, Record, TransformResult};
pub use crate::domain::ports::{ConfigProvider, Pipeline, Sink};
pub use crate::utils::error::Result;
