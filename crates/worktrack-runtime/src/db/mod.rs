mod error;
mod pool;

pub(crate) use error::{corrupt, DbResultExt};
pub use pool::Database;
