//! Worktrack data model.

mod code;
mod enums;
mod inputs;
mod models;
mod views;

pub use code::ProjectCode;
pub use enums::*;
pub use inputs::*;
pub use models::*;
pub use views::*;
