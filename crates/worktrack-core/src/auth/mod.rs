mod actor;

pub use actor::Actor;
