pub mod catalog;
pub mod engine;
pub mod export;
pub mod limits;
pub mod model;
pub mod notify;
pub mod observability;
pub mod sql;
pub mod wire;
