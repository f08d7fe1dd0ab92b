
pub mod logging;
pub mod error;
pub mod modes;
pub mod generator;
pub mod batch;
