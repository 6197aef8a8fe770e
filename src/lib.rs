pub mod config;
pub mod error;
pub mod event;
pub mod gate;
pub mod page;
pub mod script;
pub mod sections;
pub mod stack;
pub mod telemetry;

#[cfg(test)]
mod testing;
