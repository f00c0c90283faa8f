#![warn(rust_2018_idioms)]

pub mod checkpoint;
pub mod crossover;
mod error;
pub mod driver;
pub mod grow;
pub mod history;
pub mod mutation;
pub mod population;
pub mod selection;

pub use error::EvolveError;
