pub mod booking;
pub mod catalog;
pub mod currency;
pub mod demo;
pub mod error;
pub mod facility;
pub mod identity;
pub mod livestock;
pub mod market;
pub mod pricing;

pub use error::{MarketError, Result};
