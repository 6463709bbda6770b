//! Vega core library exports

pub mod population;
