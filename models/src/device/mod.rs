pub mod builder;
pub mod features;
