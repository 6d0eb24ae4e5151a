pub mod range;
pub mod version;
