pub mod sign_typed_data;
pub mod typed_data;

pub use sign_typed_data::EthereumSignTypedData;
