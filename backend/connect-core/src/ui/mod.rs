pub mod broker;
pub mod events;

pub use broker::{UiKey, UiOutcome, UiPromise, UiPromiseBroker};
pub use events::EventSink;
