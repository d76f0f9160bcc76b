pub mod error;
pub mod item;
pub mod kind;

pub use error::{Result, StoreError};
pub use item::{Item, ItemId, Payload, merge_payload};
pub use kind::OperationKind;
