//! Wire format for the remote store
//!
//! Defines the tagged attribute representation and the transcoder between it
//! and native [`Value`](crate::value::Value)s.

pub mod attribute;
pub mod transcode;

pub use attribute::{AttributeValue, Item};
pub use transcode::{
    from_wire, from_wire_field, item_to_record, record_to_item, to_wire, to_wire_map,
};
