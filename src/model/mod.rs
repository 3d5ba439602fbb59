//! Core data model types: parsed messages, attachments, and addresses.

pub mod address;
pub mod attachment;
pub mod message;
