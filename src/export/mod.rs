//! Writing message content to disk: attachments into the scratch directory
//! and whole messages as `.eml`.

pub mod attachment;
pub mod eml;
