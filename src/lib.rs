//! `msgreader`: open Outlook `.msg` files as safe HTML.
//!
//! The library reads a `.msg` compound file, writes its attachments to a
//! scratch directory, sanitizes the HTML body (resolving inline `cid:`
//! images to the saved files) and exports the message to `.eml`. A
//! [`session::Session`] ties these together behind a command boundary.

pub mod config;
pub mod error;
pub mod export;
pub mod i18n;
pub mod launch;
pub mod model;
pub mod parser;
pub mod render;
pub mod scratch;
pub mod session;
