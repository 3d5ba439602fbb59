//! Outlook `.msg` parsing: compound-file property access, transport headers
//! and HTML carried in compressed RTF.

pub mod msg;
pub mod props;
pub mod rtf;
pub mod transport;
