//! Session frame codec.
//!
//! - `frame`: bounds-checked decoder for `mozLz40` frames
//! - `session`: tab snapshots parsed from decoded session documents

pub mod frame;
pub mod session;

pub use frame::{decode, decode_file, encode_header};
pub use session::{load_session_tabs, parse_session, SessionSnapshot, SessionWindow};
