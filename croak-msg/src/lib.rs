//! Low-level representation of CoAP messages, operated on in place.
//!
//! `croak_msg` never builds an owned message struct. A message lives in a
//! caller-provided byte buffer (for `croak`, a block in the message pool)
//! and everything in this crate reads or edits that buffer directly:
//!
//! - [`Header`] is the fixed 4-byte prefix (version, type, token length, code, id)
//! - [`Body`] is everything after it: token, options, `0xFF`, payload
//! - [`opt`] encodes and decodes single option headers
//! - [`validate`] walks an inbound request body and extracts what a
//!   request handler needs (Uri-Path, Uri-Query, Content-Format, ...)
//!
//! ```
//! use croak_msg::{opt::known, Body, OptNumber};
//!
//! let mut buf = [0u8; 32];
//! let mut len = 0;
//! let mut body = Body::new(&mut buf, &mut len, 0);
//!
//! body.add_str_option(known::URI_PATH, b"a", OptNumber(0)).unwrap();
//! body.add_uint_option(known::CONTENT_FORMAT, 0, known::URI_PATH).unwrap();
//!
//! assert_eq!(body.as_bytes(), &[0xB1, b'a', 0x11, 0x00]);
//! ```

// x-release-please-start-version
#![doc(html_root_url = "https://docs.rs/croak-msg/0.1.0")]
// x-release-please-end
#![cfg_attr(not(feature = "std"), no_std)]
#![cfg_attr(not(test), forbid(missing_debug_implementations, unreachable_pub))]
#![cfg_attr(not(test), deny(unsafe_code, missing_copy_implementations))]
#![cfg_attr(any(docsrs, feature = "docs"), feature(doc_cfg))]
#![deny(missing_docs)]

mod cursor;

mod body;
mod msg;

/// Option numbers, option header codec and option errors
pub mod opt;

/// Inbound request validation
pub mod validate;

#[doc(inline)]
pub use body::*;
#[doc(inline)]
pub use msg::*;
#[doc(inline)]
pub use opt::{OptError, OptNumber};
#[doc(inline)]
pub use validate::{validate, Malformed, Parsed};

/// Byte separating the options from the payload
pub const PAYLOAD_MARKER: u8 = 0xFF;

/// Largest legal token length
pub const MAX_TOKEN_LEN: u8 = 8;
