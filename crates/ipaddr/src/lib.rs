//! IP addresses as 128-bit integers, and CIDR ranges over them.
//!
//! [`AddrValue`] normalizes IPv4 and IPv6 addresses into one totally ordered,
//! hashable 128-bit value. [`AddrRange`] derives the bounds and the address
//! count of a CIDR block and owns a cursor that steps through it, wrapping at
//! the end.
//!
//! # Examples
//!
//! ```
//! use ipaddr::{AddrRange, AddrValue};
//!
//! let range = AddrRange::parse("1000::/126").unwrap();
//! assert_eq!(range.size(), 4);
//! assert!(range.contains("1000::3".parse::<AddrValue>().unwrap()));
//! assert!(!range.contains("1000::4".parse::<AddrValue>().unwrap()));
//! ```

pub use self::{
    range::{AddrRange, RangeError},
    value::AddrValue,
};

mod range;
mod value;
