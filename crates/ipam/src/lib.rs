//! A simple IP address manager for a single CIDR range.
//!
//! [`Ipam`] hands out, reclaims and reserves individual addresses of one IPv4
//! or IPv6 CIDR block. It is pure in-process bookkeeping: no network I/O and
//! no internal locking.
//!
//! # Allocation modes
//!
//! - **Tracked** (prefix longer than 64 bits): every allocated address is
//!   recorded, [`Ipam::unallocated`] is exact, and allocation fails once the
//!   range is exhausted.
//! - **Untracked** (prefix of 64 bits or less): the range holds at least 2^64
//!   addresses and is treated as inexhaustible. Allocation simply walks the
//!   cursor, [`Ipam::unallocated`] reports `u64::MAX`, and reservations are
//!   not supported.
//!
//! # Examples
//!
//! ```
//! use std::net::IpAddr;
//!
//! use ipam::Ipam;
//!
//! let mut ipam = Ipam::new("1100::/120").unwrap();
//! assert_eq!(ipam.unallocated(), 256);
//!
//! let addr = ipam.allocate().unwrap();
//! assert_eq!(addr, "1100::".parse::<IpAddr>().unwrap());
//! assert_eq!(ipam.unallocated(), 255);
//!
//! ipam.free(addr);
//! assert_eq!(ipam.unallocated(), 256);
//! ```
//!
//! State can be persisted through a [`Snapshot`]:
//!
//! ```
//! use ipam::Ipam;
//!
//! let mut ipam = Ipam::new("12.0.0.0/29").unwrap();
//! ipam.reserve_first_and_last();
//! ipam.allocate().unwrap();
//!
//! let snapshot = ipam.export();
//! assert_eq!(snapshot.allocated, ["12.0.0.0", "12.0.0.1", "12.0.0.7"]);
//!
//! let restored = Ipam::import(&snapshot).unwrap();
//! assert_eq!(restored.unallocated(), 5);
//! ```

pub use ipaddr::{AddrRange, AddrValue};

pub use self::{
    engine::{AllocationMode, Ipam},
    error::IpamError,
    snapshot::Snapshot,
};

mod engine;
mod error;
mod snapshot;
