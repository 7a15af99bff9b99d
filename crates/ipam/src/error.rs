use core::net::{AddrParseError, IpAddr};

use ipaddr::RangeError;
use ipnet::IpNet;
use snafu::Snafu;
use snafu_utils::{Located, Location};

/// Errors returned by [`Ipam`](crate::Ipam) operations.
#[derive(Debug, Snafu)]
#[snafu(visibility(pub(crate)))]
pub enum IpamError {
    #[snafu(display("invalid CIDR range"))]
    InvalidCidr {
        #[snafu(source)]
        source: RangeError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("no addresses left in {cidr}"))]
    AddressExhausted {
        cidr: IpNet,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("address {addr} is outside of {cidr}"))]
    AddressOutOfRange {
        addr: IpAddr,
        cidr: IpNet,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("address {addr} is already allocated"))]
    AlreadyAllocated {
        addr: IpAddr,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("{operation} is not supported on untracked range {cidr}"))]
    NotSupported {
        operation: &'static str,
        cidr: IpNet,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid address {text:?}"))]
    InvalidAddress {
        text: String,
        #[snafu(source)]
        source: AddrParseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("invalid cursor position"))]
    InvalidCursor {
        #[snafu(source)]
        source: RangeError,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for IpamError {
    fn location(&self) -> Location {
        match self {
            Self::InvalidCidr { location, .. }
            | Self::AddressExhausted { location, .. }
            | Self::AddressOutOfRange { location, .. }
            | Self::AlreadyAllocated { location, .. }
            | Self::NotSupported { location, .. }
            | Self::InvalidAddress { location, .. }
            | Self::InvalidCursor { location, .. } => *location,
        }
    }
}
