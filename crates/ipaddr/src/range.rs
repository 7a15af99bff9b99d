use core::{fmt, net::IpAddr, str::FromStr};

use ipnet::IpNet;
use snafu::{ResultExt as _, Snafu, ensure};
use snafu_utils::{Located, Location};

use crate::AddrValue;

/// Prefix length, in the 128-bit form, at or below which the address count
/// no longer fits in a `u64`.
const SATURATED_PREFIX_LEN: u8 = 64;

/// Errors that can occur when building or repositioning an [`AddrRange`].
#[derive(Debug, Snafu)]
#[snafu(module)]
pub enum RangeError {
    #[snafu(display("invalid CIDR {cidr:?}"))]
    InvalidCidr {
        cidr: String,
        #[snafu(source)]
        source: ipnet::AddrParseError,
        #[snafu(implicit)]
        location: Location,
    },
    #[snafu(display("address {addr} is outside of {cidr}"))]
    CursorOutOfRange {
        addr: IpAddr,
        cidr: IpNet,
        #[snafu(implicit)]
        location: Location,
    },
}

impl Located for RangeError {
    fn location(&self) -> Location {
        match self {
            Self::InvalidCidr { location, .. } | Self::CursorOutOfRange { location, .. } => {
                *location
            }
        }
    }
}

/// The addresses covered by one CIDR block, plus a stepping cursor.
///
/// Bounds and size are computed once from the CIDR; afterwards only the
/// cursor moves. The cursor always lies within `first..=last`.
///
/// # Examples
///
/// ```
/// use ipaddr::AddrRange;
///
/// let mut range = AddrRange::parse("10.10.10.8/30").unwrap();
/// assert_eq!(range.size(), 4);
/// assert_eq!(range.current().to_string(), "10.10.10.8");
///
/// for _ in 0..3 {
///     range.step();
/// }
/// assert_eq!(range.current().to_string(), "10.10.10.11");
///
/// range.step(); // wraps
/// assert_eq!(range.current(), range.first());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddrRange {
    net: IpNet,
    prefix_len: u8,
    first: AddrValue,
    last: AddrValue,
    current: AddrValue,
    size: u64,
}

impl AddrRange {
    /// Parses CIDR text such as `"10.0.0.0/24"` or `"1000::/120"`.
    ///
    /// Host bits set in the address part are ignored.
    pub fn parse(cidr: &str) -> Result<Self, RangeError> {
        let net = cidr
            .parse::<IpNet>()
            .context(range_error::InvalidCidrSnafu { cidr })?;
        Ok(Self::from_net(net))
    }

    /// Builds the range covered by `net`, with the cursor on the first address.
    #[must_use]
    pub fn from_net(net: IpNet) -> Self {
        let net = net.trunc();
        let prefix_len = match net {
            IpNet::V4(v4) => v4.prefix_len() + 96,
            IpNet::V6(v6) => v6.prefix_len(),
        };
        let addr = AddrValue::from(net.addr());
        let mask = AddrValue::prefix_mask(prefix_len);
        let first = addr & mask;
        let last = addr | !mask;
        Self {
            net,
            prefix_len,
            first,
            last,
            current: first,
            size: range_size(prefix_len),
        }
    }

    /// Returns the CIDR this range was built from, with host bits cleared.
    #[must_use]
    pub fn net(&self) -> IpNet {
        self.net
    }

    /// Returns the prefix length in the 128-bit form (IPv4 lengths plus 96).
    #[must_use]
    pub fn prefix_len(&self) -> u8 {
        self.prefix_len
    }

    #[must_use]
    pub fn first(&self) -> AddrValue {
        self.first
    }

    #[must_use]
    pub fn last(&self) -> AddrValue {
        self.last
    }

    #[must_use]
    pub fn current(&self) -> AddrValue {
        self.current
    }

    /// Returns the number of addresses in the range.
    ///
    /// Ranges of 2^64 addresses or more report `u64::MAX`.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.size
    }

    /// Returns `true` if [`AddrRange::size`] is saturated rather than exact.
    #[must_use]
    pub fn is_saturated(&self) -> bool {
        self.prefix_len <= SATURATED_PREFIX_LEN
    }

    #[must_use]
    pub fn contains(&self, value: AddrValue) -> bool {
        self.first <= value && value <= self.last
    }

    /// Moves the cursor to the next address, wrapping from `last` to `first`.
    pub fn step(&mut self) {
        if self.current < self.last {
            self.current.increment();
        } else {
            self.current = self.first;
        }
    }

    /// Places the cursor on `value`.
    ///
    /// The cursor is left untouched if `value` is outside the range.
    pub fn seek(&mut self, value: AddrValue) -> Result<(), RangeError> {
        ensure!(
            self.contains(value),
            range_error::CursorOutOfRangeSnafu {
                addr: value.to_ip(),
                cidr: self.net,
            }
        );
        self.current = value;
        Ok(())
    }
}

impl FromStr for AddrRange {
    type Err = RangeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl fmt::Display for AddrRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.net, f)
    }
}

const fn range_size(prefix_len: u8) -> u64 {
    if prefix_len <= SATURATED_PREFIX_LEN {
        u64::MAX
    } else {
        1 << (128 - prefix_len)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[track_caller]
    fn create(cidr: &str, current: &str, last: &str, size: u64) -> AddrRange {
        let range = AddrRange::parse(cidr).unwrap();
        assert_eq!(range.current().to_string(), current);
        assert_eq!(range.current(), range.first());
        assert_eq!(range.last().to_string(), last);
        assert_eq!(range.size(), size);
        range
    }

    #[track_caller]
    fn step(range: &mut AddrRange, current: &str) {
        range.step();
        assert_eq!(range.current().to_string(), current);
    }

    #[test]
    fn test_ipv4_range() {
        let mut r = create("10.0.0.0/24", "10.0.0.0", "10.0.0.255", 256);
        step(&mut r, "10.0.0.1");
        step(&mut r, "10.0.0.2");
        step(&mut r, "10.0.0.3");
        assert_eq!(r.prefix_len(), 120);
    }

    #[test]
    fn test_single_address_ranges() {
        let mut r = create("1000::2222/128", "1000::2222", "1000::2222", 1);
        step(&mut r, "1000::2222");
        step(&mut r, "1000::2222");

        let mut r = create("10.0.0.22/32", "10.0.0.22", "10.0.0.22", 1);
        step(&mut r, "10.0.0.22");
        step(&mut r, "10.0.0.22");
    }

    #[test]
    fn test_step_wraps_to_first() {
        let mut r = create("10.10.10.8/30", "10.10.10.8", "10.10.10.11", 4);
        step(&mut r, "10.10.10.9");
        step(&mut r, "10.10.10.10");
        step(&mut r, "10.10.10.11");
        step(&mut r, "10.10.10.8");
        step(&mut r, "10.10.10.9");

        let mut r = create("1000::4448/126", "1000::4448", "1000::444b", 4);
        step(&mut r, "1000::4449");
        step(&mut r, "1000::444a");
        step(&mut r, "1000::444b");
        step(&mut r, "1000::4448");
        step(&mut r, "1000::4449");
    }

    #[test]
    fn test_host_bits_are_masked() {
        let r = create("10.10.10.9/30", "10.10.10.8", "10.10.10.11", 4);
        assert_eq!(r.to_string(), "10.10.10.8/30");
    }

    #[test]
    fn test_size_saturates_at_64_bit_prefix() {
        assert_eq!(AddrRange::parse("1000::/65").unwrap().size(), 1 << 63);
        assert!(!AddrRange::parse("1000::/65").unwrap().is_saturated());

        for cidr in ["1000::/64", "1000::/48", "::/0"] {
            let r = AddrRange::parse(cidr).unwrap();
            assert_eq!(r.size(), u64::MAX, "{cidr}");
            assert!(r.is_saturated(), "{cidr}");
        }

        let r = AddrRange::parse("0.0.0.0/0").unwrap();
        assert_eq!(r.size(), 1 << 32);
        assert!(!r.is_saturated());
    }

    #[test]
    fn test_full_space_wraps_at_128_bit_boundary() {
        let mut r = create("::/0", "::", "ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff", u64::MAX);
        r.seek(AddrValue::MAX).unwrap();
        step(&mut r, "::");
    }

    #[test]
    fn test_ipv4_range_stays_mapped() {
        let r = AddrRange::parse("255.255.255.252/30").unwrap();
        assert!(r.first().is_ipv4_mapped());
        assert!(r.last().is_ipv4_mapped());
        assert_eq!(r.last().to_string(), "255.255.255.255");
    }

    #[test]
    fn test_contains() {
        let r = AddrRange::parse("10.0.0.0/30").unwrap();
        assert!(r.contains("10.0.0.0".parse().unwrap()));
        assert!(r.contains("10.0.0.3".parse().unwrap()));
        assert!(!r.contains("10.0.0.4".parse().unwrap()));
        assert!(!r.contains("9.255.255.255".parse().unwrap()));
        assert!(!r.contains("::a00:0".parse().unwrap()));
    }

    #[test]
    fn test_seek() {
        let mut r = AddrRange::parse("1000::/126").unwrap();
        r.seek("1000::3".parse().unwrap()).unwrap();
        step(&mut r, "1000::");

        let err = r.seek("1000::4".parse().unwrap()).unwrap_err();
        assert!(matches!(err, RangeError::CursorOutOfRange { .. }));
        assert_eq!(err.to_string(), "address 1000::4 is outside of 1000::/126");
        assert_eq!(r.current().to_string(), "1000::");
    }

    #[test]
    fn test_invalid_cidr() {
        for cidr in ["malformed", "10.0.0.0", "10.0.0.0/33", "1000::/129", ""] {
            let err = AddrRange::parse(cidr).unwrap_err();
            assert!(matches!(err, RangeError::InvalidCidr { .. }), "{cidr}");
        }
        let err = "malformed".parse::<AddrRange>().unwrap_err();
        assert_eq!(err.to_string(), r#"invalid CIDR "malformed""#);
    }
}
