use core::{
    fmt,
    net::{AddrParseError, IpAddr, Ipv4Addr, Ipv6Addr},
    ops::{BitAnd, BitOr, Not},
    str::FromStr,
};

/// An IPv4 or IPv6 address held as a 128-bit unsigned integer.
///
/// The value is split into two 64-bit lanes, `high` and `low`, and ordered
/// lexicographically on `(high, low)`, which is the numeric order of the
/// 128-bit integer. IPv4 addresses are stored in their IPv4-mapped IPv6 form
/// (`::ffff:a.b.c.d`), so both families share one key space.
///
/// # Examples
///
/// ```
/// use std::net::{IpAddr, Ipv4Addr};
///
/// use ipaddr::AddrValue;
///
/// let mut v = AddrValue::from(Ipv4Addr::new(10, 0, 0, 255));
/// v.increment();
/// assert_eq!(v.to_ip(), IpAddr::from([10, 0, 1, 0]));
/// ```
#[derive(Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default)]
pub struct AddrValue {
    high: u64,
    low: u64,
}

impl AddrValue {
    /// The all-zeroes value (`::`).
    pub const MIN: Self = Self::new(0, 0);
    /// The all-ones value (`ffff:ffff:ffff:ffff:ffff:ffff:ffff:ffff`).
    pub const MAX: Self = Self::new(u64::MAX, u64::MAX);

    const IPV4_MAPPED_HIGH: u64 = 0;
    const IPV4_MAPPED_LOW_MASK: u64 = 0xffff_ffff_0000_0000;
    const IPV4_MAPPED_LOW_TAG: u64 = 0x0000_ffff_0000_0000;

    /// Creates a value from its high and low 64-bit lanes.
    #[must_use]
    pub const fn new(high: u64, low: u64) -> Self {
        Self { high, low }
    }

    /// Creates a value from a 128-bit integer.
    #[must_use]
    #[expect(clippy::cast_possible_truncation)]
    pub const fn from_bits(bits: u128) -> Self {
        Self::new((bits >> 64) as u64, bits as u64)
    }

    /// Returns the value as a 128-bit integer.
    #[must_use]
    pub const fn to_bits(self) -> u128 {
        ((self.high as u128) << 64) | self.low as u128
    }

    #[must_use]
    pub const fn high(self) -> u64 {
        self.high
    }

    #[must_use]
    pub const fn low(self) -> u64 {
        self.low
    }

    /// Returns a network mask with the leading `prefix_len` bits set.
    ///
    /// # Panics
    ///
    /// Panics if `prefix_len` is greater than 128.
    #[must_use]
    pub const fn prefix_mask(prefix_len: u8) -> Self {
        assert!(prefix_len <= 128, "prefix length must be at most 128");
        if prefix_len == 0 {
            return Self::MIN;
        }
        Self::from_bits(u128::MAX << (128 - prefix_len))
    }

    /// Adds one to the value.
    ///
    /// A carry out of the low lane ripples into the high lane, and
    /// incrementing [`AddrValue::MAX`] wraps around to [`AddrValue::MIN`].
    pub const fn increment(&mut self) {
        if self.low == u64::MAX {
            self.low = 0;
            self.high = self.high.wrapping_add(1);
        } else {
            self.low += 1;
        }
    }

    /// Returns the value following this one, wrapping at the 128-bit boundary.
    #[must_use]
    pub const fn incremented(mut self) -> Self {
        self.increment();
        self
    }

    /// Returns `true` if the value lies in `::ffff:0:0/96`.
    #[must_use]
    pub const fn is_ipv4_mapped(self) -> bool {
        self.high == Self::IPV4_MAPPED_HIGH
            && self.low & Self::IPV4_MAPPED_LOW_MASK == Self::IPV4_MAPPED_LOW_TAG
    }

    /// Converts back to a native address.
    ///
    /// IPv4-mapped values are returned as IPv4 addresses, everything else as
    /// IPv6.
    #[must_use]
    pub fn to_ip(self) -> IpAddr {
        let v6 = Ipv6Addr::from_bits(self.to_bits());
        match v6.to_ipv4_mapped() {
            Some(v4) => IpAddr::V4(v4),
            None => IpAddr::V6(v6),
        }
    }
}

impl From<Ipv4Addr> for AddrValue {
    fn from(addr: Ipv4Addr) -> Self {
        Self::from(addr.to_ipv6_mapped())
    }
}

impl From<Ipv6Addr> for AddrValue {
    fn from(addr: Ipv6Addr) -> Self {
        Self::from_bits(addr.to_bits())
    }
}

impl From<IpAddr> for AddrValue {
    fn from(addr: IpAddr) -> Self {
        match addr {
            IpAddr::V4(v4) => Self::from(v4),
            IpAddr::V6(v6) => Self::from(v6),
        }
    }
}

impl From<AddrValue> for IpAddr {
    fn from(value: AddrValue) -> Self {
        value.to_ip()
    }
}

impl FromStr for AddrValue {
    type Err = AddrParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        s.parse::<IpAddr>().map(Self::from)
    }
}

impl BitAnd for AddrValue {
    type Output = Self;

    fn bitand(self, rhs: Self) -> Self::Output {
        Self::new(self.high & rhs.high, self.low & rhs.low)
    }
}

impl BitOr for AddrValue {
    type Output = Self;

    fn bitor(self, rhs: Self) -> Self::Output {
        Self::new(self.high | rhs.high, self.low | rhs.low)
    }
}

impl Not for AddrValue {
    type Output = Self;

    fn not(self) -> Self::Output {
        Self::new(!self.high, !self.low)
    }
}

impl fmt::Debug for AddrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("AddrValue").field(&self.to_ip()).finish()
    }
}

impl fmt::Display for AddrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(&self.to_ip(), f)
    }
}

/// Formats both lanes as `high,low` in fixed-width hex.
impl fmt::LowerHex for AddrValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:016x},{:016x}", self.high, self.low)
    }
}
