use std::{
    collections::{BTreeMap, BTreeSet},
    net::IpAddr,
    str::FromStr,
};

use derive_more::{Display, IsVariant};
use ipaddr::{AddrRange, AddrValue};
use ipnet::IpNet;
use snafu::{ResultExt as _, ensure};
use tracing::{debug, trace};

use crate::error::{
    AddressExhaustedSnafu, AddressOutOfRangeSnafu, AlreadyAllocatedSnafu, InvalidCidrSnafu,
    IpamError, NotSupportedSnafu,
};

/// How an [`Ipam`] keeps track of handed out addresses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Display, IsVariant)]
pub enum AllocationMode {
    /// Every allocated address is recorded.
    #[display("tracked")]
    Tracked,
    /// The range holds 2^64 addresses or more and nothing is recorded.
    #[display("untracked")]
    Untracked,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum Mode {
    Tracked { allocated: BTreeSet<AddrValue> },
    Untracked,
}

/// Address allocator for a single CIDR range.
///
/// The allocator hands out addresses in cursor order: each allocation starts
/// where the previous one stopped and wraps around at the end of the range,
/// so a freed address is reused only once the cursor comes back to it.
///
/// Ranges with a prefix longer than 64 bits are *tracked*: every allocated or
/// reserved address is recorded, and the range can be exhausted. Shorter
/// prefixes select *untracked* mode, where the range is treated as
/// inexhaustible. In that mode [`allocate`](Self::allocate) just returns the
/// next cursor position, [`free`](Self::free) does nothing, and
/// [`reserve`](Self::reserve) fails with [`IpamError::NotSupported`].
///
/// The allocator is not synchronized; callers sharing one instance must
/// serialize access themselves.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Ipam {
    pub(crate) range: AddrRange,
    pub(crate) mode: Mode,
    pub(crate) flags: BTreeMap<String, String>,
}

impl Ipam {
    /// Creates an allocator for `cidr`, e.g. `"10.0.0.0/24"` or `"1000::/120"`.
    pub fn new(cidr: &str) -> Result<Self, IpamError> {
        let range = AddrRange::parse(cidr).context(InvalidCidrSnafu)?;
        Ok(Self::from_range(range))
    }

    /// Creates an allocator over `range`, starting at its current cursor.
    #[must_use]
    pub fn from_range(range: AddrRange) -> Self {
        let mode = if range.is_saturated() {
            Mode::Untracked
        } else {
            Mode::Tracked {
                allocated: BTreeSet::new(),
            }
        };
        let this = Self {
            range,
            mode,
            flags: BTreeMap::new(),
        };
        debug!(
            cidr = %this.range,
            size = this.range.size(),
            mode = %this.mode(),
            "created allocator"
        );
        this
    }

    #[must_use]
    pub fn mode(&self) -> AllocationMode {
        match self.mode {
            Mode::Tracked { .. } => AllocationMode::Tracked,
            Mode::Untracked => AllocationMode::Untracked,
        }
    }

    #[must_use]
    pub fn range(&self) -> &AddrRange {
        &self.range
    }

    #[must_use]
    pub fn cidr(&self) -> IpNet {
        self.range.net()
    }

    #[must_use]
    pub fn first(&self) -> IpAddr {
        self.range.first().to_ip()
    }

    #[must_use]
    pub fn last(&self) -> IpAddr {
        self.range.last().to_ip()
    }

    /// Returns the address the next allocation will consider first.
    #[must_use]
    pub fn current(&self) -> IpAddr {
        self.range.current().to_ip()
    }

    /// Returns the number of addresses in the range, saturated at `u64::MAX`.
    #[must_use]
    pub fn size(&self) -> u64 {
        self.range.size()
    }

    /// Allocates the next free address at or after the cursor.
    ///
    /// Fails with [`IpamError::AddressExhausted`] if every address of a
    /// tracked range is taken. Untracked ranges never run out.
    pub fn allocate(&mut self) -> Result<IpAddr, IpamError> {
        let Mode::Tracked { allocated } = &mut self.mode else {
            let addr = self.range.current();
            self.range.step();
            trace!(%addr, "allocated address from untracked range");
            return Ok(addr.to_ip());
        };

        if free_count(self.range.size(), allocated.len()) < 1 {
            debug!(cidr = %self.range, "address range exhausted");
            return AddressExhaustedSnafu {
                cidr: self.range.net(),
            }
            .fail();
        }

        // At least one address is free, so this finds it within `size` steps.
        loop {
            let candidate = self.range.current();
            self.range.step();
            if allocated.insert(candidate) {
                trace!(addr = %candidate, "allocated address");
                return Ok(candidate.to_ip());
            }
        }
    }

    /// Releases an allocated or reserved address.
    ///
    /// Freeing an address that is not allocated is a no-op, as is any free on
    /// an untracked range.
    pub fn free(&mut self, addr: IpAddr) {
        match &mut self.mode {
            Mode::Tracked { allocated } => {
                let removed = allocated.remove(&AddrValue::from(addr));
                trace!(%addr, removed, "freed address");
            }
            Mode::Untracked => trace!(%addr, "ignored free on untracked range"),
        }
    }

    /// Returns the number of addresses that can still be allocated.
    ///
    /// Untracked ranges always report `u64::MAX`.
    #[must_use]
    pub fn unallocated(&self) -> u64 {
        match &self.mode {
            Mode::Tracked { allocated } => free_count(self.range.size(), allocated.len()),
            Mode::Untracked => self.range.size(),
        }
    }

    /// Marks `addr` as allocated without moving the cursor.
    pub fn reserve(&mut self, addr: IpAddr) -> Result<(), IpamError> {
        let cidr = self.range.net();
        let Mode::Tracked { allocated } = &mut self.mode else {
            return NotSupportedSnafu {
                operation: "reserve",
                cidr,
            }
            .fail();
        };
        let value = AddrValue::from(addr);
        ensure!(
            self.range.contains(value),
            AddressOutOfRangeSnafu { addr, cidr }
        );
        ensure!(allocated.insert(value), AlreadyAllocatedSnafu { addr });
        debug!(%addr, "reserved address");
        Ok(())
    }

    /// Reserves the first and the last address of the range.
    ///
    /// Both are valid addresses, but some software refuses network or
    /// broadcast style addresses. Addresses already allocated stay allocated,
    /// and the number of unallocated addresses may drop to zero.
    ///
    /// Untracked ranges cannot record reservations. There the cursor is moved
    /// past the first address if it is currently on it, so the first address
    /// is not handed out next; otherwise nothing happens. The last address is
    /// left alone since the cursor cannot get there in practice.
    pub fn reserve_first_and_last(&mut self) {
        let (first, last) = (self.range.first(), self.range.last());
        match &mut self.mode {
            Mode::Tracked { allocated } => {
                allocated.insert(first);
                allocated.insert(last);
                debug!(%first, %last, "reserved first and last address");
            }
            Mode::Untracked => {
                if self.range.current() == first {
                    self.range.step();
                    debug!(%first, "stepped cursor past first address");
                }
            }
        }
    }

    /// Returns `true` if `addr` is allocated or reserved.
    ///
    /// Always `false` on untracked ranges.
    #[must_use]
    pub fn is_allocated(&self, addr: IpAddr) -> bool {
        match &self.mode {
            Mode::Tracked { allocated } => allocated.contains(&AddrValue::from(addr)),
            Mode::Untracked => false,
        }
    }

    /// Returns the allocated and reserved addresses in ascending order.
    pub fn allocated(&self) -> impl Iterator<Item = IpAddr> + '_ {
        let allocated = match &self.mode {
            Mode::Tracked { allocated } => Some(allocated),
            Mode::Untracked => None,
        };
        allocated.into_iter().flatten().map(|value| value.to_ip())
    }

    #[must_use]
    pub fn allocated_count(&self) -> usize {
        match &self.mode {
            Mode::Tracked { allocated } => allocated.len(),
            Mode::Untracked => 0,
        }
    }

    /// Returns the free-form flags stored alongside the allocation state.
    #[must_use]
    pub fn flags(&self) -> &BTreeMap<String, String> {
        &self.flags
    }

    /// Sets a flag, returning its previous value.
    pub fn set_flag(&mut self, key: impl Into<String>, value: impl Into<String>) -> Option<String> {
        self.flags.insert(key.into(), value.into())
    }

    pub fn remove_flag(&mut self, key: &str) -> Option<String> {
        self.flags.remove(key)
    }
}

impl FromStr for Ipam {
    type Err = IpamError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

fn free_count(size: u64, allocated: usize) -> u64 {
    size.saturating_sub(u64::try_from(allocated).unwrap_or(u64::MAX))
}
