use std::collections::BTreeMap;

use ipaddr::AddrValue;
use serde::{Deserialize, Serialize};
use snafu::{ResultExt as _, ensure};
use tracing::debug;

use crate::{
    Ipam,
    engine::Mode,
    error::{
        AddressOutOfRangeSnafu, InvalidAddressSnafu, InvalidCursorSnafu, IpamError,
        NotSupportedSnafu,
    },
};

/// Flat, serializable form of an [`Ipam`].
///
/// Addresses are kept as text so the structure maps directly onto formats
/// such as JSON:
///
/// ```json
/// {
///   "cidr": "12.0.0.0/29",
///   "current": "12.0.0.6",
///   "allocated": ["12.0.0.0", "12.0.0.1", "12.0.0.3", "12.0.0.5", "12.0.0.7"]
/// }
/// ```
///
/// `flags` and `allocated` are omitted when empty. The order of `allocated`
/// carries no meaning; [`Ipam::export`] lists it in ascending order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Snapshot {
    pub cidr: String,
    pub current: String,
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub flags: BTreeMap<String, String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub allocated: Vec<String>,
}

impl Ipam {
    /// Captures the range, cursor, flags and allocated addresses.
    #[must_use]
    pub fn export(&self) -> Snapshot {
        Snapshot {
            cidr: self.range.to_string(),
            current: self.range.current().to_string(),
            flags: self.flags.clone(),
            allocated: self.allocated().map(|addr| addr.to_string()).collect(),
        }
    }

    /// Rebuilds an allocator from a [`Snapshot`].
    ///
    /// The cursor and every allocated address must lie inside the snapshot's
    /// CIDR. Untracked ranges accept a snapshot only if its `allocated` list
    /// is empty. Repeated addresses are recorded once.
    pub fn import(snapshot: &Snapshot) -> Result<Self, IpamError> {
        let mut ipam = Self::new(&snapshot.cidr)?;
        let current = parse_addr(&snapshot.current)?;
        ipam.range.seek(current).context(InvalidCursorSnafu)?;
        ipam.flags.clone_from(&snapshot.flags);

        let cidr = ipam.range.net();
        match &mut ipam.mode {
            Mode::Tracked { allocated } => {
                for text in &snapshot.allocated {
                    let value = parse_addr(text)?;
                    ensure!(
                        ipam.range.contains(value),
                        AddressOutOfRangeSnafu {
                            addr: value.to_ip(),
                            cidr,
                        }
                    );
                    allocated.insert(value);
                }
            }
            Mode::Untracked => {
                ensure!(
                    snapshot.allocated.is_empty(),
                    NotSupportedSnafu {
                        operation: "importing allocated addresses",
                        cidr,
                    }
                );
            }
        }

        debug!(
            %cidr,
            current = %ipam.range.current(),
            allocated = ipam.allocated_count(),
            "imported allocator state"
        );
        Ok(ipam)
    }
}

impl From<&Ipam> for Snapshot {
    fn from(ipam: &Ipam) -> Self {
        ipam.export()
    }
}

impl TryFrom<&Snapshot> for Ipam {
    type Error = IpamError;

    fn try_from(snapshot: &Snapshot) -> Result<Self, Self::Error> {
        Self::import(snapshot)
    }
}

fn parse_addr(text: &str) -> Result<AddrValue, IpamError> {
    text.parse::<AddrValue>().context(InvalidAddressSnafu { text })
}
