#![cfg_attr(coverage_nightly, feature(coverage_attribute))]
#![cfg_attr(coverage_nightly, coverage(off))]
#![cfg(test)]

use std::net::IpAddr;

use ipam::{AllocationMode, Ipam, IpamError, Snapshot};

fn ip(s: &str) -> IpAddr {
    s.parse().unwrap()
}

#[test]
fn ipv4_range_allocates_in_order_until_exhausted() {
    let mut ipam = Ipam::new("10.10.10.0/29").unwrap();
    assert_eq!(ipam.unallocated(), 8);

    for i in 0..8_u64 {
        assert_eq!(ipam.allocate().unwrap(), ip(&format!("10.10.10.{i}")));
        assert_eq!(ipam.unallocated(), 7 - i);
    }

    let err = ipam.allocate().unwrap_err();
    assert!(matches!(err, IpamError::AddressExhausted { .. }));
    assert_eq!(err.to_string(), "no addresses left in 10.10.10.0/29");
    assert_eq!(ipam.unallocated(), 0);
}

#[test]
fn ipv6_free_is_idempotent() {
    let mut ipam = Ipam::new("1000::/127").unwrap();
    assert_eq!(ipam.allocate().unwrap(), ip("1000::"));
    assert_eq!(ipam.allocate().unwrap(), ip("1000::1"));

    ipam.free(ip("1000::"));
    assert_eq!(ipam.unallocated(), 1);
    ipam.free(ip("1000::"));
    assert_eq!(ipam.unallocated(), 1);
}

#[test]
fn huge_range_reports_saturated_count() {
    let mut ipam = Ipam::new("1000::/64").unwrap();
    assert_eq!(ipam.mode(), AllocationMode::Untracked);
    assert_eq!(ipam.unallocated(), u64::MAX);
    for _ in 0..5 {
        ipam.allocate().unwrap();
    }
    assert_eq!(ipam.unallocated(), u64::MAX);
    assert_eq!(ipam.current(), ip("1000::5"));
}

#[test]
fn reserve_first_and_last_leaves_middle_addresses() {
    let mut ipam = Ipam::new("1000::/126").unwrap();
    assert_eq!(ipam.unallocated(), 4);
    ipam.reserve_first_and_last();
    assert_eq!(ipam.unallocated(), 2);

    assert_eq!(ipam.allocate().unwrap(), ip("1000::1"));
    assert_eq!(ipam.allocate().unwrap(), ip("1000::2"));
    assert!(matches!(
        ipam.allocate().unwrap_err(),
        IpamError::AddressExhausted { .. }
    ));
}

#[test]
fn malformed_cidr_is_rejected() {
    let err = Ipam::new("malformed").unwrap_err();
    assert!(matches!(err, IpamError::InvalidCidr { .. }));
    assert_eq!(err.to_string(), "invalid CIDR range");
}

#[test]
fn freed_address_is_reused_after_wraparound() {
    let mut ipam = Ipam::new("10.0.0.0/30").unwrap();
    assert_eq!(ipam.allocate().unwrap(), ip("10.0.0.0"));
    assert_eq!(ipam.allocate().unwrap(), ip("10.0.0.1"));
    ipam.free(ip("10.0.0.0"));

    // unused higher addresses come first, the freed one only after wrapping
    assert_eq!(ipam.allocate().unwrap(), ip("10.0.0.2"));
    assert_eq!(ipam.allocate().unwrap(), ip("10.0.0.3"));
    assert_eq!(ipam.allocate().unwrap(), ip("10.0.0.0"));
    assert!(ipam.allocate().is_err());
}

#[test]
fn failed_calls_leave_state_untouched() {
    let mut ipam = Ipam::new("10.0.0.0/30").unwrap();
    ipam.reserve(ip("10.0.0.1")).unwrap();
    let before = ipam.export();

    assert!(ipam.reserve(ip("10.0.0.1")).is_err());
    assert!(ipam.reserve(ip("192.168.0.1")).is_err());
    assert!(ipam.reserve(ip("fe80::1")).is_err());
    assert_eq!(ipam.export(), before);

    for _ in 0..3 {
        ipam.allocate().unwrap();
    }
    let before = ipam.export();
    assert!(ipam.allocate().is_err());
    assert_eq!(ipam.export(), before);
}

#[test]
fn state_survives_json_round_trip() {
    let mut ipam = Ipam::new("12.0.0.0/29").unwrap();
    ipam.reserve_first_and_last();
    let a = ipam.allocate().unwrap();
    let b = ipam.allocate().unwrap();
    ipam.free(a);
    ipam.set_flag("note", "json");

    let text = serde_json::to_string(&ipam.export()).unwrap();
    let snapshot: Snapshot = serde_json::from_str(&text).unwrap();
    let mut restored = Ipam::import(&snapshot).unwrap();

    assert_eq!(restored, ipam);
    assert!(restored.is_allocated(b));
    assert!(!restored.is_allocated(a));
    assert_eq!(restored.allocate().unwrap(), ipam.allocate().unwrap());
}
