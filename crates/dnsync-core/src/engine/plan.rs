//! Reconciliation planning
//!
//! Pure diff between the desired address set and the records the provider
//! reported. No I/O happens here.

use serde::Serialize;
use std::collections::{BTreeMap, BTreeSet};
use std::net::IpAddr;

use crate::desired::DesiredAddressSet;
use crate::traits::dns_provider::{DnsRecord, compare_record_ids};

/// Operations needed to converge current records to the desired set
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct ReconciliationPlan {
    /// Desired addresses with no record yet
    pub to_create: Vec<IpAddr>,
    /// Records that are not desired, or duplicates of a kept record
    pub to_delete: Vec<DnsRecord>,
    /// One kept record per desired address that already exists
    pub unchanged: Vec<DnsRecord>,
}

impl ReconciliationPlan {
    /// Compute the plan
    ///
    /// Records are grouped by address. For a desired address with several
    /// records, the one with the lowest id (see [`compare_record_ids`]) is
    /// kept and the others are deleted, so duplicates never accumulate
    /// across runs.
    pub fn compute(desired: &DesiredAddressSet, current: &[DnsRecord]) -> Self {
        let mut by_address: BTreeMap<IpAddr, Vec<&DnsRecord>> = BTreeMap::new();
        for record in current {
            by_address.entry(record.address).or_default().push(record);
        }

        let mut plan = ReconciliationPlan::default();

        for (address, mut records) in by_address {
            records.sort_by(|a, b| compare_record_ids(&a.id, &b.id));

            if desired.contains(&address) {
                let (keep, duplicates) = records.split_at(1);
                plan.unchanged.extend(keep.iter().map(|r| (*r).clone()));
                plan.to_delete.extend(duplicates.iter().map(|r| (*r).clone()));
            } else {
                plan.to_delete.extend(records.into_iter().cloned());
            }
        }

        let existing: BTreeSet<IpAddr> = plan.unchanged.iter().map(|r| r.address).collect();
        plan.to_create = desired
            .iter()
            .filter(|address| !existing.contains(*address))
            .copied()
            .collect();

        plan
    }

    /// Whether the plan has no create or delete
    pub fn is_noop(&self) -> bool {
        self.to_create.is_empty() && self.to_delete.is_empty()
    }

    /// Number of provider mutations the plan needs
    pub fn operation_count(&self) -> usize {
        self.to_create.len() + self.to_delete.len()
    }

    /// Ids scheduled for deletion
    pub fn delete_ids(&self) -> Vec<&str> {
        self.to_delete.iter().map(|r| r.id.as_str()).collect()
    }
}

impl std::fmt::Display for ReconciliationPlan {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        if self.is_noop() {
            return writeln!(f, "Nothing to do ({} record(s) already in place)", self.unchanged.len());
        }
        for address in &self.to_create {
            writeln!(f, "  + create {} {}", crate::RecordType::for_address(address), address)?;
        }
        for record in &self.to_delete {
            writeln!(f, "  - delete {} {} (id {})", record.record_type, record.address, record.id)?;
        }
        for record in &self.unchanged {
            writeln!(f, "  = keep   {} {} (id {})", record.record_type, record.address, record.id)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NAME: &str = "edge.example.com";

    fn record(id: &str, addr: &str) -> DnsRecord {
        DnsRecord::new(id, NAME, addr.parse().unwrap(), 60)
    }

    fn desired(addrs: &[&str]) -> DesiredAddressSet {
        addrs.iter().map(|a| a.parse().unwrap()).collect()
    }

    #[test]
    fn test_worked_example() {
        let plan = ReconciliationPlan::compute(
            &desired(&["10.0.0.1", "10.0.0.2"]),
            &[record("9", "10.0.0.3")],
        );

        let creates: Vec<String> = plan.to_create.iter().map(|a| a.to_string()).collect();
        assert_eq!(creates, vec!["10.0.0.1", "10.0.0.2"]);
        assert_eq!(plan.delete_ids(), vec!["9"]);
        assert!(plan.unchanged.is_empty());
    }

    #[test]
    fn test_duplicate_collapse_keeps_lowest_id() {
        let plan = ReconciliationPlan::compute(
            &desired(&["10.0.0.1"]),
            &[record("2", "10.0.0.1"), record("1", "10.0.0.1")],
        );

        assert!(plan.to_create.is_empty());
        assert_eq!(plan.delete_ids(), vec!["2"]);
        assert_eq!(plan.unchanged[0].id, "1");
    }

    #[test]
    fn test_duplicate_collapse_numeric_order() {
        let plan = ReconciliationPlan::compute(
            &desired(&["10.0.0.1"]),
            &[record("10", "10.0.0.1"), record("9", "10.0.0.1"), record("100", "10.0.0.1")],
        );

        assert_eq!(plan.unchanged[0].id, "9");
        assert_eq!(plan.delete_ids(), vec!["10", "100"]);
    }

    #[test]
    fn test_undesired_duplicates_all_deleted() {
        let plan = ReconciliationPlan::compute(
            &desired(&[]),
            &[record("1", "10.0.0.1"), record("2", "10.0.0.1")],
        );
        assert_eq!(plan.delete_ids(), vec!["1", "2"]);
    }

    #[test]
    fn test_empty_desired_deletes_everything() {
        let plan = ReconciliationPlan::compute(
            &desired(&[]),
            &[record("1", "10.0.0.1"), record("2", "10.0.0.2")],
        );
        assert!(plan.to_create.is_empty());
        assert_eq!(plan.to_delete.len(), 2);
    }

    #[test]
    fn test_converged_is_noop() {
        let plan = ReconciliationPlan::compute(
            &desired(&["10.0.0.1", "2001:db8::1"]),
            &[record("1", "10.0.0.1"), record("2", "2001:db8::1")],
        );
        assert!(plan.is_noop());
        assert_eq!(plan.operation_count(), 0);
        assert_eq!(plan.unchanged.len(), 2);
    }

    #[test]
    fn test_large_sets() {
        let wanted: DesiredAddressSet = (0..20_000u32)
            .map(|n| IpAddr::from(std::net::Ipv4Addr::from(0x0a00_0000 + n)))
            .collect();
        let current: Vec<DnsRecord> = (0..10_000u32)
            .map(|n| {
                let address = IpAddr::from(std::net::Ipv4Addr::from(0x0a00_0000 + n * 2));
                DnsRecord::new(n.to_string(), NAME, address, 60)
            })
            .collect();

        let plan = ReconciliationPlan::compute(&wanted, &current);
        assert_eq!(plan.unchanged.len(), 10_000);
        assert_eq!(plan.to_create.len(), 10_000);
        assert!(plan.to_delete.is_empty());
    }

    #[test]
    fn test_both_empty() {
        let plan = ReconciliationPlan::compute(&desired(&[]), &[]);
        assert!(plan.is_noop());
    }

    #[test]
    fn test_display_lists_operations() {
        let plan = ReconciliationPlan::compute(
            &desired(&["10.0.0.1"]),
            &[record("9", "10.0.0.3")],
        );
        let text = plan.to_string();
        assert!(text.contains("+ create A 10.0.0.1"));
        assert!(text.contains("- delete A 10.0.0.3 (id 9)"));
    }
}
