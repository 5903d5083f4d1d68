//! Metric descriptors.

/// Name of the label attached to every Briq metric. Its value is the username.
pub const USER_LABEL: &str = "user";

/// Descriptor for a family of gauges reported by a [`Collector`](crate::Collector).
///
/// Descriptors are static metadata; they do not depend on the upstream state and can be
/// queried without scraping.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct MetricDescriptor {
    /// Full name of the metric family, e.g. `briq_points`.
    pub name: &'static str,
    /// Help for the metric family exported to Prometheus.
    pub help: &'static str,
    /// Name of the single label distinguishing series in the family.
    pub label: &'static str,
}

/// Active balance of a user.
pub static ACTIVE_BALANCE: MetricDescriptor = MetricDescriptor {
    name: "briq_active_balance",
    help: "Active balance of a user",
    label: USER_LABEL,
};

/// Inactive balance of a user.
pub static INACTIVE_BALANCE: MetricDescriptor = MetricDescriptor {
    name: "briq_inactive_balance",
    help: "Inactive balance of a user",
    label: USER_LABEL,
};

/// Points earned by a user.
pub static POINTS: MetricDescriptor = MetricDescriptor {
    name: "briq_points",
    help: "Points earned by a user",
    label: USER_LABEL,
};

/// All families reported by [`BriqCollector`](crate::BriqCollector), in emission order.
pub static BRIQ_METRICS: [&MetricDescriptor; 3] = [&ACTIVE_BALANCE, &INACTIVE_BALANCE, &POINTS];

#[cfg(test)]
mod tests {
    use std::collections::HashSet;

    use super::*;

    #[test]
    fn descriptors_are_unique_and_labeled_by_user() {
        let names: HashSet<_> = BRIQ_METRICS.iter().map(|descriptor| descriptor.name).collect();
        assert_eq!(names.len(), BRIQ_METRICS.len());

        for descriptor in BRIQ_METRICS {
            assert!(descriptor.name.starts_with("briq_"), "{descriptor:?}");
            assert!(!descriptor.help.is_empty(), "{descriptor:?}");
            assert_eq!(descriptor.label, "user");
        }
    }
}
