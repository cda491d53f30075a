//! Metric descriptors, points and the per-cycle sink collectors write into.

use std::borrow::Cow;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MetricKind {
    Counter,
    Gauge,
}

/// Name, help text, kind and label names of one metric family.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricDesc {
    pub name: Cow<'static, str>,
    pub help: Cow<'static, str>,
    pub kind: MetricKind,
    pub label_names: &'static [&'static str],
}

impl MetricDesc {
    pub const fn new(
        name: &'static str,
        help: &'static str,
        kind: MetricKind,
        label_names: &'static [&'static str],
    ) -> Self {
        Self {
            name: Cow::Borrowed(name),
            help: Cow::Borrowed(help),
            kind,
            label_names,
        }
    }

    pub const fn gauge(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self::new(name, help, MetricKind::Gauge, label_names)
    }

    pub const fn counter(
        name: &'static str,
        help: &'static str,
        label_names: &'static [&'static str],
    ) -> Self {
        Self::new(name, help, MetricKind::Counter, label_names)
    }

    /// Descriptor built at runtime, without labels.
    pub fn dynamic(name: String, help: String, kind: MetricKind) -> Self {
        Self {
            name: Cow::Owned(name),
            help: Cow::Owned(help),
            kind,
            label_names: &[],
        }
    }
}

/// One sample: a descriptor, a value and label values in descriptor order.
#[derive(Debug, Clone, PartialEq)]
pub struct MetricPoint {
    pub desc: MetricDesc,
    pub value: f64,
    pub label_values: Vec<String>,
}

/// Accumulates the points produced during one poll cycle.
#[derive(Debug, Default)]
pub struct MetricSink {
    points: Vec<MetricPoint>,
}

impl MetricSink {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one point. `label_values` must match `desc.label_names`.
    pub fn push<I, S>(&mut self, desc: MetricDesc, value: f64, label_values: I)
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        let label_values: Vec<String> = label_values.into_iter().map(Into::into).collect();
        debug_assert_eq!(
            label_values.len(),
            desc.label_names.len(),
            "label arity mismatch for {}",
            desc.name
        );
        self.points.push(MetricPoint {
            desc,
            value,
            label_values,
        });
    }

    /// Records an unlabelled point.
    pub fn push_plain(&mut self, desc: MetricDesc, value: f64) {
        self.push(desc, value, std::iter::empty::<String>());
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn points(&self) -> &[MetricPoint] {
        &self.points
    }

    pub fn into_points(self) -> Vec<MetricPoint> {
        self.points
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const UPTIME: MetricDesc = MetricDesc::gauge(
        "kamailio_core_uptime",
        "Uptime in seconds",
        &["version", "compiled", "compiler"],
    );

    #[test]
    fn push_keeps_label_order() {
        let mut sink = MetricSink::new();
        sink.push(UPTIME, 42.0, ["5.7.4", "today", "gcc"]);
        sink.push_plain(MetricDesc::dynamic("kamailio_x".into(), "x".into(), MetricKind::Gauge), 1.0);

        assert_eq!(sink.len(), 2);
        let p = &sink.points()[0];
        assert_eq!(p.desc.name, "kamailio_core_uptime");
        assert_eq!(p.label_values, vec!["5.7.4", "today", "gcc"]);
        assert!(sink.points()[1].label_values.is_empty());
    }
}
