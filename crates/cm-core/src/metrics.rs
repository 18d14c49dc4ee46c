//! Fixed metric catalog and the per-company metrics mapping.
//!
//! Every company carries one entry per catalog field. Values are free text
//! (an empty string means "not filled in"). Keys outside the catalog are kept
//! as-is.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// How a metric value is meant to be entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum MetricKind {
    Number,
    Text,
}

/// One entry of the metric catalog.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct MetricField {
    pub key: &'static str,
    pub label: &'static str,
    pub unit: &'static str,
    pub kind: MetricKind,
}

impl MetricField {
    const fn number(key: &'static str, label: &'static str, unit: &'static str) -> Self {
        Self {
            key,
            label,
            unit,
            kind: MetricKind::Number,
        }
    }

    /// Value with its unit appended, or `None` when unset.
    pub fn display(&self, value: &str) -> Option<String> {
        let value = value.trim();
        if value.is_empty() {
            return None;
        }
        Some(format!("{value}{}", self.unit))
    }
}

/// The financial metric catalog, in display order.
pub const METRIC_CATALOG: &[MetricField] = &[
    MetricField::number("pe_12m_fw", "PE 12m Forward", "x"),
    MetricField::number("eps_2025", "EPS 2025", ""),
    MetricField::number("eps_2026", "EPS 2026", ""),
    MetricField::number("eps_2027", "EPS 2027", ""),
    MetricField::number("ebitda_margin", "EBITDA Margin", "%"),
    MetricField::number("net_debt_ebitda", "Net Debt / EBITDA", "x"),
    MetricField::number("roce_wacc", "ROCE − WACC", "%"),
];

/// Look up a catalog field by key.
pub fn field(key: &str) -> Option<&'static MetricField> {
    METRIC_CATALOG.iter().find(|f| f.key == key)
}

/// A company's metric values keyed by catalog key.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Metrics(BTreeMap<String, String>);

impl Metrics {
    /// One empty entry per catalog field.
    pub fn from_catalog() -> Self {
        let mut m = Self::default();
        m.fill_missing();
        m
    }

    /// Add an empty entry for every catalog key not present yet.
    pub fn fill_missing(&mut self) {
        for f in METRIC_CATALOG {
            self.0.entry(f.key.to_string()).or_default();
        }
    }

    /// The value for `key`, or `None` when missing or empty.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.0
            .get(key)
            .map(String::as_str)
            .filter(|v| !v.is_empty())
    }

    /// Overwrite one entry. The key is not checked against the catalog.
    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.0.insert(key.to_string(), value.into());
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &str)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_str()))
    }
}
