//! Class catalog for the PPE model.
//!
//! The model emits a class index per detection; the catalog maps it to a label.
//! The order matches the model's training labels and includes the placeholder
//! `"E"` entries at 6, 8 and 9, which are kept as shipped with the model.

/// Labels indexed by the PPE model's class output.
pub const PPE_CLASSES: &[&str] = &[
    "Hardhat",
    "Mask",
    "NO-Hardhat",
    "NO-Mask",
    "NO-Safety Vest",
    "Person",
    "E",
    "Safety Vest",
    "E",
    "E",
];

/// Label substituted for class indices outside the catalog.
pub const UNKNOWN_LABEL: &str = "Unknown";

/// Labels that represent equipment being worn.
const COMPLIANT_LABELS: &[&str] = &["Hardhat", "Safety Vest", "Mask"];

/// Marker carried by every violation label.
const VIOLATION_MARKER: &str = "NO-";

/// How a label is rendered.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Compliance {
    /// Missing equipment (`NO-*`).
    Violation,
    /// Equipment present.
    Compliant,
    /// Anything else, including `Person` and `Unknown`.
    Neutral,
}

impl Compliance {
    /// Classify a label. The first matching rule wins: violation, then compliant, then neutral.
    pub fn of(label: &str) -> Self {
        if label.contains(VIOLATION_MARKER) {
            Compliance::Violation
        } else if COMPLIANT_LABELS.contains(&label) {
            Compliance::Compliant
        } else {
            Compliance::Neutral
        }
    }
}

/// Result of looking up a class index.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Lookup {
    Known(&'static str),
    /// The index fell outside the catalog.
    OutOfRange(i64),
}

impl Lookup {
    /// Label to render; out-of-range indices degrade to `"Unknown"`.
    pub fn label(self) -> &'static str {
        match self {
            Lookup::Known(label) => label,
            Lookup::OutOfRange(_) => UNKNOWN_LABEL,
        }
    }
}

/// Ordered class index -> label mapping.
#[derive(Clone, Copy, Debug)]
pub struct ClassCatalog {
    labels: &'static [&'static str],
}

impl ClassCatalog {
    pub const fn new(labels: &'static [&'static str]) -> Self {
        Self { labels }
    }

    /// The catalog shipped with the PPE model.
    pub const fn ppe() -> Self {
        Self::new(PPE_CLASSES)
    }

    pub fn len(&self) -> usize {
        self.labels.len()
    }

    pub fn is_empty(&self) -> bool {
        self.labels.is_empty()
    }

    /// Look up a class index. Negative and too-large indices are reported, not panicked on.
    pub fn lookup(&self, class_index: i64) -> Lookup {
        usize::try_from(class_index)
            .ok()
            .and_then(|idx| self.labels.get(idx))
            .map(|label| Lookup::Known(*label))
            .unwrap_or(Lookup::OutOfRange(class_index))
    }
}

impl Default for ClassCatalog {
    fn default() -> Self {
        Self::ppe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn catalog_preserves_placeholder_entries() {
        let catalog = ClassCatalog::ppe();
        assert_eq!(catalog.len(), 10);
        assert_eq!(catalog.lookup(6), Lookup::Known("E"));
        assert_eq!(catalog.lookup(7), Lookup::Known("Safety Vest"));
        assert_eq!(catalog.lookup(9), Lookup::Known("E"));
    }

    #[test]
    fn out_of_range_index_degrades_to_unknown() {
        let catalog = ClassCatalog::ppe();
        assert_eq!(catalog.lookup(10), Lookup::OutOfRange(10));
        assert_eq!(catalog.lookup(10).label(), UNKNOWN_LABEL);
        assert_eq!(catalog.lookup(-1).label(), UNKNOWN_LABEL);
        assert_eq!(catalog.lookup(i64::MAX).label(), UNKNOWN_LABEL);
    }

    #[test]
    fn violation_rule_wins_over_compliant_rule() {
        assert_eq!(Compliance::of("NO-Hardhat"), Compliance::Violation);
        assert_eq!(Compliance::of("NO-Safety Vest"), Compliance::Violation);
        assert_eq!(Compliance::of("Hardhat"), Compliance::Compliant);
        assert_eq!(Compliance::of("Safety Vest"), Compliance::Compliant);
        assert_eq!(Compliance::of("Mask"), Compliance::Compliant);
    }

    #[test]
    fn other_labels_are_neutral() {
        assert_eq!(Compliance::of("Person"), Compliance::Neutral);
        assert_eq!(Compliance::of("E"), Compliance::Neutral);
        assert_eq!(Compliance::of(UNKNOWN_LABEL), Compliance::Neutral);
        // exact match only
        assert_eq!(Compliance::of("Hardhat "), Compliance::Neutral);
    }
}
