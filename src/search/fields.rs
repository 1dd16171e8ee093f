//! Supported search filters, operators and sort keys

use std::fmt;

/// Where a filter lands in the search payload
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FieldKind {
    /// Top-level payload key
    Direct,
    /// Nested under `query.<wire name>.<operator>`
    Query,
}

/// One supported filter
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FieldDescriptor {
    /// Name callers use
    pub name: &'static str,
    /// Placement in the payload
    pub kind: FieldKind,
    /// STAC property name sent to the server
    pub wire_name: &'static str,
}

impl FieldDescriptor {
    const fn direct(name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Direct,
            wire_name: name,
        }
    }

    const fn query(name: &'static str, wire_name: &'static str) -> Self {
        Self {
            name,
            kind: FieldKind::Query,
            wire_name,
        }
    }

    /// Query fields may also be used as sort keys
    pub fn is_sortable(&self) -> bool {
        self.kind == FieldKind::Query
    }
}

/// Every filter the catalog search understands
pub const SEARCH_FIELDS: &[FieldDescriptor] = &[
    FieldDescriptor::direct("bbox"),
    FieldDescriptor::direct("collections"),
    FieldDescriptor::direct("ids"),
    FieldDescriptor::direct("intersects"),
    FieldDescriptor::direct("limit"),
    FieldDescriptor::query("billable_area", "capella:billable_area"),
    FieldDescriptor::query("center_frequency", "sar:center_frequency"),
    FieldDescriptor::query("collect_id", "capella:collect_id"),
    FieldDescriptor::query("constellation", "constellation"),
    FieldDescriptor::query("datetime", "datetime"),
    FieldDescriptor::query("frequency_band", "sar:frequency_band"),
    FieldDescriptor::query("incidence_angle", "view:incidence_angle"),
    FieldDescriptor::query("instruments", "instruments"),
    FieldDescriptor::query("instrument_mode", "sar:instrument_mode"),
    FieldDescriptor::query("look_angle", "view:look_angle"),
    FieldDescriptor::query("looks_azimuth", "sar:looks_azimuth"),
    FieldDescriptor::query("looks_equivalent_number", "sar:looks_equivalent_number"),
    FieldDescriptor::query("looks_range", "sar:looks_range"),
    FieldDescriptor::query("observation_direction", "sar:observation_direction"),
    FieldDescriptor::query("orbit_state", "sat:orbit_state"),
    FieldDescriptor::query("orbital_plane", "capella:orbital_plane"),
    FieldDescriptor::query("pixel_spacing_azimuth", "sar:pixel_spacing_azimuth"),
    FieldDescriptor::query("pixel_spacing_range", "sar:pixel_spacing_range"),
    FieldDescriptor::query("platform", "platform"),
    FieldDescriptor::query("polarizations", "sar:polarizations"),
    FieldDescriptor::query("product_category", "sar:product_category"),
    FieldDescriptor::query("product_type", "sar:product_type"),
    FieldDescriptor::query("resolution_azimuth", "sar:resolution_azimuth"),
    FieldDescriptor::query("resolution_ground_range", "sar:resolution_ground_range"),
    FieldDescriptor::query("resolution_range", "sar:resolution_range"),
    FieldDescriptor::query("squint_angle", "capella:squint_angle"),
];

/// Sort keys that are item-level rather than properties
const TOP_LEVEL_SORT_FIELDS: &[&str] = &["id", "collection"];

/// Look up a filter by caller-facing name
pub fn lookup(name: &str) -> Option<&'static FieldDescriptor> {
    SEARCH_FIELDS.iter().find(|f| f.name == name)
}

/// Server sort key for `name`, or `None` when sorting by it is unsupported
///
/// Property fields live in the `properties.` namespace on the server side.
pub fn sort_key(name: &str) -> Option<String> {
    if TOP_LEVEL_SORT_FIELDS.contains(&name) {
        return Some(name.to_string());
    }
    lookup(name)
        .filter(|f| f.is_sortable())
        .map(|f| format!("properties.{}", f.name))
}

/// Comparison operator applied to a query field
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum Operator {
    /// Equality
    Eq,
    /// Membership in a list
    In,
    /// Greater than
    Gt,
    /// Greater than or equal
    Gte,
    /// Lower than
    Lt,
    /// Lower than or equal
    Lte,
}

impl Operator {
    /// All supported operators
    pub const ALL: [Operator; 6] = [
        Operator::Eq,
        Operator::In,
        Operator::Gt,
        Operator::Gte,
        Operator::Lt,
        Operator::Lte,
    ];

    /// Parse a key suffix such as `gte`
    pub fn parse(suffix: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|op| op.as_str() == suffix)
    }

    /// Wire representation
    pub fn as_str(&self) -> &'static str {
        match self {
            Operator::Eq => "eq",
            Operator::In => "in",
            Operator::Gt => "gt",
            Operator::Gte => "gte",
            Operator::Lt => "lt",
            Operator::Lte => "lte",
        }
    }
}

impl fmt::Display for Operator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}
