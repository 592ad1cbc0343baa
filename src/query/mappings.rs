//! Product-type to field-mapping tables.
//!
//! Each mapping is an ordered list of `(feed field, record field)` pairs
//! applied to every online entry in list mode. Product types without a
//! registered mapping fall back to [`DEFAULT_MAPPING`].

/// One `(feed field, record field)` pair list.
pub type Mapping = &'static [(&'static str, &'static str)];

/// Fallback mapping used when the product type is unknown or unset.
pub const DEFAULT_MAPPING: Mapping = &[
    ("title", "title"),
    ("DIAS:sensingStartDate", "sensing_date"),
];

const SLC: Mapping = &[
    ("title", "title"),
    ("eo:orbitDirection", "orbit_direction"),
    ("eo:orbitNumber", "relative_orbit"),
    ("eo:polarisationChannels", "polarisation"),
    ("DIAS:sensingStartDate", "sensing_date"),
];

const GRD: Mapping = &[
    ("title", "title"),
    ("eo:orbitDirection", "orbit_direction"),
    ("eo:orbitNumber", "relative_orbit"),
    ("eo:polarisationChannels", "polarisation"),
    ("DIAS:sensingStartDate", "sensing_date"),
];

const L1C: Mapping = &[
    ("title", "title"),
    ("eo:orbitDirection", "orbit_direction"),
    ("eo:orbitNumber", "relative_orbit"),
    ("DIAS:tileIdentifier", "tile"),
    ("DIAS:sensingStartDate", "sensing_date"),
];

/// Returns the mapping registered for `product_type`, falling back to
/// [`DEFAULT_MAPPING`].
#[must_use]
pub fn mapping_for(product_type: Option<&str>) -> Mapping {
    match product_type {
        Some("SLC") => SLC,
        Some("GRD") => GRD,
        Some("L1C") => L1C,
        _ => DEFAULT_MAPPING,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_product_types_have_mappings() {
        assert_eq!(mapping_for(Some("SLC")), SLC);
        assert_eq!(mapping_for(Some("GRD")), GRD);
        assert_eq!(mapping_for(Some("L1C")), L1C);
    }

    #[test]
    fn test_unknown_product_type_falls_back_to_default() {
        assert_eq!(mapping_for(Some("OLCI")), DEFAULT_MAPPING);
        assert_eq!(mapping_for(None), DEFAULT_MAPPING);
    }

    #[test]
    fn test_l1c_maps_tile_identifier() {
        let mapping = mapping_for(Some("L1C"));
        assert!(
            mapping
                .iter()
                .any(|&(source, output)| source == "DIAS:tileIdentifier" && output == "tile")
        );
    }
}
