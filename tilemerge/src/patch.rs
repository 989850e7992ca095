//! Patch engine: applies override records to decoded features.
//!
//! For every feature carrying a string `merge_id` with a matching record:
//!
//! - a non-empty replacement name overwrites `name`
//! - a non-empty replacement colour overwrites `color`, but only on
//!   [`FeatureKind::Building`] features; other kinds keep their colour
//!
//! Features without a `merge_id`, or without a matching record, are left
//! exactly as decoded. This is a pure in-memory transformation.

use std::fmt;

use crate::codec::{DecodedTile, Feature, FeatureKind, PropertyValue, COLOR_KEY, NAME_KEY};
use crate::overrides::{OverrideMap, OverrideRecord};

/// Counters describing what a patch pass changed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PatchStats {
    /// Features visited.
    pub features: usize,
    /// Features whose identifier had an override record.
    pub matched: usize,
    /// Features whose name was replaced.
    pub renamed: usize,
    /// Features whose colour was replaced.
    pub recolored: usize,
}

impl fmt::Display for PatchStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} features, {} matched, {} renamed, {} recolored",
            self.features, self.matched, self.renamed, self.recolored
        )
    }
}

/// Apply `overrides` to every feature of every layer in place.
pub fn apply_overrides(tile: &mut DecodedTile, overrides: &OverrideMap) -> PatchStats {
    let mut stats = PatchStats::default();
    for feature in tile.features_mut() {
        stats.features += 1;
        let record = match feature.merge_id().and_then(|id| overrides.get(id)) {
            Some(record) => record,
            None => continue,
        };
        stats.matched += 1;
        patch_feature(feature, record, &mut stats);
    }
    stats
}

fn patch_feature(feature: &mut Feature, record: &OverrideRecord, stats: &mut PatchStats) {
    if let Some(name) = record.name_override() {
        feature
            .properties
            .insert(NAME_KEY, PropertyValue::from(name));
        stats.renamed += 1;
    }

    if let Some(color) = record.color_override() {
        if feature.kind == FeatureKind::Building {
            feature
                .properties
                .insert(COLOR_KEY, PropertyValue::from(color));
            stats.recolored += 1;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{Geometry, GeomType, Layer, Properties};

    fn feature(props: &[(&str, PropertyValue)]) -> Feature {
        let properties: Properties = props.iter().cloned().collect();
        Feature::new(
            Some(7),
            Geometry::new(GeomType::Polygon, vec![9, 0, 0, 26, 8, 0, 0, 8, 7, 0, 15]),
            properties,
        )
    }

    fn tile_with(features: Vec<Feature>) -> DecodedTile {
        let mut layer = Layer::new("test");
        layer.features = features;
        DecodedTile {
            layers: vec![layer],
        }
    }

    fn overrides(records: Vec<OverrideRecord>) -> OverrideMap {
        records
            .into_iter()
            .map(|r| (r.identifier.clone(), r))
            .collect()
    }

    fn prop<'a>(tile: &'a DecodedTile, index: usize, key: &str) -> Option<&'a PropertyValue> {
        tile.layers[0].features[index].properties.get(key)
    }

    #[test]
    fn test_display_name_replaces_name() {
        let mut tile = tile_with(vec![feature(&[
            ("merge_id", "abc".into()),
            ("name", "Park".into()),
        ])]);
        let map = overrides(vec![OverrideRecord::new("abc").with_display_name("Central Park")]);

        let stats = apply_overrides(&mut tile, &map);

        assert_eq!(prop(&tile, 0, "name"), Some(&PropertyValue::from("Central Park")));
        assert_eq!(stats.renamed, 1);
    }

    #[test]
    fn test_empty_display_name_keeps_original() {
        let mut tile = tile_with(vec![feature(&[
            ("merge_id", "abc".into()),
            ("name", "Park".into()),
        ])]);
        let map = overrides(vec![OverrideRecord::new("abc").with_display_name("")]);

        let stats = apply_overrides(&mut tile, &map);

        assert_eq!(prop(&tile, 0, "name"), Some(&PropertyValue::from("Park")));
        assert_eq!(stats.matched, 1);
        assert_eq!(stats.renamed, 0);
    }

    #[test]
    fn test_name_is_added_when_missing() {
        let mut tile = tile_with(vec![feature(&[("merge_id", "abc".into())])]);
        let map = overrides(vec![OverrideRecord::new("abc").with_display_name("Lot 4")]);

        apply_overrides(&mut tile, &map);

        assert_eq!(prop(&tile, 0, "name"), Some(&PropertyValue::from("Lot 4")));
    }

    #[test]
    fn test_name_override_replaces_non_string_value_with_string() {
        let mut tile = tile_with(vec![feature(&[
            ("merge_id", "abc".into()),
            ("name", PropertyValue::Int(12)),
        ])]);
        let map = overrides(vec![OverrideRecord::new("abc").with_display_name("Twelve")]);

        apply_overrides(&mut tile, &map);

        assert_eq!(prop(&tile, 0, "name"), Some(&PropertyValue::from("Twelve")));
    }

    #[test]
    fn test_color_only_applies_to_buildings() {
        let mut tile = tile_with(vec![
            feature(&[("merge_id", "abc".into()), ("color", "#303030".into())]),
            feature(&[
                ("merge_id", "abc".into()),
                ("building", "yes".into()),
                ("color", "#303030".into()),
            ]),
        ]);
        let map = overrides(vec![OverrideRecord::new("abc").with_color("#00A65E")]);

        let stats = apply_overrides(&mut tile, &map);

        assert_eq!(prop(&tile, 0, "color"), Some(&PropertyValue::from("#303030")));
        assert_eq!(prop(&tile, 1, "color"), Some(&PropertyValue::from("#00A65E")));
        assert_eq!(stats.recolored, 1);
        assert_eq!(stats.matched, 2);
    }

    #[test]
    fn test_color_is_not_added_to_non_buildings() {
        let mut tile = tile_with(vec![feature(&[("merge_id", "abc".into())])]);
        let map = overrides(vec![OverrideRecord::new("abc").with_color("#00A65E")]);

        apply_overrides(&mut tile, &map);

        assert_eq!(prop(&tile, 0, "color"), None);
    }

    #[test]
    fn test_unmatched_and_unidentified_features_are_untouched() {
        let original = tile_with(vec![
            feature(&[("merge_id", "zzz".into()), ("name", "Keep".into())]),
            feature(&[("name", "No Id".into()), ("building", PropertyValue::Bool(true))]),
            feature(&[("merge_id", PropertyValue::UInt(5)), ("name", "Numeric".into())]),
        ]);
        let mut tile = original.clone();
        let map = overrides(vec![
            OverrideRecord::new("abc")
                .with_display_name("Other")
                .with_color("#F25822"),
            OverrideRecord::new("5").with_display_name("Five"),
        ]);

        let stats = apply_overrides(&mut tile, &map);

        assert_eq!(tile, original);
        assert_eq!(stats.features, 3);
        assert_eq!(stats.matched, 0);
    }

    #[test]
    fn test_same_identifier_patched_in_every_layer() {
        let mut first = Layer::new("poi");
        first.features.push(feature(&[("merge_id", "abc".into())]));
        let mut second = Layer::new("building");
        second
            .features
            .push(feature(&[("merge_id", "abc".into()), ("building", "yes".into())]));
        let mut tile = DecodedTile {
            layers: vec![first, second],
        };
        let map = overrides(vec![OverrideRecord::new("abc")
            .with_display_name("Shared")
            .with_color("#AD5AFF")]);

        let stats = apply_overrides(&mut tile, &map);

        for layer in &tile.layers {
            assert_eq!(
                layer.features[0].properties.get("name"),
                Some(&PropertyValue::from("Shared"))
            );
        }
        assert_eq!(
            tile.layers[1].features[0].properties.get("color"),
            Some(&PropertyValue::from("#AD5AFF"))
        );
        assert_eq!(stats.to_string(), "2 features, 2 matched, 2 renamed, 1 recolored");
    }

    #[test]
    fn test_geometry_is_never_modified() {
        let mut tile = tile_with(vec![feature(&[
            ("merge_id", "abc".into()),
            ("building", "yes".into()),
        ])]);
        let geometry_before = tile.layers[0].features[0].geometry.clone();
        let map = overrides(vec![OverrideRecord::new("abc")
            .with_display_name("New")
            .with_color("#189EFF")]);

        apply_overrides(&mut tile, &map);

        assert_eq!(tile.layers[0].features[0].geometry, geometry_before);
        assert_eq!(tile.layers[0].features[0].id, Some(7));
    }
}
