/// Static lookup tables bridging catalog availability fields, mgraph query
/// parameters, and measurement columns.
///
/// These are fixed facts about the remote service, not behavior: the catalog
/// advertises availability under one set of names, the graph endpoint is
/// queried under another, and the river level mode splits into three named
/// fields with single-letter keys on the wire.

/// Availability field name for the river level mode.
pub const FIELD_RIVER_LEVEL: &str = "river_level";

/// Availability field name for precipitation.
pub const FIELD_PRECIPITATION: &str = "precipitation";

/// The mgraph query parameters for one availability field: the `mode` value
/// plus any fixed extra parameters that mode requires.
#[derive(Debug, Clone, PartialEq)]
pub struct QuerySpec {
    pub mode: String,
    pub extra_params: Vec<(String, String)>,
}

/// Maps a catalog availability field to its mgraph query spec.
///
/// River level is queried as `mode=distance`; precipitation needs a fixed
/// hourly sampling interval; every other field queries under its own name.
pub fn query_for(availability_field: &str) -> QuerySpec {
    match availability_field {
        FIELD_RIVER_LEVEL => QuerySpec {
            mode: "distance".to_string(),
            extra_params: Vec::new(),
        },
        FIELD_PRECIPITATION => QuerySpec {
            mode: FIELD_PRECIPITATION.to_string(),
            extra_params: vec![
                ("interval".to_string(), "3600".to_string()),
                ("view_type".to_string(), "1".to_string()),
            ],
        },
        other => QuerySpec {
            mode: other.to_string(),
            extra_params: Vec::new(),
        },
    }
}

/// Maps a remote mgraph field key to its measurement column.
///
/// The river level response carries `bs`/`d`/`z`; everything else lands in
/// the plain `value` column.
pub fn column_for_field(field: &str) -> &'static str {
    match field {
        "bs" => "baseline",
        "d" => "distance",
        "z" => "zero",
        _ => "value",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_river_level_queries_as_distance() {
        let spec = query_for(FIELD_RIVER_LEVEL);
        assert_eq!(spec.mode, "distance");
        assert!(spec.extra_params.is_empty());
    }

    #[test]
    fn test_precipitation_carries_fixed_interval() {
        let spec = query_for(FIELD_PRECIPITATION);
        assert_eq!(spec.mode, "precipitation");
        assert!(spec.extra_params.contains(&("interval".to_string(), "3600".to_string())));
        assert!(spec.extra_params.contains(&("view_type".to_string(), "1".to_string())));
    }

    #[test]
    fn test_other_fields_query_under_their_own_name() {
        for field in ["discharge", "temperature", "humidity"] {
            let spec = query_for(field);
            assert_eq!(spec.mode, field);
            assert!(spec.extra_params.is_empty(), "{} takes no extra params", field);
        }
    }

    #[test]
    fn test_river_level_field_columns() {
        assert_eq!(column_for_field("bs"), "baseline");
        assert_eq!(column_for_field("d"), "distance");
        assert_eq!(column_for_field("z"), "zero");
    }

    #[test]
    fn test_scalar_fields_map_to_value_column() {
        assert_eq!(column_for_field("discharge"), "value");
        assert_eq!(column_for_field("temperature"), "value");
    }
}
