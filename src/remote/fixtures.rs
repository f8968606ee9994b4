/// Test fixtures: representative JSON payloads from the remote telemetry
/// service.
///
/// These fixtures are structurally complete but truncated to the minimum
/// needed to exercise the parsers.
///
/// Overall response shape:
///   { "features": [ { "properties": { "id", "name", "data": {...} }, ...geo } ] }
/// where `data` maps mode name → true | false | null.
///
/// Mgraph response shape:
///   { "period_1": ISO8601, "period_2": ISO8601,
///     "<field>": [ [epochMillis, value|null], ... ], ... }
/// Field keys are dynamic: `bs`/`d`/`z` for river level, the mode name for
/// everything else. Epoch milliseconds are defined relative to the fixed
/// +03:00 service offset.

/// Two-station catalog. Station 122 reports river level and temperature,
/// with a null discharge flag and an explicit false humidity flag; the
/// catalog derivation must exclude both. Station 207 has a Latin name for
/// exercising case-insensitive lookup.
pub(crate) fn fixture_overall_json() -> &'static str {
    r#"{
      "features": [
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [39.7203, 43.5855] },
          "properties": {
            "id": 122,
            "name": "АГК-0122",
            "data": {
              "river_level": true,
              "temperature": true,
              "discharge": null,
              "humidity": false
            }
          }
        },
        {
          "type": "Feature",
          "geometry": { "type": "Point", "coordinates": [39.9106, 43.4521] },
          "properties": {
            "id": 207,
            "name": "Gauge-North",
            "data": {
              "river_level": true,
              "precipitation": true
            }
          }
        }
      ]
    }"#
}

/// Structurally valid envelope with zero features, a catalog outage.
/// There is nothing to synchronize; the run must abort.
pub(crate) fn fixture_overall_empty_json() -> &'static str {
    r#"{ "features": [] }"#
}

/// River level window for one day. The `d` field has a null reading that
/// must be dropped; `bs` and `z` are fully populated. Timestamps are
/// 2020-01-01T00:00:00Z and 01:00:00Z in epoch milliseconds.
pub(crate) fn fixture_mgraph_river_level_json() -> &'static str {
    r#"{
      "period_1": "2020-01-01T00:00:00",
      "period_2": "2020-01-02T00:00:00",
      "bs": [ [1577836800000, 92.15], [1577840400000, 92.17] ],
      "d":  [ [1577836800000, 3.42],  [1577840400000, null] ],
      "z":  [ [1577836800000, 88.73], [1577840400000, 88.73] ]
    }"#
}

/// Scalar-mode window: one `discharge` field keyed by the mode name.
pub(crate) fn fixture_mgraph_discharge_json() -> &'static str {
    r#"{
      "period_1": "2020-01-01T00:00:00",
      "period_2": "2020-01-02T00:00:00",
      "discharge": [ [1577836800000, 17.5], [1577840400000, 18.1] ]
    }"#
}

/// A response where one whole field is null: the station stopped reporting
/// temperature for the window. The field is skipped, not an error.
pub(crate) fn fixture_mgraph_null_field_json() -> &'static str {
    r#"{
      "period_1": "2020-01-01T00:00:00",
      "period_2": "2020-01-02T00:00:00",
      "temperature": null,
      "discharge": [ [1577836800000, 17.5] ]
    }"#
}
