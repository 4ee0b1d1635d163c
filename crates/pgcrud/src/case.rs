//! snake_case / camelCase key conversion.
//!
//! Columns are stored in snake_case while the HTTP layer speaks camelCase.
//! Conversion is delegated to `heck`, so acronyms and digits follow its
//! word-splitting rules (`trip_id_2` -> `tripId2`).

use heck::{ToLowerCamelCase, ToSnakeCase};

/// `trip_package_id` -> `tripPackageId`
pub fn snake_to_camel(s: &str) -> String {
    s.to_lower_camel_case()
}

/// `tripPackageId` -> `trip_package_id`
pub fn camel_to_snake(s: &str) -> String {
    s.to_snake_case()
}

/// Recursively camelCase every object key in a JSON document.
pub fn camelize_json(json: serde_json::Value) -> serde_json::Value {
    match json {
        serde_json::Value::Object(map) => serde_json::Value::Object(
            map.into_iter()
                .map(|(k, v)| (snake_to_camel(&k), camelize_json(v)))
                .collect(),
        ),
        serde_json::Value::Array(items) => {
            serde_json::Value::Array(items.into_iter().map(camelize_json).collect())
        }
        other => other,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn converts_both_ways() {
        assert_eq!(snake_to_camel("trip_package_id"), "tripPackageId");
        assert_eq!(snake_to_camel("id"), "id");
        assert_eq!(camel_to_snake("tripPackageId"), "trip_package_id");
        assert_eq!(camel_to_snake("full_name"), "full_name");
        assert_eq!(camel_to_snake("totalTripCount"), "total_trip_count");
    }

    #[test]
    fn round_trips_ordinary_column_names() {
        for col in ["deleted_at", "trip_transaction_id", "price"] {
            assert_eq!(camel_to_snake(&snake_to_camel(col)), col);
        }
    }
}
