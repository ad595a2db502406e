//! Renders a router's feature registry as the IDL JSON string served by
//! `META.IDL_JSON` (§4.4). The JSON *schema* itself is explicitly out of
//! scope (§1 "meta-introspection payload contents"); this module only needs
//! to produce *some* faithful, stable rendering of what's registered.

use hdc_core::Feature;
use hdc_proto::dtype::DataType;

fn dtype_name(dtype: DataType) -> &'static str {
    match dtype {
        DataType::Uint8 => "UINT8",
        DataType::Uint16 => "UINT16",
        DataType::Uint32 => "UINT32",
        DataType::Int8 => "INT8",
        DataType::Int16 => "INT16",
        DataType::Int32 => "INT32",
        DataType::Float => "FLOAT",
        DataType::Double => "DOUBLE",
        DataType::Utf8 => "UTF8",
        DataType::Bool => "BOOL",
        DataType::Blob => "BLOB",
        DataType::Dtype => "DTYPE",
    }
}

/// Render every feature in `features` (in ascending FeatureID order) as a
/// JSON document describing its commands, events, and properties.
pub fn render<'a>(features: impl Iterator<Item = &'a Feature>) -> serde_json::Value {
    let rendered: Vec<serde_json::Value> = features
        .map(|feature| {
            serde_json::json!({
                "id": feature.id(),
                "name": feature.name(),
                "commands": feature.commands().map(|c| serde_json::json!({
                    "id": c.id,
                    "name": c.name,
                    "args": c.args.iter().copied().map(dtype_name).collect::<Vec<_>>(),
                    "returns": c.returns.iter().copied().map(dtype_name).collect::<Vec<_>>(),
                })).collect::<Vec<_>>(),
                "events": feature.events().map(|e| serde_json::json!({
                    "id": e.id,
                    "name": e.name,
                    "args": e.args.iter().copied().map(dtype_name).collect::<Vec<_>>(),
                })).collect::<Vec<_>>(),
                "properties": feature.properties().map(|p| serde_json::json!({
                    "id": p.id,
                    "name": p.name,
                    "dtype": dtype_name(p.dtype),
                    "readonly": p.is_readonly(),
                })).collect::<Vec<_>>(),
            })
        })
        .collect();

    serde_json::json!({ "features": rendered })
}

#[cfg(test)]
mod tests {
    use hdc_proto::ids::CORE_FEATURE_ID;

    use super::*;

    #[test]
    fn core_feature_renders_mandatory_members_only() {
        let core = hdc_core::core_feature();
        let json = render(std::iter::once(&core));
        let features = json["features"].as_array().unwrap();
        assert_eq!(features.len(), 1);
        assert_eq!(features[0]["id"], CORE_FEATURE_ID);
        assert_eq!(features[0]["commands"].as_array().unwrap().len(), 2);
        assert_eq!(features[0]["properties"].as_array().unwrap().len(), 2);
    }
}
