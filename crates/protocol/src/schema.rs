use crate::payloads::{FileChangePlan, LoadAck, PatchData};
use crate::stage::Stage;
use schemars::generate::SchemaSettings;
use schemars::Schema;

/// Response schema expected for `stage`.
///
/// Subschemas are inlined so the document stands alone when pasted into a
/// prompt; every object forbids additional properties.
pub fn schema_for(stage: Stage) -> Schema {
    let generator = SchemaSettings::draft2020_12()
        .with(|settings| settings.inline_subschemas = true)
        .into_generator();

    match stage {
        Stage::Load => generator.into_root_schema_for::<LoadAck>(),
        Stage::Select => generator.into_root_schema_for::<FileChangePlan>(),
        Stage::Work => generator.into_root_schema_for::<PatchData>(),
    }
}

/// Pretty JSON rendering of [`schema_for`]
pub fn schema_text(stage: Stage) -> String {
    format!("{:#}", schema_for(stage).as_value())
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::{json, Value};

    fn required(value: &Value) -> Vec<&str> {
        let mut keys: Vec<_> = value["required"]
            .as_array()
            .map(|items| items.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default();
        keys.sort_unstable();
        keys
    }

    #[test]
    fn test_load_schema() {
        let schema = schema_for(Stage::Load);
        let value = schema.as_value();
        assert_eq!(value["additionalProperties"], json!(false));
        assert_eq!(required(value), vec!["stage", "status"]);
        let stage = value["properties"]["stage"].to_string();
        assert!(stage.contains("\"load\"") && stage.contains("\"work\""));
    }

    #[test]
    fn test_select_schema_is_self_contained() {
        let schema = schema_for(Stage::Select);
        let value = schema.as_value();
        assert_eq!(required(value), vec!["additionalContextFiles", "files"]);

        let item = &value["properties"]["files"]["items"];
        assert_eq!(item["additionalProperties"], json!(false));
        assert_eq!(item["properties"]["operation"]["enum"], json!([-1, 0, 1]));
        assert_eq!(required(item), vec!["operation", "path", "reason"]);

        let text = schema_text(Stage::Select);
        assert!(!text.contains("$ref"));
        assert!(!text.contains("$defs"));
    }

    #[test]
    fn test_work_schema() {
        let schema = schema_for(Stage::Work);
        let value = schema.as_value();
        assert_eq!(value["additionalProperties"], json!(false));
        assert_eq!(required(value), vec!["patch", "path", "summary"]);
    }
}
