//! Stage reply payloads.
//!
//! These types double as the source of the response schemas, so every field
//! here is part of the contract handed to the model.

use crate::stage::Stage;
use schemars::{json_schema, JsonSchema, Schema, SchemaGenerator};
use serde::{Deserialize, Serialize};
use std::borrow::Cow;
use std::fmt;

/// LOAD reply: the model confirms it received the codebase context
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct LoadAck {
    /// Must echo "load"
    pub stage: Stage,
    /// "ok" once the context has been read
    pub status: String,
}

/// Intended change to one file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "i8", into = "i8")]
pub enum FileOperation {
    Remove,
    Update,
    Create,
}

impl FileOperation {
    pub fn code(self) -> i8 {
        match self {
            FileOperation::Remove => -1,
            FileOperation::Update => 0,
            FileOperation::Create => 1,
        }
    }

    /// Whether the file exists locally before the change
    pub fn has_existing_content(self) -> bool {
        !matches!(self, FileOperation::Create)
    }
}

impl TryFrom<i8> for FileOperation {
    type Error = String;

    fn try_from(code: i8) -> Result<Self, Self::Error> {
        match code {
            -1 => Ok(FileOperation::Remove),
            0 => Ok(FileOperation::Update),
            1 => Ok(FileOperation::Create),
            other => Err(format!("unknown file operation {other} (expected -1, 0 or 1)")),
        }
    }
}

impl From<FileOperation> for i8 {
    fn from(op: FileOperation) -> Self {
        op.code()
    }
}

impl fmt::Display for FileOperation {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            FileOperation::Remove => "remove",
            FileOperation::Update => "update",
            FileOperation::Create => "create",
        };
        f.write_str(name)
    }
}

impl JsonSchema for FileOperation {
    fn schema_name() -> Cow<'static, str> {
        "FileOperation".into()
    }

    fn inline_schema() -> bool {
        true
    }

    fn json_schema(_: &mut SchemaGenerator) -> Schema {
        json_schema!({
            "type": "integer",
            "enum": [-1, 0, 1],
            "description": "0 = update an existing file, 1 = create a new file, -1 = remove the file"
        })
    }
}

/// One entry of a change plan
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct FileChange {
    /// Path relative to the codebase root
    pub path: String,
    pub operation: FileOperation,
    /// Why the file is listed
    pub reason: String,
}

impl FileChange {
    pub fn new(path: impl Into<String>, operation: FileOperation, reason: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            operation,
            reason: reason.into(),
        }
    }
}

/// SELECT reply
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase", deny_unknown_fields)]
pub struct FileChangePlan {
    /// Files to update, create or remove
    pub files: Vec<FileChange>,
    /// Files whose content helps but which are not edited
    pub additional_context_files: Vec<FileChange>,
}

impl FileChangePlan {
    /// Every entry in both lists, primary list first
    pub fn entries(&self) -> impl Iterator<Item = &FileChange> {
        self.files.iter().chain(self.additional_context_files.iter())
    }
}

/// WORK reply
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, JsonSchema)]
#[serde(deny_unknown_fields)]
pub struct PatchData {
    /// The file being patched, exactly as requested
    pub path: String,
    /// Unified diff restricted to `path`
    pub patch: String,
    /// One-line description of the change
    pub summary: String,
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn test_operation_codes() {
        let change: FileChange =
            serde_json::from_value(json!({"path": "a.go", "operation": 1, "reason": "new"})).unwrap();
        assert_eq!(change.operation, FileOperation::Create);
        assert_eq!(
            serde_json::to_value(FileChange::new("b.go", FileOperation::Remove, "gone")).unwrap(),
            json!({"path": "b.go", "operation": -1, "reason": "gone"})
        );
        assert!(serde_json::from_value::<FileChange>(
            json!({"path": "a.go", "operation": 2, "reason": "?"})
        )
        .is_err());
    }

    #[test]
    fn test_plan_rejects_unknown_fields() {
        let err = serde_json::from_value::<FileChangePlan>(json!({
            "files": [],
            "additionalContextFiles": [],
            "extra": true
        }))
        .unwrap_err();
        assert!(err.to_string().contains("unknown field"));
    }

    #[test]
    fn test_plan_entries_order() {
        let plan = FileChangePlan {
            files: vec![FileChange::new("a.go", FileOperation::Update, "edit")],
            additional_context_files: vec![FileChange::new("b.go", FileOperation::Update, "read")],
        };
        let paths: Vec<_> = plan.entries().map(|c| c.path.as_str()).collect();
        assert_eq!(paths, vec!["a.go", "b.go"]);
    }
}
