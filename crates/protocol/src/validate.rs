use crate::error::SchemaViolation;
use crate::payloads::{FileChangePlan, LoadAck, PatchData};
use crate::stage::Stage;
use serde::de::DeserializeOwned;
use serde_json::Value;
use std::collections::HashSet;
use std::path::{Component, Path};

/// A validated stage reply
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StagePayload {
    Load(LoadAck),
    Select(FileChangePlan),
    Work(PatchData),
}

impl StagePayload {
    pub fn stage(&self) -> Stage {
        match self {
            StagePayload::Load(_) => Stage::Load,
            StagePayload::Select(_) => Stage::Select,
            StagePayload::Work(_) => Stage::Work,
        }
    }

    /// Validate `data` for `stage`. `target` is the WORK file path.
    pub fn validate(stage: Stage, data: &Value, target: Option<&str>) -> Result<Self, SchemaViolation> {
        match stage {
            Stage::Load => validate_load(data).map(StagePayload::Load),
            Stage::Select => validate_select(data).map(StagePayload::Select),
            Stage::Work => validate_work(data, target.unwrap_or_default()).map(StagePayload::Work),
        }
    }

    /// Parse raw model text for `stage`, tolerating a fenced code block
    pub fn from_model_text(stage: Stage, text: &str, target: Option<&str>) -> Result<Self, SchemaViolation> {
        let value: Value = serde_json::from_str(strip_code_fence(text))
            .map_err(|e| SchemaViolation::malformed(stage, e.to_string()))?;
        Self::validate(stage, &value, target)
    }

    pub fn to_value(&self) -> Value {
        let value = match self {
            StagePayload::Load(ack) => serde_json::to_value(ack),
            StagePayload::Select(plan) => serde_json::to_value(plan),
            StagePayload::Work(patch) => serde_json::to_value(patch),
        };
        value.unwrap_or(Value::Null)
    }
}

fn typed<T: DeserializeOwned>(stage: Stage, data: &Value) -> Result<T, SchemaViolation> {
    T::deserialize(data).map_err(|e| SchemaViolation::malformed(stage, e.to_string()))
}

pub fn validate_load(data: &Value) -> Result<LoadAck, SchemaViolation> {
    let ack: LoadAck = typed(Stage::Load, data)?;
    if ack.stage != Stage::Load {
        return Err(SchemaViolation::StageMismatch {
            expected: Stage::Load,
            found: ack.stage,
        });
    }
    if ack.status.trim().is_empty() {
        return Err(SchemaViolation::EmptyStatus);
    }
    Ok(ack)
}

/// A path may appear once across both lists
pub fn validate_select(data: &Value) -> Result<FileChangePlan, SchemaViolation> {
    let plan: FileChangePlan = typed(Stage::Select, data)?;
    let mut seen = HashSet::new();
    for change in plan.entries() {
        check_relative(&change.path)?;
        if !seen.insert(change.path.as_str()) {
            return Err(SchemaViolation::DuplicatePath(change.path.clone()));
        }
    }
    Ok(plan)
}

pub fn validate_work(data: &Value, target: &str) -> Result<PatchData, SchemaViolation> {
    let patch: PatchData = typed(Stage::Work, data)?;
    if patch.path != target {
        return Err(SchemaViolation::WrongTarget {
            expected: target.to_string(),
            found: patch.path,
        });
    }
    if let Some(found) = foreign_patch_path(&patch.patch, target) {
        return Err(SchemaViolation::ForeignPatchPath {
            expected: target.to_string(),
            found,
        });
    }
    Ok(patch)
}

fn check_relative(path: &str) -> Result<(), SchemaViolation> {
    if path.trim().is_empty() {
        return Err(SchemaViolation::EmptyPath);
    }
    let escapes = Path::new(path).components().any(|component| {
        matches!(
            component,
            Component::RootDir | Component::Prefix(_) | Component::ParentDir
        )
    });
    if escapes {
        return Err(SchemaViolation::NotRelative(path.to_string()));
    }
    Ok(())
}

/// First diff header naming a file other than `target`.
///
/// Hunk bodies are skipped using the line counts of their `@@` header, so
/// removed lines that happen to start with `--` are never read as headers.
/// A hunk header without readable counts hides everything up to the next
/// `diff ` line.
fn foreign_patch_path(patch: &str, target: &str) -> Option<String> {
    let mut old_left = 0usize;
    let mut new_left = 0usize;
    let mut opaque_hunk = false;

    for line in patch.lines() {
        if old_left > 0 || new_left > 0 {
            match line.as_bytes().first() {
                Some(b'-') => old_left = old_left.saturating_sub(1),
                Some(b'+') => new_left = new_left.saturating_sub(1),
                Some(b'\\') => {}
                _ => {
                    old_left = old_left.saturating_sub(1);
                    new_left = new_left.saturating_sub(1);
                }
            }
            continue;
        }
        if line.starts_with("diff ") {
            opaque_hunk = false;
            continue;
        }
        if let Some(range) = line.strip_prefix("@@") {
            match hunk_counts(range) {
                Some((old, new)) => {
                    old_left = old;
                    new_left = new;
                }
                None => opaque_hunk = true,
            }
            continue;
        }
        if opaque_hunk {
            continue;
        }
        let Some(header) = line
            .strip_prefix("--- ")
            .or_else(|| line.strip_prefix("+++ "))
        else {
            continue;
        };
        let name = header.split('\t').next().unwrap_or(header).trim();
        if name == "/dev/null" || name == target {
            continue;
        }
        let stripped = name
            .strip_prefix("a/")
            .or_else(|| name.strip_prefix("b/"))
            .unwrap_or(name);
        if stripped != target {
            return Some(stripped.to_string());
        }
    }
    None
}

/// Old and new line counts of a ` -l,s +l,s @@` hunk range
fn hunk_counts(range: &str) -> Option<(usize, usize)> {
    let mut parts = range.split_whitespace();
    let old = parts.next()?.strip_prefix('-')?;
    let new = parts.next()?.strip_prefix('+')?;
    Some((range_len(old)?, range_len(new)?))
}

fn range_len(range: &str) -> Option<usize> {
    match range.split_once(',') {
        Some((start, len)) => {
            start.parse::<usize>().ok()?;
            len.parse().ok()
        }
        None => range.parse::<usize>().ok().map(|_| 1),
    }
}

fn strip_code_fence(text: &str) -> &str {
    let trimmed = text.trim();
    let Some(body) = trimmed.strip_prefix("```") else {
        return trimmed;
    };
    // drop the info string ("json") on the opening fence line
    let body = body.split_once('\n').map_or("", |(_, rest)| rest);
    body.trim_end().strip_suffix("```").unwrap_or(body).trim()
}
