use crate::backend::{GenerateOptions, ModelBackend, ModelError};
use async_trait::async_trait;
use ctx_protocol::{FileChangePlan, LoadAck, PatchData, Stage};

/// Offline backend returning canned, schema-valid replies.
///
/// WORK replies echo the file named in the prompt with a one-line patch.
#[derive(Debug, Clone, Default)]
pub struct StubBackend {
    plan: FileChangePlan,
}

impl StubBackend {
    pub fn new() -> Self {
        Self::default()
    }

    /// Plan returned for every SELECT
    pub fn with_plan(mut self, plan: FileChangePlan) -> Self {
        self.plan = plan;
        self
    }

    fn reply(&self, parts: &[String], stage: Stage) -> Result<serde_json::Value, ModelError> {
        let value = match stage {
            Stage::Load => serde_json::to_value(LoadAck {
                stage: Stage::Load,
                status: "ok".to_string(),
            }),
            Stage::Select => serde_json::to_value(&self.plan),
            Stage::Work => {
                let path = prompted_path(parts)
                    .ok_or_else(|| ModelError::Other("work prompt names no file".to_string()))?;
                serde_json::to_value(PatchData {
                    path: path.to_string(),
                    patch: format!(
                        "--- a/{path}\n+++ b/{path}\n@@ -1,0 +1,1 @@\n+// ctx stub\n"
                    ),
                    summary: format!("stub change for {path}"),
                })
            }
        };
        value.map_err(|e| ModelError::Other(e.to_string()))
    }
}

/// Last `File: ` header in the stage instructions
fn prompted_path(parts: &[String]) -> Option<&str> {
    parts
        .last()?
        .lines()
        .filter_map(|line| line.strip_prefix("File: "))
        .map(str::trim)
        .filter(|path| !path.is_empty())
        .last()
}

#[async_trait]
impl ModelBackend for StubBackend {
    fn name(&self) -> &str {
        "stub"
    }

    async fn generate(&self, parts: &[String], options: &GenerateOptions) -> Result<String, ModelError> {
        let value = self.reply(parts, options.stage)?;
        Ok(value.to_string())
    }
}
