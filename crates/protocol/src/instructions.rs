use crate::envelope::SessionRequest;
use crate::error::{ProtocolError, Result};
use crate::schema::schema_text;
use crate::stage::Stage;

const CONTEXT_PREAMBLE: &str = "The previous part is a JSON codebase context. \
`snapshot` maps the codebase root to a tree of nodes; directories have `children`, \
files list the `identifiers` declared in them, and `excluded` entries were not expanded. \
`fileContents` holds the full text of files gathered so far.";

/// Stage instruction text for `request`
pub fn instructions_for(request: &SessionRequest) -> String {
    let body = match request.stage {
        Stage::Load => "Acknowledge receipt of the codebase context. \
            Reply with stage \"load\" and status \"ok\"."
            .to_string(),
        Stage::Select => format!(
            "Consider the codebase context and the task below. \
             List in `files` every file that must be updated (operation 0), created (operation 1) \
             or removed (operation -1) to complete the task. \
             List in `additionalContextFiles` files whose content is needed to do the work \
             but which are not edited. A path may appear in only one list. \
             Every entry states its operation and a short reason.\n\nTask:\n```\n{}\n```",
            request.task_prompt.as_deref().unwrap_or_default()
        ),
        Stage::Work => format!(
            "Consider the codebase context and the task below. \
             Produce a single unified diff that changes only the file shown below. \
             Line numbers are prefixed to each line for reference and are not part of the file. \
             Set `path` to the file path exactly as shown.\n\nTask:\n```\n{}\n```\n\n{}",
            request.task_prompt.as_deref().unwrap_or_default(),
            request.file_work_prompt.as_deref().unwrap_or_default()
        ),
    };

    format!(
        "{CONTEXT_PREAMBLE}\n\n{body}\n\nRespond using this JSON schema:\n{}",
        schema_text(request.stage)
    )
}

/// Ordered model input: serialized context first, then the stage instructions
pub fn prompt_parts(request: &SessionRequest) -> Result<Vec<String>> {
    let context = serde_json::to_string(&request.context).map_err(ProtocolError::Encode)?;
    Ok(vec![context, instructions_for(request)])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::snapshot::{CodebaseContext, SnapshotNode};

    fn context() -> CodebaseContext {
        CodebaseContext::new("/repo", SnapshotNode::directory())
    }

    #[test]
    fn test_context_is_first_part() {
        let request = SessionRequest::load("c1", context());
        let parts = prompt_parts(&request).unwrap();
        assert_eq!(parts.len(), 2);
        assert!(parts[0].starts_with("{\"snapshot\""));
        assert!(parts[1].contains("Respond using this JSON schema"));
    }

    #[test]
    fn test_select_embeds_task_and_schema() {
        let request = SessionRequest::select("c1", context(), "add a health endpoint");
        let text = instructions_for(&request);
        assert!(text.contains("add a health endpoint"));
        assert!(text.contains("additionalContextFiles"));
    }

    #[test]
    fn test_work_embeds_file_prompt() {
        let request = SessionRequest::work("c1", context(), "rename", "File: b.go\n1: package b\n");
        let text = instructions_for(&request);
        assert!(text.contains("File: b.go\n1: package b"));
        assert!(text.contains("\"patch\""));
    }
}
