use crate::payloads::FileOperation;

/// Per-file WORK prompt: a path header followed by the body numbered from 1.
///
/// Created files and files without readable content send the header only.
pub fn file_work_prompt(path: &str, operation: FileOperation, content: Option<&str>) -> String {
    let mut prompt = format!("File: {path}\n");
    if let (true, Some(body)) = (operation.has_existing_content(), content) {
        prompt.push_str(&number_lines(body));
    }
    prompt
}

/// Path named by the header of a WORK prompt
pub fn work_prompt_path(prompt: &str) -> Option<&str> {
    prompt
        .lines()
        .next()?
        .strip_prefix("File: ")
        .map(str::trim)
        .filter(|path| !path.is_empty())
}

/// `N: line` for every line, starting at 1
pub fn number_lines(content: &str) -> String {
    let mut numbered = String::with_capacity(content.len() + content.len() / 8);
    for (index, line) in content.lines().enumerate() {
        numbered.push_str(&format!("{}: {line}\n", index + 1));
    }
    numbered
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_numbered_body() {
        let prompt = file_work_prompt("b.go", FileOperation::Update, Some("package b\n\nfunc B() {}\n"));
        assert_eq!(prompt, "File: b.go\n1: package b\n2: \n3: func B() {}\n");
    }

    #[test]
    fn test_created_file_has_header_only() {
        assert_eq!(
            file_work_prompt("a.go", FileOperation::Create, Some("ignored")),
            "File: a.go\n"
        );
        assert_eq!(file_work_prompt("c.go", FileOperation::Update, None), "File: c.go\n");
    }

    #[test]
    fn test_header_path() {
        assert_eq!(work_prompt_path("File: src/a.go\n1: package a\n"), Some("src/a.go"));
        assert_eq!(work_prompt_path("1: package a"), None);
        assert_eq!(work_prompt_path("File: \n"), None);
    }

    #[test]
    fn test_removed_file_keeps_body() {
        let prompt = file_work_prompt("old.py", FileOperation::Remove, Some("x = 1"));
        assert_eq!(prompt, "File: old.py\n1: x = 1\n");
    }
}
