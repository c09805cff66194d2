//! Context file contents

use std::path::Path;

use crate::error::{ConfigError, Result};

/// Built-in context file, used when no custom template is configured
pub const BUILTIN_CONTEXT_TEMPLATE: &str = include_str!("templates/AGENTS.md");

/// Load the context file contents from `template`, or the built-in default
pub async fn load_context_template(template: Option<&Path>) -> Result<String> {
    let Some(path) = template else {
        return Ok(BUILTIN_CONTEXT_TEMPLATE.to_string());
    };

    match tokio::fs::read_to_string(path).await {
        Ok(content) => Ok(content),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(ConfigError::TemplateNotFound(path.to_path_buf()).into())
        }
        Err(e) => Err(e.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::Error;
    use tempfile::TempDir;

    #[tokio::test]
    async fn test_builtin_template_by_default() {
        let content = load_context_template(None).await.unwrap();
        assert_eq!(content, BUILTIN_CONTEXT_TEMPLATE);
        assert!(content.contains(".devnest.toml"));
    }

    #[tokio::test]
    async fn test_custom_template() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("team.md");
        std::fs::write(&path, "# Team notes\n").unwrap();

        let content = load_context_template(Some(&path)).await.unwrap();
        assert_eq!(content, "# Team notes\n");
    }

    #[tokio::test]
    async fn test_missing_custom_template() {
        let err = load_context_template(Some(Path::new("/nonexistent/AGENTS.md")))
            .await
            .unwrap_err();
        assert!(matches!(err, Error::Config(ConfigError::TemplateNotFound(_))));
    }
}
