//! Message templates and placeholder rendering.
//!
//! Templates live in a read-only JSON array and are loaded once per
//! scheduler pass. Rendering substitutes `{{key}}` markers in a single
//! left-to-right scan; it is deliberately not iterated to a fixed point, so
//! values are never re-scanned for markers.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fs;
use std::path::{Path, PathBuf};

use crate::error::{Error, Result};

/// A named message template with `{{placeholder}}` markers.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Template {
    pub id: String,
    pub name: String,
    pub body: String,
    pub daily_limit: u32,
}

/// Read-only JSON store of templates.
pub struct TemplateStore {
    path: PathBuf,
}

impl TemplateStore {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load all templates. An absent file yields an empty list.
    pub fn load(&self) -> Result<Vec<Template>> {
        if !self.path.exists() {
            return Ok(Vec::new());
        }
        let content =
            fs::read_to_string(&self.path).map_err(|e| Error::storage(&self.path, e))?;
        serde_json::from_str(&content).map_err(|e| Error::storage(&self.path, e))
    }
}

/// Look up a template by id.
pub fn find_template<'a>(templates: &'a [Template], id: &str) -> Option<&'a Template> {
    templates.iter().find(|t| t.id == id)
}

/// Substitute `{{key}}` markers with values from `vars`.
///
/// Unknown keys are left as literal marker text; after the pass, any
/// remaining `{{` in the output fails with [`Error::UnresolvedVariable`].
pub fn render(body: &str, vars: &BTreeMap<String, String>) -> Result<String> {
    let mut out = String::with_capacity(body.len());
    let mut rest = body;
    while let Some(start) = rest.find("{{") {
        out.push_str(&rest[..start]);
        let after = &rest[start + 2..];
        match after.find("}}") {
            Some(end) => {
                let key = &after[..end];
                match vars.get(key) {
                    Some(value) => out.push_str(value),
                    None => {
                        out.push_str("{{");
                        out.push_str(key);
                        out.push_str("}}");
                    }
                }
                rest = &after[end + 2..];
            }
            None => {
                // Unterminated marker; keep the tail literally.
                out.push_str("{{");
                out.push_str(after);
                rest = "";
            }
        }
    }
    out.push_str(rest);

    if let Some(start) = out.find("{{") {
        let marker = out[start..]
            .find("}}")
            .map(|end| out[start + 2..start + end].to_string())
            .unwrap_or_else(|| out[start..].to_string());
        return Err(Error::UnresolvedVariable(marker));
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn vars(pairs: &[(&str, &str)]) -> BTreeMap<String, String> {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect()
    }

    #[test]
    fn test_render_substitutes_all_placeholders() {
        let out = render(
            "Hi {{first_name}}, welcome to {{company}}!",
            &vars(&[("first_name", "Ada"), ("company", "Initech")]),
        )
        .unwrap();
        assert_eq!(out, "Hi Ada, welcome to Initech!");
        assert!(!out.contains("{{"));
    }

    #[test]
    fn test_render_repeated_placeholder() {
        let out = render(
            "{{name}} and {{name}} again",
            &vars(&[("name", "Ada")]),
        )
        .unwrap();
        assert_eq!(out, "Ada and Ada again");
    }

    #[test]
    fn test_render_missing_variable_fails() {
        let err = render("Hi {{first_name}}", &BTreeMap::new()).unwrap_err();
        assert!(matches!(err, Error::UnresolvedVariable(key) if key == "first_name"));
    }

    #[test]
    fn test_render_is_single_pass() {
        // A value containing a marker is not resolved recursively; the
        // leftover marker trips the strict check.
        let err = render("Hi {{a}}", &vars(&[("a", "{{b}}"), ("b", "x")])).unwrap_err();
        assert!(matches!(err, Error::UnresolvedVariable(_)));
    }

    #[test]
    fn test_render_no_placeholders_is_identity() {
        let out = render("plain text", &BTreeMap::new()).unwrap();
        assert_eq!(out, "plain text");
    }

    #[test]
    fn test_store_load_and_lookup() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("templates.json");
        fs::write(
            &path,
            r#"[
  {"id": "welcome_1", "name": "Welcome", "body": "Hi {{first_name}}!", "daily_limit": 5},
  {"id": "followup_1", "name": "Follow up", "body": "Just checking in.", "daily_limit": 3}
]"#,
        )
        .unwrap();

        let store = TemplateStore::new(&path);
        let templates = store.load().unwrap();
        assert_eq!(templates.len(), 2);
        assert_eq!(
            find_template(&templates, "welcome_1").unwrap().name,
            "Welcome"
        );
        assert!(find_template(&templates, "nope").is_none());
    }

    #[test]
    fn test_store_absent_file_is_empty() {
        let dir = TempDir::new().unwrap();
        let store = TemplateStore::new(dir.path().join("templates.json"));
        assert!(store.load().unwrap().is_empty());
    }

    #[test]
    fn test_store_malformed_is_an_error() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("templates.json");
        fs::write(&path, "{]").unwrap();
        assert!(matches!(
            TemplateStore::new(&path).load(),
            Err(Error::Storage { .. })
        ));
    }
}
