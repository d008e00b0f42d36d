use crate::models::snapshot::Dependencies;
use log::warn;
use serde_json::Value;
use std::collections::BTreeMap;
use std::fs;
use std::path::Path;

pub const NPM: &str = "npm";
pub const PYTHON: &str = "python";

/// Parse the dependency manifests found at the repository root. A malformed
/// manifest is logged and skipped.
pub fn collect_dependencies(root: &Path) -> Dependencies {
    let mut deps = Dependencies::new();

    if let Some(raw) = read_manifest(root, "package.json") {
        match parse_package_json(&raw) {
            Ok(npm) => {
                deps.insert(NPM.to_string(), npm);
            }
            Err(e) => warn!("Ignoring malformed package.json: {e}"),
        }
    }

    let mut python = BTreeMap::new();
    if let Some(raw) = read_manifest(root, "pyproject.toml") {
        match parse_pyproject(&raw) {
            Ok(found) => python.extend(found),
            Err(e) => warn!("Ignoring malformed pyproject.toml: {e}"),
        }
    }
    if let Some(raw) = read_manifest(root, "requirements.txt") {
        python.extend(parse_requirements(&raw));
    }
    if !python.is_empty() {
        deps.insert(PYTHON.to_string(), python);
    }

    deps
}

fn read_manifest(root: &Path, name: &str) -> Option<String> {
    let path = root.join(name);
    if !path.is_file() {
        return None;
    }
    fs::read_to_string(&path)
        .map_err(|e| warn!("Could not read {}: {e}", path.display()))
        .ok()
}

pub fn parse_package_json(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let manifest: Value =
        serde_json::from_str(raw).map_err(|e| format!("invalid JSON: {e}"))?;
    let mut deps = BTreeMap::new();

    for section in ["dependencies", "devDependencies"] {
        if let Some(obj) = manifest.get(section).and_then(Value::as_object) {
            for (name, version) in obj {
                let version = version
                    .as_str()
                    .map(str::to_string)
                    .unwrap_or_else(|| version.to_string());
                deps.entry(name.clone()).or_insert(version);
            }
        }
    }

    Ok(deps)
}

pub fn parse_pyproject(raw: &str) -> Result<BTreeMap<String, String>, String> {
    let manifest: toml::Table = raw.parse().map_err(|e| format!("invalid TOML: {e}"))?;
    let mut deps = BTreeMap::new();

    // PEP 621
    if let Some(list) = manifest
        .get("project")
        .and_then(|p| p.get("dependencies"))
        .and_then(toml::Value::as_array)
    {
        for requirement in list.iter().filter_map(toml::Value::as_str) {
            if let Some((name, version)) = split_requirement(requirement) {
                deps.insert(name, version);
            }
        }
    }

    // Poetry
    if let Some(table) = manifest
        .get("tool")
        .and_then(|t| t.get("poetry"))
        .and_then(|p| p.get("dependencies"))
        .and_then(toml::Value::as_table)
    {
        for (name, entry) in table {
            if name == "python" {
                continue;
            }
            let version = match entry {
                toml::Value::String(v) => v.clone(),
                toml::Value::Table(t) => t
                    .get("version")
                    .and_then(toml::Value::as_str)
                    .unwrap_or("*")
                    .to_string(),
                _ => "*".to_string(),
            };
            deps.insert(name.clone(), version);
        }
    }

    Ok(deps)
}

pub fn parse_requirements(raw: &str) -> BTreeMap<String, String> {
    raw.lines()
        .map(|line| line.split('#').next().unwrap_or_default().trim())
        .filter(|line| !line.is_empty() && !line.starts_with('-'))
        .filter_map(split_requirement)
        .collect()
}

/// Split a PEP 508 requirement (`requests[socks]>=2.0; python_version>"3"`)
/// into name and version specifier. Extras and markers are dropped.
fn split_requirement(requirement: &str) -> Option<(String, String)> {
    let requirement = requirement.split(';').next().unwrap_or_default().trim();
    let name_end = requirement
        .find(|c: char| !(c.is_ascii_alphanumeric() || matches!(c, '.' | '_' | '-')))
        .unwrap_or(requirement.len());
    let name = &requirement[..name_end];
    if name.is_empty() {
        return None;
    }

    let mut rest = requirement[name_end..].trim_start();
    if rest.starts_with('[') {
        rest = rest.find(']').map(|i| &rest[i + 1..]).unwrap_or_default().trim_start();
    }

    let version = if rest.is_empty() { "*" } else { rest.trim() };
    Some((name.to_string(), version.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn merges_runtime_and_dev_dependencies() {
        let deps = parse_package_json(
            r#"{ "dependencies": { "@primer/css": "17.0.1" }, "devDependencies": { "jest": "^29" } }"#,
        )
        .unwrap();
        assert_eq!(deps["@primer/css"], "17.0.1");
        assert_eq!(deps["jest"], "^29");
    }

    #[test]
    fn package_json_without_dependencies_is_empty() {
        assert!(parse_package_json(r#"{ "name": "demo" }"#).unwrap().is_empty());
        assert!(parse_package_json("{ oops").is_err());
    }

    #[test]
    fn parses_pep621_and_poetry_tables() {
        let deps = parse_pyproject(
            r#"
[project]
dependencies = ["flask>=2.0", "requests[socks] ==2.31; python_version > '3.8'", "rich"]

[tool.poetry.dependencies]
python = "^3.11"
mistralai = "^0.4"
openai = { version = "^1.0", optional = true }
"#,
        )
        .unwrap();

        assert_eq!(deps["flask"], ">=2.0");
        assert_eq!(deps["requests"], "==2.31");
        assert_eq!(deps["rich"], "*");
        assert_eq!(deps["mistralai"], "^0.4");
        assert_eq!(deps["openai"], "^1.0");
        assert!(!deps.contains_key("python"));
    }

    #[test]
    fn requirements_skip_comments_and_options() {
        let deps = parse_requirements("# pinned\nflask==2.3.2\n-r base.txt\n\nflask-cors  # cors\n");
        assert_eq!(deps.len(), 2);
        assert_eq!(deps["flask"], "==2.3.2");
        assert_eq!(deps["flask-cors"], "*");
    }

    #[test]
    fn collects_from_root_and_tolerates_bad_manifests() {
        let tmp = tempfile::tempdir().unwrap();
        fs::write(tmp.path().join("package.json"), "not json").unwrap();
        fs::write(tmp.path().join("requirements.txt"), "tenacity>=8\n").unwrap();

        let deps = collect_dependencies(tmp.path());
        assert!(!deps.contains_key(NPM));
        assert_eq!(deps[PYTHON]["tenacity"], ">=8");
    }
}
