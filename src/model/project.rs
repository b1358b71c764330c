use std::{
    collections::{BTreeSet, HashSet},
    path::Path,
};

use log::{debug, error};
use serde::Deserialize;
use toml::{Table, Value};

use crate::model::{ModuleName, ParseError};

pub(crate) const TARGETS_KEY: &str = "targets";

/// A build target as declared in the project descriptor.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct TargetDeclaration {
    pub name: ModuleName,
    #[serde(default)]
    pub dependencies: Vec<ModuleName>,
    /// Set on aggregate targets written by the synthesizer.
    #[serde(default)]
    pub synthetic: bool,
}

/// The project dependency descriptor: build targets and the names they depend on.
///
/// The parsed document is kept so the descriptor can be written back with only
/// the synthesized target added; keys this crate does not know about survive.
#[derive(Debug, Clone, PartialEq)]
pub struct ProjectDescriptor {
    pub targets: Vec<TargetDeclaration>,
    document: Table,
}

impl ProjectDescriptor {
    pub fn from_file(path: &Path) -> Result<ProjectDescriptor, ParseError> {
        debug!("Reading project descriptor {}", path.display());
        let contents = std::fs::read_to_string(path).map_err(|e| ParseError::io(path, e))?;

        let descriptor = ProjectDescriptor::from_toml_str(&contents);
        if let Err(err) = &descriptor {
            error!(
                "Could not build a valid project descriptor from {} due to err {err}",
                path.display()
            )
        }
        descriptor
    }

    pub fn from_toml_str(data: &str) -> Result<ProjectDescriptor, ParseError> {
        let document = toml::from_str::<Table>(data)?;

        let targets = match document.get(TARGETS_KEY) {
            Some(value) => value.clone().try_into::<Vec<TargetDeclaration>>()?,
            None => Vec::new(),
        };

        let mut seen = HashSet::new();
        for target in &targets {
            if !seen.insert(&target.name) {
                return Err(ParseError::DuplicateTarget(target.name.clone()));
            }
        }

        Ok(ProjectDescriptor { targets, document })
    }

    pub fn target(&self, name: &str) -> Option<&TargetDeclaration> {
        self.targets
            .iter()
            .find(|target| target.name.as_str() == name)
    }

    /// Returns the document with `target` appended to the target list.
    ///
    /// A synthetic target with the same name is replaced. Any other target with
    /// that name is reported back as the conflicting declaration.
    pub(crate) fn document_with_target(
        &self,
        target: &TargetDeclaration,
    ) -> Result<Table, &TargetDeclaration> {
        if let Some(existing) = self.target(target.name.as_str()) {
            if !existing.synthetic {
                return Err(existing);
            }
            debug!("Replacing synthetic target {} from a previous run", existing.name);
        }

        let mut document = self.document.clone();
        let mut targets = match document.remove(TARGETS_KEY) {
            Some(Value::Array(targets)) => targets,
            _ => Vec::new(),
        };
        targets.retain(|value| {
            value.get("name").and_then(Value::as_str) != Some(target.name.as_str())
        });

        let mut entry = Table::new();
        entry.insert("name".to_string(), Value::String(target.name.to_string()));
        entry.insert(
            "dependencies".to_string(),
            Value::Array(
                target
                    .dependencies
                    .iter()
                    .map(|dependency| Value::String(dependency.to_string()))
                    .collect(),
            ),
        );
        if target.synthetic {
            entry.insert("synthetic".to_string(), Value::Boolean(true));
        }
        targets.push(Value::Table(entry));
        document.insert(TARGETS_KEY.to_string(), Value::Array(targets));
        Ok(document)
    }
}

impl TargetDeclaration {
    pub fn synthetic(name: ModuleName, dependencies: &BTreeSet<ModuleName>) -> Self {
        TargetDeclaration {
            name,
            dependencies: dependencies.iter().cloned().collect(),
            synthetic: true,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    use pretty_assertions::assert_eq;

    #[test]
    fn load_valid_descriptor() {
        let str = r#"
            name = "App"

            [[targets]]
            name = "Alamofire"

            [[targets]]
            name = "Moya"
            dependencies = ["Alamofire", "Moya-Core"]
        "#;
        let descriptor = ProjectDescriptor::from_toml_str(str).unwrap();
        assert_eq!(
            descriptor.targets,
            vec![
                TargetDeclaration {
                    name: ModuleName::from("Alamofire"),
                    dependencies: vec![],
                    synthetic: false,
                },
                TargetDeclaration {
                    name: ModuleName::from("Moya"),
                    dependencies: vec![ModuleName::from("Alamofire"), ModuleName::from("Moya-Core")],
                    synthetic: false,
                },
            ]
        );
    }

    #[test]
    fn load_descriptor_without_targets() {
        let descriptor = ProjectDescriptor::from_toml_str(r#"name = "App""#).unwrap();
        assert!(descriptor.targets.is_empty());
    }

    #[test]
    fn load_duplicate_target() {
        let str = r#"
            [[targets]]
            name = "A"
            [[targets]]
            name = "A"
        "#;
        let error = ProjectDescriptor::from_toml_str(str).expect_err("duplicate target");
        assert!(matches!(error, ParseError::DuplicateTarget(name) if name.as_str() == "A"));
    }

    #[test]
    fn load_target_without_name() {
        let str = r#"
            [[targets]]
            dependencies = ["A"]
        "#;
        assert!(ProjectDescriptor::from_toml_str(str).is_err());
    }

    #[test]
    fn load_malformed_toml() {
        assert!(ProjectDescriptor::from_toml_str("[[targets]\nname = ").is_err());
    }

    #[test]
    fn appends_target_and_keeps_other_keys() {
        let str = r#"
            name = "App"
            generator = "cocoapods"

            [[targets]]
            name = "A"
            dependencies = ["B"]
            platform = "ios"
        "#;
        let descriptor = ProjectDescriptor::from_toml_str(str).unwrap();
        let patch = TargetDeclaration::synthetic(
            ModuleName::from("RemoteModules"),
            &BTreeSet::from([ModuleName::from("B"), ModuleName::from("A")]),
        );
        let document = descriptor.document_with_target(&patch).unwrap();

        let written =
            ProjectDescriptor::from_toml_str(&toml::to_string_pretty(&document).unwrap()).unwrap();
        assert_eq!(document.get("generator"), Some(&Value::from("cocoapods")));
        assert_eq!(written.targets.len(), 2);
        assert_eq!(written.targets[0], descriptor.targets[0]);
        assert_eq!(written.targets[1], patch);
        assert_eq!(
            written.targets[1].dependencies,
            vec![ModuleName::from("A"), ModuleName::from("B")]
        );
    }

    #[test]
    fn replaces_previous_synthetic_target() {
        let str = r#"
            [[targets]]
            name = "A"

            [[targets]]
            name = "RemoteModules"
            dependencies = ["Stale"]
            synthetic = true
        "#;
        let descriptor = ProjectDescriptor::from_toml_str(str).unwrap();
        let patch = TargetDeclaration::synthetic(
            ModuleName::from("RemoteModules"),
            &BTreeSet::from([ModuleName::from("A")]),
        );
        let document = descriptor.document_with_target(&patch).unwrap();
        let written =
            ProjectDescriptor::from_toml_str(&toml::to_string_pretty(&document).unwrap()).unwrap();
        assert_eq!(written.targets.len(), 2);
        assert_eq!(written.target("RemoteModules"), Some(&patch));
    }

    #[test]
    fn refuses_to_replace_declared_target() {
        let str = r#"
            [[targets]]
            name = "RemoteModules"
            dependencies = ["A"]
        "#;
        let descriptor = ProjectDescriptor::from_toml_str(str).unwrap();
        let patch = TargetDeclaration::synthetic(
            ModuleName::from("RemoteModules"),
            &BTreeSet::from([ModuleName::from("A")]),
        );
        let conflict = descriptor.document_with_target(&patch).unwrap_err();
        assert!(!conflict.synthetic);
    }
}
