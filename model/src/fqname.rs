// SPDX-License-Identifier: Apache-2.0
// Copyright Open Network Fabric Authors

//! Fully-qualified names (`domain:project:label`) used to address resources.

use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter};
use std::str::FromStr;

/// Number of components in a project scoped name.
pub const PROJECT_SCOPED_LEN: usize = 3;

/// Errors which may occur when building an [`FqName`].
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum IllegalFqName {
    #[error("fully-qualified name must not be empty")]
    Empty,
    #[error("fully-qualified name '{0}' has an empty component")]
    EmptyComponent(String),
    #[error("name component '{0}' must not contain ':'")]
    Separator(String),
}

/// A fully-qualified resource name.
///
/// On the wire this is a list of components; in text and logs it is the components joined with
/// `:`.
#[derive(Clone, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(try_from = "Vec<String>", into = "Vec<String>")]
pub struct FqName(Vec<String>);

impl FqName {
    /// Build a name from its components.
    ///
    /// # Errors
    ///
    /// Fails if there are no components or if any component is empty.
    pub fn new<S: Into<String>>(
        components: impl IntoIterator<Item = S>,
    ) -> Result<Self, IllegalFqName> {
        let components: Vec<String> = components.into_iter().map(Into::into).collect();
        if components.is_empty() {
            return Err(IllegalFqName::Empty);
        }
        if components.iter().any(String::is_empty) {
            return Err(IllegalFqName::EmptyComponent(components.join(":")));
        }
        if let Some(bad) = components.iter().find(|c| c.contains(':')) {
            return Err(IllegalFqName::Separator(bad.clone()));
        }
        Ok(FqName(components))
    }

    #[must_use]
    pub fn components(&self) -> &[String] {
        &self.0
    }

    /// The last component.
    #[must_use]
    pub fn label(&self) -> &str {
        // never empty by construction
        self.0.last().map_or("", String::as_str)
    }

    /// The name of the parent (all components but the last), if any.
    #[must_use]
    pub fn parent(&self) -> Option<FqName> {
        if self.0.len() < 2 {
            return None;
        }
        Some(FqName(self.0[..self.0.len() - 1].to_vec()))
    }

    /// A child of this name with the given label.
    ///
    /// # Errors
    ///
    /// Fails if `label` is empty.
    pub fn child(&self, label: impl Into<String>) -> Result<FqName, IllegalFqName> {
        FqName::new(self.0.iter().cloned().chain(std::iter::once(label.into())))
    }
}

impl Display for FqName {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0.join(":"))
    }
}

impl FromStr for FqName {
    type Err = IllegalFqName;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FqName::new(s.split(':'))
    }
}

impl TryFrom<Vec<String>> for FqName {
    type Error = IllegalFqName;

    fn try_from(value: Vec<String>) -> Result<Self, Self::Error> {
        FqName::new(value)
    }
}

impl From<FqName> for Vec<String> {
    fn from(value: FqName) -> Self {
        value.0
    }
}

/// The `domain:project` pair under which project resources are created.
#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Scope {
    domain: String,
    project: String,
}

impl Scope {
    /// # Errors
    ///
    /// Fails if either the domain or the project is empty or contains `:`.
    pub fn new(domain: impl Into<String>, project: impl Into<String>) -> Result<Self, IllegalFqName> {
        let domain = domain.into();
        let project = project.into();
        FqName::new([domain.as_str(), project.as_str()])?;
        Ok(Scope { domain, project })
    }

    #[must_use]
    pub fn domain(&self) -> &str {
        &self.domain
    }

    #[must_use]
    pub fn project(&self) -> &str {
        &self.project
    }

    /// The name of the project itself (`domain:project`).
    #[must_use]
    pub fn project_fq_name(&self) -> FqName {
        FqName(vec![self.domain.clone(), self.project.clone()])
    }

    /// A domain scoped name (`domain:label`), as used by service templates.
    ///
    /// # Errors
    ///
    /// Fails if `label` is empty.
    pub fn domain_child(&self, label: impl Into<String>) -> Result<FqName, IllegalFqName> {
        FqName::new([self.domain.clone(), label.into()])
    }

    /// A project scoped name (`domain:project:label`).
    ///
    /// # Errors
    ///
    /// Fails if `label` is empty.
    pub fn child(&self, label: impl Into<String>) -> Result<FqName, IllegalFqName> {
        FqName::new([self.domain.clone(), self.project.clone(), label.into()])
    }

    /// Expand a network name given on the command line into a project scoped name.
    ///
    /// A name which already has three components is kept verbatim.
    /// Anything else is reduced to its last component and placed under this scope, so both
    /// `public` and `other-project:public` become `domain:project:public`.
    ///
    /// # Errors
    ///
    /// Fails if the resulting name has an empty component.
    pub fn network_name(&self, name: &str) -> Result<FqName, IllegalFqName> {
        let components: Vec<&str> = name.split(':').collect();
        if components.len() == PROJECT_SCOPED_LEN {
            return FqName::new(components);
        }
        let label = components.last().copied().unwrap_or_default();
        self.child(label)
    }
}

#[cfg(test)]
mod tests {
    use super::{FqName, IllegalFqName, Scope};
    use pretty_assertions::assert_eq;

    fn scope() -> Scope {
        Scope::new("default-domain", "admin").unwrap()
    }

    #[test]
    fn bare_label_is_expanded() {
        let name = scope().network_name("net-left").unwrap();
        assert_eq!(name.to_string(), "default-domain:admin:net-left");
    }

    #[test]
    fn three_part_name_is_unchanged() {
        let name = scope().network_name("a:b:c").unwrap();
        assert_eq!(name.to_string(), "a:b:c");
        assert_eq!(name.components(), ["a", "b", "c"]);
    }

    #[test]
    fn two_part_name_keeps_only_label() {
        let name = scope().network_name("other:net").unwrap();
        assert_eq!(name.to_string(), "default-domain:admin:net");
    }

    #[test]
    fn empty_components_are_rejected() {
        assert_eq!(
            scope().network_name(""),
            Err(IllegalFqName::EmptyComponent(
                "default-domain:admin:".to_string()
            ))
        );
        assert!(FqName::new(Vec::<String>::new()).is_err());
        assert!("a::c".parse::<FqName>().is_err());
    }

    #[test]
    fn parent_and_child() {
        let name: FqName = "d:p:x".parse().unwrap();
        assert_eq!(name.parent().unwrap().to_string(), "d:p");
        assert_eq!(name.label(), "x");
        assert_eq!(name.parent().unwrap().child("y").unwrap().to_string(), "d:p:y");
        assert_eq!("d".parse::<FqName>().unwrap().parent(), None);
    }

    #[test]
    fn wire_form_is_a_list() {
        let name: FqName = "d:p:x".parse().unwrap();
        let json = serde_json::to_string(&name).unwrap();
        assert_eq!(json, r#"["d","p","x"]"#);
        assert!(serde_json::from_str::<FqName>("[]").is_err());
    }

    #[test]
    fn normalization_properties() {
        bolero::check!()
            .with_type()
            .for_each(|label: &String| {
                let scope = scope();
                let Ok(name) = scope.network_name(label) else {
                    return;
                };
                let components: Vec<&str> = label.split(':').collect();
                if components.len() == 3 {
                    assert_eq!(&name.to_string(), label);
                } else {
                    assert_eq!(name.components().len(), 3);
                    assert_eq!(name.parent(), Some(scope.project_fq_name()));
                    assert_eq!(Some(&name.label()), components.last());
                }
                // normalizing twice is a no-op
                assert_eq!(scope.network_name(&name.to_string()).unwrap(), name);
            });
    }
}
