//! Where component folders live inside a repository.

use std::path::{Component, Path, PathBuf};

use crate::model::ComponentType;

/// Repository-relative base paths for component sources.
///
/// The folder check in [`crate::scan`] and the default component-path builder
/// in [`crate::naming`] both go through [`ComponentLayout::component_folder`],
/// so they always agree on where a component lives.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ComponentLayout {
    pub base_path: PathBuf,
    pub terraform_base_path: PathBuf,
    pub helmfile_base_path: PathBuf,
}

impl ComponentLayout {
    #[must_use]
    pub fn new(
        base_path: impl Into<PathBuf>,
        terraform_base_path: impl Into<PathBuf>,
        helmfile_base_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            base_path: base_path.into(),
            terraform_base_path: terraform_base_path.into(),
            helmfile_base_path: helmfile_base_path.into(),
        }
    }

    /// Base path for one component type.
    #[must_use]
    pub fn type_base(&self, ty: ComponentType) -> &Path {
        match ty {
            ComponentType::Terraform => &self.terraform_base_path,
            ComponentType::Helmfile => &self.helmfile_base_path,
        }
    }

    /// `base_path / type base / component`, lexically cleaned.
    #[must_use]
    pub fn component_folder(&self, ty: ComponentType, component: &str) -> PathBuf {
        clean(&self.base_path.join(self.type_base(ty)).join(component))
    }
}

/// Drop `.` segments and fold `..` into its parent where one exists.
///
/// Purely lexical: symlinks are not resolved and the file system is not read.
#[must_use]
pub fn clean(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for part in path.components() {
        match part {
            Component::CurDir => {}
            Component::ParentDir => {
                let can_pop = matches!(out.components().next_back(), Some(Component::Normal(_)));
                if can_pop {
                    out.pop();
                } else {
                    out.push("..");
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
