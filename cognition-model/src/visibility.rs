use crate::FieldSource;
use cognition_types::Visibility;
use serde::{Deserialize, Serialize};

/// How the single access label applied to every cell of a row is chosen.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisibilityPolicy {
    /// No label; rows are open.
    #[default]
    Public,
    /// The same label on every row.
    Static(Visibility),
    /// The label is the value of the named record field. Records missing the
    /// field, or holding a blank value, are written open.
    ByField(String),
}

impl VisibilityPolicy {
    /// Picks a policy from optional settings: a non-blank static label wins,
    /// then a non-blank field name, then the open policy.
    #[must_use]
    pub fn from_settings(visibility: Option<&str>, visibility_by_field: Option<&str>) -> Self {
        fn non_blank(s: Option<&str>) -> Option<&str> {
            s.map(str::trim).filter(|s| !s.is_empty())
        }
        if let Some(label) = non_blank(visibility) {
            Self::Static(Visibility::new(label))
        } else if let Some(field) = non_blank(visibility_by_field) {
            Self::ByField(field.to_string())
        } else {
            Self::Public
        }
    }

    /// Label for `record` under this policy.
    #[must_use]
    pub fn resolve<R: FieldSource + ?Sized>(&self, record: &R) -> Visibility {
        match self {
            Self::Public => Visibility::public(),
            Self::Static(label) => label.clone(),
            Self::ByField(field) => record
                .field(field)
                .filter(|value| !value.trim().is_empty())
                .map(Visibility::new)
                .unwrap_or_default(),
        }
    }
}
