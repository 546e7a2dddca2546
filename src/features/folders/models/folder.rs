use chrono::{DateTime, Utc};
use sqlx::FromRow;
use uuid::Uuid;

/// Folder inside a category; `path` is relative to the category root
#[derive(Debug, Clone, FromRow)]
pub struct Folder {
    pub id: Uuid,
    pub category_id: Uuid,
    pub name: String,
    pub path: String,
    pub parent_id: Option<Uuid>,
    pub is_active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Folder {
    /// Path of the parent folder ("" for root-level folders)
    pub fn parent_path(&self) -> &str {
        self.path.rsplit_once('/').map(|(parent, _)| parent).unwrap_or("")
    }

    /// Whether `path` is this folder or lies below it
    pub fn contains_path(&self, path: &str) -> bool {
        path == self.path
            || path
                .strip_prefix(self.path.as_str())
                .is_some_and(|rest| rest.starts_with('/'))
    }
}

#[derive(Debug, Clone)]
pub struct NewFolder {
    pub category_id: Uuid,
    pub name: String,
    pub path: String,
    pub parent_id: Option<Uuid>,
}

/// Rewrite of a folder subtree after a rename or move.
///
/// Descendant folder paths and descendant file paths/URLs are rewritten by
/// prefix, so the old and new prefixes are carried explicitly.
#[derive(Debug, Clone)]
pub struct SubtreeMove {
    pub folder_id: Uuid,
    pub category_id: Uuid,
    pub new_name: String,
    pub new_parent_id: Option<Uuid>,
    pub old_path: String,
    pub new_path: String,
    /// `<category>/<old path>`
    pub old_stored_prefix: String,
    /// `<category>/<new path>`
    pub new_stored_prefix: String,
    /// Base URL used to recompute file URLs
    pub base_url: String,
}
