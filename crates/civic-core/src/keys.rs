//! Key layout in the backing store.
//!
//! | Key | Value |
//! |-----|-------|
//! | `issue:{id}` | [`Issue`](crate::Issue) record |
//! | `issues:all` | every issue id, in creation order |
//! | `issues:status:{status}` | ids currently in that status |
//! | `issues:category:{category}` | ids reported under that category |
//! | `user:{user_id}:issues` | ids reported by that user |
//! | `response:{id}` | [`IssueResponse`](crate::IssueResponse) record |
//! | `issue:{id}:responses` | response ids for an issue |
//! | `issue:{id}:resolution` | [`Resolution`](crate::Resolution) record |

use std::fmt;

use uuid::Uuid;

use crate::issue::{IssueCategory, IssueStatus};

/// One of the four index families. Each value names exactly one store key.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum IndexKey {
  All,
  Status(IssueStatus),
  Category(IssueCategory),
  User(String),
}

impl IndexKey {
  /// Every index an issue with these attributes belongs to.
  pub fn for_issue(
    user_id: &str,
    status: IssueStatus,
    category: IssueCategory,
  ) -> [IndexKey; 4] {
    [
      IndexKey::All,
      IndexKey::Status(status),
      IndexKey::Category(category),
      IndexKey::User(user_id.to_owned()),
    ]
  }
}

impl fmt::Display for IndexKey {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    match self {
      IndexKey::All => f.write_str("issues:all"),
      IndexKey::Status(s) => write!(f, "issues:status:{s}"),
      IndexKey::Category(c) => write!(f, "issues:category:{c}"),
      IndexKey::User(id) => write!(f, "user:{id}:issues"),
    }
  }
}

pub fn issue(id: Uuid) -> String { format!("issue:{id}") }

pub fn response(id: Uuid) -> String { format!("response:{id}") }

pub fn issue_responses(issue_id: Uuid) -> String {
  format!("issue:{issue_id}:responses")
}

pub fn issue_resolution(issue_id: Uuid) -> String {
  format!("issue:{issue_id}:resolution")
}
