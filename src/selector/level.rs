use itertools::Itertools;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;

use crate::model::Id;

/// Depth in the academic hierarchy.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Class,
    Subject,
    Chapter,
    Topic,
}

impl Level {
    pub const ALL: [Level; 4] = [Level::Class, Level::Subject, Level::Chapter, Level::Topic];

    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<Level> {
        Self::ALL.get(index).copied()
    }

    pub fn parent(self) -> Option<Level> {
        self.index().checked_sub(1).and_then(Self::from_index)
    }

    pub fn child(self) -> Option<Level> {
        Self::from_index(self.index() + 1)
    }

    /// Levels strictly below this one, nearest first.
    pub fn descendants(self) -> impl Iterator<Item = Level> {
        Self::ALL.into_iter().skip(self.index() + 1)
    }
}

/// Display-level view of any hierarchy entity.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HierarchyNode {
    pub id: Id,
    pub name: String,
    /// `order` for classes, `chapterNumber` for chapters.
    pub sort_key: Option<i32>,
    pub code: Option<String>,
}

impl HierarchyNode {
    pub fn new(id: impl Into<Id>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            name: name.into(),
            sort_key: None,
            code: None,
        }
    }

    pub fn with_sort_key(mut self, sort_key: Option<i32>) -> Self {
        self.sort_key = sort_key;
        self
    }

    pub fn with_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }
}

/// Fields for a node created through the selector. Which of the optional
/// fields are used depends on the level.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct NewNode {
    pub name: String,
    pub code: Option<String>,
    pub description: Option<String>,
    pub sort_key: Option<i32>,
}

impl NewNode {
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..Self::default()
        }
    }

    pub fn code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub fn sort_key(mut self, sort_key: i32) -> Self {
        self.sort_key = Some(sort_key);
        self
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SortRule {
    /// Explicit sort key first (missing keys last), name as tiebreaker.
    ByKeyThenName,
    ByName,
    /// Keep the server's order.
    AsReceived,
}

impl SortRule {
    pub fn apply(self, nodes: Vec<HierarchyNode>) -> Vec<HierarchyNode> {
        match self {
            SortRule::AsReceived => nodes,
            SortRule::ByName => nodes.into_iter().sorted_by(by_name).collect(),
            SortRule::ByKeyThenName => nodes
                .into_iter()
                .sorted_by(|a, b| match (a.sort_key, b.sort_key) {
                    (Some(x), Some(y)) => x.cmp(&y).then_with(|| by_name(a, b)),
                    (Some(_), None) => Ordering::Less,
                    (None, Some(_)) => Ordering::Greater,
                    (None, None) => by_name(a, b),
                })
                .collect(),
        }
    }
}

fn by_name(a: &HierarchyNode, b: &HierarchyNode) -> Ordering {
    a.name.to_lowercase().cmp(&b.name.to_lowercase())
}

/// How one level of a selector is presented.
#[derive(Debug, Clone, PartialEq)]
pub struct LevelDef {
    pub level: Level,
    /// Human-readable name, used in validation messages.
    pub label: String,
    pub sort: SortRule,
}

impl LevelDef {
    pub fn new(level: Level, label: impl Into<String>, sort: SortRule) -> Self {
        Self {
            level,
            label: label.into(),
            sort,
        }
    }

    /// Definitions used by the academic screens and authoring forms.
    pub fn academic(level: Level) -> Self {
        match level {
            Level::Class => Self::new(level, "class", SortRule::ByKeyThenName),
            Level::Subject => Self::new(level, "subject", SortRule::ByName),
            Level::Chapter => Self::new(level, "chapter", SortRule::ByKeyThenName),
            Level::Topic => Self::new(level, "topic", SortRule::ByName),
        }
    }
}
