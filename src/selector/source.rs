use std::sync::Arc;

use crate::client::AcademicApi;
use crate::error::{AdminError, AdminResult};
use crate::model::{Id, NewChapter, NewClass, NewSubject, NewTopic};
use crate::selector::level::{HierarchyNode, Level, NewNode};

/// Fetch/create/delete for each level of a hierarchy, keyed by parent id.
#[async_trait::async_trait]
pub trait HierarchySource: Send + Sync {
    async fn fetch(&self, level: Level, parent: Option<&Id>) -> AdminResult<Vec<HierarchyNode>>;
    async fn create(
        &self,
        level: Level,
        parent: Option<&Id>,
        node: NewNode,
    ) -> AdminResult<HierarchyNode>;
    async fn delete(&self, level: Level, id: &Id) -> AdminResult<()>;
}

/// Binds the selector levels to the academic endpoints. The subject level
/// lists class-subject mappings, so its ids are class-subject ids.
#[derive(Debug)]
pub struct AcademicHierarchy<A: ?Sized> {
    api: Arc<A>,
}

impl<A: ?Sized> Clone for AcademicHierarchy<A> {
    fn clone(&self) -> Self {
        Self {
            api: Arc::clone(&self.api),
        }
    }
}

impl<A: AcademicApi + ?Sized> AcademicHierarchy<A> {
    pub fn new(api: Arc<A>) -> Self {
        Self { api }
    }
}

fn require_parent(level: Level, parent: Option<&Id>) -> AdminResult<&Id> {
    parent.ok_or_else(|| {
        let parent_level = level.parent().unwrap_or(Level::Class);
        AdminError::validation(
            format!("{:?}", parent_level).to_lowercase(),
            format!("select a {:?} first", parent_level).to_lowercase(),
        )
    })
}

#[async_trait::async_trait]
impl<A: AcademicApi + ?Sized> HierarchySource for AcademicHierarchy<A> {
    async fn fetch(&self, level: Level, parent: Option<&Id>) -> AdminResult<Vec<HierarchyNode>> {
        let nodes = match level {
            Level::Class => self
                .api
                .list_classes()
                .await?
                .into_iter()
                .map(|c| HierarchyNode::new(c.id, c.name).with_sort_key(c.order))
                .collect(),
            Level::Subject => self
                .api
                .list_class_subjects(require_parent(level, parent)?)
                .await?
                .into_iter()
                .map(|m| HierarchyNode::new(m.class_subject_id, m.subject_name).with_code(m.subject_code))
                .collect(),
            Level::Chapter => self
                .api
                .list_chapters(require_parent(level, parent)?)
                .await?
                .into_iter()
                .map(|c| HierarchyNode::new(c.id, c.name).with_sort_key(c.chapter_number))
                .collect(),
            Level::Topic => self
                .api
                .list_topics(require_parent(level, parent)?)
                .await?
                .into_iter()
                .map(|t| HierarchyNode::new(t.id, t.name))
                .collect(),
        };
        Ok(nodes)
    }

    async fn create(
        &self,
        level: Level,
        parent: Option<&Id>,
        node: NewNode,
    ) -> AdminResult<HierarchyNode> {
        let created = match level {
            Level::Class => {
                let class = self
                    .api
                    .create_class(NewClass {
                        name: node.name,
                        order: node.sort_key,
                    })
                    .await?;
                HierarchyNode::new(class.id, class.name).with_sort_key(class.order)
            }
            Level::Subject => {
                let code = node
                    .code
                    .filter(|c| !c.trim().is_empty())
                    .ok_or_else(|| AdminError::validation("code", "subject code is required"))?;
                let mapping = self
                    .api
                    .create_class_subject(
                        require_parent(level, parent)?,
                        NewSubject {
                            name: node.name,
                            code,
                            description: node.description,
                        },
                    )
                    .await?;
                HierarchyNode::new(mapping.class_subject_id, mapping.subject_name)
                    .with_code(mapping.subject_code)
            }
            Level::Chapter => {
                let chapter = self
                    .api
                    .create_chapter(
                        require_parent(level, parent)?,
                        NewChapter {
                            name: node.name,
                            chapter_number: node.sort_key,
                        },
                    )
                    .await?;
                HierarchyNode::new(chapter.id, chapter.name).with_sort_key(chapter.chapter_number)
            }
            Level::Topic => {
                let topic = self
                    .api
                    .create_topic(require_parent(level, parent)?, NewTopic { name: node.name })
                    .await?;
                HierarchyNode::new(topic.id, topic.name)
            }
        };
        Ok(created)
    }

    async fn delete(&self, level: Level, id: &Id) -> AdminResult<()> {
        match level {
            Level::Class => self.api.delete_class(id).await,
            Level::Subject => self.api.delete_class_subject(id).await,
            Level::Chapter => self.api.delete_chapter(id).await,
            Level::Topic => self.api.delete_topic(id).await,
        }
    }
}
