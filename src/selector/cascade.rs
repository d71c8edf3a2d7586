use parking_lot::Mutex;
use serde::Serialize;
use std::sync::Arc;

use crate::confirm::{Confirm, DeleteOutcome, Gated};
use crate::error::{AdminError, AdminResult};
use crate::model::Id;
use crate::selector::level::{HierarchyNode, Level, LevelDef, NewNode};
use crate::selector::source::HierarchySource;

/// Per-level lifecycle: `Idle → Loading → Populated | Empty | Error`, and
/// back to `Idle` whenever the parent selection is cleared.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LevelState {
    Idle,
    Loading,
    Populated,
    Empty,
    Error,
}

#[derive(Debug, Clone, Default)]
struct LevelSlot {
    options: Vec<HierarchyNode>,
    selected: Option<Id>,
    loading: bool,
    loaded: bool,
    error: Option<AdminError>,
    /// Bumped for every fetch issued and every reset; a response is applied
    /// only if the generation it was issued under is still current.
    generation: u64,
}

impl LevelSlot {
    fn state(&self) -> LevelState {
        if self.loading {
            LevelState::Loading
        } else if self.error.is_some() {
            LevelState::Error
        } else if !self.options.is_empty() {
            LevelState::Populated
        } else if self.loaded {
            LevelState::Empty
        } else {
            LevelState::Idle
        }
    }

    fn reset(&mut self) {
        self.options.clear();
        self.selected = None;
        self.loading = false;
        self.loaded = false;
        self.error = None;
        self.generation += 1;
    }

    fn begin_load(&mut self) -> u64 {
        self.generation += 1;
        self.loading = true;
        self.error = None;
        self.generation
    }
}

/// Read-only copy of one level, for rendering.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LevelSnapshot {
    pub level: Level,
    pub label: String,
    pub options: Vec<HierarchyNode>,
    pub selected: Option<Id>,
    pub loading: bool,
    pub state: LevelState,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SelectorSnapshot {
    pub levels: Vec<LevelSnapshot>,
}

impl SelectorSnapshot {
    pub fn level(&self, level: Level) -> &LevelSnapshot {
        &self.levels[level.index()]
    }
}

/// Whether a finished fetch was applied to the level.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LoadOutcome {
    Applied { count: usize },
    /// A newer request for the same level was issued first; the response
    /// was dropped.
    Superseded,
}

/// Chosen ids down the hierarchy.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Selection {
    pub class: Option<Id>,
    pub subject: Option<Id>,
    pub chapter: Option<Id>,
    pub topic: Option<Id>,
}

pub struct CascadingSelectorBuilder {
    source: Arc<dyn HierarchySource>,
    defs: Vec<LevelDef>,
}

impl CascadingSelectorBuilder {
    /// Override how one level is labelled and sorted.
    pub fn level(mut self, def: LevelDef) -> Self {
        let index = def.level.index();
        self.defs[index] = def;
        self
    }

    pub fn build(self) -> CascadingSelector {
        CascadingSelector {
            source: self.source,
            slots: Mutex::new(vec![LevelSlot::default(); Level::ALL.len()]),
            defs: self.defs,
        }
    }
}

/// Class → Subject → Chapter → Topic dependent selector and editor.
///
/// Selecting a node loads its children; changing or clearing a selection
/// empties every level below it. State sits behind a mutex that is never
/// held across an await, so selections may overlap on the runtime and the
/// last one wins.
pub struct CascadingSelector {
    source: Arc<dyn HierarchySource>,
    defs: Vec<LevelDef>,
    slots: Mutex<Vec<LevelSlot>>,
}

impl std::fmt::Debug for CascadingSelector {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CascadingSelector")
            .field("defs", &self.defs)
            .field("slots", &*self.slots.lock())
            .finish()
    }
}

impl CascadingSelector {
    pub fn builder(source: Arc<dyn HierarchySource>) -> CascadingSelectorBuilder {
        CascadingSelectorBuilder {
            source,
            defs: Level::ALL.into_iter().map(LevelDef::academic).collect(),
        }
    }

    pub fn new(source: Arc<dyn HierarchySource>) -> Self {
        Self::builder(source).build()
    }

    pub fn def(&self, level: Level) -> &LevelDef {
        &self.defs[level.index()]
    }

    pub fn snapshot(&self) -> SelectorSnapshot {
        let slots = self.slots.lock();
        let levels = Level::ALL
            .into_iter()
            .zip(slots.iter())
            .map(|(level, slot)| LevelSnapshot {
                level,
                label: self.def(level).label.clone(),
                options: slot.options.clone(),
                selected: slot.selected.clone(),
                loading: slot.loading,
                state: slot.state(),
                error: slot.error.as_ref().map(|e| e.to_string()),
            })
            .collect();
        SelectorSnapshot { levels }
    }

    pub fn options(&self, level: Level) -> Vec<HierarchyNode> {
        self.slots.lock()[level.index()].options.clone()
    }

    pub fn selected(&self, level: Level) -> Option<Id> {
        self.slots.lock()[level.index()].selected.clone()
    }

    pub fn selected_node(&self, level: Level) -> Option<HierarchyNode> {
        let slots = self.slots.lock();
        let slot = &slots[level.index()];
        let id = slot.selected.as_ref()?;
        slot.options.iter().find(|n| &n.id == id).cloned()
    }

    pub fn is_loading(&self, level: Level) -> bool {
        self.slots.lock()[level.index()].loading
    }

    pub fn level_state(&self, level: Level) -> LevelState {
        self.slots.lock()[level.index()].state()
    }

    pub fn selection(&self) -> Selection {
        let slots = self.slots.lock();
        Selection {
            class: slots[Level::Class.index()].selected.clone(),
            subject: slots[Level::Subject.index()].selected.clone(),
            chapter: slots[Level::Chapter.index()].selected.clone(),
            topic: slots[Level::Topic.index()].selected.clone(),
        }
    }

    /// Load the top level.
    pub async fn load_root(&self) -> AdminResult<LoadOutcome> {
        self.load_children(Level::Class, None).await
    }

    /// Fetch the options of `level` for `parent_id`.
    ///
    /// `parent_id` must be the current selection one level up (and `None`
    /// for the top level), otherwise the children would be bound to a
    /// parent that is not selected.
    pub async fn load_children(
        &self,
        level: Level,
        parent_id: Option<&Id>,
    ) -> AdminResult<LoadOutcome> {
        let generation = {
            let mut slots = self.slots.lock();
            let expected = level
                .parent()
                .and_then(|parent| slots[parent.index()].selected.as_ref());
            if expected != parent_id {
                return Err(AdminError::validation(
                    self.def(level).label.clone(),
                    format!(
                        "cannot load {} options for a {} that is not selected",
                        self.def(level).label,
                        level
                            .parent()
                            .map(|p| self.def(p).label.as_str())
                            .unwrap_or("parent")
                    ),
                ));
            }
            slots[level.index()].begin_load()
        };

        self.finish_load(level, parent_id, generation).await
    }

    async fn finish_load(
        &self,
        level: Level,
        parent_id: Option<&Id>,
        generation: u64,
    ) -> AdminResult<LoadOutcome> {
        let result = self.source.fetch(level, parent_id).await;

        let mut slots = self.slots.lock();
        let slot = &mut slots[level.index()];
        if slot.generation != generation {
            log::warn!(
                "Discarding stale {} response for parent {:?}",
                self.def(level).label,
                parent_id
            );
            return Ok(LoadOutcome::Superseded);
        }

        slot.loading = false;
        slot.loaded = true;
        match result {
            Ok(nodes) => {
                slot.options = self.def(level).sort.apply(nodes);
                let count = slot.options.len();
                let selection_gone = slot
                    .selected
                    .as_ref()
                    .is_some_and(|id| !slot.options.iter().any(|n| &n.id == id));
                if selection_gone {
                    Self::clear_from(&mut slots, level);
                }
                log::debug!("Loaded {} {} options", count, self.def(level).label);
                Ok(LoadOutcome::Applied { count })
            }
            Err(err) => {
                log::warn!("Loading {} options failed: {}", self.def(level).label, err);
                slot.options.clear();
                slot.error = Some(err.clone());
                if slot.selected.is_some() {
                    Self::clear_from(&mut slots, level);
                }
                Err(err)
            }
        }
    }

    /// Select `id` at `level`, clear everything below, and load the next
    /// level's options for it.
    pub async fn select_at(&self, level: Level, id: &Id) -> AdminResult<LoadOutcome> {
        let child = {
            let mut slots = self.slots.lock();
            let slot = &mut slots[level.index()];
            if !slot.options.iter().any(|n| &n.id == id) {
                return Err(AdminError::validation(
                    self.def(level).label.clone(),
                    format!("{} is not an available {}", id, self.def(level).label),
                ));
            }
            slot.selected = Some(id.clone());
            Self::clear_below(&mut slots, level);

            level
                .child()
                .map(|child| (child, slots[child.index()].begin_load()))
        };

        match child {
            Some((child, generation)) => self.finish_load(child, Some(id), generation).await,
            None => Ok(LoadOutcome::Applied { count: 0 }),
        }
    }

    /// Clear the selection at `level` and everything below it.
    pub fn clear_at(&self, level: Level) {
        let mut slots = self.slots.lock();
        Self::clear_from(&mut slots, level);
    }

    /// Create a child under the current selection one level up, then
    /// reload the level so the server decides where it lands.
    pub async fn add_child(&self, level: Level, node: NewNode) -> AdminResult<HierarchyNode> {
        if node.name.trim().is_empty() {
            return Err(AdminError::validation(
                "name",
                format!("{} name is required", self.def(level).label),
            ));
        }

        let parent = match level.parent() {
            Some(parent) => Some(self.selected(parent).ok_or_else(|| {
                AdminError::validation(
                    self.def(parent).label.clone(),
                    format!("select a {} first", self.def(parent).label),
                )
            })?),
            None => None,
        };

        let created = self.source.create(level, parent.as_ref(), node).await?;
        log::info!("Created {} {}", self.def(level).label, created.id);

        // The parent may have changed while the create was in flight.
        let still_current = match level.parent() {
            Some(p) => self.selected(p) == parent,
            None => true,
        };
        if still_current {
            self.load_children(level, parent.as_ref()).await?;
        }
        Ok(created)
    }

    /// Delete `id` after confirmation. A refusal from the server leaves the
    /// selector untouched.
    pub async fn delete_node(
        &self,
        level: Level,
        id: &Id,
        confirm: &dyn Confirm,
    ) -> AdminResult<DeleteOutcome> {
        let name = {
            let slots = self.slots.lock();
            slots[level.index()]
                .options
                .iter()
                .find(|n| &n.id == id)
                .map(|n| n.name.clone())
                .ok_or_else(|| {
                    AdminError::validation(
                        self.def(level).label.clone(),
                        format!("{} is not an available {}", id, self.def(level).label),
                    )
                })?
        };

        let prompt = format!("Delete {} \"{}\"?", self.def(level).label, name);
        if !confirm.confirm(&prompt) {
            return Ok(Gated::Cancelled);
        }

        self.source.delete(level, id).await?;
        log::info!("Deleted {} {}", self.def(level).label, id);

        let mut slots = self.slots.lock();
        slots[level.index()].options.retain(|n| &n.id != id);
        if slots[level.index()].selected.as_ref() == Some(id) {
            Self::clear_from(&mut slots, level);
        }
        Ok(Gated::Done(()))
    }

    fn clear_from(slots: &mut [LevelSlot], level: Level) {
        slots[level.index()].selected = None;
        Self::clear_below(slots, level);
    }

    fn clear_below(slots: &mut [LevelSlot], level: Level) {
        for descendant in level.descendants() {
            slots[descendant.index()].reset();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::client::MemoryApi;
    use crate::confirm::AssumeYes;
    use crate::forms::Tagging;
    use crate::model::{AcademicClass, Chapter, ClassSubject, Topic};
    use crate::selector::AcademicHierarchy;
    use std::time::Duration;

    fn class(id: &str, name: &str, order: i32) -> AcademicClass {
        AcademicClass {
            id: id.to_string(),
            name: name.to_string(),
            order: Some(order),
        }
    }

    fn mapping(id: &str, name: &str) -> ClassSubject {
        ClassSubject {
            class_subject_id: id.to_string(),
            subject_id: format!("lib-{}", id),
            subject_name: name.to_string(),
            subject_code: Some(format!("{}-101", name.to_uppercase())),
            subject_description: None,
            session_id: None,
            session_name: None,
            is_active: true,
        }
    }

    async fn seeded() -> (Arc<MemoryApi>, CascadingSelector) {
        let api = Arc::new(MemoryApi::new());
        api.seed_class(class("2", "Class 9", 9)).await;
        api.seed_class(class("1", "Class 10", 10)).await;
        api.seed_class_subject("1", mapping("5", "Physics")).await;
        api.seed_class_subject("1", mapping("6", "Chemistry")).await;
        api.seed_class_subject("2", mapping("7", "Biology")).await;
        api.seed_chapter(
            "5",
            Chapter {
                id: "9".to_string(),
                name: "Motion".to_string(),
                chapter_number: Some(1),
            },
        )
        .await;
        api.seed_topic(
            "9",
            Topic {
                id: "t-1".to_string(),
                name: "Velocity".to_string(),
            },
        )
        .await;

        let selector = CascadingSelector::new(Arc::new(AcademicHierarchy::new(api.clone())));
        (api, selector)
    }

    #[tokio::test]
    async fn test_root_is_sorted_by_order() {
        let (_, selector) = seeded().await;
        selector.load_root().await.unwrap();

        let names: Vec<_> = selector
            .options(Level::Class)
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["Class 9", "Class 10"]);
        assert_eq!(selector.level_state(Level::Class), LevelState::Populated);
        assert_eq!(selector.level_state(Level::Subject), LevelState::Idle);
    }

    #[tokio::test]
    async fn test_select_issues_exactly_one_fetch() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        api.clear_calls();

        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();

        let calls = api.calls();
        assert_eq!(calls.len(), 1);
        assert!(calls[0].is("GET", "/academic/classes/1/subjects"));
        assert_eq!(selector.options(Level::Subject).len(), 2);
    }

    #[tokio::test]
    async fn test_unknown_id_is_rejected() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        api.clear_calls();

        let err = selector
            .select_at(Level::Class, &"42".to_string())
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(api.call_count(), 0);
        assert_eq!(selector.selected(Level::Class), None);
    }

    #[tokio::test]
    async fn test_reselecting_parent_clears_descendants() {
        let (_, selector) = seeded().await;
        selector.load_root().await.unwrap();
        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();
        selector.select_at(Level::Subject, &"5".to_string()).await.unwrap();
        selector.select_at(Level::Chapter, &"9".to_string()).await.unwrap();
        assert_eq!(selector.options(Level::Topic).len(), 1);

        selector.select_at(Level::Class, &"2".to_string()).await.unwrap();

        let snapshot = selector.snapshot();
        assert_eq!(snapshot.level(Level::Subject).options.len(), 1);
        assert_eq!(snapshot.level(Level::Subject).selected, None);
        for level in [Level::Chapter, Level::Topic] {
            assert!(snapshot.level(level).options.is_empty());
            assert_eq!(snapshot.level(level).selected, None);
            assert_eq!(snapshot.level(level).state, LevelState::Idle);
        }
    }

    #[tokio::test]
    async fn test_clear_at_cascades() {
        let (_, selector) = seeded().await;
        selector.load_root().await.unwrap();
        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();
        selector.select_at(Level::Subject, &"5".to_string()).await.unwrap();

        selector.clear_at(Level::Class);

        let selection = selector.selection();
        assert_eq!(selection, Selection::default());
        assert!(selector.options(Level::Subject).is_empty());
        assert!(selector.options(Level::Chapter).is_empty());
        // The top level keeps its options
        assert_eq!(selector.options(Level::Class).len(), 2);
    }

    #[tokio::test]
    async fn test_fetch_failure_leaves_level_empty_and_not_loading() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        api.fail_path("/academic/classes/1/subjects");

        let err = selector
            .select_at(Level::Class, &"1".to_string())
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Network(_)));
        assert!(selector.options(Level::Subject).is_empty());
        assert!(!selector.is_loading(Level::Subject));
        assert_eq!(selector.level_state(Level::Subject), LevelState::Error);

        // Retry is reselecting the parent
        api.heal("/academic/classes/1/subjects");
        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();
        assert_eq!(selector.level_state(Level::Subject), LevelState::Populated);
    }

    #[tokio::test]
    async fn test_stale_response_is_discarded() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        api.set_latency("1", Duration::from_millis(150));

        let class_ten = "1".to_string();
        let class_nine = "2".to_string();
        let (slow, fast) = tokio::join!(selector.select_at(Level::Class, &class_ten), async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            selector.select_at(Level::Class, &class_nine).await
        });

        assert_eq!(slow.unwrap(), LoadOutcome::Superseded);
        assert_eq!(fast.unwrap(), LoadOutcome::Applied { count: 1 });
        assert_eq!(selector.selected(Level::Class), Some(class_nine));
        let subjects = selector.options(Level::Subject);
        assert_eq!(subjects.len(), 1);
        assert_eq!(subjects[0].name, "Biology");
    }

    #[tokio::test]
    async fn test_failed_refresh_drops_selection_and_descendants() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();
        selector.select_at(Level::Subject, &"5".to_string()).await.unwrap();
        selector.select_at(Level::Chapter, &"9".to_string()).await.unwrap();
        assert_eq!(selector.options(Level::Topic).len(), 1);

        api.fail_path("/academic/class-subjects/5/chapters");
        let subject = "5".to_string();
        let err = selector
            .load_children(Level::Chapter, Some(&subject))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Network(_)));

        assert_eq!(selector.selected(Level::Chapter), None);
        assert!(selector.options(Level::Chapter).is_empty());
        assert_eq!(selector.level_state(Level::Chapter), LevelState::Error);
        assert_eq!(selector.selected(Level::Topic), None);
        assert!(selector.options(Level::Topic).is_empty());
        assert_eq!(selector.selected(Level::Subject), Some(subject));
        assert!(Tagging::from_selector(&selector).is_err());
    }

    #[tokio::test]
    async fn test_add_child_requires_parent_selection() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        api.clear_calls();

        let err = selector
            .add_child(Level::Chapter, NewNode::named("Waves"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("subject"));
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_empty_name_never_reaches_network() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        api.clear_calls();

        for name in ["", "   "] {
            let err = selector
                .add_child(Level::Class, NewNode::named(name))
                .await
                .unwrap_err();
            assert_eq!(err.field(), Some("name"));
        }
        assert_eq!(api.call_count(), 0);
    }

    #[tokio::test]
    async fn test_add_chapter_reloads_in_server_order() {
        let (_, selector) = seeded().await;
        selector.load_root().await.unwrap();
        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();
        selector.select_at(Level::Subject, &"5".to_string()).await.unwrap();

        selector
            .add_child(Level::Chapter, NewNode::named("Units").sort_key(0))
            .await
            .unwrap();

        let names: Vec<_> = selector
            .options(Level::Chapter)
            .into_iter()
            .map(|n| n.name)
            .collect();
        assert_eq!(names, vec!["Units", "Motion"]);
    }

    #[tokio::test]
    async fn test_duplicate_class_is_conflict() {
        let (_, selector) = seeded().await;
        selector.load_root().await.unwrap();

        let err = selector
            .add_child(Level::Class, NewNode::named("Class 10"))
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::Conflict(_)));
        assert_eq!(selector.options(Level::Class).len(), 2);
    }

    #[tokio::test]
    async fn test_subject_requires_code() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();
        api.clear_calls();

        let err = selector
            .add_child(Level::Subject, NewNode::named("Mathematics"))
            .await
            .unwrap_err();
        assert_eq!(err.field(), Some("code"));
        assert_eq!(api.call_count(), 0);

        selector
            .add_child(Level::Subject, NewNode::named("Mathematics").code("MATH-101"))
            .await
            .unwrap();
        assert_eq!(selector.options(Level::Subject).len(), 3);
    }

    #[tokio::test]
    async fn test_delete_selected_node_cascades() {
        let (_, selector) = seeded().await;
        selector.load_root().await.unwrap();
        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();
        selector.select_at(Level::Subject, &"6".to_string()).await.unwrap();

        let outcome = selector
            .delete_node(Level::Subject, &"6".to_string(), &AssumeYes)
            .await
            .unwrap();
        assert_eq!(outcome, Gated::Done(()));

        assert_eq!(selector.selected(Level::Subject), None);
        assert_eq!(selector.selected(Level::Class), Some("1".to_string()));
        assert_eq!(selector.options(Level::Subject).len(), 1);
        assert!(selector.options(Level::Chapter).is_empty());
    }

    #[tokio::test]
    async fn test_delete_with_children_leaves_state_unchanged() {
        let (_, selector) = seeded().await;
        selector.load_root().await.unwrap();
        selector.select_at(Level::Class, &"1".to_string()).await.unwrap();
        let before = selector.snapshot();

        let err = selector
            .delete_node(Level::Class, &"1".to_string(), &AssumeYes)
            .await
            .unwrap_err();
        assert!(matches!(err, AdminError::DependencyConflict(_)));
        assert_eq!(selector.snapshot(), before);
    }

    #[tokio::test]
    async fn test_declined_delete_sends_nothing() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        api.clear_calls();

        let decline = |_: &str| false;
        let outcome = selector
            .delete_node(Level::Class, &"2".to_string(), &decline)
            .await
            .unwrap();
        assert!(outcome.is_cancelled());
        assert_eq!(api.call_count(), 0);
        assert_eq!(selector.options(Level::Class).len(), 2);
    }

    #[tokio::test]
    async fn test_load_children_rejects_unselected_parent() {
        let (api, selector) = seeded().await;
        selector.load_root().await.unwrap();
        api.clear_calls();

        let err = selector
            .load_children(Level::Subject, Some(&"1".to_string()))
            .await
            .unwrap_err();
        assert!(err.is_validation());
        assert_eq!(api.call_count(), 0);
    }
}
