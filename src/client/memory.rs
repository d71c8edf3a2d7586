use parking_lot::Mutex;
use serde::Serialize;
use std::collections::{HashMap, HashSet};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;

use crate::client::traits::{
    AcademicApi, AuthApi, BackupApi, InstituteApi, QuestionApi, RoleApi, SettingsApi, UserApi,
};
use crate::error::{AdminError, AdminResult};
use crate::model::{
    generate_id, AcademicClass, AcademicSession, BackupRecord, BackupStatus, BackupType, Chapter,
    ClassSubject, Id, Institute, InstituteQuery, InstituteStatus, NewChapter, NewClass,
    NewInstitute, NewMcq, NewQuestion, NewRole, NewSession, NewSubject, NewTopic, NewUser, Page,
    Permission, Question, QuestionOption, QuestionStatus, QuestionType, RoleDefinition,
    SettingCategory, SettingsMap, SettingsScope, Subject, SubscriptionPlan, Topic, User,
    UserQuery, UserUpdate,
};

/// One call received by [`MemoryApi`], recorded with the route the HTTP
/// client would have used.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedCall {
    pub method: &'static str,
    pub path: String,
    pub body: Option<serde_json::Value>,
}

impl RecordedCall {
    pub fn is(&self, method: &str, path: &str) -> bool {
        self.method == method && self.path == path
    }
}

#[derive(Debug, Default)]
struct MemoryState {
    /// Login credentials: email -> (password, user id)
    users: HashMap<String, (String, Id)>,
    /// Accounts shown under user management
    accounts: Vec<User>,
    roles: Vec<RoleDefinition>,
    permissions: Vec<Permission>,
    classes: Vec<AcademicClass>,
    subjects: Vec<Subject>,
    /// (class id, mapping)
    class_subjects: Vec<(Id, ClassSubject)>,
    /// (class-subject id, chapter)
    chapters: Vec<(Id, Chapter)>,
    /// (chapter id, topic)
    topics: Vec<(Id, Topic)>,
    sessions: Vec<AcademicSession>,
    questions: Vec<(Question, Vec<QuestionOption>)>,
    settings: HashMap<(SettingsScope, SettingCategory), SettingsMap>,
    security: HashMap<SettingsScope, SettingsMap>,
    backups: Vec<BackupRecord>,
    institutes: Vec<Institute>,
}

/// In-memory stand-in for the backend.
///
/// Enforces the same uniqueness and dependency rules as the real service
/// and records every call, so callers can assert on the traffic they
/// produced. Per-parent latency and failing routes can be injected.
#[derive(Debug, Clone, Default)]
pub struct MemoryApi {
    state: Arc<RwLock<MemoryState>>,
    calls: Arc<Mutex<Vec<RecordedCall>>>,
    latency: Arc<Mutex<HashMap<Id, Duration>>>,
    failing: Arc<Mutex<HashSet<String>>>,
}

fn body_of<T: Serialize>(value: &T) -> Option<serde_json::Value> {
    serde_json::to_value(value).ok()
}

/// Slice `items` the way the backend pages a listing (zero-based pages).
fn paginate<T>(items: Vec<T>, page: Option<u32>, size: Option<u32>) -> Page<T> {
    let size = size.unwrap_or(10).max(1) as usize;
    let number = page.unwrap_or(0);
    let total = items.len();
    Page {
        content: items
            .into_iter()
            .skip(number as usize * size)
            .take(size)
            .collect(),
        total_elements: total as u64,
        total_pages: total.div_ceil(size) as u32,
        number,
    }
}

impl MemoryApi {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> Vec<RecordedCall> {
        self.calls.lock().clone()
    }

    pub fn call_count(&self) -> usize {
        self.calls.lock().len()
    }

    pub fn clear_calls(&self) {
        self.calls.lock().clear();
    }

    /// Delay every child listing keyed by `parent_id`.
    pub fn set_latency(&self, parent_id: impl Into<Id>, latency: Duration) {
        self.latency.lock().insert(parent_id.into(), latency);
    }

    /// Make `path` fail as a transport error until [`MemoryApi::heal`].
    pub fn fail_path(&self, path: impl Into<String>) {
        self.failing.lock().insert(path.into());
    }

    pub fn heal(&self, path: &str) {
        self.failing.lock().remove(path);
    }

    pub async fn add_user(&self, email: &str, password: &str, user_id: impl Into<Id>) {
        let mut state = self.state.write().await;
        state
            .users
            .insert(email.to_string(), (password.to_string(), user_id.into()));
    }

    pub async fn seed_class(&self, class: AcademicClass) {
        self.state.write().await.classes.push(class);
    }

    pub async fn seed_subject(&self, subject: Subject) {
        self.state.write().await.subjects.push(subject);
    }

    pub async fn seed_class_subject(&self, class_id: impl Into<Id>, mapping: ClassSubject) {
        self.state
            .write()
            .await
            .class_subjects
            .push((class_id.into(), mapping));
    }

    pub async fn seed_chapter(&self, class_subject_id: impl Into<Id>, chapter: Chapter) {
        self.state
            .write()
            .await
            .chapters
            .push((class_subject_id.into(), chapter));
    }

    pub async fn seed_topic(&self, chapter_id: impl Into<Id>, topic: Topic) {
        self.state
            .write()
            .await
            .topics
            .push((chapter_id.into(), topic));
    }

    pub async fn seed_session(&self, session: AcademicSession) {
        self.state.write().await.sessions.push(session);
    }

    pub async fn seed_institute(&self, institute: Institute) {
        self.state.write().await.institutes.push(institute);
    }

    /// Add a managed account. Pass a password to make it able to log in.
    pub async fn seed_user(&self, user: User, password: Option<&str>) {
        let mut state = self.state.write().await;
        if let Some(password) = password {
            state
                .users
                .insert(user.email.clone(), (password.to_string(), user.id.clone()));
        }
        state.accounts.push(user);
    }

    pub async fn seed_permission(&self, permission: Permission) {
        self.state.write().await.permissions.push(permission);
    }

    pub async fn seed_role(&self, role: RoleDefinition) {
        self.state.write().await.roles.push(role);
    }

    pub async fn seed_backup(&self, record: BackupRecord) {
        self.state.write().await.backups.push(record);
    }

    pub async fn questions(&self) -> Vec<(Question, Vec<QuestionOption>)> {
        self.state.read().await.questions.clone()
    }

    async fn record(
        &self,
        method: &'static str,
        path: String,
        body: Option<serde_json::Value>,
    ) -> AdminResult<()> {
        let failing = self.failing.lock().contains(&path);
        self.calls.lock().push(RecordedCall {
            method,
            path: path.clone(),
            body,
        });
        if failing {
            return Err(AdminError::Network(format!("connection refused: {}", path)));
        }
        Ok(())
    }

    async fn delay_for(&self, parent_id: &Id) {
        let latency = self.latency.lock().get(parent_id).copied();
        if let Some(latency) = latency {
            tokio::time::sleep(latency).await;
        }
    }

    fn require_name(name: &str) -> AdminResult<()> {
        if name.trim().is_empty() {
            return Err(AdminError::Rejected {
                status: 400,
                message: "Validation Error: name: must not be blank".to_string(),
            });
        }
        Ok(())
    }
}

#[async_trait::async_trait]
impl AuthApi for MemoryApi {
    async fn login(&self, email: &str, password: &str) -> AdminResult<String> {
        self.record(
            "POST",
            "/auth/login".to_string(),
            Some(serde_json::json!({ "email": email })),
        )
        .await?;
        let state = self.state.read().await;
        let disabled = state
            .accounts
            .iter()
            .any(|u| u.email == email && (!u.is_active || u.account_locked));
        match state.users.get(email) {
            Some(_) if disabled => Err(AdminError::Unauthorized(
                "Account is disabled or locked".to_string(),
            )),
            Some((expected, user_id)) if expected == password => Ok(format!("token-{}", user_id)),
            _ => Err(AdminError::Unauthorized("Invalid email or password".to_string())),
        }
    }

    async fn impersonate(&self, user_id: &Id) -> AdminResult<String> {
        self.record("POST", format!("/auth/impersonate/{}", user_id), None)
            .await?;
        let state = self.state.read().await;
        if state.users.values().any(|(_, id)| id == user_id) {
            Ok(format!("token-{}", user_id))
        } else {
            Err(AdminError::NotFound(format!("User not found: {}", user_id)))
        }
    }
}

#[async_trait::async_trait]
impl AcademicApi for MemoryApi {
    async fn list_classes(&self) -> AdminResult<Vec<AcademicClass>> {
        self.record("GET", "/academic/classes".to_string(), None)
            .await?;
        Ok(self.state.read().await.classes.clone())
    }

    async fn create_class(&self, class: NewClass) -> AdminResult<AcademicClass> {
        self.record("POST", "/academic/classes".to_string(), body_of(&class))
            .await?;
        Self::require_name(&class.name)?;

        let mut state = self.state.write().await;
        if state.classes.iter().any(|c| c.name == class.name) {
            return Err(AdminError::Conflict(format!(
                "Class '{}' already exists",
                class.name
            )));
        }
        let created = AcademicClass {
            id: generate_id(),
            name: class.name,
            order: class.order,
        };
        state.classes.push(created.clone());
        Ok(created)
    }

    async fn delete_class(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/academic/classes/{}", id), None)
            .await?;
        let mut state = self.state.write().await;
        if state.class_subjects.iter().any(|(class_id, _)| class_id == id) {
            return Err(AdminError::DependencyConflict(
                "Cannot delete class: subjects are mapped to it".to_string(),
            ));
        }
        let before = state.classes.len();
        state.classes.retain(|c| &c.id != id);
        if state.classes.len() == before {
            return Err(AdminError::NotFound(format!("Class not found: {}", id)));
        }
        Ok(())
    }

    async fn list_subjects(&self) -> AdminResult<Vec<Subject>> {
        self.record("GET", "/academic/subjects".to_string(), None)
            .await?;
        Ok(self.state.read().await.subjects.clone())
    }

    async fn create_subject(&self, subject: NewSubject) -> AdminResult<Subject> {
        self.record("POST", "/academic/subjects".to_string(), body_of(&subject))
            .await?;
        Self::require_name(&subject.name)?;

        let mut state = self.state.write().await;
        if state.subjects.iter().any(|s| s.code == subject.code) {
            return Err(AdminError::Conflict(format!(
                "Subject code '{}' already exists",
                subject.code
            )));
        }
        let created = Subject {
            id: generate_id(),
            name: subject.name,
            code: subject.code,
            description: subject.description,
        };
        state.subjects.push(created.clone());
        Ok(created)
    }

    async fn delete_subject(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/academic/subjects/{}", id), None)
            .await?;
        let mut state = self.state.write().await;
        if state
            .class_subjects
            .iter()
            .any(|(_, mapping)| &mapping.subject_id == id)
        {
            return Err(AdminError::DependencyConflict(
                "Cannot delete subject: it is mapped to a class".to_string(),
            ));
        }
        state.subjects.retain(|s| &s.id != id);
        Ok(())
    }

    async fn list_class_subjects(&self, class_id: &Id) -> AdminResult<Vec<ClassSubject>> {
        self.record("GET", format!("/academic/classes/{}/subjects", class_id), None)
            .await?;
        self.delay_for(class_id).await;
        let state = self.state.read().await;
        Ok(state
            .class_subjects
            .iter()
            .filter(|(parent, _)| parent == class_id)
            .map(|(_, mapping)| mapping.clone())
            .collect())
    }

    async fn create_class_subject(
        &self,
        class_id: &Id,
        subject: NewSubject,
    ) -> AdminResult<ClassSubject> {
        self.record(
            "POST",
            format!("/academic/classes/{}/subjects", class_id),
            body_of(&subject),
        )
        .await?;
        Self::require_name(&subject.name)?;

        let mut state = self.state.write().await;
        if state.subjects.iter().any(|s| s.code == subject.code) {
            return Err(AdminError::Conflict(format!(
                "Subject code '{}' already exists",
                subject.code
            )));
        }
        let library = Subject {
            id: generate_id(),
            name: subject.name,
            code: subject.code,
            description: subject.description,
        };
        let session = state.sessions.iter().find(|s| s.active).cloned();
        let mapping = ClassSubject {
            class_subject_id: generate_id(),
            subject_id: library.id.clone(),
            subject_name: library.name.clone(),
            subject_code: Some(library.code.clone()),
            subject_description: library.description.clone(),
            session_id: session.as_ref().map(|s| s.id.clone()),
            session_name: session.map(|s| s.name),
            is_active: true,
        };
        state.subjects.push(library);
        state.class_subjects.push((class_id.clone(), mapping.clone()));
        Ok(mapping)
    }

    async fn assign_subject(
        &self,
        class_id: &Id,
        subject_id: &Id,
        session_id: &Id,
    ) -> AdminResult<ClassSubject> {
        self.record(
            "POST",
            format!(
                "/academic/classes/{}/subjects/{}/session/{}",
                class_id, subject_id, session_id
            ),
            None,
        )
        .await?;

        let mut state = self.state.write().await;
        let subject = state
            .subjects
            .iter()
            .find(|s| &s.id == subject_id)
            .cloned()
            .ok_or_else(|| AdminError::NotFound(format!("Subject not found: {}", subject_id)))?;
        let session = state
            .sessions
            .iter()
            .find(|s| &s.id == session_id)
            .cloned()
            .ok_or_else(|| AdminError::NotFound(format!("Session not found: {}", session_id)))?;
        let already_mapped = state.class_subjects.iter().any(|(parent, mapping)| {
            parent == class_id
                && &mapping.subject_id == subject_id
                && mapping.session_id.as_ref() == Some(session_id)
        });
        if already_mapped {
            return Err(AdminError::Conflict(format!(
                "{} is already assigned to this class",
                subject.name
            )));
        }

        let mapping = ClassSubject {
            class_subject_id: generate_id(),
            subject_id: subject.id,
            subject_name: subject.name,
            subject_code: Some(subject.code),
            subject_description: subject.description,
            session_id: Some(session.id),
            session_name: Some(session.name),
            is_active: true,
        };
        state.class_subjects.push((class_id.clone(), mapping.clone()));
        Ok(mapping)
    }

    async fn delete_class_subject(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/academic/class-subjects/{}", id), None)
            .await?;
        let mut state = self.state.write().await;
        if state.chapters.iter().any(|(parent, _)| parent == id) {
            return Err(AdminError::DependencyConflict(
                "Cannot delete subject mapping: chapters exist".to_string(),
            ));
        }
        state
            .class_subjects
            .retain(|(_, mapping)| &mapping.class_subject_id != id);
        Ok(())
    }

    async fn list_sessions(&self) -> AdminResult<Vec<AcademicSession>> {
        self.record("GET", "/academic/sessions".to_string(), None)
            .await?;
        Ok(self.state.read().await.sessions.clone())
    }

    async fn create_session(&self, session: NewSession) -> AdminResult<AcademicSession> {
        self.record("POST", "/academic/sessions".to_string(), body_of(&session))
            .await?;
        Self::require_name(&session.name)?;

        let mut state = self.state.write().await;
        if state.sessions.iter().any(|s| s.name == session.name) {
            return Err(AdminError::Conflict(format!(
                "Session '{}' already exists",
                session.name
            )));
        }
        let created = AcademicSession {
            id: generate_id(),
            name: session.name,
            start_date: session.start_date,
            end_date: session.end_date,
            active: false,
        };
        state.sessions.push(created.clone());
        Ok(created)
    }

    async fn update_session(&self, id: &Id, session: NewSession) -> AdminResult<AcademicSession> {
        self.record("PUT", format!("/academic/sessions/{}", id), body_of(&session))
            .await?;
        Self::require_name(&session.name)?;

        let mut state = self.state.write().await;
        if state
            .sessions
            .iter()
            .any(|s| &s.id != id && s.name == session.name)
        {
            return Err(AdminError::Conflict(format!(
                "Session '{}' already exists",
                session.name
            )));
        }
        let existing = state
            .sessions
            .iter_mut()
            .find(|s| &s.id == id)
            .ok_or_else(|| AdminError::NotFound(format!("Session not found: {}", id)))?;
        existing.name = session.name;
        existing.start_date = session.start_date;
        existing.end_date = session.end_date;
        let updated = existing.clone();

        // Listings carry the session name, keep them in step
        for (_, mapping) in state.class_subjects.iter_mut() {
            if mapping.session_id.as_ref() == Some(id) {
                mapping.session_name = Some(updated.name.clone());
            }
        }
        Ok(updated)
    }

    async fn delete_session(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/academic/sessions/{}", id), None)
            .await?;
        let mut state = self.state.write().await;
        if state
            .class_subjects
            .iter()
            .any(|(_, mapping)| mapping.session_id.as_ref() == Some(id))
        {
            return Err(AdminError::DependencyConflict(
                "Cannot delete session: subjects are assigned to it".to_string(),
            ));
        }
        let before = state.sessions.len();
        state.sessions.retain(|s| &s.id != id);
        if state.sessions.len() == before {
            return Err(AdminError::NotFound(format!("Session not found: {}", id)));
        }
        Ok(())
    }

    async fn activate_session(&self, id: &Id) -> AdminResult<()> {
        self.record("PUT", format!("/academic/sessions/{}/activate", id), None)
            .await?;
        let mut state = self.state.write().await;
        if !state.sessions.iter().any(|s| &s.id == id) {
            return Err(AdminError::NotFound(format!("Session not found: {}", id)));
        }
        for session in state.sessions.iter_mut() {
            session.active = &session.id == id;
        }
        Ok(())
    }

    async fn active_session(&self) -> AdminResult<AcademicSession> {
        self.record("GET", "/academic/sessions/active".to_string(), None)
            .await?;
        self.state
            .read()
            .await
            .sessions
            .iter()
            .find(|s| s.active)
            .cloned()
            .ok_or_else(|| AdminError::NotFound("No active academic session".to_string()))
    }

    async fn list_chapters(&self, class_subject_id: &Id) -> AdminResult<Vec<Chapter>> {
        self.record(
            "GET",
            format!("/academic/class-subjects/{}/chapters", class_subject_id),
            None,
        )
        .await?;
        self.delay_for(class_subject_id).await;
        let state = self.state.read().await;
        Ok(state
            .chapters
            .iter()
            .filter(|(parent, _)| parent == class_subject_id)
            .map(|(_, chapter)| chapter.clone())
            .collect())
    }

    async fn create_chapter(
        &self,
        class_subject_id: &Id,
        chapter: NewChapter,
    ) -> AdminResult<Chapter> {
        self.record(
            "POST",
            format!("/academic/class-subjects/{}/chapters", class_subject_id),
            body_of(&chapter),
        )
        .await?;
        Self::require_name(&chapter.name)?;

        let mut state = self.state.write().await;
        let duplicate = chapter.chapter_number.is_some()
            && state.chapters.iter().any(|(parent, existing)| {
                parent == class_subject_id && existing.chapter_number == chapter.chapter_number
            });
        if duplicate {
            return Err(AdminError::Conflict(format!(
                "Chapter number {} already exists for this subject",
                chapter.chapter_number.unwrap_or_default()
            )));
        }
        let created = Chapter {
            id: generate_id(),
            name: chapter.name,
            chapter_number: chapter.chapter_number,
        };
        state
            .chapters
            .push((class_subject_id.clone(), created.clone()));
        Ok(created)
    }

    async fn delete_chapter(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/academic/chapters/{}", id), None)
            .await?;
        let mut state = self.state.write().await;
        if state.topics.iter().any(|(parent, _)| parent == id) {
            return Err(AdminError::DependencyConflict(
                "Cannot delete chapter: topics exist".to_string(),
            ));
        }
        state.chapters.retain(|(_, chapter)| &chapter.id != id);
        Ok(())
    }

    async fn list_topics(&self, chapter_id: &Id) -> AdminResult<Vec<Topic>> {
        self.record("GET", format!("/academic/chapters/{}/topics", chapter_id), None)
            .await?;
        self.delay_for(chapter_id).await;
        let state = self.state.read().await;
        Ok(state
            .topics
            .iter()
            .filter(|(parent, _)| parent == chapter_id)
            .map(|(_, topic)| topic.clone())
            .collect())
    }

    async fn create_topic(&self, chapter_id: &Id, topic: NewTopic) -> AdminResult<Topic> {
        self.record(
            "POST",
            format!("/academic/chapters/{}/topics", chapter_id),
            body_of(&topic),
        )
        .await?;
        Self::require_name(&topic.name)?;

        let mut state = self.state.write().await;
        if state
            .topics
            .iter()
            .any(|(parent, existing)| parent == chapter_id && existing.name == topic.name)
        {
            return Err(AdminError::Conflict(format!(
                "Topic '{}' already exists in this chapter",
                topic.name
            )));
        }
        let created = Topic {
            id: generate_id(),
            name: topic.name,
        };
        state.topics.push((chapter_id.clone(), created.clone()));
        Ok(created)
    }

    async fn delete_topic(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/academic/topics/{}", id), None)
            .await?;
        self.state
            .write()
            .await
            .topics
            .retain(|(_, topic)| &topic.id != id);
        Ok(())
    }
}

impl MemoryApi {
    async fn store_question(
        &self,
        question_type: QuestionType,
        question: NewQuestion,
        options: Vec<QuestionOption>,
    ) -> AdminResult<Question> {
        let created = Question {
            id: generate_id(),
            question_type,
            question_text: question.question_text,
            difficulty: question.difficulty,
            marks: question.marks,
            explanation: question.explanation,
            language: question.language,
            status: QuestionStatus::Pending,
            created_by: None,
            approved_by: None,
            approved_at: None,
        };
        self.state
            .write()
            .await
            .questions
            .push((created.clone(), options));
        Ok(created)
    }

    async fn set_status(&self, id: &Id, status: QuestionStatus) -> AdminResult<Question> {
        let mut state = self.state.write().await;
        let (question, _) = state
            .questions
            .iter_mut()
            .find(|(q, _)| &q.id == id)
            .ok_or_else(|| AdminError::NotFound(format!("Question not found: {}", id)))?;
        question.status = status;
        if status == QuestionStatus::Approved {
            question.approved_by = Some("ADMIN".to_string());
            question.approved_at = Some(chrono::Utc::now().naive_utc());
        }
        Ok(question.clone())
    }
}

#[async_trait::async_trait]
impl QuestionApi for MemoryApi {
    async fn create_mcq(&self, mcq: NewMcq) -> AdminResult<Question> {
        self.record("POST", "/questions/mcq/create".to_string(), body_of(&mcq))
            .await?;
        if mcq.options.iter().filter(|o| o.is_correct).count() != 1 {
            return Err(AdminError::Rejected {
                status: 400,
                message: "MCQ must have exactly one correct option".to_string(),
            });
        }
        self.store_question(QuestionType::Mcq, mcq.question, mcq.options)
            .await
    }

    async fn create_short(&self, question: NewQuestion) -> AdminResult<Question> {
        self.record(
            "POST",
            "/questions/short/create".to_string(),
            body_of(&question),
        )
        .await?;
        self.store_question(QuestionType::Short, question, Vec::new())
            .await
    }

    async fn create_cq(&self, question: NewQuestion) -> AdminResult<Question> {
        self.record("POST", "/questions/cq/create".to_string(), body_of(&question))
            .await?;
        self.store_question(QuestionType::Cq, question, Vec::new())
            .await
    }

    async fn list_questions(&self) -> AdminResult<Vec<Question>> {
        self.record("GET", "/questions/list".to_string(), None)
            .await?;
        let state = self.state.read().await;
        Ok(state.questions.iter().map(|(q, _)| q.clone()).collect())
    }

    async fn delete_question(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/questions/{}", id), None)
            .await?;
        self.state
            .write()
            .await
            .questions
            .retain(|(q, _)| &q.id != id);
        Ok(())
    }

    async fn approve_question(&self, id: &Id) -> AdminResult<Question> {
        self.record("PATCH", format!("/questions/{}/approve", id), None)
            .await?;
        self.set_status(id, QuestionStatus::Approved).await
    }

    async fn reject_question(&self, id: &Id) -> AdminResult<Question> {
        self.record("PATCH", format!("/questions/{}/reject", id), None)
            .await?;
        self.set_status(id, QuestionStatus::Rejected).await
    }
}

#[async_trait::async_trait]
impl SettingsApi for MemoryApi {
    async fn get_settings(
        &self,
        scope: SettingsScope,
        category: SettingCategory,
    ) -> AdminResult<SettingsMap> {
        self.record(
            "GET",
            format!(
                "/settings/general/{}/{}",
                scope.path_segment(),
                category.as_str()
            ),
            None,
        )
        .await?;
        let state = self.state.read().await;
        Ok(state
            .settings
            .get(&(scope, category))
            .cloned()
            .unwrap_or_default())
    }

    async fn update_settings(
        &self,
        scope: SettingsScope,
        category: SettingCategory,
        settings: &SettingsMap,
    ) -> AdminResult<()> {
        self.record(
            "PUT",
            format!(
                "/settings/general/{}/{}",
                scope.path_segment(),
                category.as_str()
            ),
            body_of(settings),
        )
        .await?;
        let mut state = self.state.write().await;
        state
            .settings
            .entry((scope, category))
            .or_default()
            .extend(settings.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }

    async fn get_security_settings(&self, scope: SettingsScope) -> AdminResult<SettingsMap> {
        self.record(
            "GET",
            format!("/settings/security/{}", scope.path_segment()),
            None,
        )
        .await?;
        let state = self.state.read().await;
        Ok(state.security.get(&scope).cloned().unwrap_or_default())
    }

    async fn update_security_settings(
        &self,
        scope: SettingsScope,
        settings: &SettingsMap,
    ) -> AdminResult<()> {
        self.record(
            "PUT",
            format!("/settings/security/{}", scope.path_segment()),
            body_of(settings),
        )
        .await?;
        let mut state = self.state.write().await;
        state
            .security
            .entry(scope)
            .or_default()
            .extend(settings.iter().map(|(k, v)| (k.clone(), v.clone())));
        Ok(())
    }
}

#[async_trait::async_trait]
impl BackupApi for MemoryApi {
    async fn trigger_backup(
        &self,
        backup_type: BackupType,
        tenant_id: Option<&str>,
    ) -> AdminResult<BackupRecord> {
        self.record("POST", "/settings/backup/manual".to_string(), None)
            .await?;
        let now = chrono::Utc::now().naive_utc();
        let id = generate_id();
        let record = BackupRecord {
            file_path: format!("backups/{}.zip", id),
            id,
            tenant_id: tenant_id.map(str::to_string),
            backup_type,
            file_size: Some(0),
            status: BackupStatus::Success,
            started_at: Some(now),
            completed_at: Some(now),
            triggered_by: Some("ADMIN".to_string()),
            error_message: None,
            encrypted: false,
        };
        self.state.write().await.backups.push(record.clone());
        Ok(record)
    }

    async fn backup_history(&self, tenant_id: Option<&str>) -> AdminResult<Vec<BackupRecord>> {
        self.record("GET", "/settings/backup/history".to_string(), None)
            .await?;
        let state = self.state.read().await;
        Ok(state
            .backups
            .iter()
            .filter(|b| tenant_id.is_none() || b.tenant_id.as_deref() == tenant_id)
            .cloned()
            .collect())
    }

    async fn delete_backup(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/settings/backup/history/{}", id), None)
            .await?;
        self.state.write().await.backups.retain(|b| &b.id != id);
        Ok(())
    }

    async fn restore_backup(&self, id: &Id) -> AdminResult<String> {
        self.record("POST", format!("/settings/backup/restore/{}", id), None)
            .await?;
        let state = self.state.read().await;
        match state.backups.iter().find(|b| &b.id == id) {
            Some(b) if b.status == BackupStatus::Success => {
                Ok("Restore completed successfully".to_string())
            }
            Some(_) => Err(AdminError::Rejected {
                status: 400,
                message: "Only successful backups can be restored".to_string(),
            }),
            None => Err(AdminError::NotFound(format!("Backup not found: {}", id))),
        }
    }

    async fn download_backup(&self, id: &Id) -> AdminResult<Vec<u8>> {
        self.record("GET", format!("/settings/backup/download/{}", id), None)
            .await?;
        let state = self.state.read().await;
        state
            .backups
            .iter()
            .find(|b| &b.id == id)
            .map(|b| b.file_path.as_bytes().to_vec())
            .ok_or_else(|| AdminError::NotFound(format!("Backup not found: {}", id)))
    }
}

#[async_trait::async_trait]
impl InstituteApi for MemoryApi {
    async fn list_institutes(&self, query: &InstituteQuery) -> AdminResult<Page<Institute>> {
        self.record("GET", "/institutes".to_string(), body_of(query))
            .await?;
        let state = self.state.read().await;
        let matching: Vec<Institute> = state
            .institutes
            .iter()
            .filter(|i| query.status.map_or(true, |s| i.status == s))
            .filter(|i| {
                query.search.as_ref().map_or(true, |term| {
                    let term = term.to_lowercase();
                    i.name.to_lowercase().contains(&term) || i.code.to_lowercase().contains(&term)
                })
            })
            .cloned()
            .collect();
        Ok(paginate(matching, query.page, query.size))
    }

    async fn get_institute(&self, id: &Id) -> AdminResult<Institute> {
        self.record("GET", format!("/institutes/{}", id), None)
            .await?;
        self.state
            .read()
            .await
            .institutes
            .iter()
            .find(|i| &i.id == id)
            .cloned()
            .ok_or_else(|| AdminError::NotFound(format!("Institute not found: {}", id)))
    }

    async fn create_institute(&self, institute: NewInstitute) -> AdminResult<Institute> {
        self.record("POST", "/institutes".to_string(), body_of(&institute))
            .await?;
        Self::require_name(&institute.name)?;

        let mut state = self.state.write().await;
        Self::check_institute_unique(&state, None, &institute)?;
        let created = Institute {
            id: generate_id(),
            name: institute.name,
            short_name: institute.short_name,
            code: institute.code,
            institute_type: institute.institute_type,
            status: InstituteStatus::Active,
            plan_type: SubscriptionPlan::Free,
            plan_end_date: None,
            max_teachers: institute.max_teachers,
            max_students: institute.max_students,
        };
        state.institutes.push(created.clone());
        Ok(created)
    }

    async fn update_institute(&self, id: &Id, institute: NewInstitute) -> AdminResult<Institute> {
        self.record("PUT", format!("/institutes/{}", id), body_of(&institute))
            .await?;
        Self::require_name(&institute.name)?;

        let mut state = self.state.write().await;
        Self::check_institute_unique(&state, Some(id), &institute)?;
        let existing = state
            .institutes
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| AdminError::NotFound(format!("Institute not found: {}", id)))?;
        existing.name = institute.name;
        existing.short_name = institute.short_name;
        existing.code = institute.code;
        existing.institute_type = institute.institute_type;
        existing.max_teachers = institute.max_teachers;
        existing.max_students = institute.max_students;
        Ok(existing.clone())
    }

    async fn delete_institute(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/institutes/{}", id), None)
            .await?;
        let mut state = self.state.write().await;
        if state
            .accounts
            .iter()
            .any(|u| u.institute_id.as_ref() == Some(id))
        {
            return Err(AdminError::DependencyConflict(
                "Cannot delete institute: users belong to it".to_string(),
            ));
        }
        let before = state.institutes.len();
        state.institutes.retain(|i| &i.id != id);
        if state.institutes.len() == before {
            return Err(AdminError::NotFound(format!("Institute not found: {}", id)));
        }
        Ok(())
    }

    async fn activate_institute(&self, id: &Id) -> AdminResult<()> {
        self.record("PATCH", format!("/institutes/{}/activate", id), None)
            .await?;
        self.modify_institute(id, |i| i.status = InstituteStatus::Active)
            .await
    }

    async fn suspend_institute(&self, id: &Id) -> AdminResult<()> {
        self.record("PATCH", format!("/institutes/{}/suspend", id), None)
            .await?;
        self.modify_institute(id, |i| i.status = InstituteStatus::Suspended)
            .await
    }

    async fn upgrade_plan(
        &self,
        id: &Id,
        plan: SubscriptionPlan,
        duration_months: u32,
    ) -> AdminResult<()> {
        self.record("PATCH", format!("/institutes/{}/upgrade-plan", id), None)
            .await?;
        let end = chrono::Utc::now()
            .date_naive()
            .checked_add_months(chrono::Months::new(duration_months));
        self.modify_institute(id, |i| {
            i.plan_type = plan;
            i.plan_end_date = end;
        })
        .await
    }
}

impl MemoryApi {
    async fn modify_institute(
        &self,
        id: &Id,
        apply: impl FnOnce(&mut Institute) + Send,
    ) -> AdminResult<()> {
        let mut state = self.state.write().await;
        let institute = state
            .institutes
            .iter_mut()
            .find(|i| &i.id == id)
            .ok_or_else(|| AdminError::NotFound(format!("Institute not found: {}", id)))?;
        apply(institute);
        Ok(())
    }

    /// Name and code are unique across institutes. `own_id` is skipped on update.
    fn check_institute_unique(
        state: &MemoryState,
        own_id: Option<&Id>,
        institute: &NewInstitute,
    ) -> AdminResult<()> {
        let others = state
            .institutes
            .iter()
            .filter(|i| Some(&i.id) != own_id);
        for other in others {
            if other.code == institute.code {
                return Err(AdminError::Conflict(format!(
                    "Institute code '{}' already exists.",
                    institute.code
                )));
            }
            if other.name == institute.name {
                return Err(AdminError::Conflict(format!(
                    "Institute '{}' already exists.",
                    institute.name
                )));
            }
        }
        Ok(())
    }

    async fn modify_user(&self, id: &Id, apply: impl FnOnce(&mut User) + Send) -> AdminResult<()> {
        let mut state = self.state.write().await;
        let user = state
            .accounts
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| AdminError::NotFound(format!("User not found: {}", id)))?;
        apply(user);
        Ok(())
    }

    /// Permission ids that do not exist are dropped, as the backend does.
    fn resolve_permissions(state: &MemoryState, role: &NewRole) -> Vec<Permission> {
        state
            .permissions
            .iter()
            .filter(|p| role.permissions.iter().any(|r| r.id == p.id))
            .cloned()
            .collect()
    }
}

#[async_trait::async_trait]
impl UserApi for MemoryApi {
    async fn list_users(&self, query: &UserQuery) -> AdminResult<Page<User>> {
        self.record("GET", "/users".to_string(), body_of(query))
            .await?;
        let state = self.state.read().await;
        let matching: Vec<User> = state
            .accounts
            .iter()
            .filter(|u| {
                query.query.as_ref().map_or(true, |term| {
                    let term = term.to_lowercase();
                    u.name.to_lowercase().contains(&term) || u.email.to_lowercase().contains(&term)
                })
            })
            .filter(|u| {
                query
                    .institute_id
                    .as_ref()
                    .map_or(true, |id| u.institute_id.as_ref() == Some(id))
            })
            .filter(|u| query.role.as_ref().map_or(true, |role| u.roles.contains(role)))
            .filter(|u| query.active.map_or(true, |active| u.is_active == active))
            .filter(|u| {
                query
                    .account_locked
                    .map_or(true, |locked| u.account_locked == locked)
            })
            .cloned()
            .collect();
        Ok(paginate(matching, query.page, query.size))
    }

    async fn get_user(&self, id: &Id) -> AdminResult<User> {
        self.record("GET", format!("/users/{}", id), None).await?;
        self.state
            .read()
            .await
            .accounts
            .iter()
            .find(|u| &u.id == id)
            .cloned()
            .ok_or_else(|| AdminError::NotFound(format!("User not found: {}", id)))
    }

    async fn create_user(&self, user: NewUser) -> AdminResult<User> {
        let mut body = body_of(&user);
        if let Some(serde_json::Value::Object(fields)) = body.as_mut() {
            fields.remove("password");
        }
        self.record("POST", "/users".to_string(), body).await?;
        Self::require_name(&user.name)?;

        let mut state = self.state.write().await;
        if state.accounts.iter().any(|u| u.email == user.email) {
            return Err(AdminError::Conflict("Email already exists".to_string()));
        }
        let institute_name = user.institute_id.as_ref().and_then(|id| {
            state
                .institutes
                .iter()
                .find(|i| &i.id == id)
                .map(|i| i.name.clone())
        });
        let created = User {
            id: generate_id(),
            name: user.name,
            email: user.email,
            phone: user.phone,
            profile_image_url: None,
            is_active: true,
            failed_login_attempts: 0,
            account_locked: false,
            institute_id: user.institute_id,
            institute_name,
            roles: user.roles,
            created_at: Some(chrono::Utc::now().naive_utc()),
        };
        state
            .users
            .insert(created.email.clone(), (user.password, created.id.clone()));
        state.accounts.push(created.clone());
        Ok(created)
    }

    async fn update_user(&self, id: &Id, user: UserUpdate) -> AdminResult<User> {
        self.record("PUT", format!("/users/{}", id), body_of(&user))
            .await?;
        Self::require_name(&user.name)?;

        let mut state = self.state.write().await;
        if state
            .accounts
            .iter()
            .any(|u| &u.id != id && u.email == user.email)
        {
            return Err(AdminError::Conflict("Email already exists".to_string()));
        }
        let existing = state
            .accounts
            .iter_mut()
            .find(|u| &u.id == id)
            .ok_or_else(|| AdminError::NotFound(format!("User not found: {}", id)))?;
        let old_email = std::mem::replace(&mut existing.email, user.email);
        existing.name = user.name;
        existing.phone = user.phone;
        existing.is_active = user.is_active;
        existing.institute_id = user.institute_id;
        existing.roles = user.roles;
        let updated = existing.clone();

        if old_email != updated.email {
            if let Some(credential) = state.users.remove(&old_email) {
                state.users.insert(updated.email.clone(), credential);
            }
        }
        Ok(updated)
    }

    async fn delete_user(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/users/{}", id), None)
            .await?;
        let mut state = self.state.write().await;
        let index = state
            .accounts
            .iter()
            .position(|u| &u.id == id)
            .ok_or_else(|| AdminError::NotFound(format!("User not found: {}", id)))?;
        let removed = state.accounts.remove(index);
        state.users.remove(&removed.email);
        Ok(())
    }

    async fn activate_user(&self, id: &Id) -> AdminResult<()> {
        self.record("PATCH", format!("/users/{}/activate", id), None)
            .await?;
        self.modify_user(id, |u| u.is_active = true).await
    }

    async fn deactivate_user(&self, id: &Id) -> AdminResult<()> {
        self.record("PATCH", format!("/users/{}/deactivate", id), None)
            .await?;
        self.modify_user(id, |u| u.is_active = false).await
    }

    async fn reset_password(&self, id: &Id) -> AdminResult<()> {
        self.record("PATCH", format!("/users/{}/reset-password", id), None)
            .await?;
        self.modify_user(id, |u| {
            u.failed_login_attempts = 0;
            u.account_locked = false;
        })
        .await
    }
}

#[async_trait::async_trait]
impl RoleApi for MemoryApi {
    async fn list_roles(&self) -> AdminResult<Vec<RoleDefinition>> {
        self.record("GET", "/roles".to_string(), None).await?;
        Ok(self.state.read().await.roles.clone())
    }

    async fn create_role(&self, role: NewRole) -> AdminResult<RoleDefinition> {
        self.record("POST", "/roles".to_string(), body_of(&role))
            .await?;
        Self::require_name(&role.name)?;

        let mut state = self.state.write().await;
        if state.roles.iter().any(|r| r.name == role.name) {
            return Err(AdminError::Conflict(format!(
                "Role with name {} already exists",
                role.name
            )));
        }
        let created = RoleDefinition {
            id: generate_id(),
            permissions: Self::resolve_permissions(&state, &role),
            name: role.name,
            description: role.description,
        };
        state.roles.push(created.clone());
        Ok(created)
    }

    async fn update_role(&self, id: &Id, role: NewRole) -> AdminResult<RoleDefinition> {
        self.record("PUT", format!("/roles/{}", id), body_of(&role))
            .await?;
        Self::require_name(&role.name)?;

        let mut state = self.state.write().await;
        let permissions = Self::resolve_permissions(&state, &role);
        let existing = state
            .roles
            .iter_mut()
            .find(|r| &r.id == id)
            .ok_or_else(|| AdminError::NotFound("Role not found".to_string()))?;
        existing.name = role.name;
        existing.description = role.description;
        existing.permissions = permissions;
        Ok(existing.clone())
    }

    async fn delete_role(&self, id: &Id) -> AdminResult<()> {
        self.record("DELETE", format!("/roles/{}", id), None)
            .await?;
        let mut state = self.state.write().await;
        let before = state.roles.len();
        state.roles.retain(|r| &r.id != id);
        if state.roles.len() == before {
            return Err(AdminError::NotFound("Role not found".to_string()));
        }
        Ok(())
    }

    async fn list_permissions(&self) -> AdminResult<Vec<Permission>> {
        self.record("GET", "/permissions".to_string(), None)
            .await?;
        Ok(self.state.read().await.permissions.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_delete_chapter_with_topics_is_rejected() {
        let api = MemoryApi::new();
        let chapter = Chapter {
            id: "9".to_string(),
            name: "Motion".to_string(),
            chapter_number: Some(1),
        };
        api.seed_chapter("5", chapter).await;
        api.seed_topic(
            "9",
            Topic {
                id: "t-1".to_string(),
                name: "Velocity".to_string(),
            },
        )
        .await;

        let result = api.delete_chapter(&"9".to_string()).await;
        assert!(matches!(result, Err(AdminError::DependencyConflict(_))));
        assert_eq!(api.list_chapters(&"5".to_string()).await.unwrap().len(), 1);
    }

    #[tokio::test]
    async fn test_failing_path_records_call() {
        let api = MemoryApi::new();
        api.fail_path("/academic/classes");

        let result = api.list_classes().await;
        assert!(matches!(result, Err(AdminError::Network(_))));
        assert_eq!(api.call_count(), 1);

        api.heal("/academic/classes");
        assert!(api.list_classes().await.is_ok());
    }

    #[tokio::test]
    async fn test_duplicate_topic_name_conflicts() {
        let api = MemoryApi::new();
        let chapter_id = "9".to_string();
        api.create_topic(&chapter_id, NewTopic { name: "Velocity".to_string() })
            .await
            .unwrap();
        let again = api
            .create_topic(&chapter_id, NewTopic { name: "Velocity".to_string() })
            .await;
        assert!(matches!(again, Err(AdminError::Conflict(_))));

        // Same name under another chapter is fine
        assert!(api
            .create_topic(&"10".to_string(), NewTopic { name: "Velocity".to_string() })
            .await
            .is_ok());
    }
}
