use crate::error::AdminResult;
use crate::model::{
    AcademicClass, AcademicSession, BackupRecord, BackupType, Chapter, ClassSubject, Id,
    Institute, InstituteQuery, NewChapter, NewClass, NewInstitute, NewMcq, NewQuestion, NewRole,
    NewSession, NewSubject, NewTopic, NewUser, Page, Permission, Question, RoleDefinition,
    SettingCategory, SettingsMap, SettingsScope, Subject, SubscriptionPlan, Topic, User,
    UserQuery, UserUpdate,
};

#[async_trait::async_trait]
pub trait AuthApi: Send + Sync {
    /// Exchange credentials for a bearer token.
    async fn login(&self, email: &str, password: &str) -> AdminResult<String>;
    /// Token for acting as `user_id`. Requires a super admin session.
    async fn impersonate(&self, user_id: &Id) -> AdminResult<String>;
}

/// Class → Subject → Chapter → Topic, using the global subject library
/// mapped to classes through class-subjects.
#[async_trait::async_trait]
pub trait AcademicApi: Send + Sync {
    async fn list_classes(&self) -> AdminResult<Vec<AcademicClass>>;
    async fn create_class(&self, class: NewClass) -> AdminResult<AcademicClass>;
    async fn delete_class(&self, id: &Id) -> AdminResult<()>;

    /// Global subject library
    async fn list_subjects(&self) -> AdminResult<Vec<Subject>>;
    async fn create_subject(&self, subject: NewSubject) -> AdminResult<Subject>;
    async fn delete_subject(&self, id: &Id) -> AdminResult<()>;

    async fn list_class_subjects(&self, class_id: &Id) -> AdminResult<Vec<ClassSubject>>;
    /// Create a library subject and map it to the class in one call.
    async fn create_class_subject(
        &self,
        class_id: &Id,
        subject: NewSubject,
    ) -> AdminResult<ClassSubject>;
    async fn assign_subject(
        &self,
        class_id: &Id,
        subject_id: &Id,
        session_id: &Id,
    ) -> AdminResult<ClassSubject>;
    async fn delete_class_subject(&self, id: &Id) -> AdminResult<()>;

    async fn list_sessions(&self) -> AdminResult<Vec<AcademicSession>>;
    async fn active_session(&self) -> AdminResult<AcademicSession>;
    async fn create_session(&self, session: NewSession) -> AdminResult<AcademicSession>;
    async fn update_session(&self, id: &Id, session: NewSession) -> AdminResult<AcademicSession>;
    async fn delete_session(&self, id: &Id) -> AdminResult<()>;
    /// Make `id` the only active session.
    async fn activate_session(&self, id: &Id) -> AdminResult<()>;

    async fn list_chapters(&self, class_subject_id: &Id) -> AdminResult<Vec<Chapter>>;
    async fn create_chapter(&self, class_subject_id: &Id, chapter: NewChapter)
        -> AdminResult<Chapter>;
    async fn delete_chapter(&self, id: &Id) -> AdminResult<()>;

    async fn list_topics(&self, chapter_id: &Id) -> AdminResult<Vec<Topic>>;
    async fn create_topic(&self, chapter_id: &Id, topic: NewTopic) -> AdminResult<Topic>;
    async fn delete_topic(&self, id: &Id) -> AdminResult<()>;
}

#[async_trait::async_trait]
pub trait QuestionApi: Send + Sync {
    async fn create_mcq(&self, mcq: NewMcq) -> AdminResult<Question>;
    async fn create_short(&self, question: NewQuestion) -> AdminResult<Question>;
    async fn create_cq(&self, question: NewQuestion) -> AdminResult<Question>;
    async fn list_questions(&self) -> AdminResult<Vec<Question>>;
    async fn delete_question(&self, id: &Id) -> AdminResult<()>;
    async fn approve_question(&self, id: &Id) -> AdminResult<Question>;
    async fn reject_question(&self, id: &Id) -> AdminResult<Question>;
}

#[async_trait::async_trait]
pub trait SettingsApi: Send + Sync {
    async fn get_settings(
        &self,
        scope: SettingsScope,
        category: SettingCategory,
    ) -> AdminResult<SettingsMap>;
    async fn update_settings(
        &self,
        scope: SettingsScope,
        category: SettingCategory,
        settings: &SettingsMap,
    ) -> AdminResult<()>;

    /// Password and lockout rules. Keys are stored upper-case.
    async fn get_security_settings(&self, scope: SettingsScope) -> AdminResult<SettingsMap>;
    async fn update_security_settings(
        &self,
        scope: SettingsScope,
        settings: &SettingsMap,
    ) -> AdminResult<()>;
}

#[async_trait::async_trait]
pub trait BackupApi: Send + Sync {
    async fn trigger_backup(
        &self,
        backup_type: BackupType,
        tenant_id: Option<&str>,
    ) -> AdminResult<BackupRecord>;
    async fn backup_history(&self, tenant_id: Option<&str>) -> AdminResult<Vec<BackupRecord>>;
    async fn delete_backup(&self, id: &Id) -> AdminResult<()>;
    /// Returns the server's status message.
    async fn restore_backup(&self, id: &Id) -> AdminResult<String>;
    async fn download_backup(&self, id: &Id) -> AdminResult<Vec<u8>>;
}

#[async_trait::async_trait]
pub trait InstituteApi: Send + Sync {
    async fn list_institutes(&self, query: &InstituteQuery) -> AdminResult<Page<Institute>>;
    async fn get_institute(&self, id: &Id) -> AdminResult<Institute>;
    async fn create_institute(&self, institute: NewInstitute) -> AdminResult<Institute>;
    async fn update_institute(&self, id: &Id, institute: NewInstitute) -> AdminResult<Institute>;
    async fn delete_institute(&self, id: &Id) -> AdminResult<()>;
    async fn activate_institute(&self, id: &Id) -> AdminResult<()>;
    async fn suspend_institute(&self, id: &Id) -> AdminResult<()>;
    async fn upgrade_plan(
        &self,
        id: &Id,
        plan: SubscriptionPlan,
        duration_months: u32,
    ) -> AdminResult<()>;
}

#[async_trait::async_trait]
pub trait UserApi: Send + Sync {
    async fn list_users(&self, query: &UserQuery) -> AdminResult<Page<User>>;
    async fn get_user(&self, id: &Id) -> AdminResult<User>;
    async fn create_user(&self, user: NewUser) -> AdminResult<User>;
    async fn update_user(&self, id: &Id, user: UserUpdate) -> AdminResult<User>;
    async fn delete_user(&self, id: &Id) -> AdminResult<()>;
    async fn activate_user(&self, id: &Id) -> AdminResult<()>;
    async fn deactivate_user(&self, id: &Id) -> AdminResult<()>;
    /// The server generates the new password and mails it to the user.
    async fn reset_password(&self, id: &Id) -> AdminResult<()>;
}

#[async_trait::async_trait]
pub trait RoleApi: Send + Sync {
    async fn list_roles(&self) -> AdminResult<Vec<RoleDefinition>>;
    async fn create_role(&self, role: NewRole) -> AdminResult<RoleDefinition>;
    async fn update_role(&self, id: &Id, role: NewRole) -> AdminResult<RoleDefinition>;
    async fn delete_role(&self, id: &Id) -> AdminResult<()>;
    async fn list_permissions(&self) -> AdminResult<Vec<Permission>>;
}

pub trait AdminApi:
    AuthApi
    + AcademicApi
    + QuestionApi
    + SettingsApi
    + BackupApi
    + InstituteApi
    + UserApi
    + RoleApi
    + Send
    + Sync
{
}

impl<T> AdminApi for T where
    T: AuthApi
        + AcademicApi
        + QuestionApi
        + SettingsApi
        + BackupApi
        + InstituteApi
        + UserApi
        + RoleApi
        + Send
        + Sync
{
}
