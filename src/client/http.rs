use reqwest::multipart::{Form, Part};
use reqwest::{Client, Method, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::json;
use std::sync::Arc;

use crate::client::traits::{
    AcademicApi, AuthApi, BackupApi, InstituteApi, QuestionApi, RoleApi, SettingsApi, UserApi,
};
use crate::config::ApiConfig;
use crate::error::{AdminError, AdminResult, OperationKind};
use crate::model::{
    AcademicClass, AcademicSession, ApiEnvelope, BackupRecord, BackupType, Chapter, ClassSubject,
    ErrorBody, Id, Institute, InstituteQuery, NewChapter, NewClass, NewInstitute, NewMcq,
    NewQuestion, NewRole, NewSession, NewSubject, NewTopic, NewUser, Page, Permission, Question,
    RoleDefinition, SettingCategory, SettingsMap, SettingsScope, Subject, SubscriptionPlan, Topic,
    User, UserQuery, UserUpdate,
};
use crate::session::SessionContext;

/// `reqwest` implementation of the collaborator API.
///
/// The bearer token is read from the shared [`SessionContext`] on every
/// request, so login and impersonation take effect immediately.
#[derive(Debug, Clone)]
pub struct HttpApiClient {
    client: Client,
    base_url: String,
    session: Arc<SessionContext>,
}

impl HttpApiClient {
    pub fn new(config: &ApiConfig, session: Arc<SessionContext>) -> AdminResult<Self> {
        let client = Client::builder()
            .timeout(config.timeout())
            .build()
            .map_err(|e| AdminError::Network(e.to_string()))?;

        Ok(Self {
            client,
            base_url: config.base_url().to_string(),
            session,
        })
    }

    pub fn session(&self) -> &Arc<SessionContext> {
        &self.session
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = format!("{}{}", self.base_url, path);
        log::debug!("{} {}", method, url);

        let builder = self.client.request(method, url);
        match self.session.bearer_token() {
            Some(token) => builder.bearer_auth(token),
            None => builder,
        }
    }

    async fn dispatch(&self, kind: OperationKind, builder: RequestBuilder) -> AdminResult<Response> {
        let response = builder.send().await.map_err(|e| {
            log::warn!("Request failed: {}", e);
            AdminError::Network(e.to_string())
        })?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }

        let body = response.text().await.unwrap_or_default();
        let message = serde_json::from_str::<ErrorBody>(&body)
            .ok()
            .and_then(ErrorBody::into_message)
            .or_else(|| Some(body.trim().to_string()).filter(|b| !b.is_empty()))
            .unwrap_or_else(|| {
                status
                    .canonical_reason()
                    .unwrap_or("request failed")
                    .to_string()
            });

        log::warn!("Server rejected request ({}): {}", status.as_u16(), message);
        Err(kind.classify(status.as_u16(), message))
    }

    async fn send_json<T: DeserializeOwned>(
        &self,
        kind: OperationKind,
        builder: RequestBuilder,
    ) -> AdminResult<T> {
        let response = self.dispatch(kind, builder).await?;
        response
            .json::<T>()
            .await
            .map_err(|e| AdminError::Decode(e.to_string()))
    }

    async fn send_empty(&self, kind: OperationKind, builder: RequestBuilder) -> AdminResult<()> {
        self.dispatch(kind, builder).await.map(|_| ())
    }

    async fn get<T: DeserializeOwned>(&self, path: &str) -> AdminResult<T> {
        self.send_json(OperationKind::Read, self.request(Method::GET, path))
            .await
    }

    async fn post<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AdminResult<T> {
        self.send_json(
            OperationKind::Create,
            self.request(Method::POST, path).json(body),
        )
        .await
    }

    async fn patch<T: DeserializeOwned>(&self, path: &str) -> AdminResult<T> {
        self.send_json(
            OperationKind::Update,
            self.request(Method::PATCH, path).json(&json!({})),
        )
        .await
    }

    /// PATCH for state transitions whose response body is not needed.
    async fn patch_empty(&self, path: &str) -> AdminResult<()> {
        self.send_empty(
            OperationKind::Update,
            self.request(Method::PATCH, path).json(&json!({})),
        )
        .await
    }

    async fn put<B: Serialize + ?Sized, T: DeserializeOwned>(
        &self,
        path: &str,
        body: &B,
    ) -> AdminResult<T> {
        self.send_json(
            OperationKind::Update,
            self.request(Method::PUT, path).json(body),
        )
        .await
    }

    async fn delete(&self, path: &str) -> AdminResult<()> {
        self.send_empty(OperationKind::Delete, self.request(Method::DELETE, path))
            .await
    }

    async fn token_from_envelope(&self, path: &str, body: serde_json::Value) -> AdminResult<String> {
        let envelope: ApiEnvelope<String> = self.post(path, &body).await?;
        match envelope.data {
            Some(token) if envelope.success => Ok(token),
            _ => Err(AdminError::Unauthorized(
                envelope.message.unwrap_or_else(|| "login failed".to_string()),
            )),
        }
    }
}

/// Payload of a `{ success, message, data }` response.
fn envelope_data<T>(envelope: ApiEnvelope<T>) -> AdminResult<T> {
    envelope.data.ok_or_else(|| {
        AdminError::Decode(
            envelope
                .message
                .unwrap_or_else(|| "response carried no data".to_string()),
        )
    })
}

/// Institute create and update are multipart: the record travels as a
/// JSON part named `institute`, next to an optional logo file.
fn institute_form(institute: &NewInstitute) -> AdminResult<Form> {
    let record =
        serde_json::to_string(institute).map_err(|e| AdminError::Decode(e.to_string()))?;
    let part = Part::text(record)
        .mime_str("application/json")
        .map_err(|e| AdminError::Decode(e.to_string()))?;
    Ok(Form::new().part("institute", part))
}

/// Class-subject as returned by the create/assign endpoints (the entity,
/// not the listing DTO).
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct ClassSubjectEntity {
    id: Id,
    subject: Subject,
    #[serde(default)]
    session: Option<AcademicSession>,
    #[serde(default = "default_true", alias = "isActive")]
    active: bool,
}

fn default_true() -> bool {
    true
}

impl From<ClassSubjectEntity> for ClassSubject {
    fn from(entity: ClassSubjectEntity) -> Self {
        ClassSubject {
            class_subject_id: entity.id,
            subject_id: entity.subject.id,
            subject_name: entity.subject.name,
            subject_code: Some(entity.subject.code),
            subject_description: entity.subject.description,
            session_id: entity.session.as_ref().map(|s| s.id.clone()),
            session_name: entity.session.map(|s| s.name),
            is_active: entity.active,
        }
    }
}

#[async_trait::async_trait]
impl AuthApi for HttpApiClient {
    async fn login(&self, email: &str, password: &str) -> AdminResult<String> {
        self.token_from_envelope(
            "/auth/login",
            json!({ "email": email, "password": password }),
        )
        .await
    }

    async fn impersonate(&self, user_id: &Id) -> AdminResult<String> {
        self.token_from_envelope(&format!("/auth/impersonate/{}", user_id), json!({}))
            .await
    }
}

#[async_trait::async_trait]
impl AcademicApi for HttpApiClient {
    async fn list_classes(&self) -> AdminResult<Vec<AcademicClass>> {
        self.get("/academic/classes").await
    }

    async fn create_class(&self, class: NewClass) -> AdminResult<AcademicClass> {
        self.post("/academic/classes", &class).await
    }

    async fn delete_class(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/academic/classes/{}", id)).await
    }

    async fn list_subjects(&self) -> AdminResult<Vec<Subject>> {
        self.get("/academic/subjects").await
    }

    async fn create_subject(&self, subject: NewSubject) -> AdminResult<Subject> {
        self.post("/academic/subjects", &subject).await
    }

    async fn delete_subject(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/academic/subjects/{}", id)).await
    }

    async fn list_class_subjects(&self, class_id: &Id) -> AdminResult<Vec<ClassSubject>> {
        self.get(&format!("/academic/classes/{}/subjects", class_id))
            .await
    }

    async fn create_class_subject(
        &self,
        class_id: &Id,
        subject: NewSubject,
    ) -> AdminResult<ClassSubject> {
        let entity: ClassSubjectEntity = self
            .post(&format!("/academic/classes/{}/subjects", class_id), &subject)
            .await?;
        Ok(entity.into())
    }

    async fn assign_subject(
        &self,
        class_id: &Id,
        subject_id: &Id,
        session_id: &Id,
    ) -> AdminResult<ClassSubject> {
        let path = format!(
            "/academic/classes/{}/subjects/{}/session/{}",
            class_id, subject_id, session_id
        );
        let entity: ClassSubjectEntity = self.post(&path, &json!({})).await?;
        Ok(entity.into())
    }

    async fn delete_class_subject(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/academic/class-subjects/{}", id)).await
    }

    async fn list_sessions(&self) -> AdminResult<Vec<AcademicSession>> {
        self.get("/academic/sessions").await
    }

    async fn active_session(&self) -> AdminResult<AcademicSession> {
        self.get("/academic/sessions/active").await
    }

    async fn create_session(&self, session: NewSession) -> AdminResult<AcademicSession> {
        self.post("/academic/sessions", &session).await
    }

    async fn update_session(&self, id: &Id, session: NewSession) -> AdminResult<AcademicSession> {
        self.put(&format!("/academic/sessions/{}", id), &session)
            .await
    }

    async fn delete_session(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/academic/sessions/{}", id)).await
    }

    async fn activate_session(&self, id: &Id) -> AdminResult<()> {
        self.send_empty(
            OperationKind::Update,
            self.request(Method::PUT, &format!("/academic/sessions/{}/activate", id)),
        )
        .await
    }

    async fn list_chapters(&self, class_subject_id: &Id) -> AdminResult<Vec<Chapter>> {
        self.get(&format!("/academic/class-subjects/{}/chapters", class_subject_id))
            .await
    }

    async fn create_chapter(
        &self,
        class_subject_id: &Id,
        chapter: NewChapter,
    ) -> AdminResult<Chapter> {
        self.post(
            &format!("/academic/class-subjects/{}/chapters", class_subject_id),
            &chapter,
        )
        .await
    }

    async fn delete_chapter(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/academic/chapters/{}", id)).await
    }

    async fn list_topics(&self, chapter_id: &Id) -> AdminResult<Vec<Topic>> {
        self.get(&format!("/academic/chapters/{}/topics", chapter_id))
            .await
    }

    async fn create_topic(&self, chapter_id: &Id, topic: NewTopic) -> AdminResult<Topic> {
        self.post(&format!("/academic/chapters/{}/topics", chapter_id), &topic)
            .await
    }

    async fn delete_topic(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/academic/topics/{}", id)).await
    }
}

#[async_trait::async_trait]
impl QuestionApi for HttpApiClient {
    async fn create_mcq(&self, mcq: NewMcq) -> AdminResult<Question> {
        self.post("/questions/mcq/create", &mcq).await
    }

    async fn create_short(&self, question: NewQuestion) -> AdminResult<Question> {
        self.post("/questions/short/create", &question).await
    }

    async fn create_cq(&self, question: NewQuestion) -> AdminResult<Question> {
        self.post("/questions/cq/create", &question).await
    }

    async fn list_questions(&self) -> AdminResult<Vec<Question>> {
        self.get("/questions/list").await
    }

    async fn delete_question(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/questions/{}", id)).await
    }

    async fn approve_question(&self, id: &Id) -> AdminResult<Question> {
        self.patch(&format!("/questions/{}/approve", id)).await
    }

    async fn reject_question(&self, id: &Id) -> AdminResult<Question> {
        self.patch(&format!("/questions/{}/reject", id)).await
    }
}

#[async_trait::async_trait]
impl SettingsApi for HttpApiClient {
    async fn get_settings(
        &self,
        scope: SettingsScope,
        category: SettingCategory,
    ) -> AdminResult<SettingsMap> {
        self.get(&format!(
            "/settings/general/{}/{}",
            scope.path_segment(),
            category.as_str()
        ))
        .await
    }

    async fn update_settings(
        &self,
        scope: SettingsScope,
        category: SettingCategory,
        settings: &SettingsMap,
    ) -> AdminResult<()> {
        let path = format!(
            "/settings/general/{}/{}",
            scope.path_segment(),
            category.as_str()
        );
        self.send_empty(
            OperationKind::Update,
            self.request(Method::PUT, &path).json(settings),
        )
        .await
    }

    async fn get_security_settings(&self, scope: SettingsScope) -> AdminResult<SettingsMap> {
        self.get(&format!("/settings/security/{}", scope.path_segment()))
            .await
    }

    async fn update_security_settings(
        &self,
        scope: SettingsScope,
        settings: &SettingsMap,
    ) -> AdminResult<()> {
        let path = format!("/settings/security/{}", scope.path_segment());
        self.send_empty(
            OperationKind::Update,
            self.request(Method::PUT, &path).json(settings),
        )
        .await
    }
}

#[async_trait::async_trait]
impl BackupApi for HttpApiClient {
    async fn trigger_backup(
        &self,
        backup_type: BackupType,
        tenant_id: Option<&str>,
    ) -> AdminResult<BackupRecord> {
        let mut params = vec![("type", backup_type.as_str())];
        if let Some(tenant_id) = tenant_id {
            params.push(("tenantId", tenant_id));
        }
        self.send_json(
            OperationKind::Create,
            self.request(Method::POST, "/settings/backup/manual")
                .query(&params),
        )
        .await
    }

    async fn backup_history(&self, tenant_id: Option<&str>) -> AdminResult<Vec<BackupRecord>> {
        let mut builder = self.request(Method::GET, "/settings/backup/history");
        if let Some(tenant_id) = tenant_id {
            builder = builder.query(&[("tenantId", tenant_id)]);
        }
        self.send_json(OperationKind::Read, builder).await
    }

    async fn delete_backup(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/settings/backup/history/{}", id)).await
    }

    async fn restore_backup(&self, id: &Id) -> AdminResult<String> {
        let response = self
            .dispatch(
                OperationKind::Update,
                self.request(Method::POST, &format!("/settings/backup/restore/{}", id))
                    .json(&json!({})),
            )
            .await?;
        response
            .text()
            .await
            .map_err(|e| AdminError::Decode(e.to_string()))
    }

    async fn download_backup(&self, id: &Id) -> AdminResult<Vec<u8>> {
        let response = self
            .dispatch(
                OperationKind::Read,
                self.request(Method::GET, &format!("/settings/backup/download/{}", id)),
            )
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| AdminError::Network(e.to_string()))?;
        Ok(bytes.to_vec())
    }
}

#[async_trait::async_trait]
impl InstituteApi for HttpApiClient {
    async fn list_institutes(&self, query: &InstituteQuery) -> AdminResult<Page<Institute>> {
        self.send_json(
            OperationKind::Read,
            self.request(Method::GET, "/institutes").query(query),
        )
        .await
    }

    async fn get_institute(&self, id: &Id) -> AdminResult<Institute> {
        self.get(&format!("/institutes/{}", id)).await
    }

    async fn create_institute(&self, institute: NewInstitute) -> AdminResult<Institute> {
        let form = institute_form(&institute)?;
        self.send_json(
            OperationKind::Create,
            self.request(Method::POST, "/institutes").multipart(form),
        )
        .await
    }

    async fn update_institute(&self, id: &Id, institute: NewInstitute) -> AdminResult<Institute> {
        let form = institute_form(&institute)?;
        self.send_json(
            OperationKind::Update,
            self.request(Method::PUT, &format!("/institutes/{}", id))
                .multipart(form),
        )
        .await
    }

    async fn delete_institute(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/institutes/{}", id)).await
    }

    async fn activate_institute(&self, id: &Id) -> AdminResult<()> {
        self.patch_empty(&format!("/institutes/{}/activate", id))
            .await
    }

    async fn suspend_institute(&self, id: &Id) -> AdminResult<()> {
        self.patch_empty(&format!("/institutes/{}/suspend", id))
            .await
    }

    async fn upgrade_plan(
        &self,
        id: &Id,
        plan: SubscriptionPlan,
        duration_months: u32,
    ) -> AdminResult<()> {
        let months = duration_months.to_string();
        self.send_empty(
            OperationKind::Update,
            self.request(Method::PATCH, &format!("/institutes/{}/upgrade-plan", id))
                .query(&[("plan", plan.as_str()), ("durationMonths", months.as_str())]),
        )
        .await
    }
}

#[async_trait::async_trait]
impl UserApi for HttpApiClient {
    async fn list_users(&self, query: &UserQuery) -> AdminResult<Page<User>> {
        let envelope: ApiEnvelope<Page<User>> = self
            .send_json(
                OperationKind::Read,
                self.request(Method::GET, "/users").query(query),
            )
            .await?;
        envelope_data(envelope)
    }

    async fn get_user(&self, id: &Id) -> AdminResult<User> {
        envelope_data(self.get(&format!("/users/{}", id)).await?)
    }

    async fn create_user(&self, user: NewUser) -> AdminResult<User> {
        envelope_data(self.post("/users", &user).await?)
    }

    async fn update_user(&self, id: &Id, user: UserUpdate) -> AdminResult<User> {
        envelope_data(self.put(&format!("/users/{}", id), &user).await?)
    }

    async fn delete_user(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/users/{}", id)).await
    }

    async fn activate_user(&self, id: &Id) -> AdminResult<()> {
        self.patch_empty(&format!("/users/{}/activate", id)).await
    }

    async fn deactivate_user(&self, id: &Id) -> AdminResult<()> {
        self.patch_empty(&format!("/users/{}/deactivate", id)).await
    }

    async fn reset_password(&self, id: &Id) -> AdminResult<()> {
        self.patch_empty(&format!("/users/{}/reset-password", id))
            .await
    }
}

#[async_trait::async_trait]
impl RoleApi for HttpApiClient {
    async fn list_roles(&self) -> AdminResult<Vec<RoleDefinition>> {
        envelope_data(self.get("/roles").await?)
    }

    async fn create_role(&self, role: NewRole) -> AdminResult<RoleDefinition> {
        envelope_data(self.post("/roles", &role).await?)
    }

    async fn update_role(&self, id: &Id, role: NewRole) -> AdminResult<RoleDefinition> {
        envelope_data(self.put(&format!("/roles/{}", id), &role).await?)
    }

    async fn delete_role(&self, id: &Id) -> AdminResult<()> {
        self.delete(&format!("/roles/{}", id)).await
    }

    async fn list_permissions(&self) -> AdminResult<Vec<Permission>> {
        envelope_data(self.get("/permissions").await?)
    }
}
