use std::sync::Arc;

use serde_json::Value;

use crate::error::{PlanboardError, Result};
use crate::ident::ObjectRef;
use crate::model::user::{EMAIL, PASSWORD_HASH, USERNAME};
use crate::model::{
    from_document, from_documents, now_millis, to_document, NewUser, User, UserRecord,
    UserUpdate, UPDATED_AT,
};
use crate::store::{Collection, DocumentStore, Filter, FindOptions, Patch, ID_FIELD};

use super::{ListQuery, Page};

pub const EMAIL_TAKEN_MESSAGE: &str = "Email already registered";

#[derive(Clone)]
pub struct UserService {
    store: Arc<dyn DocumentStore>,
}

impl UserService {
    pub fn new(store: Arc<dyn DocumentStore>) -> Self {
        Self { store }
    }

    pub async fn create(&self, new: NewUser) -> Result<User> {
        let email = normalize_email(&new.email);
        self.ensure_email_free(&email, None).await?;

        let now = now_millis();
        let record = UserRecord {
            id: ObjectRef::new(),
            username: new.username,
            email,
            password_hash: new.password_hash,
            created_at: now,
            updated_at: now,
        };
        self.store
            .insert_one(Collection::Users, to_document(&record)?)
            .await?;
        tracing::info!(user_id = %record.id, "User created");
        Ok(record.into())
    }

    /// Username search plus an optional exact, case-insensitive email match.
    pub async fn find_all(&self, query: &ListQuery, email: Option<&str>) -> Result<Page<User>> {
        query.validate()?;
        let mut filter = query.search_filter(Filter::All, USERNAME)?;
        if let Some(email) = email.map(str::trim).filter(|email| !email.is_empty()) {
            filter = filter.and(Filter::eq_ignore_case(EMAIL, email)?);
        }

        let count = self.store.count(Collection::Users, &filter).await?;
        let docs = self
            .store
            .find(Collection::Users, &filter, &query.find_options())
            .await?;
        let records: Vec<UserRecord> = from_documents(docs)?;
        Ok(Page {
            data: records.into_iter().map(User::from).collect(),
            count,
        })
    }

    pub async fn find_by_id(&self, user_id: &str) -> Result<User> {
        let user_id = ObjectRef::decode(user_id)?;
        let doc = self
            .store
            .find_one(Collection::Users, &Filter::id(&user_id), &FindOptions::default())
            .await?
            .ok_or_else(|| PlanboardError::NotFound("User not found".to_string()))?;
        Ok(from_document::<UserRecord>(doc)?.into())
    }

    /// Full record including the password hash, for credential checks.
    pub async fn find_credentials_by_email(&self, email: &str) -> Result<Option<UserRecord>> {
        self.store
            .find_one(
                Collection::Users,
                &Filter::eq_ignore_case(EMAIL, email.trim())?,
                &FindOptions::default(),
            )
            .await?
            .map(from_document)
            .transpose()
    }

    pub async fn update(&self, user_id: &str, update: UserUpdate) -> Result<User> {
        let id = ObjectRef::decode(user_id)?;
        let email = update.email.as_deref().map(normalize_email);
        if let Some(email) = &email {
            self.ensure_email_free(email, Some(&id)).await?;
        }
        let patch = Patch::new()
            .set_opt(USERNAME, update.username)
            .set_opt(EMAIL, email)
            .set_opt(PASSWORD_HASH, update.password_hash)
            .stamp(UPDATED_AT, now_millis());

        let result = self
            .store
            .update_one(Collection::Users, &Filter::id(&id), &patch)
            .await?;
        if result.modified == 0 {
            return Err(PlanboardError::NotFound(
                "User not found or no changes".to_string(),
            ));
        }
        self.find_by_id(user_id).await
    }

    pub async fn delete(&self, user_id: &str) -> Result<String> {
        let id = ObjectRef::decode(user_id)?;
        let removed = self
            .store
            .delete_one(Collection::Users, &Filter::id(&id))
            .await?;
        if removed.deleted == 0 {
            return Err(PlanboardError::NotFound("User not found".to_string()));
        }
        Ok("User deleted successfully".to_string())
    }

    /// Emails compare case-insensitively; `owner` may keep its own address.
    async fn ensure_email_free(&self, email: &str, owner: Option<&ObjectRef>) -> Result<()> {
        let holders = self
            .store
            .find(
                Collection::Users,
                &Filter::eq_ignore_case(EMAIL, email)?,
                &FindOptions::default(),
            )
            .await?;
        let owner = owner.map(ObjectRef::to_hex);
        let taken = holders
            .iter()
            .any(|doc| doc.get(ID_FIELD).and_then(Value::as_str) != owner.as_deref());
        if taken {
            return Err(PlanboardError::InvalidInput(EMAIL_TAKEN_MESSAGE.to_string()));
        }
        Ok(())
    }
}

fn normalize_email(raw: &str) -> String {
    raw.trim().to_lowercase()
}
