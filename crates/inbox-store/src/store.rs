//! `FirestoreInboxStore`: the `InboxStore` port backed by the `firestore`
//! crate, following the reference workspace's `StateDb` in keeping one
//! adapter responsible for all reads/writes against a single backend and
//! centralizing the one multi-write critical section.

use async_trait::async_trait;
use firestore::{FirestoreDb, FirestoreDbOptions};
use inbox_core::{CanonicalHash, ComputedInboxSummary, InboxError, PendingActionDoc, User};

use crate::model::{
    ComputedSummaryDoc, IdentityDoc, PendingActionFirestoreDoc, UserDoc,
};
use crate::port::InboxStore;

const PENDING_ACTIONS_SUBCOLLECTION: &str = "pendingActions";
const COMPUTED_STATE_SUBCOLLECTION: &str = "computedState";
const COMPUTED_STATE_DOC_ID: &str = "pending";
const ADIS_SUBCOLLECTION: &str = "adis";

pub struct FirestoreInboxStore {
    db: FirestoreDb,
    users_collection: String,
}

impl FirestoreInboxStore {
    pub async fn connect(
        project_id: &str,
        users_collection: impl Into<String>,
    ) -> Result<Self, InboxError> {
        let db = FirestoreDb::with_options(FirestoreDbOptions::new(project_id.to_string()))
            .await
            .map_err(|e| InboxError::Config(format!("firestore connect failed: {e}")))?;
        Ok(Self {
            db,
            users_collection: users_collection.into(),
        })
    }

    fn read_err(&self, uid: &str, e: impl std::fmt::Display) -> InboxError {
        InboxError::StoreRead {
            uid: uid.to_string(),
            message: e.to_string(),
        }
    }

    fn commit_err(&self, uid: &str, e: impl std::fmt::Display) -> InboxError {
        InboxError::StoreCommit {
            uid: uid.to_string(),
            message: e.to_string(),
        }
    }
}

#[async_trait]
impl InboxStore for FirestoreInboxStore {
    async fn list_users_with_identities(&self) -> Result<Vec<User>, InboxError> {
        let user_docs: Vec<UserDoc> = self
            .db
            .fluent()
            .select()
            .from(self.users_collection.as_str())
            .obj()
            .query()
            .await
            .map_err(|e| self.read_err("*", e))?;

        let mut users = Vec::new();
        for doc in user_docs {
            if !doc.onboarding_complete || !doc.key_vault_setup {
                continue;
            }
            let uid = doc.uid.clone();
            let parent = self
                .db
                .parent_path(&self.users_collection, &uid)
                .map_err(|e| self.read_err(&uid, e))?;

            let identity_docs: Vec<IdentityDoc> = self
                .db
                .fluent()
                .select()
                .from(ADIS_SUBCOLLECTION)
                .parent(&parent)
                .obj()
                .query()
                .await
                .map_err(|e| self.read_err(&uid, e))?;

            let identities = identity_docs.into_iter().filter_map(|d| d.into_domain()).collect();
            users.push(doc.into_domain(identities));
        }

        Ok(users)
    }

    async fn get_inbox(&self, uid: &str) -> Result<Vec<PendingActionDoc>, InboxError> {
        let parent = self
            .db
            .parent_path(&self.users_collection, uid)
            .map_err(|e| self.read_err(uid, e))?;

        let docs: Vec<PendingActionFirestoreDoc> = self
            .db
            .fluent()
            .select()
            .from(PENDING_ACTIONS_SUBCOLLECTION)
            .parent(&parent)
            .obj()
            .query()
            .await
            .map_err(|e| self.read_err(uid, e))?;

        Ok(docs.into_iter().map(|d| d.into_domain()).collect())
    }

    async fn get_summary(&self, uid: &str) -> Result<Option<ComputedInboxSummary>, InboxError> {
        let parent = self
            .db
            .parent_path(&self.users_collection, uid)
            .map_err(|e| self.read_err(uid, e))?;

        let doc: Option<ComputedSummaryDoc> = self
            .db
            .fluent()
            .select()
            .by_id_in(COMPUTED_STATE_SUBCOLLECTION)
            .parent(&parent)
            .obj()
            .one(COMPUTED_STATE_DOC_ID)
            .await
            .map_err(|e| self.read_err(uid, e))?;

        Ok(doc.map(|d| ComputedInboxSummary {
            total_count: d.total_count,
            urgent_count: d.urgent_count,
            initiated_by_user_count: d.initiated_by_user_count,
            requiring_signature_count: d.requiring_signature_count,
            tx_hashes: d.tx_hashes.into_iter().map(CanonicalHash::new).collect(),
            cycle_token: d.cycle_token,
            computed_at: d.computed_at,
        }))
    }

    async fn apply_inbox_diff(
        &self,
        uid: &str,
        upserts: Vec<PendingActionDoc>,
        remove_ids: Vec<CanonicalHash>,
        summary: ComputedInboxSummary,
    ) -> Result<(), InboxError> {
        let parent = self
            .db
            .parent_path(&self.users_collection, uid)
            .map_err(|e| self.commit_err(uid, e))?;

        let writer = self
            .db
            .create_simple_batch_writer()
            .await
            .map_err(|e| self.commit_err(uid, e))?;
        let mut batch = writer.new_batch();

        for hash in &remove_ids {
            batch
                .delete_by_id_at((&parent).into(), PENDING_ACTIONS_SUBCOLLECTION, hash.as_str(), None)
                .map_err(|e| self.commit_err(uid, e))?;
        }

        for doc in upserts {
            let doc_id = doc.hash.as_str().to_string();
            let wire: PendingActionFirestoreDoc = doc.into();
            batch
                .update_object_at(
                    (&parent).into(),
                    PENDING_ACTIONS_SUBCOLLECTION,
                    &doc_id,
                    &wire,
                    None,
                    None,
                    Vec::new(),
                )
                .map_err(|e| self.commit_err(uid, e))?;
        }

        let summary_wire: ComputedSummaryDoc = summary.into();
        batch
            .update_object_at(
                (&parent).into(),
                COMPUTED_STATE_SUBCOLLECTION,
                COMPUTED_STATE_DOC_ID,
                &summary_wire,
                None,
                None,
                Vec::new(),
            )
            .map_err(|e| self.commit_err(uid, e))?;

        batch.write().await.map_err(|e| self.commit_err(uid, e))?;
        Ok(())
    }

    async fn ping(&self) -> Result<(), InboxError> {
        self.db
            .fluent()
            .select()
            .from(self.users_collection.as_str())
            .limit(1)
            .obj::<UserDoc>()
            .query()
            .await
            .map_err(|e| InboxError::StoreRead {
                uid: "*".to_string(),
                message: e.to_string(),
            })?;
        Ok(())
    }
}
