//! Rewriter (component C8, spec §4.8): one generic iterate-and-rewrite
//! primitive backing rename, delete, and message-copy.

use crate::error::Result;
use crate::key;
use crate::storage::{AnnotationDb, Selector};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RewriteMode {
    Move,
    Copy,
}

pub struct RewriteRequest<'a> {
    pub old_mailbox: &'a str,
    pub old_uid: u32,
    pub old_user_id: Option<&'a str>,
    pub new_mailbox: Option<&'a str>,
    pub new_uid: u32,
    pub new_user_id: Option<&'a str>,
    pub mode: RewriteMode,
}

/// Iterates every key whose prefix matches `(old_mailbox, old_uid)`, and
/// for each, optionally writes the transformed record and optionally
/// deletes the original, under one transaction.
pub async fn rewrite(db: &dyn AnnotationDb, req: RewriteRequest<'_>) -> Result<()> {
    let prefix = key::encode_scope_prefix(req.old_mailbox, req.old_uid);
    let records = db.fetch(&Selector::Prefix(prefix)).await?;

    let mut txn = db.begin();
    for record in &records {
        let decoded = match key::decode(&record.key) {
            Ok(d) => d,
            Err(_) => {
                tracing::warn!("skipping malformed annotation key during rewrite");
                continue;
            }
        };

        if let Some(new_mailbox) = req.new_mailbox {
            let mapped_user_id = match req.old_user_id {
                Some(old_user_id) if decoded.user_id == old_user_id => req.new_user_id.unwrap_or(&decoded.user_id),
                _ => &decoded.user_id,
            };
            let (new_key, _) = key::encode(new_mailbox, req.new_uid, &decoded.entry, Some(mapped_user_id));
            txn.put(new_key, record.value.clone());
        }

        if req.mode == RewriteMode::Move {
            txn.delete(record.key.clone());
        }
    }

    db.commit(txn).await?;
    Ok(())
}

/// `rename_mailbox` = rewrite with `uid = 0`. `old_user_id`/`new_user_id`
/// additionally rename the matching private records' owner (spec §6:
/// `rename_mailbox(old_mbox, new_mbox, old_user_id?, new_user_id?)`), e.g.
/// when a user account itself is renamed alongside its mailbox.
pub async fn rename_mailbox(
    db: &dyn AnnotationDb,
    old_mailbox: &str,
    new_mailbox: &str,
    old_user_id: Option<&str>,
    new_user_id: Option<&str>,
) -> Result<()> {
    rewrite(
        db,
        RewriteRequest {
            old_mailbox,
            old_uid: 0,
            old_user_id,
            new_mailbox: Some(new_mailbox),
            new_uid: 0,
            new_user_id,
            mode: RewriteMode::Move,
        },
    )
    .await
}

/// `delete_mailbox` = rewrite with `new_mailbox` absent (deletes every
/// matching record).
pub async fn delete_mailbox(db: &dyn AnnotationDb, mailbox: &str) -> Result<()> {
    rewrite(
        db,
        RewriteRequest {
            old_mailbox: mailbox,
            old_uid: 0,
            old_user_id: None,
            new_mailbox: None,
            new_uid: 0,
            new_user_id: None,
            mode: RewriteMode::Move,
        },
    )
    .await
}

/// `copy_message` = rewrite in copy mode with both uids set. `user_id`
/// (spec §6: `copy_message(old_mbox, old_uid, new_mbox, new_uid, user_id)`)
/// scopes the copy to one user's private records when set; shared
/// records and other users' private records are copied regardless.
pub async fn copy_message(
    db: &dyn AnnotationDb,
    old_mailbox: &str,
    old_uid: u32,
    new_mailbox: &str,
    new_uid: u32,
    user_id: Option<&str>,
) -> Result<()> {
    rewrite(
        db,
        RewriteRequest {
            old_mailbox,
            old_uid,
            old_user_id: user_id,
            new_mailbox: Some(new_mailbox),
            new_uid,
            new_user_id: user_id,
            mode: RewriteMode::Copy,
        },
    )
    .await
}
