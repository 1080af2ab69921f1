//! Mapping from remote comments to storable records

use crate::db::NewComment;
use crate::types::ExternalComment;
use chrono::{DateTime, SubsecRound, Utc};

/// Turn a fetched comment into a record ready for upsert
///
/// Both timestamps get the same value, truncated to milliseconds so that what is
/// stored is exactly what is returned.
pub fn to_new_comment(dto: ExternalComment) -> NewComment {
    to_new_comment_at(dto, Utc::now())
}

/// [`to_new_comment`] with an explicit clock reading
pub fn to_new_comment_at(dto: ExternalComment, now: DateTime<Utc>) -> NewComment {
    let now = now.trunc_subsecs(3);
    NewComment {
        external_id: dto.external_id,
        group_id: dto.group_id,
        name: dto.name,
        email: dto.email,
        body: dto.body,
        created_at: now,
        updated_at: now,
    }
}
