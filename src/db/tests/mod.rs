
use crate::db::NewComment;
use chrono::{DateTime, TimeZone, Utc};

fn at_millis(millis: i64) -> DateTime<Utc> {
    Utc.timestamp_millis_opt(millis).unwrap()
}

fn new_comment(external_id: i64, millis: i64) -> NewComment {
    NewComment {
        external_id,
        group_id: 1,
        name: "id labore ex et quam laborum".to_string(),
        email: "Eliseo@gardner.biz".to_string(),
        body: "laudantium enim quasi est quidem magnam".to_string(),
        created_at: at_millis(millis),
        updated_at: at_millis(millis),
    }
}
