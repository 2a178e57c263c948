use anyhow::Result;

use giftlist_types::events::{NotificationKind, NotificationPayload};
use giftlist_types::models::Id;

use crate::Database;
use crate::models::{
    ClaimOutcome, NotificationRow, Picture, PresentDetailsRow, PresentRow, RecipientRow,
    ReleaseOutcome, SessionRow, UserRow, Viewer, WriteOutcome,
};
use crate::queries::{notifications, presents, recipients, sessions, users};

/// Persistence capabilities the HTTP layer relies on. Calls are blocking;
/// async callers should run them on `spawn_blocking`.
pub trait GiftStore: Send + Sync {
    // -- Users --
    fn create_user(&self, username: &str, password_hash: &str) -> Result<WriteOutcome<UserRow>>;
    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>>;
    fn get_user_by_id(&self, id: Id) -> Result<Option<UserRow>>;

    // -- Sessions --
    fn create_session(&self, id: &str, user_id: Id, username: &str, expires_at: i64) -> Result<()>;
    fn get_session(&self, id: &str, now: i64) -> Result<Option<SessionRow>>;
    fn delete_session(&self, id: &str) -> Result<()>;
    fn delete_expired_sessions(&self, now: i64) -> Result<usize>;

    // -- Recipients --
    fn list_recipients(&self) -> Result<Vec<RecipientRow>>;
    fn get_recipient(&self, id: Id) -> Result<Option<RecipientRow>>;
    fn find_recipient_by_name(&self, name: &str) -> Result<Option<RecipientRow>>;
    fn identified_recipient(&self, user_id: Id) -> Result<Option<Id>>;
    fn create_recipient(&self, name: &str, created_by: Id) -> Result<WriteOutcome<RecipientRow>>;
    fn rename_recipient(&self, id: Id, name: &str) -> Result<WriteOutcome<RecipientRow>>;
    fn delete_recipient(&self, id: Id) -> Result<bool>;
    fn claim_recipient(&self, id: Id, user_id: Id) -> Result<ClaimOutcome>;
    fn release_recipient(&self, id: Id, user_id: Id) -> Result<ReleaseOutcome>;
    fn set_picture_data(&self, id: Id, mime: &str, bytes: &[u8]) -> Result<bool>;
    fn set_picture_url(&self, id: Id, url: &str) -> Result<bool>;
    fn get_picture(&self, id: Id) -> Result<Option<Picture>>;

    // -- Presents --
    fn list_presents(&self, viewer: Viewer, recipient_id: Option<Id>) -> Result<Vec<PresentRow>>;
    fn list_present_details(&self, viewer: Viewer) -> Result<Vec<PresentDetailsRow>>;
    fn get_present(&self, id: Id) -> Result<Option<PresentRow>>;
    fn create_present(
        &self,
        title: &str,
        comments: Option<&str>,
        recipient_id: Id,
        created_by: Id,
    ) -> Result<WriteOutcome<PresentRow>>;
    fn update_present(
        &self,
        id: Id,
        title: &str,
        comments: Option<&str>,
        recipient_id: Option<Id>,
    ) -> Result<WriteOutcome<PresentRow>>;
    fn set_checked(&self, id: Id, checked: Option<bool>) -> Result<Option<PresentRow>>;
    fn delete_present(&self, id: Id) -> Result<bool>;
    fn reserve_present(&self, id: Id, user_id: Id) -> Result<ClaimOutcome>;
    fn unreserve_present(&self, id: Id, user_id: Id) -> Result<ReleaseOutcome>;

    // -- Notifications --
    fn insert_notification(
        &self,
        kind: NotificationKind,
        actor_id: Option<Id>,
        payload: &NotificationPayload,
        now_ms: i64,
    ) -> Result<Id>;
    fn notifications_since(&self, viewer: Viewer, since: i64, limit: u32) -> Result<Vec<NotificationRow>>;
    fn latest_notification_timestamp(&self, viewer: Viewer) -> Result<Option<i64>>;
    fn list_notifications(&self, viewer: Viewer, limit: u32, offset: u32) -> Result<Vec<NotificationRow>>;
    fn count_notifications(&self, viewer: Viewer) -> Result<u64>;
    fn count_unread(&self, viewer: Viewer) -> Result<u64>;
    fn mark_read(&self, viewer: Viewer, id: Id) -> Result<bool>;
    fn mark_all_read(&self, viewer: Viewer) -> Result<u64>;
}

impl GiftStore for Database {
    fn create_user(&self, username: &str, password_hash: &str) -> Result<WriteOutcome<UserRow>> {
        self.with_conn_mut(|conn| users::create_user(conn, username, password_hash))
    }

    fn get_user_by_username(&self, username: &str) -> Result<Option<UserRow>> {
        self.with_conn(|conn| users::user_by_username(conn, username))
    }

    fn get_user_by_id(&self, id: Id) -> Result<Option<UserRow>> {
        self.with_conn(|conn| users::user_by_id(conn, id))
    }

    fn create_session(&self, id: &str, user_id: Id, username: &str, expires_at: i64) -> Result<()> {
        self.with_conn_mut(|conn| sessions::create_session(conn, id, user_id, username, expires_at))
    }

    fn get_session(&self, id: &str, now: i64) -> Result<Option<SessionRow>> {
        self.with_conn(|conn| sessions::live_session(conn, id, now))
    }

    fn delete_session(&self, id: &str) -> Result<()> {
        self.with_conn_mut(|conn| sessions::delete_session(conn, id))
    }

    fn delete_expired_sessions(&self, now: i64) -> Result<usize> {
        self.with_conn_mut(|conn| sessions::delete_expired_sessions(conn, now))
    }

    fn list_recipients(&self) -> Result<Vec<RecipientRow>> {
        self.with_conn(recipients::list_recipients)
    }

    fn get_recipient(&self, id: Id) -> Result<Option<RecipientRow>> {
        self.with_conn(|conn| recipients::recipient_by_id(conn, id))
    }

    fn find_recipient_by_name(&self, name: &str) -> Result<Option<RecipientRow>> {
        self.with_conn(|conn| recipients::recipient_by_name(conn, name))
    }

    fn identified_recipient(&self, user_id: Id) -> Result<Option<Id>> {
        self.with_conn(|conn| recipients::identified_recipient(conn, user_id))
    }

    fn create_recipient(&self, name: &str, created_by: Id) -> Result<WriteOutcome<RecipientRow>> {
        self.with_conn_mut(|conn| recipients::create_recipient(conn, name, created_by))
    }

    fn rename_recipient(&self, id: Id, name: &str) -> Result<WriteOutcome<RecipientRow>> {
        self.with_conn_mut(|conn| recipients::rename_recipient(conn, id, name))
    }

    fn delete_recipient(&self, id: Id) -> Result<bool> {
        self.with_conn_mut(|conn| recipients::delete_recipient(conn, id))
    }

    fn claim_recipient(&self, id: Id, user_id: Id) -> Result<ClaimOutcome> {
        self.with_conn_mut(|conn| recipients::claim_recipient(conn, id, user_id))
    }

    fn release_recipient(&self, id: Id, user_id: Id) -> Result<ReleaseOutcome> {
        self.with_conn_mut(|conn| recipients::release_recipient(conn, id, user_id))
    }

    fn set_picture_data(&self, id: Id, mime: &str, bytes: &[u8]) -> Result<bool> {
        self.with_conn_mut(|conn| recipients::set_picture_data(conn, id, mime, bytes))
    }

    fn set_picture_url(&self, id: Id, url: &str) -> Result<bool> {
        self.with_conn_mut(|conn| recipients::set_picture_url(conn, id, url))
    }

    fn get_picture(&self, id: Id) -> Result<Option<Picture>> {
        self.with_conn(|conn| recipients::picture(conn, id))
    }

    fn list_presents(&self, viewer: Viewer, recipient_id: Option<Id>) -> Result<Vec<PresentRow>> {
        self.with_conn(|conn| presents::list_presents(conn, viewer, recipient_id))
    }

    fn list_present_details(&self, viewer: Viewer) -> Result<Vec<PresentDetailsRow>> {
        self.with_conn(|conn| presents::list_present_details(conn, viewer))
    }

    fn get_present(&self, id: Id) -> Result<Option<PresentRow>> {
        self.with_conn(|conn| presents::present_by_id(conn, id))
    }

    fn create_present(
        &self,
        title: &str,
        comments: Option<&str>,
        recipient_id: Id,
        created_by: Id,
    ) -> Result<WriteOutcome<PresentRow>> {
        self.with_conn_mut(|conn| presents::create_present(conn, title, comments, recipient_id, created_by))
    }

    fn update_present(
        &self,
        id: Id,
        title: &str,
        comments: Option<&str>,
        recipient_id: Option<Id>,
    ) -> Result<WriteOutcome<PresentRow>> {
        self.with_conn_mut(|conn| presents::update_present(conn, id, title, comments, recipient_id))
    }

    fn set_checked(&self, id: Id, checked: Option<bool>) -> Result<Option<PresentRow>> {
        self.with_conn_mut(|conn| presents::set_checked(conn, id, checked))
    }

    fn delete_present(&self, id: Id) -> Result<bool> {
        self.with_conn_mut(|conn| presents::delete_present(conn, id))
    }

    fn reserve_present(&self, id: Id, user_id: Id) -> Result<ClaimOutcome> {
        self.with_conn_mut(|conn| presents::reserve_present(conn, id, user_id))
    }

    fn unreserve_present(&self, id: Id, user_id: Id) -> Result<ReleaseOutcome> {
        self.with_conn_mut(|conn| presents::unreserve_present(conn, id, user_id))
    }

    fn insert_notification(
        &self,
        kind: NotificationKind,
        actor_id: Option<Id>,
        payload: &NotificationPayload,
        now_ms: i64,
    ) -> Result<Id> {
        self.with_conn_mut(|conn| notifications::insert_notification(conn, kind, actor_id, payload, now_ms))
    }

    fn notifications_since(&self, viewer: Viewer, since: i64, limit: u32) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| notifications::notifications_since(conn, viewer, since, limit))
    }

    fn latest_notification_timestamp(&self, viewer: Viewer) -> Result<Option<i64>> {
        self.with_conn(|conn| notifications::latest_timestamp(conn, viewer))
    }

    fn list_notifications(&self, viewer: Viewer, limit: u32, offset: u32) -> Result<Vec<NotificationRow>> {
        self.with_conn(|conn| notifications::list_notifications(conn, viewer, limit, offset))
    }

    fn count_notifications(&self, viewer: Viewer) -> Result<u64> {
        self.with_conn(|conn| notifications::count_notifications(conn, viewer))
    }

    fn count_unread(&self, viewer: Viewer) -> Result<u64> {
        self.with_conn(|conn| notifications::count_unread(conn, viewer))
    }

    fn mark_read(&self, viewer: Viewer, id: Id) -> Result<bool> {
        self.with_conn_mut(|conn| notifications::mark_read(conn, viewer, id))
    }

    fn mark_all_read(&self, viewer: Viewer) -> Result<u64> {
        self.with_conn_mut(|conn| notifications::mark_all_read(conn, viewer))
    }
}
