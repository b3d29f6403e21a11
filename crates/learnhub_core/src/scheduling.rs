//! crates/learnhub_core/src/scheduling.rs
//!
//! Mentor sessions and video calls, stored under one key in one tagged shape.
//!
//! Older stores hold sessions in one of two legacy layouts: the mock-database
//! record (`mentorId`/`studentId`/`date`) and the ad hoc call descriptor
//! written by the scheduling modal (`roomId`/`participants`). Both are upgraded
//! to [`Session`] when read.

use chrono::{DateTime, Duration, Utc};
use rand::Rng;
use serde::{Deserialize, Serialize};
use tracing::info;
use uuid::Uuid;

use crate::domain::{Session, SessionKind, SessionStatus};
use crate::ports::{PortError, PortResult};
use crate::records::{keys, Records};

const DEFAULT_DURATION_MINUTES: u32 = 60;
const ROOM_CODE_LEN: usize = 8;

/// A session as found in storage, in any of the shapes ever written.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(untagged)]
enum StoredSession {
    Current(Session),
    LegacyMentor(LegacyMentorSession),
    LegacyCall(LegacyCallSession),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyMentorSession {
    id: Uuid,
    mentor_id: Uuid,
    student_id: Uuid,
    date: DateTime<Utc>,
    #[serde(default)]
    duration: Option<u32>,
    #[serde(default)]
    topic: Option<String>,
    #[serde(default)]
    status: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
struct LegacyCallSession {
    id: Uuid,
    room_id: String,
    participants: Vec<Uuid>,
    #[serde(default)]
    created_at: Option<DateTime<Utc>>,
    #[serde(default)]
    active: bool,
}

fn legacy_status(raw: Option<&str>) -> SessionStatus {
    match raw.map(str::to_ascii_lowercase).as_deref() {
        Some("completed") | Some("ended") => SessionStatus::Ended,
        Some("cancelled") | Some("canceled") => SessionStatus::Cancelled,
        Some("active") | Some("live") | Some("in-progress") => SessionStatus::Live,
        _ => SessionStatus::Scheduled,
    }
}

impl From<StoredSession> for Session {
    fn from(stored: StoredSession) -> Self {
        match stored {
            StoredSession::Current(session) => session,
            StoredSession::LegacyMentor(old) => Session {
                id: old.id,
                status: legacy_status(old.status.as_deref()),
                created_at: old.date,
                kind: SessionKind::MentorSession {
                    mentor_id: old.mentor_id,
                    student_id: old.student_id,
                    scheduled_for: old.date,
                    duration_minutes: old.duration.unwrap_or(DEFAULT_DURATION_MINUTES),
                    topic: old.topic.unwrap_or_default(),
                },
            },
            StoredSession::LegacyCall(old) => {
                let mut participants = old.participants.into_iter();
                let host_id = participants.next().unwrap_or_else(Uuid::nil);
                Session {
                    id: old.id,
                    status: if old.active {
                        SessionStatus::Live
                    } else {
                        SessionStatus::Ended
                    },
                    created_at: old.created_at.unwrap_or_else(Utc::now),
                    kind: SessionKind::VideoCall {
                        host_id,
                        participants: participants.collect(),
                        room_code: old.room_id,
                    },
                }
            }
        }
    }
}

/// Sessions are always written back in the current shape.
fn normalize(stored: &mut Vec<StoredSession>) -> Vec<Session> {
    let sessions: Vec<Session> = stored.drain(..).map(Session::from).collect();
    stored.extend(sessions.iter().cloned().map(StoredSession::Current));
    sessions
}

#[derive(Debug, Clone)]
pub struct MentorSessionRequest {
    pub mentor_id: Uuid,
    pub student_id: Uuid,
    pub scheduled_for: DateTime<Utc>,
    pub duration_minutes: Option<u32>,
    pub topic: String,
}

#[derive(Clone)]
pub struct SessionService {
    records: Records,
}

impl SessionService {
    pub fn new(records: Records) -> Self {
        Self { records }
    }

    pub async fn all(&self) -> PortResult<Vec<Session>> {
        let stored: Vec<StoredSession> = self.records.load(keys::SESSIONS).await?;
        Ok(stored.into_iter().map(Session::from).collect())
    }

    /// Sessions `user_id` takes part in, soonest first.
    pub async fn for_user(&self, user_id: Uuid) -> PortResult<Vec<Session>> {
        let mut sessions: Vec<Session> = self
            .all()
            .await?
            .into_iter()
            .filter(|s| s.involves(user_id))
            .collect();
        sessions.sort_by_key(starts_at);
        Ok(sessions)
    }

    pub async fn get(&self, session_id: Uuid) -> PortResult<Session> {
        self.all()
            .await?
            .into_iter()
            .find(|s| s.id == session_id)
            .ok_or_else(|| PortError::NotFound(format!("Session {session_id} not found")))
    }

    pub async fn schedule_mentor_session(&self, request: MentorSessionRequest) -> PortResult<Session> {
        if request.mentor_id == request.student_id {
            return Err(PortError::InvalidInput(
                "A mentor cannot book a session with themselves".to_string(),
            ));
        }
        if request.scheduled_for < Utc::now() - Duration::minutes(5) {
            return Err(PortError::InvalidInput(
                "Sessions cannot be scheduled in the past".to_string(),
            ));
        }
        let duration_minutes = request.duration_minutes.unwrap_or(DEFAULT_DURATION_MINUTES);
        if duration_minutes == 0 || duration_minutes > 240 {
            return Err(PortError::InvalidInput(
                "Duration must be between 1 and 240 minutes".to_string(),
            ));
        }

        let session = Session {
            id: Uuid::new_v4(),
            status: SessionStatus::Scheduled,
            created_at: Utc::now(),
            kind: SessionKind::MentorSession {
                mentor_id: request.mentor_id,
                student_id: request.student_id,
                scheduled_for: request.scheduled_for,
                duration_minutes,
                topic: request.topic.trim().to_string(),
            },
        };
        self.insert(session.clone()).await?;
        info!(session_id = %session.id, mentor_id = %request.mentor_id, "mentor session scheduled");
        Ok(session)
    }

    /// Opens an instant call hosted by `host_id`.
    pub async fn start_video_call(&self, host_id: Uuid, invitees: Vec<Uuid>) -> PortResult<Session> {
        let mut participants: Vec<Uuid> = Vec::new();
        for id in invitees {
            if id != host_id && !participants.contains(&id) {
                participants.push(id);
            }
        }
        let session = Session {
            id: Uuid::new_v4(),
            status: SessionStatus::Live,
            created_at: Utc::now(),
            kind: SessionKind::VideoCall {
                host_id,
                participants,
                room_code: room_code(&mut rand::thread_rng()),
            },
        };
        self.insert(session.clone()).await?;
        info!(session_id = %session.id, %host_id, "video call started");
        Ok(session)
    }

    async fn insert(&self, session: Session) -> PortResult<()> {
        self.records
            .update(keys::SESSIONS, move |stored: &mut Vec<StoredSession>| {
                normalize(stored);
                stored.push(StoredSession::Current(session));
                Ok(())
            })
            .await
    }

    /// Joins a session. Mentor sessions only admit their two members; calls admit anyone.
    pub async fn join(&self, session_id: Uuid, user_id: Uuid) -> PortResult<Session> {
        self.transition(session_id, move |session| {
            if !session.status.is_open() {
                return Err(PortError::Conflict("Session is no longer open".to_string()));
            }
            let is_member = session.involves(user_id);
            match &mut session.kind {
                SessionKind::MentorSession { .. } => {
                    if !is_member {
                        return Err(PortError::Unauthorized);
                    }
                }
                SessionKind::VideoCall {
                    host_id,
                    participants,
                    ..
                } => {
                    if *host_id != user_id && !participants.contains(&user_id) {
                        participants.push(user_id);
                    }
                }
            }
            session.status = SessionStatus::Live;
            Ok(())
        })
        .await
    }

    /// Leaves a call. Guests come and go; the call ends when the host leaves.
    pub async fn leave(&self, session_id: Uuid, user_id: Uuid) -> PortResult<Session> {
        self.transition(session_id, move |session| {
            if !session.involves(user_id) {
                return Err(PortError::Unauthorized);
            }
            if let SessionKind::VideoCall {
                host_id,
                participants,
                ..
            } = &mut session.kind
            {
                participants.retain(|p| *p != user_id);
                if *host_id == user_id {
                    session.status = SessionStatus::Ended;
                }
            }
            Ok(())
        })
        .await
    }

    pub async fn end(&self, session_id: Uuid, user_id: Uuid) -> PortResult<Session> {
        self.transition(session_id, move |session| {
            if !session.involves(user_id) {
                return Err(PortError::Unauthorized);
            }
            if session.status == SessionStatus::Cancelled {
                return Err(PortError::Conflict("Session was cancelled".to_string()));
            }
            session.status = SessionStatus::Ended;
            Ok(())
        })
        .await
    }

    pub async fn cancel(&self, session_id: Uuid, user_id: Uuid) -> PortResult<Session> {
        self.transition(session_id, move |session| {
            if !session.involves(user_id) {
                return Err(PortError::Unauthorized);
            }
            if session.status != SessionStatus::Scheduled {
                return Err(PortError::Conflict(
                    "Only scheduled sessions can be cancelled".to_string(),
                ));
            }
            session.status = SessionStatus::Cancelled;
            Ok(())
        })
        .await
    }

    async fn transition<F>(&self, session_id: Uuid, apply: F) -> PortResult<Session>
    where
        F: FnOnce(&mut Session) -> PortResult<()> + Send + 'static,
    {
        let session = self
            .records
            .update(keys::SESSIONS, move |stored: &mut Vec<StoredSession>| {
                let mut sessions = normalize(stored);
                let session = sessions
                    .iter_mut()
                    .find(|s| s.id == session_id)
                    .ok_or_else(|| PortError::NotFound(format!("Session {session_id} not found")))?;
                apply(session)?;
                let updated = session.clone();
                stored.clear();
                stored.extend(sessions.into_iter().map(StoredSession::Current));
                Ok(updated)
            })
            .await?;
        info!(session_id = %session.id, status = ?session.status, "session updated");
        Ok(session)
    }
}

fn starts_at(session: &Session) -> DateTime<Utc> {
    match &session.kind {
        SessionKind::MentorSession { scheduled_for, .. } => *scheduled_for,
        SessionKind::VideoCall { .. } => session.created_at,
    }
}

fn room_code<R: Rng>(rng: &mut R) -> String {
    const ALPHABET: &[u8] = b"ABCDEFGHJKLMNPQRSTUVWXYZ23456789";
    (0..ROOM_CODE_LEN)
        .map(|_| ALPHABET[rng.gen_range(0..ALPHABET.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::memory::MemoryStore;
    use pretty_assertions::assert_eq;
    use std::sync::Arc;

    fn service_with(entries: Vec<(&str, String)>) -> SessionService {
        SessionService::new(Records::new(Arc::new(MemoryStore::with_entries(entries))))
    }

    fn request(mentor: Uuid, student: Uuid) -> MentorSessionRequest {
        MentorSessionRequest {
            mentor_id: mentor,
            student_id: student,
            scheduled_for: Utc::now() + Duration::days(1),
            duration_minutes: None,
            topic: " Career goals ".to_string(),
        }
    }

    #[tokio::test]
    async fn unified_session_serializes_with_kind_tag() {
        let service = service_with(vec![]);
        let mentor = Uuid::new_v4();
        let session = service
            .schedule_mentor_session(request(mentor, Uuid::new_v4()))
            .await
            .unwrap();
        let json = serde_json::to_value(&session).unwrap();
        assert_eq!(json["kind"], "mentorSession");
        assert_eq!(json["status"], "scheduled");
        assert_eq!(json["topic"], "Career goals");
        let back: Session = serde_json::from_value(json).unwrap();
        assert_eq!(back, session);
    }

    #[tokio::test]
    async fn legacy_shapes_are_upgraded_on_read() {
        let mentor = Uuid::new_v4();
        let student = Uuid::new_v4();
        let mock_id = Uuid::new_v4();
        let call_id = Uuid::new_v4();
        let legacy = serde_json::json!([
            {
                "id": mock_id,
                "mentorId": mentor,
                "studentId": student,
                "date": "2030-01-01T10:00:00Z",
                "status": "completed"
            },
            {
                "id": call_id,
                "roomId": "ROOM42",
                "participants": [student, mentor],
                "active": true
            }
        ]);
        let service = service_with(vec![(keys::SESSIONS, legacy.to_string())]);

        let mock = service.get(mock_id).await.unwrap();
        assert_eq!(mock.status, SessionStatus::Ended);
        match mock.kind {
            SessionKind::MentorSession {
                duration_minutes, ..
            } => assert_eq!(duration_minutes, DEFAULT_DURATION_MINUTES),
            other => panic!("unexpected kind {other:?}"),
        }

        let call = service.get(call_id).await.unwrap();
        assert_eq!(call.status, SessionStatus::Live);
        assert_eq!(call.members(), vec![student, mentor]);
    }

    #[tokio::test]
    async fn writes_rewrite_legacy_records_in_current_shape() {
        let student = Uuid::new_v4();
        let call_id = Uuid::new_v4();
        let legacy = serde_json::json!([
            { "id": call_id, "roomId": "R", "participants": [student], "active": true }
        ]);
        let store = Arc::new(MemoryStore::with_entries([(keys::SESSIONS, legacy.to_string())]));
        let service = SessionService::new(Records::new(store.clone()));

        service.start_video_call(Uuid::new_v4(), vec![]).await.unwrap();

        use crate::ports::KeyValueStore;
        let raw = store.get(keys::SESSIONS).await.unwrap().unwrap();
        let values: Vec<serde_json::Value> = serde_json::from_str(&raw).unwrap();
        assert_eq!(values.len(), 2);
        assert!(values.iter().all(|v| v["kind"] == "videoCall"));
    }

    #[tokio::test]
    async fn scheduling_rejects_self_booking_and_past_dates() {
        let service = service_with(vec![]);
        let me = Uuid::new_v4();
        assert!(matches!(
            service.schedule_mentor_session(request(me, me)).await,
            Err(PortError::InvalidInput(_))
        ));

        let mut past = request(me, Uuid::new_v4());
        past.scheduled_for = Utc::now() - Duration::days(1);
        assert!(matches!(
            service.schedule_mentor_session(past).await,
            Err(PortError::InvalidInput(_))
        ));
    }

    #[tokio::test]
    async fn outsiders_cannot_join_mentor_sessions_but_can_join_calls() {
        let service = service_with(vec![]);
        let mentor = Uuid::new_v4();
        let student = Uuid::new_v4();
        let outsider = Uuid::new_v4();

        let booked = service
            .schedule_mentor_session(request(mentor, student))
            .await
            .unwrap();
        assert!(matches!(
            service.join(booked.id, outsider).await,
            Err(PortError::Unauthorized)
        ));
        let live = service.join(booked.id, student).await.unwrap();
        assert_eq!(live.status, SessionStatus::Live);

        let call = service.start_video_call(mentor, vec![student, student, mentor]).await.unwrap();
        assert_eq!(call.members(), vec![mentor, student]);
        let joined = service.join(call.id, outsider).await.unwrap();
        assert_eq!(joined.members(), vec![mentor, student, outsider]);
    }

    #[tokio::test]
    async fn call_stays_live_while_host_remains() {
        let service = service_with(vec![]);
        let host = Uuid::new_v4();
        let guest = Uuid::new_v4();
        let call = service.start_video_call(host, vec![guest]).await.unwrap();

        let after_guest = service.leave(call.id, guest).await.unwrap();
        assert_eq!(after_guest.members(), vec![host]);
        assert_eq!(after_guest.status, SessionStatus::Live);

        let rejoined = service.join(call.id, guest).await.unwrap();
        assert_eq!(rejoined.members(), vec![host, guest]);

        let after_host = service.leave(call.id, host).await.unwrap();
        assert_eq!(after_host.status, SessionStatus::Ended);
    }

    #[tokio::test]
    async fn only_scheduled_sessions_can_be_cancelled() {
        let service = service_with(vec![]);
        let mentor = Uuid::new_v4();
        let student = Uuid::new_v4();
        let booked = service
            .schedule_mentor_session(request(mentor, student))
            .await
            .unwrap();
        let cancelled = service.cancel(booked.id, student).await.unwrap();
        assert_eq!(cancelled.status, SessionStatus::Cancelled);
        assert!(matches!(
            service.join(booked.id, student).await,
            Err(PortError::Conflict(_))
        ));
        assert!(matches!(
            service.end(booked.id, mentor).await,
            Err(PortError::Conflict(_))
        ));
    }

    #[tokio::test]
    async fn for_user_lists_only_own_sessions_soonest_first() {
        let service = service_with(vec![]);
        let mentor = Uuid::new_v4();
        let student = Uuid::new_v4();

        let mut later = request(mentor, student);
        later.scheduled_for = Utc::now() + Duration::days(3);
        let later = service.schedule_mentor_session(later).await.unwrap();
        let sooner = service
            .schedule_mentor_session(request(mentor, student))
            .await
            .unwrap();
        service
            .schedule_mentor_session(request(mentor, Uuid::new_v4()))
            .await
            .unwrap();

        let mine: Vec<Uuid> = service
            .for_user(student)
            .await
            .unwrap()
            .into_iter()
            .map(|s| s.id)
            .collect();
        assert_eq!(mine, vec![sooner.id, later.id]);
    }

    #[test]
    fn room_codes_use_unambiguous_alphabet() {
        let code = room_code(&mut crate::leaderboard::rng_for(Some(3)));
        assert_eq!(code.len(), ROOM_CODE_LEN);
        assert!(code.chars().all(|c| !"01IO".contains(c)));
    }
}
