//! crates/learnhub_core/src/domain.rs
//!
//! Defines the core data structures for the learning platform.
//! Everything here is plain data: the records that live in the key-value store,
//! the mock catalog shapes, and the unified session representation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use uuid::Uuid;

//=========================================================================================
// Users and Roles
//=========================================================================================

/// The role a user plays on the platform. Decides which dashboard they see.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Student,
    Mentor,
    Teacher,
    Admin,
    MentorAdmin,
}

/// The dashboard variant rendered for a role.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DashboardKind {
    Student,
    Mentor,
    Admin,
}

impl Role {
    pub fn dashboard(self) -> DashboardKind {
        match self {
            Role::Student => DashboardKind::Student,
            Role::Mentor | Role::Teacher => DashboardKind::Mentor,
            Role::Admin | Role::MentorAdmin => DashboardKind::Admin,
        }
    }

    /// Administrative roles are only ever handed out by demo accounts or an operator.
    pub fn can_self_register(self) -> bool {
        !matches!(self, Role::Admin | Role::MentorAdmin)
    }

    pub fn as_str(self) -> &'static str {
        match self {
            Role::Student => "student",
            Role::Mentor => "mentor",
            Role::Teacher => "teacher",
            Role::Admin => "admin",
            Role::MentorAdmin => "mentor_admin",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Preferences {
    pub theme: String,
    pub language: String,
    pub email_notifications: bool,
}

impl Default for Preferences {
    fn default() -> Self {
        Self {
            theme: "light".to_string(),
            language: "en".to_string(),
            email_notifications: true,
        }
    }
}

/// Represents a user - used throughout app
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub email: String,
    pub role: Role,
    #[serde(default)]
    pub avatar: Option<String>,
    #[serde(default)]
    pub preferences: Preferences,
    /// Course id -> completion percentage. Filled from enrollments when served.
    #[serde(default)]
    pub progress: BTreeMap<String, u8>,
}

// Only used internally for local registration - contains the password hash
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LocalAccount {
    pub user: User,
    pub hashed_password: String,
}

// Represents a login session handed to a client as a bearer token
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuthSession {
    pub token: String,
    pub user: User,
    pub expires_at: DateTime<Utc>,
    /// Present when the session was opened against the external auth provider.
    #[serde(default)]
    pub provider_token: Option<String>,
}

//=========================================================================================
// Catalog
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonKind {
    Video,
    Document,
    Quiz,
    Assignment,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Lesson {
    pub id: String,
    pub title: String,
    pub kind: LessonKind,
    pub duration_minutes: u32,
    #[serde(default)]
    pub is_completed: bool,
    #[serde(default)]
    pub is_unlocked: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Module {
    pub id: String,
    pub title: String,
    pub lessons: Vec<Lesson>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Course {
    pub id: String,
    pub title: String,
    pub description: String,
    pub category: String,
    pub level: String,
    pub instructor: String,
    pub modules: Vec<Module>,
}

impl Course {
    /// Iterates lessons in course order (modules flattened).
    pub fn lessons(&self) -> impl Iterator<Item = &Lesson> {
        self.modules.iter().flat_map(|m| m.lessons.iter())
    }

    pub fn lesson(&self, lesson_id: &str) -> Option<&Lesson> {
        self.lessons().find(|l| l.id == lesson_id)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Mentor {
    pub id: String,
    pub name: String,
    pub title: String,
    pub expertise: Vec<String>,
    pub rating: f32,
    pub hourly_rate: u32,
    pub available: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Question {
    pub prompt: String,
    pub options: Vec<String>,
    pub correct_option: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Quiz {
    pub course_id: String,
    pub lesson_id: String,
    pub title: String,
    pub pass_percent: u8,
    pub questions: Vec<Question>,
}

//=========================================================================================
// Learning Records
//=========================================================================================

/// Links a user to a course with a progress percentage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Enrollment {
    pub user_id: Uuid,
    pub course_id: String,
    pub progress: u8,
    pub enrolled_at: DateTime<Utc>,
    #[serde(default)]
    pub completed_at: Option<DateTime<Utc>>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Certificate {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: String,
    pub issued_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AssignmentSubmission {
    pub id: Uuid,
    pub user_id: Uuid,
    pub course_id: String,
    pub lesson_id: String,
    pub content: String,
    pub submitted_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ChatAuthor {
    User,
    Assistant,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub id: Uuid,
    pub user_id: Uuid,
    pub from: ChatAuthor,
    pub text: String,
    pub sent_at: DateTime<Utc>,
}

//=========================================================================================
// Sessions (mentor meetings and video calls)
//=========================================================================================

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionStatus {
    Scheduled,
    Live,
    Ended,
    Cancelled,
}

impl SessionStatus {
    pub fn is_open(self) -> bool {
        matches!(self, SessionStatus::Scheduled | SessionStatus::Live)
    }
}

/// What a session is. The `kind` tag is the discriminator on the wire and in storage.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum SessionKind {
    #[serde(rename_all = "camelCase")]
    MentorSession {
        mentor_id: Uuid,
        student_id: Uuid,
        scheduled_for: DateTime<Utc>,
        duration_minutes: u32,
        topic: String,
    },
    #[serde(rename_all = "camelCase")]
    VideoCall {
        host_id: Uuid,
        participants: Vec<Uuid>,
        room_code: String,
    },
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Session {
    pub id: Uuid,
    pub status: SessionStatus,
    pub created_at: DateTime<Utc>,
    #[serde(flatten)]
    pub kind: SessionKind,
}

impl Session {
    /// Everyone attached to the session, host or mentor first.
    pub fn members(&self) -> Vec<Uuid> {
        match &self.kind {
            SessionKind::MentorSession {
                mentor_id,
                student_id,
                ..
            } => vec![*mentor_id, *student_id],
            SessionKind::VideoCall {
                host_id,
                participants,
                ..
            } => {
                let mut members = vec![*host_id];
                members.extend(participants.iter().filter(|p| *p != host_id));
                members
            }
        }
    }

    pub fn involves(&self, user_id: Uuid) -> bool {
        self.members().contains(&user_id)
    }
}
