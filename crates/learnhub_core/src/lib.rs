pub mod catalog;
pub mod dashboard;
pub mod demo;
pub mod domain;
pub mod leaderboard;
pub mod learning;
pub mod memory;
pub mod ports;
pub mod progress;
pub mod quiz;
pub mod records;
pub mod scheduling;

pub use domain::{
    AssignmentSubmission, AuthSession, Certificate, ChatAuthor, ChatMessage, Course, Enrollment, Lesson,
    LessonKind, LocalAccount, Mentor, Module, Preferences, Quiz, Role, Session, SessionKind, SessionStatus,
    User,
};
pub use ports::{
    AuthProvider, ChatAssistant, KeyValueStore, PortError, PortResult, ProviderSession, RemoteDatabase, SignUpRequest, Table,
};
