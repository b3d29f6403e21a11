//! crates/learnhub_core/src/dashboard.rs
//!
//! Role-specific dashboard summaries.

use serde::Serialize;
use std::collections::HashSet;
use uuid::Uuid;

use crate::domain::{Certificate, DashboardKind, Enrollment, Session, SessionKind, User};
use crate::learning::LearningService;
use crate::ports::PortResult;
use crate::scheduling::SessionService;

#[derive(Debug, Clone, Serialize)]
pub struct CourseStat {
    pub course_id: String,
    pub enrolled: usize,
    pub completed: usize,
}

#[derive(Debug, Clone, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum Dashboard {
    Student {
        enrollments: Vec<Enrollment>,
        certificates: Vec<Certificate>,
        upcoming_sessions: Vec<Session>,
        average_progress: u8,
    },
    Mentor {
        sessions: Vec<Session>,
        student_count: usize,
        open_sessions: usize,
    },
    Admin {
        total_users: usize,
        total_enrollments: usize,
        total_certificates: usize,
        open_sessions: usize,
        courses: Vec<CourseStat>,
    },
}

/// Builds the dashboard for `user`. `total_users` comes from the account
/// registry, which the core does not own.
pub async fn dashboard_for(
    user: &User,
    learning: &LearningService,
    sessions: &SessionService,
    total_users: usize,
) -> PortResult<Dashboard> {
    match user.role.dashboard() {
        DashboardKind::Student => {
            let enrollments = learning.enrollments_for(user.id).await?;
            let certificates = learning.certificates_for(user.id, None).await?;
            let upcoming_sessions = sessions
                .for_user(user.id)
                .await?
                .into_iter()
                .filter(|s| s.status.is_open())
                .collect();
            Ok(Dashboard::Student {
                average_progress: average_progress(&enrollments),
                enrollments,
                certificates,
                upcoming_sessions,
            })
        }
        DashboardKind::Mentor => {
            let sessions = sessions.for_user(user.id).await?;
            let students: HashSet<Uuid> = sessions
                .iter()
                .filter_map(|s| match &s.kind {
                    SessionKind::MentorSession { student_id, .. } => Some(*student_id),
                    SessionKind::VideoCall { .. } => None,
                })
                .filter(|id| *id != user.id)
                .collect();
            Ok(Dashboard::Mentor {
                student_count: students.len(),
                open_sessions: sessions.iter().filter(|s| s.status.is_open()).count(),
                sessions,
            })
        }
        DashboardKind::Admin => {
            let enrollments = learning.all_enrollments().await?;
            let certificates = learning.all_certificates().await?;
            let open_sessions = sessions
                .all()
                .await?
                .iter()
                .filter(|s| s.status.is_open())
                .count();
            let courses = learning
                .catalog()
                .courses()
                .iter()
                .map(|c| CourseStat {
                    course_id: c.id.clone(),
                    enrolled: enrollments.iter().filter(|e| e.course_id == c.id).count(),
                    completed: enrollments
                        .iter()
                        .filter(|e| e.course_id == c.id && e.completed_at.is_some())
                        .count(),
                })
                .collect();
            Ok(Dashboard::Admin {
                total_users,
                total_enrollments: enrollments.len(),
                total_certificates: certificates.len(),
                open_sessions,
                courses,
            })
        }
    }
}

/// Mean enrollment progress, rounded; zero without enrollments.
pub fn average_progress(enrollments: &[Enrollment]) -> u8 {
    if enrollments.is_empty() {
        return 0;
    }
    let sum: u32 = enrollments.iter().map(|e| u32::from(e.progress)).sum();
    (sum as f64 / enrollments.len() as f64).round() as u8
}
