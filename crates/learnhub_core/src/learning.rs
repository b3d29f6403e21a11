//! crates/learnhub_core/src/learning.rs
//!
//! Enrollments, lesson completion, certificates, quizzes and assignments.
//!
//! All state lives in the key-value store. Course structure comes from the
//! catalog and is combined with the per-user progress map on every read.

use chrono::Utc;
use serde::Serialize;
use std::collections::{BTreeMap, HashSet};
use tracing::{debug, info};
use uuid::Uuid;

use crate::catalog::Catalog;
use crate::domain::{AssignmentSubmission, Certificate, Course, Enrollment, LessonKind};
use crate::ports::{PortError, PortResult};
use crate::progress::{apply_completion, course_progress, is_course_complete, is_unlocked, module_progress};
use crate::quiz::{grade, QuizResult};
use crate::records::{keys, Records};

/// Lesson id -> completed, as stored per user and course.
type ProgressMap = BTreeMap<String, bool>;

#[derive(Debug, Clone, Serialize)]
pub struct ModuleProgress {
    pub module_id: String,
    pub progress: u8,
}

/// A course as seen by one user.
#[derive(Debug, Clone, Serialize)]
pub struct CourseView {
    pub course: Course,
    pub progress: u8,
    pub modules: Vec<ModuleProgress>,
    pub enrollment: Option<Enrollment>,
    pub certificate: Option<Certificate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct LessonCompletion {
    pub view: CourseView,
    /// Set only when this completion issued a new certificate.
    pub certificate_issued: Option<Certificate>,
}

#[derive(Debug, Clone, Serialize)]
pub struct QuizSubmission {
    pub result: QuizResult,
    pub completion: Option<LessonCompletion>,
}

#[derive(Debug, Clone, Serialize)]
pub struct AssignmentOutcome {
    pub submission: AssignmentSubmission,
    pub completion: LessonCompletion,
}

#[derive(Clone)]
pub struct LearningService {
    records: Records,
    catalog: &'static Catalog,
}

impl LearningService {
    pub fn new(records: Records) -> Self {
        Self::with_catalog(records, Catalog::builtin())
    }

    pub fn with_catalog(records: Records, catalog: &'static Catalog) -> Self {
        Self { records, catalog }
    }

    pub fn catalog(&self) -> &'static Catalog {
        self.catalog
    }

    fn course(&self, course_id: &str) -> PortResult<&'static Course> {
        self.catalog
            .course(course_id)
            .ok_or_else(|| PortError::NotFound(format!("Course {course_id} not found")))
    }

    async fn completed_lessons(&self, user_id: Uuid, course_id: &str) -> PortResult<HashSet<String>> {
        let map: ProgressMap = self
            .records
            .load(&keys::course_progress(course_id, user_id))
            .await?;
        Ok(completed_set(&map))
    }

    // --- Enrollment ---

    /// Enrolls `user_id` in `course_id`, returning the existing record if there is one.
    pub async fn enroll(&self, user_id: Uuid, course_id: &str) -> PortResult<Enrollment> {
        self.course(course_id)?;
        let course_id = course_id.to_string();
        let enrollment = self
            .records
            .update(keys::ENROLLMENTS, move |list: &mut Vec<Enrollment>| {
                if let Some(existing) = list
                    .iter()
                    .find(|e| e.user_id == user_id && e.course_id == course_id)
                {
                    return Ok(existing.clone());
                }
                let enrollment = Enrollment {
                    user_id,
                    course_id,
                    progress: 0,
                    enrolled_at: Utc::now(),
                    completed_at: None,
                };
                list.push(enrollment.clone());
                Ok(enrollment)
            })
            .await?;
        info!(%user_id, course_id = %enrollment.course_id, "enrolled");
        Ok(enrollment)
    }

    pub async fn enrollments_for(&self, user_id: Uuid) -> PortResult<Vec<Enrollment>> {
        let list: Vec<Enrollment> = self.records.load(keys::ENROLLMENTS).await?;
        Ok(list.into_iter().filter(|e| e.user_id == user_id).collect())
    }

    pub async fn all_enrollments(&self) -> PortResult<Vec<Enrollment>> {
        self.records.load(keys::ENROLLMENTS).await
    }

    // --- Certificates ---

    pub async fn certificates_for(&self, user_id: Uuid, course_id: Option<&str>) -> PortResult<Vec<Certificate>> {
        let list: Vec<Certificate> = self.records.load(keys::CERTIFICATES).await?;
        Ok(list
            .into_iter()
            .filter(|c| c.user_id == user_id)
            .filter(|c| course_id.map_or(true, |id| c.course_id == id))
            .collect())
    }

    pub async fn all_certificates(&self) -> PortResult<Vec<Certificate>> {
        self.records.load(keys::CERTIFICATES).await
    }

    /// Issues the certificate for `(user_id, course_id)` unless one already exists.
    /// Returns the certificate and whether it was newly created.
    async fn issue_certificate(&self, user_id: Uuid, course_id: &str) -> PortResult<(Certificate, bool)> {
        let course_id = course_id.to_string();
        self.records
            .update(keys::CERTIFICATES, move |list: &mut Vec<Certificate>| {
                if let Some(existing) = list
                    .iter()
                    .find(|c| c.user_id == user_id && c.course_id == course_id)
                {
                    return Ok((existing.clone(), false));
                }
                let certificate = Certificate {
                    id: Uuid::new_v4(),
                    user_id,
                    course_id,
                    issued_at: Utc::now(),
                };
                list.push(certificate.clone());
                Ok((certificate, true))
            })
            .await
    }

    // --- Course progress ---

    pub async fn course_view(&self, user_id: Uuid, course_id: &str) -> PortResult<CourseView> {
        let course = self.course(course_id)?;
        let completed = self.completed_lessons(user_id, course_id).await?;
        self.view_from(user_id, course, &completed).await
    }

    async fn view_from(&self, user_id: Uuid, course: &Course, completed: &HashSet<String>) -> PortResult<CourseView> {
        let course = apply_completion(course, completed);
        let enrollment = self
            .enrollments_for(user_id)
            .await?
            .into_iter()
            .find(|e| e.course_id == course.id);
        let certificate = self
            .certificates_for(user_id, Some(&course.id))
            .await?
            .into_iter()
            .next();
        let modules = course
            .modules
            .iter()
            .map(|m| ModuleProgress {
                module_id: m.id.clone(),
                progress: module_progress(m),
            })
            .collect();

        Ok(CourseView {
            progress: course_progress(&course),
            modules,
            enrollment,
            certificate,
            course,
        })
    }

    /// Marks a lesson complete and propagates the consequences: enrollment
    /// progress, completion time and, once every lesson is done, the certificate.
    ///
    /// Fails with `Conflict` if the lesson is still locked. Completing an
    /// already completed lesson is a no-op apart from re-checking the certificate.
    pub async fn complete_lesson(&self, user_id: Uuid, course_id: &str, lesson_id: &str) -> PortResult<LessonCompletion> {
        let course = self.course(course_id)?;
        if course.lesson(lesson_id).is_none() {
            return Err(PortError::NotFound(format!(
                "Lesson {lesson_id} not found in course {course_id}"
            )));
        }

        let owned_course = course.clone();
        let owned_lesson = lesson_id.to_string();
        let completed = self
            .records
            .update(
                &keys::course_progress(course_id, user_id),
                move |map: &mut ProgressMap| {
                    let completed = completed_set(map);
                    if !completed.contains(&owned_lesson)
                        && is_unlocked(&owned_course, &completed, &owned_lesson) != Some(true)
                    {
                        return Err(PortError::Conflict(format!("Lesson {owned_lesson} is locked")));
                    }
                    map.insert(owned_lesson, true);
                    Ok(completed_set(map))
                },
            )
            .await?;
        debug!(%user_id, course_id, lesson_id, "lesson completed");

        let snapshot = apply_completion(course, &completed);
        let progress = course_progress(&snapshot);
        let finished = is_course_complete(&snapshot);
        self.record_progress(user_id, course_id, progress, finished).await?;

        let certificate_issued = if finished {
            let (certificate, created) = self.issue_certificate(user_id, course_id).await?;
            if created {
                info!(%user_id, course_id, certificate_id = %certificate.id, "certificate issued");
            }
            created.then_some(certificate)
        } else {
            None
        };

        Ok(LessonCompletion {
            view: self.view_from(user_id, course, &completed).await?,
            certificate_issued,
        })
    }

    /// Writes progress onto the enrollment, creating one if the user never enrolled.
    async fn record_progress(&self, user_id: Uuid, course_id: &str, progress: u8, finished: bool) -> PortResult<()> {
        let course_id = course_id.to_string();
        self.records
            .update(keys::ENROLLMENTS, move |list: &mut Vec<Enrollment>| {
                let now = Utc::now();
                let existing = list
                    .iter()
                    .position(|e| e.user_id == user_id && e.course_id == course_id);
                let index = match existing {
                    Some(index) => index,
                    None => {
                        list.push(Enrollment {
                            user_id,
                            course_id,
                            progress: 0,
                            enrolled_at: now,
                            completed_at: None,
                        });
                        list.len() - 1
                    }
                };
                let enrollment = &mut list[index];
                // Completions never undo each other, so a late writer keeps the higher value.
                enrollment.progress = enrollment.progress.max(progress);
                if finished && enrollment.completed_at.is_none() {
                    enrollment.completed_at = Some(now);
                }
                Ok(())
            })
            .await
    }

    // --- Quizzes and assignments ---

    pub async fn submit_quiz(&self, user_id: Uuid, lesson_id: &str, answers: &[usize]) -> PortResult<QuizSubmission> {
        let quiz = self
            .catalog
            .quiz(lesson_id)
            .ok_or_else(|| PortError::NotFound(format!("No quiz for lesson {lesson_id}")))?;
        let result = grade(quiz, answers)?;
        info!(%user_id, lesson_id, score = result.score_percent, passed = result.passed, "quiz graded");

        let completion = if result.passed {
            Some(self.complete_lesson(user_id, &quiz.course_id, lesson_id).await?)
        } else {
            None
        };
        Ok(QuizSubmission { result, completion })
    }

    pub async fn submit_assignment(&self, user_id: Uuid, lesson_id: &str, content: &str) -> PortResult<AssignmentOutcome> {
        let course = self
            .catalog
            .course_for_lesson(lesson_id)
            .ok_or_else(|| PortError::NotFound(format!("Lesson {lesson_id} not found")))?;
        match course.lesson(lesson_id).map(|l| l.kind) {
            Some(LessonKind::Assignment) => {}
            _ => {
                return Err(PortError::InvalidInput(format!(
                    "Lesson {lesson_id} is not an assignment"
                )))
            }
        }
        if content.trim().is_empty() {
            return Err(PortError::InvalidInput("Submission is empty".to_string()));
        }

        let completed = self.completed_lessons(user_id, &course.id).await?;
        if !completed.contains(lesson_id) && is_unlocked(course, &completed, lesson_id) != Some(true) {
            return Err(PortError::Conflict(format!("Lesson {lesson_id} is locked")));
        }

        // The submission is stored before the lesson counts as done.
        let submission = AssignmentSubmission {
            id: Uuid::new_v4(),
            user_id,
            course_id: course.id.clone(),
            lesson_id: lesson_id.to_string(),
            content: content.to_string(),
            submitted_at: Utc::now(),
        };
        self.records
            .push(keys::ASSIGNMENT_SUBMISSIONS, submission.clone())
            .await?;
        info!(%user_id, lesson_id, "assignment submitted");

        let completion = self.complete_lesson(user_id, &course.id, lesson_id).await?;

        Ok(AssignmentOutcome {
            submission,
            completion,
        })
    }
}

fn completed_set(map: &ProgressMap) -> HashSet<String> {
    map.iter()
        .filter(|(_, done)| **done)
        .map(|(id, _)| id.clone())
        .collect()
}
