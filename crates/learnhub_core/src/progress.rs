//! crates/learnhub_core/src/progress.rs
//!
//! Lesson unlock sequencing and progress percentages.
//!
//! Lessons are ordered by flattening the course's modules. The first lesson is
//! always open; every later lesson opens once its immediate predecessor is done.

use std::collections::HashSet;

use crate::domain::{Course, Module};

/// Returns a copy of `course` with `is_completed` and `is_unlocked` recomputed
/// from the set of completed lesson ids.
pub fn apply_completion(course: &Course, completed: &HashSet<String>) -> Course {
    let mut course = course.clone();
    let mut previous_done: Option<bool> = None;

    for lesson in course.modules.iter_mut().flat_map(|m| m.lessons.iter_mut()) {
        lesson.is_completed = completed.contains(&lesson.id);
        lesson.is_unlocked = previous_done.unwrap_or(true);
        previous_done = Some(lesson.is_completed);
    }

    course
}

/// Whether `lesson_id` may be worked on given the completed set.
/// `None` when the course has no such lesson.
pub fn is_unlocked(course: &Course, completed: &HashSet<String>, lesson_id: &str) -> Option<bool> {
    let mut previous_done: Option<bool> = None;
    for lesson in course.lessons() {
        if lesson.id == lesson_id {
            return Some(previous_done.unwrap_or(true));
        }
        previous_done = Some(completed.contains(&lesson.id));
    }
    None
}

pub fn module_progress(module: &Module) -> u8 {
    let done = module.lessons.iter().filter(|l| l.is_completed).count();
    percent(done, module.lessons.len())
}

pub fn course_progress(course: &Course) -> u8 {
    let total = course.lessons().count();
    let done = course.lessons().filter(|l| l.is_completed).count();
    percent(done, total)
}

pub fn is_course_complete(course: &Course) -> bool {
    let mut lessons = course.lessons().peekable();
    lessons.peek().is_some() && lessons.all(|l| l.is_completed)
}

/// `round(done * 100 / total)`, zero for an empty set.
pub fn percent(done: usize, total: usize) -> u8 {
    if total == 0 {
        return 0;
    }
    let value = (done.min(total) as f64 * 100.0 / total as f64).round();
    value as u8
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::{Lesson, LessonKind};

    fn lesson(id: &str) -> Lesson {
        Lesson {
            id: id.to_string(),
            title: id.to_uppercase(),
            kind: LessonKind::Video,
            duration_minutes: 10,
            is_completed: false,
            is_unlocked: false,
        }
    }

    fn course() -> Course {
        Course {
            id: "c".to_string(),
            title: "Course".to_string(),
            description: String::new(),
            category: "test".to_string(),
            level: "beginner".to_string(),
            instructor: "nobody".to_string(),
            modules: vec![
                Module {
                    id: "m1".to_string(),
                    title: "One".to_string(),
                    lessons: vec![lesson("a"), lesson("b")],
                },
                Module {
                    id: "empty".to_string(),
                    title: "Empty".to_string(),
                    lessons: vec![],
                },
                Module {
                    id: "m2".to_string(),
                    title: "Two".to_string(),
                    lessons: vec![lesson("c")],
                },
            ],
        }
    }

    fn done(ids: &[&str]) -> HashSet<String> {
        ids.iter().map(|s| s.to_string()).collect()
    }

    fn unlocked(course: &Course) -> Vec<(String, bool)> {
        course
            .lessons()
            .map(|l| (l.id.clone(), l.is_unlocked))
            .collect()
    }

    #[test]
    fn first_lesson_is_unlocked_by_default() {
        let view = apply_completion(&course(), &HashSet::new());
        assert_eq!(
            unlocked(&view),
            vec![
                ("a".to_string(), true),
                ("b".to_string(), false),
                ("c".to_string(), false)
            ]
        );
    }

    #[test]
    fn next_module_opens_after_last_lesson_of_previous_non_empty_module() {
        let view = apply_completion(&course(), &done(&["a", "b"]));
        assert!(view.lesson("c").unwrap().is_unlocked);
    }

    #[test]
    fn lesson_with_incomplete_predecessor_is_locked_even_if_later_ones_are_done() {
        // "c" completed out of order does not open "b".
        let view = apply_completion(&course(), &done(&["c"]));
        let b = view.lesson("b").unwrap();
        assert!(!b.is_unlocked);
        assert!(view.lesson("c").unwrap().is_completed);
        assert!(!view.lesson("c").unwrap().is_unlocked);
    }

    #[test]
    fn is_unlocked_matches_apply_completion() {
        let course = course();
        let completed = done(&["a"]);
        let view = apply_completion(&course, &completed);
        for l in view.lessons() {
            assert_eq!(is_unlocked(&course, &completed, &l.id), Some(l.is_unlocked));
        }
        assert_eq!(is_unlocked(&course, &completed, "missing"), None);
    }

    #[test]
    fn progress_is_rounded_percentage() {
        let view = apply_completion(&course(), &done(&["a"]));
        assert_eq!(module_progress(&view.modules[0]), 50);
        assert_eq!(module_progress(&view.modules[1]), 0);
        assert_eq!(course_progress(&view), 33);

        let view = apply_completion(&course(), &done(&["a", "b"]));
        assert_eq!(course_progress(&view), 67);
    }

    #[test]
    fn course_is_complete_only_when_every_lesson_is_done() {
        assert!(!is_course_complete(&apply_completion(&course(), &done(&["a", "b"]))));
        assert!(is_course_complete(&apply_completion(&course(), &done(&["a", "b", "c"]))));

        let mut empty = course();
        empty.modules.clear();
        assert!(!is_course_complete(&empty));
    }
}
