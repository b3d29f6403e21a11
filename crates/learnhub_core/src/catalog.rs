//! crates/learnhub_core/src/catalog.rs
//!
//! The built-in course catalog, mentor directory and quizzes.
//! This is read-only mock content; nothing here is persisted.

use std::sync::OnceLock;

use crate::domain::{Course, Lesson, LessonKind, Mentor, Module, Question, Quiz};

pub struct Catalog {
    courses: Vec<Course>,
    mentors: Vec<Mentor>,
    quizzes: Vec<Quiz>,
}

/// Filters for the course listing.
#[derive(Debug, Default, Clone)]
pub struct CourseQuery {
    pub search: Option<String>,
    pub category: Option<String>,
}

/// Filters for the mentor directory.
#[derive(Debug, Default, Clone)]
pub struct MentorQuery {
    pub search: Option<String>,
    pub expertise: Option<String>,
    pub available_only: bool,
}

impl Catalog {
    /// The shared built-in catalog.
    pub fn builtin() -> &'static Catalog {
        static CATALOG: OnceLock<Catalog> = OnceLock::new();
        CATALOG.get_or_init(|| Catalog {
            courses: builtin_courses(),
            mentors: builtin_mentors(),
            quizzes: builtin_quizzes(),
        })
    }

    pub fn course(&self, course_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.id == course_id)
    }

    pub fn courses(&self) -> &[Course] {
        &self.courses
    }

    pub fn search_courses(&self, query: &CourseQuery) -> Vec<&Course> {
        let needle = normalized(query.search.as_deref());
        let category = normalized(query.category.as_deref());
        self.courses
            .iter()
            .filter(|c| {
                needle.as_deref().map_or(true, |n| {
                    c.title.to_lowercase().contains(n)
                        || c.description.to_lowercase().contains(n)
                        || c.instructor.to_lowercase().contains(n)
                })
            })
            .filter(|c| {
                category
                    .as_deref()
                    .map_or(true, |cat| c.category.eq_ignore_ascii_case(cat))
            })
            .collect()
    }

    /// The course that contains `lesson_id`.
    pub fn course_for_lesson(&self, lesson_id: &str) -> Option<&Course> {
        self.courses.iter().find(|c| c.lesson(lesson_id).is_some())
    }

    pub fn mentors(&self) -> &[Mentor] {
        &self.mentors
    }

    pub fn search_mentors(&self, query: &MentorQuery) -> Vec<&Mentor> {
        let needle = normalized(query.search.as_deref());
        let expertise = normalized(query.expertise.as_deref());
        self.mentors
            .iter()
            .filter(|m| !query.available_only || m.available)
            .filter(|m| {
                needle.as_deref().map_or(true, |n| {
                    m.name.to_lowercase().contains(n) || m.title.to_lowercase().contains(n)
                })
            })
            .filter(|m| {
                expertise.as_deref().map_or(true, |e| {
                    m.expertise.iter().any(|x| x.eq_ignore_ascii_case(e))
                })
            })
            .collect()
    }

    pub fn quiz(&self, lesson_id: &str) -> Option<&Quiz> {
        self.quizzes.iter().find(|q| q.lesson_id == lesson_id)
    }
}

fn normalized(value: Option<&str>) -> Option<String> {
    value
        .map(|v| v.trim().to_lowercase())
        .filter(|v| !v.is_empty())
}

fn lesson(id: &str, title: &str, kind: LessonKind, duration_minutes: u32) -> Lesson {
    Lesson {
        id: id.to_string(),
        title: title.to_string(),
        kind,
        duration_minutes,
        is_completed: false,
        is_unlocked: false,
    }
}

fn module(id: &str, title: &str, lessons: Vec<Lesson>) -> Module {
    Module {
        id: id.to_string(),
        title: title.to_string(),
        lessons,
    }
}

fn builtin_courses() -> Vec<Course> {
    vec![
        Course {
            id: "web-dev-fundamentals".to_string(),
            title: "Web Development Fundamentals".to_string(),
            description: "HTML, CSS and JavaScript from the ground up.".to_string(),
            category: "development".to_string(),
            level: "beginner".to_string(),
            instructor: "Priya Raman".to_string(),
            modules: vec![
                module(
                    "wdf-m1",
                    "Getting Started",
                    vec![
                        lesson("wdf-1", "How the Web Works", LessonKind::Video, 12),
                        lesson("wdf-2", "Your First Page", LessonKind::Document, 15),
                        lesson("wdf-3", "Basics Check", LessonKind::Quiz, 10),
                    ],
                ),
                module(
                    "wdf-m2",
                    "Styling",
                    vec![
                        lesson("wdf-4", "CSS Selectors", LessonKind::Video, 18),
                        lesson("wdf-5", "Build a Landing Page", LessonKind::Assignment, 45),
                    ],
                ),
            ],
        },
        Course {
            id: "data-science-intro".to_string(),
            title: "Introduction to Data Science".to_string(),
            description: "Exploring, cleaning and visualising data.".to_string(),
            category: "data".to_string(),
            level: "intermediate".to_string(),
            instructor: "Daniel Okafor".to_string(),
            modules: vec![
                module(
                    "dsi-m1",
                    "Foundations",
                    vec![
                        lesson("dsi-1", "What Is Data Science?", LessonKind::Video, 14),
                        lesson("dsi-2", "Statistics Refresher", LessonKind::Document, 20),
                    ],
                ),
                module(
                    "dsi-m2",
                    "Working With Data",
                    vec![
                        lesson("dsi-3", "Cleaning Datasets", LessonKind::Video, 22),
                        lesson("dsi-4", "Foundations Quiz", LessonKind::Quiz, 10),
                        lesson("dsi-5", "Exploratory Analysis", LessonKind::Assignment, 60),
                    ],
                ),
            ],
        },
        Course {
            id: "career-mentoring".to_string(),
            title: "Career Mentoring Essentials".to_string(),
            description: "Getting the most out of working with a mentor.".to_string(),
            category: "career".to_string(),
            level: "beginner".to_string(),
            instructor: "Harsh Vardhan".to_string(),
            modules: vec![module(
                "cme-m1",
                "Working With a Mentor",
                vec![
                    lesson("cme-1", "Setting Goals", LessonKind::Video, 8),
                    lesson("cme-2", "Goal Check", LessonKind::Quiz, 5),
                ],
            )],
        },
    ]
}

fn builtin_mentors() -> Vec<Mentor> {
    let mentor = |id: &str, name: &str, title: &str, expertise: &[&str], rating: f32, rate: u32, available: bool| Mentor {
        id: id.to_string(),
        name: name.to_string(),
        title: title.to_string(),
        expertise: expertise.iter().map(|e| e.to_string()).collect(),
        rating,
        hourly_rate: rate,
        available,
    };

    vec![
        mentor("mentor-1", "Priya Raman", "Senior Frontend Engineer", &["javascript", "react", "css"], 4.9, 60, true),
        mentor("mentor-2", "Daniel Okafor", "Data Scientist", &["python", "statistics", "machine learning"], 4.7, 75, true),
        mentor("mentor-3", "Mei Tanaka", "Engineering Manager", &["career", "leadership"], 4.8, 90, false),
        mentor("mentor-4", "Lucas Moreau", "Backend Engineer", &["rust", "databases", "javascript"], 4.6, 70, true),
    ]
}

fn builtin_quizzes() -> Vec<Quiz> {
    let question = |prompt: &str, options: &[&str], correct_option: usize| Question {
        prompt: prompt.to_string(),
        options: options.iter().map(|o| o.to_string()).collect(),
        correct_option,
    };

    vec![
        Quiz {
            course_id: "web-dev-fundamentals".to_string(),
            lesson_id: "wdf-3".to_string(),
            title: "Basics Check".to_string(),
            pass_percent: 60,
            questions: vec![
                question("What does HTML stand for?", &["HyperText Markup Language", "High Tech Modern Language", "Home Tool Markup Language"], 0),
                question("Which tag creates a link?", &["<link>", "<a>", "<href>"], 1),
                question("Which language styles a page?", &["HTML", "SQL", "CSS"], 2),
            ],
        },
        Quiz {
            course_id: "data-science-intro".to_string(),
            lesson_id: "dsi-4".to_string(),
            title: "Foundations Quiz".to_string(),
            pass_percent: 70,
            questions: vec![
                question("The median of [1, 3, 9] is", &["3", "4.33", "9"], 0),
                question("A missing value is usually called", &["NaN", "NIL", "VOID"], 0),
                question("Which chart shows a distribution?", &["Pie chart", "Histogram", "Gantt chart"], 1),
                question("Correlation ranges between", &["0 and 1", "-1 and 1", "-100 and 100"], 1),
            ],
        },
        Quiz {
            course_id: "career-mentoring".to_string(),
            lesson_id: "cme-2".to_string(),
            title: "Goal Check".to_string(),
            pass_percent: 50,
            questions: vec![
                question("A SMART goal is", &["Specific and measurable", "Secret", "Short"], 0),
                question("How often should you review goals with a mentor?", &["Never", "Regularly", "Once"], 1),
            ],
        },
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn every_quiz_lesson_has_a_quiz_in_the_same_course() {
        let catalog = Catalog::builtin();
        for course in catalog.courses() {
            for lesson in course.lessons().filter(|l| l.kind == LessonKind::Quiz) {
                let quiz = catalog.quiz(&lesson.id).expect("quiz lesson without quiz");
                assert_eq!(quiz.course_id, course.id);
            }
        }
    }

    #[test]
    fn lesson_ids_are_unique_across_courses() {
        let catalog = Catalog::builtin();
        let mut ids: Vec<&str> = catalog
            .courses()
            .iter()
            .flat_map(|c| c.lessons().map(|l| l.id.as_str()))
            .collect();
        let total = ids.len();
        ids.sort_unstable();
        ids.dedup();
        assert_eq!(ids.len(), total);
    }

    #[test]
    fn course_search_matches_title_and_category() {
        let catalog = Catalog::builtin();
        let hits = catalog.search_courses(&CourseQuery {
            search: Some("  data ".to_string()),
            category: None,
        });
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "data-science-intro");

        let hits = catalog.search_courses(&CourseQuery {
            search: None,
            category: Some("Career".to_string()),
        });
        assert_eq!(hits.len(), 1);
        assert_eq!(hits[0].id, "career-mentoring");

        assert_eq!(catalog.search_courses(&CourseQuery::default()).len(), 3);
    }

    #[test]
    fn mentor_search_filters_by_expertise_and_availability() {
        let catalog = Catalog::builtin();
        let js = catalog.search_mentors(&MentorQuery {
            expertise: Some("JavaScript".to_string()),
            ..Default::default()
        });
        assert_eq!(js.len(), 2);

        let available = catalog.search_mentors(&MentorQuery {
            available_only: true,
            ..Default::default()
        });
        assert!(available.iter().all(|m| m.available));
        assert_eq!(available.len(), 3);
    }

    #[test]
    fn course_for_lesson_finds_owner() {
        let catalog = Catalog::builtin();
        assert_eq!(
            catalog.course_for_lesson("dsi-4").map(|c| c.id.as_str()),
            Some("data-science-intro")
        );
        assert!(catalog.course_for_lesson("nope").is_none());
    }
}
