use serde::{Deserialize, Deserializer, Serialize};
use std::collections::HashMap;
use uuid::Uuid;

pub const DEFAULT_TARGET: f64 = 80.0;
pub const DEFAULT_CREDITS: f64 = 0.5;
pub const DEFAULT_SEMESTER_NAME: &str = "Sem 1";

/// Conventional category labels. `Assessment::category` stays an open string.
pub const CATEGORIES: [&str; 9] = [
    "Assignment",
    "Lab",
    "Quiz",
    "Midterm",
    "Test",
    "Final",
    "Project",
    "Participation",
    "Other",
];

pub fn new_id() -> String {
    Uuid::new_v4().to_string()
}

fn default_target() -> f64 {
    DEFAULT_TARGET
}

// Stored data comes from older UI builds; a null or mistyped field must
// not make the whole document unreadable.
pub(crate) fn lenient_number<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_f64()).unwrap_or(0.0))
}

fn lenient_target<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_f64()).unwrap_or(DEFAULT_TARGET))
}

fn lenient_score<'de, D>(d: D) -> Result<Option<f64>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_f64()))
}

pub(crate) fn lenient_bool<'de, D>(d: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_bool()).unwrap_or(false))
}

/// Numbers keep their text; anything else that is not a string reads as "".
pub(crate) fn lenient_string<'de, D>(d: D) -> Result<String, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(match v {
        Some(serde_json::Value::String(s)) => s,
        Some(serde_json::Value::Number(n)) => n.to_string(),
        _ => String::new(),
    })
}

/// `null` reads as an empty list.
pub(crate) fn lenient_list<'de, D, T>(d: D) -> Result<Vec<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Ok(Option::<Vec<T>>::deserialize(d)?.unwrap_or_default())
}

fn lenient_index<'de, D>(d: D) -> Result<Option<usize>, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_u64()).and_then(|n| usize::try_from(n).ok()))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Assessment {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    /// Percent of the course grade, e.g. 15 means 15%.
    #[serde(default, deserialize_with = "lenient_number")]
    pub weight: f64,
    /// Percent achieved. `None` = not graded yet (distinct from 0).
    #[serde(
        default,
        deserialize_with = "lenient_score",
        skip_serializing_if = "Option::is_none"
    )]
    pub score: Option<f64>,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_final: bool,
}

impl Assessment {
    pub fn new(name: impl Into<String>, category: impl Into<String>, weight: f64) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            category: category.into(),
            weight,
            score: None,
            is_final: false,
        }
    }

    /// Blank row the UI appends with "add item".
    pub fn item() -> Self {
        Self::new("New Item", "Other", 0.0)
    }

    pub fn final_exam() -> Self {
        Self {
            is_final: true,
            ..Self::new("Final", "Final", 0.0)
        }
    }

    pub fn with_score(mut self, score: f64) -> Self {
        self.score = Some(score);
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GradingScheme {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub assessments: Vec<Assessment>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Course {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub credits: f64,
    #[serde(default = "default_target", deserialize_with = "lenient_target")]
    pub target: f64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub assessments: Vec<Assessment>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grading_schemes: Option<Vec<GradingScheme>>,
    #[serde(
        default,
        deserialize_with = "lenient_index",
        skip_serializing_if = "Option::is_none"
    )]
    pub active_scheme_index: Option<usize>,
}

impl Course {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            credits: DEFAULT_CREDITS,
            target: DEFAULT_TARGET,
            assessments: Vec::new(),
            grading_schemes: None,
            active_scheme_index: None,
        }
    }

    /// Appends an assessment; display order is insertion order.
    pub fn with_assessment(&self, assessment: Assessment) -> Self {
        let mut next = self.clone();
        next.assessments.push(assessment);
        next
    }

    pub fn with_assessments(&self, assessments: Vec<Assessment>) -> Self {
        Self {
            assessments,
            ..self.clone()
        }
    }

    /// Switches the active grading scheme. This is the only place that
    /// writes `assessments` and `active_scheme_index` from a scheme, so the
    /// two never drift apart.
    ///
    /// Rows get fresh ids; scores carry over from the current rows whose
    /// names match case-insensitively. Returns `None` when the course has no
    /// schemes or `index` is out of range.
    pub fn select_scheme(&self, index: usize) -> Option<Self> {
        let scheme = self.grading_schemes.as_ref()?.get(index)?;

        let carried: HashMap<String, Option<f64>> = self
            .assessments
            .iter()
            .map(|a| (a.name.to_lowercase(), a.score))
            .collect();

        let assessments = scheme
            .assessments
            .iter()
            .map(|a| Assessment {
                id: new_id(),
                score: carried.get(&a.name.to_lowercase()).copied().flatten(),
                ..a.clone()
            })
            .collect();

        Some(Self {
            assessments,
            active_scheme_index: Some(index),
            ..self.clone()
        })
    }

    pub fn active_scheme(&self) -> Option<&GradingScheme> {
        let idx = self.active_scheme_index?;
        self.grading_schemes.as_ref()?.get(idx)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Semester {
    #[serde(default, deserialize_with = "lenient_string")]
    pub id: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub courses: Vec<Course>,
}

impl Semester {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            id: new_id(),
            name: name.into(),
            courses: Vec::new(),
        }
    }

    pub fn with_courses(&self, courses: Vec<Course>) -> Self {
        Self {
            courses,
            ..self.clone()
        }
    }

    pub fn renamed(&self, name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            ..self.clone()
        }
    }
}

pub trait Identified {
    fn id(&self) -> &str;
}

impl Identified for Assessment {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for GradingScheme {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Course {
    fn id(&self) -> &str {
        &self.id
    }
}

impl Identified for Semester {
    fn id(&self) -> &str {
        &self.id
    }
}

pub fn next_semester_name(semesters: &[Semester]) -> String {
    format!("Sem {}", semesters.len() + 1)
}

/// New items go to the front of the list.
pub fn prepend<T: Clone>(items: &[T], new: impl IntoIterator<Item = T>) -> Vec<T> {
    let mut next: Vec<T> = new.into_iter().collect();
    next.extend_from_slice(items);
    next
}

/// Prepends a fresh, empty semester. Returns the new list and the new id.
pub fn add_semester(semesters: &[Semester]) -> (Vec<Semester>, String) {
    let semester = Semester::new(next_semester_name(semesters));
    let id = semester.id.clone();
    (prepend(semesters, [semester]), id)
}

pub fn add_course(courses: &[Course], course: Course) -> Vec<Course> {
    prepend(courses, [course])
}

pub fn replace_by_id<T, F>(items: &[T], id: &str, mut f: F) -> Vec<T>
where
    T: Identified + Clone,
    F: FnMut(&T) -> T,
{
    items
        .iter()
        .map(|it| if it.id() == id { f(it) } else { it.clone() })
        .collect()
}

/// Removing a parent drops everything it contains; there is no soft delete.
pub fn remove_by_id<T: Identified + Clone>(items: &[T], id: &str) -> Vec<T> {
    items.iter().filter(|it| it.id() != id).cloned().collect()
}

pub fn move_item<T: Clone>(items: &[T], from: usize, to: usize) -> Vec<T> {
    let mut next = items.to_vec();
    if next.len() <= 1 || from == to || from >= next.len() || to >= next.len() {
        return next;
    }
    let item = next.remove(from);
    next.insert(to, item);
    next
}

pub fn move_up<T: Clone>(items: &[T], idx: usize) -> Vec<T> {
    if idx == 0 || idx >= items.len() {
        return items.to_vec();
    }
    move_item(items, idx, idx - 1)
}

pub fn move_down<T: Clone>(items: &[T], idx: usize) -> Vec<T> {
    if idx + 1 >= items.len() {
        return items.to_vec();
    }
    move_item(items, idx, idx + 1)
}

/// The semester with `id`, else the first one.
pub fn active_semester<'a>(semesters: &'a [Semester], id: Option<&str>) -> Option<&'a Semester> {
    id.and_then(|id| semesters.iter().find(|s| s.id == id))
        .or_else(|| semesters.first())
}

/// Active id to use after `deleted_id` was removed from the list.
pub fn reselect_after_delete(
    remaining: &[Semester],
    active_id: Option<&str>,
    deleted_id: &str,
) -> Option<String> {
    match active_id {
        Some(id) if id != deleted_id => Some(id.to_string()),
        _ => remaining.first().map(|s| s.id.clone()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn schemed_course() -> Course {
        let a = GradingScheme {
            id: new_id(),
            name: "Scheme A".into(),
            assessments: vec![
                Assessment::new("Midterm", "Midterm", 40.0),
                Assessment::new("Final Exam", "Final", 60.0),
            ],
        };
        let b = GradingScheme {
            id: new_id(),
            name: "Scheme B".into(),
            assessments: vec![
                Assessment::new("midterm", "Midterm", 20.0),
                Assessment::new("Project", "Project", 30.0),
                Assessment::new("Final Exam", "Final", 50.0),
            ],
        };
        let mut course = Course::new("MATH*2130");
        course.grading_schemes = Some(vec![a, b]);
        let course = course.select_scheme(0).expect("scheme 0");
        let graded = course.assessments[0].clone().with_score(72.0);
        let graded_id = graded.id.clone();
        course.with_assessments(replace_by_id(&course.assessments, &graded_id, |_| graded.clone()))
    }

    #[test]
    fn select_scheme_carries_scores_by_case_insensitive_name() {
        let course = schemed_course();
        let switched = course.select_scheme(1).expect("scheme 1");

        assert_eq!(switched.active_scheme_index, Some(1));
        assert_eq!(switched.assessments.len(), 3);
        assert_eq!(switched.assessments[0].name, "midterm");
        assert_eq!(switched.assessments[0].score, Some(72.0));
        assert_eq!(switched.assessments[1].score, None);
        assert_ne!(switched.assessments[0].id, course.assessments[0].id);
    }

    #[test]
    fn select_scheme_rejects_missing_schemes_and_bad_index() {
        assert!(Course::new("x").select_scheme(0).is_none());
        assert!(schemed_course().select_scheme(2).is_none());
    }

    #[test]
    fn move_item_is_a_noop_on_degenerate_input() {
        let items = vec![1, 2, 3];
        assert_eq!(move_item(&items, 0, 2), vec![2, 3, 1]);
        assert_eq!(move_item(&items, 2, 0), vec![3, 1, 2]);
        assert_eq!(move_item(&items, 1, 1), items);
        assert_eq!(move_item(&items, 5, 0), items);
        assert_eq!(move_item(&[9], 0, 0), vec![9]);
        assert_eq!(move_up(&items, 0), items);
        assert_eq!(move_down(&items, 2), items);
        assert_eq!(move_down(&items, 0), vec![2, 1, 3]);
    }

    #[test]
    fn add_semester_prepends_with_next_name() {
        let (one, first_id) = add_semester(&[]);
        assert_eq!(one[0].name, "Sem 1");
        let (two, second_id) = add_semester(&one);
        assert_eq!(two[0].name, "Sem 2");
        assert_eq!(two[0].id, second_id);
        assert_eq!(two[1].id, first_id);
    }

    #[test]
    fn deleting_active_semester_reselects_first() {
        let (sems, _) = add_semester(&[]);
        let (sems, newest) = add_semester(&sems);
        let remaining = remove_by_id(&sems, &newest);
        assert_eq!(remaining.len(), 1);
        assert_eq!(
            reselect_after_delete(&remaining, Some(&newest), &newest),
            Some(remaining[0].id.clone())
        );
        assert_eq!(
            reselect_after_delete(&remaining, Some("other"), &newest).as_deref(),
            Some("other")
        );
        assert_eq!(
            active_semester(&remaining, Some("missing")).map(|s| s.id.as_str()),
            Some(remaining[0].id.as_str())
        );
    }

    #[test]
    fn lenient_fields_default_instead_of_failing() {
        let raw = r#"{"id":"c1","name":"Chem","credits":null,
            "assessments":[{"id":"a1","name":"Lab","category":"Lab","weight":null,"score":null}]}"#;
        let course: Course = serde_json::from_str(raw).expect("parse course");
        assert_eq!(course.credits, 0.0);
        assert_eq!(course.target, DEFAULT_TARGET);
        assert_eq!(course.assessments[0].weight, 0.0);
        assert_eq!(course.assessments[0].score, None);
        assert!(!course.assessments[0].is_final);
    }

    #[test]
    fn null_strings_flags_and_lists_read_as_empty() {
        let raw = r#"{"id":null,"name":null,"courses":[
            {"id":"c1","name":"Phys","assessments":null,"activeSchemeIndex":null},
            {"id":"c2","name":null,"assessments":[
                {"id":null,"name":"Quiz","category":null,"weight":5,"score":90,"isFinal":null}]}]}"#;
        let semester: Semester = serde_json::from_str(raw).expect("parse semester");
        assert_eq!(semester.id, "");
        assert_eq!(semester.name, "");
        assert!(semester.courses[0].assessments.is_empty());
        assert_eq!(semester.courses[0].active_scheme_index, None);

        let quiz = &semester.courses[1].assessments[0];
        assert_eq!(semester.courses[1].name, "");
        assert_eq!(quiz.category, "");
        assert_eq!(quiz.score, Some(90.0));
        assert!(!quiz.is_final);
    }

    #[test]
    fn add_course_prepends_and_rename_keeps_id() {
        let (sems, id) = add_semester(&[]);
        let older = Course::new("CIS*1300");
        let newer = Course::new("CIS*2500");
        let courses = add_course(&add_course(&[], older.clone()), newer.clone());
        assert_eq!(courses, vec![newer, older]);

        let renamed = replace_by_id(&sems, &id, |s| s.renamed("Fall 2025"));
        assert_eq!(renamed[0].name, "Fall 2025");
        assert_eq!(renamed[0].id, id);
    }

    #[test]
    fn stock_rows_use_conventional_categories() {
        assert!(CATEGORIES.contains(&Assessment::item().category.as_str()));
        assert!(CATEGORIES.contains(&Assessment::final_exam().category.as_str()));
    }
}
