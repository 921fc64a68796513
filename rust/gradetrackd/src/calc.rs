use crate::model::{Assessment, Course};
use serde::Serialize;

/// How far the weight sum may drift from 100 before it is flagged.
pub const WEIGHT_EPSILON: f64 = 0.01;

/// Upper clamp for `required_final`. Values above 100 are kept so the UI can
/// tell "needs 140%" apart from "needs 100%".
pub const REQUIRED_FINAL_MAX: f64 = 200.0;

/// (threshold, grade point), evaluated top-down; first match wins.
pub const GRADE_BANDS: [(f64, f64); 11] = [
    (85.0, 4.0),
    (80.0, 3.7),
    (77.0, 3.3),
    (73.0, 3.0),
    (70.0, 2.7),
    (67.0, 2.3),
    (63.0, 2.0),
    (60.0, 1.7),
    (57.0, 1.3),
    (53.0, 1.0),
    (50.0, 0.7),
];

fn finite_or_zero(x: f64) -> f64 {
    if x.is_finite() {
        x
    } else {
        0.0
    }
}

fn weight_frac(a: &Assessment) -> f64 {
    finite_or_zero(a.weight) / 100.0
}

/// Score of a graded row. NaN/inf count as "not graded".
fn graded_score(a: &Assessment) -> Option<f64> {
    a.score.filter(|s| s.is_finite())
}

/// Weighted sum of graded rows, in percent. Not normalized by the actual
/// weight sum: ungraded rows simply contribute nothing.
pub fn current_total(course: &Course) -> f64 {
    course
        .assessments
        .iter()
        .filter_map(|a| graded_score(a).map(|s| weight_frac(a) * (s / 100.0) * 100.0))
        .sum()
}

pub fn weights_sum(course: &Course) -> f64 {
    course.assessments.iter().map(|a| finite_or_zero(a.weight)).sum()
}

pub fn weights_valid(course: &Course) -> bool {
    (weights_sum(course) - 100.0).abs() <= WEIGHT_EPSILON
}

pub fn final_weight(course: &Course) -> f64 {
    course
        .assessments
        .iter()
        .filter(|a| a.is_final)
        .map(|a| finite_or_zero(a.weight))
        .sum()
}

/// Score needed on the still-ungraded final rows to reach `course.target`.
///
/// Ungraded final rows are lumped together and solved for one average.
/// Returns `None` when no ungraded final weight remains. The result is
/// clamped to `[0, REQUIRED_FINAL_MAX]`.
pub fn required_final(course: &Course) -> Option<f64> {
    let target_frac = finite_or_zero(course.target) / 100.0;

    let mut non_final_sum_frac = 0.0;
    let mut graded_final_sum_frac = 0.0;
    let mut remaining_final_weight_frac = 0.0;

    for a in &course.assessments {
        let w = weight_frac(a);
        match (a.is_final, graded_score(a)) {
            (true, Some(s)) => graded_final_sum_frac += w * (s / 100.0),
            (true, None) => remaining_final_weight_frac += w,
            (false, Some(s)) => non_final_sum_frac += w * (s / 100.0),
            (false, None) => {}
        }
    }

    if remaining_final_weight_frac <= 0.0 {
        return None;
    }

    let req = ((target_frac - non_final_sum_frac - graded_final_sum_frac)
        / remaining_final_weight_frac)
        * 100.0;
    Some(req.clamp(0.0, REQUIRED_FINAL_MAX))
}

pub fn grade_point_from_percent(percent: f64) -> f64 {
    GRADE_BANDS
        .iter()
        .find(|(threshold, _)| percent >= *threshold)
        .map(|(_, gp)| *gp)
        .unwrap_or(0.0)
}

pub fn total_credits(courses: &[Course]) -> f64 {
    courses.iter().map(|c| finite_or_zero(c.credits)).sum()
}

/// Credit-weighted GPA. `None` when total credits are not positive.
pub fn overall_gpa(courses: &[Course]) -> Option<f64> {
    let credits = total_credits(courses);
    if credits <= 0.0 {
        return None;
    }
    let quality_points: f64 = courses
        .iter()
        .map(|c| grade_point_from_percent(current_total(c)) * finite_or_zero(c.credits))
        .sum();
    Some(quality_points / credits)
}

/// Plain mean of course totals (not credit-weighted).
pub fn average_grade(courses: &[Course]) -> Option<f64> {
    if courses.is_empty() {
        return None;
    }
    let sum: f64 = courses.iter().map(current_total).sum();
    Some(sum / courses.len() as f64)
}

/// Points this row adds to the course total, `None` when ungraded.
pub fn contribution(a: &Assessment) -> Option<f64> {
    graded_score(a).map(|s| weight_frac(a) * s)
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AssessmentLine {
    pub assessment_id: String,
    pub name: String,
    pub contribution: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CourseSummary {
    pub course_id: String,
    pub name: String,
    pub current_total: f64,
    pub weights_sum: f64,
    pub weights_valid: bool,
    pub final_weight: f64,
    pub required_final: Option<f64>,
    pub grade_point: f64,
    pub lines: Vec<AssessmentLine>,
}

impl CourseSummary {
    pub fn of(course: &Course) -> Self {
        let total = current_total(course);
        Self {
            course_id: course.id.clone(),
            name: course.name.clone(),
            current_total: total,
            weights_sum: weights_sum(course),
            weights_valid: weights_valid(course),
            final_weight: final_weight(course),
            required_final: required_final(course),
            grade_point: grade_point_from_percent(total),
            lines: course
                .assessments
                .iter()
                .map(|a| AssessmentLine {
                    assessment_id: a.id.clone(),
                    name: a.name.clone(),
                    contribution: contribution(a),
                })
                .collect(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SemesterSummary {
    pub gpa: Option<f64>,
    pub total_credits: f64,
    pub average_grade: Option<f64>,
    pub courses: Vec<CourseSummary>,
}

impl SemesterSummary {
    pub fn of(courses: &[Course]) -> Self {
        Self {
            gpa: overall_gpa(courses),
            total_credits: total_credits(courses),
            average_grade: average_grade(courses),
            courses: courses.iter().map(CourseSummary::of).collect(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn course(rows: Vec<Assessment>, target: f64) -> Course {
        let mut c = Course::new("Test Course");
        c.target = target;
        c.assessments = rows;
        c
    }

    fn graded(weight: f64, score: f64) -> Assessment {
        Assessment::new("Item", "Other", weight).with_score(score)
    }

    fn final_row(weight: f64) -> Assessment {
        Assessment {
            weight,
            ..Assessment::final_exam()
        }
    }

    fn close(a: f64, b: f64) -> bool {
        (a - b).abs() < 1e-9
    }

    #[test]
    fn single_final_scenario() {
        let c = course(vec![graded(20.0, 80.0), graded(30.0, 70.0), final_row(50.0)], 80.0);
        assert!(close(current_total(&c), 37.0));
        assert!(close(required_final(&c).expect("required"), 86.0));
        assert!(close(final_weight(&c), 50.0));
        assert!(weights_valid(&c));
    }

    #[test]
    fn weight_sum_drift_beyond_tolerance_is_flagged() {
        let near = course(vec![graded(49.995, 80.0), final_row(50.0)], 80.0);
        assert!(weights_valid(&near));

        let short = course(vec![graded(49.98, 80.0), final_row(50.0)], 80.0);
        assert!(!weights_valid(&short));

        let over = course(vec![graded(51.0, 80.0), final_row(50.0)], 80.0);
        assert!(!weights_valid(&over));
        assert!(!CourseSummary::of(&over).weights_valid);

        assert!(!weights_valid(&course(Vec::new(), 80.0)));
    }

    #[test]
    fn split_final_is_solved_as_one_average() {
        let c = course(vec![graded(50.0, 90.0), final_row(25.0), final_row(25.0)], 80.0);
        assert!(close(required_final(&c).expect("required"), 70.0));
    }

    #[test]
    fn graded_final_counts_toward_target() {
        let mut part_one = final_row(25.0);
        part_one.score = Some(60.0);
        let c = course(vec![graded(50.0, 90.0), part_one, final_row(25.0)], 80.0);
        // (0.80 - 0.45 - 0.15) / 0.25
        assert!(close(required_final(&c).expect("required"), 80.0));
    }

    #[test]
    fn required_final_is_none_without_ungraded_final() {
        let mut done = final_row(50.0);
        done.score = Some(90.0);
        assert_eq!(required_final(&course(vec![graded(50.0, 90.0), done], 80.0)), None);
        assert_eq!(required_final(&course(vec![graded(100.0, 90.0)], 80.0)), None);
        assert_eq!(required_final(&course(vec![final_row(0.0)], 80.0)), None);
    }

    #[test]
    fn required_final_clamps_to_zero_and_two_hundred() {
        let easy = course(vec![graded(90.0, 100.0), final_row(10.0)], 50.0);
        assert_eq!(required_final(&easy), Some(0.0));

        let hopeless = course(vec![graded(90.0, 0.0), final_row(10.0)], 90.0);
        assert_eq!(required_final(&hopeless), Some(REQUIRED_FINAL_MAX));
    }

    #[test]
    fn ungraded_and_nan_scores_are_skipped() {
        let mut nan = graded(40.0, 0.0);
        nan.score = Some(f64::NAN);
        let c = course(vec![Assessment::new("Quiz", "Quiz", 60.0), nan], 80.0);
        assert_eq!(current_total(&c), 0.0);
        assert!(close(weights_sum(&c), 100.0));
    }

    #[test]
    fn current_total_ignores_row_order() {
        let rows = vec![graded(10.0, 55.0), graded(25.0, 91.5), graded(15.0, 73.0)];
        let mut reversed = rows.clone();
        reversed.reverse();
        assert!(close(
            current_total(&course(rows, 80.0)),
            current_total(&course(reversed, 80.0))
        ));
    }

    #[test]
    fn grade_bands_are_exact_at_thresholds() {
        assert_eq!(grade_point_from_percent(85.0), 4.0);
        assert_eq!(grade_point_from_percent(84.999), 3.7);
        assert_eq!(grade_point_from_percent(80.0), 3.7);
        assert_eq!(grade_point_from_percent(50.0), 0.7);
        assert_eq!(grade_point_from_percent(49.999), 0.0);
        assert_eq!(grade_point_from_percent(f64::NAN), 0.0);
        assert_eq!(grade_point_from_percent(130.0), 4.0);
    }

    #[test]
    fn gpa_is_credit_weighted_and_none_without_credits() {
        assert_eq!(overall_gpa(&[]), None);

        let mut zero = course(vec![graded(100.0, 90.0)], 80.0);
        zero.credits = 0.0;
        assert_eq!(overall_gpa(&[zero]), None);

        let mut a = course(vec![graded(100.0, 90.0)], 80.0);
        a.credits = 1.0;
        let mut b = course(vec![graded(100.0, 71.0)], 80.0);
        b.credits = 0.5;
        // (4.0 * 1.0 + 2.7 * 0.5) / 1.5
        assert!(close(overall_gpa(&[a, b]).expect("gpa"), 5.35 / 1.5));
    }

    #[test]
    fn average_grade_and_contribution() {
        let a = course(vec![graded(50.0, 80.0)], 80.0);
        let b = course(vec![graded(100.0, 60.0)], 80.0);
        assert_eq!(average_grade(&[]), None);
        assert!(close(average_grade(&[a, b]).expect("avg"), 50.0));
        assert_eq!(contribution(&Assessment::item()), None);
        assert!(close(contribution(&graded(2.0, 100.0)).expect("pts"), 2.0));
    }
}
