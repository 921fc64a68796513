use crate::ipc::error::ok;
use crate::ipc::helpers::param;
use crate::ipc::types::Request;
use gradetrackd::calc::{self, CourseSummary, SemesterSummary};
use gradetrackd::model::Course;
use serde_json::json;

fn handle_course_summary(req: &Request) -> serde_json::Value {
    let course: Course = match param(req, "course") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    ok(&req.id, json!(CourseSummary::of(&course)))
}

fn handle_semester_summary(req: &Request) -> serde_json::Value {
    let courses: Vec<Course> = match param(req, "courses") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    ok(&req.id, json!(SemesterSummary::of(&courses)))
}

fn handle_grade_point(req: &Request) -> serde_json::Value {
    let percent: f64 = match param(req, "percent") {
        Ok(v) => v,
        Err(resp) => return resp,
    };
    ok(
        &req.id,
        json!({ "gradePoint": calc::grade_point_from_percent(percent) }),
    )
}

pub fn try_handle(req: &Request) -> Option<serde_json::Value> {
    match req.method.as_str() {
        "grade.courseSummary" => Some(handle_course_summary(req)),
        "grade.semesterSummary" => Some(handle_semester_summary(req)),
        "grade.gradePoint" => Some(handle_grade_point(req)),
        _ => None,
    }
}
