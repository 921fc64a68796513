//! Course-outline import through a chat-completion endpoint.
//!
//! The model is asked to return `{ "courses": [...] }`; replies may come
//! wrapped in a fenced code block.

use crate::model::{
    lenient_bool, lenient_list, lenient_number, lenient_string, new_id, Assessment, Course,
    GradingScheme, DEFAULT_TARGET,
};
use serde::{Deserialize, Deserializer, Serialize};
use thiserror::Error;

pub const DEFAULT_MODEL: &str = "meta-llama/llama-4-scout-17b-16e-instruct";
const DEFAULT_MAX_CHARS: usize = 35_000;
const DEFAULT_PARSED_CREDITS: f64 = 0.5;
const TRUNCATION_NOTE: &str =
    "\n\n[Text truncated - paste only the grading/assessment sections for best results]";

#[derive(Debug, Clone, Copy, Serialize)]
pub struct AiModel {
    pub id: &'static str,
    pub name: &'static str,
    pub context: &'static str,
}

pub const AI_MODELS: [AiModel; 5] = [
    AiModel {
        id: "groq/compound",
        name: "Groq Compound",
        context: "70K",
    },
    AiModel {
        id: "groq/compound-mini",
        name: "Groq Compound Mini",
        context: "70K",
    },
    AiModel {
        id: DEFAULT_MODEL,
        name: "Llama 4 Scout",
        context: "30K",
    },
    AiModel {
        id: "llama-3.3-70b-versatile",
        name: "Llama 3.3 70B",
        context: "12K",
    },
    AiModel {
        id: "qwen/qwen3-32b",
        name: "Qwen 3 32B",
        context: "6K",
    },
];

const SYSTEM_PROMPT: &str = r#"You extract grading information from course outlines and reply with JSON only.

The text may describe several courses. Return every course you find, keyed by its course code and title.

For each course give:
- "name": course code and title, e.g. "CIS*2520 - Data Structures"
- "credits": the credit value; use 0.5 when the outline does not say
- "schemes": one entry per grading scheme (most outlines have one); each has a "name" and "assessments"

Each assessment has "name", "category", "weight" and "isFinal".
- "weight" is the percentage for that single item. Split shared weights evenly ("3 labs, 15% total" -> three labs of 5).
- When only the best N of M count, list only N items.
- "category" is one of Assignment, Lab, Quiz, Midterm, Test, Final, Project, Participation, Other.
- Only the final exam has "isFinal": true.
- Weights within a scheme should add up to 100.

Reply shape:
{"courses":[{"name":"...","credits":0.5,"schemes":[{"name":"Scheme 1","assessments":[{"name":"Quiz 1","category":"Quiz","weight":5,"isFinal":false}]}]}]}

No markdown, no commentary."#;

#[derive(Debug, Error)]
pub enum ImportError {
    #[error("an API key is required for outline import")]
    MissingApiKey,

    #[error("outline service request failed: {0}")]
    Http(#[from] reqwest::Error),

    #[error("outline service error: {status} - {body}")]
    Status { status: u16, body: String },

    #[error("no response from outline service")]
    EmptyReply,

    #[error("failed to parse AI response as JSON: {0}")]
    Parse(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedAssessment {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_string")]
    pub category: String,
    #[serde(default, deserialize_with = "lenient_number")]
    pub weight: f64,
    #[serde(default, deserialize_with = "lenient_bool")]
    pub is_final: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedScheme {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(default, deserialize_with = "lenient_list")]
    pub assessments: Vec<ParsedAssessment>,
}

fn default_parsed_credits() -> f64 {
    DEFAULT_PARSED_CREDITS
}

fn lenient_parsed_credits<'de, D>(d: D) -> Result<f64, D::Error>
where
    D: Deserializer<'de>,
{
    let v = Option::<serde_json::Value>::deserialize(d)?;
    Ok(v.and_then(|v| v.as_f64()).unwrap_or(DEFAULT_PARSED_CREDITS))
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ParsedCourse {
    #[serde(default, deserialize_with = "lenient_string")]
    pub name: String,
    #[serde(
        default = "default_parsed_credits",
        deserialize_with = "lenient_parsed_credits"
    )]
    pub credits: f64,
    #[serde(default, deserialize_with = "lenient_list")]
    pub schemes: Vec<ParsedScheme>,
}

impl ParsedCourse {
    /// Builds a fresh, ungraded course. Rows come from scheme
    /// `scheme_index`; the scheme list itself is kept only when there is a
    /// real choice (more than one scheme).
    pub fn into_course(self, scheme_index: usize) -> Course {
        let schemes: Vec<GradingScheme> = self
            .schemes
            .into_iter()
            .map(|s| GradingScheme {
                id: new_id(),
                name: s.name,
                assessments: s
                    .assessments
                    .into_iter()
                    .map(|a| Assessment {
                        id: new_id(),
                        name: a.name,
                        category: a.category,
                        weight: a.weight,
                        score: None,
                        is_final: a.is_final,
                    })
                    .collect(),
            })
            .collect();

        let assessments = schemes
            .get(scheme_index)
            .map(|s| s.assessments.clone())
            .unwrap_or_default();
        let multi = schemes.len() > 1;

        Course {
            id: new_id(),
            name: self.name,
            credits: self.credits,
            target: DEFAULT_TARGET,
            assessments,
            active_scheme_index: multi.then_some(scheme_index),
            grading_schemes: multi.then_some(schemes),
        }
    }
}

#[derive(Debug, Deserialize)]
struct OutlineReply {
    #[serde(default, deserialize_with = "lenient_list")]
    courses: Vec<ParsedCourse>,
}

#[derive(Debug, Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: Vec<ChatMessage<'a>>,
    temperature: f32,
    max_tokens: u32,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: Option<ChatReplyMessage>,
}

#[derive(Debug, Deserialize)]
struct ChatReplyMessage {
    content: Option<String>,
}

/// Input budget per model, in characters.
pub fn max_input_chars(model: &str) -> usize {
    match model {
        "meta-llama/llama-4-scout-17b-16e-instruct" => 100_000,
        "llama-3.3-70b-versatile" => 35_000,
        "qwen/qwen3-32b" => 18_000,
        _ => DEFAULT_MAX_CHARS,
    }
}

pub fn truncate_for_model(text: &str, model: &str) -> String {
    let max = max_input_chars(model);
    let len = text.chars().count();
    if len <= max {
        return text.to_string();
    }
    tracing::warn!(chars = len, max, "outline text too long; truncating");
    let mut out: String = text.chars().take(max).collect();
    out.push_str(TRUNCATION_NOTE);
    out
}

/// Removes a leading "```json" / "```" and a trailing "```".
pub fn strip_code_fences(reply: &str) -> &str {
    let s = reply.trim();
    let s = s
        .strip_prefix("```json")
        .or_else(|| s.strip_prefix("```"))
        .unwrap_or(s);
    let s = s.strip_suffix("```").unwrap_or(s);
    s.trim()
}

pub fn parse_reply(reply: &str) -> Result<Vec<ParsedCourse>, ImportError> {
    let body = strip_code_fences(reply);
    let parsed: OutlineReply = serde_json::from_str(body)?;
    Ok(parsed.courses)
}

pub struct OutlineClient {
    http: reqwest::Client,
    endpoint: String,
    api_key: String,
}

impl OutlineClient {
    pub fn new(endpoint: &str, api_key: &str) -> Result<Self, ImportError> {
        let api_key = api_key.trim();
        if api_key.is_empty() {
            return Err(ImportError::MissingApiKey);
        }
        let http = reqwest::Client::builder()
            .user_agent(concat!("gradetrackd/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(Self {
            http,
            endpoint: endpoint.to_string(),
            api_key: api_key.to_string(),
        })
    }

    pub async fn parse_outline(
        &self,
        text: &str,
        model: &str,
    ) -> Result<Vec<ParsedCourse>, ImportError> {
        let text = truncate_for_model(text.trim(), model);
        let user = format!(
            "Parse ALL courses from this text. There may be multiple courses - extract every one you find:\n\n{text}"
        );
        let body = ChatRequest {
            model,
            messages: vec![
                ChatMessage {
                    role: "system",
                    content: SYSTEM_PROMPT,
                },
                ChatMessage {
                    role: "user",
                    content: &user,
                },
            ],
            temperature: 0.1,
            max_tokens: 8192,
        };

        let response = self
            .http
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            tracing::error!(status = status.as_u16(), "outline service returned an error");
            return Err(ImportError::Status {
                status: status.as_u16(),
                body,
            });
        }

        let chat: ChatResponse = response.json().await?;
        let content = chat
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message)
            .and_then(|m| m.content)
            .filter(|c| !c.trim().is_empty())
            .ok_or(ImportError::EmptyReply)?;

        let courses = parse_reply(&content).inspect_err(|e| {
            tracing::error!(error = %e, "outline reply was not valid JSON");
        })?;
        tracing::info!(courses = courses.len(), model, "outline parsed");
        Ok(courses)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn strip_code_fences_handles_all_wrappings() {
        assert_eq!(strip_code_fences("```json\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("```\n{\"a\":1}\n```"), "{\"a\":1}");
        assert_eq!(strip_code_fences("  {\"a\":1}  "), "{\"a\":1}");
    }

    #[test]
    fn parse_reply_reads_courses_and_rejects_prose() {
        let reply = r#"```json
{"courses":[{"name":"CIS*2520","schemes":[{"name":"Scheme 1","assessments":[
  {"name":"Quiz 1","category":"Quiz","weight":2.5,"isFinal":false},
  {"name":"Final Exam","category":"Final","weight":40,"isFinal":true}]}]}]}
```"#;
        let courses = parse_reply(reply).expect("parse");
        assert_eq!(courses.len(), 1);
        assert_eq!(courses[0].credits, DEFAULT_PARSED_CREDITS);
        assert!(courses[0].schemes[0].assessments[1].is_final);

        assert!(matches!(
            parse_reply("Sure! Here are the courses."),
            Err(ImportError::Parse(_))
        ));
    }

    #[test]
    fn parse_reply_tolerates_null_fields() {
        let reply = r#"{"courses":[{"name":"STAT*2040","credits":null,"schemes":[
  {"name":null,"assessments":[
    {"name":"Lab 1","category":"Lab","weight":null,"isFinal":null},
    {"name":"Final","category":"Final","weight":45,"isFinal":true}]}]}]}"#;
        let courses = parse_reply(reply).expect("parse");
        assert_eq!(courses[0].credits, DEFAULT_PARSED_CREDITS);
        let scheme = &courses[0].schemes[0];
        assert_eq!(scheme.name, "");
        assert_eq!(scheme.assessments[0].weight, 0.0);
        assert!(!scheme.assessments[0].is_final);
        assert!(scheme.assessments[1].is_final);

        let course = courses[0].clone().into_course(0);
        assert_eq!(course.credits, DEFAULT_PARSED_CREDITS);
        assert_eq!(course.assessments.len(), 2);
    }

    fn parsed(schemes: usize) -> ParsedCourse {
        ParsedCourse {
            name: "ENGG*2400".into(),
            credits: 0.75,
            schemes: (0..schemes)
                .map(|i| ParsedScheme {
                    name: format!("Scheme {}", i + 1),
                    assessments: vec![ParsedAssessment {
                        name: "Final".into(),
                        category: "Final".into(),
                        weight: 50.0 + i as f64,
                        is_final: true,
                    }],
                })
                .collect(),
        }
    }

    #[test]
    fn single_scheme_course_drops_scheme_list() {
        let course = parsed(1).into_course(0);
        assert_eq!(course.target, DEFAULT_TARGET);
        assert_eq!(course.credits, 0.75);
        assert_eq!(course.assessments.len(), 1);
        assert_eq!(course.assessments[0].score, None);
        assert!(course.grading_schemes.is_none());
        assert!(course.active_scheme_index.is_none());
    }

    #[test]
    fn multi_scheme_course_keeps_schemes_in_sync() {
        let course = parsed(2).into_course(1);
        assert_eq!(course.active_scheme_index, Some(1));
        assert_eq!(course.grading_schemes.as_ref().map(Vec::len), Some(2));
        assert_eq!(course.assessments[0].weight, 51.0);
        assert_eq!(course.active_scheme().map(|s| s.name.as_str()), Some("Scheme 2"));
    }

    #[test]
    fn truncation_respects_model_budget() {
        let text = "x".repeat(20_000);
        assert_eq!(truncate_for_model(&text, DEFAULT_MODEL), text);
        let cut = truncate_for_model(&text, "qwen/qwen3-32b");
        assert!(cut.starts_with(&"x".repeat(18_000)));
        assert!(cut.ends_with(TRUNCATION_NOTE));
        assert_eq!(max_input_chars("unknown"), DEFAULT_MAX_CHARS);
    }

    #[test]
    fn client_requires_api_key() {
        assert!(matches!(
            OutlineClient::new("http://localhost", "  "),
            Err(ImportError::MissingApiKey)
        ));
    }
}
