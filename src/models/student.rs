//! Student and grade models

use crate::error::AppError;
use serde::{Deserialize, Serialize};
use validator::{Validate, ValidationErrors};

/// Student record
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct Student {
    pub stud_id: i32,
    pub stud_fname: String,
    pub stud_sname: String,
    pub stud_email: String,
}

/// Grade row joined with its student and course
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq, sqlx::FromRow)]
pub struct GradeRecord {
    pub grade_id: i32,
    pub stud_id: i32,
    pub stud_fname: String,
    pub stud_sname: String,
    pub crs_name: String,
    pub stud_grade: i32,
}

/// Width of the student name and email columns
pub const FIELD_MAX_LENGTH: u64 = 255;

/// Create / update student request
#[derive(Debug, Clone, Deserialize, Validate)]
pub struct StudentRequest {
    #[serde(default)]
    #[validate(length(min = 1, max = FIELD_MAX_LENGTH, message = "invalid stud_fname"))]
    pub stud_fname: String,

    #[serde(default)]
    #[validate(length(min = 1, max = FIELD_MAX_LENGTH, message = "invalid stud_sname"))]
    pub stud_sname: String,

    #[serde(default)]
    #[validate(
        email(message = "invalid stud_email"),
        length(max = FIELD_MAX_LENGTH, message = "invalid stud_email")
    )]
    pub stud_email: String,
}

impl StudentRequest {
    /// Trim every field and HTML-escape the names
    pub fn sanitized(self) -> Self {
        Self {
            stud_fname: escape_html(self.stud_fname.trim()),
            stud_sname: escape_html(self.stud_sname.trim()),
            stud_email: self.stud_email.trim().to_string(),
        }
    }

    /// Sanitize then validate, collecting every field error.
    /// Length limits apply to the escaped text, which is what gets stored.
    pub fn into_valid(self) -> Result<Self, AppError> {
        let req = self.sanitized();
        req.validate().map_err(validation_error)?;
        Ok(req)
    }
}

/// Delete response; `deletedId` is null when no row matched
#[derive(Debug, Serialize, Deserialize, PartialEq, Eq)]
pub struct DeleteResponse {
    #[serde(rename = "deletedId")]
    pub deleted_id: Option<i32>,
}

/// Parse a path id: digits only, no sign
pub fn parse_id(raw: &str) -> Result<i32, AppError> {
    if raw.is_empty() || !raw.bytes().all(|b| b.is_ascii_digit()) {
        return Err(AppError::validation("invalid id parameter"));
    }
    raw.parse::<i32>()
        .map_err(|_| AppError::validation("invalid id parameter"))
}

fn validation_error(errors: ValidationErrors) -> AppError {
    let mut messages: Vec<String> = errors
        .field_errors()
        .into_iter()
        .flat_map(|(field, errs)| {
            errs.iter().map(move |e| {
                e.message
                    .as_ref()
                    .map(|m| m.to_string())
                    .unwrap_or_else(|| format!("invalid {}", field))
            })
        })
        .collect();
    messages.sort();
    messages.dedup();
    AppError::Validation(messages)
}

fn escape_html(input: &str) -> String {
    let mut out = String::with_capacity(input.len());
    for c in input.chars() {
        match c {
            '&' => out.push_str("&amp;"),
            '<' => out.push_str("&lt;"),
            '>' => out.push_str("&gt;"),
            '"' => out.push_str("&quot;"),
            '\'' => out.push_str("&#x27;"),
            '/' => out.push_str("&#x2F;"),
            '\\' => out.push_str("&#x5C;"),
            '`' => out.push_str("&#96;"),
            _ => out.push(c),
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn request(fname: &str, sname: &str, email: &str) -> StudentRequest {
        StudentRequest {
            stud_fname: fname.to_string(),
            stud_sname: sname.to_string(),
            stud_email: email.to_string(),
        }
    }

    #[test]
    fn test_valid_request() {
        let req = request(" Ada ", "Lovelace", "ada@example.com").into_valid().unwrap();
        assert_eq!(req.stud_fname, "Ada");
        assert_eq!(req.stud_email, "ada@example.com");
    }

    #[test]
    fn test_all_field_errors_collected() {
        match request("  ", "", "not-an-email").into_valid() {
            Err(AppError::Validation(items)) => {
                assert_eq!(
                    items,
                    vec!["invalid stud_email", "invalid stud_fname", "invalid stud_sname"]
                );
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_names_are_escaped() {
        let req = request("<b>Ada</b>", "O'Neil", "ada@example.com").into_valid().unwrap();
        assert_eq!(req.stud_fname, "&lt;b&gt;Ada&lt;&#x2F;b&gt;");
        assert_eq!(req.stud_sname, "O&#x27;Neil");
    }

    #[test]
    fn test_length_limit_counts_escaped_text() {
        // '<' escapes to four characters
        let fits = "<".repeat(63);
        let req = request(&fits, "Lovelace", "ada@example.com").into_valid().unwrap();
        assert_eq!(req.stud_fname.len(), 252);

        let too_long = "<".repeat(64);
        match request(&too_long, &"x".repeat(256), "ada@example.com").into_valid() {
            Err(AppError::Validation(items)) => {
                assert_eq!(items, vec!["invalid stud_fname", "invalid stud_sname"]);
            }
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_long_email_reported_once() {
        let email = format!("{}@example.com", "a".repeat(250));
        match request("Ada", "Lovelace", &email).into_valid() {
            Err(AppError::Validation(items)) => assert_eq!(items, vec!["invalid stud_email"]),
            other => panic!("expected validation error, got {other:?}"),
        }
    }

    #[test]
    fn test_parse_id() {
        assert_eq!(parse_id("42").unwrap(), 42);
        assert!(parse_id("").is_err());
        assert!(parse_id("-1").is_err());
        assert!(parse_id("1e3").is_err());
        assert!(parse_id("abc").is_err());
        assert!(parse_id("99999999999").is_err());
    }

    #[test]
    fn test_delete_response_shape() {
        let json = serde_json::to_value(DeleteResponse { deleted_id: Some(3) }).unwrap();
        assert_eq!(json["deletedId"], 3);
        let json = serde_json::to_value(DeleteResponse { deleted_id: None }).unwrap();
        assert!(json["deletedId"].is_null());
    }
}
