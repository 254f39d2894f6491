use garde::Validate;

use crate::error::{AppError, Result};
use crate::models::generation::GenerationRequest;

const TASK_TOO_SHORT: &str =
    "Please provide a more detailed presentation topic (at least 10 characters)";
const TASK_TOO_LONG: &str = "Presentation topic is too long (maximum 500 characters)";
const MIN_TASK_CHARS: usize = 10;

/// Normalizes and validates a generation request before any network call.
///
/// The task and URL are trimmed in place.
///
/// # Returns
///
/// `AppError::Validation` with a user-facing message on the first problem found.
pub fn validate_generation_request(request: &mut GenerationRequest) -> Result<()> {
    request.task = request.task.trim().to_string();
    request.url = request.url.trim().to_string();

    if let Err(report) = request.validate() {
        for (path, error) in report.iter() {
            tracing::debug!("Validation failed on {}: {}", path, error);
        }

        let fields: Vec<String> = report.iter().map(|(path, _)| path.to_string()).collect();
        let message = if fields.iter().any(|f| f == "task") {
            if request.task.chars().count() < MIN_TASK_CHARS {
                TASK_TOO_SHORT.to_string()
            } else {
                TASK_TOO_LONG.to_string()
            }
        } else if fields.iter().any(|f| f == "slide_count") {
            "Please choose at least 1 slide".to_string()
        } else if fields.iter().any(|f| f == "design_style") {
            "Please choose a design style".to_string()
        } else {
            report.to_string()
        };

        return Err(AppError::Validation(message));
    }

    if !request.url.is_empty()
        && !request.url.starts_with("http://")
        && !request.url.starts_with("https://")
    {
        return Err(AppError::Validation(
            "Please enter a valid URL starting with http:// or https://".to_string(),
        ));
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(request: &mut GenerationRequest) -> String {
        match validate_generation_request(request) {
            Err(AppError::Validation(msg)) => msg,
            other => panic!("expected validation error, got {:?}", other),
        }
    }

    #[test]
    fn task_length_bounds() {
        assert_eq!(message(&mut GenerationRequest::new("123456789")), TASK_TOO_SHORT);
        assert!(validate_generation_request(&mut GenerationRequest::new("1234567890")).is_ok());
        assert_eq!(message(&mut GenerationRequest::new("x".repeat(501))), TASK_TOO_LONG);
        assert!(validate_generation_request(&mut GenerationRequest::new("x".repeat(500))).is_ok());
    }

    #[test]
    fn task_is_trimmed_before_length_check() {
        let mut request = GenerationRequest::new("   short    ");
        assert_eq!(message(&mut request), TASK_TOO_SHORT);
        assert_eq!(request.task, "short");
    }

    #[test]
    fn zero_slides_rejected() {
        let mut request = GenerationRequest::new("Quarterly sales review").with_slide_count(0);
        assert_eq!(message(&mut request), "Please choose at least 1 slide");
    }

    #[test]
    fn url_must_be_http() {
        let mut request = GenerationRequest::new("Quarterly sales review");
        request.url = "ftp://example.com/report".into();
        assert!(message(&mut request).contains("http://"));

        request.url = "  https://example.com/report ".into();
        assert!(validate_generation_request(&mut request).is_ok());
        assert_eq!(request.url, "https://example.com/report");
    }
}
