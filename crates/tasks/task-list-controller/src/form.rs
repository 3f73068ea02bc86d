//! Creation and edit form state with validation.

use once_cell::sync::Lazy;
use regex::Regex;
use std::fmt;
use thiserror::Error;

use crate::task::{Task, TaskDetails};

/// Minimum number of characters for title and description.
pub const MIN_TEXT_LEN: usize = 3;

static IMAGE_URL_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"^https?://(www\.)?[-a-zA-Z0-9@:%._+~#=]{1,256}\.[a-zA-Z0-9()]{1,6}\b([-a-zA-Z0-9()@:%_+.~#?&/=]*)$",
    )
    .expect("image URL pattern is valid")
});

/// Whether `url` looks like an http(s) URL.
pub fn is_url_shaped(url: &str) -> bool {
    IMAGE_URL_PATTERN.is_match(url)
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FormField {
    Title,
    Description,
    ImageUrl,
}

impl FormField {
    pub const ALL: [FormField; 3] = [FormField::Title, FormField::Description, FormField::ImageUrl];

    pub fn label(self) -> &'static str {
        match self {
            FormField::Title => "Title",
            FormField::Description => "Description",
            FormField::ImageUrl => "Image URL",
        }
    }

    /// Next field in tab order, wrapping around.
    pub fn next(self) -> Self {
        match self {
            FormField::Title => FormField::Description,
            FormField::Description => FormField::ImageUrl,
            FormField::ImageUrl => FormField::Title,
        }
    }
}

impl fmt::Display for FormField {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.label())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldProblem {
    Required,
    TooShort { min: usize },
    NotAUrl,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {}", describe(.problem))]
pub struct FieldError {
    pub field: FormField,
    pub problem: FieldProblem,
}

fn describe(problem: &FieldProblem) -> String {
    match problem {
        FieldProblem::Required => "is required".to_string(),
        FieldProblem::TooShort { min } => format!("must be at least {min} characters"),
        FieldProblem::NotAUrl => "must be a valid http(s) URL".to_string(),
    }
}

/// Every problem found in one validation pass.
#[derive(Debug, Clone, Default, PartialEq, Eq, Error)]
#[error("{}", join_errors(.errors))]
pub struct FormErrors {
    errors: Vec<FieldError>,
}

fn join_errors(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(ToString::to_string)
        .collect::<Vec<_>>()
        .join("; ")
}

impl FormErrors {
    pub fn is_empty(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &FieldError> {
        self.errors.iter()
    }

    pub fn for_field(&self, field: FormField) -> Option<&FieldError> {
        self.errors.iter().find(|e| e.field == field)
    }

    fn push(&mut self, field: FormField, problem: FieldProblem) {
        self.errors.push(FieldError { field, problem });
    }
}

/// Raw text of the three task fields as typed by the user.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskForm {
    pub title: String,
    pub description: String,
    pub image_url: String,
}

impl TaskForm {
    pub fn new(
        title: impl Into<String>,
        description: impl Into<String>,
        image_url: impl Into<String>,
    ) -> Self {
        Self {
            title: title.into(),
            description: description.into(),
            image_url: image_url.into(),
        }
    }

    /// A form prefilled with an existing task's fields.
    pub fn from_task(task: &Task) -> Self {
        Self::new(task.title(), task.description(), task.image_url())
    }

    pub fn field(&self, field: FormField) -> &str {
        match field {
            FormField::Title => &self.title,
            FormField::Description => &self.description,
            FormField::ImageUrl => &self.image_url,
        }
    }

    pub fn field_mut(&mut self, field: FormField) -> &mut String {
        match field {
            FormField::Title => &mut self.title,
            FormField::Description => &mut self.description,
            FormField::ImageUrl => &mut self.image_url,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.title.is_empty() && self.description.is_empty() && self.image_url.is_empty()
    }

    pub fn reset(&mut self) {
        *self = Self::default();
    }

    pub fn is_valid(&self) -> bool {
        self.validate().is_ok()
    }

    /// Check every field and return the validated details.
    pub fn validate(&self) -> Result<TaskDetails, FormErrors> {
        let mut errors = FormErrors::default();

        check_text(&mut errors, FormField::Title, &self.title);
        check_text(&mut errors, FormField::Description, &self.description);

        if self.image_url.is_empty() {
            errors.push(FormField::ImageUrl, FieldProblem::Required);
        } else if !is_url_shaped(&self.image_url) {
            errors.push(FormField::ImageUrl, FieldProblem::NotAUrl);
        }

        if !errors.is_empty() {
            return Err(errors);
        }

        Ok(TaskDetails {
            title: self.title.clone(),
            description: self.description.clone(),
            image_url: self.image_url.clone(),
        })
    }
}

fn check_text(errors: &mut FormErrors, field: FormField, value: &str) {
    if value.is_empty() {
        errors.push(field, FieldProblem::Required);
    } else if value.chars().count() < MIN_TEXT_LEN {
        errors.push(field, FieldProblem::TooShort { min: MIN_TEXT_LEN });
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_form() -> TaskForm {
        TaskForm::new("Buy milk", "At the store", "https://example.com/a.png")
    }

    #[test]
    fn test_valid_form_passes() {
        let details = valid_form().validate().unwrap();
        assert_eq!(details.title, "Buy milk");
        assert_eq!(details.image_url, "https://example.com/a.png");
    }

    #[test]
    fn test_short_title_is_rejected() {
        let form = TaskForm {
            title: "ab".to_string(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.for_field(FormField::Title).map(|e| &e.problem),
            Some(&FieldProblem::TooShort { min: 3 })
        );
        assert_eq!(errors.iter().count(), 1);
    }

    #[test]
    fn test_empty_description_is_required() {
        let form = TaskForm {
            description: String::new(),
            ..valid_form()
        };
        let errors = form.validate().unwrap_err();
        assert_eq!(
            errors.for_field(FormField::Description).map(|e| &e.problem),
            Some(&FieldProblem::Required)
        );
    }

    #[test]
    fn test_length_counts_characters() {
        let form = TaskForm {
            title: "été".to_string(),
            ..valid_form()
        };
        assert!(form.is_valid());
    }

    #[test]
    fn test_url_shapes() {
        assert!(is_url_shaped("https://example.com/a.png"));
        assert!(is_url_shaped("http://www.example.org"));
        assert!(is_url_shaped(
            "https://upload.wikimedia.org/wikipedia/commons/thumb/c/cf/logo.svg/1200px-logo.svg.png"
        ));
        assert!(is_url_shaped("https://images.example.com/photo?id=1&s=200"));
        assert!(!is_url_shaped("not-a-url"));
        assert!(!is_url_shaped("ftp://example.com/a.png"));
        assert!(!is_url_shaped("https://localhost"));
        assert!(!is_url_shaped("https://exa mple.com"));
    }

    #[test]
    fn test_all_problems_reported_together() {
        let errors = TaskForm::new("", "ab", "not-a-url").validate().unwrap_err();
        assert_eq!(errors.iter().count(), 3);
        assert_eq!(
            errors.to_string(),
            "Title: is required; Description: must be at least 3 characters; Image URL: must be a valid http(s) URL"
        );
    }

    #[test]
    fn test_reset_and_field_access() {
        let mut form = valid_form();
        form.field_mut(FormField::Title).push('!');
        assert_eq!(form.field(FormField::Title), "Buy milk!");

        form.reset();
        assert!(form.is_empty());
        assert_eq!(FormField::ImageUrl.next(), FormField::Title);
    }
}
