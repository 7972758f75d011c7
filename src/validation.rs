//! Input validation shared by the client forms and the REST handlers.
//!
//! Every check here runs before any network call on the client, and again on
//! the server so that a bypassed client cannot store malformed content.

use std::fmt;

use crate::models::{
    CreateCommentRequest, CreateRequestRequest, CreateTutorialRequest, ReportProblemRequest,
    SignUpRequest,
};

/// Minimum strength score accepted at sign-up.
pub const MIN_PASSWORD_SCORE: u8 = 2;

/// Minimum password length counted by the strength meter.
pub const MIN_PASSWORD_LENGTH: usize = 8;

/// A user input problem caught before it reaches the backend.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    MissingFields,
    PasswordMismatch,
    WeakPassword,
    TermsNotAccepted,
    EmptyField(&'static str),
    NoSteps,
    StepOutOfRange { step: i64, steps: usize },
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::MissingFields => f.write_str("Preencha todos os campos"),
            ValidationError::PasswordMismatch => f.write_str("As senhas não coincidem"),
            ValidationError::WeakPassword => f.write_str("A senha precisa ser mais forte"),
            ValidationError::TermsNotAccepted => f.write_str("Aceite os termos para continuar"),
            ValidationError::EmptyField(field) => write!(f, "O campo {} é obrigatório", field),
            ValidationError::NoSteps => f.write_str("Adicione pelo menos um passo"),
            ValidationError::StepOutOfRange { step, steps } => {
                write!(f, "Passo {} não existe (o tutorial tem {} passos)", step, steps)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

/// Score a password from 0 to 3: length, an uppercase letter, a digit.
pub fn password_strength(password: &str) -> u8 {
    let checks = [
        password.chars().count() >= MIN_PASSWORD_LENGTH,
        password.chars().any(|c| c.is_ascii_uppercase()),
        password.chars().any(|c| c.is_ascii_digit()),
    ];
    checks.iter().filter(|passed| **passed).count() as u8
}

/// The sign-up form as the user filled it in.
#[derive(Debug, Clone, Default)]
pub struct SignUpForm {
    pub name: String,
    pub email: String,
    pub password: String,
    pub confirm_password: String,
    pub accept_terms: bool,
}

/// Check a sign-up form, in the order the form reports problems.
pub fn validate_sign_up(form: &SignUpForm) -> Result<SignUpRequest, ValidationError> {
    if form.name.trim().is_empty()
        || form.email.trim().is_empty()
        || form.password.is_empty()
        || form.confirm_password.is_empty()
    {
        return Err(ValidationError::MissingFields);
    }
    if form.password != form.confirm_password {
        return Err(ValidationError::PasswordMismatch);
    }
    if password_strength(&form.password) < MIN_PASSWORD_SCORE {
        return Err(ValidationError::WeakPassword);
    }
    if !form.accept_terms {
        return Err(ValidationError::TermsNotAccepted);
    }

    Ok(SignUpRequest {
        email: form.email.trim().to_string(),
        password: form.password.clone(),
        name: form.name.trim().to_string(),
    })
}

/// Server-side half of the sign-up rules.
pub fn validate_credentials(request: &SignUpRequest) -> Result<(), ValidationError> {
    if request.email.trim().is_empty() || request.name.trim().is_empty() {
        return Err(ValidationError::MissingFields);
    }
    validate_new_password(&request.password)
}

pub fn validate_new_password(password: &str) -> Result<(), ValidationError> {
    if password.is_empty() {
        return Err(ValidationError::MissingFields);
    }
    if password_strength(password) < MIN_PASSWORD_SCORE {
        return Err(ValidationError::WeakPassword);
    }
    Ok(())
}

/// Trim the text fields and drop blank steps.
pub fn validate_tutorial(
    request: CreateTutorialRequest,
) -> Result<CreateTutorialRequest, ValidationError> {
    let title = non_blank(&request.title, "título")?;
    let description = non_blank(&request.description, "descrição")?;
    let steps: Vec<String> = request
        .steps
        .iter()
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())
        .map(str::to_string)
        .collect();
    if steps.is_empty() {
        return Err(ValidationError::NoSteps);
    }

    Ok(CreateTutorialRequest {
        title,
        description,
        steps,
        category: request.category,
    })
}

pub fn validate_request(
    request: CreateRequestRequest,
) -> Result<CreateRequestRequest, ValidationError> {
    Ok(CreateRequestRequest {
        title: non_blank(&request.title, "título")?,
        description: non_blank(&request.description, "descrição")?,
        category: request.category,
    })
}

/// `steps` is the step count of the tutorial being reported against.
pub fn validate_problem(
    request: ReportProblemRequest,
    steps: usize,
) -> Result<ReportProblemRequest, ValidationError> {
    let description = non_blank(&request.description, "descrição")?;
    if let Some(step) = request.step_number {
        if step < 1 || step > steps as i64 {
            return Err(ValidationError::StepOutOfRange { step, steps });
        }
    }

    Ok(ReportProblemRequest {
        tutorial_id: request.tutorial_id,
        step_number: request.step_number,
        description,
    })
}

pub fn validate_comment(
    request: CreateCommentRequest,
) -> Result<CreateCommentRequest, ValidationError> {
    Ok(CreateCommentRequest {
        content: non_blank(&request.content, "comentário")?,
    })
}

pub fn validate_profile_name(name: &str) -> Result<String, ValidationError> {
    non_blank(name, "nome")
}

pub fn validate_folder_name(name: &str) -> Result<String, ValidationError> {
    non_blank(name, "nome da pasta")
}

fn non_blank(value: &str, field: &'static str) -> Result<String, ValidationError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        Err(ValidationError::EmptyField(field))
    } else {
        Ok(trimmed.to_string())
    }
}
