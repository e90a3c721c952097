//! Prompt Builder: renders the resume + job description into one instruction string.
//!
//! The template is configurable (wording, alignment target, fabrication rule) but its
//! shape is not: `{resume}` must come before `{job_description}`. Rendering is a single
//! left-to-right pass, so placeholder-looking text inside a resume is never expanded.

use std::path::Path;

use thiserror::Error;

pub mod templates;

use templates::{ALLOW_FABRICATION_RULE, DEFAULT_TEMPLATE, NO_FABRICATION_RULE};

#[derive(Debug, Error)]
pub enum PromptTemplateError {
    #[error("prompt template is missing the {0} placeholder")]
    MissingPlaceholder(&'static str),

    #[error("prompt template must place {{resume}} before {{job_description}}")]
    OutOfOrder,

    #[error("failed to read prompt template from {path}: {source}")]
    Read {
        path: String,
        #[source]
        source: std::io::Error,
    },
}

/// Wording knobs that distinguish one deployment's prompt from another's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PromptOptions {
    /// Target alignment with the job description, 1–100.
    pub alignment_percent: u8,
    pub allow_fabrication: bool,
}

impl Default for PromptOptions {
    fn default() -> Self {
        Self {
            alignment_percent: 90,
            allow_fabrication: false,
        }
    }
}

impl PromptOptions {
    fn fabrication_rule(&self) -> &'static str {
        if self.allow_fabrication {
            ALLOW_FABRICATION_RULE
        } else {
            NO_FABRICATION_RULE
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Placeholder {
    Resume,
    JobDescription,
    AlignmentPercent,
    FabricationRule,
}

impl Placeholder {
    const ALL: [Placeholder; 4] = [
        Placeholder::Resume,
        Placeholder::JobDescription,
        Placeholder::AlignmentPercent,
        Placeholder::FabricationRule,
    ];

    fn token(self) -> &'static str {
        match self {
            Placeholder::Resume => "{resume}",
            Placeholder::JobDescription => "{job_description}",
            Placeholder::AlignmentPercent => "{alignment_percent}",
            Placeholder::FabricationRule => "{fabrication_rule}",
        }
    }

    /// Matches a placeholder token at the very start of `text`.
    fn at_start_of(text: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| text.starts_with(p.token()))
    }
}

#[derive(Debug, Clone)]
pub struct PromptTemplate {
    template: String,
    options: PromptOptions,
}

impl Default for PromptTemplate {
    fn default() -> Self {
        Self::with_options(PromptOptions::default())
    }
}

impl PromptTemplate {
    /// Builds a template from custom wording, validating placeholder presence and order.
    pub fn new(
        template: impl Into<String>,
        options: PromptOptions,
    ) -> Result<Self, PromptTemplateError> {
        let template = template.into();

        let resume_at = template
            .find(Placeholder::Resume.token())
            .ok_or(PromptTemplateError::MissingPlaceholder("{resume}"))?;
        let jd_at = template
            .find(Placeholder::JobDescription.token())
            .ok_or(PromptTemplateError::MissingPlaceholder("{job_description}"))?;
        if resume_at > jd_at {
            return Err(PromptTemplateError::OutOfOrder);
        }

        Ok(Self { template, options })
    }

    /// The built-in wording with the given options.
    pub fn with_options(options: PromptOptions) -> Self {
        Self {
            template: DEFAULT_TEMPLATE.to_string(),
            options,
        }
    }

    /// Loads custom wording from a UTF-8 file.
    pub fn from_file(path: &Path, options: PromptOptions) -> Result<Self, PromptTemplateError> {
        let template =
            std::fs::read_to_string(path).map_err(|source| PromptTemplateError::Read {
                path: path.display().to_string(),
                source,
            })?;
        Self::new(template, options)
    }

    pub fn options(&self) -> PromptOptions {
        self.options
    }

    /// Substitutes both documents into the template. Embedded text is inserted verbatim.
    pub fn render(&self, resume: &str, job_description: &str) -> String {
        let alignment = self.options.alignment_percent.to_string();
        let fabrication_rule = self.options.fabrication_rule();

        let mut out =
            String::with_capacity(self.template.len() + resume.len() + job_description.len());
        let mut rest = self.template.as_str();

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let tail = &rest[start..];
            match Placeholder::at_start_of(tail) {
                Some(placeholder) => {
                    out.push_str(match placeholder {
                        Placeholder::Resume => resume,
                        Placeholder::JobDescription => job_description,
                        Placeholder::AlignmentPercent => alignment.as_str(),
                        Placeholder::FabricationRule => fabrication_rule,
                    });
                    rest = &tail[placeholder.token().len()..];
                }
                None => {
                    out.push('{');
                    rest = &tail[1..];
                }
            }
        }
        out.push_str(rest);
        out
    }
}
