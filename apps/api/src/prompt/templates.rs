// Prompt wording for the resume tweak pipeline.
// Placeholders: {resume}, {job_description}, {alignment_percent}, {fabrication_rule}.

/// Default instruction template. The resume always precedes the job description.
pub const DEFAULT_TEMPLATE: &str = r#"
You are a resume optimization expert.

Here is the candidate's resume:
{resume}

Here is a job description:
{job_description}

Modify the resume to align up to {alignment_percent}% with the job description. Highlight relevant skills and experiences. Keep formatting professional. {fabrication_rule}
"#;

pub const NO_FABRICATION_RULE: &str = "Do not fabricate information.";

pub const ALLOW_FABRICATION_RULE: &str = "Where the job description asks for skills or \
    experience the resume does not mention, you may add plausible entries, \
    but keep them consistent with the candidate's background.";
