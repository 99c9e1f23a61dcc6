//! Typed upload resource templates.
//!
//! A template such as
//! `file/{segment}/{organisationNumber}/{statisticalProgram}/{referencePeriod}/{fileFormat}/{fileName}/{version}`
//! is parsed once. Unknown placeholders and missing required ones are rejected
//! up front, so rendering can never leave a `{name}` behind.

use std::fmt;

use crate::routing::RoutingDescriptor;

use super::error::TemplateError;

/// A named value a template can reference.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Placeholder {
    Segment,
    OrganisationNumber,
    StatisticalProgram,
    ReferencePeriod,
    FileFormat,
    FileName,
    Version,
}

impl Placeholder {
    const ALL: [Placeholder; 7] = [
        Placeholder::Segment,
        Placeholder::OrganisationNumber,
        Placeholder::StatisticalProgram,
        Placeholder::ReferencePeriod,
        Placeholder::FileFormat,
        Placeholder::FileName,
        Placeholder::Version,
    ];

    /// Placeholders every upload template must contain.
    const REQUIRED: [Placeholder; 5] = [
        Placeholder::Segment,
        Placeholder::OrganisationNumber,
        Placeholder::StatisticalProgram,
        Placeholder::FileFormat,
        Placeholder::FileName,
    ];

    pub fn name(&self) -> &'static str {
        match self {
            Placeholder::Segment => "segment",
            Placeholder::OrganisationNumber => "organisationNumber",
            Placeholder::StatisticalProgram => "statisticalProgram",
            Placeholder::ReferencePeriod => "referencePeriod",
            Placeholder::FileFormat => "fileFormat",
            Placeholder::FileName => "fileName",
            Placeholder::Version => "version",
        }
    }

    fn from_name(name: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|p| p.name() == name)
    }
}

/// Values substituted into a template for one request.
#[derive(Debug, Clone, Copy)]
pub struct ResourceFields<'a> {
    pub segment: i64,
    pub organisation_number: &'a str,
    pub statistical_program: &'a str,
    pub reference_period: Option<&'a str>,
    pub file_format: &'a str,
    pub file_name: &'a str,
    pub version: Option<&'a str>,
}

impl<'a> ResourceFields<'a> {
    /// Fields of `descriptor` for the given segment index.
    pub fn for_descriptor(descriptor: &'a RoutingDescriptor, segment: i64) -> Self {
        Self {
            segment,
            organisation_number: descriptor.organisation_number(),
            statistical_program: descriptor.statistical_program(),
            reference_period: descriptor.reference_period(),
            file_format: descriptor.file_format(),
            file_name: descriptor.file_name(),
            version: descriptor.version(),
        }
    }

    fn value(&self, placeholder: Placeholder) -> String {
        let text = match placeholder {
            Placeholder::Segment => return self.segment.to_string(),
            Placeholder::OrganisationNumber => self.organisation_number,
            Placeholder::StatisticalProgram => self.statistical_program,
            Placeholder::ReferencePeriod => self.reference_period.unwrap_or_default(),
            Placeholder::FileFormat => self.file_format,
            Placeholder::FileName => self.file_name,
            Placeholder::Version => self.version.unwrap_or_default(),
        };
        urlencoding::encode(text).into_owned()
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
enum Part {
    Literal(String),
    Field(Placeholder),
}

/// A parsed resource template.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceTemplate {
    raw: String,
    parts: Vec<Part>,
}

impl ResourceTemplate {
    /// Parses and validates `raw`.
    pub fn parse(raw: &str) -> Result<Self, TemplateError> {
        let mut parts = Vec::new();
        let mut literal = String::new();
        let mut chars = raw.char_indices();

        while let Some((pos, c)) = chars.next() {
            match c {
                '{' => {
                    let mut name = String::new();
                    let mut closed = false;
                    for (_, c) in chars.by_ref() {
                        match c {
                            '}' => {
                                closed = true;
                                break;
                            }
                            '{' => return Err(TemplateError::UnbalancedBrace(pos)),
                            c => name.push(c),
                        }
                    }
                    if !closed {
                        return Err(TemplateError::UnbalancedBrace(pos));
                    }
                    let placeholder = Placeholder::from_name(&name)
                        .ok_or(TemplateError::UnknownPlaceholder(name))?;
                    if !literal.is_empty() {
                        parts.push(Part::Literal(std::mem::take(&mut literal)));
                    }
                    parts.push(Part::Field(placeholder));
                }
                '}' => return Err(TemplateError::UnbalancedBrace(pos)),
                c => literal.push(c),
            }
        }
        if !literal.is_empty() {
            parts.push(Part::Literal(literal));
        }

        for required in Placeholder::REQUIRED {
            if !parts.contains(&Part::Field(required)) {
                return Err(TemplateError::MissingPlaceholder(required.name()));
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            parts,
        })
    }

    /// Substitutes every placeholder. Absent optional values render empty.
    pub fn render(&self, fields: &ResourceFields<'_>) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                Part::Literal(text) => text.clone(),
                Part::Field(placeholder) => fields.value(*placeholder),
            })
            .collect()
    }

    /// The template as configured.
    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for ResourceTemplate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}
