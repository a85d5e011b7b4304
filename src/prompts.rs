//! Prompt templates
//!
//! A small handlebars-like dialect:
//! - `{{field}}` / `{{{field}}}` substitute a request field
//! - `{{#if field}} ... {{/if}}` keeps a section only when the field is present and non-empty
//! - `{{media url=field}}` embeds the field's data URI as an inline media part

use lazy_static::lazy_static;
use regex::Regex;
use serde_json::Value;

use crate::error::OrchestrationError;
use crate::media::MediaRef;
use crate::Result;

lazy_static! {
    /// `{{{ inner }}}` or `{{ inner }}`
    static ref TAG: Regex = Regex::new(r"\{\{\{\s*([^{}]*?)\s*\}\}\}|\{\{\s*([^{}]*?)\s*\}\}")
        .expect("tag pattern is valid");
    static ref TAG_BODY: Regex = Regex::new(
        r"^(?:#if\s+(?P<if>\w+)|(?P<endif>/if)|media\s+url=(?P<media>\w+)|(?P<var>\w+))$"
    )
    .expect("tag body pattern is valid");
}

#[derive(Debug, Clone, PartialEq)]
pub enum PromptPart {
    Text(String),
    Media(MediaRef),
}

/// Ordered text and media parts, ready for the inference capability
#[derive(Debug, Clone, PartialEq, Default)]
pub struct RenderedPrompt {
    pub parts: Vec<PromptPart>,
}

impl RenderedPrompt {
    fn push_text(&mut self, text: &str) {
        if text.is_empty() {
            return;
        }
        if let Some(PromptPart::Text(last)) = self.parts.last_mut() {
            last.push_str(text);
        } else {
            self.parts.push(PromptPart::Text(text.to_string()));
        }
    }

    /// Flattened text, media shown as `[media:<mime>]`
    pub fn text(&self) -> String {
        self.parts
            .iter()
            .map(|part| match part {
                PromptPart::Text(t) => t.clone(),
                PromptPart::Media(m) => format!("[media:{}]", m.mime_type),
            })
            .collect()
    }

    pub fn media(&self) -> Vec<&MediaRef> {
        self.parts
            .iter()
            .filter_map(|part| match part {
                PromptPart::Media(m) => Some(m),
                PromptPart::Text(_) => None,
            })
            .collect()
    }
}

#[derive(Debug, Clone, Copy)]
pub struct PromptTemplate {
    pub name: &'static str,
    source: &'static str,
}

#[derive(Debug, PartialEq)]
enum Token<'a> {
    Text(&'a str),
    Var(&'a str),
    Media(&'a str),
    If(&'a str),
    EndIf,
}

impl PromptTemplate {
    pub const fn new(name: &'static str, source: &'static str) -> Self {
        Self { name, source }
    }

    /// Render against a request value (a JSON object of fields)
    pub fn render(&self, fields: &Value) -> Result<RenderedPrompt> {
        let tokens = self.tokenize()?;
        let mut prompt = RenderedPrompt::default();
        let mut sections: Vec<bool> = Vec::new();

        for token in tokens {
            let active = sections.iter().all(|s| *s);

            match token {
                Token::If(name) => sections.push(is_truthy(fields.get(name))),
                Token::EndIf => {
                    if sections.pop().is_none() {
                        return Err(self.error("{{/if}} without matching {{#if}}"));
                    }
                }
                _ if !active => {}
                Token::Text(text) => prompt.push_text(text),
                Token::Var(name) => prompt.push_text(&field_text(fields.get(name))),
                Token::Media(name) => {
                    let uri = fields
                        .get(name)
                        .and_then(Value::as_str)
                        .filter(|s| !s.is_empty())
                        .ok_or_else(|| self.error(&format!("media field '{}' is empty", name)))?;
                    prompt.parts.push(PromptPart::Media(MediaRef::parse(uri)?));
                }
            }
        }

        if !sections.is_empty() {
            return Err(self.error("unclosed {{#if}} section"));
        }

        Ok(prompt)
    }

    fn tokenize(&self) -> Result<Vec<Token<'static>>> {
        let source: &'static str = self.source;
        let mut tokens = Vec::new();
        let mut last = 0;

        for caps in TAG.captures_iter(source) {
            let (Some(whole), Some(inner)) = (caps.get(0), caps.get(1).or_else(|| caps.get(2))) else {
                continue;
            };
            self.push_text(&mut tokens, &source[last..whole.start()])?;
            tokens.push(self.parse_tag(inner.as_str())?);
            last = whole.end();
        }
        self.push_text(&mut tokens, &source[last..])?;

        Ok(tokens)
    }

    fn push_text(&self, tokens: &mut Vec<Token<'static>>, text: &'static str) -> Result<()> {
        if text.contains("{{") {
            return Err(self.error("unclosed {{ tag"));
        }
        if !text.is_empty() {
            tokens.push(Token::Text(text));
        }
        Ok(())
    }

    fn parse_tag(&self, tag: &'static str) -> Result<Token<'static>> {
        let caps = TAG_BODY
            .captures(tag)
            .ok_or_else(|| self.error(&format!("invalid tag '{}'", tag)))?;

        if let Some(name) = caps.name("if") {
            Ok(Token::If(name.as_str()))
        } else if caps.name("endif").is_some() {
            Ok(Token::EndIf)
        } else if let Some(name) = caps.name("media") {
            Ok(Token::Media(name.as_str()))
        } else if let Some(name) = caps.name("var") {
            Ok(Token::Var(name.as_str()))
        } else {
            Err(self.error(&format!("invalid tag '{}'", tag)))
        }
    }

    fn error(&self, message: &str) -> OrchestrationError {
        OrchestrationError::TemplateError(format!("{}: {}", self.name, message))
    }
}

fn is_truthy(value: Option<&Value>) -> bool {
    match value {
        None | Some(Value::Null) => false,
        Some(Value::Bool(b)) => *b,
        Some(Value::String(s)) => !s.is_empty(),
        Some(Value::Array(a)) => !a.is_empty(),
        Some(_) => true,
    }
}

fn field_text(value: Option<&Value>) -> String {
    match value {
        None | Some(Value::Null) => String::new(),
        Some(Value::String(s)) => s.clone(),
        Some(Value::Array(items)) => items
            .iter()
            .map(|v| v.as_str().map(str::to_string).unwrap_or_else(|| v.to_string()))
            .collect::<Vec<_>>()
            .join(", "),
        Some(other) => other.to_string(),
    }
}
