//! Selector compilation
//!
//! Parses CSS selector strings into a matchable form. The supported grammar
//! covers selector groups (`,`), descendant and child (`>`) combinators, and
//! compound steps built from `*`, tag names, `#id`, `.class`, `[attr]` and
//! `[attr=value]`. Anything outside that surface fails with
//! [`Error::MalformedSelector`] at compile time; matching itself is
//! infallible and lives on the document (see `dom::tree`).

use crate::error::{Error, Result};
use std::fmt;

/// A compiled selector: one or more complex selectors joined by `,`
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Selector {
    /// Original selector text, kept for logging and error context
    source: String,
    /// Parsed groups; a node matches if any group matches
    groups: Vec<ComplexSelector>,
}

/// A combinator chain: compound steps related by descendant/child combinators
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct ComplexSelector {
    pub(crate) parts: Vec<SelectorPart>,
}

/// One compound step plus its relation to the previous (left) step
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct SelectorPart {
    pub(crate) compound: CompoundSelector,
    /// `None` for the first step of a chain
    pub(crate) combinator: Option<Combinator>,
}

/// Relation between two adjacent compound steps
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Combinator {
    /// Whitespace: any strict ancestor
    Descendant,
    /// `>`: the direct parent
    Child,
}

/// Conditions of a single compound step, all of which must hold on one node
///
/// A step with no conditions at all comes from `*` and matches any element.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub(crate) struct CompoundSelector {
    pub(crate) tag: Option<String>,
    pub(crate) id: Option<String>,
    pub(crate) classes: Vec<String>,
    pub(crate) attributes: Vec<AttributeCondition>,
}

/// Attribute condition inside `[...]`
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) enum AttributeCondition {
    /// `[name]` - attribute present
    Exists { name: String },
    /// `[name=value]` / `[name="value"]` - attribute equals value
    Equals { name: String, value: String },
}

impl Selector {
    /// Compile a selector string
    pub fn parse(input: &str) -> Result<Selector> {
        let trimmed = input.trim();
        if trimmed.is_empty() {
            return Err(Error::malformed_selector("empty selector"));
        }

        let mut groups = Vec::new();
        for group in split_groups(trimmed)? {
            groups.push(parse_complex(group, input)?);
        }

        Ok(Selector {
            source: input.to_string(),
            groups,
        })
    }

    /// The original selector text
    pub fn source(&self) -> &str {
        &self.source
    }

    pub(crate) fn groups(&self) -> &[ComplexSelector] {
        &self.groups
    }
}

impl fmt::Display for Selector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.source)
    }
}

/// Split the selector into `,`-separated groups, respecting brackets/quotes
fn split_groups(input: &str) -> Result<Vec<&str>> {
    let mut groups = Vec::new();
    let mut start = 0;
    let mut in_brackets = false;
    let mut in_quotes = false;

    for (idx, ch) in input.char_indices() {
        match ch {
            '"' if in_brackets => in_quotes = !in_quotes,
            '[' if !in_quotes => {
                if in_brackets {
                    return Err(Error::malformed_selector(format!(
                        "{}: nested '[' in attribute selector",
                        input
                    )));
                }
                in_brackets = true;
            }
            ']' if !in_quotes => {
                if !in_brackets {
                    return Err(Error::malformed_selector(format!(
                        "{}: unexpected ']'",
                        input
                    )));
                }
                in_brackets = false;
            }
            ',' if !in_brackets && !in_quotes => {
                let group = input[start..idx].trim();
                if group.is_empty() {
                    return Err(Error::malformed_selector(format!(
                        "{}: empty selector group",
                        input
                    )));
                }
                groups.push(group);
                start = idx + 1;
            }
            _ => {}
        }
    }

    if in_brackets || in_quotes {
        return Err(Error::malformed_selector(format!(
            "{}: unterminated attribute selector",
            input
        )));
    }

    let last = input[start..].trim();
    if last.is_empty() {
        return Err(Error::malformed_selector(format!(
            "{}: empty selector group",
            input
        )));
    }
    groups.push(last);

    Ok(groups)
}

/// Parse one group into a combinator chain of compound steps
fn parse_complex(group: &str, source: &str) -> Result<ComplexSelector> {
    let mut parts = Vec::new();
    let mut pending: Option<Combinator> = None;

    for token in tokenize_chain(group, source)? {
        match token {
            ChainToken::Child => {
                if pending.is_some() || parts.is_empty() {
                    return Err(Error::malformed_selector(format!(
                        "{}: misplaced '>' combinator",
                        source
                    )));
                }
                pending = Some(Combinator::Child);
            }
            ChainToken::Compound(text) => {
                let compound = parse_compound(text, source)?;
                let combinator = if parts.is_empty() {
                    None
                } else {
                    Some(pending.take().unwrap_or(Combinator::Descendant))
                };
                parts.push(SelectorPart {
                    compound,
                    combinator,
                });
            }
        }
    }

    if parts.is_empty() || pending.is_some() {
        return Err(Error::malformed_selector(format!(
            "{}: dangling combinator",
            source
        )));
    }

    Ok(ComplexSelector { parts })
}

/// Token stream of one combinator chain
enum ChainToken<'a> {
    Compound(&'a str),
    Child,
}

/// Split a chain into compound tokens and `>` combinators
fn tokenize_chain<'a>(group: &'a str, source: &str) -> Result<Vec<ChainToken<'a>>> {
    let mut tokens = Vec::new();
    let mut start: Option<usize> = None;
    let mut in_brackets = false;
    let mut in_quotes = false;

    for (idx, ch) in group.char_indices() {
        // Anything other than a top-level separator belongs to a compound
        // token; attribute-only steps begin with '['.
        let separator = !in_brackets && (ch == '>' || ch.is_whitespace());
        if !separator && start.is_none() {
            start = Some(idx);
        }
        match ch {
            '"' if in_brackets => in_quotes = !in_quotes,
            '[' if !in_quotes => in_brackets = true,
            ']' if !in_quotes => in_brackets = false,
            c if c.is_whitespace() && !in_brackets => {
                if let Some(s) = start.take() {
                    tokens.push(ChainToken::Compound(&group[s..idx]));
                }
            }
            '>' if !in_brackets => {
                if let Some(s) = start.take() {
                    tokens.push(ChainToken::Compound(&group[s..idx]));
                }
                tokens.push(ChainToken::Child);
            }
            _ => {}
        }
    }

    if let Some(s) = start {
        tokens.push(ChainToken::Compound(&group[s..]));
    }

    if tokens.is_empty() {
        return Err(Error::malformed_selector(format!(
            "{}: empty selector group",
            source
        )));
    }

    Ok(tokens)
}

/// Parse a single compound step, e.g. `div#main.card[role=grid]`
fn parse_compound(token: &str, source: &str) -> Result<CompoundSelector> {
    let mut compound = CompoundSelector::default();
    let chars: Vec<char> = token.chars().collect();
    let mut pos = 0;

    while pos < chars.len() {
        match chars[pos] {
            '*' => {
                // The universal step adds no conditions
                if pos != 0 {
                    return Err(Error::malformed_selector(format!(
                        "{}: '*' is only valid at the start of a compound",
                        source
                    )));
                }
                pos += 1;
            }
            '#' => {
                let (ident, next) = read_ident(&chars, pos + 1);
                if ident.is_empty() {
                    return Err(Error::malformed_selector(format!(
                        "{}: '#' with no id",
                        source
                    )));
                }
                if compound.id.is_some() {
                    return Err(Error::malformed_selector(format!(
                        "{}: multiple id conditions in one compound",
                        source
                    )));
                }
                compound.id = Some(ident);
                pos = next;
            }
            '.' => {
                let (ident, next) = read_ident(&chars, pos + 1);
                if ident.is_empty() {
                    return Err(Error::malformed_selector(format!(
                        "{}: '.' with no class name",
                        source
                    )));
                }
                compound.classes.push(ident);
                pos = next;
            }
            '[' => {
                let (condition, next) = parse_attribute(&chars, pos + 1, source)?;
                compound.attributes.push(condition);
                pos = next;
            }
            c if is_ident_char(c) => {
                if pos != 0 {
                    return Err(Error::malformed_selector(format!(
                        "{}: unexpected tag name inside compound",
                        source
                    )));
                }
                let (ident, next) = read_ident(&chars, pos);
                compound.tag = Some(ident.to_ascii_lowercase());
                pos = next;
            }
            other => {
                return Err(Error::malformed_selector(format!(
                    "{}: unsupported token '{}'",
                    source, other
                )));
            }
        }
    }

    Ok(compound)
}

/// Parse the inside of `[...]`, starting just after the `[`
fn parse_attribute(
    chars: &[char],
    start: usize,
    source: &str,
) -> Result<(AttributeCondition, usize)> {
    let (name, mut pos) = read_ident(chars, start);
    if name.is_empty() {
        return Err(Error::malformed_selector(format!(
            "{}: attribute selector with no name",
            source
        )));
    }

    match chars.get(pos) {
        Some(']') => Ok((AttributeCondition::Exists { name }, pos + 1)),
        Some('=') => {
            pos += 1;
            let value;
            if chars.get(pos) == Some(&'"') {
                pos += 1;
                let value_start = pos;
                while pos < chars.len() && chars[pos] != '"' {
                    pos += 1;
                }
                if pos >= chars.len() {
                    return Err(Error::malformed_selector(format!(
                        "{}: unterminated quoted attribute value",
                        source
                    )));
                }
                value = chars[value_start..pos].iter().collect();
                pos += 1;
            } else {
                let (bare, next) = read_ident(chars, pos);
                if bare.is_empty() {
                    return Err(Error::malformed_selector(format!(
                        "{}: attribute selector with empty value",
                        source
                    )));
                }
                value = bare;
                pos = next;
            }

            if chars.get(pos) != Some(&']') {
                return Err(Error::malformed_selector(format!(
                    "{}: expected ']' after attribute value",
                    source
                )));
            }
            Ok((AttributeCondition::Equals { name, value }, pos + 1))
        }
        Some(other) => Err(Error::malformed_selector(format!(
            "{}: unsupported attribute operator '{}'",
            source, other
        ))),
        None => Err(Error::malformed_selector(format!(
            "{}: unterminated attribute selector",
            source
        ))),
    }
}

/// Read an identifier run starting at `start`; returns (ident, next position)
fn read_ident(chars: &[char], start: usize) -> (String, usize) {
    let mut pos = start;
    while pos < chars.len() && is_ident_char(chars[pos]) {
        pos += 1;
    }
    (chars[start..pos].iter().collect(), pos)
}

fn is_ident_char(c: char) -> bool {
    c.is_alphanumeric() || c == '-' || c == '_'
}
