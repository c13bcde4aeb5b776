//! Doc-comment decoration.
//!
//! Reads `///` comments on handlers and fields and splits them into the pieces the
//! description builder uses: a summary, per-argument entries, return text and remarks.
//! Sections follow the rustdoc convention:
//!
//! ```text
//! /// Fetches a single user.
//! ///
//! /// # Arguments
//! ///
//! /// * `id` - Identifier of the user
//! ///
//! /// # Returns
//! ///
//! /// The user record
//! ```

use serde::Serialize;

/// Structured view of a doc comment
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct DocComment {
    /// First paragraph of the comment
    pub summary: Option<String>,
    /// `(name, text)` entries from the `# Arguments` section
    pub arguments: Vec<(String, String)>,
    /// Text of the `# Returns` section
    pub returns: Option<String>,
    /// Text of the `# Remarks` (or `# Notes`) section
    pub remarks: Option<String>,
}

#[derive(Clone, Copy, PartialEq)]
enum Section {
    Preamble,
    Arguments,
    Returns,
    Remarks,
    Other,
}

impl DocComment {
    /// Build a `DocComment` from the attributes of an item
    pub fn from_attrs(attrs: &[syn::Attribute]) -> Self {
        Self::parse(&doc_lines(attrs))
    }

    /// Parse doc lines (already stripped of the `///` marker)
    pub fn parse(lines: &[String]) -> Self {
        let mut doc = DocComment::default();
        let mut section = Section::Preamble;
        let mut summary: Vec<&str> = Vec::new();
        let mut summary_done = false;
        let mut returns: Vec<&str> = Vec::new();
        let mut remarks: Vec<&str> = Vec::new();

        for line in lines {
            let line = line.trim();

            if let Some(heading) = line.strip_prefix('#') {
                section = match heading.trim_start_matches('#').trim().to_lowercase().as_str() {
                    "arguments" | "parameters" | "params" => Section::Arguments,
                    "returns" | "return" => Section::Returns,
                    "remarks" | "notes" => Section::Remarks,
                    _ => Section::Other,
                };
                continue;
            }

            match section {
                Section::Preamble => {
                    if line.is_empty() {
                        summary_done |= !summary.is_empty();
                    } else if !summary_done {
                        summary.push(line);
                    }
                }
                Section::Arguments => {
                    if let Some((name, text)) = parse_argument_line(line) {
                        doc.arguments.push((name, text));
                    } else if !line.is_empty() {
                        // continuation of the previous entry
                        if let Some((_, text)) = doc.arguments.last_mut() {
                            text.push(' ');
                            text.push_str(line);
                        }
                    }
                }
                Section::Returns if !line.is_empty() => returns.push(line),
                Section::Remarks if !line.is_empty() => remarks.push(line),
                _ => {}
            }
        }

        doc.summary = join_non_empty(&summary);
        doc.returns = join_non_empty(&returns);
        doc.remarks = join_non_empty(&remarks);
        doc
    }

    /// Documentation text for a named argument
    pub fn argument(&self, name: &str) -> Option<&str> {
        self.arguments
            .iter()
            .find(|(arg, _)| arg == name)
            .map(|(_, text)| text.as_str())
    }

    /// Whether nothing was documented
    pub fn is_empty(&self) -> bool {
        self.summary.is_none()
            && self.arguments.is_empty()
            && self.returns.is_none()
            && self.remarks.is_none()
    }
}

/// Parse "* `name` - text" (also accepts `-` bullets and `:` separators)
fn parse_argument_line(line: &str) -> Option<(String, String)> {
    let rest = line.strip_prefix('*').or_else(|| line.strip_prefix('-'))?.trim_start();
    let rest = rest.strip_prefix('`')?;
    let (name, text) = rest.split_once('`')?;
    let text = text
        .trim_start()
        .trim_start_matches(['-', ':'])
        .trim();
    Some((name.to_string(), text.to_string()))
}

fn join_non_empty(lines: &[&str]) -> Option<String> {
    if lines.is_empty() {
        None
    } else {
        Some(lines.join(" "))
    }
}

/// Extract the raw lines of `#[doc = "..."]` attributes
pub fn doc_lines(attrs: &[syn::Attribute]) -> Vec<String> {
    attrs
        .iter()
        .filter(|attr| attr.path().is_ident("doc"))
        .filter_map(|attr| match &attr.meta {
            syn::Meta::NameValue(nv) => match &nv.value {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Str(s),
                    ..
                }) => Some(s.value()),
                _ => None,
            },
            _ => None,
        })
        // a bare `///` is an empty value and still marks a paragraph break
        .flat_map(|value| {
            value
                .split('\n')
                .map(|line| line.trim_end_matches('\r').to_string())
                .collect::<Vec<_>>()
        })
        .collect()
}

/// Full doc text of an item as a single line, or `None` if undocumented
pub fn doc_text(attrs: &[syn::Attribute]) -> Option<String> {
    let lines = doc_lines(attrs);
    let parts: Vec<&str> = lines.iter().map(|l| l.trim()).filter(|l| !l.is_empty()).collect();
    join_non_empty(&parts)
}
