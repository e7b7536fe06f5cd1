//! Prisma schema printer and formatter
//!
//! Emits the datasource, the client generator and one model per list, then
//! aligns the result the way `prisma format` does: field names, types and
//! attributes in columns, `=` aligned in key/value blocks.

use crate::config::Provider;
use crate::schema::{FieldKind, InitialisedList, InitialisedLists};

/// Output directory of the generated Prisma client, relative to the project root
pub const CLIENT_OUTPUT: &str = "node_modules/.prisma/client";

// =============================================================================
// Printing
// =============================================================================

/// Print the Prisma schema for `lists` (unformatted)
pub fn print_prisma_schema(lists: &InitialisedLists, provider: Provider, preview_features: &[String]) -> String {
    let mut output = String::new();

    output.push_str(&format!("datasource {} {{\n", provider.as_str()));
    output.push_str("url = env(\"DATABASE_URL\")\n");
    output.push_str(&format!("provider = \"{}\"\n", provider.as_str()));
    output.push_str("}\n\n");

    output.push_str("generator client {\n");
    output.push_str("provider = \"prisma-client-js\"\n");
    output.push_str(&format!("output = \"{CLIENT_OUTPUT}\"\n"));
    let mut features: Vec<&String> = preview_features.iter().collect();
    features.sort();
    features.dedup();
    if !features.is_empty() {
        let quoted: Vec<String> = features.iter().map(|f| format!("\"{f}\"")).collect();
        output.push_str(&format!("previewFeatures = [{}]\n", quoted.join(", ")));
    }
    output.push_str("}\n");

    for list in lists.iter() {
        output.push('\n');
        output.push_str(&print_model(list));
    }

    output
}

fn print_model(list: &InitialisedList) -> String {
    let mut output = String::new();
    let mut indexes = Vec::new();

    output.push_str(&format!("model {} {{\n", list.key));
    output.push_str("id String @id @default(cuid())\n");

    for field in &list.fields {
        let optional = if field.required { "" } else { "?" };
        let mut attrs = Vec::new();
        if field.unique {
            attrs.push("@unique".to_string());
        }

        let scalar = match &field.kind {
            FieldKind::Text | FieldKind::Select { .. } => "String",
            FieldKind::Integer => "Int",
            FieldKind::Float => "Float",
            FieldKind::Decimal => "Decimal",
            FieldKind::Checkbox => "Boolean",
            FieldKind::Timestamp => "DateTime",
            FieldKind::Json => "Json",
            FieldKind::Relationship(rel) => {
                if rel.many {
                    output.push_str(&format!(
                        "{} {}[] @relation(\"{}\")\n",
                        field.name, rel.target, rel.relation_name
                    ));
                    continue;
                }
                match &rel.foreign_key {
                    Some(key) => {
                        output.push_str(&format!(
                            "{} {}? @relation(\"{}\", fields: [{}], references: [id])\n",
                            field.name, rel.target, rel.relation_name, key.field
                        ));
                        let unique = if key.unique { " @unique" } else { "" };
                        output.push_str(&format!("{} String? @map(\"{}\"){unique}\n", key.field, field.name));
                        if !key.unique {
                            indexes.push(key.field.clone());
                        }
                    }
                    None => {
                        output.push_str(&format!("{} {}? @relation(\"{}\")\n", field.name, rel.target, rel.relation_name));
                    }
                }
                continue;
            }
        };

        if field.indexed && !field.unique {
            indexes.push(field.name.clone());
        }
        let attrs = if attrs.is_empty() { String::new() } else { format!(" {}", attrs.join(" ")) };
        output.push_str(&format!("{} {scalar}{optional}{attrs}\n", field.name));
    }

    for back_ref in &list.back_refs {
        output.push_str(&format!(
            "{} {}[] @relation(\"{}\")\n",
            back_ref.name, back_ref.source, back_ref.relation_name
        ));
    }

    if !indexes.is_empty() {
        output.push('\n');
        for index in indexes {
            output.push_str(&format!("@@index([{index}])\n"));
        }
    }

    output.push_str("}\n");
    output
}

// =============================================================================
// Formatting
// =============================================================================

#[derive(Debug, Clone, Copy, PartialEq)]
enum BlockKind {
    /// `model` / `enum`: name, type, attributes
    Fields,
    /// `datasource` / `generator`: key = value
    KeyValue,
}

#[derive(Debug)]
enum BlockLine {
    Blank,
    Raw(String),
    Field { name: String, ty: String, attrs: String },
    Pair { key: String, value: String },
}

struct Block {
    kind: BlockKind,
    lines: Vec<BlockLine>,
}

impl Block {
    fn new(header: &str) -> Self {
        let kind = match header.split_whitespace().next() {
            Some("datasource") | Some("generator") => BlockKind::KeyValue,
            _ => BlockKind::Fields,
        };
        Self { kind, lines: Vec::new() }
    }

    fn push(&mut self, line: &str) {
        if line.is_empty() {
            if !matches!(self.lines.last(), None | Some(BlockLine::Blank)) {
                self.lines.push(BlockLine::Blank);
            }
            return;
        }
        if line.starts_with("//") || line.starts_with("@@") {
            self.lines.push(BlockLine::Raw(collapse_whitespace(line)));
            return;
        }
        let parsed = match self.kind {
            BlockKind::KeyValue => match line.split_once('=') {
                Some((key, value)) => BlockLine::Pair {
                    key: key.trim().to_string(),
                    value: value.trim().to_string(),
                },
                None => BlockLine::Raw(collapse_whitespace(line)),
            },
            BlockKind::Fields => {
                let (name, rest) = split_token(line);
                let (ty, attrs) = split_token(rest);
                BlockLine::Field {
                    name: name.to_string(),
                    ty: ty.to_string(),
                    attrs: attrs.to_string(),
                }
            }
        };
        self.lines.push(parsed);
    }

    /// Render the block body, aligning each run of consecutive fields/pairs
    fn render(mut self) -> Vec<String> {
        while matches!(self.lines.last(), Some(BlockLine::Blank)) {
            self.lines.pop();
        }

        let mut out = Vec::with_capacity(self.lines.len());
        let mut start = 0;
        while start < self.lines.len() {
            let end = self.lines[start..]
                .iter()
                .position(|l| matches!(l, BlockLine::Blank | BlockLine::Raw(_)))
                .map_or(self.lines.len(), |i| start + i);

            if start == end {
                out.push(match &self.lines[start] {
                    BlockLine::Raw(text) => format!("  {text}"),
                    _ => String::new(),
                });
                start += 1;
                continue;
            }

            let run = &self.lines[start..end];
            let name_width = run.iter().map(|l| match l {
                BlockLine::Field { name, .. } => name.len(),
                BlockLine::Pair { key, .. } => key.len(),
                _ => 0,
            });
            let name_width = name_width.max().unwrap_or(0);
            let type_width = run
                .iter()
                .map(|l| match l {
                    BlockLine::Field { ty, .. } => ty.len(),
                    _ => 0,
                })
                .max()
                .unwrap_or(0);

            for line in run {
                let text = match line {
                    BlockLine::Field { name, ty, attrs } if attrs.is_empty() => {
                        format!("{name:<name_width$} {ty}")
                    }
                    BlockLine::Field { name, ty, attrs } => {
                        format!("{name:<name_width$} {ty:<type_width$} {attrs}")
                    }
                    BlockLine::Pair { key, value } => format!("{key:<name_width$} = {value}"),
                    _ => String::new(),
                };
                out.push(format!("  {}", text.trim_end()));
            }
            start = end;
        }
        out
    }
}

fn split_token(s: &str) -> (&str, &str) {
    let s = s.trim_start();
    match s.find(char::is_whitespace) {
        Some(i) => (&s[..i], s[i..].trim_start()),
        None => (s, ""),
    }
}

fn collapse_whitespace(s: &str) -> String {
    s.split_whitespace().collect::<Vec<_>>().join(" ")
}

/// Canonical layout for Prisma schema text
pub fn format_prisma(source: &str) -> String {
    let mut out: Vec<String> = Vec::new();
    let mut block: Option<Block> = None;

    for raw in source.lines() {
        let line = raw.trim();
        match block.as_mut() {
            Some(_) if line == "}" => {
                if let Some(done) = block.take() {
                    out.extend(done.render());
                }
                out.push("}".to_string());
            }
            Some(current) => current.push(line),
            None if line.is_empty() => {}
            None => {
                let after_comment = out.last().is_some_and(|l| l.starts_with("//"));
                if line.ends_with('{') {
                    if !out.is_empty() && !after_comment {
                        out.push(String::new());
                    }
                    block = Some(Block::new(line));
                    out.push(collapse_whitespace(line));
                } else {
                    if !out.is_empty() && !after_comment && out.last().is_some_and(|l| l == "}") {
                        out.push(String::new());
                    }
                    out.push(line.to_string());
                }
            }
        }
    }
    if let Some(unterminated) = block {
        out.extend(unterminated.render());
    }

    let mut text = out.join("\n");
    text.push('\n');
    text
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::schema::initialise_lists;
    use pretty_assertions::assert_eq;

    fn lists(toml: &str) -> InitialisedLists {
        initialise_lists(&ProjectConfig::from_toml_str(toml).unwrap()).unwrap()
    }

    #[test]
    fn test_format_aligns_columns() {
        let source = "model Post {\nid String @id @default(cuid())\ntitle String? @unique\nauthor User? @relation(\"Post_author\", fields: [authorId], references: [id])\nauthorId String? @map(\"author\")\ntags Tag[] @relation(\"Post_tags\")\n\n@@index([authorId])\n}\n";
        let expected = "\
model Post {
  id       String  @id @default(cuid())
  title    String? @unique
  author   User?   @relation(\"Post_author\", fields: [authorId], references: [id])
  authorId String? @map(\"author\")
  tags     Tag[]   @relation(\"Post_tags\")

  @@index([authorId])
}
";
        assert_eq!(format_prisma(source), expected);
    }

    #[test]
    fn test_format_key_value_blocks() {
        let source = "datasource sqlite {\n  url = env(\"DATABASE_URL\")\n    provider    =   \"sqlite\"\n}\ngenerator client {\nprovider = \"prisma-client-js\"\noutput = \"node_modules/.prisma/client\"\n}";
        let expected = "\
datasource sqlite {
  url      = env(\"DATABASE_URL\")
  provider = \"sqlite\"
}

generator client {
  provider = \"prisma-client-js\"
  output   = \"node_modules/.prisma/client\"
}
";
        assert_eq!(format_prisma(source), expected);
    }

    #[test]
    fn test_format_is_idempotent() {
        let printed = print_prisma_schema(
            &lists("[[lists]]\nname = \"Post\"\n[[lists.fields]]\nname = \"title\"\ntype = \"text\"\nindexed = true\n"),
            Provider::Sqlite,
            &[],
        );
        let once = format_prisma(&printed);
        assert_eq!(format_prisma(&once), once);
    }

    #[test]
    fn test_print_relationships() {
        let lists = lists(
            r#"
[[lists]]
name = "User"

[[lists.fields]]
name = "name"
type = "text"
required = true

[[lists]]
name = "Post"

[[lists.fields]]
name = "author"
type = "relationship"
ref = "User"

[[lists.fields]]
name = "status"
type = "select"
options = ["draft", "published"]
indexed = true
"#,
        );
        let formatted = format_prisma(&print_prisma_schema(&lists, Provider::Postgresql, &[]));

        assert!(formatted.starts_with("datasource postgresql {\n  url      = env(\"DATABASE_URL\")\n  provider = \"postgresql\"\n}\n"));
        assert!(formatted.contains(
            "model User {\n  id               String @id @default(cuid())\n  name             String\n  from_Post_author Post[] @relation(\"Post_author\")\n}\n"
        ));
        assert!(formatted.contains("  author   User?   @relation(\"Post_author\", fields: [authorId], references: [id])\n"));
        assert!(formatted.contains("  authorId String? @map(\"author\")\n"));
        assert!(formatted.contains("  @@index([authorId])\n  @@index([status])\n"));
    }

    #[test]
    fn test_preview_features_sorted() {
        let lists = lists("[[lists]]\nname = \"Post\"\n[[lists.fields]]\nname = \"title\"\ntype = \"text\"\n");
        let features = vec!["tracing".to_string(), "fullTextSearch".to_string(), "tracing".to_string()];
        let printed = print_prisma_schema(&lists, Provider::Sqlite, &features);
        assert!(printed.contains("previewFeatures = [\"fullTextSearch\", \"tracing\"]\n"));
    }
}
