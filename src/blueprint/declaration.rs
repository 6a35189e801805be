//! Blueprints declared in the configuration file
//!
//! Each `[[tables]]` entry becomes a [`BlueprintBuilder`]. Column rules map to
//! the three replacement strategies:
//!
//! - `replace_with = <literal>`: [`Replacement::Literal`]
//! - `generate = "<name>"` (optionally `unique = true`): [`Replacement::Generated`]
//! - `derive = "<template>"`: [`Replacement::DerivedFromRow`], where the
//!   template interpolates `{column}` from the current row and `{fake:name}`
//!   from the generator. `{{` and `}}` produce literal braces.

use super::{BlueprintBuilder, Replacement};
use crate::config::{ColumnConfig, LiteralValue, TableConfig};
use crate::domain::{Result, Row, SqlValue, VeilError};
use crate::generator::{FakeGenerator, Generator};

impl From<&LiteralValue> for SqlValue {
    fn from(value: &LiteralValue) -> Self {
        match value {
            LiteralValue::Bool(b) => SqlValue::from(*b),
            LiteralValue::Int(i) => SqlValue::Int(*i),
            LiteralValue::Float(f) => SqlValue::Float(*f),
            LiteralValue::Text(s) => SqlValue::Text(s.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Text(String),
    Field(String),
    Fake(String),
}

/// Parsed `derive` template
#[derive(Debug, Clone, PartialEq)]
pub struct DeriveTemplate {
    segments: Vec<Segment>,
}

impl DeriveTemplate {
    /// Parses a template
    ///
    /// # Errors
    ///
    /// Returns a description of the problem for unbalanced braces or empty
    /// placeholders.
    pub fn parse(input: &str) -> std::result::Result<Self, String> {
        let mut segments = Vec::new();
        let mut text = String::new();
        let mut chars = input.chars().peekable();

        while let Some(ch) = chars.next() {
            match ch {
                '{' if chars.peek() == Some(&'{') => {
                    chars.next();
                    text.push('{');
                }
                '}' if chars.peek() == Some(&'}') => {
                    chars.next();
                    text.push('}');
                }
                '{' => {
                    let mut name = String::new();
                    loop {
                        match chars.next() {
                            Some('}') => break,
                            Some('{') => {
                                return Err(format!("nested '{{' in template '{input}'"))
                            }
                            Some(c) => name.push(c),
                            None => return Err(format!("unclosed '{{' in template '{input}'")),
                        }
                    }
                    let name = name.trim();
                    let segment = match name.strip_prefix("fake:") {
                        Some(generator) if !generator.trim().is_empty() => {
                            Segment::Fake(generator.trim().to_string())
                        }
                        Some(_) => {
                            return Err(format!("empty generator name in template '{input}'"))
                        }
                        None if name.is_empty() => {
                            return Err(format!("empty placeholder in template '{input}'"))
                        }
                        None => Segment::Field(name.to_string()),
                    };
                    if !text.is_empty() {
                        segments.push(Segment::Text(std::mem::take(&mut text)));
                    }
                    segments.push(segment);
                }
                '}' => return Err(format!("unmatched '}}' in template '{input}'")),
                c => text.push(c),
            }
        }
        if !text.is_empty() {
            segments.push(Segment::Text(text));
        }

        Ok(Self { segments })
    }

    /// Row columns the template reads
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Field(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Generator names the template calls
    pub fn generators(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Fake(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Renders the template against a row
    ///
    /// `NULL` columns render as the empty string.
    ///
    /// # Errors
    ///
    /// Returns [`VeilError::SchemaMismatch`] if the row lacks a referenced
    /// column, or the generator's error for `{fake:...}` placeholders.
    pub fn render(&self, row: &Row, generator: &dyn Generator) -> Result<SqlValue> {
        let mut out = String::new();
        for segment in &self.segments {
            match segment {
                Segment::Text(text) => out.push_str(text),
                Segment::Field(name) => match row.get(name) {
                    Some(SqlValue::Null) => {}
                    Some(value) => out.push_str(&value.to_string()),
                    None => {
                        return Err(VeilError::SchemaMismatch(format!(
                            "template references column '{name}' which the row does not carry"
                        )))
                    }
                },
                Segment::Fake(name) => out.push_str(&generator.generate(name)?.to_string()),
            }
        }
        Ok(SqlValue::Text(out))
    }
}

/// Validates one column declaration without building it
pub(crate) fn check_column(column: &ColumnConfig) -> std::result::Result<(), String> {
    let strategies = [
        column.replace_with.is_some(),
        column.generate.is_some(),
        column.derive.is_some(),
    ]
    .iter()
    .filter(|set| **set)
    .count();

    if strategies != 1 {
        return Err(format!(
            "column '{}' must declare exactly one of replace_with, generate or derive",
            column.name
        ));
    }
    if column.unique && column.generate.is_none() {
        return Err(format!(
            "column '{}': unique is only allowed together with generate",
            column.name
        ));
    }
    if let Some(name) = &column.generate {
        if !FakeGenerator::supports(name) {
            return Err(format!(
                "column '{}': unknown generator '{name}'",
                column.name
            ));
        }
    }
    if let Some(template) = &column.derive {
        let template = DeriveTemplate::parse(template)
            .map_err(|e| format!("column '{}': {e}", column.name))?;
        let unknown = template
            .generators()
            .find(|g| !FakeGenerator::supports(g))
            .map(str::to_string);
        if let Some(unknown) = unknown {
            return Err(format!(
                "column '{}': unknown generator '{unknown}' in derive template",
                column.name
            ));
        }
    }
    Ok(())
}

fn replacement(column: &ColumnConfig) -> Result<Replacement> {
    check_column(column).map_err(VeilError::Configuration)?;

    if let Some(value) = &column.replace_with {
        return Ok(Replacement::literal(value));
    }
    if let Some(name) = &column.generate {
        let name = name.clone();
        let unique = column.unique;
        return Ok(Replacement::generated(move |generator| {
            if unique {
                generator.generate_unique(&name)
            } else {
                generator.generate(&name)
            }
        }));
    }
    match &column.derive {
        Some(template) => {
            let template = DeriveTemplate::parse(template).map_err(VeilError::Configuration)?;
            Ok(Replacement::derived(move |row, generator| {
                template.render(row, generator)
            }))
        }
        None => Err(VeilError::Configuration(format!(
            "column '{}' has no replacement",
            column.name
        ))),
    }
}

/// Turns a `[[tables]]` entry into a blueprint builder
///
/// # Errors
///
/// Returns [`VeilError::Configuration`] if a column declaration is invalid.
pub fn declare(table: &TableConfig) -> Result<BlueprintBuilder> {
    let mut builder = BlueprintBuilder::new(table.name.clone());

    if let Some(primary_key) = &table.primary_key {
        builder = builder.primary(primary_key.iter().cloned());
    }
    if let Some(filter) = &table.filter {
        builder = builder.global_filter(filter.clone());
    }
    for column in &table.columns {
        let mut rule = builder.column(column.name.clone());
        if let Some(filter) = &column.filter {
            rule = rule.filter(filter.clone());
        }
        builder = rule.replace(replacement(column)?);
    }
    for sync in &table.sync {
        for target in &sync.targets {
            builder = builder
                .sync(sync.column.clone())
                .to(target.table.clone(), target.column.clone());
        }
    }

    Ok(builder)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SyncConfig, SyncTargetConfig};
    use crate::generator::Locale;

    fn column(name: &str) -> ColumnConfig {
        ColumnConfig {
            name: name.to_string(),
            replace_with: None,
            generate: None,
            unique: false,
            derive: None,
            filter: None,
        }
    }

    #[test]
    fn test_template_parse_and_render() {
        let template = DeriveTemplate::parse("{first}.{last}@{{corp}}").unwrap();
        assert_eq!(template.fields().collect::<Vec<_>>(), vec!["first", "last"]);

        let row = Row::new().with("first", "ada").with("last", "lovelace");
        let value = template
            .render(&row, &crate::generator::Unavailable)
            .unwrap();
        assert_eq!(value, SqlValue::from("ada.lovelace@{corp}"));
    }

    #[test]
    fn test_template_with_generator() {
        let template = DeriveTemplate::parse("{id}-{fake:uuid}").unwrap();
        let generator = FakeGenerator::seeded(Locale::EnUs, 5);
        let row = Row::new().with("id", 7);
        let value = template.render(&row, &generator).unwrap();
        assert!(value.as_text().unwrap().starts_with("7-"));
        assert_eq!(value.as_text().unwrap().len(), 2 + 36);
    }

    #[test]
    fn test_template_null_and_missing_fields() {
        let template = DeriveTemplate::parse("[{nick}]").unwrap();
        let row = Row::new().with("nick", SqlValue::Null);
        let value = template
            .render(&row, &crate::generator::Unavailable)
            .unwrap();
        assert_eq!(value, SqlValue::from("[]"));

        let err = template
            .render(&Row::new(), &crate::generator::Unavailable)
            .unwrap_err();
        assert!(matches!(err, VeilError::SchemaMismatch(_)));
    }

    #[test]
    fn test_template_parse_errors() {
        assert!(DeriveTemplate::parse("{open").is_err());
        assert!(DeriveTemplate::parse("close}").is_err());
        assert!(DeriveTemplate::parse("{}").is_err());
        assert!(DeriveTemplate::parse("{fake:}").is_err());
        assert!(DeriveTemplate::parse("{a{b}}").is_err());
    }

    #[test]
    fn test_check_column_requires_one_strategy() {
        assert!(check_column(&column("email")).is_err());

        let mut both = column("email");
        both.replace_with = Some(LiteralValue::Text("x".into()));
        both.generate = Some("email".into());
        assert!(check_column(&both).is_err());

        let mut unique_literal = column("email");
        unique_literal.replace_with = Some(LiteralValue::Text("x".into()));
        unique_literal.unique = true;
        assert!(check_column(&unique_literal).is_err());

        let mut unknown = column("email");
        unknown.generate = Some("shoe_size".into());
        assert!(check_column(&unknown).unwrap_err().contains("shoe_size"));
    }

    #[test]
    fn test_check_column_derive_generators() {
        let mut known = column("display_name");
        known.derive = Some("{first_name} {fake:last_name}".into());
        assert!(check_column(&known).is_ok());

        let mut unknown = column("display_name");
        unknown.derive = Some("{first_name} {fake:shoe_size}".into());
        let err = check_column(&unknown).unwrap_err();
        assert!(err.contains("unknown generator 'shoe_size' in derive template"));
    }

    #[test]
    fn test_declare_table() {
        let mut email = column("email");
        email.replace_with = Some(LiteralValue::Text("email_#row#@example.com".into()));
        email.filter = Some("id != 1".into());
        let mut name = column("name");
        name.derive = Some("{id}".into());

        let table = TableConfig {
            name: "users".into(),
            primary_key: None,
            filter: Some("deleted_at IS NULL".into()),
            columns: vec![email, name],
            sync: vec![SyncConfig {
                column: "email".into(),
                targets: vec![SyncTargetConfig {
                    table: "orders".into(),
                    column: "customer_email".into(),
                }],
            }],
        };

        let bp = declare(&table).unwrap().build(&["id".to_string()]).unwrap();
        assert_eq!(bp.columns().len(), 2);
        assert_eq!(bp.columns()[0].filter(), Some("id != 1"));
        assert!(bp.needs_full_row());
        assert_eq!(bp.global_filter().as_deref(), Some("deleted_at IS NULL"));
        assert_eq!(bp.sync_rules()[0].targets[0].table, "orders");
    }
}
