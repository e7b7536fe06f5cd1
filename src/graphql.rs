//! GraphQL schema model, SDL printer and formatter
//!
//! [`GraphQLSchema::build`] derives the queryable shape of every list (output
//! type, filter/unique/order inputs, create/update inputs, Query and Mutation
//! fields). [`print_schema`] renders it as SDL and [`format_graphql_schema`]
//! produces the committed `schema.graphql` text.
//!
//! Type order is fixed: custom scalars, then per-list types in declaration
//! order, then shared inputs and enums sorted by name, then Query and Mutation.

use std::collections::BTreeMap;
use std::fmt;

use crate::schema::{FieldKind, InitialisedList, InitialisedLists};

/// Banner prefixed to the committed GraphQL schema
pub const SCHEMA_BANNER: &str = "# This file is automatically generated by Keystone, do not modify it manually.\n\
# Modify your Keystone config when you want to change this.\n\n";

const DATETIME_SPEC_URL: &str = "https://datatracker.ietf.org/doc/html/rfc3339#section-5.6";
const JSON_SPEC_URL: &str = "http://www.ecma-international.org/publications/files/ECMA-ST/ECMA-404.pdf";

// =============================================================================
// Model
// =============================================================================

/// Reference to a type, possibly wrapped in list/non-null modifiers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeRef {
    Named(String),
    NonNull(Box<TypeRef>),
    List(Box<TypeRef>),
}

impl TypeRef {
    pub fn named(name: impl Into<String>) -> Self {
        TypeRef::Named(name.into())
    }

    pub fn non_null(self) -> Self {
        TypeRef::NonNull(Box::new(self))
    }

    pub fn list(self) -> Self {
        TypeRef::List(Box::new(self))
    }
}

impl fmt::Display for TypeRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeRef::Named(name) => write!(f, "{name}"),
            TypeRef::NonNull(inner) => write!(f, "{inner}!"),
            TypeRef::List(inner) => write!(f, "[{inner}]"),
        }
    }
}

/// An argument or input field
#[derive(Debug, Clone, PartialEq)]
pub struct InputValue {
    pub name: String,
    pub ty: TypeRef,
    /// Default value as GraphQL literal text
    pub default: Option<String>,
}

impl InputValue {
    fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            ty,
            default: None,
        }
    }

    fn with_default(mut self, default: &str) -> Self {
        self.default = Some(default.to_string());
        self
    }
}

/// An output field
#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub args: Vec<InputValue>,
    pub ty: TypeRef,
}

impl Field {
    fn new(name: impl Into<String>, ty: TypeRef) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
            ty,
        }
    }

    fn with_args(mut self, args: Vec<InputValue>) -> Self {
        self.args = args;
        self
    }
}

/// A named type definition
#[derive(Debug, Clone, PartialEq)]
pub enum TypeDefinition {
    Scalar { name: String, specified_by: Option<String> },
    Object { name: String, fields: Vec<Field> },
    Input { name: String, fields: Vec<InputValue> },
    Enum { name: String, values: Vec<String> },
}

impl TypeDefinition {
    pub fn name(&self) -> &str {
        match self {
            TypeDefinition::Scalar { name, .. }
            | TypeDefinition::Object { name, .. }
            | TypeDefinition::Input { name, .. }
            | TypeDefinition::Enum { name, .. } => name,
        }
    }
}

/// The full GraphQL schema derived from the lists
#[derive(Debug, Clone, PartialEq)]
pub struct GraphQLSchema {
    types: Vec<TypeDefinition>,
}

impl GraphQLSchema {
    /// Derive the schema for `lists`
    pub fn build(lists: &InitialisedLists) -> Self {
        let mut builder = SchemaBuilder::default();
        for list in lists.iter() {
            builder.add_list(list);
        }
        builder.finish()
    }

    /// All type definitions in print order
    pub fn types(&self) -> &[TypeDefinition] {
        &self.types
    }

    /// Look up a type by name
    pub fn get(&self, name: &str) -> Option<&TypeDefinition> {
        self.types.iter().find(|t| t.name() == name)
    }
}

// =============================================================================
// Builder
// =============================================================================

#[derive(Default)]
struct SchemaBuilder {
    scalars: BTreeMap<&'static str, &'static str>,
    list_types: Vec<TypeDefinition>,
    shared: BTreeMap<String, TypeDefinition>,
    query: Vec<Field>,
    mutation: Vec<Field>,
}

/// GraphQL scalar for a non-relationship field
fn scalar_name(kind: &FieldKind) -> Option<&'static str> {
    match kind {
        FieldKind::Text | FieldKind::Select { .. } => Some("String"),
        FieldKind::Integer => Some("Int"),
        FieldKind::Float => Some("Float"),
        FieldKind::Decimal => Some("Decimal"),
        FieldKind::Checkbox => Some("Boolean"),
        FieldKind::Timestamp => Some("DateTime"),
        FieldKind::Json => Some("JSON"),
        FieldKind::Relationship(_) => None,
    }
}

fn many_args(target: &str) -> Vec<InputValue> {
    vec![
        InputValue::new("where", TypeRef::named(format!("{target}WhereInput")).non_null()).with_default("{}"),
        InputValue::new(
            "orderBy",
            TypeRef::named(format!("{target}OrderByInput")).non_null().list().non_null(),
        )
        .with_default("[]"),
        InputValue::new("take", TypeRef::named("Int")),
        InputValue::new("skip", TypeRef::named("Int").non_null()).with_default("0"),
    ]
}

fn count_args(target: &str) -> Vec<InputValue> {
    vec![InputValue::new("where", TypeRef::named(format!("{target}WhereInput")).non_null()).with_default("{}")]
}

fn input(name: String, fields: Vec<InputValue>) -> TypeDefinition {
    TypeDefinition::Input { name, fields }
}

impl SchemaBuilder {
    fn use_scalar(&mut self, name: &str) {
        match name {
            "DateTime" => {
                self.scalars.insert("DateTime", DATETIME_SPEC_URL);
            }
            "JSON" => {
                self.scalars.insert("JSON", JSON_SPEC_URL);
            }
            "Decimal" => {
                self.scalars.insert("Decimal", "");
            }
            _ => {}
        }
    }

    fn share(&mut self, definition: TypeDefinition) {
        self.shared.entry(definition.name().to_string()).or_insert(definition);
    }

    fn filter_for(&mut self, scalar: &str) -> String {
        let name = format!("{scalar}Filter");
        let ty = || TypeRef::named(scalar);
        let mut fields = vec![InputValue::new("equals", ty())];
        if scalar != "Boolean" {
            fields.push(InputValue::new("in", ty().non_null().list()));
            fields.push(InputValue::new("notIn", ty().non_null().list()));
            for op in ["lt", "lte", "gt", "gte"] {
                fields.push(InputValue::new(op, ty()));
            }
        }
        if scalar == "String" {
            for op in ["contains", "startsWith", "endsWith"] {
                fields.push(InputValue::new(op, ty()));
            }
        }
        fields.push(InputValue::new("not", TypeRef::named(name.clone())));
        self.share(input(name.clone(), fields));
        name
    }

    fn add_list(&mut self, list: &InitialisedList) {
        let key = &list.key;
        let mut output = vec![Field::new("id", TypeRef::named("ID").non_null())];
        let mut unique = vec![InputValue::new("id", TypeRef::named("ID"))];
        let id_filter = self.filter_for("ID");
        let mut filters = vec![
            InputValue::new("AND", TypeRef::named(format!("{key}WhereInput")).non_null().list()),
            InputValue::new("OR", TypeRef::named(format!("{key}WhereInput")).non_null().list()),
            InputValue::new("NOT", TypeRef::named(format!("{key}WhereInput")).non_null().list()),
            InputValue::new("id", TypeRef::named(id_filter)),
        ];
        let mut order = vec![InputValue::new("id", TypeRef::named("OrderDirection"))];
        let mut create = Vec::new();
        let mut update = Vec::new();

        for field in &list.fields {
            let name = field.name.as_str();
            match (&field.kind, scalar_name(&field.kind)) {
                (_, Some(scalar)) => {
                    self.use_scalar(scalar);
                    output.push(Field::new(name, TypeRef::named(scalar)));
                    create.push(InputValue::new(name, TypeRef::named(scalar)));
                    update.push(InputValue::new(name, TypeRef::named(scalar)));
                    if field.unique {
                        unique.push(InputValue::new(name, TypeRef::named(scalar)));
                    }
                    if !matches!(field.kind, FieldKind::Json) {
                        let filter = self.filter_for(scalar);
                        filters.push(InputValue::new(name, TypeRef::named(filter)));
                        order.push(InputValue::new(name, TypeRef::named("OrderDirection")));
                    }
                }
                (FieldKind::Relationship(rel), None) => {
                    let target = rel.target.as_str();
                    if rel.many {
                        output.push(
                            Field::new(name, TypeRef::named(target).non_null().list()).with_args(many_args(target)),
                        );
                        output.push(
                            Field::new(format!("{name}Count"), TypeRef::named("Int")).with_args(count_args(target)),
                        );
                        filters.push(InputValue::new(name, TypeRef::named(self.many_relation_filter(target))));
                        create.push(InputValue::new(name, TypeRef::named(self.relate_to_many(target, "Create"))));
                        update.push(InputValue::new(name, TypeRef::named(self.relate_to_many(target, "Update"))));
                    } else {
                        output.push(Field::new(name, TypeRef::named(target)));
                        filters.push(InputValue::new(name, TypeRef::named(format!("{target}WhereInput"))));
                        create.push(InputValue::new(name, TypeRef::named(self.relate_to_one(target, "Create"))));
                        update.push(InputValue::new(name, TypeRef::named(self.relate_to_one(target, "Update"))));
                    }
                }
                (_, None) => {}
            }
        }

        self.share(TypeDefinition::Enum {
            name: "OrderDirection".to_string(),
            values: vec!["asc".to_string(), "desc".to_string()],
        });

        self.list_types.extend([
            TypeDefinition::Object {
                name: key.clone(),
                fields: output,
            },
            input(format!("{key}WhereUniqueInput"), unique),
            input(format!("{key}WhereInput"), filters),
            input(format!("{key}OrderByInput"), order),
            input(format!("{key}UpdateInput"), update),
            input(
                format!("{key}UpdateArgs"),
                vec![
                    InputValue::new("where", TypeRef::named(format!("{key}WhereUniqueInput")).non_null()),
                    InputValue::new("data", TypeRef::named(format!("{key}UpdateInput")).non_null()),
                ],
            ),
            input(format!("{key}CreateInput"), create),
        ]);

        self.add_operations(list);
    }

    fn many_relation_filter(&mut self, target: &str) -> String {
        let name = format!("{target}ManyRelationFilter");
        let fields = ["every", "some", "none"]
            .into_iter()
            .map(|op| InputValue::new(op, TypeRef::named(format!("{target}WhereInput"))))
            .collect();
        self.share(input(name.clone(), fields));
        name
    }

    fn relate_to_one(&mut self, target: &str, operation: &str) -> String {
        let name = format!("{target}RelateToOneFor{operation}Input");
        let mut fields = vec![
            InputValue::new("create", TypeRef::named(format!("{target}CreateInput"))),
            InputValue::new("connect", TypeRef::named(format!("{target}WhereUniqueInput"))),
        ];
        if operation == "Update" {
            fields.push(InputValue::new("disconnect", TypeRef::named("Boolean")));
        }
        self.share(input(name.clone(), fields));
        name
    }

    fn relate_to_many(&mut self, target: &str, operation: &str) -> String {
        let name = format!("{target}RelateToManyFor{operation}Input");
        let unique = || TypeRef::named(format!("{target}WhereUniqueInput")).non_null().list();
        let mut fields = Vec::new();
        if operation == "Update" {
            fields.push(InputValue::new("disconnect", unique()));
            fields.push(InputValue::new("set", unique()));
        }
        fields.push(InputValue::new(
            "create",
            TypeRef::named(format!("{target}CreateInput")).non_null().list(),
        ));
        fields.push(InputValue::new("connect", unique()));
        self.share(input(name.clone(), fields));
        name
    }

    fn add_operations(&mut self, list: &InitialisedList) {
        let key = list.key.as_str();
        let plural = list.plural.as_str();
        let unique_arg = || InputValue::new("where", TypeRef::named(format!("{key}WhereUniqueInput")).non_null());
        let item = || TypeRef::named(key);

        self.query.extend([
            Field::new(list.item_query_name(), item()).with_args(vec![unique_arg()]),
            Field::new(list.list_query_name(), item().non_null().list()).with_args(many_args(key)),
            Field::new(list.count_query_name(), TypeRef::named("Int")).with_args(count_args(key)),
        ]);

        let create = || TypeRef::named(format!("{key}CreateInput"));
        self.mutation.extend([
            Field::new(format!("create{key}"), item()).with_args(vec![InputValue::new("data", create().non_null())]),
            Field::new(format!("create{plural}"), item().list())
                .with_args(vec![InputValue::new("data", create().non_null().list().non_null())]),
            Field::new(format!("update{key}"), item()).with_args(vec![
                unique_arg(),
                InputValue::new("data", TypeRef::named(format!("{key}UpdateInput")).non_null()),
            ]),
            Field::new(format!("update{plural}"), item().list()).with_args(vec![InputValue::new(
                "data",
                TypeRef::named(format!("{key}UpdateArgs")).non_null().list().non_null(),
            )]),
            Field::new(format!("delete{key}"), item()).with_args(vec![unique_arg()]),
            Field::new(format!("delete{plural}"), item().list()).with_args(vec![InputValue::new(
                "where",
                TypeRef::named(format!("{key}WhereUniqueInput")).non_null().list().non_null(),
            )]),
        ]);
    }

    fn finish(self) -> GraphQLSchema {
        let mut types: Vec<TypeDefinition> = self
            .scalars
            .into_iter()
            .map(|(name, url)| TypeDefinition::Scalar {
                name: name.to_string(),
                specified_by: (!url.is_empty()).then(|| url.to_string()),
            })
            .collect();
        types.extend(self.list_types);
        types.extend(self.shared.into_values());
        types.push(TypeDefinition::Object {
            name: "Query".to_string(),
            fields: self.query,
        });
        types.push(TypeDefinition::Object {
            name: "Mutation".to_string(),
            fields: self.mutation,
        });
        GraphQLSchema { types }
    }
}

// =============================================================================
// Printing
// =============================================================================

/// Render the schema as SDL
pub fn print_schema(schema: &GraphQLSchema) -> String {
    schema
        .types()
        .iter()
        .map(print_type)
        .collect::<Vec<_>>()
        .join("\n\n")
        + "\n"
}

fn print_type(definition: &TypeDefinition) -> String {
    match definition {
        TypeDefinition::Scalar { name, specified_by } => match specified_by {
            Some(url) => format!("scalar {name} @specifiedBy(url: \"{url}\")"),
            None => format!("scalar {name}"),
        },
        TypeDefinition::Object { name, fields } => {
            let body: Vec<String> = fields.iter().map(print_field).collect();
            format!("type {name} {{\n{}\n}}", body.join("\n"))
        }
        TypeDefinition::Input { name, fields } => {
            let body: Vec<String> = fields.iter().map(|f| format!("  {}", print_input_value(f))).collect();
            format!("input {name} {{\n{}\n}}", body.join("\n"))
        }
        TypeDefinition::Enum { name, values } => {
            let body: Vec<String> = values.iter().map(|v| format!("  {v}")).collect();
            format!("enum {name} {{\n{}\n}}", body.join("\n"))
        }
    }
}

fn print_field(field: &Field) -> String {
    if field.args.is_empty() {
        return format!("  {}: {}", field.name, field.ty);
    }
    let args: Vec<String> = field.args.iter().map(print_input_value).collect();
    format!("  {}({}): {}", field.name, args.join(", "), field.ty)
}

fn print_input_value(value: &InputValue) -> String {
    match &value.default {
        Some(default) => format!("{}: {} = {}", value.name, value.ty, default),
        None => format!("{}: {}", value.name, value.ty),
    }
}

// =============================================================================
// Formatting
// =============================================================================

/// Canonical layout for GraphQL SDL text.
///
/// Indents two spaces per brace depth, strips trailing whitespace, keeps at
/// most one blank line between top-level definitions and none inside a block,
/// and ends the document with exactly one newline.
pub fn format_graphql(source: &str) -> String {
    let mut out = String::with_capacity(source.len());
    let mut depth = 0usize;
    let mut pending_blank = false;

    for raw in source.lines() {
        let line = raw.trim();
        if line.is_empty() {
            pending_blank = !out.is_empty();
            continue;
        }
        if line.starts_with('}') {
            depth = depth.saturating_sub(1);
        }
        if pending_blank && depth == 0 && !line.starts_with('}') {
            out.push('\n');
        }
        pending_blank = false;

        for _ in 0..depth {
            out.push_str("  ");
        }
        out.push_str(line);
        out.push('\n');

        if line.ends_with('{') {
            depth += 1;
        }
    }

    out
}

/// Banner plus canonical formatting: the committed `schema.graphql` text
pub fn format_graphql_schema(printed: &str) -> String {
    format_graphql(&format!("{SCHEMA_BANNER}{printed}"))
}
