//! TypeScript declaration emitter
//!
//! Renders `types.d.ts` from the GraphQL schema model: a scalar map, every
//! input type, every enum, then per-list type info and the project-wide
//! `TypeInfo`. Object types are not emitted; list items come from the
//! generated storage client.

use crate::graphql::{GraphQLSchema, InputValue, TypeDefinition, TypeRef};
use crate::schema::{InitialisedList, InitialisedLists};

const BUILTIN_SCALARS: &[(&str, &str)] = &[
    ("ID", "string"),
    ("Boolean", "boolean"),
    ("String", "string"),
    ("Int", "number"),
    ("Float", "number"),
];

const CLIENT_MODULE: &str = ".prisma/client";

// =============================================================================
// Public API
// =============================================================================

/// Print `types.d.ts` for `schema` and the lists it was built from
pub fn print_generated_types(schema: &GraphQLSchema, lists: &InitialisedLists) -> String {
    let mut output = String::new();

    emit_scalars(&mut output, schema);

    for definition in schema.types() {
        match definition {
            TypeDefinition::Input { name, fields } => emit_input(&mut output, schema, name, fields),
            TypeDefinition::Enum { name, values } => emit_enum(&mut output, name, values),
            TypeDefinition::Scalar { .. } | TypeDefinition::Object { .. } => {}
        }
    }

    for list in lists.iter() {
        emit_list_type_info(&mut output, list);
    }

    emit_type_info(&mut output, lists);
    output
}

// =============================================================================
// Scalars
// =============================================================================

fn custom_scalar_type(name: &str) -> &'static str {
    match name {
        "DateTime" => "Date | string",
        "JSON" => "import('@keystone-6/core/types').JSONValue",
        "Decimal" => "import('@keystone-6/core/types').Decimal | string",
        _ => "any",
    }
}

fn emit_scalars(output: &mut String, schema: &GraphQLSchema) {
    output.push_str("type Scalars = {\n");
    for (name, ts) in BUILTIN_SCALARS {
        output.push_str(&format!("  readonly {}: {};\n", name, ts));
    }
    for definition in schema.types() {
        if let TypeDefinition::Scalar { name, .. } = definition {
            output.push_str(&format!("  readonly {}: {};\n", name, custom_scalar_type(name)));
        }
    }
    output.push_str("};\n\n");
}

fn is_scalar(schema: &GraphQLSchema, name: &str) -> bool {
    BUILTIN_SCALARS.iter().any(|(builtin, _)| *builtin == name)
        || matches!(schema.get(name), Some(TypeDefinition::Scalar { .. }))
}

// =============================================================================
// Inputs and enums
// =============================================================================

/// TypeScript for a type reference, without the outer nullability
fn render_type(schema: &GraphQLSchema, ty: &TypeRef) -> String {
    match ty {
        TypeRef::Named(name) if is_scalar(schema, name) => format!("Scalars['{}']", name),
        TypeRef::Named(name) => name.clone(),
        TypeRef::NonNull(inner) => render_type(schema, inner),
        TypeRef::List(inner) => {
            let item = render_nullable(schema, inner);
            format!("ReadonlyArray<{item}> | {item}")
        }
    }
}

fn render_nullable(schema: &GraphQLSchema, ty: &TypeRef) -> String {
    match ty {
        TypeRef::NonNull(inner) => render_type(schema, inner),
        other => format!("{} | null", render_type(schema, other)),
    }
}

fn emit_input(output: &mut String, schema: &GraphQLSchema, name: &str, fields: &[InputValue]) {
    output.push_str(&format!("export type {} = {{\n", name));
    for field in fields {
        let required = matches!(field.ty, TypeRef::NonNull(_)) && field.default.is_none();
        let optional = if required { "" } else { "?" };
        output.push_str(&format!(
            "  readonly {}{}: {};\n",
            field.name,
            optional,
            render_nullable(schema, &field.ty)
        ));
    }
    output.push_str("};\n\n");
}

fn emit_enum(output: &mut String, name: &str, values: &[String]) {
    output.push_str(&format!("export type {} =\n", name));
    let last = values.len().saturating_sub(1);
    for (i, value) in values.iter().enumerate() {
        let end = if i == last { ";" } else { "" };
        output.push_str(&format!("  | '{}'{}\n", value, end));
    }
    output.push('\n');
}

// =============================================================================
// List type info
// =============================================================================

fn emit_list_type_info(output: &mut String, list: &InitialisedList) {
    let key = &list.key;
    let fields = std::iter::once("'id'".to_string())
        .chain(list.fields.iter().map(|f| format!("'{}'", f.name)))
        .collect::<Vec<_>>()
        .join(" | ");

    output.push_str(&format!("export type {}ListTypeInfo = {{\n", key));
    output.push_str(&format!("  key: '{}';\n", key));
    output.push_str(&format!("  fields: {};\n", fields));
    output.push_str(&format!("  item: import('{}').{};\n", CLIENT_MODULE, key));
    output.push_str("  inputs: {\n");
    output.push_str(&format!("    where: {}WhereInput;\n", key));
    output.push_str(&format!("    uniqueWhere: {}WhereUniqueInput;\n", key));
    output.push_str(&format!("    create: {}CreateInput;\n", key));
    output.push_str(&format!("    update: {}UpdateInput;\n", key));
    output.push_str(&format!("    orderBy: {}OrderByInput;\n", key));
    output.push_str("  };\n");
    output.push_str("  all: __TypeInfo;\n");
    output.push_str("};\n\n");
}

fn emit_type_info(output: &mut String, lists: &InitialisedLists) {
    output.push_str("export type KeystoneListsTypeInfo = {\n");
    for list in lists.iter() {
        output.push_str(&format!("  readonly {}: {}ListTypeInfo;\n", list.key, list.key));
    }
    output.push_str("};\n\n");

    output.push_str("export type TypeInfo = {\n");
    output.push_str("  lists: KeystoneListsTypeInfo;\n");
    output.push_str(&format!("  prisma: import('{}').PrismaClient;\n", CLIENT_MODULE));
    output.push_str("};\n\n");

    output.push_str("type __TypeInfo = TypeInfo;\n");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::ProjectConfig;
    use crate::schema::initialise_lists;

    const TASKS: &str = r#"
[[lists]]
name = "Task"

[[lists.fields]]
name = "label"
type = "text"
required = true

[[lists.fields]]
name = "done"
type = "checkbox"

[[lists.fields]]
name = "finishBy"
type = "timestamp"
"#;

    fn print(source: &str) -> String {
        let config = ProjectConfig::from_toml_str(source).unwrap();
        let lists = initialise_lists(&config).unwrap();
        print_generated_types(&GraphQLSchema::build(&lists), &lists)
    }

    #[test]
    fn test_scalars_include_custom() {
        let printed = print(TASKS);
        assert!(printed.starts_with("type Scalars = {\n  readonly ID: string;\n"));
        assert!(printed.contains("  readonly DateTime: Date | string;\n"));
        assert!(!printed.contains("readonly JSON"));
    }

    #[test]
    fn test_inputs_and_enums() {
        let printed = print(TASKS);
        assert!(printed.contains("export type TaskWhereUniqueInput = {\n  readonly id?: Scalars['ID'] | null;\n"));
        assert!(printed.contains("export type OrderDirection =\n  | 'asc'\n  | 'desc';\n"));
        assert!(printed.contains("  readonly label?: Scalars['String'] | null;\n"));
        assert!(!printed.contains("export type Task = {"));
    }

    #[test]
    fn test_list_type_info() {
        let printed = print(TASKS);
        assert!(printed.contains("  key: 'Task';\n  fields: 'id' | 'label' | 'done' | 'finishBy';\n"));
        assert!(printed.contains("  item: import('.prisma/client').Task;\n"));
        assert!(printed.contains("export type KeystoneListsTypeInfo = {\n  readonly Task: TaskListTypeInfo;\n};\n"));
        assert!(printed.ends_with("type __TypeInfo = TypeInfo;\n"));
    }

    #[test]
    fn test_list_inputs_render_as_readonly_arrays() {
        let ty = TypeRef::named("TaskWhereInput").non_null().list();
        let schema = GraphQLSchema::build(
            &initialise_lists(&ProjectConfig::from_toml_str(TASKS).unwrap()).unwrap(),
        );
        assert_eq!(
            render_nullable(&schema, &ty),
            "ReadonlyArray<TaskWhereInput> | TaskWhereInput | null"
        );
    }
}
