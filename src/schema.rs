//! List/field model
//!
//! Validates the declared lists in [`ProjectConfig`] and resolves them into an
//! immutable [`InitialisedLists`] value that both serializers and the type
//! printer consume. Relationship pairing (relation names, which side holds the
//! foreign key, synthetic back-references for one-sided relationships) is
//! decided here once so every printer agrees on it.

use std::collections::{BTreeMap, HashMap, HashSet};
use std::sync::OnceLock;

use fuzzy_matcher::skim::SkimMatcherV2;
use fuzzy_matcher::FuzzyMatcher;
use regex::Regex;

use crate::config::{FieldConfig, FieldType, ListConfig, ProjectConfig, Provider};
use crate::error::{ArtifactError, Result};

// =============================================================================
// Model
// =============================================================================

/// All lists of a project, in declaration order
#[derive(Debug, Clone, PartialEq)]
pub struct InitialisedLists {
    lists: Vec<InitialisedList>,
}

impl InitialisedLists {
    /// Iterate lists in declaration order
    pub fn iter(&self) -> impl Iterator<Item = &InitialisedList> {
        self.lists.iter()
    }

    /// Look up a list by key
    pub fn get(&self, key: &str) -> Option<&InitialisedList> {
        self.lists.iter().find(|l| l.key == key)
    }
}

/// A validated list
#[derive(Debug, Clone, PartialEq)]
pub struct InitialisedList {
    /// List key, e.g. "Post"
    pub key: String,
    /// Plural used for GraphQL names, e.g. "Posts"
    pub plural: String,
    /// Declared fields, excluding the implicit `id`
    pub fields: Vec<InitialisedField>,
    /// Prisma-only fields backing one-sided relationships that target this list
    pub back_refs: Vec<BackRef>,
}

impl InitialisedList {
    /// Name of the single-item query field ("post")
    pub fn item_query_name(&self) -> String {
        lower_first(&self.key)
    }

    /// Name of the many-items query field ("posts")
    pub fn list_query_name(&self) -> String {
        lower_first(&self.plural)
    }

    /// Name of the count query field ("postsCount")
    pub fn count_query_name(&self) -> String {
        format!("{}Count", self.list_query_name())
    }

    /// Field lookup by name
    pub fn field(&self, name: &str) -> Option<&InitialisedField> {
        self.fields.iter().find(|f| f.name == name)
    }
}

/// A validated field
#[derive(Debug, Clone, PartialEq)]
pub struct InitialisedField {
    pub name: String,
    pub kind: FieldKind,
    pub required: bool,
    pub unique: bool,
    pub indexed: bool,
}

/// Resolved field kind
#[derive(Debug, Clone, PartialEq)]
pub enum FieldKind {
    Text,
    Integer,
    Float,
    Decimal,
    Checkbox,
    Timestamp,
    Json,
    Select { options: Vec<String> },
    Relationship(Relation),
}

/// Resolved relationship
#[derive(Debug, Clone, PartialEq)]
pub struct Relation {
    /// Target list key
    pub target: String,
    /// Field on the target list pointing back, for two-sided relationships
    pub target_field: Option<String>,
    pub many: bool,
    /// Prisma relation name shared by both sides
    pub relation_name: String,
    /// Set when this side stores the foreign key
    pub foreign_key: Option<ForeignKey>,
}

/// Foreign key column stored on the owning side of a to-one relationship
#[derive(Debug, Clone, PartialEq)]
pub struct ForeignKey {
    /// Scalar field name, e.g. "authorId"
    pub field: String,
    /// One-to-one relationships need a unique foreign key
    pub unique: bool,
}

/// Synthetic back-reference generated for a one-sided relationship
#[derive(Debug, Clone, PartialEq)]
pub struct BackRef {
    /// Field name, e.g. "from_Post_author"
    pub name: String,
    /// List declaring the relationship
    pub source: String,
    pub relation_name: String,
}

// =============================================================================
// Initialisation
// =============================================================================

fn list_key_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[A-Z][A-Za-z0-9]*$").unwrap())
}

fn field_name_pattern() -> &'static Regex {
    static PATTERN: OnceLock<Regex> = OnceLock::new();
    PATTERN.get_or_init(|| Regex::new(r"^[a-z][A-Za-z0-9_]*$").unwrap())
}

/// Validate the declared lists and resolve them into the list/field model
pub fn initialise_lists(config: &ProjectConfig) -> Result<InitialisedLists> {
    if config.lists.is_empty() {
        return Err(invalid("at least one list must be declared"));
    }

    let mut keys = HashSet::new();
    let mut plurals = HashSet::new();
    for list in &config.lists {
        validate_list(list, config.db.provider)?;
        if !keys.insert(list.name.as_str()) {
            return Err(invalid(format!("list '{}' is declared more than once", list.name)));
        }
        let plural = plural_for(list);
        if plural == list.name {
            return Err(invalid(format!(
                "list '{}' has the same singular and plural name; set `plural` explicitly",
                list.name
            )));
        }
        if !plurals.insert(plural) {
            return Err(invalid(format!("list '{}' has a plural that clashes with another list", list.name)));
        }
    }

    let declared: BTreeMap<&str, &ListConfig> =
        config.lists.iter().map(|l| (l.name.as_str(), l)).collect();

    let mut lists: Vec<InitialisedList> = config
        .lists
        .iter()
        .map(|list| {
            let fields = list
                .fields
                .iter()
                .map(|field| resolve_field(list, field, &declared))
                .collect::<Result<Vec<_>>>()?;
            Ok(InitialisedList {
                key: list.name.clone(),
                plural: plural_for(list),
                fields,
                back_refs: Vec::new(),
            })
        })
        .collect::<Result<_>>()?;

    attach_back_refs(&mut lists);
    check_prisma_names(&lists)?;
    check_graphql_names(&lists)?;

    Ok(InitialisedLists { lists })
}

fn validate_list(list: &ListConfig, provider: Provider) -> Result<()> {
    if !list_key_pattern().is_match(&list.name) {
        return Err(invalid(format!(
            "list key '{}' must be PascalCase (letters and digits, starting with an uppercase letter)",
            list.name
        )));
    }

    if list.fields.is_empty() {
        return Err(invalid(format!("list '{}' must declare at least one field", list.name)));
    }

    let mut names = HashSet::new();
    for field in &list.fields {
        let path = format!("{}.{}", list.name, field.name);
        if field.name == "id" {
            return Err(invalid(format!("{path}: 'id' is reserved for the generated primary key")));
        }
        if !field_name_pattern().is_match(&field.name) {
            return Err(invalid(format!("{path}: field names must start with a lowercase letter")));
        }
        if !names.insert(field.name.as_str()) {
            return Err(invalid(format!("{path}: field is declared more than once")));
        }
        match field.field_type {
            FieldType::Select => {
                if field.options.is_empty() {
                    return Err(invalid(format!("{path}: select fields need at least one option")));
                }
                let unique: HashSet<_> = field.options.iter().collect();
                if unique.len() != field.options.len() {
                    return Err(invalid(format!("{path}: select options must be unique")));
                }
            }
            FieldType::Json if provider == Provider::Sqlite => {
                return Err(invalid(format!("{path}: json fields are not supported by the sqlite provider")));
            }
            FieldType::Relationship => {
                if field.target.is_none() {
                    return Err(invalid(format!("{path}: relationship fields need a `ref`")));
                }
                if field.unique || field.indexed {
                    return Err(invalid(format!("{path}: relationship fields cannot be unique or indexed")));
                }
            }
            _ => {}
        }
        if field.many && field.field_type != FieldType::Relationship {
            return Err(invalid(format!("{path}: `many` only applies to relationship fields")));
        }
    }
    Ok(())
}

fn resolve_field(
    list: &ListConfig,
    field: &FieldConfig,
    declared: &BTreeMap<&str, &ListConfig>,
) -> Result<InitialisedField> {
    let kind = match field.field_type {
        FieldType::Text => FieldKind::Text,
        FieldType::Integer => FieldKind::Integer,
        FieldType::Float => FieldKind::Float,
        FieldType::Decimal => FieldKind::Decimal,
        FieldType::Checkbox => FieldKind::Checkbox,
        FieldType::Timestamp => FieldKind::Timestamp,
        FieldType::Json => FieldKind::Json,
        FieldType::Select => FieldKind::Select {
            options: field.options.clone(),
        },
        FieldType::Relationship => FieldKind::Relationship(resolve_relation(list, field, declared)?),
    };

    Ok(InitialisedField {
        name: field.name.clone(),
        kind,
        required: field.required && field.field_type != FieldType::Relationship,
        unique: field.unique,
        indexed: field.indexed,
    })
}

fn resolve_relation(
    list: &ListConfig,
    field: &FieldConfig,
    declared: &BTreeMap<&str, &ListConfig>,
) -> Result<Relation> {
    let path = format!("{}.{}", list.name, field.name);
    let reference = field.target.as_deref().unwrap_or_default();
    let (target, target_field) = match reference.split_once('.') {
        Some((list_key, field_name)) => (list_key, Some(field_name)),
        None => (reference, None),
    };

    let Some(target_list) = declared.get(target) else {
        let hint = suggest(target, declared.keys().copied())
            .map(|s| format!("; did you mean '{s}'?"))
            .unwrap_or_default();
        return Err(invalid(format!("{path}: unknown list '{target}' in ref{hint}")));
    };

    let Some(target_field) = target_field else {
        let relation_name = format!("{}_{}", list.name, field.name);
        return Ok(Relation {
            target: target.to_string(),
            target_field: None,
            many: field.many,
            relation_name,
            foreign_key: (!field.many).then(|| ForeignKey {
                field: format!("{}Id", field.name),
                unique: false,
            }),
        });
    };

    if (target, target_field) == (list.name.as_str(), field.name.as_str()) {
        return Err(invalid(format!(
            "{path}: a two-sided relationship cannot reference itself; point `ref` at a separate field"
        )));
    }

    let other = target_list
        .fields
        .iter()
        .find(|f| f.name == target_field)
        .ok_or_else(|| invalid(format!("{path}: '{reference}' does not exist")))?;

    let back = format!("{}.{}", list.name, field.name);
    if other.field_type != FieldType::Relationship || other.target.as_deref() != Some(back.as_str()) {
        return Err(invalid(format!(
            "{path}: '{reference}' must be a relationship with ref = \"{back}\""
        )));
    }

    // The side that sorts first names the relation
    let this_side = (list.name.as_str(), field.name.as_str());
    let that_side = (target, target_field);
    let owner = this_side.min(that_side);
    let relation_name = format!("{}_{}", owner.0, owner.1);
    let is_owner = owner == this_side;

    let holds_key = match (field.many, other.many) {
        (true, true) => false,
        (false, true) => true,
        (true, false) => false,
        (false, false) => is_owner,
    };

    Ok(Relation {
        target: target.to_string(),
        target_field: Some(target_field.to_string()),
        many: field.many,
        relation_name,
        foreign_key: holds_key.then(|| ForeignKey {
            field: format!("{}Id", field.name),
            unique: !field.many && !other.many,
        }),
    })
}

fn attach_back_refs(lists: &mut [InitialisedList]) {
    let mut pending = Vec::new();
    for list in lists.iter() {
        for field in &list.fields {
            if let FieldKind::Relationship(rel) = &field.kind {
                if rel.target_field.is_none() {
                    pending.push((
                        rel.target.clone(),
                        BackRef {
                            name: format!("from_{}_{}", list.key, field.name),
                            source: list.key.clone(),
                            relation_name: rel.relation_name.clone(),
                        },
                    ));
                }
            }
        }
    }
    for (target, back_ref) in pending {
        if let Some(list) = lists.iter_mut().find(|l| l.key == target) {
            list.back_refs.push(back_ref);
        }
    }
}

/// Foreign keys and back-references must not collide with declared fields
fn check_prisma_names(lists: &[InitialisedList]) -> Result<()> {
    for list in lists {
        let mut seen: HashSet<&str> = HashSet::from(["id"]);
        let declared = list.fields.iter().map(|f| f.name.as_str());
        let keys = list.fields.iter().filter_map(|f| match &f.kind {
            FieldKind::Relationship(rel) => rel.foreign_key.as_ref().map(|k| k.field.as_str()),
            _ => None,
        });
        let back_refs = list.back_refs.iter().map(|b| b.name.as_str());
        for name in declared.chain(keys).chain(back_refs) {
            if !seen.insert(name) {
                return Err(invalid(format!(
                    "{}.{name}: name clashes with a generated relationship field",
                    list.key
                )));
            }
        }
    }
    Ok(())
}

/// Type names the schema always defines
const BUILTIN_TYPE_NAMES: &[&str] = &[
    "ID",
    "String",
    "Int",
    "Float",
    "Boolean",
    "DateTime",
    "JSON",
    "Decimal",
    "Query",
    "Mutation",
    "OrderDirection",
    "IDFilter",
    "StringFilter",
    "IntFilter",
    "FloatFilter",
    "BooleanFilter",
    "DateTimeFilter",
    "DecimalFilter",
];

/// Records which list generated each GraphQL name
#[derive(Default)]
struct NameRegistry {
    owners: HashMap<String, String>,
}

impl NameRegistry {
    fn claim(&mut self, name: String, owner: &str) -> Result<()> {
        match self.owners.get(&name) {
            Some(previous) => Err(invalid(format!(
                "{owner}: generated GraphQL name '{name}' clashes with {previous}"
            ))),
            None => {
                self.owners.insert(name, owner.to_string());
                Ok(())
            }
        }
    }
}

/// Generated GraphQL type, operation and output field names must be unique
fn check_graphql_names(lists: &[InitialisedList]) -> Result<()> {
    let mut types = NameRegistry::default();
    for name in BUILTIN_TYPE_NAMES {
        types.claim(name.to_string(), "built-in types")?;
    }

    let mut query = NameRegistry::default();
    let mut mutation = NameRegistry::default();

    for list in lists {
        let key = &list.key;
        let plural = &list.plural;
        let owner = format!("list '{key}'");

        for suffix in [
            "",
            "WhereUniqueInput",
            "WhereInput",
            "OrderByInput",
            "UpdateInput",
            "UpdateArgs",
            "CreateInput",
            "ManyRelationFilter",
            "RelateToOneForCreateInput",
            "RelateToOneForUpdateInput",
            "RelateToManyForCreateInput",
            "RelateToManyForUpdateInput",
        ] {
            types.claim(format!("{key}{suffix}"), &owner)?;
        }

        query.claim(list.item_query_name(), &owner)?;
        query.claim(list.list_query_name(), &owner)?;
        query.claim(list.count_query_name(), &owner)?;

        for operation in ["create", "update", "delete"] {
            mutation.claim(format!("{operation}{key}"), &owner)?;
            mutation.claim(format!("{operation}{plural}"), &owner)?;
        }

        let mut fields = NameRegistry::default();
        fields.claim("id".to_string(), "the primary key")?;
        for field in &list.fields {
            fields.claim(field.name.clone(), &format!("{key}.{}", field.name))?;
        }
        for field in &list.fields {
            if let FieldKind::Relationship(rel) = &field.kind {
                if rel.many {
                    fields.claim(format!("{}Count", field.name), &format!("{key}.{}", field.name))?;
                }
            }
        }
    }
    Ok(())
}

// =============================================================================
// Naming helpers
// =============================================================================

fn plural_for(list: &ListConfig) -> String {
    list.plural.clone().unwrap_or_else(|| pluralize(&list.name))
}

/// Naive English pluralization
pub fn pluralize(word: &str) -> String {
    let lower = word.to_ascii_lowercase();
    if ["s", "x", "z", "ch", "sh"].iter().any(|s| lower.ends_with(s)) {
        return format!("{word}es");
    }
    if let Some(stem) = word.strip_suffix('y') {
        let before = stem.chars().last().map(|c| c.to_ascii_lowercase());
        if !matches!(before, Some('a' | 'e' | 'i' | 'o' | 'u') | None) {
            return format!("{stem}ies");
        }
    }
    format!("{word}s")
}

/// Lowercase the first character ("BlogPost" -> "blogPost")
pub fn lower_first(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_lowercase().chain(chars).collect(),
        None => String::new(),
    }
}

fn suggest<'a>(name: &str, candidates: impl Iterator<Item = &'a str>) -> Option<&'a str> {
    let matcher = SkimMatcherV2::default();
    candidates
        .filter_map(|c| matcher.fuzzy_match(c, name).map(|score| (score, c)))
        .max_by_key(|(score, _)| *score)
        .map(|(_, c)| c)
}

fn invalid(message: impl Into<String>) -> ArtifactError {
    ArtifactError::InvalidSchema(message.into())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(toml: &str) -> ProjectConfig {
        ProjectConfig::from_toml_str(toml).unwrap()
    }

    const BLOG: &str = r#"
[[lists]]
name = "User"

[[lists.fields]]
name = "name"
type = "text"
required = true

[[lists.fields]]
name = "posts"
type = "relationship"
ref = "Post.author"
many = true

[[lists]]
name = "Post"

[[lists.fields]]
name = "title"
type = "text"

[[lists.fields]]
name = "author"
type = "relationship"
ref = "User.posts"

[[lists.fields]]
name = "tags"
type = "relationship"
ref = "Tag"
many = true

[[lists]]
name = "Tag"

[[lists.fields]]
name = "label"
type = "text"
unique = true
"#;

    #[test]
    fn test_pluralize() {
        assert_eq!(pluralize("Post"), "Posts");
        assert_eq!(pluralize("Category"), "Categories");
        assert_eq!(pluralize("Day"), "Days");
        assert_eq!(pluralize("Box"), "Boxes");
        assert_eq!(pluralize("Address"), "Addresses");
    }

    #[test]
    fn test_lower_first() {
        assert_eq!(lower_first("BlogPost"), "blogPost");
        assert_eq!(lower_first(""), "");
    }

    #[test]
    fn test_two_sided_relationship() {
        let lists = initialise_lists(&config(BLOG)).unwrap();
        let post = lists.get("Post").unwrap();
        let user = lists.get("User").unwrap();

        let FieldKind::Relationship(author) = &post.field("author").unwrap().kind else {
            panic!("author should be a relationship");
        };
        assert_eq!(author.relation_name, "Post_author");
        assert_eq!(author.foreign_key.as_ref().unwrap().field, "authorId");
        assert!(!author.foreign_key.as_ref().unwrap().unique);

        let FieldKind::Relationship(posts) = &user.field("posts").unwrap().kind else {
            panic!("posts should be a relationship");
        };
        assert_eq!(posts.relation_name, "Post_author");
        assert!(posts.foreign_key.is_none());
        assert!(user.back_refs.is_empty());
    }

    #[test]
    fn test_one_sided_relationship_back_ref() {
        let lists = initialise_lists(&config(BLOG)).unwrap();
        let tag = lists.get("Tag").unwrap();
        assert_eq!(tag.back_refs.len(), 1);
        assert_eq!(tag.back_refs[0].name, "from_Post_tags");
        assert_eq!(tag.back_refs[0].relation_name, "Post_tags");
    }

    #[test]
    fn test_query_names() {
        let lists = initialise_lists(&config(BLOG)).unwrap();
        let post = lists.get("Post").unwrap();
        assert_eq!(post.item_query_name(), "post");
        assert_eq!(post.list_query_name(), "posts");
        assert_eq!(post.count_query_name(), "postsCount");
    }

    #[test]
    fn test_unknown_target_suggests() {
        let err = initialise_lists(&config(
            r#"
[[lists]]
name = "User"

[[lists.fields]]
name = "name"
type = "text"

[[lists]]
name = "Post"

[[lists.fields]]
name = "author"
type = "relationship"
ref = "Usr"
"#,
        ))
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("unknown list 'Usr'"), "{message}");
        assert!(message.contains("did you mean 'User'"), "{message}");
    }

    #[test]
    fn test_mismatched_back_reference() {
        let err = initialise_lists(&config(
            r#"
[[lists]]
name = "User"

[[lists.fields]]
name = "posts"
type = "relationship"
ref = "Post"
many = true

[[lists]]
name = "Post"

[[lists.fields]]
name = "author"
type = "relationship"
ref = "User.posts"
"#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("must be a relationship with ref = \"Post.author\""));
    }

    #[test]
    fn test_rejects_invalid_declarations() {
        let cases = [
            ("[[lists]]\nname = \"post\"\n", "PascalCase"),
            ("[[lists]]\nname = \"Post\"\n[[lists.fields]]\nname = \"id\"\ntype = \"text\"\n", "reserved"),
            ("[[lists]]\nname = \"Post\"\n[[lists.fields]]\nname = \"data\"\ntype = \"json\"\n", "sqlite"),
            ("[[lists]]\nname = \"Post\"\n[[lists.fields]]\nname = \"status\"\ntype = \"select\"\n", "option"),
            ("[[lists]]\nname = \"Sheep\"\nplural = \"Sheep\"\n[[lists.fields]]\nname = \"wool\"\ntype = \"text\"\n", "same singular and plural"),
            ("[[lists]]\nname = \"Empty\"\n", "at least one field"),
        ];
        for (toml, expected) in cases {
            let err = initialise_lists(&config(toml)).unwrap_err();
            assert!(err.to_string().contains(expected), "{toml}: {err}");
        }
    }

    #[test]
    fn test_requires_a_list() {
        let err = initialise_lists(&ProjectConfig::default()).unwrap_err();
        assert!(err.to_string().contains("at least one list"));
    }

    #[test]
    fn test_foreign_key_clash() {
        let err = initialise_lists(&config(
            r#"
[[lists]]
name = "Post"

[[lists.fields]]
name = "authorId"
type = "text"

[[lists.fields]]
name = "author"
type = "relationship"
ref = "Post"
"#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("Post.authorId"));
    }

    #[test]
    fn test_rejects_self_referencing_relationship() {
        let err = initialise_lists(&config(
            r#"
[[lists]]
name = "User"

[[lists.fields]]
name = "partner"
type = "relationship"
ref = "User.partner"
"#,
        ))
        .unwrap_err();
        assert!(err.to_string().contains("User.partner: a two-sided relationship cannot reference itself"));
    }

    #[test]
    fn test_count_field_clash() {
        let err = initialise_lists(&config(
            r#"
[[lists]]
name = "Post"

[[lists.fields]]
name = "tagsCount"
type = "integer"

[[lists.fields]]
name = "tags"
type = "relationship"
ref = "Tag"
many = true

[[lists]]
name = "Tag"

[[lists.fields]]
name = "label"
type = "text"
"#,
        ))
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("'tagsCount'"), "{message}");
        assert!(message.contains("Post.tags"), "{message}");
    }

    #[test]
    fn test_plural_clashes_with_other_list() {
        let err = initialise_lists(&config(
            r#"
[[lists]]
name = "Person"
plural = "People"

[[lists.fields]]
name = "name"
type = "text"

[[lists]]
name = "People"

[[lists.fields]]
name = "name"
type = "text"
"#,
        ))
        .unwrap_err();
        let message = err.to_string();
        assert!(message.contains("list 'People'"), "{message}");
        assert!(message.contains("'people'"), "{message}");
    }

    #[test]
    fn test_rejects_reserved_type_names() {
        for key in ["Query", "Mutation", "OrderDirection", "IDFilter", "String", "DateTime"] {
            let source = format!("[[lists]]\nname = \"{key}\"\n[[lists.fields]]\nname = \"label\"\ntype = \"text\"\n");
            let err = initialise_lists(&config(&source)).unwrap_err();
            let message = err.to_string();
            assert!(message.contains(&format!("'{key}'")), "{key}: {message}");
            assert!(message.contains("built-in types"), "{key}: {message}");
        }
    }
}
