use crate::type_descriptor::{LeafKind, TypeDescriptor};
use crate::type_name;
use chrono::Utc;
use log::debug;
use serde::Serialize;
use serde_json::{json, Map, Value};
use std::collections::{BTreeMap, BTreeSet, HashSet};

/// Example value emitted once the depth guard trips
pub const MAX_DEPTH_SENTINEL: &str = "max-depth";

/// Example value for enums without members
const EMPTY_ENUM_EXAMPLE: &str = "UNKNOWN";

/// Structural kind of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum SchemaKind {
    Primitive,
    Object,
    Array,
    /// Back-reference to a type already being expanded on the current path
    Ref,
}

/// JSON type of a schema node
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum JsonType {
    Integer,
    Number,
    Boolean,
    String,
    Object,
    Array,
}

impl JsonType {
    fn of_leaf(kind: &LeafKind) -> Self {
        match kind {
            LeafKind::Integer => JsonType::Integer,
            LeafKind::Number => JsonType::Number,
            LeafKind::Boolean => JsonType::Boolean,
            LeafKind::String
            | LeafKind::Date
            | LeafKind::DateTime
            | LeafKind::Guid
            | LeafKind::Enum(_) => JsonType::String,
        }
    }
}

/// JSON-schema-like description of a type's shape
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct SchemaNode {
    pub kind: SchemaKind,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub json_type: Option<JsonType>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<BTreeMap<String, SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub items: Option<Box<SchemaNode>>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<BTreeSet<String>>,
    /// Synthesized example, attached to the root node of a generation only
    #[serde(skip_serializing_if = "Option::is_none")]
    pub example: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub ref_name: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SchemaNode {
    fn new(kind: SchemaKind, json_type: Option<JsonType>) -> Self {
        Self {
            kind,
            json_type,
            properties: None,
            items: None,
            required: None,
            example: None,
            ref_name: None,
            description: None,
        }
    }

    fn reference(name: String) -> Self {
        Self {
            ref_name: Some(name),
            ..Self::new(SchemaKind::Ref, None)
        }
    }
}

/// Walks type descriptors into schema nodes and example values.
///
/// The generator itself holds only configuration; the set of types active on the
/// current recursion path lives in a per-call walk, so concurrent or repeated calls never
/// see each other's state.
#[derive(Debug, Clone, Copy)]
pub struct SchemaGenerator {
    max_depth: usize,
}

impl SchemaGenerator {
    pub fn new(max_depth: usize) -> Self {
        Self { max_depth }
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// Generate a schema with its example attached to the root node
    pub fn generate<T: TypeDescriptor>(&self, ty: &T) -> SchemaNode {
        let (mut node, example) = self.generate_with_example(ty);
        node.example = Some(example);
        node
    }

    /// Generate a schema and its example value separately
    pub fn generate_with_example<T: TypeDescriptor>(&self, ty: &T) -> (SchemaNode, Value) {
        debug!("Generating schema for {}", ty.identity());
        let mut walk = Walk {
            active: HashSet::new(),
            max_depth: self.max_depth,
        };
        walk.visit(ty, 1)
    }
}

struct Walk {
    active: HashSet<String>,
    max_depth: usize,
}

impl Walk {
    fn visit<T: TypeDescriptor>(&mut self, ty: &T, depth: usize) -> (SchemaNode, Value) {
        let ty = ty.unwrap_nullable();
        let identity = ty.identity();

        if self.active.contains(&identity) {
            debug!("Cycle detected at {}", identity);
            return (SchemaNode::reference(type_name::type_label(Some(&ty))), Value::Null);
        }

        let leaf = ty.leaf_kind();
        let element = if leaf.is_none() { ty.element_type() } else { None };

        if depth > self.max_depth {
            let node = match (&leaf, &element) {
                (Some(kind), _) => SchemaNode::new(SchemaKind::Primitive, Some(JsonType::of_leaf(kind))),
                (None, Some(_)) => SchemaNode::new(SchemaKind::Array, Some(JsonType::Array)),
                (None, None) => SchemaNode::new(SchemaKind::Object, Some(JsonType::Object)),
            };
            return (node, Value::String(MAX_DEPTH_SENTINEL.to_string()));
        }

        if let Some(kind) = leaf {
            let node = SchemaNode::new(SchemaKind::Primitive, Some(JsonType::of_leaf(&kind)));
            return (node, leaf_example(&kind));
        }

        if let Some(element) = element {
            let (items, example) = self.visit(&element, depth + 1);
            let mut node = SchemaNode::new(SchemaKind::Array, Some(JsonType::Array));
            node.items = Some(Box::new(items));
            return (node, Value::Array(vec![example]));
        }

        self.active.insert(identity.clone());

        let mut properties = BTreeMap::new();
        let mut required = BTreeSet::new();
        let mut example = Map::new();
        for property in ty.properties() {
            let wire_name = property.wire_name();
            let (mut child, child_example) = self.visit(&property.ty, depth + 1);
            child.description = property.documentation.clone();
            if property.required {
                required.insert(wire_name.clone());
            }
            example.insert(wire_name.clone(), child_example);
            properties.insert(wire_name, child);
        }

        self.active.remove(&identity);

        let mut node = SchemaNode::new(SchemaKind::Object, Some(JsonType::Object));
        node.properties = Some(properties);
        node.required = (!required.is_empty()).then_some(required);
        (node, Value::Object(example))
    }
}

/// Representative literal for a leaf kind
fn leaf_example(kind: &LeafKind) -> Value {
    match kind {
        LeafKind::String => json!("string"),
        LeafKind::Integer => json!(123),
        LeafKind::Number => json!(123.45),
        LeafKind::Boolean => json!(true),
        LeafKind::Date => json!(Utc::now().format("%Y-%m-%d").to_string()),
        LeafKind::DateTime => json!(Utc::now().format("%Y-%m-%dT%H:%M:%S%.3fZ").to_string()),
        LeafKind::Guid => json!(uuid::Uuid::new_v4().to_string()),
        LeafKind::Enum(members) => match members.first() {
            Some(first) => json!(first),
            None => json!(EMPTY_ENUM_EXAMPLE),
        },
    }
}

/// Render an example value with stable two-space indentation
pub fn render_example(value: &Value) -> String {
    serde_json::to_string_pretty(value).unwrap_or_else(|_| value.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::ParsedFile;
    use crate::type_table::{TypeExpr, TypeTable};
    use pretty_assertions::assert_eq;
    use std::path::PathBuf;

    fn table_from_code(code: &str) -> TypeTable {
        let syntax_tree = syn::parse_file(code).expect("Failed to parse test code");
        TypeTable::new(&[ParsedFile {
            path: PathBuf::from("test.rs"),
            syntax_tree,
        }])
    }

    fn expr(code: &str) -> TypeExpr {
        TypeExpr::from_syn(&syn::parse_str::<syn::Type>(code).unwrap())
    }

    fn count_refs(node: &SchemaNode) -> usize {
        let own = usize::from(node.kind == SchemaKind::Ref);
        let props: usize = node
            .properties
            .iter()
            .flat_map(|p| p.values())
            .map(count_refs)
            .sum();
        let items = node.items.as_deref().map(count_refs).unwrap_or(0);
        own + props + items
    }

    /// Every object node's example has exactly its property names
    fn assert_shape_parity(node: &SchemaNode, example: &Value) {
        match node.kind {
            SchemaKind::Object => {
                let Value::Object(map) = example else {
                    assert_eq!(example, &json!(MAX_DEPTH_SENTINEL));
                    return;
                };
                let properties = node.properties.clone().unwrap_or_default();
                let schema_keys: Vec<&String> = properties.keys().collect();
                let mut example_keys: Vec<&String> = map.keys().collect();
                example_keys.sort();
                assert_eq!(schema_keys, example_keys);
                for (key, child) in &properties {
                    assert_shape_parity(child, &map[key]);
                }
            }
            SchemaKind::Array => {
                if let (Some(items), Value::Array(values)) = (&node.items, example) {
                    assert_eq!(values.len(), 1);
                    assert_shape_parity(items, &values[0]);
                }
            }
            SchemaKind::Ref => assert_eq!(example, &Value::Null),
            SchemaKind::Primitive => {}
        }
    }

    #[test]
    fn test_leaf_schemas_and_examples() {
        let table = TypeTable::default();
        let generator = SchemaGenerator::new(4);
        let cases = [
            ("String", JsonType::String, json!("string")),
            ("u64", JsonType::Integer, json!(123)),
            ("f64", JsonType::Number, json!(123.45)),
            ("bool", JsonType::Boolean, json!(true)),
        ];
        for (ty, json_type, example) in cases {
            let node = generator.generate(&table.describe(TypeExpr::new(ty)));
            assert_eq!(node.kind, SchemaKind::Primitive);
            assert_eq!(node.json_type, Some(json_type));
            assert_eq!(node.example, Some(example));
        }
    }

    #[test]
    fn test_date_guid_and_enum_examples() {
        let table = table_from_code("pub enum Color { Red, Green }");
        let generator = SchemaGenerator::new(4);

        let date = generator.generate(&table.describe(TypeExpr::new("NaiveDate")));
        let date = date.example.unwrap();
        let date = date.as_str().unwrap();
        assert!(chrono::NaiveDate::parse_from_str(date, "%Y-%m-%d").is_ok());

        let guid = generator.generate(&table.describe(TypeExpr::new("Uuid")));
        assert_eq!(guid.json_type, Some(JsonType::String));
        assert!(uuid::Uuid::parse_str(guid.example.unwrap().as_str().unwrap()).is_ok());

        let color = generator.generate(&table.describe(TypeExpr::new("Color")));
        assert_eq!(color.json_type, Some(JsonType::String));
        assert_eq!(color.example, Some(json!("Red")));
    }

    #[test]
    fn test_object_properties_required_and_docs() {
        let code = r#"
            #[serde(rename_all = "camelCase")]
            pub struct CreateUser {
                /// Login name
                pub user_name: String,
                pub age: Option<u32>,
                pub tags: Vec<String>,
            }
        "#;
        let table = table_from_code(code);
        let generator = SchemaGenerator::new(4);
        let node = generator.generate(&table.describe(TypeExpr::new("CreateUser")));

        assert_eq!(node.kind, SchemaKind::Object);
        let properties = node.properties.as_ref().unwrap();
        let names: Vec<&str> = properties.keys().map(String::as_str).collect();
        assert_eq!(names, vec!["age", "tags", "userName"]);
        assert_eq!(
            properties["userName"].description.as_deref(),
            Some("Login name")
        );
        assert_eq!(properties["tags"].kind, SchemaKind::Array);
        assert_eq!(
            node.required,
            Some(BTreeSet::from(["userName".to_string(), "tags".to_string()]))
        );
        assert_eq!(
            node.example,
            Some(json!({ "userName": "string", "age": 123, "tags": ["string"] }))
        );
        // Nested nodes never carry their own example
        assert!(properties.values().all(|p| p.example.is_none()));
    }

    #[test]
    fn test_array_of_objects() {
        let table = table_from_code("pub struct Item { pub sku: String }");
        let generator = SchemaGenerator::new(4);
        let (node, example) = generator.generate_with_example(&table.describe(expr("Vec<Item>")));

        assert_eq!(node.kind, SchemaKind::Array);
        assert_eq!(node.items.as_ref().unwrap().kind, SchemaKind::Object);
        assert_eq!(example, json!([{ "sku": "string" }]));
    }

    #[test]
    fn test_self_reference_terminates_with_one_ref() {
        let code = r#"
            pub struct Category {
                pub name: String,
                pub parent: Option<Box<Category>>,
            }
        "#;
        let table = table_from_code(code);
        let generator = SchemaGenerator::new(4);
        let (node, example) = generator.generate_with_example(&table.describe(TypeExpr::new("Category")));

        assert_eq!(count_refs(&node), 1);
        let parent = &node.properties.as_ref().unwrap()["parent"];
        assert_eq!(parent.kind, SchemaKind::Ref);
        assert_eq!(parent.ref_name.as_deref(), Some("Category"));
        assert_eq!(example, json!({ "name": "string", "parent": null }));
    }

    #[test]
    fn test_indirect_cycle() {
        let code = r#"
            pub struct Author { pub books: Vec<Book> }
            pub struct Book { pub author: Author }
        "#;
        let table = table_from_code(code);
        let generator = SchemaGenerator::new(10);
        let (node, example) = generator.generate_with_example(&table.describe(TypeExpr::new("Author")));

        assert_eq!(count_refs(&node), 1);
        assert_eq!(example, json!({ "books": [{ "author": null }] }));
    }

    #[test]
    fn test_depth_bound_with_ten_levels() {
        let mut code = String::new();
        for level in 1..10 {
            code.push_str(&format!(
                "pub struct Level{} {{ pub next: Level{} }}\n",
                level,
                level + 1
            ));
        }
        code.push_str("pub struct Level10 { pub value: u32 }\n");

        let table = table_from_code(&code);
        let generator = SchemaGenerator::new(4);
        let (node, example) = generator.generate_with_example(&table.describe(TypeExpr::new("Level1")));

        assert_eq!(
            example,
            json!({ "next": { "next": { "next": { "next": "max-depth" } } } })
        );

        // The truncated branch keeps its object shape without children
        let mut current = &node;
        for _ in 0..4 {
            current = &current.properties.as_ref().unwrap()["next"];
        }
        assert_eq!(current.kind, SchemaKind::Object);
        assert!(current.properties.is_none());
        assert_shape_parity(&node, &example);
    }

    #[test]
    fn test_idempotent_generation() {
        let code = r#"
            pub struct Order {
                pub id: u64,
                pub lines: Vec<Line>,
                pub next: Option<Order>,
            }
            pub struct Line {
                pub quantity: u32,
                pub note: Option<String>,
            }
        "#;
        let table = table_from_code(code);
        let generator = SchemaGenerator::new(4);
        let order = table.describe(TypeExpr::new("Order"));
        assert_eq!(generator.generate(&order), generator.generate(&order));
    }

    #[test]
    fn test_shape_parity_on_generic_page() {
        let code = r#"
            pub struct Page<T> {
                pub items: Vec<T>,
                pub total: u64,
            }
            pub struct User {
                pub id: u32,
                pub friends: Vec<User>,
            }
        "#;
        let table = table_from_code(code);
        let generator = SchemaGenerator::new(4);
        let (node, example) = generator.generate_with_example(&table.describe(expr("Page<User>")));
        assert_shape_parity(&node, &example);
        assert_eq!(
            example,
            json!({ "items": [{ "id": 123, "friends": [null] }], "total": 123 })
        );
    }

    #[test]
    fn test_unknown_type_is_empty_object() {
        let table = TypeTable::default();
        let node = SchemaGenerator::new(4).generate(&table.describe(TypeExpr::new("Opaque")));
        assert_eq!(node.kind, SchemaKind::Object);
        assert_eq!(node.json_type, Some(JsonType::Object));
        assert_eq!(node.example, Some(json!({})));
    }

    #[test]
    fn test_newtype_of_same_named_foreign_type() {
        let code = r#"
            pub struct Url(pub url::Url);
            pub struct Link {
                pub href: Url,
                pub title: String,
            }
        "#;
        let table = table_from_code(code);
        let (node, example) =
            SchemaGenerator::new(4).generate_with_example(&table.describe(TypeExpr::new("Link")));

        let href = &node.properties.as_ref().unwrap()["href"];
        assert_eq!(href.kind, SchemaKind::Object);
        assert_eq!(example, json!({ "href": {}, "title": "string" }));
    }

    #[test]
    fn test_render_example_is_indented() {
        assert_eq!(render_example(&json!({ "a": 1 })), "{\n  \"a\": 1\n}");
    }

    #[test]
    fn test_serialized_node_uses_camel_case() {
        let table = table_from_code("pub struct Node { pub next: Option<Node> }");
        let node = SchemaGenerator::new(4).generate(&table.describe(TypeExpr::new("Node")));
        let value = serde_json::to_value(&node).unwrap();
        assert_eq!(value["jsonType"], json!("object"));
        assert_eq!(value["properties"]["next"]["refName"], json!("Node"));
        assert_eq!(value["properties"]["next"]["kind"], json!("ref"));
    }
}
