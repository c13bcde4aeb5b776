use crate::docs;
use crate::parser::ParsedFile;
use crate::type_descriptor::{LeafKind, PropertyDescriptor, TypeDescriptor};
use crate::type_name;
use log::debug;
use std::collections::{HashMap, HashSet};

/// Wrapper types that are transparent for documentation purposes.
const TRANSPARENT_WRAPPERS: &[&str] = &["Box", "Rc", "Arc", "Cow", "RefCell", "Cell"];

/// Types treated as homogeneous collections of their first generic argument.
const COLLECTIONS: &[&str] = &["Vec", "VecDeque", "LinkedList", "HashSet", "BTreeSet", "IndexSet"];

/// A type expression as written in source, reduced to a name and its generic arguments.
///
/// Paths are reduced to their last segment (`chrono::NaiveDate` becomes `NaiveDate`),
/// references and smart pointers are unwrapped, and slices and arrays are written as `Vec<T>`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct TypeExpr {
    /// The base type name (e.g. "String", "User", "Vec")
    pub name: String,
    /// Generic type arguments in order
    pub args: Vec<TypeExpr>,
}

impl TypeExpr {
    /// Create a non-generic type expression
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            args: Vec::new(),
        }
    }

    /// Create a generic type expression
    pub fn generic(name: impl Into<String>, args: Vec<TypeExpr>) -> Self {
        Self {
            name: name.into(),
            args,
        }
    }

    /// The placeholder for types that cannot be described (e.g. `impl Trait`)
    pub fn unknown() -> Self {
        Self::new(type_name::UNKNOWN)
    }

    /// Whether this is the unknown placeholder
    pub fn is_unknown(&self) -> bool {
        self.name == type_name::UNKNOWN
    }

    /// Create an `Option<T>` expression
    pub fn option(inner: TypeExpr) -> Self {
        Self::generic("Option", vec![inner])
    }

    /// Create a `Vec<T>` expression
    pub fn vec(inner: TypeExpr) -> Self {
        Self::generic("Vec", vec![inner])
    }

    /// Extract a type expression from a `syn::Type`
    pub fn from_syn(ty: &syn::Type) -> Self {
        match ty {
            syn::Type::Path(type_path) => Self::from_path(&type_path.path),
            syn::Type::Reference(reference) => Self::from_syn(&reference.elem),
            syn::Type::Paren(paren) => Self::from_syn(&paren.elem),
            syn::Type::Group(group) => Self::from_syn(&group.elem),
            syn::Type::Slice(slice) => Self::vec(Self::from_syn(&slice.elem)),
            syn::Type::Array(array) => Self::vec(Self::from_syn(&array.elem)),
            syn::Type::Tuple(tuple) if tuple.elems.is_empty() => Self::unknown(),
            syn::Type::Tuple(tuple) => {
                Self::generic("Tuple", tuple.elems.iter().map(Self::from_syn).collect())
            }
            _ => Self::unknown(),
        }
    }

    /// Extract a type expression from a `syn::Path`
    fn from_path(path: &syn::Path) -> Self {
        let Some(segment) = path.segments.last() else {
            return Self::unknown();
        };

        let name = segment.ident.to_string();
        let mut args = Vec::new();
        if let syn::PathArguments::AngleBracketed(angle) = &segment.arguments {
            for arg in &angle.args {
                if let syn::GenericArgument::Type(inner) = arg {
                    args.push(Self::from_syn(inner));
                }
            }
        }

        if TRANSPARENT_WRAPPERS.contains(&name.as_str()) {
            if let Some(inner) = args.into_iter().next() {
                return inner;
            }
            return Self::unknown();
        }

        Self { name, args }
    }

    /// Replace generic parameter names with concrete arguments
    fn substitute(&self, bindings: &HashMap<&str, &TypeExpr>) -> TypeExpr {
        if self.args.is_empty() {
            if let Some(bound) = bindings.get(self.name.as_str()) {
                return (*bound).clone();
            }
        }
        TypeExpr {
            name: self.name.clone(),
            args: self.args.iter().map(|a| a.substitute(bindings)).collect(),
        }
    }
}

/// Serde attributes that affect the wire shape of a field
#[derive(Debug, Clone, Default)]
pub struct SerdeAttributes {
    /// Renamed field name
    pub rename: Option<String>,
    /// Whether the field is skipped during (de)serialization
    pub skip: bool,
    /// Whether the field falls back to a default value when absent
    pub default: bool,
    /// Whether the field's properties are inlined into the parent
    pub flatten: bool,
    /// Container-level rename rule (`rename_all`)
    pub rename_all: Option<String>,
}

/// Named field of a struct
#[derive(Debug, Clone)]
pub struct FieldDef {
    pub name: String,
    pub ty: TypeExpr,
    pub serde: SerdeAttributes,
    pub documentation: Option<String>,
}

/// Struct definition
#[derive(Debug, Clone)]
pub struct StructDef {
    pub name: String,
    /// Generic type parameter names, in declaration order
    pub generics: Vec<String>,
    pub fields: Vec<FieldDef>,
    /// Inner type of a single-field tuple struct
    pub newtype: Option<TypeExpr>,
    pub rename_all: Option<String>,
}

/// Enum definition
#[derive(Debug, Clone)]
pub struct EnumDef {
    pub name: String,
    pub variants: Vec<String>,
}

/// Every struct and enum declared in the scanned project, indexed by name.
///
/// The table is immutable once built; [`SourceType`] handles borrow it to answer
/// [`TypeDescriptor`] queries.
#[derive(Debug, Default)]
pub struct TypeTable {
    structs: HashMap<String, StructDef>,
    enums: HashMap<String, EnumDef>,
}

impl TypeTable {
    /// Index all struct and enum definitions found in the parsed files, including those
    /// declared inside inline modules.
    pub fn new(parsed_files: &[ParsedFile]) -> Self {
        let mut table = Self::default();
        for parsed_file in parsed_files {
            table.index_items(&parsed_file.syntax_tree.items);
        }
        debug!(
            "Indexed {} structs and {} enums",
            table.structs.len(),
            table.enums.len()
        );
        table
    }

    fn index_items(&mut self, items: &[syn::Item]) {
        for item in items {
            match item {
                syn::Item::Struct(item_struct) => {
                    let def = Self::parse_struct_definition(item_struct);
                    self.structs.insert(def.name.clone(), def);
                }
                syn::Item::Enum(item_enum) => {
                    let def = Self::parse_enum_definition(item_enum);
                    self.enums.insert(def.name.clone(), def);
                }
                syn::Item::Mod(item_mod) => {
                    if let Some((_, items)) = &item_mod.content {
                        self.index_items(items);
                    }
                }
                _ => {}
            }
        }
    }

    /// Look up a struct definition by name
    pub fn find_struct(&self, name: &str) -> Option<&StructDef> {
        self.structs.get(name)
    }

    /// Look up an enum definition by name
    pub fn find_enum(&self, name: &str) -> Option<&EnumDef> {
        self.enums.get(name)
    }

    /// Bind a type expression to this table, producing a [`TypeDescriptor`]
    pub fn describe(&self, expr: TypeExpr) -> SourceType<'_> {
        SourceType { expr, table: self }
    }

    fn parse_struct_definition(item_struct: &syn::ItemStruct) -> StructDef {
        let name = item_struct.ident.to_string();
        debug!("Parsing struct definition: {}", name);

        let generics = item_struct
            .generics
            .type_params()
            .map(|p| p.ident.to_string())
            .collect();
        let container = parse_serde_attributes(&item_struct.attrs);

        let mut fields = Vec::new();
        let mut newtype = None;
        match &item_struct.fields {
            syn::Fields::Named(named) => {
                for field in &named.named {
                    let Some(ident) = &field.ident else { continue };
                    fields.push(FieldDef {
                        name: ident.to_string(),
                        ty: TypeExpr::from_syn(&field.ty),
                        serde: parse_serde_attributes(&field.attrs),
                        documentation: docs::doc_text(&field.attrs),
                    });
                }
            }
            syn::Fields::Unnamed(unnamed) if unnamed.unnamed.len() == 1 => {
                newtype = unnamed.unnamed.first().map(|f| TypeExpr::from_syn(&f.ty));
            }
            _ => {}
        }

        StructDef {
            name,
            generics,
            fields,
            newtype,
            rename_all: container.rename_all,
        }
    }

    fn parse_enum_definition(item_enum: &syn::ItemEnum) -> EnumDef {
        EnumDef {
            name: item_enum.ident.to_string(),
            variants: item_enum.variants.iter().map(|v| v.ident.to_string()).collect(),
        }
    }
}

/// Parse serde attributes on a field or container
fn parse_serde_attributes(attrs: &[syn::Attribute]) -> SerdeAttributes {
    let mut serde_attrs = SerdeAttributes::default();

    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        let parsed = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") {
                if meta.input.peek(syn::Token![=]) {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    serde_attrs.rename = Some(value.value());
                } else {
                    // rename(serialize = "..", deserialize = "..")
                    meta.parse_nested_meta(|inner| {
                        let value: syn::LitStr = inner.value()?.parse()?;
                        if inner.path.is_ident("serialize") || serde_attrs.rename.is_none() {
                            serde_attrs.rename = Some(value.value());
                        }
                        Ok(())
                    })?;
                }
            } else if meta.path.is_ident("rename_all") {
                if meta.input.peek(syn::Token![=]) {
                    let value: syn::LitStr = meta.value()?.parse()?;
                    serde_attrs.rename_all = Some(value.value());
                } else {
                    meta.parse_nested_meta(skip_meta)?;
                }
            } else if meta.path.is_ident("skip")
                || meta.path.is_ident("skip_serializing")
                || meta.path.is_ident("skip_deserializing")
            {
                serde_attrs.skip = true;
            } else if meta.path.is_ident("default") {
                serde_attrs.default = true;
                skip_meta(meta)?;
            } else if meta.path.is_ident("flatten") {
                serde_attrs.flatten = true;
            } else {
                skip_meta(meta)?;
            }
            Ok(())
        });

        if let Err(e) = parsed {
            debug!("Ignoring unparsable serde attribute: {}", e);
        }
    }

    serde_attrs
}

/// Consume a nested meta item we do not care about
fn skip_meta(meta: syn::meta::ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(syn::Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(skip_meta)?;
    }
    Ok(())
}

/// Apply a serde `rename_all` rule to a snake_case field name
fn apply_rename_rule(rule: &str, name: &str) -> Option<String> {
    let words: Vec<&str> = name.split('_').filter(|w| !w.is_empty()).collect();
    let capitalize = |w: &str| {
        let mut chars = w.chars();
        match chars.next() {
            Some(first) => first.to_uppercase().chain(chars).collect::<String>(),
            None => String::new(),
        }
    };

    let renamed = match rule {
        "lowercase" => name.to_lowercase(),
        "UPPERCASE" => name.to_uppercase(),
        "snake_case" => name.to_string(),
        "SCREAMING_SNAKE_CASE" => name.to_uppercase(),
        "kebab-case" => name.replace('_', "-"),
        "SCREAMING-KEBAB-CASE" => name.replace('_', "-").to_uppercase(),
        "PascalCase" => words.iter().map(|w| capitalize(w)).collect(),
        "camelCase" => words
            .iter()
            .enumerate()
            .map(|(i, w)| if i == 0 { w.to_string() } else { capitalize(w) })
            .collect(),
        _ => return None,
    };
    Some(renamed)
}

/// Map a builtin type name to its leaf kind
fn builtin_leaf_kind(name: &str) -> Option<LeafKind> {
    match name {
        "i8" | "i16" | "i32" | "i64" | "i128" | "isize" | "u8" | "u16" | "u32" | "u64"
        | "u128" | "usize" | "NonZeroU32" | "NonZeroU64" | "NonZeroI32" | "NonZeroI64" => {
            Some(LeafKind::Integer)
        }
        "f32" | "f64" | "Decimal" | "BigDecimal" => Some(LeafKind::Number),
        "bool" => Some(LeafKind::Boolean),
        "String" | "str" | "char" => Some(LeafKind::String),
        "NaiveDate" | "Date" => Some(LeafKind::Date),
        "DateTime" | "NaiveDateTime" | "OffsetDateTime" | "PrimitiveDateTime" | "SystemTime" => {
            Some(LeafKind::DateTime)
        }
        "Uuid" => Some(LeafKind::Guid),
        _ => None,
    }
}

/// A [`TypeExpr`] bound to the [`TypeTable`] it was declared in.
#[derive(Debug, Clone)]
pub struct SourceType<'a> {
    expr: TypeExpr,
    table: &'a TypeTable,
}

impl<'a> SourceType<'a> {
    /// The underlying type expression
    pub fn expr(&self) -> &TypeExpr {
        &self.expr
    }

    fn with(&self, expr: TypeExpr) -> Self {
        Self {
            expr,
            table: self.table,
        }
    }

    /// Follow single-field tuple structs to the type they finally wrap.
    ///
    /// A chain that comes back to a name already seen (`struct Url(url::Url)` reduces to
    /// `Url` wrapping itself) resolves to nothing.
    fn resolve_newtype(&self) -> Option<Self> {
        let mut seen = HashSet::new();
        let mut current = &self.expr;
        while let Some(inner) = self
            .table
            .find_struct(&current.name)
            .and_then(|def| def.newtype.as_ref())
        {
            if !seen.insert(current.name.as_str()) {
                debug!("Newtype cycle through {}", current.name);
                return None;
            }
            current = inner;
        }
        (current != &self.expr).then(|| self.with(current.clone()))
    }

    fn collect_properties(&self, depth: usize, out: &mut Vec<PropertyDescriptor<Self>>) {
        let Some(def) = self.table.find_struct(&self.expr.name) else {
            return;
        };

        let bindings: HashMap<&str, &TypeExpr> = def
            .generics
            .iter()
            .map(String::as_str)
            .zip(self.expr.args.iter())
            .collect();

        for field in &def.fields {
            if field.serde.skip {
                continue;
            }

            let ty = self.with(field.ty.substitute(&bindings));

            // Flattened fields contribute their own properties, one level deep
            if field.serde.flatten && depth == 0 {
                ty.collect_properties(depth + 1, out);
                continue;
            }

            let rename = field.serde.rename.clone().or_else(|| {
                def.rename_all
                    .as_deref()
                    .and_then(|rule| apply_rename_rule(rule, &field.name))
            });
            let required = !field.serde.default && field.ty.name != "Option";

            out.push(PropertyDescriptor {
                name: field.name.clone(),
                rename,
                ty,
                required,
                documentation: field.documentation.clone(),
            });
        }
    }
}

impl<'a> TypeDescriptor for SourceType<'a> {
    fn identity(&self) -> String {
        type_name::type_label(Some(self))
    }

    fn base_name(&self) -> String {
        self.expr.name.clone()
    }

    fn type_arguments(&self) -> Vec<Self> {
        self.expr.args.iter().map(|a| self.with(a.clone())).collect()
    }

    fn leaf_kind(&self) -> Option<LeafKind> {
        if let Some(kind) = builtin_leaf_kind(&self.expr.name) {
            return Some(kind);
        }
        if let Some(def) = self.table.find_enum(&self.expr.name) {
            return Some(LeafKind::Enum(def.variants.clone()));
        }
        self.resolve_newtype().and_then(|inner| inner.leaf_kind())
    }

    fn element_type(&self) -> Option<Self> {
        if COLLECTIONS.contains(&self.expr.name.as_str()) {
            return self.expr.args.first().map(|a| self.with(a.clone()));
        }
        self.resolve_newtype().and_then(|inner| inner.element_type())
    }

    fn nullable_inner(&self) -> Option<Self> {
        if self.expr.name == "Option" {
            return self.expr.args.first().map(|a| self.with(a.clone()));
        }
        None
    }

    fn properties(&self) -> Vec<PropertyDescriptor<Self>> {
        let mut properties = Vec::new();
        self.collect_properties(0, &mut properties);
        properties
    }
}
