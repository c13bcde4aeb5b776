//! Capability interface over a host type system.
//!
//! The documentation pipeline never inspects types directly. Everything it needs to know
//! about a parameter, property or return type goes through [`TypeDescriptor`], a small,
//! closed set of queries: is this a leaf value, a collection, a nullable wrapper, and which
//! properties does it expose. The [`crate::type_table`] module backs this interface with
//! types parsed from Rust source; tests and other hosts can supply their own tables.

/// The kind of a leaf (non-composite) value.
///
/// Leaf kinds drive both the JSON type mapping and the synthesized example literal.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafKind {
    /// Integer family (`i8`..`i128`, `u8`..`u128`, `isize`, `usize`)
    Integer,
    /// Floating and decimal family (`f32`, `f64`, `Decimal`)
    Number,
    /// `bool`
    Boolean,
    /// String family (`String`, `str`, `char`)
    String,
    /// Calendar date without time
    Date,
    /// Date with time of day
    DateTime,
    /// Globally unique identifier
    Guid,
    /// Enumeration with its declared member names, in declaration order
    Enum(Vec<String>),
}

/// One readable property of a composite type.
#[derive(Debug, Clone)]
pub struct PropertyDescriptor<T> {
    /// Declared name of the property
    pub name: String,
    /// Explicit wire name (e.g. from a rename annotation)
    pub rename: Option<String>,
    /// Type of the property
    pub ty: T,
    /// Whether the property carries an explicit required marker
    pub required: bool,
    /// Documentation text attached to the property
    pub documentation: Option<String>,
}

impl<T> PropertyDescriptor<T> {
    /// Name used on the wire: the explicit rename if present, otherwise the lower-camel
    /// form of the declared name.
    pub fn wire_name(&self) -> String {
        match &self.rename {
            Some(rename) => rename.clone(),
            None => to_lower_camel(&self.name),
        }
    }
}

/// Queryable handle on a type.
///
/// Implementations are cheap to clone; they are handed out by value for element types,
/// nullable payloads and properties.
pub trait TypeDescriptor: Clone {
    /// Identity of the type, used to detect cycles. Two handles with the same identity
    /// describe the same type.
    fn identity(&self) -> String;

    /// The type's own short name without generic arguments (e.g. `Page` for `Page<User>`).
    fn base_name(&self) -> String;

    /// Generic arguments in declaration order; empty for non-generic types.
    fn type_arguments(&self) -> Vec<Self>;

    /// Leaf classification, or `None` for composite and collection types.
    fn leaf_kind(&self) -> Option<LeafKind>;

    /// Element type when this is a collection.
    fn element_type(&self) -> Option<Self>;

    /// Underlying type when this is a nullable wrapper.
    fn nullable_inner(&self) -> Option<Self>;

    /// Readable properties of a composite type, in declaration order.
    fn properties(&self) -> Vec<PropertyDescriptor<Self>>;

    /// Whether the type is a collection.
    fn is_collection(&self) -> bool {
        self.element_type().is_some()
    }

    /// Whether the type is a nullable wrapper.
    fn is_nullable(&self) -> bool {
        self.nullable_inner().is_some()
    }

    /// Strips any number of nullable wrappers.
    fn unwrap_nullable(&self) -> Self {
        let mut current = self.clone();
        while let Some(inner) = current.nullable_inner() {
            current = inner;
        }
        current
    }
}

/// Lower-cases the first character of `name`, leaving the rest untouched.
pub fn to_lower_camel(name: &str) -> String {
    let mut chars = name.chars();
    match chars.next() {
        Some(first) if first.is_uppercase() => first.to_lowercase().chain(chars).collect(),
        _ => name.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_lower_camel() {
        assert_eq!(to_lower_camel("UserName"), "userName");
        assert_eq!(to_lower_camel("user_name"), "user_name");
        assert_eq!(to_lower_camel("ID"), "iD");
        assert_eq!(to_lower_camel(""), "");
    }

    #[test]
    fn test_wire_name_prefers_rename() {
        let prop = PropertyDescriptor {
            name: "CreatedAt".to_string(),
            rename: Some("created".to_string()),
            ty: (),
            required: false,
            documentation: None,
        };
        assert_eq!(prop.wire_name(), "created");

        let plain = PropertyDescriptor { rename: None, ..prop };
        assert_eq!(plain.wire_name(), "createdAt");
    }
}
