use crate::type_descriptor::TypeDescriptor;

/// Label used for absent or undescribable types
pub const UNKNOWN: &str = "Unknown";

/// Short, human-readable label for a type.
///
/// Non-generic types yield their own name; generic types render as
/// `BaseName<Arg1, Arg2>` with each argument resolved recursively. A missing type
/// yields [`UNKNOWN`].
pub fn type_label<T: TypeDescriptor>(ty: Option<&T>) -> String {
    let Some(ty) = ty else {
        return UNKNOWN.to_string();
    };

    let base = ty.base_name();
    if base.is_empty() {
        return UNKNOWN.to_string();
    }

    let args = ty.type_arguments();
    if args.is_empty() {
        return base;
    }

    let rendered: Vec<String> = args.iter().map(|arg| type_label(Some(arg))).collect();
    format!("{}<{}>", base, rendered.join(", "))
}
