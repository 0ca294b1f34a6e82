use crate::any::TypeInfo;

#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum ReflectionErrorKind {
    #[error("Member `{member}` of {type_info} is tagged for injection, but it isn't publicly settable")]
    CannotInjectIntoNonpublicSetter { type_info: TypeInfo, member: &'static str },
    #[error(
        "\
        {type_info} can't be reflected for construction: it declares no constructor. \
        Bind it to a concrete type instead of reflecting it directly\
        "
    )]
    CannotReflectInterface { type_info: TypeInfo },
}
