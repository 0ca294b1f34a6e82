/// Error returned by user constructors.
///
/// Constructors registered in [`crate::Descriptor::constructor`] wrap their failures into [`anyhow::Error`],
/// e.g. `Err(anyhow::anyhow!("no connection").into())`.
#[derive(thiserror::Error, Debug)]
pub enum InstantiateErrorKind {
    #[error(transparent)]
    Custom(#[from] anyhow::Error),
}
