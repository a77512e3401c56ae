use std::any::{TypeId, type_name};
use std::fmt;

use crate::{Context, RpcError, ShapeError};

/// Identity of one parameter or return position.
#[derive(Clone, Copy, Debug)]
pub struct TypeSlot {
    id: TypeId,
    name: &'static str,
}

impl TypeSlot {
    pub fn of<T: ?Sized + 'static>() -> Self {
        Self {
            id: TypeId::of::<T>(),
            name: type_name::<T>(),
        }
    }

    pub fn is<T: ?Sized + 'static>(&self) -> bool {
        self.id == TypeId::of::<T>()
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

impl PartialEq for TypeSlot {
    fn eq(&self, other: &Self) -> bool {
        self.id == other.id
    }
}

impl Eq for TypeSlot {}

/// The positional type signature of a callable.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Signature {
    pub params: Vec<TypeSlot>,
    pub returns: Vec<TypeSlot>,
}

impl Signature {
    pub fn new(params: Vec<TypeSlot>, returns: Vec<TypeSlot>) -> Self {
        Self { params, returns }
    }

    pub fn classify(&self) -> Result<SignatureShape, ShapeError> {
        SignatureShape::classify(self)
    }
}

impl fmt::Display for Signature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let params: Vec<_> = self.params.iter().map(TypeSlot::name).collect();
        let returns: Vec<_> = self.returns.iter().map(TypeSlot::name).collect();
        write!(f, "fn({}) -> ({})", params.join(", "), returns.join(", "))
    }
}

/// Roles of a method's positions. Both binders read the same shape, so the
/// client sends exactly what the server decodes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub struct SignatureShape {
    pub has_context: bool,
    pub has_payload: bool,
    pub has_result: bool,
    pub has_error: bool,
}

impl SignatureShape {
    /// Up to two parameters where a [`Context`] may only come first, and up
    /// to two returns where an [`RpcError`] may only come last.
    pub fn classify(sig: &Signature) -> Result<Self, ShapeError> {
        let mut shape = SignatureShape::default();

        match sig.params.as_slice() {
            [] => {}
            [only] => {
                if only.is::<Context>() {
                    shape.has_context = true;
                } else {
                    shape.has_payload = true;
                }
            }
            [first, _] => {
                if !first.is::<Context>() {
                    return Err(ShapeError::ContextNotFirst);
                }
                shape.has_context = true;
                shape.has_payload = true;
            }
            params => return Err(ShapeError::TooManyParams(params.len())),
        }

        match sig.returns.as_slice() {
            [] => {}
            [only] => {
                if only.is::<RpcError>() {
                    shape.has_error = true;
                } else {
                    shape.has_result = true;
                }
            }
            [_, last] => {
                if !last.is::<RpcError>() {
                    return Err(ShapeError::ErrorNotLast);
                }
                shape.has_result = true;
                shape.has_error = true;
            }
            returns => return Err(ShapeError::TooManyReturns(returns.len())),
        }

        Ok(shape)
    }
}
