use std::any::Any;
use std::marker::PhantomData;
use std::sync::Arc;

use super::InvocationError;
use crate::native::{ConversionError, FromNative, Native};
use crate::reflect::{Reflect, TypeRef};

/// A type whose operations are exposed as commands.
pub trait ActionSource: Any + Send + Sized {
    /// Interfaces implemented by the source. Parent interfaces are visited
    /// before their children.
    fn interfaces() -> Vec<Interface<Self>>;
}

/// Typed argument lists accepted by operations.
pub trait Arguments: Sized + 'static {
    /// Parameter types in order.
    fn types() -> Vec<TypeRef>;

    /// Converts decoded values, treating missing trailing values as `null`.
    fn from_natives(values: Vec<Native>) -> Result<Self, ConversionError>;
}

impl Arguments for () {
    fn types() -> Vec<TypeRef> {
        Vec::new()
    }

    fn from_natives(_values: Vec<Native>) -> Result<Self, ConversionError> {
        Ok(())
    }
}

macro_rules! tuple_arguments {
    ($($name:ident),+) => {
        impl<$($name: Reflect + FromNative),+> Arguments for ($($name,)+) {
            fn types() -> Vec<TypeRef> {
                vec![$(<$name as Reflect>::type_ref()),+]
            }

            fn from_natives(values: Vec<Native>) -> Result<Self, ConversionError> {
                let mut values = values.into_iter();
                Ok(($($name::from_native(values.next().unwrap_or(Native::Null))?,)+))
            }
        }
    };
}

tuple_arguments!(A);
tuple_arguments!(A, B);
tuple_arguments!(A, B, C);
tuple_arguments!(A, B, C, D);
tuple_arguments!(A, B, C, D, E);
tuple_arguments!(A, B, C, D, E, F);

pub(crate) type ErasedCall =
    Arc<dyn Fn(&mut dyn Any, Vec<Native>) -> Result<(), InvocationError> + Send + Sync>;

pub(crate) struct Member {
    pub(crate) name: &'static str,
    pub(crate) parameters: Vec<(String, TypeRef)>,
    pub(crate) call: Option<ErasedCall>,
}

/// A named group of operations declared by an [`ActionSource`].
pub struct Interface<T> {
    pub(crate) name: &'static str,
    pub(crate) parents: Vec<Interface<T>>,
    pub(crate) members: Vec<Member>,
    marker: PhantomData<fn(&mut T)>,
}

impl<T: ActionSource> Interface<T> {
    /// Starts an interface declaration.
    #[must_use]
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            parents: Vec::new(),
            members: Vec::new(),
            marker: PhantomData,
        }
    }

    /// Adds a parent interface whose members are inherited.
    #[must_use]
    pub fn extends(mut self, parent: Self) -> Self {
        self.parents.push(parent);
        self
    }

    /// Declares a void operation. Parameter names are taken from `names`;
    /// unnamed parameters are called `argN`.
    #[must_use]
    pub fn operation<A: Arguments>(
        mut self,
        name: &'static str,
        names: &[&str],
        run: fn(&mut T, A) -> Result<(), InvocationError>,
    ) -> Self {
        let call: ErasedCall = Arc::new(move |target: &mut dyn Any, values: Vec<Native>| {
            let target = target
                .downcast_mut::<T>()
                .ok_or(InvocationError::MissingTarget {
                    owner: std::any::type_name::<T>(),
                })?;
            run(target, A::from_natives(values)?)
        });
        self.members.push(Member {
            name,
            parameters: named(names, A::types()),
            call: Some(call),
        });
        self
    }

    /// Declares a member that returns a value. Such members are never
    /// exposed as commands.
    #[must_use]
    pub fn function<A: Arguments, R: Reflect>(mut self, name: &'static str, names: &[&str]) -> Self {
        self.members.push(Member {
            name,
            parameters: named(names, A::types()),
            call: None,
        });
        self
    }
}

fn named(names: &[&str], types: Vec<TypeRef>) -> Vec<(String, TypeRef)> {
    types
        .into_iter()
        .enumerate()
        .map(|(index, type_ref)| {
            let name = names
                .get(index)
                .map_or_else(|| format!("arg{index}"), |name| (*name).to_owned());
            (name, type_ref)
        })
        .collect()
}
