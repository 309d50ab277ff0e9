//! Type-erased composite instances.

use std::any::Any;
use std::fmt;

/// A composite value held behind a trait object.
///
/// Every `Clone + PartialEq + Debug` type that is `Send + Sync` is an
/// object; the blanket implementation supplies the erased clone, equality
/// and downcasting hooks used by descriptors and the codec.
pub trait Object: Any + Send + Sync + fmt::Debug {
    /// Borrows the value as [`Any`] for downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutably borrows the value as [`Any`] for downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;

    /// Converts the boxed value into a boxed [`Any`].
    fn into_any(self: Box<Self>) -> Box<dyn Any>;

    /// Clones the value behind a fresh box.
    fn clone_object(&self) -> Box<dyn Object>;

    /// Structural equality against another erased object.
    fn eq_object(&self, other: &dyn Object) -> bool;
}

impl<T> Object for T
where
    T: Any + Send + Sync + fmt::Debug + Clone + PartialEq,
{
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }

    fn into_any(self: Box<Self>) -> Box<dyn Any> {
        self
    }

    fn clone_object(&self) -> Box<dyn Object> {
        Box::new(self.clone())
    }

    fn eq_object(&self, other: &dyn Object) -> bool {
        other
            .as_any()
            .downcast_ref::<T>()
            .is_some_and(|other| self == other)
    }
}

/// Owned composite instance carried inside [`crate::Native::Object`].
pub struct ObjectBox(Box<dyn Object>);

impl ObjectBox {
    /// Boxes a concrete composite value.
    pub fn new<T: Object>(value: T) -> Self {
        Self(Box::new(value))
    }

    /// Wraps an already boxed object.
    #[must_use]
    pub fn from_boxed(value: Box<dyn Object>) -> Self {
        Self(value)
    }

    /// Borrows the erased object.
    #[must_use]
    pub fn as_object(&self) -> &dyn Object {
        self.0.as_ref()
    }

    /// Mutably borrows the erased object.
    pub fn as_object_mut(&mut self) -> &mut dyn Object {
        self.0.as_mut()
    }

    /// Recovers the concrete value, or `None` when the type does not match.
    #[must_use]
    pub fn downcast<T: Object>(self) -> Option<T> {
        self.0.into_any().downcast::<T>().ok().map(|value| *value)
    }
}

impl Clone for ObjectBox {
    fn clone(&self) -> Self {
        Self(self.0.clone_object())
    }
}

impl PartialEq for ObjectBox {
    fn eq(&self, other: &Self) -> bool {
        self.0.eq_object(other.0.as_ref())
    }
}

impl fmt::Debug for ObjectBox {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Debug::fmt(&self.0, formatter)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq, Default)]
    struct Point {
        x: i32,
        y: i32,
    }

    #[test]
    fn downcast_recovers_the_concrete_value() {
        let boxed = ObjectBox::new(Point { x: 1, y: 2 });
        let point: Point = boxed.downcast().expect("point");
        assert_eq!(point, Point { x: 1, y: 2 });
    }

    #[test]
    fn downcast_to_the_wrong_type_yields_nothing() {
        let boxed = ObjectBox::new(Point::default());
        assert!(boxed.downcast::<String>().is_none());
    }

    #[test]
    fn equality_compares_structurally() {
        assert_eq!(ObjectBox::new(Point { x: 1, y: 0 }), ObjectBox::new(Point { x: 1, y: 0 }));
        assert_ne!(ObjectBox::new(Point { x: 1, y: 0 }), ObjectBox::new(Point { x: 0, y: 0 }));
        assert_ne!(ObjectBox::new(Point::default()), ObjectBox::new(String::new()));
    }
}
