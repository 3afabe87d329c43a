//! Statically typed topic handles.

use std::any::TypeId;
use std::marker::PhantomData;

/// A topic name paired with the payload type published on it. Cheap to
/// copy; modules typically keep one `static` or `const`-initialized
/// `Topic<T>` per topic rather than constructing one per call.
#[derive(Debug, Clone, Copy)]
pub struct Topic<T> {
    name: &'static str,
    _payload: PhantomData<fn() -> T>,
}

impl<T> Topic<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _payload: PhantomData,
        }
    }

    pub fn name(&self) -> &'static str {
        self.name
    }
}

/// Object-safe view of a [`Topic<T>`], letting [`crate::Hub::subscribe_many`]
/// accept topics of differing payload types in a single call.
pub trait AnyTopic {
    fn name(&self) -> &'static str;
    fn payload_type_id(&self) -> TypeId;
}

impl<T: 'static> AnyTopic for Topic<T> {
    fn name(&self) -> &'static str {
        Topic::name(self)
    }

    fn payload_type_id(&self) -> TypeId {
        TypeId::of::<T>()
    }
}
