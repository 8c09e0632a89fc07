use odb_types::ObjectId;

use crate::object::Object;

/// Anything that can open objects by id.
///
/// Implemented by the in-memory source here and by the repository. The
/// commit graph is generic over this trait, so it can walk either.
pub trait ObjectSource {
    type Error: std::error::Error + Send + Sync + 'static;

    /// Open the object named `id`. A missing object is an error.
    fn open_object(&self, id: &ObjectId) -> Result<Object, Self::Error>;
}

impl<T: ObjectSource + ?Sized> ObjectSource for &T {
    type Error = T::Error;

    fn open_object(&self, id: &ObjectId) -> Result<Object, Self::Error> {
        (**self).open_object(id)
    }
}
