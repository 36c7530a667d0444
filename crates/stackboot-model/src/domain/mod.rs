mod image_spec;
pub use image_spec::ImageSpec;

mod image_status;
pub use image_status::ImageStatus;

mod image;
pub use image::{Image, ImageHandle};

mod image_set;
pub use image_set::{DesiredImageSet, ResolvedImageSet};

mod container;
pub use container::{CONTAINER_READ_HEADER, ContainerTarget, PUBLIC_READ_ACL};

mod cleanup;
pub use cleanup::CleanupFlags;

/// Logical release label (e.g. `trusty`) identifying which image a metadata entry describes.
pub type Series = String;
