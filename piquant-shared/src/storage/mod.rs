/// Filesystem-backed storage
///
/// # Modules
///
/// - [`images`]: lifecycle of the image files backing item records

pub mod images;
