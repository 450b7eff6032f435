//! Image reference → repository path.

/// Tag assumed when a reference carries none.
const DEFAULT_TAG: &str = "latest";

/// Relative repository path of a pushed image.
///
/// `registry:8081/team/app:1.0` becomes `team/app/1.0`: the registry host (up to
/// the first `/`) is dropped and the tag becomes the last path segment. A
/// reference without a tag maps to the `latest` folder.
pub fn image_path(image_tag: &str) -> String {
    let rest = match image_tag.split_once('/') {
        Some((_, rest)) => rest,
        None => image_tag,
    };

    match rest.rfind(':') {
        Some(i) => format!("{}/{}", &rest[..i], &rest[i + 1..]),
        None => format!("{}/{}", rest, DEFAULT_TAG),
    }
}
