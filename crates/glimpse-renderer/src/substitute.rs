use smol_str::SmolStr;

use crate::cache::Artifact;
use crate::view::HostView;

/// Put `artifact` into the live placeholder `id`.
///
/// Returns whether a node was found. A missing node means the resolution
/// belongs to a pass that has since been replaced; that is expected and
/// not an error.
pub fn substitute<V: HostView + ?Sized>(
    view: &mut V,
    id: &SmolStr,
    artifact: Artifact,
    display_mode: bool,
) -> bool {
    match view.placeholder_mut(id) {
        Some(node) => {
            node.resolve(artifact, display_mode);
            tracing::trace!(target: "glimpse::resolve", id = %id, "substituted artifact");
            true
        }
        None => {
            tracing::debug!(
                target: "glimpse::resolve",
                id = %id,
                "placeholder gone, dropping artifact"
            );
            false
        }
    }
}
