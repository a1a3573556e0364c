use surge_state::{Deployment, Image, ImageSpec, Revision};

use super::deployment::USER_CONTAINER_NAME;
use super::{child_meta, names};

/// Image-cache descriptor for the user container of `deployment`.
///
/// Takes the rendered deployment so the cached image always matches the
/// one the pods will pull.
pub fn make_image_cache(rev: &Revision, deployment: &Deployment) -> Image {
    let template = &deployment.spec.template;
    let image = template
        .containers
        .iter()
        .find(|c| c.name == USER_CONTAINER_NAME)
        .map(|c| c.image.clone())
        .unwrap_or_else(|| rev.spec.image.clone());

    Image {
        meta: child_meta(rev, names::image_cache(rev)),
        spec: ImageSpec {
            image,
            service_account_name: template.service_account_name.clone(),
        },
    }
}
