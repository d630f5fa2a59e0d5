//! CSS-style classification tags for drawn elements.

use bimdraw_ir::Element;

/// Reduce free text to a token safe for CSS classes and file names.
///
/// Only ASCII letters and digits survive; case is preserved.
pub fn canonicalise(text: &str) -> String {
    text.chars().filter(char::is_ascii_alphanumeric).collect()
}

/// Canonical material token, `None` without a material.
///
/// Unnamed materials yield `"null"`.
pub fn material_token(element: &Element) -> Option<String> {
    element.material_name().map(|name| match name {
        "null" => "null".to_string(),
        other => canonicalise(other),
    })
}

/// `<key>-<value>` tags for every metadata key with a non-empty value.
pub fn metadata_tags(element: &Element, keys: &[String]) -> Vec<String> {
    keys.iter()
        .filter_map(|key| {
            let value = element.value(key)?;
            if value.is_empty() {
                return None;
            }
            Some(format!("{}-{}", canonicalise(key), canonicalise(value)))
        })
        .collect()
}

/// Classification tags for one fragment: the kind, the material, then metadata.
pub fn classes(kind: &str, element: &Element, metadata_keys: &[String]) -> Vec<String> {
    let mut classes = vec![kind.to_string()];
    if let Some(token) = material_token(element) {
        classes.push(format!("material-{token}"));
    }
    classes.extend(metadata_tags(element, metadata_keys));
    classes
}

/// Metadata keys listed on the camera (`<pset>.Metadata`, comma separated),
/// or `defaults` when the camera lists none.
pub fn drawing_metadata_keys(camera: Option<&Element>, pset: &str, defaults: &[String]) -> Vec<String> {
    let listed: Vec<String> = camera
        .and_then(|c| c.pset_value(pset, "Metadata"))
        .map(|raw| {
            raw.split(',')
                .map(str::trim)
                .filter(|k| !k.is_empty())
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default();
    if listed.is_empty() {
        defaults.to_vec()
    } else {
        listed
    }
}
