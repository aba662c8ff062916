//! Editor-side application of outbound messages to the content tree.

use serde_json::{json, Value};
use sitecraft_content::{get, push, remove, set, PathResult};

/// Field under a section that holds its replacement markup.
pub const CUSTOM_HTML_FIELD: &str = "customHtml";

/// Store a confirmed text edit. Returns whether the tree changed.
pub fn apply_text_edit(tree: &mut Value, path: &str, new_value: &str) -> PathResult<bool> {
    if get(tree, path).and_then(Value::as_str) == Some(new_value) {
        return Ok(false);
    }
    set(tree, path, Value::String(new_value.to_string()))?;
    Ok(true)
}

/// Point an image path at a new URL.
pub fn set_image(tree: &mut Value, path: &str, url: &str) -> PathResult<()> {
    set(tree, path, Value::String(url.to_string()))
}

/// Append `{src, alt}` to a gallery sequence, creating it when absent.
pub fn append_gallery_item(tree: &mut Value, list: &str, url: &str, alt: &str) -> PathResult<usize> {
    push(tree, list, json!({ "src": url, "alt": alt }))
}

/// Remove a gallery item, matching by filename first and falling back to
/// `index`. Nothing matching is a no-op that returns `Ok(None)`.
pub fn remove_gallery_item(
    tree: &mut Value,
    list: &str,
    index: usize,
    filename: &str,
) -> PathResult<Option<Value>> {
    let Some(Value::Array(items)) = get(tree, list) else {
        tracing::debug!(list, "gallery list absent, nothing to delete");
        return Ok(None);
    };

    let by_name = (!filename.is_empty())
        .then(|| items.iter().position(|item| item_filename(item) == Some(filename)))
        .flatten();

    let position = match by_name {
        Some(position) => position,
        None if index < items.len() => {
            tracing::debug!(filename, index, "no filename match, deleting by index");
            index
        }
        None => {
            tracing::debug!(filename, index, len = items.len(), "delete matched nothing");
            return Ok(None);
        }
    };

    remove(tree, list, position).map(Some)
}

/// Replace a section's markup through its `customHtml` field.
pub fn set_section_html(tree: &mut Value, section_path: &str, html: &str) -> PathResult<()> {
    set(
        tree,
        &format!("{}.{}", section_path, CUSTOM_HTML_FIELD),
        Value::String(html.to_string()),
    )
}

/// Last path segment of an item's source, without query or fragment.
pub fn item_filename(item: &Value) -> Option<&str> {
    let src = match item {
        Value::String(src) => src.as_str(),
        Value::Object(fields) => fields.get("src")?.as_str()?,
        _ => return None,
    };
    filename_of(src)
}

pub fn filename_of(src: &str) -> Option<&str> {
    let path = src.split(['?', '#']).next()?;
    let name = path.rsplit('/').next()?;
    (!name.is_empty()).then_some(name)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gallery() -> Value {
        json!({"portfolio": {"images": [{"src":"a.jpg"},{"src":"b.jpg"},{"src":"c.jpg"}]}})
    }

    #[test]
    fn test_delete_prefers_filename_over_stale_index() {
        let mut tree = gallery();
        let removed = remove_gallery_item(&mut tree, "portfolio.images", 5, "b.jpg").unwrap();
        assert_eq!(removed, Some(json!({"src":"b.jpg"})));
        assert_eq!(
            tree["portfolio"]["images"],
            json!([{"src":"a.jpg"},{"src":"c.jpg"}])
        );
    }

    #[test]
    fn test_delete_falls_back_to_index() {
        let mut tree = gallery();
        remove_gallery_item(&mut tree, "portfolio.images", 0, "gone.jpg").unwrap();
        assert_eq!(tree["portfolio"]["images"][0]["src"], "b.jpg");
    }

    #[test]
    fn test_delete_without_match_is_noop() {
        let mut tree = gallery();
        let removed = remove_gallery_item(&mut tree, "portfolio.images", 9, "gone.jpg").unwrap();
        assert_eq!(removed, None);
        assert_eq!(tree, gallery());

        let mut empty = json!({});
        assert_eq!(remove_gallery_item(&mut empty, "portfolio.images", 0, "a.jpg").unwrap(), None);
    }

    #[test]
    fn test_filename_matches_full_urls() {
        let mut tree = json!({"g": [{"src":"https://cdn.test/img/a.jpg?v=2"}, "/assets/b.jpg"]});
        remove_gallery_item(&mut tree, "g", 0, "b.jpg").unwrap();
        assert_eq!(tree["g"], json!([{"src":"https://cdn.test/img/a.jpg?v=2"}]));
        assert_eq!(filename_of("/dir/"), None);
    }

    #[test]
    fn test_append_creates_list() {
        let mut tree = json!({});
        assert_eq!(append_gallery_item(&mut tree, "portfolio.images", "/x.jpg", "x").unwrap(), 0);
        assert_eq!(append_gallery_item(&mut tree, "portfolio.images", "/y.jpg", "y").unwrap(), 1);
        assert_eq!(tree["portfolio"]["images"][1], json!({"src":"/y.jpg","alt":"y"}));
    }

    #[test]
    fn test_text_and_section_edits() {
        let mut tree = json!({"hero": {"title": "Old"}});
        assert!(apply_text_edit(&mut tree, "hero.title", "New").unwrap());
        assert!(!apply_text_edit(&mut tree, "hero.title", "New").unwrap());
        set_section_html(&mut tree, "about", "<p>x</p>").unwrap();
        assert_eq!(tree["about"]["customHtml"], "<p>x</p>");
        assert!(apply_text_edit(&mut tree, "hero.title[0]", "x").is_err());
    }
}
