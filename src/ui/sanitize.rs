use std::collections::{HashMap, HashSet};

use ammonia::Builder;

/// Allow-list pass over rendered list fragments. Only the markup the list
/// templates produce survives; event handler attributes and script URLs do
/// not.
pub fn sanitize_fragment(html: &str) -> String {
    let tags: HashSet<&str> = ["li", "ul", "div", "p", "a", "button", "img", "span", "abbr"]
        .iter()
        .copied()
        .collect();

    let mut tag_attributes: HashMap<&str, HashSet<&str>> = HashMap::new();
    tag_attributes.insert("a", ["href", "target"].iter().copied().collect());
    tag_attributes.insert("img", ["src", "alt"].iter().copied().collect());
    tag_attributes.insert("button", ["type"].iter().copied().collect());
    tag_attributes.insert("abbr", ["title"].iter().copied().collect());

    let generic_attributes: HashSet<&str> = ["class", "aria-label", "aria-pressed"]
        .iter()
        .copied()
        .collect();

    let url_schemes: HashSet<&str> = ["http", "https"].iter().copied().collect();

    Builder::default()
        .tags(tags)
        .tag_attributes(tag_attributes)
        .generic_attributes(generic_attributes)
        .generic_attribute_prefixes(["data-"].iter().copied().collect())
        .link_rel(Some("noopener noreferrer"))
        .url_schemes(url_schemes)
        .clean(html)
        .to_string()
}
