//! Folder-tree navigation fragments rebuilt from the manifest.
//!
//! Index pages are minimal, fixed-shape HTML: the root fragment lists top
//! folders with page counts, each folder fragment lists its subfolders and
//! pages. No template engine is involved.

use crate::manifest::{Manifest, ManifestPage};
use std::collections::BTreeMap;

/// One rendered navigation fragment.
#[derive(Debug, Clone, PartialEq)]
pub struct IndexPage {
    /// Route the fragment is served under, e.g. `/docs/guide/index`.
    pub route: String,
    pub html: String,
}

#[derive(Debug, Default)]
struct FolderNode<'a> {
    pages: Vec<&'a ManifestPage>,
    children: BTreeMap<String, FolderNode<'a>>,
}

impl<'a> FolderNode<'a> {
    /// Pages at or below this folder.
    fn page_count(&self) -> usize {
        self.pages.len() + self.children.values().map(FolderNode::page_count).sum::<usize>()
    }
}

/// Rebuild every navigation fragment for a manifest: one root index plus one
/// per folder appearing in any page route.
pub fn render_site_indexes(manifest: &Manifest) -> Vec<IndexPage> {
    let root = build_tree(&manifest.pages);
    let mut out = Vec::new();

    out.push(IndexPage {
        route: "/index".to_string(),
        html: render_folder(&root, ""),
    });
    walk(&root, "", &mut out);
    out
}

fn build_tree<'a>(pages: &'a [ManifestPage]) -> FolderNode<'a> {
    let mut root = FolderNode::default();
    for page in pages {
        let segments: Vec<&str> = page.route.split('/').filter(|s| !s.is_empty()).collect();
        let mut node = &mut root;
        // The final segment is the page slug; everything before it is a folder.
        for segment in segments.iter().take(segments.len().saturating_sub(1)) {
            node = node.children.entry((*segment).to_string()).or_default();
        }
        node.pages.push(page);
    }
    root
}

fn walk<'a>(node: &FolderNode<'a>, path: &str, out: &mut Vec<IndexPage>) {
    for (name, child) in &node.children {
        let child_path = format!("{path}/{name}");
        out.push(IndexPage {
            route: format!("{child_path}/index"),
            html: render_folder(child, &child_path),
        });
        walk(child, &child_path, out);
    }
}

/// Render one folder's fragment: subfolders first, then pages, each list
/// alphabetically sorted, case-insensitive.
fn render_folder(node: &FolderNode<'_>, path: &str) -> String {
    let mut html = String::from("<ul class=\"site-index\">\n");

    let mut folders: Vec<(&String, &FolderNode<'_>)> = node.children.iter().collect();
    folders.sort_by_key(|(name, _)| name.to_lowercase());
    for (name, child) in folders {
        html.push_str(&format!(
            "<li><a href=\"{path}/{name}/index\">{} ({})</a></li>\n",
            escape_html(name),
            child.page_count()
        ));
    }

    let mut pages: Vec<&&ManifestPage> = node.pages.iter().collect();
    pages.sort_by_key(|page| page.title.to_lowercase());
    for page in pages {
        html.push_str(&format!(
            "<li><a href=\"{}\">{}</a></li>\n",
            page.route,
            escape_html(&page.title)
        ));
    }

    html.push_str("</ul>\n");
    html
}

fn escape_html(input: &str) -> String {
    input
        .replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
        .replace('"', "&quot;")
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{TimeZone, Utc};
    use mica_types::{NoteId, SessionId};

    fn page(id: &str, title: &str, route: &str) -> ManifestPage {
        ManifestPage {
            id: NoteId::new(id),
            title: title.to_string(),
            slug: route.rsplit('/').next().unwrap_or_default().to_string(),
            route: route.to_string(),
            description: None,
            published_at: Utc.timestamp_opt(0, 0).single().unwrap(),
            vault_path: None,
            relative_path: None,
            tags: None,
        }
    }

    fn manifest(pages: Vec<ManifestPage>) -> Manifest {
        let now = Utc.timestamp_opt(0, 0).single().unwrap();
        Manifest::merge(None, &SessionId::new("s"), pages, now)
    }

    #[test]
    fn test_root_lists_top_folders_with_counts() {
        let manifest = manifest(vec![
            page("a", "A", "/docs/guide/a"),
            page("b", "B", "/docs/b"),
            page("c", "C", "/blog/c"),
        ]);
        let indexes = render_site_indexes(&manifest);
        let root = &indexes[0];
        assert_eq!(root.route, "/index");
        assert!(root.html.contains("<a href=\"/blog/index\">blog (1)</a>"));
        assert!(root.html.contains("<a href=\"/docs/index\">docs (2)</a>"));
    }

    #[test]
    fn test_folder_fragment_lists_subfolders_and_pages() {
        let manifest = manifest(vec![
            page("a", "Alpha", "/docs/guide/a"),
            page("b", "Beta", "/docs/b"),
        ]);
        let indexes = render_site_indexes(&manifest);
        let docs = indexes.iter().find(|i| i.route == "/docs/index").unwrap();
        assert!(docs.html.contains("<a href=\"/docs/guide/index\">guide (1)</a>"));
        assert!(docs.html.contains("<a href=\"/docs/b\">Beta</a>"));

        let guide = indexes.iter().find(|i| i.route == "/docs/guide/index").unwrap();
        assert!(guide.html.contains("<a href=\"/docs/guide/a\">Alpha</a>"));
    }

    #[test]
    fn test_sorting_is_case_insensitive() {
        let manifest = manifest(vec![
            page("a", "banana", "/f/a"),
            page("b", "Apple", "/f/b"),
            page("c", "cherry", "/f/c"),
        ]);
        let indexes = render_site_indexes(&manifest);
        let folder = indexes.iter().find(|i| i.route == "/f/index").unwrap();
        let apple = folder.html.find("Apple").unwrap();
        let banana = folder.html.find("banana").unwrap();
        let cherry = folder.html.find("cherry").unwrap();
        assert!(apple < banana && banana < cherry);
    }

    #[test]
    fn test_titles_are_escaped() {
        let manifest = manifest(vec![page("a", "Q & A <fast>", "/f/a")]);
        let indexes = render_site_indexes(&manifest);
        let folder = indexes.iter().find(|i| i.route == "/f/index").unwrap();
        assert!(folder.html.contains("Q &amp; A &lt;fast&gt;"));
    }

    #[test]
    fn test_root_level_pages_listed_on_root_index() {
        let manifest = manifest(vec![page("a", "Home", "/home")]);
        let indexes = render_site_indexes(&manifest);
        assert_eq!(indexes.len(), 1);
        assert!(indexes[0].html.contains("<a href=\"/home\">Home</a>"));
    }
}
