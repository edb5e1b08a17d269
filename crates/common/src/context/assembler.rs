//! Context assembly - renders the corpus into one bounded prompt section

use crate::db::Article;

/// Render `articles` as `Title/Content/---` blocks joined by newlines, cut to
/// at most `max_chars` characters.
///
/// Articles whose title and content are both blank are skipped. The cut is a
/// plain prefix and may land mid-block; callers rely on exactly this shape.
pub fn assemble_context(articles: &[Article], max_chars: usize) -> String {
    let blocks: Vec<String> = articles
        .iter()
        .filter_map(|article| {
            let title = article.title.trim();
            let content = article.content.trim();
            if title.is_empty() && content.is_empty() {
                return None;
            }
            Some(format!("Title: {}\nContent: {}\n---", title, content))
        })
        .collect();

    let mut full = blocks.join("\n");

    // Cut on a char boundary: max_chars counts characters, not bytes
    if let Some((cut, _)) = full.char_indices().nth(max_chars) {
        full.truncate(cut);
    }

    full
}
