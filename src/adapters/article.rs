use crate::analysis::sanitize::stripped_text;
use scraper::{Html, Selector};
use std::sync::LazyLock;

static OG_TITLE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:title"]"#).unwrap());
static OG_IMAGE: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse(r#"meta[property="og:image"]"#).unwrap());
static TITLE: LazyLock<Selector> = LazyLock::new(|| Selector::parse("title").unwrap());
static H1: LazyLock<Selector> = LazyLock::new(|| Selector::parse("h1").unwrap());
static ARTICLE_PARAGRAPHS: LazyLock<Selector> =
    LazyLock::new(|| Selector::parse("article p").unwrap());
static PARAGRAPHS: LazyLock<Selector> = LazyLock::new(|| Selector::parse("p").unwrap());

/// 新聞頁面擷取結果
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ArticleContent {
    pub title: Option<String>,
    pub text: String,
    pub image: Option<String>,
}

fn meta_content(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .filter_map(|m| m.value().attr("content"))
        .map(str::trim)
        .find(|c| !c.is_empty())
        .map(str::to_string)
}

fn first_text(document: &Html, selector: &Selector) -> Option<String> {
    document
        .select(selector)
        .map(|e| stripped_text(e, " "))
        .find(|t| !t.is_empty())
}

fn paragraphs(document: &Html, selector: &Selector) -> Vec<String> {
    document
        .select(selector)
        .map(|p| stripped_text(p, " "))
        .filter(|t| !t.is_empty())
        .collect()
}

/// 標題：og:title → `<title>` → `<h1>`；內文：`<article>` 內段落，沒有就用全部 `<p>`
pub fn extract_article(html: &str) -> ArticleContent {
    let document = Html::parse_document(html);

    let title = meta_content(&document, &OG_TITLE)
        .or_else(|| first_text(&document, &TITLE))
        .or_else(|| first_text(&document, &H1));

    let mut body = paragraphs(&document, &ARTICLE_PARAGRAPHS);
    if body.is_empty() {
        body = paragraphs(&document, &PARAGRAPHS);
    }

    ArticleContent {
        title,
        text: body.join("\n\n"),
        image: meta_content(&document, &OG_IMAGE),
    }
}
