use scraper::{ElementRef, Html};

/// 只保留 TAB/LF/CR 與可列印 ASCII，其餘位元組換成空白。
/// EDGAR 的 full submission 常混有 uuencode 區塊與控制字元，先清掉再交給 HTML parser。
pub fn sanitize_markup(raw: &[u8]) -> String {
    raw.iter()
        .map(|&b| match b {
            0x09 | 0x0A | 0x0D | 0x20..=0x7E => b as char,
            _ => ' ',
        })
        .collect()
}

pub fn parse_document(raw: &str) -> Html {
    Html::parse_document(&sanitize_markup(raw.as_bytes()))
}

pub(crate) const HIDDEN_TAGS: [&str; 5] = ["script", "style", "nav", "header", "footer"];

/// 收集可見文字 (略過 script/style/nav/header/footer 子樹)，以 `separator` 串接
pub fn visible_text(element: ElementRef<'_>, separator: &str) -> String {
    let mut pieces = Vec::new();
    collect_text(element, &mut pieces);
    pieces.join(separator)
}

fn collect_text(element: ElementRef<'_>, pieces: &mut Vec<String>) {
    for child in element.children() {
        if let Some(child_element) = ElementRef::wrap(child) {
            if !HIDDEN_TAGS.contains(&child_element.value().name()) {
                collect_text(child_element, pieces);
            }
        } else if let Some(text) = child.value().as_text() {
            let text: &str = text;
            pieces.push(text.to_owned());
        }
    }
}

/// 每段文字先 trim、丟掉空段，再以 `separator` 串接
pub fn stripped_text(element: ElementRef<'_>, separator: &str) -> String {
    element
        .text()
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .collect::<Vec<_>>()
        .join(separator)
}
