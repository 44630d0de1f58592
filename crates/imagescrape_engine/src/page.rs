use scraper::{Html, Selector};

use crate::session::RenderedImage;

const LAZY_ATTRIBUTES: &[&str] = &["data-src", "data-iurl"];
const META_URL_KEY: &str = "ou";

/// Collect image-bearing elements from a rendered page snapshot:
/// - every `<img>` with its `src` and the first lazy-load attribute present
/// - legacy `div.rg_meta` JSON blocks, whose `ou` key holds the full-size URL.
pub fn parse_rendered_images(html: &str) -> Vec<RenderedImage> {
    let doc = Html::parse_document(html);
    let mut images = Vec::new();

    if let Ok(sel) = Selector::parse("img") {
        for node in doc.select(&sel) {
            let element = node.value();
            let lazy = LAZY_ATTRIBUTES
                .iter()
                .find_map(|name| element.attr(name))
                .map(str::trim)
                .filter(|v| !v.is_empty());
            images.push(RenderedImage::new(element.attr("src").map(str::trim), lazy));
        }
    }

    if let Ok(sel) = Selector::parse("div.rg_meta") {
        for node in doc.select(&sel) {
            let raw = node.text().collect::<String>();
            let url = serde_json::from_str::<serde_json::Value>(raw.trim())
                .ok()
                .and_then(|meta| meta.get(META_URL_KEY)?.as_str().map(str::to_string));
            if let Some(url) = url {
                images.push(RenderedImage {
                    src: Some(url),
                    lazy_src: None,
                });
            }
        }
    }

    images
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn collects_img_src_and_lazy_attribute() {
        let html = r#"<html><body>
            <img src="https://img.example/a.jpg">
            <img src="data:image/gif;base64,R0lGOD" data-src="https://img.example/b.jpg">
            <img data-iurl="https://img.example/c.jpg">
        </body></html>"#;

        let images = parse_rendered_images(html);
        assert_eq!(
            images,
            vec![
                RenderedImage::new(Some("https://img.example/a.jpg"), None),
                RenderedImage::new(
                    Some("data:image/gif;base64,R0lGOD"),
                    Some("https://img.example/b.jpg")
                ),
                RenderedImage::new(None, Some("https://img.example/c.jpg")),
            ]
        );
    }

    #[test]
    fn reads_original_url_from_metadata_blocks() {
        let html = r#"<div class="rg_meta notranslate">{"id":"x","ou":"https://img.example/full.png","ow":640}</div>
            <div class="rg_meta">not json</div>"#;

        let images = parse_rendered_images(html);
        assert_eq!(
            images,
            vec![RenderedImage::new(Some("https://img.example/full.png"), None)]
        );
    }
}
