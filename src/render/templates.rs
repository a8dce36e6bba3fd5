//! Generated HTML for the cover and contents pages.

use crate::geometry::PageBox;
use crate::parsers::text::escape_html;
use crate::results::SectionLayout;

/// Cover page with the book title and a subtitle (newlines become breaks)
pub fn cover_html(title: &str, subtitle: &str) -> String {
    let subtitle = escape_html(subtitle).replace('\n', "<br>");
    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
    body {{
        margin: 0;
        padding: 40px;
        display: flex;
        justify-content: center;
        align-items: center;
        min-height: 100vh;
        box-sizing: border-box;
        font-family: -apple-system, BlinkMacSystemFont, "Helvetica Neue", sans-serif;
    }}
    .cover {{ text-align: center; max-width: 800px; }}
    h1 {{ font-size: 48px; font-weight: 500; margin: 0 0 2rem; color: #1d1d1f; }}
    .subtitle {{ font-size: 24px; font-weight: 300; color: #86868b; margin: 0; }}
</style>
</head>
<body>
    <div class="cover">
        <h1>{title}</h1>
        <p class="subtitle">{subtitle}</p>
    </div>
</body>
</html>"#,
        title = escape_html(title),
        subtitle = subtitle,
    )
}

/// Contents page: one row per section with its displayed starting page.
///
/// The document is laid out at exactly one page width so that row positions
/// measured in the browser line up with the printed pages.
pub fn contents_html(layouts: &[SectionLayout], page: PageBox) -> String {
    let items: String = layouts
        .iter()
        .map(|layout| {
            format!(
                "<li><div class=\"row\" data-seq=\"{}\"><span class=\"title\">{}</span>\
                 <span class=\"page\">{}</span></div></li>\n",
                layout.sequence,
                escape_html(&layout.title),
                layout.start_page
            )
        })
        .collect();

    format!(
        r#"<!DOCTYPE html>
<html>
<head>
<meta charset="utf-8">
<style>
    @page {{ size: A4; margin: 0; }}
    html, body {{ margin: 0; width: {width}px; }}
    body {{
        padding: 48px;
        box-sizing: border-box;
        color: #1d1d1f;
        font-family: -apple-system, BlinkMacSystemFont, "Helvetica Neue", sans-serif;
    }}
    h1 {{ font-size: 40px; font-weight: 600; margin: 0 0 40px; }}
    ul {{ list-style: none; padding: 0; margin: 0; border-top: 1px solid #d2d2d7; }}
    li {{ border-bottom: 1px solid #d2d2d7; }}
    .row {{ padding: 12px 0; display: flex; justify-content: space-between; align-items: center; }}
    .title {{
        font-size: 17px;
        white-space: nowrap;
        overflow: hidden;
        text-overflow: ellipsis;
        max-width: {title_width}px;
    }}
    .page {{ color: #86868b; font-size: 15px; flex: 0 0 auto; }}
</style>
</head>
<body>
    <h1>Contents</h1>
    <ul>
{items}    </ul>
</body>
</html>"#,
        width = page.width.0,
        title_width = (page.width.0 - 96.0 - 80.0).max(100.0),
        items = items,
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cover_escapes_and_breaks_lines() {
        let html = cover_html("Fish & Chips", "Line one\nLine <two>");
        assert!(html.contains("<h1>Fish &amp; Chips</h1>"));
        assert!(html.contains("Line one<br>Line &lt;two&gt;"));
    }

    #[test]
    fn test_contents_rows() {
        let layouts = vec![
            SectionLayout {
                sequence: 1,
                title: "Buttons".to_string(),
                base_page: 2,
                start_page: 3,
            },
            SectionLayout {
                sequence: 4,
                title: "A <b> title".to_string(),
                base_page: 4,
                start_page: 5,
            },
        ];
        let html = contents_html(&layouts, PageBox::A4);

        assert!(html.contains(r#"data-seq="1""#));
        assert!(html.contains(r#"<span class="page">3</span>"#));
        assert!(html.contains(r#"data-seq="4""#));
        assert!(html.contains("A &lt;b&gt; title"));
        assert!(html.contains("width: 794px"));
    }
}
