//! Static HTML rendering of the catalog page and its cards.
//!
//! Every function here is a pure function of its inputs.
use chrono::{DateTime, NaiveDate};

use crate::catalog::{Footer, PageView};
use crate::config::Images;
use crate::image::{batch_image_url, popular_image_url};
use crate::model::{BatchEntry, PopularBatchEntry};

const PLACEHOLDER_GLYPH: &str = r#"<div class="placeholder"><svg class="glyph" fill="none" stroke="currentColor" viewBox="0 0 24 24"><path stroke-linecap="round" stroke-linejoin="round" stroke-width="2" d="M12 6.253v13m0-13C10.832 5.477 9.246 5 7.5 5S4.168 5.477 3 6.253v13C4.168 18.477 5.754 18 7.5 18s3.332.477 4.5 1.253m0-13C13.168 5.477 14.754 5 16.5 5c1.747 0 3.332.477 4.5 1.253v13C19.832 18.477 18.247 18 16.5 18c-1.746 0-3.332.477-4.5 1.253"></path></svg></div>"#;

/// Swaps a broken image for the fallback, then for the glyph.
const IMAGE_ERROR_SCRIPT: &str = r#"<script>
function catalogImageError(img) {
  if (img.dataset.failed) {
    var holder = document.createElement('div');
    holder.innerHTML = document.getElementById('placeholder-glyph').innerHTML;
    img.parentNode.replaceChild(holder.firstElementChild, img);
    return;
  }
  img.dataset.failed = '1';
  img.src = img.dataset.fallback;
}
</script>"#;

/// `"{Mon} {D}, {YYYY}"`; empty input stays empty, unparseable input is shown as-is.
pub fn format_date(raw: &str) -> String {
    let raw = raw.trim();
    if raw.is_empty() {
        return String::new();
    }
    let date = DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.naive_utc().date())
        .or_else(|_| NaiveDate::parse_from_str(raw, "%Y-%m-%d"))
        .or_else(|_| NaiveDate::parse_from_str(raw.get(..10).unwrap_or(raw), "%Y-%m-%d"));
    match date {
        Ok(d) => d.format("%b %-d, %Y").to_string(),
        Err(_) => raw.to_string(),
    }
}

pub fn html_escape(s: &str) -> String {
    s.replace('&', "&amp;")
        .replace('<', "&lt;")
        .replace('>', "&gt;")
}

pub fn html_attr(s: &str) -> String {
    html_escape(s).replace('"', "&quot;")
}

fn image_tag(url: &str, alt: &str, images: &Images) -> String {
    format!(
        "<img class=\"cover\" src=\"{}\" alt=\"{}\" data-fallback=\"{}\" onerror=\"catalogImageError(this)\" />",
        html_attr(url),
        html_attr(alt),
        html_attr(&images.fallback)
    )
}

fn meta_chips(class: Option<&str>, exam: &[String]) -> String {
    let mut out = String::new();
    if let Some(c) = class.filter(|c| !c.is_empty()) {
        out.push_str(&format!("<span class=\"chip class\">Class {}</span>", html_escape(c)));
    }
    if !exam.is_empty() {
        out.push_str(&format!("<span class=\"chip exam\">{}</span>", html_escape(&exam.join(", "))));
    }
    out
}

fn start_date(raw: Option<&str>) -> String {
    match raw.filter(|s| !s.trim().is_empty()) {
        Some(d) => format!("<span class=\"date\">Starts: {}</span>", html_escape(&format_date(d))),
        None => String::new(),
    }
}

fn details_link(id: &str) -> String {
    format!(
        "<div class=\"cta\"><a class=\"button\" href=\"/batch/{}\">View Details &rarr;</a></div>",
        html_attr(id)
    )
}

pub fn render_popular_card(entry: &PopularBatchEntry, images: &Images) -> String {
    let info = &entry.type_info;
    let mut html = String::from("<article class=\"card popular\"><div class=\"media\">");

    match popular_image_url(info, images) {
        Some(url) => html.push_str(&image_tag(&url, &info.name, images)),
        None => html.push_str(PLACEHOLDER_GLYPH),
    }

    let mut badges = String::new();
    if info.marked_as_new {
        badges.push_str("<span class=\"badge new\">New</span>");
    }
    if info.is_combo {
        badges.push_str("<span class=\"badge combo\">Combo</span>");
    }
    if !badges.is_empty() {
        html.push_str(&format!("<div class=\"badges\">{}</div>", badges));
    }
    if let Some(icon) = info.fomo_icons.first() {
        html.push_str(&format!(
            "<img class=\"fomo\" src=\"{}\" alt=\"Special Offer\" />",
            html_attr(icon)
        ));
    }
    html.push_str("</div><div class=\"content\">");
    html.push_str(&format!("<h3 class=\"title\">{}</h3>", html_escape(&info.name)));

    let pointers = info
        .card
        .as_ref()
        .map(|c| c.description_pointers.as_slice())
        .unwrap_or_default();
    if !pointers.is_empty() {
        html.push_str("<div class=\"pointers\">");
        for p in pointers.iter().take(2) {
            html.push_str("<div class=\"pointer\">");
            if let Some(img) = p.image.as_deref().filter(|s| !s.is_empty()) {
                html.push_str(&format!("<img class=\"icon\" src=\"{}\" alt=\"\" />", html_attr(img)));
            }
            html.push_str(&format!("<span class=\"clamp-1\">{}</span></div>", html_escape(&p.text)));
        }
        html.push_str("</div>");
    }

    html.push_str("<div class=\"meta\">");
    html.push_str(&meta_chips(info.class.as_deref(), &info.exam));
    html.push_str(&start_date(info.start_date.as_deref()));
    if let Some(mode) = info.mode.as_deref().filter(|m| !m.is_empty()) {
        html.push_str(&format!("<span class=\"chip mode\">{}</span>", html_escape(mode)));
    }
    html.push_str("</div>");
    html.push_str(&details_link(entry.detail_id()));
    html.push_str("</div></article>");
    html
}

pub fn render_batch_card(batch: &BatchEntry, images: &Images) -> String {
    let mut html = String::from("<article class=\"card\"><div class=\"media\">");
    html.push_str(&image_tag(&batch_image_url(batch, images), &batch.name, images));
    if let Some(status) = batch.status.as_deref().filter(|s| !s.is_empty()) {
        let variant = if status == "Active" { "active" } else { "inactive" };
        html.push_str(&format!(
            "<div class=\"badges\"><span class=\"badge {}\">{}</span></div>",
            variant,
            html_escape(status)
        ));
    }
    html.push_str("</div><div class=\"content\">");
    html.push_str(&format!("<h3 class=\"title\">{}</h3>", html_escape(&batch.name)));
    html.push_str("<div class=\"meta\">");
    html.push_str(&meta_chips(batch.class.as_deref(), &batch.exam));
    html.push_str(&start_date(batch.start_date.as_deref()));
    html.push_str("</div>");
    html.push_str(&details_link(&batch.id));
    html.push_str("</div></article>");
    html
}

fn skeleton_grid(items: usize) -> String {
    let cells = "<div class=\"card skeleton\"></div>".repeat(items);
    format!("<div class=\"grid\">{}</div>", cells)
}

fn search_box(raw_term: &str) -> String {
    let clear = if raw_term.is_empty() {
        String::new()
    } else {
        "<button class=\"clear\" type=\"button\" aria-label=\"Clear search\">&times;</button>".to_string()
    };
    format!(
        "<div class=\"search\"><input type=\"search\" placeholder=\"Search batches...\" value=\"{}\" />{}</div>",
        html_attr(raw_term),
        clear
    )
}

fn render_error(message: &str) -> String {
    format!(
        "<section class=\"error card\"><p>{}</p><button type=\"button\" onclick=\"window.location.reload()\">Try again</button></section>",
        html_escape(message)
    )
}

fn render_all_batches(view: &PageView, images: &Images) -> String {
    let mut html = String::from("<section class=\"all\"><h2>All Batches</h2>");
    html.push_str(&format!("<p class=\"count\">{}</p>", html_escape(&view.count_line())));

    if view.all_loading && view.batches.is_empty() {
        html.push_str(&skeleton_grid(9));
    } else if view.batches.is_empty() && !view.loading {
        html.push_str(
            "<div class=\"empty card\"><h3>No batches found</h3>\
             <p>Try adjusting your search terms to find the perfect batch for you.</p>\
             <button type=\"button\" class=\"clear\">Clear Search</button></div>",
        );
    } else {
        html.push_str("<div class=\"grid\">");
        for b in &view.batches {
            html.push_str(&render_batch_card(b, images));
        }
        html.push_str("</div><div id=\"load-more\" class=\"sentinel\">");
        match view.footer() {
            Footer::LoadingMore => {
                html.push_str("<span class=\"pill\">Loading more batches...</span>");
            }
            Footer::End { shown } => html.push_str(&format!(
                "<div class=\"pill end\"><p>You've reached the end</p><p class=\"small\">Showing all {} batches</p></div>",
                shown
            )),
            Footer::None => {}
        }
        html.push_str("</div>");
    }
    html.push_str("</section>");
    html
}

pub fn render_page(view: &PageView, images: &Images) -> String {
    let mut body = String::new();
    body.push_str(
        "<header><h1>Explore Our Batches</h1>\
         <p class=\"muted\">Discover the perfect learning batch tailored to your educational journey</p></header>",
    );

    if let Some(err) = view.error.as_deref() {
        body.push_str(&render_error(err));
    } else {
        body.push_str(&search_box(&view.raw_term));
        if !view.popular.is_empty() {
            body.push_str("<section class=\"popular\"><h2>Popular Batches</h2>");
            if view.popular_loading {
                body.push_str(&skeleton_grid(6));
            } else {
                body.push_str("<div class=\"grid wide\">");
                for p in &view.popular {
                    body.push_str(&render_popular_card(p, images));
                }
                body.push_str("</div>");
            }
            body.push_str("</section>");
        }
        body.push_str(&render_all_batches(view, images));
    }

    format!(
        r#"<!doctype html>
<html lang="en">
  <head>
    <meta charset="utf-8">
    <meta name="viewport" content="width=device-width, initial-scale=1">
    <title>Batches</title>
    <link rel="stylesheet" href="static/style.css">
    {}
  </head>
  <body>
    <template id="placeholder-glyph">{}</template>
    <main>
      {}
    </main>
  </body>
</html>"#,
        IMAGE_ERROR_SCRIPT, PLACEHOLDER_GLYPH, body
    )
}

pub const DEFAULT_STYLE: &str = r#"
:root {
  color-scheme: light dark;
  --fg: #222;
  --bg: #fff;
  --muted: #666;
  --primary: #5a4bda;
}

@media (prefers-color-scheme: dark) {
  :root {
    --fg: #eee;
    --bg: #121212;
    --muted: #aaa;
  }
}

html,
body {
  margin: 0;
  padding: 0;
  background: var(--bg);
  color: var(--fg);
  font: 14px/1.6 -apple-system, BlinkMacSystemFont, 'Segoe UI', Roboto,
        'Helvetica Neue', Arial, 'Noto Sans', sans-serif;
}

header {
  text-align: center;
  padding: 24px 16px 8px;
}

main {
  padding: 16px;
  max-width: 1200px;
  margin: 0 auto;
}

.muted,
.count,
.meta {
  color: var(--muted);
}

.search {
  position: relative;
  max-width: 32rem;
  margin: 0 auto 24px;
}

.search input {
  width: 100%;
  height: 2.6rem;
  padding: 0 2.5rem 0 0.75rem;
}

.search .clear {
  position: absolute;
  right: 4px;
  top: 50%;
  transform: translateY(-50%);
}

.grid {
  display: grid;
  gap: 16px;
  grid-template-columns: repeat(auto-fill, minmax(260px, 1fr));
}

.card {
  display: flex;
  flex-direction: column;
  overflow: hidden;
  border: 1px solid #ddd6;
  border-radius: 10px;
}

.card.skeleton {
  height: 320px;
  background: #8882;
}

.media {
  position: relative;
}

.cover,
.placeholder {
  width: 100%;
  height: 200px;
  object-fit: cover;
  display: flex;
  align-items: center;
  justify-content: center;
}

.glyph {
  width: 48px;
  height: 48px;
  color: var(--primary);
}

.badges {
  position: absolute;
  top: 10px;
  left: 10px;
  display: flex;
  gap: 6px;
}

.badge {
  color: #fff;
  font-size: 12px;
  padding: 2px 8px;
  border-radius: 6px;
}

.badge.new,
.badge.active {
  background: #16a34a;
}

.badge.combo {
  background: #9333ea;
}

.badge.inactive {
  background: #6b7280;
}

.fomo {
  position: absolute;
  top: 10px;
  right: 10px;
  width: 28px;
  height: 28px;
}

.content {
  display: flex;
  flex-direction: column;
  flex: 1;
  padding: 14px;
}

.title {
  margin: 0 0 8px;
  display: -webkit-box;
  -webkit-line-clamp: 2;
  -webkit-box-orient: vertical;
  overflow: hidden;
}

.clamp-1 {
  display: -webkit-box;
  -webkit-line-clamp: 1;
  -webkit-box-orient: vertical;
  overflow: hidden;
}

.pointer .icon {
  width: 12px;
  height: 12px;
}

.chip {
  display: inline-block;
  margin: 0 6px 6px 0;
  padding: 2px 8px;
  border-radius: 6px;
  background: #8881;
}

.cta {
  margin-top: auto;
  padding-top: 10px;
  border-top: 1px solid #ddd5;
  text-align: center;
}

.sentinel {
  display: flex;
  justify-content: center;
  padding: 24px 0;
}

.pill {
  padding: 8px 16px;
  border-radius: 999px;
  background: #8882;
  text-align: center;
}

.small {
  font-size: 12px;
}
"#;
