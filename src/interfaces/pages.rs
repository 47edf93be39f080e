use std::collections::BTreeMap;

use pulldown_cmark::{Options, Parser, html};

use crate::{
    domain::models::{MemoryHit, NoteDocument},
    interfaces::render::{Panel, escape},
};

const STYLE: &str = "body{font-family:system-ui,sans-serif;margin:0;background:#111418;color:#e4e6eb}\
main{display:grid;grid-template-columns:repeat(auto-fill,minmax(380px,1fr));gap:12px;padding:12px}\
section{background:#1b1f25;border-radius:8px;padding:10px 14px}\
h2{font-size:14px;text-transform:uppercase;letter-spacing:.05em;color:#9aa4b2}\
.muted{color:#8a93a0;font-size:12px}.badge{padding:1px 6px;border-radius:8px;font-size:11px;background:#2a2f37}\
.online{background:#1f6f43}.offline{background:#7a2630}.error{color:#ff7b7b}.stale{color:#e0b34a;font-size:12px}\
.chart{display:flex;align-items:flex-end;gap:8px;height:150px}.bar span{display:block;width:28px;background:#4a8cff}\
.chart.sparkline{gap:2px;height:124px}.sparkline .bar span{width:6px;background:#e0b34a}\
.gauge .track{height:6px;background:#2a2f37}.gauge .track span{display:block;height:6px;background:#4a8cff}\
.gauge-warn .track span{background:#e0b34a}.gauge-critical .track span{background:#ff5b5b}\
form.inline{display:inline}table{width:100%;font-size:13px}";

/// Reloads each region from `/regions/{id}`; fast regions every second.
const SCRIPT: &str = "(function(){\
function load(el){fetch('/regions/'+el.dataset.region).then(function(r){return r.ok?r.text():null})\
.then(function(html){if(html!==null){el.querySelector('.region-body').innerHTML=html}}).catch(function(){})}\
var fast=[],slow=[];document.querySelectorAll('[data-region]').forEach(function(el){\
(el.dataset.fast==='true'?fast:slow).push(el)});\
setInterval(function(){fast.forEach(load)},1000);setInterval(function(){slow.forEach(load)},5000);})();";

fn shell(title: &str, body: &str) -> String {
    format!(
        "<!doctype html><html lang=\"en\"><head><meta charset=\"utf-8\"><meta name=\"viewport\" content=\"width=device-width,initial-scale=1\"><title>{}</title><style>{STYLE}</style></head><body>{body}</body></html>",
        escape(title)
    )
}

/// Full dashboard from the region cache. Regions not rendered yet show a placeholder.
pub fn dashboard_page(regions: &BTreeMap<Panel, String>) -> String {
    let mut body = String::from("<header><h1>Clawboard</h1></header><main>");
    for panel in Panel::ALL {
        let region = regions
            .get(&panel)
            .map(String::as_str)
            .unwrap_or("<p class=\"placeholder\">loading…</p>");
        body.push_str(&format!(
            "<section id=\"region-{id}\" data-region=\"{id}\" data-fast=\"{}\"><h2>{}</h2><div class=\"region-body\">{region}</div></section>",
            panel.is_fast(),
            escape(panel.title()),
            id = panel.id(),
        ));
    }
    body.push_str(&format!("</main><script>{SCRIPT}</script>"));
    shell("Clawboard", &body)
}

fn back_link() -> &'static str {
    "<p><a href=\"/\">← dashboard</a></p>"
}

pub fn memory_page(query: &str, result: Result<&[MemoryHit], &str>) -> String {
    let mut body = format!(
        "{}<h1>Memory search</h1><form method=\"get\" action=\"/memory\"><input type=\"search\" name=\"query\" value=\"{}\"><button type=\"submit\">Search</button></form>",
        back_link(),
        escape(query)
    );
    match result {
        Err(error) => body.push_str(&format!(
            "<p class=\"error\">search failed: {}</p>",
            escape(error)
        )),
        Ok([]) if query.trim().is_empty() => {}
        Ok([]) => body.push_str("<p class=\"muted\">no matches</p>"),
        Ok(hits) => {
            body.push_str("<ol class=\"hits\">");
            for hit in hits {
                body.push_str(&format!(
                    "<li><strong>{}</strong><pre>{}</pre></li>",
                    escape(&hit.line),
                    escape(&hit.context)
                ));
            }
            body.push_str("</ol>");
        }
    }
    shell("Memory search", &section(&body))
}

pub fn logs_page(lines: usize, result: Result<&[String], &str>) -> String {
    let mut body = format!("{}<h1>Logs (last {lines})</h1>", back_link());
    match result {
        Err(error) => body.push_str(&format!(
            "<p class=\"error\">failed to load logs: {}</p>",
            escape(error)
        )),
        Ok(lines) => {
            let joined = lines.join("\n");
            body.push_str(&format!("<pre class=\"logs\">{}</pre>", escape(&joined)));
        }
    }
    shell("Logs", &section(&body))
}

pub fn note_page(path: &str, result: Result<&NoteDocument, &str>) -> String {
    let mut body = format!("{}<h1>{}</h1>", back_link(), escape(path));
    match result {
        Err(error) => body.push_str(&format!(
            "<p class=\"error\">failed to load note: {}</p>",
            escape(error)
        )),
        Ok(document) => body.push_str(&format!(
            "<article class=\"note\">{}</article>",
            render_markdown(&document.content)
        )),
    }
    shell(path, &section(&body))
}

fn section(body: &str) -> String {
    format!("<main><section>{body}</section></main>")
}

/// Markdown to HTML. Raw HTML in the note is escaped, not passed through.
pub fn render_markdown(markdown: &str) -> String {
    let mut options = Options::empty();
    options.insert(Options::ENABLE_TABLES);
    options.insert(Options::ENABLE_STRIKETHROUGH);
    options.insert(Options::ENABLE_TASKLISTS);

    let parser = Parser::new_ext(markdown, options).map(|event| match event {
        pulldown_cmark::Event::Html(raw) | pulldown_cmark::Event::InlineHtml(raw) => {
            pulldown_cmark::Event::Text(raw)
        }
        other => other,
    });
    let mut rendered = String::with_capacity(markdown.len() * 3 / 2);
    html::push_html(&mut rendered, parser);
    rendered
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeMap;

    use super::{dashboard_page, memory_page, render_markdown};
    use crate::{domain::models::MemoryHit, interfaces::render::Panel};

    #[test]
    fn page_contains_every_region() {
        let mut regions = BTreeMap::new();
        regions.insert(Panel::Gateway, "<p>gw</p>".to_owned());
        let page = dashboard_page(&regions);
        for panel in Panel::ALL {
            assert!(page.contains(&format!("data-region=\"{}\"", panel.id())));
        }
        assert!(page.contains("<p>gw</p>"));
    }

    #[test]
    fn markdown_renders_and_escapes_html() {
        let rendered = render_markdown("# Title\n\n<script>x</script>\n\n- item");
        assert!(rendered.contains("<h1>Title</h1>"));
        assert!(rendered.contains("<li>item</li>"));
        assert!(!rendered.contains("<script>"));
    }

    #[test]
    fn memory_page_lists_hits() {
        let hits = [MemoryHit {
            line: "deploy notes".to_owned(),
            context: "ctx".to_owned(),
            index: 3,
        }];
        let page = memory_page("deploy", Ok(&hits));
        assert!(page.contains("deploy notes"));
        assert!(memory_page("", Ok(&[])).contains("Memory search"));
    }
}
