//! Behavioural guarantees of the compiler against realistic page templates.

use serde_json::json;
use sitecraft_template::{apply_section_overrides, compile, compile_with, default_sections, CompileOptions};

const PAGE: &str = r#"<!DOCTYPE html>
<html>
<head><title>{{site.name}}</title></head>
<body>
  <section id="hero" class="hero-section">
    <h1>{{hero.title}}</h1>
    <p>{{hero.subtitle}}</p>
  </section>
  <section id="about" class="about-section"><h2>{{about.title}}</h2><p>{{about.body}}</p></section>
  <section id="services" class="services-section">
    <div class="grid">{{#each services.items}}<div class="card"><h3>{{this.title}}</h3><p>{{this.description}}</p></div>{{/each}}</div>
  </section>
  <section id="portfolio" class="portfolio-section">
    <div class="gallery">{{#each portfolio.images}}<img src="{{this.src}}" alt="{{this.alt}}">{{/each}}</div>
  </section>
</body>
</html>"#;

fn tree() -> serde_json::Value {
    json!({
        "site": {"name": "Acme"},
        "hero": {"title": "Build", "subtitle": "Fast"},
        "about": {"title": "About us", "body": "Since 1999", "customHtml": ""},
        "services": {"items": [
            {"title": "Design", "description": "Pixels"},
            {"title": "Code", "description": "Bytes"}
        ]},
        "portfolio": {"images": [
            {"src": "/a.jpg", "alt": "A"},
            {"src": "/b.jpg", "alt": "B"}
        ]}
    })
}

#[test]
fn test_compile_is_deterministic() {
    let tree = tree();
    let first = compile(PAGE, &tree);
    for _ in 0..5 {
        assert_eq!(compile(PAGE, &tree), first);
    }
    let preview = compile_with(PAGE, &tree, &CompileOptions::preview());
    assert_eq!(compile_with(PAGE, &tree, &CompileOptions::preview()), preview);
}

#[test]
fn test_full_page_render() {
    let html = compile(PAGE, &tree());
    assert!(html.contains("<title>Acme</title>"));
    assert!(html.contains("<h1>Build</h1>"));
    assert!(html.contains(r#"<div class="card"><h3>Design</h3><p>Pixels</p></div><div class="card"><h3>Code</h3><p>Bytes</p></div>"#));
    assert!(html.contains(r#"<img src="/a.jpg" alt="A"><img src="/b.jpg" alt="B">"#));
    assert!(!html.contains("{{"));
}

#[test]
fn test_missing_paths_leave_placeholders() {
    let mut tree = tree();
    tree["hero"] = json!({"title": "Only title"});
    let html = compile(PAGE, &tree);
    assert!(html.contains("<p>{{hero.subtitle}}</p>"));
    assert!(html.contains("<h1>Only title</h1>"));
}

#[test]
fn test_section_override_spec_example() {
    let template = r#"<section id="about" class="about-section">OLD</section>"#;
    let tree = json!({"about": {"customHtml": "<p>NEW</p>"}});
    let once = compile(template, &tree);
    assert_eq!(once, r#"<section id="about" class="about-section"><p>NEW</p></section>"#);
    assert_eq!(compile(template, &tree), once);
}

#[test]
fn test_section_override_is_idempotent() {
    let mut tree = tree();
    tree["services"]["customHtml"] = json!("<h2>Custom</h2><section class=\"services-section\">x</section>");
    tree["hero"]["customHtml"] = json!("<h1>Big</h1>");

    let once = compile(PAGE, &tree);
    let twice = apply_section_overrides(&once, &tree, &default_sections());
    assert_eq!(once, twice);
    assert!(once.contains(r#"<section id="hero" class="hero-section"><h1>Big</h1></section>"#));
}

#[test]
fn test_gallery_items_tagged_in_preview() {
    let html = compile_with(PAGE, &tree(), &CompileOptions::preview());
    assert!(html.contains(
        r#"<img data-sc-image="portfolio.images[1].src" src="/b.jpg" alt="B" data-sc-item="portfolio.images[1]">"#
    ));
    assert!(html.contains(r#"<h1 data-sc-path="hero.title">Build</h1>"#));
}
