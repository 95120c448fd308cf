use std::sync::Arc;

use pretty_assertions::assert_eq;
use weba::{AttrValue, Error, Tag, TemplateCache, Text, Ui};

fn ui() -> Ui {
    Ui::with_cache(Arc::new(TemplateCache::new(0)))
}

#[test]
fn test_hello_world_with_subtext() {
    let ui = ui();
    let div = ui.div(());
    ui.within(&div, || {
        ui.h1("Hello, World!");
        ui.h2("This is a subtext.");
    })
    .unwrap();
    assert_eq!(
        div.to_string(),
        "<div><h1>Hello, World!</h1><h2>This is a subtext.</h2></div>"
    );
}

#[test]
fn test_nested_blocks_restore_the_outer_context() {
    let ui = ui();
    let outer = ui.div(());
    let inner = ui
        .within(&outer, || {
            ui.h1("Outer title");
            let inner = ui.div(());
            ui.within(&inner, || ui.p("Inner paragraph")).unwrap();
            ui.p("Outer paragraph");
            inner
        })
        .unwrap();
    assert_eq!(inner.to_html(), "<div><p>Inner paragraph</p></div>");
    assert_eq!(
        outer.to_html(),
        "<div><h1>Outer title</h1><div><p>Inner paragraph</p></div><p>Outer paragraph</p></div>"
    );
}

#[test]
fn test_attributes_follow_the_keyword_convention() {
    let ui = ui();
    let div = ui.div(()).attr("class_", "container").attr("data_test", "value");
    assert_eq!(div.to_html(), r#"<div class="container" data-test="value"></div>"#);

    let boosted = ui.div(()).attr("hx_boost", true);
    assert_eq!(boosted.to_html(), "<div hx-boost></div>");

    let outer = ui.div(()).attr("class_", "outer");
    ui.within(&outer, || {
        ui.p(()).attrs([("class_", "inner"), ("data_value", "test")]);
    })
    .unwrap();
    assert_eq!(
        outer.to_html(),
        r#"<div class="outer"><p class="inner" data-value="test"></p></div>"#
    );
}

#[test]
fn test_false_and_none_remove_attributes() {
    let ui = ui();
    let input = ui.input().attr("disabled", true).attr("name", "q");
    input.set_attr("disabled", false);
    input.set_attr("name", None::<&str>);
    assert_eq!(input.to_html(), "<input>");
}

#[test]
fn test_class_list_manipulation() {
    let ui = ui();
    let div = ui.div(()).attr("class_", vec!["container", "mt-4", "px-2"]);
    assert_eq!(div.to_html(), r#"<div class="container mt-4 px-2"></div>"#);

    let hello = ui.p("Hello").attr("class_", "greeting");
    hello.class_list().add("highlight").add("text-xl");
    hello.class_list().remove("greeting");
    assert!(hello.class_list().contains("highlight"));
    assert!(!hello.class_list().toggle("highlight"));
    assert!(hello.class_list().toggle("highlight"));
    assert_eq!(hello.to_html(), r#"<p class="text-xl highlight">Hello</p>"#);
    assert_eq!(
        hello.get_attr("class"),
        Some(AttrValue::List(vec!["text-xl".into(), "highlight".into()]))
    );
}

#[test]
fn test_values_convert_to_text() {
    let ui = ui();
    assert_eq!(ui.p(123).to_html(), "<p>123</p>");
    assert_eq!(ui.p(1.5).to_html(), "<p>1.5</p>");
    assert_eq!(ui.p(true).to_html(), "<p>true</p>");
    assert_eq!(ui.p(None::<&str>).to_html(), "<p></p>");
    assert_eq!(ui.p(Text('x')).to_html(), "<p>x</p>");
    assert_eq!(ui.p("a < b & c").to_html(), "<p>a &lt; b &amp; c</p>");
}

#[cfg(feature = "chrono")]
#[test]
fn test_dates_convert_to_text() {
    let ui = ui();
    let datetime = chrono::NaiveDate::from_ymd_opt(2024, 12, 25)
        .unwrap()
        .and_hms_opt(12, 0, 0)
        .unwrap();
    let p = ui.p(());
    ui.within(&p, || ui.text(datetime)).unwrap();
    assert_eq!(p.to_html(), "<p>2024-12-25 12:00:00</p>");
}

#[test]
fn test_htmx_search_form() {
    let ui = ui();
    let container = ui.div(());
    ui.within(&container, || {
        ui.input()
            .attr("type_", "text")
            .attr("name", "search")
            .attr("hx_post", "/search")
            .attr("hx_trigger", "keyup changed delay:500ms")
            .attr("hx_target", "#results");
        let results = ui.div(()).attr("id", "results");
        ui.within(&results, || ui.p("Results will appear here...")).unwrap();
    })
    .unwrap();
    assert_eq!(
        container.to_html(),
        concat!(
            "<div>",
            r##"<input type="text" name="search" hx-post="/search" hx-trigger="keyup changed delay:500ms" hx-target="#results">"##,
            r#"<div id="results"><p>Results will appear here...</p></div>"#,
            "</div>"
        )
    );
}

#[test]
fn test_append_to_existing_element() {
    let ui = ui();
    let list = ui.ul(());
    ui.within(&list, || ui.li("Item 1")).unwrap();
    let _quiet = ui.no_context();
    let second = ui.li("Item 2");
    let third = ui.li("Item 3");
    list.append((second, third)).unwrap();
    assert_eq!(
        list.to_html(),
        "<ul><li>Item 1</li><li>Item 2</li><li>Item 3</li></ul>"
    );
}

#[test]
fn test_replace_with() {
    let ui = ui();
    let container = ui.div(());
    let heading = ui
        .within(&container, || {
            let heading = ui.h1("Hello, World!");
            ui.div("Other content");
            heading
        })
        .unwrap();

    let replaced = heading.replace_with(Tag::element("h2").attr("class_", "new")).unwrap();
    assert!(replaced.parent().is_none());
    assert_eq!(
        container.to_html(),
        r#"<div><h2 class="new"></h2><div>Other content</div></div>"#
    );

    let orphan = Tag::element("p");
    assert!(matches!(
        orphan.replace_with("text"),
        Err(Error::DetachedTag { operation: "replace_with" })
    ));
}

#[test]
fn test_moving_a_tag_into_itself_fails() {
    let ui = ui();
    let outer = ui.div(());
    let inner = ui.within(&outer, || ui.span(())).unwrap();
    assert!(matches!(inner.append(&outer), Err(Error::HierarchyRequest)));
    assert!(matches!(outer.append(&outer), Err(Error::HierarchyRequest)));
}

#[test]
fn test_opening_a_tag_twice_fails() {
    let ui = ui();
    let div = ui.div(());
    let _open = ui.enter(&div).unwrap();
    assert!(matches!(ui.enter(&div), Err(Error::AlreadyOpen { .. })));
}

#[test]
fn test_raw_markup_and_selectors() {
    let ui = ui();
    let raw = ui
        .raw(r#"<ul class="menu"><li class="item active">Home</li><li class="item">About</li></ul>"#)
        .unwrap();
    assert_eq!(raw.select("li.item").unwrap().len(), 2);
    assert_eq!(
        raw.select_one("li:not(.active)").unwrap().unwrap().text(),
        "About"
    );
    assert!(matches!(raw.select("li["), Err(Error::InvalidSelector { .. })));
}

#[test]
fn test_json_attributes() {
    let ui = ui();
    let div = ui.div(());
    div.set_json("hx-vals", &serde_json::json!({"page": 2})).unwrap();
    assert_eq!(div.to_html(), r#"<div hx-vals='{"page":2}'></div>"#);
    let vals: serde_json::Value = div.attr_json("hx-vals").unwrap().unwrap();
    assert_eq!(vals["page"], 2);
}

#[test]
fn test_prettify_indents_blocks() {
    let ui = ui();
    let div = ui.div(());
    ui.within(&div, || {
        ui.p(("Some ", ui.strong("bold"), " text"));
    })
    .unwrap();
    assert_eq!(div.prettify(), "<div>\n  <p>Some <strong>bold</strong> text</p>\n</div>");
}

#[test]
fn test_styled_container() {
    let ui = ui();
    let container = ui.div(()).attr("class_", vec!["container", "mx-auto", "p-4"]);
    ui.within(&container, || {
        ui.h1("Styled Heading").attr("class_", "text-2xl font-bold");
    })
    .unwrap();
    assert_eq!(
        container.to_html(),
        r#"<div class="container mx-auto p-4"><h1 class="text-2xl font-bold">Styled Heading</h1></div>"#
    );
}

#[test]
fn test_built_and_parsed_trees_render_alike() {
    let ui = ui();
    let built = ui.ul(()).attr("class_", "menu");
    ui.within(&built, || {
        ui.li("one");
        ui.li("two").attr("data_id", "2");
    })
    .unwrap();
    let parsed = ui
        .raw(r#"<ul class="menu"><li>one</li><li data-id="2">two</li></ul>"#)
        .unwrap();

    for tree in [&built, &parsed] {
        let first = tree.select_one("li").unwrap().unwrap().extract();
        tree.insert(1, &first).unwrap();
        tree.append(ui.li("three")).unwrap();
    }
    assert_eq!(built.to_html(), parsed.to_html());
    assert_eq!(
        built.to_html(),
        r#"<ul class="menu"><li data-id="2">two</li><li>one</li><li>three</li></ul>"#
    );
}

#[test]
fn test_extracted_tag_moves_exactly_once() {
    let ui = ui();
    let page = ui.raw("<div><section><p>moved</p></section><aside></aside></div>").unwrap();
    let p = page.select_one("p").unwrap().unwrap().extract();
    assert!(matches!(p.replace_with("x"), Err(Error::DetachedTag { .. })));
    page.select_one("aside").unwrap().unwrap().append(&p).unwrap();
    assert_eq!(page.select("p").unwrap().len(), 1);
    assert_eq!(
        page.to_html(),
        "<div><section></section><aside><p>moved</p></aside></div>"
    );
}

#[test]
fn test_multi_root_raw_matches_parsed_children() {
    let ui = ui();
    let built = ui.ul(());
    ui.within(&built, || ui.raw("<li>a</li><li>b</li>")).unwrap().unwrap();
    let parsed = ui.raw("<ul><li>a</li><li>b</li></ul>").unwrap();
    assert_eq!(built.children().len(), parsed.children().len());

    for tree in [&built, &parsed] {
        tree.insert(1, ui.hr()).unwrap();
    }
    assert_eq!(built.to_html(), "<ul><li>a</li><hr><li>b</li></ul>");
    assert_eq!(built.to_html(), parsed.to_html());

    let detached = ui.raw("<li>c</li><li>d</li>").unwrap();
    built.append(&detached).unwrap();
    assert_eq!(built.children().len(), 5);
    assert_eq!(
        built.to_html(),
        "<ul><li>a</li><hr><li>b</li><li>c</li><li>d</li></ul>"
    );
}
