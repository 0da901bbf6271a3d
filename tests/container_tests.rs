use xmlmap::{parse, Container, ElementView, ErrorKind, Lookup, Map, Node, Scalar, Value, WriteOptions};

const CAR: &str = "<root><Car-Model>Model T</Car-Model><doors>4</doors></root>";

#[test]
fn test_alias_and_exact_names_stay_distinct() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse(CAR)?;
    let found = root.get("car_model");
    assert_eq!(
        found.one().and_then(Node::as_leaf).and_then(|leaf| leaf.get()),
        Some("Model T".to_string())
    );

    root.create("car_model", "separate")?;
    assert_eq!(root.lookup_exact("Car-Model").len(), 1);
    assert_eq!(root.lookup_exact("car_model").len(), 1);
    assert_eq!(
        root.to_markup(),
        "<root><Car-Model>Model T</Car-Model><doors>4</doors><car_model>separate</car_model></root>"
    );
    Ok(())
}

#[test]
fn test_create_accepts_hyphenated_tags() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse("<root/>")?;
    root.create("car-model-desc", "fast")?;
    assert!(root.get("car_model_desc").is_found());

    let err = root.create("car-model-desc", "again").err();
    assert!(matches!(
        err.as_ref().map(|e| e.kind()),
        Some(ErrorKind::DuplicateChild { tag }) if tag == "car-model-desc"
    ));
    Ok(())
}

#[test]
fn test_update_overwrites_or_appends() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse(CAR)?;
    root.update([
        ("car_model", Scalar::from("Model S")),
        ("doors", Scalar::from(2)),
        ("Wheel-Count", Scalar::from(4)),
        ("electric", Scalar::from(true)),
    ])?;
    assert_eq!(
        root.to_markup(),
        "<root><Car-Model>Model S</Car-Model><doors>2</doors><Wheel-Count>4</Wheel-Count><electric>YES</electric></root>"
    );
    assert!(root.get("wheel_count").is_found());
    Ok(())
}

#[test]
fn test_set_dict_list_and_literal() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse("<root/>")?;

    let head: Value = serde_json::from_str(r##"{"a": "A", "b": {"#text": "B", "@attr": "val"}}"##)?;
    let node = root.set("head", head)?;
    assert_eq!(
        node.as_container().map(Container::to_markup),
        Some(r#"<head><a>A</a><b attr="val">B</b></head>"#.to_string())
    );

    let items: Value = serde_json::from_str(r#"[{"a": "A"}, {"a": "B"}, {"a": "C"}]"#)?;
    root.set("head", items)?;
    assert_eq!(
        root.to_markup(),
        "<root><head><a>A</a><a>B</a><a>C</a></head></root>"
    );

    let head = root.sget("head");
    let head = head.as_container().ok_or("head should be a container")?;
    head.set("leaf", "A")?;
    assert_eq!(root.sget("head.leaf").text().as_deref(), Some("A"));
    Ok(())
}

#[test]
fn test_set_replaces_stale_content() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse(r#"<root><head old="1"><x/><y/></head><after/></root>"#)?;
    root.set("head", Map::new().with("@new", "2"))?;
    assert_eq!(
        root.to_markup(),
        r#"<root><head new="2"/><after/></root>"#
    );
    Ok(())
}

#[test]
fn test_delete_removes_every_match() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse("<root><Item-X>1</Item-X><Item-X>2</Item-X><keep/></root>")?;
    assert_eq!(root.delete("item_x"), 2);
    assert_eq!(root.to_markup(), "<root><keep/></root>");
    assert!(!root.get("item_x").is_found());
    Ok(())
}

#[test]
fn test_truthiness_and_len() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse("<root><a/><!--c--><b>x</b></root>")?;
    assert_eq!(root.len(), 2);
    assert!(root.is_truthy());
    assert!(!parse("<root/>")?.is_truthy());

    let a = root.get("a");
    assert!(a.one().is_some_and(|node| !node.is_truthy()));
    let b = root.get("b");
    assert!(b.one().is_some_and(Node::is_truthy));
    Ok(())
}

#[test]
fn test_xpath_queries() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse("<root><node1><sub>a</sub><sub>b</sub><other>subtext</other></node1></root>")?;

    match root.xpath("node1/sub")? {
        Lookup::Many(nodes) => assert_eq!(nodes.len(), 2),
        other => return Err(format!("expected two nodes, got {other:?}").into()),
    }
    assert!(matches!(root.xpath("//other")?, Lookup::One(_)));
    assert_eq!(root.xpath("missing")?, Lookup::NotFound);

    let found = root.xpath_regex("//*[re:test(., '^SUB', 'i')]")?;
    assert_eq!(found.first().map(ElementView::tag).as_deref(), Some("other"));
    assert!(root.xpath("//*[re:test(., 'x')]").is_err());
    Ok(())
}

#[test]
fn test_markup_options() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse("<root><!--c--><a>ż</a></root>")?;
    assert_eq!(root.to_markup(), "<root><!--c--><a>&#380;</a></root>");
    assert_eq!(
        root.to_markup_with(&WriteOptions::default().with_comments(false)),
        "<root><a>ż</a></root>"
    );
    assert_eq!(
        root.to_markup_with(&WriteOptions::default().pretty(true).encoding("utf-8")),
        "<?xml version='1.0' encoding='utf-8'?>\n<root>\n  <!--c-->\n  <a>ż</a>\n</root>\n"
    );
    Ok(())
}

#[test]
fn test_debug_rendering() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse(r#"<root attr1="val1" attr2="val2"><a>text</a><b/></root>"#)?;
    assert_eq!(format!("{root:?}"), r#"<root attr1="val1" attr2="val2"> (2)"#);
    assert_eq!(format!("{:?}", root.get("a")), "One(text)");
    Ok(())
}

#[test]
fn test_deep_copy_is_independent() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse(CAR)?;
    let copy = root.deep_copy();
    copy.update([("doors", 5)])?;
    assert_eq!(root.sget("doors").to_int()?, Some(4));
    assert_eq!(copy.sget("doors").to_int()?, Some(5));
    assert_ne!(root, copy);
    Ok(())
}

#[test]
fn test_serde_uses_markup() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse(CAR)?;
    let encoded = serde_json::to_string(&root)?;
    assert_eq!(encoded, serde_json::to_string(CAR)?);

    let decoded: Container = serde_json::from_str(&encoded)?;
    assert_eq!(decoded, root);
    Ok(())
}
