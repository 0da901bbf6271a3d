use rust_decimal::Decimal;
use time::macros::{date, datetime, time};
use xmlmap::codec::{self, DateTimeValue};
use xmlmap::{parse, ErrorKind, Node, Scalar, Value};

#[test]
fn test_typed_values_are_formatted_on_assignment() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse("<root/>")?;
    root.update([
        ("flag", Scalar::from(false)),
        ("price", Scalar::from(Decimal::new(-1015, 2))),
        ("ratio", Scalar::from(-0.0)),
        ("day", Scalar::from(date!(2013 - 10 - 05))),
        ("at", Scalar::from(time!(14:11:10))),
        (
            "stamp",
            Scalar::from(datetime!(2013-10-05 14:11:10.5 +2)),
        ),
    ])?;
    assert_eq!(
        root.to_markup(),
        "<root><flag>NO</flag><price>-10.15</price><ratio>-0.0</ratio><day>2013-10-05</day>\
         <at>14:11:10</at><stamp>2013-10-05T14:11:10+02:00</stamp></root>"
    );
    Ok(())
}

#[test]
fn test_leaf_conversions() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse(
        "<r><b>yes</b><i>-4</i><f>3.5</f><d>2014-02-12</d><t>13:45</t><dt>2014-02-12T12:30:00Z</dt></r>",
    )?;
    let leaf = |name: &str| match root.get(name).one() {
        Some(Node::Leaf(leaf)) => Ok(leaf.clone()),
        _ => Err(format!("{name} should be a leaf")),
    };

    assert!(leaf("b")?.to_bool());
    assert_eq!(leaf("i")?.to_int()?, -4);
    assert_eq!(leaf("f")?.to_float()?, 3.5);
    assert_eq!(leaf("d")?.to_date()?, date!(2014 - 02 - 12));
    assert_eq!(leaf("t")?.to_time()?, time!(13:45));
    assert_eq!(
        leaf("dt")?.to_datetime()?,
        DateTimeValue::Offset(datetime!(2014-02-12 12:30:00 UTC))
    );
    Ok(())
}

#[test]
fn test_conversion_errors() -> Result<(), Box<dyn std::error::Error>> {
    let root = parse("<r><bad>abc</bad><empty/></r>")?;
    let bad = root.sget("bad");
    assert_eq!(
        bad.to_int().map_err(|e| e.kind().clone()),
        Err(ErrorKind::Conversion)
    );
    let empty = root.sget("empty");
    assert_eq!(
        empty.to_datetime().map_err(|e| e.kind().clone()),
        Err(ErrorKind::EmptyValue)
    );
    Ok(())
}

#[test]
fn test_checked_formatters() {
    assert_eq!(
        codec::format_time(&Scalar::from(date!(2014 - 12 - 14))).map_err(|e| e.kind().clone()),
        Err(ErrorKind::Conversion)
    );
    assert_eq!(
        codec::format_datetime(&Scalar::from(datetime!(2014-12-14 10:00:00.7 UTC))).ok(),
        Some("2014-12-14T10:00:00+00:00".to_string())
    );
}

#[test]
fn test_values_from_scalars() {
    assert_eq!(Value::from(true), Value::from("YES"));
    assert_eq!(Value::from(Decimal::new(15, 1)), Value::from("1.5"));
    assert_eq!(Value::from(time!(07:05)), Value::from("07:05:00"));
}
