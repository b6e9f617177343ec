use crate::error::SketchError;
use crate::schema::ConstraintKind;
use crate::sketch::{
    Constraint, Oid, SketchCircle, SketchGeometry, SketchIndex, SketchLine, SketchPoint,
    SketchPrimitive,
};

fn point(id: u32, x: f64, y: f64) -> SketchPrimitive {
    SketchPoint { id: Oid(id), x, y, fixed: false }.into()
}

#[test]
fn test_set_and_get() {
    let mut index = SketchIndex::new();
    index.set(point(1, 0.0, 0.0)).unwrap();
    index.set(point(2, 1.0, 0.0)).unwrap();

    assert!(index.has(Oid(1)));
    assert_eq!(index.len(), 2);
    assert_eq!(index.counter(), 2);
    assert!(index.get(Oid(3)).is_none());
    assert_eq!(index.get_or_fail(Oid(3)), Err(SketchError::NotFound(Oid(3))));
}

#[test]
fn test_overwrite_keeps_position_and_counter() {
    let mut index = SketchIndex::new();
    index.set(point(5, 0.0, 0.0)).unwrap();
    index.set(point(2, 0.0, 0.0)).unwrap();
    index.set(point(5, 9.0, 9.0)).unwrap();

    assert_eq!(index.counter(), 2);
    let ids: Vec<Oid> = index.all().map(|p| p.id()).collect();
    assert_eq!(ids, vec![Oid(5), Oid(2)]);
    assert_eq!(index.get_point(Oid(5)).unwrap().x, 9.0);
}

#[test]
fn test_all_is_restartable() {
    let mut index = SketchIndex::new();
    for i in 0..4 {
        index.set(point(i, i as f64, 0.0)).unwrap();
    }
    assert_eq!(index.all().count(), 4);
    assert_eq!(index.all().count(), 4);
}

#[test]
fn test_delete() {
    let mut index = SketchIndex::new();
    index.set(point(1, 0.0, 0.0)).unwrap();
    assert!(index.delete(Oid(1)));
    assert!(!index.delete(Oid(1)));
    assert!(!index.has(Oid(1)));
    assert_eq!(index.all().count(), 0);
}

#[test]
fn test_clear_resets_counter() {
    let mut index = SketchIndex::new();
    index.set(point(1, 0.0, 0.0)).unwrap();
    index.clear();
    assert!(index.is_empty());
    assert_eq!(index.counter(), 0);
}

#[test]
fn test_counter_overflow() {
    let mut index = SketchIndex::new();
    index.counter = u32::MAX;
    assert_eq!(index.set(point(1, 0.0, 0.0)), Err(SketchError::CounterOverflow));
    assert!(!index.has(Oid(1)));
}

#[test]
fn test_typed_accessors() {
    let mut index = SketchIndex::new();
    index.set(point(1, 0.0, 0.0)).unwrap();
    index.set(point(2, 3.0, 4.0)).unwrap();
    index
        .set(SketchGeometry::Line(SketchLine { id: Oid(3), p1_id: Oid(1), p2_id: Oid(2) }).into())
        .unwrap();
    index
        .set(SketchGeometry::Circle(SketchCircle { id: Oid(4), c_id: Oid(1), radius: 2.0 }).into())
        .unwrap();
    index
        .set(Constraint::new(Oid(5), ConstraintKind::HorizontalL).with_param("l_id", Oid(3)).into())
        .unwrap();

    assert_eq!(index.get_line(Oid(3)).unwrap().p2_id, Oid(2));
    assert_eq!(index.get_circle(Oid(4)).unwrap().radius, 2.0);
    assert_eq!(index.get_constraint(Oid(5)).unwrap().kind, ConstraintKind::HorizontalL);

    match index.get_point(Oid(3)) {
        Err(SketchError::TypeMismatch { id, expected, found }) => {
            assert_eq!(id, Oid(3));
            assert_eq!(expected, "point");
            assert_eq!(found, "line");
        }
        other => panic!("unexpected {:?}", other),
    }
    assert!(matches!(index.get_arc(Oid(4)), Err(SketchError::TypeMismatch { .. })));
    assert!(matches!(index.get_geometry(Oid(5)), Err(SketchError::TypeMismatch { .. })));
    assert!(matches!(index.get_constraint(Oid(1)), Err(SketchError::TypeMismatch { .. })));
    assert_eq!(index.get_ellipse(Oid(9)), Err(SketchError::NotFound(Oid(9))));

    assert_eq!(index.geometries().count(), 4);
    assert_eq!(index.constraints().count(), 1);
}

#[test]
fn test_display_one_json_line_per_primitive() {
    let mut index = SketchIndex::new();
    index.set(point(1, 0.5, 0.0)).unwrap();
    index.set(point(2, 1.0, 0.0)).unwrap();

    let text = index.to_string();
    let lines: Vec<&str> = text.lines().collect();
    assert_eq!(lines.len(), 2);
    let value: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
    assert_eq!(value["type"], "point");
    assert_eq!(value["x"], 0.5);
}
