use std::collections::HashMap;
use std::fmt;

use super::primitive::{
    Constraint, Oid, SketchArc, SketchCircle, SketchEllipse, SketchGeometry, SketchLine,
    SketchPoint, SketchPrimitive,
};
use crate::error::{SketchError, SketchResult};

/// Ordered store of sketch primitives keyed by id.
#[derive(Debug, Clone, Default)]
pub struct SketchIndex {
    /// Primitives indexed by ID
    items: HashMap<Oid, SketchPrimitive>,
    /// Insertion order
    order: Vec<Oid>,
    /// Number of distinct ids ever inserted since the last clear
    pub(crate) counter: u32,
}

macro_rules! typed_accessor {
    ($name:ident, $variant:ident, $ty:ty, $expected:literal) => {
        pub fn $name(&self, id: Oid) -> SketchResult<&$ty> {
            match self.get_or_fail(id)? {
                SketchPrimitive::Geometry(SketchGeometry::$variant(g)) => Ok(g),
                other => Err(SketchError::TypeMismatch {
                    id,
                    expected: $expected.to_string(),
                    found: other.type_name().to_string(),
                }),
            }
        }
    };
}

impl SketchIndex {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert or overwrite a primitive. Overwriting keeps the original
    /// position.
    pub fn set(&mut self, primitive: SketchPrimitive) -> SketchResult<()> {
        let id = primitive.id();
        if !self.items.contains_key(&id) {
            self.counter = self.counter.checked_add(1).ok_or(SketchError::CounterOverflow)?;
            self.order.push(id);
        }
        self.items.insert(id, primitive);
        Ok(())
    }

    pub fn get(&self, id: Oid) -> Option<&SketchPrimitive> {
        self.items.get(&id)
    }

    pub fn get_mut(&mut self, id: Oid) -> Option<&mut SketchPrimitive> {
        self.items.get_mut(&id)
    }

    pub fn get_or_fail(&self, id: Oid) -> SketchResult<&SketchPrimitive> {
        self.items.get(&id).ok_or(SketchError::NotFound(id))
    }

    /// Remove a primitive, reporting whether it existed.
    pub fn delete(&mut self, id: Oid) -> bool {
        if self.items.remove(&id).is_some() {
            self.order.retain(|o| *o != id);
            true
        } else {
            false
        }
    }

    pub fn has(&self, id: Oid) -> bool {
        self.items.contains_key(&id)
    }

    /// All primitives in insertion order.
    pub fn all(&self) -> impl Iterator<Item = &SketchPrimitive> + '_ {
        self.order.iter().filter_map(move |id| self.items.get(id))
    }

    pub fn ids(&self) -> &[Oid] {
        &self.order
    }

    pub fn constraints(&self) -> impl Iterator<Item = &Constraint> + '_ {
        self.all().filter_map(SketchPrimitive::as_constraint)
    }

    pub fn geometries(&self) -> impl Iterator<Item = &SketchGeometry> + '_ {
        self.all().filter_map(SketchPrimitive::as_geometry)
    }

    pub fn clear(&mut self) {
        self.items.clear();
        self.order.clear();
        self.counter = 0;
    }

    pub fn counter(&self) -> u32 {
        self.counter
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    typed_accessor!(get_point, Point, SketchPoint, "point");
    typed_accessor!(get_line, Line, SketchLine, "line");
    typed_accessor!(get_circle, Circle, SketchCircle, "circle");
    typed_accessor!(get_arc, Arc, SketchArc, "arc");
    typed_accessor!(get_ellipse, Ellipse, SketchEllipse, "ellipse");

    pub fn get_geometry(&self, id: Oid) -> SketchResult<&SketchGeometry> {
        match self.get_or_fail(id)? {
            SketchPrimitive::Geometry(g) => Ok(g),
            SketchPrimitive::Constraint(c) => Err(SketchError::TypeMismatch {
                id,
                expected: "geometry".to_string(),
                found: c.kind.to_string(),
            }),
        }
    }

    pub fn get_constraint(&self, id: Oid) -> SketchResult<&Constraint> {
        match self.get_or_fail(id)? {
            SketchPrimitive::Constraint(c) => Ok(c),
            SketchPrimitive::Geometry(g) => Err(SketchError::TypeMismatch {
                id,
                expected: "constraint".to_string(),
                found: g.class().to_string(),
            }),
        }
    }
}

impl fmt::Display for SketchIndex {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for primitive in self.all() {
            let line = serde_json::to_string(primitive).map_err(|_| fmt::Error)?;
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}
