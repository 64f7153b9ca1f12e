use crate::{
    expr::{eval::EvalError, function::ScalarFunction},
    geometry::{Crs, DistanceArea, Geometry},
    value::{F64_SAFE_I64, Value},
};
use geo::Centroid;

/// Apply one eagerly evaluated scalar function. `if` is lazy and never
/// reaches this point.
pub(crate) fn call(function: ScalarFunction, args: Vec<Value>) -> Result<Value, EvalError> {
    let name = function.name();
    let mut args = args.into_iter();

    match function {
        ScalarFunction::Array => Ok(Value::List(args.collect())),
        ScalarFunction::Coalesce => Ok(args.find(|v| !v.is_null()).unwrap_or(Value::Null)),
        ScalarFunction::Concat => Ok(Value::Text(args.map(|v| v.render()).collect())),
        ScalarFunction::Upper => Ok(map_text(next(&mut args), |s| s.to_uppercase())),
        ScalarFunction::Lower => Ok(map_text(next(&mut args), |s| s.to_lowercase())),
        ScalarFunction::Length => length(name, next(&mut args)),
        ScalarFunction::Abs => abs(name, next(&mut args)),
        ScalarFunction::Round => {
            let value = next(&mut args);
            let places = next(&mut args);
            round(name, &value, &places)
        }
        ScalarFunction::ToInt => convert(name, next(&mut args), |v| v.as_i64().map(Value::Int)),
        ScalarFunction::ToReal => convert(name, next(&mut args), |v| v.as_f64().map(Value::Float)),
        ScalarFunction::ToString => Ok(null_or(next(&mut args), |v| Value::Text(v.render()))),
        ScalarFunction::Area => measure(name, next(&mut args), |calc, g| calc.measure_area(g)),
        ScalarFunction::Perimeter => measure(name, next(&mut args), |calc, g| calc.measure_perimeter(g)),
        ScalarFunction::NumGeometries => with_geometry(name, next(&mut args), |g| {
            Value::Int(i64::try_from(g.num_geometries()).unwrap_or(i64::MAX))
        }),
        ScalarFunction::GeomToWkt => with_geometry(name, next(&mut args), |g| Value::Text(g.to_wkt())),
        ScalarFunction::GeomFromWkt => Ok(null_or(next(&mut args), |v| {
            Geometry::from_wkt(&v.render()).map_or(Value::Null, Value::Geometry)
        })),
        ScalarFunction::X => with_geometry(name, next(&mut args), |g| coordinate(g, |p| p.x())),
        ScalarFunction::Y => with_geometry(name, next(&mut args), |g| coordinate(g, |p| p.y())),
        ScalarFunction::If => Err(EvalError::Internal(
            "if() must be evaluated lazily".to_string(),
        )),
    }
}

// Missing optional arguments read as NULL.
fn next(args: &mut std::vec::IntoIter<Value>) -> Value {
    args.next().unwrap_or(Value::Null)
}

fn null_or(value: Value, f: impl FnOnce(Value) -> Value) -> Value {
    if value.is_null() { Value::Null } else { f(value) }
}

fn map_text(value: Value, f: impl FnOnce(&str) -> String) -> Value {
    null_or(value, |v| Value::Text(f(&v.render())))
}

fn length(name: &str, value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Geometry(geometry) => Ok(Value::Float(planar().measure_length(&geometry))),
        Value::List(_) => Err(EvalError::invalid_argument(name, &value)),
        other => Ok(Value::Int(
            i64::try_from(other.render().chars().count()).unwrap_or(i64::MAX),
        )),
    }
}

fn abs(name: &str, value: Value) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Int(i) => i
            .checked_abs()
            .map(Value::Int)
            .ok_or_else(|| EvalError::Overflow(format!("abs({i})"))),
        Value::Float(f) => Ok(Value::Float(f.abs())),
        other => Err(EvalError::not_numeric(name, &other)),
    }
}

fn round(name: &str, value: &Value, places: &Value) -> Result<Value, EvalError> {
    if value.is_null() {
        return Ok(Value::Null);
    }
    let number = match value {
        Value::Int(_) | Value::Float(_) => value.as_f64(),
        _ => None,
    }
    .ok_or_else(|| EvalError::not_numeric(name, value))?;
    let places = if places.is_null() {
        0
    } else {
        places
            .as_i64()
            .ok_or_else(|| EvalError::not_numeric(name, places))?
    };

    let factor = 10f64.powi(i32::try_from(places.clamp(-15, 15)).unwrap_or(0));
    let rounded = (number * factor).round() / factor;
    if places <= 0 && rounded.abs() < to_f64(F64_SAFE_I64) {
        return Ok(Value::Float(rounded).canonicalize());
    }

    Ok(Value::Float(rounded))
}

fn convert(
    name: &str,
    value: Value,
    f: impl FnOnce(&Value) -> Option<Value>,
) -> Result<Value, EvalError> {
    if value.is_null() {
        return Ok(Value::Null);
    }

    f(&value).ok_or_else(|| EvalError::Conversion {
        function: name.to_string(),
        value: value.to_string(),
    })
}

fn with_geometry(
    name: &str,
    value: Value,
    f: impl FnOnce(&Geometry) -> Value,
) -> Result<Value, EvalError> {
    match value {
        Value::Null => Ok(Value::Null),
        Value::Geometry(geometry) => Ok(f(&geometry)),
        other => Err(EvalError::invalid_argument(name, &other)),
    }
}

fn measure(
    name: &str,
    value: Value,
    f: impl FnOnce(&DistanceArea, &Geometry) -> f64,
) -> Result<Value, EvalError> {
    with_geometry(name, value, |geometry| Value::Float(f(&planar(), geometry)))
}

// Centroid coordinate; a point is its own centroid.
fn coordinate(geometry: &Geometry, axis: impl FnOnce(geo::Point<f64>) -> f64) -> Value {
    geometry
        .inner()
        .centroid()
        .map_or(Value::Null, |point| Value::Float(axis(point)))
}

// Scalar measure functions are cartesian regardless of the bound calculator.
fn planar() -> DistanceArea {
    DistanceArea::new(Crs::default())
}

#[expect(clippy::cast_precision_loss)]
const fn to_f64(i: i64) -> f64 {
    i as f64
}
