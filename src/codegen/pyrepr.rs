//! Rendering of Python literals for emitted scripts

use crate::case::golden::ParamValue;

/// Quoted string literal; JSON string escapes are valid Python
pub fn py_str(s: &str) -> String {
    serde_json::to_string(s).unwrap_or_else(|_| format!("\"{}\"", s.escape_default()))
}

pub fn py_float(v: f64) -> String {
    if v.is_nan() {
        "float(\"nan\")".to_string()
    } else if v.is_infinite() {
        if v > 0.0 {
            "float(\"inf\")".to_string()
        } else {
            "-float(\"inf\")".to_string()
        }
    } else {
        // Debug keeps the fractional part and round-trips exactly
        format!("{:?}", v)
    }
}

pub fn py_bool(v: bool) -> &'static str {
    if v {
        "True"
    } else {
        "False"
    }
}

/// Shape tuple, `(8,)` for rank one
pub fn py_shape(shape: &[usize]) -> String {
    match shape {
        [single] => format!("({},)", single),
        dims => {
            let parts: Vec<String> = dims.iter().map(|d| d.to_string()).collect();
            format!("({})", parts.join(", "))
        }
    }
}

pub fn py_str_list<'a>(items: impl IntoIterator<Item = &'a str>) -> String {
    let parts: Vec<String> = items.into_iter().map(py_str).collect();
    format!("[{}]", parts.join(", "))
}

pub fn py_float_list(values: &[f64]) -> String {
    let parts: Vec<String> = values.iter().map(|v| py_float(*v)).collect();
    format!("[{}]", parts.join(", "))
}

pub fn py_param(value: &ParamValue) -> String {
    match value {
        ParamValue::Int(v) => v.to_string(),
        ParamValue::Float(v) => py_float(*v),
        ParamValue::Bool(v) => py_bool(*v).to_string(),
        ParamValue::Str(v) => py_str(v),
    }
}
