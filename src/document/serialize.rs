use super::{DocumentError, Table, Value};

const INDENT: &str = "\t";

/// Renders `name = <table>` as a complete document.
pub fn serialize_global(name: &str, value: &Value) -> Result<String, DocumentError> {
    match value {
        Value::Table(table) => Ok(format!("{name} = {}", serialize_table(table, 0)?)),
        _ => Err(DocumentError::MissingGlobal(name.to_owned())),
    }
}

pub fn serialize_table(table: &Table, indent: usize) -> Result<String, DocumentError> {
    if table.is_empty() {
        return Ok(String::from("{ }"));
    }

    let mut buf = String::from("{\n");
    for (i, (key, value)) in table.iter().enumerate() {
        if i > 0 {
            buf.push_str(",\n");
        }
        buf.push_str(&INDENT.repeat(indent + 1));
        match key {
            Value::String(s) => {
                buf.push('[');
                write_string(&mut buf, s);
                buf.push_str("] = ");
            }
            Value::Number(n) => {
                buf.push('[');
                write_number(&mut buf, *n)?;
                buf.push_str("] = ");
            }
            other => return Err(DocumentError::UnsupportedKey(other.type_name())),
        }
        write_value(&mut buf, value, indent + 1)?;
    }
    buf.push('\n');
    buf.push_str(&INDENT.repeat(indent));
    buf.push('}');
    Ok(buf)
}

fn write_value(buf: &mut String, value: &Value, indent: usize) -> Result<(), DocumentError> {
    match value {
        Value::Nil => buf.push_str("nil"),
        Value::Bool(b) => buf.push_str(if *b { "true" } else { "false" }),
        Value::Number(n) => write_number(buf, *n)?,
        Value::String(s) => write_string(buf, s),
        Value::Table(table) => buf.push_str(&serialize_table(table, indent)?),
    }
    Ok(())
}

/// Shortest text that reads back as the same f64. Integral values print
/// without a fractional part.
fn write_number(buf: &mut String, n: f64) -> Result<(), DocumentError> {
    if !n.is_finite() {
        return Err(DocumentError::NonFiniteNumber(n));
    }
    if n == 0.0 {
        buf.push('0');
    } else if (1e-5..1e16).contains(&n.abs()) {
        buf.push_str(&n.to_string());
    } else {
        buf.push_str(&format!("{n:e}"));
    }
    Ok(())
}

fn write_string(buf: &mut String, s: &str) {
    buf.push('"');
    for ch in s.chars() {
        match ch {
            '\\' => buf.push_str("\\\\"),
            '"' => buf.push_str("\\\""),
            '\n' => buf.push_str("\\\n"),
            '\r' => buf.push_str("\\r"),
            '\0' => buf.push_str("\\000"),
            ch => buf.push(ch),
        }
    }
    buf.push('"');
}
