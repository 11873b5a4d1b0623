use std::fs;
use std::path::Path;

use super::parser::{self, Target};
use super::{DocumentError, ScriptEngine, Table, Value};

static NIL: Value = Value::Nil;

/// Executes table-literal documents into a single global environment.
#[derive(Debug, Default)]
pub struct Interpreter {
    globals: Table,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Runs every assignment statement in `source` against the globals.
    pub fn exec(&mut self, source: &str) -> Result<(), DocumentError> {
        for statement in parser::parse_chunk(source)? {
            self.store(&statement.target, statement.value)?;
        }
        Ok(())
    }

    fn store(&mut self, target: &Target, value: Value) -> Result<(), DocumentError> {
        let Some((last, parents)) = target.keys.split_last() else {
            self.globals.set(Value::from(target.root.as_str()), value);
            return Ok(());
        };

        let mut current = self
            .globals
            .get_mut(&Value::from(target.root.as_str()))
            .ok_or_else(|| {
                DocumentError::Eval(format!("attempt to index a nil value (global '{}')", target.root))
            })?;

        for key in parents {
            current = match current {
                Value::Table(table) => table.get_mut(key).ok_or_else(|| {
                    DocumentError::Eval(format!(
                        "attempt to index a nil value (field {})",
                        describe(key)
                    ))
                })?,
                other => {
                    return Err(DocumentError::Eval(format!(
                        "attempt to index a {} value",
                        other.type_name()
                    )))
                }
            };
        }

        match current {
            Value::Table(table) => {
                table.set(last.clone(), value);
                Ok(())
            }
            other => Err(DocumentError::Eval(format!(
                "attempt to index a {} value",
                other.type_name()
            ))),
        }
    }
}

fn describe(key: &Value) -> String {
    match key {
        Value::String(s) => format!("'{s}'"),
        Value::Number(n) => format!("[{n}]"),
        other => other.type_name().to_owned(),
    }
}

impl ScriptEngine for Interpreter {
    fn load_document(&mut self, path: &Path) -> Result<(), DocumentError> {
        let source = fs::read_to_string(path)?;
        self.exec(&source)
    }

    fn assign(&mut self, path: &str, value: Value) -> Result<(), DocumentError> {
        let target = parser::parse_target(path)?;
        self.store(&target, value)
    }

    fn get_global(&self, name: &str) -> &Value {
        self.globals.get_str(name).unwrap_or(&NIL)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn loaded(source: &str) -> Interpreter {
        let mut interpreter = Interpreter::new();
        interpreter.exec(source).unwrap();
        interpreter
    }

    #[test]
    fn defines_globals() {
        let interpreter = loaded("mission = { [\"weather\"] = { [\"qnh\"] = 760 } }");
        assert_eq!(
            interpreter
                .get_global("mission")
                .lookup(&["weather", "qnh"])
                .and_then(Value::as_f64),
            Some(760.0)
        );
        assert!(interpreter.get_global("dictionary").is_nil());
    }

    #[test]
    fn assigns_nested_fields_in_place() {
        let mut interpreter =
            loaded("mission = { [\"weather\"] = { [\"qnh\"] = 760, [\"fog2\"] = { [\"mode\"] = 2 } } }");
        interpreter.assign("mission.weather.qnh", Value::from(745)).unwrap();
        interpreter
            .assign("mission.weather.clouds", Table::new().with("density", 3).into())
            .unwrap();
        interpreter.assign("mission.weather.fog2", Value::Nil).unwrap();

        let weather = interpreter.get_global("mission").lookup(&["weather"]).unwrap();
        let keys: Vec<_> = weather
            .as_table()
            .unwrap()
            .iter()
            .map(|(k, _)| k.as_str().unwrap())
            .collect();
        assert_eq!(keys, ["qnh", "clouds"]);
        assert_eq!(weather.lookup(&["qnh"]), Some(&Value::Number(745.0)));
    }

    #[test]
    fn bracket_paths_with_string_keys() {
        let mut interpreter = loaded("dictionary = { [\"DictKey_descriptionText_1\"] = \"brief\" }");
        interpreter
            .assign("dictionary[\"DictKey_descriptionText_1\"]", Value::from("metar"))
            .unwrap();
        assert_eq!(
            interpreter
                .get_global("dictionary")
                .lookup(&["DictKey_descriptionText_1"]),
            Some(&Value::from("metar"))
        );
    }

    #[test]
    fn indexing_missing_or_scalar_fields_fails() {
        let mut interpreter = loaded("mission = { [\"date\"] = 5 }");
        assert!(matches!(
            interpreter.assign("mission.weather.qnh", Value::from(1)),
            Err(DocumentError::Eval(_))
        ));
        assert!(matches!(
            interpreter.assign("mission.date.Year", Value::from(2020)),
            Err(DocumentError::Eval(_))
        ));
        assert!(matches!(
            interpreter.assign("nothing.here", Value::from(1)),
            Err(DocumentError::Eval(_))
        ));
    }

    #[test]
    fn later_statements_update_earlier_globals() {
        let interpreter = loaded("t = { }\nt.a = 1\nt[\"b\"] = { 1, 2 }\nt.b[2] = 3");
        let t = interpreter.get_global("t");
        assert_eq!(t.lookup(&["a"]), Some(&Value::Number(1.0)));
        let b = t.lookup(&["b"]).and_then(Value::as_table).unwrap();
        assert_eq!(b.get(&Value::Number(2.0)), Some(&Value::Number(3.0)));
    }
}
