//! Keeps the generated METAR in the mission description shown in the
//! briefing.

use std::path::Path;

use tracing::info;

use crate::document::{serialize_global, DocumentError, ScriptEngine, Value};
use crate::mission::replace_file;

pub const DICTIONARY_FILE: &str = "l10n/DEFAULT/dictionary";
const DICTIONARY_GLOBAL: &str = "dictionary";
const DESCRIPTION_KEY: &str = "DictKey_descriptionText_1";

/// Puts `metar` on the line after `marker`, appending the marker to the brief
/// if it has none yet. An empty marker always appends.
pub fn insert_metar(brief: &str, marker: &str, metar: &str) -> String {
    if marker.is_empty() {
        return format!("{brief}\n\n{metar}\n");
    }

    let mut lines: Vec<&str> = brief.split('\n').collect();
    match lines.iter().position(|line| line.contains(marker)) {
        Some(index) if index + 1 < lines.len() => {
            lines[index + 1] = metar;
            lines.join("\n")
        }
        Some(_) => {
            lines.push(metar);
            lines.join("\n")
        }
        None => format!("{brief}\n\n{marker}\n{metar}\n"),
    }
}

pub fn update_brief(
    engine: &mut impl ScriptEngine,
    dir: &Path,
    marker: &str,
    metar: &str,
) -> Result<(), DocumentError> {
    let path = dir.join(DICTIONARY_FILE);
    engine.load_document(&path)?;

    let brief = match engine
        .get_global(DICTIONARY_GLOBAL)
        .lookup(&[DESCRIPTION_KEY])
        .and_then(Value::as_str)
    {
        Some(brief) => insert_metar(brief, marker, metar),
        None => metar.to_owned(),
    };

    engine.assign(
        &format!("{DICTIONARY_GLOBAL}[\"{DESCRIPTION_KEY}\"]"),
        Value::String(brief),
    )?;
    let text = serialize_global(DICTIONARY_GLOBAL, engine.get_global(DICTIONARY_GLOBAL))?;
    replace_file(&path, &text)?;
    info!("Added METAR to mission brief");
    Ok(())
}
