// i18n.rs
//
// Runtime UI strings:
// - English is compiled in (assets/i18n/en.json) and is always the fallback.
// - Other languages are read from assets/i18n/<lang>.json next to the
//   executable or in the working directory.
// - Lookup: tr("key") / tr_with("key", &[("name", ...)]) with {name} placeholders.

use once_cell::sync::{Lazy, OnceCell};
use std::{collections::HashMap, path::PathBuf, sync::RwLock};

type Catalog = HashMap<String, String>;

const FALLBACK_LANG: &str = "en";

static BUILTIN: Lazy<Catalog> = Lazy::new(|| {
    serde_json::from_str(include_str!("../assets/i18n/en.json")).unwrap_or_default()
});

struct I18n {
    lang: String,
    map: Catalog,
}

static I18N: OnceCell<RwLock<I18n>> = OnceCell::new();

fn lang_file_candidates(lang: &str) -> Vec<PathBuf> {
    let file = format!("{lang}.json");
    let mut out = Vec::new();
    if let Some(dir) = std::env::current_exe().ok().and_then(|e| e.parent().map(PathBuf::from)) {
        out.push(dir.join("assets").join("i18n").join(&file));
    }
    out.push(PathBuf::from("assets").join("i18n").join(&file));
    out
}

fn load_catalog(lang: &str) -> Catalog {
    for path in lang_file_candidates(lang) {
        let Ok(text) = std::fs::read_to_string(&path) else {
            continue;
        };
        match serde_json::from_str::<Catalog>(&text) {
            Ok(map) => return map,
            Err(e) => log::warn!("bad translation file {}: {e}", path.display()),
        }
    }
    if lang != FALLBACK_LANG {
        log::info!("no translations for {lang:?}, using {FALLBACK_LANG}");
    }
    Catalog::new()
}

/// Selects the UI language. Later calls replace the current catalog.
pub fn init(lang: &str) {
    let next = I18n { lang: lang.to_owned(), map: load_catalog(lang) };
    log::debug!("ui language {} ({} strings)", next.lang, next.map.len());
    let lock = I18N.get_or_init(|| RwLock::new(I18n { lang: String::new(), map: Catalog::new() }));
    let mut current = lock.write().unwrap_or_else(|poisoned| poisoned.into_inner());
    *current = next;
}

/// Localized text for `key`; the key itself if nothing matches.
pub fn tr(key: &str) -> String {
    if let Some(v) = I18N.get().and_then(|l| l.read().ok()).and_then(|i| i.map.get(key).cloned()) {
        return v;
    }
    BUILTIN.get(key).cloned().unwrap_or_else(|| key.to_owned())
}

pub fn tr_with(key: &str, args: &[(&str, String)]) -> String {
    let mut s = tr(key);
    for (k, v) in args {
        s = s.replace(&format!("{{{k}}}"), v);
    }
    s
}

/// CLI value first, then PANORAMA_LANG, then English.
pub fn resolve_lang(cli: Option<&str>) -> String {
    if let Some(lang) = cli.filter(|l| !l.trim().is_empty()) {
        return lang.to_owned();
    }
    match std::env::var("PANORAMA_LANG") {
        Ok(v) if !v.trim().is_empty() => v,
        _ => FALLBACK_LANG.to_owned(),
    }
}
