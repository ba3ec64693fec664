//! Portable export/import records for a single run.
//!
//! Field names are shortened relative to the stored shape. Import performs no
//! catalog checks: unknown potential ids are carried through untouched.
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::constants::{EXPORT_FILE_EXTENSION, EXPORT_FILE_PREFIX, IMPORT_NAME_SUFFIX};
use crate::run::{Run, Target};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableTarget {
    pub pid: String,
    pub cid: String,
    /// Kept wide so out-of-range levels in foreign files still parse.
    pub lvl: i64,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PortableRun {
    #[serde(default)]
    pub id: Option<String>,
    #[serde(default)]
    pub name: String,
    pub main: String,
    pub sup1: String,
    pub sup2: String,
    pub targets: Vec<PortableTarget>,
}

impl PortableRun {
    /// Pretty JSON body of an export file.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization fails.
    pub fn to_json(&self) -> Result<String, serde_json::Error> {
        serde_json::to_string_pretty(self)
    }
}

#[derive(Debug, Error)]
pub enum TransferError {
    #[error("malformed run file: {0}")]
    Malformed(#[from] serde_json::Error),
}

/// Convert a run to its portable record.
#[must_use]
pub fn to_portable(run: &Run) -> PortableRun {
    PortableRun {
        id: Some(run.id.clone()),
        name: run.name.clone(),
        main: run.main_char_id.clone(),
        sup1: run.support_char_id_1.clone(),
        sup2: run.support_char_id_2.clone(),
        targets: run
            .targets
            .iter()
            .map(|t| PortableTarget {
                pid: t.potential_id.clone(),
                cid: t.char_id.clone(),
                lvl: i64::from(t.level),
            })
            .collect(),
    }
}

/// Build a new run from a portable record under a fresh identity.
///
/// The record's own id is ignored and the name gains the import suffix.
/// `clamp_level` maps foreign levels into the valid range.
#[must_use]
pub fn from_portable(
    portable: PortableRun,
    new_id: String,
    clamp_level: impl Fn(i64) -> u8,
) -> Run {
    Run {
        id: new_id,
        name: format!("{}{IMPORT_NAME_SUFFIX}", portable.name),
        main_char_id: portable.main,
        support_char_id_1: portable.sup1,
        support_char_id_2: portable.sup2,
        targets: portable
            .targets
            .into_iter()
            .map(|t| Target {
                level: clamp_level(t.lvl),
                potential_id: t.pid,
                char_id: t.cid,
            })
            .collect(),
    }
}

/// Parse untrusted file contents into a portable record.
///
/// # Errors
///
/// Returns [`TransferError::Malformed`] if the text is not JSON or lacks a
/// required field.
pub fn parse_portable(json: &str) -> Result<PortableRun, TransferError> {
    Ok(serde_json::from_str(json)?)
}

/// File name for an exported run, derived from its name.
#[must_use]
pub fn export_file_name(run: &Run) -> String {
    let stem: String = run
        .name
        .chars()
        .map(|c| match c {
            '/' | '\\' | ':' | '\0' => '_',
            other => other,
        })
        .collect();
    format!("{EXPORT_FILE_PREFIX}{stem}.{EXPORT_FILE_EXTENSION}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TrackerConfig;

    fn sample_run() -> Run {
        let mut run = Run::new("1700", "Abyss push", "c1", "c2", "c3");
        run.targets.push(Target::new("c1_main_1", "c1", 6));
        run.targets.push(Target::new("c2_support_4", "c2", 2));
        run
    }

    #[test]
    fn portable_uses_short_field_names() {
        let value = serde_json::to_value(to_portable(&sample_run())).unwrap();
        assert_eq!(value["main"], "c1");
        assert_eq!(value["targets"][0]["pid"], "c1_main_1");
        assert_eq!(value["targets"][0]["cid"], "c1");
        assert_eq!(value["targets"][0]["lvl"], 6);
        assert!(value["targets"][0].get("potentialId").is_none());
    }

    #[test]
    fn import_assigns_new_identity_and_keeps_targets() {
        let cfg = TrackerConfig::default();
        let run = sample_run();
        let json = to_portable(&run).to_json().unwrap();
        let imported = from_portable(
            parse_portable(&json).unwrap(),
            "imp_1".to_string(),
            |l| cfg.clamp_level(l),
        );
        assert_eq!(imported.id, "imp_1");
        assert_eq!(imported.name, "Abyss push (Imp)");
        assert_eq!(imported.main_char_id, run.main_char_id);
        assert_eq!(imported.support_char_id_1, run.support_char_id_1);
        assert_eq!(imported.support_char_id_2, run.support_char_id_2);
        assert_eq!(imported.targets, run.targets);
    }

    #[test]
    fn structural_problems_are_malformed() {
        let cases = [
            "not json at all",
            r#"{ "name": "x", "main": "c1", "sup1": "c2", "sup2": "c3", "targets": 5 }"#,
            r#"{ "name": "x", "main": "c1", "sup1": "c2", "targets": [] }"#,
            r#"{ "name": "x", "main": "c1", "sup1": "c2", "sup2": "c3" }"#,
            r#"{ "main": "c1", "sup1": "c2", "sup2": "c3", "targets": [{ "pid": "p" }] }"#,
        ];
        for case in cases {
            assert!(
                matches!(parse_portable(case), Err(TransferError::Malformed(_))),
                "{case} should be rejected"
            );
        }
    }

    #[test]
    fn unknown_potentials_and_wild_levels_are_tolerated() {
        let cfg = TrackerConfig::default();
        let json = r#"{ "main": "c1", "sup1": "c2", "sup2": "c3",
            "targets": [{ "pid": "zz_main_99", "cid": "zz", "lvl": 42 },
                        { "pid": "c1_main_2", "cid": "c1", "lvl": -1 }] }"#;
        let run = from_portable(parse_portable(json).unwrap(), "imp_2".into(), |l| {
            cfg.clamp_level(l)
        });
        assert_eq!(run.name, " (Imp)");
        assert_eq!(run.targets[0], Target::new("zz_main_99", "zz", 6));
        assert_eq!(run.targets[1].level, 1);
    }

    #[test]
    fn file_name_derives_from_run_name() {
        let mut run = sample_run();
        assert_eq!(export_file_name(&run), "stella_run_Abyss push.json");
        run.name = "a/b\\c".into();
        assert_eq!(export_file_name(&run), "stella_run_a_b_c.json");
    }
}
