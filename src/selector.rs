//! Picks the one DNS record this process manages.
//!
//! Runs once at startup against the full record list of the zone. The
//! provider's list order is kept as-is: `selected_item` is a position in
//! that order.

use crate::config::Config;
use crate::providers::DnsRecord;
use thiserror::Error;

/// Why no record could be chosen.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("no record with id {0} in zone")]
    RecordIdNotFound(String),

    #[error("neither NAME nor DOMAIN is set")]
    NoTargetSpecified,

    #[error("NAME is \"@\" but DOMAIN is not set")]
    ApexWithoutDomain,

    #[error("no {record_type} record named {name}")]
    NotFound { name: String, record_type: String },

    #[error("{count} {record_type} records named {name}; set SELECTEDITEM to pick one")]
    AmbiguousMultipleMatches {
        name: String,
        record_type: String,
        count: usize,
    },

    #[error("SELECTEDITEM {index} is out of range for {count} matching records")]
    IndexOutOfRange { index: usize, count: usize },
}

/// The record the update loop operates on.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManagedTarget {
    pub record_id: String,
    pub record_name: String,
    pub record_type: String,
}

impl From<&DnsRecord> for ManagedTarget {
    fn from(record: &DnsRecord) -> Self {
        Self {
            record_id: record.id.clone(),
            record_name: record.name.clone(),
            record_type: record.record_type.clone(),
        }
    }
}

/// Choose the managed record from `records`.
///
/// An explicit record id wins over everything else. Otherwise the target
/// name is built from `name`/`domain` and matched together with the
/// record type.
pub fn resolve(
    records: &[DnsRecord],
    config: &Config,
) -> std::result::Result<ManagedTarget, ResolutionError> {
    if let Some(id) = &config.record_id {
        let record = records
            .iter()
            .find(|r| &r.id == id)
            .ok_or_else(|| ResolutionError::RecordIdNotFound(id.clone()))?;

        for warning in hint_conflicts(record, config) {
            tracing::warn!(record = %record.id, "{}", warning);
        }

        return Ok(record.into());
    }

    let name = target_name(config)?;
    let matches: Vec<&DnsRecord> = records
        .iter()
        .filter(|r| same_name(&r.name, &name) && r.record_type.eq_ignore_ascii_case(&config.record_type))
        .collect();

    tracing::debug!(target_name = %name, matches = matches.len(), "Matched records");

    match matches.as_slice() {
        [] => Err(ResolutionError::NotFound {
            name,
            record_type: config.record_type.clone(),
        }),
        [only] => Ok((*only).into()),
        many => {
            let index = config
                .selected_item
                .ok_or_else(|| ResolutionError::AmbiguousMultipleMatches {
                    name: name.clone(),
                    record_type: config.record_type.clone(),
                    count: many.len(),
                })?;

            many.get(index)
                .map(|r| (*r).into())
                .ok_or(ResolutionError::IndexOutOfRange {
                    index,
                    count: many.len(),
                })
        }
    }
}

/// Fully-qualified name the configuration points at.
pub fn target_name(config: &Config) -> std::result::Result<String, ResolutionError> {
    let domain = config.domain.as_deref();

    match (config.name.as_deref(), domain) {
        (Some("@"), Some(domain)) => Ok(domain.to_string()),
        (Some("@"), None) => Err(ResolutionError::ApexWithoutDomain),
        (Some(name), Some(domain)) => {
            let suffix = format!(".{}", trim_root(domain));
            let bare = trim_root(name);
            if same_name(bare, domain) || ends_with_ignore_case(bare, &suffix) {
                Ok(name.to_string())
            } else {
                Ok(format!("{}.{}", name, domain))
            }
        }
        (Some(name), None) => Ok(name.to_string()),
        (None, Some(domain)) => Ok(domain.to_string()),
        (None, None) => Err(ResolutionError::NoTargetSpecified),
    }
}

/// Warnings for user hints that disagree with an explicitly chosen record.
pub fn hint_conflicts(record: &DnsRecord, config: &Config) -> Vec<String> {
    let mut warnings = Vec::new();

    if config.record_type_explicit
        && !record.record_type.eq_ignore_ascii_case(&config.record_type)
    {
        warnings.push(format!(
            "record {} has type {}, not the configured {}",
            record.id, record.record_type, config.record_type
        ));
    }

    if config.name.is_some() {
        if let Ok(name) = target_name(config) {
            if !same_name(&record.name, &name) {
                warnings.push(format!(
                    "record {} is named {}, not the configured {}",
                    record.id, record.name, name
                ));
            }
        }
    }

    warnings
}

fn trim_root(name: &str) -> &str {
    name.strip_suffix('.').unwrap_or(name)
}

fn same_name(a: &str, b: &str) -> bool {
    trim_root(a).eq_ignore_ascii_case(trim_root(b))
}

fn ends_with_ignore_case(s: &str, suffix: &str) -> bool {
    s.len() >= suffix.len()
        && s.is_char_boundary(s.len() - suffix.len())
        && s[s.len() - suffix.len()..].eq_ignore_ascii_case(suffix)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::FileConfig;

    fn config(pairs: &[(&str, &str)]) -> Config {
        let mut all = vec![("ZONEID", "z"), ("EMAIL", "e@example.com"), ("TOKEN", "t")];
        all.extend_from_slice(pairs);
        Config::from_sources(FileConfig::default(), |key: &str| {
            all.iter()
                .find(|(k, _)| *k == key)
                .map(|(_, v)| v.to_string())
        })
        .unwrap()
    }

    fn record(id: &str, name: &str, record_type: &str) -> DnsRecord {
        DnsRecord {
            id: id.to_string(),
            name: name.to_string(),
            record_type: record_type.to_string(),
            content: "198.51.100.1".to_string(),
            ttl: 1,
            proxied: false,
            comment: None,
        }
    }

    fn zone() -> Vec<DnsRecord> {
        vec![
            record("r1", "example.com", "A"),
            record("r2", "www.example.com", "A"),
            record("r3", "www.example.com", "AAAA"),
            record("r4", "multi.example.com", "A"),
            record("r5", "mail.example.com", "MX"),
            record("r6", "multi.example.com", "A"),
            record("r7", "multi.example.com", "A"),
        ]
    }

    #[test]
    fn test_target_name_subdomain() {
        let c = config(&[("NAME", "www"), ("DOMAIN", "example.com")]);
        assert_eq!(target_name(&c).unwrap(), "www.example.com");
    }

    #[test]
    fn test_target_name_apex() {
        let c = config(&[("NAME", "@"), ("DOMAIN", "example.com")]);
        assert_eq!(target_name(&c).unwrap(), "example.com");

        let c = config(&[("NAME", "@")]);
        assert_eq!(target_name(&c), Err(ResolutionError::ApexWithoutDomain));
    }

    #[test]
    fn test_target_name_no_double_suffix() {
        let c = config(&[("NAME", "www.example.com"), ("DOMAIN", "example.com")]);
        assert_eq!(target_name(&c).unwrap(), "www.example.com");

        let c = config(&[("NAME", "example.com"), ("DOMAIN", "example.com")]);
        assert_eq!(target_name(&c).unwrap(), "example.com");
    }

    #[test]
    fn test_target_name_partial_suffix_is_not_qualified() {
        // "myexample.com" does not end with ".example.com"
        let c = config(&[("NAME", "myexample.com"), ("DOMAIN", "example.com")]);
        assert_eq!(target_name(&c).unwrap(), "myexample.com.example.com");
    }

    #[test]
    fn test_target_name_single_source() {
        let c = config(&[("NAME", "host.example.net")]);
        assert_eq!(target_name(&c).unwrap(), "host.example.net");

        let c = config(&[("DOMAIN", "example.com")]);
        assert_eq!(target_name(&c).unwrap(), "example.com");

        let c = config(&[("RECORDID", "r1")]);
        assert_eq!(target_name(&c), Err(ResolutionError::NoTargetSpecified));
    }

    #[test]
    fn test_resolve_single_match() {
        let c = config(&[("NAME", "www"), ("DOMAIN", "example.com")]);
        let target = resolve(&zone(), &c).unwrap();
        assert_eq!(
            target,
            ManagedTarget {
                record_id: "r2".into(),
                record_name: "www.example.com".into(),
                record_type: "A".into(),
            }
        );
    }

    #[test]
    fn test_resolve_single_match_independent_of_order() {
        let c = config(&[("NAME", "www"), ("DOMAIN", "example.com")]);
        let mut records = zone();
        records.reverse();
        assert_eq!(resolve(&records, &c).unwrap().record_id, "r2");
        records.rotate_left(3);
        assert_eq!(resolve(&records, &c).unwrap().record_id, "r2");
    }

    #[test]
    fn test_resolve_respects_record_type() {
        let c = config(&[("NAME", "www"), ("DOMAIN", "example.com"), ("RECORDTYPE", "AAAA")]);
        assert_eq!(resolve(&zone(), &c).unwrap().record_id, "r3");
    }

    #[test]
    fn test_resolve_case_insensitive_name() {
        let c = config(&[("NAME", "WWW"), ("DOMAIN", "Example.COM")]);
        assert_eq!(resolve(&zone(), &c).unwrap().record_id, "r2");
    }

    #[test]
    fn test_resolve_not_found() {
        let c = config(&[("NAME", "vpn"), ("DOMAIN", "example.com")]);
        assert_eq!(
            resolve(&zone(), &c),
            Err(ResolutionError::NotFound {
                name: "vpn.example.com".into(),
                record_type: "A".into(),
            })
        );
    }

    #[test]
    fn test_resolve_empty_zone() {
        let c = config(&[("DOMAIN", "example.com")]);
        assert!(matches!(resolve(&[], &c), Err(ResolutionError::NotFound { .. })));
    }

    #[test]
    fn test_resolve_ambiguous_without_index() {
        let c = config(&[("NAME", "multi"), ("DOMAIN", "example.com")]);
        assert_eq!(
            resolve(&zone(), &c),
            Err(ResolutionError::AmbiguousMultipleMatches {
                name: "multi.example.com".into(),
                record_type: "A".into(),
                count: 3,
            })
        );
    }

    #[test]
    fn test_resolve_index_uses_list_order() {
        for (index, expected) in [("0", "r4"), ("1", "r6"), ("2", "r7")] {
            let c = config(&[
                ("NAME", "multi"),
                ("DOMAIN", "example.com"),
                ("SELECTEDITEM", index),
            ]);
            assert_eq!(resolve(&zone(), &c).unwrap().record_id, expected);
        }
    }

    #[test]
    fn test_resolve_index_out_of_range() {
        let c = config(&[
            ("NAME", "multi"),
            ("DOMAIN", "example.com"),
            ("SELECTEDITEM", "3"),
        ]);
        assert_eq!(
            resolve(&zone(), &c),
            Err(ResolutionError::IndexOutOfRange { index: 3, count: 3 })
        );
    }

    #[test]
    fn test_resolve_ignores_index_for_single_match() {
        let c = config(&[
            ("NAME", "www"),
            ("DOMAIN", "example.com"),
            ("SELECTEDITEM", "5"),
        ]);
        assert_eq!(resolve(&zone(), &c).unwrap().record_id, "r2");
    }

    #[test]
    fn test_resolve_explicit_id() {
        let c = config(&[("RECORDID", "r3")]);
        let target = resolve(&zone(), &c).unwrap();
        assert_eq!(target.record_name, "www.example.com");
        assert_eq!(target.record_type, "AAAA");
    }

    #[test]
    fn test_resolve_explicit_id_not_found() {
        let c = config(&[("RECORDID", "missing"), ("NAME", "www"), ("DOMAIN", "example.com")]);
        assert_eq!(
            resolve(&zone(), &c),
            Err(ResolutionError::RecordIdNotFound("missing".into()))
        );
    }

    #[test]
    fn test_explicit_id_overrides_conflicting_hints() {
        let c = config(&[
            ("RECORDID", "r3"),
            ("NAME", "vpn"),
            ("DOMAIN", "example.com"),
            ("RECORDTYPE", "A"),
        ]);
        let target = resolve(&zone(), &c).unwrap();
        assert_eq!(target.record_id, "r3");
        assert_eq!(target.record_type, "AAAA");

        let records = zone();
        let warnings = hint_conflicts(&records[2], &c);
        assert_eq!(warnings.len(), 2);
        assert!(warnings[0].contains("type AAAA"));
        assert!(warnings[1].contains("vpn.example.com"));
    }

    #[test]
    fn test_explicit_id_without_record_type_has_no_type_warning() {
        let c = config(&[("RECORDID", "r3")]);
        let records = zone();
        assert_eq!(records[2].record_type, "AAAA");
        assert!(hint_conflicts(&records[2], &c).is_empty());
        assert_eq!(resolve(&records, &c).unwrap().record_type, "AAAA");
    }

    #[test]
    fn test_no_conflicts_when_hints_agree() {
        let c = config(&[("RECORDID", "r2"), ("NAME", "www"), ("DOMAIN", "example.com")]);
        let records = zone();
        assert!(hint_conflicts(&records[1], &c).is_empty());
    }
}
