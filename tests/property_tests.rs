//! Property-based tests for rust_service_foundation using proptest

use parking_lot::Mutex;
use proptest::prelude::*;
use rust_service_foundation::config::{
    ConfigStore, HttpConfig, MessageLimits, RunMode, ServerConfig, Snapshot, TlsConfig,
};
use rust_service_foundation::prelude::*;
use rust_service_foundation::{LogEntry, Output};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

fn any_level() -> impl Strategy<Value = LogLevel> {
    prop::sample::select(LogLevel::ALL.to_vec())
}

fn capture() -> (Output, Arc<Mutex<Vec<u8>>>) {
    let buffer = Arc::new(Mutex::new(Vec::new()));
    (buffer.clone(), buffer)
}

struct Counted(Arc<AtomicUsize>);

impl fmt::Display for Counted {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fetch_add(1, Ordering::SeqCst);
        f.write_str("counted")
    }
}

// ============================================================================
// LogLevel Tests
// ============================================================================

proptest! {
    /// Test that both level spellings parse back to the same level
    #[test]
    fn test_log_level_str_roundtrip(level in any_level()) {
        prop_assert_eq!(level.as_str().parse::<LogLevel>(), Ok(level));
        prop_assert_eq!(LogLevel::resolve(level.token()), Some(level));
    }

    /// Test that LogLevel ordering is consistent
    #[test]
    fn test_log_level_ordering(level1 in any_level(), level2 in any_level()) {
        let val1 = level1 as u8;
        let val2 = level2 as u8;

        prop_assert_eq!(level1 <= level2, val1 <= val2);
        prop_assert_eq!(level1 < level2, val1 < val2);
        prop_assert_eq!(level1.cmp(&level2), val1.cmp(&val2));
    }

    /// Test that parsing accepts case-insensitive input
    #[test]
    fn test_log_level_case_insensitive(level in any_level(), use_lower in any::<bool>()) {
        let input = if use_lower {
            level.as_str().to_lowercase()
        } else {
            level.as_str().to_string()
        };
        prop_assert_eq!(LogLevel::resolve(&input), Some(level));
    }

    #[test]
    fn test_unknown_level_names_do_not_resolve(name in "[a-z]{1,12}") {
        let known = LogLevel::ALL
            .iter()
            .any(|l| l.token() == name || l.as_str().eq_ignore_ascii_case(&name))
            || name == "warn";
        prop_assert_eq!(LogLevel::resolve(&name).is_some(), known);
    }
}

// ============================================================================
// Facade Tests
// ============================================================================

proptest! {
    /// Disabled levels are filtered and never format their message
    #[test]
    fn test_threshold_filtering_is_lazy(threshold in any_level(), level in any_level()) {
        prop_assume!(level < LogLevel::Fatal);

        let (output, buffer) = capture();
        let logger = Logger::builder().level(threshold).output(output).build();
        let formats = Arc::new(AtomicUsize::new(0));

        prop_assert_eq!(logger.enabled(level), level >= threshold);
        logger.log(level, Counted(Arc::clone(&formats)));

        if level >= threshold {
            prop_assert_eq!(formats.load(Ordering::SeqCst), 1);
            prop_assert_eq!(buffer.lock().iter().filter(|b| **b == b'\n').count(), 1);
        } else {
            prop_assert_eq!(formats.load(Ordering::SeqCst), 0);
            prop_assert!(buffer.lock().is_empty());
        }
    }

    /// Later fields shadow earlier ones without touching the parent
    #[test]
    fn test_field_shadowing(key in "[a-z]{1,8}", v1 in ".*", v2 in ".*") {
        let parent = Logger::builder().build().with_field(key.clone(), v1.clone());
        let child = parent.with_field(key.clone(), v2.clone());

        prop_assert_eq!(parent.fields().get(&key), Some(&FieldValue::from(v1)));
        prop_assert_eq!(child.fields().get(&key), Some(&FieldValue::from(v2)));
    }

    /// Test that control characters never reach the sink unescaped
    #[test]
    fn test_message_sanitization(message in ".*") {
        let entry = LogEntry::new(LogLevel::Info, &message, Default::default());

        prop_assert!(!entry.message.contains('\n'));
        prop_assert!(!entry.message.contains('\r'));
        prop_assert!(!entry.message.contains('\t'));
    }

    /// Every call produces exactly one parseable JSON line
    #[test]
    fn test_json_single_line(message in ".*", value in ".*") {
        let (output, buffer) = capture();
        let logger = Logger::builder().output(output).build();
        logger.with_field("value", value.clone()).info(&message);

        let text = String::from_utf8(buffer.lock().clone()).unwrap();
        prop_assert_eq!(text.lines().count(), 1);
        let record: serde_json::Value = serde_json::from_str(text.trim_end()).unwrap();
        prop_assert_eq!(record["value"].as_str(), Some(value.as_str()));
    }
}

// ============================================================================
// Configuration Tests
// ============================================================================

fn text() -> impl Strategy<Value = String> {
    "[a-zA-Z0-9 ._/-]{0,16}"
}

fn path() -> impl Strategy<Value = PathBuf> {
    "(/[a-z0-9]{1,8}){0,3}/?".prop_map(PathBuf::from)
}

fn snapshot() -> impl Strategy<Value = Snapshot> {
    let top = (
        prop_oneof![Just(RunMode::Debug), Just(RunMode::Release), Just(RunMode::Test)],
        text(),
        path(),
        text(),
        prop::collection::vec(text(), 0..4),
        prop::collection::vec(text(), 0..4),
        prop::collection::vec(text(), 0..4),
    );
    let sections = (
        (text(), any::<u16>(), text()),
        (text(), any::<u16>()),
        (0..u64::from(u32::MAX), 0..u64::from(u32::MAX)),
        (path(), path(), path(), path(), path()),
    );
    (top, sections).prop_map(
        |(
            (mode, token, log_dir, official_domain, alternate_domains, personal, organization),
            ((host, port, protocol), (http_host, http_port), (api, file), (ca, sc, sk, cc, ck)),
        )| Snapshot {
            mode,
            token,
            log_dir,
            official_domain,
            alternate_domains,
            personal_allow_list: personal,
            organization_allow_list: organization,
            server: ServerConfig {
                host,
                port,
                protocol,
            },
            http: HttpConfig {
                host: http_host,
                port: http_port,
            },
            limits: MessageLimits {
                api_message_size: api,
                file_message_size: file,
            },
            tls: TlsConfig {
                ca,
                server_cert: sc,
                server_key: sk,
                client_cert: cc,
                client_key: ck,
            },
        },
    )
}

proptest! {
    /// Load followed by get returns exactly what the document encodes
    #[test]
    fn test_load_then_get(expected in snapshot()) {
        let document = toml::to_string(&expected).unwrap();
        let store = ConfigStore::new();

        store.load_bytes(document.as_bytes()).unwrap();
        let current = store.get();
        prop_assert_eq!(current.as_deref(), Some(&expected));
    }

    /// A malformed document never replaces a loaded snapshot
    #[test]
    fn test_malformed_load_keeps_previous(expected in snapshot(), junk in "[=\\[\\]{}]{1,8}") {
        let store = ConfigStore::new();
        store.replace(expected.clone());

        prop_assert!(store.load_bytes(junk.as_bytes()).is_err());
        let current = store.get();
        prop_assert_eq!(current.as_deref(), Some(&expected));
    }
}
