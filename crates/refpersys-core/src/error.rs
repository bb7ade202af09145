//! Error taxonomy (spec §7): fatal programming-bug aborts versus recoverable
//! load-corruption errors. Argument-validation failures are not modeled
//! here — callers get `None`/`Value::Null`/empty-collection sentinels
//! instead (spec §7).

use std::fmt;

/// Marker type for a fatal invariant violation. Never constructed directly;
/// use the [`fatal!`] macro, which prints the banner and aborts before this
/// type's value would ever be observed.
#[derive(Debug)]
pub struct RpsFault(());

impl fmt::Display for RpsFault {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("refpersys: fatal invariant violation")
    }
}

impl std::error::Error for RpsFault {}

/// Prints a single-line banner (file, line, thread name, crate version) to
/// stderr and aborts the process. Used for programming-bug invariant
/// violations: unreachable cases, invalid payload-kind registration, a
/// classless object, a hash table that cannot grow, a sentinel collision.
#[macro_export]
macro_rules! fatal {
    ($($arg:tt)*) => {{
        let thread = std::thread::current();
        eprintln!(
            "refpersys: FATAL {}:{} [thread {}] (v{}): {}",
            file!(),
            line!(),
            thread.name().unwrap_or("<unnamed>"),
            env!("CARGO_PKG_VERSION"),
            format_args!($($arg)*),
        );
        eprintln!("{}", std::backtrace::Backtrace::force_capture());
        std::process::abort();
    }};
}

/// Recoverable errors raised while loading a heap directory (spec §7,
/// "Load corruption"). All-or-nothing: any of these aborts the *load*, but
/// is an ordinary `Result::Err`, not a panic — the caller decides whether
/// to retry, report, or treat it as fatal for the whole process.
#[derive(Debug, thiserror::Error)]
pub enum LoadError {
    #[error("heap directory {0:?} has no manifest file")]
    MissingManifest(std::path::PathBuf),
    #[error("manifest format {found:?} does not match expected {expected:?}")]
    FormatMismatch { expected: String, found: String },
    #[error("malformed JSON in {path:?}: {source}")]
    MalformedJson {
        path: std::path::PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("duplicate oid {0} in space file")]
    DuplicateOid(String),
    #[error("object record {oid} names unknown class {class}")]
    MissingClass { oid: String, class: String },
    #[error("object record {oid} names unknown payload kind {kind:?}")]
    UnknownPayloadKind { oid: String, kind: String },
    #[error("space declared {declared} objects but {actual} records were read")]
    RecordCountMismatch { declared: usize, actual: usize },
    #[error("malformed value encoding: {0}")]
    MalformedValue(String),
    #[error("io error reading {path:?}: {source}")]
    Io {
        path: std::path::PathBuf,
        #[source]
        source: std::io::Error,
    },
}
