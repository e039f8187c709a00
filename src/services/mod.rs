pub mod artifact_writer;
pub mod identifier;
pub mod ledger;
pub mod normalize;

pub use artifact_writer::ArtifactWriter;
pub use identifier::{base_subject_name, is_math_family, parse_unit_code};
pub use ledger::{Ledger, LedgerStats, LedgerSummary, SessionTally, UnitKey};
pub use normalize::normalize_rows;
