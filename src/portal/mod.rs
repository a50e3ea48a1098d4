pub mod error;
pub mod frames;
pub mod log;
pub mod login;
pub mod parser;
pub mod score;
pub mod selectors;
pub mod session;
pub mod storage_state;

pub use error::SessionError;
pub use log::RunLog;
pub use parser::{LoadCurveRow, ParseStats};
pub use session::{refresh_load_curve, run_session, RefreshOutcome, SessionParams, SessionSettings};
pub use storage_state::{StateStore, StorageState};
