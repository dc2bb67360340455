//! 夸克网盘分享解析模块

pub mod candidates;
pub mod classify;
pub mod engine;
pub mod error;
pub mod normalize;
pub mod parser;
pub mod probe;
pub mod transport;
pub mod types;

// 导出常用类型
pub use candidates::{CandidateEntry, CandidateTable, HttpMethod, TemplateVars};
pub use classify::{classify, Classification};
pub use engine::{ResolutionEngine, Resolved, ROOT_DIR_FID};
pub use error::{Attempt, ErrorKind, ResolutionError};
pub use parser::parse_share_link;
pub use probe::{EndpointProbe, Normalized, Probed};
pub use transport::{HttpTransport, ProbeRequest, RawResponse, Transport, TransportFailure};
pub use types::{Credential, DirectoryListing, DownloadLink, FileEntry, Operation, ShareReference};
