use std::fmt;
use std::io;

/// 全局错误类型。所有变体都只带 String，这样 iterator 的 status() 可以反复 clone 出去。
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DBError {
    Io(String),
    Corruption(String),
    InvalidArgument(String),
    NotFound(String),
    /// 操作未完成（例如 block 不在 cache 里且不允许读盘），调用方可以重试
    Incomplete(String),
    NotSupported(String),
    Config(String),
    Other(String),
}

impl DBError {
    pub fn is_corruption(&self) -> bool {
        matches!(self, DBError::Corruption(_))
    }

    pub fn is_incomplete(&self) -> bool {
        matches!(self, DBError::Incomplete(_))
    }
}

impl fmt::Display for DBError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            DBError::Io(msg) => write!(f, "IO error: {msg}"),
            DBError::Corruption(msg) => write!(f, "Corruption: {msg}"),
            DBError::InvalidArgument(msg) => write!(f, "Invalid argument: {msg}"),
            DBError::NotFound(msg) => write!(f, "NotFound: {msg}"),
            DBError::Incomplete(msg) => write!(f, "Result incomplete: {msg}"),
            DBError::NotSupported(msg) => write!(f, "Not supported: {msg}"),
            DBError::Config(msg) => write!(f, "Config error: {msg}"),
            DBError::Other(msg) => write!(f, "{msg}"),
        }
    }
}

impl std::error::Error for DBError {}

impl From<io::Error> for DBError {
    fn from(e: io::Error) -> Self {
        DBError::Io(e.to_string())
    }
}

impl From<config::ConfigError> for DBError {
    fn from(e: config::ConfigError) -> Self {
        DBError::Config(e.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_and_kind_helpers() {
        let e = DBError::Corruption("Missing block for partition 10 20".into());
        assert!(e.is_corruption());
        assert!(!e.is_incomplete());
        assert_eq!(e.to_string(), "Corruption: Missing block for partition 10 20");

        let inc = DBError::Incomplete("no io".into());
        assert!(inc.is_incomplete());
    }

    #[test]
    fn test_from_io_error() {
        let io_err = io::Error::new(io::ErrorKind::UnexpectedEof, "short read");
        let e: DBError = io_err.into();
        assert!(matches!(e, DBError::Io(ref m) if m.contains("short read")));
    }
}
