//! 充值地址申请状态
//!
//! 开放式字符串枚举：只有 `completed` 带有业务行为（管理员覆盖时重新解析地址），
//! 其余标签原样保存。

use std::fmt;

use serde::{Deserialize, Deserializer, Serialize, Serializer};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WalletRequestStatus {
    Pending,
    Completed,
    Rejected,
    /// 未识别的标签，原样保存
    Other(String),
}

impl WalletRequestStatus {
    pub const COMPLETED: &'static str = "completed";

    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "pending" => Self::Pending,
            "completed" => Self::Completed,
            "rejected" => Self::Rejected,
            _ => Self::Other(raw.trim().to_string()),
        }
    }

    pub fn as_str(&self) -> &str {
        match self {
            Self::Pending => "pending",
            Self::Completed => Self::COMPLETED,
            Self::Rejected => "rejected",
            Self::Other(s) => s.as_str(),
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, Self::Completed)
    }
}

impl fmt::Display for WalletRequestStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl Serialize for WalletRequestStatus {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_str())
    }
}

impl<'de> Deserialize<'de> for WalletRequestStatus {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        Ok(Self::parse(&raw))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_known_labels() {
        assert_eq!(WalletRequestStatus::parse("completed"), WalletRequestStatus::Completed);
        assert_eq!(WalletRequestStatus::parse(" Completed "), WalletRequestStatus::Completed);
        assert_eq!(WalletRequestStatus::parse("pending"), WalletRequestStatus::Pending);
        assert!(WalletRequestStatus::parse("completed").is_completed());
    }

    #[test]
    fn test_unknown_label_kept_verbatim() {
        let status = WalletRequestStatus::parse("on-hold");
        assert_eq!(status, WalletRequestStatus::Other("on-hold".into()));
        assert_eq!(status.as_str(), "on-hold");
        assert!(!status.is_completed());
    }

    #[test]
    fn test_serde_as_plain_string() {
        let json = serde_json::to_string(&WalletRequestStatus::Completed).unwrap();
        assert_eq!(json, "\"completed\"");
        let back: WalletRequestStatus = serde_json::from_str("\"rejected\"").unwrap();
        assert_eq!(back, WalletRequestStatus::Rejected);
    }
}
