//! 币种与充值地址规则
//!
//! - 托管方资产ID（如 `BTC_TEST`）与展示币种（`BTC`）之间的转换
//! - 托管方返回地址的链前缀清理（`bchtest:qq...` → `qq...`）

use serde::{Deserialize, Serialize};

/// 地址解析模式
///
/// 三种入口共用一个解析器，只在“先调用哪个托管接口”以及
/// “是否容忍资产已存在”上有区别。
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolveMode {
    /// 在 Vault 上创建资产；资产已存在时回退为查询现有地址
    ReuseExisting,
    /// 总是生成新地址，不做回退
    ForceNew,
    /// 先分页查询已有地址，没有再生成新地址
    LookupFirst,
}

impl ResolveMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::ReuseExisting => "reuse_existing",
            Self::ForceNew => "force_new",
            Self::LookupFirst => "lookup_first",
        }
    }
}

/// 规范化托管方资产ID：去空白并转大写
///
/// 空字符串或包含非法字符时返回 None
pub fn normalize_asset_id(raw: &str) -> Option<String> {
    let trimmed = raw.trim();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return None;
    }
    if !trimmed
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '-')
    {
        return None;
    }
    Some(trimmed.to_ascii_uppercase())
}

/// 资产ID → 展示币种
///
/// 仅去掉末尾的测试网段（`_TEST`、`_TEST5` 等），其余后缀保留，
/// 避免不同链上的同名代币（`USDT_ERC20` / `USDT_BSC`）落到同一条记录。
pub fn display_symbol(asset_id: &str) -> String {
    match asset_id.rsplit_once('_') {
        Some((base, suffix)) if !base.is_empty() && is_testnet_suffix(suffix) => base.to_string(),
        _ => asset_id.to_string(),
    }
}

fn is_testnet_suffix(suffix: &str) -> bool {
    match (suffix.get(..4), suffix.get(4..)) {
        (Some(head), Some(tail)) => {
            head.eq_ignore_ascii_case("TEST") && tail.chars().all(|c| c.is_ascii_digit())
        }
        _ => false,
    }
}

/// 去掉地址中的链前缀（`chain:address` → `address`）
///
/// 冒号后为空时返回空串，由调用方按“无地址”处理
pub fn strip_chain_prefix(address: &str) -> &str {
    let address = address.trim();
    match address.split_once(':') {
        Some((_, rest)) => rest.trim(),
        None => address,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_display_symbol_drops_testnet_suffix() {
        assert_eq!(display_symbol("BTC_TEST"), "BTC");
        assert_eq!(display_symbol("ETH_TEST5"), "ETH");
        assert_eq!(display_symbol("SOL_TEST"), "SOL");
    }

    #[test]
    fn test_display_symbol_keeps_network_suffix() {
        assert_eq!(display_symbol("USDT_ERC20"), "USDT_ERC20");
        assert_eq!(display_symbol("USDC_POLYGON"), "USDC_POLYGON");
        assert_eq!(display_symbol("BTC"), "BTC");
        // 只有后缀没有主体时不处理
        assert_eq!(display_symbol("_TEST"), "_TEST");
        assert_eq!(display_symbol("XTZ_TESTNET"), "XTZ_TESTNET");
    }

    #[test]
    fn test_strip_chain_prefix() {
        assert_eq!(
            strip_chain_prefix("bchtest:qqxyz0000000000000000000000000000000"),
            "qqxyz0000000000000000000000000000000"
        );
        assert_eq!(strip_chain_prefix("tb1qxyz"), "tb1qxyz");
        assert_eq!(strip_chain_prefix("  tb1qxyz "), "tb1qxyz");
        // 只有前缀没有地址
        assert_eq!(strip_chain_prefix("weird:"), "");
        assert_eq!(strip_chain_prefix("bchtest: "), "");
    }

    #[test]
    fn test_normalize_asset_id() {
        assert_eq!(normalize_asset_id(" btc_test "), Some("BTC_TEST".to_string()));
        assert_eq!(normalize_asset_id("USDT_ERC20"), Some("USDT_ERC20".to_string()));
        assert_eq!(normalize_asset_id(""), None);
        assert_eq!(normalize_asset_id("BTC;DROP"), None);
    }
}
